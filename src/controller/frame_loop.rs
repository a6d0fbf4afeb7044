use std::cell::RefCell;
use std::rc::Rc;

use web_sys::Window;
use wgpu::{Device, Queue, Surface, TextureView};

use crate::controller::game_state::GameState;
use crate::controller::input::{InputProcessor, InputState};
use crate::controller::simulation::Simulation;
use crate::model::{Camera, World};
use crate::ui;
use crate::view::render::RenderState;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

/// Main game loop state and update logic (browser build)
pub struct FrameLoopContext {
    pub camera: Rc<RefCell<Camera>>,
    pub world: Rc<RefCell<World>>,
    pub input_state: Rc<RefCell<InputState>>,
    pub game_state: Rc<RefCell<GameState>>,
    pub input_processor: InputProcessor,
    pub simulation: Simulation,
    pub cam_buf: wgpu::Buffer,
    pub cam_buf_data: Rc<RefCell<CameraUniform>>,
    pub depth_view_cell: Rc<RefCell<TextureView>>,
    pub egui_ctx: egui::Context,
    pub last_time: Rc<RefCell<f64>>,
}

impl FrameLoopContext {
    /// One frame: drain fire input, advance the world, sync the camera
    /// uniform, handle resize, and build the UI for the draw that follows.
    pub fn update(
        &mut self,
        device: &Device,
        queue: &Queue,
        window: &Window,
        surface: &Surface,
        render_state: &mut RenderState,
    ) {
        // dt is display/UI information only; the simulation itself runs in
        // fixed per-frame increments like the original.
        let now = window.performance().map(|p| p.now()).unwrap_or(0.0);
        let dt = ((now - *self.last_time.borrow()) / 1000.0).clamp(0.0, 0.1) as f32;
        *self.last_time.borrow_mut() = now;

        {
            let mut input = self.input_state.borrow_mut();
            let mut world = self.world.borrow_mut();

            for _ in 0..input.consume_fire_presses() {
                world.fire();
            }

            let frame = self.input_processor.sample(&input);
            drop(input);

            self.simulation
                .step(&mut world, &frame, &mut self.camera.borrow_mut());
        }
        self.game_state.borrow_mut().frame += 1;

        self.handle_resize(window, device, surface, render_state);

        self.cam_buf_data.borrow_mut().view_proj =
            self.camera.borrow().view_proj().to_cols_array_2d();
        queue.write_buffer(
            &self.cam_buf,
            0,
            bytemuck::bytes_of(&*self.cam_buf_data.borrow()),
        );

        // Build egui output for the draw call
        let dpr = window.device_pixel_ratio() as f32;
        self.egui_ctx.set_pixels_per_point(dpr);
        let mut full_output = ui::build_ui(
            &self.egui_ctx,
            &self.camera.borrow(),
            &self.game_state.borrow(),
            &self.world.borrow(),
            render_state.width,
            render_state.height,
            dt,
            now,
        );

        let primitives = self
            .egui_ctx
            .tessellate(std::mem::take(&mut full_output.shapes), dpr);
        render_state.egui_primitives = Some(primitives);
        render_state.egui_full_output = Some(full_output);
        render_state.egui_dpr = dpr;
    }

    fn handle_resize(
        &self,
        window: &Window,
        device: &Device,
        surface: &Surface,
        render_state: &mut RenderState,
    ) {
        if let (Ok(w), Ok(h)) = (window.inner_width(), window.inner_height()) {
            let nw = w.as_f64().unwrap_or(800.0) as u32;
            let nh = h.as_f64().unwrap_or(600.0) as u32;
            if nw != render_state.width || nh != render_state.height {
                self.camera.borrow_mut().set_aspect(nw, nh);
                render_state.width = nw;
                render_state.height = nh;

                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format: render_state.format,
                    width: nw,
                    height: nh,
                    present_mode: wgpu::PresentMode::Fifo,
                    alpha_mode: render_state.alpha_mode,
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(device, &config);

                let (_, new_depth_view) = crate::view::render::create_depth_texture(device, nw, nh);
                *self.depth_view_cell.borrow_mut() = new_depth_view;
            }
        }
    }
}

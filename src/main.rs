use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{info, warn};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::Window,
};

use starblitz::{assets, controller, logging, model, ui, utils, view};

use controller::{
    CameraUniform, GameState, InputEvent, InputProcessor, InputState, LightingUniform,
    MouseButton as GameMouseButton, ShipLoad, Simulation,
};
use model::{Camera, Ship, World};
use view::render::{self, RenderState};
use view::GpuContext;

struct App {
    // Core GPU resources
    gpu: GpuContext,
    size: winit::dpi::PhysicalSize<u32>,
    window: Arc<Window>,

    depth_view: wgpu::TextureView,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    render_state: RenderState,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // Game state
    camera: Camera,
    world: World,
    game_state: GameState,
    input_state: InputState,
    input_processor: InputProcessor,
    simulation: Simulation,

    // Input handling
    free_look_held: bool,

    // Frame timing
    last_frame_time: std::time::Instant,
    fps: f32,
    frame_count: u32,
    fps_timer: f32,
}

impl App {
    async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let gpu = GpuContext::new_native(window.clone(), size.width, size.height).await;
        let device = gpu.device.as_ref();

        let depth_format = wgpu::TextureFormat::Depth32Float;
        let (_depth_tex, depth_view) = render::create_depth_texture(device, size.width, size.height);

        let camera = Camera::new(size.width, size.height);

        let camera_resources = render::create_camera_resources(device);
        let camera_buffer = camera_resources.camera_buffer;
        let camera_bind_group = camera_resources.camera_bind_group;

        let cam_buf_data = CameraUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
        };
        gpu.queue
            .write_buffer(&camera_buffer, 0, bytemuck::bytes_of(&cam_buf_data));

        let lighting_data = LightingUniform {
            sun_dir: [0.3, 0.5, 0.8],
            sun_intensity: 0.8,
            ambient: 0.4,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        };
        gpu.queue.write_buffer(
            &camera_resources.lighting_buffer,
            0,
            bytemuck::bytes_of(&lighting_data),
        );

        let model_resources = render::create_model_resources(device);
        let pipes = render::create_scene_pipelines(
            device,
            gpu.format,
            &camera_resources.bind_group_layout,
            &model_resources.bind_group_layout,
            depth_format,
        );

        let red = [1.0, 0.0, 0.0, 1.0];
        let enemy_mesh = utils::create_cone_mesh(1.0, 3.0, 8, red).upload(device);
        let bullet_mesh = utils::create_sphere_mesh(0.1, 8, 8, red, false).upload(device);
        let starfield_mesh =
            utils::create_sphere_mesh(500.0, 32, 32, [1.0, 1.0, 1.0, 1.0], true).upload(device);

        let ship_mesh: Rc<RefCell<Option<utils::MeshBuffer>>> = Rc::new(RefCell::new(None));
        let star_bind_group = Rc::new(RefCell::new(render::create_fallback_star_texture(
            device,
            gpu.queue.as_ref(),
            &pipes.star_bind_group_layout,
        )));

        let mut world = World::new();
        let mut game_state = GameState::new();

        // Assets come from the local assets/ directory on native; load them
        // up front. Failure is non-fatal either way.
        match assets::read_bytes(assets::SHIP_MODEL_PATH)
            .and_then(|bytes| assets::decode_ship_mesh(&bytes))
        {
            Ok(mesh) => {
                *ship_mesh.borrow_mut() = Some(mesh.upload(device));
                world.ship = Some(Ship::new());
                game_state.ship_load = ShipLoad::Ready;
                info!("ship model loaded");
            }
            Err(e) => {
                game_state.ship_load = ShipLoad::Failed;
                warn!("ship model load failed, continuing without a ship: {e}");
            }
        }
        match assets::read_bytes(assets::STARFIELD_PATH)
            .and_then(|bytes| assets::decode_starfield_rgba(&bytes))
        {
            Ok((pixels, w, h)) => {
                *star_bind_group.borrow_mut() = render::create_star_texture(
                    device,
                    gpu.queue.as_ref(),
                    &pipes.star_bind_group_layout,
                    &pixels,
                    w,
                    h,
                );
                info!(width = w, height = h, "starfield texture loaded");
            }
            Err(e) => warn!("starfield load failed, keeping fallback backdrop: {e}"),
        }

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        let render_state = RenderState {
            format: gpu.format,
            alpha_mode: gpu.config.alpha_mode,
            width: size.width,
            height: size.height,
            scene_pipeline: pipes.scene_pipeline,
            starfield_pipeline: pipes.starfield_pipeline,
            model_buffer: model_resources.buffer,
            model_bind_group: model_resources.bind_group,
            starfield_mesh,
            enemy_mesh,
            bullet_mesh,
            ship_mesh,
            star_bind_group,
            egui_renderer,
            egui_primitives: None,
            egui_full_output: None,
            egui_dpr: 1.0,
        };

        Self {
            gpu,
            size,
            window,
            depth_view,
            camera_buffer,
            camera_bind_group,
            render_state,
            egui_state,
            egui_ctx,
            camera,
            world,
            game_state,
            input_state: InputState::new(),
            input_processor: InputProcessor::default(),
            simulation: Simulation::new(),
            free_look_held: false,
            last_frame_time: std::time::Instant::now(),
            fps: 0.0,
            frame_count: 0,
            fps_timer: 0.0,
        }
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        let egui_captured = self
            .egui_state
            .on_window_event(self.window.as_ref(), event)
            .consumed;
        if egui_captured {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state, logical_key, ..
                },
                ..
            } => {
                if let Some(key) = key_name(logical_key) {
                    match state {
                        ElementState::Pressed => {
                            if self.input_processor.is_escape(&key) {
                                self.game_state.request_exit();
                            }
                            self.input_state.process_event(&InputEvent::KeyDown(key));
                        }
                        ElementState::Released => {
                            self.input_state.process_event(&InputEvent::KeyUp(key));
                        }
                    }
                }
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let is_down = *state == ElementState::Pressed;
                let button = match button {
                    MouseButton::Left => Some(GameMouseButton::Left),
                    MouseButton::Right => Some(GameMouseButton::Right),
                    MouseButton::Middle => Some(GameMouseButton::Middle),
                    _ => None,
                };
                if let Some(button) = button {
                    if button == GameMouseButton::Right {
                        self.free_look_held = is_down;
                    }
                    self.input_state
                        .process_event(&InputEvent::MouseClick { button, is_down });
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = controller::input::normalized_pointer(
                    position.x as f32,
                    position.y as f32,
                    self.size.width.max(1) as f32,
                    self.size.height.max(1) as f32,
                );
                self.input_state.process_event(&InputEvent::PointerMoved {
                    x,
                    y,
                    free_look: self.free_look_held,
                });
                true
            }
            WindowEvent::Focused(false) => {
                self.input_state.process_event(&InputEvent::FocusLost);
                true
            }
            _ => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.gpu.config.width = new_size.width;
            self.gpu.config.height = new_size.height;
            self.gpu
                .surface
                .configure(self.gpu.device.as_ref(), &self.gpu.config);

            let (_depth_tex, depth_view) = render::create_depth_texture(
                self.gpu.device.as_ref(),
                new_size.width,
                new_size.height,
            );
            self.depth_view = depth_view;
            self.camera.set_aspect(new_size.width, new_size.height);
            self.render_state.width = new_size.width;
            self.render_state.height = new_size.height;
        }
    }

    fn update(&mut self, dt: f32) {
        // FPS is display-only; the simulation runs per frame, not per second
        self.frame_count += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }

        for _ in 0..self.input_state.consume_fire_presses() {
            self.world.fire();
        }

        let frame = self.input_processor.sample(&self.input_state);
        self.simulation
            .step(&mut self.world, &frame, &mut self.camera);
        self.game_state.frame += 1;

        let cam_buf_data = CameraUniform {
            view_proj: self.camera.view_proj().to_cols_array_2d(),
        };
        self.gpu
            .queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&cam_buf_data));
    }

    fn render(&mut self, dt: f32) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut output = self.egui_ctx.run(raw_input, |ctx| {
            ui::draw_overlay(ctx, &self.camera, &self.game_state, &self.world, dt);
        });
        self.egui_state
            .handle_platform_output(&self.window, std::mem::take(&mut output.platform_output));

        let dpr = self.window.scale_factor() as f32;
        let primitives = self
            .egui_ctx
            .tessellate(std::mem::take(&mut output.shapes), dpr);
        self.render_state.egui_primitives = Some(primitives);
        self.render_state.egui_full_output = Some(output);
        self.render_state.egui_dpr = dpr;

        self.render_state.draw_frame(
            self.gpu.device.as_ref(),
            self.gpu.queue.as_ref(),
            &self.gpu.surface,
            &self.world,
            self.camera.eye,
            &self.depth_view,
            &self.camera_bind_group,
        );
    }
}

fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(c) => Some(c.to_string()),
        Key::Named(NamedKey::Shift) => Some("Shift".to_string()),
        Key::Named(NamedKey::Control) => Some("Control".to_string()),
        Key::Named(NamedKey::Escape) => Some("Escape".to_string()),
        _ => None,
    }
}

fn main() {
    logging::init();

    let event_loop = EventLoop::new().unwrap();
    let window_attributes = Window::default_attributes()
        .with_title("Starblitz")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = event_loop.create_window(window_attributes).unwrap();
    let window = Arc::new(window);

    let mut app = pollster::block_on(App::new(window.clone()));

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            let now = std::time::Instant::now();
                            let dt = (now - app.last_frame_time).as_secs_f32();
                            app.last_frame_time = now;

                            app.update(dt);
                            if !app.game_state.is_running() {
                                elwt.exit();
                                return;
                            }
                            app.render(dt);
                        }
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        })
        .unwrap();
}

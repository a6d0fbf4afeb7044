// Re-export all public modules so they can be used from main.rs
pub mod assets;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::{
    CameraUniform, FrameLoopContext, GameState, InputEvent, InputProcessor, InputState,
    LightingUniform, MouseButton, ShipLoad, Simulation,
};
#[cfg(target_arch = "wasm32")]
use model::{Camera, Ship, World};
#[cfg(target_arch = "wasm32")]
use tracing::{info, warn};
#[cfg(target_arch = "wasm32")]
use view::{render, GpuContext};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    logging::init();

    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let width = window
        .inner_width()?
        .as_f64()
        .map(|w| w as u32)
        .unwrap_or(800);
    let height = window
        .inner_height()?
        .as_f64()
        .map(|h| h as u32)
        .unwrap_or(600);

    let (window, document, canvas) = init_canvas(width, height)?;
    setup_app(&window, &document, &canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
) -> Result<(), JsValue> {
    let width = canvas.width();
    let height = canvas.height();

    // Initialize GPU
    let gpu = GpuContext::new(canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e:?}")))?;

    // Camera sits behind the play volume looking down -z
    let camera = Rc::new(RefCell::new(Camera::new(width, height)));

    // Camera + lighting buffers and bind group
    let camera_resources = render::create_camera_resources(gpu.device.as_ref());
    let cam_buf = camera_resources.camera_buffer;
    let cam_bgl = camera_resources.bind_group_layout;
    let cam_bg = camera_resources.camera_bind_group;

    let cam_buf_data = Rc::new(RefCell::new(CameraUniform {
        view_proj: camera.borrow().view_proj().to_cols_array_2d(),
    }));
    gpu.queue
        .as_ref()
        .write_buffer(&cam_buf, 0, bytemuck::bytes_of(&*cam_buf_data.borrow()));

    let lighting_data = LightingUniform {
        sun_dir: [0.3, 0.5, 0.8],
        sun_intensity: 0.8,
        ambient: 0.4,
        _pad1: 0.0,
        _pad2: 0.0,
        _pad3: 0.0,
    };
    gpu.queue.as_ref().write_buffer(
        &camera_resources.lighting_buffer,
        0,
        bytemuck::bytes_of(&lighting_data),
    );

    // Depth texture
    let depth_format = wgpu::TextureFormat::Depth32Float;
    let (_depth_tex, depth_view) = render::create_depth_texture(gpu.device.as_ref(), width, height);
    let depth_view_cell: Rc<RefCell<wgpu::TextureView>> = Rc::new(RefCell::new(depth_view));

    // Per-draw transform buffer and pipelines
    let model_resources = render::create_model_resources(gpu.device.as_ref());
    let pipes = render::create_scene_pipelines(
        gpu.device.as_ref(),
        gpu.format,
        &cam_bgl,
        &model_resources.bind_group_layout,
        depth_format,
    );

    // Static geometry: red cone enemies, small red bullet spheres, and a
    // large inward-facing sphere carrying the starfield texture.
    let red = [1.0, 0.0, 0.0, 1.0];
    let enemy_mesh = utils::create_cone_mesh(1.0, 3.0, 8, red).upload(gpu.device.as_ref());
    let bullet_mesh = utils::create_sphere_mesh(0.1, 8, 8, red, false).upload(gpu.device.as_ref());
    let starfield_mesh = utils::create_sphere_mesh(500.0, 32, 32, [1.0, 1.0, 1.0, 1.0], true)
        .upload(gpu.device.as_ref());

    // The ship mesh and starfield texture arrive asynchronously; both slots
    // start with placeholders the loaders swap out.
    let ship_mesh: Rc<RefCell<Option<utils::MeshBuffer>>> = Rc::new(RefCell::new(None));
    let star_bind_group = Rc::new(RefCell::new(render::create_fallback_star_texture(
        gpu.device.as_ref(),
        gpu.queue.as_ref(),
        &pipes.star_bind_group_layout,
    )));

    // World and game state
    let world = Rc::new(RefCell::new(World::new()));
    let game_state = Rc::new(RefCell::new(GameState::new()));
    let input_state = Rc::new(RefCell::new(InputState::new()));

    // egui setup
    let egui_ctx = egui::Context::default();
    let egui_renderer = egui_wgpu::Renderer::new(
        gpu.device.as_ref(),
        gpu.format,
        egui_wgpu::RendererOptions::default(),
    );

    setup_input_listeners(
        document,
        window,
        input_state.clone(),
        game_state.clone(),
    )?;

    spawn_asset_loads(
        gpu.device.clone(),
        gpu.queue.clone(),
        ship_mesh.clone(),
        star_bind_group.clone(),
        pipes.star_bind_group_layout,
        world.clone(),
        game_state.clone(),
    );

    let mut render_state = render::RenderState {
        format: gpu.format,
        alpha_mode: gpu.config.alpha_mode,
        width,
        height,
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

    let mut frame_ctx = FrameLoopContext {
        camera: camera.clone(),
        world,
        input_state,
        game_state: game_state.clone(),
        input_processor: InputProcessor::default(),
        simulation: Simulation::new(),
        cam_buf,
        cam_buf_data,
        depth_view_cell,
        egui_ctx,
        last_time: Rc::new(RefCell::new(
            window.performance().map(|p| p.now()).unwrap_or(0.0),
        )),
    };

    // Continuous redraw using requestAnimationFrame; the loop stops
    // rescheduling once an exit has been requested.
    let f = RcCellCallback::new(window.clone(), {
        let window_for_loop = window.clone();

        move || {
            if !frame_ctx.game_state.borrow().is_running() {
                info!("exit requested, stopping frame loop");
                return false;
            }

            frame_ctx.update(
                gpu.device.as_ref(),
                gpu.queue.as_ref(),
                &window_for_loop,
                &gpu.surface,
                &mut render_state,
            );

            let world = frame_ctx.world.borrow();
            let eye = frame_ctx.camera.borrow().eye;
            let dv = frame_ctx.depth_view_cell.borrow();
            render_state.draw_frame(
                gpu.device.as_ref(),
                gpu.queue.as_ref(),
                &gpu.surface,
                &world,
                eye,
                &dv,
                &cam_bg,
            );
            true
        }
    });
    f.start();

    Ok(())
}

/// Kick off the two async asset fetches. Either may fail without stopping
/// the game: a failed ship leaves the world shipless, a failed starfield
/// keeps the flat fallback backdrop.
#[cfg(target_arch = "wasm32")]
fn spawn_asset_loads(
    device: std::sync::Arc<wgpu::Device>,
    queue: std::sync::Arc<wgpu::Queue>,
    ship_mesh: Rc<RefCell<Option<utils::MeshBuffer>>>,
    star_bind_group: Rc<RefCell<wgpu::BindGroup>>,
    star_layout: wgpu::BindGroupLayout,
    world: Rc<RefCell<World>>,
    game_state: Rc<RefCell<GameState>>,
) {
    {
        let device = device.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = match assets::fetch_bytes(assets::SHIP_MODEL_URL).await {
                Ok(bytes) => assets::decode_ship_mesh(&bytes).map_err(|e| e.to_string()),
                Err(e) => Err(format!("{e:?}")),
            };
            match result {
                Ok(mesh) => {
                    *ship_mesh.borrow_mut() = Some(mesh.upload(device.as_ref()));
                    world.borrow_mut().ship = Some(Ship::new());
                    game_state.borrow_mut().ship_load = ShipLoad::Ready;
                    info!("ship model loaded");
                }
                Err(e) => {
                    game_state.borrow_mut().ship_load = ShipLoad::Failed;
                    warn!("ship model load failed, continuing without a ship: {e}");
                }
            }
        });
    }

    wasm_bindgen_futures::spawn_local(async move {
        let result = match assets::fetch_bytes(assets::STARFIELD_URL).await {
            Ok(bytes) => assets::decode_starfield_rgba(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(format!("{e:?}")),
        };
        match result {
            Ok((pixels, w, h)) => {
                *star_bind_group.borrow_mut() = render::create_star_texture(
                    device.as_ref(),
                    queue.as_ref(),
                    &star_layout,
                    &pixels,
                    w,
                    h,
                );
                info!(width = w, height = h, "starfield texture loaded");
            }
            Err(e) => warn!("starfield load failed, keeping fallback backdrop: {e}"),
        }
    });
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    input_state: Rc<RefCell<InputState>>,
    game_state: Rc<RefCell<GameState>>,
) -> Result<(), JsValue> {
    let input_processor = InputProcessor::default();

    // Keyboard down
    {
        let input_state = input_state.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let key = e.key();

            if input_processor.is_escape(&key) {
                game_state.borrow_mut().request_exit();
            }

            // Keep movement keys from scrolling the page
            if matches!(
                key.as_str(),
                "w" | "a" | "s" | "d" | "W" | "A" | "S" | "D" | "Shift" | "Control"
            ) {
                e.prevent_default();
            }

            input_state
                .borrow_mut()
                .process_event(&InputEvent::KeyDown(key));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let input_state = input_state.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            input_state
                .borrow_mut()
                .process_event(&InputEvent::KeyUp(e.key()));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - clear all held keys
    {
        let input_state = input_state.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            input_state
                .borrow_mut()
                .process_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change - clear all held keys
    {
        let input_state = input_state.clone();
        let doc = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            input_state
                .borrow_mut()
                .process_event(&InputEvent::VisibilityChanged {
                    visible: !doc.hidden(),
                });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback(
            "visibilitychange",
            visibility.as_ref().unchecked_ref(),
        )?;
        visibility.forget();
    }

    // Mouse move: look input is gated on the right button being held
    {
        let input_state = input_state.clone();
        let window_for_move = window.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let free_look = e.buttons() & 2 != 0;
            let w = window_for_move
                .inner_width()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(800.0) as f32;
            let h = window_for_move
                .inner_height()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(600.0) as f32;
            let (x, y) =
                controller::input::normalized_pointer(e.client_x() as f32, e.client_y() as f32, w, h);
            input_state
                .borrow_mut()
                .process_event(&InputEvent::PointerMoved { x, y, free_look });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse down - left fires
    {
        let input_state = input_state.clone();
        let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
            input_state.borrow_mut().process_event(&InputEvent::MouseClick {
                button: MouseButton::from_web_button(e.button()),
                is_down: true,
            });
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }

    // Mouse up
    {
        let input_state = input_state.clone();
        let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
            input_state.borrow_mut().process_event(&InputEvent::MouseClick {
                button: MouseButton::from_web_button(e.button()),
                is_down: false,
            });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
        mouseup.forget();
    }

    // Context menu prevention - right button is the look gate
    {
        let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        document
            .add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
        contextmenu.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn init_canvas(width: u32, height: u32) -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// requestAnimationFrame driver. The wrapped closure returns whether the
/// loop should continue; returning false drops the reschedule.
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !inner.borrow_mut().as_mut()() {
                return;
            }

            // Recursively schedule next frame
            let cb_ref = callback_clone.borrow();
            window
                .request_animation_frame(cb_ref.as_ref().unwrap().as_ref().unchecked_ref())
                .expect("RAF failed");
        }) as Box<dyn FnMut()>));

        self.window
            .request_animation_frame(
                callback.borrow().as_ref().unwrap().as_ref().unchecked_ref(),
            )
            .expect("RAF start failed");

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}

use egui::Context;

use crate::controller::{GameState, ShipLoad};
use crate::model::{Camera, World};

/// Build the complete UI and return egui output
#[allow(clippy::too_many_arguments)]
pub fn build_ui(
    egui_ctx: &Context,
    camera: &Camera,
    game_state: &GameState,
    world: &World,
    canvas_width: u32,
    canvas_height: u32,
    dt: f32,
    now: f64,
) -> egui::FullOutput {
    let mut raw_input = egui::RawInput::default();
    raw_input.time = Some(now / 1000.0);
    raw_input.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::new(0.0, 0.0),
        egui::vec2(canvas_width as f32, canvas_height as f32),
    ));

    egui_ctx.run(raw_input, |ctx| {
        draw_overlay(ctx, camera, game_state, world, dt);
    })
}

/// The overlay itself, shared between the browser and native builds.
pub fn draw_overlay(
    ctx: &Context,
    camera: &Camera,
    game_state: &GameState,
    world: &World,
    dt: f32,
) {
    draw_crosshair(ctx);
    draw_debug_window(ctx, camera, game_state, world, dt);
}

fn draw_crosshair(ctx: &Context) {
    let painter =
        ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 10.0;
    painter.line_segment(
        [
            egui::Pos2::new(center.x - size, center.y),
            egui::Pos2::new(center.x + size, center.y),
        ],
        egui::Stroke::new(1.0, egui::Color32::WHITE),
    );
    painter.line_segment(
        [
            egui::Pos2::new(center.x, center.y - size),
            egui::Pos2::new(center.x, center.y + size),
        ],
        egui::Stroke::new(1.0, egui::Color32::WHITE),
    );
}

fn draw_debug_window(
    ctx: &Context,
    camera: &Camera,
    game_state: &GameState,
    world: &World,
    dt: f32,
) {
    let ship_line = match (&world.ship, game_state.ship_load) {
        (Some(ship), _) => format!(
            "Ship: x: {:.2} y: {:.2} z: {:.2}",
            ship.position.x, ship.position.y, ship.position.z
        ),
        (None, ShipLoad::Failed) => "Ship: load failed".to_string(),
        (None, _) => "Ship: loading...".to_string(),
    };

    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("FPS: {:.0}", if dt > 0.0 { 1.0 / dt } else { 0.0 }))
                    .small(),
            );
            ui.label(egui::RichText::new(ship_line).small());
            ui.label(
                egui::RichText::new(format!(
                    "Bullets: {}  Enemies: {}",
                    world.bullets.len(),
                    world.enemies.len()
                ))
                .small(),
            );
            ui.label(
                egui::RichText::new(format!(
                    "Yaw: {:.2} Pitch: {:.2}",
                    camera.yaw.to_degrees(),
                    camera.pitch.to_degrees()
                ))
                .small(),
            );
            ui.label(egui::RichText::new(format!("Frame: {}", game_state.frame)).small());
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("WASD - Move").small());
            ui.label(egui::RichText::new("Shift - Up").small());
            ui.label(egui::RichText::new("Ctrl - Down").small());
            ui.label(egui::RichText::new("Left click - Fire").small());
            ui.label(egui::RichText::new("Right drag - Look").small());
            ui.label(egui::RichText::new("Esc - Quit").small());
        });
}

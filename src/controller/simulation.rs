use crate::controller::input::InputFrame;
use crate::model::entities::SHIP_MOVE_STEP;
use crate::model::{Camera, World};

/// Per-frame update rules. Pure state mutation - no timing, no GPU - so the
/// whole thing is testable off the render loop.
pub struct Simulation;

impl Simulation {
    pub fn new() -> Self {
        Self
    }

    /// Advance the world by one frame. Steps have no ordering dependency:
    /// ship movement, bullet advance + cull, enemy advance + wrap, camera look.
    pub fn step(&self, world: &mut World, input: &InputFrame, camera: &mut Camera) {
        if let Some(ship) = world.ship.as_mut() {
            if input.forward {
                ship.position.z -= SHIP_MOVE_STEP;
            }
            if input.back {
                ship.position.z += SHIP_MOVE_STEP;
            }
            if input.left {
                ship.position.x -= SHIP_MOVE_STEP;
            }
            if input.right {
                ship.position.x += SHIP_MOVE_STEP;
            }
            if input.up {
                ship.position.y += SHIP_MOVE_STEP;
            }
            if input.down {
                ship.position.y -= SHIP_MOVE_STEP;
            }
        }

        // retain_mut compacts in place without the skip-on-removal bug of
        // forward splicing: every bullet is advanced exactly once.
        world.bullets.retain_mut(|bullet| {
            bullet.advance();
            !bullet.is_out_of_bounds()
        });

        for idx in 0..world.enemies.len() {
            world.enemies[idx].advance();
            if world.enemies[idx].is_past_player() {
                let depth = world.respawn_depth();
                world.enemies[idx].position.z = depth;
            }
        }

        // Camera look tracks the ship the same way movement does: no ship,
        // no orientation change.
        if world.ship.is_some() {
            camera.set_look(input.look.0, input.look.1);
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entities::{Bullet, Enemy, Ship, BULLET_CULL_Z};
    use glam::Vec3;

    fn fixture() -> (Simulation, World, Camera) {
        let mut world = World::from_seed(1);
        world.enemies.clear();
        (Simulation::new(), world, Camera::new(800, 600))
    }

    fn held(frame_fn: impl Fn(&mut InputFrame)) -> InputFrame {
        let mut frame = InputFrame::default();
        frame_fn(&mut frame);
        frame
    }

    #[test]
    fn absent_ship_freezes_movement_and_camera() {
        let (sim, mut world, mut camera) = fixture();
        let input = held(|f| {
            f.forward = true;
            f.up = true;
            f.look = (1.0, 1.0);
        });

        let (yaw, pitch) = (camera.yaw, camera.pitch);
        for _ in 0..10 {
            sim.step(&mut world, &input, &mut camera);
        }

        assert!(world.ship.is_none());
        assert_eq!(camera.yaw, yaw);
        assert_eq!(camera.pitch, pitch);
    }

    #[test]
    fn held_keys_move_ship_by_fixed_steps() {
        let (sim, mut world, mut camera) = fixture();
        world.ship = Some(Ship::new());
        let input = held(|f| {
            f.forward = true;
            f.right = true;
            f.down = true;
        });

        for _ in 0..4 {
            sim.step(&mut world, &input, &mut camera);
        }

        let pos = world.ship.as_ref().unwrap().position;
        assert!((pos.x - 0.2).abs() < 1e-6);
        assert!((pos.y + 0.2).abs() < 1e-6);
        assert!((pos.z + 0.2).abs() < 1e-6);
    }

    #[test]
    fn opposed_keys_cancel_out() {
        let (sim, mut world, mut camera) = fixture();
        world.ship = Some(Ship::new());
        let input = held(|f| {
            f.left = true;
            f.right = true;
        });

        sim.step(&mut world, &input, &mut camera);
        assert_eq!(world.ship.as_ref().unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn bullet_position_is_linear_in_frame_count() {
        let (sim, mut world, mut camera) = fixture();
        let start = Vec3::new(2.0, -1.0, 0.0);
        world.bullets.push(Bullet::new(start));
        let velocity = world.bullets[0].velocity;
        let input = InputFrame::default();

        for n in 1..=40 {
            sim.step(&mut world, &input, &mut camera);
            assert_eq!(world.bullets[0].position, start + velocity * n as f32);
        }
    }

    #[test]
    fn bullet_culling_is_exact_at_the_boundary() {
        let (sim, mut world, mut camera) = fixture();
        // One bullet that lands exactly on -50, one that crosses it
        world.bullets.push(Bullet::new(Vec3::new(0.0, 0.0, BULLET_CULL_Z + 0.5)));
        world.bullets.push(Bullet::new(Vec3::new(0.0, 0.0, BULLET_CULL_Z + 0.25)));
        let input = InputFrame::default();

        sim.step(&mut world, &input, &mut camera);
        assert_eq!(world.bullets.len(), 1);
        assert_eq!(world.bullets[0].position.z, BULLET_CULL_Z);

        sim.step(&mut world, &input, &mut camera);
        assert!(world.bullets.is_empty());
    }

    #[test]
    fn culling_mid_scan_advances_every_bullet() {
        let (sim, mut world, mut camera) = fixture();
        // out, in, out, in: naive forward splicing would skip the elements
        // after each removed one
        for z in [-50.4, 0.0, -50.2, 1.0] {
            world.bullets.push(Bullet::new(Vec3::new(0.0, 0.0, z)));
        }
        let input = InputFrame::default();

        sim.step(&mut world, &input, &mut camera);
        assert_eq!(world.bullets.len(), 2);
        assert_eq!(world.bullets[0].position.z, -0.5);
        assert_eq!(world.bullets[1].position.z, 0.5);
    }

    #[test]
    fn enemy_depth_advances_until_wrap() {
        let (sim, mut world, mut camera) = fixture();
        world.enemies.push(Enemy::new(Vec3::new(3.0, 1.0, 0.0)));
        let input = InputFrame::default();

        for n in 1..=100 {
            sim.step(&mut world, &input, &mut camera);
            let z = world.enemies[0].position.z;
            assert!((z - 0.1 * n as f32).abs() < 1e-4, "frame {n}: z = {z}");
        }
        // x and y never change
        assert_eq!(world.enemies[0].position.x, 3.0);
        assert_eq!(world.enemies[0].position.y, 1.0);
    }

    #[test]
    fn enemy_wraps_within_the_crossing_frame() {
        let (sim, mut world, mut camera) = fixture();
        world.enemies.push(Enemy::new(Vec3::new(0.0, 0.0, 49.95)));
        let input = InputFrame::default();

        // 49.95 + 0.1 crosses 50, so the same frame resets the depth
        sim.step(&mut world, &input, &mut camera);
        let reset_z = world.enemies[0].position.z;
        assert!((-70.0..=-20.0).contains(&reset_z), "reset out of range: {reset_z}");

        sim.step(&mut world, &input, &mut camera);
        assert!((world.enemies[0].position.z - (reset_z + 0.1)).abs() < 1e-5);
    }

    #[test]
    fn fired_bullet_lives_exactly_101_frames() {
        let (sim, mut world, mut camera) = fixture();
        world.ship = Some(Ship::new());
        assert!(world.fire());
        let input = InputFrame::default();

        // 100 frames at -0.5/frame puts the bullet exactly on the boundary
        for _ in 0..100 {
            sim.step(&mut world, &input, &mut camera);
        }
        assert_eq!(world.bullets.len(), 1);
        assert_eq!(world.bullets[0].position.z, -50.0);

        // frame 101 reaches -50.5, strictly past the plane, and culls it
        sim.step(&mut world, &input, &mut camera);
        assert!(world.bullets.is_empty());
    }

    #[test]
    fn camera_tracks_look_while_ship_present() {
        let (sim, mut world, mut camera) = fixture();
        world.ship = Some(Ship::new());
        let input = held(|f| f.look = (0.8, -0.4));

        sim.step(&mut world, &input, &mut camera);
        assert!((camera.yaw - 0.4).abs() < 1e-6);
        assert!((camera.pitch + 0.2).abs() < 1e-6);
    }
}

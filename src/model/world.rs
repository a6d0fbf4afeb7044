use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::entities::{Bullet, Enemy, Ship, ENEMY_COUNT};

/// Owned game state: the optional player ship plus the bullet and enemy
/// collections. Single-writer: only the frame loop mutates it, so no
/// locking is needed on either target.
pub struct World {
    pub ship: Option<Ship>,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    rng: SmallRng,
}

impl World {
    /// Build a world with the startup enemy wave already spawned.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Seeded constructor so simulation tests are deterministic.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: SmallRng) -> Self {
        let enemies = (0..ENEMY_COUNT)
            .map(|_| Enemy::new(spawn_position(&mut rng)))
            .collect();

        Self {
            ship: None,
            bullets: Vec::new(),
            enemies,
            rng,
        }
    }

    /// Spawn one bullet at the ship position. No-op while the ship model has
    /// not loaded, firing without a ship must never create a bullet.
    pub fn fire(&mut self) -> bool {
        match &self.ship {
            Some(ship) => {
                self.bullets.push(Bullet::new(ship.position));
                debug!(live = self.bullets.len(), "bullet fired");
                true
            }
            None => false,
        }
    }

    /// Fresh randomized depth for an enemy that crossed the near boundary:
    /// `-(r * 50 + 20)` with r uniform in [0, 1).
    pub fn respawn_depth(&mut self) -> f32 {
        -(self.rng.gen::<f32>() * 50.0 + 20.0)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Startup enemy placement: x in [-15, 15), y in [-5, 5), z in [-70, -20)
fn spawn_position(rng: &mut SmallRng) -> Vec3 {
    Vec3::new(
        rng.gen::<f32>() * 30.0 - 15.0,
        rng.gen::<f32>() * 10.0 - 5.0,
        -(rng.gen::<f32>() * 50.0 + 20.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entities::BULLET_VELOCITY;

    #[test]
    fn startup_wave_is_spawned_in_range() {
        let world = World::from_seed(7);
        assert_eq!(world.enemies.len(), ENEMY_COUNT);
        for enemy in &world.enemies {
            let p = enemy.position;
            assert!((-15.0..15.0).contains(&p.x), "x out of range: {}", p.x);
            assert!((-5.0..5.0).contains(&p.y), "y out of range: {}", p.y);
            assert!((-70.0..=-20.0).contains(&p.z), "z out of range: {}", p.z);
        }
    }

    #[test]
    fn fire_without_ship_creates_no_bullet() {
        let mut world = World::from_seed(0);
        assert!(world.ship.is_none());
        assert!(!world.fire());
        assert!(world.bullets.is_empty());
    }

    #[test]
    fn fire_spawns_bullet_at_ship_position() {
        let mut world = World::from_seed(0);
        let mut ship = Ship::new();
        ship.position = Vec3::new(1.0, -2.0, 3.0);
        world.ship = Some(ship);

        assert!(world.fire());
        assert_eq!(world.bullets.len(), 1);
        assert_eq!(world.bullets[0].position, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(world.bullets[0].velocity, BULLET_VELOCITY);
    }

    #[test]
    fn respawn_depth_lands_in_far_range() {
        let mut world = World::from_seed(42);
        for _ in 0..1000 {
            let z = world.respawn_depth();
            assert!((-70.0..=-20.0).contains(&z), "depth out of range: {z}");
        }
    }
}

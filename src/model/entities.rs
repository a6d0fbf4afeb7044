use glam::Vec3;

/// Fixed per-frame ship movement step along each axis
pub const SHIP_MOVE_STEP: f32 = 0.05;

/// Muzzle velocity of a bullet (straight down the -z axis)
pub const BULLET_VELOCITY: Vec3 = Vec3::new(0.0, 0.0, -0.5);

/// Bullets past this depth are culled
pub const BULLET_CULL_Z: f32 = -50.0;

/// Per-frame depth advance of an enemy towards the player
pub const ENEMY_STEP_Z: f32 = 0.1;

/// Enemies past this depth wrap back into the far spawn range
pub const ENEMY_WRAP_Z: f32 = 50.0;

/// Number of enemies spawned at startup (never destroyed, only wrapped)
pub const ENEMY_COUNT: usize = 5;

/// The player ship. Exists only after the async model load succeeds;
/// `World.ship` stays `None` forever if the load fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub position: Vec3,
}

impl Ship {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }
}

impl Default for Ship {
    fn default() -> Self {
        Self::new()
    }
}

/// A fired projectile: position plus a constant velocity. Lifecycle is
/// create-on-fire, advance every frame, cull past `BULLET_CULL_Z`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl Bullet {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: BULLET_VELOCITY,
        }
    }

    /// One frame of linear motion
    pub fn advance(&mut self) {
        self.position += self.velocity;
    }

    /// True once the bullet has crossed the far culling plane
    pub fn is_out_of_bounds(&self) -> bool {
        self.position.z < BULLET_CULL_Z
    }
}

/// An enemy craft. No identity beyond its position: crossing the near
/// boundary wraps it back to a randomized depth, so the wave never ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub position: Vec3,
}

impl Enemy {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }

    /// One frame of drift towards the player
    pub fn advance(&mut self) {
        self.position.z += ENEMY_STEP_Z;
    }

    /// True once the enemy has drifted past the player
    pub fn is_past_player(&self) -> bool {
        self.position.z > ENEMY_WRAP_Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_advances_by_velocity() {
        let mut bullet = Bullet::new(Vec3::new(1.0, 2.0, 3.0));
        bullet.advance();
        assert_eq!(bullet.position, Vec3::new(1.0, 2.0, 2.5));
    }

    #[test]
    fn bullet_out_of_bounds_is_strict() {
        let mut bullet = Bullet::new(Vec3::ZERO);
        bullet.position.z = BULLET_CULL_Z;
        assert!(!bullet.is_out_of_bounds(), "exactly -50 is still in bounds");
        bullet.position.z = BULLET_CULL_Z - f32::EPSILON * 64.0;
        assert!(bullet.is_out_of_bounds());
    }

    #[test]
    fn enemy_wrap_threshold_is_strict() {
        let mut enemy = Enemy::new(Vec3::new(0.0, 0.0, ENEMY_WRAP_Z));
        assert!(!enemy.is_past_player(), "exactly 50 has not crossed yet");
        enemy.advance();
        assert!(enemy.is_past_player());
    }
}

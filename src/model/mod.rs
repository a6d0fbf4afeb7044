// MODEL: Game state and data
pub mod camera;
pub mod entities;
pub mod world;

pub use camera::Camera;
pub use entities::{Bullet, Enemy, Ship};
pub use world::World;

// CONTROLLER: Input, game logic, and update loop
pub mod frame_loop;
pub mod game_state;
pub mod input;
pub mod simulation;

pub use frame_loop::{CameraUniform, FrameLoopContext, LightingUniform};
pub use game_state::{GameState, ShipLoad};
pub use input::{InputEvent, InputFrame, InputProcessor, InputState, MouseButton};
pub use simulation::Simulation;

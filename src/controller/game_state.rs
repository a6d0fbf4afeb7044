/// Where the async ship-model load currently stands. `Failed` is permanent:
/// ship movement and camera look stay disabled, the rest of the scene runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipLoad {
    Loading,
    Ready,
    Failed,
}

/// Run-state of the game loop. `running` is the cancellation token: the
/// frame loop reschedules itself only while it is set, so shutdown is an
/// explicit transition instead of implicit page teardown.
pub struct GameState {
    pub running: bool,
    pub frame: u64,
    pub ship_load: ShipLoad,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            running: true,
            frame: 0,
            ship_load: ShipLoad::Loading,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_exit(&mut self) {
        self.running = false;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_request_stops_the_loop() {
        let mut state = GameState::new();
        assert!(state.is_running());
        state.request_exit();
        assert!(!state.is_running());
    }
}

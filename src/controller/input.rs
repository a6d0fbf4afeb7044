/// Platform-agnostic input handling system
use std::collections::HashSet;

/// Platform-independent input events
#[derive(Debug, Clone)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Mouse events
    /// Pointer position normalized to [-1, 1] per axis (y up). `free_look`
    /// is true while the right button is held - look input is gated on it.
    PointerMoved { x: f32, y: f32, free_look: bool },
    MouseClick { button: MouseButton, is_down: bool },

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Normalize a client-space pointer position to [-1, 1] per axis, y up.
pub fn normalized_pointer(px: f32, py: f32, width: f32, height: f32) -> (f32, f32) {
    (px / width * 2.0 - 1.0, -(py / height * 2.0 - 1.0))
}

/// Shared input state. Written by event handlers, sampled once per frame.
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    /// Last free-look pointer position, normalized. Holds its value when the
    /// gating button is released (matching the original free-look behavior).
    pub look: (f32, f32),
    fire_presses: u32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
            look: (0.0, 0.0),
            fire_presses: 0,
        }
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.pressed_keys.insert(key.clone());
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(key.as_str());
            }
            InputEvent::PointerMoved { x, y, free_look } => {
                if *free_look {
                    self.look = (*x, *y);
                }
            }
            InputEvent::MouseClick { button, is_down } => {
                if *button == MouseButton::Left && *is_down {
                    self.fire_presses += 1;
                }
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {
                self.clear_keys();
            }
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    /// Take the fire presses accumulated since the last frame.
    pub fn consume_fire_presses(&mut self) -> u32 {
        std::mem::take(&mut self.fire_presses)
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-frame input snapshot the simulation consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub look: (f32, f32),
}

/// Key mapping configuration
#[derive(Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub ascend: String,
    pub descend: String,
    pub escape: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            ascend: "Shift".to_string(),
            descend: "Control".to_string(),
            escape: "Escape".to_string(),
        }
    }
}

/// Maps raw key state to the movement flags the simulation understands.
#[derive(Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn is_escape(&self, key: &str) -> bool {
        key == self.bindings.escape
    }

    /// Snapshot the shared state into an immutable frame record.
    pub fn sample(&self, input: &InputState) -> InputFrame {
        let b = &self.bindings;
        InputFrame {
            forward: pressed_ci(input, &b.forward),
            back: pressed_ci(input, &b.backward),
            left: pressed_ci(input, &b.left),
            right: pressed_ci(input, &b.right),
            up: input.is_key_pressed(&b.ascend),
            down: input.is_key_pressed(&b.descend),
            look: input.look,
        }
    }
}

/// Letter keys arrive as "w" or "W" depending on Shift - accept both.
fn pressed_ci(input: &InputState, key: &str) -> bool {
    input.is_key_pressed(key) || input.is_key_pressed(&key.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_events_toggle_movement_flags() {
        let mut state = InputState::new();
        let processor = InputProcessor::default();

        state.process_event(&InputEvent::KeyDown("w".into()));
        state.process_event(&InputEvent::KeyDown("Shift".into()));
        let frame = processor.sample(&state);
        assert!(frame.forward && frame.up);
        assert!(!frame.back && !frame.left && !frame.right && !frame.down);

        state.process_event(&InputEvent::KeyUp("w".into()));
        assert!(!processor.sample(&state).forward);
    }

    #[test]
    fn shifted_letter_keys_still_count() {
        let mut state = InputState::new();
        state.process_event(&InputEvent::KeyDown("W".into()));
        assert!(InputProcessor::default().sample(&state).forward);
    }

    #[test]
    fn look_only_updates_while_gated() {
        let mut state = InputState::new();
        state.process_event(&InputEvent::PointerMoved {
            x: 0.5,
            y: -0.25,
            free_look: true,
        });
        assert_eq!(state.look, (0.5, -0.25));

        // Ungated movement leaves the look values where they were
        state.process_event(&InputEvent::PointerMoved {
            x: -1.0,
            y: 1.0,
            free_look: false,
        });
        assert_eq!(state.look, (0.5, -0.25));
    }

    #[test]
    fn fire_presses_accumulate_and_drain() {
        let mut state = InputState::new();
        for _ in 0..3 {
            state.process_event(&InputEvent::MouseClick {
                button: MouseButton::Left,
                is_down: true,
            });
        }
        state.process_event(&InputEvent::MouseClick {
            button: MouseButton::Left,
            is_down: false,
        });
        state.process_event(&InputEvent::MouseClick {
            button: MouseButton::Right,
            is_down: true,
        });
        assert_eq!(state.consume_fire_presses(), 3);
        assert_eq!(state.consume_fire_presses(), 0);
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::new();
        state.process_event(&InputEvent::KeyDown("d".into()));
        state.process_event(&InputEvent::FocusLost);
        assert!(!state.is_key_pressed("d"));
    }

    #[test]
    fn pointer_normalization_maps_corners() {
        assert_eq!(normalized_pointer(0.0, 0.0, 800.0, 600.0), (-1.0, 1.0));
        assert_eq!(normalized_pointer(800.0, 600.0, 800.0, 600.0), (1.0, -1.0));
        assert_eq!(normalized_pointer(400.0, 300.0, 800.0, 600.0), (0.0, 0.0));
    }
}

use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton};

/// Input that arrived since the previous frame.
///
/// [`InputState`](super::InputState) holds what is down right now; this holds
/// the transitions, so a press and release inside one frame still registers.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    /// Presses including key repeat.
    pub keys_pressed: Vec<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    pub pointer_moved: bool,
    pub pointer_left: bool,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_moved = false;
        self.pointer_left = false;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }
}

use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, PointerButtonEvent,
    PointerMoveEvent,
};

/// What is held down right now, for one window.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,

    /// Logical pixels; `None` while the pointer is outside the window.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Folds `ev` into the held state and records the transition in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases that happen while unfocused never arrive.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.pointer_pos = Some((*x, *y));
                frame.pointer_moved = true;
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
                frame.pointer_left = true;
            }

            InputEvent::Key {
                key,
                state,
                modifiers,
                repeat,
            } => {
                self.modifiers = *modifiers;
                match state {
                    KeyState::Pressed => {
                        let fresh = self.keys_down.insert(*key);
                        if fresh || *repeat {
                            frame.keys_pressed.push(*key);
                        }
                    }
                    KeyState::Released => {
                        self.keys_down.remove(key);
                    }
                }
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                x,
                y,
                modifiers,
            }) => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;
                match state {
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(*button) {
                            frame.buttons_pressed.insert(*button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(button) {
                            frame.buttons_released.insert(*button);
                        }
                    }
                }
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            modifiers: Modifiers::default(),
            repeat,
        }
    }

    fn button(state: MouseButtonState) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state,
            x: 10.0,
            y: 20.0,
            modifiers: Modifiers::default(),
        })
    }

    #[test]
    fn press_and_release_in_one_frame_both_register() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, button(MouseButtonState::Pressed));
        s.apply_event(&mut f, button(MouseButtonState::Released));
        assert!(f.buttons_pressed.contains(&MouseButton::Left));
        assert!(f.buttons_released.contains(&MouseButton::Left));
        assert!(!s.button_down(MouseButton::Left));
        assert_eq!(s.pointer_pos, Some((10.0, 20.0)));
    }

    #[test]
    fn key_repeat_is_reported_as_a_press() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::ArrowUp, KeyState::Pressed, false));
        s.apply_event(&mut f, key(Key::ArrowUp, KeyState::Pressed, true));
        s.apply_event(&mut f, key(Key::ArrowUp, KeyState::Pressed, false));
        assert_eq!(f.keys_pressed, vec![Key::ArrowUp, Key::ArrowUp]);
        assert!(s.key_down(Key::ArrowUp));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::Char('a'), KeyState::Pressed, false));
        s.apply_event(&mut f, button(MouseButtonState::Pressed));
        s.apply_event(&mut f, InputEvent::Focused(false));
        assert!(s.keys_down.is_empty());
        assert!(s.buttons_down.is_empty());
    }

    #[test]
    fn pointer_leave_clears_position() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, InputEvent::PointerMoved(PointerMoveEvent { x: 1.0, y: 2.0 }));
        s.apply_event(&mut f, InputEvent::PointerLeft);
        assert!(s.pointer_pos.is_none());
        assert!(f.pointer_moved && f.pointer_left);

        f.clear();
        assert!(f.events.is_empty() && !f.pointer_moved);
    }
}

use std::collections::HashSet;
use winit::{
    event::{
        ElementState,
        KeyEvent,
    },
    keyboard::{
        KeyCode,
        PhysicalKey,
    },
};

/// Keys held down and horizontal cursor travel since the last frame.
#[derive(Debug, Default)]
pub struct Input {
    pressed: HashSet<KeyCode>,
    last_cursor_x: Option<f64>,
    cursor_dx: f64,
}

impl Input {
    pub fn key_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.set_key(code, event.state == ElementState::Pressed);
        }
    }

    pub fn set_key(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.pressed.insert(code);
        } else {
            self.pressed.remove(&code);
        }
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn cursor_moved(&mut self, x: f64) {
        if let Some(last_x) = self.last_cursor_x {
            self.cursor_dx += x - last_x;
        }
        self.last_cursor_x = Some(x);
    }

    /// Horizontal travel accumulated since the previous call.
    pub fn take_cursor_dx(&mut self) -> f32 {
        std::mem::take(&mut self.cursor_dx) as f32
    }

    /// `(right, forward)` in camera space from WASD, each in -1..=1.
    pub fn movement_axes(&self) -> (f32, f32) {
        let axis = |positive: KeyCode, negative: KeyCode| {
            self.is_pressed(positive) as i32 as f32 - self.is_pressed(negative) as i32 as f32
        };
        (
            axis(KeyCode::KeyD, KeyCode::KeyA),
            axis(KeyCode::KeyW, KeyCode::KeyS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_keys_cancel() {
        let mut input = Input::default();
        input.set_key(KeyCode::KeyW, true);
        input.set_key(KeyCode::KeyA, true);
        assert_eq!(input.movement_axes(), (-1.0, 1.0));

        input.set_key(KeyCode::KeyS, true);
        input.set_key(KeyCode::KeyD, true);
        assert_eq!(input.movement_axes(), (0.0, 0.0));

        input.set_key(KeyCode::KeyW, false);
        assert_eq!(input.movement_axes(), (0.0, -1.0));
    }

    #[test]
    fn first_cursor_event_only_anchors() {
        let mut input = Input::default();
        input.cursor_moved(100.0);
        assert_eq!(input.take_cursor_dx(), 0.0);

        input.cursor_moved(110.0);
        input.cursor_moved(105.0);
        assert_eq!(input.take_cursor_dx(), 5.0);
        assert_eq!(input.take_cursor_dx(), 0.0);
    }
}

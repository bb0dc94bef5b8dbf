use serde::{Deserialize, Serialize};

/// Remembers a press edge for a short window so slightly early presses still count.
#[derive(Debug, Clone)]
pub struct BufferedInput {
    pub buffer_time: f32,
    since_press: f32,
    held: bool,
}

impl Default for BufferedInput {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl BufferedInput {
    pub fn new(buffer_time: f32) -> Self {
        Self {
            buffer_time,
            since_press: f32::INFINITY,
            held: false,
        }
    }

    pub fn update(&mut self, pressed: bool, dt: f32) {
        self.since_press += dt;
        if pressed && !self.held {
            self.since_press = 0.0;
        }
        self.held = pressed;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// A press edge happened within the buffer window and has not been consumed.
    pub fn pressed(&self) -> bool {
        self.since_press <= self.buffer_time
    }

    pub fn reset(&mut self) {
        self.since_press = f32::INFINITY;
    }
}

/// One tick of sampled player controls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_y: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub jump: bool,
    pub punch: bool,
    pub sprint: bool,
    pub block: bool,
    pub dodge: bool,
    pub roll: bool,
    pub primary: bool,
    pub secondary: bool,
    pub select_loadout: Option<u8>,
}

impl PlayerInput {
    pub fn movement_magnitude(&self) -> f32 {
        (self.move_x * self.move_x + self.move_y * self.move_y).sqrt()
    }
}

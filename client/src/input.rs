//! Client input sources with sequencing for owner updates

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::input::PlayerInput;
use shared::loadout::MAX_LOADOUTS;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Anything that can produce one tick of player controls.
pub trait InputSource: Send {
    fn sample(&mut self, dt: f32) -> PlayerInput;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Intent {
    Idle,
    Walk { x: f32, y: f32 },
    Sprint,
    Turn { rate: f32 },
    Punch,
    Swing,
    Secondary,
    Block,
    Dodge,
    Roll,
    Jump,
    Select(u8),
}

/// Seeded bot that wanders, fights and switches loadouts.
///
/// Instant intents press their button for a single sample so each one produces exactly
/// one press edge.
pub struct ScriptedInput {
    rng: StdRng,
    intent: Intent,
    remaining: f32,
    pressed: bool,
    yaw: f32,
}

impl ScriptedInput {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            intent: Intent::Idle,
            remaining: 0.0,
            pressed: false,
            yaw: 0.0,
        }
    }

    fn next_intent(&mut self) -> Intent {
        match self.rng.gen_range(0..12) {
            0 => Intent::Idle,
            1 | 2 => Intent::Walk {
                x: self.rng.gen_range(-1.0..=1.0),
                y: self.rng.gen_range(-1.0..=1.0),
            },
            3 => Intent::Sprint,
            4 => Intent::Turn {
                rate: self.rng.gen_range(-180.0..=180.0),
            },
            5 => Intent::Punch,
            6 => Intent::Swing,
            7 => Intent::Secondary,
            8 => Intent::Block,
            9 => {
                if self.rng.gen_bool(0.5) {
                    Intent::Dodge
                } else {
                    Intent::Roll
                }
            }
            10 => Intent::Jump,
            _ => Intent::Select(self.rng.gen_range(0..MAX_LOADOUTS as u8)),
        }
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self, dt: f32) -> PlayerInput {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.intent = self.next_intent();
            self.remaining = self.rng.gen_range(0.5..2.0);
            self.pressed = false;
        }

        let mut input = PlayerInput {
            yaw: self.yaw,
            ..Default::default()
        };

        // Fires once per intent.
        let edge = !self.pressed;
        match self.intent {
            Intent::Idle => {}
            Intent::Walk { x, y } => {
                input.move_x = x;
                input.move_y = y;
            }
            Intent::Sprint => {
                input.move_y = 1.0;
                input.sprint = true;
            }
            Intent::Turn { rate } => {
                self.yaw = (self.yaw + rate * dt).rem_euclid(360.0);
                input.yaw = self.yaw;
            }
            Intent::Block => input.block = true,
            Intent::Punch => input.punch = edge,
            Intent::Swing => input.primary = edge,
            Intent::Secondary => input.secondary = edge,
            Intent::Dodge => input.dodge = edge,
            Intent::Roll => input.roll = edge,
            Intent::Jump => input.jump = edge,
            Intent::Select(index) => {
                if edge {
                    input.select_loadout = Some(index);
                }
            }
        }
        self.pressed = true;

        input
    }
}

/// Samples an input source and numbers the resulting owner updates.
pub struct InputManager {
    source: Box<dyn InputSource>,
    next_sequence: u32,
    current_input: PlayerInput,
}

impl InputManager {
    pub fn new(source: Box<dyn InputSource>) -> Self {
        Self {
            source,
            next_sequence: 1,
            current_input: PlayerInput::default(),
        }
    }

    pub fn update(&mut self, dt: f32) -> PlayerInput {
        self.current_input = self.source.sample(dt);
        self.current_input
    }

    /// Sequence number and timestamp for the next owner update.
    pub fn next_stamp(&mut self) -> (u32, u64) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        (sequence, Self::get_timestamp())
    }

    pub fn get_current_input(&self) -> &PlayerInput {
        &self.current_input
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: u64, ticks: usize) -> Vec<PlayerInput> {
        let mut input = ScriptedInput::new(seed);
        (0..ticks).map(|_| input.sample(1.0 / 60.0)).collect()
    }

    #[test]
    fn test_scripted_input_is_deterministic() {
        assert_eq!(record(7, 600), record(7, 600));
        assert_ne!(record(7, 600), record(8, 600));
    }

    #[test]
    fn test_presses_are_single_edges() {
        let inputs = record(3, 3000);
        for pair in inputs.windows(2) {
            assert!(!(pair[0].punch && pair[1].punch));
            assert!(!(pair[0].primary && pair[1].primary));
            assert!(!(pair[0].dodge && pair[1].dodge));
            assert!(pair[1].select_loadout.is_none() || pair[0].select_loadout.is_none());
        }
    }

    #[test]
    fn test_scripted_input_stays_in_range() {
        for input in record(11, 3000) {
            assert!(input.move_x.abs() <= 1.0 && input.move_y.abs() <= 1.0);
            assert!((0.0..360.0).contains(&input.yaw));
            if let Some(index) = input.select_loadout {
                assert!((index as usize) < MAX_LOADOUTS);
            }
        }
    }

    #[test]
    fn test_input_manager_sequences() {
        let mut manager = InputManager::new(Box::new(ScriptedInput::new(1)));
        assert_eq!(manager.next_sequence, 1);
        manager.update(0.016);

        let (first, _) = manager.next_stamp();
        let (second, _) = manager.next_stamp();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn test_get_timestamp() {
        let timestamp1 = InputManager::get_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let timestamp2 = InputManager::get_timestamp();
        assert!(timestamp2 > timestamp1);
    }
}

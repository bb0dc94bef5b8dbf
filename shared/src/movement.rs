//! Contract with the character-controller collaborator.

use glam::Vec3;

pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
const GROUND_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundedState {
    pub standing_on_ground: bool,
    pub sliding: bool,
    pub falling: bool,
    /// Surface angle in degrees.
    pub angle: f32,
    pub surface_normal: Vec3,
}

impl GroundedState {
    pub fn on_walkable_ground(&self) -> bool {
        self.standing_on_ground && !self.sliding
    }
}

pub trait MovementEngine: Send {
    fn grounded_state(&self) -> GroundedState;

    fn move_by(&mut self, delta: Vec3);

    fn position(&self) -> Vec3;

    fn teleport(&mut self, position: Vec3);

    fn up(&self) -> Vec3 {
        Vec3::Y
    }
}

/// Infinite horizontal floor with a configurable surface slope.
#[derive(Debug, Clone)]
pub struct FlatGroundEngine {
    position: Vec3,
    pub ground_height: f32,
    pub slope_angle: f32,
    pub max_walk_angle: f32,
}

impl FlatGroundEngine {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ground_height: 0.0,
            slope_angle: 0.0,
            max_walk_angle: 60.0,
        }
    }
}

impl MovementEngine for FlatGroundEngine {
    fn grounded_state(&self) -> GroundedState {
        let grounded = self.position.y <= self.ground_height + GROUND_EPSILON;
        let steep = self.slope_angle > self.max_walk_angle;
        GroundedState {
            standing_on_ground: grounded,
            sliding: grounded && steep,
            falling: !grounded,
            angle: self.slope_angle,
            surface_normal: Vec3::Y,
        }
    }

    fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        if self.position.y < self.ground_height {
            self.position.y = self.ground_height;
        }
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn teleport(&mut self, position: Vec3) {
        self.position = position;
    }
}

/// Speed falloff over a dodge or roll, `x` being normalized progress.
pub fn dodge_speed_factor(x: f32) -> f32 {
    (-(x * x)).exp()
}

/// Velocity of a fixed-distance movement at `elapsed` into `duration`.
pub fn fixed_movement_velocity(
    direction: Vec3,
    distance: f32,
    elapsed: f32,
    duration: f32,
) -> Vec3 {
    if duration <= 0.0 {
        return Vec3::ZERO;
    }
    direction.normalize_or_zero() * dodge_speed_factor(elapsed / duration) * distance / duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_flat_ground_states() {
        let mut engine = FlatGroundEngine::new(Vec3::ZERO);
        assert!(engine.grounded_state().standing_on_ground);

        engine.move_by(Vec3::new(0.0, 1.0, 0.0));
        assert!(engine.grounded_state().falling);

        engine.move_by(Vec3::new(0.0, -5.0, 0.0));
        assert_approx_eq!(engine.position().y, 0.0);

        engine.slope_angle = 70.0;
        assert!(engine.grounded_state().sliding);
        assert!(!engine.grounded_state().on_walkable_ground());
    }

    #[test]
    fn test_dodge_speed_factor() {
        assert_approx_eq!(dodge_speed_factor(0.0), 1.0);
        assert_approx_eq!(dodge_speed_factor(1.0), (-1.0f32).exp());
        assert!(dodge_speed_factor(0.5) > dodge_speed_factor(0.9));
    }

    #[test]
    fn test_fixed_movement_zero_duration() {
        assert_eq!(fixed_movement_velocity(Vec3::X, 3.0, 0.0, 0.0), Vec3::ZERO);
    }
}

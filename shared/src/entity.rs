use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network-stable reference to a spawned entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Zombie,
    TargetDummy,
    Archer,
    Breakable,
    Arrow,
}

impl EntityKind {
    /// Entities zombies hunt.
    pub fn is_tagged_target(&self) -> bool {
        matches!(self, EntityKind::Player)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_yaw(position: Vec3, yaw_degrees: f32) -> Self {
        Self {
            position,
            rotation: yaw_rotation(yaw_degrees),
            scale: 1.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// World space point relative to this transform's origin, rotation and scale.
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        let local = self.rotation.inverse() * (point - self.position);
        if self.scale.abs() > f32::EPSILON {
            local / self.scale
        } else {
            local
        }
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (local * self.scale)
    }

    /// Heading around the up axis in degrees.
    pub fn yaw_degrees(&self) -> f32 {
        let forward = self.forward();
        (-forward.x).atan2(-forward.z).to_degrees()
    }
}

pub fn yaw_rotation(yaw_degrees: f32) -> Quat {
    Quat::from_rotation_y(yaw_degrees.to_radians())
}

/// Rotation from view angles, pitch positive looking down.
pub fn view_rotation(yaw_degrees: f32, pitch_degrees: f32) -> Quat {
    yaw_rotation(yaw_degrees) * Quat::from_rotation_x(-pitch_degrees.to_radians())
}

/// Yaw in degrees that faces along `direction` on the horizontal plane.
pub fn yaw_towards(direction: Vec3) -> f32 {
    (-direction.x).atan2(-direction.z).to_degrees()
}

/// Step `current` toward `target` by at most `max_delta` degrees along the shorter arc.
pub fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = (target - current + 540.0).rem_euclid(360.0) - 180.0;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta * delta.signum()
    }
}

/// Distance ignoring height.
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let delta = b - a;
    (delta.x * delta.x + delta.z * delta.z).sqrt()
}

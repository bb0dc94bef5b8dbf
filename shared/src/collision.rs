//! Narrow cast interface over the physics collaborator plus a sphere-based implementation.
//!
//! Attacks only need "what did this ray or swept sphere touch, and how far along it".
//! [`CollisionQuery`] is that contract; [`SphereWorld`] answers it for hitbox spheres and
//! static solids, which is all the core needs to resolve hits.

use crate::entity::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LAYER: u8 = 0;
pub const PLAYER_LAYER: u8 = 3;
pub const HITBOX_LAYER: u8 = 8;

/// Bitset of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);

    pub fn of(layers: &[u8]) -> Self {
        LayerMask(layers.iter().fold(0, |mask, layer| mask | (1u32 << layer)))
    }

    pub fn contains(&self, layer: u8) -> bool {
        layer < 32 && self.0 & (1u32 << layer) != 0
    }

    pub fn complement(&self) -> Self {
        LayerMask(!self.0)
    }

    /// Layers attacks skip: the character controller capsule, never its hitboxes.
    pub fn attack_ignore() -> Self {
        LayerMask::of(&[PLAYER_LAYER])
    }

    /// Ignore everything except hitboxes, so solids never occlude.
    pub fn hitboxes_only() -> Self {
        LayerMask::of(&[HITBOX_LAYER]).complement()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColliderRef {
    Hitbox { owner: EntityId, hitbox: String },
    Solid { trigger: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub layer: u8,
    pub collider: ColliderRef,
}

pub trait CollisionQuery {
    fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<RaycastHit>;

    fn sphere_cast_all(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
    ) -> Vec<RaycastHit>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphereCollider {
    pub center: Vec3,
    pub radius: f32,
    pub layer: u8,
    pub collider: ColliderRef,
}

#[derive(Debug, Clone, Default)]
pub struct SphereWorld {
    colliders: Vec<SphereCollider>,
}

impl SphereWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, collider: SphereCollider) {
        self.colliders.push(collider);
    }

    pub fn add_hitbox(&mut self, owner: EntityId, hitbox: &str, center: Vec3, radius: f32) {
        self.add(SphereCollider {
            center,
            radius,
            layer: HITBOX_LAYER,
            collider: ColliderRef::Hitbox {
                owner,
                hitbox: hitbox.to_string(),
            },
        });
    }

    pub fn add_solid(&mut self, center: Vec3, radius: f32) {
        self.add(SphereCollider {
            center,
            radius,
            layer: DEFAULT_LAYER,
            collider: ColliderRef::Solid { trigger: false },
        });
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
    ) -> Vec<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return Vec::new();
        }

        self.colliders
            .iter()
            .filter_map(|collider| {
                let distance =
                    ray_sphere(origin, direction, collider.center, collider.radius + radius)?;
                if distance > max_distance {
                    return None;
                }
                let sweep_center = origin + direction * distance;
                let normal = (sweep_center - collider.center).normalize_or_zero();
                Some(RaycastHit {
                    distance,
                    point: collider.center + normal * collider.radius,
                    normal,
                    layer: collider.layer,
                    collider: collider.collider.clone(),
                })
            })
            .collect()
    }
}

impl CollisionQuery for SphereWorld {
    fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<RaycastHit> {
        self.cast(origin, 0.0, direction, max_distance)
    }

    fn sphere_cast_all(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
    ) -> Vec<RaycastHit> {
        self.cast(origin, radius, direction, max_distance)
    }
}

/// Entry distance along a normalized ray, zero when starting inside.
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let b = offset.dot(direction);
    if b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    Some(-b - discriminant.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::of(&[PLAYER_LAYER, 5]);
        assert!(mask.contains(PLAYER_LAYER));
        assert!(mask.contains(5));
        assert!(!mask.contains(HITBOX_LAYER));
        assert!(!LayerMask::NONE.contains(0));
    }

    #[test]
    fn test_raycast_hits_sphere_in_front() {
        let mut world = SphereWorld::new();
        world.add_hitbox(EntityId(1), "chest", Vec3::new(0.0, 0.0, -5.0), 1.0);

        let hits = world.raycast_all(Vec3::ZERO, Vec3::NEG_Z, 10.0);
        assert_eq!(hits.len(), 1);
        assert_approx_eq!(hits[0].distance, 4.0);
        assert_approx_eq!(hits[0].point.z, -4.0);
        assert_eq!(hits[0].layer, HITBOX_LAYER);
    }

    #[test]
    fn test_raycast_ignores_behind_and_out_of_range() {
        let mut world = SphereWorld::new();
        world.add_solid(Vec3::new(0.0, 0.0, 5.0), 1.0);
        world.add_solid(Vec3::new(0.0, 0.0, -20.0), 1.0);

        assert!(world.raycast_all(Vec3::ZERO, Vec3::NEG_Z, 10.0).is_empty());
    }

    #[test]
    fn test_sphere_cast_widens_hit() {
        let mut world = SphereWorld::new();
        world.add_solid(Vec3::new(1.2, 0.0, -3.0), 1.0);

        assert!(world.raycast_all(Vec3::ZERO, Vec3::NEG_Z, 10.0).is_empty());
        assert_eq!(world.sphere_cast_all(Vec3::ZERO, 0.5, Vec3::NEG_Z, 10.0).len(), 1);
    }

    #[test]
    fn test_zero_direction_hits_nothing() {
        let mut world = SphereWorld::new();
        world.add_solid(Vec3::ZERO, 1.0);
        assert!(world.raycast_all(Vec3::ONE, Vec3::ZERO, 10.0).is_empty());
    }
}

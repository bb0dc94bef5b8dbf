//! Melee attack resolution: punches and ray-fan weapon swings.

use crate::collision::{CollisionQuery, LayerMask, RaycastHit};
use crate::entity::{view_rotation, EntityId};
use crate::health::{DamageEvent, DamageSource, DamageType, EventKind};
use crate::hitbox::{
    closest_hit_across_rays, damage_event_from_hit, get_all_valid_hits, get_first_valid_hit,
    HitboxLookup, ResolvedHitbox,
};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEGREES_PER_RAY: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeleeAttackType {
    Punch,
    Basic,
    Stab,
    Cleave,
}

/// Where a swing starts and which way the attacker is looking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOrigin {
    pub position: Vec3,
    pub heading: Quat,
    pub attacker: EntityId,
}

impl AttackOrigin {
    pub fn new(position: Vec3, yaw: f32, pitch: f32, attacker: EntityId) -> Self {
        Self {
            position,
            heading: view_rotation(yaw, pitch),
            attacker,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.heading * Vec3::NEG_Z
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeSpec {
    pub attack_type: MeleeAttackType,
    pub damage_type: DamageType,
    pub horizontal_range: f32,
    pub vertical_range: f32,
    pub attack_range: f32,
    pub damage: f32,
    pub cooldown: f32,
    pub stamina_cost: f32,
}

impl Default for MeleeSpec {
    fn default() -> Self {
        Self {
            attack_type: MeleeAttackType::Basic,
            damage_type: DamageType::Slashing,
            horizontal_range: 15.0,
            vertical_range: 90.0,
            attack_range: 1.0,
            damage: 20.0,
            cooldown: 1.0,
            stamina_cost: 10.0,
        }
    }
}

/// Yaw/pitch offsets in degrees covering the swing, centre ray first and each non-zero
/// offset mirrored.
pub fn ray_offsets(horizontal_range: f32, vertical_range: f32) -> Vec<(f32, f32)> {
    let yaw_steps = (horizontal_range / DEGREES_PER_RAY).ceil().max(0.0) as u32;
    let pitch_steps = (vertical_range / DEGREES_PER_RAY).ceil().max(0.0) as u32;
    let mut offsets = Vec::new();

    for yaw_step in 0..=yaw_steps {
        let yaw = (DEGREES_PER_RAY * yaw_step as f32).clamp(-horizontal_range, horizontal_range);
        for pitch_step in 0..=pitch_steps {
            let pitch =
                (DEGREES_PER_RAY * pitch_step as f32).clamp(-vertical_range, vertical_range);
            match (yaw == 0.0, pitch == 0.0) {
                (true, true) => offsets.push((yaw, pitch)),
                (false, true) => offsets.extend([(yaw, pitch), (-yaw, pitch)]),
                (true, false) => offsets.extend([(yaw, pitch), (yaw, -pitch)]),
                (false, false) => offsets.extend([
                    (yaw, pitch),
                    (yaw, -pitch),
                    (-yaw, pitch),
                    (-yaw, -pitch),
                ]),
            }
        }
    }

    offsets
}

impl MeleeSpec {
    pub fn ray_directions(&self, heading: Quat) -> Vec<Vec3> {
        ray_offsets(self.horizontal_range, self.vertical_range)
            .into_iter()
            .map(|(yaw, pitch)| heading * view_rotation(yaw, pitch) * Vec3::NEG_Z)
            .collect()
    }

    fn cast_rays(&self, origin: &AttackOrigin, world: &dyn CollisionQuery) -> Vec<Vec<RaycastHit>> {
        self.ray_directions(origin.heading)
            .into_iter()
            .map(|direction| world.raycast_all(origin.position, direction, self.attack_range))
            .collect()
    }

    /// The closest hit across the whole fan, or an empty event when nothing connected.
    pub fn basic_attack(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
    ) -> DamageEvent {
        let rays = self.cast_rays(origin, world);
        match closest_hit_across_rays(
            rays,
            Some(origin.attacker),
            LayerMask::attack_ignore(),
            lookup,
        ) {
            Some((hit, hitbox)) => damage_event_from_hit(
                &hit,
                &hitbox,
                self.damage,
                hit.normal,
                self.damage_type,
                DamageSource::Entity(origin.attacker),
            ),
            None => DamageEvent::empty(EventKind::Damage, self.damage),
        }
    }

    /// Each struck entity paired with its closest hit across the fan, ordered by entity.
    fn closest_per_entity(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
    ) -> Vec<(RaycastHit, ResolvedHitbox)> {
        let mut closest: HashMap<EntityId, (RaycastHit, ResolvedHitbox)> = HashMap::new();
        for hits in self.cast_rays(origin, world) {
            for (hit, hitbox) in
                get_all_valid_hits(hits, Some(origin.attacker), LayerMask::attack_ignore(), lookup)
            {
                let replace = closest
                    .get(&hitbox.owner)
                    .map_or(true, |(best, _)| hit.distance < best.distance);
                if replace {
                    closest.insert(hitbox.owner, (hit, hitbox));
                }
            }
        }

        let mut hits: Vec<_> = closest.into_values().collect();
        hits.sort_by_key(|(_, hitbox)| hitbox.owner);
        hits
    }

    fn events_per_entity(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
        damage_type: DamageType,
    ) -> Vec<DamageEvent> {
        self.closest_per_entity(origin, world, lookup)
            .into_iter()
            .map(|(hit, hitbox)| {
                damage_event_from_hit(
                    &hit,
                    &hitbox,
                    self.damage,
                    hit.normal,
                    damage_type,
                    DamageSource::Entity(origin.attacker),
                )
            })
            .collect()
    }

    /// One piercing event per struck entity, using that entity's closest hit.
    pub fn stab_attack(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
    ) -> Vec<DamageEvent> {
        self.events_per_entity(origin, world, lookup, DamageType::Piercing)
    }

    /// Sweeps the whole fan: every struck entity takes one event of the weapon's damage type.
    pub fn cleave_attack(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
    ) -> Vec<DamageEvent> {
        self.events_per_entity(origin, world, lookup, self.damage_type)
    }

    /// Resolve a swing according to this weapon's attack type.
    pub fn resolve(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
    ) -> MeleeOutcome {
        match self.attack_type {
            MeleeAttackType::Stab => MeleeOutcome::Multi(self.stab_attack(origin, world, lookup)),
            MeleeAttackType::Cleave => {
                MeleeOutcome::Multi(self.cleave_attack(origin, world, lookup))
            }
            MeleeAttackType::Basic | MeleeAttackType::Punch => {
                MeleeOutcome::Single(self.basic_attack(origin, world, lookup))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeleeOutcome {
    Single(DamageEvent),
    Multi(Vec<DamageEvent>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunchSpec {
    pub range: f32,
    pub radius: f32,
    pub damage: f32,
    pub damage_type: DamageType,
}

impl Default for PunchSpec {
    fn default() -> Self {
        Self {
            range: 2.0,
            radius: 0.1,
            damage: 10.0,
            damage_type: DamageType::Bludgeoning,
        }
    }
}

/// Result of a punch that connected.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackEvent {
    pub target: EntityId,
    pub damage: f32,
    pub hit_position: Vec3,
    pub event: DamageEvent,
}

impl PunchSpec {
    /// Sphere-cast along the view direction and strike the first hitbox not owned by the
    /// attacker. Solids do not occlude a punch.
    pub fn resolve(
        &self,
        origin: &AttackOrigin,
        world: &dyn CollisionQuery,
        lookup: &dyn HitboxLookup,
    ) -> Option<AttackEvent> {
        let direction = origin.direction();
        let hits = world.sphere_cast_all(origin.position, self.radius, direction, self.range);
        let (hit, hitbox) =
            get_first_valid_hit(hits, Some(origin.attacker), LayerMask::hitboxes_only(), lookup)?;

        let event = damage_event_from_hit(
            &hit,
            &hitbox,
            self.damage,
            -direction,
            self.damage_type,
            DamageSource::Entity(origin.attacker),
        );
        Some(AttackEvent {
            target: hitbox.owner,
            damage: self.damage,
            hit_position: hit.point,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::SphereWorld;
    use crate::entity::Transform;
    use assert_approx_eq::assert_approx_eq;

    struct Arena {
        world: SphereWorld,
        lookup: HashMap<(EntityId, String), ResolvedHitbox>,
    }

    impl Arena {
        fn new() -> Self {
            Self {
                world: SphereWorld::new(),
                lookup: HashMap::new(),
            }
        }

        fn target(&mut self, owner: u32, position: Vec3, radius: f32) {
            let owner = EntityId(owner);
            self.world.add_hitbox(owner, "chest", position, radius);
            self.lookup.insert(
                (owner, "chest".to_string()),
                ResolvedHitbox {
                    owner,
                    id: "chest".to_string(),
                    critical: false,
                    disabled: false,
                    owner_transform: Transform::at(position),
                },
            );
        }
    }

    fn origin() -> AttackOrigin {
        AttackOrigin::new(Vec3::ZERO, 0.0, 0.0, EntityId(1))
    }

    #[test]
    fn test_ray_offsets_are_mirrored() {
        let offsets = ray_offsets(15.0, 90.0);
        // 4 yaw steps, 19 pitch steps: 1 + 3*2 + 18*2 + 3*18*4
        assert_eq!(offsets.len(), 1 + 6 + 36 + 216);
        assert_eq!(offsets[0], (0.0, 0.0));
        assert!(offsets.contains(&(-15.0, -90.0)));
    }

    #[test]
    fn test_ray_offsets_single_ray() {
        assert_eq!(ray_offsets(0.0, 0.0), vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_basic_attack_picks_closest_target() {
        let mut arena = Arena::new();
        arena.target(2, Vec3::new(0.0, 0.0, -0.9), 0.2);
        arena.target(3, Vec3::new(0.2, 0.0, -0.6), 0.2);

        let spec = MeleeSpec::default();
        let event = spec.basic_attack(&origin(), &arena.world, &arena.lookup);
        assert_eq!(event.target, Some(EntityId(3)));
        assert_eq!(event.damage_type, DamageType::Slashing);
        assert_eq!(event.source, DamageSource::Entity(EntityId(1)));
        assert_approx_eq!(event.amount, 20.0);
    }

    #[test]
    fn test_basic_attack_miss_is_empty() {
        let mut arena = Arena::new();
        arena.target(2, Vec3::new(0.0, 0.0, 5.0), 0.2);

        let event = MeleeSpec::default().basic_attack(&origin(), &arena.world, &arena.lookup);
        assert!(!event.has_target());
    }

    #[test]
    fn test_attacker_never_hits_self() {
        let mut arena = Arena::new();
        arena.target(1, Vec3::new(0.0, 0.0, -0.5), 0.4);

        let event = MeleeSpec::default().basic_attack(&origin(), &arena.world, &arena.lookup);
        assert!(!event.has_target());
    }

    #[test]
    fn test_stab_hits_each_entity_once() {
        let mut arena = Arena::new();
        arena.target(2, Vec3::new(0.0, 0.0, -0.5), 0.1);
        arena.target(3, Vec3::new(0.0, 0.0, -0.9), 0.1);

        let spec = MeleeSpec {
            attack_type: MeleeAttackType::Stab,
            ..Default::default()
        };
        let events = spec.stab_attack(&origin(), &arena.world, &arena.lookup);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.damage_type == DamageType::Piercing));
        assert_eq!(events[0].target, Some(EntityId(2)));
    }

    #[test]
    fn test_cleave_hits_every_entity_in_the_fan() {
        let mut arena = Arena::new();
        arena.target(2, Vec3::new(0.0, 0.0, -0.5), 0.1);
        arena.target(3, Vec3::new(-0.15, 0.0, -0.7), 0.1);
        arena.target(4, Vec3::new(0.0, 0.0, 3.0), 0.1);
        let spec = MeleeSpec {
            attack_type: MeleeAttackType::Cleave,
            damage: 30.0,
            ..Default::default()
        };

        let outcome = spec.resolve(&origin(), &arena.world, &arena.lookup);
        let MeleeOutcome::Multi(events) = outcome else {
            panic!("cleave resolves to multiple events");
        };
        let targets: Vec<_> = events.iter().filter_map(|event| event.target).collect();
        assert_eq!(targets, vec![EntityId(2), EntityId(3)]);
        assert!(events.iter().all(|event| event.damage_type == DamageType::Slashing));
        assert_approx_eq!(events[1].amount, 30.0);
    }

    #[test]
    fn test_punch_hits_through_walls() {
        let mut arena = Arena::new();
        arena.world.add_solid(Vec3::new(0.0, 0.0, -0.5), 0.2);
        arena.target(2, Vec3::new(0.0, 0.0, -1.5), 0.3);

        let attack = PunchSpec::default()
            .resolve(&origin(), &arena.world, &arena.lookup)
            .unwrap();
        assert_eq!(attack.target, EntityId(2));
        assert_eq!(attack.event.damage_type, DamageType::Bludgeoning);
        assert_approx_eq!(attack.event.hit_normal.z, 1.0);
    }

    #[test]
    fn test_punch_out_of_range() {
        let mut arena = Arena::new();
        arena.target(2, Vec3::new(0.0, 0.0, -3.0), 0.3);
        assert!(PunchSpec::default()
            .resolve(&origin(), &arena.world, &arena.lookup)
            .is_none());
    }
}

//! Named hit regions and resolution of cast results into damage events.

use crate::collision::{ColliderRef, LayerMask, RaycastHit};
use crate::entity::{EntityId, EntityKind, Transform};
use crate::health::{DamageEvent, DamageSource, DamageType, EventKind};
use glam::Vec3;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Hitbox {
    pub id: String,
    /// Filled in when registered with a damageable.
    pub owner: EntityId,
    pub critical: bool,
    pub disabled_override: bool,
    /// Sphere center in owner-local space.
    pub offset: Vec3,
    pub radius: f32,
}

impl Hitbox {
    pub fn new(id: &str, offset: Vec3, radius: f32) -> Self {
        Self {
            id: id.to_string(),
            owner: EntityId(0),
            critical: false,
            disabled_override: false,
            offset,
            radius,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Standard humanoid layout: a body sphere and a critical head sphere.
    pub fn humanoid(scale: f32) -> Vec<Hitbox> {
        vec![
            Hitbox::new("chest", Vec3::new(0.0, 1.0, 0.0) * scale, 0.45 * scale),
            Hitbox::new("head", Vec3::new(0.0, 1.7, 0.0) * scale, 0.2 * scale).critical(),
        ]
    }

    /// The hitboxes every process registers for an entity of `kind`.
    pub fn for_kind(kind: EntityKind, scale: f32) -> Vec<Hitbox> {
        match kind {
            EntityKind::Player | EntityKind::Zombie | EntityKind::TargetDummy => {
                Self::humanoid(scale)
            }
            EntityKind::Breakable => vec![Hitbox::new(
                "body",
                Vec3::new(0.0, 0.5, 0.0) * scale,
                0.5 * scale,
            )],
            EntityKind::Archer | EntityKind::Arrow => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HitboxSet {
    hitboxes: HashMap<String, Hitbox>,
}

impl HitboxSet {
    pub fn register(&mut self, owner: EntityId, mut hitbox: Hitbox) {
        hitbox.owner = owner;
        self.hitboxes.insert(hitbox.id.clone(), hitbox);
    }

    pub fn get(&self, id: &str) -> Option<&Hitbox> {
        self.hitboxes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hitbox> {
        self.hitboxes.values()
    }

    pub fn len(&self) -> usize {
        self.hitboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hitboxes.is_empty()
    }
}

/// A hitbox reference resolved against the live entity registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHitbox {
    pub owner: EntityId,
    pub id: String,
    pub critical: bool,
    pub disabled: bool,
    pub owner_transform: Transform,
}

/// Lookup-by-id capability over whatever owns the damageables.
pub trait HitboxLookup {
    fn resolve(&self, owner: EntityId, hitbox: &str) -> Option<ResolvedHitbox>;
}

impl HitboxLookup for HashMap<(EntityId, String), ResolvedHitbox> {
    fn resolve(&self, owner: EntityId, hitbox: &str) -> Option<ResolvedHitbox> {
        self.get(&(owner, hitbox.to_string())).cloned()
    }
}

enum Candidate {
    Skip,
    Blocked,
    Valid(ResolvedHitbox),
}

fn classify(
    hit: &RaycastHit,
    attacker: Option<EntityId>,
    ignore: LayerMask,
    lookup: &dyn HitboxLookup,
) -> Candidate {
    if ignore.contains(hit.layer) {
        return Candidate::Skip;
    }

    match &hit.collider {
        ColliderRef::Solid { trigger: true } => Candidate::Skip,
        ColliderRef::Solid { trigger: false } => Candidate::Blocked,
        ColliderRef::Hitbox { owner, hitbox } => {
            if Some(*owner) == attacker {
                return Candidate::Skip;
            }
            match lookup.resolve(*owner, hitbox) {
                Some(resolved) if !resolved.disabled => Candidate::Valid(resolved),
                // Despawned owners and disabled hitboxes let the cast continue.
                _ => Candidate::Skip,
            }
        }
    }
}

fn by_distance(mut hits: Vec<RaycastHit>) -> Vec<RaycastHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Closest hit on a valid hitbox not owned by `attacker`, or `None` when nothing
/// qualifies or a solid occludes everything first.
pub fn get_first_valid_hit(
    hits: Vec<RaycastHit>,
    attacker: Option<EntityId>,
    ignore: LayerMask,
    lookup: &dyn HitboxLookup,
) -> Option<(RaycastHit, ResolvedHitbox)> {
    for hit in by_distance(hits) {
        match classify(&hit, attacker, ignore, lookup) {
            Candidate::Skip => continue,
            Candidate::Blocked => return None,
            Candidate::Valid(resolved) => return Some((hit, resolved)),
        }
    }
    None
}

/// Every valid hitbox hit in front of the first occluding solid.
pub fn get_all_valid_hits(
    hits: Vec<RaycastHit>,
    attacker: Option<EntityId>,
    ignore: LayerMask,
    lookup: &dyn HitboxLookup,
) -> Vec<(RaycastHit, ResolvedHitbox)> {
    let mut valid = Vec::new();
    for hit in by_distance(hits) {
        match classify(&hit, attacker, ignore, lookup) {
            Candidate::Skip => continue,
            Candidate::Blocked => break,
            Candidate::Valid(resolved) => valid.push((hit, resolved)),
        }
    }
    valid
}

/// Closest first valid hit across several independently cast rays.
pub fn closest_hit_across_rays(
    rays: Vec<Vec<RaycastHit>>,
    attacker: Option<EntityId>,
    ignore: LayerMask,
    lookup: &dyn HitboxLookup,
) -> Option<(RaycastHit, ResolvedHitbox)> {
    let mut closest: Option<(RaycastHit, ResolvedHitbox)> = None;
    for hits in rays {
        if let Some((hit, resolved)) = get_first_valid_hit(hits, attacker, ignore, lookup) {
            let closer = closest
                .as_ref()
                .map_or(true, |(best, _)| hit.distance < best.distance);
            if closer {
                closest = Some((hit, resolved));
            }
        }
    }
    closest
}

pub fn damage_event_from_hit(
    hit: &RaycastHit,
    hitbox: &ResolvedHitbox,
    amount: f32,
    normal: Vec3,
    damage_type: DamageType,
    source: DamageSource,
) -> DamageEvent {
    DamageEvent {
        kind: EventKind::Damage,
        damage_type,
        target: Some(hitbox.owner),
        source,
        amount,
        relative_hit_position: hitbox.owner_transform.inverse_transform_point(hit.point),
        hit_normal: normal,
        hitbox: Some(hitbox.id.clone()),
    }
}

//! Authoritative health pool and the damage/heal notification pipeline.
//!
//! A [`Damageable`] is mutated only through [`Damageable::apply_damage`] and
//! [`Damageable::heal`]. Each mutation produces a [`HealthChange`] which is handed to
//! every registered [`DamageListener`] synchronously, in call order, and returned to the
//! caller so it can be broadcast to replicas.

use crate::entity::EntityId;
use crate::hitbox::{Hitbox, HitboxSet};
use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HEALTH: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Damage,
    Heal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    None,
    Bludgeoning,
    Slashing,
    Piercing,
}

/// Who caused a health change, possibly nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DamageSource {
    #[default]
    Empty,
    Entity(EntityId),
}

impl DamageSource {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            DamageSource::Empty => None,
            DamageSource::Entity(id) => Some(*id),
        }
    }

    pub fn from_option(source: Option<EntityId>) -> Self {
        source.map(DamageSource::Entity).unwrap_or_default()
    }
}

/// Immutable description of a single attack or heal.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageEvent {
    pub kind: EventKind,
    pub damage_type: DamageType,
    /// `None` for an attack that connected with nothing.
    pub target: Option<EntityId>,
    pub source: DamageSource,
    pub amount: f32,
    pub relative_hit_position: Vec3,
    pub hit_normal: Vec3,
    pub hitbox: Option<String>,
}

impl DamageEvent {
    pub fn new(
        kind: EventKind,
        damage_type: DamageType,
        target: EntityId,
        source: DamageSource,
        amount: f32,
    ) -> Self {
        Self {
            kind,
            damage_type,
            target: Some(target),
            source,
            amount,
            relative_hit_position: Vec3::ZERO,
            hit_normal: Vec3::Y,
            hitbox: None,
        }
    }

    /// Attack that resolved to no target. Callers drop it.
    pub fn empty(kind: EventKind, amount: f32) -> Self {
        Self {
            kind,
            damage_type: DamageType::None,
            target: None,
            source: DamageSource::Empty,
            amount,
            relative_hit_position: Vec3::ZERO,
            hit_normal: Vec3::ZERO,
            hitbox: None,
        }
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn with_source(mut self, source: DamageSource) -> Self {
        self.source = source;
        self
    }
}

/// Notification produced by every accepted health mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthChange {
    pub target: EntityId,
    pub source: DamageSource,
    pub kind: EventKind,
    pub previous: f32,
    pub current: f32,
    pub amount: f32,
}

impl HealthChange {
    pub fn died(&self) -> bool {
        self.previous > 0.0 && self.current <= 0.0
    }

    pub fn revived(&self) -> bool {
        self.previous <= 0.0 && self.current > 0.0
    }
}

pub trait DamageListener: Send {
    fn on_damage(&mut self, change: &HealthChange);

    fn on_heal(&mut self, _change: &HealthChange) {}
}

pub struct Damageable {
    id: EntityId,
    max_health: f32,
    current_health: f32,
    /// Refreshed every tick from the owner's current state attributes.
    pub invulnerable: bool,
    pub passthrough: bool,
    hitboxes: HitboxSet,
    listeners: Vec<Box<dyn DamageListener>>,
}

impl std::fmt::Debug for Damageable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Damageable")
            .field("id", &self.id)
            .field("max_health", &self.max_health)
            .field("current_health", &self.current_health)
            .field("invulnerable", &self.invulnerable)
            .field("passthrough", &self.passthrough)
            .field("hitboxes", &self.hitboxes)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Damageable {
    pub fn new(id: EntityId) -> Self {
        Self::with_max_health(id, DEFAULT_MAX_HEALTH)
    }

    pub fn with_max_health(id: EntityId, max_health: f32) -> Self {
        let max_health = max_health.max(0.0);
        Self {
            id,
            max_health,
            current_health: max_health,
            invulnerable: false,
            passthrough: false,
            hitboxes: HitboxSet::default(),
            listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0.0
    }

    pub fn health_percentage(&self) -> f32 {
        if self.max_health == 0.0 {
            return 1.0;
        }
        self.current_health / self.max_health
    }

    pub fn subscribe(&mut self, listener: Box<dyn DamageListener>) {
        self.listeners.push(listener);
    }

    pub fn register_hitbox(&mut self, hitbox: Hitbox) {
        self.hitboxes.register(self.id, hitbox);
    }

    pub fn hitboxes(&self) -> &HitboxSet {
        &self.hitboxes
    }

    /// Whether a registered hitbox currently accepts hits.
    pub fn hitbox_disabled(&self, hitbox_id: &str) -> Option<bool> {
        self.hitboxes
            .get(hitbox_id)
            .map(|hitbox| hitbox.disabled_override || self.passthrough)
    }

    fn adjust(&mut self, change: f32) {
        self.current_health = (self.current_health + change).clamp(0.0, self.max_health);
    }

    /// Reduce health by the event's amount. Dead or invulnerable targets ignore it.
    pub fn apply_damage(&mut self, event: &DamageEvent) -> Option<HealthChange> {
        if !self.is_alive() || self.invulnerable {
            debug!(
                "{} ignored {:.1} damage (alive: {}, invulnerable: {})",
                self.id,
                event.amount,
                self.is_alive(),
                self.invulnerable
            );
            return None;
        }

        let amount = event.amount.max(0.0);
        let previous = self.current_health;
        self.adjust(-amount);

        let change = HealthChange {
            target: self.id,
            source: event.source,
            kind: EventKind::Damage,
            previous,
            current: self.current_health,
            amount,
        };
        self.notify(&change);
        Some(change)
    }

    /// Raise health by `amount`, clamped to the maximum. Invulnerable targets ignore it.
    pub fn heal(&mut self, amount: f32, source: DamageSource) -> Option<HealthChange> {
        if self.invulnerable {
            debug!("{} ignored {:.1} healing (invulnerable)", self.id, amount);
            return None;
        }
        let amount = amount.max(0.0);
        let previous = self.current_health;
        self.adjust(amount);

        let change = HealthChange {
            target: self.id,
            source,
            kind: EventKind::Heal,
            previous,
            current: self.current_health,
            amount,
        };
        self.notify(&change);
        Some(change)
    }

    pub fn reset_to_max_health(&mut self) -> Option<HealthChange> {
        let missing = self.max_health - self.current_health;
        self.heal(missing, DamageSource::Empty)
    }

    /// Sets a new maximum and refills to it, used when configuring a fresh spawn.
    pub fn adjust_max_health(&mut self, max_health: f32) {
        self.max_health = max_health.max(0.0);
        self.current_health = self.max_health;
    }

    /// Replays an authoritative notification on a replica mirror.
    pub fn replay(&mut self, change: &HealthChange) {
        self.current_health = change.current.clamp(0.0, self.max_health);
        self.notify(change);
    }

    /// Compare-then-mutate apply of replicated health values.
    pub fn apply_replicated(&mut self, current: f32, max: f32) -> bool {
        if self.current_health == current && self.max_health == max {
            return false;
        }
        self.max_health = max.max(0.0);
        self.current_health = current.clamp(0.0, self.max_health);
        true
    }

    fn notify(&mut self, change: &HealthChange) {
        for listener in self.listeners.iter_mut() {
            match change.kind {
                EventKind::Damage => listener.on_damage(change),
                EventKind::Heal => listener.on_heal(change),
            }
        }
    }
}

/// Restores a dead damageable to full health after a fixed delay.
#[derive(Debug, Clone)]
pub struct ReviveOnTimer {
    pub respawn_time: f32,
    dead_elapsed: f32,
}

impl Default for ReviveOnTimer {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl ReviveOnTimer {
    pub fn new(respawn_time: f32) -> Self {
        Self {
            respawn_time,
            dead_elapsed: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f32, damageable: &mut Damageable) -> Option<HealthChange> {
        if damageable.is_alive() {
            self.dead_elapsed = 0.0;
            return None;
        }

        self.dead_elapsed += dt;
        if self.dead_elapsed >= self.respawn_time {
            self.dead_elapsed = 0.0;
            return damageable.reset_to_max_health();
        }
        None
    }
}

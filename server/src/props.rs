//! Environment entities: target dummies, the static archer and its arrows, breakables.

use crate::world::EntityIds;
use glam::Vec3;
use log::debug;
use shared::collision::{ColliderRef, CollisionQuery, LayerMask};
use shared::entity::{yaw_rotation, yaw_towards, EntityId, EntityKind, Transform};
use shared::hasm::{Event, MachineDef, StateMachine};
use shared::health::{
    DamageEvent, DamageSource, DamageType, Damageable, EventKind, HealthChange, ReviveOnTimer,
};
use shared::hitbox::{damage_event_from_hit, get_first_valid_hit, Hitbox, HitboxLookup};
use shared::states::{ArcherState, BreakableState, DummyState};
use std::sync::Arc;

pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Health change reactions shared by the damageable props.
fn reaction_events(change: &HealthChange) -> Vec<Event> {
    let mut events = Vec::new();
    if change.kind == EventKind::Damage && !change.died() {
        events.push(Event::Hit);
    }
    if change.died() {
        events.push(Event::Death);
    }
    if change.revived() {
        events.push(Event::Revive);
    }
    events
}

#[derive(Debug)]
pub struct TargetDummy {
    pub id: EntityId,
    pub transform: Transform,
    pub damageable: Damageable,
    machine: StateMachine<DummyState>,
    revive: ReviveOnTimer,
}

impl TargetDummy {
    pub fn new(
        id: EntityId,
        transform: Transform,
        max_health: f32,
        machine: Arc<MachineDef<DummyState>>,
    ) -> Self {
        let mut damageable = Damageable::with_max_health(id, max_health);
        for hitbox in Hitbox::humanoid(transform.scale) {
            damageable.register_hitbox(hitbox);
        }
        Self {
            id,
            transform,
            damageable,
            machine: StateMachine::new(machine),
            revive: ReviveOnTimer::default(),
        }
    }

    pub fn state(&self) -> DummyState {
        self.machine.current()
    }

    pub fn on_health_change(&mut self, change: &HealthChange) {
        if change.target != self.id {
            return;
        }
        for event in reaction_events(change) {
            self.machine.raise(event);
        }
    }

    /// Returns the revive notification when the timer fires.
    pub fn tick(&mut self, dt: f32) -> Option<HealthChange> {
        let revived = self.revive.tick(dt, &mut self.damageable);
        if let Some(change) = &revived {
            debug!("Target dummy {} revived", self.id);
            self.on_health_change(change);
        }
        self.machine.update(dt);
        self.damageable.invulnerable = self.machine.attributes().invulnerable;
        revived
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowConfig {
    pub damage: f32,
    pub damage_type: DamageType,
    pub radius: f32,
    pub despawn_time: f32,
    pub pinned_despawn_time: f32,
    pub gravity: Vec3,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            damage: 10.0,
            damage_type: DamageType::Piercing,
            radius: 0.05,
            despawn_time: 100.0,
            pinned_despawn_time: 10.0,
            gravity: GRAVITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub id: EntityId,
    pub shooter: EntityId,
    pub config: ArrowConfig,
    pub position: Vec3,
    pub velocity: Vec3,
    pub pinned: bool,
    age: f32,
    pinned_for: f32,
}

impl Arrow {
    pub fn new(
        id: EntityId,
        shooter: EntityId,
        config: ArrowConfig,
        position: Vec3,
        velocity: Vec3,
    ) -> Self {
        Self {
            id,
            shooter,
            config,
            position,
            velocity,
            pinned: false,
            age: 0.0,
            pinned_for: 0.0,
        }
    }

    pub fn heading(&self) -> f32 {
        yaw_towards(self.velocity)
    }

    pub fn expired(&self) -> bool {
        if self.pinned {
            self.pinned_for >= self.config.pinned_despawn_time
        } else {
            self.age >= self.config.despawn_time
        }
    }

    fn pin(&mut self, point: Vec3) {
        self.pinned = true;
        self.position = point;
        self.velocity = Vec3::ZERO;
    }

    /// Sweep along this tick's travel. Returns damage for the first valid hitbox.
    pub fn tick(
        &mut self,
        dt: f32,
        collision: &dyn CollisionQuery,
        hitboxes: &dyn HitboxLookup,
    ) -> Option<DamageEvent> {
        self.age += dt;
        if self.pinned {
            self.pinned_for += dt;
            return None;
        }

        let travel = self.velocity * dt;
        let distance = travel.length();
        if distance <= f32::EPSILON {
            self.velocity += self.config.gravity * dt;
            return None;
        }
        let direction = travel / distance;

        let hits =
            collision.sphere_cast_all(self.position, self.config.radius, direction, distance);
        let ignore = LayerMask::attack_ignore();
        let wall = hits
            .iter()
            .filter(|hit| !ignore.contains(hit.layer))
            .filter(|hit| matches!(hit.collider, ColliderRef::Solid { trigger: false }))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .map(|hit| hit.point);

        if let Some((hit, hitbox)) =
            get_first_valid_hit(hits, Some(self.shooter), ignore, hitboxes)
        {
            let event = damage_event_from_hit(
                &hit,
                &hitbox,
                self.config.damage,
                -direction,
                self.config.damage_type,
                DamageSource::Entity(self.shooter),
            );
            self.pin(hit.point);
            return Some(event);
        }
        if let Some(point) = wall {
            self.pin(point);
            return None;
        }

        self.position += travel;
        self.velocity += self.config.gravity * dt;
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcherConfig {
    pub arrow_speed: f32,
    pub aim_target: Vec3,
    /// Arrow spawn point relative to the archer's feet.
    pub release_offset: Vec3,
    pub arrow: ArrowConfig,
}

impl Default for ArcherConfig {
    fn default() -> Self {
        Self {
            arrow_speed: 50.0,
            aim_target: Vec3::new(0.0, 1.0, 0.0),
            release_offset: Vec3::new(0.0, 1.5, 0.0),
            arrow: ArrowConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct StaticArcher {
    pub id: EntityId,
    pub transform: Transform,
    pub config: ArcherConfig,
    machine: StateMachine<ArcherState>,
}

impl StaticArcher {
    pub fn new(
        id: EntityId,
        position: Vec3,
        config: ArcherConfig,
        machine: Arc<MachineDef<ArcherState>>,
    ) -> Self {
        let mut archer = Self {
            id,
            transform: Transform::at(position),
            config,
            machine: StateMachine::new(machine),
        };
        archer.face_target();
        archer
    }

    pub fn state(&self) -> ArcherState {
        self.machine.current()
    }

    pub fn draw(&mut self) {
        self.machine.raise(Event::DrawArrow);
    }

    fn face_target(&mut self) {
        let mut direction = self.config.aim_target - self.transform.position;
        direction.y = 0.0;
        if direction.length_squared() > f32::EPSILON {
            self.transform.rotation = yaw_rotation(yaw_towards(direction));
        }
    }

    fn loose(&self, ids: &mut EntityIds) -> Arrow {
        let origin = self.transform.position + self.config.release_offset;
        let direction = (self.config.aim_target - origin).normalize_or_zero();
        let direction = if direction == Vec3::ZERO {
            self.transform.forward()
        } else {
            direction
        };
        Arrow::new(
            ids.allocate(),
            self.id,
            self.config.arrow,
            origin,
            direction * self.config.arrow_speed,
        )
    }

    /// Advance the draw cycle. Entering Fire looses an arrow.
    pub fn tick(&mut self, dt: f32, ids: &mut EntityIds) -> Option<Arrow> {
        let mut arrow = None;
        for transition in self.machine.update(dt) {
            if transition.to == ArcherState::Fire {
                self.face_target();
                arrow = Some(self.loose(ids));
            }
        }
        arrow
    }
}

#[derive(Debug)]
pub struct Breakable {
    pub id: EntityId,
    pub transform: Transform,
    pub damageable: Damageable,
    pub despawn_time: f32,
    machine: StateMachine<BreakableState>,
    broken_for: f32,
}

impl Breakable {
    pub fn new(
        id: EntityId,
        transform: Transform,
        max_health: f32,
        despawn_time: f32,
        machine: Arc<MachineDef<BreakableState>>,
    ) -> Self {
        let mut damageable = Damageable::with_max_health(id, max_health);
        for hitbox in Hitbox::for_kind(EntityKind::Breakable, transform.scale) {
            damageable.register_hitbox(hitbox);
        }
        Self {
            id,
            transform,
            damageable,
            despawn_time,
            machine: StateMachine::new(machine),
            broken_for: 0.0,
        }
    }

    pub fn state(&self) -> BreakableState {
        self.machine.current()
    }

    pub fn on_health_change(&mut self, change: &HealthChange) {
        if change.target == self.id && change.died() {
            self.machine.raise(Event::Death);
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.state() == BreakableState::Broken {
            self.broken_for += dt;
        }
        for transition in self.machine.update(dt) {
            if transition.to == BreakableState::Broken {
                debug!("Breakable {} broke", self.id);
            }
        }
        let attributes = self.machine.attributes();
        self.damageable.invulnerable = attributes.invulnerable;
        self.damageable.passthrough = attributes.passthrough;
    }

    pub fn expired(&self) -> bool {
        self.state() == BreakableState::Broken && self.broken_for >= self.despawn_time
    }
}

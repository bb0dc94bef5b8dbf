//! Server-side zombie: HASM-driven hunting, roaming and attacking.

use glam::Vec3;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use shared::entity::{
    planar_distance, rotate_towards, yaw_rotation, yaw_towards, EntityId, Transform,
};
use shared::hasm::{Event, MachineDef, StateMachine, Transition, Trigger};
use shared::health::{DamageEvent, DamageSource, DamageType, Damageable, EventKind, HealthChange};
use shared::hitbox::Hitbox;
use shared::states::ZombieState;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZombieConfig {
    pub aggro_distance: f32,
    pub lose_aggro_distance: f32,
    pub time_between_roaming: f32,
    pub chase_speed: f32,
    pub roam_speed: f32,
    pub min_roam_time: f32,
    pub max_roam_time: f32,
    pub notify_radius: f32,
    pub min_notify_cooldown: f32,
    pub max_notify_cooldown: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub attack_damage: f32,
    /// Degrees per second.
    pub turn_speed: f32,
}

impl Default for ZombieConfig {
    fn default() -> Self {
        Self {
            aggro_distance: 5.0,
            lose_aggro_distance: 20.0,
            time_between_roaming: 3.0,
            chase_speed: 5.0,
            roam_speed: 1.0,
            min_roam_time: 0.5,
            max_roam_time: 3.0,
            notify_radius: 10.0,
            min_notify_cooldown: 1.0,
            max_notify_cooldown: 3.0,
            attack_range: 1.5,
            attack_cooldown: 2.0,
            attack_damage: 5.0,
            turn_speed: 120.0,
        }
    }
}

/// What a zombie can see of a potential target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub id: EntityId,
    pub position: Vec3,
    pub alive: bool,
}

/// Request to alert other zombies near `position` about `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    pub from: EntityId,
    pub position: Vec3,
    pub target: EntityId,
    pub radius: f32,
}

#[derive(Debug, Default)]
pub struct ZombieOutput {
    pub attacks: Vec<DamageEvent>,
    pub alert: Option<Alert>,
    pub transitions: Vec<Transition<ZombieState>>,
}

pub(crate) fn uniform(rng: &mut StdRng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[derive(Debug)]
pub struct Zombie {
    pub id: EntityId,
    pub name: String,
    pub config: ZombieConfig,
    pub transform: Transform,
    pub damageable: Damageable,
    machine: StateMachine<ZombieState>,
    target: Option<EntityId>,
    roam_remaining: f32,
    roam_heading: f32,
    time_to_next_roam: f32,
    since_attack: f32,
    notify_cooldown: f32,
}

impl Zombie {
    pub fn new(
        id: EntityId,
        name: String,
        config: ZombieConfig,
        transform: Transform,
        max_health: f32,
        machine: Arc<MachineDef<ZombieState>>,
    ) -> Self {
        let mut damageable = Damageable::with_max_health(id, max_health);
        for hitbox in Hitbox::humanoid(transform.scale) {
            damageable.register_hitbox(hitbox);
        }

        Self {
            id,
            name,
            transform,
            damageable,
            machine: StateMachine::new(machine),
            target: None,
            roam_remaining: 0.0,
            roam_heading: 0.0,
            time_to_next_roam: config.time_between_roaming,
            since_attack: config.attack_cooldown,
            notify_cooldown: 0.0,
            config,
        }
    }

    pub fn state(&self) -> ZombieState {
        self.machine.current()
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn is_alive(&self) -> bool {
        self.damageable.is_alive()
    }

    /// Idle and roaming zombies respond to alerts.
    pub fn accepts_alert(&self) -> bool {
        matches!(self.state(), ZombieState::Idle | ZombieState::Roaming)
    }

    pub fn raise(&mut self, event: Event) {
        self.machine.raise(event);
    }

    /// Server-side reaction to an applied health change.
    pub fn on_health_change(&mut self, change: &HealthChange) {
        if change.target != self.id {
            return;
        }
        if change.kind == EventKind::Damage {
            self.machine.raise(Event::Hit);
        }
        if change.died() {
            debug!("{} ({}) died", self.name, self.id);
            self.machine.raise(Event::Death);
        }
    }

    /// Nearest live target within `search_distance`; ties go to the later candidate.
    pub fn find_target(&self, targets: &[TargetInfo], search_distance: f32) -> Option<EntityId> {
        let mut closest_distance = f32::INFINITY;
        let mut closest = None;
        for target in targets.iter().filter(|target| target.alive) {
            let distance = self.transform.position.distance(target.position);
            if distance > search_distance {
                continue;
            }
            if distance <= closest_distance {
                closest_distance = distance;
                closest = Some(target.id);
            }
        }
        closest
    }

    fn check_for_targets(&mut self, targets: &[TargetInfo]) {
        if let Some(target) = self.find_target(targets, self.config.aggro_distance) {
            self.machine.raise(Event::TargetIdentified { target });
        }
    }

    fn check_roaming(&mut self, dt: f32, rng: &mut StdRng) {
        self.time_to_next_roam -= dt;
        if self.time_to_next_roam <= 0.0 {
            self.machine.raise(Event::StartRoam {
                roam_time: uniform(rng, self.config.min_roam_time, self.config.max_roam_time),
                heading: uniform(rng, 0.0, 360.0),
            });
        }
    }

    fn face(&mut self, yaw: f32, dt: f32) {
        let current = self.transform.yaw_degrees();
        let yaw = rotate_towards(current, yaw, self.config.turn_speed * dt);
        self.transform = Transform {
            rotation: yaw_rotation(yaw),
            ..self.transform
        };
    }

    fn roam(&mut self, dt: f32, targets: &[TargetInfo]) {
        self.face(self.roam_heading, dt);
        self.transform.position += self.transform.forward() * self.config.roam_speed * dt;

        self.roam_remaining -= dt;
        if self.roam_remaining <= 0.0 {
            self.machine.raise(Event::StopRoam);
        }
        self.check_for_targets(targets);
    }

    fn chase(&mut self, dt: f32, targets: &[TargetInfo], output: &mut ZombieOutput) {
        let target = self
            .target
            .and_then(|id| targets.iter().find(|target| target.id == id))
            .filter(|target| target.alive);
        let Some(target) = target.copied() else {
            self.target = None;
            self.machine.raise(Event::TargetLost);
            return;
        };

        let distance = planar_distance(self.transform.position, target.position);
        if distance >= self.config.lose_aggro_distance {
            self.target = None;
            self.machine.raise(Event::TargetLost);
            return;
        }

        let mut direction = target.position - self.transform.position;
        direction.y = 0.0;
        if direction.length_squared() > f32::EPSILON {
            self.transform = Transform {
                rotation: yaw_rotation(yaw_towards(direction)),
                ..self.transform
            };
        }
        let step = (self.config.chase_speed * dt)
            .min((distance - self.config.attack_range * 0.5).max(0.0));
        self.transform.position += direction.normalize_or_zero() * step;

        if self.notify_cooldown <= 0.0 {
            output.alert = Some(Alert {
                from: self.id,
                position: self.transform.position,
                target: target.id,
                radius: self.config.notify_radius,
            });
        }

        if distance <= self.config.attack_range
            && self.since_attack >= self.config.attack_cooldown
        {
            self.machine.raise(Event::Attack);
        }
    }

    /// Arm the per-zombie cooldown after alerting neighbours.
    pub fn rearm_notify(&mut self, rng: &mut StdRng) {
        self.notify_cooldown = uniform(
            rng,
            self.config.min_notify_cooldown,
            self.config.max_notify_cooldown,
        );
    }

    fn strike(&self, targets: &[TargetInfo]) -> Option<DamageEvent> {
        let target = self
            .target
            .and_then(|id| targets.iter().find(|target| target.id == id))?;
        if !target.alive
            || planar_distance(self.transform.position, target.position)
                > self.config.attack_range
        {
            return None;
        }

        let mut event = DamageEvent::new(
            EventKind::Damage,
            DamageType::Slashing,
            target.id,
            DamageSource::Entity(self.id),
            self.config.attack_damage,
        );
        event.hit_normal = -self.transform.forward();
        Some(event)
    }

    fn on_enter(
        &mut self,
        transition: &Transition<ZombieState>,
        targets: &[TargetInfo],
        rng: &mut StdRng,
        output: &mut ZombieOutput,
    ) {
        match (transition.to, &transition.trigger) {
            (ZombieState::Idle, _) => {
                let persisted = self
                    .target
                    .and_then(|id| targets.iter().find(|target| target.id == id))
                    .filter(|target| target.alive);
                if let Some(target) = persisted {
                    self.machine.raise(Event::TargetIdentified { target: target.id });
                }
                self.time_to_next_roam = uniform(rng, 0.0, self.config.time_between_roaming);
            }
            (ZombieState::Roaming, Trigger::Event(Event::StartRoam { roam_time, heading })) => {
                self.roam_remaining = *roam_time;
                self.roam_heading = *heading;
            }
            (ZombieState::Chase, Trigger::Event(Event::TargetIdentified { target })) => {
                self.target = Some(*target);
            }
            (ZombieState::Attack, _) => {
                self.since_attack = 0.0;
                if let Some(event) = self.strike(targets) {
                    output.attacks.push(event);
                }
            }
            _ => {}
        }
    }

    pub fn tick(&mut self, dt: f32, targets: &[TargetInfo], rng: &mut StdRng) -> ZombieOutput {
        let mut output = ZombieOutput::default();
        self.since_attack += dt;
        self.notify_cooldown -= dt;

        match self.state() {
            ZombieState::Idle => {
                self.check_for_targets(targets);
                self.check_roaming(dt, rng);
            }
            ZombieState::Roaming => self.roam(dt, targets),
            ZombieState::Chase => self.chase(dt, targets, &mut output),
            _ => {}
        }

        let transitions = self.machine.update(dt);
        for transition in &transitions {
            self.on_enter(transition, targets, rng, &mut output);
        }
        output.transitions = transitions;

        let attributes = self.machine.attributes();
        self.damageable.invulnerable = attributes.invulnerable;
        self.damageable.passthrough = attributes.passthrough;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use shared::states::zombie_machine;

    const DT: f32 = 0.05;

    fn zombie() -> Zombie {
        Zombie::new(
            EntityId(10),
            "Zombie-0".to_string(),
            ZombieConfig::default(),
            Transform::at(Vec3::ZERO),
            30.0,
            zombie_machine(),
        )
    }

    fn player_at(distance: f32) -> TargetInfo {
        TargetInfo {
            id: EntityId(1),
            position: Vec3::new(distance, 0.0, 0.0),
            alive: true,
        }
    }

    fn run(
        zombie: &mut Zombie,
        targets: &[TargetInfo],
        rng: &mut StdRng,
        seconds: f32,
    ) -> Vec<DamageEvent> {
        let mut attacks = Vec::new();
        let mut elapsed = 0.0;
        while elapsed < seconds {
            attacks.extend(zombie.tick(DT, targets, rng).attacks);
            elapsed += DT;
        }
        attacks
    }

    #[test]
    fn test_target_within_aggro_starts_chase() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut zombie = zombie();
        zombie.tick(DT, &[player_at(4.0)], &mut rng);
        assert_eq!(zombie.state(), ZombieState::Chase);
        assert_eq!(zombie.target(), Some(EntityId(1)));
    }

    #[test]
    fn test_target_beyond_aggro_is_ignored() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut zombie = zombie();
        zombie.tick(DT, &[player_at(6.0)], &mut rng);
        assert_ne!(zombie.state(), ZombieState::Chase);
        assert_eq!(zombie.target(), None);
    }

    #[test]
    fn test_dead_targets_are_ignored() {
        let zombie = zombie();
        let mut dead = player_at(1.0);
        dead.alive = false;
        let alive = TargetInfo {
            id: EntityId(2),
            position: Vec3::new(0.0, 0.0, 3.0),
            alive: true,
        };
        assert_eq!(zombie.find_target(&[dead, alive], 5.0), Some(EntityId(2)));
        assert_eq!(zombie.find_target(&[dead], 5.0), None);
    }

    #[test]
    fn test_idle_zombie_starts_roaming() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut zombie = zombie();
        let start = zombie.transform.position;
        let mut roamed = false;
        let mut elapsed = 0.0;
        while elapsed < 4.0 && !roamed {
            zombie.tick(DT, &[], &mut rng);
            roamed = zombie.state() == ZombieState::Roaming;
            elapsed += DT;
        }
        assert!(roamed);

        zombie.tick(DT, &[], &mut rng);
        assert!(zombie.transform.position.distance(start) > 0.0);
    }

    #[test]
    fn test_chase_loses_target_when_far() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut zombie = zombie();
        zombie.tick(DT, &[player_at(4.0)], &mut rng);
        assert_eq!(zombie.state(), ZombieState::Chase);

        zombie.tick(DT, &[player_at(25.0)], &mut rng);
        assert_eq!(zombie.state(), ZombieState::Idle);
        assert_eq!(zombie.target(), None);
    }

    #[test]
    fn test_chase_loses_target_when_it_disappears() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut zombie = zombie();
        zombie.tick(DT, &[player_at(4.0)], &mut rng);
        zombie.tick(DT, &[], &mut rng);
        assert_eq!(zombie.state(), ZombieState::Idle);
    }

    #[test]
    fn test_attack_in_range_strikes_target() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut zombie = zombie();
        let targets = [player_at(1.0)];
        let attacks = run(&mut zombie, &targets, &mut rng, 0.3);

        assert_eq!(attacks.len(), 1);
        let attack = &attacks[0];
        assert_eq!(attack.target, Some(EntityId(1)));
        assert_eq!(attack.source, DamageSource::Entity(EntityId(10)));
        assert_eq!(attack.damage_type, DamageType::Slashing);
        assert_eq!(zombie.state(), ZombieState::Attack);
    }

    #[test]
    fn test_attack_respects_cooldown() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut zombie = zombie();
        let targets = [player_at(1.0)];
        let attacks = run(&mut zombie, &targets, &mut rng, 1.9);
        assert_eq!(attacks.len(), 1);
        assert_eq!(zombie.state(), ZombieState::Chase);

        let attacks = run(&mut zombie, &targets, &mut rng, 0.8);
        assert_eq!(attacks.len(), 1);
    }

    #[test]
    fn test_chase_raises_alert_then_cools_down() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut zombie = zombie();
        zombie.tick(DT, &[player_at(4.0)], &mut rng);
        let output = zombie.tick(DT, &[player_at(4.0)], &mut rng);
        let alert = output.alert.unwrap();
        assert_eq!(alert.target, EntityId(1));
        assert_eq!(alert.from, EntityId(10));

        zombie.rearm_notify(&mut rng);
        assert!(zombie.tick(DT, &[player_at(4.0)], &mut rng).alert.is_none());
    }

    #[test]
    fn test_hit_stuns_and_death_kills() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut zombie = zombie();
        let hit = DamageEvent::new(
            EventKind::Damage,
            DamageType::Bludgeoning,
            zombie.id,
            DamageSource::Entity(EntityId(1)),
            10.0,
        );

        let change = zombie.damageable.apply_damage(&hit).unwrap();
        zombie.on_health_change(&change);
        zombie.tick(DT, &[], &mut rng);
        assert_eq!(zombie.state(), ZombieState::HitStun);

        let mut fatal = hit.clone();
        fatal.amount = 50.0;
        let change = zombie.damageable.apply_damage(&fatal).unwrap();
        zombie.on_health_change(&change);
        zombie.tick(DT, &[], &mut rng);
        assert_eq!(zombie.state(), ZombieState::Dying);

        run(&mut zombie, &[], &mut rng, 2.1);
        assert_eq!(zombie.state(), ZombieState::Dead);
        assert!(zombie.damageable.passthrough);
    }

    #[test]
    fn test_idle_reacquires_persisted_target() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut zombie = zombie();
        let targets = [player_at(1.0)];
        run(&mut zombie, &targets, &mut rng, 0.2);
        assert_eq!(zombie.state(), ZombieState::Attack);

        // Attack ends in Idle, which immediately re-identifies the target.
        run(&mut zombie, &targets, &mut rng, 1.1);
        assert_eq!(zombie.state(), ZombieState::Chase);
        assert_eq!(zombie.target(), Some(EntityId(1)));
    }
}

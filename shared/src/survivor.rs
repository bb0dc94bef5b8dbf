//! The player actor as simulated by its owning client.
//!
//! The owner reads input, runs the actions, moves through the movement engine and drives
//! the player state machine. It never touches health: death and revive arrive as
//! authoritative [`HealthChange`] notifications and are turned into machine events here.

use crate::action::{Action, ActionContext, ActionSignal, PlayerAction};
use crate::collision::CollisionQuery;
use crate::entity::{yaw_rotation, EntityId};
use crate::equipment::{EquipmentLibrary, HeldItem, ItemBehavior, ItemSpawner, ItemWeight};
use crate::hasm::{Event, MachineDef, SpeedClass, StateId, StateMachine, Transition};
use crate::health::HealthChange;
use crate::hitbox::HitboxLookup;
use crate::input::PlayerInput;
use crate::loadout::PlayerLoadout;
use crate::melee::{AttackOrigin, MeleeOutcome, PunchSpec};
use crate::movement::{fixed_movement_velocity, MovementEngine, GRAVITY};
use crate::protocol::{NetworkAttackEvent, NetworkDamageEvent, NetworkLoadout, OwnerState};
use crate::replication::Role;
use crate::stamina::{StaminaConfig, StaminaMeter};
use crate::states::PlayerState;
use glam::{Vec2, Vec3};
use log::{debug, info};
use std::sync::Arc;

const MOVE_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMoveConfig {
    pub duration: f32,
    pub distance: f32,
    pub stamina_cost: f32,
    pub cooldown: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivorConfig {
    pub walking_speed: f32,
    pub sprint_speed: f32,
    pub attack_speed: f32,
    pub jump_velocity: f32,
    pub max_jump_angle: f32,
    pub jump_cooldown: f32,
    pub buffer_time: f32,
    pub sprint_cost_rate: f32,
    pub sprint_stamina_to_start: f32,
    pub dodge: FixedMoveConfig,
    pub roll: FixedMoveConfig,
    pub punch_cooldown: f32,
    pub punch_cost: f32,
    pub punch: PunchSpec,
    /// Attack origin relative to the player's feet.
    pub view_offset: Vec3,
    /// Per-second lerp rate of the replicated animation move vector.
    pub animation_smoothing: f32,
    pub stamina: StaminaConfig,
}

impl Default for SurvivorConfig {
    fn default() -> Self {
        Self {
            walking_speed: 7.5,
            sprint_speed: 10.0,
            attack_speed: 3.5,
            jump_velocity: 6.5,
            max_jump_angle: 85.0,
            jump_cooldown: 0.25,
            buffer_time: 0.05,
            sprint_cost_rate: 5.0,
            sprint_stamina_to_start: 10.0,
            dodge: FixedMoveConfig {
                duration: 1.0,
                distance: 3.5,
                stamina_cost: 20.0,
                cooldown: 0.0,
            },
            roll: FixedMoveConfig {
                duration: 1.0,
                distance: 5.5,
                stamina_cost: 33.3,
                cooldown: 0.0,
            },
            punch_cooldown: 1.0,
            punch_cost: 10.0,
            punch: PunchSpec::default(),
            view_offset: Vec3::new(0.0, 1.6, 0.0),
            animation_smoothing: 4.0,
            stamina: StaminaConfig::default(),
        }
    }
}

impl SurvivorConfig {
    pub fn speed(&self, class: SpeedClass) -> f32 {
        match class {
            SpeedClass::Walking => self.walking_speed,
            SpeedClass::Sprinting => self.sprint_speed,
            SpeedClass::Attacking => self.attack_speed,
        }
    }
}

/// Requests the owner sends to the server for resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatRequest {
    Attack(NetworkAttackEvent),
    Damage(NetworkDamageEvent),
    MultiDamage(Vec<NetworkDamageEvent>),
}

#[derive(Debug, Clone, Default)]
pub struct SurvivorOutput {
    pub requests: Vec<CombatRequest>,
    pub loadout_changes: Vec<(usize, NetworkLoadout)>,
    pub selection: Option<usize>,
    pub transitions: Vec<Transition<PlayerState>>,
}

/// Everything a tick needs from outside the actor.
pub struct TickContext<'a> {
    pub dt: f32,
    pub collision: &'a dyn CollisionQuery,
    pub hitboxes: &'a dyn HitboxLookup,
    pub spawner: &'a mut dyn ItemSpawner,
}

struct PlayerActions {
    jump: Action<PlayerAction>,
    punch: Action<PlayerAction>,
    sprint: Action<PlayerAction>,
    block: Action<PlayerAction>,
    dodge: Action<PlayerAction>,
    roll: Action<PlayerAction>,
}

impl PlayerActions {
    fn new(config: &SurvivorConfig) -> Self {
        let buffer = config.buffer_time;
        Self {
            jump: Action::instant(PlayerAction::Jump, config.jump_cooldown, 0.0)
                .with_buffer_time(buffer),
            punch: Action::instant(PlayerAction::Punch, config.punch_cooldown, config.punch_cost)
                .with_buffer_time(buffer),
            sprint: Action::continuous(
                PlayerAction::Sprint,
                config.sprint_cost_rate,
                config.sprint_stamina_to_start,
            ),
            block: Action::continuous(PlayerAction::Block, 0.0, 0.0),
            dodge: Action::timed(
                PlayerAction::Dodge,
                config.dodge.duration,
                config.dodge.cooldown,
                config.dodge.stamina_cost,
            )
            .with_buffer_time(buffer),
            roll: Action::timed(
                PlayerAction::Roll,
                config.roll.duration,
                config.roll.cooldown,
                config.roll.stamina_cost,
            )
            .with_buffer_time(buffer),
        }
    }
}

pub struct Survivor {
    id: EntityId,
    config: SurvivorConfig,
    engine: Box<dyn MovementEngine>,
    machine: StateMachine<PlayerState>,
    stamina: StaminaMeter,
    loadout: PlayerLoadout,
    actions: PlayerActions,
    alive: bool,
    velocity: Vec3,
    yaw: f32,
    pitch: f32,
    anim_move: Vec2,
    dodge_direction: Vec3,
    roll_direction: Vec3,
    jumped_while_sliding: bool,
}

impl std::fmt::Debug for Survivor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Survivor")
            .field("id", &self.id)
            .field("state", &self.machine.current())
            .field("position", &self.engine.position())
            .field("stamina", &self.stamina.remaining())
            .field("alive", &self.alive)
            .finish()
    }
}

impl Survivor {
    pub fn new(
        id: EntityId,
        config: SurvivorConfig,
        machine: Arc<MachineDef<PlayerState>>,
        library: Arc<EquipmentLibrary>,
        engine: Box<dyn MovementEngine>,
        spawner: &mut dyn ItemSpawner,
    ) -> Self {
        Self {
            id,
            actions: PlayerActions::new(&config),
            stamina: StaminaMeter::new(config.stamina),
            loadout: PlayerLoadout::new(library, id, Role::owner(), spawner),
            config,
            engine,
            machine: StateMachine::new(machine),
            alive: true,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            anim_move: Vec2::ZERO,
            dodge_direction: Vec3::ZERO,
            roll_direction: Vec3::ZERO,
            jumped_while_sliding: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn config(&self) -> &SurvivorConfig {
        &self.config
    }

    pub fn state(&self) -> PlayerState {
        self.machine.current()
    }

    pub fn machine(&self) -> &StateMachine<PlayerState> {
        &self.machine
    }

    pub fn stamina(&self) -> &StaminaMeter {
        &self.stamina
    }

    pub fn loadout(&self) -> &PlayerLoadout {
        &self.loadout
    }

    pub fn loadout_mut(&mut self) -> &mut PlayerLoadout {
        &mut self.loadout
    }

    pub fn position(&self) -> Vec3 {
        self.engine.position()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn teleport(&mut self, position: Vec3) {
        self.engine.teleport(position);
        self.velocity = Vec3::ZERO;
    }

    /// False while dead or when the current state's policy blocks the action.
    pub fn can_perform(&self, action: PlayerAction) -> bool {
        self.alive && self.machine.attributes().actions.permits(action)
    }

    /// Derive death and revive edges from an authoritative notification about this player.
    /// An edge the player already went through is ignored.
    pub fn on_health_change(&mut self, change: &HealthChange) {
        if change.target != self.id {
            return;
        }
        if change.died() && self.alive {
            info!("{} died", self.id);
            self.alive = false;
            self.actions.dodge.interrupt(false, &mut self.stamina);
            self.actions.roll.interrupt(false, &mut self.stamina);
            self.machine.raise(Event::Death);
        } else if change.revived() && !self.alive {
            info!("{} revived", self.id);
            self.alive = true;
            self.machine.raise(Event::Revive);
        }
    }

    pub fn owner_state(&self) -> OwnerState {
        OwnerState {
            position: self.engine.position(),
            yaw: self.yaw,
            pitch: self.pitch,
            anim_move: self.anim_move,
            state: self.machine.current().to_wire(),
            stamina: self.stamina.remaining(),
            max_stamina: self.stamina.maximum(),
        }
    }

    fn attack_origin(&self) -> AttackOrigin {
        AttackOrigin::new(
            self.engine.position() + self.config.view_offset,
            self.yaw,
            self.pitch,
            self.id,
        )
    }

    /// Movement input rotated into the horizontal plane of the view.
    fn planar_movement(&self, input: &PlayerInput) -> Vec3 {
        let local = Vec3::new(input.move_x, 0.0, -input.move_y);
        let local = if local.length() > 1.0 { local.normalize() } else { local };
        yaw_rotation(self.yaw) * local
    }

    fn update_animation_move(&mut self, target: Vec2, smooth: bool, dt: f32) {
        let factor = if smooth {
            (self.config.animation_smoothing * dt).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.anim_move = self.anim_move.lerp(target, factor);
    }

    pub fn tick(&mut self, input: &PlayerInput, ctx: TickContext<'_>) -> SurvivorOutput {
        let TickContext {
            dt,
            collision,
            hitboxes,
            spawner,
        } = ctx;
        let mut output = SurvivorOutput::default();

        self.yaw = input.yaw;
        self.pitch = input.pitch.clamp(-90.0, 90.0);
        if let Some(index) = input.select_loadout {
            self.loadout.select(index as usize, spawner);
        }

        let raw_move = if self.alive {
            Vec2::new(input.move_x, input.move_y)
        } else {
            Vec2::ZERO
        };
        let moving = raw_move.length() >= MOVE_EPSILON;
        if !self.machine.attributes().lock_movement_animation {
            self.update_animation_move(raw_move, true, dt);
        }
        self.machine.raise(if moving {
            Event::StartMoveInput
        } else {
            Event::StopMoveInput
        });

        self.update_actions(input, moving, dt, collision, hitboxes, &mut output);
        self.update_item_actions(input, dt, collision, hitboxes, &mut output);

        if moving {
            self.machine.raise(if self.actions.sprint.is_performing() {
                Event::StartSprint
            } else {
                Event::StopSprint
            });
        }

        self.apply_movement(input, dt);
        self.update_grounded_state(dt);
        self.stamina.tick(dt);

        output.transitions = self.machine.update(dt);
        for transition in &output.transitions {
            if transition.to == PlayerState::Dodge {
                self.update_animation_move(raw_move, false, dt);
            }
        }

        output.loadout_changes = self.loadout.synchronize();
        output.selection = self.loadout.take_selection_change();
        output
    }

    fn update_actions(
        &mut self,
        input: &PlayerInput,
        moving: bool,
        dt: f32,
        collision: &dyn CollisionQuery,
        hitboxes: &dyn HitboxLookup,
        output: &mut SurvivorOutput,
    ) {
        let grounded = self.engine.grounded_state();
        let walkable = grounded.on_walkable_ground();
        if walkable {
            self.jumped_while_sliding = false;
        }
        let can_jump = grounded.standing_on_ground
            && grounded.angle <= self.config.max_jump_angle
            && !(grounded.sliding && self.jumped_while_sliding);

        let permits = |action| self.can_perform(action);
        let jump_permit = permits(PlayerAction::Jump);
        let punch_permit = permits(PlayerAction::Punch);
        let sprint_permit = permits(PlayerAction::Sprint);
        let block_permit = permits(PlayerAction::Block);
        let dodge_permit = permits(PlayerAction::Dodge);
        let roll_permit = permits(PlayerAction::Roll);

        let stamina = &mut self.stamina;
        let actions = &mut self.actions;

        actions.jump.update(
            &mut ActionContext::new(dt, input.jump, stamina)
                .permits(jump_permit)
                .condition(can_jump),
        );
        actions
            .punch
            .update(&mut ActionContext::new(dt, input.punch, stamina).permits(punch_permit));
        actions.sprint.update(
            &mut ActionContext::new(dt, input.sprint, stamina)
                .permits(sprint_permit)
                .condition(walkable && moving),
        );
        actions.block.update(
            &mut ActionContext::new(dt, input.block, stamina)
                .permits(block_permit)
                .condition(walkable),
        );
        actions.dodge.update(
            &mut ActionContext::new(dt, input.dodge, stamina)
                .permits(dodge_permit)
                .condition(walkable),
        );
        let roll_discount = if actions.dodge.is_performing() {
            actions.dodge.cost(0.0)
        } else {
            0.0
        };
        actions.roll.update(
            &mut ActionContext::new(dt, input.roll, stamina)
                .permits(roll_permit)
                .condition(walkable)
                .discount(roll_discount),
        );

        let signals: Vec<ActionSignal<PlayerAction>> = [
            &mut actions.jump,
            &mut actions.punch,
            &mut actions.sprint,
            &mut actions.block,
            &mut actions.dodge,
            &mut actions.roll,
        ]
        .into_iter()
        .flat_map(|action| action.take_signals())
        .collect();

        for signal in signals {
            self.on_action_signal(signal, input, collision, hitboxes, output);
        }
    }

    fn on_action_signal(
        &mut self,
        signal: ActionSignal<PlayerAction>,
        input: &PlayerInput,
        collision: &dyn CollisionQuery,
        hitboxes: &dyn HitboxLookup,
        output: &mut SurvivorOutput,
    ) {
        match signal {
            ActionSignal::Performed(PlayerAction::Jump) => {
                self.jumped_while_sliding = self.engine.grounded_state().sliding;
                self.velocity = self.engine.up() * self.config.jump_velocity;
                self.machine.raise(Event::Jump);
            }
            ActionSignal::Performed(PlayerAction::Punch) => {
                self.machine.raise(Event::Punch);
                let origin = self.attack_origin();
                if let Some(attack) = self.config.punch.resolve(&origin, collision, hitboxes) {
                    debug!("{} punched {}", self.id, attack.target);
                    let event = NetworkAttackEvent::from_attack(&attack, self.id);
                    output.requests.push(CombatRequest::Attack(event));
                }
            }
            ActionSignal::Started(PlayerAction::Block) => self.machine.raise(Event::BlockStart),
            ActionSignal::Stopped(PlayerAction::Block) => self.machine.raise(Event::BlockStop),
            ActionSignal::Performed(PlayerAction::Dodge) => {
                self.dodge_direction = self.fixed_move_direction(input);
                self.machine.raise(Event::DodgeStart);
            }
            ActionSignal::Completed {
                action: PlayerAction::Dodge,
                ..
            } => self.machine.raise(Event::DodgeStop),
            ActionSignal::Performed(PlayerAction::Roll) => {
                self.roll_direction = self.fixed_move_direction(input);
                self.machine.raise(Event::RollStart);
            }
            ActionSignal::Completed {
                action: PlayerAction::Roll,
                ..
            } => self.machine.raise(Event::RollStop),
            _ => {}
        }
    }

    /// Direction of a dodge or roll: the movement input, or straight back without one.
    fn fixed_move_direction(&self, input: &PlayerInput) -> Vec3 {
        let direction = self.planar_movement(input);
        if direction.length() < MOVE_EPSILON {
            -(yaw_rotation(self.yaw) * Vec3::NEG_Z)
        } else {
            direction.normalize()
        }
    }

    fn update_item_actions(
        &mut self,
        input: &PlayerInput,
        dt: f32,
        collision: &dyn CollisionQuery,
        hitboxes: &dyn HitboxLookup,
        output: &mut SurvivorOutput,
    ) {
        let origin = self.attack_origin();
        let two_handed =
            self.loadout.current().main_def().map(|def| def.weight) == Some(ItemWeight::TwoHanded);
        let library_specs = {
            let current = self.loadout.current();
            let main = current.main_def().map(|def| (def.primary, def.secondary));
            let offhand = current.offhand_def().map(|def| def.primary);
            (main, offhand)
        };
        let melee_permit = self.can_perform(PlayerAction::MeleeAttack);
        let primary_permit = self.can_perform(PlayerAction::PrimaryItem);
        let secondary_permit = self.can_perform(PlayerAction::SecondaryItem);
        let permit_for = |action: PlayerAction| match action {
            PlayerAction::MeleeAttack => melee_permit,
            PlayerAction::PrimaryItem => primary_permit,
            PlayerAction::SecondaryItem => secondary_permit,
            _ => true,
        };

        let mut performed = Vec::new();
        let stamina = &mut self.stamina;
        let current = self.loadout.current_mut();

        let mut drive =
            |held: Option<&mut HeldItem>, primary: bool, pressed: bool| -> Option<bool> {
                let held = held?;
                let action = if primary {
                    held.primary.as_mut()?
                } else {
                    held.secondary.as_mut()?
                };
                let permit = permit_for(action.kind());
                action.update(&mut ActionContext::new(dt, pressed, stamina).permits(permit));
                let fired = action
                    .take_signals()
                    .iter()
                    .any(|signal| matches!(signal, ActionSignal::Performed(_)));
                Some(fired)
            };

        if drive(current.main_mut(), true, input.primary) == Some(true) {
            performed.push(library_specs.0.and_then(|(primary, _)| primary));
        }
        if two_handed {
            if drive(current.main_mut(), false, input.secondary) == Some(true) {
                performed.push(library_specs.0.and_then(|(_, secondary)| secondary));
            }
        } else if drive(current.offhand_mut(), true, input.secondary) == Some(true) {
            performed.push(library_specs.1.flatten());
        }

        for spec in performed.into_iter().flatten() {
            match spec.behavior {
                ItemBehavior::Basic => debug!("{} used {:?}", self.id, spec.action),
                ItemBehavior::Melee(melee) => {
                    self.machine.raise(Event::MeleeAttack {
                        attack: melee.attack_type,
                        cooldown: melee.cooldown,
                    });
                    match melee.resolve(&origin, collision, hitboxes) {
                        MeleeOutcome::Single(event) => {
                            if let Some(event) = NetworkDamageEvent::from_damage_event(&event) {
                                output.requests.push(CombatRequest::Damage(event));
                            }
                        }
                        MeleeOutcome::Multi(events) => {
                            let events: Vec<NetworkDamageEvent> = events
                                .iter()
                                .filter_map(NetworkDamageEvent::from_damage_event)
                                .collect();
                            if !events.is_empty() {
                                output.requests.push(CombatRequest::MultiDamage(events));
                            }
                        }
                    }
                }
            }
        }
    }

    fn apply_movement(&mut self, input: &PlayerInput, dt: f32) {
        let attributes = self.machine.attributes();
        if attributes.block_movement {
            self.engine.move_by(self.velocity * dt);
            return;
        }

        let desired = match self.machine.current() {
            PlayerState::Dodge => fixed_movement_velocity(
                self.dodge_direction,
                self.config.dodge.distance,
                self.actions.dodge.elapsed(),
                self.config.dodge.duration,
            ),
            PlayerState::Rolling => fixed_movement_velocity(
                self.roll_direction,
                self.config.roll.distance,
                self.actions.roll.elapsed(),
                self.config.roll.duration,
            ),
            _ if self.alive => self.planar_movement(input) * self.config.speed(attributes.speed),
            _ => Vec3::ZERO,
        };

        self.engine.move_by((desired + self.velocity) * dt);
    }

    fn update_grounded_state(&mut self, dt: f32) {
        let grounded = self.engine.grounded_state();
        if grounded.falling {
            self.machine.raise(Event::LeaveGround);
        } else if grounded.sliding {
            self.machine.raise(Event::SteepSlope);
        } else if grounded.standing_on_ground {
            self.machine.raise(Event::Grounded);
        }

        if grounded.falling || grounded.sliding {
            self.velocity += GRAVITY * dt;
        } else if grounded.standing_on_ground && self.velocity.y <= 0.0 {
            self.velocity = Vec3::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::SphereWorld;
    use crate::entity::Transform;
    use crate::equipment::{InstanceRegistry, GREATAXE, SPEAR, SWORD};
    use crate::health::{DamageSource, EventKind};
    use crate::hitbox::ResolvedHitbox;
    use crate::movement::FlatGroundEngine;
    use crate::states::player_machine;
    use assert_approx_eq::assert_approx_eq;
    use std::collections::HashMap;

    const DT: f32 = 0.02;

    struct Harness {
        survivor: Survivor,
        world: SphereWorld,
        lookup: HashMap<(EntityId, String), ResolvedHitbox>,
        spawner: InstanceRegistry,
    }

    impl Harness {
        fn new() -> Self {
            let mut spawner = InstanceRegistry::new();
            let survivor = Survivor::new(
                EntityId(1),
                SurvivorConfig::default(),
                player_machine(),
                Arc::new(EquipmentLibrary::with_defaults()),
                Box::new(FlatGroundEngine::new(Vec3::ZERO)),
                &mut spawner,
            );
            Self {
                survivor,
                world: SphereWorld::new(),
                lookup: HashMap::new(),
                spawner,
            }
        }

        fn add_target(&mut self, owner: u32, position: Vec3) {
            let owner = EntityId(owner);
            self.world.add_hitbox(owner, "chest", position, 0.45);
            self.lookup.insert(
                (owner, "chest".to_string()),
                ResolvedHitbox {
                    owner,
                    id: "chest".to_string(),
                    critical: false,
                    disabled: false,
                    owner_transform: Transform::at(position - Vec3::Y),
                },
            );
        }

        fn tick(&mut self, input: PlayerInput) -> SurvivorOutput {
            self.survivor.tick(
                &input,
                TickContext {
                    dt: DT,
                    collision: &self.world,
                    hitboxes: &self.lookup,
                    spawner: &mut self.spawner,
                },
            )
        }

        fn idle(&mut self, seconds: f32) {
            let ticks = (seconds / DT).ceil() as usize;
            for _ in 0..ticks {
                self.tick(PlayerInput::default());
            }
        }
    }

    fn change(target: u32, previous: f32, current: f32) -> HealthChange {
        HealthChange {
            target: EntityId(target),
            source: DamageSource::Empty,
            kind: if current < previous {
                EventKind::Damage
            } else {
                EventKind::Heal
            },
            previous,
            current,
            amount: (previous - current).abs(),
        }
    }

    #[test]
    fn test_walking_moves_forward() {
        let mut harness = Harness::new();
        let input = PlayerInput {
            move_y: 1.0,
            ..Default::default()
        };
        harness.tick(input);
        harness.tick(input);

        assert_eq!(harness.survivor.state(), PlayerState::Walking);
        assert_approx_eq!(harness.survivor.position().z, -2.0 * 7.5 * DT, 1e-4);
    }

    #[test]
    fn test_sprint_needs_start_stamina() {
        let mut harness = Harness::new();
        harness.survivor.stamina.exhaust(95.0);
        let input = PlayerInput {
            move_y: 1.0,
            sprint: true,
            ..Default::default()
        };
        for _ in 0..5 {
            harness.tick(input);
        }
        assert_eq!(harness.survivor.state(), PlayerState::Walking);

        harness.survivor.stamina.restore(20.0);
        harness.tick(input);
        harness.tick(input);
        assert_eq!(harness.survivor.state(), PlayerState::Sprinting);
    }

    #[test]
    fn test_jump_leaves_ground_and_lands() {
        let mut harness = Harness::new();
        let output = harness.tick(PlayerInput {
            jump: true,
            ..Default::default()
        });
        assert!(output
            .transitions
            .iter()
            .any(|transition| transition.to == PlayerState::Jump));
        assert!(harness.survivor.position().y > 0.0);

        harness.idle(2.5);
        assert_approx_eq!(harness.survivor.position().y, 0.0);
        assert!(matches!(
            harness.survivor.state(),
            PlayerState::Landing | PlayerState::Idle
        ));
    }

    #[test]
    fn test_punch_sends_attack_only_on_hit() {
        let mut harness = Harness::new();
        let output = harness.tick(PlayerInput {
            punch: true,
            ..Default::default()
        });
        assert!(output.requests.is_empty());
        assert_eq!(harness.survivor.state(), PlayerState::Punching);
        assert_approx_eq!(harness.survivor.stamina().remaining(), 90.0);

        harness.idle(1.2);
        harness.add_target(2, Vec3::new(0.0, 1.6, -1.0));
        let output = harness.tick(PlayerInput {
            punch: true,
            ..Default::default()
        });
        assert_eq!(output.requests.len(), 1);
        match &output.requests[0] {
            CombatRequest::Attack(attack) => {
                assert_eq!(attack.target, EntityId(2));
                assert_eq!(attack.source, EntityId(1));
                assert_approx_eq!(attack.damage, 10.0);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_punch_blocked_while_punching() {
        let mut harness = Harness::new();
        harness.tick(PlayerInput {
            punch: true,
            ..Default::default()
        });
        assert!(!harness.survivor.can_perform(PlayerAction::Punch));
        assert!(!harness.survivor.can_perform(PlayerAction::Jump));
    }

    #[test]
    fn test_dodge_moves_back_and_returns_to_idle() {
        let mut harness = Harness::new();
        harness.tick(PlayerInput {
            dodge: true,
            ..Default::default()
        });
        assert_eq!(harness.survivor.state(), PlayerState::Dodge);
        assert!(harness.survivor.machine().attributes().passthrough);
        assert_approx_eq!(harness.survivor.stamina().remaining(), 80.0);

        harness.idle(1.1);
        assert_eq!(harness.survivor.state(), PlayerState::Idle);
        assert!(harness.survivor.position().z > 1.0);
    }

    #[test]
    fn test_death_and_revive_from_notifications() {
        let mut harness = Harness::new();
        harness.survivor.on_health_change(&change(1, 30.0, 0.0));
        harness.idle(0.1);
        assert_eq!(harness.survivor.state(), PlayerState::Dying);
        assert!(!harness.survivor.can_perform(PlayerAction::Punch));

        harness.survivor.on_health_change(&change(2, 30.0, 0.0));
        harness.idle(2.0);
        assert_eq!(harness.survivor.state(), PlayerState::Dead);

        harness.survivor.on_health_change(&change(1, 0.0, 100.0));
        harness.idle(0.1);
        assert_eq!(harness.survivor.state(), PlayerState::Reviving);
        assert!(harness.survivor.is_alive());
    }

    #[test]
    fn test_repeated_edges_are_ignored() {
        let mut harness = Harness::new();
        harness.survivor.on_health_change(&change(1, 30.0, 0.0));
        harness.idle(2.0);
        assert_eq!(harness.survivor.state(), PlayerState::Dead);

        harness.survivor.on_health_change(&change(1, 30.0, 0.0));
        harness.idle(0.1);
        assert_eq!(harness.survivor.state(), PlayerState::Dead);

        harness.survivor.on_health_change(&change(1, 0.0, 100.0));
        harness.idle(1.5);
        assert_eq!(harness.survivor.state(), PlayerState::Idle);

        harness.survivor.on_health_change(&change(1, 0.0, 100.0));
        harness.idle(0.1);
        assert_eq!(harness.survivor.state(), PlayerState::Idle);
        assert!(harness.survivor.is_alive());
    }

    #[test]
    fn test_dead_player_cannot_move() {
        let mut harness = Harness::new();
        harness.survivor.on_health_change(&change(1, 10.0, 0.0));
        for _ in 0..10 {
            harness.tick(PlayerInput {
                move_y: 1.0,
                ..Default::default()
            });
        }
        assert_approx_eq!(harness.survivor.position().z, 0.0);
    }

    #[test]
    fn test_sword_swing_requests_damage() {
        let mut harness = Harness::new();
        let spawner = &mut harness.spawner;
        assert!(harness.survivor.loadout_mut().add_item(SWORD, 0, spawner));
        harness.add_target(2, Vec3::new(0.0, 1.6, -0.9));

        // Freshly equipped items wait out the swap cooldown.
        let output = harness.tick(PlayerInput {
            primary: true,
            ..Default::default()
        });
        assert!(output.requests.is_empty());
        assert_eq!(output.loadout_changes.len(), 1);

        harness.idle(0.6);
        let output = harness.tick(PlayerInput {
            primary: true,
            ..Default::default()
        });
        assert_eq!(harness.survivor.state(), PlayerState::Attacking);
        match &output.requests[..] {
            [CombatRequest::Damage(event)] => {
                assert_eq!(event.target, EntityId(2));
                assert_eq!(event.source, Some(EntityId(1)));
            }
            other => panic!("unexpected requests {:?}", other),
        }
    }

    #[test]
    fn test_spear_stab_requests_multi_damage() {
        let mut harness = Harness::new();
        let spawner = &mut harness.spawner;
        assert!(harness.survivor.loadout_mut().add_item(SPEAR, 0, spawner));
        harness.add_target(2, Vec3::new(0.0, 1.6, -1.0));
        harness.add_target(3, Vec3::new(0.0, 1.6, -2.0));

        harness.idle(0.6);
        let output = harness.tick(PlayerInput {
            primary: true,
            ..Default::default()
        });
        match &output.requests[..] {
            [CombatRequest::MultiDamage(events)] => assert_eq!(events.len(), 2),
            other => panic!("unexpected requests {:?}", other),
        }
    }

    #[test]
    fn test_greataxe_cleave_damages_targets_across_the_swing() {
        let mut harness = Harness::new();
        let spawner = &mut harness.spawner;
        assert!(harness.survivor.loadout_mut().add_item(GREATAXE, 0, spawner));
        harness.add_target(2, Vec3::new(0.0, 1.6, -1.0));
        harness.add_target(3, Vec3::new(0.8, 1.6, -1.0));

        harness.idle(0.6);
        let output = harness.tick(PlayerInput {
            primary: true,
            ..Default::default()
        });
        assert_eq!(harness.survivor.state(), PlayerState::Attacking);
        match &output.requests[..] {
            [CombatRequest::MultiDamage(events)] => {
                let targets: Vec<EntityId> = events.iter().map(|event| event.target).collect();
                assert_eq!(targets, vec![EntityId(2), EntityId(3)]);
                for event in events {
                    assert_approx_eq!(event.amount, 30.0);
                }
            }
            other => panic!("unexpected requests {:?}", other),
        }
    }

    #[test]
    fn test_selecting_loadout_is_published() {
        let mut harness = Harness::new();
        let output = harness.tick(PlayerInput {
            select_loadout: Some(2),
            ..Default::default()
        });
        assert_eq!(output.selection, Some(2));
        assert_eq!(harness.survivor.loadout().selected(), 2);
    }

    #[test]
    fn test_owner_state_reports_wire_state() {
        let mut harness = Harness::new();
        harness.tick(PlayerInput {
            move_x: 1.0,
            yaw: 90.0,
            ..Default::default()
        });
        let state = harness.survivor.owner_state();
        assert_eq!(state.state, PlayerState::Walking.to_wire());
        assert_approx_eq!(state.yaw, 90.0);
        assert!(state.anim_move.x > 0.0);
        assert_approx_eq!(state.max_stamina, 100.0);
    }
}

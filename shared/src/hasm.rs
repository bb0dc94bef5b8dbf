//! Table-driven animation state machine shared by every entity type.
//!
//! A [`MachineDef`] is built once per entity type and shared through an `Arc`. Each live
//! entity owns a [`StateMachine`] pointing at its definition. Game logic raises [`Event`]s;
//! on [`StateMachine::update`] the pending events are matched against the current state's
//! table (from-any-state transitions first), then the elapsed-time and animation-complete
//! triggers are checked. Every transition taken is returned so the owner can run its exit
//! and entry behaviour for the states involved.

use crate::action::PlayerAction;
use crate::entity::EntityId;
use crate::melee::MeleeAttackType;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Every event any entity's machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    StartMoveInput,
    StopMoveInput,
    SteepSlope,
    LeaveGround,
    Grounded,
    StartSprint,
    StopSprint,
    Jump,
    DodgeStart,
    DodgeStop,
    RollStart,
    RollStop,
    BlockStart,
    BlockStop,
    Punch,
    MeleeAttack {
        attack: MeleeAttackType,
        cooldown: f32,
    },
    Death,
    Revive,
    Hit,
    StartRoam {
        roam_time: f32,
        heading: f32,
    },
    StopRoam,
    TargetIdentified {
        target: EntityId,
    },
    TargetLost,
    Attack,
    DrawArrow,
}

/// Payload-free mirror of [`Event`] used as the transition table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    StartMoveInput,
    StopMoveInput,
    SteepSlope,
    LeaveGround,
    Grounded,
    StartSprint,
    StopSprint,
    Jump,
    DodgeStart,
    DodgeStop,
    RollStart,
    RollStop,
    BlockStart,
    BlockStop,
    Punch,
    MeleeAttack,
    Death,
    Revive,
    Hit,
    StartRoam,
    StopRoam,
    TargetIdentified,
    TargetLost,
    Attack,
    DrawArrow,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::StartMoveInput => EventType::StartMoveInput,
            Event::StopMoveInput => EventType::StopMoveInput,
            Event::SteepSlope => EventType::SteepSlope,
            Event::LeaveGround => EventType::LeaveGround,
            Event::Grounded => EventType::Grounded,
            Event::StartSprint => EventType::StartSprint,
            Event::StopSprint => EventType::StopSprint,
            Event::Jump => EventType::Jump,
            Event::DodgeStart => EventType::DodgeStart,
            Event::DodgeStop => EventType::DodgeStop,
            Event::RollStart => EventType::RollStart,
            Event::RollStop => EventType::RollStop,
            Event::BlockStart => EventType::BlockStart,
            Event::BlockStop => EventType::BlockStop,
            Event::Punch => EventType::Punch,
            Event::MeleeAttack { .. } => EventType::MeleeAttack,
            Event::Death => EventType::Death,
            Event::Revive => EventType::Revive,
            Event::Hit => EventType::Hit,
            Event::StartRoam { .. } => EventType::StartRoam,
            Event::StopRoam => EventType::StopRoam,
            Event::TargetIdentified { .. } => EventType::TargetIdentified,
            Event::TargetLost => EventType::TargetLost,
            Event::Attack => EventType::Attack,
            Event::DrawArrow => EventType::DrawArrow,
        }
    }
}

/// A closed set of states for one entity type.
pub trait StateId: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn name(&self) -> &'static str;

    fn to_wire(&self) -> u8 {
        Self::ALL.iter().position(|state| state == self).unwrap_or(0) as u8
    }

    fn from_wire(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Which actions a state lets its actor perform.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPolicy {
    AllowAll,
    BlockAll,
    Block(Vec<PlayerAction>),
    Allow(Vec<PlayerAction>),
}

impl ActionPolicy {
    pub fn permits(&self, action: PlayerAction) -> bool {
        match self {
            ActionPolicy::AllowAll => true,
            ActionPolicy::BlockAll => false,
            ActionPolicy::Block(blocked) => !blocked.contains(&action),
            ActionPolicy::Allow(allowed) => allowed.contains(&action),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedClass {
    Walking,
    Sprinting,
    Attacking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrowAim {
    pub show_arrow: bool,
    pub drawing_arrow: bool,
}

/// Properties other systems read off the current state each tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StateAttributes {
    pub invulnerable: bool,
    pub passthrough: bool,
    pub block_enabled: bool,
    pub actions: ActionPolicy,
    pub speed: SpeedClass,
    pub block_movement: bool,
    pub lock_movement_animation: bool,
    pub arrow_aim: ArrowAim,
}

static DEFAULT_ATTRIBUTES: StateAttributes = StateAttributes::DEFAULT;

impl StateAttributes {
    pub const DEFAULT: StateAttributes = StateAttributes {
        invulnerable: false,
        passthrough: false,
        block_enabled: false,
        actions: ActionPolicy::AllowAll,
        speed: SpeedClass::Walking,
        block_movement: false,
        lock_movement_animation: false,
        arrow_aim: ArrowAim {
            show_arrow: false,
            drawing_arrow: false,
        },
    };
}

impl Default for StateAttributes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub name: &'static str,
    pub length: f32,
}

#[derive(Debug, Clone)]
pub struct StateDef<S> {
    pub clip: Option<Clip>,
    pub on_event: Vec<(EventType, S)>,
    pub after_time: Option<(f32, S)>,
    pub on_animation_complete: Option<S>,
    pub attributes: StateAttributes,
}

impl<S> Default for StateDef<S> {
    fn default() -> Self {
        Self {
            clip: None,
            on_event: Vec::new(),
            after_time: None,
            on_animation_complete: None,
            attributes: StateAttributes::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnyStateTransition<S> {
    pub event: EventType,
    pub to: S,
    pub except: Vec<S>,
}

/// Immutable transition table for one entity type.
#[derive(Debug, Clone)]
pub struct MachineDef<S: StateId> {
    initial: S,
    states: HashMap<S, StateDef<S>>,
    any_state: Vec<AnyStateTransition<S>>,
}

impl<S: StateId> MachineDef<S> {
    pub fn builder(initial: S) -> MachineBuilder<S> {
        MachineBuilder {
            def: MachineDef {
                initial,
                states: S::ALL.iter().map(|state| (*state, StateDef::default())).collect(),
                any_state: Vec::new(),
            },
        }
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    pub fn state(&self, state: S) -> Option<&StateDef<S>> {
        self.states.get(&state)
    }

    fn any_state_target(&self, current: S, event: EventType) -> Option<S> {
        self.any_state
            .iter()
            .find(|transition| transition.event == event && !transition.except.contains(&current))
            .map(|transition| transition.to)
    }

    fn table_target(&self, current: S, event: EventType) -> Option<S> {
        self.states.get(&current).and_then(|def| {
            def.on_event
                .iter()
                .find(|(trigger, _)| *trigger == event)
                .map(|(_, to)| *to)
        })
    }
}

pub struct MachineBuilder<S: StateId> {
    def: MachineDef<S>,
}

impl<S: StateId> MachineBuilder<S> {
    pub fn state(
        mut self,
        state: S,
        configure: impl FnOnce(StateBuilder<S>) -> StateBuilder<S>,
    ) -> Self {
        let current = self.def.states.remove(&state).unwrap_or_default();
        let built = configure(StateBuilder { def: current });
        self.def.states.insert(state, built.def);
        self
    }

    /// Transition into `to` on `event` from every state not listed in `except`.
    pub fn from_any(mut self, event: EventType, to: S, except: &[S]) -> Self {
        self.def.any_state.push(AnyStateTransition {
            event,
            to,
            except: except.to_vec(),
        });
        self
    }

    pub fn build(self) -> Arc<MachineDef<S>> {
        Arc::new(self.def)
    }
}

pub struct StateBuilder<S> {
    def: StateDef<S>,
}

impl<S> StateBuilder<S> {
    pub fn clip(mut self, name: &'static str, length: f32) -> Self {
        self.def.clip = Some(Clip { name, length });
        self
    }

    pub fn on(mut self, event: EventType, to: S) -> Self {
        self.def.on_event.push((event, to));
        self
    }

    pub fn after(mut self, seconds: f32, to: S) -> Self {
        self.def.after_time = Some((seconds, to));
        self
    }

    pub fn on_animation_complete(mut self, to: S) -> Self {
        self.def.on_animation_complete = Some(to);
        self
    }

    pub fn invulnerable(mut self) -> Self {
        self.def.attributes.invulnerable = true;
        self
    }

    pub fn passthrough(mut self) -> Self {
        self.def.attributes.passthrough = true;
        self
    }

    pub fn block_enabled(mut self) -> Self {
        self.def.attributes.block_enabled = true;
        self
    }

    pub fn block_all_actions(mut self) -> Self {
        self.def.attributes.actions = ActionPolicy::BlockAll;
        self
    }

    pub fn block_actions(mut self, actions: &[PlayerAction]) -> Self {
        self.def.attributes.actions = ActionPolicy::Block(actions.to_vec());
        self
    }

    pub fn allow_only(mut self, actions: &[PlayerAction]) -> Self {
        self.def.attributes.actions = ActionPolicy::Allow(actions.to_vec());
        self
    }

    pub fn speed(mut self, speed: SpeedClass) -> Self {
        self.def.attributes.speed = speed;
        self
    }

    pub fn block_movement(mut self) -> Self {
        self.def.attributes.block_movement = true;
        self
    }

    pub fn lock_movement_animation(mut self) -> Self {
        self.def.attributes.lock_movement_animation = true;
        self
    }

    pub fn arrow_aim(mut self, show_arrow: bool, drawing_arrow: bool) -> Self {
        self.def.attributes.arrow_aim = ArrowAim {
            show_arrow,
            drawing_arrow,
        };
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Event(Event),
    AnyState(Event),
    AfterTime,
    AnimationComplete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
    pub trigger: Trigger,
}

#[derive(Debug, Clone)]
pub struct StateMachine<S: StateId> {
    def: Arc<MachineDef<S>>,
    current: S,
    elapsed: f32,
    animation_complete: bool,
    pending: VecDeque<Event>,
}

impl<S: StateId> StateMachine<S> {
    pub fn new(def: Arc<MachineDef<S>>) -> Self {
        Self {
            current: def.initial(),
            def,
            elapsed: 0.0,
            animation_complete: false,
            pending: VecDeque::new(),
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn display_name(&self) -> &'static str {
        self.current.name()
    }

    pub fn time_in_state(&self) -> f32 {
        self.elapsed
    }

    pub fn is(&self, state: S) -> bool {
        self.current == state
    }

    pub fn attributes(&self) -> &StateAttributes {
        self.def
            .state(self.current)
            .map(|def| &def.attributes)
            .unwrap_or(&DEFAULT_ATTRIBUTES)
    }

    pub fn clip(&self) -> Option<Clip> {
        self.def.state(self.current).and_then(|def| def.clip)
    }

    /// Queue an event for the next update.
    pub fn raise(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Mark the current clip as finished ahead of its nominal length.
    pub fn mark_animation_complete(&mut self) {
        self.animation_complete = true;
    }

    /// Replica-side apply of an authoritative state value. Returns true if it changed.
    pub fn force_state(&mut self, state: S) -> bool {
        if self.current == state {
            return false;
        }
        self.enter(state);
        self.pending.clear();
        true
    }

    fn enter(&mut self, state: S) {
        self.current = state;
        self.elapsed = 0.0;
        self.animation_complete = false;
    }

    fn take(&mut self, to: S, trigger: Trigger, transitions: &mut Vec<Transition<S>>) {
        transitions.push(Transition {
            from: self.current,
            to,
            trigger,
        });
        self.enter(to);
    }

    fn clip_finished(&self) -> bool {
        self.animation_complete || self.clip().map_or(false, |clip| self.elapsed >= clip.length)
    }

    /// Advance the clock and apply pending events and timed triggers.
    ///
    /// Every queued event is drained this tick in raise order, each matched against the
    /// state the previous one left, so one update can take several transitions. Timed and
    /// animation-complete triggers are checked once afterwards against the final state,
    /// whose clock restarts on entry.
    pub fn update(&mut self, dt: f32) -> Vec<Transition<S>> {
        let mut transitions = Vec::new();
        self.elapsed += dt;

        while let Some(event) = self.pending.pop_front() {
            let event_type = event.event_type();
            if let Some(to) = self.def.any_state_target(self.current, event_type) {
                self.take(to, Trigger::AnyState(event), &mut transitions);
            } else if let Some(to) = self.def.table_target(self.current, event_type) {
                self.take(to, Trigger::Event(event), &mut transitions);
            }
        }

        let Some((after_time, on_complete)) = self
            .def
            .state(self.current)
            .map(|def| (def.after_time, def.on_animation_complete))
        else {
            return transitions;
        };

        if let Some((seconds, to)) = after_time {
            if self.elapsed >= seconds {
                self.take(to, Trigger::AfterTime, &mut transitions);
                return transitions;
            }
        }

        if let Some(to) = on_complete {
            if self.clip_finished() {
                self.take(to, Trigger::AnimationComplete, &mut transitions);
            }
        }

        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Door {
        Closed,
        Opening,
        Open,
        Broken,
    }

    impl StateId for Door {
        const ALL: &'static [Self] = &[Door::Closed, Door::Opening, Door::Open, Door::Broken];

        fn name(&self) -> &'static str {
            match self {
                Door::Closed => "Closed",
                Door::Opening => "Opening",
                Door::Open => "Open",
                Door::Broken => "Broken",
            }
        }
    }

    fn door() -> StateMachine<Door> {
        let def = MachineDef::builder(Door::Closed)
            .state(Door::Closed, |s| s.on(EventType::StartMoveInput, Door::Opening))
            .state(Door::Opening, |s| {
                s.clip("Opening", 0.5)
                    .on_animation_complete(Door::Open)
                    .block_all_actions()
            })
            .state(Door::Open, |s| s.after(1.0, Door::Closed))
            .state(Door::Broken, |s| s.invulnerable())
            .from_any(EventType::Death, Door::Broken, &[Door::Broken])
            .build();
        StateMachine::new(def)
    }

    #[test]
    fn test_starts_in_initial_state() {
        let machine = door();
        assert_eq!(machine.current(), Door::Closed);
        assert_eq!(machine.display_name(), "Closed");
    }

    #[test]
    fn test_event_transition_applies_on_update() {
        let mut machine = door();
        machine.raise(Event::StartMoveInput);
        assert_eq!(machine.current(), Door::Closed);

        let transitions = machine.update(0.016);
        assert_eq!(machine.current(), Door::Opening);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].from, Door::Closed);
        assert_eq!(transitions[0].trigger, Trigger::Event(Event::StartMoveInput));
    }

    #[test]
    fn test_unlisted_event_is_ignored() {
        let mut machine = door();
        machine.raise(Event::Jump);
        assert!(machine.update(0.016).is_empty());
        assert_eq!(machine.current(), Door::Closed);
        assert_eq!(machine.pending_events(), 0);
    }

    #[test]
    fn test_animation_complete_transition() {
        let mut machine = door();
        machine.raise(Event::StartMoveInput);
        machine.update(0.0);

        machine.update(0.3);
        assert_eq!(machine.current(), Door::Opening);
        let transitions = machine.update(0.3);
        assert_eq!(machine.current(), Door::Open);
        assert_eq!(transitions[0].trigger, Trigger::AnimationComplete);
    }

    #[test]
    fn test_mark_animation_complete_shortcuts_clip() {
        let mut machine = door();
        machine.raise(Event::StartMoveInput);
        machine.update(0.0);
        machine.mark_animation_complete();
        machine.update(0.0);
        assert_eq!(machine.current(), Door::Open);
    }

    #[test]
    fn test_after_time_resets_elapsed() {
        let mut machine = door();
        machine.force_state(Door::Open);
        machine.update(0.6);
        assert_eq!(machine.current(), Door::Open);
        machine.update(0.6);
        assert_eq!(machine.current(), Door::Closed);
        assert_eq!(machine.time_in_state(), 0.0);
    }

    #[test]
    fn test_from_any_takes_precedence_and_respects_except() {
        let mut machine = door();
        machine.raise(Event::StartMoveInput);
        machine.raise(Event::Death);
        let transitions = machine.update(0.016);
        assert_eq!(transitions.len(), 2);
        assert_eq!(machine.current(), Door::Broken);
        assert_eq!(transitions[1].trigger, Trigger::AnyState(Event::Death));

        machine.raise(Event::Death);
        assert!(machine.update(0.016).is_empty());
    }

    #[test]
    fn test_queued_events_drain_in_one_update() {
        let mut machine = door();
        machine.raise(Event::StartMoveInput);
        machine.raise(Event::StartMoveInput);
        machine.raise(Event::Death);
        assert_eq!(machine.pending_events(), 3);

        let transitions = machine.update(1.0);
        assert_eq!(machine.pending_events(), 0);
        // The second StartMoveInput meets Opening, which does not list it.
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].to, Door::Opening);
        assert_eq!(transitions[1].to, Door::Broken);
    }

    #[test]
    fn test_entered_state_clock_restarts_within_update() {
        let mut machine = door();
        machine.raise(Event::StartMoveInput);
        // dt exceeds the 0.5s clip, but Opening is entered after the clock advanced.
        let transitions = machine.update(1.0);
        assert_eq!(transitions.len(), 1);
        assert_eq!(machine.current(), Door::Opening);
        assert_eq!(machine.time_in_state(), 0.0);
    }

    #[test]
    fn test_attributes_follow_state() {
        let mut machine = door();
        assert!(machine.attributes().actions.permits(PlayerAction::Punch));
        machine.force_state(Door::Opening);
        assert!(!machine.attributes().actions.permits(PlayerAction::Punch));
        machine.force_state(Door::Broken);
        assert!(machine.attributes().invulnerable);
    }

    #[test]
    fn test_force_state_is_idempotent() {
        let mut machine = door();
        assert!(machine.force_state(Door::Open));
        assert!(!machine.force_state(Door::Open));
    }

    #[test]
    fn test_wire_index_round_trip() {
        for state in Door::ALL {
            assert_eq!(Door::from_wire(state.to_wire()), Some(*state));
        }
        assert_eq!(Door::from_wire(200), None);
    }

    #[test]
    fn test_action_policy() {
        let guard = ActionPolicy::Allow(vec![PlayerAction::Block]);
        assert!(guard.permits(PlayerAction::Block));
        assert!(!guard.permits(PlayerAction::Jump));

        let busy = ActionPolicy::Block(vec![PlayerAction::Sprint]);
        assert!(!busy.permits(PlayerAction::Sprint));
        assert!(busy.permits(PlayerAction::Punch));
    }
}

//! Conditional, cooldown-gated and stamina-gated actions.
//!
//! One [`Action`] struct covers the three behaviours (instant, continuous while held,
//! timed). The action only decides *when* it performs; what performing means is decided
//! by the owner reacting to the [`ActionSignal`]s the action emits.

use crate::input::BufferedInput;
use crate::stamina::StaminaMeter;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerAction {
    Move,
    Jump,
    Punch,
    Sprint,
    Block,
    Dodge,
    Roll,
    Interact,
    MeleeAttack,
    PrimaryItem,
    SecondaryItem,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionMode {
    /// Fires once per press edge, or every tick while held if `perform_while_held`.
    Instant { perform_while_held: bool },
    /// Fires every tick while held, paying `cost_rate * dt` each tick.
    Continuous {
        cost_rate: f32,
        stamina_required_to_start: f32,
    },
    /// Fires once then stays performing for `duration` seconds.
    Timed { duration: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionSignal<A> {
    Performed(A),
    Started(A),
    Stopped(A),
    Completed { action: A, interrupted: bool },
}

/// Everything an action reads from its owner for one tick.
pub struct ActionContext<'a> {
    pub dt: f32,
    pub pressed: bool,
    /// Actor-level permission, normally derived from the current state.
    pub actor_permits: bool,
    /// Action-specific precondition such as being on walkable ground.
    pub condition: bool,
    /// Subtracted from the configured cost, never below zero.
    pub cost_discount: f32,
    pub stamina: &'a mut StaminaMeter,
}

impl<'a> ActionContext<'a> {
    pub fn new(dt: f32, pressed: bool, stamina: &'a mut StaminaMeter) -> Self {
        Self {
            dt,
            pressed,
            actor_permits: true,
            condition: true,
            cost_discount: 0.0,
            stamina,
        }
    }

    pub fn permits(mut self, actor_permits: bool) -> Self {
        self.actor_permits = actor_permits;
        self
    }

    pub fn condition(mut self, condition: bool) -> Self {
        self.condition = condition;
        self
    }

    pub fn discount(mut self, cost_discount: f32) -> Self {
        self.cost_discount = cost_discount;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Action<A> {
    kind: A,
    mode: ActionMode,
    cooldown: f32,
    stamina_cost: f32,
    enabled: bool,
    /// Minimum time after activation before it may perform (item swap delay).
    activation_delay: f32,
    since_perform: f32,
    since_activation: f32,
    performing: bool,
    elapsed: f32,
    spent: f32,
    input: BufferedInput,
    signals: Vec<ActionSignal<A>>,
}

impl<A: Copy + std::fmt::Debug> Action<A> {
    pub fn new(kind: A, mode: ActionMode, cooldown: f32, stamina_cost: f32) -> Self {
        Self {
            kind,
            mode,
            cooldown,
            stamina_cost,
            enabled: true,
            activation_delay: 0.0,
            since_perform: f32::INFINITY,
            since_activation: f32::INFINITY,
            performing: false,
            elapsed: 0.0,
            spent: 0.0,
            input: BufferedInput::default(),
            signals: Vec::new(),
        }
    }

    pub fn instant(kind: A, cooldown: f32, stamina_cost: f32) -> Self {
        Self::new(
            kind,
            ActionMode::Instant {
                perform_while_held: false,
            },
            cooldown,
            stamina_cost,
        )
    }

    pub fn continuous(kind: A, cost_rate: f32, stamina_required_to_start: f32) -> Self {
        Self::new(
            kind,
            ActionMode::Continuous {
                cost_rate,
                stamina_required_to_start,
            },
            0.0,
            0.0,
        )
    }

    pub fn timed(kind: A, duration: f32, cooldown: f32, stamina_cost: f32) -> Self {
        Self::new(kind, ActionMode::Timed { duration }, cooldown, stamina_cost)
    }

    pub fn with_buffer_time(mut self, buffer_time: f32) -> Self {
        self.input = BufferedInput::new(buffer_time);
        self
    }

    pub fn with_activation_delay(mut self, delay: f32) -> Self {
        self.activation_delay = delay;
        self
    }

    pub fn performed_while_held(mut self) -> Self {
        if let ActionMode::Instant { .. } = self.mode {
            self.mode = ActionMode::Instant {
                perform_while_held: true,
            };
        }
        self
    }

    pub fn kind(&self) -> A {
        self.kind
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_performing(&self) -> bool {
        self.performing
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Enables or disables the action and restarts the activation delay.
    pub fn set_active(&mut self, active: bool) {
        self.since_activation = 0.0;
        self.enabled = active;
    }

    /// Stamina needed for the next perform.
    pub fn cost(&self, discount: f32) -> f32 {
        (self.stamina_cost - discount).max(0.0)
    }

    fn tick_cost(&self, ctx: &ActionContext<'_>) -> f32 {
        match self.mode {
            ActionMode::Continuous { cost_rate, .. } => cost_rate * ctx.dt,
            _ => self.cost(ctx.cost_discount),
        }
    }

    pub fn cooldown_elapsed(&self) -> bool {
        self.since_perform >= self.cooldown
    }

    /// Whether the action could perform this tick, ignoring input.
    pub fn can_perform(&self, ctx: &ActionContext<'_>) -> bool {
        if !self.enabled || !ctx.actor_permits || !ctx.condition {
            return false;
        }
        if !self.cooldown_elapsed() || self.since_activation < self.activation_delay {
            return false;
        }

        match self.mode {
            ActionMode::Continuous {
                stamina_required_to_start,
                ..
            } if !self.performing => {
                ctx.stamina.has_enough(stamina_required_to_start)
                    && ctx.stamina.has_enough(self.tick_cost(ctx))
            }
            _ => ctx.stamina.has_enough(self.tick_cost(ctx)),
        }
    }

    pub fn update(&mut self, ctx: &mut ActionContext<'_>) {
        self.input.update(ctx.pressed, ctx.dt);
        self.since_perform += ctx.dt;
        self.since_activation += ctx.dt;

        match self.mode {
            ActionMode::Instant { perform_while_held } => {
                let triggered = self.input.pressed() || (perform_while_held && ctx.pressed);
                if triggered && self.can_perform(ctx) {
                    self.perform(ctx);
                }
            }
            ActionMode::Continuous { .. } => self.update_continuous(ctx),
            ActionMode::Timed { duration } => self.update_timed(ctx, duration),
        }
    }

    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        let cost = self.tick_cost(ctx);
        if !ctx.stamina.spend(cost) {
            debug!("{:?} declined: {:.1} stamina required", self.kind, cost);
            return false;
        }
        self.spent = cost;
        self.since_perform = 0.0;
        self.input.reset();
        self.signals.push(ActionSignal::Performed(self.kind));
        true
    }

    fn update_continuous(&mut self, ctx: &mut ActionContext<'_>) {
        if !ctx.pressed || !self.can_perform(ctx) {
            if self.performing {
                self.performing = false;
                self.signals.push(ActionSignal::Stopped(self.kind));
            }
            return;
        }

        if self.perform(ctx) && !self.performing {
            self.performing = true;
            self.signals.push(ActionSignal::Started(self.kind));
        }
    }

    fn update_timed(&mut self, ctx: &mut ActionContext<'_>, duration: f32) {
        if self.performing {
            self.since_perform = 0.0;
            self.elapsed += ctx.dt;
            if self.elapsed >= duration {
                self.finish(false);
            }
            return;
        }

        self.elapsed = 0.0;
        if self.input.pressed() && self.can_perform(ctx) && self.perform(ctx) {
            self.performing = true;
            if duration <= 0.0 {
                self.finish(false);
            }
        }
    }

    fn finish(&mut self, interrupted: bool) {
        self.performing = false;
        self.input.reset();
        self.signals.push(ActionSignal::Completed {
            action: self.kind,
            interrupted,
        });
    }

    /// Cancel a running timed action. Returns false when nothing was performing.
    pub fn interrupt(&mut self, restore_stamina: bool, stamina: &mut StaminaMeter) -> bool {
        if !self.performing || !matches!(self.mode, ActionMode::Timed { .. }) {
            return false;
        }

        self.elapsed = 0.0;
        if restore_stamina {
            stamina.restore(self.spent);
        }
        self.finish(true);
        true
    }

    pub fn take_signals(&mut self) -> Vec<ActionSignal<A>> {
        std::mem::take(&mut self.signals)
    }
}

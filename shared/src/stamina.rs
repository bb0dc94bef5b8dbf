//! Bounded stamina pool gating actions.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaminaConfig {
    pub max_stamina: f32,
    /// Stamina restored per second once restoring has fully ramped up.
    pub restore_rate: f32,
    /// Delay after the last spend before restoring starts.
    pub cooldown_before_restore: f32,
    /// Ramp time from zero to full restore rate, zero to disable smoothing.
    pub cooldown_smooth_time: f32,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            max_stamina: 100.0,
            restore_rate: 10.0,
            cooldown_before_restore: 1.0,
            cooldown_smooth_time: 5.0,
        }
    }
}

/// Ease-in-out curve clamped to `[0, 1]`.
pub fn smooth_value(x: f32) -> f32 {
    if x <= 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0
    } else {
        (PI * (x - 0.5) / 2.0).sin() + 0.5
    }
}

#[derive(Debug, Clone)]
pub struct StaminaMeter {
    config: StaminaConfig,
    remaining: f32,
    since_spend: f32,
}

impl Default for StaminaMeter {
    fn default() -> Self {
        Self::new(StaminaConfig::default())
    }
}

impl StaminaMeter {
    pub fn new(config: StaminaConfig) -> Self {
        Self {
            remaining: config.max_stamina.max(0.0),
            config,
            since_spend: f32::INFINITY,
        }
    }

    pub fn config(&self) -> &StaminaConfig {
        &self.config
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn maximum(&self) -> f32 {
        self.config.max_stamina
    }

    pub fn percent(&self) -> f32 {
        if self.config.max_stamina > 0.0 {
            self.remaining / self.config.max_stamina
        } else {
            0.0
        }
    }

    pub fn has_enough(&self, amount: f32) -> bool {
        self.remaining >= amount
    }

    fn adjust(&mut self, amount: f32) {
        self.remaining = (self.remaining + amount).clamp(0.0, self.config.max_stamina.max(0.0));
    }

    pub fn restore(&mut self, amount: f32) {
        self.adjust(amount);
    }

    /// Drains stamina even below the requested amount and restarts the restore cooldown.
    pub fn exhaust(&mut self, amount: f32) {
        if amount > 0.0 {
            self.adjust(-amount);
            self.since_spend = 0.0;
        }
    }

    pub fn spend(&mut self, amount: f32) -> bool {
        if self.remaining >= amount {
            self.exhaust(amount);
            true
        } else {
            false
        }
    }

    /// Overwrite from the owner's replicated values.
    pub fn apply_replicated(&mut self, remaining: f32, maximum: f32) -> bool {
        if self.remaining == remaining && self.config.max_stamina == maximum {
            return false;
        }
        self.config.max_stamina = maximum.max(0.0);
        self.remaining = remaining.clamp(0.0, self.config.max_stamina);
        true
    }

    pub fn tick(&mut self, dt: f32) {
        self.since_spend += dt;

        if self.since_spend < self.config.cooldown_before_restore {
            return;
        }

        if self.config.cooldown_smooth_time > 0.0 {
            let factor = (self.since_spend - self.config.cooldown_before_restore)
                / self.config.cooldown_smooth_time;
            self.restore(self.config.restore_rate * smooth_value(factor) * dt);
        } else {
            self.restore(self.config.restore_rate * dt);
        }
    }
}

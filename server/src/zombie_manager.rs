//! Keeps the zombie population at its target size and relays alerts.

use crate::world::EntityIds;
use crate::zombie::{uniform, Alert, TargetInfo, Zombie, ZombieConfig};
use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use shared::entity::{EntityId, Transform};
use shared::hasm::{Event, MachineDef};
use shared::health::{DamageEvent, HealthChange};
use shared::states::ZombieState;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const MAX_STRENGTH: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ZombieManagerConfig {
    pub target_count: usize,
    /// Seconds a corpse stays before despawning.
    pub cleanup_time: f32,
    pub spawn_radius: f32,
    pub spawn_points: Vec<Vec3>,
}

impl Default for ZombieManagerConfig {
    fn default() -> Self {
        Self {
            target_count: 10,
            cleanup_time: 3.0,
            spawn_radius: 2.0,
            spawn_points: vec![Vec3::new(15.0, 0.0, 15.0), Vec3::new(-15.0, 0.0, 15.0)],
        }
    }
}

/// Stats derived from a strength roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnConfig {
    pub max_health: f32,
    pub scale: f32,
    pub zombie: ZombieConfig,
}

/// Scale a zombie's stats by `strength` in `[0, 10]`.
pub fn spawn_config(strength: f32, rng: &mut StdRng) -> SpawnConfig {
    let strength = strength.clamp(0.0, MAX_STRENGTH);
    let normalized = strength / MAX_STRENGTH;

    let scale = 1.0 + normalized + uniform(rng, -0.1, 0.1);
    let zombie = ZombieConfig {
        attack_cooldown: 2.0 - 1.75 * normalized,
        attack_damage: 5.0 + 20.0 * normalized + uniform(rng, -3.0, 3.0),
        attack_range: 1.5 * scale,
        ..ZombieConfig::default()
    };

    SpawnConfig {
        max_health: 20.0 + 10.0 * strength,
        scale,
        zombie,
    }
}

#[derive(Debug, Default)]
pub struct ManagerOutput {
    pub attacks: Vec<DamageEvent>,
    pub spawned: Vec<EntityId>,
    pub despawned: Vec<EntityId>,
}

pub struct ZombieManager {
    config: ZombieManagerConfig,
    machine: Arc<MachineDef<ZombieState>>,
    zombies: BTreeMap<EntityId, Zombie>,
    corpses: BTreeMap<EntityId, f32>,
    spawned_total: u32,
}

impl ZombieManager {
    pub fn new(config: ZombieManagerConfig, machine: Arc<MachineDef<ZombieState>>) -> Self {
        Self {
            config,
            machine,
            zombies: BTreeMap::new(),
            corpses: BTreeMap::new(),
            spawned_total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.zombies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zombies.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Zombie> {
        self.zombies.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Zombie> {
        self.zombies.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zombie> {
        self.zombies.values()
    }

    pub fn spawn(&mut self, ids: &mut EntityIds, rng: &mut StdRng) -> Option<EntityId> {
        let origin = match self.config.spawn_points.len() {
            0 => return None,
            n => self.config.spawn_points[rng.gen_range(0..n)],
        };

        let angle = uniform(rng, 0.0, std::f32::consts::TAU);
        let distance = self.config.spawn_radius * uniform(rng, 0.0, 1.0).sqrt();
        let position = origin + Vec3::new(angle.cos(), 0.0, angle.sin()) * distance;

        let strength = uniform(rng, 0.0, 2.0);
        let stats = spawn_config(strength, rng);
        let mut transform = Transform::with_yaw(position, uniform(rng, 0.0, 360.0));
        transform.scale = stats.scale;

        let id = ids.allocate();
        let name = format!("Zombie-{}", self.spawned_total);
        self.spawned_total += 1;

        debug!(
            "Spawning {} ({}) strength {:.2} health {:.1} at {:?}",
            name, id, strength, stats.max_health, position
        );
        let zombie = Zombie::new(
            id,
            name,
            stats.zombie,
            transform,
            stats.max_health,
            self.machine.clone(),
        );
        self.zombies.insert(id, zombie);
        Some(id)
    }

    /// Route an applied health change. Returns true if the target was one of ours.
    pub fn on_health_change(&mut self, change: &HealthChange) -> bool {
        let Some(zombie) = self.zombies.get_mut(&change.target) else {
            return false;
        };
        zombie.on_health_change(change);
        if change.died() {
            self.corpses.insert(change.target, 0.0);
        }
        true
    }

    fn relay_alert(&mut self, alert: &Alert) {
        for zombie in self.zombies.values_mut() {
            if zombie.id == alert.from || !zombie.is_alive() || !zombie.accepts_alert() {
                continue;
            }
            if zombie.transform.position.distance(alert.position) <= alert.radius {
                zombie.raise(Event::TargetIdentified {
                    target: alert.target,
                });
            }
        }
    }

    pub fn update(
        &mut self,
        dt: f32,
        targets: &[TargetInfo],
        ids: &mut EntityIds,
        rng: &mut StdRng,
    ) -> ManagerOutput {
        let mut output = ManagerOutput::default();
        let mut alerts = Vec::new();

        for zombie in self.zombies.values_mut() {
            let result = zombie.tick(dt, targets, rng);
            output.attacks.extend(result.attacks);
            if let Some(alert) = result.alert {
                zombie.rearm_notify(rng);
                alerts.push(alert);
            }
        }
        for alert in &alerts {
            self.relay_alert(alert);
        }

        let cleanup_time = self.config.cleanup_time;
        let mut expired = Vec::new();
        for (id, elapsed) in self.corpses.iter_mut() {
            *elapsed += dt;
            if *elapsed >= cleanup_time {
                expired.push(*id);
            }
        }
        for id in expired {
            self.corpses.remove(&id);
            if let Some(zombie) = self.zombies.remove(&id) {
                info!("Despawned {} ({})", zombie.name, id);
            }
            output.despawned.push(id);
        }

        while self.zombies.len() < self.config.target_count {
            match self.spawn(ids, rng) {
                Some(id) => output.spawned.push(id),
                None => break,
            }
        }

        output
    }
}

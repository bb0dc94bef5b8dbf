//! Client-side view of the world: replica mirrors of every entity plus the locally owned
//! player actor.
//!
//! Everything the server writes is applied compare-then-mutate, so a snapshot repeating
//! what a health notification already delivered changes nothing. The owned player is the
//! writer of its own transform, state, stamina and loadouts; those fields are never taken
//! from snapshots.

use crate::hud::{DeathFeed, HudView};
use glam::Vec3;
use log::{debug, info};
use shared::collision::SphereWorld;
use shared::entity::{yaw_rotation, EntityId, EntityKind, Transform};
use shared::equipment::{
    EquipmentLibrary, InstanceRegistry, ItemId, ItemSpawner, GREATAXE, SHIELD, SPEAR, SWORD,
};
use shared::hasm::{MachineDef, StateId};
use shared::health::{DamageListener, DamageSource, Damageable, EventKind, HealthChange};
use shared::hitbox::{Hitbox, HitboxLookup, ResolvedHitbox};
use shared::input::PlayerInput;
use shared::loadout::PlayerLoadout;
use shared::movement::FlatGroundEngine;
use shared::protocol::{EntitySnapshot, NetworkLoadout, OwnerState};
use shared::replication::Role;
use shared::stamina::StaminaMeter;
use shared::states::MachineRegistry;
use shared::survivor::{Survivor, SurvivorConfig, SurvivorOutput, TickContext};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Loadouts the local player starts with: sword and shield, spear, greataxe.
const STARTER_KIT: [(usize, &[ItemId]); 3] =
    [(0, &[SWORD, SHIELD]), (1, &[SPEAR]), (2, &[GREATAXE])];

fn flags<S: StateId>(machine: &MachineDef<S>, state: u8) -> (bool, bool) {
    S::from_wire(state)
        .and_then(|state| machine.state(state))
        .map_or((false, false), |def| {
            (def.attributes.invulnerable, def.attributes.passthrough)
        })
}

/// `(invulnerable, passthrough)` of a replicated state index.
fn state_flags(machines: &MachineRegistry, kind: EntityKind, state: u8) -> (bool, bool) {
    match kind {
        EntityKind::Player => flags(&machines.player, state),
        EntityKind::Zombie => flags(&machines.zombie, state),
        EntityKind::TargetDummy => flags(&machines.dummy, state),
        EntityKind::Archer => flags(&machines.archer, state),
        EntityKind::Breakable => flags(&machines.breakable, state),
        EntityKind::Arrow => (false, false),
    }
}

/// Display name of a replicated state index.
pub fn state_name(kind: EntityKind, state: u8) -> &'static str {
    use shared::states::{ArcherState, BreakableState, DummyState, PlayerState, ZombieState};

    let name = match kind {
        EntityKind::Player => PlayerState::from_wire(state).map(|state| state.name()),
        EntityKind::Zombie => ZombieState::from_wire(state).map(|state| state.name()),
        EntityKind::TargetDummy => DummyState::from_wire(state).map(|state| state.name()),
        EntityKind::Archer => ArcherState::from_wire(state).map(|state| state.name()),
        EntityKind::Breakable => BreakableState::from_wire(state).map(|state| state.name()),
        EntityKind::Arrow => Some(if state == 0 { "Flying" } else { "Pinned" }),
    };
    name.unwrap_or("Unknown")
}

/// Mirror of one server-replicated entity.
#[derive(Debug)]
pub struct Replica {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub owner: Option<u32>,
    pub transform: Transform,
    pub state: u8,
    pub damageable: Damageable,
    pub stamina: StaminaMeter,
    /// Present for remote players only.
    pub loadout: Option<PlayerLoadout>,
}

impl Replica {
    fn spawn(
        snapshot: &EntitySnapshot,
        owned: bool,
        library: &Arc<EquipmentLibrary>,
        machines: &MachineRegistry,
        spawner: &mut dyn ItemSpawner,
    ) -> Self {
        let mut damageable = Damageable::with_max_health(snapshot.id, snapshot.max_health);
        damageable.apply_replicated(snapshot.health, snapshot.max_health);
        for hitbox in Hitbox::for_kind(snapshot.kind, snapshot.scale) {
            damageable.register_hitbox(hitbox);
        }

        let loadout = (snapshot.kind == EntityKind::Player && !owned)
            .then(|| PlayerLoadout::new(library.clone(), snapshot.id, Role::observer(), spawner));

        let mut replica = Self {
            id: snapshot.id,
            kind: snapshot.kind,
            name: snapshot.name.clone(),
            owner: snapshot.owner,
            transform: Transform::default(),
            state: snapshot.state,
            damageable,
            stamina: StaminaMeter::default(),
            loadout,
        };
        replica.apply(snapshot, owned, machines, spawner);
        replica
    }

    /// Returns true if anything changed.
    fn apply(
        &mut self,
        snapshot: &EntitySnapshot,
        owned: bool,
        machines: &MachineRegistry,
        spawner: &mut dyn ItemSpawner,
    ) -> bool {
        let mut changed = self
            .damageable
            .apply_replicated(snapshot.health, snapshot.max_health);
        if owned {
            return changed;
        }

        let transform = Transform {
            position: snapshot.position,
            rotation: yaw_rotation(snapshot.yaw),
            scale: snapshot.scale,
        };
        if self.transform != transform {
            self.transform = transform;
            changed = true;
        }
        if self.state != snapshot.state {
            self.state = snapshot.state;
            changed = true;
        }
        let (invulnerable, passthrough) = state_flags(machines, self.kind, self.state);
        self.damageable.invulnerable = invulnerable;
        self.damageable.passthrough = passthrough;

        changed |= self
            .stamina
            .apply_replicated(snapshot.stamina, snapshot.max_stamina);
        if self.name != snapshot.name {
            self.name = snapshot.name.clone();
            changed = true;
        }

        if let Some(loadout) = self.loadout.as_mut() {
            for (index, entry) in snapshot.loadouts.iter().enumerate() {
                changed |= loadout.apply_remote_loadout(index, entry, spawner);
            }
            changed |= loadout.apply_remote_selection(snapshot.selected_loadout as usize, spawner);
        }
        changed
    }

    pub fn state_name(&self) -> &'static str {
        state_name(self.kind, self.state)
    }

    fn despawn(&mut self, spawner: &mut dyn ItemSpawner) {
        if let Some(loadout) = self.loadout.as_mut() {
            loadout.clear(spawner);
        }
    }
}

/// All replicas, keyed by network id. Resolves hitboxes for locally simulated attacks.
#[derive(Debug, Default)]
pub struct ReplicaSet {
    entities: BTreeMap<EntityId, Replica>,
}

impl ReplicaSet {
    pub fn get(&self, id: EntityId) -> Option<&Replica> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Replica> {
        self.entities.values()
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.iter().filter(|replica| replica.kind == kind).count()
    }

    pub fn collision_world(&self) -> SphereWorld {
        let mut world = SphereWorld::new();
        for replica in self.entities.values() {
            let transform = &replica.transform;
            for hitbox in replica.damageable.hitboxes().iter() {
                let center = transform.position + transform.rotation * hitbox.offset;
                world.add_hitbox(replica.id, &hitbox.id, center, hitbox.radius);
            }
        }
        world
    }
}

impl HitboxLookup for ReplicaSet {
    fn resolve(&self, owner: EntityId, hitbox: &str) -> Option<ResolvedHitbox> {
        let replica = self.entities.get(&owner)?;
        let registered = replica.damageable.hitboxes().get(hitbox)?;
        Some(ResolvedHitbox {
            owner,
            id: registered.id.clone(),
            critical: registered.critical,
            disabled: replica.damageable.hitbox_disabled(hitbox).unwrap_or(true),
            owner_transform: replica.transform,
        })
    }
}

pub struct ClientGameState {
    library: Arc<EquipmentLibrary>,
    machines: MachineRegistry,
    survivor_config: SurvivorConfig,
    spawner: InstanceRegistry,
    replicas: ReplicaSet,
    local_entity: Option<EntityId>,
    local: Option<Survivor>,
    feed: DeathFeed,
    /// Last notification presented per entity.
    delivered: BTreeMap<EntityId, HealthChange>,
    last_tick: Option<u32>,
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            library: Arc::new(EquipmentLibrary::with_defaults()),
            machines: MachineRegistry::new(),
            survivor_config: SurvivorConfig::default(),
            spawner: InstanceRegistry::new(),
            replicas: ReplicaSet::default(),
            local_entity: None,
            local: None,
            feed: DeathFeed::new(),
            delivered: BTreeMap::new(),
            last_tick: None,
        }
    }

    pub fn replicas(&self) -> &ReplicaSet {
        &self.replicas
    }

    pub fn local_entity(&self) -> Option<EntityId> {
        self.local_entity
    }

    pub fn survivor(&self) -> Option<&Survivor> {
        self.local.as_ref()
    }

    pub fn feed(&self) -> &DeathFeed {
        &self.feed
    }

    pub fn spawner(&self) -> &InstanceRegistry {
        &self.spawner
    }

    /// Take ownership of `entity`. The actor is created once its first snapshot arrives.
    pub fn set_local_entity(&mut self, entity: EntityId) {
        if let Some(mut previous) = self.local.take() {
            previous.loadout_mut().clear(&mut self.spawner);
        }
        self.local_entity = Some(entity);
        // Re-created as owned on the next snapshot.
        if let Some(mut replica) = self.replicas.entities.remove(&entity) {
            replica.despawn(&mut self.spawner);
        }
        self.last_tick = None;
        info!("Controlling {}", entity);
    }

    fn spawn_local(&mut self, id: EntityId, position: Vec3) {
        let mut survivor = Survivor::new(
            id,
            self.survivor_config,
            self.machines.player.clone(),
            self.library.clone(),
            Box::new(FlatGroundEngine::new(position)),
            &mut self.spawner,
        );
        for (slot, items) in STARTER_KIT {
            for &item in items {
                survivor.loadout_mut().add_item(item, slot, &mut self.spawner);
            }
        }
        info!("Spawned local player {} at {:?}", id, position);
        self.local = Some(survivor);
    }

    /// Apply a full snapshot. Stale ticks are ignored; entities missing from it are removed.
    pub fn apply_snapshot(&mut self, tick: u32, entities: &[EntitySnapshot]) -> bool {
        if let Some(last) = self.last_tick {
            if (tick.wrapping_sub(last) as i32) <= 0 {
                debug!("Ignoring stale snapshot {} (have {})", tick, last);
                return false;
            }
        }
        self.last_tick = Some(tick);

        let mut changed = false;
        let mut seen = BTreeSet::new();
        for snapshot in entities {
            seen.insert(snapshot.id);
            let owned = Some(snapshot.id) == self.local_entity;

            if owned && self.local.is_none() {
                self.spawn_local(snapshot.id, snapshot.position);
            }

            match self.replicas.entities.get_mut(&snapshot.id) {
                Some(replica) => {
                    let previous = replica.damageable.current_health();
                    changed |= replica.apply(snapshot, owned, &self.machines, &mut self.spawner);
                    if owned {
                        let current = replica.damageable.current_health();
                        self.repair_local_health(snapshot.id, previous, current);
                    }
                }
                None => {
                    debug!("Replicating {:?} {} ({})", snapshot.kind, snapshot.id, snapshot.name);
                    let replica = Replica::spawn(
                        snapshot,
                        owned,
                        &self.library,
                        &self.machines,
                        &mut self.spawner,
                    );
                    self.replicas.entities.insert(snapshot.id, replica);
                    changed = true;
                }
            }
        }

        let missing: Vec<EntityId> = self
            .replicas
            .entities
            .keys()
            .filter(|id| !seen.contains(id))
            .copied()
            .collect();
        for id in missing {
            changed |= self.remove_entity(id);
        }
        changed
    }

    /// A snapshot may carry a death or revive whose notification was lost.
    fn repair_local_health(&mut self, id: EntityId, previous: f32, current: f32) {
        if previous == current {
            return;
        }
        let change = HealthChange {
            target: id,
            source: DamageSource::Empty,
            kind: if current < previous {
                EventKind::Damage
            } else {
                EventKind::Heal
            },
            previous,
            current,
            amount: (previous - current).abs(),
        };
        if change.died() || change.revived() {
            if let Some(survivor) = self.local.as_mut() {
                survivor.on_health_change(&change);
            }
        }
    }

    /// Returns false for unknown targets and for a repeat of the last notification.
    ///
    /// A snapshot may already have moved the mirror to `change.current`; the notification
    /// is still presented, only the health write is skipped.
    pub fn apply_health_change(&mut self, change: &HealthChange) -> bool {
        let Some(replica) = self.replicas.entities.get_mut(&change.target) else {
            debug!("Health change for unknown {}", change.target);
            return false;
        };
        if self.delivered.get(&change.target) == Some(change) {
            return false;
        }
        if replica.damageable.current_health() != change.current {
            replica.damageable.replay(change);
        }
        self.delivered.insert(change.target, *change);

        match change.kind {
            EventKind::Damage => self.feed.on_damage(change),
            EventKind::Heal => self.feed.on_heal(change),
        }
        if Some(change.target) == self.local_entity {
            if let Some(survivor) = self.local.as_mut() {
                survivor.on_health_change(change);
            }
        }
        true
    }

    pub fn apply_loadout(
        &mut self,
        entity: EntityId,
        index: usize,
        loadout: &NetworkLoadout,
    ) -> bool {
        let Some(remote) = self
            .replicas
            .entities
            .get_mut(&entity)
            .and_then(|replica| replica.loadout.as_mut())
        else {
            return false;
        };
        remote.apply_remote_loadout(index, loadout, &mut self.spawner)
    }

    pub fn apply_selection(&mut self, entity: EntityId, index: usize) -> bool {
        let Some(remote) = self
            .replicas
            .entities
            .get_mut(&entity)
            .and_then(|replica| replica.loadout.as_mut())
        else {
            return false;
        };
        remote.apply_remote_selection(index, &mut self.spawner)
    }

    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        let Some(mut replica) = self.replicas.entities.remove(&entity) else {
            return false;
        };
        replica.despawn(&mut self.spawner);
        self.delivered.remove(&entity);
        if Some(entity) == self.local_entity {
            if let Some(mut survivor) = self.local.take() {
                survivor.loadout_mut().clear(&mut self.spawner);
            }
            info!("Local player {} despawned", entity);
        } else {
            debug!("Despawned {}", entity);
        }
        true
    }

    /// Step the owned player. `None` until the local player exists.
    pub fn tick_local(&mut self, input: &PlayerInput, dt: f32) -> Option<SurvivorOutput> {
        let survivor = self.local.as_mut()?;

        let collision = self.replicas.collision_world();
        let output = survivor.tick(
            input,
            TickContext {
                dt,
                collision: &collision,
                hitboxes: &self.replicas,
                spawner: &mut self.spawner,
            },
        );

        if let Some(replica) = self.replicas.entities.get_mut(&survivor.id()) {
            let state = survivor.owner_state();
            replica.transform.position = state.position;
            replica.transform.rotation = yaw_rotation(state.yaw);
            replica.state = state.state;
            replica.stamina.apply_replicated(state.stamina, state.max_stamina);
            let attributes = survivor.machine().attributes();
            replica.damageable.invulnerable = attributes.invulnerable;
            replica.damageable.passthrough = attributes.passthrough;
        }
        Some(output)
    }

    pub fn owner_state(&self) -> Option<OwnerState> {
        self.local.as_ref().map(Survivor::owner_state)
    }

    pub fn hud(&self) -> Option<HudView> {
        let survivor = self.local.as_ref()?;
        let health_percent = self
            .replicas
            .get(survivor.id())
            .map_or(1.0, |replica| replica.damageable.health_percentage());
        Some(HudView {
            health_percent,
            stamina_percent: survivor.stamina().percent(),
            state: survivor.state().name(),
            alive: survivor.is_alive(),
            loadout: survivor.loadout().view(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::equipment::EMPTY_ITEM;
    use shared::states::{PlayerState, ZombieState};

    fn player(id: u32, owner: u32, position: Vec3) -> EntitySnapshot {
        let mut snapshot = EntitySnapshot::new(EntityId(id), EntityKind::Player, position);
        snapshot.health = 100.0;
        snapshot.max_health = 100.0;
        snapshot.stamina = 100.0;
        snapshot.max_stamina = 100.0;
        snapshot.loadouts = vec![NetworkLoadout::EMPTY; 3];
        snapshot.owner = Some(owner);
        snapshot
    }

    fn zombie(id: u32, position: Vec3, health: f32) -> EntitySnapshot {
        let mut snapshot = EntitySnapshot::new(EntityId(id), EntityKind::Zombie, position);
        snapshot.name = format!("Zombie-{}", id);
        snapshot.health = health;
        snapshot.max_health = 40.0;
        snapshot
    }

    fn damage(target: u32, previous: f32, current: f32) -> HealthChange {
        HealthChange {
            target: EntityId(target),
            source: DamageSource::Entity(EntityId(9)),
            kind: EventKind::Damage,
            previous,
            current,
            amount: previous - current,
        }
    }

    fn connected() -> ClientGameState {
        let mut game = ClientGameState::new();
        game.set_local_entity(EntityId(1));
        game.apply_snapshot(1, &[player(1, 1, Vec3::ZERO), player(2, 2, Vec3::new(3.0, 0.0, 0.0))]);
        game
    }

    #[test]
    fn test_local_player_spawns_from_snapshot() {
        let game = connected();
        let survivor = game.survivor().unwrap();
        assert_eq!(survivor.id(), EntityId(1));
        assert_eq!(game.replicas().len(), 2);

        // Starter kit: sword, shield, spear, greataxe.
        let view = survivor.loadout().view();
        assert_eq!(view.loadouts[0], NetworkLoadout::new(SWORD, SHIELD));
        assert_eq!(view.loadouts[1], NetworkLoadout::new(SPEAR, EMPTY_ITEM));
        assert_eq!(view.loadouts[2], NetworkLoadout::new(GREATAXE, EMPTY_ITEM));
    }

    #[test]
    fn test_repeated_snapshot_changes_nothing() {
        let mut game = connected();
        let entities = [player(1, 1, Vec3::ZERO), zombie(5, Vec3::new(0.0, 0.0, -10.0), 40.0)];
        assert!(game.apply_snapshot(2, &entities));
        assert!(!game.apply_snapshot(3, &entities));
        // Player 2 vanished from the snapshot.
        assert!(game.replicas().get(EntityId(2)).is_none());
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let mut game = connected();
        assert!(!game.apply_snapshot(1, &[]));
        assert_eq!(game.replicas().len(), 2);
    }

    #[test]
    fn test_snapshot_does_not_move_owned_player() {
        let mut game = connected();
        game.apply_snapshot(2, &[player(1, 1, Vec3::new(50.0, 0.0, 0.0))]);
        assert_eq!(game.survivor().unwrap().position(), Vec3::ZERO);
    }

    #[test]
    fn test_health_notification_is_idempotent() {
        let mut game = connected();
        game.apply_snapshot(2, &[player(1, 1, Vec3::ZERO), zombie(5, Vec3::ZERO, 40.0)]);

        let change = damage(5, 40.0, 25.0);
        assert!(game.apply_health_change(&change));
        assert!(!game.apply_health_change(&change));
        assert_approx_eq!(
            game.replicas().get(EntityId(5)).unwrap().damageable.current_health(),
            25.0
        );

        let mut same = zombie(5, Vec3::ZERO, 25.0);
        same.state = ZombieState::HitStun.to_wire();
        game.apply_snapshot(3, &[player(1, 1, Vec3::ZERO), same]);
        assert_eq!(game.replicas().get(EntityId(5)).unwrap().state_name(), "Hit Stun");
    }

    #[test]
    fn test_local_death_and_revive() {
        let mut game = connected();
        assert!(game.apply_health_change(&damage(1, 100.0, 0.0)));
        assert!(!game.survivor().unwrap().is_alive());
        assert_eq!(game.feed().len(), 1);

        let revive = HealthChange {
            target: EntityId(1),
            source: DamageSource::Empty,
            kind: EventKind::Heal,
            previous: 0.0,
            current: 100.0,
            amount: 100.0,
        };
        assert!(game.apply_health_change(&revive));
        assert!(game.survivor().unwrap().is_alive());
    }

    #[test]
    fn test_lost_death_notification_repaired_by_snapshot() {
        let mut game = connected();
        let mut dead = player(1, 1, Vec3::ZERO);
        dead.health = 0.0;
        game.apply_snapshot(2, &[dead]);
        assert!(!game.survivor().unwrap().is_alive());
    }

    #[test]
    fn test_kill_notification_after_snapshot_reaches_feed() {
        let mut game = connected();
        game.apply_snapshot(2, &[player(1, 1, Vec3::ZERO), zombie(5, Vec3::ZERO, 40.0)]);
        // The snapshot carrying the kill overtakes the notification.
        game.apply_snapshot(3, &[player(1, 1, Vec3::ZERO), zombie(5, Vec3::ZERO, 0.0)]);
        assert!(game.feed().is_empty());

        let kill = damage(5, 40.0, 0.0);
        assert!(game.apply_health_change(&kill));
        assert!(!game.apply_health_change(&kill));
        let entries: Vec<String> = game.feed().entries().cloned().collect();
        assert_eq!(entries, vec!["#9 killed #5".to_string()]);
        assert_approx_eq!(
            game.replicas().get(EntityId(5)).unwrap().damageable.current_health(),
            0.0
        );
    }

    #[test]
    fn test_local_death_after_snapshot_is_not_repeated() {
        let mut game = connected();
        let mut dead = player(1, 1, Vec3::ZERO);
        dead.health = 0.0;
        game.apply_snapshot(2, &[dead]);
        assert!(!game.survivor().unwrap().is_alive());

        assert!(game.apply_health_change(&damage(1, 100.0, 0.0)));
        assert!(!game.survivor().unwrap().is_alive());
        assert_eq!(game.feed().len(), 1);

        let revive = HealthChange {
            target: EntityId(1),
            source: DamageSource::Empty,
            kind: EventKind::Heal,
            previous: 0.0,
            current: 100.0,
            amount: 100.0,
        };
        assert!(game.apply_health_change(&revive));
        assert!(game.survivor().unwrap().is_alive());
        assert_eq!(game.feed().len(), 2);
    }

    #[test]
    fn test_remote_loadout_updates_instantiate_items() {
        let mut game = connected();
        let before = game.spawner().instantiated;

        assert!(game.apply_loadout(EntityId(2), 0, &NetworkLoadout::new(SWORD, SHIELD)));
        assert!(!game.apply_loadout(EntityId(2), 0, &NetworkLoadout::new(SWORD, SHIELD)));
        assert_eq!(game.spawner().instantiated, before + 2);

        assert!(game.apply_selection(EntityId(2), 1));
        assert!(!game.apply_selection(EntityId(2), 1));

        // The local player's own loadouts are never overwritten remotely.
        assert!(!game.apply_loadout(EntityId(1), 0, &NetworkLoadout::EMPTY));
    }

    #[test]
    fn test_tick_local_publishes_kit_and_state() {
        let mut game = connected();
        let input = PlayerInput {
            move_y: 1.0,
            ..Default::default()
        };
        let output = game.tick_local(&input, 0.02).unwrap();
        assert_eq!(output.loadout_changes.len(), 3);

        let output = game.tick_local(&input, 0.02).unwrap();
        assert!(output.loadout_changes.is_empty());

        let state = game.owner_state().unwrap();
        assert_eq!(state.state, PlayerState::Walking.to_wire());
        assert!(state.position.z < 0.0);

        let hud = game.hud().unwrap();
        assert_eq!(hud.state, "Walking");
        assert_approx_eq!(hud.health_percent, 1.0);
    }

    #[test]
    fn test_punch_hits_replica() {
        let mut game = connected();
        game.apply_snapshot(
            2,
            &[player(1, 1, Vec3::ZERO), zombie(5, Vec3::new(0.0, 0.0, -1.5), 40.0)],
        );
        game.tick_local(&PlayerInput::default(), 0.02);
        let output = game
            .tick_local(
                &PlayerInput {
                    punch: true,
                    ..Default::default()
                },
                0.02,
            )
            .unwrap();
        assert_eq!(output.requests.len(), 1);
    }

    #[test]
    fn test_despawn_drops_replica() {
        let mut game = connected();
        assert!(game.remove_entity(EntityId(2)));
        assert!(!game.remove_entity(EntityId(2)));
        assert!(game.remove_entity(EntityId(1)));
        assert!(game.survivor().is_none());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(
            state_name(EntityKind::Player, PlayerState::LongFalling.to_wire()),
            "Long Falling"
        );
        assert_eq!(state_name(EntityKind::Arrow, 1), "Pinned");
        assert_eq!(state_name(EntityKind::Zombie, 200), "Unknown");
    }
}

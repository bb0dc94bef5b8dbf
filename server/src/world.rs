//! Authoritative entity registry: owns every damageable and applies all damage.

use crate::props::{ArcherConfig, Arrow, Breakable, StaticArcher, TargetDummy};
use crate::zombie::TargetInfo;
use crate::zombie_manager::{ZombieManager, ZombieManagerConfig};
use glam::{Vec2, Vec3};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::collision::SphereWorld;
use shared::entity::{yaw_rotation, EntityId, EntityKind, Transform};
use shared::equipment::{EquipmentLibrary, ItemId, ItemSlot, ItemWeight, EMPTY_ITEM};
use shared::hasm::StateId;
use shared::health::{DamageEvent, Damageable, HealthChange, ReviveOnTimer};
use shared::hitbox::{Hitbox, HitboxLookup, ResolvedHitbox};
use shared::loadout::MAX_LOADOUTS;
use shared::protocol::{EntitySnapshot, NetworkLoadout, OwnerState};
use shared::states::{MachineRegistry, PlayerState};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Hands out network ids. Zero is never used.
#[derive(Debug, Clone)]
pub struct EntityIds {
    next: u32,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    #[error("client {client} has no player")]
    NoPlayer { client: u32 },
    #[error("client {client} does not own {entity}")]
    NotOwner { client: u32, entity: EntityId },
    #[error("no entity {0}")]
    UnknownEntity(EntityId),
    #[error("state {0} is not a player state")]
    InvalidState(u8),
    #[error("loadout index {0} out of range")]
    InvalidLoadoutIndex(usize),
    #[error("loadout {main}/{offhand} breaks the slot rules")]
    InvalidLoadout { main: ItemId, offhand: ItemId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakableSpawn {
    pub position: Vec3,
    pub max_health: f32,
    pub despawn_time: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub seed: u64,
    pub zombies_enabled: bool,
    pub zombies: ZombieManagerConfig,
    pub player_spawn: Vec3,
    pub player_max_health: f32,
    pub player_revive_time: f32,
    pub dummy_health: f32,
    pub dummies: Vec<Vec3>,
    pub archers: Vec<(Vec3, ArcherConfig)>,
    pub breakables: Vec<BreakableSpawn>,
    /// Static solid spheres: center and radius.
    pub walls: Vec<(Vec3, f32)>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let dummy = Vec3::new(4.0, 0.0, -6.0);
        Self {
            seed: 0,
            zombies_enabled: true,
            zombies: ZombieManagerConfig::default(),
            player_spawn: Vec3::ZERO,
            player_max_health: 100.0,
            player_revive_time: 10.0,
            dummy_health: 100.0,
            dummies: vec![dummy],
            archers: vec![(
                Vec3::new(-8.0, 0.0, -8.0),
                ArcherConfig {
                    aim_target: dummy + Vec3::Y,
                    ..Default::default()
                },
            )],
            breakables: vec![
                BreakableSpawn {
                    position: Vec3::new(6.0, 0.0, 4.0),
                    max_health: 20.0,
                    despawn_time: 5.0,
                },
                BreakableSpawn {
                    position: Vec3::new(7.5, 0.0, 4.0),
                    max_health: 20.0,
                    despawn_time: 5.0,
                },
            ],
            walls: vec![(Vec3::new(0.0, 1.0, 12.0), 2.0)],
        }
    }
}

/// The server's view of a connected player. Owner-writable fields arrive in updates.
#[derive(Debug)]
pub struct PlayerEntity {
    pub id: EntityId,
    pub client_id: u32,
    pub damageable: Damageable,
    pub transform: Transform,
    pub pitch: f32,
    pub anim_move: Vec2,
    pub state: PlayerState,
    pub stamina: f32,
    pub max_stamina: f32,
    pub loadouts: Vec<NetworkLoadout>,
    pub selected: usize,
    revive: ReviveOnTimer,
}

impl PlayerEntity {
    fn target_info(&self) -> TargetInfo {
        TargetInfo {
            id: self.id,
            position: self.transform.position,
            alive: self.damageable.is_alive() && !self.damageable.passthrough,
        }
    }
}

/// Side effects other processes must hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    HealthChanged(HealthChange),
    Despawned(EntityId),
}

pub struct World {
    config: WorldConfig,
    machines: MachineRegistry,
    library: Arc<EquipmentLibrary>,
    ids: EntityIds,
    rng: StdRng,
    tick: u32,
    players: BTreeMap<EntityId, PlayerEntity>,
    zombies: ZombieManager,
    dummies: BTreeMap<EntityId, TargetDummy>,
    archers: BTreeMap<EntityId, StaticArcher>,
    arrows: BTreeMap<EntityId, Arrow>,
    breakables: BTreeMap<EntityId, Breakable>,
    events: Vec<WorldEvent>,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let machines = MachineRegistry::new();
        let mut ids = EntityIds::default();

        let dummies = config
            .dummies
            .iter()
            .map(|position| {
                let id = ids.allocate();
                let transform = Transform::with_yaw(*position, 0.0);
                (id, TargetDummy::new(id, transform, config.dummy_health, machines.dummy.clone()))
            })
            .collect();
        let archers = config
            .archers
            .iter()
            .map(|(position, archer)| {
                let id = ids.allocate();
                (id, StaticArcher::new(id, *position, *archer, machines.archer.clone()))
            })
            .collect();
        let breakables = config
            .breakables
            .iter()
            .map(|spawn| {
                let id = ids.allocate();
                let breakable = Breakable::new(
                    id,
                    Transform::at(spawn.position),
                    spawn.max_health,
                    spawn.despawn_time,
                    machines.breakable.clone(),
                );
                (id, breakable)
            })
            .collect();

        info!(
            "World created with seed {} (zombies {})",
            config.seed,
            if config.zombies_enabled { "enabled" } else { "disabled" }
        );

        Self {
            zombies: ZombieManager::new(config.zombies.clone(), machines.zombie.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            library: Arc::new(EquipmentLibrary::with_defaults()),
            config,
            machines,
            ids,
            tick: 0,
            players: BTreeMap::new(),
            dummies,
            archers,
            arrows: BTreeMap::new(),
            breakables,
            events: Vec::new(),
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn library(&self) -> Arc<EquipmentLibrary> {
        self.library.clone()
    }

    pub fn zombies(&self) -> &ZombieManager {
        &self.zombies
    }

    pub fn zombies_mut(&mut self) -> &mut ZombieManager {
        &mut self.zombies
    }

    pub fn player(&self, id: EntityId) -> Option<&PlayerEntity> {
        self.players.get(&id)
    }

    pub fn player_of(&self, client_id: u32) -> Option<&PlayerEntity> {
        self.players.values().find(|player| player.client_id == client_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn dummy_ids(&self) -> Vec<EntityId> {
        self.dummies.keys().copied().collect()
    }

    pub fn breakable_ids(&self) -> Vec<EntityId> {
        self.breakables.keys().copied().collect()
    }

    pub fn arrow_count(&self) -> usize {
        self.arrows.len()
    }

    /// Owning client of a player entity.
    pub fn owner_of(&self, entity: EntityId) -> Option<u32> {
        self.players.get(&entity).map(|player| player.client_id)
    }

    pub fn spawn_player(&mut self, client_id: u32) -> EntityId {
        let id = self.ids.allocate();
        let offset = Vec3::new(2.0 * self.players.len() as f32, 0.0, 0.0);
        let position = self.config.player_spawn + offset;

        let mut damageable = Damageable::with_max_health(id, self.config.player_max_health);
        for hitbox in Hitbox::humanoid(1.0) {
            damageable.register_hitbox(hitbox);
        }

        let player = PlayerEntity {
            id,
            client_id,
            damageable,
            transform: Transform::at(position),
            pitch: 0.0,
            anim_move: Vec2::ZERO,
            state: self.machines.player.initial(),
            stamina: 0.0,
            max_stamina: 0.0,
            loadouts: vec![NetworkLoadout::EMPTY; MAX_LOADOUTS],
            selected: 0,
            revive: ReviveOnTimer::new(self.config.player_revive_time),
        };
        info!("Spawned player {} for client {} at {:?}", id, client_id, position);
        self.players.insert(id, player);
        id
    }

    pub fn remove_player(&mut self, entity: EntityId) -> bool {
        if self.players.remove(&entity).is_none() {
            return false;
        }
        info!("Removed player {}", entity);
        self.events.push(WorldEvent::Despawned(entity));
        true
    }

    fn owned_player_mut(
        &mut self,
        client_id: u32,
        entity: EntityId,
    ) -> Result<&mut PlayerEntity, WorldError> {
        let player = self
            .players
            .get_mut(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        if player.client_id != client_id {
            return Err(WorldError::NotOwner {
                client: client_id,
                entity,
            });
        }
        Ok(player)
    }

    fn player_entity_of(&self, client_id: u32) -> Result<EntityId, WorldError> {
        self.player_of(client_id)
            .map(|player| player.id)
            .ok_or(WorldError::NoPlayer { client: client_id })
    }

    /// Accept the owner-writable fields of the sender's own player.
    pub fn apply_owner_update(
        &mut self,
        client_id: u32,
        update: &OwnerState,
    ) -> Result<(), WorldError> {
        let state =
            PlayerState::from_wire(update.state).ok_or(WorldError::InvalidState(update.state))?;
        let attributes = self
            .machines
            .player
            .state(state)
            .map(|def| def.attributes.clone())
            .unwrap_or_default();

        let entity = self.player_entity_of(client_id)?;
        let player = self.owned_player_mut(client_id, entity)?;
        player.transform.position = update.position;
        player.transform.rotation = yaw_rotation(update.yaw);
        player.pitch = update.pitch;
        player.anim_move = update.anim_move;
        player.stamina = update.stamina;
        player.max_stamina = update.max_stamina;
        player.damageable.invulnerable = attributes.invulnerable;
        player.damageable.passthrough = attributes.passthrough;
        if player.state != state {
            debug!("{} entered {}", entity, state.name());
            player.state = state;
        }
        Ok(())
    }

    fn validate_loadout(&self, loadout: &NetworkLoadout) -> bool {
        let slot_matches = |id: ItemId, slot: ItemSlot| {
            id == EMPTY_ITEM || self.library.get(id).map_or(false, |item| item.slot == slot)
        };
        if !slot_matches(loadout.main_item_id, ItemSlot::Main)
            || !slot_matches(loadout.offhand_item_id, ItemSlot::Offhand)
        {
            return false;
        }
        let two_handed = self
            .library
            .get(loadout.main_item_id)
            .map_or(false, |item| item.weight == ItemWeight::TwoHanded);
        !(two_handed && loadout.offhand_item_id != EMPTY_ITEM)
    }

    /// Returns true if the entry changed.
    pub fn apply_loadout(
        &mut self,
        client_id: u32,
        entity: EntityId,
        index: usize,
        loadout: NetworkLoadout,
    ) -> Result<bool, WorldError> {
        if index >= MAX_LOADOUTS {
            return Err(WorldError::InvalidLoadoutIndex(index));
        }
        if !self.validate_loadout(&loadout) {
            return Err(WorldError::InvalidLoadout {
                main: loadout.main_item_id,
                offhand: loadout.offhand_item_id,
            });
        }

        let player = self.owned_player_mut(client_id, entity)?;
        if player.loadouts[index] == loadout {
            return Ok(false);
        }
        player.loadouts[index] = loadout;
        info!(
            "{} loadout {} is now {}/{}",
            entity, index, loadout.main_item_id, loadout.offhand_item_id
        );
        Ok(true)
    }

    pub fn select_loadout(
        &mut self,
        client_id: u32,
        entity: EntityId,
        index: usize,
    ) -> Result<bool, WorldError> {
        if index >= MAX_LOADOUTS {
            return Err(WorldError::InvalidLoadoutIndex(index));
        }
        let player = self.owned_player_mut(client_id, entity)?;
        if player.selected == index {
            return Ok(false);
        }
        player.selected = index;
        info!("{} selected loadout {}", entity, index);
        Ok(true)
    }

    /// Damage reported by a client. The source must be the sender's own player.
    pub fn request_damage(
        &mut self,
        client_id: u32,
        event: &DamageEvent,
    ) -> Result<Option<HealthChange>, WorldError> {
        let entity = self.player_entity_of(client_id)?;
        if event.source.entity() != Some(entity) {
            return Err(WorldError::NotOwner {
                client: client_id,
                entity: event.source.entity().unwrap_or(EntityId(0)),
            });
        }
        Ok(self.apply_damage(event))
    }

    fn damageable_mut(&mut self, id: EntityId) -> Option<&mut Damageable> {
        if let Some(player) = self.players.get_mut(&id) {
            return Some(&mut player.damageable);
        }
        if let Some(zombie) = self.zombies.get_mut(id) {
            return Some(&mut zombie.damageable);
        }
        if let Some(dummy) = self.dummies.get_mut(&id) {
            return Some(&mut dummy.damageable);
        }
        self.breakables
            .get_mut(&id)
            .map(|breakable| &mut breakable.damageable)
    }

    fn damageable(&self, id: EntityId) -> Option<(&Damageable, &Transform)> {
        if let Some(player) = self.players.get(&id) {
            return Some((&player.damageable, &player.transform));
        }
        if let Some(zombie) = self.zombies.get(id) {
            return Some((&zombie.damageable, &zombie.transform));
        }
        if let Some(dummy) = self.dummies.get(&id) {
            return Some((&dummy.damageable, &dummy.transform));
        }
        self.breakables
            .get(&id)
            .map(|breakable| (&breakable.damageable, &breakable.transform))
    }

    /// Apply damage to its target and notify the owner of the health record.
    pub fn apply_damage(&mut self, event: &DamageEvent) -> Option<HealthChange> {
        let target = event.target?;
        let Some(damageable) = self.damageable_mut(target) else {
            debug!("Damage for missing entity {} dropped", target);
            return None;
        };
        let change = damageable.apply_damage(event)?;
        self.dispatch(&change);
        Some(change)
    }

    fn dispatch(&mut self, change: &HealthChange) {
        if change.died() {
            info!("{} died ({:?})", change.target, change.source);
        } else if change.revived() {
            info!("{} revived", change.target);
        }

        if !self.zombies.on_health_change(change) {
            if let Some(dummy) = self.dummies.get_mut(&change.target) {
                dummy.on_health_change(change);
            } else if let Some(breakable) = self.breakables.get_mut(&change.target) {
                breakable.on_health_change(change);
            }
        }
        self.events.push(WorldEvent::HealthChanged(*change));
    }

    /// Every current hitbox as a collision sphere plus the static walls.
    pub fn collision_world(&self) -> SphereWorld {
        let mut world = SphereWorld::new();
        for (center, radius) in &self.config.walls {
            world.add_solid(*center, *radius);
        }

        let owners = self
            .players
            .values()
            .map(|player| (&player.damageable, &player.transform))
            .chain(self.zombies.iter().map(|zombie| (&zombie.damageable, &zombie.transform)))
            .chain(self.dummies.values().map(|dummy| (&dummy.damageable, &dummy.transform)))
            .chain(
                self.breakables
                    .values()
                    .map(|breakable| (&breakable.damageable, &breakable.transform)),
            );
        for (damageable, transform) in owners {
            for hitbox in damageable.hitboxes().iter() {
                let center = transform.position + transform.rotation * hitbox.offset;
                world.add_hitbox(damageable.id(), &hitbox.id, center, hitbox.radius);
            }
        }
        world
    }

    pub fn update(&mut self, dt: f32) {
        self.tick = self.tick.wrapping_add(1);

        let mut changes = Vec::new();
        for player in self.players.values_mut() {
            changes.extend(player.revive.tick(dt, &mut player.damageable));
        }
        for dummy in self.dummies.values_mut() {
            changes.extend(dummy.tick(dt));
        }
        // Revives are already applied to the damageable and the dummy's machine.
        for change in changes {
            info!("{} revived", change.target);
            self.events.push(WorldEvent::HealthChanged(change));
        }

        if self.config.zombies_enabled {
            let targets: Vec<TargetInfo> =
                self.players.values().map(PlayerEntity::target_info).collect();
            let output = self.zombies.update(dt, &targets, &mut self.ids, &mut self.rng);
            for attack in &output.attacks {
                self.apply_damage(attack);
            }
            self.events
                .extend(output.despawned.into_iter().map(WorldEvent::Despawned));
        }

        for archer in self.archers.values_mut() {
            if let Some(arrow) = archer.tick(dt, &mut self.ids) {
                debug!("Archer {} loosed arrow {}", archer.id, arrow.id);
                self.arrows.insert(arrow.id, arrow);
            }
        }
        self.update_arrows(dt);

        let mut expired = Vec::new();
        for breakable in self.breakables.values_mut() {
            breakable.tick(dt);
            if breakable.expired() {
                expired.push(breakable.id);
            }
        }
        for id in expired {
            self.breakables.remove(&id);
            info!("Breakable {} despawned", id);
            self.events.push(WorldEvent::Despawned(id));
        }
    }

    fn update_arrows(&mut self, dt: f32) {
        if self.arrows.is_empty() {
            return;
        }
        let collision = self.collision_world();
        let mut arrows = std::mem::take(&mut self.arrows);
        let mut hits = Vec::new();
        for arrow in arrows.values_mut() {
            hits.extend(arrow.tick(dt, &collision, &*self));
        }
        arrows.retain(|id, arrow| {
            if arrow.expired() {
                self.events.push(WorldEvent::Despawned(*id));
                false
            } else {
                true
            }
        });
        self.arrows = arrows;

        for hit in &hits {
            self.apply_damage(hit);
        }
    }

    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        let mut entities = Vec::new();

        for player in self.players.values() {
            let mut snapshot =
                EntitySnapshot::new(player.id, EntityKind::Player, player.transform.position);
            snapshot.name = format!("Player {}", player.client_id);
            snapshot.yaw = player.transform.yaw_degrees();
            snapshot.state = player.state.to_wire();
            snapshot.health = player.damageable.current_health();
            snapshot.max_health = player.damageable.max_health();
            snapshot.stamina = player.stamina;
            snapshot.max_stamina = player.max_stamina;
            snapshot.selected_loadout = player.selected as u8;
            snapshot.loadouts = player.loadouts.clone();
            snapshot.owner = Some(player.client_id);
            entities.push(snapshot);
        }

        for zombie in self.zombies.iter() {
            let mut snapshot =
                EntitySnapshot::new(zombie.id, EntityKind::Zombie, zombie.transform.position);
            snapshot.name = zombie.name.clone();
            snapshot.yaw = zombie.transform.yaw_degrees();
            snapshot.scale = zombie.transform.scale;
            snapshot.state = zombie.state().to_wire();
            snapshot.health = zombie.damageable.current_health();
            snapshot.max_health = zombie.damageable.max_health();
            entities.push(snapshot);
        }

        for dummy in self.dummies.values() {
            let mut snapshot =
                EntitySnapshot::new(dummy.id, EntityKind::TargetDummy, dummy.transform.position);
            snapshot.name = "Target Dummy".to_string();
            snapshot.yaw = dummy.transform.yaw_degrees();
            snapshot.state = dummy.state().to_wire();
            snapshot.health = dummy.damageable.current_health();
            snapshot.max_health = dummy.damageable.max_health();
            entities.push(snapshot);
        }

        for archer in self.archers.values() {
            let mut snapshot =
                EntitySnapshot::new(archer.id, EntityKind::Archer, archer.transform.position);
            snapshot.name = "Archer".to_string();
            snapshot.yaw = archer.transform.yaw_degrees();
            snapshot.state = archer.state().to_wire();
            entities.push(snapshot);
        }

        for arrow in self.arrows.values() {
            let mut snapshot = EntitySnapshot::new(arrow.id, EntityKind::Arrow, arrow.position);
            snapshot.yaw = arrow.heading();
            snapshot.state = arrow.pinned as u8;
            entities.push(snapshot);
        }

        for breakable in self.breakables.values() {
            let mut snapshot = EntitySnapshot::new(
                breakable.id,
                EntityKind::Breakable,
                breakable.transform.position,
            );
            snapshot.name = "Crate".to_string();
            snapshot.state = breakable.state().to_wire();
            snapshot.health = breakable.damageable.current_health();
            snapshot.max_health = breakable.damageable.max_health();
            entities.push(snapshot);
        }

        entities
    }
}

impl HitboxLookup for World {
    fn resolve(&self, owner: EntityId, hitbox: &str) -> Option<ResolvedHitbox> {
        let (damageable, transform) = self.damageable(owner)?;
        let registered = damageable.hitboxes().get(hitbox)?;
        Some(ResolvedHitbox {
            owner,
            id: registered.id.clone(),
            critical: registered.critical,
            disabled: damageable.hitbox_disabled(hitbox).unwrap_or(true),
            owner_transform: *transform,
        })
    }
}

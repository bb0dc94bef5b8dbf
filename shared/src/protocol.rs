//! Wire forms of the values that cross the process boundary.

use crate::entity::{EntityId, EntityKind};
use crate::equipment::{ItemId, EMPTY_ITEM};
use crate::health::{DamageEvent, DamageSource, DamageType, EventKind};
use crate::melee::AttackEvent;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Damage request sent by an attacking client. Events without a target never go out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDamageEvent {
    pub damage_type: DamageType,
    pub amount: f32,
    pub relative_hit_position: Vec3,
    pub hit_normal: Vec3,
    pub target: EntityId,
    pub source: Option<EntityId>,
    pub hitbox: Option<String>,
}

impl NetworkDamageEvent {
    pub fn from_damage_event(event: &DamageEvent) -> Option<Self> {
        Some(Self {
            damage_type: event.damage_type,
            amount: event.amount,
            relative_hit_position: event.relative_hit_position,
            hit_normal: event.hit_normal,
            target: event.target?,
            source: event.source.entity(),
            hitbox: event.hitbox.clone(),
        })
    }

    /// The kind is not on the wire; received events are always damage.
    pub fn to_damage_event(&self) -> DamageEvent {
        DamageEvent {
            kind: EventKind::Damage,
            damage_type: self.damage_type,
            target: Some(self.target),
            source: DamageSource::from_option(self.source),
            amount: self.amount,
            relative_hit_position: self.relative_hit_position,
            hit_normal: self.hit_normal,
            hitbox: self.hitbox.clone(),
        }
    }
}

/// A punch that connected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkAttackEvent {
    pub damage: f32,
    pub hit_position: Vec3,
    pub target: EntityId,
    pub source: EntityId,
}

impl NetworkAttackEvent {
    pub fn from_attack(attack: &AttackEvent, source: EntityId) -> Self {
        Self {
            damage: attack.damage,
            hit_position: attack.hit_position,
            target: attack.target,
            source,
        }
    }

    pub fn to_damage_event(&self) -> DamageEvent {
        DamageEvent::new(
            EventKind::Damage,
            DamageType::Bludgeoning,
            self.target,
            DamageSource::Entity(self.source),
            self.damage,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkLoadout {
    pub main_item_id: ItemId,
    pub offhand_item_id: ItemId,
}

impl Default for NetworkLoadout {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl NetworkLoadout {
    pub const EMPTY: NetworkLoadout = NetworkLoadout {
        main_item_id: EMPTY_ITEM,
        offhand_item_id: EMPTY_ITEM,
    };

    pub fn new(main_item_id: ItemId, offhand_item_id: ItemId) -> Self {
        Self {
            main_item_id,
            offhand_item_id,
        }
    }
}

/// Owner-writable fields of a player, published every tick by the owning client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnerState {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub anim_move: Vec2,
    pub state: u8,
    pub stamina: f32,
    pub max_stamina: f32,
}

/// Full replicated view of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub position: Vec3,
    pub yaw: f32,
    pub scale: f32,
    pub state: u8,
    pub health: f32,
    pub max_health: f32,
    pub stamina: f32,
    pub max_stamina: f32,
    pub selected_loadout: u8,
    pub loadouts: Vec<NetworkLoadout>,
    pub owner: Option<u32>,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, kind: EntityKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            position,
            yaw: 0.0,
            scale: 1.0,
            state: 0,
            health: 0.0,
            max_health: 0.0,
            stamina: 0.0,
            max_stamina: 0.0,
            selected_loadout: 0,
            loadouts: Vec::new(),
            owner: None,
        }
    }
}

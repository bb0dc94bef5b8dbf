pub mod action;
pub mod collision;
pub mod entity;
pub mod equipment;
pub mod error;
pub mod hasm;
pub mod health;
pub mod hitbox;
pub mod input;
pub mod loadout;
pub mod melee;
pub mod movement;
pub mod protocol;
pub mod replication;
pub mod stamina;
pub mod states;
pub mod survivor;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use entity::{EntityId, EntityKind, Transform};
pub use error::{decode_packet, encode_packet, ProtocolError, MAX_PACKET_SIZE};
pub use health::{DamageEvent, DamageSource, DamageType, Damageable, EventKind, HealthChange};
pub use protocol::{
    EntitySnapshot, NetworkAttackEvent, NetworkDamageEvent, NetworkLoadout, OwnerState,
};

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_TICK_RATE: u32 = 60;
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Disconnect,
    OwnerUpdate {
        sequence: u32,
        timestamp: u64,
        state: OwnerState,
    },
    Attack(NetworkAttackEvent),
    DamageRequest(NetworkDamageEvent),
    MultiDamageRequest(Vec<NetworkDamageEvent>),
    LoadoutUpdate {
        entity: EntityId,
        index: u8,
        loadout: NetworkLoadout,
    },
    LoadoutSelected {
        entity: EntityId,
        index: u8,
    },

    Connected {
        client_id: u32,
        entity: EntityId,
    },
    HealthChanged(HealthChange),
    Snapshot {
        tick: u32,
        timestamp: u64,
        last_processed: HashMap<u32, u32>,
        entities: Vec<EntitySnapshot>,
    },
    EntityDespawned {
        entity: EntityId,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "Connect",
            Packet::Disconnect => "Disconnect",
            Packet::OwnerUpdate { .. } => "OwnerUpdate",
            Packet::Attack(_) => "Attack",
            Packet::DamageRequest(_) => "DamageRequest",
            Packet::MultiDamageRequest(_) => "MultiDamageRequest",
            Packet::LoadoutUpdate { .. } => "LoadoutUpdate",
            Packet::LoadoutSelected { .. } => "LoadoutSelected",
            Packet::Connected { .. } => "Connected",
            Packet::HealthChanged(_) => "HealthChanged",
            Packet::Snapshot { .. } => "Snapshot",
            Packet::EntityDespawned { .. } => "EntityDespawned",
            Packet::Disconnected { .. } => "Disconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use glam::{Vec2, Vec3};

    fn owner_state() -> OwnerState {
        OwnerState {
            position: Vec3::new(1.0, 0.0, -2.0),
            yaw: 45.0,
            pitch: -10.0,
            anim_move: Vec2::new(0.0, 1.0),
            state: 3,
            stamina: 80.0,
            max_stamina: 100.0,
        }
    }

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect { client_version: 42 };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Connect { client_version } => assert_eq!(client_version, 42),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_owner_update() {
        let packet = Packet::OwnerUpdate {
            sequence: 123,
            timestamp: 456789,
            state: owner_state(),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::OwnerUpdate {
                sequence,
                timestamp,
                state,
            } => {
                assert_eq!(sequence, 123);
                assert_eq!(timestamp, 456789);
                assert_eq!(state, owner_state());
                assert_approx_eq!(state.yaw, 45.0);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_snapshot() {
        let mut player = EntitySnapshot::new(EntityId(1), EntityKind::Player, Vec3::ZERO);
        player.owner = Some(7);
        player.loadouts = vec![NetworkLoadout::new(1, 3), NetworkLoadout::EMPTY];
        let zombie = EntitySnapshot::new(EntityId(2), EntityKind::Zombie, Vec3::new(4.0, 0.0, 4.0));

        let mut last_processed = HashMap::new();
        last_processed.insert(7, 10);

        let packet = Packet::Snapshot {
            tick: 42,
            timestamp: 123456789,
            last_processed,
            entities: vec![player.clone(), zombie],
        };

        let serialized = encode_packet(&packet).unwrap();
        let deserialized = decode_packet(&serialized).unwrap();

        match deserialized {
            Packet::Snapshot {
                tick,
                timestamp,
                last_processed,
                entities,
            } => {
                assert_eq!(tick, 42);
                assert_eq!(timestamp, 123456789);
                assert_eq!(last_processed.get(&7), Some(&10));
                assert_eq!(entities.len(), 2);
                assert_eq!(entities[0], player);
                assert_eq!(entities[1].kind, EntityKind::Zombie);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_health_changed() {
        let change = HealthChange {
            target: EntityId(5),
            source: DamageSource::Entity(EntityId(1)),
            kind: EventKind::Damage,
            previous: 30.0,
            current: 0.0,
            amount: 30.0,
        };
        let serialized = bincode::serialize(&Packet::HealthChanged(change)).unwrap();

        match bincode::deserialize(&serialized).unwrap() {
            Packet::HealthChanged(decoded) => {
                assert_eq!(decoded, change);
                assert!(decoded.died());
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_names() {
        assert_eq!(Packet::Disconnect.name(), "Disconnect");
        assert_eq!(
            Packet::LoadoutSelected {
                entity: EntityId(1),
                index: 2
            }
            .name(),
            "LoadoutSelected"
        );
    }
}

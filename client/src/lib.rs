//! # Game Client Library
//!
//! This library provides a headless client for the survival combat game. It connects to
//! the authoritative server, simulates the player it owns and mirrors everything else.
//!
//! ## Architecture Overview
//!
//! ### Owner Simulation
//! The client is the only writer of its own player's transform, state, stamina and
//! loadouts. It runs the full player actor locally (movement, actions, state machine,
//! equipment) and publishes the result to the server every tick. Attacks are resolved
//! against the local replicas and sent to the server as damage requests.
//!
//! ### Replica Mirrors
//! Every other entity is a mirror of server state. Snapshots, health notifications and
//! loadout deltas are applied compare-then-mutate: applying the same value twice is a
//! no-op, and a lost delta is repaired by the next full snapshot.
//!
//! ### Health Authority
//! The client never changes health on its own. Death and revive of the local player are
//! derived from the server's health notifications (or from a snapshot if a notification
//! was lost) and fed into the local state machine.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Replica mirrors, the owned player actor and the hitbox view used to resolve attacks.
//!
//! ### Input Module (`input`)
//! Input sources and sequencing:
//! - The `InputSource` capability
//! - A seeded scripted bot
//! - Sequence numbers and timestamps for owner updates
//!
//! ### Network Module (`network`)
//! UDP transport, packet dispatch and the fixed-rate client loop.
//!
//! ### HUD Module (`hud`)
//! Read-only view of health, stamina, state and loadouts, plus a feed of recent deaths.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::ScriptedInput;
//! use client::network::Client;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(
//!         "127.0.0.1:8080",
//!         0,
//!         Box::new(ScriptedInput::new(42)),
//!         Some(Duration::from_secs(30)),
//!     )
//!     .await?;
//!
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod hud;
pub mod input;
pub mod network;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

//! # Game Server Library
//!
//! This library provides the authoritative server for the survival combat game. It owns
//! every health value and every AI-driven entity, accepts owner-writable player state from
//! the clients that own it, and broadcasts the results so replicas stay in sync.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Health
//! All damage flows through the server. Clients resolve their own attacks locally and
//! send the resulting events; the server checks that the reported source is the sender's
//! player before applying anything, then broadcasts a health notification that every
//! replica (including the victim's owner) reacts to.
//!
//! ### Server-Owned Entities
//! Zombies, the target dummy, the static archer with its arrows and the breakable props
//! are simulated here only. Their state machines run on the server and their state is
//! carried to clients in snapshots.
//!
//! ### Client Management
//! Handles the lifecycle of client connections:
//! - Protocol version check and player spawning on connect
//! - Ordering of owner updates by timestamp and sequence
//! - Ownership checks on loadout writes
//! - Timeout detection and player cleanup
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Simulation
//! All packets and ticks are processed sequentially by one loop that owns the
//! [`world::World`]. Network receive, send and timeout tasks only move data through
//! channels, so the simulation never needs locking.
//!
//! ### Full Snapshots
//! Every tick the server broadcasts the complete replicated state of every entity.
//! A lost packet is repaired by the next snapshot; health notifications and despawns are
//! sent as separate events so they are not missed between snapshots.
//!
//! ## Module Organization
//!
//! ### Configuration (`config`)
//! Validated server settings and the world layout.
//!
//! ### Client Manager (`client_manager`)
//! Connection tracking, entity assignment and the owner update queue.
//!
//! ### World (`world`)
//! The entity registry: players, zombies, dummies, archers, arrows and breakables, plus
//! damage routing and the collision view used by arrows.
//!
//! ### Zombies (`zombie`, `zombie_manager`)
//! Per-zombie AI and the population manager that spawns, alerts and cleans up.
//!
//! ### Props (`props`)
//! Target dummy, static archer, arrows and breakable props.
//!
//! ### Network (`network`)
//! UDP transport and the main run loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_address: "127.0.0.1:8080".to_string(),
//!         ..Default::default()
//!     };
//!
//!     // Runs until the process is stopped:
//!     // - Accepts connections and spawns a player per client
//!     // - Applies owner updates and damage requests
//!     // - Steps zombies, props and arrows at the tick rate
//!     // - Broadcasts health notifications and snapshots
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod network;
pub mod props;
pub mod world;
pub mod zombie;
pub mod zombie_manager;

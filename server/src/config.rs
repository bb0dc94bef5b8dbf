use crate::world::WorldConfig;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const MAX_ZOMBIES: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tick rate must be between 1 and 1000, got {0}")]
    InvalidTickRate(u32),
    #[error("server must accept at least one client")]
    NoClients,
    #[error("invalid bind address {address:?}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("{requested} zombies requested, limit is {limit}")]
    TooManyZombies { requested: usize, limit: usize },
}

/// Everything the server needs to start listening and simulating.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub tick_rate: u32,
    pub max_clients: usize,
    pub client_timeout: Duration,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: shared::DEFAULT_SERVER_ADDRESS.to_string(),
            tick_rate: shared::DEFAULT_TICK_RATE,
            max_clients: 16,
            client_timeout: Duration::from_secs(5),
            world: WorldConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<SocketAddr, ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        if self.max_clients == 0 {
            return Err(ConfigError::NoClients);
        }
        if self.world.zombies.target_count > MAX_ZOMBIES {
            return Err(ConfigError::TooManyZombies {
                requested: self.world.zombies.target_count,
                limit: MAX_ZOMBIES,
            });
        }
        self.bind_address
            .parse()
            .map_err(|source| ConfigError::InvalidAddress {
                address: self.bind_address.clone(),
                source,
            })
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

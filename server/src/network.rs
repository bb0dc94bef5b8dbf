//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::{ClientManager, PendingUpdate};
use crate::config::ServerConfig;
use crate::world::{World, WorldEvent};
use log::{debug, error, info, warn};
use shared::entity::EntityId;
use shared::health::DamageEvent;
use shared::{decode_packet, encode_packet, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Longest simulated step after a stall.
const MAX_TICK_DT: f32 = 0.1;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        entity: Option<EntityId>,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

pub fn timestamp_millis() -> u64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    timestamp.min(u64::MAX as u128) as u64
}

/// Main server coordinating networking and the authoritative world
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: World,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let addr = config.validate()?;
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            world: World::new(config.world.clone()),
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode_packet(&buffer[0..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Dropped packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send {} to {}: {}", packet.name(), addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!(
                                    "Failed to send {} to client {}: {}",
                                    packet.name(),
                                    client_id,
                                    e
                                );
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for (client_id, entity) in timed_out {
                    let message = ServerMessage::ClientTimeout { client_id, entity };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode_packet(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet, exclude }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn client_for(&self, addr: SocketAddr) -> Option<u32> {
        let mut clients = self.clients.write().await;
        let client_id = clients.find_client_by_addr(addr)?;
        clients.touch(client_id);
        Some(client_id)
    }

    fn request_damage(&mut self, client_id: u32, event: &DamageEvent) {
        if let Err(e) = self.world.request_damage(client_id, event) {
            warn!("Rejected damage from client {}: {}", client_id, e);
        }
    }

    async fn disconnect_client(&mut self, client_id: u32) {
        let entity = {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id)
        };
        if let Some(Some(entity)) = entity {
            self.world.remove_player(entity);
        }
    }

    /// Processes incoming packets against the world
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            self.handle_connect(client_version, addr).await;
            return;
        }

        let Some(client_id) = self.client_for(addr).await else {
            warn!("{} from unknown address {}", packet.name(), addr);
            return;
        };

        match packet {
            Packet::OwnerUpdate {
                sequence,
                timestamp,
                state,
            } => {
                let mut clients = self.clients.write().await;
                clients.add_update(
                    client_id,
                    PendingUpdate {
                        sequence,
                        timestamp,
                        state,
                    },
                );
            }

            Packet::Attack(attack) => {
                self.request_damage(client_id, &attack.to_damage_event());
            }

            Packet::DamageRequest(event) => {
                self.request_damage(client_id, &event.to_damage_event());
            }

            Packet::MultiDamageRequest(events) => {
                for event in &events {
                    self.request_damage(client_id, &event.to_damage_event());
                }
            }

            Packet::LoadoutUpdate {
                entity,
                index,
                loadout,
            } => match self.world.apply_loadout(client_id, entity, index as usize, loadout) {
                Ok(true) => self.broadcast_packet(
                    Packet::LoadoutUpdate {
                        entity,
                        index,
                        loadout,
                    },
                    Some(client_id),
                ),
                Ok(false) => {}
                Err(e) => warn!("Rejected loadout from client {}: {}", client_id, e),
            },

            Packet::LoadoutSelected { entity, index } => {
                match self.world.select_loadout(client_id, entity, index as usize) {
                    Ok(true) => self.broadcast_packet(
                        Packet::LoadoutSelected { entity, index },
                        Some(client_id),
                    ),
                    Ok(false) => {}
                    Err(e) => warn!("Rejected selection from client {}: {}", client_id, e),
                }
            }

            Packet::Disconnect => {
                self.disconnect_client(client_id).await;
            }

            other => {
                warn!("Unexpected {} from client {}", other.name(), client_id);
            }
        }
    }

    async fn handle_connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!("Client connecting from {} (version: {})", addr, client_version);

        if client_version != PROTOCOL_VERSION {
            warn!("Rejecting {}: protocol {} != {}", addr, client_version, PROTOCOL_VERSION);
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // Remove existing connection if present
        let existing_client_id = {
            let clients = self.clients.read().await;
            clients.find_client_by_addr(addr)
        };
        if let Some(existing_id) = existing_client_id {
            info!("Removing existing client {} from {}", existing_id, addr);
            self.disconnect_client(existing_id).await;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr)
        };

        match client_id {
            Some(client_id) => {
                let entity = self.world.spawn_player(client_id);
                {
                    let mut clients = self.clients.write().await;
                    clients.assign_entity(client_id, entity);
                }
                self.send_packet(Packet::Connected { client_id, entity }, addr);
            }
            None => self.send_packet(
                Packet::Disconnected {
                    reason: "Server full".to_string(),
                },
                addr,
            ),
        }
    }

    /// Applies queued owner updates in order
    async fn apply_owner_updates(&mut self) {
        let updates = {
            let mut clients = self.clients.write().await;
            clients.take_pending_updates()
        };
        for (client_id, update) in updates {
            if let Err(e) = self.world.apply_owner_update(client_id, &update.state) {
                warn!("Rejected update {} from client {}: {}", update.sequence, client_id, e);
            }
        }
    }

    /// Sends health notifications and despawns raised since the last flush
    fn flush_world_events(&mut self) {
        for event in self.world.take_events() {
            let packet = match event {
                WorldEvent::HealthChanged(change) => Packet::HealthChanged(change),
                WorldEvent::Despawned(entity) => Packet::EntityDespawned { entity },
            };
            self.broadcast_packet(packet, None);
        }
    }

    /// Broadcasts the full world state to all connected clients
    async fn broadcast_snapshot(&mut self) {
        let last_processed = {
            let clients = self.clients.read().await;
            if clients.is_empty() {
                return;
            }
            clients.get_last_processed()
        };

        let packet = Packet::Snapshot {
            tick: self.world.tick(),
            timestamp: timestamp_millis(),
            last_processed,
            entities: self.world.snapshot(),
        };
        self.broadcast_packet(packet, None);
    }

    async fn tick(&mut self, dt: f32) {
        self.apply_owner_updates().await;
        self.world.update(dt.min(MAX_TICK_DT));
        self.flush_world_events();
        self.broadcast_snapshot().await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.config.tick_duration());
        let mut last_tick = Instant::now();

        info!("Server started at {} Hz", self.config.tick_rate);

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, entity }) => {
                            info!("Client {} timed out", client_id);
                            if let Some(entity) = entity {
                                self.world.remove_player(entity);
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.tick(dt).await;

                    if self.world.tick() % 60 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };
                        debug!(
                            "Tick {}: {} clients, {} zombies, {:.1}Hz",
                            self.world.tick(),
                            client_count,
                            self.world.zombies().len(),
                            1.0 / dt.max(f32::EPSILON)
                        );
                    }
                },
            }
        }

        Ok(())
    }
}

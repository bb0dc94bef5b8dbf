use crate::game::ClientGameState;
use crate::input::{InputManager, InputSource};
use log::{debug, error, info, warn};
use shared::entity::EntityId;
use shared::survivor::{CombatRequest, SurvivorOutput};
use shared::{decode_packet, encode_packet, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

const TICK_RATE: u32 = 60;

/// Turn one tick of owner output into the packets that publish it.
pub fn output_packets(entity: EntityId, output: SurvivorOutput) -> Vec<Packet> {
    let mut packets: Vec<Packet> = output
        .requests
        .into_iter()
        .map(|request| match request {
            CombatRequest::Attack(attack) => Packet::Attack(attack),
            CombatRequest::Damage(event) => Packet::DamageRequest(event),
            CombatRequest::MultiDamage(events) => Packet::MultiDamageRequest(events),
        })
        .collect();

    packets.extend(
        output
            .loadout_changes
            .into_iter()
            .map(|(index, loadout)| Packet::LoadoutUpdate {
                entity,
                index: index as u8,
                loadout,
            }),
    );
    if let Some(index) = output.selection {
        packets.push(Packet::LoadoutSelected {
            entity,
            index: index as u8,
        });
    }
    packets
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,

    game_state: ClientGameState,
    input_manager: InputManager,

    ping_ms: u64,
    fake_ping_ms: u64,
    run_duration: Option<Duration>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        source: Box<dyn InputSource>,
        run_duration: Option<Duration>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(source),
            ping_ms: 0,
            fake_ping_ms,
            run_duration,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = encode_packet(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Apply one server packet to the local view.
    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id, entity } => {
                info!("Connected! Client ID: {}, entity {}", client_id, entity);
                self.client_id = Some(client_id);
                self.connected = true;
                self.game_state.set_local_entity(entity);
            }

            Packet::Snapshot {
                tick,
                timestamp,
                entities,
                ..
            } => {
                let now = crate::timestamp_millis();
                if timestamp > 0 {
                    self.ping_ms = now.saturating_sub(timestamp);
                }
                self.game_state.apply_snapshot(tick, &entities);
            }

            Packet::HealthChanged(change) => {
                self.game_state.apply_health_change(&change);
            }

            Packet::LoadoutUpdate {
                entity,
                index,
                loadout,
            } => {
                self.game_state.apply_loadout(entity, index as usize, &loadout);
            }

            Packet::LoadoutSelected { entity, index } => {
                self.game_state.apply_selection(entity, index as usize);
            }

            Packet::EntityDespawned { entity } => {
                self.game_state.remove_entity(entity);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            other => {
                warn!("Unexpected packet type: {}", other.name());
            }
        }
    }

    /// Step the owned player and collect everything to send this tick.
    pub fn tick(&mut self, dt: f32) -> Vec<Packet> {
        if !self.connected {
            return Vec::new();
        }
        let Some(entity) = self.game_state.local_entity() else {
            return Vec::new();
        };

        let input = self.input_manager.update(dt);
        let Some(output) = self.game_state.tick_local(&input, dt) else {
            return Vec::new();
        };
        let Some(state) = self.game_state.owner_state() else {
            return Vec::new();
        };

        let (sequence, timestamp) = self.input_manager.next_stamp();
        let mut packets = vec![Packet::OwnerUpdate {
            sequence,
            timestamp,
            state,
        }];
        packets.extend(output_packets(entity, output));
        packets
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let dt = 1.0 / TICK_RATE as f32;
        let mut tick_interval = interval(Duration::from_secs_f32(dt));
        let mut hud_interval = interval(Duration::from_secs(1));
        let started = Instant::now();

        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            if let Some(duration) = self.run_duration {
                if started.elapsed() >= duration {
                    info!("Run duration reached");
                    break;
                }
            }

            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            match decode_packet(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet),
                                Err(e) => warn!("Dropped packet: {}", e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = tick_interval.tick() => {
                    for packet in self.tick(dt) {
                        if let Err(e) = self.send_packet(&packet).await {
                            error!("Error sending {}: {}", packet.name(), e);
                        }
                    }
                },

                _ = hud_interval.tick() => {
                    if let Some(hud) = self.game_state.hud() {
                        info!("{}", hud);
                    }
                    debug!(
                        "{} replicas, ping {}ms",
                        self.game_state.replicas().len(),
                        self.ping_ms
                    );
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}

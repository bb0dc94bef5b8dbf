use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use server::world::WorldConfig;
use server::zombie_manager::ZombieManagerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = shared::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Zombie population the server keeps topped up
    #[arg(short, long, default_value = "10")]
    zombies: usize,

    /// Seed for spawn and AI randomness
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Run without the zombie population
    #[arg(long)]
    no_zombies: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        bind_address: format!("{}:{}", args.host, args.port),
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        world: WorldConfig {
            seed: args.seed,
            zombies_enabled: !args.no_zombies,
            zombies: ZombieManagerConfig {
                target_count: args.zombies,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };

    info!("Starting server on {}", config.bind_address);
    if args.no_zombies {
        info!("Zombies disabled");
    }

    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

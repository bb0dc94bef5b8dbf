use clap::Parser;
use client::input::ScriptedInput;
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = shared::DEFAULT_SERVER_ADDRESS)]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Seed for the scripted bot input
    #[arg(short = 'b', long, default_value = "1")]
    bot_seed: u64,

    /// Seconds to run before disconnecting (0 runs until interrupted)
    #[arg(short = 'd', long, default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Bot seed: {}", args.bot_seed);

    let run_duration = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    let mut client = Client::new(
        &args.server,
        args.fake_ping,
        Box::new(ScriptedInput::new(args.bot_seed)),
        run_duration,
    )
    .await?;

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

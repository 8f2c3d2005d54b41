use arena_server::config::{Arena, RoundConfig, ServerConfig, SpawnConfig};
use arena_server::error::ConfigError;
use arena_server::network::Server;
use clap::Parser;
use log::{error, info};
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Maximum number of concurrent connections
    #[clap(short, long, default_value = "64")]
    max_clients: usize,
    /// Arena width
    #[clap(long, default_value = "1600")]
    width: f32,
    /// Arena height
    #[clap(long, default_value = "900")]
    height: f32,
    /// Milliseconds between power-up spawns
    #[clap(long, default_value = "5000")]
    power_up_interval_ms: u64,
    /// Most power-ups on the field at once
    #[clap(long, default_value = "5")]
    power_up_cap: usize,
    /// Milliseconds between NPC spawns
    #[clap(long, default_value = "4000")]
    npc_interval_ms: u64,
    /// Most NPCs on the field at once
    #[clap(long, default_value = "10")]
    npc_cap: usize,
    /// How long a collected power-up lasts, in milliseconds
    #[clap(long, default_value = "10000")]
    effect_duration_ms: u64,
    /// Milliseconds between effect expiry sweeps
    #[clap(long, default_value = "100")]
    sweep_interval_ms: u64,
    /// Round length in seconds
    #[clap(long, default_value = "300")]
    round_secs: u64,
    /// Level that wins the round as soon as a player reaches it
    #[clap(long, default_value = "10")]
    win_level: u32,
    /// Milliseconds a single websocket write may take before the peer is dropped
    #[clap(long, default_value = "2000")]
    write_timeout_ms: u64,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let config = ServerConfig {
            arena: Arena {
                width: self.width,
                height: self.height,
            },
            max_clients: self.max_clients,
            power_ups: SpawnConfig {
                interval: Duration::from_millis(self.power_up_interval_ms),
                cap: self.power_up_cap,
            },
            npcs: SpawnConfig {
                interval: Duration::from_millis(self.npc_interval_ms),
                cap: self.npc_cap,
            },
            effect_duration: Duration::from_millis(self.effect_duration_ms),
            effect_sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            round: RoundConfig {
                duration: Duration::from_secs(self.round_secs),
                win_level: self.win_level,
                ..RoundConfig::default()
            },
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            ..ServerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let config = args.server_config()?;
    let server = Server::new(&address, config).await?;
    let handle = server.handle();
    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown().await;
            let _ = server_task.await;
        }
    }

    Ok(())
}

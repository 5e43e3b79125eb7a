mod config;
mod input;
mod session;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use config::ClientConfig;
use delve::NetConfig;

#[derive(Parser)]
#[command(name = "delve-client")]
#[command(about = "Headless Delve client")]
struct Args {
    #[arg(
        long,
        help = "Host address to join (e.g., 192.168.1.20:5000). Searches the LAN when omitted"
    )]
    host: Option<SocketAddr>,

    #[arg(short, long, default_value = "Adventurer")]
    name: String,

    #[arg(long, default_value_t = 0, help = "Hero catalogue index")]
    hero: u32,

    #[arg(long, default_value_t = delve::DISCOVERY_PORT)]
    discovery_port: u16,

    #[arg(long, default_value_t = 5, help = "Seconds to search for a host")]
    discovery_timeout: u64,

    #[arg(long, default_value_t = delve::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = delve::net::DEFAULT_INPUT_RATE)]
    input_rate: u32,

    #[arg(long, default_value_t = 15.0)]
    smoothing_rate: f32,

    #[arg(long, help = "Follow the host position instead of predicting")]
    no_prediction: bool,

    #[arg(long, help = "Snap to every snapshot instead of smoothing")]
    no_interpolation: bool,

    #[arg(long, help = "Walk a square so the host has input to apply")]
    wander: bool,

    #[arg(long, help = "Stop after this many seconds")]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig {
        host: args.host,
        name: args.name,
        hero_index: args.hero,
        net: NetConfig {
            discovery_port: args.discovery_port,
            tick_rate: args.tick_rate,
            input_rate: args.input_rate,
            smoothing_rate: args.smoothing_rate,
            prediction: !args.no_prediction,
            interpolation: !args.no_interpolation,
            ..Default::default()
        },
        discovery_timeout: Duration::from_secs(args.discovery_timeout),
        wander: args.wander,
        duration: args.duration.map(Duration::from_secs),
        ..Default::default()
    };

    let host = match config.host {
        Some(host) => host,
        None => session::discover_host(&config)?,
    };

    let context = session::join_lobby(host, &config)?;
    session::run_game(context, &config)?;

    Ok(())
}

mod config;
mod server;
mod simulation;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use config::HostConfig;
use delve::NetConfig;
use server::GameHost;

#[derive(Parser)]
#[command(name = "delve-host")]
#[command(about = "Authoritative Delve host")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = delve::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "Delve host")]
    name: String,

    #[arg(short, long, default_value_t = delve::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = delve::net::DEFAULT_SNAPSHOT_RATE)]
    snapshot_rate: u32,

    #[arg(short, long, default_value_t = delve::MAX_PLAYERS)]
    max_players: usize,

    #[arg(long, default_value_t = 2, help = "Seats to fill before starting")]
    min_players: usize,

    #[arg(long, default_value = delve::lobby::DEFAULT_MAP_ID)]
    map: String,

    #[arg(long, default_value_t = 0, help = "Hero catalogue index for the host")]
    hero: u32,

    #[arg(long, help = "Do not answer LAN discovery")]
    no_discovery: bool,

    #[arg(long, help = "Stop after this many seconds")]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HostConfig {
        bind: args.bind,
        name: args.name,
        net: NetConfig {
            port: args.port,
            tick_rate: args.tick_rate,
            snapshot_rate: args.snapshot_rate,
            max_players: args.max_players,
            ..Default::default()
        },
        map_id: args.map,
        hero_index: args.hero,
        min_players: args.min_players,
        discovery: !args.no_discovery,
        duration: args.duration.map(Duration::from_secs),
    };

    let mut host = GameHost::new(config);
    host.run()?;

    log::info!("host shutting down");
    Ok(())
}

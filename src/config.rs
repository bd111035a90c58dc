use std::{net::SocketAddr, time::Duration};

use clap::{Parser, builder::RangedU64ValueParser};

/// Every setting can come from a flag or a `CHATTERBOX_*` variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatterbox", about = "Chat relay over server-sent events")]
pub struct Config {
    /// Socket address to listen on.
    #[arg(long, env = "CHATTERBOX_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Seconds between heartbeat pings.
    #[arg(
        long,
        env = "CHATTERBOX_HEARTBEAT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub heartbeat_secs: u64,

    /// Keep at most this many public messages. Unset keeps all of them.
    #[arg(long, env = "CHATTERBOX_LOG_CAPACITY")]
    pub log_capacity: Option<usize>,

    /// Events buffered per connection before a write counts as failed.
    #[arg(
        long,
        env = "CHATTERBOX_CHANNEL_CAPACITY",
        default_value_t = 256,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            heartbeat_secs: 30,
            log_capacity: None,
            channel_capacity: 256,
        }
    }
}

impl Config {
    /// Loads `.env` first if there is one, then reads flags and the environment.
    pub fn load() -> Config {
        dotenv::dotenv().ok();
        Config::parse()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

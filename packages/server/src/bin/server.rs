//! Kakurega relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakurega-server -- --port 7081
//! ```

use std::time::Duration;

use clap::Parser;
use kakurega_server::{ServerConfig, config};
use kakurega_shared::{key_exchange::DEFAULT_KEY_BITS, logger::setup_logger};

#[derive(Debug, Parser)]
#[command(version, about = "Room relay server for end-to-end encrypted chat")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Seconds between sweeps of empty rooms
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,

    /// RSA modulus size for new room key pairs
    #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
    room_key_bits: usize,

    /// Capacity of each connection's outbound queue
    #[arg(long, default_value_t = config::DEFAULT_OUTBOUND_BUFFER)]
    outbound_buffer: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            room_key_bits: args.room_key_bits,
            outbound_buffer: args.outbound_buffer,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    if let Err(e) = kakurega_server::run_server(args.into()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

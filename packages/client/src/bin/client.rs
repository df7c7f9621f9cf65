//! Kakurega chat client.
//!
//! Type to chat, `/media <path>` to send a file, `/quit` to leave.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakurega-client -- --username alice --room lobby
//! ```

use std::path::PathBuf;

use clap::Parser;
use kakurega_client::{ClientConfig, config::DEFAULT_URL, media::DEFAULT_MEDIA_DIR};
use kakurega_shared::{key_exchange::DEFAULT_KEY_BITS, logger::setup_logger};

#[derive(Debug, Parser)]
#[command(version, about = "End-to-end encrypted room chat client")]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,

    /// Username to join with (prompted if omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// Room to join (prompted if omitted)
    #[arg(short, long)]
    room: Option<String>,

    /// Directory received media is written to
    #[arg(long, default_value = DEFAULT_MEDIA_DIR)]
    media_dir: PathBuf,

    /// RSA modulus size for this peer's key pair
    #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
    key_bits: usize,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            url: args.url,
            username: args.username,
            room: args.room,
            media_dir: args.media_dir,
            key_bits: args.key_bits,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Keep the terminal readable; RUST_LOG overrides
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    if let Err(e) = kakurega_client::run_client(args.into()).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

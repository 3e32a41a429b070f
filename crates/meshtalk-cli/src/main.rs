//! MESHTALK demo CLI
//!
//! Drives two in-process nodes over a [`LoopbackRadio`] pair so the
//! pairing handshake, reliable delivery, and airtime-aware backoff can be
//! exercised without physical radio hardware (out of scope per the core
//! crate's design, see `meshtalk_core`).

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use meshtalk_core::Node;
use meshtalk_radio::{LoopbackRadio, RadioHandle, RadioProfile, SystemClock};
use meshtalk_store::MemKvStore;

use config::TomlConfig;

/// MESHTALK — a store-and-forward direct-message protocol for radio-mesh nodes.
#[derive(Parser)]
#[command(name = "meshtalk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to a TOML file overriding the default radio parameters.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run two in-process nodes over a loopback radio pair, demonstrating
    /// pairing followed by a reliable chat exchange.
    Demo {
        /// Text the first node sends to the second.
        #[arg(default_value = "hello from node A")]
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose { "debug" } else { "info" })
        .init();

    let node_config = match &cli.config {
        Some(path) => TomlConfig::load(path)?.into_node_config(),
        None => TomlConfig::default().into_node_config(),
    };

    match cli.command {
        Commands::Demo { message } => run_demo(message, node_config).await,
    }
}

async fn run_demo(message: String, node_config: meshtalk_core::NodeConfig) -> anyhow::Result<()> {
    const ADDR_A: u16 = 1;
    const ADDR_B: u16 = 2;

    let clock = Arc::new(SystemClock);
    let (radio_a, radio_b): (Arc<dyn RadioHandle>, Arc<dyn RadioHandle>) =
        LoopbackRadio::pair(ADDR_A, ADDR_B, RadioProfile::default(), clock);

    let mut node_a = Node::new(radio_a.clone(), Box::new(MemKvStore::new()), node_config);
    let mut node_b = Node::new(radio_b.clone(), Box::new(MemKvStore::new()), node_config);

    tracing::info!(from = ADDR_A, to = ADDR_B, "demo: triggering pairing handshake");
    node_a.send_draft(ADDR_B, &message, now_ms(), now_sec())?;

    for _ in 0..100 {
        drain(&mut node_a, &radio_a).await;
        drain(&mut node_b, &radio_b).await;
        node_a.tick(now_ms(), now_sec());
        node_b.tick(now_ms(), now_sec());
        if node_a.is_paired(ADDR_B) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    tracing::info!(from = ADDR_A, to = ADDR_B, %message, "demo: pairing complete, resending draft");
    node_a.send_draft(ADDR_B, &message, now_ms(), now_sec())?;

    for _ in 0..100 {
        drain(&mut node_a, &radio_a).await;
        drain(&mut node_b, &radio_b).await;
        node_a.tick(now_ms(), now_sec());
        node_b.tick(now_ms(), now_sec());

        let delivered = node_a.chat_log().at(1).is_some_and(|m| m.delivered);
        if delivered {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    println!("--- node A ({ADDR_A}) chat log ---");
    for i in 0..node_a.chat_log().size() {
        let msg = node_a.chat_log().at(i).unwrap();
        println!("  [{}] -> {}: {} (delivered={})", msg.msg_id, msg.peer, msg.text, msg.delivered);
    }

    println!("--- node B ({ADDR_B}) chat log ---");
    for i in 0..node_b.chat_log().size() {
        let msg = node_b.chat_log().at(i).unwrap();
        println!("  [{}] <- {}: {}", msg.msg_id, msg.peer, msg.text);
    }

    Ok(())
}

async fn drain(node: &mut Node, radio: &Arc<dyn RadioHandle>) {
    while let Ok(Some(record)) = tokio::time::timeout(Duration::from_millis(20), radio.wait_for_packet()).await {
        node.on_rx(record.src, &record.bytes, record.rssi, record.snr, now_ms(), now_sec());
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn now_sec() -> u32 {
    (now_ms() / 1000) as u32
}

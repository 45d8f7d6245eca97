//! Seele full node binary.
//!
//! Wires the node service, the protocol layer and the TCP transport into a
//! running node.

use tracing_subscriber::EnvFilter;

use seele_node::cli::Cli;
use seele_node::config::NodeConfig;
use seele_node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Seele Node v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let config = NodeConfig::from_cli(&cli)?;
    tracing::info!("  Protocol version: {}", seele_p2p::PROTOCOL_VERSION);
    tracing::info!("  Network id: {}", config.network_id);
    tracing::info!("  Coinbase: 0x{}", hex::encode(config.coinbase));

    // Create and run node
    let node = Node::new(config);
    node.run().await?;

    Ok(())
}

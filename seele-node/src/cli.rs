//! Command-line argument parsing.

use std::net::SocketAddr;

use clap::Parser;

/// Seele full node.
#[derive(Parser, Debug, Clone)]
#[command(name = "seele-node")]
#[command(about = "Seele full node binary")]
#[command(version)]
pub struct Cli {
    /// P2P listen address.
    #[arg(long, default_value = "0.0.0.0:8057")]
    pub listen: SocketAddr,

    /// Network identifier. Peers on other networks are refused.
    #[arg(long, default_value_t = seele_p2p::DEFAULT_NETWORK_ID)]
    pub network_id: u64,

    /// Comma-separated list of peers to dial on startup.
    #[arg(long, value_delimiter = ',')]
    pub bootstrap: Option<Vec<SocketAddr>>,

    /// Node identity as 128 hex characters. Random when omitted.
    #[arg(long)]
    pub node_id: Option<String>,

    /// Account receiving mining rewards, 40 hex characters.
    #[arg(long)]
    pub coinbase: Option<String>,

    /// Seconds to wait for the remote status during the handshake.
    #[arg(long, default_value_t = 5)]
    pub handshake_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["seele-node"]);
        assert_eq!(cli.listen.port(), 8057);
        assert_eq!(cli.network_id, 1);
        assert!(cli.bootstrap.is_none());
        assert!(cli.node_id.is_none());
        assert_eq!(cli.handshake_timeout_secs, 5);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_bootstrap_list() {
        let cli = Cli::parse_from([
            "seele-node",
            "--bootstrap",
            "127.0.0.1:8057,192.168.1.1:8057",
        ]);
        let peers = cli.bootstrap.unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[1].port(), 8057);
    }

    #[test]
    fn test_network_id() {
        let cli = Cli::parse_from(["seele-node", "--network-id", "2"]);
        assert_eq!(cli.network_id, 2);
    }
}

//! Seele full node library.
//!
//! This library provides the components for building and running a Seele
//! node on top of the `seele-p2p` session layer. It is used by the
//! `seele-node` binary and can also be used for testing and embedding.

pub mod api;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod node;
pub mod service;
pub mod shutdown;
pub mod transport;

pub use error::{NodeError, NodeResult};
pub use node::Node;
pub use service::SeeleService;

//! Seele wire protocol.
//!
//! This module contains:
//! - Message definitions
//! - Length-prefixed framing codec
//! - Disconnect reason codes
//! - Status handshake logic

pub mod disconnect;
pub mod framing;
pub mod handshake;
pub mod messages;

// Re-export main types
pub use disconnect::DisconnectReason;
pub use framing::{check_frame_size, MessageCodec};
pub use handshake::{perform_handshake, validate_status, HandshakeState};
pub use messages::{Message, NewBlockMessage, NewTransactionMessage, StatusMessage};

//! Error types for the transport beneath L2CAP
//!
//! L2CAP's own errors live in [`crate::l2cap::types`]; this module covers
//! failures of the HCI ACL transport that framed packets are handed to.

use thiserror::Error;

/// Errors that can occur when handing ACL data to the controller
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to send ACL data: {0}")]
    SendError(std::io::Error),

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("Invalid ACL packet format")]
    InvalidPacketFormat,

    #[error("Controller has no buffer for ACL data")]
    Congested,

    #[error("Link is not connected")]
    NotConnected,
}

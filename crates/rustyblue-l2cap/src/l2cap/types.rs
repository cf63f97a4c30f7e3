//! Type definitions for L2CAP operations
//!
//! This module contains the error type, configuration, and counters shared
//! by the L2CAP layer.

use thiserror::Error;

use super::constants::*;
use crate::error::TransportError;
use crate::hci::acl::PacketBoundary;

/// Error types specific to L2CAP operations
#[derive(Debug, Error)]
pub enum L2capError {
    #[error("Message too short for L2CAP header")]
    MessageTooShort,

    #[error("L2CAP length {header_len} does not match ACL length {acl_len}")]
    MessageSizeMismatch { header_len: u16, acl_len: u16 },

    #[error("Payload of {0} bytes does not fit an L2CAP frame")]
    MessageTooLong(usize),

    #[error("Channel not found: CID 0x{0:04X}")]
    ChannelNotFound(u16),

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("HCI fragmentation unsupported (packet boundary: {0})")]
    UnsupportedFragmentation(PacketBoundary),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl L2capError {
    /// Whether a remote peer can cause this error with what it sends.
    ///
    /// These drop the offending packet and never indicate a local fault.
    pub fn is_peer_triggered(&self) -> bool {
        matches!(
            self,
            Self::MessageTooShort
                | Self::MessageSizeMismatch { .. }
                | Self::ChannelNotFound(_)
                | Self::UnsupportedFragmentation(_)
        )
    }
}

/// Result type for L2CAP operations
pub type L2capResult<T> = std::result::Result<T, L2capError>;

/// L2CAP layer configuration
#[derive(Debug, Clone)]
pub struct L2capConfig {
    /// Capacity of the channel pool
    pub chan_max: usize,
    /// Default MTU of the attribute protocol channel
    pub att_mtu: u16,
    /// Default MTU of the LE signaling channel
    pub sig_mtu: u16,
    /// Default MTU of the security manager channel
    pub sm_mtu: u16,
}

impl Default for L2capConfig {
    fn default() -> Self {
        Self {
            chan_max: L2CAP_CHAN_MAX,
            att_mtu: L2CAP_ATT_MTU_DFLT,
            sig_mtu: L2CAP_SIG_MTU,
            sm_mtu: L2CAP_SM_MTU,
        }
    }
}

/// Packet counters kept by the L2CAP manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct L2capStats {
    /// Frames delivered to a channel handler
    pub rx_frames: u64,
    /// Frames dropped as malformed (short, length mismatch, fragmented)
    pub rx_malformed: u64,
    /// Frames dropped for an unbound CID
    pub rx_unknown_cid: u64,
    /// Frames whose handler returned an error
    pub rx_handler_errors: u64,
    /// Frames handed to the transport
    pub tx_frames: u64,
    /// Frames released after a framing or transport failure
    pub tx_errors: u64,
}

//! L2CAP (Logical Link Control and Adaptation Protocol) implementation
//!
//! This module provides the LE fixed-channel L2CAP layer, which is responsible for:
//! - Multiplexing logical channels over a single physical connection
//! - Framing outbound payloads with the basic L2CAP header
//! - Tracking per-channel MTU negotiation state
//! - Managing channel objects in a fixed-capacity pool

pub mod channel;
pub mod constants;
pub mod core;
pub mod packet;
pub mod pool;
pub mod types;

// Re-export the public API
pub use self::channel::{ChannelFlags, L2capChannel, RxFn};
pub use self::core::{tx, L2capManager};
pub use self::packet::{parse_header, prepend_header, L2capHeader};
pub use self::pool::{ChannelHandle, ChannelPool};
pub use self::types::*;

//! RustyBlue L2CAP - the L2CAP layer of a Bluetooth Low Energy host
//!
//! This library takes complete HCI ACL data packets belonging to one
//! physical connection, demultiplexes them into fixed logical channels by
//! channel id, and hands the payloads to the receive handler each upper-layer
//! protocol (ATT, signaling, security manager) registers. Outbound payloads
//! are framed with the L2CAP header and handed to an HCI transport.

pub mod conn;
pub mod error;
pub mod hci;
pub mod l2cap;
pub mod mbuf;

// Re-export common types for convenience
pub use conn::{Connection, HsConn};
pub use error::TransportError;
pub use hci::{AclHeader, HciAclTransport, HciSocket, PacketBoundary, Transport};
pub use l2cap::{
    ChannelHandle, ChannelPool, L2capChannel, L2capConfig, L2capError, L2capHeader,
    L2capManager, L2capResult, L2capStats,
};
pub use mbuf::{Mbuf, MbufPool};

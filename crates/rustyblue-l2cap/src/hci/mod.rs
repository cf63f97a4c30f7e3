//! Bluetooth HCI (Host Controller Interface) ACL data plumbing
//!
//! This module provides the ACL header codec and the transport L2CAP uses
//! to hand framed packets to the controller.

pub mod acl;
pub mod constants;
pub mod socket;
pub mod transport;


pub use acl::{AclHeader, PacketBoundary};
pub use socket::HciSocket;
pub use transport::{encode_acl_packet, HciAclTransport, Transport};

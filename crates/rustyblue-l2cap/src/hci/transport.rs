//! Outbound transport for framed L2CAP packets
//!
//! L2CAP hands every framed packet to a [`Transport`]. The production
//! implementation wraps each frame in an HCI ACL header and writes it to a raw
//! HCI socket.

use log::trace;

use crate::error::TransportError;
use crate::hci::acl::{AclHeader, PacketBoundary};
use crate::hci::constants::*;
use crate::hci::socket::HciSocket;
use crate::mbuf::Mbuf;

/// Sink for outbound L2CAP frames
pub trait Transport {
    /// Send a framed packet. The chain is consumed whether or not the send
    /// succeeds; on error it has already been released.
    fn send(&mut self, om: Mbuf) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, om: Mbuf) -> Result<(), TransportError> {
        (**self).send(om)
    }
}

/// Build the bytes of an HCI ACL packet carrying `om` on `conn_handle`.
///
/// Host-to-controller LE data is always sent as a single non-flushable start
/// fragment; the controller does any link-layer fragmentation.
pub fn encode_acl_packet(conn_handle: u16, om: &Mbuf) -> Result<Vec<u8>, TransportError> {
    let length = u16::try_from(om.len()).map_err(|_| TransportError::InvalidPacketFormat)?;
    let header = AclHeader::new(conn_handle, PacketBoundary::FirstNonFlushable, length);

    let mut packet = Vec::with_capacity(1 + HCI_ACL_HDR_SIZE + om.len());
    packet.push(HCI_ACL_PKT);
    packet.extend_from_slice(&header.to_bytes());
    packet.extend_from_slice(&om.to_vec());
    Ok(packet)
}

/// Transport writing ACL data for one connection to a raw HCI socket
#[derive(Debug)]
pub struct HciAclTransport {
    socket: HciSocket,
    conn_handle: u16,
}

impl HciAclTransport {
    /// Wrap an open socket for the connection identified by `conn_handle`
    pub fn new(socket: HciSocket, conn_handle: u16) -> Self {
        Self {
            socket,
            conn_handle: conn_handle & HCI_ACL_HANDLE_MASK,
        }
    }

    /// Open HCI device `dev_id` and bind a transport to `conn_handle`
    pub fn open(dev_id: u16, conn_handle: u16) -> Result<Self, TransportError> {
        Ok(Self::new(HciSocket::open(dev_id)?, conn_handle))
    }

    /// Connection handle frames are addressed to
    pub fn conn_handle(&self) -> u16 {
        self.conn_handle
    }

    /// Underlying socket
    pub fn socket(&self) -> &HciSocket {
        &self.socket
    }
}

impl Transport for HciAclTransport {
    fn send(&mut self, om: Mbuf) -> Result<(), TransportError> {
        let packet = encode_acl_packet(self.conn_handle, &om)?;
        drop(om);

        trace!(
            "ACL tx handle=0x{:03X} {}",
            self.conn_handle,
            hex::encode(&packet[1..])
        );
        self.socket.write_packet(&packet)
    }
}

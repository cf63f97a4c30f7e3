//! HCI ACL data header
//!
//! Every L2CAP frame reaches the host inside an ACL data packet whose 4-byte
//! header carries the connection handle, the packet boundary (PB) and
//! broadcast (BC) flags, and the data length.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::hci::constants::*;
use crate::l2cap::types::{L2capError, L2capResult};
use crate::mbuf::Mbuf;

/// Packet boundary flag of an ACL data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketBoundary {
    /// First fragment of a non-flushable higher-layer message
    FirstNonFlushable = HCI_PB_FIRST_NON_FLUSH,
    /// Continuing fragment
    Middle = HCI_PB_MIDDLE,
    /// First fragment of a flushable higher-layer message
    FirstFlushable = HCI_PB_FIRST_FLUSH,
    /// Complete, unfragmented higher-layer message
    Full = HCI_PB_FULL,
}

impl PacketBoundary {
    /// Decode the two PB bits
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            HCI_PB_FIRST_NON_FLUSH => Self::FirstNonFlushable,
            HCI_PB_MIDDLE => Self::Middle,
            HCI_PB_FIRST_FLUSH => Self::FirstFlushable,
            _ => Self::Full,
        }
    }
}

impl fmt::Display for PacketBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstNonFlushable => write!(f, "first non-flushable"),
            Self::Middle => write!(f, "continuing fragment"),
            Self::FirstFlushable => write!(f, "first flushable"),
            Self::Full => write!(f, "complete"),
        }
    }
}

/// ACL data packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclHeader {
    /// Connection handle (12 bits) with PB and BC flags in the top nibble
    pub handle_pb_bc: u16,
    /// Length of the data following the header
    pub length: u16,
}

impl AclHeader {
    /// Create a header for `handle` with the given boundary flag and no broadcast
    pub fn new(handle: u16, pb: PacketBoundary, length: u16) -> Self {
        let handle_pb_bc =
            (handle & HCI_ACL_HANDLE_MASK) | (((pb as u16) << HCI_ACL_PB_SHIFT) & HCI_ACL_PB_MASK);
        Self {
            handle_pb_bc,
            length,
        }
    }

    /// Connection handle
    pub fn handle(&self) -> u16 {
        self.handle_pb_bc & HCI_ACL_HANDLE_MASK
    }

    /// Packet boundary flag
    pub fn packet_boundary(&self) -> PacketBoundary {
        PacketBoundary::from_bits(((self.handle_pb_bc & HCI_ACL_PB_MASK) >> HCI_ACL_PB_SHIFT) as u8)
    }

    /// Broadcast flag
    pub fn broadcast_flag(&self) -> u8 {
        ((self.handle_pb_bc & HCI_ACL_BC_MASK) >> HCI_ACL_BC_SHIFT) as u8
    }

    /// Parse an ACL header from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HCI_ACL_HDR_SIZE {
            return None;
        }

        Some(Self {
            handle_pb_bc: LittleEndian::read_u16(&data[0..2]),
            length: LittleEndian::read_u16(&data[2..4]),
        })
    }

    /// Parse an ACL header from the front of a buffer chain
    pub fn from_mbuf(om: &Mbuf) -> L2capResult<Self> {
        let mut raw = [0u8; HCI_ACL_HDR_SIZE];
        om.copy_data(0, &mut raw)?;
        Self::parse(&raw).ok_or(L2capError::MessageTooShort)
    }

    /// Serialize the header to bytes
    pub fn to_bytes(&self) -> [u8; HCI_ACL_HDR_SIZE] {
        let mut result = [0u8; HCI_ACL_HDR_SIZE];
        LittleEndian::write_u16(&mut result[0..2], self.handle_pb_bc);
        LittleEndian::write_u16(&mut result[2..4], self.length);
        result
    }
}

//! L2CAP header codec
//!
//! Every L2CAP frame starts with a 4-byte basic header: the payload length
//! followed by the channel id, both little-endian. The header is always
//! encoded field by field.

use byteorder::{ByteOrder, LittleEndian};

use super::constants::*;
use super::types::*;
use crate::mbuf::Mbuf;

/// L2CAP basic header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2capHeader {
    /// Length of the L2CAP payload in bytes, header excluded
    pub length: u16,
    /// Channel Identifier
    pub cid: u16,
}

impl L2capHeader {
    /// Create a new L2CAP header
    pub fn new(length: u16, cid: u16) -> Self {
        Self { length, cid }
    }

    /// Parse an L2CAP header from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < L2CAP_HDR_SIZE {
            return None;
        }

        Some(Self {
            length: LittleEndian::read_u16(&data[0..2]),
            cid: LittleEndian::read_u16(&data[2..4]),
        })
    }

    /// Serialize the header to bytes
    pub fn to_bytes(&self) -> [u8; L2CAP_HDR_SIZE] {
        let mut result = [0u8; L2CAP_HDR_SIZE];
        LittleEndian::write_u16(&mut result[0..2], self.length);
        LittleEndian::write_u16(&mut result[2..4], self.cid);
        result
    }
}

/// Read the L2CAP header found `off` bytes into a buffer chain.
///
/// The header may straddle segments. Only the size is checked; comparing the
/// length field against the payload is up to the caller.
pub fn parse_header(om: &Mbuf, off: usize) -> L2capResult<L2capHeader> {
    let mut raw = [0u8; L2CAP_HDR_SIZE];
    om.copy_data(off, &mut raw)?;
    L2capHeader::parse(&raw).ok_or(L2capError::MessageTooShort)
}

/// Prepend an L2CAP header for `cid` covering the chain's current contents.
///
/// On error the chain is left as it was and still belongs to the caller.
pub fn prepend_header(om: &mut Mbuf, cid: u16) -> L2capResult<()> {
    let length = u16::try_from(om.len()).map_err(|_| L2capError::MessageTooLong(om.len()))?;
    let header = L2capHeader::new(length, cid);

    om.prepend(L2CAP_HDR_SIZE)?
        .copy_from_slice(&header.to_bytes());
    Ok(())
}

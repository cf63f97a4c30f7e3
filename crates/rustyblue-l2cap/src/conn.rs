//! Physical connection and its channel table
//!
//! L2CAP only needs a connection to resolve a CID to a channel. [`HsConn`]
//! is a minimal host-side connection that owns such a table.

use std::collections::BTreeMap;

use crate::l2cap::pool::{ChannelHandle, ChannelPool};
use crate::l2cap::types::{L2capError, L2capResult};

/// What L2CAP requires of a physical connection
pub trait Connection {
    /// HCI connection handle
    fn handle(&self) -> u16;

    /// Look up the channel bound to `cid` on this connection
    fn find_channel(&self, cid: u16) -> Option<ChannelHandle>;
}

/// Host-side connection holding a CID-keyed channel table
#[derive(Debug)]
pub struct HsConn {
    handle: u16,
    channels: BTreeMap<u16, ChannelHandle>,
}

impl HsConn {
    /// Create a connection with no channels
    pub fn new(handle: u16) -> Self {
        Self {
            handle,
            channels: BTreeMap::new(),
        }
    }

    /// Bind `chan` to `cid`. Each CID may be bound once.
    pub fn insert_channel(&mut self, cid: u16, chan: ChannelHandle) -> L2capResult<()> {
        if self.channels.contains_key(&cid) {
            return Err(L2capError::InvalidArgument(format!(
                "CID 0x{:04X} already bound on connection 0x{:03X}",
                cid, self.handle
            )));
        }

        self.channels.insert(cid, chan);
        Ok(())
    }

    /// Unbind `cid`, returning the channel it referred to
    pub fn remove_channel(&mut self, cid: u16) -> Option<ChannelHandle> {
        self.channels.remove(&cid)
    }

    /// Number of bound channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Bound CIDs in ascending order
    pub fn cids(&self) -> impl Iterator<Item = u16> + '_ {
        self.channels.keys().copied()
    }

    /// Unbind every channel and return it to `pool`.
    ///
    /// Must run before the connection is dropped.
    pub fn free_channels(&mut self, pool: &mut ChannelPool) {
        for (_, chan) in std::mem::take(&mut self.channels) {
            pool.free(chan);
        }
    }
}

impl Connection for HsConn {
    fn handle(&self) -> u16 {
        self.handle
    }

    fn find_channel(&self, cid: u16) -> Option<ChannelHandle> {
        self.channels.get(&cid).copied()
    }
}

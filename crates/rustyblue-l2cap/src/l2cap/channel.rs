//! L2CAP Channel implementation
//!
//! This module provides the L2CAP channel object: one logical endpoint on a
//! physical connection, its MTU negotiation state, and the receive handler
//! the owning upper-layer protocol registers for it.

use std::fmt;

use bitflags::bitflags;

use super::types::*;
use crate::conn::Connection;
use crate::mbuf::Mbuf;

bitflags! {
    /// Per-channel state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelFlags: u8 {
        /// The local MTU has been sent to the peer
        const TXED_MTU = 0x01;
    }
}

/// Receive handler for an L2CAP channel.
///
/// Called once per inbound frame with the frame payload held in the
/// channel's receive buffer (see [`L2capChannel::rx_buf_mut`]). The handler
/// may take, trim or replace that chain; whatever is left there when it
/// returns is released by the L2CAP layer.
pub type RxFn = Box<dyn FnMut(&dyn Connection, &mut L2capChannel) -> L2capResult<()> + Send>;

/// L2CAP Channel structure
#[derive(Default)]
pub struct L2capChannel {
    /// Channel Identifier (CID)
    cid: u16,
    /// Minimum MTU this channel guarantees
    default_mtu: u16,
    /// MTU advertised by the local side
    my_mtu: u16,
    /// MTU advertised by the peer; 0 until received
    peer_mtu: u16,
    /// State flags
    flags: ChannelFlags,
    /// Receive buffer in flight, present only while the handler runs
    rx_buf: Option<Mbuf>,
    /// Receive handler
    rx_fn: Option<RxFn>,
    /// Set by `clear_rx_handler`, checked after the handler returns
    rx_fn_cleared: bool,
}

impl L2capChannel {
    /// Create a fixed channel advertising its default MTU
    pub fn new_fixed(cid: u16, default_mtu: u16) -> Self {
        Self {
            cid,
            default_mtu,
            my_mtu: default_mtu,
            ..Default::default()
        }
    }

    /// Get the Channel Identifier (CID)
    pub fn cid(&self) -> u16 {
        self.cid
    }

    /// Get the default (minimum) MTU
    pub fn default_mtu(&self) -> u16 {
        self.default_mtu
    }

    /// Get the locally advertised MTU
    pub fn my_mtu(&self) -> u16 {
        self.my_mtu
    }

    /// Set the locally advertised MTU.
    ///
    /// Must not be lower than the default MTU.
    pub fn set_my_mtu(&mut self, mtu: u16) {
        self.my_mtu = mtu;
    }

    /// Get the peer's advertised MTU (0 if none received)
    pub fn peer_mtu(&self) -> u16 {
        self.peer_mtu
    }

    /// Record the MTU advertised by the peer
    pub fn set_peer_mtu(&mut self, mtu: u16) {
        self.peer_mtu = mtu;
    }

    /// Get the channel flags
    pub fn flags(&self) -> ChannelFlags {
        self.flags
    }

    /// Whether the local MTU has been sent to the peer
    pub fn mtu_exchanged(&self) -> bool {
        self.flags.contains(ChannelFlags::TXED_MTU)
    }

    /// Note that the local MTU has been sent to the peer
    pub fn mark_mtu_exchanged(&mut self) {
        self.flags.insert(ChannelFlags::TXED_MTU);
    }

    /// Get the MTU usable on this channel.
    ///
    /// Until both sides have advertised an MTU this is the default MTU;
    /// afterwards it is the lesser of the two advertised values.
    pub fn effective_mtu(&self) -> u16 {
        let mtu = if !self.mtu_exchanged() || self.peer_mtu == 0 {
            self.default_mtu
        } else {
            self.my_mtu.min(self.peer_mtu)
        };

        assert!(
            mtu >= self.default_mtu,
            "CID 0x{:04X}: effective MTU {} below default {}",
            self.cid,
            mtu,
            self.default_mtu
        );

        mtu
    }

    /// Set the receive handler
    pub fn set_rx_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&dyn Connection, &mut L2capChannel) -> L2capResult<()> + Send + 'static,
    {
        self.rx_fn = Some(Box::new(handler));
        self.rx_fn_cleared = false;
    }

    /// Clear the receive handler. May be called from the handler itself.
    pub fn clear_rx_handler(&mut self) {
        self.rx_fn = None;
        self.rx_fn_cleared = true;
    }

    /// Whether a receive handler is registered
    pub fn has_rx_handler(&self) -> bool {
        self.rx_fn.is_some()
    }

    /// The receive buffer currently in flight
    pub fn rx_buf(&self) -> Option<&Mbuf> {
        self.rx_buf.as_ref()
    }

    /// Mutable access to the in-flight receive buffer slot
    pub fn rx_buf_mut(&mut self) -> &mut Option<Mbuf> {
        &mut self.rx_buf
    }

    /// Take ownership of the in-flight receive buffer
    pub fn take_rx_buf(&mut self) -> Option<Mbuf> {
        self.rx_buf.take()
    }

    /// Hand one inbound payload to the receive handler.
    ///
    /// The payload sits in `rx_buf` for the duration of the call and anything
    /// left there afterwards is released, whatever the handler returns. A
    /// channel without a handler discards the payload.
    pub(crate) fn rx_payload(&mut self, conn: &dyn Connection, om: Mbuf) -> L2capResult<()> {
        assert!(
            self.rx_buf.is_none(),
            "CID 0x{:04X}: receive already in flight",
            self.cid
        );
        self.rx_buf = Some(om);

        let result = match self.rx_fn.take() {
            Some(mut rx_fn) => {
                self.rx_fn_cleared = false;
                let rc = rx_fn(conn, self);
                // Restore unless the callback replaced or cleared itself
                if self.rx_fn.is_none() && !self.rx_fn_cleared {
                    self.rx_fn = Some(rx_fn);
                }
                rc
            }
            None => Ok(()),
        };

        self.rx_buf = None;
        result
    }
}

impl fmt::Debug for L2capChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("L2capChannel")
            .field("cid", &self.cid)
            .field("default_mtu", &self.default_mtu)
            .field("my_mtu", &self.my_mtu)
            .field("peer_mtu", &self.peer_mtu)
            .field("flags", &self.flags)
            .field("rx_buf", &self.rx_buf)
            .field("has_rx_handler", &self.rx_fn.is_some())
            .finish()
    }
}

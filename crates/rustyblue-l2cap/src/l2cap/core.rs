//! L2CAP Core Manager implementation
//!
//! This module provides the L2CAP manager that handles:
//! - Channel allocation from the fixed pool
//! - Demultiplexing inbound ACL data to channels by CID
//! - Framing outbound payloads and handing them to the transport

use log::{debug, log_enabled, trace, warn, Level};

use crate::conn::{Connection, HsConn};
use crate::hci::acl::{AclHeader, PacketBoundary};
use crate::hci::constants::HCI_ACL_HDR_SIZE;
use crate::hci::transport::Transport;
use crate::l2cap::channel::L2capChannel;
use crate::l2cap::constants::*;
use crate::l2cap::packet::{parse_header, prepend_header};
use crate::l2cap::pool::{ChannelHandle, ChannelPool};
use crate::l2cap::types::{L2capConfig, L2capError, L2capResult, L2capStats};
use crate::mbuf::Mbuf;

/// L2CAP Manager responsible for handling L2CAP operations
pub struct L2capManager<T: Transport> {
    /// Configuration the manager was created with
    config: L2capConfig,
    /// Channel objects
    pool: ChannelPool,
    /// Destination of outbound frames
    transport: T,
    /// Packet counters
    stats: L2capStats,
}

impl<T: Transport> L2capManager<T> {
    /// Create a new L2CAP manager with a channel pool sized by `config`
    pub fn new(config: L2capConfig, transport: T) -> L2capResult<Self> {
        let pool = ChannelPool::with_capacity(config.chan_max)?;

        Ok(Self {
            config,
            pool,
            transport,
            stats: L2capStats::default(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &L2capConfig {
        &self.config
    }

    /// Get the channel pool
    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    /// Get the channel pool mutably
    pub fn pool_mut(&mut self) -> &mut ChannelPool {
        &mut self.pool
    }

    /// Get the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the transport mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get the packet counters
    pub fn stats(&self) -> L2capStats {
        self.stats
    }

    /// Reinitialise the channel pool, discarding every channel.
    ///
    /// Connections holding handles from before the reset must be dropped.
    pub fn reset(&mut self) -> L2capResult<()> {
        self.pool.init(self.config.chan_max)
    }

    /// Get a channel
    pub fn channel(&self, handle: ChannelHandle) -> Option<&L2capChannel> {
        self.pool.get(handle)
    }

    /// Get a channel mutably
    pub fn channel_mut(&mut self, handle: ChannelHandle) -> Option<&mut L2capChannel> {
        self.pool.get_mut(handle)
    }

    /// Get the effective MTU of a channel
    pub fn effective_mtu(&self, handle: ChannelHandle) -> Option<u16> {
        self.pool.get(handle).map(L2capChannel::effective_mtu)
    }

    /// Allocate a fixed channel, register its handler and bind it on `conn`
    pub fn create_fixed_channel<F>(
        &mut self,
        conn: &mut HsConn,
        cid: u16,
        default_mtu: u16,
        handler: F,
    ) -> L2capResult<ChannelHandle>
    where
        F: FnMut(&dyn Connection, &mut L2capChannel) -> L2capResult<()> + Send + 'static,
    {
        let handle = self.pool.alloc().ok_or(L2capError::OutOfMemory)?;

        if let Some(chan) = self.pool.get_mut(handle) {
            *chan = L2capChannel::new_fixed(cid, default_mtu);
            chan.set_rx_handler(handler);
        }

        if let Err(err) = conn.insert_channel(cid, handle) {
            self.pool.free(handle);
            return Err(err);
        }

        debug!(
            "L2CAP fixed channel 0x{:04X} open on connection 0x{:03X}",
            cid,
            conn.handle()
        );
        Ok(handle)
    }

    /// Unbind and free a single channel of `conn`
    pub fn remove_channel(&mut self, conn: &mut HsConn, cid: u16) -> L2capResult<()> {
        let handle = conn
            .remove_channel(cid)
            .ok_or(L2capError::ChannelNotFound(cid))?;
        self.pool.free(handle);
        Ok(())
    }

    /// Free every channel of a connection that is going away
    pub fn disconnect(&mut self, conn: &mut HsConn) {
        debug!(
            "L2CAP freeing {} channels of connection 0x{:03X}",
            conn.channel_count(),
            conn.handle()
        );
        conn.free_channels(&mut self.pool);
    }

    /// Handle a complete ACL data packet whose ACL header is still in front
    pub fn rx_acl(&mut self, conn: &dyn Connection, mut om: Mbuf) -> L2capResult<()> {
        let hci_hdr = match AclHeader::from_mbuf(&om) {
            Ok(hdr) => hdr,
            Err(err) => {
                self.stats.rx_malformed += 1;
                return Err(err);
            }
        };
        om.adjust_front(HCI_ACL_HDR_SIZE);

        // The ACL length must cover exactly what the controller delivered
        if usize::from(hci_hdr.length) != om.len() {
            warn!(
                "ACL rx on handle 0x{:03X}: length {} but {} bytes delivered",
                hci_hdr.handle(),
                hci_hdr.length,
                om.len()
            );
            self.stats.rx_malformed += 1;
            return Err(L2capError::MessageSizeMismatch {
                header_len: hci_hdr.length,
                acl_len: u16::try_from(om.len()).unwrap_or(u16::MAX),
            });
        }

        self.receive(conn, &hci_hdr, om)
    }

    /// Demultiplex one inbound L2CAP frame to its channel.
    ///
    /// `om` holds the frame, L2CAP header included, as carried by the ACL
    /// packet described by `hci_hdr`. The chain is consumed on every path.
    pub fn receive(
        &mut self,
        conn: &dyn Connection,
        hci_hdr: &AclHeader,
        mut om: Mbuf,
    ) -> L2capResult<()> {
        let pb = hci_hdr.packet_boundary();
        if pb != PacketBoundary::Full {
            warn!(
                "L2CAP rx on handle 0x{:03X}: dropping fragment ({})",
                hci_hdr.handle(),
                pb
            );
            self.stats.rx_malformed += 1;
            return Err(L2capError::UnsupportedFragmentation(pb));
        }

        let l2cap_hdr = match parse_header(&om, 0) {
            Ok(hdr) => hdr,
            Err(err) => {
                self.stats.rx_malformed += 1;
                return Err(err);
            }
        };

        // Strip the L2CAP header from the front of the chain
        om.adjust_front(L2CAP_HDR_SIZE);

        if hci_hdr.length.checked_sub(L2CAP_HDR_SIZE as u16) != Some(l2cap_hdr.length) {
            warn!(
                "L2CAP rx CID 0x{:04X}: length {} does not match ACL length {}",
                l2cap_hdr.cid, l2cap_hdr.length, hci_hdr.length
            );
            self.stats.rx_malformed += 1;
            return Err(L2capError::MessageSizeMismatch {
                header_len: l2cap_hdr.length,
                acl_len: hci_hdr.length,
            });
        }

        let chan = match conn
            .find_channel(l2cap_hdr.cid)
            .and_then(|handle| self.pool.get_mut(handle))
        {
            Some(chan) => chan,
            None => {
                debug!(
                    "L2CAP rx on handle 0x{:03X}: no channel for CID 0x{:04X}",
                    conn.handle(),
                    l2cap_hdr.cid
                );
                self.stats.rx_unknown_cid += 1;
                return Err(L2capError::ChannelNotFound(l2cap_hdr.cid));
            }
        };

        if log_enabled!(Level::Trace) {
            trace!(
                "L2CAP rx CID 0x{:04X} len={} {}",
                l2cap_hdr.cid,
                om.len(),
                hex::encode(om.to_vec())
            );
        }

        self.stats.rx_frames += 1;
        let result = chan.rx_payload(conn, om);
        if result.is_err() {
            self.stats.rx_handler_errors += 1;
        }
        result
    }

    /// Frame `om` for a channel and hand it to the transport.
    ///
    /// The chain is consumed on every path: on success the transport owns it,
    /// on failure it has been released.
    pub fn transmit(&mut self, handle: ChannelHandle, om: Mbuf) -> L2capResult<()> {
        let Some(cid) = self.pool.get(handle).map(L2capChannel::cid) else {
            self.stats.tx_errors += 1;
            return Err(L2capError::InvalidArgument(format!(
                "stale channel handle {:?}",
                handle
            )));
        };

        let result = tx(&mut self.transport, cid, om);
        match result {
            Ok(()) => self.stats.tx_frames += 1,
            Err(_) => self.stats.tx_errors += 1,
        }
        result
    }
}

/// Prepend the L2CAP header for `cid` and send the frame over `transport`.
///
/// `om` is consumed whatever the outcome.
pub fn tx<T: Transport + ?Sized>(transport: &mut T, cid: u16, mut om: Mbuf) -> L2capResult<()> {
    // A failed prepend leaves the chain to us; it is released on return
    prepend_header(&mut om, cid)?;

    if log_enabled!(Level::Trace) {
        trace!("L2CAP tx CID 0x{:04X} {}", cid, hex::encode(om.to_vec()));
    }

    transport.send(om)?;
    Ok(())
}

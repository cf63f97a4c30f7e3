//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface, used
//! here to exchange ACL data packets with a Bluetooth controller.

use crate::error::TransportError;
use crate::hci::constants::*;
use std::os::unix::io::{AsRawFd, RawFd};

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_RAW: i32 = 0;

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

impl HciSocket {
    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    ///
    /// # Returns
    ///
    /// A new `HciSocket` instance or an error if the socket could not be opened
    pub fn open(dev_id: u16) -> Result<Self, TransportError> {
        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_RAW, BTPROTO_HCI) };

        if fd < 0 {
            return Err(TransportError::SocketError(std::io::Error::last_os_error()));
        }

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW as u16,
        };

        let result = unsafe {
            libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(TransportError::BindError(err));
        }

        Ok(HciSocket { fd })
    }

    /// Write one complete HCI packet (type indicator included)
    pub fn write_packet(&self, packet: &[u8]) -> Result<(), TransportError> {
        let written = unsafe {
            libc::write(
                self.fd,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        };

        if written < 0 {
            return Err(write_error(std::io::Error::last_os_error()));
        }

        if written as usize != packet.len() {
            return Err(TransportError::ShortWrite {
                written: written as usize,
                expected: packet.len(),
            });
        }

        Ok(())
    }

    /// Read the next ACL data packet, returning it without the type indicator.
    ///
    /// Packets of other types are skipped.
    pub fn read_acl_packet(&self) -> Result<Vec<u8>, TransportError> {
        let mut buffer = vec![0u8; HCI_MAX_ACL_PKT_SIZE];

        loop {
            let bytes_read = unsafe {
                libc::read(
                    self.fd,
                    buffer.as_mut_ptr() as *mut libc::c_void,
                    buffer.len(),
                )
            };

            if bytes_read < 0 {
                return Err(TransportError::SocketError(std::io::Error::last_os_error()));
            }

            let bytes_read = bytes_read as usize;
            if bytes_read == 0 {
                return Err(TransportError::NotConnected);
            }

            if buffer[0] != HCI_ACL_PKT {
                continue;
            }

            if bytes_read < 1 + HCI_ACL_HDR_SIZE {
                return Err(TransportError::InvalidPacketFormat);
            }

            buffer.truncate(bytes_read);
            buffer.remove(0);
            return Ok(buffer);
        }
    }
}

/// Classify a failed ACL write. `ENOBUFS` means the controller has no free
/// ACL buffer and the write may be retried later.
pub(crate) fn write_error(err: std::io::Error) -> TransportError {
    match err.raw_os_error() {
        Some(libc::ENOBUFS) => TransportError::Congested,
        _ => TransportError::SendError(err),
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

//! HCI ACL data constants
//!
//! This module contains constants for the HCI ACL data packets that carry
//! L2CAP traffic between host and controller.

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_ACL_PKT: u8 = 0x02;
pub const HCI_EVENT_PKT: u8 = 0x04;

// ACL data header: handle/flags (2) + data length (2)
pub const HCI_ACL_HDR_SIZE: usize = 4;

// Connection handle and flag fields of the first header word
pub const HCI_ACL_HANDLE_MASK: u16 = 0x0FFF;
pub const HCI_ACL_PB_MASK: u16 = 0x3000;
pub const HCI_ACL_PB_SHIFT: u16 = 12;
pub const HCI_ACL_BC_MASK: u16 = 0xC000;
pub const HCI_ACL_BC_SHIFT: u16 = 14;

// Packet boundary flag values
pub const HCI_PB_FIRST_NON_FLUSH: u8 = 0;
pub const HCI_PB_MIDDLE: u8 = 1;
pub const HCI_PB_FIRST_FLUSH: u8 = 2;
pub const HCI_PB_FULL: u8 = 3;

// Largest ACL packet read from the socket in one go
pub const HCI_MAX_ACL_PKT_SIZE: usize = 1 + HCI_ACL_HDR_SIZE + 0xFFFF;

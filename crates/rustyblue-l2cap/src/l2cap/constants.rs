//! L2CAP protocol constants
//!
//! Fixed channel identifiers and default MTUs for an LE host.

// Basic L2CAP header: length (2) + channel id (2)
pub const L2CAP_HDR_SIZE: usize = 4;

// Number of channel objects the pool holds by default
pub const L2CAP_CHAN_MAX: usize = 32;

// Fixed channel identifiers (LE)
pub const L2CAP_CID_NULL: u16 = 0x0000;
pub const L2CAP_CID_ATT: u16 = 0x0004;
pub const L2CAP_CID_SIG: u16 = 0x0005;
pub const L2CAP_CID_SM: u16 = 0x0006;

// Dynamically allocated channel identifiers start here
pub const L2CAP_DYNAMIC_CID_MIN: u16 = 0x0040;

// Default MTUs of the fixed channels
pub const L2CAP_ATT_MTU_DFLT: u16 = 23;
pub const L2CAP_SIG_MTU: u16 = 23;
pub const L2CAP_SM_MTU: u16 = 65;

//! Smart node GATT services.
//!
//! The control service accepts output commands and network credentials. The
//! status service reports the output state, network state, and a sensor
//! reading. Each service is served by a single dispatcher that routes
//! accesses by characteristic UUID.

use std::fmt::Debug;

pub use {control::*, status::*};

use crate::Uuid;

mod control;
mod status;

/// Digital output driver.
pub trait Output: Debug + Send + Sync {
    /// Sets the output level.
    fn set(&self, on: bool);
}

/// Returns a node service UUID. The services differ only in the first
/// (least significant) byte.
const fn service_uuid(first: u8) -> Uuid {
    Uuid::from_le_bytes([
        first, 0x34, 0x56, 0x78, 0x90, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x09, 0x87, 0x65, 0x43,
        0x21,
    ])
}

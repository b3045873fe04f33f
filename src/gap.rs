//! Generic Access Profile ([Vol 3] Part C).
//!
//! The peripheral resolves its identity address, advertises, and tracks the
//! single connection through pairing and encryption until it disconnects.

pub use {adv::*, consts::*, identity::*, peripheral::*, response_data::*};

use crate::att::Handle;
use crate::host::Status;
use crate::Uuid;

mod adv;
mod consts;
mod identity;
mod peripheral;
mod response_data;

/// Error type returned by the GAP layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{op} failed: {status}")]
    Stack { op: &'static str, status: Status },
    #[error("advertising data is {len} bytes, exceeding the {max} byte limit")]
    DataTooLong { len: usize, max: usize },
    #[error("host stack is not synchronized")]
    NotSynced,
    #[error("no active connection")]
    NotConnected,
    #[error("peer is not subscribed to indications of {0}")]
    NotSubscribed(Handle),
    #[error("unknown characteristic {0}")]
    UnknownCharacteristic(Uuid),
}

impl Error {
    /// Returns a mapping of a host stack status to an error for operation
    /// `op`.
    #[inline]
    pub(crate) fn stack(op: &'static str) -> impl FnOnce(Status) -> Self {
        move |status| Self::Stack { op, status }
    }
}

/// Common GAP result type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;

//! Generic Attribute Profile ([Vol 3] Part G).
//!
//! Services are declared with a [`Builder`], registered with the host stack,
//! and served by a [`Server`] that routes each attribute access to the
//! characteristic's I/O callback.

pub use {consts::*, db::*, io::*, server::*};

use crate::att::Handle;
use crate::host;
use crate::Uuid;

mod consts;
mod db;
mod io;
mod server;

/// Error type returned by the GATT layer.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("attribute table has no services")]
    EmptyDb,
    #[error("service {0} has no characteristics")]
    EmptyService(Uuid),
    #[error("duplicate service {0}")]
    DuplicateService(Uuid),
    #[error("duplicate characteristic {uuid} in service {svc}")]
    DuplicateCharacteristic { svc: Uuid, uuid: Uuid },
    #[error("characteristic {0} has no properties")]
    NoProperties(Uuid),
    #[error("duplicate descriptor {uuid} of characteristic {chr}")]
    DuplicateDescriptor { chr: Uuid, uuid: Uuid },
    #[error("attribute registration failed: {0}")]
    Register(#[from] host::Status),
    #[error("assigned handles do not match the attribute table")]
    HandleMismatch,
    #[error("handle {0} assigned more than once")]
    DuplicateHandle(Handle),
}

/// Common GATT result type.
pub type Result<T> = std::result::Result<T, Error>;

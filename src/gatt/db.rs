use nodelink_const::Descriptor as DescriptorType;

pub use builder::*;

use crate::att::Handle;
use crate::smp::SecState;
use crate::Uuid;

use super::{Io, Prop};

mod builder;

/// Read-only attribute table definition. The host stack assigns handles when
/// the table is registered.
#[derive(Debug)]
pub struct Db {
    pub(in crate::gatt) svcs: Box<[Service]>,
}

impl Db {
    /// Returns a new database builder.
    #[inline(always)]
    #[must_use]
    pub fn build() -> Builder<Db> {
        Builder::new()
    }

    /// Returns the service definitions in declaration order.
    #[inline(always)]
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.svcs
    }

    /// Assigns handles in declaration order, the way a host stack allocates
    /// them: one handle per service declaration, two per characteristic
    /// (declaration and value), one for the Client Characteristic
    /// Configuration descriptor that the stack adds for notifying and
    /// indicating characteristics, and one per descriptor. Returns `None` if
    /// the handle space is exhausted.
    #[must_use]
    pub fn sequential_handles(&self, first: Handle) -> Option<Vec<ServiceHandles>> {
        let mut next = Some(first);
        let mut take = move || {
            let h = next?;
            next = h.next();
            Some(h)
        };
        let mut v = Vec::with_capacity(self.svcs.len());
        for s in self.svcs.iter() {
            let hdl = take()?;
            let mut chars = Vec::with_capacity(s.chars.len());
            for c in s.chars.iter() {
                let (def, val) = (take()?, take()?);
                if c.props.has_cccd() {
                    take()?;
                }
                let descs = (c.descs.iter()).map(|_| take()).collect::<Option<_>>()?;
                chars.push(CharHandles { def, val, descs });
            }
            v.push(ServiceHandles { hdl, chars });
        }
        Some(v)
    }
}

/// Primary service definition.
#[derive(Debug)]
pub struct Service {
    pub(in crate::gatt) uuid: Uuid,
    pub(in crate::gatt) chars: Box<[Characteristic]>,
}

impl Service {
    /// Returns the service UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the characteristic definitions in declaration order.
    #[inline(always)]
    #[must_use]
    pub fn characteristics(&self) -> &[Characteristic] {
        &self.chars
    }
}

/// Characteristic definition.
#[derive(Debug)]
pub struct Characteristic {
    pub(in crate::gatt) uuid: Uuid,
    pub(in crate::gatt) props: Prop,
    pub(in crate::gatt) sec: SecState,
    pub(in crate::gatt) io: Io,
    pub(in crate::gatt) descs: Box<[Descriptor]>,
}

impl Characteristic {
    /// Returns the characteristic UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the characteristic properties.
    #[inline(always)]
    #[must_use]
    pub const fn props(&self) -> Prop {
        self.props
    }

    /// Returns the minimum link security state required to access the value.
    #[inline(always)]
    #[must_use]
    pub const fn security(&self) -> SecState {
        self.sec
    }

    /// Returns the descriptor definitions in declaration order.
    #[inline(always)]
    #[must_use]
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descs
    }

    /// Returns the characteristic I/O callback.
    #[inline(always)]
    pub(super) const fn io(&self) -> &Io {
        &self.io
    }
}

/// Read-only descriptor with a value stored in the table.
#[derive(Debug)]
pub struct Descriptor {
    pub(in crate::gatt) uuid: Uuid,
    pub(in crate::gatt) val: Box<[u8]>,
}

impl Descriptor {
    /// Returns the descriptor UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the descriptor value.
    #[inline(always)]
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.val
    }

    /// Returns the text of a Characteristic User Description descriptor.
    #[must_use]
    pub fn user_description(&self) -> Option<&str> {
        (self.uuid == DescriptorType::CharacteristicUserDescription)
            .then(|| std::str::from_utf8(&self.val).ok())
            .flatten()
    }
}

/// Handles assigned to a service by the host stack.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceHandles {
    /// Service declaration handle.
    pub hdl: Handle,
    pub chars: Vec<CharHandles>,
}

/// Handles assigned to a characteristic by the host stack.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CharHandles {
    /// Characteristic declaration handle.
    pub def: Handle,
    /// Characteristic value handle.
    pub val: Handle,
    /// Descriptor handles in declaration order.
    pub descs: Vec<Handle>,
}

use std::marker::PhantomData;
use std::mem;

use nodelink_const::Descriptor as DescriptorType;

use crate::gatt::{Error, Result};

use super::*;

/// Database characteristic definition marker type.
#[derive(Debug)]
pub struct ServiceDef;

/// Database descriptor definition marker type.
#[derive(Debug)]
pub struct CharacteristicDef;

/// Database builder used to define services, characteristics, and descriptors.
/// Definition errors are reported by [`Builder::freeze`].
#[derive(Debug)]
pub struct Builder<T>(DbBuilder, PhantomData<T>);

/// Builder state shared by all definition levels.
#[derive(Debug, Default)]
pub struct DbBuilder {
    svcs: Vec<Service>,
    chars: Vec<Characteristic>,
    descs: Vec<Descriptor>,
    err: Option<Error>,
}

impl DbBuilder {
    /// Records the first definition error.
    #[inline]
    fn fail(&mut self, e: Error) {
        self.err.get_or_insert(e);
    }

    /// Moves the builder state into a builder for the next definition level,
    /// calls `f`, and moves the state back.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Builder<T>)) {
        let mut b = Builder(mem::take(self), PhantomData);
        f(&mut b);
        *self = b.0;
    }
}

impl Builder<Db> {
    /// Creates a new database builder.
    #[inline]
    #[must_use]
    pub(super) fn new() -> Self {
        Self(DbBuilder::default(), PhantomData)
    }

    /// Defines a primary service ([Vol 3] Part G, Section 3.1).
    pub fn primary_service(
        &mut self,
        uuid: impl Into<Uuid>,
        chars: impl FnOnce(&mut Builder<ServiceDef>),
    ) -> &mut Self {
        let uuid = uuid.into();
        if self.0.svcs.iter().any(|s| s.uuid == uuid) {
            self.0.fail(Error::DuplicateService(uuid));
        }
        self.0.nested(chars);
        let chars = mem::take(&mut self.0.chars);
        if chars.is_empty() {
            self.0.fail(Error::EmptyService(uuid));
        }
        for (i, c) in chars.iter().enumerate() {
            if chars[..i].iter().any(|p| p.uuid == c.uuid) {
                self.0.fail(Error::DuplicateCharacteristic { svc: uuid, uuid: c.uuid });
            }
        }
        self.0.svcs.push(Service {
            uuid,
            chars: chars.into_boxed_slice(),
        });
        self
    }

    /// Returns the final read-only database or the first definition error.
    pub fn freeze(self) -> Result<Db> {
        let b = self.0;
        if let Some(e) = b.err {
            return Err(e);
        }
        if b.svcs.is_empty() {
            return Err(Error::EmptyDb);
        }
        Ok(Db {
            svcs: b.svcs.into_boxed_slice(),
        })
    }
}

impl Builder<ServiceDef> {
    /// Defines a single-value characteristic ([Vol 3] Part G, Section 3.3).
    /// Access to the value requires the link to be at least in the `sec`
    /// state.
    pub fn characteristic(
        &mut self,
        uuid: impl Into<Uuid>,
        props: Prop,
        sec: SecState,
        io: impl Into<Io>,
        descs: impl FnOnce(&mut Builder<CharacteristicDef>),
    ) -> &mut Self {
        let uuid = uuid.into();
        if props.is_empty() {
            self.0.fail(Error::NoProperties(uuid));
        }
        self.0.nested(descs);
        let descs = mem::take(&mut self.0.descs);
        for (i, d) in descs.iter().enumerate() {
            if descs[..i].iter().any(|p| p.uuid == d.uuid) {
                self.0.fail(Error::DuplicateDescriptor { chr: uuid, uuid: d.uuid });
            }
        }
        self.0.chars.push(Characteristic {
            uuid,
            props,
            sec,
            io: io.into(),
            descs: descs.into_boxed_slice(),
        });
        self
    }
}

impl Builder<CharacteristicDef> {
    /// Declares a read-only characteristic descriptor with the value stored
    /// in the database ([Vol 3] Part G, Section 3.3.3).
    pub fn ro_descriptor(&mut self, uuid: impl Into<Uuid>, val: impl AsRef<[u8]>) -> &mut Self {
        self.0.descs.push(Descriptor {
            uuid: uuid.into(),
            val: val.as_ref().into(),
        });
        self
    }

    /// Declares a Characteristic User Description descriptor
    /// ([Vol 3] Part G, Section 3.3.3.2).
    #[inline]
    pub fn user_description(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.ro_descriptor(
            DescriptorType::CharacteristicUserDescription,
            text.as_ref().as_bytes(),
        )
    }
}

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::att::{ErrorCode, Handle};
use crate::host::Stack;
use crate::smp::SecState;
use crate::Uuid;

use super::*;

/// Attribute located by its handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Attr {
    Value { svc: usize, chr: usize },
    Descriptor { svc: usize, chr: usize, desc: usize },
}

/// GATT server that routes attribute accesses to characteristic I/O
/// callbacks.
#[derive(Debug)]
pub struct Server {
    db: Db,
    attr: BTreeMap<Handle, Attr>,
    hdls: Vec<ServiceHandles>,
}

impl Server {
    /// Registers the attribute table with the host stack and returns a server
    /// for the assigned handles.
    pub fn register(db: Db, stack: &mut impl Stack) -> Result<Self> {
        let hdls = stack.register(&db)?;
        let mut attr = BTreeMap::new();
        let mut add = |hdl: Handle, at: Attr| match attr.insert(hdl, at) {
            None => Ok(()),
            Some(_) => Err(Error::DuplicateHandle(hdl)),
        };
        if hdls.len() != db.svcs.len() {
            return Err(Error::HandleMismatch);
        }
        for (svc, (s, sh)) in db.svcs.iter().zip(&hdls).enumerate() {
            if sh.chars.len() != s.chars.len() {
                return Err(Error::HandleMismatch);
            }
            info!("Registered service {} with handle={}", s.uuid, sh.hdl);
            for (chr, (c, ch)) in s.chars.iter().zip(&sh.chars).enumerate() {
                if ch.descs.len() != c.descs.len() {
                    return Err(Error::HandleMismatch);
                }
                info!(
                    "Registering characteristic {} with def_handle={} val_handle={}",
                    c.uuid, ch.def, ch.val
                );
                add(ch.val, Attr::Value { svc, chr })?;
                for (desc, (d, &dh)) in c.descs.iter().zip(&ch.descs).enumerate() {
                    info!("Registering descriptor {} with handle={dh}", d.uuid);
                    add(dh, Attr::Descriptor { svc, chr, desc })?;
                }
            }
        }
        Ok(Self { db, attr, hdls })
    }

    /// Returns the attribute table.
    #[inline(always)]
    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// Returns the handles assigned during registration.
    #[inline(always)]
    #[must_use]
    pub fn handles(&self) -> &[ServiceHandles] {
        &self.hdls
    }

    /// Returns the value handle of the first characteristic with the
    /// specified UUID.
    #[must_use]
    pub fn value_handle(&self, uuid: impl Into<Uuid>) -> Option<Handle> {
        let uuid = uuid.into();
        (self.attr.iter()).find_map(|(&hdl, &at)| match at {
            Attr::Value { svc, chr } => {
                (self.db.svcs[svc].chars[chr].uuid == uuid).then_some(hdl)
            }
            Attr::Descriptor { .. } => None,
        })
    }

    /// Returns the characteristic definition for a value handle.
    #[must_use]
    pub fn characteristic(&self, hdl: Handle) -> Option<&Characteristic> {
        match self.attr.get(&hdl) {
            Some(&Attr::Value { svc, chr }) => Some(&self.db.svcs[svc].chars[chr]),
            _ => None,
        }
    }

    /// Executes a read of the characteristic value or descriptor at `hdl` over
    /// a link in security state `sec`.
    pub fn read(&self, sec: SecState, hdl: Handle) -> std::result::Result<Vec<u8>, ErrorCode> {
        let r = match self.attr.get(&hdl) {
            None => Err(ErrorCode::UnlikelyError),
            Some(&Attr::Descriptor { svc, chr, desc }) => {
                let d = &self.db.svcs[svc].chars[chr].descs[desc];
                let mut r = ReadReq::new(d.uuid);
                r.append(&d.val).map(|_| r)
            }
            Some(&Attr::Value { svc, chr }) => {
                let c = &self.db.svcs[svc].chars[chr];
                if !c.props.contains(Prop::READ) {
                    Err(ErrorCode::UnlikelyError)
                } else {
                    Self::check_sec(c, sec).and_then(|_| {
                        let mut r = ReadReq::new(c.uuid);
                        c.io().exec(IoReq::Read(&mut r)).map(|_| r)
                    })
                }
            }
        };
        match r {
            Ok(r) => {
                debug!("Read {hdl}: {} bytes", r.value().len());
                Ok(r.value().to_vec())
            }
            Err(e) => {
                warn!("Denied read of {hdl}: {e}");
                Err(e)
            }
        }
    }

    /// Executes a write of `val` to the characteristic value at `hdl` over a
    /// link in security state `sec`. Descriptors are read-only.
    pub fn write(&self, sec: SecState, hdl: Handle, val: &[u8]) -> IoResult {
        let r = match self.attr.get(&hdl) {
            None | Some(&Attr::Descriptor { .. }) => Err(ErrorCode::UnlikelyError),
            Some(&Attr::Value { svc, chr }) => {
                let c = &self.db.svcs[svc].chars[chr];
                if !c.props.writable() {
                    Err(ErrorCode::UnlikelyError)
                } else {
                    Self::check_sec(c, sec)
                        .and_then(|_| c.io().exec(IoReq::Write(&WriteReq::new(c.uuid, val))))
                }
            }
        };
        match r {
            Ok(()) => debug!("Wrote {hdl}: {} bytes", val.len()),
            Err(e) => warn!("Denied write to {hdl}: {e}"),
        }
        r
    }

    /// Verifies that the link security state permits access to `c`.
    fn check_sec(c: &Characteristic, sec: SecState) -> IoResult {
        match c.sec {
            req if sec >= req => Ok(()),
            SecState::Authenticated | SecState::Bonded => {
                Err(ErrorCode::InsufficientAuthentication)
            }
            _ => Err(ErrorCode::InsufficientEncryption),
        }
    }
}

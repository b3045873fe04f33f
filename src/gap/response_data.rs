//! Length-type-value response data format used in Advertising Data (AD) and
//! Scan Response Data (SRD) blocks:
//!
//! * [Vol 3] Part C, Section 11
//! * [Core Specification Supplement] Part A, Section 1
//! * [Assigned Numbers] Section 2.3

use structbuf::{Pack, Packer, StructBuf};

use crate::gap::{AdvFlag, LeRole, ResponseDataType};
use crate::le::TxPower;
use crate::{Appearance, Uuid};

/// Response data builder.
#[derive(Clone, Debug)]
pub struct ResponseDataMut(StructBuf);

impl ResponseDataMut {
    /// Creates a new response data buffer.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(StructBuf::new(254)) // [Vol 6] Part B, Section 2.3.4
    }

    /// Returns the number of bytes written so far.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the buffer is empty.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// Returns the final response data buffer.
    #[allow(clippy::missing_const_for_fn)]
    #[inline]
    pub fn get(self) -> StructBuf {
        self.0
    }

    /// Appends service class UUIDs (\[CSS\] Part A, Section 1.1). 16-bit and
    /// 128-bit UUIDs go into separate lists. An incomplete list is omitted
    /// when it has no entries.
    pub fn service_class<T: Copy + Into<Uuid>>(
        &mut self,
        complete: bool,
        uuids: &[T],
    ) -> &mut Self {
        let typ = u8::from(ResponseDataType::IncompleteServiceClass16) + u8::from(complete);
        self.maybe_put(complete, typ, |b| {
            (uuids.iter().filter_map(|&u| u.into().as_u16())).for_each(|v| {
                b.u16(v);
            });
        });
        self.maybe_put(complete, typ + 4, |b| {
            (uuids.iter().filter_map(|&u| u.into().as_u128())).for_each(|v| {
                b.u128(v);
            });
        })
    }

    /// Appends either shortened or complete local device name
    /// (\[CSS\] Part A, Section 1.2).
    pub fn local_name<T: AsRef<str>>(&mut self, complete: bool, v: T) -> &mut Self {
        let typ = u8::from(ResponseDataType::ShortLocalName) + u8::from(complete);
        self.put(typ, |b| {
            b.put(v.as_ref().as_bytes());
        })
    }

    /// Appends advertising flags (\[CSS\] Part A, Section 1.3).
    pub fn flags(&mut self, v: AdvFlag) -> &mut Self {
        self.put(ResponseDataType::Flags, |b| {
            b.u8(v.bits());
        })
    }

    /// Appends manufacturer-specific data (\[CSS\] Part A, Section 1.4).
    pub fn manufacturer_data(&mut self, company_id: u16, v: &[u8]) -> &mut Self {
        self.put(ResponseDataType::ManufacturerData, |b| {
            b.u16(company_id).put(v);
        })
    }

    /// Appends TX power level (\[CSS\] Part A, Section 1.5).
    pub fn tx_power(&mut self, v: TxPower) -> &mut Self {
        self.put(ResponseDataType::TxPower, |b| {
            b.i8(v.dbm());
        })
    }

    /// Appends device appearance (\[CSS\] Part A, Section 1.12).
    pub fn appearance(&mut self, v: Appearance) -> &mut Self {
        self.put(ResponseDataType::Appearance, |b| {
            b.u16(v);
        })
    }

    /// Appends LE role (\[CSS\] Part A, Section 1.17).
    pub fn le_role(&mut self, v: LeRole) -> &mut Self {
        self.put(ResponseDataType::LeRole, |b| {
            b.u8(v);
        })
    }

    /// Appends a length-type-data field to the buffer, calling `f` to provide
    /// the data.
    #[inline]
    fn put<T: Into<u8>>(&mut self, typ: T, f: impl Fn(&mut Packer)) -> &mut Self {
        self.maybe_put(true, typ, f)
    }

    /// Append a length-type-data field to the buffer, calling `f` to provide
    /// the data. If the data is empty and `keep_empty` is `false`, then nothing
    /// gets appended.
    fn maybe_put<T: Into<u8>>(
        &mut self,
        keep_empty: bool,
        typ: T,
        f: impl Fn(&mut Packer),
    ) -> &mut Self {
        let i = self.0.len();
        f(self.0.append().put([0, typ.into()]));
        let n = u8::try_from(self.0.len().wrapping_sub(i + 1)).expect("response data overflow");
        self.0[i] = n;
        if !keep_empty && n < 2 {
            self.0.truncate(i);
        }
        self
    }
}

impl Default for ResponseDataMut {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

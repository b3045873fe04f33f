//! LE-specific types.

use std::fmt::{Debug, Display, Formatter};

use rand_core::RngCore;

/// Bluetooth device address ([Vol 6] Part B, Section 1.3).
#[allow(clippy::exhaustive_enums)]
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
)]
pub enum Addr {
    Public(RawAddr),
    Random(RawAddr),
}

impl Addr {
    /// Constructs an address from the host stack's type code and raw
    /// components. Returns `None` for an unknown type.
    #[inline]
    #[must_use]
    pub const fn from_typ(typ: u8, raw: RawAddr) -> Option<Self> {
        // [Vol 4] Part E, Sections 7.7.65.1 and 7.7.65.10
        match typ {
            0x00 | 0x02 => Some(Self::Public(raw)),
            0x01 | 0x03 => Some(Self::Random(raw)),
            _ => None,
        }
    }

    /// Returns the raw 48-bit address.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> RawAddr {
        match self {
            Self::Public(addr) | Self::Random(addr) => addr,
        }
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Public(ref raw) => write!(f, "{raw} (public)"),
            Self::Random(ref raw) => write!(f, "{raw} (random)"),
        }
    }
}

impl Default for Addr {
    #[inline]
    fn default() -> Self {
        Self::Public(RawAddr::default())
    }
}

/// 48-bit untyped device address stored in little-endian byte order.
#[derive(
    Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct RawAddr([u8; 6]);

impl RawAddr {
    /// Creates an address from little-endian bytes.
    #[inline(always)]
    #[must_use]
    pub const fn from_le_bytes(v: [u8; 6]) -> Self {
        Self(v)
    }

    /// Returns the little-endian byte representation.
    #[inline(always)]
    #[must_use]
    pub const fn as_le_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Generates a random static address ([Vol 6] Part B, Section 1.3.2.1).
    #[must_use]
    pub fn random_static(rng: &mut impl RngCore) -> Self {
        Self::random(rng, 0b11)
    }

    /// Generates a non-resolvable private address
    /// ([Vol 6] Part B, Section 1.3.2.2).
    #[must_use]
    pub fn non_resolvable(rng: &mut impl RngCore) -> Self {
        Self::random(rng, 0b00)
    }

    /// Returns the random address sub-type encoded in the two most
    /// significant bits.
    #[inline]
    #[must_use]
    pub const fn random_subtype(&self) -> u8 {
        self.0[5] >> 6
    }

    /// Generates a random address with the specified two-bit sub-type. The
    /// random part must contain at least one 0 and one 1 bit.
    fn random(rng: &mut impl RngCore, typ: u8) -> Self {
        loop {
            let mut v = [0; 6];
            rng.fill_bytes(&mut v);
            v[5] = v[5] & 0x3F | typ << 6;
            let (all0, all1) = v.iter().enumerate().fold((true, true), |(z, o), (i, &b)| {
                let b = if i == 5 { b & 0x3F } else { b };
                let full = if i == 5 { 0x3F } else { 0xFF };
                (z && b == 0, o && b == full)
            });
            if !all0 && !all1 {
                return Self(v);
            }
        }
    }
}

impl From<[u8; 6]> for RawAddr {
    #[inline]
    fn from(v: [u8; 6]) -> Self {
        Self(v)
    }
}

impl AsRef<[u8]> for RawAddr {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Debug for RawAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // [Vol 3] Part C, Section 3.2.1.3
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[5], self.0[4], self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }
}

impl Display for RawAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Address type used by the local device for advertising and connections
/// ([Vol 4] Part E, Section 7.8.5).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display)]
#[non_exhaustive]
pub enum OwnAddrType {
    #[default]
    Public,
    Random,
    RpaOrPublic,
    RpaOrRandom,
}

impl OwnAddrType {
    /// Returns whether the identity address is a random address.
    #[inline]
    #[must_use]
    pub const fn is_random(self) -> bool {
        matches!(self, Self::Random | Self::RpaOrRandom)
    }
}

/// Transmission power level in dBm.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct TxPower(i8);

impl TxPower {
    /// Creates a new TX power level.
    #[inline(always)]
    #[must_use]
    pub const fn new(dbm: i8) -> Self {
        Self(dbm)
    }

    /// Returns the power level in dBm.
    #[inline(always)]
    #[must_use]
    pub const fn dbm(self) -> i8 {
        self.0
    }
}

impl Display for TxPower {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} dBm", self.0)
    }
}

impl From<TxPower> for i8 {
    #[inline(always)]
    fn from(p: TxPower) -> Self {
        p.0
    }
}

/// LE PHY ([Vol 4] Part E, Section 7.8.53).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display)]
#[non_exhaustive]
pub enum Phy {
    #[default]
    Le1M,
    Le2M,
    LeCoded,
}

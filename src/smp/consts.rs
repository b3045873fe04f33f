use bitflags::bitflags;

/// IO capability ([Vol 3] Part H, Section 3.5.1).
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
)]
#[non_exhaustive]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum IoCap {
    DisplayOnly = 0x00,
    DisplayYesNo = 0x01,
    KeyboardOnly = 0x02,
    #[default]
    NoInputNoOutput = 0x03,
    KeyboardDisplay = 0x04,
}

bitflags! {
    /// Requested security properties ([Vol 3] Part H, Section 3.5.1).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct AuthReq: u8 {
        /// Bonding requested.
        const BONDING = 0b01;
        /// MITM protection (authentication) requested.
        const MITM = 1 << 2;
        /// LE Secure Connections pairing is supported.
        const SC = 1 << 3;
    }
}

bitflags! {
    /// LE Key Distribution parameter ([Vol 3] Part H, Section 3.6.1).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct KeyDist: u8 {
        /// Ignored in LE Secure Connections pairing.
        const ENC = 1 << 0;
        /// Distribute IRK using the Identity Information command.
        const ID = 1 << 1;
        /// Distribute CSRK using the Signing Information command.
        const SIGN = 1 << 2;
    }
}

/// Security state of a link. States are ordered, and a link only ever moves
/// towards a higher state while it remains connected.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum SecState {
    #[default]
    Unencrypted,
    Encrypting,
    Encrypted,
    Authenticated,
    Bonded,
}

impl SecState {
    /// Returns whether the link is at least encrypted.
    #[inline]
    #[must_use]
    pub fn is_secure(self) -> bool {
        self >= Self::Encrypted
    }
}

impl From<crate::host::LinkSec> for SecState {
    fn from(s: crate::host::LinkSec) -> Self {
        match s {
            s if s.encrypted && s.bonded => Self::Bonded,
            s if s.encrypted && s.authenticated => Self::Authenticated,
            s if s.encrypted => Self::Encrypted,
            _ => Self::Unencrypted,
        }
    }
}

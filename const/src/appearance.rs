use std::fmt::{Display, Formatter};

/// Device appearance ([Assigned Numbers] Section 2.6). Only the generic
/// category values are listed.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
)]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
#[non_exhaustive]
#[repr(u16)]
pub enum Appearance {
    #[default]
    GenericUnknown = 0x0000,
    GenericPhone = 0x0040,
    GenericComputer = 0x0080,
    GenericWatch = 0x00C0,
    GenericTag = 0x0200,
    GenericKeyring = 0x0240,
    GenericSensor = 0x0540,
    GenericLightFixtures = 0x0580,
}

impl Appearance {
    /// Returns the 10-bit category component.
    #[inline]
    #[must_use]
    pub const fn category(self) -> u16 {
        self as u16 >> 6
    }
}

impl Display for Appearance {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} ({:#06X})", *self as u16)
    }
}

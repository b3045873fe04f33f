//! Security Manager integration ([Vol 3] Part H).
//!
//! The pairing protocol runs in the host stack. This module configures it,
//! answers its passkey actions, and keeps track of bonded peers.

use std::fmt::{Debug, Formatter};

use rand_core::RngCore;
use tracing::info;

pub use {consts::*, pairing::*, secdb::*};

mod consts;
mod pairing;
mod secdb;

/// Six-digit passkey ([Vol 3] Part H, Section 2.3.5.3).
#[derive(Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Passkey(u32);

impl Passkey {
    /// Number of distinct passkeys.
    const N: u32 = 1_000_000;
    /// Largest multiple of `N` that fits in `u32`. Random values at or above
    /// this limit are rejected to keep the distribution uniform.
    const LIMIT: u32 = u32::MAX - u32::MAX % Self::N;

    /// All-zero passkey.
    pub const ZERO: Self = Self(0);

    /// Creates a passkey from a number. Returns `None` if the number has more
    /// than six digits.
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Option<Self> {
        if v < Self::N {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Generates a uniformly distributed random passkey.
    #[must_use]
    pub fn random(rng: &mut impl RngCore) -> Self {
        loop {
            let v = rng.next_u32();
            if v < Self::LIMIT {
                return Self(v % Self::N);
            }
        }
    }

    /// Returns the passkey value.
    #[inline(always)]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Debug for Passkey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Passkey({:06})", self.0)
    }
}

impl std::fmt::Display for Passkey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Six-digit numeric comparison value ([Vol 3] Part H, Section 2.3.5.6).
#[derive(Clone, Copy, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct NumCompare(pub u32);

impl Debug for NumCompare {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "NumCompare({:06})", self.0)
    }
}

impl std::fmt::Display for NumCompare {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Value that must be shown to the user during pairing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Prompt {
    /// Passkey that the peer must enter.
    Passkey(Passkey),
    /// Value that the user must compare with the one shown by the peer.
    NumCompare(NumCompare),
}

/// Device display capable of showing a 6-digit number to the user.
pub trait Display: Debug + Send {
    /// Shows the prompt to the user.
    fn show(&mut self, p: Prompt);
}

/// Input mechanism for the user to indicate either 'yes' or 'no'.
pub trait Confirm: Debug + Send {
    /// Gets yes/no (`true`/`false`) confirmation that the numbers match.
    fn confirm(&mut self, n: NumCompare) -> bool;
}

/// Display that writes prompts to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDisplay;

impl Display for LogDisplay {
    fn show(&mut self, p: Prompt) {
        match p {
            Prompt::Passkey(k) => info!("Enter passkey {k} on the peer device"),
            Prompt::NumCompare(n) => info!("Passkey on device's display: {n}"),
        }
    }
}

/// SMP interface to the local device.
#[derive(Debug)]
pub struct Device {
    display: Box<dyn Display>,
    confirm: Option<Box<dyn Confirm>>,
}

impl Device {
    /// Creates a device that shows prompts in the log and has no confirmation
    /// input.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            display: Box::new(LogDisplay),
            confirm: None,
        }
    }

    /// Provides a display device.
    #[inline]
    #[must_use]
    pub fn with_display(mut self, d: Box<dyn Display>) -> Self {
        self.display = d;
        self
    }

    /// Provides a yes/no input device.
    #[inline]
    #[must_use]
    pub fn with_confirm(mut self, c: Box<dyn Confirm>) -> Self {
        self.confirm = Some(c);
        self
    }
}

impl Default for Device {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Security manager configuration.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub io_cap: IoCap,
    pub bonding: bool,
    pub mitm: bool,
    pub sc: bool,
    /// Accept numeric comparison when no [`Confirm`] input is available.
    pub auto_accept_numcmp: bool,
}

impl SecurityConfig {
    /// Returns the parameters applied to the host stack.
    #[must_use]
    pub fn params(&self) -> SecurityParams {
        let mut auth = AuthReq::empty();
        auth.set(AuthReq::BONDING, self.bonding);
        auth.set(AuthReq::MITM, self.mitm);
        auth.set(AuthReq::SC, self.sc);
        let dist = if self.bonding {
            KeyDist::ENC | KeyDist::ID
        } else {
            KeyDist::empty()
        };
        SecurityParams {
            io_cap: self.io_cap,
            auth,
            our_key_dist: dist,
            their_key_dist: dist,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            io_cap: IoCap::default(),
            bonding: false,
            mitm: false,
            sc: false,
            auto_accept_numcmp: true,
        }
    }
}

/// Security manager parameters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SecurityParams {
    pub io_cap: IoCap,
    pub auth: AuthReq,
    pub our_key_dist: KeyDist,
    pub their_key_dist: KeyDist,
}

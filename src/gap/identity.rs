use std::fmt::{Display, Formatter};

use rand_core::RngCore;
use tracing::info;

use crate::host::Stack;
use crate::le::{Addr, OwnAddrType, RawAddr};

use super::{Error, Result};

/// Local address selection.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum AddrMode {
    /// Controller's public address.
    #[default]
    Public,
    /// Random static address generated at every stack sync.
    #[serde(alias = "random")]
    Static,
    /// Non-resolvable private address generated at every stack sync.
    NonResolvable,
}

/// Local identity used for advertising and connections.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Identity {
    addr: Addr,
    own: OwnAddrType,
}

impl Identity {
    /// Configures the local address for the specified mode and reads back the
    /// address that the stack will use.
    pub fn resolve(stack: &mut impl Stack, mode: AddrMode, rng: &mut impl RngCore) -> Result<Self> {
        let random = match mode {
            AddrMode::Public => None,
            AddrMode::Static => Some(RawAddr::random_static(rng)),
            AddrMode::NonResolvable => Some(RawAddr::non_resolvable(rng)),
        };
        if let Some(raw) = random {
            (stack.set_random_addr(raw)).map_err(Error::stack("set_random_addr"))?;
        }
        let own = (stack.infer_own_addr_type(false))
            .map_err(Error::stack("infer_own_addr_type"))?;
        let raw = stack.own_addr(own).map_err(Error::stack("own_addr"))?;
        let addr = if own.is_random() {
            Addr::Random(raw)
        } else {
            Addr::Public(raw)
        };
        info!("Device address: {addr}");
        Ok(Self { addr, own })
    }

    /// Returns the identity address.
    #[inline(always)]
    #[must_use]
    pub const fn addr(&self) -> Addr {
        self.addr
    }

    /// Returns the own address type passed to the stack.
    #[inline(always)]
    #[must_use]
    pub const fn own_addr_type(&self) -> OwnAddrType {
        self.own
    }
}

impl Display for Identity {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.addr, f)
    }
}

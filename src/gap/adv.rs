use std::time::Duration;

use tracing::{debug, error, info};

use crate::host::Stack;
use crate::le::{OwnAddrType, Phy, TxPower};
use crate::Appearance;

use super::{AdvFlag, Error, LeRole, ResponseDataMut, Result};

/// Advertising PDU format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum AdvMode {
    /// Legacy advertising with structured data fields.
    #[default]
    Legacy,
    /// Extended advertising with a fixed payload.
    Extended,
}

/// Legacy advertising connectable mode ([Vol 3] Part C, Section 9.3).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display)]
#[non_exhaustive]
pub enum ConnMode {
    NonConnectable,
    Directed,
    #[default]
    Undirected,
}

/// Legacy advertising discoverable mode ([Vol 3] Part C, Section 9.2).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display)]
#[non_exhaustive]
pub enum DiscMode {
    NonDiscoverable,
    Limited,
    #[default]
    General,
}

/// Legacy advertising parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AdvParams {
    pub conn_mode: ConnMode,
    pub disc_mode: DiscMode,
    pub itvl_min: Duration,
    pub itvl_max: Duration,
}

impl AdvParams {
    /// Returns the advertising interval range as a count of 0.625 ms ticks.
    #[inline]
    #[must_use]
    pub fn itvl_ticks(&self) -> Option<(u32, u32)> {
        Some((ticks_625us(self.itvl_min)?, ticks_625us(self.itvl_max)?))
    }
}

impl Default for AdvParams {
    #[inline]
    fn default() -> Self {
        Self {
            conn_mode: ConnMode::Undirected,
            disc_mode: DiscMode::General,
            itvl_min: Duration::from_millis(500),
            itvl_max: Duration::from_millis(510),
        }
    }
}

/// Extended advertising parameters ([Vol 4] Part E, Section 7.8.53).
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtAdvParams {
    pub connectable: bool,
    pub scannable: bool,
    pub own: OwnAddrType,
    pub primary_phy: Phy,
    pub secondary_phy: Phy,
    /// Advertising set ID.
    pub sid: u8,
    pub itvl_min: Duration,
    pub itvl_max: Duration,
}

impl ExtAdvParams {
    /// Fast advertising interval 1 minimum ([Vol 3] Part C, Appendix A).
    pub const FAST_ITVL1_MIN: Duration = Duration::from_millis(30);

    /// Returns connectable parameters for own address type `own`.
    #[must_use]
    pub const fn connectable(own: OwnAddrType) -> Self {
        Self {
            connectable: true,
            scannable: false,
            own,
            primary_phy: Phy::Le1M,
            secondary_phy: Phy::Le2M,
            sid: 1,
            itvl_min: Self::FAST_ITVL1_MIN,
            itvl_max: Self::FAST_ITVL1_MIN,
        }
    }
}

/// Extended advertising payload: general discoverable flags, two 16-bit
/// service lists, and the complete local name.
pub const EXT_ADV_DATA: &[u8] = &[
    0x02, 0x01, 0x06, // Flags
    0x03, 0x03, 0xAB, 0xCD, // Complete 16-bit UUIDs
    0x03, 0x03, 0x18, 0x11, // Complete 16-bit UUIDs
    0x11, 0x09, b'n', b'i', b'm', b'b', b'l', b'e', b'-', b'b', b'l', b'e', b'p', b'r', b'p',
    b'h', b'-', b'e', // Complete Local Name
];

/// Advertising controller. Builds the payload for the configured mode and
/// (re)starts advertising whenever it is not already running.
#[derive(Clone, Debug)]
pub struct Advertiser {
    mode: AdvMode,
    name: String,
    gap_service: bool,
    tx_power: Option<TxPower>,
    appearance: Appearance,
}

impl Advertiser {
    /// Maximum legacy advertising data length ([Vol 6] Part B, Section 2.3.1).
    pub const LEGACY_MAX_LEN: usize = 31;
    /// Advertising instance. Legacy advertising always uses instance 0.
    pub const INSTANCE: u8 = 0;

    /// Creates an advertiser for the specified mode and device name. The name
    /// is included in legacy advertising data.
    #[inline]
    #[must_use]
    pub fn new(mode: AdvMode, name: impl Into<String>) -> Self {
        Self {
            mode,
            name: name.into(),
            gap_service: true,
            tx_power: None,
            appearance: Appearance::GenericTag,
        }
    }

    /// Sets whether the GAP service is enabled. The device name is only
    /// advertised when it is.
    #[inline]
    #[must_use]
    pub fn gap_service(mut self, v: bool) -> Self {
        self.gap_service = v;
        self
    }

    /// Sets the advertised TX power level. `None` reads it from the host
    /// stack.
    #[inline]
    #[must_use]
    pub fn tx_power(mut self, v: Option<TxPower>) -> Self {
        self.tx_power = v;
        self
    }

    /// Returns the advertising mode.
    #[inline(always)]
    #[must_use]
    pub const fn mode(&self) -> AdvMode {
        self.mode
    }

    /// Returns the device name.
    #[inline(always)]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns legacy advertising data.
    pub fn legacy_data(&self, stack: &mut impl Stack) -> Result<ResponseDataMut> {
        let tx_power = match self.tx_power {
            Some(p) => p,
            None => stack.adv_tx_power().map_err(Error::stack("adv_tx_power"))?,
        };
        if self.gap_service && self.name.len() > Self::LEGACY_MAX_LEN {
            return Err(Error::DataTooLong {
                len: self.name.len(),
                max: Self::LEGACY_MAX_LEN,
            });
        }
        let mut ad = ResponseDataMut::new();
        ad.flags(AdvFlag::LE_GENERAL | AdvFlag::NO_BREDR);
        if self.gap_service {
            ad.local_name(true, &self.name);
        }
        (ad.tx_power(tx_power).appearance(self.appearance)).le_role(LeRole::PeripheralOnly);
        if ad.len() > Self::LEGACY_MAX_LEN {
            return Err(Error::DataTooLong {
                len: ad.len(),
                max: Self::LEGACY_MAX_LEN,
            });
        }
        Ok(ad)
    }

    /// Starts advertising with own address type `own`. Does nothing if
    /// advertising is already active.
    pub fn start(&self, stack: &mut impl Stack, own: OwnAddrType) -> Result<()> {
        if stack.adv_active(Self::INSTANCE) {
            debug!("Advertising is already active");
            return Ok(());
        }
        let r = match self.mode {
            AdvMode::Legacy => self.start_legacy(stack, own),
            AdvMode::Extended => Self::start_ext(stack, own),
        };
        match r {
            Ok(()) => info!("Advertising started ({})", self.mode),
            Err(e) => error!("Failed to start advertising: {e}"),
        }
        r
    }

    fn start_legacy(&self, stack: &mut impl Stack, own: OwnAddrType) -> Result<()> {
        let ad = self.legacy_data(stack)?.get();
        stack.adv_set_data(ad.as_ref()).map_err(Error::stack("adv_set_data"))?;
        (stack.adv_start(own, &AdvParams::default())).map_err(Error::stack("adv_start"))
    }

    fn start_ext(stack: &mut impl Stack, own: OwnAddrType) -> Result<()> {
        let p = ExtAdvParams::connectable(own);
        (stack.ext_adv_configure(Self::INSTANCE, &p)).map_err(Error::stack("ext_adv_configure"))?;
        (stack.ext_adv_set_data(Self::INSTANCE, EXT_ADV_DATA))
            .map_err(Error::stack("ext_adv_set_data"))?;
        (stack.ext_adv_start(Self::INSTANCE)).map_err(Error::stack("ext_adv_start"))
    }
}

/// Returns the number of 0.625 ms ticks in `d` (rounding down) or `None` if
/// the value overflows `u32`.
#[inline]
#[must_use]
pub fn ticks_625us(d: Duration) -> Option<u32> {
    if d.is_zero() {
        return Some(0);
    }
    u32::try_from((d.as_micros() / 625).max(1)).ok()
}

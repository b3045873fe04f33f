use crate::gap::{AddrMode, AdvMode, PeripheralParams};
use crate::smp::{SecState, SecurityConfig};

/// Node configuration. Every field has a default, so a partial (or empty)
/// JSON object is a valid configuration.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advertised device name.
    pub device_name: String,
    /// Whether the GAP service is enabled. The device name is only advertised
    /// when it is.
    pub gap_service: bool,
    pub addr: AddrMode,
    pub adv: AdvMode,
    /// Advertised TX power level in dBm. `None` reads it from the controller.
    pub tx_power: Option<i8>,
    /// Number of EATT bearers to aggregate. Zero disables aggregation.
    pub eatt_bearers: u8,
    pub security: SecurityConfig,
    /// Minimum link security for control service writes.
    pub control_security: SecState,
    /// Minimum link security for status service reads.
    pub status_security: SecState,
}

impl Config {
    /// Loads the configuration from a JSON file.
    #[cfg(feature = "fs")]
    pub fn load(path: impl AsRef<std::path::Path>) -> super::Result<Self> {
        let f = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(f))?)
    }

    /// Returns the peripheral parameters.
    #[must_use]
    pub const fn peripheral_params(&self) -> PeripheralParams {
        PeripheralParams {
            addr: self.addr,
            eatt_bearers: self.eatt_bearers,
            auto_accept_numcmp: self.security.auto_accept_numcmp,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: "ARM-N".to_owned(),
            gap_service: true,
            addr: AddrMode::default(),
            adv: AdvMode::default(),
            tx_power: None,
            eatt_bearers: 0,
            security: SecurityConfig::default(),
            control_security: SecState::Encrypted,
            status_security: SecState::Unencrypted,
        }
    }
}

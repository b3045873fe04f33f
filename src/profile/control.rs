use std::sync::Arc;

use tracing::{error, info, warn};

use nodelink_const::uuid16;

use crate::att::ErrorCode;
use crate::gatt::{Builder, Db, Dispatch, Io, IoResult, Prop, WriteReq};
use crate::net::{Connectivity, PASS_MAX_LEN, SSID_MAX_LEN};
use crate::smp::SecState;
use crate::{Uuid, Uuid16};

use super::{service_uuid, Output};

/// Control service characteristic.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
    strum::Display,
)]
#[non_exhaustive]
#[repr(u16)]
pub enum ControlChar {
    /// Single byte: zero turns the output off, any other value turns it on.
    OutputToggle = 0x2F01,
    /// Network credentials in the form `SSID:<name>;PASS:<secret>`.
    Credentials = 0x2F02,
    /// Single byte that is logged without side effects.
    GenericOutput = 0x2F03,
}

impl ControlChar {
    /// All characteristics in declaration order.
    pub const ALL: [Self; 3] = [Self::OutputToggle, Self::Credentials, Self::GenericOutput];

    /// Returns the characteristic UUID.
    #[inline]
    #[must_use]
    pub const fn uuid(self) -> Uuid16 {
        uuid16(self as u16)
    }

    /// Returns the user description text.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::OutputToggle => "LED Control",
            Self::Credentials => "Wi-Fi Provision",
            Self::GenericOutput => "Output Control",
        }
    }

    /// Returns the characteristic for a UUID.
    #[must_use]
    pub fn from_uuid(u: Uuid) -> Option<Self> {
        u.as_u16().and_then(|v| Self::try_from(v).ok())
    }
}

/// Control service with write-only characteristics.
#[derive(Debug)]
pub struct ControlService {
    out: Arc<dyn Output>,
    net: Arc<dyn Connectivity>,
}

impl ControlService {
    /// Service UUID.
    pub const UUID: Uuid = service_uuid(0x12);
    /// Maximum number of credential bytes that are parsed. The rest of a
    /// longer write is ignored.
    pub const CREDS_MAX_LEN: usize = 95;

    /// Creates a control service.
    #[inline]
    #[must_use]
    pub fn new(out: Arc<dyn Output>, net: Arc<dyn Connectivity>) -> Self {
        Self { out, net }
    }

    /// Defines the service structure. Writes require the link to be at least
    /// in the `sec` state.
    pub fn define(self: &Arc<Self>, db: &mut Builder<Db>, sec: SecState) {
        db.primary_service(Self::UUID, |s| {
            for c in ControlChar::ALL {
                s.characteristic(c.uuid(), Prop::WRITE, sec, Io::dispatch(self), |d| {
                    d.user_description(c.description());
                });
            }
        });
    }

    fn output_toggle(&self, v: &[u8]) -> IoResult {
        let &[state] = v else {
            return Err(ErrorCode::InvalidAttributeValueLength);
        };
        let on = state != 0;
        info!("LED control write: {}", if on { "ON" } else { "OFF" });
        self.out.set(on);
        Ok(())
    }

    fn credentials(&self, v: &[u8]) -> IoResult {
        let Some((ssid, pass)) = parse_credentials(v) else {
            warn!("Malformed credentials ({} bytes)", v.len());
            return Err(ErrorCode::ValueNotAllowed);
        };
        if let Err(e) = self.net.set_credentials(ssid, pass) {
            error!("Failed to set credentials: {e}");
            return Err(ErrorCode::UnlikelyError);
        }
        self.net.start();
        info!("Provisioned Wi-Fi: SSID='{ssid}'");
        Ok(())
    }

    fn generic_output(v: &[u8]) -> IoResult {
        let &[state] = v else {
            return Err(ErrorCode::InvalidAttributeValueLength);
        };
        info!("Output state: {state}");
        Ok(())
    }
}

impl Dispatch for ControlService {
    fn write(&self, req: &WriteReq) -> IoResult {
        let v = req.value();
        match ControlChar::from_uuid(req.uuid()) {
            Some(ControlChar::OutputToggle) => self.output_toggle(v),
            Some(ControlChar::Credentials) => self.credentials(v),
            Some(ControlChar::GenericOutput) => Self::generic_output(v),
            None => {
                warn!("Unknown control characteristic {}", req.uuid());
                Err(ErrorCode::UnlikelyError)
            }
        }
    }
}

/// Parses a credential write of the form `SSID:<name>;PASS:<secret>`. Only
/// the first [`ControlService::CREDS_MAX_LEN`] bytes are considered. Each
/// field ends at the next `;` or at the end of the input and is truncated to
/// its maximum length on a character boundary. Returns `None` if either
/// marker is missing or the input is not UTF-8.
#[must_use]
pub fn parse_credentials(raw: &[u8]) -> Option<(&str, &str)> {
    let raw = &raw[..raw.len().min(ControlService::CREDS_MAX_LEN)];
    let s = match std::str::from_utf8(raw) {
        Ok(s) => s,
        // Cap split a multi-byte character
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&raw[..e.valid_up_to()]).ok()?,
        Err(_) => return None,
    };
    let field = |marker: &str, max: usize| {
        let v = &s[s.find(marker)? + marker.len()..];
        let v = v.find(';').map_or(v, |i| &v[..i]);
        Some(truncate(v, max))
    };
    Some((field("SSID:", SSID_MAX_LEN)?, field("PASS:", PASS_MAX_LEN)?))
}

/// Truncates `s` to at most `max` bytes without splitting a character.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut n = max;
    while !s.is_char_boundary(n) {
        n -= 1;
    }
    &s[..n]
}

use std::fmt::Debug;
use std::sync::Arc;

use nodelink_const::uuid16;

use crate::att::ErrorCode;
use crate::gatt::{Builder, Db, Dispatch, Io, IoResult, Prop, ReadReq};
use crate::smp::SecState;
use crate::{Uuid, Uuid16};

use super::service_uuid;

/// Status service characteristic.
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
pub enum StatusChar {
    /// Output level as a single byte boolean.
    Output = 0x2E01,
    /// Network connection state as a single byte boolean.
    Connectivity = 0x2E02,
    /// Temperature in degrees Celsius as a little-endian `f32`.
    Sensor = 0x2E03,
}

impl StatusChar {
    /// All characteristics in declaration order.
    pub const ALL: [Self; 3] = [Self::Output, Self::Connectivity, Self::Sensor];

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
            Self::Output => "LED Status",
            Self::Connectivity => "Wi-Fi Status",
            Self::Sensor => "Sensor Data",
        }
    }

    /// Returns the characteristic for a UUID.
    #[must_use]
    pub fn from_uuid(u: Uuid) -> Option<Self> {
        u.as_u16().and_then(|v| Self::try_from(v).ok())
    }
}

/// Source of the values reported by the status service.
pub trait StatusSource: Debug + Send + Sync {
    /// Returns the output level.
    fn output(&self) -> bool;

    /// Returns whether the network is connected.
    fn connected(&self) -> bool;

    /// Returns the sensor temperature in degrees Celsius.
    fn temperature(&self) -> f32;
}

/// Fixed status values used until real sources are wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct Placeholder;

impl StatusSource for Placeholder {
    fn output(&self) -> bool {
        true
    }

    fn connected(&self) -> bool {
        true
    }

    fn temperature(&self) -> f32 {
        25.4
    }
}

/// Status service with read-only, indicatable characteristics.
#[derive(Debug)]
pub struct StatusService {
    src: Arc<dyn StatusSource>,
}

impl StatusService {
    /// Service UUID.
    pub const UUID: Uuid = service_uuid(0x22);

    /// Creates a status service.
    #[inline]
    #[must_use]
    pub fn new(src: Arc<dyn StatusSource>) -> Self {
        Self { src }
    }

    /// Defines the service structure. Reads require the link to be at least
    /// in the `sec` state.
    pub fn define(self: &Arc<Self>, db: &mut Builder<Db>, sec: SecState) {
        db.primary_service(Self::UUID, |s| {
            for c in StatusChar::ALL {
                let props = Prop::READ | Prop::INDICATE;
                s.characteristic(c.uuid(), props, sec, Io::dispatch(self), |d| {
                    d.user_description(c.description());
                });
            }
        });
    }
}

impl Dispatch for StatusService {
    fn read(&self, req: &mut ReadReq) -> IoResult {
        match StatusChar::from_uuid(req.uuid()) {
            Some(StatusChar::Output) => req.complete([u8::from(self.src.output())]),
            Some(StatusChar::Connectivity) => req.complete([u8::from(self.src.connected())]),
            Some(StatusChar::Sensor) => req.complete(self.src.temperature().to_le_bytes()),
            None => Err(ErrorCode::UnlikelyError),
        }
    }
}

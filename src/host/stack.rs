use std::fmt::{Debug, Display, Formatter};

use crate::att::Handle;
use crate::gap::{AdvParams, ExtAdvParams};
use crate::gatt::{Db, ServiceHandles};
use crate::le::{Addr, OwnAddrType, RawAddr, TxPower};
use crate::smp::{Keys, PasskeyIo, SecurityParams};

/// Host stack status code. Zero indicates success, any other value is a
/// stack-specific error.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, thiserror::Error)]
#[error("host status {0}")]
#[repr(transparent)]
pub struct Status(pub i32);

impl Status {
    /// Successful completion.
    pub const OK: Self = Self(0);

    /// Returns whether the status indicates success.
    #[inline(always)]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }
}

/// Host stack result type.
pub type Result<T> = std::result::Result<T, Status>;

/// Connection handle assigned by the host stack.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ConnHandle(pub u16);

impl Debug for ConnHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnHandle({:#05X})", self.0)
    }
}

impl Display for ConnHandle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// L2CAP channel identifier ([Vol 3] Part A, Section 2.1).
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Cid(pub u16);

impl Debug for Cid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cid({:#06X})", self.0)
    }
}

impl Display for Cid {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// Reason code for terminating a connection
/// ([Vol 1] Part F, Section 1.3).
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
#[repr(u8)]
pub enum DisconnectReason {
    AuthenticationFailure = 0x05,
    RemoteUserTerminated = 0x13,
    RemoteDeviceTerminatedLowResources = 0x14,
    RemoteDeviceTerminatedPowerOff = 0x15,
    UnacceptableConnectionParameters = 0x3B,
}

/// Link security properties reported by the host stack.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LinkSec {
    pub encrypted: bool,
    pub authenticated: bool,
    pub bonded: bool,
    pub key_size: u8,
}

/// Connection descriptor looked up from the host stack.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConnDesc {
    pub conn: ConnHandle,
    pub our_ota_addr: Addr,
    pub our_id_addr: Addr,
    pub peer_ota_addr: Addr,
    pub peer_id_addr: Addr,
    /// Connection interval in units of 1.25 ms.
    pub itvl: u16,
    pub latency: u16,
    /// Supervision timeout in units of 10 ms.
    pub supervision_timeout: u16,
    pub sec: LinkSec,
}

impl Display for ConnDesc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "handle={} our_ota_addr={} our_id_addr={} peer_ota_addr={} peer_id_addr={} \
             conn_itvl={} conn_latency={} supervision_timeout={} encrypted={} \
             authenticated={} bonded={}",
            self.conn,
            self.our_ota_addr,
            self.our_id_addr,
            self.peer_ota_addr,
            self.peer_id_addr,
            self.itvl,
            self.latency,
            self.supervision_timeout,
            self.sec.encrypted,
            self.sec.authenticated,
            self.sec.bonded,
        )
    }
}

/// Operations provided by the host stack. All methods are called from the
/// node task only.
pub trait Stack: Debug + Send {
    /// Applies the security manager configuration. Must be called before the
    /// stack is synchronized.
    fn configure_security(&mut self, p: &SecurityParams) -> Result<()>;

    /// Sets the local random address.
    fn set_random_addr(&mut self, addr: RawAddr) -> Result<()>;

    /// Determines the best own address type to use.
    fn infer_own_addr_type(&mut self, privacy: bool) -> Result<OwnAddrType>;

    /// Returns the identity address for the specified own address type.
    fn own_addr(&self, typ: OwnAddrType) -> Result<RawAddr>;

    /// Returns whether the specified advertising instance is active. Legacy
    /// advertising uses instance 0.
    fn adv_active(&self, instance: u8) -> bool;

    /// Returns the controller's advertising TX power level.
    fn adv_tx_power(&mut self) -> Result<TxPower>;

    /// Sets legacy advertising data.
    fn adv_set_data(&mut self, data: &[u8]) -> Result<()>;

    /// Starts legacy advertising.
    fn adv_start(&mut self, own: OwnAddrType, p: &AdvParams) -> Result<()>;

    /// Configures an extended advertising instance.
    fn ext_adv_configure(&mut self, instance: u8, p: &ExtAdvParams) -> Result<()>;

    /// Sets extended advertising data.
    fn ext_adv_set_data(&mut self, instance: u8, data: &[u8]) -> Result<()>;

    /// Starts extended advertising without a duration or event limit.
    fn ext_adv_start(&mut self, instance: u8) -> Result<()>;

    /// Initiates the security procedure on a connection.
    fn security_initiate(&mut self, conn: ConnHandle) -> Result<()>;

    /// Looks up a connection descriptor.
    fn conn_find(&self, conn: ConnHandle) -> Result<ConnDesc>;

    /// Terminates a connection.
    fn terminate(&mut self, conn: ConnHandle, reason: DisconnectReason) -> Result<()>;

    /// Supplies the response to a passkey action.
    fn inject_io(&mut self, conn: ConnHandle, io: PasskeyIo) -> Result<()>;

    /// Reads the bond record that the stack keeps for a peer identity
    /// address.
    fn bond_keys(&self, peer: Addr) -> Result<Keys>;

    /// Deletes all records that the stack keeps for a peer identity address.
    fn delete_peer(&mut self, peer: Addr) -> Result<()>;

    /// Sets the default ATT bearer for a connection.
    fn set_default_bearer(&mut self, conn: ConnHandle, cid: Cid) -> Result<()>;

    /// Registers the attribute table and returns the assigned handles. The
    /// registration is all-or-nothing.
    fn register(&mut self, db: &Db) -> Result<Vec<ServiceHandles>>;

    /// Sends an indication of the current characteristic value.
    fn indicate(&mut self, conn: ConnHandle, hdl: Handle) -> Result<()>;
}

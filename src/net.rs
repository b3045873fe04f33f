//! Interface to the long-range connectivity (Wi-Fi) manager.
//!
//! The connectivity manager owns its reconnect logic and credential
//! persistence. This crate only hands it provisioned credentials and start
//! requests through the [`Connectivity`] trait. [`NetQueue`] implements the
//! trait on top of a bounded command channel.

use std::fmt::Debug;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Maximum SSID length in bytes.
pub const SSID_MAX_LEN: usize = 32;
/// Maximum passphrase length in bytes.
pub const PASS_MAX_LEN: usize = 64;

/// Error type returned by connectivity operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("empty SSID")]
    EmptySsid,
    #[error("SSID exceeds {SSID_MAX_LEN} bytes")]
    SsidTooLong,
    #[error("passphrase exceeds {PASS_MAX_LEN} bytes")]
    PassTooLong,
    #[error("connectivity command queue is full")]
    QueueFull,
    #[error("connectivity command queue is closed")]
    QueueClosed,
}

/// Common connectivity result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Connectivity manager operations used by the node.
pub trait Connectivity: Debug + Send + Sync {
    /// Hands over new network credentials.
    fn set_credentials(&self, ssid: &str, pass: &str) -> Result<()>;

    /// Requests the manager to start connecting. Failures are logged by the
    /// implementation.
    fn start(&self);
}

/// Validated network credentials.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    ssid: String,
    pass: String,
}

impl Credentials {
    /// Validates network credentials.
    pub fn new(ssid: &str, pass: &str) -> Result<Self> {
        if ssid.is_empty() {
            return Err(Error::EmptySsid);
        }
        if ssid.len() > SSID_MAX_LEN {
            return Err(Error::SsidTooLong);
        }
        if pass.len() > PASS_MAX_LEN {
            return Err(Error::PassTooLong);
        }
        Ok(Self {
            ssid: ssid.to_owned(),
            pass: pass.to_owned(),
        })
    }

    /// Returns the network name.
    #[inline(always)]
    #[must_use]
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Returns the passphrase.
    #[inline(always)]
    #[must_use]
    pub fn pass(&self) -> &str {
        &self.pass
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (f.debug_struct("Credentials"))
            .field("ssid", &self.ssid)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Connectivity manager command.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum NetCmd {
    /// Start the network interface and connect with stored credentials.
    Start,
    /// Persist new credentials and reconnect with them.
    ApplyNewCreds(Credentials),
    /// Reconnect to the current network without changing credentials.
    Connect,
    /// Leave the current network and stop reconnect attempts.
    Disconnect,
}

/// Sending half of the connectivity manager command queue. Commands are
/// delivered in order and never block the caller.
#[derive(Clone, Debug)]
pub struct NetQueue(mpsc::Sender<NetCmd>);

impl NetQueue {
    /// Default queue capacity.
    pub const CAPACITY: usize = 8;

    /// Creates a new queue and returns its receiving half, which is owned by
    /// the connectivity manager.
    #[must_use]
    pub fn new(cap: usize) -> (Self, mpsc::Receiver<NetCmd>) {
        let (tx, rx) = mpsc::channel(cap);
        (Self(tx), rx)
    }

    /// Queues a command.
    pub fn send(&self, cmd: NetCmd) -> Result<()> {
        debug!("Connectivity command: {cmd:?}");
        self.0.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }
}

impl Connectivity for NetQueue {
    fn set_credentials(&self, ssid: &str, pass: &str) -> Result<()> {
        let c = Credentials::new(ssid, pass)?;
        self.send(NetCmd::ApplyNewCreds(c))
    }

    fn start(&self) {
        if let Err(e) = self.send(NetCmd::Start) {
            warn!("Failed to start connectivity: {e}");
        }
    }
}

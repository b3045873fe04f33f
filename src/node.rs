//! Node runtime.
//!
//! [`Node`] owns the peripheral state machine and the GATT server. Once
//! spawned, it runs on a single task that receives host stack messages and
//! application commands over ordered channels. Replies that the stack waits
//! for are returned over `oneshot` channels.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub use config::*;

use crate::att::{ErrorCode, Handle};
use crate::gap::{self, Advertiser, Peripheral};
use crate::gatt::{self, Db, IoResult, Server};
use crate::host::{self, ConnHandle, Event, Reply, Stack};
use crate::le::TxPower;
use crate::net::Connectivity;
use crate::profile::{ControlService, Output, StatusService, StatusSource};
use crate::smp::{BondStore, Device, SecState};
use crate::Uuid;

mod config;

/// Error type returned by the node runtime.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("security configuration failed: {0}")]
    Security(host::Status),
    #[error(transparent)]
    Gatt(#[from] gatt::Error),
    #[error(transparent)]
    Gap(#[from] gap::Error),
    #[cfg(feature = "fs")]
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "fs")]
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node task is not running")]
    Closed,
}

/// Common node result type.
pub type Result<T> = std::result::Result<T, Error>;

/// External collaborators driven by the node services.
#[derive(Clone, Debug)]
pub struct Handlers {
    pub output: Arc<dyn Output>,
    pub net: Arc<dyn Connectivity>,
    pub status: Arc<dyn StatusSource>,
}

/// Host stack message.
#[derive(Debug)]
enum StackMsg {
    Event(Event, oneshot::Sender<Reply>),
    Read {
        conn: ConnHandle,
        hdl: Handle,
        tx: oneshot::Sender<std::result::Result<Vec<u8>, ErrorCode>>,
    },
    Write {
        conn: ConnHandle,
        hdl: Handle,
        val: Vec<u8>,
        tx: oneshot::Sender<IoResult>,
    },
}

/// Application command.
#[derive(Debug)]
#[non_exhaustive]
pub enum Command {
    /// Indicate the current value of the characteristic with the specified
    /// UUID to the connected peer.
    Indicate(Uuid),
}

/// Peripheral node combining the state machine with its attribute server.
#[derive(Debug)]
pub struct Node<S> {
    per: Peripheral<S>,
    srv: Server,
}

impl<S: Stack> Node<S> {
    /// Configures the host stack and registers the node services. Any failure
    /// aborts startup.
    pub fn new(
        mut stack: S,
        cfg: &Config,
        h: Handlers,
        dev: Device,
        bonds: Arc<BondStore>,
    ) -> Result<Self> {
        (stack.configure_security(&cfg.security.params())).map_err(Error::Security)?;
        let ctl = Arc::new(ControlService::new(h.output, h.net));
        let st = Arc::new(StatusService::new(h.status));
        let mut db = Db::build();
        ctl.define(&mut db, cfg.control_security);
        st.define(&mut db, cfg.status_security);
        let srv = Server::register(db.freeze()?, &mut stack)?;
        let adv = Advertiser::new(cfg.adv, &cfg.device_name)
            .gap_service(cfg.gap_service)
            .tx_power(cfg.tx_power.map(TxPower::new));
        let per = Peripheral::new(stack, adv, dev, bonds, cfg.peripheral_params());
        Ok(Self { per, srv })
    }

    /// Returns the peripheral state machine.
    #[inline(always)]
    #[must_use]
    pub const fn peripheral(&self) -> &Peripheral<S> {
        &self.per
    }

    /// Returns the peripheral state machine.
    #[inline(always)]
    pub fn peripheral_mut(&mut self) -> &mut Peripheral<S> {
        &mut self.per
    }

    /// Returns the attribute server.
    #[inline(always)]
    #[must_use]
    pub const fn server(&self) -> &Server {
        &self.srv
    }

    /// Handles a host stack event. Errors are logged and the node keeps
    /// running.
    pub fn handle(&mut self, evt: Event) -> Reply {
        self.per.handle(evt).unwrap_or_else(|e| {
            error!("Failed to handle {evt:?}: {e}");
            Reply::default()
        })
    }

    /// Executes an attribute read by connection `conn`.
    pub fn read(&self, conn: ConnHandle, hdl: Handle) -> std::result::Result<Vec<u8>, ErrorCode> {
        self.srv.read(self.security(conn), hdl)
    }

    /// Executes an attribute write by connection `conn`.
    pub fn write(&self, conn: ConnHandle, hdl: Handle, val: &[u8]) -> IoResult {
        self.srv.write(self.security(conn), hdl, val)
    }

    /// Indicates the characteristic with the specified UUID.
    pub fn indicate(&mut self, uuid: Uuid) -> gap::Result<()> {
        let hdl = (self.srv.value_handle(uuid)).ok_or(gap::Error::UnknownCharacteristic(uuid))?;
        self.per.indicate(hdl)
    }

    /// Returns the security state of connection `conn`.
    fn security(&self, conn: ConnHandle) -> SecState {
        match self.per.session() {
            Some(s) if s.conn() == conn => s.security(),
            _ => SecState::Unencrypted,
        }
    }
}

impl<S: Stack + 'static> Node<S> {
    /// Channel capacity.
    const QUEUE: usize = 16;

    /// Moves the node to a new task and returns its handle.
    #[must_use]
    pub fn spawn(self) -> NodeHandle {
        let (stack_tx, stack_rx) = mpsc::channel(Self::QUEUE);
        let (cmd_tx, cmd_rx) = mpsc::channel(Self::QUEUE);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(stack_rx, cmd_rx, cancel.clone()));
        NodeHandle {
            stack: stack_tx,
            cmd: cmd_tx,
            cancel,
            task,
        }
    }

    async fn run(
        mut self,
        mut stack: mpsc::Receiver<StackMsg>,
        mut cmd: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(m) = stack.recv() => self.on_stack(m),
                Some(c) = cmd.recv() => self.on_command(c),
                else => break,
            }
        }
        debug!("Node task stopped");
    }

    fn on_stack(&mut self, m: StackMsg) {
        match m {
            StackMsg::Event(evt, tx) => {
                let _ = tx.send(self.handle(evt));
            }
            StackMsg::Read { conn, hdl, tx } => {
                let _ = tx.send(self.read(conn, hdl));
            }
            StackMsg::Write { conn, hdl, val, tx } => {
                let _ = tx.send(self.write(conn, hdl, &val));
            }
        }
    }

    fn on_command(&mut self, c: Command) {
        match c {
            Command::Indicate(uuid) => {
                if let Err(e) = self.indicate(uuid) {
                    warn!("Indication of {uuid} failed: {e}");
                }
            }
        }
    }
}

/// Handle of a running node task.
#[derive(Debug)]
pub struct NodeHandle {
    stack: mpsc::Sender<StackMsg>,
    cmd: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl NodeHandle {
    /// Delivers a host stack event and waits for the reply.
    pub async fn event(&self, evt: Event) -> Result<Reply> {
        let (tx, rx) = oneshot::channel();
        self.send(StackMsg::Event(evt, tx)).await?;
        rx.await.map_err(|_| Error::Closed)
    }

    /// Executes an attribute read. A stopped node fails the read with
    /// [`ErrorCode::UnlikelyError`].
    pub async fn read(&self, conn: ConnHandle, hdl: Handle) -> std::result::Result<Vec<u8>, ErrorCode> {
        let (tx, rx) = oneshot::channel();
        let m = StackMsg::Read { conn, hdl, tx };
        if self.send(m).await.is_err() {
            return Err(ErrorCode::UnlikelyError);
        }
        rx.await.unwrap_or(Err(ErrorCode::UnlikelyError))
    }

    /// Executes an attribute write. A stopped node fails the write with
    /// [`ErrorCode::UnlikelyError`].
    pub async fn write(&self, conn: ConnHandle, hdl: Handle, val: Vec<u8>) -> IoResult {
        let (tx, rx) = oneshot::channel();
        let m = StackMsg::Write { conn, hdl, val, tx };
        if self.send(m).await.is_err() {
            return Err(ErrorCode::UnlikelyError);
        }
        rx.await.unwrap_or(Err(ErrorCode::UnlikelyError))
    }

    /// Queues an application command.
    pub async fn command(&self, c: Command) -> Result<()> {
        self.cmd.send(c).await.map_err(|_| Error::Closed)
    }

    /// Stops the node task and waits for it to finish.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Node task failed: {e}");
        }
    }

    async fn send(&self, m: StackMsg) -> Result<()> {
        self.stack.send(m).await.map_err(|_| Error::Closed)
    }
}

#[cfg(test)]
mod tests;

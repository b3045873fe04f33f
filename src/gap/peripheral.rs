use std::collections::BTreeMap;
use std::sync::Arc;

use rand_core::OsRng;
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::att::Handle;
use crate::host::{
    Authorize, Cid, ConnHandle, DisconnectReason, Event, RepeatPairing, Reply, Stack, Status,
    Subscribe,
};
use crate::le::Addr;
use crate::smp::{BondStore, Device, Exchange, PasskeyAction, SecState};

use super::{AddrMode, Advertiser, Error, Identity, Result};

/// Peripheral behavior that is not part of the advertising payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PeripheralParams {
    pub addr: AddrMode,
    /// Number of EATT bearers to collect before selecting the default bearer.
    /// Zero disables bearer aggregation.
    pub eatt_bearers: u8,
    /// Accept numeric comparison when no confirmation input is available.
    pub auto_accept_numcmp: bool,
}

impl Default for PeripheralParams {
    #[inline]
    fn default() -> Self {
        Self {
            addr: AddrMode::Public,
            eatt_bearers: 0,
            auto_accept_numcmp: true,
        }
    }
}

/// Observable peripheral phase.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, strum::Display)]
pub enum Phase {
    Idle,
    Advertising,
    Connected,
    Authenticating,
    Secured,
    Bonded,
}

/// Client subscription state of a characteristic.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Subscription {
    pub notify: bool,
    pub indicate: bool,
}

/// EATT bearer aggregation state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Bearers {
    /// Aggregation is not enabled.
    Disabled,
    /// Collecting bearers until `want` are established.
    Collecting { want: u8, cids: SmallVec<[Cid; 4]> },
    /// The default bearer was selected.
    Ready(Cid),
    /// A bearer failed before all were established.
    Aborted,
}

impl Bearers {
    /// Returns the initial state for collecting `want` bearers.
    #[must_use]
    fn new(want: u8) -> Self {
        if want == 0 {
            Self::Disabled
        } else {
            Self::Collecting {
                want,
                cids: SmallVec::new(),
            }
        }
    }

    /// Records a bearer event. Returns the default bearer once the last
    /// expected bearer is established.
    fn add(&mut self, cid: Cid, ok: bool) -> Option<Cid> {
        let Self::Collecting { want, ref mut cids } = *self else {
            return None;
        };
        if !ok {
            *self = Self::Aborted;
            return None;
        }
        cids.push(cid);
        if cids.len() < usize::from(want) {
            return None;
        }
        let first = cids[0];
        *self = Self::Ready(first);
        Some(first)
    }
}

/// State of the active connection.
#[derive(Clone, Debug)]
pub struct Session {
    conn: ConnHandle,
    mtu: u16,
    sec: SecState,
    subs: BTreeMap<Handle, Subscription>,
    bearers: Bearers,
}

impl Session {
    /// Default ATT MTU ([Vol 3] Part F, Section 3.2.8).
    pub const DEFAULT_MTU: u16 = 23;

    #[must_use]
    fn new(conn: ConnHandle, eatt_bearers: u8) -> Self {
        Self {
            conn,
            mtu: Self::DEFAULT_MTU,
            sec: SecState::Unencrypted,
            subs: BTreeMap::new(),
            bearers: Bearers::new(eatt_bearers),
        }
    }

    /// Returns the connection handle.
    #[inline(always)]
    #[must_use]
    pub const fn conn(&self) -> ConnHandle {
        self.conn
    }

    /// Returns the negotiated ATT MTU.
    #[inline(always)]
    #[must_use]
    pub const fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Returns the link security state.
    #[inline(always)]
    #[must_use]
    pub const fn security(&self) -> SecState {
        self.sec
    }

    /// Returns the subscription state of the characteristic with value
    /// handle `hdl`.
    #[inline]
    #[must_use]
    pub fn subscription(&self, hdl: Handle) -> Subscription {
        self.subs.get(&hdl).copied().unwrap_or_default()
    }

    /// Returns the EATT bearer aggregation state.
    #[inline(always)]
    #[must_use]
    pub const fn bearers(&self) -> &Bearers {
        &self.bearers
    }

    /// Raises the security state. The state never decreases within a
    /// session.
    #[inline]
    fn raise(&mut self, s: SecState) {
        self.sec = self.sec.max(s);
    }
}

/// Peripheral state machine. Handles host stack events one at a time and
/// keeps the device advertising whenever there is no connection.
#[derive(Debug)]
pub struct Peripheral<S> {
    stack: S,
    adv: Advertiser,
    dev: Device,
    bonds: Arc<BondStore>,
    params: PeripheralParams,
    ident: Option<Identity>,
    advertising: bool,
    sess: Option<Session>,
}

impl<S: Stack> Peripheral<S> {
    /// Creates a new peripheral. Nothing happens until the stack reports
    /// [`Event::Sync`].
    #[must_use]
    pub fn new(
        stack: S,
        adv: Advertiser,
        dev: Device,
        bonds: Arc<BondStore>,
        params: PeripheralParams,
    ) -> Self {
        Self {
            stack,
            adv,
            dev,
            bonds,
            params,
            ident: None,
            advertising: false,
            sess: None,
        }
    }

    /// Returns the host stack.
    #[inline(always)]
    #[must_use]
    pub const fn stack(&self) -> &S {
        &self.stack
    }

    /// Returns the host stack.
    #[inline(always)]
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Returns the local identity once the stack is synchronized.
    #[inline(always)]
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.ident.as_ref()
    }

    /// Returns the active connection.
    #[inline(always)]
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.sess.as_ref()
    }

    /// Returns the security state of the active connection.
    #[inline]
    #[must_use]
    pub fn security(&self) -> SecState {
        self.sess.as_ref().map_or(SecState::Unencrypted, Session::security)
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.sess.as_ref().map(Session::security) {
            Some(SecState::Unencrypted) => Phase::Connected,
            Some(SecState::Encrypting) => Phase::Authenticating,
            Some(SecState::Encrypted | SecState::Authenticated) => Phase::Secured,
            Some(SecState::Bonded) => Phase::Bonded,
            None if self.advertising => Phase::Advertising,
            None => Phase::Idle,
        }
    }

    /// Handles a host stack event and returns the reply expected by the
    /// stack.
    pub fn handle(&mut self, evt: Event) -> Result<Reply> {
        match evt {
            Event::Sync => self.sync()?,
            Event::Reset { reason } => {
                warn!("Resetting state; reason={reason}");
                self.ident = None;
                self.advertising = false;
                self.sess = None;
            }
            Event::Connect { conn, status } => self.connect(conn, status)?,
            Event::Disconnect { reason, desc } => {
                info!("Disconnect; reason={reason} {desc}");
                if matches!(self.sess, Some(ref s) if s.conn != desc.conn) {
                    info!("Rejected connection {} closed", desc.conn);
                } else {
                    self.sess = None;
                    self.advertise()?;
                }
            }
            Event::ConnUpdate { conn, status } => {
                info!("Connection updated; status={}", status.0);
                self.log_desc(conn);
            }
            Event::AdvComplete { reason } => {
                info!("Advertise complete; reason={reason}");
                self.advertising = false;
                if self.sess.is_none() {
                    self.advertise()?;
                }
            }
            Event::EncChange { conn, status } => {
                info!("Encryption change; status={}", status.0);
                let desc = self.stack.conn_find(conn).map_err(Error::stack("conn_find"))?;
                info!("{desc}");
                let bonded = status.is_ok()
                    && self.session_mut(conn).is_some_and(|s| {
                        let was = s.sec;
                        s.raise(desc.sec.into());
                        was < SecState::Bonded && s.sec == SecState::Bonded
                    });
                if bonded {
                    self.save_bond(desc.peer_id_addr);
                }
            }
            Event::NotifyTx {
                conn,
                attr,
                status,
                indication,
            } => info!(
                "Notify TX; conn={conn} attr={attr} status={} is_indication={indication}",
                status.0
            ),
            Event::Subscribe(s) => self.subscribe(&s),
            Event::Mtu { conn, cid, mtu } => {
                info!("MTU update; conn={conn} cid={cid} mtu={mtu}");
                if let Some(s) = self.session_mut(conn) {
                    s.mtu = mtu;
                }
            }
            Event::RepeatPairing { conn } => return Ok(self.repeat_pairing(conn)),
            Event::Passkey { conn, action } => self.passkey(conn, action)?,
            Event::Authorize {
                conn,
                attr,
                is_read,
            } => {
                warn!("Rejecting authorization; conn={conn} attr={attr} is_read={is_read}");
                return Ok(Reply::Authorize(Authorize::Reject));
            }
            Event::Eatt { conn, cid, status } => self.eatt(conn, cid, status)?,
        }
        Ok(Reply::Done)
    }

    /// Sends an indication of the characteristic value at `hdl` if the peer
    /// subscribed to indications.
    pub fn indicate(&mut self, hdl: Handle) -> Result<()> {
        let s = self.sess.as_ref().ok_or(Error::NotConnected)?;
        if !s.subscription(hdl).indicate {
            return Err(Error::NotSubscribed(hdl));
        }
        let conn = s.conn;
        self.stack.indicate(conn, hdl).map_err(Error::stack("indicate"))
    }

    /// Resolves the local identity and starts advertising.
    fn sync(&mut self) -> Result<()> {
        let id = Identity::resolve(&mut self.stack, self.params.addr, &mut OsRng)?;
        self.ident = Some(id);
        self.advertise()
    }

    /// Starts advertising unless it is already active.
    fn advertise(&mut self) -> Result<()> {
        let Some(id) = self.ident else {
            return Err(Error::NotSynced);
        };
        let r = self.adv.start(&mut self.stack, id.own_addr_type());
        self.advertising = r.is_ok();
        r
    }

    fn connect(&mut self, conn: ConnHandle, status: Status) -> Result<()> {
        if !status.is_ok() {
            warn!("Connection failed; status={}", status.0);
            return if self.sess.is_none() {
                self.advertise()
            } else {
                Ok(())
            };
        }
        self.advertising = false;
        if let Some(ref s) = self.sess {
            warn!("Rejecting connection {conn}; connection {} is active", s.conn);
            return (self.stack.terminate(conn, DisconnectReason::RemoteUserTerminated))
                .map_err(Error::stack("terminate"));
        }
        let mut s = Session::new(conn, self.params.eatt_bearers);
        match self.stack.security_initiate(conn) {
            Ok(()) => s.raise(SecState::Encrypting),
            Err(e) => error!("Failed to initiate security on {conn}: {e}"),
        }
        self.sess = Some(s);
        info!("Connection established");
        self.log_desc(conn);
        Ok(())
    }

    fn subscribe(&mut self, s: &Subscribe) {
        info!(
            "Subscribe event; conn={} attr={} reason={} prevn={} curn={} previ={} curi={}",
            s.conn,
            s.attr,
            s.reason,
            s.prev_notify,
            s.cur_notify,
            s.prev_indicate,
            s.cur_indicate
        );
        if let Some(sess) = self.session_mut(s.conn) {
            let sub = Subscription {
                notify: s.cur_notify,
                indicate: s.cur_indicate,
            };
            if sub == Subscription::default() {
                sess.subs.remove(&s.attr);
            } else {
                sess.subs.insert(s.attr, sub);
            }
        }
    }

    /// Deletes the old bond of a peer that is pairing again.
    fn repeat_pairing(&mut self, conn: ConnHandle) -> Reply {
        match self.stack.conn_find(conn) {
            Ok(desc) => {
                let peer = desc.peer_id_addr;
                info!("Repeat pairing; deleting bond of {peer}");
                if let Err(e) = self.stack.delete_peer(peer) {
                    error!("Failed to delete bond of {peer}: {e}");
                    return Reply::RepeatPairing(RepeatPairing::Ignore);
                }
                self.bonds.remove(peer);
                Reply::RepeatPairing(RepeatPairing::Retry)
            }
            Err(e) => {
                error!("Repeat pairing on unknown connection {conn}: {e}");
                Reply::RepeatPairing(RepeatPairing::Ignore)
            }
        }
    }

    /// Copies the bond record of a newly bonded peer into the bond store.
    fn save_bond(&self, peer: Addr) {
        let keys = match self.stack.bond_keys(peer) {
            Ok(k) => k,
            Err(e) => {
                warn!("Failed to read bond of {peer}: {e}");
                return;
            }
        };
        if self.bonds.save(peer, &keys) {
            info!("Saved bond of {peer}");
        } else {
            warn!("Failed to save bond of {peer}");
        }
    }

    fn passkey(&mut self, conn: ConnHandle, action: PasskeyAction) -> Result<()> {
        info!("Passkey action event; action={action:?}");
        let ex = Exchange::new(action, &mut OsRng);
        match ex.respond(&mut self.dev, self.params.auto_accept_numcmp) {
            Some(io) => (self.stack.inject_io(conn, io)).map_err(Error::stack("inject_io")),
            None => Ok(()),
        }
    }

    fn eatt(&mut self, conn: ConnHandle, cid: Cid, status: Status) -> Result<()> {
        info!("EATT bearer event; conn={conn} cid={cid} status={}", status.0);
        let Some(s) = self.session_mut(conn) else {
            debug!("Ignoring EATT bearer of an inactive connection");
            return Ok(());
        };
        let Some(first) = s.bearers.add(cid, status.is_ok()) else {
            if s.bearers == Bearers::Aborted {
                warn!("EATT bearer setup aborted for {conn}");
            }
            return Ok(());
        };
        info!("Setting default bearer {first} for {conn}");
        (self.stack.set_default_bearer(conn, first)).map_err(Error::stack("set_default_bearer"))
    }

    fn session_mut(&mut self, conn: ConnHandle) -> Option<&mut Session> {
        self.sess.as_mut().filter(|s| s.conn == conn)
    }

    fn log_desc(&self, conn: ConnHandle) {
        match self.stack.conn_find(conn) {
            Ok(desc) => info!("{desc}"),
            Err(e) => warn!("Connection {conn} not found: {e}"),
        }
    }
}

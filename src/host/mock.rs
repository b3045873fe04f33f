//! Recording host stack used by unit tests.

use std::collections::HashMap;

use crate::att::Handle;
use crate::gap::{AdvParams, ExtAdvParams};
use crate::gatt::{Db, ServiceHandles};
use crate::le::{Addr, OwnAddrType, RawAddr, TxPower};
use crate::smp::{Keys, PasskeyIo, SecurityParams};

use super::*;

/// Stack operation recorded by [`MockStack`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Call {
    ConfigureSecurity(SecurityParams),
    SetRandomAddr(RawAddr),
    AdvSetData(Vec<u8>),
    AdvStart(OwnAddrType, AdvParams),
    ExtAdvConfigure(u8, ExtAdvParams),
    ExtAdvSetData(u8, Vec<u8>),
    ExtAdvStart(u8),
    SecurityInitiate(ConnHandle),
    Terminate(ConnHandle, DisconnectReason),
    InjectIo(ConnHandle, PasskeyIo),
    DeletePeer(Addr),
    SetDefaultBearer(ConnHandle, Cid),
    Register(usize),
    Indicate(ConnHandle, Handle),
}

/// Host stack that records every operation and fails the ones named in
/// `fail`.
#[derive(Debug)]
pub(crate) struct MockStack {
    pub calls: Vec<Call>,
    pub fail: Vec<&'static str>,
    pub adv_active: bool,
    pub tx_power: TxPower,
    pub public: RawAddr,
    pub random: Option<RawAddr>,
    pub conns: HashMap<ConnHandle, ConnDesc>,
}

impl Default for MockStack {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            fail: Vec::new(),
            adv_active: false,
            tx_power: TxPower::new(9),
            public: RawAddr::from_le_bytes([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]),
            random: None,
            conns: HashMap::new(),
        }
    }
}

impl MockStack {
    pub const ERR: Status = Status(1);

    /// Adds a connection with the specified peer.
    pub fn connect(&mut self, conn: ConnHandle, peer: Addr) -> ConnDesc {
        let desc = ConnDesc {
            conn,
            our_ota_addr: Addr::Public(self.public),
            our_id_addr: Addr::Public(self.public),
            peer_ota_addr: peer,
            peer_id_addr: peer,
            itvl: 24,
            latency: 0,
            supervision_timeout: 400,
            sec: LinkSec::default(),
        };
        self.conns.insert(conn, desc);
        desc
    }

    /// Updates link security of a connection.
    pub fn secure(&mut self, conn: ConnHandle, sec: LinkSec) {
        if let Some(d) = self.conns.get_mut(&conn) {
            d.sec = sec;
        }
    }

    /// Removes and returns recorded calls.
    pub fn take(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.fail.iter().any(|&f| f == op) {
            Err(Self::ERR)
        } else {
            Ok(())
        }
    }

    fn record(&mut self, op: &str, c: Call) -> Result<()> {
        self.check(op)?;
        self.calls.push(c);
        Ok(())
    }
}

impl Stack for MockStack {
    fn configure_security(&mut self, p: &SecurityParams) -> Result<()> {
        self.record("configure_security", Call::ConfigureSecurity(*p))
    }

    fn set_random_addr(&mut self, addr: RawAddr) -> Result<()> {
        self.record("set_random_addr", Call::SetRandomAddr(addr))?;
        self.random = Some(addr);
        Ok(())
    }

    fn infer_own_addr_type(&mut self, _privacy: bool) -> Result<OwnAddrType> {
        self.check("infer_own_addr_type")?;
        Ok(if self.random.is_some() {
            OwnAddrType::Random
        } else {
            OwnAddrType::Public
        })
    }

    fn own_addr(&self, typ: OwnAddrType) -> Result<RawAddr> {
        self.check("own_addr")?;
        if typ.is_random() {
            self.random.ok_or(Self::ERR)
        } else {
            Ok(self.public)
        }
    }

    fn adv_active(&self, _instance: u8) -> bool {
        self.adv_active
    }

    fn adv_tx_power(&mut self) -> Result<TxPower> {
        self.check("adv_tx_power")?;
        Ok(self.tx_power)
    }

    fn adv_set_data(&mut self, data: &[u8]) -> Result<()> {
        self.record("adv_set_data", Call::AdvSetData(data.to_vec()))
    }

    fn adv_start(&mut self, own: OwnAddrType, p: &AdvParams) -> Result<()> {
        self.record("adv_start", Call::AdvStart(own, *p))?;
        self.adv_active = true;
        Ok(())
    }

    fn ext_adv_configure(&mut self, instance: u8, p: &ExtAdvParams) -> Result<()> {
        self.record("ext_adv_configure", Call::ExtAdvConfigure(instance, *p))
    }

    fn ext_adv_set_data(&mut self, instance: u8, data: &[u8]) -> Result<()> {
        self.record("ext_adv_set_data", Call::ExtAdvSetData(instance, data.to_vec()))
    }

    fn ext_adv_start(&mut self, instance: u8) -> Result<()> {
        self.record("ext_adv_start", Call::ExtAdvStart(instance))?;
        self.adv_active = true;
        Ok(())
    }

    fn security_initiate(&mut self, conn: ConnHandle) -> Result<()> {
        self.record("security_initiate", Call::SecurityInitiate(conn))
    }

    fn conn_find(&self, conn: ConnHandle) -> Result<ConnDesc> {
        self.check("conn_find")?;
        self.conns.get(&conn).copied().ok_or(Self::ERR)
    }

    fn terminate(&mut self, conn: ConnHandle, reason: DisconnectReason) -> Result<()> {
        self.record("terminate", Call::Terminate(conn, reason))
    }

    fn inject_io(&mut self, conn: ConnHandle, io: PasskeyIo) -> Result<()> {
        self.record("inject_io", Call::InjectIo(conn, io))
    }

    fn bond_keys(&self, _peer: Addr) -> Result<Keys> {
        self.check("bond_keys")?;
        Ok(Keys::test())
    }

    fn delete_peer(&mut self, peer: Addr) -> Result<()> {
        self.record("delete_peer", Call::DeletePeer(peer))
    }

    fn set_default_bearer(&mut self, conn: ConnHandle, cid: Cid) -> Result<()> {
        self.record("set_default_bearer", Call::SetDefaultBearer(conn, cid))
    }

    fn register(&mut self, db: &Db) -> Result<Vec<ServiceHandles>> {
        self.record("register", Call::Register(db.services().len()))?;
        db.sequential_handles(Handle::MIN).ok_or(Self::ERR)
    }

    fn indicate(&mut self, conn: ConnHandle, hdl: Handle) -> Result<()> {
        self.record("indicate", Call::Indicate(conn, hdl))
    }
}

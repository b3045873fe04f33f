use std::sync::Arc;

use matches::assert_matches;

use crate::att::Handle;
use crate::host::mock::{Call, MockStack};
use crate::host::{
    Authorize, Cid, ConnDesc, ConnHandle, DisconnectReason, Event, LinkSec, RepeatPairing, Reply,
    Status, Subscribe,
};
use crate::le::{Addr, OwnAddrType, Phy, RawAddr, TxPower};
use crate::smp::{
    BondStore, Device, Keys, MemStore, NumCompare, Passkey, PasskeyAction, PasskeyIo, PeerStore,
    SecState,
};

use super::*;

const PEER: Addr = Addr::Public(RawAddr::from_le_bytes([1, 2, 3, 4, 5, 6]));
const C1: ConnHandle = ConnHandle(1);
const C2: ConnHandle = ConnHandle(2);

fn peripheral(mode: AdvMode, p: PeripheralParams) -> Peripheral<MockStack> {
    Peripheral::new(
        MockStack::default(),
        Advertiser::new(mode, "ARM-N"),
        Device::new(),
        Arc::new(MemStore::default()),
        p,
    )
}

/// Returns a synchronized and advertising peripheral.
fn synced(p: PeripheralParams) -> Peripheral<MockStack> {
    let mut p = peripheral(AdvMode::Legacy, p);
    assert_eq!(p.handle(Event::Sync), Ok(Reply::Done));
    p.stack_mut().take();
    p
}

/// Connects `conn`, stopping advertising the way the controller does.
fn connect(p: &mut Peripheral<MockStack>, conn: ConnHandle) -> ConnDesc {
    let desc = p.stack_mut().connect(conn, PEER);
    p.stack_mut().adv_active = false;
    let evt = Event::Connect {
        conn,
        status: Status::OK,
    };
    assert_eq!(p.handle(evt), Ok(Reply::Done));
    desc
}

fn disconnect(p: &mut Peripheral<MockStack>, desc: ConnDesc, reason: i32) -> Result<Reply> {
    p.handle(Event::Disconnect { reason, desc })
}

fn adv_started(calls: &[Call]) -> bool {
    calls.iter().any(|c| matches!(*c, Call::AdvStart(..)))
}

fn hdl(v: u16) -> Handle {
    Handle::new(v).unwrap()
}

#[test]
fn legacy_adv() {
    let mut p = peripheral(AdvMode::Legacy, PeripheralParams::default());
    assert_eq!(p.phase(), Phase::Idle);
    assert_eq!(p.handle(Event::Sync), Ok(Reply::Done));
    let want = vec![
        0x02, 0x01, 0x06, // Flags
        0x06, 0x09, b'A', b'R', b'M', b'-', b'N', // Complete Local Name
        0x02, 0x0A, 0x09, // TX Power Level
        0x03, 0x19, 0x00, 0x02, // Appearance
        0x02, 0x1C, 0x00, // LE Role
    ];
    assert_eq!(
        p.stack_mut().take(),
        vec![
            Call::AdvSetData(want),
            Call::AdvStart(OwnAddrType::Public, AdvParams::default())
        ]
    );
    assert_eq!(p.phase(), Phase::Advertising);
    assert_eq!(p.identity().map(Identity::addr), Some(Addr::Public(p.stack().public)));

    // Already active
    assert_eq!(p.handle(Event::AdvComplete { reason: 0 }), Ok(Reply::Done));
    assert!(p.stack_mut().take().is_empty());
}

#[test]
fn legacy_adv_options() {
    let mut s = MockStack {
        fail: vec!["adv_tx_power"],
        ..MockStack::default()
    };
    let adv = Advertiser::new(AdvMode::Legacy, "ARM-N")
        .gap_service(false)
        .tx_power(Some(TxPower::new(-8)));
    let ad = adv.legacy_data(&mut s).unwrap().get();
    assert_eq!(&ad.as_ref()[..6], &[0x02, 0x01, 0x06, 0x02, 0x0A, 0xF8]);

    let adv = Advertiser::new(AdvMode::Legacy, "ARM-N");
    assert_eq!(
        adv.legacy_data(&mut s).unwrap_err(),
        Error::Stack {
            op: "adv_tx_power",
            status: MockStack::ERR
        }
    );

    let adv = Advertiser::new(AdvMode::Legacy, "a-device-name-that-is-too-long");
    assert_matches!(
        adv.legacy_data(&mut MockStack::default()),
        Err(Error::DataTooLong { max: 31, .. })
    );
}

#[test]
fn adv_interval() {
    assert_eq!(AdvParams::default().itvl_ticks(), Some((800, 816)));
    assert_eq!(ticks_625us(ExtAdvParams::FAST_ITVL1_MIN), Some(48));
}

#[test]
fn extended_adv() {
    let mut p = peripheral(AdvMode::Extended, PeripheralParams::default());
    assert_eq!(p.handle(Event::Sync), Ok(Reply::Done));
    assert_eq!(
        p.stack_mut().take(),
        vec![
            Call::ExtAdvConfigure(0, ExtAdvParams::connectable(OwnAddrType::Public)),
            Call::ExtAdvSetData(0, EXT_ADV_DATA.to_vec()),
            Call::ExtAdvStart(0),
        ]
    );
    assert_eq!(EXT_ADV_DATA.len(), 29);
    assert_eq!(&EXT_ADV_DATA[11..13], &[0x11, 0x09]);
    assert_eq!(&EXT_ADV_DATA[13..], b"nimble-bleprph-e");
    let p = ExtAdvParams::connectable(OwnAddrType::Random);
    assert!(p.connectable);
    assert_eq!((p.primary_phy, p.secondary_phy, p.sid), (Phy::Le1M, Phy::Le2M, 1));
}

#[test]
fn adv_failure() {
    let mut p = peripheral(AdvMode::Legacy, PeripheralParams::default());
    p.stack_mut().fail = vec!["adv_start"];
    assert_eq!(
        p.handle(Event::Sync),
        Err(Error::Stack {
            op: "adv_start",
            status: MockStack::ERR
        })
    );
    assert_eq!(p.phase(), Phase::Idle);

    // Retried on the next trigger
    p.stack_mut().fail.clear();
    assert_eq!(p.handle(Event::AdvComplete { reason: 0 }), Ok(Reply::Done));
    assert_eq!(p.phase(), Phase::Advertising);
}

#[test]
fn not_synced() {
    let mut p = peripheral(AdvMode::Legacy, PeripheralParams::default());
    let r = p.handle(Event::AdvComplete { reason: 0 });
    assert_eq!(r, Err(Error::NotSynced));
}

#[test]
fn random_identity() {
    let mut p = peripheral(
        AdvMode::Legacy,
        PeripheralParams {
            addr: AddrMode::Static,
            ..PeripheralParams::default()
        },
    );
    assert_eq!(p.handle(Event::Sync), Ok(Reply::Done));
    let calls = p.stack_mut().take();
    let Call::SetRandomAddr(raw) = calls[0] else {
        panic!("unexpected call {:?}", calls[0]);
    };
    assert_eq!(raw.random_subtype(), 0b11);
    assert_eq!(calls[2], Call::AdvStart(OwnAddrType::Random, AdvParams::default()));
    let id = p.identity().unwrap();
    assert_eq!(id.addr(), Addr::Random(raw));
    assert_eq!(id.own_addr_type(), OwnAddrType::Random);

    let mut s = MockStack::default();
    let id = Identity::resolve(&mut s, AddrMode::NonResolvable, &mut rand_core::OsRng).unwrap();
    assert_eq!(id.addr().raw().random_subtype(), 0b00);

    let mut s = MockStack {
        fail: vec!["set_random_addr"],
        ..MockStack::default()
    };
    assert_matches!(
        Identity::resolve(&mut s, AddrMode::Static, &mut rand_core::OsRng),
        Err(Error::Stack {
            op: "set_random_addr",
            ..
        })
    );
}

#[test]
fn connect_and_disconnect() {
    for reason in [0x08, 0x13, 0x16, 0x3D, 0x213] {
        let mut p = synced(PeripheralParams::default());
        let desc = connect(&mut p, C1);
        assert_eq!(p.stack_mut().take(), vec![Call::SecurityInitiate(C1)]);
        assert_eq!(p.phase(), Phase::Authenticating);
        assert_eq!(p.session().map(Session::conn), Some(C1));
        assert_eq!(p.session().map(Session::mtu), Some(Session::DEFAULT_MTU));

        assert_eq!(disconnect(&mut p, desc, reason), Ok(Reply::Done));
        assert!(adv_started(&p.stack_mut().take()));
        assert!(p.session().is_none());
        assert_eq!(p.phase(), Phase::Advertising);
    }
}

#[test]
fn security_initiate_failure() {
    let mut p = synced(PeripheralParams::default());
    p.stack_mut().fail = vec!["security_initiate"];
    connect(&mut p, C1);
    assert_eq!(p.phase(), Phase::Connected);
    assert!(p.session().is_some());
}

#[test]
fn failed_connect() {
    let mut p = synced(PeripheralParams::default());
    p.stack_mut().adv_active = false;
    let evt = Event::Connect {
        conn: C1,
        status: Status(13),
    };
    assert_eq!(p.handle(evt), Ok(Reply::Done));
    assert!(adv_started(&p.stack_mut().take()));
    assert!(p.session().is_none());
}

#[test]
fn single_session() {
    let mut p = synced(PeripheralParams::default());
    let d1 = connect(&mut p, C1);
    p.stack_mut().take();
    let d2 = connect(&mut p, C2);
    assert_eq!(
        p.stack_mut().take(),
        vec![Call::Terminate(C2, DisconnectReason::RemoteUserTerminated)]
    );
    assert_eq!(p.session().map(Session::conn), Some(C1));

    assert_eq!(disconnect(&mut p, d2, 0x16), Ok(Reply::Done));
    assert!(p.stack_mut().take().is_empty());
    assert_eq!(p.session().map(Session::conn), Some(C1));

    assert_eq!(disconnect(&mut p, d1, 0x13), Ok(Reply::Done));
    assert!(adv_started(&p.stack_mut().take()));
}

#[test]
fn adv_complete() {
    let mut p = synced(PeripheralParams::default());
    connect(&mut p, C1);
    p.stack_mut().take();
    assert_eq!(p.handle(Event::AdvComplete { reason: 0 }), Ok(Reply::Done));
    assert!(p.stack_mut().take().is_empty());

    let mut p = synced(PeripheralParams::default());
    p.stack_mut().adv_active = false;
    assert_eq!(p.handle(Event::AdvComplete { reason: 0 }), Ok(Reply::Done));
    assert!(adv_started(&p.stack_mut().take()));
}

#[test]
fn encryption() {
    let mut p = synced(PeripheralParams::default());
    connect(&mut p, C1);
    let enc = Event::EncChange {
        conn: C1,
        status: Status::OK,
    };
    p.stack_mut().secure(
        C1,
        LinkSec {
            encrypted: true,
            key_size: 16,
            ..LinkSec::default()
        },
    );
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert_eq!(p.security(), SecState::Encrypted);
    assert_eq!(p.phase(), Phase::Secured);

    p.stack_mut().secure(
        C1,
        LinkSec {
            encrypted: true,
            bonded: true,
            key_size: 16,
            ..LinkSec::default()
        },
    );
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert_eq!(p.phase(), Phase::Bonded);

    // Never decreases
    p.stack_mut().secure(C1, LinkSec::default());
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert_eq!(p.security(), SecState::Bonded);

    // Failed encryption does not change the state
    let mut p = synced(PeripheralParams::default());
    connect(&mut p, C1);
    p.stack_mut().secure(
        C1,
        LinkSec {
            encrypted: true,
            ..LinkSec::default()
        },
    );
    let evt = Event::EncChange {
        conn: C1,
        status: Status(6),
    };
    assert_eq!(p.handle(evt), Ok(Reply::Done));
    assert_eq!(p.security(), SecState::Encrypting);
}

#[test]
fn passkey_actions() {
    let mut p = synced(PeripheralParams::default());
    connect(&mut p, C1);
    p.stack_mut().take();
    let act = |p: &mut Peripheral<MockStack>, action| {
        assert_eq!(p.handle(Event::Passkey { conn: C1, action }), Ok(Reply::Done));
        p.stack_mut().take()
    };

    let calls = act(&mut p, PasskeyAction::Display);
    assert_matches!(
        calls.as_slice(),
        [Call::InjectIo(C1, PasskeyIo::Display(k))] if k.get() < 1_000_000
    );
    assert_eq!(
        act(&mut p, PasskeyAction::NumCompare(NumCompare(123_456))),
        vec![Call::InjectIo(C1, PasskeyIo::NumCompare(true))]
    );
    assert_eq!(
        act(&mut p, PasskeyAction::Input),
        vec![Call::InjectIo(C1, PasskeyIo::Input(Passkey::ZERO))]
    );
    assert_eq!(
        act(&mut p, PasskeyAction::Oob),
        vec![Call::InjectIo(C1, PasskeyIo::Oob([0; 16]))]
    );
    assert!(act(&mut p, PasskeyAction::Unknown(9)).is_empty());

    let mut p = synced(PeripheralParams {
        auto_accept_numcmp: false,
        ..PeripheralParams::default()
    });
    connect(&mut p, C1);
    p.stack_mut().take();
    assert_eq!(
        act(&mut p, PasskeyAction::NumCompare(NumCompare(1))),
        vec![Call::InjectIo(C1, PasskeyIo::NumCompare(false))]
    );
}

#[test]
fn repeat_pairing() {
    let bonds = Arc::new(MemStore::default());
    let store: Arc<BondStore> = Arc::<MemStore>::clone(&bonds);
    let mut p = Peripheral::new(
        MockStack::default(),
        Advertiser::new(AdvMode::Legacy, "ARM-N"),
        Device::new(),
        store,
        PeripheralParams::default(),
    );
    assert_eq!(p.handle(Event::Sync), Ok(Reply::Done));
    connect(&mut p, C1);
    p.stack_mut().take();
    assert_eq!(
        p.handle(Event::RepeatPairing { conn: C1 }),
        Ok(Reply::RepeatPairing(RepeatPairing::Retry))
    );
    assert_eq!(p.stack_mut().take(), vec![Call::DeletePeer(PEER)]);

    // Stack fails to delete its record
    assert!(bonds.save(PEER, &Keys::test()));
    p.stack_mut().fail.push("delete_peer");
    assert_eq!(
        p.handle(Event::RepeatPairing { conn: C1 }),
        Ok(Reply::RepeatPairing(RepeatPairing::Ignore))
    );
    assert_eq!(bonds.load(PEER), Some(Keys::test()));
    p.stack_mut().fail.clear();
    assert_eq!(
        p.handle(Event::RepeatPairing { conn: C1 }),
        Ok(Reply::RepeatPairing(RepeatPairing::Retry))
    );
    assert!(bonds.is_empty());

    // Unknown connection
    p.stack_mut().take();
    assert_eq!(
        p.handle(Event::RepeatPairing { conn: C2 }),
        Ok(Reply::RepeatPairing(RepeatPairing::Ignore))
    );
    assert!(p.stack_mut().take().is_empty());
}

#[test]
fn bond_saved() {
    let bonds = Arc::new(MemStore::default());
    let store: Arc<BondStore> = Arc::<MemStore>::clone(&bonds);
    let mut p = Peripheral::new(
        MockStack::default(),
        Advertiser::new(AdvMode::Legacy, "ARM-N"),
        Device::new(),
        store,
        PeripheralParams::default(),
    );
    assert_eq!(p.handle(Event::Sync), Ok(Reply::Done));
    connect(&mut p, C1);
    let enc = Event::EncChange {
        conn: C1,
        status: Status::OK,
    };
    let sec = |bonded| LinkSec {
        encrypted: true,
        bonded,
        key_size: 16,
        ..LinkSec::default()
    };

    // Encrypted without bonding
    p.stack_mut().secure(C1, sec(false));
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert!(bonds.is_empty());

    p.stack_mut().secure(C1, sec(true));
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert_eq!(p.phase(), Phase::Bonded);
    assert_eq!(bonds.load(PEER), Some(Keys::test()));

    // Saved once per session
    bonds.clear();
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert!(bonds.is_empty());

    // Stack has no record
    let desc = p.stack().conns[&C1];
    assert_eq!(disconnect(&mut p, desc, 0x13), Ok(Reply::Done));
    p.stack_mut().fail.push("bond_keys");
    connect(&mut p, C1);
    p.stack_mut().secure(C1, sec(true));
    assert_eq!(p.handle(enc), Ok(Reply::Done));
    assert_eq!(p.phase(), Phase::Bonded);
    assert!(bonds.is_empty());
}

#[test]
fn authorize() {
    let mut p = synced(PeripheralParams::default());
    let evt = Event::Authorize {
        conn: C1,
        attr: hdl(3),
        is_read: true,
    };
    assert_eq!(p.handle(evt), Ok(Reply::Authorize(Authorize::Reject)));
}

fn eatt(p: &mut Peripheral<MockStack>, cid: u16, status: Status) -> Vec<Call> {
    let evt = Event::Eatt {
        conn: C1,
        cid: Cid(cid),
        status,
    };
    assert_eq!(p.handle(evt), Ok(Reply::Done));
    p.stack_mut().take()
}

#[test]
fn eatt_bearers() {
    let params = PeripheralParams {
        eatt_bearers: 3,
        ..PeripheralParams::default()
    };
    let mut p = synced(params);
    let desc = connect(&mut p, C1);
    p.stack_mut().take();
    assert!(eatt(&mut p, 0x40, Status::OK).is_empty());
    assert!(eatt(&mut p, 0x41, Status::OK).is_empty());
    assert_eq!(
        eatt(&mut p, 0x42, Status::OK),
        vec![Call::SetDefaultBearer(C1, Cid(0x40))]
    );
    assert_eq!(p.session().map(Session::bearers), Some(&Bearers::Ready(Cid(0x40))));
    assert!(eatt(&mut p, 0x43, Status::OK).is_empty());

    // Aborted by a failed bearer
    assert_eq!(disconnect(&mut p, desc, 0x13), Ok(Reply::Done));
    p.stack_mut().adv_active = false;
    connect(&mut p, C1);
    p.stack_mut().take();
    assert!(eatt(&mut p, 0x40, Status::OK).is_empty());
    assert!(eatt(&mut p, 0x41, Status(1)).is_empty());
    assert_eq!(p.session().map(Session::bearers), Some(&Bearers::Aborted));
    assert!(eatt(&mut p, 0x42, Status::OK).is_empty());
    assert!(eatt(&mut p, 0x43, Status::OK).is_empty());

    // Disconnect before all bearers are established
    let mut p = synced(params);
    let desc = connect(&mut p, C1);
    p.stack_mut().take();
    assert!(eatt(&mut p, 0x40, Status::OK).is_empty());
    assert_eq!(disconnect(&mut p, desc, 0x08), Ok(Reply::Done));
    connect(&mut p, C1);
    p.stack_mut().take();
    assert!(eatt(&mut p, 0x50, Status::OK).is_empty());
    assert!(eatt(&mut p, 0x51, Status::OK).is_empty());
    assert_eq!(
        eatt(&mut p, 0x52, Status::OK),
        vec![Call::SetDefaultBearer(C1, Cid(0x50))]
    );

    // Disabled
    let mut p = synced(PeripheralParams::default());
    connect(&mut p, C1);
    p.stack_mut().take();
    assert!(eatt(&mut p, 0x40, Status::OK).is_empty());
    assert_eq!(p.session().map(Session::bearers), Some(&Bearers::Disabled));
}

#[test]
fn subscribe_and_indicate() {
    let mut p = synced(PeripheralParams::default());
    assert_eq!(p.indicate(hdl(6)), Err(Error::NotConnected));
    connect(&mut p, C1);
    p.stack_mut().take();
    assert_eq!(p.indicate(hdl(6)), Err(Error::NotSubscribed(hdl(6))));

    let mut sub = Subscribe {
        conn: C1,
        attr: hdl(6),
        reason: 1,
        prev_notify: false,
        cur_notify: false,
        prev_indicate: false,
        cur_indicate: true,
    };
    assert_eq!(p.handle(Event::Subscribe(sub)), Ok(Reply::Done));
    let s = p.session().unwrap().subscription(hdl(6));
    assert!(s.indicate && !s.notify);
    assert_eq!(p.indicate(hdl(6)), Ok(()));
    assert_eq!(p.stack_mut().take(), vec![Call::Indicate(C1, hdl(6))]);

    sub.prev_indicate = true;
    sub.cur_indicate = false;
    assert_eq!(p.handle(Event::Subscribe(sub)), Ok(Reply::Done));
    assert_eq!(p.indicate(hdl(6)), Err(Error::NotSubscribed(hdl(6))));

    let evt = Event::Mtu {
        conn: C1,
        cid: Cid(4),
        mtu: 247,
    };
    assert_eq!(p.handle(evt), Ok(Reply::Done));
    assert_eq!(p.session().map(Session::mtu), Some(247));
}

#[test]
fn reset() {
    let mut p = synced(PeripheralParams::default());
    connect(&mut p, C1);
    assert_eq!(p.handle(Event::Reset { reason: 2 }), Ok(Reply::Done));
    assert_eq!(p.phase(), Phase::Idle);
    assert!(p.session().is_none());
    assert!(p.identity().is_none());
}

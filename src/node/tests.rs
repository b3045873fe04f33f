use std::sync::Arc;

use matches::assert_matches;
use tokio::sync::mpsc;

use crate::att::ErrorCode;
use crate::gap::{AddrMode, AdvMode, Phase};
use crate::host::mock::{Call, MockStack};
use crate::host::{ConnHandle, Event, LinkSec, Reply, Status, Subscribe};
use crate::le::{Addr, RawAddr};
use crate::net::{NetCmd, NetQueue};
use crate::profile::{ControlChar, Output, Placeholder, StatusChar};
use crate::smp::{Device, IoCap, MemStore, SecState};

use super::*;

const PEER: Addr = Addr::Public(RawAddr::from_le_bytes([1, 2, 3, 4, 5, 6]));
const C1: ConnHandle = ConnHandle(1);

#[derive(Debug, Default)]
struct Led;

impl Output for Led {
    fn set(&self, _: bool) {}
}

fn node(stack: MockStack) -> (Result<Node<MockStack>>, mpsc::Receiver<NetCmd>) {
    let (net, rx) = NetQueue::new(NetQueue::CAPACITY);
    let h = Handlers {
        output: Arc::new(Led),
        net: Arc::new(net),
        status: Arc::new(Placeholder),
    };
    let n = Node::new(
        stack,
        &Config::default(),
        h,
        Device::new(),
        Arc::new(MemStore::default()),
    );
    (n, rx)
}

fn subscribe(hdl: Handle, indicate: bool) -> Event {
    Event::Subscribe(Subscribe {
        conn: C1,
        attr: hdl,
        reason: 1,
        prev_notify: false,
        cur_notify: false,
        prev_indicate: !indicate,
        cur_indicate: indicate,
    })
}

#[test]
fn startup() {
    let (n, _rx) = node(MockStack::default());
    let n = n.unwrap();
    let calls = &n.peripheral().stack().calls;
    assert_matches!(calls[0], Call::ConfigureSecurity(_));
    assert_eq!(calls[1], Call::Register(2));
    assert_eq!(n.server().db().services().len(), 2);
    assert_eq!(n.peripheral().phase(), Phase::Idle);
}

#[test]
fn startup_failure() {
    let mut stack = MockStack::default();
    stack.fail.push("configure_security");
    assert_matches!(node(stack).0, Err(Error::Security(MockStack::ERR)));

    let mut stack = MockStack::default();
    stack.fail.push("register");
    assert_matches!(
        node(stack).0,
        Err(Error::Gatt(gatt::Error::Register(MockStack::ERR)))
    );
}

#[test]
fn handle_errors() {
    let (n, _rx) = node(MockStack::default());
    let mut n = n.unwrap();
    // Advertising requires a synchronized stack
    assert_eq!(n.handle(Event::AdvComplete { reason: 0 }), Reply::Done);
    assert_eq!(n.peripheral().phase(), Phase::Idle);
    assert_eq!(n.handle(Event::Sync), Reply::Done);
    assert_eq!(n.peripheral().phase(), Phase::Advertising);
}

#[test]
fn access_security() {
    let (n, _rx) = node(MockStack::default());
    let mut n = n.unwrap();
    let creds = n.server().value_handle(ControlChar::Credentials.uuid()).unwrap();
    let out = n.server().value_handle(StatusChar::Output.uuid()).unwrap();
    assert_eq!(
        n.write(C1, creds, b"SSID:a;PASS:b"),
        Err(ErrorCode::InsufficientEncryption)
    );
    assert_eq!(n.read(C1, out), Ok(vec![1]));

    n.handle(Event::Sync);
    let stack = n.peripheral_mut().stack_mut();
    stack.connect(C1, PEER);
    stack.secure(
        C1,
        LinkSec {
            encrypted: true,
            key_size: 16,
            ..LinkSec::default()
        },
    );
    n.handle(Event::Connect {
        conn: C1,
        status: Status::OK,
    });
    assert_eq!(n.peripheral().phase(), Phase::Authenticating);
    assert_eq!(
        n.write(C1, creds, b"SSID:a;PASS:b"),
        Err(ErrorCode::InsufficientEncryption)
    );
    n.handle(Event::EncChange {
        conn: C1,
        status: Status::OK,
    });
    assert_eq!(n.peripheral().phase(), Phase::Secured);
    assert_eq!(n.write(C1, creds, b"SSID:a;PASS:b"), Ok(()));

    // Other connections are treated as unencrypted
    assert_eq!(
        n.write(ConnHandle(9), creds, b"SSID:a;PASS:b"),
        Err(ErrorCode::InsufficientEncryption)
    );
}

#[test]
fn indicate() {
    let (n, _rx) = node(MockStack::default());
    let mut n = n.unwrap();
    let uuid = StatusChar::Output.uuid().as_uuid();
    let hdl = n.server().value_handle(uuid).unwrap();
    assert_eq!(n.indicate(uuid), Err(gap::Error::NotConnected));
    assert_eq!(
        n.indicate(ControlService::UUID),
        Err(gap::Error::UnknownCharacteristic(ControlService::UUID))
    );

    n.handle(Event::Sync);
    n.peripheral_mut().stack_mut().connect(C1, PEER);
    n.handle(Event::Connect {
        conn: C1,
        status: Status::OK,
    });
    assert_eq!(n.indicate(uuid), Err(gap::Error::NotSubscribed(hdl)));
    n.handle(subscribe(hdl, true));
    n.peripheral_mut().stack_mut().take();
    assert_eq!(n.indicate(uuid), Ok(()));
    assert_eq!(n.peripheral().stack().calls, vec![Call::Indicate(C1, hdl)]);
    n.handle(subscribe(hdl, false));
    assert_eq!(n.indicate(uuid), Err(gap::Error::NotSubscribed(hdl)));
}

#[tokio::test]
async fn provision() {
    let (n, mut rx) = node(MockStack::default());
    let mut n = n.unwrap();
    let creds = n.server().value_handle(ControlChar::Credentials.uuid()).unwrap();
    let sensor = n.server().value_handle(StatusChar::Sensor.uuid()).unwrap();
    let stack = n.peripheral_mut().stack_mut();
    stack.connect(C1, PEER);
    stack.secure(
        C1,
        LinkSec {
            encrypted: true,
            bonded: true,
            key_size: 16,
            ..LinkSec::default()
        },
    );

    let h = n.spawn();
    assert_eq!(h.event(Event::Sync).await.unwrap(), Reply::Done);
    let evt = Event::Connect {
        conn: C1,
        status: Status::OK,
    };
    assert_eq!(h.event(evt).await.unwrap(), Reply::Done);
    let evt = Event::EncChange {
        conn: C1,
        status: Status::OK,
    };
    assert_eq!(h.event(evt).await.unwrap(), Reply::Done);
    let evt = Event::Authorize {
        conn: C1,
        attr: sensor,
        is_read: true,
    };
    assert_eq!(
        h.event(evt).await.unwrap(),
        Reply::Authorize(crate::host::Authorize::Reject)
    );

    let v = b"SSID:home;PASS:secret1".to_vec();
    assert_eq!(h.write(C1, creds, v).await, Ok(()));
    assert_matches!(rx.recv().await, Some(NetCmd::ApplyNewCreds(c)) if c.ssid() == "home");
    assert_eq!(rx.recv().await, Some(NetCmd::Start));
    assert_eq!(
        h.read(C1, sensor).await,
        Ok(25.4_f32.to_le_bytes().to_vec())
    );
    let uuid = StatusChar::Sensor.uuid().as_uuid();
    assert!(h.command(Command::Indicate(uuid)).await.is_ok());
    h.close().await;
}

#[test]
fn config_default() {
    let c = Config::default();
    assert_eq!(c.device_name, "ARM-N");
    assert!(c.gap_service);
    assert_eq!((c.addr, c.adv), (AddrMode::Public, AdvMode::Legacy));
    assert_eq!(c.control_security, SecState::Encrypted);
    assert_eq!(c.status_security, SecState::Unencrypted);
    let p = c.peripheral_params();
    assert_eq!(p.eatt_bearers, 0);
    assert!(p.auto_accept_numcmp);
}

#[cfg(feature = "fs")]
#[test]
fn config_load() {
    let tmp = (tempfile::Builder::new().prefix("nodelink-test-").tempdir()).unwrap();
    let path = tmp.path().join("node.json");
    std::fs::write(
        &path,
        r#"{
            "device_name": "Lamp",
            "addr": "random",
            "adv": "extended",
            "tx_power": 4,
            "eatt_bearers": 2,
            "security": {"io_cap": "display_only", "bonding": true}
        }"#,
    )
    .unwrap();
    let c = Config::load(&path).unwrap();
    assert_eq!(c.device_name, "Lamp");
    assert_eq!((c.addr, c.adv), (AddrMode::Static, AdvMode::Extended));
    assert_eq!((c.tx_power, c.eatt_bearers), (Some(4), 2));
    assert_eq!(c.security.io_cap, IoCap::DisplayOnly);
    assert!(c.security.bonding && c.security.auto_accept_numcmp);
    assert!(c.gap_service);

    std::fs::write(&path, "{}").unwrap();
    assert_eq!(Config::load(&path).unwrap(), Config::default());
    std::fs::write(&path, "{\"adv\": 1}").unwrap();
    assert_matches!(Config::load(&path), Err(Error::Json(_)));
    assert_matches!(Config::load(tmp.path().join("none")), Err(Error::Io(_)));
}

#![allow(unused_crate_dependencies)]
#![allow(clippy::print_stdout)]

use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sscanf::sscanf;
use tracing::info;

use nodelink::att::Handle;
use nodelink::gap::{AddrMode, AdvMode, AdvParams, ExtAdvParams};
use nodelink::gatt::{Db, ServiceHandles};
use nodelink::host::{
    self, Cid, ConnDesc, ConnHandle, DisconnectReason, Event, LinkSec, Stack, Status, Subscribe,
};
use nodelink::le::{Addr, OwnAddrType, RawAddr, TxPower};
use nodelink::net::{NetCmd, NetQueue};
use nodelink::node::{Command, Config, Handlers, Node, NodeHandle};
use nodelink::profile::{Output, Placeholder};
use nodelink::smp::{BondStore, Device, Keys, MemStore, PasskeyAction, PasskeyIo, SecurityParams};
use nodelink::{fs, Uuid16};

#[derive(Clone, Debug, clap::Parser)]
struct Args {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Advertised device name.
    #[arg(short, long)]
    name: Option<String>,

    /// Use extended advertising.
    #[arg(short, long)]
    extended: bool,

    /// Use a random static address.
    #[arg(short, long)]
    random: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let mut cfg = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(name) = args.name {
        cfg.device_name = name;
    }
    if args.extended {
        cfg.adv = AdvMode::Extended;
    }
    if args.random {
        cfg.addr = AddrMode::Static;
    }

    let (net, mut net_rx) = NetQueue::new(NetQueue::CAPACITY);
    tokio::task::spawn(async move {
        while let Some(cmd) = net_rx.recv().await {
            info!("Connectivity manager received {cmd:?}");
            if let NetCmd::ApplyNewCreds(c) = cmd {
                println!("Provisioned network {:?}", c.ssid());
            }
        }
    });
    let h = Handlers {
        output: Arc::new(Led),
        net: Arc::new(net),
        status: Arc::new(Placeholder),
    };
    let bonds: Arc<BondStore> = match fs::KeyStore::per_user("nodelink") {
        Some(ks) => Arc::new(ks),
        None => Arc::new(MemStore::default()),
    };
    let node = Node::new(SimStack::default(), &cfg, h, Device::new(), bonds)?;
    for s in node.server().handles() {
        for c in &s.chars {
            let uuid = node.server().characteristic(c.val).map(|c| c.uuid());
            println!("{}: {uuid:?}", c.val);
        }
    }
    let node = node.spawn();
    node.event(Event::Sync).await?;
    let r = read_input(&node).await;
    node.close().await;
    r
}

async fn read_input(node: &NodeHandle) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    std::thread::spawn(move || {
        // https://github.com/tokio-rs/tokio/issues/2466
        for ln in std::io::BufReader::new(std::io::stdin()).lines() {
            tx.blocking_send(ln?)?;
        }
        Ok::<_, anyhow::Error>(())
    });
    let mut sim = Sim::default();
    loop {
        let ln: String = tokio::select! {
            ln = rx.recv() => match ln {
                None => return Ok(()),
                Some(ln) => ln,
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        let mut tok = ln.split_ascii_whitespace();
        let Some(cmd) = tok.next() else { continue };
        let params = tok.collect::<Vec<&str>>().join(" ");
        if let Err(e) = sim.exec(node, cmd, &params).await {
            println!("{e}");
        }
    }
}

/// Peer simulator that turns console commands into host stack events.
#[derive(Debug, Default)]
struct Sim {
    conns: HashMap<ConnHandle, ConnDesc>,
}

impl Sim {
    async fn exec(&mut self, node: &NodeHandle, cmd: &str, params: &str) -> Result<()> {
        let evt = match cmd {
            "connect" | "c" => {
                let conn = ConnHandle(sscanf!(params, "{u16}").unwrap_or(1));
                let desc = ConnDesc {
                    conn,
                    peer_ota_addr: Addr::Public(RawAddr::from_le_bytes([1, 2, 3, 4, 5, 6])),
                    peer_id_addr: Addr::Public(RawAddr::from_le_bytes([1, 2, 3, 4, 5, 6])),
                    itvl: 24,
                    supervision_timeout: 400,
                    ..ConnDesc::default()
                };
                self.conns.insert(conn, desc);
                Event::Connect {
                    conn,
                    status: Status::OK,
                }
            }
            "encrypt" | "e" => {
                let conn = ConnHandle(sscanf!(params, "{u16}").unwrap_or(1));
                Event::EncChange {
                    conn,
                    status: Status::OK,
                }
            }
            "disconnect" | "d" => {
                let conn = ConnHandle(sscanf!(params, "{u16}").unwrap_or(1));
                let desc = self.conns.remove(&conn).unwrap_or_default();
                Event::Disconnect { reason: 0x213, desc }
            }
            "repeat" => Event::RepeatPairing {
                conn: ConnHandle(sscanf!(params, "{u16}").unwrap_or(1)),
            },
            "passkey" | "p" => {
                let Ok((action, n)) = sscanf!(params, "{u8} {u32}") else {
                    anyhow::bail!("usage: passkey <action> <number>");
                };
                Event::Passkey {
                    conn: ConnHandle(1),
                    action: PasskeyAction::from_raw(action, n),
                }
            }
            "subscribe" | "s" => {
                let Some(hdl) = sscanf!(params, "{u16}").ok().and_then(Handle::new) else {
                    anyhow::bail!("usage: subscribe <handle>");
                };
                Event::Subscribe(Subscribe {
                    conn: ConnHandle(1),
                    attr: hdl,
                    reason: 1,
                    prev_notify: false,
                    cur_notify: false,
                    prev_indicate: false,
                    cur_indicate: true,
                })
            }
            "read" | "r" => {
                let Some(hdl) = sscanf!(params, "{u16}").ok().and_then(Handle::new) else {
                    anyhow::bail!("usage: read <handle>");
                };
                println!("{:02X?}", node.read(ConnHandle(1), hdl).await);
                return Ok(());
            }
            "write" | "w" => {
                let Ok((hdl, val)) = sscanf!(params, "{u16} {String}") else {
                    anyhow::bail!("usage: write <handle> <text>");
                };
                let Some(hdl) = Handle::new(hdl) else {
                    anyhow::bail!("invalid handle");
                };
                println!("{:?}", node.write(ConnHandle(1), hdl, val.into_bytes()).await);
                return Ok(());
            }
            "indicate" | "i" => {
                let Some(uuid) = sscanf!(params, "{u16:x}").ok().and_then(Uuid16::new) else {
                    anyhow::bail!("usage: indicate <uuid16>");
                };
                node.command(Command::Indicate(uuid.as_uuid())).await?;
                return Ok(());
            }
            _ => anyhow::bail!("unknown command: {cmd}"),
        };
        println!("{:?}", node.event(evt).await?);
        Ok(())
    }
}

#[derive(Debug)]
struct Led;

impl Output for Led {
    fn set(&self, on: bool) {
        println!("LED {}", if on { "on" } else { "off" });
    }
}

/// Host stack stand-in that logs every operation.
#[derive(Debug, Default)]
struct SimStack {
    random: Option<RawAddr>,
    adv: bool,
    sec: HashMap<ConnHandle, LinkSec>,
}

impl SimStack {
    const PUBLIC: RawAddr = RawAddr::from_le_bytes([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
}

impl Stack for SimStack {
    fn configure_security(&mut self, p: &SecurityParams) -> host::Result<()> {
        info!("configure_security: {p:?}");
        Ok(())
    }

    fn set_random_addr(&mut self, addr: RawAddr) -> host::Result<()> {
        info!("set_random_addr: {addr}");
        self.random = Some(addr);
        Ok(())
    }

    fn infer_own_addr_type(&mut self, _privacy: bool) -> host::Result<OwnAddrType> {
        Ok(if self.random.is_some() {
            OwnAddrType::Random
        } else {
            OwnAddrType::Public
        })
    }

    fn own_addr(&self, typ: OwnAddrType) -> host::Result<RawAddr> {
        if typ.is_random() {
            self.random.ok_or(Status(-1))
        } else {
            Ok(Self::PUBLIC)
        }
    }

    fn adv_active(&self, _instance: u8) -> bool {
        self.adv
    }

    fn adv_tx_power(&mut self) -> host::Result<TxPower> {
        Ok(TxPower::new(0))
    }

    fn adv_set_data(&mut self, data: &[u8]) -> host::Result<()> {
        info!("adv_set_data: {data:02X?}");
        Ok(())
    }

    fn adv_start(&mut self, own: OwnAddrType, p: &AdvParams) -> host::Result<()> {
        info!("adv_start: own={own} {p:?}");
        self.adv = true;
        Ok(())
    }

    fn ext_adv_configure(&mut self, instance: u8, p: &ExtAdvParams) -> host::Result<()> {
        info!("ext_adv_configure: instance={instance} {p:?}");
        Ok(())
    }

    fn ext_adv_set_data(&mut self, instance: u8, data: &[u8]) -> host::Result<()> {
        info!("ext_adv_set_data: instance={instance} {data:02X?}");
        Ok(())
    }

    fn ext_adv_start(&mut self, instance: u8) -> host::Result<()> {
        info!("ext_adv_start: instance={instance}");
        self.adv = true;
        Ok(())
    }

    fn security_initiate(&mut self, conn: ConnHandle) -> host::Result<()> {
        info!("security_initiate: {conn}");
        self.adv = false;
        self.sec.insert(
            conn,
            LinkSec {
                encrypted: true,
                bonded: true,
                key_size: 16,
                ..LinkSec::default()
            },
        );
        Ok(())
    }

    fn conn_find(&self, conn: ConnHandle) -> host::Result<ConnDesc> {
        Ok(ConnDesc {
            conn,
            our_id_addr: Addr::Public(Self::PUBLIC),
            sec: self.sec.get(&conn).copied().unwrap_or_default(),
            ..ConnDesc::default()
        })
    }

    fn terminate(&mut self, conn: ConnHandle, reason: DisconnectReason) -> host::Result<()> {
        info!("terminate: {conn} {reason}");
        self.sec.remove(&conn);
        Ok(())
    }

    fn inject_io(&mut self, conn: ConnHandle, io: PasskeyIo) -> host::Result<()> {
        info!("inject_io: {conn} {io:?}");
        Ok(())
    }

    fn bond_keys(&self, peer: Addr) -> host::Result<Keys> {
        info!("bond_keys: {peer}");
        Ok(Keys {
            secure_connections: true,
            ..Keys::default()
        })
    }

    fn delete_peer(&mut self, peer: Addr) -> host::Result<()> {
        info!("delete_peer: {peer}");
        Ok(())
    }

    fn set_default_bearer(&mut self, conn: ConnHandle, cid: Cid) -> host::Result<()> {
        info!("set_default_bearer: {conn} {cid}");
        Ok(())
    }

    fn register(&mut self, db: &Db) -> host::Result<Vec<ServiceHandles>> {
        db.sequential_handles(Handle::MIN).ok_or(Status(-1))
    }

    fn indicate(&mut self, conn: ConnHandle, hdl: Handle) -> host::Result<()> {
        println!("Indication on {conn}: {hdl}");
        Ok(())
    }
}

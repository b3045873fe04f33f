use crate::att::Handle;
use crate::smp::PasskeyAction;

use super::{Cid, ConnDesc, ConnHandle, Status};

/// Host stack event delivered to the peripheral.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Host and controller are synchronized.
    Sync,
    /// Host stack reset itself.
    Reset { reason: i32 },
    /// A connection was established or the attempt failed.
    Connect { conn: ConnHandle, status: Status },
    /// A connection was terminated.
    Disconnect { reason: i32, desc: ConnDesc },
    /// Connection parameters were updated.
    ConnUpdate { conn: ConnHandle, status: Status },
    /// Advertising stopped.
    AdvComplete { reason: i32 },
    /// Encryption state of a connection changed.
    EncChange { conn: ConnHandle, status: Status },
    /// Notification or indication transmission completed.
    NotifyTx {
        conn: ConnHandle,
        attr: Handle,
        status: Status,
        indication: bool,
    },
    /// Peer changed its subscription to a characteristic.
    Subscribe(Subscribe),
    /// ATT MTU was exchanged.
    Mtu { conn: ConnHandle, cid: Cid, mtu: u16 },
    /// Peer attempted to pair while a bond already exists.
    RepeatPairing { conn: ConnHandle },
    /// Security manager requires a passkey action.
    Passkey {
        conn: ConnHandle,
        action: PasskeyAction,
    },
    /// Peer requested authorization for an attribute.
    Authorize {
        conn: ConnHandle,
        attr: Handle,
        is_read: bool,
    },
    /// An EATT bearer was established or failed.
    Eatt {
        conn: ConnHandle,
        cid: Cid,
        status: Status,
    },
}

/// Subscription change event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Subscribe {
    pub conn: ConnHandle,
    pub attr: Handle,
    pub reason: u8,
    pub prev_notify: bool,
    pub cur_notify: bool,
    pub prev_indicate: bool,
    pub cur_indicate: bool,
}

/// Reply returned to the host stack for an [`Event`]. Only the events that
/// expect an answer produce anything other than [`Reply::Done`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum Reply {
    #[default]
    Done,
    RepeatPairing(RepeatPairing),
    Authorize(Authorize),
}

/// Repeat pairing decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum RepeatPairing {
    /// The stale bond was removed and pairing should be retried.
    Retry,
    /// Pairing should proceed as if no bond existed.
    Ignore,
}

/// Authorization decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum Authorize {
    Accept,
    Reject,
}

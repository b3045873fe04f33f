use std::collections::HashMap;
use std::fmt::Debug;

use parking_lot::Mutex;

use crate::le::Addr;

/// Bond keys for a peer device.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Keys {
    /// Long Term Key.
    pub ltk: [u8; 16],
    /// Encrypted diversifier (legacy pairing only).
    pub ediv: u16,
    /// Random number (legacy pairing only).
    pub rand: u64,
    /// Peer's Identity Resolving Key.
    pub irk: Option<[u8; 16]>,
    /// Whether the keys were generated with MITM protection.
    pub authenticated: bool,
    /// Whether the keys were generated with LE Secure Connections.
    pub secure_connections: bool,
}

#[cfg(test)]
impl Keys {
    /// Returns test keys.
    #[must_use]
    pub(crate) fn test() -> Self {
        Self {
            ltk: [0x11; 16],
            irk: Some([0x22; 16]),
            authenticated: true,
            secure_connections: true,
            ..Self::default()
        }
    }
}

/// Interface to persistent peer data storage.
pub trait PeerStore: Debug + Send + Sync {
    type Value;

    /// Saves peer data. Returns `false` if the data could not be saved.
    fn save(&self, peer: Addr, v: &Self::Value) -> bool;

    /// Loads peer data.
    fn load(&self, peer: Addr) -> Option<Self::Value>;

    /// Removes peer data.
    fn remove(&self, peer: Addr);

    /// Removes all peer data.
    fn clear(&self);
}

/// Bond storage.
pub type BondStore = dyn PeerStore<Value = Keys>;

/// Volatile bond storage.
#[derive(Debug, Default)]
pub struct MemStore(Mutex<HashMap<Addr, Keys>>);

impl MemStore {
    /// Returns the number of stored bonds.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Returns whether the store is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

impl PeerStore for MemStore {
    type Value = Keys;

    fn save(&self, peer: Addr, v: &Self::Value) -> bool {
        self.0.lock().insert(peer, v.clone());
        true
    }

    fn load(&self, peer: Addr) -> Option<Self::Value> {
        self.0.lock().get(&peer).cloned()
    }

    fn remove(&self, peer: Addr) {
        self.0.lock().remove(&peer);
    }

    fn clear(&self) {
        self.0.lock().clear();
    }
}

//! File system storage for bonded peers.
//!
//! Each peer is stored as a pretty-printed JSON file named after its identity
//! address (`P-` for public, `R-` for random addresses). I/O errors are logged
//! and reported to the caller as `false` or `None`.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::le::Addr;
use crate::smp::{Keys, PeerStore};

/// Bond store in a file system directory.
#[derive(Clone, Debug)]
#[repr(transparent)]
pub struct KeyStore(PathBuf);

impl KeyStore {
    const NAME: &'static str = "keys";

    /// Opens a bond store in the `keys` subdirectory of `root`. The directory
    /// is created on the first save.
    #[inline]
    #[must_use]
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self(root.as_ref().join(Self::NAME))
    }

    /// Opens a bond store in the current user's local data directory. Returns
    /// `None` if the user directory cannot be determined.
    #[must_use]
    pub fn per_user(app: impl AsRef<Path>) -> Option<Self> {
        let root = dirs::data_local_dir()?.join(app.as_ref());
        Some(Self::open(root))
    }

    /// Returns the store directory.
    #[inline(always)]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.0
    }

    /// Returns the file path for the specified peer.
    fn path(&self, peer: Addr) -> PathBuf {
        let (typ, raw) = match peer {
            Addr::Public(raw) => ('P', raw),
            Addr::Random(raw) => ('R', raw),
        };
        let b = raw.as_le_bytes();
        self.0.join(format!(
            "{typ}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        ))
    }
}

impl PeerStore for KeyStore {
    type Value = Keys;

    fn save(&self, peer: Addr, v: &Keys) -> bool {
        let s = match serde_json::to_string_pretty(v) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to serialize keys of {peer} ({e})");
                return false;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.0) {
            warn!("Failed to create key directory: {} ({e})", self.0.display());
        }
        let path = self.path(peer);
        let r = File::create(&path).and_then(|mut f| {
            f.write_all(s.as_bytes())?;
            f.sync_data()
        });
        match r {
            Ok(()) => {
                debug!("Wrote: {}", path.display());
                true
            }
            Err(e) => {
                error!("Failed to write: {} ({e})", path.display());
                false
            }
        }
    }

    fn load(&self, peer: Addr) -> Option<Keys> {
        let path = self.path(peer);
        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!("Failed to read: {} ({e})", path.display());
                return None;
            }
        };
        serde_json::from_str(&s)
            .map_err(|e| error!("Invalid file contents: {} ({e})", path.display()))
            .ok()
    }

    fn remove(&self, peer: Addr) {
        let path = self.path(peer);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed: {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => error!("Failed to remove: {} ({e})", path.display()),
        }
    }

    fn clear(&self) {
        match std::fs::remove_dir_all(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => error!("Failed to remove: {} ({e})", self.0.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::Builder;

    use crate::le::RawAddr;

    use super::*;

    const PEER: Addr = Addr::Public(RawAddr::from_le_bytes([0x55, 0x44, 0x33, 0x22, 0x11, 0x00]));

    #[test]
    fn save_load() {
        let tmp = (Builder::new().prefix("nodelink-test-").tempdir()).unwrap();
        let db = KeyStore::open(tmp.path());
        let keys = Keys::test();
        assert_eq!(db.load(PEER), None);
        assert!(db.save(PEER, &keys));
        assert!(tmp.path().join("keys/P-001122334455").exists());
        assert_eq!(db.load(PEER).unwrap(), keys);

        let rnd = Addr::Random(RawAddr::from_le_bytes([1, 0, 0, 0, 0, 0xC0]));
        assert!(db.save(rnd, &Keys::default()));
        assert!(tmp.path().join("keys/R-C00000000001").exists());

        db.remove(PEER);
        assert_eq!(db.load(PEER), None);
        db.remove(PEER);
        db.clear();
        assert!(!db.dir().exists());
    }

    #[test]
    fn invalid_contents() {
        let tmp = (Builder::new().prefix("nodelink-test-").tempdir()).unwrap();
        let db = KeyStore::open(tmp.path());
        std::fs::create_dir_all(db.dir()).unwrap();
        std::fs::write(db.dir().join("P-001122334455"), "{").unwrap();
        assert_eq!(db.load(PEER), None);
    }
}

//! Where the bridge document lives.
//!
//! A store moves raw document text; parsing is the poller's job, so a store
//! can hand back whatever garbage happens to be there.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::BridgeError;

pub trait BridgeStore {
    /// Replace the document.
    fn write(&self, body: &str) -> Result<(), BridgeError>;

    /// Current document text, or `None` if nothing has been written yet.
    fn read(&self) -> Result<Option<String>, BridgeError>;
}

impl<S: BridgeStore + ?Sized> BridgeStore for Box<S> {
    fn write(&self, body: &str) -> Result<(), BridgeError> {
        (**self).write(body)
    }
    fn read(&self) -> Result<Option<String>, BridgeError> {
        (**self).read()
    }
}

impl<S: BridgeStore + ?Sized> BridgeStore for Arc<S> {
    fn write(&self, body: &str) -> Result<(), BridgeError> {
        (**self).write(body)
    }
    fn read(&self) -> Result<Option<String>, BridgeError> {
        (**self).read()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FileBridge — a JSON file shared between processes
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct FileBridge {
    path: PathBuf,
}

impl FileBridge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBridge { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BridgeStore for FileBridge {
    /// Written to a sibling file and renamed into place, so readers see
    /// either the old document or the new one.
    fn write(&self, body: &str) -> Result<(), BridgeError> {
        let staging = self.staging_path();
        fs::write(&staging, body)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, BridgeError> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MemoryBridge — both ends in one process
// ════════════════════════════════════════════════════════════════════════════

/// Clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryBridge {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the document, as if it had never been written.
    pub fn clear(&self) -> Result<(), BridgeError> {
        *self.slot.lock().map_err(|_| BridgeError::Poisoned)? = None;
        Ok(())
    }
}

impl BridgeStore for MemoryBridge {
    fn write(&self, body: &str) -> Result<(), BridgeError> {
        *self.slot.lock().map_err(|_| BridgeError::Poisoned)? = Some(body.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, BridgeError> {
        Ok(self.slot.lock().map_err(|_| BridgeError::Poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_bridge_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let fb = FileBridge::new(dir.path().join("bridge.json"));
        assert!(fb.read().unwrap().is_none());
    }

    #[test]
    fn file_bridge_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let fb = FileBridge::new(dir.path().join("bridge.json"));
        fb.write("{\"status\":\"ONLINE\"}").unwrap();
        assert_eq!(fb.read().unwrap().as_deref(), Some("{\"status\":\"ONLINE\"}"));
        assert!(!fb.staging_path().exists());
    }

    #[test]
    fn memory_bridge_clones_share_slot() {
        let a = MemoryBridge::new();
        let b = a.clone();
        a.write("x").unwrap();
        assert_eq!(b.read().unwrap().as_deref(), Some("x"));
        b.clear().unwrap();
        assert!(a.read().unwrap().is_none());
    }
}

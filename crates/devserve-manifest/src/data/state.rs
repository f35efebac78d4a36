//! Process-wide state shared by every request.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// File under `<project>/.expo/` holding the persisted host id.
pub const HOST_ID_FILE: &str = "devserve-host.json";

/// Account handle of a project owner, without the leading `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerHandle(String);

impl OwnerHandle {
    pub fn new(handle: impl AsRef<str>) -> Self {
        Self(handle.as_ref().trim_start_matches('@').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// `(ErrorKind, OwnerHandle)` pairs already warned about.
///
/// Grows for the life of the process and is never pruned; its size is
/// bounded by the number of distinct projects touched in one session.
#[derive(Debug, Default)]
pub struct WarningMemo {
    seen: Mutex<HashSet<(ErrorKind, OwnerHandle)>>,
}

impl WarningMemo {
    /// Record the pair; `true` if it was not already present.
    pub fn insert_if_absent(&self, kind: ErrorKind, owner: &OwnerHandle) -> bool {
        self.seen.lock().insert((kind, owner.clone()))
    }

    pub fn contains(&self, kind: ErrorKind, owner: &OwnerHandle) -> bool {
        self.seen.lock().contains(&(kind, owner.clone()))
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

/// Offline flag, host id and warning memo, built once per process and shared
/// through an `Arc`.
///
/// Once a recoverable remote failure sets the offline flag, every later
/// request skips the network and serves anonymously until the flag is reset
/// explicitly. Two requests racing to set it is harmless.
#[derive(Debug)]
pub struct RuntimeState {
    offline: AtomicBool,
    host_id: Uuid,
    warnings: WarningMemo,
}

impl RuntimeState {
    pub fn new(host_id: Uuid) -> Self {
        Self {
            offline: AtomicBool::new(false),
            host_id,
            warnings: WarningMemo::default(),
        }
    }

    /// Start offline, e.g. when the environment override is set.
    #[must_use]
    pub fn with_offline(self, offline: bool) -> Self {
        self.offline.store(offline, Ordering::Relaxed);
        self
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }

    pub fn set_offline(&self) {
        self.offline.store(true, Ordering::Relaxed);
    }

    /// Clear the flag so the next request tries the network again.
    pub fn reset_offline(&self) {
        self.offline.store(false, Ordering::Relaxed);
    }

    pub fn host_id(&self) -> Uuid {
        self.host_id
    }

    pub fn warnings(&self) -> &WarningMemo {
        &self.warnings
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostIdFile {
    host_id: Uuid,
}

/// Read the host id persisted under `state_dir`, creating one on first use so
/// anonymous scope keys stay stable across restarts.
pub fn load_or_create_host_id(state_dir: &Path) -> std::io::Result<Uuid> {
    let path = state_dir.join(HOST_ID_FILE);
    if let Ok(text) = std::fs::read_to_string(&path) {
        match serde_json::from_str::<HostIdFile>(&text) {
            Ok(file) => return Ok(file.host_id),
            Err(e) => tracing::debug!("ignoring unreadable {}: {e}", path.display()),
        }
    }

    let file = HostIdFile {
        host_id: Uuid::new_v4(),
    };
    std::fs::create_dir_all(state_dir)?;
    std::fs::write(&path, serde_json::to_vec_pretty(&file)?)?;
    Ok(file.host_id)
}

//! Absorbs recoverable remote failures by switching the process offline.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::data::{OwnerHandle, RuntimeState};
use crate::error::{ErrorKind, ManifestError, Result};

/// Where terminal warnings go.
pub trait WarningSink: Send + Sync {
    fn warn(&self, kind: ErrorKind, owner: &OwnerHandle, message: &str);
}

/// Emits warnings through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWarnings;

impl WarningSink for TracingWarnings {
    fn warn(&self, kind: ErrorKind, owner: &OwnerHandle, message: &str) {
        warn!(?kind, owner = owner.as_str(), "{message}");
    }
}

impl<T: WarningSink + ?Sized> WarningSink for Arc<T> {
    fn warn(&self, kind: ErrorKind, owner: &OwnerHandle, message: &str) {
        (**self).warn(kind, owner, message);
    }
}

/// User-facing text for a recoverable failure.
pub fn warning_message(kind: ErrorKind, owner: &OwnerHandle, detail: &str) -> String {
    match kind {
        ErrorKind::PermissionDenied => format!(
            "{owner} has not been granted the appropriate permissions to view this project or \
             the account that owns it ({detail}). Falling back to offline mode; the manifest \
             is served with an anonymous scope key."
        ),
        ErrorKind::Unreachable => format!(
            "Could not reach the Expo API while resolving the project owned by {owner} \
             ({detail}). Falling back to offline mode; the manifest is served with an \
             anonymous scope key."
        ),
        other => format!("{other:?} while resolving the project owned by {owner}: {detail}"),
    }
}

/// Guards network-dependent steps.
///
/// Recoverable failures set the offline flag and are warned about once per
/// `(ErrorKind, OwnerHandle)`. Everything else propagates.
#[derive(Debug)]
pub struct OfflineFallback<W> {
    state: Arc<RuntimeState>,
    sink: W,
}

impl<W: WarningSink> OfflineFallback<W> {
    pub fn new(state: Arc<RuntimeState>, sink: W) -> Self {
        Self { state, sink }
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Run `op` unless the process is already offline.
    ///
    /// `Ok(None)` means the caller should continue anonymously: either the
    /// call was skipped or it failed recoverably.
    pub async fn guard<T, E, F, Fut>(&self, owner: &OwnerHandle, op: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<ManifestError>,
    {
        if self.state.is_offline() {
            debug!(owner = owner.as_str(), "offline; skipping network call");
            return Ok(None);
        }

        match op().await.map_err(Into::into) {
            Ok(value) => Ok(Some(value)),
            Err(e) => match e.kind().filter(ErrorKind::is_recoverable) {
                Some(kind) => {
                    self.record(kind, owner, &e);
                    Ok(None)
                }
                None => Err(e),
            },
        }
    }

    fn record(&self, kind: ErrorKind, owner: &OwnerHandle, error: &ManifestError) {
        let detail = match error {
            ManifestError::Remote(remote) => remote.detail().to_string(),
            other => other.to_string(),
        };
        if self.state.warnings().insert_if_absent(kind, owner) {
            self.sink.warn(kind, owner, &warning_message(kind, owner, &detail));
        } else {
            debug!(?kind, owner = owner.as_str(), "{detail}");
        }
        self.state.set_offline();
    }
}

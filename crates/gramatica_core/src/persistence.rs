//! crates/gramatica_core/src/persistence.rs
//!
//! Save, load and discard rules for session snapshots and the mute preference.
//!
//! Storage is best-effort: every failure is logged and swallowed, and anything
//! that cannot be decoded at load time is treated as absent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{InvariantViolation, SessionState, SessionStatus};
use crate::ports::SnapshotStore;

/// Key of the in-progress session snapshot.
pub const SNAPSHOT_KEY: &str = "gramatica_magica_progress";

/// Key of the mute preference, stored as `"true"` or `"false"`.
pub const MUTED_KEY: &str = "gramatica_magica_muted";

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Snapshot version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("Snapshot breaks a session invariant: {0}")]
    Invariant(#[from] InvariantViolation),
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: &'a SessionState,
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    version: u32,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    state: SessionState,
}

/// Serializes a state into the stored snapshot format.
pub fn encode_snapshot(state: &SessionState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        state,
    })
}

/// Parses a stored snapshot and checks the session invariants.
pub fn decode_snapshot(blob: &str) -> Result<SessionState, SnapshotError> {
    let envelope: SnapshotEnvelope = serde_json::from_str(blob)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(envelope.version));
    }
    envelope.state.validate()?;
    Ok(envelope.state)
}

/// Applies the snapshot rules on top of a device's [`SnapshotStore`].
#[derive(Clone)]
pub struct SnapshotRepository {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotRepository {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Mirrors a freshly mutated state into storage: nothing before a session
    /// starts, deletion on completion, a full snapshot otherwise.
    pub fn sync(&self, state: &SessionState) {
        match state.status() {
            SessionStatus::NotStarted => {}
            SessionStatus::Completed => self.discard(),
            _ => self.save(state),
        }
    }

    pub fn save(&self, state: &SessionState) {
        let blob = match encode_snapshot(state) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to encode session snapshot: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.save(SNAPSHOT_KEY, &blob) {
            warn!("Snapshot save skipped: {}", e);
        }
    }

    pub fn discard(&self) {
        if let Err(e) = self.store.delete(SNAPSHOT_KEY) {
            warn!("Failed to delete session snapshot: {}", e);
        }
    }

    /// The stored session, if there is one worth offering for resumption.
    pub fn load_resumable(&self) -> Option<SessionState> {
        let blob = match self.store.load(SNAPSHOT_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read session snapshot: {}", e);
                return None;
            }
        };

        match decode_snapshot(&blob) {
            Ok(state) if state.is_resumable() => Some(state),
            Ok(state) => {
                debug!(
                    status = %state.status(),
                    answered = state.questions_answered(),
                    "Stored snapshot is not resumable."
                );
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable session snapshot: {}", e);
                None
            }
        }
    }

    pub fn load_muted(&self) -> bool {
        match self.store.load(MUTED_KEY) {
            Ok(value) => value.as_deref().map(str::trim) == Some("true"),
            Err(e) => {
                warn!("Failed to read mute preference: {}", e);
                false
            }
        }
    }

    pub fn save_muted(&self, muted: bool) {
        if let Err(e) = self.store.save(MUTED_KEY, if muted { "true" } else { "false" }) {
            warn!("Failed to store mute preference: {}", e);
        }
    }
}

//! crates/gramatica_core/src/ports.rs
//!
//! Defines the service contracts (traits) for every external collaborator of the
//! quiz core. These traits form the boundary of the hexagonal architecture, so the
//! core stays independent of the content API, the audio device and the storage
//! medium actually in use.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Difficulty, GeneratedQuestion};
use crate::transition::TransitionPhase;
use crate::view::SessionView;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, disk, parsing).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Remote Content Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Generates one multiple-choice question on `topic` at `difficulty`.
    async fn generate_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> PortResult<GeneratedQuestion>;

    /// Generates a short congratulatory message for the final score.
    async fn generate_summary(&self, score: u32, total: u32) -> PortResult<String>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text. `Ok(None)` means the provider
    /// had nothing to say, which is not an error.
    async fn generate_audio(&self, text: &str) -> PortResult<Option<Vec<u8>>>;
}

//=========================================================================================
// Local Fire-and-Forget Ports (Traits)
//=========================================================================================

/// Short sound effects played on user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundEffect {
    Click,
    Success,
    Failure,
}

/// Audio playback owned by the presentation side. Nothing here reports back.
pub trait AudioOutput: Send + Sync {
    fn play_narration(&self, audio: Vec<u8>);
    fn stop_narration(&self);
    fn set_muted(&self, muted: bool);
    fn play_effect(&self, effect: SoundEffect);
    fn start_ambient(&self);
    fn stop_ambient(&self);
}

/// Best-effort key-value blob storage for a single device.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, key: &str, blob: &str) -> PortResult<()>;
    fn load(&self, key: &str) -> PortResult<Option<String>>;
    fn delete(&self, key: &str) -> PortResult<()>;
}

/// Receives state snapshots and transition signals for rendering.
pub trait SessionPresenter: Send + Sync {
    fn show(&self, view: &SessionView);
    fn transition(&self, phase: TransitionPhase);
    fn report_error(&self, message: &str);
}

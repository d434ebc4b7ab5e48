//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection runtime wiring.

use crate::{
    adapters::FileSnapshotStore,
    config::Config,
    web::client::{Outbound, WsAudioOutput, WsPresenter},
};
use gramatica_core::{
    ports::{ContentProvider, PortResult, TextToSpeechService},
    QuizPorts, QuizRuntime, RuntimeSettings,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub content_adapter: Arc<dyn ContentProvider>,
    pub tts_adapter: Arc<dyn TextToSpeechService>,
}

impl AppState {
    /// The snapshot store of one device.
    pub fn device_store(&self, device_id: &str) -> PortResult<FileSnapshotStore> {
        FileSnapshotStore::for_device(&self.config.data_dir, device_id)
    }

    /// Builds the runtime that serves one connection. The audio output and the
    /// presenter live as long as the runtime and write to `tx`.
    pub fn connect_runtime(&self, device_id: &str, tx: &Outbound) -> PortResult<Arc<QuizRuntime>> {
        let store = self.device_store(device_id)?;
        let ports = QuizPorts {
            content: self.content_adapter.clone(),
            tts: self.tts_adapter.clone(),
            audio: Arc::new(WsAudioOutput::new(tx.clone())),
            store: Arc::new(store),
            presenter: Arc::new(WsPresenter::new(tx.clone())),
        };
        Ok(QuizRuntime::new(
            ports,
            RuntimeSettings {
                settle_delay: self.config.transition_settle,
                rng_seed: None,
            },
        ))
    }
}

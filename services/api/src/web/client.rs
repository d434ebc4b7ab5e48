//! services/api/src/web/client.rs
//!
//! The browser side of a connection, seen through the core's output ports.
//! Every call turns into a frame on the connection's outbound channel; the
//! writer task owns the socket, so nothing here ever blocks.

use crate::web::protocol::ServerMessage;
use axum::extract::ws::Message;
use gramatica_core::{AudioOutput, SessionPresenter, SessionView, SoundEffect, TransitionPhase};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

/// Outbound half of a connection.
pub type Outbound = UnboundedSender<Message>;

/// Serializes and queues one protocol message.
pub fn send_message(tx: &Outbound, msg: &ServerMessage) {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return;
        }
    };
    if tx.send(Message::Text(json.into())).is_err() {
        debug!("Connection closed; dropping outbound message.");
    }
}

//=========================================================================================
// Audio Output
//=========================================================================================

/// Plays audio on the connected browser. Muting is enforced here as well as on
/// the client, so a muted device never receives sound.
pub struct WsAudioOutput {
    tx: Outbound,
    muted: AtomicBool,
}

impl WsAudioOutput {
    pub fn new(tx: Outbound) -> Self {
        Self {
            tx,
            muted: AtomicBool::new(false),
        }
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }
}

impl AudioOutput for WsAudioOutput {
    fn play_narration(&self, audio: Vec<u8>) {
        if self.is_muted() {
            return;
        }
        if self.tx.send(Message::Binary(audio.into())).is_err() {
            debug!("Connection closed; dropping narration audio.");
        }
    }

    fn stop_narration(&self) {
        send_message(&self.tx, &ServerMessage::StopNarration);
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
        send_message(&self.tx, &ServerMessage::Muted { muted });
    }

    fn play_effect(&self, effect: SoundEffect) {
        if !self.is_muted() {
            send_message(&self.tx, &ServerMessage::PlayEffect { effect });
        }
    }

    fn start_ambient(&self) {
        if !self.is_muted() {
            send_message(&self.tx, &ServerMessage::Ambient { playing: true });
        }
    }

    fn stop_ambient(&self) {
        send_message(&self.tx, &ServerMessage::Ambient { playing: false });
    }
}

//=========================================================================================
// Presenter
//=========================================================================================

pub struct WsPresenter {
    tx: Outbound,
}

impl WsPresenter {
    pub fn new(tx: Outbound) -> Self {
        Self { tx }
    }
}

impl SessionPresenter for WsPresenter {
    fn show(&self, view: &SessionView) {
        send_message(&self.tx, &ServerMessage::State { view: view.clone() });
    }

    fn transition(&self, phase: TransitionPhase) {
        send_message(&self.tx, &ServerMessage::Transition { phase });
    }

    fn report_error(&self, message: &str) {
        send_message(
            &self.tx,
            &ServerMessage::Error {
                message: message.to_string(),
            },
        );
    }
}

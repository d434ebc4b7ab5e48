//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the grammar quiz.

use gramatica_core::{Difficulty, SessionView, SoundEffect, TransitionPhase};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Binds the connection to a device's saved progress. This must be the first
    /// message sent on the connection.
    Init { device_id: String },

    /// Begins a fresh session at the chosen difficulty.
    StartSession { difficulty: Difficulty },

    /// Continues the saved session offered at startup.
    ResumeSession,

    UseHint,

    SubmitAnswer { index: usize },

    /// Leaves the feedback screen for the next question.
    Continue,

    /// Returns from the end screen to the start screen.
    Restart,

    SetMuted { muted: bool },

    StopNarration,

    /// Asks for the start screen greeting to be read aloud.
    ReadGreeting,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// NOTE: Narration audio is sent as raw Binary frames (WAV), not as part of this enum.
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the connection is bound to a device.
    SessionInitialized {
        device_id: String,
        resumable: bool,
        muted: bool,
    },

    /// The complete view after every state change.
    State { view: SessionView },

    /// The current screen should start leaving, or the new one entering.
    Transition { phase: TransitionPhase },

    /// A message the client should display to the user.
    Error { message: String },

    PlayEffect { effect: SoundEffect },

    /// Any narration still playing must stop now.
    StopNarration,

    /// Starts or stops the background music loop.
    Ambient { playing: bool },

    Muted { muted: bool },
}

//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection owns one quiz runtime; every client message becomes a runtime
//! intent, and everything the runtime emits flows back through a writer task.

use crate::web::{
    client::{send_message, Outbound},
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use gramatica_core::{QuizRuntime, TransitionError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // The writer task is the only owner of the socket's sending half.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                debug!("Socket closed; stopping writer.");
                break;
            }
        }
    });

    // --- 1. Initialization Phase ---
    let device_id = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
                Ok(ClientMessage::Init { device_id }) => device_id,
                _ => {
                    error!("First message was not a valid Init message.");
                    send_error(&tx, "The first message must be 'init'.");
                    close(tx, writer).await;
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            writer.abort();
            return;
        }
    };

    let runtime = match app_state.connect_runtime(&device_id, &tx) {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Refusing connection for device '{}': {}", device_id, e);
            send_error(&tx, "Invalid device id.");
            close(tx, writer).await;
            return;
        }
    };

    info!("Initializing quiz for device: {}", device_id);
    let report = runtime.initialize().await;
    send_message(
        &tx,
        &ServerMessage::SessionInitialized {
            device_id,
            resumable: report.resumable,
            muted: report.muted,
        },
    );

    // --- 2. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    // Each intent runs on its own task so overlapping requests reach
                    // the transition coordinator, which ignores them while busy.
                    Ok(msg) => {
                        let runtime = runtime.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move { handle_client_message(msg, &runtime, &tx).await });
                    }
                    Err(e) => warn!("Failed to deserialize client message: {}", e),
                }
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    runtime.shutdown();
    writer.abort();
    info!("WebSocket connection closed.");
}

/// Maps one client message onto the matching runtime intent.
async fn handle_client_message(msg: ClientMessage, runtime: &Arc<QuizRuntime>, tx: &Outbound) {
    let result = match msg {
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
            Ok(())
        }
        ClientMessage::StartSession { difficulty } => runtime.start_session(difficulty).await,
        ClientMessage::ResumeSession => runtime.resume_session().await,
        ClientMessage::UseHint => runtime.use_hint().await,
        ClientMessage::SubmitAnswer { index } => runtime.submit_answer(index).await,
        ClientMessage::Continue => runtime.continue_session().await,
        ClientMessage::Restart => runtime.restart().await,
        ClientMessage::SetMuted { muted } => {
            runtime.set_muted(muted);
            Ok(())
        }
        ClientMessage::StopNarration => {
            runtime.stop_narration();
            Ok(())
        }
        ClientMessage::ReadGreeting => {
            runtime.read_greeting().await;
            Ok(())
        }
    };

    match result {
        Ok(()) => {}
        Err(TransitionError::Busy) => debug!("Ignoring request while a transition is pending."),
        Err(TransitionError::Session(e)) => {
            warn!("Rejected client request: {}", e);
            send_error(tx, &e.to_string());
        }
    }
}

fn send_error(tx: &Outbound, message: &str) {
    send_message(
        tx,
        &ServerMessage::Error {
            message: message.to_string(),
        },
    );
}

/// Flushes what is already queued, then lets the writer finish.
async fn close(tx: Outbound, writer: tokio::task::JoinHandle<()>) {
    drop(tx);
    if let Err(e) = writer.await {
        debug!("Writer task ended abnormally: {}", e);
    }
}

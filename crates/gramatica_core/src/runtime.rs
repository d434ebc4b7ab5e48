//! crates/gramatica_core/src/runtime.rs
//!
//! Drives one quiz session: turns user intents into machine events, runs them
//! through the transition coordinator, and carries out the resulting effects
//! against the ports.
//!
//! Content and narration requests run as spawned tasks. They are single-shot:
//! a failed question is reported to the user, a failed summary is replaced by a
//! default message, and a failed narration is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{ContentError, Difficulty, Question};
use crate::persistence::SnapshotRepository;
use crate::ports::{
    AudioOutput, ContentProvider, SessionPresenter, SnapshotStore, SoundEffect,
    TextToSpeechService,
};
use crate::session::{Effect, SessionEvent, SessionMachine, DEFAULT_SUMMARY_MESSAGE};
use crate::transition::{
    TransitionCoordinator, TransitionError, TransitionObserver, TransitionPhase,
    DEFAULT_SETTLE_DELAY,
};
use crate::view::SessionView;

const GREETING: &str =
    "Olá aventureiro! Escolhe um nível de dificuldade para começares a tua aventura gramatical!";
const GREETING_WITH_SAVED_GAME: &str =
    "Olá de novo! Queres continuar a tua aventura ou preferes começar um novo desafio?";

/// Every collaborator a runtime talks to.
#[derive(Clone)]
pub struct QuizPorts {
    pub content: Arc<dyn ContentProvider>,
    pub tts: Arc<dyn TextToSpeechService>,
    pub audio: Arc<dyn AudioOutput>,
    pub store: Arc<dyn SnapshotStore>,
    pub presenter: Arc<dyn SessionPresenter>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub settle_delay: Duration,
    /// Fixes the randomness source (topics, hint elimination) when set.
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            rng_seed: None,
        }
    }
}

/// What the presentation layer needs to know right after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartupReport {
    pub resumable: bool,
    pub muted: bool,
}

pub struct QuizRuntime {
    machine: Mutex<SessionMachine>,
    coordinator: TransitionCoordinator,
    snapshots: SnapshotRepository,
    content: Arc<dyn ContentProvider>,
    tts: Arc<dyn TextToSpeechService>,
    audio: Arc<dyn AudioOutput>,
    presenter: Arc<dyn SessionPresenter>,
    /// Cancels the narration currently being generated.
    narration: ArcSwap<CancellationToken>,
    muted: AtomicBool,
}

impl QuizRuntime {
    pub fn new(ports: QuizPorts, settings: RuntimeSettings) -> Arc<Self> {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Arc::new(Self {
            machine: Mutex::new(SessionMachine::new(Box::new(rng))),
            coordinator: TransitionCoordinator::new(settings.settle_delay),
            snapshots: SnapshotRepository::new(ports.store),
            content: ports.content,
            tts: ports.tts,
            audio: ports.audio,
            presenter: ports.presenter,
            narration: ArcSwap::from_pointee(CancellationToken::new()),
            muted: AtomicBool::new(false),
        })
    }

    //-------------------------------------------------------------------------------------
    // Lifecycle
    //-------------------------------------------------------------------------------------

    /// Restores the mute preference and offers any resumable stored session.
    pub async fn initialize(&self) -> StartupReport {
        let muted = self.snapshots.load_muted();
        self.muted.store(muted, Ordering::Release);
        self.audio.set_muted(muted);
        if !muted {
            self.audio.start_ambient();
        }

        let mut machine = self.machine.lock().await;
        machine.offer_resume(self.snapshots.load_resumable());
        let report = StartupReport {
            resumable: machine.resumable().is_some(),
            muted,
        };
        self.presenter.show(&SessionView::from(&*machine));
        info!(
            resumable = report.resumable,
            muted = report.muted,
            "Quiz runtime initialized."
        );
        report
    }

    /// Silences everything owned by this runtime.
    pub fn shutdown(&self) {
        self.narration.load().cancel();
        self.audio.stop_narration();
        self.audio.stop_ambient();
        info!("Quiz runtime shut down.");
    }

    //-------------------------------------------------------------------------------------
    // User intents
    //-------------------------------------------------------------------------------------

    pub async fn start_session(self: &Arc<Self>, difficulty: Difficulty) -> Result<(), TransitionError> {
        info!(difficulty = %difficulty, "Starting a new session.");
        self.audio.play_effect(SoundEffect::Click);
        self.dispatch(SessionEvent::StartSession(difficulty)).await
    }

    pub async fn resume_session(self: &Arc<Self>) -> Result<(), TransitionError> {
        info!("Resuming saved session.");
        self.audio.play_effect(SoundEffect::Click);
        self.dispatch(SessionEvent::ResumeSession).await
    }

    pub async fn submit_answer(self: &Arc<Self>, index: usize) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::SubmitAnswer(index)).await
    }

    pub async fn continue_session(self: &Arc<Self>) -> Result<(), TransitionError> {
        self.audio.play_effect(SoundEffect::Click);
        self.dispatch(SessionEvent::Continue).await
    }

    pub async fn restart(self: &Arc<Self>) -> Result<(), TransitionError> {
        self.audio.play_effect(SoundEffect::Click);
        self.dispatch(SessionEvent::RestartRequested).await
    }

    pub async fn use_hint(self: &Arc<Self>) -> Result<(), TransitionError> {
        let effects = self
            .coordinator
            .apply_now(&self.machine, SessionEvent::UseHint, &**self)
            .await?;
        self.execute(effects);
        Ok(())
    }

    /// Reads the start screen greeting aloud.
    pub async fn read_greeting(self: &Arc<Self>) {
        let has_saved_game = self.machine.lock().await.resumable().is_some();
        let text = if has_saved_game {
            GREETING_WITH_SAVED_GAME
        } else {
            GREETING
        };
        self.narrate(text.to_string());
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
        self.audio.set_muted(muted);
        if muted {
            self.stop_narration();
            self.audio.stop_ambient();
        } else {
            self.audio.start_ambient();
        }
        self.snapshots.save_muted(muted);
        debug!(muted, "Mute preference changed.");
    }

    pub fn stop_narration(&self) {
        self.narration.load().cancel();
        self.audio.stop_narration();
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn is_transitioning(&self) -> bool {
        self.coordinator.is_pending()
    }

    pub async fn view(&self) -> SessionView {
        SessionView::from(&*self.machine.lock().await)
    }

    //-------------------------------------------------------------------------------------
    // Effect execution
    //-------------------------------------------------------------------------------------

    async fn dispatch(self: &Arc<Self>, event: SessionEvent) -> Result<(), TransitionError> {
        let effects = self
            .coordinator
            .dispatch(&self.machine, event, &**self)
            .await?;
        self.execute(effects);
        Ok(())
    }

    async fn apply_provider_result(self: &Arc<Self>, event: SessionEvent) {
        let failed = matches!(event, SessionEvent::ContentFailed(_));
        match self
            .coordinator
            .apply_external(&self.machine, event, &**self)
            .await
        {
            Ok(effects) => self.execute(effects),
            Err(e) => warn!("Discarding content that arrived out of turn: {}", e),
        }

        // The stored progress survives a failed fetch, so offer it again.
        if failed {
            let mut machine = self.machine.lock().await;
            machine.offer_resume(self.snapshots.load_resumable());
            self.presenter.show(&SessionView::from(&*machine));
        }
    }

    fn execute(self: &Arc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RequestQuestion { topic, difficulty } => {
                    self.spawn_question_request(topic, difficulty)
                }
                Effect::RequestSummary { score, total } => {
                    self.spawn_summary_request(score, total)
                }
                Effect::Narrate(text) => self.narrate(text),
                Effect::PlayEffect(sound) => self.audio.play_effect(sound),
                Effect::ReportError(message) => self.presenter.report_error(&message),
                Effect::DiscardSnapshot => self.snapshots.discard(),
            }
        }
    }

    fn spawn_question_request(self: &Arc<Self>, topic: String, difficulty: Difficulty) {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            info!(topic = %topic, difficulty = %difficulty, "Requesting question.");
            let result = runtime
                .content
                .generate_question(&topic, difficulty)
                .await
                .map_err(|e| ContentError::Provider(e.to_string()))
                .and_then(|generated| Question::from_generated(generated, &topic, difficulty));

            let event = match result {
                Ok(question) => SessionEvent::ContentReady(question),
                Err(e) => {
                    error!("Failed to load question: {}", e);
                    SessionEvent::ContentFailed(e.to_string())
                }
            };
            runtime.apply_provider_result(event).await;
        });
    }

    fn spawn_summary_request(self: &Arc<Self>, score: u32, total: u32) {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            let message = match runtime.content.generate_summary(score, total).await {
                Ok(message) if !message.trim().is_empty() => message.trim().to_string(),
                Ok(_) => {
                    warn!("Summary message was empty; using the default.");
                    DEFAULT_SUMMARY_MESSAGE.to_string()
                }
                Err(e) => {
                    warn!("Summary generation failed; using the default: {}", e);
                    DEFAULT_SUMMARY_MESSAGE.to_string()
                }
            };
            runtime
                .apply_provider_result(SessionEvent::SummaryReady(message))
                .await;
        });
    }

    /// Starts best-effort narration of `text`, replacing any narration that is
    /// still being generated.
    fn narrate(self: &Arc<Self>, text: String) {
        if self.is_muted() {
            return;
        }
        let token = CancellationToken::new();
        self.narration.swap(Arc::new(token.clone())).cancel();

        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Narration cancelled before its audio arrived.");
                }
                result = runtime.tts.generate_audio(&text) => match result {
                    Ok(Some(audio)) if !token.is_cancelled() => runtime.audio.play_narration(audio),
                    Ok(Some(_)) => debug!("Dropping narration that was cancelled."),
                    Ok(None) => debug!("No narration audio was produced."),
                    Err(e) => warn!("Narration skipped: {}", e),
                },
            }
        });
    }
}

impl TransitionObserver for QuizRuntime {
    fn on_exit(&self, _machine: &SessionMachine) {
        self.stop_narration();
        self.presenter.transition(TransitionPhase::Exiting);
    }

    fn on_commit(&self, machine: &SessionMachine) {
        self.snapshots.sync(machine.state());
        self.presenter.show(&SessionView::from(machine));
    }

    fn on_enter(&self, _machine: &SessionMachine) {
        self.presenter.transition(TransitionPhase::Entering);
    }
}

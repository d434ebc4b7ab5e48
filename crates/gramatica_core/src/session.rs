//! crates/gramatica_core/src/session.rs
//!
//! The session state machine. It owns the single source of truth for where the
//! user is in a ten-question session and is the only place that mutates it.
//!
//! `apply` never performs I/O. It returns the [`Effect`]s the caller must carry
//! out (fetch content, narrate, play a sound), which keeps every transition
//! atomic and testable without any collaborator.

use rand::{Rng, RngCore};
use tracing::debug;

use crate::domain::{
    AnswerRecord, Difficulty, Question, SessionState, SessionStatus, GRAMMAR_TOPICS,
    OPTION_COUNT, SESSION_LENGTH,
};
use crate::ports::SoundEffect;

/// Substituted when the summary message cannot be generated.
pub const DEFAULT_SUMMARY_MESSAGE: &str =
    "Parabéns! Chegaste ao fim do desafio e a tua gramática está cada vez mais forte! 🎉🏆";

/// Shown to the user when a question cannot be loaded.
pub const CONTENT_ERROR_MESSAGE: &str =
    "Ups! Ocorreu um erro ao carregar o desafio. Tenta novamente.";

//=========================================================================================
// Events, Effects and Errors
//=========================================================================================

/// Everything that can move the session forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StartSession(Difficulty),
    ResumeSession,
    ContentReady(Question),
    ContentFailed(String),
    UseHint,
    SubmitAnswer(usize),
    Continue,
    SummaryReady(String),
    RestartRequested,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StartSession(_) => "start_session",
            SessionEvent::ResumeSession => "resume_session",
            SessionEvent::ContentReady(_) => "content_ready",
            SessionEvent::ContentFailed(_) => "content_failed",
            SessionEvent::UseHint => "use_hint",
            SessionEvent::SubmitAnswer(_) => "submit_answer",
            SessionEvent::Continue => "continue",
            SessionEvent::SummaryReady(_) => "summary_ready",
            SessionEvent::RestartRequested => "restart_requested",
        }
    }
}

/// Work requested by a transition, executed by the runtime after it commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestQuestion { topic: String, difficulty: Difficulty },
    RequestSummary { score: u32, total: u32 },
    Narrate(String),
    PlayEffect(SoundEffect),
    ReportError(String),
    DiscardSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Event '{event}' is not valid while {status}")]
    InvalidTransition {
        event: &'static str,
        status: SessionStatus,
    },
    #[error("No saved session is available to resume")]
    NoResumableSession,
    #[error("Option {0} does not exist")]
    OptionOutOfRange(usize),
    #[error("Option {0} was eliminated by the hint")]
    OptionEliminated(usize),
}

//=========================================================================================
// The State Machine
//=========================================================================================

/// Session state plus the question-local and startup-only data around it.
///
/// `hint_used` inside the state rations hints per session; `eliminated_option`
/// records which option the hint removed and only lives as long as the current
/// question.
pub struct SessionMachine {
    state: SessionState,
    eliminated_option: Option<usize>,
    resumable: Option<SessionState>,
    summary_message: Option<String>,
    rng: Box<dyn RngCore + Send>,
}

impl SessionMachine {
    pub fn new(rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            state: SessionState::default(),
            eliminated_option: None,
            resumable: None,
            summary_message: None,
            rng,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn eliminated_option(&self) -> Option<usize> {
        self.eliminated_option
    }

    pub fn resumable(&self) -> Option<&SessionState> {
        self.resumable.as_ref()
    }

    pub fn summary_message(&self) -> Option<&str> {
        self.summary_message.as_deref()
    }

    /// True while waiting for the end-of-session message rather than a question.
    pub fn awaiting_summary(&self) -> bool {
        self.state.status == SessionStatus::AwaitingContent && self.state.is_finished()
    }

    /// Correctness of the answer being shown as feedback.
    pub fn last_answer_correct(&self) -> Option<bool> {
        if self.state.status != SessionStatus::ShowingFeedback {
            return None;
        }
        self.state.history.last().map(|record| record.is_correct)
    }

    /// Offers a previously stored session for resumption. Only taken into account
    /// before a session is running, and only for states that are worth resuming.
    pub fn offer_resume(&mut self, snapshot: Option<SessionState>) {
        if self.state.status != SessionStatus::NotStarted {
            return;
        }
        self.resumable = snapshot.filter(|s| s.is_resumable() && s.validate().is_ok());
    }

    /// Checks whether `event` would be accepted, without changing anything.
    pub fn accepts(&self, event: &SessionEvent) -> Result<(), SessionError> {
        let status = self.state.status;
        let allowed = match event {
            SessionEvent::StartSession(_) => status == SessionStatus::NotStarted,
            SessionEvent::ResumeSession => {
                if status == SessionStatus::NotStarted && self.resumable.is_none() {
                    return Err(SessionError::NoResumableSession);
                }
                status == SessionStatus::NotStarted
            }
            SessionEvent::ContentReady(_) | SessionEvent::ContentFailed(_) => {
                status == SessionStatus::AwaitingContent && !self.awaiting_summary()
            }
            SessionEvent::SummaryReady(_) => self.awaiting_summary(),
            SessionEvent::UseHint => {
                status == SessionStatus::AnsweringQuestion
                    && self.state.current_question.is_some()
            }
            SessionEvent::SubmitAnswer(index) => {
                if status == SessionStatus::AnsweringQuestion
                    && self.state.current_question.is_some()
                {
                    if *index >= OPTION_COUNT {
                        return Err(SessionError::OptionOutOfRange(*index));
                    }
                    if self.eliminated_option == Some(*index) {
                        return Err(SessionError::OptionEliminated(*index));
                    }
                    true
                } else {
                    false
                }
            }
            SessionEvent::Continue => status == SessionStatus::ShowingFeedback,
            SessionEvent::RestartRequested => status == SessionStatus::Completed,
        };

        if allowed {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                event: event.name(),
                status,
            })
        }
    }

    /// Applies `event` atomically. On error nothing has changed.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Vec<Effect>, SessionError> {
        self.accepts(&event)?;
        let from = self.state.status;
        let event_name = event.name();

        let effects = match event {
            SessionEvent::StartSession(difficulty) => {
                self.state = SessionState::started(difficulty);
                self.eliminated_option = None;
                self.resumable = None;
                self.summary_message = None;
                vec![self.next_question_request()]
            }
            SessionEvent::ResumeSession => {
                let snapshot = self
                    .resumable
                    .take()
                    .ok_or(SessionError::NoResumableSession)?;
                self.state = snapshot;
                self.eliminated_option = None;
                self.summary_message = None;
                self.resume_effects()
            }
            SessionEvent::ContentReady(question) => {
                let narration = question_narration(&question);
                self.state.current_question = Some(question);
                self.state.status = SessionStatus::AnsweringQuestion;
                self.eliminated_option = None;
                vec![Effect::Narrate(narration)]
            }
            SessionEvent::ContentFailed(reason) => {
                debug!(reason = %reason, "Question request failed; returning to start.");
                self.state.current_question = None;
                self.state.status = SessionStatus::NotStarted;
                self.eliminated_option = None;
                vec![Effect::ReportError(CONTENT_ERROR_MESSAGE.to_string())]
            }
            SessionEvent::UseHint => self.reveal_hint(),
            SessionEvent::SubmitAnswer(index) => self.record_answer(index),
            SessionEvent::Continue => {
                self.state.current_question = None;
                self.state.status = SessionStatus::AwaitingContent;
                self.eliminated_option = None;
                if self.state.is_finished() {
                    vec![Effect::RequestSummary {
                        score: self.state.score,
                        total: SESSION_LENGTH,
                    }]
                } else {
                    vec![self.next_question_request()]
                }
            }
            SessionEvent::SummaryReady(message) => {
                self.state.status = SessionStatus::Completed;
                let narration = format!(
                    "Desafio concluído! Fizeste {} pontos. {}",
                    self.state.score, message
                );
                self.summary_message = Some(message);
                vec![Effect::Narrate(narration)]
            }
            SessionEvent::RestartRequested => {
                self.state = SessionState::default();
                self.eliminated_option = None;
                self.summary_message = None;
                vec![Effect::DiscardSnapshot]
            }
        };

        debug_assert!(
            self.state.validate().is_ok(),
            "invariant broken after {event_name}: {:?}",
            self.state.validate()
        );
        debug!(
            event = event_name,
            from = %from,
            to = %self.state.status,
            "Session transition applied."
        );
        Ok(effects)
    }

    //-------------------------------------------------------------------------------------
    // Transition helpers
    //-------------------------------------------------------------------------------------

    fn next_question_request(&mut self) -> Effect {
        let topic = GRAMMAR_TOPICS[self.rng.gen_range(0..GRAMMAR_TOPICS.len())];
        Effect::RequestQuestion {
            topic: topic.to_string(),
            difficulty: self.state.selected_difficulty,
        }
    }

    fn resume_effects(&mut self) -> Vec<Effect> {
        match self.state.status {
            SessionStatus::AnsweringQuestion => self
                .state
                .current_question
                .as_ref()
                .map(|q| vec![Effect::Narrate(question_narration(q))])
                .unwrap_or_default(),
            SessionStatus::AwaitingContent if self.state.is_finished() => {
                vec![Effect::RequestSummary {
                    score: self.state.score,
                    total: SESSION_LENGTH,
                }]
            }
            SessionStatus::AwaitingContent => vec![self.next_question_request()],
            _ => Vec::new(),
        }
    }

    fn reveal_hint(&mut self) -> Vec<Effect> {
        if self.state.hint_used {
            return Vec::new();
        }
        let Some(question) = self.state.current_question.as_ref() else {
            return Vec::new();
        };

        let incorrect = question.incorrect_options();
        let hint = question.hint.clone();
        let eliminated = incorrect[self.rng.gen_range(0..incorrect.len())];

        self.state.hint_used = true;
        self.eliminated_option = Some(eliminated);
        vec![
            Effect::PlayEffect(SoundEffect::Click),
            Effect::Narrate(format!("Aqui tens uma pista mágica: {hint}")),
        ]
    }

    fn record_answer(&mut self, index: usize) -> Vec<Effect> {
        let Some(question) = self.state.current_question.as_ref() else {
            return Vec::new();
        };
        let is_correct = question.is_correct(index);
        let record = AnswerRecord {
            question: question.text.clone(),
            is_correct,
        };
        let explanation = question.explanation.clone();

        if is_correct {
            self.state.score += 1;
        }
        self.state.questions_answered += 1;
        self.state.history.push(record);
        self.state.status = SessionStatus::ShowingFeedback;

        let (sound, feedback) = if is_correct {
            (SoundEffect::Success, "Boa! Estás correto!")
        } else {
            (SoundEffect::Failure, "Quase lá!")
        };
        vec![
            Effect::PlayEffect(sound),
            Effect::Narrate(format!("{feedback} {explanation}")),
        ]
    }
}

/// The text read aloud when a question appears.
pub fn question_narration(question: &Question) -> String {
    let text = question.text.trim_end();
    let separator = if text.ends_with(['?', '!', '.']) { "" } else { "." };
    format!(
        "{text}{separator} As opções são: {}",
        question.options.join(", ")
    )
}

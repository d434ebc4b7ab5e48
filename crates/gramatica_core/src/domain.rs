//! crates/gramatica_core/src/domain.rs
//!
//! Defines the pure, core data structures of a quiz session.
//! These types carry no I/O; the snapshot format and the wire protocol build on
//! their serde representations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of answered questions that completes a session.
pub const SESSION_LENGTH: u32 = 10;

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// Grammar topics a question can be drawn from.
pub const GRAMMAR_TOPICS: [&str; 7] = [
    "Classes de Palavras (Nomes, Verbos, Adjetivos)",
    "Funções Sintáticas (Sujeito, Predicado, Complementos)",
    "Pontuação e Sinais Auxiliares de Escrita",
    "Flexão Verbal (Tempos e Modos)",
    "Tipos e Formas de Frase",
    "Relações Semânticas (Sinónimos, Antónimos, Família de Palavras)",
    "Acentuação e Ortografia (Acordo Ortográfico)",
];

//=========================================================================================
// Difficulty
//=========================================================================================

/// Difficulty chosen once per session. The labels are user-facing content and
/// cross every boundary in their native form. Incoming labels go through
/// [`FromStr`], so unaccented and English spellings are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Difficulty {
    #[default]
    #[serde(rename = "fácil")]
    Easy,
    #[serde(rename = "médio")]
    Medium,
    #[serde(rename = "difícil")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// The native label sent to the content provider and shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "fácil",
            Difficulty::Medium => "médio",
            Difficulty::Hard => "difícil",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown difficulty: '{0}'")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fácil" | "facil" | "easy" => Ok(Difficulty::Easy),
            "médio" | "medio" | "medium" => Ok(Difficulty::Medium),
            "difícil" | "dificil" | "hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = UnknownDifficulty;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//=========================================================================================
// Questions
//=========================================================================================

/// The untrusted question shape produced by a content provider.
///
/// Nothing here is validated; see [`Question::from_generated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: i64,
    pub explanation: String,
    pub hint: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Reasons a generated question is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("Expected exactly 4 options, got {0}")]
    WrongOptionCount(usize),
    #[error("Correct answer index {0} is out of range")]
    CorrectIndexOutOfRange(i64),
    #[error("Question text is empty")]
    EmptyQuestion,
    #[error("Content provider failed: {0}")]
    Provider(String),
}

/// An immutable, validated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: [String; OPTION_COUNT],
    pub correct_answer_index: usize,
    pub explanation: String,
    pub hint: String,
}

impl Question {
    /// Validates provider output and turns it into a `Question` with a fresh id.
    ///
    /// The topic and difficulty are the ones the request was made with; the
    /// provider's echo of the difficulty is ignored.
    pub fn from_generated(
        generated: GeneratedQuestion,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<Self, ContentError> {
        if generated.question.trim().is_empty() {
            return Err(ContentError::EmptyQuestion);
        }
        let option_count = generated.options.len();
        let options: [String; OPTION_COUNT] = generated
            .options
            .try_into()
            .map_err(|_| ContentError::WrongOptionCount(option_count))?;
        let correct_answer_index = usize::try_from(generated.correct_answer_index)
            .ok()
            .filter(|index| *index < OPTION_COUNT)
            .ok_or(ContentError::CorrectIndexOutOfRange(
                generated.correct_answer_index,
            ))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            difficulty,
            text: generated.question,
            options,
            correct_answer_index,
            explanation: generated.explanation,
            hint: generated.hint,
        })
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_answer_index
    }

    /// Indices of the three wrong options, in order.
    pub fn incorrect_options(&self) -> Vec<usize> {
        (0..OPTION_COUNT)
            .filter(|index| *index != self.correct_answer_index)
            .collect()
    }
}

//=========================================================================================
// Session
//=========================================================================================

/// Historical entry for one completed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub is_correct: bool,
}

/// Where the user is within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    NotStarted,
    AwaitingContent,
    AnsweringQuestion,
    ShowingFeedback,
    Completed,
}

impl SessionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::AwaitingContent => "awaiting_content",
            SessionStatus::AnsweringQuestion => "answering_question",
            SessionStatus::ShowingFeedback => "showing_feedback",
            SessionStatus::Completed => "completed",
        }
    }

    /// Statuses in which a current question must be present.
    pub fn holds_question(&self) -> bool {
        matches!(
            self,
            SessionStatus::AnsweringQuestion | SessionStatus::ShowingFeedback
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A broken session invariant, found while validating a state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("score {score} exceeds answered count {answered}")]
    ScoreAboveAnswered { score: u32, answered: u32 },
    #[error("answered count {0} exceeds the session length")]
    AnsweredAboveLength(u32),
    #[error("history has {history} entries but {answered} answers were recorded")]
    HistoryMismatch { history: usize, answered: u32 },
    #[error("history counts {correct} correct answers but the score is {score}")]
    ScoreMismatch { correct: usize, score: u32 },
    #[error("status {0} requires a current question")]
    MissingQuestion(SessionStatus),
    #[error("status {0} must not carry a current question")]
    UnexpectedQuestion(SessionStatus),
    #[error("status {0} is inconsistent with {1} answered questions")]
    StatusProgressMismatch(SessionStatus, u32),
    #[error("current question has an invalid answer key")]
    InvalidQuestion,
}

/// The aggregate root of one quiz session.
///
/// Fields are only mutated through [`crate::session::SessionMachine`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub(crate) status: SessionStatus,
    pub(crate) current_question: Option<Question>,
    pub(crate) score: u32,
    pub(crate) questions_answered: u32,
    pub(crate) selected_difficulty: Difficulty,
    pub(crate) hint_used: bool,
    pub(crate) history: Vec<AnswerRecord>,
}

impl SessionState {
    /// A freshly started session, waiting for its first question.
    pub fn started(difficulty: Difficulty) -> Self {
        Self {
            status: SessionStatus::AwaitingContent,
            selected_difficulty: difficulty,
            ..Self::default()
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    pub fn selected_difficulty(&self) -> Difficulty {
        self.selected_difficulty
    }

    pub fn hint_used(&self) -> bool {
        self.hint_used
    }

    pub fn history(&self) -> &[AnswerRecord] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.questions_answered >= SESSION_LENGTH
    }

    /// Whether a stored copy of this state may be offered for resumption.
    pub fn is_resumable(&self) -> bool {
        self.questions_answered < SESSION_LENGTH
            && !matches!(
                self.status,
                SessionStatus::Completed | SessionStatus::NotStarted
            )
    }

    /// Checks every session invariant, returning the first violation found.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.questions_answered > SESSION_LENGTH {
            return Err(InvariantViolation::AnsweredAboveLength(
                self.questions_answered,
            ));
        }
        if self.score > self.questions_answered {
            return Err(InvariantViolation::ScoreAboveAnswered {
                score: self.score,
                answered: self.questions_answered,
            });
        }
        if self.history.len() != self.questions_answered as usize {
            return Err(InvariantViolation::HistoryMismatch {
                history: self.history.len(),
                answered: self.questions_answered,
            });
        }
        let correct = self.history.iter().filter(|r| r.is_correct).count();
        if correct != self.score as usize {
            return Err(InvariantViolation::ScoreMismatch {
                correct,
                score: self.score,
            });
        }

        match (&self.current_question, self.status.holds_question()) {
            (None, true) => return Err(InvariantViolation::MissingQuestion(self.status)),
            (Some(_), false) => {
                return Err(InvariantViolation::UnexpectedQuestion(self.status))
            }
            (Some(q), true) if q.correct_answer_index >= OPTION_COUNT => {
                return Err(InvariantViolation::InvalidQuestion)
            }
            _ => {}
        }

        let progress_ok = match self.status {
            SessionStatus::AnsweringQuestion => self.questions_answered < SESSION_LENGTH,
            SessionStatus::ShowingFeedback => self.questions_answered > 0,
            SessionStatus::Completed => self.questions_answered == SESSION_LENGTH,
            SessionStatus::NotStarted | SessionStatus::AwaitingContent => true,
        };
        if !progress_ok {
            return Err(InvariantViolation::StatusProgressMismatch(
                self.status,
                self.questions_answered,
            ));
        }
        Ok(())
    }
}

//=========================================================================================
// End-of-session encouragement
//=========================================================================================

/// Tiered encouragement shown with the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Encouragement {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub icon: &'static str,
}

impl Encouragement {
    pub fn for_score(score: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            score.saturating_mul(100) / total
        };
        match percentage {
            90.. => Self {
                title: "Fantástico! ✨",
                subtitle: "És um génio da gramática!",
                icon: "👑",
            },
            75.. => Self {
                title: "Excelente! 🌟",
                subtitle: "O teu conhecimento é brilhante!",
                icon: "💎",
            },
            50.. => Self {
                title: "Muito Bem! 💪",
                subtitle: "Estás no bom caminho para a mestria!",
                icon: "🚀",
            },
            _ => Self {
                title: "Bom Esforço! 📚",
                subtitle: "Cada erro é uma oportunidade para aprenderes mais!",
                icon: "🌱",
            },
        }
    }
}

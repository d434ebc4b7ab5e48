//! crates/gramatica_core/src/view.rs
//!
//! The read-only snapshot handed to the presentation layer after every change.
//! The answer key never leaves the core through this type.

use serde::Serialize;

use crate::domain::{Encouragement, SessionStatus, OPTION_COUNT, SESSION_LENGTH};
use crate::session::SessionMachine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub topic: String,
    pub difficulty: &'static str,
    pub text: String,
    pub options: [String; OPTION_COUNT],
    /// Option removed by the hint on this question.
    pub eliminated_option: Option<usize>,
    /// Present once the hint has been revealed on this question.
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackView {
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub score: u32,
    pub total: u32,
    pub message: String,
    pub encouragement: Encouragement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub status: SessionStatus,
    pub score: u32,
    pub questions_answered: u32,
    pub total_questions: u32,
    /// One-based number of the question on screen, as shown in the progress bar.
    pub question_number: u32,
    pub difficulty: &'static str,
    pub hint_used: bool,
    pub question: Option<QuestionView>,
    pub feedback: Option<FeedbackView>,
    pub summary: Option<SummaryView>,
    pub resumable: bool,
}

impl From<&SessionMachine> for SessionView {
    fn from(machine: &SessionMachine) -> Self {
        let state = machine.state();
        let status = state.status();

        let question = match status {
            SessionStatus::AnsweringQuestion => state.current_question().map(|q| QuestionView {
                id: q.id.clone(),
                topic: q.topic.clone(),
                difficulty: q.difficulty.label(),
                text: q.text.clone(),
                options: q.options.clone(),
                eliminated_option: machine.eliminated_option(),
                hint: machine.eliminated_option().map(|_| q.hint.clone()),
            }),
            _ => None,
        };

        let feedback = machine.last_answer_correct().and_then(|is_correct| {
            state.current_question().map(|q| FeedbackView {
                is_correct,
                explanation: q.explanation.clone(),
            })
        });

        let summary = match (status, machine.summary_message()) {
            (SessionStatus::Completed, Some(message)) => Some(SummaryView {
                score: state.score(),
                total: state.questions_answered(),
                message: message.to_string(),
                encouragement: Encouragement::for_score(
                    state.score(),
                    state.questions_answered(),
                ),
            }),
            _ => None,
        };

        let on_screen = u32::from(status == SessionStatus::AnsweringQuestion);

        Self {
            status,
            score: state.score(),
            questions_answered: state.questions_answered(),
            total_questions: SESSION_LENGTH,
            question_number: state.questions_answered() + on_screen,
            difficulty: state.selected_difficulty().label(),
            hint_used: state.hint_used(),
            question,
            feedback,
            summary,
            resumable: machine.resumable().is_some(),
        }
    }
}

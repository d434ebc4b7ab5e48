pub mod domain;
pub mod persistence;
pub mod ports;
pub mod runtime;
pub mod session;
pub mod transition;
pub mod view;

pub use domain::{
    AnswerRecord, ContentError, Difficulty, Encouragement, GeneratedQuestion, Question,
    SessionState, SessionStatus, GRAMMAR_TOPICS, OPTION_COUNT, SESSION_LENGTH,
};
pub use persistence::{SnapshotRepository, MUTED_KEY, SNAPSHOT_KEY};
pub use ports::{
    AudioOutput, ContentProvider, PortError, PortResult, SessionPresenter, SnapshotStore,
    SoundEffect, TextToSpeechService,
};
pub use runtime::{QuizPorts, QuizRuntime, RuntimeSettings, StartupReport};
pub use session::{Effect, SessionError, SessionEvent, SessionMachine};
pub use transition::{TransitionCoordinator, TransitionError, TransitionPhase};
pub use view::SessionView;

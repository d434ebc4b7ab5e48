mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{settle, AudioCall, FakeTts, Harness, Logged, MemoryStore, CORRECT_INDEX};
use gramatica_core::session::{CONTENT_ERROR_MESSAGE, DEFAULT_SUMMARY_MESSAGE};
use gramatica_core::{
    Difficulty, SessionError, SessionStatus, SoundEffect, TransitionError, TransitionPhase,
    MUTED_KEY, SESSION_LENGTH, SNAPSHOT_KEY,
};

#[tokio::test(start_paused = true)]
async fn test_start_session_loads_and_narrates_first_question() {
    let h = Harness::new();
    let report = h.runtime.initialize().await;
    assert!(!report.resumable);
    assert!(!report.muted);

    h.runtime.start_session(Difficulty::Easy).await.unwrap();
    settle().await;

    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::AnsweringQuestion);
    assert_eq!(view.question_number, 1);
    assert_eq!(view.difficulty, "fácil");
    assert_eq!(h.presenter.last_view(), Some(view));
    assert_eq!(
        h.presenter.phases(),
        vec![TransitionPhase::Exiting, TransitionPhase::Entering]
    );

    let calls = h.audio.calls();
    assert_eq!(calls[0], AudioCall::Muted(false));
    assert!(calls.contains(&AudioCall::StartAmbient));
    assert!(calls.contains(&AudioCall::Effect(SoundEffect::Click)));
    let narrations = h.audio.narrations();
    assert_eq!(narrations.len(), 1);
    assert!(narrations[0].contains("As opções são: cãos, cães, cões, cãis"));

    assert!(h.store.get(SNAPSHOT_KEY).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_answer_and_continue_requests_the_next_question() {
    let h = Harness::new();
    h.runtime.initialize().await;
    h.runtime.start_session(Difficulty::Medium).await.unwrap();
    settle().await;

    h.runtime.submit_answer(CORRECT_INDEX).await.unwrap();
    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::ShowingFeedback);
    assert_eq!(view.score, 1);
    assert!(view.feedback.unwrap().is_correct);
    assert!(h
        .audio
        .calls()
        .contains(&AudioCall::Effect(SoundEffect::Success)));

    h.runtime.continue_session().await.unwrap();
    settle().await;
    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::AnsweringQuestion);
    assert_eq!(view.question_number, 2);
    assert_eq!(h.content.question_calls.load(Ordering::SeqCst), 2);
}

fn position(entries: &[Logged], wanted: impl Fn(&Logged) -> bool) -> usize {
    entries
        .iter()
        .position(wanted)
        .unwrap_or_else(|| panic!("missing entry in {entries:?}"))
}

#[tokio::test(start_paused = true)]
async fn test_transitions_stop_exit_enter_then_narrate() {
    let h = Harness::new();
    h.runtime.initialize().await;
    h.runtime.start_session(Difficulty::Easy).await.unwrap();
    settle().await;

    let mark = h.journal.mark();
    h.runtime.submit_answer(CORRECT_INDEX).await.unwrap();
    settle().await;
    let entries = h.journal.since(mark);

    let stop = position(&entries, |e| *e == Logged::Audio(AudioCall::StopNarration));
    let exiting = position(&entries, |e| *e == Logged::Phase(TransitionPhase::Exiting));
    let entering = position(&entries, |e| *e == Logged::Phase(TransitionPhase::Entering));
    let success = position(&entries, |e| {
        *e == Logged::Audio(AudioCall::Effect(SoundEffect::Success))
    });
    let requested = position(&entries, |e| {
        matches!(e, Logged::NarrationRequested(text) if text.starts_with("Boa! Estás correto!"))
    });
    let played = position(&entries, |e| {
        matches!(e, Logged::Audio(AudioCall::Narration(text)) if text.starts_with("Boa! Estás correto!"))
    });
    assert!(stop < exiting, "{entries:?}");
    assert!(exiting < entering, "{entries:?}");
    assert!(entering < success, "{entries:?}");
    assert!(entering < requested, "{entries:?}");
    assert!(requested < played, "{entries:?}");

    let mark = h.journal.mark();
    h.runtime.continue_session().await.unwrap();
    settle().await;
    let entries = h.journal.since(mark);

    let stop = position(&entries, |e| *e == Logged::Audio(AudioCall::StopNarration));
    let exiting = position(&entries, |e| *e == Logged::Phase(TransitionPhase::Exiting));
    let entering = position(&entries, |e| *e == Logged::Phase(TransitionPhase::Entering));
    let requested = position(&entries, |e| {
        matches!(e, Logged::NarrationRequested(text) if text.contains("As opções são"))
    });
    assert!(stop < exiting, "{entries:?}");
    assert!(exiting < entering, "{entries:?}");
    assert!(entering < requested, "{entries:?}");
}

#[tokio::test(start_paused = true)]
async fn test_content_failure_reports_error_and_offers_saved_progress() {
    let h = Harness::new();
    h.runtime.initialize().await;
    h.content.fail_questions.store(true, Ordering::SeqCst);

    h.runtime.start_session(Difficulty::Hard).await.unwrap();
    settle().await;

    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::NotStarted);
    assert!(view.question.is_none());
    assert_eq!(h.presenter.errors(), vec![CONTENT_ERROR_MESSAGE.to_string()]);
    assert!(view.resumable);
    assert_eq!(h.presenter.last_view(), Some(view));

    // No automatic retry.
    settle().await;
    assert_eq!(h.content.question_calls.load(Ordering::SeqCst), 1);

    h.content.fail_questions.store(false, Ordering::SeqCst);
    h.runtime.resume_session().await.unwrap();
    settle().await;
    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::AnsweringQuestion);
    assert_eq!(view.difficulty, "difícil");
}

#[tokio::test(start_paused = true)]
async fn test_full_session_completes_with_default_summary_when_provider_fails() {
    let h = Harness::new();
    h.runtime.initialize().await;
    h.content.fail_summary.store(true, Ordering::SeqCst);

    h.runtime.start_session(Difficulty::Easy).await.unwrap();
    for _ in 0..SESSION_LENGTH {
        settle().await;
        h.runtime.submit_answer(CORRECT_INDEX).await.unwrap();
        h.runtime.continue_session().await.unwrap();
    }
    settle().await;

    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::Completed);
    assert_eq!(view.score, SESSION_LENGTH);
    let summary = view.summary.unwrap();
    assert_eq!(summary.message, DEFAULT_SUMMARY_MESSAGE);
    assert_eq!(summary.total, SESSION_LENGTH);
    assert_eq!(h.content.summary_calls.load(Ordering::SeqCst), 1);
    assert!(h.store.get(SNAPSHOT_KEY).is_none());
    assert!(h
        .audio
        .narrations()
        .last()
        .unwrap()
        .starts_with("Desafio concluído! Fizeste 10 pontos."));

    assert_eq!(
        h.runtime.submit_answer(0).await,
        Err(TransitionError::Session(SessionError::InvalidTransition {
            event: "submit_answer",
            status: SessionStatus::Completed,
        }))
    );

    h.runtime.restart().await.unwrap();
    let view = h.runtime.view().await;
    assert_eq!(view.status, SessionStatus::NotStarted);
    assert_eq!(view.questions_answered, 0);
    assert!(!view.resumable);
}

#[tokio::test(start_paused = true)]
async fn test_initialize_offers_a_stored_session_for_resumption() {
    let store = Arc::new(MemoryStore::default());
    {
        let first = Harness::with_store(store.clone());
        first.runtime.initialize().await;
        first.runtime.start_session(Difficulty::Medium).await.unwrap();
        settle().await;
        first.runtime.submit_answer(CORRECT_INDEX).await.unwrap();
        first.runtime.shutdown();
    }

    let second = Harness::with_store(store);
    let report = second.runtime.initialize().await;
    assert!(report.resumable);
    assert!(second.presenter.last_view().unwrap().resumable);

    second.runtime.resume_session().await.unwrap();
    let view = second.runtime.view().await;
    assert_eq!(view.status, SessionStatus::ShowingFeedback);
    assert_eq!(view.score, 1);
    assert_eq!(view.questions_answered, 1);
    assert_eq!(view.difficulty, "médio");

    second.runtime.continue_session().await.unwrap();
    settle().await;
    assert_eq!(second.runtime.view().await.question_number, 2);
}

#[tokio::test(start_paused = true)]
async fn test_muted_runtime_never_requests_narration() {
    let h = Harness::new();
    h.store.put(MUTED_KEY, "true");

    let report = h.runtime.initialize().await;
    assert!(report.muted);
    assert!(h.runtime.is_muted());
    assert!(!h.audio.calls().contains(&AudioCall::StartAmbient));

    h.runtime.start_session(Difficulty::Easy).await.unwrap();
    settle().await;
    h.runtime.use_hint().await.unwrap();
    h.runtime.read_greeting().await;
    settle().await;
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 0);
    assert!(h.audio.narrations().is_empty());

    h.runtime.set_muted(false);
    assert_eq!(h.store.get(MUTED_KEY).as_deref(), Some("false"));
    assert_eq!(h.audio.calls().last(), Some(&AudioCall::StartAmbient));

    h.runtime.set_muted(true);
    let calls = h.audio.calls();
    assert!(calls.ends_with(&[AudioCall::StopNarration, AudioCall::StopAmbient]));
    assert_eq!(h.store.get(MUTED_KEY).as_deref(), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_intents_are_debounced() {
    let h = Harness::new();
    h.runtime.initialize().await;

    let first = {
        let runtime = h.runtime.clone();
        tokio::spawn(async move { runtime.start_session(Difficulty::Hard).await })
    };
    tokio::task::yield_now().await;
    assert!(h.runtime.is_transitioning());

    assert_eq!(
        h.runtime.start_session(Difficulty::Easy).await,
        Err(TransitionError::Busy)
    );
    first.await.unwrap().unwrap();
    settle().await;

    let view = h.runtime.view().await;
    assert_eq!(view.difficulty, "difícil");
    assert_eq!(h.content.question_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hint_eliminates_one_wrong_option_once() {
    let h = Harness::new();
    h.runtime.initialize().await;
    h.runtime.start_session(Difficulty::Easy).await.unwrap();
    settle().await;

    h.runtime.use_hint().await.unwrap();
    let question = h.runtime.view().await.question.unwrap();
    let eliminated = question.eliminated_option.unwrap();
    assert_ne!(eliminated, CORRECT_INDEX);
    assert_eq!(question.hint.as_deref(), Some("Pensa em 'pão' e 'pães'."));

    h.runtime.use_hint().await.unwrap();
    settle().await;
    let hints = h
        .audio
        .narrations()
        .into_iter()
        .filter(|n| n.starts_with("Aqui tens uma pista mágica"))
        .count();
    assert_eq!(hints, 1);

    assert_eq!(
        h.runtime.submit_answer(eliminated).await,
        Err(TransitionError::Session(SessionError::OptionEliminated(
            eliminated
        )))
    );
    assert_eq!(
        h.runtime.view().await.status,
        SessionStatus::AnsweringQuestion
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_narration_cancels_pending_audio() {
    let h = Harness::with_tts(FakeTts {
        delay: Duration::from_millis(500),
        ..FakeTts::default()
    });
    h.runtime.initialize().await;

    h.runtime.read_greeting().await;
    h.runtime.stop_narration();
    settle().await;
    assert!(h.audio.narrations().is_empty());
    assert!(h.audio.calls().contains(&AudioCall::StopNarration));

    // A newer narration replaces one that is still being generated.
    h.runtime.read_greeting().await;
    h.runtime.read_greeting().await;
    settle().await;
    let narrations = h.audio.narrations();
    assert_eq!(narrations.len(), 1);
    assert!(narrations[0].starts_with("Olá aventureiro!"));
}

#[tokio::test(start_paused = true)]
async fn test_narration_failure_does_not_block_play() {
    let h = Harness::new();
    h.tts.fail.store(true, Ordering::SeqCst);
    h.runtime.initialize().await;

    h.runtime.start_session(Difficulty::Medium).await.unwrap();
    settle().await;
    assert_eq!(
        h.runtime.view().await.status,
        SessionStatus::AnsweringQuestion
    );
    assert!(h.tts.calls.load(Ordering::SeqCst) >= 1);
    assert!(h.audio.narrations().is_empty());

    h.runtime.submit_answer(0).await.unwrap();
    assert_eq!(h.runtime.view().await.score, 0);
    assert!(h.presenter.errors().is_empty());
}

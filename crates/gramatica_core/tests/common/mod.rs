//! Fake ports shared by the runtime tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gramatica_core::{
    AudioOutput, ContentProvider, Difficulty, GeneratedQuestion, PortError, PortResult,
    QuizPorts, QuizRuntime, RuntimeSettings, SessionPresenter, SessionView, SnapshotStore,
    SoundEffect, TextToSpeechService, TransitionPhase,
};

pub const CORRECT_INDEX: usize = 1;

/// One entry in the cross-port log, in the order the runtime produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logged {
    Audio(AudioCall),
    Phase(TransitionPhase),
    NarrationRequested(String),
}

/// Ordered log shared by every fake that observes the runtime.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Logged>>>);

impl Journal {
    /// Position of the next entry, for use with [`Journal::since`].
    pub fn mark(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Entries logged from position `mark` onwards.
    pub fn since(&self, mark: usize) -> Vec<Logged> {
        self.0.lock().unwrap()[mark..].to_vec()
    }

    fn push(&self, entry: Logged) {
        self.0.lock().unwrap().push(entry);
    }
}

#[derive(Default)]
pub struct FakeContent {
    pub fail_questions: AtomicBool,
    pub fail_summary: AtomicBool,
    pub question_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
}

#[async_trait]
impl ContentProvider for FakeContent {
    async fn generate_question(
        &self,
        topic: &str,
        _difficulty: Difficulty,
    ) -> PortResult<GeneratedQuestion> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_questions.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("provider offline".to_string()));
        }
        Ok(GeneratedQuestion {
            question: format!("Qual é o plural de 'cão'? ({topic})"),
            options: ["cãos", "cães", "cões", "cãis"].map(String::from).to_vec(),
            correct_answer_index: CORRECT_INDEX as i64,
            explanation: "Os nomes terminados em -ão podem fazer o plural em -ães.".to_string(),
            hint: "Pensa em 'pão' e 'pães'.".to_string(),
            difficulty: None,
        })
    }

    async fn generate_summary(&self, score: u32, total: u32) -> PortResult<String> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_summary.load(Ordering::SeqCst) {
            return Err(PortError::InvalidResponse("empty body".to_string()));
        }
        Ok(format!("Fantástico! {score} em {total}!"))
    }
}

pub struct FakeTts {
    pub delay: Duration,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    /// Replaced by the harness with its shared journal.
    pub journal: Journal,
}

impl Default for FakeTts {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(50),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            journal: Journal::default(),
        }
    }
}

#[async_trait]
impl TextToSpeechService for FakeTts {
    async fn generate_audio(&self, text: &str) -> PortResult<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Logged::NarrationRequested(text.to_string()));
        tokio::time::sleep(self.delay).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("quota exceeded".to_string()));
        }
        Ok(Some(text.as_bytes().to_vec()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCall {
    Narration(String),
    StopNarration,
    Muted(bool),
    Effect(SoundEffect),
    StartAmbient,
    StopAmbient,
}

#[derive(Default)]
pub struct RecordingAudio {
    calls: Mutex<Vec<AudioCall>>,
    journal: Journal,
}

impl RecordingAudio {
    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn narrations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AudioCall::Narration(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: AudioCall) {
        self.journal.push(Logged::Audio(call.clone()));
        self.calls.lock().unwrap().push(call);
    }
}

impl AudioOutput for RecordingAudio {
    fn play_narration(&self, audio: Vec<u8>) {
        self.push(AudioCall::Narration(String::from_utf8_lossy(&audio).into_owned()));
    }
    fn stop_narration(&self) {
        self.push(AudioCall::StopNarration);
    }
    fn set_muted(&self, muted: bool) {
        self.push(AudioCall::Muted(muted));
    }
    fn play_effect(&self, effect: SoundEffect) {
        self.push(AudioCall::Effect(effect));
    }
    fn start_ambient(&self) {
        self.push(AudioCall::StartAmbient);
    }
    fn stop_ambient(&self) {
        self.push(AudioCall::StopAmbient);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: &str, blob: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), blob.to_string());
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, key: &str, blob: &str) -> PortResult<()> {
        self.put(key, blob);
        Ok(())
    }
    fn load(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.get(key))
    }
    fn delete(&self, key: &str) -> PortResult<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    views: Mutex<Vec<SessionView>>,
    phases: Mutex<Vec<TransitionPhase>>,
    errors: Mutex<Vec<String>>,
    journal: Journal,
}

impl RecordingPresenter {
    pub fn last_view(&self) -> Option<SessionView> {
        self.views.lock().unwrap().last().cloned()
    }
    pub fn phases(&self) -> Vec<TransitionPhase> {
        self.phases.lock().unwrap().clone()
    }
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl SessionPresenter for RecordingPresenter {
    fn show(&self, view: &SessionView) {
        self.views.lock().unwrap().push(view.clone());
    }
    fn transition(&self, phase: TransitionPhase) {
        self.journal.push(Logged::Phase(phase));
        self.phases.lock().unwrap().push(phase);
    }
    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub struct Harness {
    pub runtime: Arc<QuizRuntime>,
    pub content: Arc<FakeContent>,
    pub tts: Arc<FakeTts>,
    pub audio: Arc<RecordingAudio>,
    pub store: Arc<MemoryStore>,
    pub presenter: Arc<RecordingPresenter>,
    pub journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Arc::new(MemoryStore::default()), FakeTts::default())
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::build(store, FakeTts::default())
    }

    pub fn with_tts(tts: FakeTts) -> Self {
        Self::build(Arc::new(MemoryStore::default()), tts)
    }

    fn build(store: Arc<MemoryStore>, tts: FakeTts) -> Self {
        let journal = Journal::default();
        let content = Arc::new(FakeContent::default());
        let tts = Arc::new(FakeTts {
            journal: journal.clone(),
            ..tts
        });
        let audio = Arc::new(RecordingAudio {
            journal: journal.clone(),
            ..RecordingAudio::default()
        });
        let presenter = Arc::new(RecordingPresenter {
            journal: journal.clone(),
            ..RecordingPresenter::default()
        });
        let runtime = QuizRuntime::new(
            QuizPorts {
                content: content.clone(),
                tts: tts.clone(),
                audio: audio.clone(),
                store: store.clone(),
                presenter: presenter.clone(),
            },
            RuntimeSettings {
                rng_seed: Some(7),
                ..RuntimeSettings::default()
            },
        );
        Self {
            runtime,
            content,
            tts,
            audio,
            store,
            presenter,
            journal,
        }
    }
}

/// Lets spawned content and narration tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

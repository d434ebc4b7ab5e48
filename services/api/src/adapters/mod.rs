pub mod content_llm;
pub mod file_store;
pub mod tts;

pub use content_llm::OpenAiContentAdapter;
pub use file_store::FileSnapshotStore;
pub use tts::OpenAiTtsAdapter;

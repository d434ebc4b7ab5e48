pub mod client;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{device_progress_handler, list_topics_handler};
pub use ws_handler::ws_handler;

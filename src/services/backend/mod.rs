pub mod client;

pub use client::{BackendError, ConversationBackend, HttpBackend};

//! Language model backends for Questkeeper.
//!
//! Currently a single backend: the native Ollama chat API. The agent loop
//! only sees the `ChatModel` trait, so additional backends slot in without
//! touching the core.

pub mod ollama;

pub use ollama::OllamaClient;

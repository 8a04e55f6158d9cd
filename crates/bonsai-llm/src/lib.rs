//! Text-generation providers for the bonsai summarizer.
//!
//! Implements [`bonsai_core::TextGenerator`] over HTTP. Any endpoint
//! speaking the OpenAI chat-completions shape works: OpenAI itself, local
//! inference servers, or gateway proxies.

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompatGenerator;
pub use provider::{GeneratorError, Result};

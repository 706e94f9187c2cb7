//! Concrete generation providers.

pub mod openai;

pub use openai::OpenAiCompatibleClient;

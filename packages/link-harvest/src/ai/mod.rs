//! Engine implementations.

pub mod openai;

pub use openai::OpenAiEngine;

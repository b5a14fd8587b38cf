//! LLM-backed pipeline stages

pub mod client;
pub mod document;
pub mod facts;
pub mod json;
pub mod ranking;

pub use client::GeminiClient;

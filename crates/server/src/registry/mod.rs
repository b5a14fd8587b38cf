//! Clinical-trial registry access

pub mod client;

pub use client::TrialRegistryClient;

//! Vidgen Core - Pipeline orchestration for automated video generation
//!
//! This crate contains all run tracking, workflow-engine plumbing, and
//! stage workers with no CLI dependencies. The `vidgen` binary wires it
//! together; tests drive it directly.

pub mod config;
pub mod engine;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod services;
pub mod storage;
pub mod workers;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

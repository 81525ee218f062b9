//! Batchpress - batch media compression orchestrator
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod discover;
pub mod metrics;
pub mod paths;
pub mod pipeline;
pub mod runner;
pub mod scheduler;
pub mod tools;

// ABOUTME: Library root for sage — re-exports all modules for integration testing.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod agent;
pub mod app;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod tools;
pub mod tui;

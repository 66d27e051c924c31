// ABOUTME: Library root for remexec - exposes the client core for the binary and tests.
// ABOUTME: The interactive shell lives in main.rs.

pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod output;
pub mod ssh;

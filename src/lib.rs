//! Core library for the `timetrack` activity timer.
//!
//! The engine is a sequential state machine: a single [`engine::Tracker`]
//! owns the whole state, runs every mutation to completion, and persists
//! the result through an abstract [`storage::StorageGateway`]. The CLI and
//! TUI in the binary are thin shells over it.

pub mod commands;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;
pub mod stats;
pub mod storage;
pub mod tui;

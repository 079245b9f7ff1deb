//! Core library entry point that wires together the VibeCoder subsystems.
//!
//! Each module is intentionally kept lightweight so that the boundaries
//! between responsibilities remain obvious when exploring the codebase:
//! - [`providers`] implements the two AI chat backends behind one trait.
//! - [`dispatch`] orders the providers by preference and handles fallback.
//! - [`preview`] assembles the three source buffers into one document.
//! - [`session`] owns the buffers and transcript for the active session.
//! - [`settings`] persists UI and provider preferences in SQLite.
//! - [`api`] exposes the IPC surface that the Tauri UI invokes.
//! - [`db`] initialises the SQLite database and applies migrations.
//! - [`errors`] keeps the central error catalogue with human friendly metadata.
//! - [`logging`] writes structured diagnostics to the event log table.

pub mod api;
pub mod db;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod models;
pub mod preview;
pub mod providers;
pub mod session;
pub mod settings;

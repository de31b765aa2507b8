//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI and UI layers decoupled from storage details.

pub mod note_service;
pub mod preferences_service;
pub mod task_service;

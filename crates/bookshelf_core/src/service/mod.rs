//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into controller-level operations.
//! - Keep the HTTP layer decoupled from storage details.

pub mod entity_service;

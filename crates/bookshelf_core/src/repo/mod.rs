//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the generic CRUD contract shared by every resource.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Entity::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod entity_repo;

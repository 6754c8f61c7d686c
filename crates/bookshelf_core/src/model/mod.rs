//! Domain model for the catalog resources.
//!
//! # Responsibility
//! - Define the persisted records exposed by the HTTP surface.
//! - Publish a static field schema per record so storage and filtering can
//!   stay generic without runtime reflection.
//!
//! # Invariants
//! - Every record is identified by a stable `EntityId`.
//! - Field schemas list every non-id column exactly once, in storage order.

pub mod author;
pub mod book;
pub mod entity;
pub mod role_entitlement;

//! Core domain logic for the bookshelf catalog service.
//!
//! Owns the resource model, SQLite storage, the dynamic filter engine and
//! the generic CRUD service used by every HTTP controller.

pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use filter::{
    build_filter, compile_filters, parse_filters, FilterCriteria, FilterError, FilterExpr,
    FilterOperator,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::author::Author;
pub use model::book::Book;
pub use model::entity::{Entity, EntityId, FieldDef, FieldKind, FieldValue, ValidationError};
pub use model::role_entitlement::RoleEntitlement;
pub use repo::entity_repo::{EntityRepository, RepoError, RepoResult, SqliteEntityRepository};
pub use service::entity_service::{EntityService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

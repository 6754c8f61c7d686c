//! Shared request state: the SQLite connection and the auth policy.

use crate::auth::AuthPolicy;
use crate::config::IN_MEMORY_DATABASE;
use crate::error::ApiError;
use bookshelf_core::db::{open_db, open_db_in_memory};
use bookshelf_core::{Author, Book, RepoResult, RoleEntitlement, SqliteEntityRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthPolicy>,
}

impl AppState {
    pub fn new(db: Database, auth: AuthPolicy) -> Self {
        Self {
            db,
            auth: Arc::new(auth),
        }
    }
}

/// Single migrated connection shared by all requests.
///
/// Storage calls are blocking, so each one runs on the blocking pool while
/// holding the connection lock.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens `path`, or an in-memory store for `:memory:`.
    pub fn open(path: &str) -> RepoResult<Self> {
        let conn = if path.trim() == IN_MEMORY_DATABASE {
            open_db_in_memory()?
        } else {
            open_db(path)?
        };
        Self::from_connection(conn)
    }

    pub fn in_memory() -> RepoResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps a migrated connection after checking every resource table once,
    /// so request handlers can build repositories without re-checking.
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        SqliteEntityRepository::<Author>::check_schema(&conn)?;
        SqliteEntityRepository::<Book>::check_schema(&conn)?;
        SqliteEntityRepository::<RoleEntitlement>::check_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `work` against the connection on the blocking thread pool.
    pub async fn run<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| ApiError::Internal("database connection lock poisoned".to_string()))?;
            work(&guard)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("storage task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use bookshelf_core::RepoError;
    use rusqlite::Connection;

    #[test]
    fn from_connection_rejects_unmigrated_store() {
        let conn = Connection::open_in_memory().unwrap();
        let err = Database::from_connection(conn).err().unwrap();
        assert!(matches!(err, RepoError::MissingRequiredTable(_)));
    }

    #[test]
    fn in_memory_store_is_ready() {
        assert!(Database::in_memory().is_ok());
    }

    #[test]
    fn open_accepts_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.sqlite3");
        assert!(Database::open(path.to_str().unwrap()).is_ok());
        assert!(path.exists());
    }
}

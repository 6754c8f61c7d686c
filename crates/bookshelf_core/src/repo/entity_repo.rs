//! Generic entity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over any `Entity` table using its static field schema.
//! - Translate `FilterExpr` trees into parameterized `SELECT`s.
//!
//! # Invariants
//! - Write paths call `Entity::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - List results follow insertion order (`rowid`).

use crate::db::DbError;
use crate::filter::FilterExpr;
use crate::model::entity::{
    Entity, EntityId, FieldDecodeError, FieldKind, FieldValue, ValidationError,
};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        resource: &'static str,
        id: EntityId,
    },
    /// Primary-key collision on insert.
    Conflict {
        resource: &'static str,
        id: EntityId,
    },
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Conflict { resource, id } => write!(f, "{resource} already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<FieldDecodeError> for RepoError {
    fn from(value: FieldDecodeError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Repository interface for entity CRUD operations.
pub trait EntityRepository<E: Entity> {
    fn create(&self, entity: &E) -> RepoResult<EntityId>;
    fn get(&self, id: EntityId) -> RepoResult<Option<E>>;
    fn list(&self, filter: &FilterExpr) -> RepoResult<Vec<E>>;
    fn update(&self, entity: &E) -> RepoResult<()>;
    fn delete(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed repository for one entity table.
pub struct SqliteEntityRepository<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteEntityRepository<'conn, E> {
    /// Constructs a repository after checking the table shape for `E`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::check_schema(conn)?;
        Ok(Self::new(conn))
    }

    /// Constructs a repository over a connection already passed through
    /// [`Self::check_schema`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    /// Verifies that the table for `E` exists with every schema column.
    pub fn check_schema(conn: &Connection) -> RepoResult<()> {
        ensure_table_ready::<E>(conn)
    }

    fn select_sql() -> String {
        format!("SELECT {} FROM {}", column_list::<E>(), E::TABLE)
    }
}

impl<E: Entity> EntityRepository<E> for SqliteEntityRepository<'_, E> {
    fn create(&self, entity: &E) -> RepoResult<EntityId> {
        entity.validate()?;

        let placeholders = (1..=E::fields().len() + 1)
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            column_list::<E>()
        );

        let mut bind_values = vec![Value::Text(entity.id().to_string())];
        bind_values.extend(entity.values().iter().map(to_sql_value));

        match self.conn.execute(&sql, params_from_iter(bind_values)) {
            Ok(_) => Ok(entity.id()),
            Err(err) if is_primary_key_violation(&err) => Err(RepoError::Conflict {
                resource: E::RESOURCE,
                id: entity.id(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<E>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1;", Self::select_sql()))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entity_row::<E>(row)?));
        }

        Ok(None)
    }

    fn list(&self, filter: &FilterExpr) -> RepoResult<Vec<E>> {
        let (predicate, params) = filter.to_sql();
        let sql = format!("{} WHERE {predicate} ORDER BY rowid ASC;", Self::select_sql());
        let bind_values: Vec<Value> = params.iter().map(to_sql_value).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();

        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row::<E>(row)?);
        }

        Ok(entities)
    }

    fn update(&self, entity: &E) -> RepoResult<()> {
        entity.validate()?;

        let fields = E::fields();
        let assignments = fields
            .iter()
            .enumerate()
            .map(|(index, field)| format!("{} = ?{}", field.column, index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?{};",
            E::TABLE,
            fields.len() + 1
        );

        let mut bind_values: Vec<Value> = entity.values().iter().map(to_sql_value).collect();
        bind_values.push(Value::Text(entity.id().to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                resource: E::RESOURCE,
                id: entity.id(),
            });
        }

        Ok(())
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", E::TABLE),
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                resource: E::RESOURCE,
                id,
            });
        }

        Ok(())
    }
}

fn column_list<E: Entity>() -> String {
    std::iter::once("id")
        .chain(E::fields().iter().map(|field| field.column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_entity_row<E: Entity>(row: &Row<'_>) -> RepoResult<E> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in {}.id", E::TABLE))
    })?;

    let mut values = Vec::with_capacity(E::fields().len());
    for field in E::fields() {
        let column = field.column;
        let value: FieldValue = match field.kind {
            FieldKind::Text => row.get::<_, Option<String>>(column)?.into(),
            FieldKind::Integer => row.get::<_, Option<i64>>(column)?.into(),
            FieldKind::Real => row.get::<_, Option<f64>>(column)?.into(),
            FieldKind::Bool => match row.get::<_, Option<i64>>(column)? {
                None => FieldValue::Null,
                Some(0) => FieldValue::Bool(false),
                Some(1) => FieldValue::Bool(true),
                Some(other) => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid bool value `{other}` in {}.{column}",
                        E::TABLE
                    )));
                }
            },
            FieldKind::Uuid => match row.get::<_, Option<String>>(column)? {
                None => FieldValue::Null,
                Some(text) => FieldValue::Uuid(Uuid::parse_str(&text).map_err(|_| {
                    RepoError::InvalidData(format!(
                        "invalid uuid value `{text}` in {}.{column}",
                        E::TABLE
                    ))
                })?),
            },
        };
        values.push(value);
    }

    Ok(E::from_values(id, values)?)
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Real(number) => Value::Real(*number),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Uuid(id) => Value::Text(id.to_string()),
    }
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                )
    )
}

fn ensure_table_ready<E: Entity>(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, E::TABLE)? {
        return Err(RepoError::MissingRequiredTable(E::TABLE));
    }

    let columns = table_columns(conn, E::TABLE)?;
    for column in std::iter::once("id").chain(E::fields().iter().map(|field| field.column)) {
        if !columns.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: E::TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

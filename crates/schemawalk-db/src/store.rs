use rusqlite::types::Value;
use rusqlite::{Connection, Transaction};
use schemawalk_common::{Error, Result, SchemaMeta, Version};
use tracing::debug;

pub const DEFAULT_META_VIEW: &str = "schema_meta";

const READ_SAVEPOINT: &str = "try_get_meta";

/// Reads and replaces the version stamp of the schema under migration.
///
/// Both operations run inside the caller's transaction.
pub trait SchemaVersionStore {
    /// The persisted version, or `None` if the schema was never stamped.
    ///
    /// A missing stamp must not abort the enclosing transaction.
    fn try_read(&self, tx: &mut Transaction<'_>) -> Result<Option<SchemaMeta>>;

    /// Replace the stamp so that it reports `meta.version`.
    fn write(&self, tx: &Transaction<'_>, meta: &SchemaMeta) -> Result<()>;
}

/// Stores the version as a view, `SELECT <version> AS version`.
///
/// The view lives in the migrated schema itself, so a reset script that
/// drops everything also drops the stamp.
#[derive(Debug, Clone)]
pub struct ViewVersionStore {
    view: String,
}

impl Default for ViewVersionStore {
    fn default() -> Self {
        Self::new(DEFAULT_META_VIEW)
    }
}

impl ViewVersionStore {
    pub fn new(view: impl Into<String>) -> Self {
        Self { view: view.into() }
    }

    fn select_version(&self, conn: &Connection) -> rusqlite::Result<Vec<Value>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT version FROM {}",
            quote_ident(&self.view)
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, Value>(0))?;
        rows.collect()
    }

    /// Only `no such table: <this view>` means the stamp was never written. A
    /// view that exists but references a dropped table fails with another name.
    fn is_undefined(&self, err: &rusqlite::Error) -> bool {
        let Some(missing) = failure_message(err).and_then(|msg| msg.strip_prefix("no such table: "))
        else {
            return false;
        };
        let missing = missing.strip_prefix("main.").unwrap_or(missing);
        missing == self.view
    }
}

impl SchemaVersionStore for ViewVersionStore {
    fn try_read(&self, tx: &mut Transaction<'_>) -> Result<Option<SchemaMeta>> {
        let mut sp = tx.savepoint_with_name(READ_SAVEPOINT).map_err(|e| {
            Error::Transaction(format!("failed to create transaction savepoint: {e}"))
        })?;

        let rows = match self.select_version(&sp) {
            Ok(rows) => rows,
            Err(e) if self.is_undefined(&e) => {
                debug!("schema meta view {} is not defined", self.view);
                sp.rollback().map_err(|e| {
                    Error::Transaction(format!("failed to rollback to transaction savepoint: {e}"))
                })?;
                sp.commit().map_err(|e| {
                    Error::Transaction(format!("failed to release transaction savepoint: {e}"))
                })?;
                return Ok(None);
            }
            Err(e) if is_unresolved_name(&e) => {
                return Err(Error::Metadata(format!(
                    "schema meta view {} is malformed: {e}",
                    self.view
                )));
            }
            Err(e) => {
                return Err(Error::Transaction(format!(
                    "failed to exec schema meta query: {e}"
                )));
            }
        };

        let [value] = rows.as_slice() else {
            return Err(Error::Metadata(format!(
                "row count: actual = {}, expected = 1",
                rows.len()
            )));
        };
        let meta = SchemaMeta::new(parse_version(value)?);

        sp.commit().map_err(|e| {
            Error::Transaction(format!("failed to release transaction savepoint: {e}"))
        })?;
        Ok(Some(meta))
    }

    fn write(&self, tx: &Transaction<'_>, meta: &SchemaMeta) -> Result<()> {
        let view = quote_ident(&self.view);
        let queries = [
            format!("DROP VIEW IF EXISTS {view};"),
            format!("CREATE VIEW {view} AS SELECT {} AS version;", meta.version),
        ];
        for query in &queries {
            tx.execute_batch(query).map_err(|e| {
                Error::Metadata(format!("failed to write schema meta view {}: {e}", self.view))
            })?;
        }
        debug!("stamped schema version {}", meta.version);
        Ok(())
    }
}

fn parse_version(value: &Value) -> Result<Version> {
    match value {
        Value::Integer(n) => Version::try_from(*n)
            .map_err(|_| Error::Metadata(format!("schema version out of range: {n}"))),
        other => Err(Error::Metadata(format!(
            "schema version is not an integer: {other:?}"
        ))),
    }
}

/// Prepare errors carrying an offset come back as `SqlInputError`.
fn failure_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => Some(msg.as_str()),
        rusqlite::Error::SqlInputError { msg, .. } => Some(msg.as_str()),
        _ => None,
    }
}

/// A name inside the view (or the view's own columns) failed to resolve.
fn is_unresolved_name(err: &rusqlite::Error) -> bool {
    failure_message(err)
        .is_some_and(|msg| msg.starts_with("no such table") || msg.starts_with("no such column"))
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use schemawalk_common::{EMPTY_VERSION, Error, Result, SchemaMeta};
use schemawalk_planner::MigrationPlan;
use tracing::{info, warn};

use crate::store::{SchemaVersionStore, ViewVersionStore};

/// Applies migration plans to a SQLite database, one transaction per plan.
pub struct MigrationExecutor<S = ViewVersionStore> {
    conn: Mutex<Connection>,
    store: S,
}

impl MigrationExecutor<ViewVersionStore> {
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::open_with_store(db_path, ViewVersionStore::default())
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(Self::with_store(conn, ViewVersionStore::default()))
    }
}

impl<S: SchemaVersionStore> MigrationExecutor<S> {
    pub fn open_with_store(db_path: &Path, store: S) -> Result<Self> {
        info!("opening migration target at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(Self::with_store(conn, store))
    }

    pub fn with_store(conn: Connection, store: S) -> Self {
        Self {
            conn: Mutex::new(conn),
            store,
        }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("migration connection lock poisoned".into()))
    }

    /// Run `f` against the underlying connection, outside of any migration.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connection()?;
        f(&conn)
    }

    /// Read the persisted version in a short transaction of its own.
    pub fn read_version(&self) -> Result<Option<SchemaMeta>> {
        let mut conn = self.connection()?;
        let mut tx = conn
            .transaction()
            .map_err(|e| Error::Transaction(format!("failed to begin transaction: {e}")))?;
        let meta = self.store.try_read(&mut tx)?;
        tx.commit()
            .map_err(|e| Error::Transaction(format!("failed to commit transaction: {e}")))?;
        Ok(meta)
    }

    /// Apply every step of `plan` in a single transaction.
    ///
    /// Nothing is committed unless all steps succeed; on failure the
    /// transaction is rolled back before the error is returned.
    pub fn execute(&self, plan: &MigrationPlan) -> Result<()> {
        let mut conn = self.connection()?;
        let mut tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::Transaction(format!("failed to begin transaction: {e}")))?;

        if let Err(e) = self.apply_steps(&mut tx, plan) {
            warn!("migration {plan} failed, rolling back: {e}");
            if let Err(rollback_err) = tx.rollback() {
                warn!("rollback after failed migration also failed: {rollback_err}");
            }
            return Err(e);
        }

        tx.commit()
            .map_err(|e| Error::Transaction(format!("failed to commit transaction: {e}")))?;
        info!("migration {plan} committed");
        Ok(())
    }

    fn apply_steps(&self, tx: &mut Transaction<'_>, plan: &MigrationPlan) -> Result<()> {
        let mut start = plan.start();
        for step in plan.steps() {
            let actual = self
                .store
                .try_read(tx)?
                .map_or(EMPTY_VERSION, |meta| meta.version);
            if actual != start {
                return Err(Error::VersionMismatch {
                    expected: start,
                    actual,
                });
            }

            tx.execute_batch(&step.script)
                .map_err(|e| Error::ScriptFailure {
                    start,
                    end: step.end,
                    cause: e.to_string(),
                })?;

            self.store.write(tx, &SchemaMeta::new(step.end))?;
            info!("applied transition {start} -> {}", step.end);
            start = step.end;
        }
        Ok(())
    }
}

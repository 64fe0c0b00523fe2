//! SQLite-backed copied-file ledger.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::{CopiedLedger, LedgerError};

/// SQLite-backed ledger. One row per copied source path.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(|e| LedgerError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn =
            Connection::open_in_memory().map_err(|e| LedgerError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS copied (
                file TEXT PRIMARY KEY
            );
            "#,
        )
        .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(())
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}

impl CopiedLedger for SqliteLedger {
    fn add(&self, path: &Path) -> Result<(), LedgerError> {
        let conn = self.conn.lock().expect("ledger mutex poisoned");
        // PRIMARY KEY keeps the at-most-once invariant; re-adding is a no-op.
        conn.execute(
            "INSERT OR IGNORE INTO copied(file) VALUES (?1)",
            params![Self::key(path)],
        )
        .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), LedgerError> {
        let conn = self.conn.lock().expect("ledger mutex poisoned");
        conn.execute(
            "DELETE FROM copied WHERE file = ?1",
            params![Self::key(path)],
        )
        .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(())
    }

    fn contains(&self, path: &Path) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().expect("ledger mutex poisoned");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM copied WHERE file = ?1",
                params![Self::key(path)],
                |row| row.get(0),
            )
            .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    fn all(&self) -> Result<Vec<PathBuf>, LedgerError> {
        let conn = self.conn.lock().expect("ledger mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT file FROM copied ORDER BY file")
            .map_err(|e| LedgerError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        let mut paths = Vec::new();
        for row in rows {
            let file = row.map_err(|e| LedgerError::Database(e.to_string()))?;
            paths.push(PathBuf::from(file));
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_contains_remove() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let path = Path::new("/srv/seeding/show/ep1.mkv");

        assert!(!ledger.contains(path).unwrap());
        ledger.add(path).unwrap();
        assert!(ledger.contains(path).unwrap());
        ledger.remove(path).unwrap();
        assert!(!ledger.contains(path).unwrap());
    }

    #[test]
    fn test_duplicate_add_is_single_entry() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let path = Path::new("/srv/seeding/show/ep1.mkv");

        ledger.add(path).unwrap();
        ledger.add(path).unwrap();
        assert_eq!(ledger.all().unwrap().len(), 1);
    }

    #[test]
    fn test_all_enumerates_entries() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.add(Path::new("/a/one.mkv")).unwrap();
        ledger.add(Path::new("/a/two.mkv")).unwrap();

        let all = ledger.all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&PathBuf::from("/a/one.mkv")));
        assert!(all.contains(&PathBuf::from("/a/two.mkv")));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let ledger = SqliteLedger::in_memory().unwrap();
        assert!(ledger.remove(Path::new("/nope.mkv")).is_ok());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("ledger.db");
        let file = Path::new("/srv/seeding/show/ep1.mkv");

        {
            let ledger = SqliteLedger::new(&db_path).unwrap();
            ledger.add(file).unwrap();
        }

        let reopened = SqliteLedger::new(&db_path).unwrap();
        assert!(reopened.contains(file).unwrap());
    }
}

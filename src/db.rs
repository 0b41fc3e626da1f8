use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::model::State;

/// Key of the single state document.
pub const STATE_KEY: &str = "state";

/// Durable home of the state document, always read and written whole.
pub trait StateStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<State>, StoreError>;
    fn save(&self, state: &State) -> Result<(), StoreError>;
}

/// Fallback content for a store that has never been saved to.
pub trait SeedSource {
    fn fetch_seed(&self) -> Result<State, StoreError>;
}

/// Seed read from a JSON dump on disk.
pub struct JsonFileSeed {
    path: PathBuf,
}

impl JsonFileSeed {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        JsonFileSeed { path: path.into() }
    }
}

impl SeedSource for JsonFileSeed {
    fn fetch_seed(&self) -> Result<State, StoreError> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Stored state, else the seed, else an empty default state.
pub fn load_or_seed(store: &dyn StateStore, seed: Option<&dyn SeedSource>) -> Result<State, StoreError> {
    if let Some(state) = store.load()? {
        return Ok(state);
    }
    match seed.map(|s| s.fetch_seed()) {
        Some(Ok(state)) => {
            debug!("no stored state, starting from seed");
            Ok(state)
        }
        Some(Err(e)) => {
            warn!("seed unavailable ({}), starting empty", e);
            Ok(State::default())
        }
        None => Ok(State::default()),
    }
}

/// SQLite-backed store keeping the state as one JSON document.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl StateStore for SqliteStore {
    fn load(&self) -> Result<Option<State>, StoreError> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        debug!("loaded state document ({} bytes)", body.as_ref().map_or(0, String::len));
        match body {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &State) -> Result<(), StoreError> {
        let body = serde_json::to_string(state)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![STATE_KEY, body],
        )?;
        debug!("saved state document ({} bytes)", body.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct FailingSeed;

    impl SeedSource for FailingSeed {
        fn fetch_seed(&self) -> Result<State, StoreError> {
            Err(StoreError::Seed(std::io::Error::new(std::io::ErrorKind::NotFound, "offline")))
        }
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_the_single_document() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteStore::open(file.path()).unwrap();

        let mut state = State::default();
        store.save(&state).unwrap();
        state.config.block_negative = false;
        store.save(&state).unwrap();

        let reopened = SqliteStore::open(file.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(state));
        let rows: i64 = reopened
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn fallback_order_is_store_then_seed_then_default() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut seeded = State::default();
        seeded.config.thresholds.malt = 42.0;
        let mut seed_file = NamedTempFile::new().unwrap();
        seed_file
            .write_all(serde_json::to_string(&seeded).unwrap().as_bytes())
            .unwrap();
        let seed = JsonFileSeed::new(seed_file.path());

        assert_eq!(load_or_seed(&store, Some(&seed as &dyn SeedSource)).unwrap(), seeded);
        assert_eq!(load_or_seed(&store, Some(&FailingSeed as &dyn SeedSource)).unwrap(), State::default());
        assert_eq!(load_or_seed(&store, None).unwrap(), State::default());

        let mut stored = State::default();
        stored.config.block_negative = false;
        store.save(&stored).unwrap();
        assert_eq!(load_or_seed(&store, Some(&seed as &dyn SeedSource)).unwrap(), stored);
    }

    #[test]
    fn corrupt_document_is_a_store_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute("INSERT INTO documents (key, body) VALUES (?1, '{')", params![STATE_KEY])
            .unwrap();
        assert!(matches!(store.load(), Err(StoreError::Serialization(_))));
    }
}

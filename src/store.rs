//! Persistent record store
//!
//! Owns the live database and keeps its encoded snapshot in one key of a
//! durable key-value medium. Every successful insert re-exports the whole
//! database and overwrites that key; there is no incremental persistence, so
//! this only suits small data sets.
//!
//! Lifecycle: `Uninitialized -> Loading -> Ready | Failed`. Inserts and scans
//! are only served in `Ready`.

use crate::codec;
use crate::kv::KeyValueStore;
use crate::record::Record;
use crate::storage::{Database, SqliteEngine};
use crate::{Error, Result};

pub const MSG_LOADING: &str = "Loading database...";
pub const MSG_READY: &str = "Ready to add QR codes!";
pub const MSG_FAILED: &str = "Failed to load the database.";
pub const MSG_INCOMPLETE: &str = "Fill in all fields!";
pub const MSG_NOT_READY: &str = "Database is not ready.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl StoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreState::Uninitialized => "uninitialized",
            StoreState::Loading => "loading",
            StoreState::Ready => "ready",
            StoreState::Failed => "failed",
        }
    }
}

/// Result of a save request that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Record stored and persisted; carries the full row set afterwards
    Saved(Vec<Record>),
    /// Code or image was missing; nothing changed
    Incomplete,
    /// The store is not `Ready`; nothing changed
    NotReady,
}

/// Size information about the current snapshot
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub records: usize,
    pub bytes: usize,
    pub encoded_len: usize,
    pub digest: String,
}

/// Record store persisted into a single key of a key-value medium.
///
/// The store assumes it is the only writer of its key; another instance
/// writing the same key silently replaces this one's snapshot.
pub struct PersistentRecordStore<K: KeyValueStore> {
    engine: SqliteEngine,
    kv: K,
    key: String,
    db: Option<Database>,
    state: StoreState,
    status: String,
}

impl<K: KeyValueStore> PersistentRecordStore<K> {
    pub fn new(engine: SqliteEngine, kv: K, key: impl Into<String>) -> Self {
        Self {
            engine,
            kv,
            key: key.into(),
            db: None,
            state: StoreState::Uninitialized,
            status: MSG_LOADING.to_string(),
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Human-readable status line for the presentation layer
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Load the snapshot from the medium, or bootstrap a fresh database.
    ///
    /// Returns the current row set. Any failure leaves the store `Failed`.
    pub fn initialize(&mut self) -> Result<Vec<Record>> {
        match self.state {
            StoreState::Uninitialized | StoreState::Failed => {}
            StoreState::Loading | StoreState::Ready => return Err(Error::AlreadyInitialized),
        }

        self.state = StoreState::Loading;
        self.status = MSG_LOADING.to_string();

        match self.load() {
            Ok((db, records)) => {
                self.db = Some(db);
                self.state = StoreState::Ready;
                self.status = MSG_READY.to_string();
                Ok(records)
            }
            Err(e) => {
                tracing::error!("Error initializing database: {}", e);
                self.db = None;
                self.state = StoreState::Failed;
                self.status = MSG_FAILED.to_string();
                Err(e)
            }
        }
    }

    fn load(&self) -> Result<(Database, Vec<Record>)> {
        self.engine.check()?;

        // An empty slot counts as absent
        let saved = self.kv.get(&self.key)?.filter(|text| !text.is_empty());

        let db = match saved {
            Some(text) => {
                let bytes = codec::decode_snapshot(&text)?;
                let db = self.engine.open(Some(bytes.as_slice()))?;
                tracing::info!("Database loaded from key {}", self.key);
                db
            }
            None => {
                tracing::info!("No snapshot under key {}, creating a new database", self.key);
                self.engine.open(None)?
            }
        };

        db.bootstrap()?;
        let records = db.scan()?;
        Ok((db, records))
    }

    /// Store a new (code, image) pair and persist the snapshot.
    ///
    /// Missing input or a store that is not ready is a no-op reported through
    /// the outcome and `status()`. Duplicate codes, SQL errors and
    /// persistence failures are returned as errors; after a persistence
    /// failure the new row is removed from the live database again.
    pub fn insert_record(&mut self, code: &str, image: Option<&str>) -> Result<SaveOutcome> {
        let image = image.unwrap_or_default();
        let db = match self.db.as_mut() {
            Some(db) if self.state == StoreState::Ready => db,
            _ => {
                self.status = MSG_INCOMPLETE.to_string();
                return Ok(SaveOutcome::NotReady);
            }
        };
        if code.is_empty() || image.is_empty() {
            self.status = MSG_INCOMPLETE.to_string();
            return Ok(SaveOutcome::Incomplete);
        }

        db.insert(&Record::new(code, image))?;
        if let Err(e) = self.persist() {
            // Keep the live handle in step with what is durable
            tracing::warn!("Could not persist QR code {}, removing it again: {}", code, e);
            if let Some(db) = self.db.as_mut() {
                db.delete(code)?;
            }
            return Err(e);
        }

        let records = self.scan()?;
        self.status = format!("QR code {} and image saved!", code);
        tracing::info!("Saved QR code {} ({} records)", code, records.len());
        Ok(SaveOutcome::Saved(records))
    }

    /// Every stored record, in the engine's default scan order
    pub fn fetch_all_records(&mut self) -> Result<Vec<Record>> {
        if self.state != StoreState::Ready {
            self.status = MSG_NOT_READY.to_string();
            return Err(Error::NotReady);
        }
        self.scan()
    }

    /// Size and digest of the snapshot that would be persisted right now
    pub fn snapshot_info(&self) -> Result<SnapshotInfo> {
        let db = self.ready_db()?;
        let bytes = db.export()?;
        Ok(SnapshotInfo {
            records: db.count()?,
            bytes: bytes.len(),
            encoded_len: codec::encode_snapshot(&bytes).len(),
            digest: codec::snapshot_digest(&bytes),
        })
    }

    fn scan(&self) -> Result<Vec<Record>> {
        self.ready_db()?.scan()
    }

    fn ready_db(&self) -> Result<&Database> {
        match self.db.as_ref() {
            Some(db) if self.state == StoreState::Ready => Ok(db),
            _ => Err(Error::NotReady),
        }
    }

    fn persist(&mut self) -> Result<()> {
        let bytes = self.ready_db()?.export()?;
        let text = codec::encode_snapshot(&bytes);
        self.kv.set(&self.key, &text)?;
        tracing::info!("Database saved to key {} ({} bytes)", self.key, text.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    const KEY: &str = "sqlite-db";

    fn engine(dir: &tempfile::TempDir) -> SqliteEngine {
        SqliteEngine::start(dir.path().join("scratch")).unwrap()
    }

    fn ready_store(dir: &tempfile::TempDir, kv: MemoryKv) -> PersistentRecordStore<MemoryKv> {
        let mut store = PersistentRecordStore::new(engine(dir), kv, KEY);
        store.initialize().unwrap();
        store
    }

    fn reload(dir: &tempfile::TempDir, store: PersistentRecordStore<MemoryKv>) -> PersistentRecordStore<MemoryKv> {
        ready_store(dir, store.kv().clone())
    }

    /// Medium whose writes always fail, like a full browser quota
    #[derive(Debug, Clone, Default)]
    struct ReadOnlyKv {
        inner: MemoryKv,
    }

    impl KeyValueStore for ReadOnlyKv {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_fresh_store_is_empty_and_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());

        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(store.status(), MSG_READY);
        assert!(store.fetch_all_records().unwrap().is_empty());
    }

    #[test]
    fn test_insert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());
        let expected = vec![Record::new("1", "data:image/png;base64,AAAA")];

        let outcome = store.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();
        assert_eq!(outcome, SaveOutcome::Saved(expected.clone()));
        assert_eq!(store.status(), "QR code 1 and image saved!");
        assert!(store.kv().get(KEY).unwrap().is_some());

        let mut reloaded = reload(&dir, store);
        assert_eq!(reloaded.fetch_all_records().unwrap(), expected);
    }

    #[test]
    fn test_round_trip_preserves_many_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());
        for i in 0..25 {
            let image = format!("data:image/png;base64,{}", "QUJD".repeat(i + 1));
            store.insert_record(&i.to_string(), Some(image.as_str())).unwrap();
        }
        let mut before = store.fetch_all_records().unwrap();

        let mut reloaded = reload(&dir, store);
        let mut after = reloaded.fetch_all_records().unwrap();

        before.sort_by(|a, b| a.code.cmp(&b.code));
        after.sort_by(|a, b| a.code.cmp(&b.code));
        assert_eq!(before.len(), 25);
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_code_keeps_first_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());

        store.insert_record("2", Some("data:image/png;base64,BBBB")).unwrap();
        let err = store.insert_record("2", Some("data:image/png;base64,CCCC")).unwrap_err();

        assert!(matches!(err, Error::ConstraintViolation { .. }));
        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(
            store.fetch_all_records().unwrap(),
            vec![Record::new("2", "data:image/png;base64,BBBB")]
        );
    }

    #[test]
    fn test_missing_input_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());
        store.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();
        let before = store.fetch_all_records().unwrap();
        let saved = store.kv().get(KEY).unwrap();

        assert_eq!(store.insert_record("", Some("data:image/png;base64,BBBB")).unwrap(), SaveOutcome::Incomplete);
        assert_eq!(store.status(), MSG_INCOMPLETE);
        assert_eq!(store.insert_record("3", None).unwrap(), SaveOutcome::Incomplete);
        assert_eq!(store.insert_record("3", Some("")).unwrap(), SaveOutcome::Incomplete);

        assert_eq!(store.fetch_all_records().unwrap(), before);
        assert_eq!(store.kv().get(KEY).unwrap(), saved);
    }

    #[test]
    fn test_operations_rejected_before_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentRecordStore::new(engine(&dir), MemoryKv::new(), KEY);

        assert_eq!(store.state(), StoreState::Uninitialized);
        assert_eq!(store.status(), MSG_LOADING);
        assert_eq!(store.insert_record("1", Some("data:,x")).unwrap(), SaveOutcome::NotReady);
        assert!(matches!(store.fetch_all_records(), Err(Error::NotReady)));
        assert_eq!(store.status(), MSG_NOT_READY);
        assert!(store.kv().get(KEY).unwrap().is_none());
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());

        assert!(matches!(store.initialize(), Err(Error::AlreadyInitialized)));
        assert_eq!(store.state(), StoreState::Ready);
    }

    #[test]
    fn test_corrupt_snapshot_fails_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = MemoryKv::new();
        kv.set(KEY, "!!! definitely not base64 !!!").unwrap();

        let mut store = PersistentRecordStore::new(engine(&dir), kv, KEY);
        let err = store.initialize().unwrap_err();

        assert!(matches!(err, Error::DecodeFailure(_)));
        assert_eq!(store.state(), StoreState::Failed);
        assert_eq!(store.status(), MSG_FAILED);
        assert_eq!(store.insert_record("1", Some("data:,x")).unwrap(), SaveOutcome::NotReady);
    }

    #[test]
    fn test_engine_unavailable_fails_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        std::fs::remove_dir_all(engine.scratch_dir()).unwrap();

        let mut store = PersistentRecordStore::new(engine, MemoryKv::new(), KEY);
        assert!(matches!(store.initialize(), Err(Error::EngineUnavailable(_))));
        assert_eq!(store.state(), StoreState::Failed);
    }

    #[test]
    fn test_empty_slot_bootstraps_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = MemoryKv::new();
        kv.set(KEY, "").unwrap();

        let mut store = ready_store(&dir, kv);
        assert!(store.fetch_all_records().unwrap().is_empty());
    }

    #[test]
    fn test_failed_persist_removes_row_and_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentRecordStore::new(engine(&dir), ReadOnlyKv::default(), KEY);
        store.initialize().unwrap();

        let err = store.insert_record("1", Some("data:,x")).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.fetch_all_records().unwrap().is_empty());
        assert!(store.kv().get(KEY).unwrap().is_none());

        // Same code again hits the medium, not the primary key
        let err = store.insert_record("1", Some("data:,x")).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.state(), StoreState::Ready);
    }

    #[test]
    fn test_failed_persist_keeps_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut seeded = ready_store(&dir, MemoryKv::new());
        seeded.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();

        let kv = ReadOnlyKv { inner: seeded.kv().clone() };
        let mut store = PersistentRecordStore::new(engine(&dir), kv, KEY);
        store.initialize().unwrap();

        assert!(store.insert_record("2", Some("data:image/png;base64,BBBB")).is_err());
        assert_eq!(
            store.fetch_all_records().unwrap(),
            vec![Record::new("1", "data:image/png;base64,AAAA")]
        );
    }

    #[test]
    fn test_snapshot_without_table_is_bootstrapped() {
        let dir = tempfile::tempdir().unwrap();
        let bare = engine(&dir).open(None).unwrap().export().unwrap();
        let mut kv = MemoryKv::new();
        kv.set(KEY, &codec::encode_snapshot(&bare)).unwrap();

        let mut store = PersistentRecordStore::new(engine(&dir), kv, KEY);
        assert!(store.initialize().unwrap().is_empty());

        let outcome = store.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();
        assert_eq!(outcome, SaveOutcome::Saved(vec![Record::new("1", "data:image/png;base64,AAAA")]));
    }

    #[test]
    fn test_truncated_snapshot_fails_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut seeded = ready_store(&dir, MemoryKv::new());
        seeded.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();

        let saved = seeded.kv().get(KEY).unwrap().unwrap();
        let mut bytes = codec::decode_snapshot(&saved).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(bytes.starts_with(codec::SQLITE_HEADER));

        let mut kv = MemoryKv::new();
        kv.set(KEY, &codec::encode_snapshot(&bytes)).unwrap();
        let mut store = PersistentRecordStore::new(engine(&dir), kv, KEY);

        assert!(matches!(store.initialize(), Err(Error::DecodeFailure(_))));
        assert_eq!(store.state(), StoreState::Failed);
        assert_eq!(store.status(), MSG_FAILED);
    }

    #[test]
    fn test_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());
        store.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();

        let mut other = PersistentRecordStore::new(engine(&dir), store.kv().clone(), "other-db");
        assert!(other.initialize().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_info_matches_persisted_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ready_store(&dir, MemoryKv::new());
        store.insert_record("1", Some("data:image/png;base64,AAAA")).unwrap();

        let info = store.snapshot_info().unwrap();
        let saved = store.kv().get(KEY).unwrap().unwrap();

        assert_eq!(info.records, 1);
        assert_eq!(info.encoded_len, saved.len());
        assert_eq!(info.digest.len(), 64);
    }
}

use crate::error::InventoryError;
use crate::saving;
use crate::session::InventorySession;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use uuid::Uuid;

/// Where sessions live between requests.
///
/// Each session id owns its entry exclusively. Expired sessions are dropped
/// on lookup and by [`SessionStore::purge_expired`].
pub trait SessionStore: Send + Sync {
    /// The live session for `id`, or `None` if there is none or it expired.
    fn load(&self, id: &str) -> Result<Option<InventorySession>, InventoryError>;

    fn save(&self, id: &str, session: &InventorySession) -> Result<(), InventoryError>;

    /// Drop the session. Removing an unknown id is not an error.
    fn remove(&self, id: &str) -> Result<(), InventoryError>;

    /// Drop every expired session, returning how many were removed.
    fn purge_expired(&self) -> Result<usize, InventoryError>;
}

/// Fresh random session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Sessions held in server memory.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, InventorySession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the session for `id` if it is expired at `now`.
    ///
    /// Expiry is checked again under the write lock, so a fresh session saved
    /// under the same id since the caller looked is kept.
    fn remove_if_expired(&self, id: &str, now: DateTime<Utc>) -> Result<bool, InventoryError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        if sessions.get(id).is_some_and(|session| session.is_expired(now)) {
            sessions.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

fn poisoned<T>(_: T) -> InventoryError {
    InventoryError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "session store lock poisoned",
    ))
}

impl SessionStore for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<InventorySession>, InventoryError> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().map_err(poisoned)?;
            match sessions.get(id) {
                None => return Ok(None),
                Some(session) if !session.is_expired(now) => {
                    return Ok(Some(session.clone()));
                }
                Some(_) => {}
            }
        }

        if self.remove_if_expired(id, now)? {
            log::info!("session {} expired", id);
        }
        Ok(None)
    }

    fn save(&self, id: &str, session: &InventorySession) -> Result<(), InventoryError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(id.to_string(), session.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), InventoryError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(id);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, InventoryError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

/// Sessions stored one file per id under a data directory,
/// as `session_<id>.bin.gz`.
pub struct DiskStore {
    dir: PathBuf,
}

const FILE_PREFIX: &str = "session_";
const FILE_SUFFIX: &str = ".bin.gz";

impl DiskStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, InventoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DiskStore { dir })
    }

    /// File for `id`. Only UUIDs map to paths, so a cookie can never
    /// point outside the data directory.
    fn session_path(&self, id: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(id).ok()?;
        Some(
            self.dir
                .join(format!("{}{}{}", FILE_PREFIX, id.hyphenated(), FILE_SUFFIX)),
        )
    }
}

impl SessionStore for DiskStore {
    fn load(&self, id: &str) -> Result<Option<InventorySession>, InventoryError> {
        let Some(path) = self.session_path(id) else {
            return Ok(None);
        };

        let session = match saving::load_session(&path) {
            Ok(session) => session,
            Err(InventoryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if session.is_expired(Utc::now()) {
            log::info!("session {} expired", id);
            self.remove(id)?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    fn save(&self, id: &str, session: &InventorySession) -> Result<(), InventoryError> {
        let path = self
            .session_path(id)
            .ok_or_else(|| InventoryError::InvalidRequest(format!("bad session id: {}", id)))?;
        saving::save_session(session, &path)
    }

    fn remove(&self, id: &str) -> Result<(), InventoryError> {
        if let Some(path) = self.session_path(id) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, InventoryError> {
        let now = Utc::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            let is_session_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX));
            if !is_session_file {
                continue;
            }

            // Only the expiry header is read. Unreadable files are left for
            // the owning session to report.
            match saving::load_expiry(&path) {
                Ok(expires_at) if expires_at <= now => {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("skipping unreadable session file {}: {}", path.display(), e),
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::dataset::Dataset;
    use chrono::Duration;

    fn session(ttl: Duration) -> InventorySession {
        let ds = Dataset::from_parts(
            vec!["code".into()],
            vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]],
        );
        InventorySession::new(ds, "stock.csv", ttl)
    }

    fn exercise(store: &dyn SessionStore) {
        let id = new_session_id();
        assert!(store.load(&id).unwrap().is_none());

        let mut s = session(Duration::hours(1));
        s.scan("2").unwrap();
        store.save(&id, &s).unwrap();
        assert_eq!(store.load(&id).unwrap(), Some(s));

        store.remove(&id).unwrap();
        assert!(store.load(&id).unwrap().is_none());
        store.remove(&id).unwrap();
    }

    fn expiry(store: &dyn SessionStore) {
        let live = new_session_id();
        let dead = new_session_id();
        store.save(&live, &session(Duration::hours(1))).unwrap();
        store.save(&dead, &session(Duration::seconds(-1))).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.load(&live).unwrap().is_some());
        assert!(store.load(&dead).unwrap().is_none());
    }

    #[test]
    fn memory_store_lifecycle() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn disk_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&DiskStore::open(dir.path()).unwrap());
    }

    #[test]
    fn expired_sessions_are_purged() {
        expiry(&MemoryStore::new());
        let dir = tempfile::tempdir().unwrap();
        expiry(&DiskStore::open(dir.path()).unwrap());
    }

    #[test]
    fn expired_session_is_dropped_on_load() {
        let store = MemoryStore::new();
        let id = new_session_id();
        store.save(&id, &session(Duration::seconds(-1))).unwrap();
        assert!(store.load(&id).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn fresh_session_survives_a_stale_expiry_check() {
        let store = MemoryStore::new();
        let id = new_session_id();
        store.save(&id, &session(Duration::seconds(-1))).unwrap();

        // A re-upload replaces the expired entry before the write lock is taken.
        store.save(&id, &session(Duration::hours(1))).unwrap();
        assert!(!store.remove_if_expired(&id, Utc::now()).unwrap());
        assert!(store.load(&id).unwrap().is_some());

        store.save(&id, &session(Duration::seconds(-1))).unwrap();
        assert!(store.remove_if_expired(&id, Utc::now()).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn disk_loads_never_see_a_half_written_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let id = new_session_id();

        let rows = (0..5_000)
            .map(|i| vec![CellValue::Int(i), CellValue::Text(format!("item-{}", i))])
            .collect();
        let ds = Dataset::from_parts(vec!["code".into(), "name".into()], rows);
        let mut big = InventorySession::new(ds, "big.csv", Duration::hours(1));
        store.save(&id, &big).unwrap();

        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for i in 0..30 {
                    big.scan(&i.to_string()).unwrap();
                    store.save(&id, &big).unwrap();
                }
            });

            for _ in 0..200 {
                let loaded = store.load(&id).unwrap();
                assert!(loaded.is_some());
            }
            writer.join().unwrap();
        });

        assert_eq!(store.load(&id).unwrap().unwrap().scanned.len(), 30);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn disk_purge_reads_only_the_expiry_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let stale = new_session_id();
        let live = new_session_id();

        // Valid expired header followed by an undecodable body.
        let mut bytes = (Utc::now() - Duration::hours(1))
            .timestamp_millis()
            .to_be_bytes()
            .to_vec();
        bytes.extend_from_slice(b"not a gzip stream");
        fs::write(dir.path().join(format!("session_{}.bin.gz", stale)), bytes).unwrap();
        store.save(&live, &session(Duration::hours(1))).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.load(&stale).unwrap().is_none());
        assert!(store.load(&live).unwrap().is_some());
    }

    #[test]
    fn disk_store_ignores_non_uuid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        assert!(store.load("../../etc/passwd").unwrap().is_none());
        assert!(store.save("../escape", &session(Duration::hours(1))).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_disk_session_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let id = new_session_id();
        let path = dir.path().join(format!("session_{}.bin.gz", id));
        fs::write(&path, b"garbage").unwrap();
        let err = store.load(&id).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}

//! File-backed session store.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};

use edugate_auth::{
    validate_record, SessionRecord, SessionStore, SessionStoreError, LEGACY_SESSION_KEYS,
    SESSION_KEY,
};

/// Durable session store: one JSON document under the app data directory,
/// `{data_dir}/edugate/hod-session.json`.
///
/// Reads tolerate corrupt or stale content (treated as absent). Writes go
/// through a temp file and a rename, so a crash never leaves a half-written
/// record on disk.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    /// Volatile copy; dropped on `clear()`.
    cached: Mutex<Option<SessionRecord>>,
}

impl FileSessionStore {
    /// Open (and create) the store under the OS data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let base = dirs::data_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut h| {
                    h.push(".local");
                    h.push("share");
                    h
                })
            })
            .context("failed to resolve OS app data directory")?;

        let mut dir = base;
        dir.push("edugate");
        Self::open_at(dir)
    }

    /// Open (and create) the store at an explicit directory.
    pub fn open_at(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session dir at {dir:?}"))?;
        Ok(Self {
            dir,
            cached: Mutex::new(None),
        })
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(format!("{SESSION_KEY}.json"))
    }

    fn remove_key(&self, file_name: &str) {
        let path = self.dir.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(?path, error = %err, "failed to remove session key");
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self, now: DateTime<Utc>) -> Option<SessionRecord> {
        {
            let cached = self
                .cached
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(record) = cached.as_ref() {
                if validate_record(record, now).is_ok() {
                    return Some(record.clone());
                }
            }
        }

        let raw = match fs::read_to_string(self.record_path()) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read session record");
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unparsable session record");
                return None;
            }
        };

        if let Err(reason) = validate_record(&record, now) {
            tracing::debug!(%reason, "persisted session record invalid");
            return None;
        }

        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *cached = Some(record.clone());
        Some(record)
    }

    fn write(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let payload = serde_json::to_string(record)?;
        let path = self.record_path();
        let tmp = self.dir.join(format!("{SESSION_KEY}.json.tmp"));

        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &path)?;

        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *cached = Some(record.clone());
        Ok(())
    }

    fn clear(&self) {
        {
            let mut cached = self
                .cached
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *cached = None;
        }

        self.remove_key(&format!("{SESSION_KEY}.json"));
        self.remove_key(&format!("{SESSION_KEY}.json.tmp"));
        for key in LEGACY_SESSION_KEYS {
            self.remove_key(&format!("{key}.json"));
        }
    }
}

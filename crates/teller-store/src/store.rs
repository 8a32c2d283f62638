//! The call record store: in-memory index with a durable on-disk mirror.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use teller_types::CallRecord;

use crate::error::StoreError;

/// Keyed persistence of per-call metadata.
///
/// Reads are served from the in-memory index; every upsert rewrites the
/// record's JSON file atomically. [`CallStore::open`] rehydrates the index
/// from disk, restoring transcript continuity after a restart.
#[derive(Debug)]
pub struct CallStore {
    dir: PathBuf,
    index: RwLock<HashMap<String, CallRecord>>,
}

impl CallStore {
    /// Opens the store rooted at `dir`, creating the directory if needed and
    /// hydrating the index from any records already on disk.
    ///
    /// Unparseable record files are skipped with a warning rather than
    /// failing startup; a corrupt mirror for one call must not take the
    /// whole relay down.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut index = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read(&path).map_err(StoreError::from).and_then(|b| {
                serde_json::from_slice::<CallRecord>(&b).map_err(StoreError::from)
            }) {
                Ok(record) => {
                    index.insert(record.call_sid.clone(), record);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable call record: {}", e);
                }
            }
        }

        if !index.is_empty() {
            tracing::info!(count = index.len(), dir = %dir.display(), "hydrated call records from disk");
        }

        Ok(Self {
            dir,
            index: RwLock::new(index),
        })
    }

    /// Upserts the record for `call_sid` and mirrors it to disk.
    ///
    /// A `None` account number preserves any previously stored account
    /// number; the transcript always replaces the stored one. The record's
    /// `last_update` is stamped with the current time.
    pub async fn save_call(
        &self,
        call_sid: &str,
        account_number: Option<String>,
        transcript: String,
    ) -> Result<CallRecord, StoreError> {
        validate_call_sid(call_sid)?;

        let record = {
            let mut index = self.index.write().expect("call store index lock poisoned");
            let previous_account = index
                .get(call_sid)
                .and_then(|existing| existing.account_number.clone());
            let record = CallRecord {
                call_sid: call_sid.to_string(),
                account_number: account_number.or(previous_account),
                transcript,
                last_update: Utc::now(),
            };
            index.insert(call_sid.to_string(), record.clone());
            record
        };

        self.write_mirror(&record).await?;
        Ok(record)
    }

    /// Returns the record for `call_sid`, if any.
    pub fn get_call(&self, call_sid: &str) -> Option<CallRecord> {
        self.index
            .read()
            .expect("call store index lock poisoned")
            .get(call_sid)
            .cloned()
    }

    /// Writes `record` to its mirror file atomically: the JSON is written to
    /// a temp file in the same directory and renamed over the target, so a
    /// crash mid-write never leaves a truncated record behind.
    async fn write_mirror(&self, record: &CallRecord) -> Result<(), StoreError> {
        let target = self.dir.join(format!("{}.json", record.call_sid));
        let tmp = self.dir.join(format!("{}.json.tmp", record.call_sid));

        let bytes = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }
}

/// Rejects call identifiers that cannot safely name a file.
///
/// Carrier call identifiers are alphanumeric in practice; anything else is
/// refused rather than sanitized so a hostile identifier can never escape
/// the store directory.
fn validate_call_sid(call_sid: &str) -> Result<(), StoreError> {
    let ok = !call_sid.is_empty()
        && call_sid.len() <= 128
        && call_sid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidCallId(call_sid.to_string()))
    }
}

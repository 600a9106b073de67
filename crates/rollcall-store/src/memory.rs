//! In-process gallery and ledger.

use chrono::NaiveDate;
use rollcall_core::{
    AttendanceRecord, GalleryEntry, GalleryReader, GalleryWriter, InsertOutcome, LedgerStore,
    StoreError,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

type LedgerKey = (String, NaiveDate);

/// Thread-safe store that lives and dies with the process.
#[derive(Default)]
pub struct MemoryStore {
    gallery: RwLock<Vec<GalleryEntry>>,
    ledger: Mutex<HashMap<LedgerKey, AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attendance records across all identities and days.
    pub fn record_count(&self) -> Result<usize, StoreError> {
        Ok(self.ledger.lock().map_err(|_| poisoned())?.len())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

impl GalleryReader for MemoryStore {
    fn load_gallery(&self) -> Result<Vec<GalleryEntry>, StoreError> {
        Ok(self.gallery.read().map_err(|_| poisoned())?.clone())
    }
}

impl GalleryWriter for MemoryStore {
    fn upsert(&self, entry: &GalleryEntry) -> Result<(), StoreError> {
        let mut gallery = self.gallery.write().map_err(|_| poisoned())?;
        match gallery
            .iter_mut()
            .find(|e| e.identity_id == entry.identity_id)
        {
            Some(existing) => existing.embedding = entry.embedding.clone(),
            None => gallery.push(entry.clone()),
        }
        Ok(())
    }

    fn remove(&self, identity_id: &str) -> Result<bool, StoreError> {
        let mut gallery = self.gallery.write().map_err(|_| poisoned())?;
        let before = gallery.len();
        gallery.retain(|e| e.identity_id != identity_id);
        Ok(gallery.len() != before)
    }
}

impl LedgerStore for MemoryStore {
    fn find_record(
        &self,
        identity_id: &str,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let ledger = self.ledger.lock().map_err(|_| poisoned())?;
        Ok(ledger.get(&(identity_id.to_string(), day)).cloned())
    }

    fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<InsertOutcome, StoreError> {
        let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
        match ledger.entry((record.identity_id.clone(), record.day())) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}

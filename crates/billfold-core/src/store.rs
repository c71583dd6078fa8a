//! Persistence seam for receipt records
//!
//! The database engine lives outside this crate; callers hand records to
//! whatever implements [`ReceiptStore`]. The store is assumed to serialize
//! access per record (one writer at a time keyed by bill id), so the trait
//! takes `&self` and implementations manage their own interior locking.

use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::ReceiptRecord;

/// Storage collaborator contract
pub trait ReceiptStore: Send + Sync {
    /// Insert or replace the record keyed by its bill id.
    fn save(&self, record: &ReceiptRecord) -> Result<()>;

    /// Duplicate lookup by bill id.
    fn exists(&self, bill_id: &str) -> Result<bool>;

    /// All persisted records, newest date first.
    fn fetch_all(&self) -> Result<Vec<ReceiptRecord>>;

    fn delete(&self, bill_id: &str) -> Result<()>;
}

/// In-memory store used by tests and small deployments
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ReceiptRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReceiptStore for MemoryStore {
    fn save(&self, record: &ReceiptRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| Error::Store(e.to_string()))?;
        if let Some(existing) = records.iter_mut().find(|r| r.bill_id == record.bill_id) {
            *existing = record.clone();
        } else {
            records.push(record.clone());
        }
        Ok(())
    }

    fn exists(&self, bill_id: &str) -> Result<bool> {
        let records = self
            .records
            .lock()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(records.iter().any(|r| r.bill_id == bill_id))
    }

    fn fetch_all(&self) -> Result<Vec<ReceiptRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| Error::Store(e.to_string()))?;
        let mut all = records.clone();
        // ISO dates sort lexicographically
        all.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(all)
    }

    fn delete(&self, bill_id: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| Error::Store(e.to_string()))?;
        records.retain(|r| r.bill_id != bill_id);
        Ok(())
    }
}

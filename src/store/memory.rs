use super::{ExistingRow, ObservationStore};
use crate::error::{IngestError, Result};
use crate::models::{FieldValue, Observation, Station};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A persisted row as the memory store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub station_name: String,
    pub station_id: String,
    pub geometry_wkt: String,
    pub srid: i32,
    pub timestamp: NaiveDateTime,
    pub fields: BTreeMap<String, FieldValue>,
}

impl StoredRow {
    pub fn get(&self, field: &str) -> FieldValue {
        self.fields.get(field).copied().unwrap_or(FieldValue::Null)
    }
}

type RowKey = (String, NaiveDateTime);

/// In-process [`ObservationStore`] with the same semantics as the table.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<RowKey, StoredRow>>,
    failing: Mutex<HashSet<NaiveDateTime>>,
    failing_deletes: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `timestamp` fail, to exercise error paths.
    pub fn fail_writes_at(&self, timestamp: NaiveDateTime) {
        self.lock_failing().insert(timestamp);
    }

    /// Make retention deletes for `station_name` fail.
    pub fn fail_deletes_for(&self, station_name: &str) {
        self.failing_deletes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(station_name.to_string());
    }

    pub fn seed(&self, row: StoredRow) {
        self.lock_rows()
            .insert((row.station_name.clone(), row.timestamp), row);
    }

    pub fn get(&self, station_name: &str, timestamp: NaiveDateTime) -> Option<StoredRow> {
        self.lock_rows()
            .get(&(station_name.to_string(), timestamp))
            .cloned()
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.lock_rows().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts plus column fills performed so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<RowKey, StoredRow>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, HashSet<NaiveDateTime>> {
        self.failing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self, timestamp: NaiveDateTime) -> Result<()> {
        if self.lock_failing().contains(&timestamp) {
            return Err(IngestError::Store(format!("write rejected at {}", timestamp)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn delete_before(&self, station_name: &str, cutoff: NaiveDateTime) -> Result<u64> {
        let rejected = self
            .failing_deletes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(station_name);
        if rejected {
            return Err(IngestError::Store(format!("delete rejected for {}", station_name)));
        }

        let mut rows = self.lock_rows();
        let before = rows.len();
        rows.retain(|(name, ts), _| name != station_name || *ts >= cutoff);
        Ok((before - rows.len()) as u64)
    }

    async fn find_row(
        &self,
        station_name: &str,
        timestamp: NaiveDateTime,
        fields: &[&str],
    ) -> Result<Option<ExistingRow>> {
        let rows = self.lock_rows();
        Ok(rows
            .get(&(station_name.to_string(), timestamp))
            .map(|row| ExistingRow::new(fields.iter().filter(|f| row.get(f).is_null()).copied())))
    }

    async fn insert(&self, station: &Station, observation: &Observation) -> Result<()> {
        self.check_writable(observation.timestamp)?;

        let key = (station.name.clone(), observation.timestamp);
        let mut rows = self.lock_rows();
        if rows.contains_key(&key) {
            return Err(IngestError::Store(format!(
                "duplicate key ({}, {})",
                station.name, observation.timestamp
            )));
        }

        rows.insert(
            key,
            StoredRow {
                station_name: station.name.clone(),
                station_id: station.id.clone(),
                geometry_wkt: station.wkt_point(),
                srid: station.srid(),
                timestamp: observation.timestamp,
                fields: observation.fields.iter().cloned().collect(),
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn fill_field(
        &self,
        station_name: &str,
        timestamp: NaiveDateTime,
        field: &str,
        value: FieldValue,
    ) -> Result<bool> {
        self.check_writable(timestamp)?;

        let mut rows = self.lock_rows();
        let Some(row) = rows.get_mut(&(station_name.to_string(), timestamp)) else {
            return Ok(false);
        };
        if !row.get(field).is_null() {
            return Ok(false);
        }

        row.fields.insert(field.to_string(), value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}

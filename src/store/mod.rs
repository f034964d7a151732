//! Persistence of observations in the `dwd_poi` table.
//!
//! The reconciler and retention pruner talk to an [`ObservationStore`]; the
//! production backend is PostGIS ([`PostgresStore`]), tests use
//! [`MemoryStore`].

pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::models::{FieldValue, Observation, Station};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashSet;

pub use memory::{MemoryStore, StoredRow};
pub use postgres::PostgresStore;

/// Null-ness of the requested fields on an existing row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistingRow {
    null_fields: HashSet<String>,
}

impl ExistingRow {
    pub fn new<I, S>(null_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            null_fields: null_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(&self, field: &str) -> bool {
        self.null_fields.contains(field)
    }
}

#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Delete the station's rows older than `cutoff`; returns the number removed.
    async fn delete_before(&self, station_name: &str, cutoff: NaiveDateTime) -> Result<u64>;

    /// Look up the row for (station, timestamp), reporting which of `fields` are null.
    async fn find_row(
        &self,
        station_name: &str,
        timestamp: NaiveDateTime,
        fields: &[&str],
    ) -> Result<Option<ExistingRow>>;

    async fn insert(&self, station: &Station, observation: &Observation) -> Result<()>;

    /// Set `field` only while it is still null; returns whether a row changed.
    async fn fill_field(
        &self,
        station_name: &str,
        timestamp: NaiveDateTime,
        field: &str,
        value: FieldValue,
    ) -> Result<bool>;
}

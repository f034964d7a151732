use crate::error::Result;
use crate::models::{Observation, Station};
use crate::store::ObservationStore;
use serde::Serialize;
use tracing::{debug, error, info};

/// Counts from applying one station's observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Individual columns filled across all updated rows
    pub fields_filled: usize,
}

impl ReconcileReport {
    pub fn writes(&self) -> usize {
        self.inserted + self.fields_filled
    }
}

enum Outcome {
    Inserted,
    Updated(usize),
    Unchanged,
}

/// Inserts new (station, timestamp) rows and fills null columns of existing
/// ones. A populated column is never overwritten.
pub struct Reconciler<'a> {
    store: &'a dyn ObservationStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn ObservationStore) -> Self {
        Self { store }
    }

    pub async fn apply(&self, station: &Station, observations: &[Observation]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for observation in observations {
            match self.apply_one(station, observation).await {
                Ok(Outcome::Inserted) => report.inserted += 1,
                Ok(Outcome::Updated(filled)) => {
                    report.updated += 1;
                    report.fields_filled += filled;
                }
                Ok(Outcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    error!(
                        operation = "reconcile",
                        timestamp = %observation.timestamp,
                        error = %e,
                        "failed to store observation"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            "reconciled observations"
        );
        report
    }

    async fn apply_one(&self, station: &Station, observation: &Observation) -> Result<Outcome> {
        let fields: Vec<&str> = observation.field_names().collect();
        let existing = self
            .store
            .find_row(&station.name, observation.timestamp, &fields)
            .await?;

        let Some(existing) = existing else {
            self.store.insert(station, observation).await?;
            debug!(timestamp = %observation.timestamp, "inserted new row");
            return Ok(Outcome::Inserted);
        };

        let mut filled = 0;
        for (field, value) in &observation.fields {
            if value.is_null() || !existing.is_null(field) {
                continue;
            }
            if self
                .store
                .fill_field(&station.name, observation.timestamp, field, *value)
                .await?
            {
                debug!(timestamp = %observation.timestamp, field = %field, value = %value, "filled null field");
                filled += 1;
            }
        }

        Ok(if filled > 0 {
            Outcome::Updated(filled)
        } else {
            Outcome::Unchanged
        })
    }
}

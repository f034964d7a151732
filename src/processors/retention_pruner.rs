use crate::error::Result;
use crate::models::Station;
use crate::store::ObservationStore;
use chrono::{Duration, NaiveDateTime};
use tracing::info;

/// Removes a station's observations older than the retention horizon.
pub struct RetentionPruner<'a> {
    store: &'a dyn ObservationStore,
    retention_days: f64,
}

impl<'a> RetentionPruner<'a> {
    pub fn new(store: &'a dyn ObservationStore, retention_days: f64) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Rows strictly older than this are removed. A horizon beyond the
    /// representable range keeps everything.
    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        let horizon_ms = (self.retention_days * 86_400_000.0).round() as i64;
        Duration::try_milliseconds(horizon_ms)
            .and_then(|horizon| now.checked_sub_signed(horizon))
            .unwrap_or(NaiveDateTime::MIN)
    }

    pub async fn prune(&self, station: &Station, now: NaiveDateTime) -> Result<u64> {
        let cutoff = self.cutoff(now);
        let removed = self.store.delete_before(&station.name, cutoff).await?;

        info!(
            removed,
            cutoff = %cutoff,
            retention_days = self.retention_days,
            "pruned expired observations"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn aged(days: f64) -> NaiveDateTime {
        now() - Duration::milliseconds((days * 86_400_000.0) as i64)
    }

    #[tokio::test]
    async fn test_prune_removes_only_expired_rows() -> Result<()> {
        let store = MemoryStore::new();
        let hamburg = Station::new("10147".to_string(), "Hamburg".to_string(), 9.99, 53.63);
        let bremen = Station::new("10224".to_string(), "Bremen".to_string(), 8.79, 53.05);

        for days in [10.0, 8.0, 6.9, 3.0] {
            store.insert(&hamburg, &Observation::new(aged(days))).await?;
        }
        store.insert(&bremen, &Observation::new(aged(10.0))).await?;

        let removed = RetentionPruner::new(&store, 7.0).prune(&hamburg, now()).await?;

        assert_eq!(removed, 2);
        let mut remaining: Vec<_> = store
            .rows()
            .into_iter()
            .filter(|r| r.station_name == "Hamburg")
            .map(|r| r.timestamp)
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec![aged(6.9), aged(3.0)]);
        assert!(store.get("Bremen", aged(10.0)).is_some());
        Ok(())
    }

    #[test]
    fn test_fractional_horizon() {
        let store = MemoryStore::new();
        let pruner = RetentionPruner::new(&store, 0.5);
        assert_eq!(pruner.cutoff(now()), now() - Duration::hours(12));
    }

    #[tokio::test]
    async fn test_oversized_horizon_keeps_everything() -> Result<()> {
        let store = MemoryStore::new();
        let station = Station::new("10147".to_string(), "Hamburg".to_string(), 9.99, 53.63);
        store.insert(&station, &Observation::new(aged(3650.0))).await?;

        let pruner = RetentionPruner::new(&store, 1e8);
        assert_eq!(pruner.cutoff(now()), NaiveDateTime::MIN);
        assert_eq!(RetentionPruner::new(&store, 1e300).cutoff(now()), NaiveDateTime::MIN);

        let removed = pruner.prune(&station, now()).await?;
        assert_eq!(removed, 0);
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_row_exactly_at_cutoff_is_kept() -> Result<()> {
        let store = MemoryStore::new();
        let station = Station::new("10147".to_string(), "Hamburg".to_string(), 9.99, 53.63);
        store.insert(&station, &Observation::new(aged(7.0))).await?;

        let removed = RetentionPruner::new(&store, 7.0).prune(&station, now()).await?;
        assert_eq!(removed, 0);
        Ok(())
    }
}

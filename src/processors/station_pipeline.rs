use crate::error::{IngestError, Result};
use crate::fetchers::PoiFetcher;
use crate::models::{ParameterMap, Station};
use crate::processors::{ReconcileReport, Reconciler, RetentionPruner};
use crate::readers::ObservationReader;
use crate::store::ObservationStore;
use crate::utils::progress::ProgressReporter;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

/// How far one station's pipeline got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StationStatus {
    Completed,
    PruneFailed,
    FetchFailed,
    ParseFailed,
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StationStatus::Completed => "completed",
            StationStatus::PruneFailed => "prune failed",
            StationStatus::FetchFailed => "fetch failed",
            StationStatus::ParseFailed => "parse failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StationOutcome {
    pub station: String,
    pub status: StationStatus,
    pub pruned: Option<u64>,
    pub source_file: Option<String>,
    pub observations: usize,
    pub skipped_rows: usize,
    pub report: Option<ReconcileReport>,
    pub error: Option<String>,
}

impl StationOutcome {
    fn new(station: &Station) -> Self {
        Self {
            station: station.name.clone(),
            status: StationStatus::Completed,
            pruned: None,
            source_file: None,
            observations: 0,
            skipped_rows: 0,
            report: None,
            error: None,
        }
    }

    fn failed(mut self, status: StationStatus, error: &IngestError) -> Self {
        self.status = status;
        self.error = Some(error.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StationStatus::Completed
    }
}

/// Per-station outcomes of one run, in registry order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<StationOutcome>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }

    pub fn totals(&self) -> ReconcileReport {
        self.outcomes
            .iter()
            .filter_map(|o| o.report)
            .fold(ReconcileReport::default(), |mut acc, r| {
                acc.inserted += r.inserted;
                acc.updated += r.updated;
                acc.unchanged += r.unchanged;
                acc.failed += r.failed;
                acc.fields_filled += r.fields_filled;
                acc
            })
    }

    pub fn generate_summary(&self) -> String {
        let totals = self.totals();
        let pruned: u64 = self.outcomes.iter().filter_map(|o| o.pruned).sum();

        let mut summary = format!(
            "Run Summary:\n  Stations: {} ({} completed, {} failed)\n  Rows pruned: {}\n  \
             Rows inserted: {}\n  Rows updated: {} ({} fields filled)\n  Rows unchanged: {}\n  \
             Row failures: {}\n",
            self.outcomes.len(),
            self.completed(),
            self.failed(),
            pruned,
            totals.inserted,
            totals.updated,
            totals.fields_filled,
            totals.unchanged,
            totals.failed
        );

        for outcome in self.outcomes.iter().filter(|o| !o.is_success()) {
            summary.push_str(&format!(
                "  ! {}: {} ({})\n",
                outcome.station,
                outcome.status,
                outcome.error.as_deref().unwrap_or("unknown error")
            ));
        }

        summary
    }
}

/// Runs prune → fetch → parse → reconcile for each station.
#[derive(Clone)]
pub struct StationPipeline {
    store: Arc<dyn ObservationStore>,
    fetcher: Arc<PoiFetcher>,
    parameters: Arc<ParameterMap>,
    retention_days: f64,
    max_workers: usize,
}

impl StationPipeline {
    pub fn new(
        store: Arc<dyn ObservationStore>,
        fetcher: PoiFetcher,
        parameters: ParameterMap,
        retention_days: f64,
    ) -> Self {
        Self {
            store,
            fetcher: Arc::new(fetcher),
            parameters: Arc::new(parameters),
            retention_days,
            max_workers: 1,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Process every station. Station failures are recorded in the summary;
    /// only fatal errors end the run early.
    pub async fn run(
        &self,
        stations: Vec<Station>,
        now: NaiveDateTime,
        progress: &ProgressReporter,
    ) -> Result<RunSummary> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();
        let total = stations.len();

        for (index, station) in stations.into_iter().enumerate() {
            let pipeline = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let span = info_span!("station", station = %station.name, id = %station.id);

            join_set.spawn(
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| IngestError::Config(e.to_string()))?;
                    let outcome = pipeline.process_station(&station, now).await?;
                    Ok::<_, IngestError>((index, outcome))
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined? {
                Ok((index, outcome)) => {
                    progress.station_finished(&outcome.station);
                    outcomes.push((index, outcome));
                }
                Err(e) => {
                    error!(error = %e, "fatal error, aborting run");
                    join_set.abort_all();
                    return Err(e);
                }
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        Ok(RunSummary {
            outcomes: outcomes.into_iter().map(|(_, o)| o).collect(),
        })
    }

    /// One station's pipeline. Non-fatal errors end up in the outcome.
    pub async fn process_station(&self, station: &Station, now: NaiveDateTime) -> Result<StationOutcome> {
        let mut outcome = StationOutcome::new(station);

        let pruner = RetentionPruner::new(self.store.as_ref(), self.retention_days);
        match pruner.prune(station, now).await {
            Ok(removed) => outcome.pruned = Some(removed),
            Err(e) => return self.abort(outcome, StationStatus::PruneFailed, "prune", e),
        }

        let fetched = match self.fetcher.fetch(station).await {
            Ok(fetched) => fetched,
            Err(e) => return self.abort(outcome, StationStatus::FetchFailed, "fetch", e),
        };
        outcome.source_file = Some(fetched.file_name.clone());

        let parsed = match ObservationReader::new().parse(&fetched.bytes, &self.parameters) {
            Ok(parsed) => parsed,
            Err(e) => return self.abort(outcome, StationStatus::ParseFailed, "parse", e),
        };
        outcome.observations = parsed.observations.len();
        outcome.skipped_rows = parsed.skipped_rows;
        if parsed.skipped_rows > 0 {
            warn!(skipped = parsed.skipped_rows, "rows with unreadable date or time were skipped");
        }

        let report = Reconciler::new(self.store.as_ref())
            .apply(station, &parsed.observations)
            .await;
        outcome.report = Some(report);

        info!(file = %fetched.file_name, observations = outcome.observations, "station complete");
        Ok(outcome)
    }

    fn abort(
        &self,
        outcome: StationOutcome,
        status: StationStatus,
        operation: &str,
        e: IngestError,
    ) -> Result<StationOutcome> {
        if e.is_fatal() {
            return Err(e);
        }
        error!(operation, error = %e, "station pipeline aborted");
        Ok(outcome.failed(status, &e))
    }
}

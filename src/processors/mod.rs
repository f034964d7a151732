pub mod reconciler;
pub mod retention_pruner;
pub mod station_pipeline;

pub use reconciler::{ReconcileReport, Reconciler};
pub use retention_pruner::RetentionPruner;
pub use station_pipeline::{RunSummary, StationOutcome, StationPipeline, StationStatus};

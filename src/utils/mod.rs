pub mod coercion;
pub mod constants;
pub mod filename;
pub mod progress;

pub use coercion::coerce_value;
pub use constants::*;
pub use filename::{fallback_file_name, file_url, primary_file_name};
pub use progress::ProgressReporter;

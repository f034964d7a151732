use crate::utils::constants::{FALLBACK_FILE_SUFFIX, LOG_FILE_PREFIX, PRIMARY_FILE_SUFFIX};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Published file name for a station, e.g. `10147_-BEOB.csv`
pub fn primary_file_name(station_id: &str) -> String {
    format!("{}{}", station_id, PRIMARY_FILE_SUFFIX)
}

/// Alternate name some stations are published under, e.g. `10147-BEOB.csv`
pub fn fallback_file_name(station_id: &str) -> String {
    format!("{}{}", station_id, FALLBACK_FILE_SUFFIX)
}

/// Join a file name onto a base URL without doubling the slash.
pub fn file_url(base_url: &str, file_name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), file_name)
}

/// Log file for a run started at `started`: LOG_{YYYY_MM_DD__HH_MM}
pub fn log_file_name(started: NaiveDateTime) -> String {
    format!("{}{}", LOG_FILE_PREFIX, started.format("%Y_%m_%d__%H_%M"))
}

pub fn default_log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(log_file_name(Local::now().naive_local()))
}

/// Spatial reference of station coordinates (WGS84)
pub const WGS84_SRID: i32 = 4326;

/// Default store table
pub const DEFAULT_TABLE_NAME: &str = "dwd_poi";

/// Fixed store columns
pub const COLUMN_STATION_NAME: &str = "stationsname";
pub const COLUMN_STATION_ID: &str = "stationsid";
pub const COLUMN_GEOMETRY: &str = "shape";
pub const COLUMN_TIMESTAMP: &str = "zeitpunkt";

/// Observation file layout
pub const OBSERVATION_DELIMITER: u8 = b';';
pub const DATE_COLUMN: &str = "Datum";
pub const TIME_COLUMN: &str = "Uhrzeit (UTC)";
pub const MAX_PREAMBLE_LINES: usize = 10;

/// Remote file naming
pub const PRIMARY_FILE_SUFFIX: &str = "_-BEOB.csv";
pub const FALLBACK_FILE_SUFFIX: &str = "-BEOB.csv";

/// Processing defaults
pub const DEFAULT_RETENTION_DAYS: f64 = 7.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_WORKERS: usize = 1;
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_USER_AGENT: &str = concat!("dwd-poi-ingest/", env!("CARGO_PKG_VERSION"));
pub const LOG_FILE_PREFIX: &str = "LOG_";

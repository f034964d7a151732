use crate::error::{IngestError, Result};
use crate::models::{Observation, ParameterMap};
use crate::utils::coercion::coerce_value;
use crate::utils::constants::{DATE_COLUMN, MAX_PREAMBLE_LINES, OBSERVATION_DELIMITER, TIME_COLUMN};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Result of parsing one observation file.
#[derive(Debug, Clone, Default)]
pub struct ParsedObservations {
    /// Oldest first, one per timestamp
    pub observations: Vec<Observation>,
    /// Data rows dropped for an unreadable date or time
    pub skipped_rows: usize,
    /// Mapped source columns the file does not carry
    pub missing_columns: Vec<String>,
}

/// Parses DWD POI observation files (`;`-delimited, description lines
/// before a `Datum;Uhrzeit (UTC);...` header row).
pub struct ObservationReader {
    delimiter: u8,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self {
            delimiter: OBSERVATION_DELIMITER,
        }
    }

    pub fn read_file(&self, path: &Path, parameters: &ParameterMap) -> Result<ParsedObservations> {
        let bytes = std::fs::read(path)?;
        self.parse(&bytes, parameters)
    }

    pub fn parse(&self, raw: &[u8], parameters: &ParameterMap) -> Result<ParsedObservations> {
        let text = decode(raw);
        let body = self.skip_preamble(&text)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let date_idx = column(DATE_COLUMN).ok_or_else(|| {
            IngestError::InvalidFormat(format!("Missing '{}' column", DATE_COLUMN))
        })?;
        let time_idx = column(TIME_COLUMN).ok_or_else(|| {
            IngestError::InvalidFormat(format!("Missing '{}' column", TIME_COLUMN))
        })?;

        let mut projection = Vec::with_capacity(parameters.len());
        let mut missing_columns = Vec::new();
        for mapping in parameters.mappings() {
            match column(&mapping.source_column) {
                Some(idx) => projection.push((idx, mapping.target_field.as_str())),
                None => missing_columns.push(mapping.source_column.clone()),
            }
        }
        if !missing_columns.is_empty() {
            debug!(columns = ?missing_columns, "mapped columns not present in file");
        }

        let mut by_timestamp: BTreeMap<NaiveDateTime, Observation> = BTreeMap::new();
        let mut skipped_rows = 0;

        for (row_number, record) in reader.records().enumerate() {
            let record = record?;
            let date = record.get(date_idx).unwrap_or_default();
            let time = record.get(time_idx).unwrap_or_default();

            let timestamp = match parse_timestamp(date, time) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(row = row_number + 1, error = %e, "skipping row");
                    skipped_rows += 1;
                    continue;
                }
            };

            let mut observation = Observation::new(timestamp);
            for &(idx, target) in &projection {
                if let Some(raw_value) = record.get(idx) {
                    observation.set(target, coerce_value(raw_value));
                }
            }

            // A repeated timestamp replaces the earlier row
            by_timestamp.insert(timestamp, observation);
        }

        Ok(ParsedObservations {
            observations: by_timestamp.into_values().collect(),
            skipped_rows,
            missing_columns,
        })
    }

    /// Drop description lines above the header row.
    fn skip_preamble<'a>(&self, text: &'a str) -> Result<&'a str> {
        let mut offset = 0;
        for line in text.split_inclusive('\n').take(MAX_PREAMBLE_LINES) {
            let first_cell = line
                .split(self.delimiter as char)
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('"');
            if first_cell == DATE_COLUMN {
                return Ok(&text[offset..]);
            }
            offset += line.len();
        }

        Err(IngestError::InvalidFormat(format!(
            "No '{}' header row within the first {} lines",
            DATE_COLUMN, MAX_PREAMBLE_LINES
        )))
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

/// `DD.MM.YY` + `HH:MM`, years taken as 20YY.
pub fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime> {
    let invalid = || IngestError::InvalidTimestamp {
        date: date.to_string(),
        time: time.to_string(),
    };

    let parts: Vec<&str> = date.trim().split('.').collect();
    if parts.len() != 3 || parts[2].len() != 2 {
        return Err(invalid());
    }

    let day = parts[0].parse::<u32>().map_err(|_| invalid())?;
    let month = parts[1].parse::<u32>().map_err(|_| invalid())?;
    let year = 2000 + parts[2].parse::<i32>().map_err(|_| invalid())?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")?;

    Ok(date.and_time(time))
}

fn decode(raw: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(raw);
    if had_errors {
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(raw);
        text
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, ParameterMapping};
    use pretty_assertions::assert_eq;

    const PREAMBLE: &str = "surface observations;level;temperature;humidity\n\
                            Parameter description;;Temperatur (2m);Relative Feuchte\n";

    fn params() -> ParameterMap {
        ParameterMap::new(vec![
            ParameterMapping::new("TT", "temperature"),
            ParameterMapping::new("RF", "humidity"),
        ])
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("01.06.24", "12:00").unwrap(), ts(2024, 6, 1, 12, 0));
        assert_eq!(parse_timestamp("31.12.99", "23:59").unwrap(), ts(2099, 12, 31, 23, 59));
        assert!(parse_timestamp("32.06.24", "12:00").is_err());
        assert!(parse_timestamp("01.06.2024", "12:00").is_err());
        assert!(parse_timestamp("01.06.24", "25:00").is_err());
        assert!(parse_timestamp("", "").is_err());
    }

    #[test]
    fn test_parse_orders_oldest_first() -> Result<()> {
        let body = format!(
            "{}Datum;Uhrzeit (UTC);TT;RF\n\
             01.06.24;14:00;22,1;70\n\
             01.06.24;13:00;21,8;---\n\
             01.06.24;12:00;21,3;75\n",
            PREAMBLE
        );

        let parsed = ObservationReader::new().parse(body.as_bytes(), &params())?;
        let stamps: Vec<_> = parsed.observations.iter().map(|o| o.timestamp).collect();

        assert_eq!(
            stamps,
            vec![ts(2024, 6, 1, 12, 0), ts(2024, 6, 1, 13, 0), ts(2024, 6, 1, 14, 0)]
        );
        assert_eq!(parsed.observations[0].get("temperature"), Some(FieldValue::Float(21.3)));
        assert_eq!(parsed.observations[0].get("humidity"), Some(FieldValue::Integer(75)));
        assert_eq!(parsed.observations[1].get("humidity"), Some(FieldValue::Null));
        assert_eq!(parsed.skipped_rows, 0);
        Ok(())
    }

    #[test]
    fn test_field_set_matches_present_columns() -> Result<()> {
        let map = ParameterMap::new(vec![
            ParameterMapping::new("TT", "temperature"),
            ParameterMapping::new("PP", "pressure"),
        ]);
        let body = format!("{}Datum;Uhrzeit (UTC);TT;RF\n01.06.24;12:00;21,3;75\n", PREAMBLE);

        let parsed = ObservationReader::new().parse(body.as_bytes(), &map)?;
        let names: Vec<_> = parsed.observations[0].field_names().collect();

        assert_eq!(names, vec!["temperature"]);
        assert_eq!(parsed.missing_columns, vec!["PP".to_string()]);
        Ok(())
    }

    #[test]
    fn test_short_row_omits_trailing_fields() -> Result<()> {
        let body = format!("{}Datum;Uhrzeit (UTC);TT;RF\n01.06.24;12:00;21,3\n", PREAMBLE);

        let parsed = ObservationReader::new().parse(body.as_bytes(), &params())?;
        let obs = &parsed.observations[0];

        assert_eq!(obs.get("temperature"), Some(FieldValue::Float(21.3)));
        assert_eq!(obs.get("humidity"), None);
        Ok(())
    }

    #[test]
    fn test_malformed_rows_are_skipped() -> Result<()> {
        let body = format!(
            "{}Datum;Uhrzeit (UTC);TT;RF\n\
             01.06.24;12:00;21,3;75\n\
             xx.06.24;13:00;21,8;70\n\
             01.06.24;noon;21,8;70\n",
            PREAMBLE
        );

        let parsed = ObservationReader::new().parse(body.as_bytes(), &params())?;
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.skipped_rows, 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_timestamp_keeps_later_row() -> Result<()> {
        let body = format!(
            "{}Datum;Uhrzeit (UTC);TT;RF\n\
             01.06.24;12:00;21,3;75\n\
             01.06.24;12:00;19,0;60\n",
            PREAMBLE
        );

        let parsed = ObservationReader::new().parse(body.as_bytes(), &params())?;
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.observations[0].get("temperature"), Some(FieldValue::Float(19.0)));
        Ok(())
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let body = "no header here\n01.06.24;12:00;21,3;75\n";
        let result = ObservationReader::new().parse(body.as_bytes(), &params());
        assert!(matches!(result, Err(IngestError::InvalidFormat(_))));
    }

    #[test]
    fn test_latin1_and_bom_input() -> Result<()> {
        let mut latin1 = b"Parameter description;;Temperatur;Relative Feuchte \xfcber\n".to_vec();
        latin1.extend_from_slice(b"Datum;Uhrzeit (UTC);TT;RF\n01.06.24;12:00;21,3;75\n");
        let parsed = ObservationReader::new().parse(&latin1, &params())?;
        assert_eq!(parsed.observations.len(), 1);

        let with_bom = "\u{feff}Datum;Uhrzeit (UTC);TT;RF\n01.06.24;12:00;21,3;75\n";
        let parsed = ObservationReader::new().parse(with_bom.as_bytes(), &params())?;
        assert_eq!(parsed.observations.len(), 1);
        Ok(())
    }
}

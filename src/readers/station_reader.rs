use crate::error::{IngestError, Result};
use crate::models::Station;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use validator::Validate;

#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "Stationsname")]
    name: String,
    id: String,
    lon: f64,
    lat: f64,
}

/// Reads the station registry CSV (`Stationsname,id,lon,lat`).
pub struct StationReader {
    delimiter: u8,
}

impl StationReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Read and validate the registry. Station names must be unique.
    pub fn read_stations(&self, path: &Path) -> Result<Vec<Station>> {
        let file = std::fs::File::open(path)?;
        self.read_stations_from(file)
    }

    pub fn read_stations_from<R: Read>(&self, source: R) -> Result<Vec<Station>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut stations = Vec::new();
        let mut seen = HashSet::new();

        for row in reader.deserialize::<StationRow>() {
            let row = row?;
            let station = Station::new(row.id, row.name, row.lon, row.lat);
            station.validate()?;

            if !seen.insert(station.name.clone()) {
                return Err(IngestError::Config(format!(
                    "Duplicate station name in registry: '{}'",
                    station.name
                )));
            }
            stations.push(station);
        }

        Ok(stations)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_stations_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "Stationsname,id,lon,lat")?;
        writeln!(temp_file, "Hamburg,10147,9.988,53.633")?;
        writeln!(temp_file, "Berlin-Tempelhof, 10384 , 13.402, 52.468")?;

        let stations = StationReader::new().read_stations(temp_file.path())?;

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "Hamburg");
        assert_eq!(stations[0].id, "10147");
        assert!((stations[0].longitude - 9.988).abs() < 1e-9);
        assert_eq!(stations[1].name, "Berlin-Tempelhof");
        assert_eq!(stations[1].id, "10384");

        Ok(())
    }

    #[test]
    fn test_extra_columns_and_alphanumeric_ids() -> Result<()> {
        let csv = "id,Stationsname,lat,lon,hoehe\nP0489,\"Hof, Bayern\",50.31,11.88,565\n";
        let stations = StationReader::new().read_stations_from(csv.as_bytes())?;

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "P0489");
        assert_eq!(stations[0].name, "Hof, Bayern");
        Ok(())
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let csv = "Stationsname,id,lon,lat\nHamburg,10147,9.9,53.6\nHamburg,10148,9.9,53.6\n";
        let err = StationReader::new()
            .read_stations_from(csv.as_bytes())
            .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let csv = "Stationsname,id,lon,lat\nNowhere,1,200.0,53.6\n";
        let err = StationReader::new()
            .read_stations_from(csv.as_bytes())
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }
}

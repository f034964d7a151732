use crate::utils::constants::WGS84_SRID;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A POI station as listed in the station registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Station {
    /// DWD station id, kept as text since some ids carry letters
    pub id: String,

    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
}

impl Station {
    pub fn new(id: String, name: String, longitude: f64, latitude: f64) -> Self {
        Self {
            id,
            name,
            longitude,
            latitude,
        }
    }

    /// Well-known-text for the station location, longitude first.
    pub fn wkt_point(&self) -> String {
        format!("POINT({} {})", self.longitude, self.latitude)
    }

    pub fn srid(&self) -> i32 {
        WGS84_SRID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_validation() {
        let station = Station::new("10147".to_string(), "Hamburg".to_string(), 9.99, 53.63);

        assert!(station.validate().is_ok());
        assert_eq!(station.wkt_point(), "POINT(9.99 53.63)");
        assert_eq!(station.srid(), 4326);
    }

    #[test]
    fn test_invalid_coordinates() {
        let station = Station::new("10147".to_string(), "Hamburg".to_string(), 9.99, 91.0);
        assert!(station.validate().is_err());

        let unnamed = Station::new("10147".to_string(), String::new(), 9.99, 53.63);
        assert!(unnamed.validate().is_err());
    }
}

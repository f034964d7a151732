use crate::error::{IngestError, Result};
use crate::models::{ParameterMap, ParameterMapping};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use validator::Validate;

#[derive(Debug, Deserialize)]
struct ParameterRow {
    parameter_tabelle: String,
    parameter_csv_dwd: String,
    #[serde(default)]
    einheit: Option<String>,
    #[serde(default)]
    surface_description: Option<String>,
}

/// Reads the parameter map CSV (`parameter_tabelle,parameter_csv_dwd[,einheit,surface_description]`).
pub struct ParameterReader;

impl ParameterReader {
    pub fn read_parameters(path: &Path) -> Result<ParameterMap> {
        let file = std::fs::File::open(path)?;
        Self::read_parameters_from(file)
    }

    pub fn read_parameters_from<R: Read>(source: R) -> Result<ParameterMap> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut mappings = Vec::new();
        let mut targets = HashSet::new();

        for row in reader.deserialize::<ParameterRow>() {
            let row = row?;
            let mapping = ParameterMapping {
                source_column: row.parameter_csv_dwd,
                target_field: row.parameter_tabelle,
                unit: row.einheit.filter(|s| !s.is_empty()),
                description: row.surface_description.filter(|s| !s.is_empty()),
            };
            mapping.validate()?;

            if !targets.insert(mapping.target_field.clone()) {
                return Err(IngestError::Config(format!(
                    "Target field '{}' mapped more than once",
                    mapping.target_field
                )));
            }
            mappings.push(mapping);
        }

        if mappings.is_empty() {
            return Err(IngestError::Config("Parameter map is empty".to_string()));
        }

        Ok(ParameterMap::new(mappings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_parameter_map() -> Result<()> {
        let csv = "parameter_tabelle,parameter_csv_dwd,einheit,surface_description\n\
                   temperature,TT,Grad C,Temperatur (2m)\n\
                   humidity,RF,%,\n";
        let map = ParameterReader::read_parameters_from(csv.as_bytes())?;

        assert_eq!(map.target_fields(), vec!["temperature", "humidity"]);
        assert_eq!(map.mappings()[0].source_column, "TT");
        assert_eq!(map.mappings()[0].unit.as_deref(), Some("Grad C"));
        assert_eq!(map.mappings()[1].description, None);
        Ok(())
    }

    #[test]
    fn test_minimal_columns() -> Result<()> {
        let csv = "parameter_tabelle,parameter_csv_dwd\ntemperature,TT\n";
        let map = ParameterReader::read_parameters_from(csv.as_bytes())?;
        assert_eq!(map.len(), 1);
        assert_eq!(map.mappings()[0].unit, None);
        Ok(())
    }

    #[test]
    fn test_empty_map_rejected() {
        let csv = "parameter_tabelle,parameter_csv_dwd\n";
        assert!(ParameterReader::read_parameters_from(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let csv = "parameter_tabelle,parameter_csv_dwd\ntemperature,TT\ntemperature,TX\n";
        let err = ParameterReader::read_parameters_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }
}

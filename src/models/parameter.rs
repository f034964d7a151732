use serde::{Deserialize, Serialize};
use validator::Validate;

/// One projected column: DWD source column → store column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParameterMapping {
    #[validate(length(min = 1))]
    pub source_column: String,

    #[validate(length(min = 1))]
    pub target_field: String,

    pub unit: Option<String>,

    pub description: Option<String>,
}

impl ParameterMapping {
    pub fn new(source_column: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            target_field: target_field.into(),
            unit: None,
            description: None,
        }
    }
}

/// Ordered projection of source columns onto store fields, shared by all stations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    mappings: Vec<ParameterMapping>,
}

impl ParameterMap {
    pub fn new(mappings: Vec<ParameterMapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[ParameterMapping] {
        &self.mappings
    }

    pub fn target_fields(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .map(|m| m.target_field.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl FromIterator<ParameterMapping> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = ParameterMapping>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

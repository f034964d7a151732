use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

/// A coerced sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Integer(v) => Some(v as f64),
            FieldValue::Float(v) => Some(v),
            FieldValue::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Null => write!(f, "NULL"),
        }
    }
}

/// All readings of one station at one timestamp.
///
/// `fields` holds only target fields whose source column was present in the
/// row, in parameter map order. A present column with an unreadable value is
/// kept as [`FieldValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    #[serde(serialize_with = "fields_as_map")]
    pub fields: Vec<(String, FieldValue)>,
}

fn fields_as_map<S: Serializer>(fields: &[(String, FieldValue)], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(fields.iter().map(|(name, value)| (name, value)))
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing an earlier value for the same name.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn non_null_count(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.is_null()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_set_replaces_existing_field() {
        let mut obs = Observation::new(noon()).with_field("temperature", FieldValue::Null);
        obs.set("temperature", FieldValue::Float(21.3));
        obs.set("humidity", FieldValue::Integer(80));

        assert_eq!(obs.fields.len(), 2);
        assert_eq!(obs.get("temperature"), Some(FieldValue::Float(21.3)));
        assert_eq!(obs.get("pressure"), None);
        assert_eq!(obs.non_null_count(), 2);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Integer(5).to_string(), "5");
        assert_eq!(FieldValue::Float(21.3).to_string(), "21.3");
        assert_eq!(FieldValue::Null.to_string(), "NULL");
        assert_eq!(FieldValue::Integer(5).as_f64(), Some(5.0));
    }

    #[test]
    fn test_serializes_fields_as_map() {
        let obs = Observation::new(noon())
            .with_field("temperature", FieldValue::Float(21.3))
            .with_field("humidity", FieldValue::Null);
        let json = serde_json::to_string(&obs).unwrap();

        assert_eq!(
            json,
            r#"{"timestamp":"2024-06-01T12:00:00","fields":{"temperature":21.3,"humidity":null}}"#
        );
    }
}

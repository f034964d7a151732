use crate::models::FieldValue;

/// Coerce a raw cell into a typed reading.
///
/// Integers win over floats; a comma decimal separator is accepted. Anything
/// else (missing markers such as `---`, empty cells) becomes null.
pub fn coerce_value(raw: &str) -> FieldValue {
    let trimmed = raw.trim();

    if let Ok(v) = trimmed.parse::<i64>() {
        return FieldValue::Integer(v);
    }

    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => FieldValue::Float(v),
        _ => FieldValue::Null,
    }
}

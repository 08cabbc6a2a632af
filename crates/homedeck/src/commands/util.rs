//! Shared helpers for command handlers.

use homedeck_core::{CharacteristicValue, FieldMap};

use crate::error::CliError;

/// Parse one characteristic value as typed on the command line.
///
/// `on`/`off`/`true`/`false` map to `1`/`0`; anything else must be a number.
pub fn parse_value(field: &str, raw: &str) -> Result<CharacteristicValue, CliError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => return Ok(CharacteristicValue::Int(1)),
        "off" | "false" | "no" => return Ok(CharacteristicValue::Int(0)),
        _ => {}
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(CharacteristicValue::from_number)
        .ok_or_else(|| CliError::Validation {
            field: field.into(),
            reason: format!("expected a number or on/off, got '{raw}'"),
        })
}

/// Split `key=value` into its parts.
pub fn split_assignment(raw: &str) -> Result<(&str, &str), CliError> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .ok_or_else(|| CliError::Validation {
            field: "assignment".into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        })
}

/// Parse `Type=Value` assignments into a field map (later entries win).
pub fn parse_assignments<S: AsRef<str>>(raw: &[S]) -> Result<FieldMap, CliError> {
    let mut fields = FieldMap::new();
    for item in raw {
        let (field, value) = split_assignment(item.as_ref())?;
        fields.insert(field.to_owned(), parse_value(field, value)?);
    }
    Ok(fields)
}

/// Format an optional `[min..max]` range for display.
pub fn range_label(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min}..{max}"),
        (Some(min), None) => format!("{min}.."),
        (None, Some(max)) => format!("..{max}"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse_numbers_and_switch_words() {
        let fields = parse_assignments(&["On=on", "Brightness=80", "Hue=12.5"]).unwrap();
        assert_eq!(fields["On"], CharacteristicValue::Int(1));
        assert_eq!(fields["Brightness"], CharacteristicValue::Int(80));
        assert_eq!(fields["Hue"], CharacteristicValue::Float(12.5));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignments(&["Brightness"]).is_err());
        assert!(parse_assignments(&["=5"]).is_err());
        assert!(parse_assignments(&["Brightness=bright"]).is_err());
        assert!(parse_assignments(&["Brightness=NaN"]).is_err());
    }

    #[test]
    fn later_assignment_wins() {
        let fields = parse_assignments(&["On=1", "On=0"]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["On"], CharacteristicValue::Int(0));
    }

    #[test]
    fn range_labels() {
        assert_eq!(range_label(Some(0.0), Some(100.0)), "0..100");
        assert_eq!(range_label(None, None), "");
    }
}

// src/core/restrictions.rs

use crate::core::parameters::{ParameterError, ScalarKind, Value, ValueKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "min:max" where either bound may be omitted, e.g. "0:", ":100", "-1.5:2.5".
    static ref RANGE_RE: Regex = Regex::new(r"^\s*([^:]*?)\s*:\s*([^:]*?)\s*$")
        .expect("range restriction regex is valid");
}

/// Value constraints declared through a CTD `restrictions` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    IntRange { min: Option<i64>, max: Option<i64> },
    DoubleRange { min: Option<f64>, max: Option<f64> },
    Choices(Vec<String>),
}

impl Restriction {
    /// Parses a restriction string for a parameter of `kind`.
    ///
    /// Numbers take a `min:max` range, strings a comma separated choice list.
    /// Bool and file parameters carry no value restriction, so `Ok(None)` is returned.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Option<Self>, ParameterError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let invalid = || ParameterError::InvalidRestriction {
            kind,
            text: text.to_string(),
        };

        match kind.scalar() {
            ScalarKind::Int => {
                let (min, max) = split_range(text).ok_or_else(invalid)?;
                Ok(Some(Self::IntRange {
                    min: parse_bound::<i64>(min).map_err(|_| invalid())?,
                    max: parse_bound::<i64>(max).map_err(|_| invalid())?,
                }))
            }
            ScalarKind::Double => {
                let (min, max) = split_range(text).ok_or_else(invalid)?;
                Ok(Some(Self::DoubleRange {
                    min: parse_bound::<f64>(min).map_err(|_| invalid())?,
                    max: parse_bound::<f64>(max).map_err(|_| invalid())?,
                }))
            }
            ScalarKind::String => Ok(Some(Self::Choices(
                text.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ))),
            ScalarKind::Bool | ScalarKind::File => Ok(None),
        }
    }

    /// Checks every element of `value`, returning a reason for the first violation.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Self::IntRange { min, max }, Value::Int(v)) => check_bounds(*v, *min, *max),
            (Self::IntRange { min, max }, Value::IntList(items)) => items
                .iter()
                .try_for_each(|v| check_bounds(*v, *min, *max)),
            (Self::DoubleRange { min, max }, Value::Double(v)) => check_bounds(*v, *min, *max),
            (Self::DoubleRange { min, max }, Value::DoubleList(items)) => items
                .iter()
                .try_for_each(|v| check_bounds(*v, *min, *max)),
            (Self::Choices(choices), Value::String(v)) => check_choice(v, choices),
            (Self::Choices(choices), Value::StringList(items)) => {
                items.iter().try_for_each(|v| check_choice(v, choices))
            }
            _ => Ok(()),
        }
    }

    /// Renders the restriction back into its CTD attribute form.
    pub fn to_ctd_string(&self) -> String {
        fn bound<T: ToString>(b: &Option<T>) -> String {
            b.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        match self {
            Self::IntRange { min, max } => format!("{}:{}", bound(min), bound(max)),
            Self::DoubleRange { min, max } => format!("{}:{}", bound(min), bound(max)),
            Self::Choices(choices) => choices.join(","),
        }
    }
}

fn split_range(text: &str) -> Option<(&str, &str)> {
    let caps = RANGE_RE.captures(text)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn parse_bound<T: std::str::FromStr>(text: &str) -> Result<Option<T>, T::Err> {
    if text.is_empty() {
        Ok(None)
    } else {
        text.parse::<T>().map(Some)
    }
}

fn check_bounds<T: PartialOrd + std::fmt::Display + Copy>(
    value: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), String> {
    if let Some(min) = min
        && value < min
    {
        return Err(format!("{} is below the minimum {}", value, min));
    }
    if let Some(max) = max
        && value > max
    {
        return Err(format!("{} is above the maximum {}", value, max));
    }
    Ok(())
}

fn check_choice(value: &str, choices: &[String]) -> Result<(), String> {
    // The empty string is the unset value of a string parameter.
    if value.is_empty() || choices.is_empty() || choices.iter().any(|c| c == value) {
        Ok(())
    } else {
        Err(format!("'{}' is not one of [{}]", value, choices.join(", ")))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    const INT: ValueKind = ValueKind::Scalar(ScalarKind::Int);
    const DOUBLE_LIST: ValueKind = ValueKind::List(ScalarKind::Double);
    const STRING: ValueKind = ValueKind::Scalar(ScalarKind::String);

    #[test]
    fn test_parse_open_ranges() {
        let r = Restriction::parse(INT, "0:").unwrap().unwrap();
        assert_eq!(r, Restriction::IntRange { min: Some(0), max: None });
        assert!(r.check(&Value::Int(0)).is_ok());
        assert!(r.check(&Value::Int(-1)).is_err());

        let r = Restriction::parse(DOUBLE_LIST, ":1.5").unwrap().unwrap();
        assert!(r.check(&Value::DoubleList(vec![0.0, 1.5])).is_ok());
        assert!(r.check(&Value::DoubleList(vec![0.0, 1.6])).is_err());
    }

    #[test]
    fn test_parse_choices() {
        let r = Restriction::parse(STRING, "fast, slow,").unwrap().unwrap();
        assert_eq!(r.to_ctd_string(), "fast,slow");
        assert!(r.check(&Value::String("slow".to_string())).is_ok());
        assert!(r.check(&Value::String("medium".to_string())).is_err());
        assert!(r.check(&Value::String(String::new())).is_ok());
    }

    #[test]
    fn test_invalid_numeric_restriction() {
        assert!(matches!(
            Restriction::parse(INT, "a:b"),
            Err(ParameterError::InvalidRestriction { .. })
        ));
        assert!(Restriction::parse(INT, "5").is_err());
    }

    #[test]
    fn test_empty_and_file_restrictions_are_ignored() {
        assert_eq!(Restriction::parse(INT, "  ").unwrap(), None);
        let file = ValueKind::Scalar(ScalarKind::File);
        assert_eq!(Restriction::parse(file, "*.mzML").unwrap(), None);
    }
}

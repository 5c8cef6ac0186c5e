use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::RestrictionKind;

/// Free-form parameter object attached to a restriction.
pub type Parameters = Map<String, Value>;

/// Describes why a restriction's parameters cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("parameters must be a JSON object")]
    NotAnObject,
    #[error("Parameter '{0}' not set.")]
    Missing(&'static str),
    #[error("Invalid date format in {0} parameter.")]
    InvalidDate(&'static str),
    #[error("Parameter '{name}' must be {expected}.")]
    WrongType {
        name: &'static str,
        expected: &'static str,
    },
}

/// Typed view of a restriction's parameters, one shape per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RestrictionRule {
    DateExclusion { excluded_dates: BTreeSet<NaiveDate> },
    AdjacentDay { holidays: Vec<NaiveDate> },
    ConsecutiveDay { max_consecutive_days: u64 },
    CoworkerCoverage { min_count: u64 },
    DayOfWeek { allowed_days: BTreeSet<u8> },
    PeriodLimit { max_hours: f64, period: String },
}

impl RestrictionRule {
    pub fn parse(kind: RestrictionKind, params: &Parameters) -> Result<Self, ParameterError> {
        let rule = match kind {
            RestrictionKind::DateExclusion => Self::DateExclusion {
                excluded_dates: date_list(params, "excluded_dates")?.into_iter().collect(),
            },
            RestrictionKind::AdjacentDay => Self::AdjacentDay {
                holidays: date_list(params, "holidays")?,
            },
            RestrictionKind::ConsecutiveDay => Self::ConsecutiveDay {
                max_consecutive_days: count(params, "max_consecutive_days")?,
            },
            RestrictionKind::CoworkerCoverage => Self::CoworkerCoverage {
                min_count: count(params, "min_count")?,
            },
            RestrictionKind::DayOfWeek => Self::DayOfWeek {
                allowed_days: weekday_list(params, "allowed_days")?,
            },
            RestrictionKind::PeriodLimit => Self::PeriodLimit {
                max_hours: hours(params, "max_hours")?,
                period: text(params, "period")?,
            },
        };
        Ok(rule)
    }
}

fn required<'a>(params: &'a Parameters, name: &'static str) -> Result<&'a Value, ParameterError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(ParameterError::Missing(name)),
        Some(value) => Ok(value),
    }
}

fn list<'a>(params: &'a Parameters, name: &'static str) -> Result<&'a Vec<Value>, ParameterError> {
    required(params, name)?
        .as_array()
        .ok_or(ParameterError::WrongType {
            name,
            expected: "a list",
        })
}

fn date_list(params: &Parameters, name: &'static str) -> Result<Vec<NaiveDate>, ParameterError> {
    list(params, name)?
        .iter()
        .map(|value| {
            value
                .as_str()
                .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
                .ok_or(ParameterError::InvalidDate(name))
        })
        .collect()
}

fn count(params: &Parameters, name: &'static str) -> Result<u64, ParameterError> {
    required(params, name)?
        .as_u64()
        .ok_or(ParameterError::WrongType {
            name,
            expected: "a non-negative integer",
        })
}

fn hours(params: &Parameters, name: &'static str) -> Result<f64, ParameterError> {
    required(params, name)?
        .as_f64()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or(ParameterError::WrongType {
            name,
            expected: "a non-negative number",
        })
}

fn text(params: &Parameters, name: &'static str) -> Result<String, ParameterError> {
    required(params, name)?
        .as_str()
        .map(str::to_string)
        .ok_or(ParameterError::WrongType {
            name,
            expected: "a string",
        })
}

fn weekday_list(params: &Parameters, name: &'static str) -> Result<BTreeSet<u8>, ParameterError> {
    list(params, name)?
        .iter()
        .map(|value| {
            value
                .as_u64()
                .filter(|day| *day <= 6)
                .map(|day| day as u8)
                .ok_or(ParameterError::WrongType {
                    name,
                    expected: "a list of weekday numbers 0-6",
                })
        })
        .collect()
}

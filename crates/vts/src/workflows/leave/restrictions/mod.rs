mod params;
mod rules;

pub use params::{ParameterError, Parameters, RestrictionRule};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{CategoryId, Employee, LeaveRequest, LocationId, RestrictionId};
use super::repository::{CoverageSource, RepositoryError};
use super::validation::ValidationResult;

/// The closed set of rule kinds HR can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    DateExclusion,
    AdjacentDay,
    ConsecutiveDay,
    CoworkerCoverage,
    DayOfWeek,
    PeriodLimit,
}

impl RestrictionKind {
    /// Evaluation order used by the validator.
    pub const fn ordered() -> [Self; 6] {
        [
            Self::DateExclusion,
            Self::AdjacentDay,
            Self::ConsecutiveDay,
            Self::CoworkerCoverage,
            Self::DayOfWeek,
            Self::PeriodLimit,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DateExclusion => "Date Exclusion Restriction",
            Self::AdjacentDay => "Adjacent Day Restriction",
            Self::ConsecutiveDay => "Consecutive Day Restriction",
            Self::CoworkerCoverage => "Coworker Restriction",
            Self::DayOfWeek => "Day of Week Restriction",
            Self::PeriodLimit => "Period Limit Restriction",
        }
    }
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown restriction type '{0}'")]
pub struct UnknownRestrictionKind(pub String);

impl FromStr for RestrictionKind {
    type Err = UnknownRestrictionKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let kind = match raw.trim() {
            "DateExclusionRestriction" | "date_exclusion" => Self::DateExclusion,
            "AdjacentDayRestriction" | "adjacent_day" => Self::AdjacentDay,
            "ConsecutiveDayRestriction" | "consecutive_day" => Self::ConsecutiveDay,
            "CoworkerRestriction" | "coworker_coverage" | "coworker" => Self::CoworkerCoverage,
            "DayOfWeekRestriction" | "day_of_week" => Self::DayOfWeek,
            "PeriodLimitRestriction" | "period_limit" => Self::PeriodLimit,
            other => return Err(UnknownRestrictionKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// A configured rule instance scoped to categories and, optionally, locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    pub id: RestrictionId,
    pub kind: RestrictionKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: BTreeSet<CategoryId>,
    #[serde(default)]
    pub locations: BTreeSet<LocationId>,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Restriction {
    pub fn rule(&self) -> Result<RestrictionRule, ParameterError> {
        RestrictionRule::parse(self.kind, &self.parameters)
    }

    /// Category must match; locations only narrow the scope when `scope_by_location`
    /// is on and the restriction names at least one.
    pub fn applies_to(
        &self,
        category: &CategoryId,
        location: Option<&LocationId>,
        scope_by_location: bool,
    ) -> bool {
        if !self.categories.contains(category) {
            return false;
        }
        if !scope_by_location || self.locations.is_empty() {
            return true;
        }
        location.is_some_and(|location| self.locations.contains(location))
    }

    /// Append this rule's violations for `request`. Bad parameters yield a
    /// single configuration message and nothing else.
    pub fn evaluate(
        &self,
        request: &LeaveRequest,
        requester: &Employee,
        coverage: &dyn CoverageSource,
        result: &mut ValidationResult,
    ) -> Result<(), RepositoryError> {
        let rule = match self.rule() {
            Ok(rule) => rule,
            Err(error) => {
                result.add_error(format!(
                    "Restriction '{}' is misconfigured: {error}",
                    self.name
                ));
                return Ok(());
            }
        };

        match rule {
            RestrictionRule::DateExclusion { excluded_dates } => {
                rules::date_exclusion(request, &excluded_dates, result)
            }
            RestrictionRule::AdjacentDay { holidays } => {
                rules::adjacent_day(request, &holidays, result)
            }
            RestrictionRule::ConsecutiveDay {
                max_consecutive_days,
            } => rules::consecutive_day(request, max_consecutive_days, result),
            RestrictionRule::CoworkerCoverage { min_count } => {
                rules::coworker_coverage(request, requester, min_count, coverage, result)?
            }
            RestrictionRule::DayOfWeek { allowed_days } => {
                rules::day_of_week(request, &allowed_days, result)
            }
            RestrictionRule::PeriodLimit { max_hours, period } => {
                rules::period_limit(request, max_hours, &period, result)
            }
        }
        Ok(())
    }
}

/// HR-supplied fields for a new restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionDraft {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: BTreeSet<CategoryId>,
    #[serde(default)]
    pub locations: BTreeSet<LocationId>,
    #[serde(default)]
    pub parameters: Value,
}

/// Why a draft cannot become a restriction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestrictionDraftError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownRestrictionKind),
    #[error("restriction '{name}': {source}")]
    Parameters {
        name: String,
        source: ParameterError,
    },
}

impl RestrictionDraft {
    pub fn into_restriction(self, id: RestrictionId) -> Result<Restriction, RestrictionDraftError> {
        let kind: RestrictionKind = self.kind.parse()?;
        let parameters = match self.parameters {
            Value::Null => Parameters::new(),
            Value::Object(map) => map,
            _ => {
                return Err(RestrictionDraftError::Parameters {
                    name: self.name,
                    source: ParameterError::NotAnObject,
                })
            }
        };

        let restriction = Restriction {
            id,
            kind,
            name: self.name,
            description: self.description,
            categories: self.categories,
            locations: self.locations,
            parameters,
        };

        if let Err(source) = restriction.rule() {
            return Err(RestrictionDraftError::Parameters {
                name: restriction.name,
                source,
            });
        }
        Ok(restriction)
    }
}

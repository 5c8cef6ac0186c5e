use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered, append-only list of violation messages. Valid iff empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            f.write_str("valid")
        } else {
            f.write_str(&self.errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid());

        result.add_error("second");
        result.add_error("first");
        result.add_error("second");

        assert!(!result.is_valid());
        assert_eq!(result.messages(), ["second", "first", "second"]);
        assert_eq!(result.to_string(), "second; first; second");
    }

    #[test]
    fn merge_appends_after_existing_errors() {
        let mut range = ValidationResult::new();
        range.add_error("End date must be on or after the start date.");
        let mut rules = ValidationResult::new();
        rules.add_error("Date 2025-01-02 is excluded.");

        range.merge(rules);
        range.merge(ValidationResult::new());

        assert_eq!(range.len(), 2);
        assert_eq!(range.messages()[1], "Date 2025-01-02 is excluded.");
    }

    #[test]
    fn serializes_as_error_list() {
        let mut result = ValidationResult::new();
        result.add_error("Date 2025-01-02 is excluded.");
        let json = serde_json::to_value(&result).expect("serializes");
        assert_eq!(json, serde_json::json!({ "errors": ["Date 2025-01-02 is excluded."] }));
    }
}

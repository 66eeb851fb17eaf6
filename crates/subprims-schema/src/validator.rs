use std::fmt;

use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Which part of a message a validator checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationTarget {
    Data,
    Properties,
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationTarget::Data => f.write_str("data"),
            ValidationTarget::Properties => f.write_str("properties"),
        }
    }
}

/// One schema violation at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Location of the offending value, `$` followed by a JSON pointer.
    pub path: String,
    /// Human-readable description from the validator.
    pub message: String,
}

/// A value rejected by a message type's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub type_name: String,
    pub target: ValidationTarget,
    /// Reported issues, capped by `CatalogConfig::max_reported_issues`.
    pub issues: Vec<ValidationIssue>,
    /// Issues found beyond the cap.
    pub omitted: usize,
}

impl ValidationFailure {
    /// Paths of every reported issue.
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.path.as_str()).collect()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of `{}` failed validation", self.target, self.type_name)?;
        for (position, issue) in self.issues.iter().enumerate() {
            let separator = if position == 0 { ": " } else { "; " };
            write!(f, "{separator}{}: {}", issue.path, issue.message)?;
        }
        if self.omitted > 0 {
            write!(f, " (+{} more)", self.omitted)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

pub(crate) fn compile(type_name: &str, target: ValidationTarget, schema: &Value) -> Result<Validator> {
    jsonschema::validator_for(schema).map_err(|err| SchemaError::CompileFailed {
        type_name: type_name.to_string(),
        target,
        message: err.to_string(),
    })
}

pub(crate) fn check(
    validator: &Validator,
    type_name: &str,
    target: ValidationTarget,
    instance: &Value,
    max_issues: usize,
) -> std::result::Result<(), ValidationFailure> {
    let mut issues = Vec::new();
    let mut omitted = 0usize;

    for err in validator.iter_errors(instance) {
        if issues.len() < max_issues.max(1) {
            issues.push(ValidationIssue {
                path: format!("${}", err.instance_path()),
                message: err.to_string(),
            });
        } else {
            omitted = omitted.saturating_add(1);
        }
    }

    if issues.is_empty() {
        return Ok(());
    }

    Err(ValidationFailure {
        type_name: type_name.to_string(),
        target,
        issues,
        omitted,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn user_validator() -> Validator {
        compile(
            "user.created",
            ValidationTarget::Data,
            &json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "age": { "type": "integer" }
                },
                "required": ["id"]
            }),
        )
        .unwrap()
    }

    #[test]
    fn reports_field_path_of_offending_value() {
        let failure = check(
            &user_validator(),
            "user.created",
            ValidationTarget::Data,
            &json!({"id": 5}),
            4,
        )
        .unwrap_err();

        assert_eq!(failure.target, ValidationTarget::Data);
        assert_eq!(failure.paths(), vec!["$/id"]);
        assert!(failure.to_string().starts_with("data of `user.created` failed validation: $/id"));
    }

    #[test]
    fn missing_required_field_reports_root() {
        let failure = check(
            &user_validator(),
            "user.created",
            ValidationTarget::Data,
            &json!({}),
            4,
        )
        .unwrap_err();

        assert_eq!(failure.paths(), vec!["$"]);
        assert!(failure.issues[0].message.contains("\"id\""));
    }

    #[test]
    fn caps_reported_issues() {
        let failure = check(
            &user_validator(),
            "user.created",
            ValidationTarget::Data,
            &json!({"id": 1, "age": "old"}),
            1,
        )
        .unwrap_err();

        assert_eq!(failure.issues.len(), 1);
        assert_eq!(failure.omitted, 1);
        assert!(failure.to_string().ends_with("(+1 more)"));
    }

    #[test]
    fn valid_instance_passes() {
        assert!(check(
            &user_validator(),
            "user.created",
            ValidationTarget::Data,
            &json!({"id": "u1", "age": 3}),
            4,
        )
        .is_ok());
    }

    #[test]
    fn invalid_schema_fails_compile() {
        let result = compile(
            "broken",
            ValidationTarget::Properties,
            &json!({"type": "definitely-not-a-type"}),
        );
        assert!(matches!(
            result,
            Err(SchemaError::CompileFailed {
                target: ValidationTarget::Properties,
                ..
            })
        ));
    }
}

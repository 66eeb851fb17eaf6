use std::fmt;

use jsonschema::Validator;
use serde_json::Value;

use crate::validator::{check, ValidationFailure, ValidationTarget};

/// Compiled validators for one message type.
pub struct SchemaEntry {
    type_name: String,
    data: Validator,
    properties: Validator,
    max_reported_issues: usize,
}

impl SchemaEntry {
    pub(crate) fn new(
        type_name: String,
        data: Validator,
        properties: Validator,
        max_reported_issues: usize,
    ) -> Self {
        Self {
            type_name,
            data,
            properties,
            max_reported_issues,
        }
    }

    /// Message type this entry validates.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Validate an envelope's `data` payload.
    pub fn validate_data(&self, data: &Value) -> Result<(), ValidationFailure> {
        check(
            &self.data,
            &self.type_name,
            ValidationTarget::Data,
            data,
            self.max_reported_issues,
        )
    }

    /// Validate normalized properties rendered as a JSON object.
    pub fn validate_properties(&self, properties: &Value) -> Result<(), ValidationFailure> {
        check(
            &self.properties,
            &self.type_name,
            ValidationTarget::Properties,
            properties,
            self.max_reported_issues,
        )
    }

    /// Validate data, then properties. Stops at the first rejected part.
    pub fn validate_message(
        &self,
        data: &Value,
        properties: &Value,
    ) -> Result<(), ValidationFailure> {
        self.validate_data(data)?;
        self.validate_properties(properties)
    }
}

impl fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

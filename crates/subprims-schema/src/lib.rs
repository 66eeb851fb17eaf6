//! Per-message-type JSON Schema catalog.
//!
//! Each registered message type carries two JSON Schema 2020-12 validators:
//! one for the envelope `data`, one for the broker properties. Validation
//! failures come back as structured [`ValidationFailure`]s with one
//! [`ValidationIssue`] per offending location.

pub mod catalog;
pub mod config;
pub mod entry;
pub mod error;
mod strict;
pub mod validator;

pub use catalog::{validate_type_name, SchemaCatalog, DEFAULT_PROPERTIES_SCHEMA};
pub use config::CatalogConfig;
pub use entry::SchemaEntry;
pub use error::{Result, SchemaError};
pub use validator::{ValidationFailure, ValidationIssue, ValidationTarget};

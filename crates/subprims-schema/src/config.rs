/// Controls schema compilation and loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// When true, object schemas reject properties they do not declare.
    pub strict_mode: bool,
    /// Maximum number of schema files loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
    /// Maximum number of issues kept per validation failure.
    pub max_reported_issues: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_schemas_from_directory: 512,
            max_schema_file_size: 256 * 1024,
            max_reported_issues: 4,
        }
    }
}

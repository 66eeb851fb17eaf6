use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::config::CatalogConfig;
use crate::entry::SchemaEntry;
use crate::error::{Result, SchemaError};
use crate::strict::close_object_schemas;
use crate::validator::{compile, ValidationTarget};

/// Properties schema used when a type registers none: any string map.
pub const DEFAULT_PROPERTIES_SCHEMA: &str =
    r#"{"type":"object","additionalProperties":{"type":"string"}}"#;

const DATA_SUFFIX: &str = ".data.schema.json";
const PROPERTIES_SUFFIX: &str = ".properties.schema.json";
const SCHEMA_SUFFIX: &str = ".schema.json";
const MAX_TYPE_NAME_LEN: usize = 128;

/// Message-type-keyed catalog of compiled data and properties validators.
pub struct SchemaCatalog {
    entries: HashMap<String, SchemaEntry>,
    config: CatalogConfig,
}

#[derive(Default)]
struct SchemaSources {
    data: Option<String>,
    properties: Option<String>,
}

impl SchemaCatalog {
    /// Create an empty catalog with default config.
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    /// Create an empty catalog with explicit config.
    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
        }
    }

    /// Register a message type from JSON schema strings.
    ///
    /// Without a properties schema the type accepts any string map,
    /// including an empty one. Re-registering a type replaces it.
    pub fn register(
        &mut self,
        type_name: &str,
        data_schema_json: &str,
        properties_schema_json: Option<&str>,
    ) -> Result<()> {
        let data: Value = serde_json::from_str(data_schema_json)?;
        let properties: Option<Value> = properties_schema_json
            .map(serde_json::from_str)
            .transpose()?;
        self.register_value(type_name, &data, properties.as_ref())
    }

    /// Register a message type from JSON values.
    pub fn register_value(
        &mut self,
        type_name: &str,
        data_schema: &Value,
        properties_schema: Option<&Value>,
    ) -> Result<()> {
        validate_type_name(type_name)?;

        let data = self.compile(type_name, ValidationTarget::Data, data_schema)?;
        let properties = match properties_schema {
            Some(schema) => self.compile(type_name, ValidationTarget::Properties, schema)?,
            None => {
                let schema: Value = serde_json::from_str(DEFAULT_PROPERTIES_SCHEMA)?;
                compile(type_name, ValidationTarget::Properties, &schema)?
            }
        };

        let entry = SchemaEntry::new(
            type_name.to_string(),
            data,
            properties,
            self.config.max_reported_issues,
        );
        if self.entries.insert(type_name.to_string(), entry).is_some() {
            tracing::debug!(message_type = type_name, "replaced registered schema");
        }
        Ok(())
    }

    /// Load schemas from a directory.
    ///
    /// Each type needs `<type>.data.schema.json` and may add
    /// `<type>.properties.schema.json`. Other files are ignored.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, CatalogConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: CatalogConfig) -> Result<Self> {
        let mut catalog = Self::with_config(config);
        let mut sources: BTreeMap<String, SchemaSources> = BTreeMap::new();
        let mut loaded_file_count = 0usize;

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let is_schema_file = file_name.ends_with(SCHEMA_SUFFIX);
            let entry_path = entry.path();
            let path_metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_type = path_metadata.file_type();

            if file_type.is_symlink() {
                if is_schema_file {
                    return Err(SchemaError::LoadFailed(format!(
                        "refusing to load schema symlink: {file_name}"
                    )));
                }
                continue;
            }
            if !file_type.is_file() || !is_schema_file {
                continue;
            }

            let (type_name, target) = parse_schema_file_name(&file_name).ok_or_else(|| {
                SchemaError::LoadFailed(format!("unrecognized schema filename: {file_name}"))
            })?;

            loaded_file_count = loaded_file_count.saturating_add(1);
            if loaded_file_count > catalog.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({}): {}",
                    catalog.config.max_schemas_from_directory, loaded_file_count
                )));
            }

            let content = read_schema_file(&entry_path, &path_metadata, &catalog.config)?;
            let slot = sources.entry(type_name).or_default();
            match target {
                ValidationTarget::Data => slot.data = Some(content),
                ValidationTarget::Properties => slot.properties = Some(content),
            }
        }

        for (type_name, source) in sources {
            let data = source.data.ok_or_else(|| {
                SchemaError::LoadFailed(format!(
                    "properties schema for `{type_name}` has no matching {type_name}{DATA_SUFFIX}"
                ))
            })?;
            catalog.register(&type_name, &data, source.properties.as_deref())?;
        }

        tracing::debug!(
            path = %path.display(),
            types = catalog.len(),
            "loaded schema catalog"
        );
        Ok(catalog)
    }

    /// Load from embedded `(type, data schema, properties schema)` triples.
    pub fn from_embedded(schemas: &[(&str, &str, Option<&str>)]) -> Result<Self> {
        let mut catalog = Self::new();
        for (type_name, data, properties) in schemas {
            catalog.register(type_name, data, *properties)?;
        }
        Ok(catalog)
    }

    /// Look up the entry for a message type.
    pub fn get(&self, type_name: &str) -> Option<&SchemaEntry> {
        self.entries.get(type_name)
    }

    /// Validate data and properties of a message type in one call.
    pub fn validate(&self, type_name: &str, data: &Value, properties: &Value) -> Result<()> {
        let entry = self
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))?;
        entry.validate_message(data, properties)?;
        Ok(())
    }

    /// Check if a message type has a registered schema.
    pub fn has_schema(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Registered message types, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get catalog configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Consume the catalog, yielding every entry.
    pub fn into_entries(self) -> impl Iterator<Item = SchemaEntry> {
        self.entries.into_values()
    }

    fn compile(
        &self,
        type_name: &str,
        target: ValidationTarget,
        schema: &Value,
    ) -> Result<jsonschema::Validator> {
        if !self.config.strict_mode {
            return compile(type_name, target, schema);
        }
        let mut closed = schema.clone();
        close_object_schemas(&mut closed);
        compile(type_name, target, &closed)
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCatalog")
            .field("types", &self.type_names())
            .field("config", &self.config)
            .finish()
    }
}

/// Check that `name` is usable as a message type name.
///
/// Names are 1 to 128 bytes of ASCII alphanumerics, `.`, `_`, `-` or `:`.
pub fn validate_type_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > MAX_TYPE_NAME_LEN {
        Some("longer than 128 bytes")
    } else if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b':'))
    {
        Some("only ASCII alphanumerics, '.', '_', '-' and ':' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SchemaError::InvalidTypeName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn parse_schema_file_name(file_name: &str) -> Option<(String, ValidationTarget)> {
    let (stem, target) = if let Some(stem) = file_name.strip_suffix(PROPERTIES_SUFFIX) {
        (stem, ValidationTarget::Properties)
    } else if let Some(stem) = file_name.strip_suffix(DATA_SUFFIX) {
        (stem, ValidationTarget::Data)
    } else {
        return None;
    };

    validate_type_name(stem).ok()?;
    Some((stem.to_string(), target))
}

fn read_schema_file(
    path: &Path,
    path_metadata: &std::fs::Metadata,
    config: &CatalogConfig,
) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let opened_metadata = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

    #[cfg(unix)]
    {
        if !same_file_identity(path_metadata, &opened_metadata) {
            return Err(SchemaError::LoadFailed(format!(
                "schema file changed during load: {}",
                path.display()
            )));
        }
    }
    #[cfg(not(unix))]
    let _ = path_metadata;

    let max_bytes = config.max_schema_file_size;
    if opened_metadata.len() > max_bytes as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({} bytes): {}",
            opened_metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large while reading: {}",
            path.display()
        )));
    }

    Ok(content)
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    const USER_SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "name": { "type": "string" }
        },
        "required": ["id"]
    }"#;

    const TENANT_PROPERTIES: &str = r#"{
        "type": "object",
        "properties": {
            "tenant": { "type": "string", "minLength": 1 }
        },
        "required": ["tenant"]
    }"#;

    const OPTIONAL_PROPERTIES: &str = r#"{
        "type": "object",
        "properties": {
            "trace": { "type": "string" }
        }
    }"#;

    #[test]
    fn register_and_validate() {
        let mut catalog = SchemaCatalog::new();
        catalog.register("user.created", USER_SCHEMA, None).unwrap();

        assert!(catalog
            .validate("user.created", &json!({"id": "u1"}), &json!({}))
            .is_ok());
        let err = catalog
            .validate("user.created", &json!({"id": 1}), &json!({}))
            .unwrap_err();
        match err {
            SchemaError::Validation(failure) => {
                assert_eq!(failure.target, ValidationTarget::Data);
                assert_eq!(failure.paths(), vec!["$/id"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_reported() {
        let catalog = SchemaCatalog::new();
        assert!(matches!(
            catalog.validate("nope", &json!({}), &json!({})),
            Err(SchemaError::UnknownType(name)) if name == "nope"
        ));
    }

    #[test]
    fn default_properties_schema_accepts_empty_and_string_maps() {
        let mut catalog = SchemaCatalog::new();
        catalog.register("user.created", USER_SCHEMA, None).unwrap();
        let entry = catalog.get("user.created").unwrap();

        assert!(entry.validate_properties(&json!({})).is_ok());
        assert!(entry.validate_properties(&json!({"k": "v"})).is_ok());
        assert!(entry.validate_properties(&json!({"k": 1})).is_err());
    }

    #[test]
    fn optional_properties_accept_empty_map_required_reject_it() {
        let catalog = SchemaCatalog::from_embedded(&[
            ("audit.logged", USER_SCHEMA, Some(OPTIONAL_PROPERTIES)),
            ("tenant.scoped", USER_SCHEMA, Some(TENANT_PROPERTIES)),
        ])
        .unwrap();

        let optional = catalog.get("audit.logged").unwrap();
        assert!(optional.validate_properties(&json!({})).is_ok());

        let required = catalog.get("tenant.scoped").unwrap();
        let failure = required.validate_properties(&json!({})).unwrap_err();
        assert_eq!(failure.target, ValidationTarget::Properties);
        assert!(required
            .validate_properties(&json!({"tenant": "acme"}))
            .is_ok());
    }

    #[test]
    fn strict_mode_rejects_undeclared_fields() {
        let mut permissive = SchemaCatalog::new();
        permissive.register("user.created", USER_SCHEMA, None).unwrap();

        let mut strict = SchemaCatalog::with_config(CatalogConfig {
            strict_mode: true,
            ..CatalogConfig::default()
        });
        strict.register("user.created", USER_SCHEMA, None).unwrap();

        let data = json!({"id": "u1", "extra": true});
        assert!(permissive.validate("user.created", &data, &json!({})).is_ok());
        assert!(matches!(
            strict.validate("user.created", &data, &json!({})),
            Err(SchemaError::Validation(_))
        ));
    }

    #[test]
    fn invalid_schema_json_and_type_names_fail() {
        let mut catalog = SchemaCatalog::new();
        assert!(matches!(
            catalog.register("user.created", "{not json", None),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(
            catalog.register("user created", USER_SCHEMA, None),
            Err(SchemaError::InvalidTypeName { .. })
        ));
        assert!(matches!(
            catalog.register("", USER_SCHEMA, None),
            Err(SchemaError::InvalidTypeName { .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn type_name_rules() {
        assert!(validate_type_name("user.created").is_ok());
        assert!(validate_type_name("billing:invoice_v2-final").is_ok());
        assert!(validate_type_name(&"x".repeat(128)).is_ok());
        assert!(validate_type_name(&"x".repeat(129)).is_err());
        assert!(validate_type_name("user/created").is_err());
    }

    #[test]
    fn from_embedded_lists_sorted_types() {
        let catalog = SchemaCatalog::from_embedded(&[
            ("order.paid", USER_SCHEMA, None),
            ("audit.logged", USER_SCHEMA, Some(OPTIONAL_PROPERTIES)),
        ])
        .unwrap();

        assert!(catalog.has_schema("order.paid"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.type_names(), vec!["audit.logged", "order.paid"]);
    }

    #[test]
    fn into_entries_yields_every_type() {
        let catalog = SchemaCatalog::from_embedded(&[
            ("a", USER_SCHEMA, None),
            ("b", USER_SCHEMA, None),
        ])
        .unwrap();
        let mut names: Vec<String> = catalog
            .into_entries()
            .map(|entry| entry.type_name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    fn make_temp_schema_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "subprims-schema-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_schema(dir: &Path, file_name: &str, contents: &str) {
        std::fs::write(dir.join(file_name), contents.as_bytes()).unwrap();
    }

    #[test]
    fn from_directory_pairs_data_and_properties() {
        let dir = make_temp_schema_dir("pairs");
        write_schema(&dir, "user.created.data.schema.json", USER_SCHEMA);
        write_schema(&dir, "tenant.scoped.data.schema.json", USER_SCHEMA);
        write_schema(&dir, "tenant.scoped.properties.schema.json", TENANT_PROPERTIES);
        write_schema(&dir, "README.md", "not a schema");

        let catalog = SchemaCatalog::from_directory(&dir).unwrap();
        assert_eq!(catalog.type_names(), vec!["tenant.scoped", "user.created"]);
        assert!(catalog
            .get("tenant.scoped")
            .unwrap()
            .validate_properties(&json!({}))
            .is_err());
        assert!(catalog
            .get("user.created")
            .unwrap()
            .validate_properties(&json!({}))
            .is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_directory_rejects_orphan_properties_schema() {
        let dir = make_temp_schema_dir("orphan");
        write_schema(&dir, "tenant.scoped.properties.schema.json", TENANT_PROPERTIES);

        let result = SchemaCatalog::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(msg)) if msg.contains("tenant.scoped")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_directory_rejects_unrecognized_schema_names() {
        let dir = make_temp_schema_dir("unknown-name");
        write_schema(&dir, "user.created.schema.json", USER_SCHEMA);

        let result = SchemaCatalog::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_schema_is_rejected() {
        let dir = make_temp_schema_dir("symlink-schema");
        let target = dir.join("target.json");
        std::fs::write(&target, USER_SCHEMA.as_bytes()).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("user.created.data.schema.json")).unwrap();

        let result = SchemaCatalog::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_count_limit_is_enforced() {
        let dir = make_temp_schema_dir("count-limit");
        write_schema(&dir, "a.data.schema.json", USER_SCHEMA);
        write_schema(&dir, "b.data.schema.json", USER_SCHEMA);

        let config = CatalogConfig {
            max_schemas_from_directory: 1,
            ..CatalogConfig::default()
        };
        let result = SchemaCatalog::from_directory_with_config(&dir, config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_file_size_limit_is_enforced() {
        let dir = make_temp_schema_dir("size-limit");
        write_schema(&dir, "a.data.schema.json", USER_SCHEMA);

        let config = CatalogConfig {
            max_schema_file_size: 8,
            ..CatalogConfig::default()
        };
        let result = SchemaCatalog::from_directory_with_config(&dir, config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_fails_to_load() {
        let dir = make_temp_schema_dir("missing").join("does-not-exist");
        assert!(matches!(
            SchemaCatalog::from_directory(&dir),
            Err(SchemaError::LoadFailed(_))
        ));
    }

    #[test]
    fn parser_splits_type_and_target() {
        assert_eq!(
            parse_schema_file_name("user.created.data.schema.json"),
            Some(("user.created".to_string(), ValidationTarget::Data))
        );
        assert_eq!(
            parse_schema_file_name("user.created.properties.schema.json"),
            Some(("user.created".to_string(), ValidationTarget::Properties))
        );
        assert_eq!(parse_schema_file_name(".data.schema.json"), None);
        assert_eq!(parse_schema_file_name("user.created.schema.json"), None);
    }
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use subprims_schema::{SchemaCatalog, SchemaEntry};

use crate::error::{ConsumerError, Result};
use crate::handler::MessageHandler;

/// Schema and handler for one message type.
pub struct Route {
    schema: SchemaEntry,
    handler: Arc<dyn MessageHandler>,
}

impl Route {
    pub fn schema(&self) -> &SchemaEntry {
        &self.schema
    }

    pub fn handler(&self) -> &Arc<dyn MessageHandler> {
        &self.handler
    }
}

/// Immutable type-name → [`Route`] table.
///
/// Built only through [`RouterBuilder`], which guarantees every schema has
/// exactly one handler and every handler has a schema.
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Router {
    /// Start pairing handlers with the types in `catalog`.
    pub fn builder(catalog: SchemaCatalog) -> RouterBuilder {
        RouterBuilder::new(catalog)
    }

    pub fn get(&self, type_name: &str) -> Option<&Route> {
        self.routes.get(type_name)
    }

    /// Routed message types, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("types", &self.type_names())
            .finish()
    }
}

/// Collects handlers and checks them against a schema catalog.
pub struct RouterBuilder {
    catalog: SchemaCatalog,
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    duplicates: BTreeSet<String>,
}

impl RouterBuilder {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            catalog,
            handlers: HashMap::new(),
            duplicates: BTreeSet::new(),
        }
    }

    /// Register the handler for `type_name`.
    pub fn handler(self, type_name: &str, handler: impl MessageHandler + 'static) -> Self {
        self.shared_handler(type_name, Arc::new(handler))
    }

    /// Register an already shared handler for `type_name`.
    pub fn shared_handler(mut self, type_name: &str, handler: Arc<dyn MessageHandler>) -> Self {
        if self
            .handlers
            .insert(type_name.to_string(), handler)
            .is_some()
        {
            self.duplicates.insert(type_name.to_string());
        }
        self
    }

    /// Pair every schema with its handler.
    ///
    /// Fails listing schemas without a handler, handlers without a schema and
    /// types registered twice.
    pub fn build(mut self) -> Result<Router> {
        let schema_types: BTreeSet<String> = self.catalog.type_names().into_iter().collect();
        let handler_types: BTreeSet<String> = self.handlers.keys().cloned().collect();

        let missing: Vec<&str> = schema_types
            .difference(&handler_types)
            .map(String::as_str)
            .collect();
        let orphaned: Vec<&str> = handler_types
            .difference(&schema_types)
            .map(String::as_str)
            .collect();

        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("no handler for [{}]", missing.join(", ")));
        }
        if !orphaned.is_empty() {
            problems.push(format!("no schema for [{}]", orphaned.join(", ")));
        }
        if !self.duplicates.is_empty() {
            let duplicates: Vec<&str> = self.duplicates.iter().map(String::as_str).collect();
            problems.push(format!("duplicate handler for [{}]", duplicates.join(", ")));
        }
        if !problems.is_empty() {
            return Err(ConsumerError::Config(problems.join("; ")));
        }

        let mut routes = HashMap::with_capacity(schema_types.len());
        for schema in self.catalog.into_entries() {
            let type_name = schema.type_name().to_string();
            let handler = self.handlers.remove(&type_name).ok_or_else(|| {
                ConsumerError::Config(format!("no handler for [{type_name}]"))
            })?;
            routes.insert(type_name, Route { schema, handler });
        }

        tracing::debug!(types = routes.len(), "router built");
        Ok(Router { routes })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use subprims_envelope::PropertyMap;

    use super::*;
    use crate::handler::{handler_fn, HandlerError};

    const ANY_OBJECT: &str = r#"{"type":"object"}"#;

    fn accept_all() -> impl MessageHandler + 'static {
        handler_fn(|_: String, _: Value, _: PropertyMap| async { Ok::<bool, HandlerError>(true) })
    }

    fn catalog(types: &[&str]) -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new();
        for type_name in types {
            catalog.register(type_name, ANY_OBJECT, None).unwrap();
        }
        catalog
    }

    #[test]
    fn builds_when_key_sets_match() {
        let router = Router::builder(catalog(&["a", "b"]))
            .handler("b", accept_all())
            .handler("a", accept_all())
            .build()
            .unwrap();

        assert_eq!(router.type_names(), vec!["a", "b"]);
        assert_eq!(router.get("a").unwrap().schema().type_name(), "a");
        assert!(router.get("c").is_none());
    }

    #[test]
    fn schema_without_handler_fails() {
        let err = Router::builder(catalog(&["a", "b"]))
            .handler("a", accept_all())
            .build()
            .unwrap_err();

        assert!(matches!(&err, ConsumerError::Config(msg) if msg.contains("no handler for [b]")));
    }

    #[test]
    fn handler_without_schema_fails() {
        let err = Router::builder(catalog(&["a"]))
            .handler("a", accept_all())
            .handler("z", accept_all())
            .build()
            .unwrap_err();

        assert!(matches!(&err, ConsumerError::Config(msg) if msg.contains("no schema for [z]")));
    }

    #[test]
    fn duplicate_handler_fails() {
        let err = Router::builder(catalog(&["a"]))
            .handler("a", accept_all())
            .handler("a", accept_all())
            .build()
            .unwrap_err();

        assert!(
            matches!(&err, ConsumerError::Config(msg) if msg.contains("duplicate handler for [a]"))
        );
    }

    #[test]
    fn empty_router_is_allowed() {
        let router = Router::builder(SchemaCatalog::new()).build().unwrap();
        assert!(router.is_empty());
    }
}

//! # Registry Binder
//!
//! Turns raw, unbound definition objects into bound, self-referencing
//! operation tables across four categories: data-model handlers, services,
//! controllers, and policies.
//!
//! # Architecture Note
//! Binding here means an explicit receiver, not reflection: every operation
//! takes its owning [`OperationTable`] as first argument, so sibling
//! operations and plain attribute fields resolve through it. Non-operation
//! attributes pass through binding unchanged. Binding the same raw
//! definitions twice yields behaviorally identical tables.

use crate::error::{BoxError, RuntimeError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A bound operation: explicit owner receiver plus positional arguments.
pub type Operation = Arc<dyn Fn(&OperationTable, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// A raw, unbound definition: a name, plain data attributes, and named
/// operations. Built fluently; cloning shares the operation closures.
#[derive(Clone, Default)]
pub struct RawDefinition {
    name: String,
    attrs: Map<String, Value>,
    ops: HashMap<String, Operation>,
}

impl RawDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Map::new(),
            ops: HashMap::new(),
        }
    }

    /// Attaches a plain data attribute; carried through binding verbatim.
    pub fn attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Attaches a named operation.
    pub fn op<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&OperationTable, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.ops.insert(name.into(), Arc::new(operation));
        self
    }
}

/// A bound definition: operations invoked through it receive the table
/// itself as receiver, so cross-references between siblings resolve.
pub struct OperationTable {
    name: String,
    attrs: Map<String, Value>,
    ops: HashMap<String, Operation>,
}

impl OperationTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads a plain data attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }

    /// Invokes a named operation with this table as its receiver.
    pub fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let op = self
            .ops
            .get(operation)
            .ok_or_else(|| RuntimeError::UnknownOperation {
                table: self.name.clone(),
                operation: operation.to_string(),
            })?;
        op(self, args).map_err(|e| RuntimeError::Lifecycle(format!(
            "operation '{}.{}' failed: {e}",
            self.name, operation
        )))
    }
}

/// One bound category: named operation tables.
#[derive(Default)]
pub struct Registry {
    tables: HashMap<String, Arc<OperationTable>>,
}

impl Registry {
    /// Binds raw definitions into self-referencing tables. Takes the raw
    /// definitions by reference so binding is repeatable.
    pub fn bind(defs: &[RawDefinition]) -> Self {
        let tables = defs
            .iter()
            .map(|def| {
                let table = OperationTable {
                    name: def.name.clone(),
                    attrs: def.attrs.clone(),
                    ops: def.ops.clone(),
                };
                (def.name.clone(), Arc::new(table))
            })
            .collect();
        Self { tables }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<OperationTable>> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// The raw resource bundle supplied at construction (`api`).
#[derive(Clone, Default)]
pub struct ApiResources {
    pub models: Vec<RawDefinition>,
    pub services: Vec<RawDefinition>,
    pub controllers: Vec<RawDefinition>,
    pub policies: Vec<RawDefinition>,
}

/// The four bound registries exposed on the runtime context.
pub struct Registries {
    pub models: Registry,
    pub services: Registry,
    pub controllers: Registry,
    pub policies: Registry,
}

impl Registries {
    pub fn bind(api: &ApiResources) -> Self {
        Self {
            models: Registry::bind(&api.models),
            services: Registry::bind(&api.services),
            controllers: Registry::bind(&api.controllers),
            policies: Registry::bind(&api.policies),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_model() -> RawDefinition {
        RawDefinition::new("user")
            .attr("table", json!("users"))
            .op("table_name", |table, _args| {
                Ok(table.attr("table").cloned().unwrap_or(Value::Null))
            })
            .op("describe", |table, args| {
                // sibling cross-reference through the explicit receiver
                let name = table.invoke("table_name", args)?;
                Ok(json!(format!("model {} -> {}", table.name(), name)))
            })
    }

    #[test]
    fn operations_resolve_siblings_through_the_owner() {
        let registry = Registry::bind(&[user_model()]);
        let table = registry.get("user").unwrap();
        let described = table.invoke("describe", &[]).unwrap();
        assert_eq!(described, json!("model user -> \"users\""));
    }

    #[test]
    fn plain_attributes_pass_through_unchanged() {
        let registry = Registry::bind(&[user_model()]);
        let table = registry.get("user").unwrap();
        assert_eq!(table.attr("table"), Some(&json!("users")));
    }

    #[test]
    fn binding_twice_is_behaviorally_identical() {
        let defs = vec![user_model()];
        let first = Registry::bind(&defs);
        let second = Registry::bind(&defs);
        let a = first.get("user").unwrap().invoke("describe", &[]).unwrap();
        let b = second.get("user").unwrap().invoke("describe", &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_operation_is_reported_with_identity() {
        let registry = Registry::bind(&[user_model()]);
        let err = registry
            .get("user")
            .unwrap()
            .invoke("missing", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UnknownOperation { ref table, ref operation }
                if table == "user" && operation == "missing"
        ));
    }
}

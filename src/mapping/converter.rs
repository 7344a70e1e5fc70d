//! Attribute converters
//!
//! An attribute converter translates one field between its entity form and
//! the form the backend stores. Converters are registered by name and
//! referenced from field mappings.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

pub trait AttributeConverter: Send + Sync {
    fn to_storage(&self, value: Value) -> Result<Value>;

    fn to_entity(&self, value: Value) -> Result<Value>;

    /// Convert a sequence element-wise, a scalar as is
    fn to_storage_each(&self, value: Value) -> Result<Value> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.to_storage(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            single => self.to_storage(single),
        }
    }
}

/// Named converter registry
#[derive(Default, Clone)]
pub struct Converters {
    converters: HashMap<String, Arc<dyn AttributeConverter>>,
}

impl Converters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        converter: Arc<dyn AttributeConverter>,
    ) -> &mut Self {
        let name = name.into();
        tracing::debug!(converter = %name, "Registering attribute converter");
        self.converters.insert(name, converter);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn AttributeConverter>> {
        self.converters
            .get(name)
            .ok_or_else(|| Error::ConverterNotFound {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for Converters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.converters.keys().collect();
        names.sort();
        f.debug_struct("Converters").field("names", &names).finish()
    }
}

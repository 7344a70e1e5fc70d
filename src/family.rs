//! Backend families and their capability interfaces
//!
//! A family fixes the native query and entity types of one backend
//! category. Converters turn the shared AST into those types, connection
//! managers execute them.

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use nql::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};

use crate::communication::{Insertion, QueryParams, Template};
use crate::error::{Error, Result};
use crate::observer::ObserverParser;

/// Backend categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Document,
    Column,
    /// Whole entities under a key, see [`crate::key_value`]
    KeyValue,
}

/// A backend family
pub trait Family: Debug + Send + Sync + Sized + 'static {
    const CATEGORY: Category;

    /// Entity as stored by the backend
    type Entity: Clone + Debug + Send + Sync + 'static;
    /// Resolved select query
    type Select: Clone + Debug + Send + Sync + 'static;
    /// Resolved delete query
    type Delete: Clone + Debug + Send + Sync + 'static;

    type EntityTemplate: Template<Bound = Self::Entity>;
    type SelectTemplate: Template<Bound = Self::Select>;
    type DeleteTemplate: Template<Bound = Self::Delete>;

    /// The converter registered by `ConverterRegistry::with_defaults`
    fn default_converter() -> Arc<dyn QueryConverter<Self>>;
}

/// Turns the AST into native templates for family `F`
pub trait QueryConverter<F: Family>: Send + Sync {
    fn convert_select(
        &self,
        query: &SelectQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<F::SelectTemplate>>;

    fn convert_delete(
        &self,
        query: &DeleteQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<F::DeleteTemplate>>;

    fn convert_insert(
        &self,
        query: &InsertQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<Insertion<F::EntityTemplate>>>;

    fn convert_update(
        &self,
        query: &UpdateQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<F::EntityTemplate>>;
}

/// Synchronous backend connection
pub trait ConnectionManager<F: Family>: Send + Sync {
    fn select(&self, query: F::Select) -> anyhow::Result<Vec<F::Entity>>;

    fn delete(&self, query: F::Delete) -> anyhow::Result<()>;

    fn insert(&self, entity: F::Entity) -> anyhow::Result<F::Entity>;

    fn insert_with_ttl(&self, entity: F::Entity, ttl: Duration) -> anyhow::Result<F::Entity>;

    fn update(&self, entity: F::Entity) -> anyhow::Result<F::Entity>;

    fn count(&self, query: F::Select) -> anyhow::Result<u64> {
        Ok(self.select(query)?.len() as u64)
    }
}

/// Asynchronous backend connection
#[async_trait]
pub trait ConnectionManagerAsync<F: Family>: Send + Sync {
    async fn select(&self, query: F::Select) -> anyhow::Result<Vec<F::Entity>>;

    async fn delete(&self, query: F::Delete) -> anyhow::Result<()>;

    async fn insert(&self, entity: F::Entity) -> anyhow::Result<F::Entity>;

    async fn insert_with_ttl(&self, entity: F::Entity, ttl: Duration) -> anyhow::Result<F::Entity>;

    async fn update(&self, entity: F::Entity) -> anyhow::Result<F::Entity>;
}

/// Family to converter registry, populated at start and handed to the
/// parsers by reference
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the converter of every built-in family
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<crate::document::DocumentFamily>(
            crate::document::DocumentFamily::default_converter(),
        );
        registry.register::<crate::column::ColumnFamily>(
            crate::column::ColumnFamily::default_converter(),
        );
        registry
    }

    /// Register or replace the converter of family `F`
    pub fn register<F: Family>(&mut self, converter: Arc<dyn QueryConverter<F>>) -> &mut Self {
        tracing::debug!(category = ?F::CATEGORY, "Registering query converter");
        self.converters.insert(TypeId::of::<F>(), Arc::new(converter));
        self
    }

    pub fn get<F: Family>(&self) -> Result<Arc<dyn QueryConverter<F>>> {
        self.converters
            .get(&TypeId::of::<F>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn QueryConverter<F>>>())
            .cloned()
            .ok_or_else(|| {
                Error::precondition(format!("no query converter registered for {:?}", F::CATEGORY))
            })
    }

    pub fn contains<F: Family>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<F>())
    }
}

impl Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("families", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnFamily;
    use crate::document::DocumentFamily;

    #[test]
    fn test_registry_defaults() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.get::<DocumentFamily>().is_ok());
        assert!(registry.get::<ColumnFamily>().is_ok());
    }

    #[test]
    fn test_missing_family_is_precondition() {
        let registry = ConverterRegistry::new();
        let err = registry.get::<DocumentFamily>().err().unwrap();
        assert!(err.is_precondition());
        assert!(!registry.contains::<ColumnFamily>());
    }
}

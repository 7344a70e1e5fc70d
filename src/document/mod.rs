//! Document family
//!
//! A document entity is a named collection of documents (name/value
//! pairs). Queries address a collection and may project, filter, sort and
//! page.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use nql::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};

use crate::communication::{
    resolve_elements, Criteria, Element, Insertion, QueryParams, Sort, Template, Term, TermBuilder,
};
use crate::error::Result;
use crate::family::{Category, Family, QueryConverter};
use crate::observer::ObserverParser;
use crate::params::Params;
use crate::value::Value;

/// A single field of a document entity
pub type Document<V = Value> = Element<V>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentFamily;

impl Family for DocumentFamily {
    const CATEGORY: Category = Category::Document;

    type Entity = DocumentEntity;
    type Select = DocumentQuery;
    type Delete = DocumentDeleteQuery;

    type EntityTemplate = DocumentEntity<Term>;
    type SelectTemplate = DocumentQuery<Term>;
    type DeleteTemplate = DocumentDeleteQuery<Term>;

    fn default_converter() -> Arc<dyn QueryConverter<Self>> {
        Arc::new(DocumentQueryConverter)
    }
}

/// A stored document entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntity<V = Value> {
    /// Collection name
    pub name: String,
    pub documents: Vec<Document<V>>,
}

impl<V> DocumentEntity<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: vec![],
        }
    }

    pub fn find(&self, name: &str) -> Option<&Document<V>> {
        self.documents.iter().find(|d| d.name == name)
    }

    /// Add a document, replacing one with the same name
    pub fn add(&mut self, document: Document<V>) -> &mut Self {
        match self.documents.iter_mut().find(|d| d.name == document.name) {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Document<V>> {
        let index = self.documents.iter().position(|d| d.name == name)?;
        Some(self.documents.remove(index))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentEntity {
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(Document::of(name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(|d| &d.value)
    }
}

impl Template for DocumentEntity<Term> {
    type Bound = DocumentEntity;

    fn resolve(&self, params: &Params) -> Result<DocumentEntity> {
        Ok(DocumentEntity {
            name: self.name.clone(),
            documents: resolve_elements(&self.documents, params)?,
        })
    }
}

/// Select over a document collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery<V = Value> {
    pub collection: String,
    /// Projected documents (empty = all)
    pub documents: Vec<String>,
    pub condition: Option<Criteria<V>>,
    pub sorts: Vec<Sort>,
    /// 0 = unbounded
    pub limit: u64,
    pub skip: u64,
}

impl Template for DocumentQuery<Term> {
    type Bound = DocumentQuery;

    fn resolve(&self, params: &Params) -> Result<DocumentQuery> {
        Ok(DocumentQuery {
            collection: self.collection.clone(),
            documents: self.documents.clone(),
            condition: self.condition.as_ref().map(|c| c.resolve(params)).transpose()?,
            sorts: self.sorts.clone(),
            limit: self.limit,
            skip: self.skip,
        })
    }
}

/// Delete from a document collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDeleteQuery<V = Value> {
    pub collection: String,
    /// Documents to remove (empty = the whole entity)
    pub documents: Vec<String>,
    pub condition: Option<Criteria<V>>,
}

impl Template for DocumentDeleteQuery<Term> {
    type Bound = DocumentDeleteQuery;

    fn resolve(&self, params: &Params) -> Result<DocumentDeleteQuery> {
        Ok(DocumentDeleteQuery {
            collection: self.collection.clone(),
            documents: self.documents.clone(),
            condition: self.condition.as_ref().map(|c| c.resolve(params)).transpose()?,
        })
    }
}

/// AST to document query converter
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentQueryConverter;

impl QueryConverter<DocumentFamily> for DocumentQueryConverter {
    fn convert_select(
        &self,
        query: &SelectQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<DocumentQuery<Term>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let native = DocumentQuery {
            collection: builder.entity_name()?,
            documents: builder.fields(&query.fields)?,
            condition: builder.condition(&query.condition)?,
            sorts: builder.sorts(&query.sorts)?,
            limit: query.limit,
            skip: query.skip,
        };
        Ok(QueryParams::new(native, builder.finish()))
    }

    fn convert_delete(
        &self,
        query: &DeleteQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<DocumentDeleteQuery<Term>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let native = DocumentDeleteQuery {
            collection: builder.entity_name()?,
            documents: builder.fields(&query.fields)?,
            condition: builder.condition(&query.condition)?,
        };
        Ok(QueryParams::new(native, builder.finish()))
    }

    fn convert_insert(
        &self,
        query: &InsertQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<Insertion<DocumentEntity<Term>>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let entity = DocumentEntity {
            name: builder.entity_name()?,
            documents: builder.assignments(&query.assignments)?,
        };
        Ok(QueryParams::new(
            Insertion {
                entity,
                ttl: query.ttl,
            },
            builder.finish(),
        ))
    }

    fn convert_update(
        &self,
        query: &UpdateQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<DocumentEntity<Term>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let entity = DocumentEntity {
            name: builder.entity_name()?,
            documents: builder.assignments(&query.assignments)?,
        };
        Ok(QueryParams::new(entity, builder.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::IdentityObserver;
    use nql::Statement;

    fn select(text: &str) -> QueryParams<DocumentQuery<Term>> {
        let Statement::Select(query) = nql::parse(text).unwrap() else {
            panic!("Expected Select");
        };
        DocumentQueryConverter.convert_select(&query, &IdentityObserver).unwrap()
    }

    #[test]
    fn test_convert_select() {
        let converted = select("select name from God where age > 10 skip 1 limit 2 order by name desc");
        let query = converted.query;
        assert_eq!(query.collection, "God");
        assert_eq!(query.documents, vec!["name"]);
        assert_eq!(query.sorts, vec![Sort::desc("name")]);
        assert_eq!((query.skip, query.limit), (1, 2));
        assert_eq!(
            query.condition,
            Some(Criteria::gt("age", Term::Value(Value::Int(10))))
        );
        assert!(converted.params.is_empty());
    }

    #[test]
    fn test_convert_select_params_match_ast() {
        let text = "select * from God where name = @name and age between ? and ?";
        let ast = nql::parse(text).unwrap();
        let converted = select(text);
        let names: Vec<String> = converted.params.names().map(str::to_string).collect();
        assert_eq!(names, ast.param_names());
    }

    #[test]
    fn test_resolve_select() {
        let mut converted = select("select * from God where name = @name");
        converted.params.bind("name", Value::from("Diana")).unwrap();
        let resolved = converted.query.resolve(&converted.params).unwrap();
        assert_eq!(resolved.condition, Some(Criteria::eq("name", "Diana")));
    }

    #[test]
    fn test_convert_insert() {
        let Statement::Insert(query) = nql::parse(r#"insert God (name = "Diana", age = @age) 5 seconds"#).unwrap() else {
            panic!("Expected Insert");
        };
        let mut converted = DocumentQueryConverter.convert_insert(&query, &IdentityObserver).unwrap();
        converted.params.bind("age", Value::Int(30)).unwrap();
        let insertion = converted.query.resolve(&converted.params).unwrap();
        assert_eq!(insertion.ttl, Some(std::time::Duration::from_secs(5)));
        assert_eq!(insertion.entity.get("age"), Some(&Value::Int(30)));
        assert_eq!(insertion.entity.get("name"), Some(&Value::from("Diana")));
    }

    #[test]
    fn test_entity_add_replaces() {
        let mut entity = DocumentEntity::new("God").with("name", "Diana");
        entity.add(Document::of("name", "Artemis"));
        assert_eq!(entity.len(), 1);
        assert_eq!(entity.get("name"), Some(&Value::from("Artemis")));
        assert!(entity.remove("name").is_some());
        assert!(entity.is_empty());
    }
}

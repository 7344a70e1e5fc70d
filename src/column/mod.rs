//! Column family
//!
//! A column entity is a row of a column family. Column queries support
//! the same clauses as document queries.

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

pub type Column<V = Value> = Element<V>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnFamily;

impl Family for ColumnFamily {
    const CATEGORY: Category = Category::Column;

    type Entity = ColumnEntity;
    type Select = ColumnQuery;
    type Delete = ColumnDeleteQuery;

    type EntityTemplate = ColumnEntity<Term>;
    type SelectTemplate = ColumnQuery<Term>;
    type DeleteTemplate = ColumnDeleteQuery<Term>;

    fn default_converter() -> Arc<dyn QueryConverter<Self>> {
        Arc::new(ColumnQueryConverter)
    }
}

/// A row of a column family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntity<V = Value> {
    /// Column family name
    pub name: String,
    pub columns: Vec<Column<V>>,
}

impl<V> ColumnEntity<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
        }
    }

    pub fn find(&self, name: &str) -> Option<&Column<V>> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn add(&mut self, column: Column<V>) -> &mut Self {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl ColumnEntity {
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(Column::of(name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(|c| &c.value)
    }
}

impl Template for ColumnEntity<Term> {
    type Bound = ColumnEntity;

    fn resolve(&self, params: &Params) -> Result<ColumnEntity> {
        Ok(ColumnEntity {
            name: self.name.clone(),
            columns: resolve_elements(&self.columns, params)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuery<V = Value> {
    pub column_family: String,
    pub columns: Vec<String>,
    pub condition: Option<Criteria<V>>,
    pub sorts: Vec<Sort>,
    pub limit: u64,
    pub skip: u64,
}

impl Template for ColumnQuery<Term> {
    type Bound = ColumnQuery;

    fn resolve(&self, params: &Params) -> Result<ColumnQuery> {
        Ok(ColumnQuery {
            column_family: self.column_family.clone(),
            columns: self.columns.clone(),
            condition: self.condition.as_ref().map(|c| c.resolve(params)).transpose()?,
            sorts: self.sorts.clone(),
            limit: self.limit,
            skip: self.skip,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDeleteQuery<V = Value> {
    pub column_family: String,
    pub columns: Vec<String>,
    pub condition: Option<Criteria<V>>,
}

impl Template for ColumnDeleteQuery<Term> {
    type Bound = ColumnDeleteQuery;

    fn resolve(&self, params: &Params) -> Result<ColumnDeleteQuery> {
        Ok(ColumnDeleteQuery {
            column_family: self.column_family.clone(),
            columns: self.columns.clone(),
            condition: self.condition.as_ref().map(|c| c.resolve(params)).transpose()?,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnQueryConverter;

fn row(builder: &mut TermBuilder<'_>, assignments: &[nql::Assignment]) -> Result<ColumnEntity<Term>> {
    Ok(ColumnEntity {
        name: builder.entity_name()?,
        columns: builder.assignments(assignments)?,
    })
}

impl QueryConverter<ColumnFamily> for ColumnQueryConverter {
    fn convert_select(
        &self,
        query: &SelectQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<ColumnQuery<Term>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let native = ColumnQuery {
            column_family: builder.entity_name()?,
            columns: builder.fields(&query.fields)?,
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
    ) -> Result<QueryParams<ColumnDeleteQuery<Term>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let native = ColumnDeleteQuery {
            column_family: builder.entity_name()?,
            columns: builder.fields(&query.fields)?,
            condition: builder.condition(&query.condition)?,
        };
        Ok(QueryParams::new(native, builder.finish()))
    }

    fn convert_insert(
        &self,
        query: &InsertQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<Insertion<ColumnEntity<Term>>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let entity = row(&mut builder, &query.assignments)?;
        let insertion = Insertion {
            entity,
            ttl: query.ttl,
        };
        Ok(QueryParams::new(insertion, builder.finish()))
    }

    fn convert_update(
        &self,
        query: &UpdateQuery,
        observer: &dyn ObserverParser,
    ) -> Result<QueryParams<ColumnEntity<Term>>> {
        let mut builder = TermBuilder::new(&query.entity, observer);
        let entity = row(&mut builder, &query.assignments)?;
        Ok(QueryParams::new(entity, builder.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::IdentityObserver;
    use nql::Statement;

    #[test]
    fn test_convert_delete_with_columns() {
        let Statement::Delete(query) = nql::parse("delete age, power from God where name = ?").unwrap() else {
            panic!("Expected Delete");
        };
        let mut converted = ColumnQueryConverter.convert_delete(&query, &IdentityObserver).unwrap();
        assert_eq!(converted.query.column_family, "God");
        assert_eq!(converted.query.columns, vec!["age", "power"]);
        assert_eq!(converted.params.names().collect::<Vec<_>>(), vec!["?1"]);

        converted.params.bind("?1", Value::from("Diana")).unwrap();
        let resolved = converted.query.resolve(&converted.params).unwrap();
        assert_eq!(resolved.condition, Some(Criteria::eq("name", "Diana")));
    }

    #[test]
    fn test_convert_update() {
        let Statement::Update(query) = nql::parse(r#"update God (age = 30, name = "Artemis")"#).unwrap() else {
            panic!("Expected Update");
        };
        let converted = ColumnQueryConverter.convert_update(&query, &IdentityObserver).unwrap();
        let entity = converted.query.resolve(&converted.params).unwrap();
        assert_eq!(
            entity,
            ColumnEntity::new("God").with("age", 30i64).with("name", "Artemis")
        );
    }
}

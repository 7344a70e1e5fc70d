//! Repository method execution
//!
//! Turns a derived method call such as `findByNameOrderByAgeDesc("Diana")`
//! into a native query: the method name is parsed into the AST, sort and
//! pagination arguments are merged in, the AST is converted with the entity
//! mapping as observer, and the remaining arguments are bound.

use std::sync::Arc;

use nql::{
    DeleteMethodProvider, DeleteQuery, MethodKind, Operand, Operator, Param, SelectMethodProvider,
    SelectQuery, Where,
};

use crate::binder::{Argument, MethodSignature, ParamsBinder, SpecialArguments};
use crate::communication::Template;
use crate::error::{Error, Result};
use crate::family::{ConnectionManager, ConverterRegistry, Family, QueryConverter};
use crate::mapping::{Converters, EntityMapping};
use crate::params::Params;
use crate::query::single;
use crate::value::{StandardConversion, ValueConversion};

/// Outcome of a repository method, by verb
#[derive(Debug)]
pub enum MethodResult<F: Family> {
    Entities(Vec<F::Entity>),
    Count(u64),
    Exists(bool),
    Deleted,
}

/// Derived queries for one mapped entity
pub struct RepositoryQuery<'a, F: Family> {
    converter: Arc<dyn QueryConverter<F>>,
    mapping: &'a EntityMapping,
    converters: &'a Converters,
    conversion: Arc<dyn ValueConversion>,
}

impl<'a, F: Family> RepositoryQuery<'a, F> {
    pub fn new(
        converter: Arc<dyn QueryConverter<F>>,
        mapping: &'a EntityMapping,
        converters: &'a Converters,
    ) -> Self {
        Self {
            converter,
            mapping,
            converters,
            conversion: Arc::new(StandardConversion),
        }
    }

    pub fn from_registry(
        registry: &ConverterRegistry,
        mapping: &'a EntityMapping,
        converters: &'a Converters,
    ) -> Result<Self> {
        Ok(Self::new(registry.get::<F>()?, mapping, converters))
    }

    pub fn with_conversion(mut self, conversion: Arc<dyn ValueConversion>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn mapping(&self) -> &EntityMapping {
        self.mapping
    }

    /// Native select query of a `find`, `count` or `exists` method
    pub fn select(&self, method: &MethodSignature, args: &[Argument]) -> Result<F::Select> {
        expect_kind(&method.name, MethodKind::is_select, "find, count or exists")?;
        let mut query = SelectMethodProvider::cached().apply(&method.name, &self.mapping.name)?;
        SpecialArguments::scan(args).apply_to(&mut query);
        self.resolve_select(&query, args, method)
    }

    /// Native delete query of a `delete` method
    pub fn delete(&self, method: &MethodSignature, args: &[Argument]) -> Result<F::Delete> {
        expect_kind(&method.name, |kind| kind == MethodKind::Delete, "delete")?;
        let query = DeleteMethodProvider::cached().apply(&method.name, &self.mapping.name)?;
        self.resolve_delete(&query, args, method)
    }

    /// Run a method against the backend
    pub fn execute(
        &self,
        manager: &dyn ConnectionManager<F>,
        method: &MethodSignature,
        args: &[Argument],
    ) -> Result<MethodResult<F>> {
        tracing::debug!(
            entity = %self.mapping.name,
            method = %method.name,
            "Executing repository method"
        );
        let kind = MethodKind::detect(&method.name);
        match kind {
            Some(MethodKind::Delete) => {
                let query = self.delete(method, args)?;
                manager.delete(query).map_err(Error::Backend)?;
                Ok(MethodResult::Deleted)
            }
            Some(MethodKind::Count) => {
                let query = self.select(method, args)?;
                let count = manager.count(query).map_err(Error::Backend)?;
                Ok(MethodResult::Count(count))
            }
            Some(MethodKind::Exists) => {
                let query = self.select(method, args)?;
                let count = manager.count(query).map_err(Error::Backend)?;
                Ok(MethodResult::Exists(count > 0))
            }
            Some(MethodKind::Find) | None => {
                let query = self.select(method, args)?;
                let entities = manager.select(query).map_err(Error::Backend)?;
                Ok(MethodResult::Entities(entities))
            }
        }
    }

    /// Load the entity whose id field equals `id`
    pub fn find_by_id(
        &self,
        manager: &dyn ConnectionManager<F>,
        id: impl Into<Argument>,
    ) -> Result<Option<F::Entity>> {
        let mut query = SelectQuery::new(&self.mapping.name);
        query.condition = Some(self.id_condition()?);
        let native = self.resolve_select(&query, &[id.into()], &MethodSignature::new("findById"))?;
        single(manager.select(native).map_err(Error::Backend)?)
    }

    /// Delete the entity whose id field equals `id`
    pub fn delete_by_id(
        &self,
        manager: &dyn ConnectionManager<F>,
        id: impl Into<Argument>,
    ) -> Result<()> {
        let mut query = DeleteQuery::new(&self.mapping.name);
        query.condition = Some(self.id_condition()?);
        let native = self.resolve_delete(&query, &[id.into()], &MethodSignature::new("deleteById"))?;
        manager.delete(native).map_err(Error::Backend)
    }

    fn id_condition(&self) -> Result<Where> {
        let id = self.mapping.id()?;
        Ok(Where::condition(
            &id.name,
            Operator::Equals,
            Operand::Param(Param::Positional(1)),
        ))
    }

    fn resolve_select(
        &self,
        query: &SelectQuery,
        args: &[Argument],
        method: &MethodSignature,
    ) -> Result<F::Select> {
        let converted = self.converter.convert_select(query, self.mapping)?;
        let mut params = converted.params;
        self.bind(&mut params, args, method)?;
        converted.query.resolve(&params)
    }

    fn resolve_delete(
        &self,
        query: &DeleteQuery,
        args: &[Argument],
        method: &MethodSignature,
    ) -> Result<F::Delete> {
        let converted = self.converter.convert_delete(query, self.mapping)?;
        let mut params = converted.params;
        self.bind(&mut params, args, method)?;
        converted.query.resolve(&params)
    }

    fn bind(&self, params: &mut Params, args: &[Argument], method: &MethodSignature) -> Result<()> {
        let args = args
            .iter()
            .map(|arg| match arg {
                Argument::Value(value) => self.conversion.convert(value.clone()).map(Argument::Value),
                special => Ok(special.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        ParamsBinder::new(self.converters)
            .with_mapping(self.mapping)
            .bind(params, &args, method)?;
        params.check_all_bound()
    }
}

fn expect_kind(method: &str, accepts: impl Fn(MethodKind) -> bool, expected: &'static str) -> Result<()> {
    match MethodKind::detect(method) {
        Some(kind) if !accepts(kind) => Err(Error::MethodKind {
            method: method.to_string(),
            expected,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Pagination;
    use crate::communication::{Criteria, Direction, Sort};
    use crate::document::DocumentFamily;
    use crate::mapping::FieldMapping;
    use crate::value::Value;

    fn mapping() -> EntityMapping {
        EntityMapping::new("God")
            .stored_as("gods")
            .with_field(FieldMapping::id("id").stored_as("_id"))
            .with_field(FieldMapping::new("name").stored_as("god_name"))
            .with_field(FieldMapping::new("age"))
    }

    #[test]
    fn test_select_from_method() {
        let mapping = mapping();
        let converters = Converters::new();
        let repo = RepositoryQuery::<DocumentFamily>::new(
            DocumentFamily::default_converter(),
            &mapping,
            &converters,
        );
        let args = vec![
            Argument::from("Diana"),
            Argument::Sort(nql::Sort {
                field: "age".into(),
                direction: nql::Direction::Asc,
            }),
            Argument::Pagination(Pagination::new(2, 5)),
        ];
        let query = repo
            .select(&MethodSignature::new("findByNameOrderByNameDesc"), &args)
            .unwrap();
        assert_eq!(query.collection, "gods");
        assert_eq!(query.condition, Some(Criteria::eq("god_name", "Diana")));
        assert_eq!(query.sorts, vec![Sort::desc("god_name"), Sort::asc("age")]);
        assert_eq!((query.skip, query.limit), (5, 5));
        assert_eq!(query.sorts[1].direction, Direction::Asc);
    }

    #[test]
    fn test_method_kind_mismatch() {
        let mapping = mapping();
        let converters = Converters::new();
        let repo = RepositoryQuery::<DocumentFamily>::new(
            DocumentFamily::default_converter(),
            &mapping,
            &converters,
        );
        let err = repo
            .select(&MethodSignature::new("deleteByName"), &[Argument::from("Diana")])
            .unwrap_err();
        assert!(matches!(err, Error::MethodKind { expected: "find, count or exists", .. }));

        let err = repo
            .delete(&MethodSignature::new("findByName"), &[Argument::from("Diana")])
            .unwrap_err();
        assert!(err.is_query_error());
    }

    #[test]
    fn test_missing_argument() {
        let mapping = mapping();
        let converters = Converters::new();
        let repo = RepositoryQuery::<DocumentFamily>::new(
            DocumentFamily::default_converter(),
            &mapping,
            &converters,
        );
        let err = repo
            .select(&MethodSignature::new("findByNameAndAge"), &[Argument::from("Diana")])
            .unwrap_err();
        assert!(matches!(err, Error::ArgumentCount { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_delete_from_method() {
        let mapping = mapping();
        let converters = Converters::new();
        let repo = RepositoryQuery::<DocumentFamily>::new(
            DocumentFamily::default_converter(),
            &mapping,
            &converters,
        );
        let query = repo
            .delete(&MethodSignature::new("deleteByAgeLessThan"), &[Argument::from(10i64)])
            .unwrap();
        assert_eq!(query.collection, "gods");
        assert_eq!(query.condition, Some(Criteria::lt("age", Value::Int(10))));
    }
}

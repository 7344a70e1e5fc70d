//! Synchronous query parser

use std::sync::Arc;

use nql::{
    Command, DeleteQueryProvider, InsertQueryProvider, QueryProvider, SelectQueryProvider,
    Statement, UpdateQueryProvider,
};

use super::prepared::PreparedStatement;
use super::statement::{single, NativeQuery, StatementCore};
use crate::communication::Template;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::family::{ConnectionManager, ConverterRegistry, Family, QueryConverter};
use crate::observer::ObserverParser;
use crate::params::Params;
use crate::value::{StandardConversion, ValueConversion};

/// Parse a query, choosing the grammar provider by command prefix
pub(crate) fn parse_statement(query: &str) -> Result<Statement> {
    let statement = match Command::detect(query)? {
        Command::Select => Statement::Select(SelectQueryProvider::cached().apply(query)?),
        Command::Delete => Statement::Delete(DeleteQueryProvider::cached().apply(query)?),
        Command::Insert => Statement::Insert(InsertQueryProvider::cached().apply(query)?),
        Command::Update => Statement::Update(UpdateQueryProvider::cached().apply(query)?),
    };
    Ok(statement)
}

/// Parses, converts and executes NQL against a family `F` backend
pub struct QueryParser<F: Family> {
    converter: Arc<dyn QueryConverter<F>>,
    conversion: Arc<dyn ValueConversion>,
    config: PipelineConfig,
}

impl<F: Family> Default for QueryParser<F> {
    fn default() -> Self {
        Self::new(F::default_converter())
    }
}

impl<F: Family> QueryParser<F> {
    pub fn new(converter: Arc<dyn QueryConverter<F>>) -> Self {
        Self {
            converter,
            conversion: Arc::new(StandardConversion),
            config: PipelineConfig::default(),
        }
    }

    /// Use the converter registered for `F`
    pub fn from_registry(registry: &ConverterRegistry) -> Result<Self> {
        Ok(Self::new(registry.get::<F>()?))
    }

    pub fn with_conversion(mut self, conversion: Arc<dyn ValueConversion>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn converter(&self) -> &Arc<dyn QueryConverter<F>> {
        &self.converter
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parse and run a query with no unbound placeholders
    pub fn query(
        &self,
        query: &str,
        manager: &dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<Vec<F::Entity>> {
        tracing::debug!(query, "Executing query");
        let (native, params) = self.convert(query, observer)?;
        params.check_all_bound()?;
        native.resolve(&params)?.run(manager)
    }

    /// Parse a query for later binding
    pub fn prepare<'m>(
        &self,
        query: &str,
        manager: &'m dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<PreparedStatement<'m, F>> {
        tracing::debug!(query, "Preparing query");
        let (native, params) = self.convert(query, observer)?;
        let core = StatementCore::new(native, params, self.conversion.clone(), self.config.clone());
        Ok(PreparedStatement::new(core, manager))
    }

    /// Run a `select` query
    pub fn select(
        &self,
        query: &str,
        manager: &dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<Vec<F::Entity>> {
        Command::detect(query)?;
        let select = SelectQueryProvider::cached().apply(query)?;
        let converted = self.converter.convert_select(&select, observer)?;
        converted.params.check_all_bound()?;
        manager
            .select(converted.query.resolve(&converted.params)?)
            .map_err(Error::Backend)
    }

    /// Run a `select` query that matches at most one entity
    pub fn single(
        &self,
        query: &str,
        manager: &dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<Option<F::Entity>> {
        single(self.select(query, manager, observer)?)
    }

    /// Run a `delete` query
    pub fn delete(
        &self,
        query: &str,
        manager: &dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<()> {
        Command::detect(query)?;
        let delete = DeleteQueryProvider::cached().apply(query)?;
        let converted = self.converter.convert_delete(&delete, observer)?;
        converted.params.check_all_bound()?;
        manager
            .delete(converted.query.resolve(&converted.params)?)
            .map_err(Error::Backend)
    }

    /// Run an `insert` query
    pub fn insert(
        &self,
        query: &str,
        manager: &dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<F::Entity> {
        Command::detect(query)?;
        let insert = InsertQueryProvider::cached().apply(query)?;
        let converted = self.converter.convert_insert(&insert, observer)?;
        converted.params.check_all_bound()?;
        let insertion = converted.query.resolve(&converted.params)?;
        let inserted = match insertion.ttl {
            Some(ttl) => manager.insert_with_ttl(insertion.entity, ttl),
            None => manager.insert(insertion.entity),
        };
        inserted.map_err(Error::Backend)
    }

    /// Run an `update` query
    pub fn update(
        &self,
        query: &str,
        manager: &dyn ConnectionManager<F>,
        observer: &dyn ObserverParser,
    ) -> Result<F::Entity> {
        Command::detect(query)?;
        let update = UpdateQueryProvider::cached().apply(query)?;
        let converted = self.converter.convert_update(&update, observer)?;
        converted.params.check_all_bound()?;
        manager
            .update(converted.query.resolve(&converted.params)?)
            .map_err(Error::Backend)
    }

    fn convert(
        &self,
        query: &str,
        observer: &dyn ObserverParser,
    ) -> Result<(NativeQuery<F>, Params)> {
        let statement = parse_statement(query)?;
        NativeQuery::convert(&statement, self.converter.as_ref(), observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nql::ParseErrorKind;

    #[test]
    fn test_parse_statement_dispatch() {
        assert!(matches!(parse_statement("select * from God").unwrap(), Statement::Select(_)));
        assert!(matches!(parse_statement("delete from God").unwrap(), Statement::Delete(_)));

        let err = parse_statement("abc").unwrap_err();
        assert_eq!(err.as_parse_error().unwrap().kind, ParseErrorKind::InvalidQuery);

        let err = parse_statement("upsert God (name = 1)").unwrap_err();
        assert_eq!(err.as_parse_error().unwrap().kind, ParseErrorKind::UnrecognizedCommand);
    }
}

//! Asynchronous query parser
//!
//! Parsing and conversion happen on the caller's thread; the backend call
//! runs on tokio. Every failure, parse errors included, reaches the caller
//! through the returned result or the callback.

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::parser::parse_statement;
use super::prepared_async::PreparedStatementAsync;
use super::statement::{NativeQuery, StatementCore};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::family::{ConnectionManagerAsync, ConverterRegistry, Family, QueryConverter};
use crate::observer::ObserverParser;
use crate::params::Params;
use crate::value::{StandardConversion, ValueConversion};

pub struct QueryParserAsync<F: Family> {
    converter: Arc<dyn QueryConverter<F>>,
    conversion: Arc<dyn ValueConversion>,
    config: PipelineConfig,
}

impl<F: Family> Default for QueryParserAsync<F> {
    fn default() -> Self {
        Self::new(F::default_converter())
    }
}

impl<F: Family> QueryParserAsync<F> {
    pub fn new(converter: Arc<dyn QueryConverter<F>>) -> Self {
        Self {
            converter,
            conversion: Arc::new(StandardConversion),
            config: PipelineConfig::default(),
        }
    }

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

    /// Parse and run a query with no unbound placeholders
    pub async fn query(
        &self,
        query: &str,
        manager: &dyn ConnectionManagerAsync<F>,
        observer: &dyn ObserverParser,
    ) -> Result<Vec<F::Entity>> {
        tracing::debug!(query, "Executing async query");
        let resolved = {
            let (native, params) = self.convert(query, observer)?;
            params.check_all_bound()?;
            native.resolve(&params)?
        };
        resolved.run_async(manager).await
    }

    /// Fire-and-continue execution; `callback` runs exactly once
    pub fn query_with<C>(
        &self,
        query: &str,
        manager: Arc<dyn ConnectionManagerAsync<F>>,
        observer: &dyn ObserverParser,
        callback: C,
    ) -> JoinHandle<()>
    where
        C: FnOnce(Result<Vec<F::Entity>>) + Send + 'static,
    {
        tracing::debug!(query, "Dispatching async query");
        let resolved = self.convert(query, observer).and_then(|(native, params)| {
            params.check_all_bound()?;
            native.resolve(&params)
        });
        tokio::spawn(async move {
            let result = match resolved {
                Ok(resolved) => resolved.run_async(manager.as_ref()).await,
                Err(err) => Err(err),
            };
            callback(result);
        })
    }

    /// Parse a query for later binding
    pub fn prepare(
        &self,
        query: &str,
        manager: Arc<dyn ConnectionManagerAsync<F>>,
        observer: &dyn ObserverParser,
    ) -> Result<PreparedStatementAsync<F>> {
        tracing::debug!(query, "Preparing async query");
        let (native, params) = self.convert(query, observer)?;
        let core = StatementCore::new(native, params, self.conversion.clone(), self.config.clone());
        Ok(PreparedStatementAsync::new(core, manager))
    }

    fn convert(&self, query: &str, observer: &dyn ObserverParser) -> Result<(NativeQuery<F>, Params)> {
        let statement = parse_statement(query)?;
        NativeQuery::convert(&statement, self.converter.as_ref(), observer)
    }
}

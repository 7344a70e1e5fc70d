//! Converted statements and their binding state

use std::collections::BTreeSet;
use std::sync::Arc;

use nql::Statement;

use crate::communication::{Insertion, Template};
use crate::config::{PipelineConfig, Reexecution};
use crate::error::{Error, Result};
use crate::family::{ConnectionManager, ConnectionManagerAsync, Family, QueryConverter};
use crate::observer::ObserverParser;
use crate::params::Params;
use crate::value::{Value, ValueConversion};

/// A native template of any statement kind
pub(crate) enum NativeQuery<F: Family> {
    Select(F::SelectTemplate),
    Delete(F::DeleteTemplate),
    Insert(Insertion<F::EntityTemplate>),
    Update(F::EntityTemplate),
}

/// A native query ready for the backend
pub(crate) enum Resolved<F: Family> {
    Select(F::Select),
    Delete(F::Delete),
    Insert(Insertion<F::Entity>),
    Update(F::Entity),
}

impl<F: Family> NativeQuery<F> {
    /// Convert a parsed statement through the family converter
    pub fn convert(
        statement: &Statement,
        converter: &dyn QueryConverter<F>,
        observer: &dyn ObserverParser,
    ) -> Result<(Self, Params)> {
        Ok(match statement {
            Statement::Select(q) => {
                let c = converter.convert_select(q, observer)?;
                (NativeQuery::Select(c.query), c.params)
            }
            Statement::Delete(q) => {
                let c = converter.convert_delete(q, observer)?;
                (NativeQuery::Delete(c.query), c.params)
            }
            Statement::Insert(q) => {
                let c = converter.convert_insert(q, observer)?;
                (NativeQuery::Insert(c.query), c.params)
            }
            Statement::Update(q) => {
                let c = converter.convert_update(q, observer)?;
                (NativeQuery::Update(c.query), c.params)
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NativeQuery::Select(_) => "select",
            NativeQuery::Delete(_) => "delete",
            NativeQuery::Insert(_) => "insert",
            NativeQuery::Update(_) => "update",
        }
    }

    pub fn resolve(&self, params: &Params) -> Result<Resolved<F>> {
        Ok(match self {
            NativeQuery::Select(t) => Resolved::Select(t.resolve(params)?),
            NativeQuery::Delete(t) => Resolved::Delete(t.resolve(params)?),
            NativeQuery::Insert(t) => Resolved::Insert(t.resolve(params)?),
            NativeQuery::Update(t) => Resolved::Update(t.resolve(params)?),
        })
    }
}

impl<F: Family> Resolved<F> {
    pub fn run(self, manager: &dyn ConnectionManager<F>) -> Result<Vec<F::Entity>> {
        let entities = match self {
            Resolved::Select(query) => manager.select(query),
            Resolved::Delete(query) => manager.delete(query).map(|_| vec![]),
            Resolved::Insert(Insertion { entity, ttl: Some(ttl) }) => {
                manager.insert_with_ttl(entity, ttl).map(|e| vec![e])
            }
            Resolved::Insert(Insertion { entity, ttl: None }) => {
                manager.insert(entity).map(|e| vec![e])
            }
            Resolved::Update(entity) => manager.update(entity).map(|e| vec![e]),
        };
        entities.map_err(Error::Backend)
    }

    pub async fn run_async(self, manager: &dyn ConnectionManagerAsync<F>) -> Result<Vec<F::Entity>> {
        let entities = match self {
            Resolved::Select(query) => manager.select(query).await,
            Resolved::Delete(query) => manager.delete(query).await.map(|_| vec![]),
            Resolved::Insert(Insertion { entity, ttl: Some(ttl) }) => {
                manager.insert_with_ttl(entity, ttl).await.map(|e| vec![e])
            }
            Resolved::Insert(Insertion { entity, ttl: None }) => {
                manager.insert(entity).await.map(|e| vec![e])
            }
            Resolved::Update(entity) => manager.update(entity).await.map(|e| vec![e]),
        };
        entities.map_err(Error::Backend)
    }
}

/// Binding state of a prepared statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementState {
    /// Converted, nothing bound yet
    Converted,
    PartiallyBound { bound: BTreeSet<String> },
    FullyBound,
    Executed,
}

impl StatementState {
    /// State after a successful bind
    pub fn bound(self, name: &str, params: &Params) -> Result<Self> {
        if self == StatementState::Executed {
            return Err(Error::AlreadyExecuted);
        }
        if params.is_fully_bound() {
            return Ok(StatementState::FullyBound);
        }
        let mut bound = match self {
            StatementState::PartiallyBound { bound } => bound,
            _ => BTreeSet::new(),
        };
        bound.insert(name.trim_start_matches('@').to_string());
        Ok(StatementState::PartiallyBound { bound })
    }

    /// State after execution is requested
    pub fn executed(&self, params: &Params, reexecution: Reexecution) -> Result<Self> {
        if *self == StatementState::Executed && reexecution == Reexecution::Forbid {
            return Err(Error::AlreadyExecuted);
        }
        params.check_all_bound()?;
        Ok(StatementState::Executed)
    }

    pub fn is_executed(&self) -> bool {
        *self == StatementState::Executed
    }
}

/// Template, params and state shared by the sync and async statements
pub(crate) struct StatementCore<F: Family> {
    query: NativeQuery<F>,
    params: Params,
    state: StatementState,
    conversion: Arc<dyn ValueConversion>,
    config: PipelineConfig,
}

impl<F: Family> StatementCore<F> {
    pub fn new(
        query: NativeQuery<F>,
        params: Params,
        conversion: Arc<dyn ValueConversion>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            query,
            params,
            state: StatementState::Converted,
            conversion,
            config,
        }
    }

    pub fn bind(&mut self, name: &str, value: Value) -> Result<()> {
        if self.state.is_executed() {
            return Err(Error::AlreadyExecuted);
        }
        let value = self.conversion.convert(value)?;
        if self.config.log_bound_values {
            tracing::trace!(parameter = name, value = ?value, "Binding parameter");
        }
        self.params.bind(name, value)?;
        let state = std::mem::replace(&mut self.state, StatementState::Converted);
        self.state = state.bound(name, &self.params)?;
        Ok(())
    }

    /// Resolve the template for a backend call. The state is left alone
    /// until [`Self::mark_executed`] records a successful call.
    pub fn resolve(&self) -> Result<Resolved<F>> {
        self.state.executed(&self.params, self.config.reexecution)?;
        if self.state.is_executed() {
            tracing::warn!(kind = self.query.kind(), "Re-executing prepared statement");
        }
        self.query.resolve(&self.params)
    }

    pub fn mark_executed(&mut self) {
        self.state = StatementState::Executed;
    }

    pub fn state(&self) -> &StatementState {
        &self.state
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Keep at most one result
pub(crate) fn single<E>(mut entities: Vec<E>) -> Result<Option<E>> {
    match entities.len() {
        0 => Ok(None),
        1 => Ok(entities.pop()),
        count => Err(Error::NonUniqueResult { count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Params {
        let mut params = Params::new();
        for name in names {
            params.register(name, None);
        }
        params
    }

    #[test]
    fn test_state_transitions() {
        let mut p = params(&["name", "age"]);
        p.bind("name", Value::from("Diana")).unwrap();
        let state = StatementState::Converted.bound("@name", &p).unwrap();
        assert_eq!(
            state,
            StatementState::PartiallyBound {
                bound: BTreeSet::from(["name".to_string()])
            }
        );

        p.bind("age", Value::Int(30)).unwrap();
        let state = state.bound("age", &p).unwrap();
        assert_eq!(state, StatementState::FullyBound);

        let state = state.executed(&p, Reexecution::Allow).unwrap();
        assert!(state.is_executed());
        assert!(matches!(state.clone().bound("age", &p), Err(Error::AlreadyExecuted)));
        assert!(state.executed(&p, Reexecution::Allow).is_ok());
        assert!(matches!(
            state.executed(&p, Reexecution::Forbid),
            Err(Error::AlreadyExecuted)
        ));
    }

    #[test]
    fn test_execute_requires_all_bound() {
        let p = params(&["name"]);
        let err = StatementState::Converted
            .executed(&p, Reexecution::Allow)
            .unwrap_err();
        assert!(matches!(err, Error::UnboundParameter { name } if name == "name"));
    }

    #[test]
    fn test_single() {
        assert_eq!(single::<i32>(vec![]).unwrap(), None);
        assert_eq!(single(vec![1]).unwrap(), Some(1));
        assert!(matches!(single(vec![1, 2]), Err(Error::NonUniqueResult { count: 2 })));
    }
}

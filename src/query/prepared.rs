//! Prepared statements with deferred binding

use super::statement::{single, StatementCore, StatementState};
use crate::error::Result;
use crate::family::{ConnectionManager, Family};
use crate::params::Params;
use crate::value::Value;

/// A converted query waiting for its parameters
pub struct PreparedStatement<'m, F: Family> {
    core: StatementCore<F>,
    manager: &'m dyn ConnectionManager<F>,
}

impl<'m, F: Family> std::fmt::Debug for PreparedStatement<'m, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement").finish_non_exhaustive()
    }
}

impl<'m, F: Family> PreparedStatement<'m, F> {
    pub(crate) fn new(core: StatementCore<F>, manager: &'m dyn ConnectionManager<F>) -> Self {
        Self { core, manager }
    }

    /// Bind a placeholder by name (`name`, `@name` or `?N`)
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.core.bind(name, value.into())?;
        Ok(self)
    }

    /// Execute and return every entity the backend produced
    pub fn get_result_list(&mut self) -> Result<Vec<F::Entity>> {
        let entities = self.core.resolve()?.run(self.manager)?;
        self.core.mark_executed();
        Ok(entities)
    }

    /// Execute and return the only result, if any
    pub fn get_single_result(&mut self) -> Result<Option<F::Entity>> {
        single(self.get_result_list()?)
    }

    pub fn state(&self) -> &StatementState {
        self.core.state()
    }

    pub fn params(&self) -> &Params {
        self.core.params()
    }
}

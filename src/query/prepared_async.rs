//! Prepared statements executed on the tokio runtime

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::statement::{single, StatementCore, StatementState};
use crate::error::Result;
use crate::family::{ConnectionManagerAsync, Family};
use crate::params::Params;
use crate::value::Value;

/// Async counterpart of [`PreparedStatement`](super::PreparedStatement)
pub struct PreparedStatementAsync<F: Family> {
    core: StatementCore<F>,
    manager: Arc<dyn ConnectionManagerAsync<F>>,
}

impl<F: Family> PreparedStatementAsync<F> {
    pub(crate) fn new(core: StatementCore<F>, manager: Arc<dyn ConnectionManagerAsync<F>>) -> Self {
        Self { core, manager }
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.core.bind(name, value.into())?;
        Ok(self)
    }

    pub async fn get_result_list(&mut self) -> Result<Vec<F::Entity>> {
        let resolved = self.core.resolve()?;
        let entities = resolved.run_async(self.manager.as_ref()).await?;
        self.core.mark_executed();
        Ok(entities)
    }

    pub async fn get_single_result(&mut self) -> Result<Option<F::Entity>> {
        single(self.get_result_list().await?)
    }

    /// Execute in the background; the callback runs once with the outcome
    pub fn execute_with<C>(mut self, callback: C) -> JoinHandle<()>
    where
        C: FnOnce(Result<Vec<F::Entity>>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self.get_result_list().await;
            callback(result);
        })
    }

    pub fn state(&self) -> &StatementState {
        self.core.state()
    }

    pub fn params(&self) -> &Params {
        self.core.params()
    }
}

//! Name translation between query text and storage

use crate::error::Result;

/// Maps entity and field names used in queries to the names the backend
/// stores. Implementations may reject names they do not know.
pub trait ObserverParser: Send + Sync {
    fn entity(&self, name: &str) -> Result<String>;

    fn field(&self, entity: &str, name: &str) -> Result<String>;
}

/// Uses every name as it is
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityObserver;

impl ObserverParser for IdentityObserver {
    fn entity(&self, name: &str) -> Result<String> {
        Ok(name.to_string())
    }

    fn field(&self, _entity: &str, name: &str) -> Result<String> {
        Ok(name.to_string())
    }
}

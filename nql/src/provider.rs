//! Cached query providers
//!
//! Each provider is a process-wide singleton holding the shared grammar.
//! Providers keep no per-call state, so one instance serves every thread.

use std::sync::OnceLock;

use crate::ast::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};
use crate::error::ParseError;
use crate::method;
use crate::parser;
use crate::token::Grammar;

/// Turns query text into one kind of AST
pub trait QueryProvider<Q>: Send + Sync {
    fn apply(&self, query: &str) -> Result<Q, ParseError>;
}

macro_rules! grammar_provider {
    ($(#[$doc:meta])* $name:ident, $query:ty, $parse:path) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            grammar: &'static Grammar,
        }

        impl $name {
            pub fn cached() -> &'static Self {
                static INSTANCE: OnceLock<$name> = OnceLock::new();
                INSTANCE.get_or_init(|| $name { grammar: Grammar::get() })
            }
        }

        impl QueryProvider<$query> for $name {
            fn apply(&self, query: &str) -> Result<$query, ParseError> {
                $parse(self.grammar, query)
            }
        }
    };
}

grammar_provider!(
    /// `select ... from ...`
    SelectQueryProvider,
    SelectQuery,
    parser::parse_select
);
grammar_provider!(
    /// `delete ... from ...`
    DeleteQueryProvider,
    DeleteQuery,
    parser::parse_delete
);
grammar_provider!(
    /// `insert Entity (...)`
    InsertQueryProvider,
    InsertQuery,
    parser::parse_insert
);
grammar_provider!(
    /// `update Entity (...)`
    UpdateQueryProvider,
    UpdateQuery,
    parser::parse_update
);

/// Builds select queries from `find`/`count`/`exists` method names
#[derive(Debug)]
pub struct SelectMethodProvider {
    _private: (),
}

impl SelectMethodProvider {
    pub fn cached() -> &'static Self {
        static INSTANCE: OnceLock<SelectMethodProvider> = OnceLock::new();
        INSTANCE.get_or_init(|| SelectMethodProvider { _private: () })
    }

    pub fn apply(&self, method: &str, entity: &str) -> Result<SelectQuery, ParseError> {
        method::select_from_method(method, entity)
    }
}

/// Builds delete queries from `delete` method names
#[derive(Debug)]
pub struct DeleteMethodProvider {
    _private: (),
}

impl DeleteMethodProvider {
    pub fn cached() -> &'static Self {
        static INSTANCE: OnceLock<DeleteMethodProvider> = OnceLock::new();
        INSTANCE.get_or_init(|| DeleteMethodProvider { _private: () })
    }

    pub fn apply(&self, method: &str, entity: &str) -> Result<DeleteQuery, ParseError> {
        method::delete_from_method(method, entity)
    }
}

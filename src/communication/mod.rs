//! Backend-facing query model shared by the families
//!
//! Native structures are generic over their value type. Templates use
//! [`Term`] and may still hold placeholders; resolving a template against
//! [`Params`] yields the same structure over [`Value`], which is the only
//! form a backend ever receives.

mod convert;
mod criteria;

pub(crate) use convert::TermBuilder;
pub use criteria::Criteria;

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

use crate::error::Result;
use crate::params::Params;
use crate::value::Value;

pub use nql::{Direction, Operator};

/// A template value: literal, placeholder or list of either
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Value(Value),
    Param(String),
    List(Vec<Term>),
}

impl Term {
    pub fn is_param(&self) -> bool {
        matches!(self, Term::Param(_))
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Value(value)
    }
}

/// A named value: a document, a column, a condition operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element<V = Value> {
    pub name: String,
    pub value: V,
}

impl<V> Element<V> {
    pub fn of(name: impl Into<String>, value: impl Into<V>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Element<Term> {
    pub fn resolve(&self, params: &Params) -> Result<Element> {
        Ok(Element {
            name: self.name.clone(),
            value: params.resolve(&self.value)?,
        })
    }
}

pub(crate) fn resolve_elements(elements: &[Element<Term>], params: &Params) -> Result<Vec<Element>> {
    elements.iter().map(|element| element.resolve(params)).collect()
}

/// Native sort on a storage field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub name: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Desc,
        }
    }
}

/// A native structure that still refers to parameters
pub trait Template: Clone + Debug + Send + Sync + 'static {
    /// The same structure with every placeholder replaced
    type Bound: Clone + Debug + Send + Sync + 'static;

    fn resolve(&self, params: &Params) -> Result<Self::Bound>;
}

/// Output of a converter: the native template and its parameter table
#[derive(Debug, Clone)]
pub struct QueryParams<Q> {
    pub query: Q,
    pub params: Params,
}

impl<Q> QueryParams<Q> {
    pub fn new(query: Q, params: Params) -> Self {
        Self { query, params }
    }

    pub fn map<R>(self, f: impl FnOnce(Q) -> R) -> QueryParams<R> {
        QueryParams {
            query: f(self.query),
            params: self.params,
        }
    }
}

/// An entity to insert, with an optional time to live
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion<E> {
    pub entity: E,
    pub ttl: Option<Duration>,
}

impl<E: Template> Template for Insertion<E> {
    type Bound = Insertion<E::Bound>;

    fn resolve(&self, params: &Params) -> Result<Self::Bound> {
        Ok(Insertion {
            entity: self.entity.resolve(params)?,
            ttl: self.ttl,
        })
    }
}

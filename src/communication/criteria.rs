//! Native condition trees

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::{Element, Operator, Term};
use crate::error::{Error, Result};
use crate::params::Params;
use crate::value::Value;

/// A backend-native condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criteria<V = Value> {
    Compare { operator: Operator, element: Element<V> },
    And(Vec<Criteria<V>>),
    Or(Vec<Criteria<V>>),
    Not(Box<Criteria<V>>),
}

impl<V> Criteria<V> {
    pub fn compare(operator: Operator, name: impl Into<String>, value: impl Into<V>) -> Self {
        Criteria::Compare {
            operator,
            element: Element::of(name, value),
        }
    }

    pub fn eq(name: impl Into<String>, value: impl Into<V>) -> Self {
        Self::compare(Operator::Equals, name, value)
    }

    pub fn gt(name: impl Into<String>, value: impl Into<V>) -> Self {
        Self::compare(Operator::GreaterThan, name, value)
    }

    pub fn lt(name: impl Into<String>, value: impl Into<V>) -> Self {
        Self::compare(Operator::LesserThan, name, value)
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Criteria<V>) -> Self {
        match (self, other) {
            (Criteria::And(mut left), Criteria::And(right)) => {
                left.extend(right);
                Criteria::And(left)
            }
            (Criteria::And(mut left), right) => {
                left.push(right);
                Criteria::And(left)
            }
            (left, right) => Criteria::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested `Or`s
    pub fn or(self, other: Criteria<V>) -> Self {
        match (self, other) {
            (Criteria::Or(mut left), Criteria::Or(right)) => {
                left.extend(right);
                Criteria::Or(left)
            }
            (Criteria::Or(mut left), right) => {
                left.push(right);
                Criteria::Or(left)
            }
            (left, right) => Criteria::Or(vec![left, right]),
        }
    }

    pub fn negate(self) -> Self {
        Criteria::Not(Box::new(self))
    }
}

impl Criteria<Term> {
    /// Bind every operand. IN operands become arrays; BETWEEN must
    /// resolve to exactly two values.
    pub fn resolve(&self, params: &Params) -> Result<Criteria> {
        match self {
            Criteria::Compare { operator, element } => {
                let mut value = params.resolve(&element.value)?;
                match operator {
                    Operator::In => value = Value::Array(value.into_array()),
                    Operator::Between => match &value {
                        Value::Array(bounds) if bounds.len() == 2 => {}
                        _ => {
                            return Err(Error::InvalidOperand {
                                field: element.name.clone(),
                                reason: "between expects exactly two values".to_string(),
                            })
                        }
                    },
                    _ => {}
                }
                Ok(Criteria::Compare {
                    operator: *operator,
                    element: Element {
                        name: element.name.clone(),
                        value,
                    },
                })
            }
            Criteria::And(items) => items
                .iter()
                .map(|c| c.resolve(params))
                .collect::<Result<Vec<_>>>()
                .map(Criteria::And),
            Criteria::Or(items) => items
                .iter()
                .map(|c| c.resolve(params))
                .collect::<Result<Vec<_>>>()
                .map(Criteria::Or),
            Criteria::Not(inner) => Ok(Criteria::Not(Box::new(inner.resolve(params)?))),
        }
    }
}

impl Criteria {
    /// Evaluate against a record, looking fields up by name.
    /// Missing fields compare as null.
    pub fn matches<'a>(&self, lookup: &impl Fn(&str) -> Option<&'a Value>) -> bool {
        match self {
            Criteria::Compare { operator, element } => {
                let actual = lookup(&element.name).unwrap_or(&Value::Null);
                compare(actual, *operator, &element.value)
            }
            Criteria::And(items) => items.iter().all(|c| c.matches(lookup)),
            Criteria::Or(items) => items.iter().any(|c| c.matches(lookup)),
            Criteria::Not(inner) => !inner.matches(lookup),
        }
    }
}

fn compare(actual: &Value, operator: Operator, expected: &Value) -> bool {
    let ordering = || actual.compare(expected);
    match operator {
        Operator::Equals => actual == expected || ordering() == Some(Ordering::Equal),
        Operator::GreaterThan => ordering() == Some(Ordering::Greater),
        Operator::GreaterEqualsThan => {
            matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
        }
        Operator::LesserThan => ordering() == Some(Ordering::Less),
        Operator::LesserEqualsThan => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        Operator::Like => expected
            .as_str()
            .map(|pattern| actual.matches_pattern(pattern))
            .unwrap_or(false),
        Operator::In => expected
            .as_array()
            .map(|items| items.iter().any(|item| compare(actual, Operator::Equals, item)))
            .unwrap_or(false),
        Operator::Between => match expected.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                compare(actual, Operator::GreaterEqualsThan, low)
                    && compare(actual, Operator::LesserEqualsThan, high)
            }
            _ => false,
        },
    }
}

//! AST to native template translation shared by the family converters

use nql::{Assignment, Operand, Where};

use super::{Criteria, Element, Sort, Term};
use crate::error::Result;
use crate::observer::ObserverParser;
use crate::params::Params;
use crate::value::Value;

/// Translates names through the observer and registers every
/// placeholder it meets exactly once
pub(crate) struct TermBuilder<'a> {
    entity: &'a str,
    observer: &'a dyn ObserverParser,
    params: Params,
}

impl<'a> TermBuilder<'a> {
    pub fn new(entity: &'a str, observer: &'a dyn ObserverParser) -> Self {
        Self {
            entity,
            observer,
            params: Params::new(),
        }
    }

    /// Storage name of the entity
    pub fn entity_name(&self) -> Result<String> {
        self.observer.entity(self.entity)
    }

    pub fn field(&self, name: &str) -> Result<String> {
        self.observer.field(self.entity, name)
    }

    pub fn fields(&self, names: &[String]) -> Result<Vec<String>> {
        names.iter().map(|name| self.field(name)).collect()
    }

    pub fn operand(&mut self, operand: &Operand, field: &str) -> Term {
        match operand {
            Operand::Literal(literal) => Term::Value(Value::from(literal)),
            Operand::Param(param) => self.params.register(&param.name(), Some(field)),
            Operand::List(items) => {
                Term::List(items.iter().map(|item| self.operand(item, field)).collect())
            }
        }
    }

    pub fn criteria(&mut self, condition: &Where) -> Result<Criteria<Term>> {
        Ok(match condition {
            Where::And(left, right) => self.criteria(left)?.and(self.criteria(right)?),
            Where::Or(left, right) => self.criteria(left)?.or(self.criteria(right)?),
            Where::Not(inner) => self.criteria(inner)?.negate(),
            Where::Condition(condition) => {
                let field = self.field(&condition.field)?;
                let value = self.operand(&condition.operand, &field);
                Criteria::compare(condition.operator, field, value)
            }
        })
    }

    pub fn condition(&mut self, condition: &Option<Where>) -> Result<Option<Criteria<Term>>> {
        condition.as_ref().map(|c| self.criteria(c)).transpose()
    }

    pub fn sorts(&self, sorts: &[nql::Sort]) -> Result<Vec<Sort>> {
        sorts
            .iter()
            .map(|sort| {
                Ok(Sort {
                    name: self.field(&sort.field)?,
                    direction: sort.direction,
                })
            })
            .collect()
    }

    pub fn assignments(&mut self, assignments: &[Assignment]) -> Result<Vec<Element<Term>>> {
        assignments
            .iter()
            .map(|assignment| {
                let field = self.field(&assignment.field)?;
                let value = self.operand(&assignment.value, &field);
                Ok(Element { name: field, value })
            })
            .collect()
    }

    pub fn finish(self) -> Params {
        self.params
    }
}

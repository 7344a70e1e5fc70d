//! Abstract Syntax Tree for NQL
//!
//! The same shapes are produced by the text grammar and by the
//! method-name builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A complete NQL statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectQuery),
    Delete(DeleteQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Entity (collection, column family) to read from
    pub entity: String,
    /// Projected fields (empty = all)
    pub fields: Vec<String>,
    /// Optional WHERE clause
    pub condition: Option<Where>,
    /// ORDER BY clauses
    pub sorts: Vec<Sort>,
    /// LIMIT clause, 0 = unbounded
    pub limit: u64,
    /// SKIP clause, 0 = none
    pub skip: u64,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteQuery {
    pub entity: String,
    /// Fields to remove; empty deletes the whole entity
    pub fields: Vec<String>,
    pub condition: Option<Where>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertQuery {
    pub entity: String,
    pub assignments: Vec<Assignment>,
    /// Time to live for the inserted entity
    pub ttl: Option<Duration>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuery {
    pub entity: String,
    pub assignments: Vec<Assignment>,
}

/// `field = value` inside insert/update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub field: String,
    pub value: Operand,
}

/// ORDER BY clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Condition tree of a WHERE clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Where {
    And(Box<Where>, Box<Where>),
    Or(Box<Where>, Box<Where>),
    Not(Box<Where>),
    Condition(Condition),
}

/// Leaf condition: `field operator operand`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub operand: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    GreaterThan,
    GreaterEqualsThan,
    LesserThan,
    LesserEqualsThan,
    Like,
    In,
    Between,
}

/// Right-hand side of a condition or assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Literal(Literal),
    Param(Param),
    /// `(a, b)` / `{a, b}` lists; BETWEEN always carries exactly two
    List(Vec<Operand>),
}

/// A placeholder waiting for a runtime value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    /// `@name`
    Named(String),
    /// `?` or `?N`, 1-based
    Positional(usize),
}

impl Param {
    /// Key of this placeholder in a params table: `name` or `?N`
    pub fn name(&self) -> String {
        match self {
            Param::Named(name) => name.clone(),
            Param::Positional(index) => format!("?{}", index),
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Literal>),
    Object(BTreeMap<String, Literal>),
}

impl From<serde_json::Value> for Literal {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Literal::Null,
            serde_json::Value::Bool(b) => Literal::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Literal::String(s),
            serde_json::Value::Array(items) => {
                Literal::Array(items.into_iter().map(Literal::from).collect())
            }
            serde_json::Value::Object(map) => Literal::Object(
                map.into_iter().map(|(k, v)| (k, Literal::from(v))).collect(),
            ),
        }
    }
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, operand: Operand) -> Self {
        Self {
            field: field.into(),
            operator,
            operand,
        }
    }
}

impl Where {
    pub fn condition(field: impl Into<String>, operator: Operator, operand: Operand) -> Self {
        Where::Condition(Condition::new(field, operator, operand))
    }

    pub fn and(self, other: Where) -> Self {
        Where::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Where) -> Self {
        Where::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Where::Not(Box::new(self))
    }

    /// Visit every leaf condition, left to right
    pub fn for_each_condition<'a>(&'a self, f: &mut impl FnMut(&'a Condition)) {
        match self {
            Where::And(left, right) | Where::Or(left, right) => {
                left.for_each_condition(f);
                right.for_each_condition(f);
            }
            Where::Not(inner) => inner.for_each_condition(f),
            Where::Condition(condition) => f(condition),
        }
    }
}

impl Operand {
    fn collect_params<'a>(&'a self, out: &mut Vec<&'a Param>) {
        match self {
            Operand::Literal(_) => {}
            Operand::Param(param) => out.push(param),
            Operand::List(items) => items.iter().for_each(|item| item.collect_params(out)),
        }
    }
}

fn where_params(condition: &Option<Where>) -> Vec<&Param> {
    let mut params = Vec::new();
    if let Some(condition) = condition {
        condition.for_each_condition(&mut |c| c.operand.collect_params(&mut params));
    }
    params
}

fn assignment_params(assignments: &[Assignment]) -> Vec<&Param> {
    let mut params = Vec::new();
    for assignment in assignments {
        assignment.value.collect_params(&mut params);
    }
    params
}

impl SelectQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: vec![],
            condition: None,
            sorts: vec![],
            limit: 0,
            skip: 0,
        }
    }

    /// Placeholders in order of appearance, duplicates included
    pub fn params(&self) -> Vec<&Param> {
        where_params(&self.condition)
    }
}

impl DeleteQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: vec![],
            condition: None,
        }
    }

    pub fn params(&self) -> Vec<&Param> {
        where_params(&self.condition)
    }
}

impl InsertQuery {
    pub fn params(&self) -> Vec<&Param> {
        assignment_params(&self.assignments)
    }
}

impl UpdateQuery {
    pub fn params(&self) -> Vec<&Param> {
        assignment_params(&self.assignments)
    }
}

impl Statement {
    pub fn entity(&self) -> &str {
        match self {
            Statement::Select(q) => &q.entity,
            Statement::Delete(q) => &q.entity,
            Statement::Insert(q) => &q.entity,
            Statement::Update(q) => &q.entity,
        }
    }

    /// Distinct placeholder keys, in order of first appearance
    pub fn param_names(&self) -> Vec<String> {
        let params = match self {
            Statement::Select(q) => q.params(),
            Statement::Delete(q) => q.params(),
            Statement::Insert(q) => q.params(),
            Statement::Update(q) => q.params(),
        };
        let mut names: Vec<String> = Vec::with_capacity(params.len());
        for param in params {
            let name = param.name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_names() {
        assert_eq!(Param::Named("name".into()).name(), "name");
        assert_eq!(Param::Positional(2).name(), "?2");
    }

    #[test]
    fn test_literal_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"age": 30, "score": 1.5, "tags": ["a"]}"#).unwrap();
        let Literal::Object(map) = Literal::from(json) else {
            panic!("Expected Object");
        };
        assert_eq!(map["age"], Literal::Int(30));
        assert_eq!(map["score"], Literal::Float(1.5));
        assert_eq!(map["tags"], Literal::Array(vec![Literal::String("a".into())]));
    }

    #[test]
    fn test_distinct_param_names() {
        let mut query = SelectQuery::new("God");
        let by_name = |n: &str| Operand::Param(Param::Named(n.into()));
        query.condition = Some(
            Where::condition("name", Operator::Equals, by_name("name"))
                .or(Where::condition("alias", Operator::Equals, by_name("name")))
                .and(Where::condition("age", Operator::GreaterThan, Operand::Param(Param::Positional(1)))),
        );
        let names = Statement::Select(query).param_names();
        assert_eq!(names, vec!["name".to_string(), "?1".to_string()]);
    }
}

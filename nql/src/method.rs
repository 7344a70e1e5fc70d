//! Method-name query builder
//!
//! Derives the same AST the grammar produces from repository method names
//! such as `findByNameAndAgeGreaterThanOrderByNameDesc`. Every condition
//! consumes positional placeholders left to right.

use regex::Regex;
use std::sync::OnceLock;

use crate::ast::*;
use crate::error::ParseError;

/// What a derived method does with the matching entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Find,
    Count,
    Exists,
    Delete,
}

const VERBS: &[(&str, MethodKind)] = &[
    ("find", MethodKind::Find),
    ("count", MethodKind::Count),
    ("exists", MethodKind::Exists),
    ("delete", MethodKind::Delete),
];

impl MethodKind {
    /// Classify a method name by its verb (`findBy`, `countAll`, ...)
    pub fn detect(method: &str) -> Option<Self> {
        split_prefix(method).map(|(kind, _)| kind)
    }

    pub fn is_select(self) -> bool {
        !matches!(self, MethodKind::Delete)
    }
}

/// Build a select query from a method name
pub fn select_from_method(method: &str, entity: &str) -> Result<SelectQuery, ParseError> {
    let parts = MethodParts::parse(method)?;
    if !parts.kind.is_select() {
        return Err(ParseError::unrecognized_method(method, "not a select method"));
    }
    let mut query = SelectQuery::new(entity);
    query.condition = parts.condition;
    query.sorts = parts.sorts;
    Ok(query)
}

/// Build a delete query from a method name
pub fn delete_from_method(method: &str, entity: &str) -> Result<DeleteQuery, ParseError> {
    let parts = MethodParts::parse(method)?;
    if parts.kind != MethodKind::Delete {
        return Err(ParseError::unrecognized_method(method, "not a delete method"));
    }
    if !parts.sorts.is_empty() {
        return Err(ParseError::unrecognized_method(method, "delete methods cannot sort"));
    }
    let mut query = DeleteQuery::new(entity);
    query.condition = parts.condition;
    Ok(query)
}

struct MethodParts {
    kind: MethodKind,
    condition: Option<Where>,
    sorts: Vec<Sort>,
}

impl MethodParts {
    fn parse(method: &str) -> Result<Self, ParseError> {
        let fail = |reason: &str| ParseError::unrecognized_method(method, reason);

        let (kind, rest) = split_prefix(method).ok_or_else(|| fail("unknown prefix"))?;
        let (requires_condition, rest) = if let Some(rest) = rest.strip_prefix("By") {
            (true, rest)
        } else if let Some(rest) = rest.strip_prefix("All") {
            match rest.strip_prefix("By") {
                Some(rest) if !rest.starts_with("OrderBy") => (true, rest),
                Some(rest) => (false, rest),
                None => (false, rest),
            }
        } else {
            return Err(fail("expected 'By' or 'All' after the verb"));
        };

        let words = split_words(rest).ok_or_else(|| fail("unexpected character"))?;
        let order_at = words
            .windows(2)
            .position(|pair| pair[0] == "Order" && pair[1] == "By");
        let (condition_words, sort_words) = match order_at {
            Some(at) => (&words[..at], Some(&words[at + 2..])),
            None => (&words[..], None),
        };

        let condition = if condition_words.is_empty() {
            if requires_condition {
                return Err(fail("empty condition"));
            }
            None
        } else {
            let mut positional = 0;
            Some(conditions(condition_words, &mut positional).map_err(|reason| fail(reason))?)
        };

        let sorts = match sort_words {
            Some(words) => sorts(words).map_err(|reason| fail(reason))?,
            None => vec![],
        };

        Ok(Self { kind, condition, sorts })
    }
}

fn split_prefix(method: &str) -> Option<(MethodKind, &str)> {
    VERBS.iter().find_map(|(verb, kind)| {
        method
            .strip_prefix(verb)
            .filter(|rest| rest.starts_with("By") || rest.starts_with("All"))
            .map(|rest| (*kind, rest))
    })
}

/// Camel-case words plus `_` separators; `None` when something is left over
fn split_words(text: &str) -> Option<Vec<&str>> {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    let re = WORDS.get_or_init(|| Regex::new(r"[A-Z][a-z0-9]*|_").unwrap());

    let words: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
    let covered: usize = words.iter().map(|w| w.len()).sum();
    (covered == text.len()).then_some(words)
}

// ============================================================================
// Conditions
// ============================================================================

fn conditions(words: &[&str], positional: &mut usize) -> Result<Where, &'static str> {
    let mut or_expr: Option<Where> = None;
    for group in words.split(|w| *w == "Or") {
        let mut and_expr: Option<Where> = None;
        for part in group.split(|w| *w == "And") {
            if part.is_empty() {
                return Err("dangling 'And' or 'Or'");
            }
            let next = condition(part, positional)?;
            and_expr = Some(match and_expr {
                Some(left) => left.and(next),
                None => next,
            });
        }
        let group = and_expr.ok_or("dangling 'And' or 'Or'")?;
        or_expr = Some(match or_expr {
            Some(left) => left.or(group),
            None => group,
        });
    }
    or_expr.ok_or("empty condition")
}

const SUFFIXES: &[(&[&str], Operator)] = &[
    (&["Greater", "Than", "Equal"], Operator::GreaterEqualsThan),
    (&["Greater", "Than"], Operator::GreaterThan),
    (&["Less", "Than", "Equal"], Operator::LesserEqualsThan),
    (&["Less", "Than"], Operator::LesserThan),
    (&["Between"], Operator::Between),
    (&["Like"], Operator::Like),
    (&["In"], Operator::In),
    (&["Equals"], Operator::Equals),
];

fn condition(words: &[&str], positional: &mut usize) -> Result<Where, &'static str> {
    let (mut words, operator) = SUFFIXES
        .iter()
        .find(|(suffix, _)| words.ends_with(suffix))
        .map(|(suffix, operator)| (&words[..words.len() - suffix.len()], *operator))
        .unwrap_or((words, Operator::Equals));

    let negated = words.last() == Some(&"Not");
    if negated {
        words = &words[..words.len() - 1];
    }
    if words.is_empty() {
        return Err("operator without a field");
    }

    let mut next = || {
        *positional += 1;
        Operand::Param(Param::Positional(*positional))
    };
    let operand = match operator {
        Operator::Between => {
            let low = next();
            Operand::List(vec![low, next()])
        }
        _ => next(),
    };

    let condition = Where::condition(field_path(words)?, operator, operand);
    Ok(if negated { condition.negate() } else { condition })
}

/// `["Address", "_", "City"]` becomes `address.city`
fn field_path(words: &[&str]) -> Result<String, &'static str> {
    let segments: Vec<String> = words
        .split(|w| *w == "_")
        .map(|segment| {
            let joined = segment.concat();
            let mut chars = joined.chars();
            match chars.next() {
                Some(first) => Ok(first.to_lowercase().chain(chars).collect()),
                None => Err("empty field segment"),
            }
        })
        .collect::<Result<_, _>>()?;
    Ok(segments.join("."))
}

// ============================================================================
// Sorts
// ============================================================================

fn sorts(words: &[&str]) -> Result<Vec<Sort>, &'static str> {
    let mut sorts = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for word in words {
        let direction = match *word {
            "Asc" => Some(Direction::Asc),
            "Desc" => Some(Direction::Desc),
            "And" => {
                if !pending.is_empty() {
                    sorts.push(Sort { field: field_path(&pending)?, direction: Direction::Asc });
                    pending.clear();
                }
                continue;
            }
            other => {
                pending.push(other);
                None
            }
        };
        if let Some(direction) = direction {
            if pending.is_empty() {
                return Err("sort direction without a field");
            }
            sorts.push(Sort { field: field_path(&pending)?, direction });
            pending.clear();
        }
    }
    if !pending.is_empty() {
        sorts.push(Sort { field: field_path(&pending)?, direction: Direction::Asc });
    }
    if sorts.is_empty() {
        return Err("empty sort section");
    }
    Ok(sorts)
}

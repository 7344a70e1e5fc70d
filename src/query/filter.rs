//! In-memory evaluation of resolved queries
//!
//! Applies a native condition, sorts, paging and projection to entities
//! held in memory. Useful for caches and test backends.

use std::cmp::Ordering;

use crate::column::{ColumnEntity, ColumnQuery};
use crate::communication::{Criteria, Direction, Sort};
use crate::document::{DocumentEntity, DocumentQuery};
use crate::value::Value;

/// Anything with named fields
pub trait Record: Clone {
    fn field(&self, name: &str) -> Option<&Value>;

    /// Keep only the named fields
    fn project(&self, names: &[String]) -> Self;
}

impl Record for DocumentEntity {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn project(&self, names: &[String]) -> Self {
        let mut projected = self.clone();
        projected.documents.retain(|d| names.contains(&d.name));
        projected
    }
}

impl Record for ColumnEntity {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn project(&self, names: &[String]) -> Self {
        let mut projected = self.clone();
        projected.columns.retain(|c| names.contains(&c.name));
        projected
    }
}

/// Evaluate a condition against a record
pub fn evaluate<R: Record>(criteria: &Criteria, record: &R) -> bool {
    criteria.matches(&|name: &str| record.field(name))
}

/// Filter, sort, page and project records
pub fn apply<R: Record>(
    records: &[R],
    condition: Option<&Criteria>,
    sorts: &[Sort],
    skip: u64,
    limit: u64,
    fields: &[String],
) -> Vec<R> {
    let mut selected: Vec<&R> = records
        .iter()
        .filter(|record| condition.map(|c| evaluate(c, *record)).unwrap_or(true))
        .collect();

    if !sorts.is_empty() {
        selected.sort_by(|a, b| compare_records(*a, *b, sorts));
    }

    let take = if limit == 0 { usize::MAX } else { limit as usize };
    selected
        .into_iter()
        .skip(skip as usize)
        .take(take)
        .map(|record| {
            if fields.is_empty() {
                record.clone()
            } else {
                record.project(fields)
            }
        })
        .collect()
}

/// Run a document query over an in-memory collection
pub fn select_documents(entities: &[DocumentEntity], query: &DocumentQuery) -> Vec<DocumentEntity> {
    let matching: Vec<DocumentEntity> = entities
        .iter()
        .filter(|e| e.name == query.collection)
        .cloned()
        .collect();
    apply(
        &matching,
        query.condition.as_ref(),
        &query.sorts,
        query.skip,
        query.limit,
        &query.documents,
    )
}

/// Run a column query over in-memory rows
pub fn select_columns(entities: &[ColumnEntity], query: &ColumnQuery) -> Vec<ColumnEntity> {
    let matching: Vec<ColumnEntity> = entities
        .iter()
        .filter(|e| e.name == query.column_family)
        .cloned()
        .collect();
    apply(
        &matching,
        query.condition.as_ref(),
        &query.sorts,
        query.skip,
        query.limit,
        &query.columns,
    )
}

fn compare_records<R: Record>(a: &R, b: &R, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let left = a.field(&sort.name).unwrap_or(&Value::Null);
        let right = b.field(&sort.name).unwrap_or(&Value::Null);
        let ordering = left.compare(right).unwrap_or(Ordering::Equal);
        let ordering = match sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gods() -> Vec<DocumentEntity> {
        vec![
            DocumentEntity::new("God").with("name", "Diana").with("age", 30i64),
            DocumentEntity::new("God").with("name", "Zeus").with("age", 90i64),
            DocumentEntity::new("God").with("name", "Apollo").with("age", 25i64),
            DocumentEntity::new("Hero").with("name", "Hercules").with("age", 40i64),
        ]
    }

    fn query() -> DocumentQuery {
        DocumentQuery {
            collection: "God".into(),
            documents: vec![],
            condition: None,
            sorts: vec![],
            limit: 0,
            skip: 0,
        }
    }

    #[test]
    fn test_select_by_collection() {
        assert_eq!(select_documents(&gods(), &query()).len(), 3);
    }

    #[test]
    fn test_condition_and_sort() {
        let mut q = query();
        q.condition = Some(Criteria::gt("age", 26i64));
        q.sorts = vec![Sort::desc("age")];
        let result = select_documents(&gods(), &q);
        let names: Vec<_> = result.iter().filter_map(|e| e.get("name")).collect();
        assert_eq!(names, vec![&Value::from("Zeus"), &Value::from("Diana")]);
    }

    #[test]
    fn test_skip_limit_projection() {
        let mut q = query();
        q.sorts = vec![Sort::asc("name")];
        q.skip = 1;
        q.limit = 1;
        q.documents = vec!["name".into()];
        let result = select_documents(&gods(), &q);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("name"), Some(&Value::from("Diana")));
        assert_eq!(result[0].get("age"), None);
    }

    #[test]
    fn test_select_columns() {
        let rows = vec![ColumnEntity::new("God").with("name", "Diana")];
        let q = ColumnQuery {
            column_family: "God".into(),
            columns: vec![],
            condition: Some(Criteria::eq("name", "Diana")),
            sorts: vec![],
            limit: 0,
            skip: 0,
        };
        assert_eq!(select_columns(&rows, &q).len(), 1);
    }
}

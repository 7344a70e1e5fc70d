//! Parameter slots of a converted query
//!
//! The converter fixes the set of names; binding only fills in values.
//! Named placeholders are keyed by their bare name (`@name` is accepted
//! and stripped), positional ones by `?N`.

use crate::communication::Term;
use crate::error::{Error, Result};
use crate::value::Value;

/// One placeholder of a query
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    /// Storage field the placeholder is compared to or assigned to
    pub field: Option<String>,
    pub value: Option<Value>,
}

impl Slot {
    /// 1-based index of a `?N` slot
    pub fn position(&self) -> Option<usize> {
        self.name.strip_prefix('?').and_then(|n| n.parse().ok())
    }
}

/// Ordered table of placeholders and their bound values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    slots: Vec<Slot>,
}

fn key(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a placeholder and return the term that refers to it.
    /// Registering the same name twice yields the same slot.
    pub fn register(&mut self, name: &str, field: Option<&str>) -> Term {
        let name = key(name);
        if !self.slots.iter().any(|slot| slot.name == name) {
            self.slots.push(Slot {
                name: name.to_string(),
                field: field.map(str::to_string),
                value: None,
            });
        }
        Term::Param(name.to_string())
    }

    /// Set the value of a placeholder; the last write wins
    pub fn bind(&mut self, name: &str, value: Value) -> Result<()> {
        let name = key(name);
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .ok_or_else(|| Error::UnknownParameter {
                name: name.to_string(),
            })?;
        slot.value = Some(value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = key(name);
        self.slots.iter().any(|slot| slot.name == name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = key(name);
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn unbound(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| slot.value.is_none())
            .map(|slot| slot.name.as_str())
            .collect()
    }

    pub fn is_fully_bound(&self) -> bool {
        self.slots.iter().all(|slot| slot.value.is_some())
    }

    /// Fail on the first placeholder without a value
    pub fn check_all_bound(&self) -> Result<()> {
        match self.slots.iter().find(|slot| slot.value.is_none()) {
            Some(slot) => Err(Error::UnboundParameter {
                name: slot.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// `?N` slots ordered by their index
    pub fn positional(&self) -> Vec<(usize, &Slot)> {
        let mut positional: Vec<(usize, &Slot)> = self
            .slots
            .iter()
            .filter_map(|slot| slot.position().map(|index| (index, slot)))
            .collect();
        positional.sort_by_key(|(index, _)| *index);
        positional
    }

    /// Slots that are not positional, in registration order
    pub fn named(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|slot| slot.position().is_none())
    }

    /// Replace the placeholders of a term with their bound values
    pub fn resolve(&self, term: &Term) -> Result<Value> {
        match term {
            Term::Value(value) => Ok(value.clone()),
            Term::Param(name) => self.get(name).cloned().ok_or_else(|| Error::UnboundParameter {
                name: name.clone(),
            }),
            Term::List(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

//! Key-value entities
//!
//! Key-value stores keep a whole entity under one key. The key is the
//! value of the entity's id field; the stored value is the entity in its
//! storage form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::family::Category;
use crate::mapping::{Converters, EntityMapping, FieldMapping};
use crate::value::Value;

/// An entry of a key-value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueEntity {
    pub key: Value,
    pub value: Value,
}

impl KeyValueEntity {
    pub fn new(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Converts mapped entities to and from key-value entries
pub struct KeyValueEntityConverter<'a> {
    mapping: &'a EntityMapping,
    converters: &'a Converters,
}

impl<'a> KeyValueEntityConverter<'a> {
    pub const CATEGORY: Category = Category::KeyValue;

    pub fn new(mapping: &'a EntityMapping, converters: &'a Converters) -> Self {
        Self {
            mapping,
            converters,
        }
    }

    /// Key the entity by its id field
    pub fn to_key_value(&self, attributes: BTreeMap<String, Value>) -> Result<KeyValueEntity> {
        let id = self.mapping.id()?;
        let key = match attributes.get(&id.name) {
            Some(key) if !key.is_null() => key.clone(),
            _ => {
                return Err(Error::conversion(format!(
                    "the key field '{}' of '{}' is required",
                    id.name, self.mapping.name
                )))
            }
        };
        let key = match &id.converter {
            Some(converter) => self.converters.get(converter)?.to_storage(key)?,
            None => key,
        };
        let stored = self.mapping.to_storage(attributes, self.converters)?;
        Ok(KeyValueEntity {
            key,
            value: Value::Object(stored),
        })
    }

    /// Entity attributes of an entry; `None` when the stored value is null
    pub fn from_key_value(&self, entity: KeyValueEntity) -> Result<Option<BTreeMap<String, Value>>> {
        let id = self.mapping.id()?;
        let stored = match entity.value {
            Value::Null => return Ok(None),
            Value::Object(stored) => stored,
            other => {
                return Err(Error::conversion(format!(
                    "cannot read {} value as entity '{}'",
                    other.kind(),
                    self.mapping.name
                )))
            }
        };
        let mut attributes = self.mapping.to_entity(stored, self.converters)?;
        attributes.insert(id.name.clone(), self.key(id, entity.key)?);
        Ok(Some(attributes))
    }

    fn key(&self, id: &FieldMapping, key: Value) -> Result<Value> {
        match &id.converter {
            Some(converter) => self.converters.get(converter)?.to_entity(key),
            None => Ok(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::AttributeConverter;
    use std::sync::Arc;

    /// Stores numeric ids as prefixed strings
    struct PrefixedId;

    impl AttributeConverter for PrefixedId {
        fn to_storage(&self, value: Value) -> Result<Value> {
            Ok(Value::String(format!("god:{}", value.get::<i64>()?)))
        }

        fn to_entity(&self, value: Value) -> Result<Value> {
            let text: String = value.get()?;
            let id = text
                .strip_prefix("god:")
                .ok_or_else(|| Error::conversion("missing key prefix"))?;
            Ok(Value::Int(Value::from(id).get::<i64>()?))
        }
    }

    fn mapping() -> EntityMapping {
        EntityMapping::new("God")
            .with_field(FieldMapping::id("id").stored_as("_id"))
            .with_field(FieldMapping::new("name"))
    }

    fn god() -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("id".to_string(), Value::Int(7)),
            ("name".to_string(), Value::from("Diana")),
        ])
    }

    #[test]
    fn test_keyed_by_id() {
        let mapping = mapping();
        let converters = Converters::new();
        let converter = KeyValueEntityConverter::new(&mapping, &converters);
        let entry = converter.to_key_value(god()).unwrap();
        assert_eq!(entry.key, Value::Int(7));
        let Value::Object(stored) = &entry.value else {
            panic!("expected an object");
        };
        assert_eq!(stored.get("_id"), Some(&Value::Int(7)));
        assert_eq!(converter.from_key_value(entry).unwrap(), Some(god()));
        assert_eq!(KeyValueEntityConverter::CATEGORY, Category::KeyValue);
    }

    #[test]
    fn test_id_field_required() {
        let mapping = EntityMapping::new("Hero").with_field(FieldMapping::new("name"));
        let converters = Converters::new();
        let converter = KeyValueEntityConverter::new(&mapping, &converters);
        let err = converter.to_key_value(god()).unwrap_err();
        assert!(matches!(err, Error::IdNotFound { entity } if entity == "Hero"));

        let entry = KeyValueEntity::new("Hercules", Value::Object(BTreeMap::new()));
        assert!(matches!(
            converter.from_key_value(entry),
            Err(Error::IdNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_key_value() {
        let mapping = mapping();
        let converters = Converters::new();
        let converter = KeyValueEntityConverter::new(&mapping, &converters);
        let mut attributes = god();
        attributes.insert("id".to_string(), Value::Null);
        let err = converter.to_key_value(attributes).unwrap_err();
        assert!(err.is_mapping_error());
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_null_value_reads_as_none() {
        let mapping = mapping();
        let converters = Converters::new();
        let converter = KeyValueEntityConverter::new(&mapping, &converters);
        let entry = KeyValueEntity::new(7i64, Value::Null);
        assert_eq!(converter.from_key_value(entry).unwrap(), None);
        assert!(converter
            .from_key_value(KeyValueEntity::new(7i64, "Diana"))
            .is_err());
    }

    #[test]
    fn test_key_converter() {
        let mapping = EntityMapping::new("God")
            .with_field(FieldMapping::id("id").with_converter("prefixed"))
            .with_field(FieldMapping::new("name"));
        let mut converters = Converters::new();
        converters.register("prefixed", Arc::new(PrefixedId));
        let converter = KeyValueEntityConverter::new(&mapping, &converters);
        let entry = converter.to_key_value(god()).unwrap();
        assert_eq!(entry.key, Value::from("god:7"));
        assert_eq!(converter.from_key_value(entry).unwrap(), Some(god()));
    }
}

//! Entity mapping metadata
//!
//! Describes how an entity and its fields are named in storage, which
//! field is the id and which attribute converter a field uses. Mappings
//! can be declared in YAML:
//!
//! ```yaml
//! name: God
//! storage_name: gods
//! fields:
//!   - name: id
//!     id: true
//!   - name: name
//!     storage_name: god_name
//!   - name: power
//!     converter: cents
//! ```

mod converter;

pub use converter::{AttributeConverter, Converters};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::observer::ObserverParser;
use crate::value::Value;

/// Mapping of one entity field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Attribute name used in queries and method names
    pub name: String,
    #[serde(default)]
    pub storage_name: Option<String>,
    #[serde(default)]
    pub id: bool,
    /// Name of the attribute converter in [`Converters`]
    #[serde(default)]
    pub converter: Option<String>,
}

impl FieldMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            id: false,
            converter: None,
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self {
            id: true,
            ..Self::new(name)
        }
    }

    pub fn stored_as(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    pub fn storage_name(&self) -> &str {
        self.storage_name.as_deref().unwrap_or(&self.name)
    }
}

/// Mapping of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub name: String,
    #[serde(default)]
    pub storage_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

impl EntityMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            fields: vec![],
        }
    }

    pub fn stored_as(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn storage_name(&self) -> &str {
        self.storage_name.as_deref().unwrap_or(&self.name)
    }

    /// The id field
    pub fn id(&self) -> Result<&FieldMapping> {
        self.fields
            .iter()
            .find(|f| f.id)
            .ok_or_else(|| Error::IdNotFound {
                entity: self.name.clone(),
            })
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_by_storage(&self, storage_name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.storage_name() == storage_name)
    }

    /// Storage name of an attribute; `address.city` maps its first segment
    fn storage_field(&self, name: &str) -> Result<String> {
        if let Some(field) = self.find_field(name) {
            return Ok(field.storage_name().to_string());
        }
        let unknown = || Error::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        };
        let (head, rest) = name.split_once('.').ok_or_else(unknown)?;
        let field = self.find_field(head).ok_or_else(unknown)?;
        Ok(format!("{}.{}", field.storage_name(), rest))
    }

    /// Entity attributes to storage fields, applying attribute converters
    pub fn to_storage(
        &self,
        attributes: BTreeMap<String, Value>,
        converters: &Converters,
    ) -> Result<BTreeMap<String, Value>> {
        attributes
            .into_iter()
            .map(|(name, value)| {
                let field = self.find_field(&name).ok_or_else(|| Error::UnknownField {
                    entity: self.name.clone(),
                    field: name.clone(),
                })?;
                let value = match &field.converter {
                    Some(converter) => converters.get(converter)?.to_storage_each(value)?,
                    None => value,
                };
                Ok((field.storage_name().to_string(), value))
            })
            .collect()
    }

    /// Storage fields back to entity attributes; unmapped fields are dropped
    pub fn to_entity(
        &self,
        stored: BTreeMap<String, Value>,
        converters: &Converters,
    ) -> Result<BTreeMap<String, Value>> {
        let mut attributes = BTreeMap::new();
        for (storage_name, value) in stored {
            let Some(field) = self.find_by_storage(&storage_name) else {
                continue;
            };
            let value = match &field.converter {
                Some(converter) => converters.get(converter)?.to_entity(value)?,
                None => value,
            };
            attributes.insert(field.name.clone(), value);
        }
        Ok(attributes)
    }
}

impl ObserverParser for EntityMapping {
    fn entity(&self, name: &str) -> Result<String> {
        if name == self.name || name == self.storage_name() {
            Ok(self.storage_name().to_string())
        } else {
            Err(Error::UnknownEntity {
                entity: name.to_string(),
            })
        }
    }

    fn field(&self, _entity: &str, name: &str) -> Result<String> {
        self.storage_field(name)
    }
}

/// Every mapped entity of an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mappings {
    pub entities: Vec<EntityMapping>,
}

impl Mappings {
    pub fn new(entities: Vec<EntityMapping>) -> Self {
        Self { entities }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn get(&self, name: &str) -> Result<&EntityMapping> {
        self.entities
            .iter()
            .find(|e| e.name == name || e.storage_name() == name)
            .ok_or_else(|| Error::UnknownEntity {
                entity: name.to_string(),
            })
    }
}

impl ObserverParser for Mappings {
    fn entity(&self, name: &str) -> Result<String> {
        self.get(name)?.entity(name)
    }

    fn field(&self, entity: &str, name: &str) -> Result<String> {
        self.get(entity)?.field(entity, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOD: &str = r#"
name: God
storage_name: gods
fields:
  - name: id
    id: true
  - name: name
    storage_name: god_name
  - name: address
"#;

    #[test]
    fn test_load_from_yaml() {
        let mapping = EntityMapping::from_yaml_str(GOD).unwrap();
        assert_eq!(mapping.storage_name(), "gods");
        assert_eq!(mapping.id().unwrap().name, "id");
        assert_eq!(mapping.fields[1].storage_name(), "god_name");
        assert!(mapping.fields[2].converter.is_none());
    }

    #[test]
    fn test_observer_translation() {
        let mapping = EntityMapping::from_yaml_str(GOD).unwrap();
        assert_eq!(mapping.entity("God").unwrap(), "gods");
        assert_eq!(mapping.field("God", "name").unwrap(), "god_name");
        assert_eq!(mapping.field("God", "address.city").unwrap(), "address.city");
        assert!(matches!(
            mapping.field("God", "power"),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(mapping.entity("Hero"), Err(Error::UnknownEntity { .. })));
    }

    #[test]
    fn test_id_not_found() {
        let mapping = EntityMapping::new("Hero").with_field(FieldMapping::new("name"));
        let err = mapping.id().unwrap_err();
        assert!(err.is_mapping_error());
        assert_eq!(err.to_string(), "Entity 'Hero' does not declare an id field");
    }

    #[test]
    fn test_storage_round_trip_names() {
        let mapping = EntityMapping::from_yaml_str(GOD).unwrap();
        let converters = Converters::new();
        let attributes = BTreeMap::from([("name".to_string(), Value::from("Diana"))]);
        let stored = mapping.to_storage(attributes.clone(), &converters).unwrap();
        assert!(stored.contains_key("god_name"));
        assert_eq!(mapping.to_entity(stored, &converters).unwrap(), attributes);
    }

    #[test]
    fn test_mappings_lookup() {
        let mappings = Mappings::new(vec![EntityMapping::from_yaml_str(GOD).unwrap()]);
        assert_eq!(mappings.field("God", "name").unwrap(), "god_name");
        assert!(mappings.entity("Hero").is_err());
    }
}

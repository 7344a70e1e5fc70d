//! Binding repository method arguments to query parameters
//!
//! Positional placeholders (`?1..?n`) take the value arguments in order.
//! Named placeholders take the argument whose declared parameter has the
//! same name. Sort and pagination arguments never bind; they are merged
//! into the query instead.

use crate::error::{Error, Result};
use crate::mapping::{Converters, EntityMapping};
use crate::params::Params;
use crate::value::Value;

/// Page request, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub size: u64,
}

impl Pagination {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

/// One argument of a repository method call
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    Sort(nql::Sort),
    Pagination(Pagination),
}

macro_rules! value_argument {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::Value(value.into())
                }
            }
        )*
    };
}

value_argument!(Value, &str, String, i64, i32, f64, bool, Vec<&str>, Vec<String>, Vec<i64>, Vec<Value>);

/// A declared value parameter of a repository method
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodParameter {
    pub name: Option<String>,
    /// Attribute converter applied before binding
    pub converter: Option<String>,
}

impl MethodParameter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            converter: None,
        }
    }

    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }
}

/// Name and value parameters of a repository method.
/// `parameters` lines up with the value arguments, special arguments excluded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Vec<MethodParameter>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: vec![],
        }
    }

    pub fn param(mut self, parameter: MethodParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Sort and pagination arguments found in a call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialArguments {
    pub sorts: Vec<nql::Sort>,
    pub pagination: Option<Pagination>,
}

impl SpecialArguments {
    pub fn scan(args: &[Argument]) -> Self {
        let mut special = Self::default();
        for arg in args {
            match arg {
                Argument::Sort(sort) => special.sorts.push(sort.clone()),
                Argument::Pagination(page) => special.pagination = Some(*page),
                Argument::Value(_) => {}
            }
        }
        special
    }

    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty() && self.pagination.is_none()
    }

    /// Append sorts after the ones from the method name; pagination
    /// overrides skip and limit
    pub fn apply_to(&self, query: &mut nql::SelectQuery) {
        query.sorts.extend(self.sorts.iter().cloned());
        if let Some(page) = self.pagination {
            query.skip = page.skip();
            query.limit = page.size;
        }
    }
}

/// Binds method arguments into converted params
pub struct ParamsBinder<'a> {
    mapping: Option<&'a EntityMapping>,
    converters: &'a Converters,
}

impl<'a> ParamsBinder<'a> {
    pub fn new(converters: &'a Converters) -> Self {
        Self {
            mapping: None,
            converters,
        }
    }

    /// Use field converters declared by `mapping`
    pub fn with_mapping(mut self, mapping: &'a EntityMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn bind(&self, params: &mut Params, args: &[Argument], method: &MethodSignature) -> Result<()> {
        let values: Vec<&Value> = args
            .iter()
            .filter_map(|arg| match arg {
                Argument::Value(value) => Some(value),
                _ => None,
            })
            .collect();

        let mut bindings: Vec<(String, Value)> = Vec::with_capacity(params.len());

        let positional = params.positional();
        if let Some((highest, _)) = positional.last() {
            if *highest != values.len() {
                return Err(Error::ArgumentCount {
                    expected: *highest,
                    actual: values.len(),
                });
            }
        }
        for (index, slot) in &positional {
            // `?0` has no argument to take
            let (arg, value) = index
                .checked_sub(1)
                .and_then(|i| values.get(i).map(|value| (i, (*value).clone())))
                .ok_or(Error::ArgumentCount {
                    expected: *index,
                    actual: values.len(),
                })?;
            let converter = method
                .parameters
                .get(arg)
                .and_then(|p| p.converter.as_deref());
            let value = self.convert(value, converter, slot.field.as_deref())?;
            bindings.push((slot.name.clone(), value));
        }

        for slot in params.named() {
            let index = method
                .parameters
                .iter()
                .position(|p| p.name.as_deref() == Some(slot.name.as_str()))
                .ok_or_else(|| Error::UnboundParameter {
                    name: slot.name.clone(),
                })?;
            let value = values.get(index).copied().cloned().ok_or(Error::ArgumentCount {
                expected: method.parameters.len(),
                actual: values.len(),
            })?;
            let converter = method.parameters[index].converter.as_deref();
            let value = self.convert(value, converter, slot.field.as_deref())?;
            bindings.push((slot.name.clone(), value));
        }

        for (name, value) in bindings {
            params.bind(&name, value)?;
        }
        Ok(())
    }

    fn convert(&self, value: Value, declared: Option<&str>, field: Option<&str>) -> Result<Value> {
        let from_field = || {
            let mapping = self.mapping?;
            let field = field?;
            mapping
                .find_by_storage(field)
                .or_else(|| mapping.find_field(field))
                .and_then(|f| f.converter.as_deref())
        };
        match declared.or_else(from_field) {
            Some(name) => self.converters.get(name)?.to_storage_each(value),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{AttributeConverter, FieldMapping};
    use std::sync::Arc;

    struct Upper;

    impl AttributeConverter for Upper {
        fn to_storage(&self, value: Value) -> Result<Value> {
            Ok(Value::String(value.get::<String>()?.to_uppercase()))
        }

        fn to_entity(&self, value: Value) -> Result<Value> {
            Ok(Value::String(value.get::<String>()?.to_lowercase()))
        }
    }

    fn params(names: &[(&str, &str)]) -> Params {
        let mut params = Params::new();
        for (name, field) in names {
            params.register(name, Some(field));
        }
        params
    }

    #[test]
    fn test_bind_positional() {
        let converters = Converters::new();
        let mut p = params(&[("?1", "name"), ("?2", "age")]);
        let args = vec![Argument::from("Diana"), Argument::from(30i64)];
        ParamsBinder::new(&converters)
            .bind(&mut p, &args, &MethodSignature::new("findByNameAndAge"))
            .unwrap();
        assert_eq!(p.get("?1"), Some(&Value::from("Diana")));
        assert_eq!(p.get("?2"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_argument_count_mismatch() {
        let converters = Converters::new();
        let mut p = params(&[("?1", "name"), ("?2", "age")]);
        let err = ParamsBinder::new(&converters)
            .bind(&mut p, &[Argument::from("Diana")], &MethodSignature::new("m"))
            .unwrap_err();
        assert!(matches!(err, Error::ArgumentCount { expected: 2, actual: 1 }));
        assert!(p.get("?1").is_none());
    }

    #[test]
    fn test_zero_positional_index() {
        let converters = Converters::new();
        let mut p = params(&[("?0", "name")]);
        let err = ParamsBinder::new(&converters)
            .bind(&mut p, &[], &MethodSignature::new("m"))
            .unwrap_err();
        assert!(matches!(err, Error::ArgumentCount { expected: 0, actual: 0 }));
        assert!(!p.is_fully_bound());
    }

    #[test]
    fn test_bind_named() {
        let converters = Converters::new();
        let mut p = params(&[("name", "name")]);
        let method = MethodSignature::new("query").param(MethodParameter::named("name"));
        ParamsBinder::new(&converters)
            .bind(&mut p, &[Argument::from("Diana")], &method)
            .unwrap();
        assert_eq!(p.get("name"), Some(&Value::from("Diana")));

        let mut p = params(&[("age", "age")]);
        let err = ParamsBinder::new(&converters)
            .bind(&mut p, &[Argument::from(1i64)], &method)
            .unwrap_err();
        assert!(err.is_query_error());
    }

    #[test]
    fn test_special_arguments_skip_binding() {
        let converters = Converters::new();
        let mut p = params(&[("?1", "name")]);
        let args = vec![
            Argument::Sort(nql::Sort { field: "age".into(), direction: nql::Direction::Desc }),
            Argument::from("Diana"),
            Argument::Pagination(Pagination::new(3, 10)),
        ];
        ParamsBinder::new(&converters)
            .bind(&mut p, &args, &MethodSignature::new("findByName"))
            .unwrap();
        assert!(p.is_fully_bound());

        let special = SpecialArguments::scan(&args);
        let mut query = nql::SelectQuery::new("God");
        special.apply_to(&mut query);
        assert_eq!(query.sorts.len(), 1);
        assert_eq!((query.skip, query.limit), (20, 10));
    }

    #[test]
    fn test_field_converter_applies() {
        let mut converters = Converters::new();
        converters.register("upper", Arc::new(Upper));
        let mapping = EntityMapping::new("God")
            .with_field(FieldMapping::new("name").stored_as("god_name").with_converter("upper"));
        let mut p = params(&[("?1", "god_name")]);
        ParamsBinder::new(&converters)
            .with_mapping(&mapping)
            .bind(&mut p, &[Argument::from(vec!["diana", "zeus"])], &MethodSignature::new("findByNameIn"))
            .unwrap();
        assert_eq!(p.get("?1"), Some(&Value::from(vec!["DIANA", "ZEUS"])));
    }

    #[test]
    fn test_declared_converter_wins() {
        let mut converters = Converters::new();
        converters.register("upper", Arc::new(Upper));
        let mut p = params(&[("?1", "name")]);
        let method = MethodSignature::new("findByName")
            .param(MethodParameter::default().with_converter("upper"));
        ParamsBinder::new(&converters)
            .bind(&mut p, &[Argument::from("diana")], &method)
            .unwrap();
        assert_eq!(p.get("?1"), Some(&Value::from("DIANA")));
    }
}

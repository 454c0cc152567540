//! Tool input schemas
//!
//! Every tool declares its arguments as a list of [`FieldSpec`]s. One generic
//! routine, [`InputSchema::coerce`], turns raw JSON arguments into bound query
//! parameters for all tools.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::ArgumentError;
use crate::graph::ParamValue;

/// Argument type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
}

impl FieldKind {
    fn json_type(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Integer => "an integer",
        }
    }
}

/// One declared argument
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<ParamValue>,
    /// Integer values below this are clamped up to it
    pub minimum: Option<i64>,
}

impl FieldSpec {
    /// A required string argument
    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::String,
            required: true,
            default: None,
            minimum: None,
        }
    }

    /// A required integer argument
    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::string(name, description)
        }
    }

    /// Make the argument optional, falling back to `default`
    pub fn with_default(mut self, default: impl Into<ParamValue>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    fn coerce(&self, value: &Value) -> Result<ParamValue, ArgumentError> {
        let invalid = || ArgumentError::InvalidType {
            field: self.name.to_string(),
            expected: self.kind.expected(),
        };

        match self.kind {
            FieldKind::String => value
                .as_str()
                .map(|s| ParamValue::String(s.to_string()))
                .ok_or_else(invalid),
            FieldKind::Integer => {
                let n = value
                    .as_i64()
                    .or_else(|| {
                        value
                            .as_f64()
                            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                            .map(|f| f as i64)
                    })
                    .ok_or_else(invalid)?;
                Ok(ParamValue::Integer(self.clamp(n)))
            }
        }
    }

    fn clamp(&self, n: i64) -> i64 {
        match self.minimum {
            Some(min) if n < min => {
                tracing::debug!(field = self.name, value = n, minimum = min, "Clamping argument");
                min
            }
            _ => n,
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.json_type()));
        property.insert("description".to_string(), json!(self.description));
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.to_json());
        }
        if let Some(minimum) = self.minimum {
            property.insert("minimum".to_string(), json!(minimum));
        }
        Value::Object(property)
    }
}

/// The declared arguments of one tool
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Coerce raw arguments into query parameters.
    ///
    /// Missing optional fields take their defaults; `null` counts as missing.
    /// Undeclared fields are ignored.
    pub fn coerce(&self, args: &Value) -> Result<BTreeMap<String, ParamValue>, ArgumentError> {
        let empty = Map::new();
        let args = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ArgumentError::NotAnObject),
        };

        let mut params = BTreeMap::new();
        for field in &self.fields {
            let value = match args.get(field.name).filter(|v| !v.is_null()) {
                Some(raw) => field.coerce(raw)?,
                None => match (&field.default, field.required) {
                    (Some(default), _) => default.clone(),
                    (None, true) => {
                        return Err(ArgumentError::MissingField {
                            field: field.name.to_string(),
                        })
                    }
                    (None, false) => continue,
                },
            };
            params.insert(field.name.to_string(), value);
        }

        Ok(params)
    }
}

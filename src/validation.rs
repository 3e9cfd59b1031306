//! Declarative validation of JSON request payloads.
//!
//! Independent of the query engine: services validate a payload, then bind the converted
//! values as positional parameters.
//!
//! ```rust
//! use serde_json::json;
//! use sql_query_manager::validation::{Rules, Schema, validate};
//!
//! let schema = Schema::new()
//!     .required(
//!         "userId",
//!         Rules::number()
//!             .convert()
//!             .rule(|v| v.as_f64().is_some_and(|n| n > 0.0), "$fullPath must be positive"),
//!     )
//!     .optional("description", Rules::string().length_between(1, 255));
//!
//! let value = validate(&json!({"userId": "7"}), &schema).unwrap();
//! assert_eq!(value, json!({"userId": 7}));
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Placeholder replaced by the quoted field path in rule failure messages.
pub const FULL_PATH: &str = "$fullPath";

/// JSON value kinds a leaf accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl ValueType {
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Object(_) => ValueType::Object,
            Value::Array(_) => ValueType::Array,
            Value::Null => ValueType::Null,
        }
    }

    fn convert(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Number, Value::String(s)) => parse_number(s.trim()),
            (ValueType::Number, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
            (ValueType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ValueType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (ValueType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::Null => "null",
        };
        f.write_str(name)
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{path} is required but was not sent")]
    Missing { path: String },

    #[error("{path} must be of type {expected}, got {found}")]
    WrongType {
        path: String,
        expected: String,
        found: ValueType,
    },

    #[error("{message}")]
    Length { path: String, message: String },

    #[error("{message}")]
    Rule { path: String, message: String },
}

impl ValidationError {
    /// Dotted path of the offending field.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            ValidationError::Missing { path }
            | ValidationError::WrongType { path, .. }
            | ValidationError::Length { path, .. }
            | ValidationError::Rule { path, .. } => path,
        }
    }
}

type Check = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A custom predicate with the message reported when it fails.
#[derive(Clone)]
pub struct Rule {
    check: Check,
    on_fail: String,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("on_fail", &self.on_fail)
            .finish_non_exhaustive()
    }
}

/// Allowed length of a string or array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Exact(usize),
    Between(usize, usize),
}

/// Rules for a leaf field.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    types: Vec<ValueType>,
    convert: bool,
    length: Option<Length>,
    rules: Vec<Rule>,
}

impl Rules {
    /// Accept any of `types`; an empty list accepts every value.
    #[must_use]
    pub fn of(types: impl IntoIterator<Item = ValueType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn string() -> Self {
        Self::of([ValueType::String])
    }

    #[must_use]
    pub fn number() -> Self {
        Self::of([ValueType::Number])
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::of([ValueType::Boolean])
    }

    /// Try converting mismatched values to an accepted type before rejecting them.
    #[must_use]
    pub fn convert(mut self) -> Self {
        self.convert = true;
        self
    }

    #[must_use]
    pub fn length(mut self, exact: usize) -> Self {
        self.length = Some(Length::Exact(exact));
        self
    }

    #[must_use]
    pub fn length_between(mut self, min: usize, max: usize) -> Self {
        self.length = Some(Length::Between(min, max));
        self
    }

    /// Add a predicate; `on_fail` may mention `$fullPath`.
    #[must_use]
    pub fn rule<F>(mut self, check: F, on_fail: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            check: Arc::new(check),
            on_fail: on_fail.into(),
        });
        self
    }

    fn apply(&self, path: &str, value: Value) -> Result<Value, ValidationError> {
        let value = self.check_type(path, value)?;

        let len = match &value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let (Some(len), Some(limit)) = (len, self.length) {
            match limit {
                Length::Exact(n) if len != n => {
                    return Err(ValidationError::Length {
                        path: path.to_string(),
                        message: format!("{path} must have length {n}"),
                    });
                }
                Length::Between(min, max) if len < min || len > max => {
                    return Err(ValidationError::Length {
                        path: path.to_string(),
                        message: format!("{path} must have length between {min} and {max}"),
                    });
                }
                _ => {}
            }
        }

        for rule in &self.rules {
            if !(rule.check)(&value) {
                let message = if rule.on_fail.is_empty() {
                    format!("{path} failed a validation rule")
                } else {
                    rule.on_fail.replace(FULL_PATH, &format!("\"{path}\""))
                };
                return Err(ValidationError::Rule {
                    path: path.to_string(),
                    message,
                });
            }
        }
        Ok(value)
    }

    fn check_type(&self, path: &str, value: Value) -> Result<Value, ValidationError> {
        let found = ValueType::of(&value);
        if self.types.is_empty() || self.types.contains(&found) {
            return Ok(value);
        }
        if self.convert
            && let Some(converted) = self.types.iter().find_map(|ty| ty.convert(&value))
        {
            return Ok(converted);
        }
        Err(ValidationError::WrongType {
            path: path.to_string(),
            expected: self
                .types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
            found,
        })
    }
}

/// A leaf with rules or a nested object schema.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(Rules),
    Nested(Schema),
}

impl From<Rules> for Node {
    fn from(rules: Rules) -> Self {
        Node::Leaf(rules)
    }
}

impl From<Schema> for Node {
    fn from(schema: Schema) -> Self {
        Node::Nested(schema)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub required: bool,
    pub node: Node,
}

/// Ordered fields of an object; fields are checked in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.field(name, true, node)
    }

    #[must_use]
    pub fn optional(self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.field(name, false, node)
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn field(mut self, name: impl Into<String>, required: bool, node: impl Into<Node>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            required,
            node: node.into(),
        });
        self
    }

    fn apply(
        &self,
        base: &str,
        mut object: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        for field in &self.fields {
            let path = if base.is_empty() {
                field.name.clone()
            } else {
                format!("{base}.{}", field.name)
            };
            let Some(value) = object.remove(&field.name) else {
                if field.required {
                    return Err(ValidationError::Missing { path });
                }
                continue;
            };
            let checked = match &field.node {
                Node::Leaf(rules) => rules.apply(&path, value)?,
                Node::Nested(schema) => match value {
                    Value::Object(inner) => Value::Object(schema.apply(&path, inner)?),
                    other => {
                        return Err(ValidationError::WrongType {
                            path,
                            expected: ValueType::Object.to_string(),
                            found: ValueType::of(&other),
                        });
                    }
                },
            };
            object.insert(field.name.clone(), checked);
        }
        Ok(object)
    }
}

/// Check `value` against `schema` and return it with conversions applied.
///
/// Fields the schema does not name are passed through untouched.
///
/// # Errors
/// Returns the first `ValidationError` found, in field declaration order.
pub fn validate(value: &Value, schema: &Schema) -> Result<Value, ValidationError> {
    match value {
        Value::Object(object) => Ok(Value::Object(schema.apply("", object.clone())?)),
        other => Err(ValidationError::WrongType {
            path: String::new(),
            expected: ValueType::Object.to_string(),
            found: ValueType::of(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn positive_id() -> Rules {
        Rules::number().convert().rule(
            |v| v.as_i64().is_some_and(|n| n > 0),
            "$fullPath must be a positive integer",
        )
    }

    fn filters() -> Schema {
        Schema::new()
            .required("userId", positive_id())
            .optional("description", Rules::string().length_between(1, 255))
            .required(
                "pagination",
                Schema::new()
                    .required(
                        "limit",
                        positive_id().rule(
                            |v| matches!(v.as_i64(), Some(10 | 20 | 50 | 100)),
                            "$fullPath must be one of 10, 20, 50 or 100",
                        ),
                    )
                    .required("page", positive_id()),
            )
    }

    #[test]
    fn converts_and_passes_unknown_fields_through() {
        let value = validate(
            &json!({"userId": "3", "pagination": {"limit": "20", "page": 1}, "extra": [1]}),
            &filters(),
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"userId": 3, "pagination": {"limit": 20, "page": 1}, "extra": [1]})
        );
    }

    #[test]
    fn missing_required_field_reports_nested_path() {
        let err =
            validate(&json!({"userId": 1, "pagination": {"limit": 10}}), &filters()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Missing {
                path: "pagination.page".into()
            }
        );
    }

    #[test]
    fn rule_messages_name_the_field() {
        let err = validate(
            &json!({"userId": 1, "pagination": {"limit": 15, "page": 1}}),
            &filters(),
        )
        .unwrap_err();
        assert_eq!(err.path(), "pagination.limit");
        assert_eq!(
            err.to_string(),
            "\"pagination.limit\" must be one of 10, 20, 50 or 100"
        );
    }

    #[test]
    fn type_mismatch_without_conversion() {
        let schema = Schema::new().required("type", Rules::string());
        let err = validate(&json!({"type": 5}), &schema).unwrap_err();
        assert_eq!(err.to_string(), "type must be of type string, got number");
    }

    #[test]
    fn unconvertible_values_are_rejected() {
        let err = validate(&json!({"userId": "abc", "pagination": {}}), &filters()).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { path, .. } if path == "userId"));
    }

    #[test]
    fn length_limits() {
        let schema = Schema::new().optional("description", Rules::string().length_between(2, 4));
        assert!(validate(&json!({"description": "abc"}), &schema).is_ok());
        assert!(validate(&json!({}), &schema).is_ok());
        let err = validate(&json!({"description": "abcdef"}), &schema).unwrap_err();
        assert_eq!(err.to_string(), "description must have length between 2 and 4");
        let exact = Schema::new().required("code", Rules::string().length(2));
        assert!(validate(&json!({"code": "abc"}), &exact).is_err());
    }

    #[test]
    fn boolean_conversion_accepts_only_literals() {
        let schema = Schema::new().required("flag", Rules::boolean().convert());
        assert_eq!(
            validate(&json!({"flag": "true"}), &schema).unwrap(),
            json!({"flag": true})
        );
        assert!(validate(&json!({"flag": "yes"}), &schema).is_err());
    }

    #[test]
    fn nested_schema_requires_an_object() {
        let err = validate(&json!({"userId": 1, "pagination": 5}), &filters()).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { found: ValueType::Number, .. }));
    }
}

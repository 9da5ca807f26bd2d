//! Resource descriptors: attribute schemas and configuration validation

use crate::error::{Result, ValidationError};
use crate::state::LocalState;
use crate::value::{Attributes, Value};
use regex::Regex;

/// Type of an attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    String,
    Int,
    Bool,
    List(Box<AttributeKind>),
    /// String-to-string map
    Map,
    /// Nested block with its own attributes
    Block(Vec<AttributeSpec>),
}

impl AttributeKind {
    /// Value an attribute takes when the remote does not report it
    pub fn zero_value(&self) -> Value {
        match self {
            AttributeKind::String => Value::String(String::new()),
            AttributeKind::Int => Value::Int(0),
            AttributeKind::Bool => Value::Bool(false),
            AttributeKind::List(_) => Value::List(Vec::new()),
            AttributeKind::Map | AttributeKind::Block(_) => Value::Block(Attributes::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Int => "int",
            AttributeKind::Bool => "bool",
            AttributeKind::List(_) => "list",
            AttributeKind::Map => "map",
            AttributeKind::Block(_) => "block",
        }
    }
}

/// Who supplies an attribute's value
///
/// Required and computed are exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Reported by the remote only
    Computed,
    /// Configurable, otherwise reported by the remote
    OptionalComputed,
}

impl Presence {
    pub fn is_computed(&self) -> bool {
        matches!(self, Presence::Computed | Presence::OptionalComputed)
    }
}

/// Constraint checked against configured values
#[derive(Debug, Clone)]
pub enum Validator {
    /// Character count for strings, item count for lists
    Length { min: usize, max: usize },
    Pattern(Regex),
    OneOf(Vec<String>),
    Range { min: i64, max: i64 },
    NotPrefixed(String),
}

impl Validator {
    pub fn length(min: usize, max: usize) -> Self {
        Validator::Length { min, max }
    }

    /// Build a pattern validator from a literal regex.
    ///
    /// Panics on an invalid pattern, so only pass string literals.
    pub fn pattern(pattern: &'static str) -> Self {
        Validator::Pattern(Regex::new(pattern).expect("validator pattern must be a valid regex"))
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Validator::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn range(min: i64, max: i64) -> Self {
        Validator::Range { min, max }
    }

    pub fn not_prefixed(prefix: impl Into<String>) -> Self {
        Validator::NotPrefixed(prefix.into())
    }

    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match (self, value) {
            (Validator::Length { min, max }, Value::String(s)) => {
                let len = s.chars().count();
                if len < *min || len > *max {
                    return Err(format!(
                        "length must be between {} and {}, got {}",
                        min, max, len
                    ));
                }
            }
            (Validator::Length { min, max }, Value::List(items)) => {
                if items.len() < *min || items.len() > *max {
                    return Err(format!(
                        "must contain between {} and {} items, got {}",
                        min,
                        max,
                        items.len()
                    ));
                }
            }
            (Validator::Pattern(re), Value::String(s)) => {
                if !re.is_match(s) {
                    return Err(format!("{:?} does not match {}", s, re.as_str()));
                }
            }
            (Validator::OneOf(allowed), Value::String(s)) => {
                if !allowed.iter().any(|a| a == s) {
                    return Err(format!(
                        "expected one of [{}], got {:?}",
                        allowed.join(", "),
                        s
                    ));
                }
            }
            (Validator::Range { min, max }, Value::Int(i)) => {
                if i < min || i > max {
                    return Err(format!("must be between {} and {}, got {}", min, max, i));
                }
            }
            (Validator::NotPrefixed(prefix), Value::String(s)) => {
                if s.starts_with(prefix.as_str()) {
                    return Err(format!("must not start with {:?}", prefix));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Schema entry for one attribute
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: AttributeKind,
    pub presence: Presence,
    /// Changing the value destroys and recreates the remote object
    pub force_new: bool,
    pub validators: Vec<Validator>,
    pub default: Option<Value>,
}

impl PartialEq for AttributeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.presence == other.presence
            && self.force_new == other.force_new
    }
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            presence: Presence::Optional,
            force_new: false,
            validators: Vec::new(),
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Int)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Bool)
    }

    pub fn list(name: impl Into<String>, item: AttributeKind) -> Self {
        Self::new(name, AttributeKind::List(Box::new(item)))
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Map)
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn is_configurable(&self) -> bool {
        self.presence != Presence::Computed
    }
}

/// Static declaration of a resource type's attributes
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    name: String,
    attributes: Vec<AttributeSpec>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute, replacing an earlier one with the same name
    pub fn with(mut self, spec: AttributeSpec) -> Self {
        self.attributes.retain(|a| a.name != spec.name);
        self.attributes.push(spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Fill unset optional attributes that declare a default
    pub fn apply_defaults(&self, config: &mut LocalState) {
        for spec in &self.attributes {
            if let Some(default) = &spec.default {
                if config.get(&spec.name).is_none() {
                    config.set(spec.name.clone(), default.clone());
                }
            }
        }
    }

    /// Every violation in `config`, in attribute order
    pub fn validate(&self, config: &LocalState) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        validate_attributes(&self.attributes, config.attributes(), "", &mut errors);
        errors
    }

    /// First violation in `config` as an error
    pub fn check(&self, config: &LocalState) -> Result<()> {
        match self.validate(config).into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

fn validate_attributes(
    specs: &[AttributeSpec],
    values: &Attributes,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    for spec in specs {
        let path = format!("{}{}", prefix, spec.name);
        let value = values.get(&spec.name).filter(|v| !v.is_null());

        let Some(value) = value else {
            if spec.presence == Presence::Required {
                errors.push(ValidationError::new(path, "required attribute is missing"));
            }
            continue;
        };

        if spec.presence == Presence::Computed {
            continue;
        }

        validate_value(spec, &spec.kind, value, &path, errors);
    }
}

fn validate_value(
    spec: &AttributeSpec,
    kind: &AttributeKind,
    value: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    let kind_matches = matches!(
        (kind, value),
        (AttributeKind::String, Value::String(_))
            | (AttributeKind::Int, Value::Int(_))
            | (AttributeKind::Bool, Value::Bool(_))
            | (AttributeKind::List(_), Value::List(_))
            | (AttributeKind::Map, Value::Block(_))
            | (AttributeKind::Block(_), Value::Block(_))
    );
    if !kind_matches {
        errors.push(ValidationError::new(
            path,
            format!("expected {}, got {}", kind.name(), value.kind_name()),
        ));
        return;
    }

    match (kind, value) {
        (AttributeKind::List(item_kind), Value::List(items)) => {
            for validator in &spec.validators {
                if let Err(reason) = validator.check(value) {
                    errors.push(ValidationError::new(path, reason));
                }
            }
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{}.{}", path, index);
                validate_item(spec, item_kind, item, &item_path, errors);
            }
        }
        (AttributeKind::Map, Value::Block(entries)) => {
            for (key, entry) in entries {
                if entry.as_str().is_none() {
                    errors.push(ValidationError::new(
                        format!("{}.{}", path, key),
                        format!("expected string, got {}", entry.kind_name()),
                    ));
                }
            }
        }
        (AttributeKind::Block(nested), Value::Block(block)) => {
            validate_attributes(nested, block, &format!("{}.", path), errors);
        }
        _ => {
            for validator in &spec.validators {
                if let Err(reason) = validator.check(value) {
                    errors.push(ValidationError::new(path, reason));
                }
            }
        }
    }
}

fn validate_item(
    spec: &AttributeSpec,
    kind: &AttributeKind,
    item: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    match (kind, item) {
        (AttributeKind::Block(nested), Value::Block(block)) => {
            validate_attributes(nested, block, &format!("{}.", path), errors);
        }
        (AttributeKind::Block(_), other) => {
            errors.push(ValidationError::new(
                path,
                format!("expected block, got {}", other.kind_name()),
            ));
        }
        _ => {
            // list-level validators already ran; item kinds only need a type check
            let item_spec = AttributeSpec::new(spec.name.clone(), kind.clone());
            validate_value(&item_spec, kind, item, path, errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ResourceDescriptor {
        ResourceDescriptor::new("policy")
            .with(
                AttributeSpec::string("name")
                    .required()
                    .validate(Validator::length(1, 8))
                    .validate(Validator::pattern(r"^[A-Za-z0-9_-]+$")),
            )
            .with(
                AttributeSpec::int("frequency")
                    .required()
                    .validate(Validator::range(1, 14)),
            )
            .with(AttributeSpec::string("status").validate(Validator::one_of(["ON", "OFF"])))
            .with(AttributeSpec::string("description").default_value("managed"))
            .with(AttributeSpec::int("resource_count").computed())
            .with(AttributeSpec::list(
                "tags",
                AttributeKind::Block(vec![
                    AttributeSpec::string("key")
                        .required()
                        .validate(Validator::length(1, 4)),
                    AttributeSpec::string("value").required(),
                ]),
            ))
    }

    #[test]
    fn test_valid_config() {
        let config = LocalState::new()
            .with("name", "daily")
            .with("frequency", 7)
            .with("status", "ON");
        assert!(policy().validate(&config).is_empty());
        assert!(policy().check(&config).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let config = LocalState::new().with("name", "daily");
        let errors = policy().validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].attribute, "frequency");
    }

    #[test]
    fn test_validators() {
        let config = LocalState::new()
            .with("name", "way too long name")
            .with("frequency", 30)
            .with("status", "MAYBE");
        let errors = policy().validate(&config);
        let attributes: Vec<_> = errors.iter().map(|e| e.attribute.as_str()).collect();
        assert_eq!(attributes, vec!["name", "name", "frequency", "status"]);
    }

    #[test]
    fn test_kind_mismatch() {
        let config = LocalState::new()
            .with("name", "daily")
            .with("frequency", "weekly");
        let err = policy().check(&config).unwrap_err();
        assert!(err.to_string().contains("expected int, got string"));
    }

    #[test]
    fn test_nested_block_paths() {
        let mut tag = Attributes::new();
        tag.insert("key".to_string(), Value::from("too-long"));
        let config = LocalState::new()
            .with("name", "daily")
            .with("frequency", 1)
            .with("tags", Value::List(vec![Value::Block(tag)]));
        let errors = policy().validate(&config);
        let attributes: Vec<_> = errors.iter().map(|e| e.attribute.as_str()).collect();
        assert_eq!(attributes, vec!["tags.0.key", "tags.0.value"]);
    }

    #[test]
    fn test_computed_values_are_not_validated() {
        let config = LocalState::new()
            .with("name", "daily")
            .with("frequency", 1)
            .with("resource_count", "not a number");
        assert!(policy().validate(&config).is_empty());
    }

    #[test]
    fn test_apply_defaults() {
        let mut config = LocalState::new().with("name", "daily");
        policy().apply_defaults(&mut config);
        assert_eq!(config.get_str("description"), Some("managed"));

        let mut config = LocalState::new().with("description", "custom");
        policy().apply_defaults(&mut config);
        assert_eq!(config.get_str("description"), Some("custom"));
    }
}

//! Ordered rule table classifying a fragment into a descriptor kind.
//!
//! Rules are evaluated top to bottom and the first match wins, so the order
//! encodes precedence (an `enum` with `type: string` is an enum).

use strum::Display;

use super::schema::{GenericSchema, Schema, SchemaType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DescriptorRule {
  Generic,
  OneOf,
  AnyOf,
  AllOf,
  Enum,
  Number,
  String,
  Object,
  Array,
  Boolean,
  Null,
  InstanceOf,
  Any,
}

/// What the rule table looks at: a generic wrapper or a parsed fragment.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'s> {
  Generic(&'s GenericSchema),
  Fragment(&'s Schema),
}

type RulePredicate = fn(&Candidate<'_>) -> bool;

static RULES: &[(DescriptorRule, RulePredicate)] = &[
  (DescriptorRule::Generic, |c| matches!(c, Candidate::Generic(_))),
  (DescriptorRule::OneOf, |c| fragment(c, |s| !s.one_of.is_empty())),
  (DescriptorRule::AnyOf, |c| fragment(c, |s| !s.any_of.is_empty())),
  (DescriptorRule::AllOf, |c| fragment(c, |s| !s.all_of.is_empty())),
  (DescriptorRule::Enum, |c| fragment(c, is_scalar_enum)),
  (DescriptorRule::Number, |c| {
    fragment(c, |s| s.has_type(SchemaType::Number) || s.has_type(SchemaType::Integer))
  }),
  (DescriptorRule::String, |c| fragment(c, |s| s.has_type(SchemaType::String))),
  (DescriptorRule::Object, |c| fragment(c, is_object)),
  (DescriptorRule::Array, |c| {
    fragment(c, |s| s.has_type(SchemaType::Array) || (s.is_untyped() && s.items.is_some()))
  }),
  (DescriptorRule::Boolean, |c| fragment(c, |s| s.has_type(SchemaType::Boolean))),
  (DescriptorRule::Null, |c| fragment(c, |s| s.has_type(SchemaType::Null))),
  (DescriptorRule::InstanceOf, |c| {
    fragment(c, |s| s.instance_of.is_some() || s.generic_parameter.is_some())
  }),
  (DescriptorRule::Any, |_| true),
];

fn fragment(candidate: &Candidate<'_>, predicate: impl Fn(&Schema) -> bool) -> bool {
  match candidate {
    Candidate::Fragment(schema) => predicate(schema),
    Candidate::Generic(_) => false,
  }
}

fn is_scalar_enum(schema: &Schema) -> bool {
  schema
    .enum_values
    .as_ref()
    .is_some_and(|values| !values.is_empty() && values.iter().all(|v| v.is_string() || v.is_number()))
}

/// Explicit `type: object`, or object keywords without any `type`.
fn is_object(schema: &Schema) -> bool {
  schema.has_type(SchemaType::Object)
    || (schema.is_untyped()
      && (!schema.properties.is_empty() || !schema.required.is_empty() || schema.additional_properties.is_some()))
}

/// Returns the first rule matching `candidate`.
pub fn classify(candidate: &Candidate<'_>) -> Option<DescriptorRule> {
  RULES
    .iter()
    .find(|(_, predicate)| predicate(candidate))
    .map(|(rule, _)| *rule)
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};

  use super::*;
  use crate::generator::schema::Discriminant;

  fn classify_value(value: &Value) -> DescriptorRule {
    let schema = Schema::from_value(value).unwrap();
    classify(&Candidate::Fragment(&schema)).unwrap()
  }

  #[test]
  fn test_enum_wins_over_string() {
    assert_eq!(
      classify_value(&json!({"type": "string", "enum": ["a", "b"]})),
      DescriptorRule::Enum
    );
  }

  #[test]
  fn test_compositions_win_over_types() {
    assert_eq!(
      classify_value(&json!({"type": "object", "oneOf": [{"type": "string"}]})),
      DescriptorRule::OneOf
    );
    assert_eq!(
      classify_value(&json!({"anyOf": [{}], "allOf": [{}]})),
      DescriptorRule::AnyOf,
      "anyOf is checked before allOf"
    );
    assert_eq!(
      classify_value(&json!({"allOf": [{}], "enum": ["a"]})),
      DescriptorRule::AllOf
    );
  }

  #[test]
  fn test_scalar_types() {
    assert_eq!(classify_value(&json!({"type": "integer"})), DescriptorRule::Number);
    assert_eq!(classify_value(&json!({"type": "number"})), DescriptorRule::Number);
    assert_eq!(classify_value(&json!({"type": "string"})), DescriptorRule::String);
    assert_eq!(classify_value(&json!({"type": "boolean"})), DescriptorRule::Boolean);
    assert_eq!(classify_value(&json!({"type": "null"})), DescriptorRule::Null);
  }

  #[test]
  fn test_duck_typed_objects() {
    assert_eq!(classify_value(&json!({"properties": {}})), DescriptorRule::Object);
    assert_eq!(classify_value(&json!({"required": ["id"]})), DescriptorRule::Object);
    assert_eq!(
      classify_value(&json!({"additionalProperties": true})),
      DescriptorRule::Object
    );
    assert_eq!(
      classify_value(&json!({"type": "string", "properties": {"a": {}}})),
      DescriptorRule::String,
      "explicit type wins over object keywords"
    );
  }

  #[test]
  fn test_arrays() {
    assert_eq!(classify_value(&json!({"type": "array"})), DescriptorRule::Array);
    assert_eq!(classify_value(&json!({"items": {"type": "string"}})), DescriptorRule::Array);
  }

  #[test]
  fn test_non_scalar_enum_falls_through() {
    assert_eq!(
      classify_value(&json!({"type": "string", "enum": [{"a": 1}]})),
      DescriptorRule::String
    );
    assert_eq!(classify_value(&json!({"enum": []})), DescriptorRule::Any);
  }

  #[test]
  fn test_escape_hatches_and_fallback() {
    assert_eq!(classify_value(&json!({"instanceof": "Date"})), DescriptorRule::InstanceOf);
    assert_eq!(classify_value(&json!({"x-generic": "T"})), DescriptorRule::InstanceOf);
    assert_eq!(classify_value(&json!({})), DescriptorRule::Any);
    assert_eq!(classify_value(&json!({"description": "anything"})), DescriptorRule::Any);
  }

  #[test]
  fn test_generic_by_identity() {
    let generic = GenericSchema::new(Discriminant::StatusCode);
    assert_eq!(classify(&Candidate::Generic(&generic)), Some(DescriptorRule::Generic));
  }
}

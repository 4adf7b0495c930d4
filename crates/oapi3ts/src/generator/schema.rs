//! Typed view of JSON Schema fragments.
//!
//! A [`Schema`] parses the keywords of one fragment; nested fragments stay raw
//! [`Value`]s so each one is parsed, located and reported on its own when the
//! convertor reaches it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

use crate::utils::text::doc_lines;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SchemaType {
  Object,
  Array,
  String,
  Number,
  Integer,
  Boolean,
  Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaTypeSet {
  Single(SchemaType),
  Multiple(Vec<SchemaType>),
}

impl SchemaTypeSet {
  pub fn types(&self) -> Vec<SchemaType> {
    match self {
      Self::Single(single) => vec![*single],
      Self::Multiple(types) => types.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaItems {
  Tuple(Vec<Value>),
  Single(Box<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
  Allowed(bool),
  Schema(Box<Value>),
}

/// One schema fragment with every keyword the convertor looks at.
///
/// Unknown keywords and `x-` extensions land in `extensions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
  #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
  pub reference: Option<String>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub schema_type: Option<SchemaTypeSet>,
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub properties: IndexMap<String, Value>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub required: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub items: Option<SchemaItems>,
  #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
  pub enum_values: Option<Vec<Value>>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub all_of: Vec<Value>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub one_of: Vec<Value>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub any_of: Vec<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub additional_properties: Option<AdditionalProperties>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub example: Option<Value>,
  #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nullable: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub read_only: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub format: Option<String>,
  #[serde(rename = "instanceof", default, skip_serializing_if = "Option::is_none")]
  pub instance_of: Option<String>,
  #[serde(rename = "x-generic", default, skip_serializing_if = "Option::is_none")]
  pub generic_parameter: Option<String>,
  #[serde(flatten)]
  pub extensions: IndexMap<String, Value>,
}

impl Schema {
  pub fn from_value(value: &Value) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
    serde_path_to_error::deserialize(value)
  }

  pub fn types(&self) -> Vec<SchemaType> {
    self.schema_type.as_ref().map(SchemaTypeSet::types).unwrap_or_default()
  }

  pub fn has_type(&self, schema_type: SchemaType) -> bool {
    self.types().contains(&schema_type)
  }

  pub fn is_untyped(&self) -> bool {
    self.types().is_empty()
  }

  pub fn is_read_only(&self) -> bool {
    self.read_only.unwrap_or(false)
  }

  /// Title and description as documentation lines, separated by a blank line.
  pub fn comment_lines(&self) -> Vec<String> {
    let title = self.title.as_deref().map(doc_lines).unwrap_or_default();
    let description = self.description.as_deref().map(doc_lines).unwrap_or_default();

    match (title.is_empty(), description.is_empty()) {
      (false, false) if title != description => [title, vec![String::new()], description].concat(),
      (false, _) => title,
      (true, _) => description,
    }
  }
}

/// Which runtime value a generic schema dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Discriminant {
  #[strum(to_string = "status code")]
  StatusCode,
  #[strum(to_string = "content type")]
  ContentType,
}

impl Discriminant {
  pub fn type_parameter(self) -> &'static str {
    match self {
      Self::StatusCode => "TCode",
      Self::ContentType => "TContentType",
    }
  }
}

/// A choice among sub-schemas keyed by a discriminant value (`200`, `application/json`).
#[derive(Debug, Clone, PartialEq)]
pub struct GenericSchema {
  pub discriminant: Discriminant,
  pub branches: IndexMap<String, SchemaNode>,
  pub description: Option<String>,
}

impl GenericSchema {
  pub fn new(discriminant: Discriminant) -> Self {
    Self {
      discriminant,
      branches: IndexMap::new(),
      description: None,
    }
  }

  #[cfg(test)]
  #[must_use]
  pub fn with_branch(mut self, key: impl Into<String>, node: impl Into<SchemaNode>) -> Self {
    self.branches.insert(key.into(), node.into());
    self
  }
}

/// The unit handed to the convertor.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
  Fragment(Value),
  Generic(GenericSchema),
}

impl From<Value> for SchemaNode {
  fn from(value: Value) -> Self {
    Self::Fragment(value)
  }
}

impl From<GenericSchema> for SchemaNode {
  fn from(generic: GenericSchema) -> Self {
    Self::Generic(generic)
  }
}

/// Keywords of `value` that change its meaning, ignoring `$ref` and the excluded keys.
pub fn meaningful_keys<'v>(value: &'v Value, is_excluded: impl Fn(&str) -> bool) -> Vec<&'v str> {
  value
    .as_object()
    .map(|map| {
      map
        .keys()
        .map(String::as_str)
        .filter(|key| *key != "$ref" && !is_excluded(key))
        .collect()
    })
    .unwrap_or_default()
}

/// Deep-merges `overlay` onto `base`: objects merge key-wise, `required` lists union,
/// anything else in `overlay` replaces the value in `base`.
pub fn deep_merge(base: Value, overlay: &Value) -> Value {
  match (base, overlay) {
    (Value::Object(mut base_map), Value::Object(overlay_map)) => {
      for (key, overlay_value) in overlay_map {
        match base_map.get_mut(key) {
          Some(existing) => {
            let current = existing.take();
            *existing = merge_entry(key, current, overlay_value);
          }
          None => {
            base_map.insert(key.clone(), overlay_value.clone());
          }
        }
      }
      Value::Object(base_map)
    }
    (_, overlay) => overlay.clone(),
  }
}

fn merge_entry(key: &str, current: Value, overlay: &Value) -> Value {
  match (key, current, overlay) {
    ("required", Value::Array(mut names), Value::Array(extra)) => {
      for name in extra {
        if !names.contains(name) {
          names.push(name.clone());
        }
      }
      Value::Array(names)
    }
    (_, current, overlay) => deep_merge(current, overlay),
  }
}

/// Folds one anonymous `allOf` member into the accumulated local object schema.
///
/// Properties declared twice are deep-merged, `required` names union and the first
/// documentation found wins.
pub fn merge_object(acc: Schema, member: &Schema) -> Schema {
  let mut properties = acc.properties;
  for (name, fragment) in &member.properties {
    match properties.get_mut(name) {
      Some(existing) => {
        let current = existing.take();
        *existing = deep_merge(current, fragment);
      }
      None => {
        properties.insert(name.clone(), fragment.clone());
      }
    }
  }

  let mut required = acc.required;
  let extra = member
    .required
    .iter()
    .filter(|name| !required.contains(name))
    .cloned()
    .collect::<Vec<_>>();
  required.extend(extra);

  Schema {
    schema_type: Some(SchemaTypeSet::Single(SchemaType::Object)),
    properties,
    required,
    additional_properties: acc.additional_properties.or_else(|| member.additional_properties.clone()),
    title: acc.title.or_else(|| member.title.clone()),
    description: acc.description.or_else(|| member.description.clone()),
    ..Schema::default()
  }
}

/// Splits a multi-typed or nullable fragment into one fragment per variant.
///
/// Returns `None` when the fragment describes a single type.
pub fn type_variants(value: &Value, schema: &Schema) -> Option<Vec<Value>> {
  let types = schema.types();
  let listed_null = types.contains(&SchemaType::Null);
  let non_null = types.iter().copied().filter(|t| *t != SchemaType::Null).collect::<Vec<_>>();
  let nullable = schema.nullable.unwrap_or(false) || listed_null;

  let mut variants = match non_null.as_slice() {
    [] if !nullable || listed_null => return None,
    [] => vec![without_keys(value, &["nullable"])],
    [_] if !nullable => return None,
    _ => non_null.iter().map(|t| with_type(value, *t)).collect(),
  };

  if nullable {
    variants.push(null_schema(None));
  }
  Some(variants)
}

/// An explicit `null` schema, optionally documented.
pub fn null_schema(description: Option<&str>) -> Value {
  let mut map = Map::new();
  map.insert("type".to_string(), Value::String(SchemaType::Null.to_string()));
  if let Some(description) = description {
    map.insert("description".to_string(), Value::String(description.to_string()));
  }
  Value::Object(map)
}

/// A copy of `value` without the given keys.
pub fn without_keys(value: &Value, keys: &[&str]) -> Value {
  match value {
    Value::Object(map) => Value::Object(
      map
        .iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, child)| (key.clone(), child.clone()))
        .collect(),
    ),
    other => other.clone(),
  }
}

fn with_type(value: &Value, schema_type: SchemaType) -> Value {
  match without_keys(value, &["nullable"]) {
    Value::Object(mut map) => {
      map.insert("type".to_string(), Value::String(schema_type.to_string()));
      Value::Object(map)
    }
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_parses_every_keyword() {
    let schema = Schema::from_value(&json!({
      "type": "object",
      "title": "Pet",
      "description": "A pet",
      "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
      "required": ["id"],
      "additionalProperties": false,
      "readOnly": true,
      "x-internal": true,
      "minProperties": 1
    }))
    .unwrap();

    assert_eq!(schema.schema_type, Some(SchemaTypeSet::Single(SchemaType::Object)));
    assert_eq!(schema.properties.keys().collect::<Vec<_>>(), vec!["id", "name"]);
    assert_eq!(schema.required, vec!["id"]);
    assert_eq!(schema.additional_properties, Some(AdditionalProperties::Allowed(false)));
    assert!(schema.is_read_only());
    assert_eq!(schema.extensions.get("x-internal"), Some(&json!(true)));
    assert_eq!(schema.extensions.get("minProperties"), Some(&json!(1)));
  }

  #[test]
  fn test_parses_type_lists_and_tuples() {
    let schema = Schema::from_value(&json!({
      "type": ["array", "null"],
      "items": [{"type": "string"}, {"type": "number"}]
    }))
    .unwrap();
    assert_eq!(schema.types(), vec![SchemaType::Array, SchemaType::Null]);
    assert!(matches!(schema.items, Some(SchemaItems::Tuple(ref items)) if items.len() == 2));

    let single = Schema::from_value(&json!({"items": {"type": "string"}})).unwrap();
    assert!(matches!(single.items, Some(SchemaItems::Single(_))));
  }

  #[test]
  fn test_malformed_fragment_reports_path() {
    let err = Schema::from_value(&json!({"required": "id"})).unwrap_err();
    assert_eq!(err.path().to_string(), "required");
  }

  #[test]
  fn test_escape_hatches() {
    let schema = Schema::from_value(&json!({"instanceof": "Date", "x-generic": "T"})).unwrap();
    assert_eq!(schema.instance_of.as_deref(), Some("Date"));
    assert_eq!(schema.generic_parameter.as_deref(), Some("T"));
  }

  #[test]
  fn test_comment_lines() {
    let schema = Schema::from_value(&json!({"title": "Pet", "description": "A pet\nthat lives here"})).unwrap();
    assert_eq!(schema.comment_lines(), vec!["Pet", "", "A pet", "that lives here"]);

    let same = Schema::from_value(&json!({"title": "Pet", "description": "Pet"})).unwrap();
    assert_eq!(same.comment_lines(), vec!["Pet"]);
  }

  #[test]
  fn test_meaningful_keys_ignore_documentation() {
    let excluded = |key: &str| matches!(key, "description" | "title");
    assert!(meaningful_keys(&json!({"$ref": "#/a", "description": "doc"}), excluded).is_empty());
    assert_eq!(meaningful_keys(&json!({"$ref": "#/a", "nullable": true}), excluded), vec!["nullable"]);
    assert_eq!(meaningful_keys(&json!({"type": "string"}), excluded), vec!["type"]);
    assert_eq!(meaningful_keys(&json!({"$ref": "#/a", "maxLength": 3}), excluded), vec!["maxLength"]);
  }

  #[test]
  fn test_deep_merge() {
    let base = json!({
      "type": "object",
      "required": ["id"],
      "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
    });
    let overlay = json!({
      "required": ["name", "id"],
      "properties": {"name": {"maxLength": 10}}
    });
    let merged = deep_merge(base, &overlay);
    assert_eq!(merged["required"], json!(["id", "name"]));
    assert_eq!(merged["properties"]["name"], json!({"type": "string", "maxLength": 10}));
    assert_eq!(merged["properties"]["id"], json!({"type": "integer"}));
  }

  #[test]
  fn test_merge_object_fold() {
    let first = Schema::from_value(&json!({"properties": {"a": {"type": "string"}}, "required": ["a"]})).unwrap();
    let second = Schema::from_value(&json!({"properties": {"b": {"type": "number"}}, "required": ["b", "a"]})).unwrap();
    let merged = [first, second].iter().fold(Schema::default(), merge_object);

    assert_eq!(merged.properties.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(merged.required, vec!["a", "b"]);
    assert!(merged.has_type(SchemaType::Object));
  }

  #[test]
  fn test_type_variants() {
    let nullable = json!({"type": "string", "nullable": true, "maxLength": 3});
    let variants = type_variants(&nullable, &Schema::from_value(&nullable).unwrap()).unwrap();
    assert_eq!(variants, vec![json!({"type": "string", "maxLength": 3}), json!({"type": "null"})]);

    let listed = json!({"type": ["string", "integer"]});
    let variants = type_variants(&listed, &Schema::from_value(&listed).unwrap()).unwrap();
    assert_eq!(variants, vec![json!({"type": "string"}), json!({"type": "integer"})]);

    let single = json!({"type": "string"});
    assert_eq!(type_variants(&single, &Schema::from_value(&single).unwrap()), None);

    let only_null = json!({"type": "null"});
    assert_eq!(type_variants(&only_null, &Schema::from_value(&only_null).unwrap()), None);
  }

  #[test]
  fn test_null_schema() {
    assert_eq!(null_schema(Some("Empty")), json!({"type": "null", "description": "Empty"}));
  }
}

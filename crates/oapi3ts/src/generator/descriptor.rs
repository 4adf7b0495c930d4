use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use super::schema::{Discriminant, Schema};

/// Index of a descriptor in the per-run arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub(crate) usize);

impl fmt::Display for DescriptorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
  pub required: bool,
  pub read_only: bool,
  /// Union of the property's types.
  pub types: Vec<DescriptorId>,
  pub comment: Vec<String>,
  pub default_value: Option<Value>,
  pub example: Option<Value>,
  /// Raw fragment, compared against inherited declarations.
  pub fragment: Value,
}

impl PropertyDescriptor {
  #[must_use]
  pub fn sharpened(&self) -> Self {
    Self {
      required: true,
      ..self.clone()
    }
  }
}

pub type PropertySet = IndexMap<String, PropertyDescriptor>;

#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalShape {
  Any,
  Types(Vec<DescriptorId>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
  /// Alternative property sets; more than one when `oneOf` members were folded in.
  pub property_sets: Vec<PropertySet>,
  pub additional: Option<AdditionalShape>,
}

impl ObjectShape {
  pub fn single_set(&self) -> Option<&PropertySet> {
    match self.property_sets.as_slice() {
      [set] => Some(set),
      _ => None,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.additional.is_none() && self.property_sets.iter().all(IndexMap::is_empty)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItems {
  Any,
  Single(Vec<DescriptorId>),
  Tuple(Vec<Vec<DescriptorId>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumShape {
  pub values: Vec<Value>,
  /// Member names, present when the enum renders as a closed enumeration.
  pub members: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllOfShape {
  /// Object merged from the anonymous members.
  pub local: Option<DescriptorId>,
  /// Named objects kept as `extends` targets.
  pub extends: Vec<DescriptorId>,
  /// Members that cannot merge and render as union branches.
  pub members: Vec<DescriptorId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SomeOfKind {
  OneOf,
  AnyOf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SomeOfShape {
  pub kind: SomeOfKind,
  pub options: Vec<DescriptorId>,
  /// Sibling object keywords shared by every option.
  pub base: Vec<DescriptorId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericBranch {
  pub key: String,
  pub types: Vec<DescriptorId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericShape {
  pub discriminant: Discriminant,
  pub branches: Vec<GenericBranch>,
  pub default_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorKind {
  Object(ObjectShape),
  Array(ArrayItems),
  String,
  Number,
  Boolean,
  Null,
  Enum(EnumShape),
  AllOf(AllOfShape),
  SomeOf(SomeOfShape),
  Generic(GenericShape),
  InstanceOf(String),
  Any,
  /// Placeholder for a path whose conversion was still running when a cycle reached it.
  Forward(String),
}

impl DescriptorKind {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Object(_) => "object",
      Self::Array(_) => "array",
      Self::String => "string",
      Self::Number => "number",
      Self::Boolean => "boolean",
      Self::Null => "null",
      Self::Enum(_) => "enum",
      Self::AllOf(_) => "allOf",
      Self::SomeOf(shape) => match shape.kind {
        SomeOfKind::OneOf => "oneOf",
        SomeOfKind::AnyOf => "anyOf",
      },
      Self::Generic(_) => "generic",
      Self::InstanceOf(_) => "instanceof",
      Self::Any => "any",
      Self::Forward(_) => "forward reference",
    }
  }

  /// Object, array and allOf types need a name to be exported.
  pub fn is_model(&self) -> bool {
    matches!(self, Self::Object(_) | Self::Array(_) | Self::AllOf(_))
  }
}

/// One resulting type.
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct Descriptor {
  pub kind: DescriptorKind,
  #[builder(default)]
  pub schema: Schema,
  #[builder(into)]
  pub model_name: Option<String>,
  #[builder(into)]
  pub suggested_name: Option<String>,
  #[builder(into)]
  pub original_path: Option<String>,
  #[builder(default)]
  pub ancestors: Vec<DescriptorId>,
}

impl Descriptor {
  pub fn is_named(&self) -> bool {
    self.model_name.is_some()
  }

  /// Documentation block lines from `title` and `description`.
  pub fn get_comments(&self) -> Vec<String> {
    self.schema.comment_lines()
  }
}

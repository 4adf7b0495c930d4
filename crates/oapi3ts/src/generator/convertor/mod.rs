//! Schema-to-descriptor conversion.
//!
//! [`Convertor::convert`] is the single entry point: it memoizes every conversion
//! under its canonical path, so a path is converted at most once per run and a cycle
//! reaching a path still being converted gets a forward placeholder instead of recursing.

mod all_of;
mod entry_points;
mod objects;
mod refs;

use itertools::Itertools;
use mediatype::MediaType;
use serde_json::Value;

#[cfg(test)]
pub(crate) use self::entry_points::ConvertedOperation;
use super::{
  config::ConvertorConfig,
  context::{ConversionContext, MemoState},
  descriptor::{
    ArrayItems, Descriptor, DescriptorId, DescriptorKind, EnumShape, GenericBranch, GenericShape, SomeOfKind,
    SomeOfShape,
  },
  errors::{ConversionError, ParsingWarning, WarningKind},
  naming::identifiers::{item_suggestion, to_member_name},
  rules::{Candidate, DescriptorRule, classify},
  schema::{Discriminant, GenericSchema, Schema, SchemaItems, SchemaNode, type_variants, without_keys},
};
use crate::utils::refs::{RefPointer, escape_segment, ref_of};

pub(crate) type ConvertResult = Result<Vec<DescriptorId>, ConversionError>;

/// Supplies fragments that live in documents other than the one being converted.
pub(crate) trait ForeignSchemaResolver {
  fn resolve(&self, pointer: &RefPointer) -> anyhow::Result<Value>;
}

/// Per-call inputs of [`Convertor::convert`].
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct ConvertOptions {
  /// Explicit model name; present for exportable top-level models.
  #[builder(into)]
  pub name: Option<String>,
  /// Fallback name for anonymous types that may be hoisted, such as inline enums.
  #[builder(into)]
  pub suggested_name: Option<String>,
  /// Canonical location of the fragment, also its memo key.
  #[builder(into)]
  pub original_path: Option<String>,
  #[builder(default)]
  pub ancestors: Vec<DescriptorId>,
}

impl ConvertOptions {
  pub(crate) fn base_name(&self) -> Option<&str> {
    self.name.as_deref().or(self.suggested_name.as_deref())
  }

  pub(crate) fn location(&self) -> &str {
    self.original_path.as_deref().unwrap_or("#")
  }

  /// Path of a nested fragment; `None` when this fragment has no path to memoize under.
  pub(crate) fn child_path(&self, segments: &[&str]) -> Option<String> {
    self.original_path.as_deref().map(|path| {
      segments
        .iter()
        .fold(path.to_string(), |acc, segment| format!("{acc}/{}", escape_segment(segment)))
    })
  }

  /// Options for a nested anonymous fragment.
  pub(crate) fn nested(&self, suggested_name: Option<String>, segments: &[&str]) -> Self {
    Self {
      name: None,
      suggested_name,
      original_path: self.child_path(segments),
      ancestors: vec![],
    }
  }
}

/// What [`Convertor::build`] classifies: a parsed fragment or a generic wrapper.
enum Source<'s> {
  Fragment { value: &'s Value, schema: Schema },
  Generic(&'s GenericSchema),
}

pub struct Convertor<'a> {
  document: &'a Value,
  config: &'a ConvertorConfig,
  foreign: Option<&'a dyn ForeignSchemaResolver>,
}

impl<'a> Convertor<'a> {
  pub fn new(document: &'a Value, config: &'a ConvertorConfig) -> Self {
    Self {
      document,
      config,
      foreign: None,
    }
  }

  #[must_use]
  pub fn with_foreign_resolver(mut self, resolver: &'a dyn ForeignSchemaResolver) -> Self {
    self.foreign = Some(resolver);
    self
  }

  #[cfg(test)]
  pub fn document(&self) -> &'a Value {
    self.document
  }

  /// Converts one schema node into the descriptors of its type (more than one for a union).
  pub fn convert(&self, ctx: &mut ConversionContext, node: &SchemaNode, options: ConvertOptions) -> ConvertResult {
    self.memoized(ctx, options, |this, ctx, options| match node {
      SchemaNode::Fragment(value) => this.convert_value(ctx, value, options),
      SchemaNode::Generic(generic) => this.build(ctx, Source::Generic(generic), options),
    })
  }

  /// Memoized conversion of a raw fragment.
  pub(crate) fn convert_at(&self, ctx: &mut ConversionContext, value: &Value, options: ConvertOptions) -> ConvertResult {
    self.memoized(ctx, options, |this, ctx, options| this.convert_value(ctx, value, options))
  }

  fn memoized(
    &self,
    ctx: &mut ConversionContext,
    options: ConvertOptions,
    convert: impl FnOnce(&Self, &mut ConversionContext, ConvertOptions) -> ConvertResult,
  ) -> ConvertResult {
    let Some(path) = options.original_path.clone() else {
      return convert(self, ctx, options);
    };

    match ctx.memo_state(&path) {
      MemoState::Complete(ids) => return Ok(ids),
      MemoState::InProgress => return Ok(vec![ctx.forward(&path)]),
      MemoState::Fresh => {}
    }

    ctx.begin(&path);
    match convert(self, ctx, options) {
      Ok(ids) => {
        ctx.finish(&path, ids.clone());
        Ok(ids)
      }
      Err(err) => {
        ctx.abandon(&path);
        Err(err)
      }
    }
  }

  pub(crate) fn convert_value(&self, ctx: &mut ConversionContext, value: &Value, options: ConvertOptions) -> ConvertResult {
    match value {
      Value::Object(_) => match ref_of(value) {
        Some(reference) => self.convert_ref(ctx, value, reference, options),
        None => self.convert_fragment(ctx, value, options),
      },
      Value::Bool(_) => Ok(vec![self.insert(ctx, DescriptorKind::Any, Schema::default(), options)]),
      other => {
        ctx.diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::MalformedSchema)
            .message(format!("expected a schema object, found `{other}`"))
            .json_path(options.location())
            .build(),
        )?;
        Ok(vec![self.insert(ctx, DescriptorKind::Any, Schema::default(), options)])
      }
    }
  }

  fn convert_fragment(&self, ctx: &mut ConversionContext, value: &Value, options: ConvertOptions) -> ConvertResult {
    let schema = match Schema::from_value(value) {
      Ok(schema) => schema,
      Err(err) => {
        ctx.diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::MalformedSchema)
            .message("schema does not parse, treating it as any")
            .json_path(format!("{}/{}", options.location(), err.path()))
            .original_error(err.inner().to_string())
            .build(),
        )?;
        return Ok(vec![self.insert(ctx, DescriptorKind::Any, Schema::default(), options)]);
      }
    };

    match type_variants(value, &schema) {
      Some(variants) => self.convert_variants(ctx, schema, &variants, options),
      None => self.build(ctx, Source::Fragment { value, schema }, options),
    }
  }

  /// Converts each type of a multi-typed or nullable fragment; a named one becomes a named union.
  fn convert_variants(
    &self,
    ctx: &mut ConversionContext,
    schema: Schema,
    variants: &[Value],
    options: ConvertOptions,
  ) -> ConvertResult {
    let mut ids = Vec::new();
    for variant in variants {
      let variant_options = ConvertOptions {
        name: None,
        suggested_name: options.base_name().map(str::to_string),
        original_path: None,
        ancestors: options.ancestors.clone(),
      };
      ids.extend(self.convert_value(ctx, variant, variant_options)?);
    }

    if options.name.is_none() {
      return Ok(ids);
    }

    let shape = SomeOfShape {
      kind: SomeOfKind::OneOf,
      options: ids,
      base: vec![],
    };
    Ok(vec![self.insert(ctx, DescriptorKind::SomeOf(shape), schema, options)])
  }

  /// Classifies `source` with the rule table and builds the descriptor of the winning rule.
  fn build(&self, ctx: &mut ConversionContext, source: Source<'_>, options: ConvertOptions) -> ConvertResult {
    let unclassified = || ConversionError::Unclassified {
      json_path: options.location().to_string(),
    };
    let candidate = match &source {
      Source::Fragment { schema, .. } => Candidate::Fragment(schema),
      Source::Generic(generic) => Candidate::Generic(generic),
    };
    let rule = classify(&candidate).ok_or_else(unclassified)?;

    let (value, schema) = match source {
      Source::Generic(generic) if rule == DescriptorRule::Generic => return self.convert_generic(ctx, generic, options),
      Source::Generic(_) => return Err(unclassified()),
      Source::Fragment { value, schema } => (value, schema),
    };

    let kind = match rule {
      DescriptorRule::OneOf => return self.build_some_of(ctx, value, schema, SomeOfKind::OneOf, options),
      DescriptorRule::AnyOf => return self.build_some_of(ctx, value, schema, SomeOfKind::AnyOf, options),
      DescriptorRule::AllOf => return self.build_all_of(ctx, value, schema, options),
      DescriptorRule::Object => return self.build_object(ctx, schema, options),
      DescriptorRule::Array => return self.build_array(ctx, schema, options),
      DescriptorRule::Enum => return Ok(vec![self.build_enum(ctx, schema, options)]),
      DescriptorRule::Number => DescriptorKind::Number,
      DescriptorRule::String => DescriptorKind::String,
      DescriptorRule::Boolean => DescriptorKind::Boolean,
      DescriptorRule::Null => DescriptorKind::Null,
      DescriptorRule::InstanceOf => DescriptorKind::InstanceOf(
        schema
          .instance_of
          .clone()
          .or_else(|| schema.generic_parameter.clone())
          .unwrap_or_default(),
      ),
      DescriptorRule::Any => DescriptorKind::Any,
      DescriptorRule::Generic => return Err(unclassified()),
    };

    Ok(vec![self.insert(ctx, kind, schema, options)])
  }

  pub(crate) fn insert(
    &self,
    ctx: &mut ConversionContext,
    kind: DescriptorKind,
    schema: Schema,
    options: ConvertOptions,
  ) -> DescriptorId {
    ctx.insert(Descriptor {
      kind,
      schema,
      model_name: options.name,
      suggested_name: options.suggested_name,
      original_path: options.original_path,
      ancestors: options.ancestors,
    })
  }

  fn build_array(&self, ctx: &mut ConversionContext, schema: Schema, options: ConvertOptions) -> ConvertResult {
    let item_name = options.base_name().map(item_suggestion);
    let items = match &schema.items {
      None => ArrayItems::Any,
      Some(SchemaItems::Single(item)) => {
        ArrayItems::Single(self.convert_at(ctx, item, options.nested(item_name, &["items"]))?)
      }
      Some(SchemaItems::Tuple(items)) => {
        let mut converted = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
          let index = index.to_string();
          converted.push(self.convert_at(ctx, item, options.nested(item_name.clone(), &["items", &index]))?);
        }
        ArrayItems::Tuple(converted)
      }
    };

    Ok(vec![self.insert(ctx, DescriptorKind::Array(items), schema, options)])
  }

  /// An enum whose values all map to distinct identifiers becomes a closed enumeration;
  /// an anonymous one with a suggested name is hoisted under that name.
  fn build_enum(&self, ctx: &mut ConversionContext, schema: Schema, mut options: ConvertOptions) -> DescriptorId {
    let values = schema.enum_values.clone().unwrap_or_default();
    let members = enum_member_names(&values);

    if options.name.is_none()
      && members.is_some()
      && let Some(suggested) = options.suggested_name.as_deref()
    {
      options.name = Some(ctx.names.claim(suggested));
    }

    self.insert(ctx, DescriptorKind::Enum(EnumShape { values, members }), schema, options)
  }

  fn build_some_of(
    &self,
    ctx: &mut ConversionContext,
    value: &Value,
    schema: Schema,
    kind: SomeOfKind,
    options: ConvertOptions,
  ) -> ConvertResult {
    let (members, keyword) = match kind {
      SomeOfKind::OneOf => (&schema.one_of, "oneOf"),
      SomeOfKind::AnyOf => (&schema.any_of, "anyOf"),
    };

    let mut option_ids = Vec::new();
    for (index, member) in members.iter().enumerate() {
      let index = index.to_string();
      let member_options = options.nested(options.base_name().map(str::to_string), &[keyword, &index]);
      let member_path = format!("{}/{keyword}/{index}", options.location());
      let ids = self
        .convert_at(ctx, member, member_options)
        .map_err(|err| err.within_member(&member_path))?;
      option_ids.extend(ids);
    }

    let base = if schema.properties.is_empty() && schema.required.is_empty() {
      vec![]
    } else {
      let shared = without_keys(value, &[keyword, "title", "description", "nullable"]);
      let base_options = ConvertOptions {
        suggested_name: options.base_name().map(str::to_string),
        ..ConvertOptions::default()
      };
      self.convert_value(ctx, &shared, base_options)?
    };

    let shape = SomeOfShape {
      kind,
      options: option_ids,
      base,
    };
    Ok(vec![self.insert(ctx, DescriptorKind::SomeOf(shape), schema, options)])
  }

  fn convert_generic(&self, ctx: &mut ConversionContext, generic: &GenericSchema, options: ConvertOptions) -> ConvertResult {
    let mut branches = Vec::with_capacity(generic.branches.len());
    for (key, node) in &generic.branches {
      let branch_path = format!("{}/{}", options.location(), escape_segment(key));
      if !self.accepts_branch_key(ctx, generic.discriminant, key, &branch_path)? {
        continue;
      }

      let branch_options = options.nested(options.base_name().map(str::to_string), &[key]);
      let types = self.convert(ctx, node, branch_options)?;
      branches.push(GenericBranch {
        key: key.clone(),
        types,
      });
    }

    let default_key = match generic.discriminant {
      Discriminant::StatusCode => branches
        .iter()
        .find(|branch| branch.key.len() == 3 && branch.key.starts_with('2') && branch.key.parse::<u16>().is_ok())
        .or_else(|| branches.first())
        .map(|branch| branch.key.clone()),
      Discriminant::ContentType => branches
        .iter()
        .find(|branch| branch.key == self.config.default_content_type)
        .or_else(|| branches.first())
        .map(|branch| branch.key.clone()),
    };

    let shape = GenericShape {
      discriminant: generic.discriminant,
      branches,
      default_key,
    };
    let schema = Schema {
      description: generic.description.clone(),
      ..Schema::default()
    };
    Ok(vec![self.insert(ctx, DescriptorKind::Generic(shape), schema, options)])
  }

  /// Status keys must be `default`, a range like `4XX` or a known status code; invalid
  /// ones are skipped. Media types are only validated, an invalid one is still kept.
  fn accepts_branch_key(
    &self,
    ctx: &mut ConversionContext,
    discriminant: Discriminant,
    key: &str,
    json_path: &str,
  ) -> Result<bool, ConversionError> {
    match discriminant {
      Discriminant::StatusCode if is_status_key(key) => Ok(true),
      Discriminant::StatusCode => {
        ctx.diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::InvalidStatusCode)
            .message(format!("'{key}' is not a status code, response skipped"))
            .json_path(json_path)
            .build(),
        )?;
        Ok(false)
      }
      Discriminant::ContentType => {
        if !key.contains('*')
          && let Err(err) = MediaType::parse(key)
        {
          ctx.diagnostics.warn(
            ParsingWarning::builder()
              .kind(WarningKind::InvalidContentType)
              .message(format!("'{key}' is not a valid media type"))
              .json_path(json_path)
              .original_error(err.to_string())
              .build(),
          )?;
        }
        Ok(true)
      }
    }
  }
}

pub(crate) fn is_status_key(key: &str) -> bool {
  if key == "default" {
    return true;
  }
  let bytes = key.as_bytes();
  if bytes.len() == 3 && matches!(bytes[0], b'1'..=b'5') && bytes[1..].eq_ignore_ascii_case(b"XX") {
    return true;
  }
  key.len() == 3 && key.parse::<u16>().is_ok_and(|code| http::StatusCode::from_u16(code).is_ok())
}

fn enum_member_names(values: &[Value]) -> Option<Vec<String>> {
  let names = values
    .iter()
    .map(|value| value.as_str().and_then(to_member_name))
    .collect::<Option<Vec<_>>>()?;

  names.iter().all_unique().then_some(names)
}

use std::collections::HashSet;

use serde_json::Value;

use super::{ConvertOptions, ConvertResult, Convertor};
use crate::generator::{
  context::ConversionContext,
  descriptor::{AdditionalShape, DescriptorId, DescriptorKind, ObjectShape, PropertyDescriptor, PropertySet},
  errors::ConversionError,
  naming::identifiers::property_suggestion,
  schema::{AdditionalProperties, Schema, SchemaType},
};

impl Convertor<'_> {
  /// Builds an object descriptor.
  ///
  /// With ancestors, properties whose fragment is identical to an inherited declaration
  /// are left to the ancestor; a name required here but optional there is re-declared
  /// as required.
  pub(super) fn build_object(&self, ctx: &mut ConversionContext, schema: Schema, options: ConvertOptions) -> ConvertResult {
    let inherited = inherited_properties(ctx, &options.ancestors);
    let parent = options.base_name().map(str::to_string);

    let mut set = PropertySet::new();
    for (key, fragment) in &schema.properties {
      let required = schema.required.contains(key);
      if let Some(existing) = inherited.get(key)
        && existing.fragment == *fragment
      {
        if required && !existing.required {
          set.insert(key.clone(), existing.sharpened());
        }
        continue;
      }

      let property = self.convert_property(ctx, key, fragment, required, parent.as_deref(), &options)?;
      set.insert(key.clone(), property);
    }

    for name in &schema.required {
      if !schema.properties.contains_key(name)
        && let Some(existing) = inherited.get(name)
        && !existing.required
      {
        set.insert(name.clone(), existing.sharpened());
      }
    }

    let additional = self.convert_additional(ctx, &schema, parent.as_deref(), &options)?;
    let shape = ObjectShape {
      property_sets: vec![set],
      additional,
    };
    Ok(vec![self.insert(ctx, DescriptorKind::Object(shape), schema, options)])
  }

  fn convert_property(
    &self,
    ctx: &mut ConversionContext,
    key: &str,
    fragment: &Value,
    required: bool,
    parent: Option<&str>,
    options: &ConvertOptions,
  ) -> Result<PropertyDescriptor, ConversionError> {
    let property_options = options.nested(parent.map(|parent| property_suggestion(parent, key)), &["properties", key]);
    let types = self.convert_at(ctx, fragment, property_options)?;
    let schema = Schema::from_value(fragment).unwrap_or_default();

    Ok(PropertyDescriptor {
      required,
      read_only: schema.is_read_only(),
      types,
      comment: schema.comment_lines(),
      default_value: schema.default_value,
      example: schema.example,
      fragment: fragment.clone(),
    })
  }

  /// `additionalProperties: true` or a bare `type: object` allow any extra key;
  /// a schema value types them.
  fn convert_additional(
    &self,
    ctx: &mut ConversionContext,
    schema: &Schema,
    parent: Option<&str>,
    options: &ConvertOptions,
  ) -> Result<Option<AdditionalShape>, ConversionError> {
    let additional = match &schema.additional_properties {
      Some(AdditionalProperties::Allowed(true)) => Some(AdditionalShape::Any),
      Some(AdditionalProperties::Allowed(false)) => None,
      Some(AdditionalProperties::Schema(fragment)) => {
        let value_options = options.nested(parent.map(|parent| format!("{parent}Value")), &["additionalProperties"]);
        Some(AdditionalShape::Types(self.convert_at(ctx, fragment, value_options)?))
      }
      None
        if schema.properties.is_empty()
          && schema.required.is_empty()
          && schema.has_type(SchemaType::Object)
          && options.ancestors.is_empty() =>
      {
        Some(AdditionalShape::Any)
      }
      None => None,
    };
    Ok(additional)
  }
}

/// Every property the given ancestors declare, nearest declaration last.
pub(super) fn inherited_properties(ctx: &ConversionContext, ancestors: &[DescriptorId]) -> PropertySet {
  let mut properties = PropertySet::new();
  let mut visited = HashSet::new();
  for ancestor in ancestors {
    collect_properties(ctx, *ancestor, &mut properties, &mut visited);
  }
  properties
}

fn collect_properties(
  ctx: &ConversionContext,
  id: DescriptorId,
  properties: &mut PropertySet,
  visited: &mut HashSet<DescriptorId>,
) {
  if !visited.insert(id) {
    return;
  }

  let descriptor = ctx.get(id);
  match &descriptor.kind {
    DescriptorKind::Object(shape) => {
      for ancestor in &descriptor.ancestors {
        collect_properties(ctx, *ancestor, properties, visited);
      }
      if let Some(set) = shape.single_set() {
        for (key, property) in set {
          properties.insert(key.clone(), property.clone());
        }
      }
    }
    DescriptorKind::AllOf(shape) => {
      for extended in &shape.extends {
        collect_properties(ctx, *extended, properties, visited);
      }
      if let Some(local) = shape.local {
        collect_properties(ctx, local, properties, visited);
      }
    }
    DescriptorKind::Forward(_) => {
      for resolved in ctx.resolve(id) {
        collect_properties(ctx, resolved, properties, visited);
      }
    }
    _ => {}
  }
}

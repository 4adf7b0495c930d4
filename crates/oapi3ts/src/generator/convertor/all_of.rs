use serde_json::Value;

use super::{ConvertOptions, ConvertResult, Convertor, objects::inherited_properties};
use crate::generator::{
  context::ConversionContext,
  descriptor::{AdditionalShape, AllOfShape, Descriptor, DescriptorId, DescriptorKind, ObjectShape, PropertySet},
  schema::{Schema, merge_object, without_keys},
};

/// State threaded through the `allOf` member fold. Each step consumes the accumulator
/// and returns the next one.
#[derive(Debug, Clone)]
struct AllOfAccumulator {
  schema: Schema,
  property_sets: Vec<PropertySet>,
  additional: Option<AdditionalShape>,
  required: Vec<String>,
  extends: Vec<DescriptorId>,
  members: Vec<DescriptorId>,
}

impl AllOfAccumulator {
  fn new(ancestors: &[DescriptorId]) -> Self {
    Self {
      schema: Schema::default(),
      property_sets: vec![PropertySet::new()],
      additional: None,
      required: vec![],
      extends: ancestors.to_vec(),
      members: vec![],
    }
  }

  /// Folds one converted member.
  ///
  /// Anonymous objects merge into the local object, named objects become `extends`
  /// targets, an anonymous `oneOf`/`anyOf` of anonymous objects multiplies the local
  /// property sets and documentation-only members vanish. Everything else stays a
  /// separate union branch.
  fn fold(self, ctx: &ConversionContext, id: DescriptorId) -> Self {
    let descriptor = ctx.get(id);
    match &descriptor.kind {
      DescriptorKind::Object(shape) if !descriptor.is_named() => self.merge_object(descriptor, shape),
      DescriptorKind::AllOf(shape) if !descriptor.is_named() => {
        let nested = shape.clone();
        let mut acc = self;
        for extended in nested.extends {
          acc = acc.extend(ctx, extended);
        }
        if let Some(local) = nested.local {
          acc = acc.fold(ctx, local);
        }
        nested.members.into_iter().fold(acc, |acc, member| acc.fold(ctx, member))
      }
      DescriptorKind::SomeOf(shape)
        if !descriptor.is_named() && shape.base.is_empty() && anonymous_objects(ctx, &shape.options) =>
      {
        self.branch(ctx, &shape.options)
      }
      DescriptorKind::Any if !descriptor.is_named() && descriptor.schema.is_untyped() => self,
      DescriptorKind::Object(_) | DescriptorKind::AllOf(_) | DescriptorKind::Forward(_) => self.extend(ctx, id),
      _ => {
        let mut acc = self;
        acc.members.push(id);
        acc
      }
    }
  }

  fn merge_object(mut self, descriptor: &Descriptor, shape: &ObjectShape) -> Self {
    self.schema = merge_object(self.schema, &descriptor.schema);
    self.property_sets = cross_merge(&self.property_sets, &shape.property_sets);
    self.additional = self.additional.or_else(|| shape.additional.clone());
    for name in &descriptor.schema.required {
      if !self.required.contains(name) {
        self.required.push(name.clone());
      }
    }
    for ancestor in &descriptor.ancestors {
      if !self.extends.contains(ancestor) {
        self.extends.push(*ancestor);
      }
    }
    self
  }

  /// Adds an `extends` target unless an existing one already inherits it.
  fn extend(mut self, ctx: &ConversionContext, id: DescriptorId) -> Self {
    let already_inherited = self.extends.iter().any(|existing| {
      *existing == id
        || matches!(&ctx.get(*existing).kind, DescriptorKind::AllOf(shape) if shape.extends.contains(&id))
        || ctx.get(*existing).ancestors.contains(&id)
    });
    if !already_inherited {
      self.extends.push(id);
    }
    self
  }

  fn branch(mut self, ctx: &ConversionContext, options: &[DescriptorId]) -> Self {
    let alternatives = options
      .iter()
      .filter_map(|option| match &ctx.get(*option).kind {
        DescriptorKind::Object(shape) => Some(shape.property_sets.clone()),
        _ => None,
      })
      .flatten()
      .collect::<Vec<_>>();
    self.property_sets = cross_merge(&self.property_sets, &alternatives);
    self
  }

  /// Applies the collected `required` names and drops properties the `extends`
  /// targets already declare identically.
  fn finish(mut self, ctx: &ConversionContext) -> Self {
    let inherited = inherited_properties(ctx, &self.extends);
    for set in &mut self.property_sets {
      for name in &self.required {
        if let Some(property) = set.get_mut(name) {
          property.required = true;
        } else if let Some(existing) = inherited.get(name)
          && !existing.required
        {
          set.insert(name.clone(), existing.sharpened());
        }
      }

      set.retain(|name, property| {
        !inherited
          .get(name)
          .is_some_and(|existing| existing.fragment == property.fragment && existing.required == property.required)
      });
    }
    self
  }

  fn local_shape(&self) -> Option<ObjectShape> {
    let shape = ObjectShape {
      property_sets: self.property_sets.clone(),
      additional: self.additional.clone(),
    };
    (!shape.is_empty()).then_some(shape)
  }
}

impl Convertor<'_> {
  pub(super) fn build_all_of(
    &self,
    ctx: &mut ConversionContext,
    value: &Value,
    schema: Schema,
    options: ConvertOptions,
  ) -> ConvertResult {
    let suggested = options.base_name().map(str::to_string);
    let mut acc = AllOfAccumulator::new(&options.ancestors);

    for (index, member) in schema.all_of.iter().enumerate() {
      let index = index.to_string();
      let member_path = format!("{}/allOf/{index}", options.location());
      let ids = self
        .convert_at(ctx, member, options.nested(suggested.clone(), &["allOf", &index]))
        .map_err(|err| err.within_member(&member_path))?;
      acc = ids.into_iter().fold(acc, |acc, id| acc.fold(ctx, id));
    }

    if !schema.properties.is_empty() || !schema.required.is_empty() || schema.additional_properties.is_some() {
      let siblings = without_keys(value, &["allOf", "title", "description", "example", "default"]);
      let sibling_options = ConvertOptions {
        suggested_name: suggested,
        ..ConvertOptions::default()
      };
      let ids = self.convert_value(ctx, &siblings, sibling_options)?;
      acc = ids.into_iter().fold(acc, |acc, id| acc.fold(ctx, id));
    }

    let acc = acc.finish(ctx);
    let local = acc.local_shape().map(|shape| {
      ctx.insert(
        Descriptor::builder()
          .kind(DescriptorKind::Object(shape))
          .schema(acc.schema.clone())
          .ancestors(acc.extends.clone())
          .build(),
      )
    });

    let shape = AllOfShape {
      local,
      extends: acc.extends,
      members: acc.members,
    };
    Ok(vec![self.insert(ctx, DescriptorKind::AllOf(shape), schema, options)])
  }
}

fn anonymous_objects(ctx: &ConversionContext, ids: &[DescriptorId]) -> bool {
  !ids.is_empty()
    && ids.iter().all(|id| {
      let descriptor = ctx.get(*id);
      !descriptor.is_named() && matches!(descriptor.kind, DescriptorKind::Object(_))
    })
}

/// Cross product of two lists of alternative property sets; later declarations win.
fn cross_merge(current: &[PropertySet], incoming: &[PropertySet]) -> Vec<PropertySet> {
  if incoming.is_empty() {
    return current.to_vec();
  }

  current
    .iter()
    .flat_map(|base| {
      incoming.iter().map(move |extra| {
        let mut merged = base.clone();
        for (key, property) in extra {
          let required = property.required || merged.get(key).is_some_and(|existing| existing.required);
          let mut property = property.clone();
          property.required = required;
          merged.insert(key.clone(), property);
        }
        merged
      })
    })
    .collect()
}

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::generator::{
  config::ConvertorConfig,
  context::ConversionContext,
  convertor::{ConvertOptions, Convertor},
  descriptor::{Descriptor, DescriptorId, DescriptorKind, ObjectShape, PropertyDescriptor},
  errors::Diagnostics,
  render::{RenderedModel, Renderer},
};

/// A minimal document holding only `components.schemas`.
pub(super) fn components(schemas: Value) -> Value {
  json!({
    "openapi": "3.0.3",
    "info": { "title": "Test API", "version": "1.0.0" },
    "paths": {},
    "components": { "schemas": schemas }
  })
}

pub(super) fn new_context(config: &ConvertorConfig) -> ConversionContext {
  ConversionContext::new(Diagnostics::new(config.warnings_fatal))
}

/// Converts `components.schemas.<name>` as a named root.
pub(super) fn convert_component(
  convertor: &Convertor<'_>,
  ctx: &mut ConversionContext,
  name: &str,
) -> Vec<DescriptorId> {
  let path = format!("#/components/schemas/{name}");
  let model_name = ctx.names.assign(&path, name);
  let schema = convertor
    .document()
    .pointer(&format!("/components/schemas/{name}"))
    .unwrap_or_else(|| panic!("schema '{name}' should exist"));
  let options = ConvertOptions::builder().name(model_name).original_path(path).build();
  convertor
    .convert_at(ctx, schema, options)
    .expect("conversion should succeed")
}

/// Converts the named components with the default configuration and renders them.
pub(super) fn render_components(document: &Value, names: &[&str]) -> String {
  let config = ConvertorConfig::default();
  let convertor = Convertor::new(document, &config);
  let mut ctx = new_context(&config);
  let roots = names
    .iter()
    .flat_map(|name| convert_component(&convertor, &mut ctx, name))
    .collect::<Vec<_>>();
  render_code(&ctx, &roots)
}

pub(super) fn render_models(ctx: &ConversionContext, roots: &[DescriptorId]) -> Vec<RenderedModel> {
  let mut models = Vec::new();
  Renderer::new(ctx)
    .render_recursive(roots, &mut HashSet::new(), &mut |model| models.push(model))
    .expect("rendering should succeed");
  models
}

pub(super) fn render_code(ctx: &ConversionContext, roots: &[DescriptorId]) -> String {
  render_models(ctx, roots)
    .into_iter()
    .map(|model| model.code)
    .collect::<Vec<_>>()
    .join("\n\n")
}

pub(super) fn single(ids: &[DescriptorId]) -> DescriptorId {
  assert_eq!(ids.len(), 1, "expected exactly one descriptor, got {ids:?}");
  ids[0]
}

pub(super) fn object_shape(descriptor: &Descriptor) -> &ObjectShape {
  match &descriptor.kind {
    DescriptorKind::Object(shape) => shape,
    other => panic!("expected an object descriptor, got {}", other.label()),
  }
}

pub(super) fn property<'d>(descriptor: &'d Descriptor, name: &str) -> &'d PropertyDescriptor {
  object_shape(descriptor)
    .single_set()
    .and_then(|set| set.get(name))
    .unwrap_or_else(|| panic!("property '{name}' should exist"))
}

pub(super) fn assert_contains(code: &str, expected: &str, context: &str) {
  assert!(
    code.contains(expected),
    "missing {context}: expected '{expected}' in:\n{code}"
  );
}

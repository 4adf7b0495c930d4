use std::borrow::Cow;

use serde_json::Value;

use super::{ConvertOptions, ConvertResult, Convertor};
use crate::{
  generator::{
    context::ConversionContext,
    descriptor::{DescriptorId, DescriptorKind, SomeOfKind, SomeOfShape},
    errors::{ConversionError, ParsingWarning, WarningKind},
    naming::identifiers::to_type_name,
    schema::{Schema, deep_merge, meaningful_keys, null_schema, without_keys},
  },
  utils::refs::{RefPointer, resolve_pointer},
};

/// Keywords that keep a `$ref` a reference; the property or union using it applies them.
const REFERENCE_FLAGS: &[&str] = &["nullable", "readOnly", "writeOnly"];

impl<'a> Convertor<'a> {
  /// Converts a fragment carrying `$ref`.
  ///
  /// The target is converted once under its canonical path and its own model name.
  /// A bare reference resolves to the target's descriptors, or to a structurally
  /// identical copy extending the target when an explicit name is requested. Flags such
  /// as `readOnly` keep the reference; other extra keywords are merged over the target
  /// and converted with the target as ancestor. A chain of references leading back to
  /// this fragment is a warning and becomes `any`.
  pub(super) fn convert_ref(
    &self,
    ctx: &mut ConversionContext,
    value: &Value,
    reference: &str,
    options: ConvertOptions,
  ) -> ConvertResult {
    let pointer = RefPointer::parse(reference, &self.config.json_path_regex);
    let Some(target) = self.lookup(ctx, &pointer, reference, &options)? else {
      let schema = Schema::from_value(&without_keys(value, &["$ref"])).unwrap_or_default();
      return Ok(vec![self.insert(ctx, DescriptorKind::Any, schema, options)]);
    };

    let target_path = pointer.canonical();
    let base_name = to_type_name(&pointer.model_name().unwrap_or_default());
    let target_name = ctx.names.assign(&target_path, &base_name);
    let target_options = ConvertOptions::builder()
      .name(target_name)
      .original_path(target_path)
      .build();
    let target_ids = self.convert_at(ctx, &target, target_options)?;

    if let Some(own_path) = options.original_path.as_deref()
      && refers_back(ctx, &target_ids, own_path)
    {
      ctx.diagnostics.warn(
        ParsingWarning::builder()
          .kind(WarningKind::UnresolvedRef)
          .message("reference cycle without a concrete schema, treating it as any")
          .json_path(own_path)
          .related_ref(reference)
          .build(),
      )?;
      let schema = Schema::from_value(&without_keys(value, &["$ref"])).unwrap_or_default();
      return Ok(vec![self.insert(ctx, DescriptorKind::Any, schema, options)]);
    }

    let extras = meaningful_keys(value, |key| self.config.is_excluded_key(key));
    if !extras.iter().all(|key| REFERENCE_FLAGS.contains(key)) {
      let overlay = without_keys(value, &["$ref"]);
      let merged = deep_merge(target.into_owned(), &overlay);
      let extended = ConvertOptions {
        ancestors: target_ids,
        ..options
      };
      return self.convert_value(ctx, &merged, extended);
    }

    let nullable = value.get("nullable").and_then(Value::as_bool).unwrap_or(false);
    if !nullable {
      let rename = options.name.is_some() && !self.config.implicit_types_ref_replacement;
      let settled = target_ids
        .iter()
        .all(|id| !matches!(ctx.get(*id).kind, DescriptorKind::Forward(_)));
      if rename && settled {
        let renamed = ConvertOptions {
          ancestors: target_ids,
          ..options
        };
        return self.convert_value(ctx, &target, renamed);
      }
      return Ok(target_ids);
    }

    let mut ids = target_ids;
    ids.extend(self.convert_value(ctx, &null_schema(None), ConvertOptions::default())?);
    if options.name.is_none() {
      return Ok(ids);
    }
    let shape = SomeOfShape {
      kind: SomeOfKind::OneOf,
      options: ids,
      base: vec![],
    };
    let schema = Schema::from_value(&without_keys(value, &["$ref"])).unwrap_or_default();
    Ok(vec![self.insert(ctx, DescriptorKind::SomeOf(shape), schema, options)])
  }

  /// Finds the fragment a pointer names, locally or through the foreign resolver.
  ///
  /// A missing local target is a warning and yields `None`; external targets need a
  /// resolver and any resolver failure is an error.
  fn lookup(
    &self,
    ctx: &mut ConversionContext,
    pointer: &RefPointer,
    reference: &str,
    options: &ConvertOptions,
  ) -> Result<Option<Cow<'a, Value>>, ConversionError> {
    if pointer.is_external() {
      let resolver = self.foreign.ok_or_else(|| ConversionError::MissingForeignResolver {
        reference: reference.to_string(),
      })?;
      return resolver
        .resolve(pointer)
        .map(|value| Some(Cow::Owned(value)))
        .map_err(|err| ConversionError::ForeignResolution {
          reference: reference.to_string(),
          message: format!("{err:#}"),
        });
    }

    match resolve_pointer(self.document, &pointer.pointer) {
      Some(target) => Ok(Some(Cow::Borrowed(target))),
      None => {
        ctx.diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::UnresolvedRef)
            .message("reference target not found, treating it as any")
            .json_path(options.location())
            .related_ref(reference)
            .build(),
        )?;
        Ok(None)
      }
    }
  }
}

/// True when `ids` are placeholders waiting for `path` itself, so the reference can never settle.
fn refers_back(ctx: &ConversionContext, ids: &[DescriptorId], path: &str) -> bool {
  !ids.is_empty()
    && ids
      .iter()
      .all(|id| matches!(&ctx.get(*id).kind, DescriptorKind::Forward(forward) if forward == path))
}

//! Orchestration of the OpenAPI to TypeScript pipeline.
//!
//! [`Orchestrator`] runs operation extraction, conversion, recursive rendering and the
//! final formatting pass over one document.
//!
//! ## Usage
//!
//! ```ignore
//! let document: serde_json::Value = serde_json::from_str(&std::fs::read_to_string("openapi.json")?)?;
//! let mut orchestrator = Orchestrator::new(document, ConvertorConfig::default());
//! let output = orchestrator.generate_with_header("openapi.json")?;
//! std::fs::write("models.ts", output.code)?;
//! ```

use std::collections::HashSet;

use anyhow::Context;
use itertools::Itertools;
use oas3::spec::Info;
use serde_json::Value;

use super::{
  config::ConvertorConfig,
  context::ConversionContext,
  convertor::{ConvertOptions, Convertor},
  descriptor::DescriptorId,
  errors::{ConversionError, Diagnostics, WarningSink},
  metrics::{GenerationStats, detect_cycles},
  naming::identifiers::to_type_name,
  operations::ApiMetaInfo,
  render::Renderer,
};
use crate::utils::{refs::child_path, spec::ExternalDocuments, text::format_output};

const COMPONENT_SCHEMAS: &str = "#/components/schemas";

/// Metadata about the API for the generated file header.
#[derive(Debug, Clone)]
pub struct CodeMetadata {
  pub title: String,
  pub version: String,
  pub description: Option<String>,
}

/// Everything one run produces.
#[derive(Debug)]
pub struct GenerationOutput {
  pub code: String,
  pub operations: Vec<ApiMetaInfo>,
  pub stats: GenerationStats,
}

pub struct Orchestrator {
  document: Value,
  config: ConvertorConfig,
  external: Option<ExternalDocuments>,
  sink: Option<WarningSink>,
}

impl Orchestrator {
  pub fn new(document: Value, config: ConvertorConfig) -> Self {
    Self {
      document,
      config,
      external: None,
      sink: None,
    }
  }

  #[must_use]
  pub fn with_external_documents(mut self, documents: ExternalDocuments) -> Self {
    self.external = Some(documents);
    self
  }

  /// Forwards each warning to `sink` as soon as it is raised.
  #[must_use]
  pub fn with_warning_sink(mut self, sink: WarningSink) -> Self {
    self.sink = Some(sink);
    self
  }

  /// Reads `info` from the document.
  pub fn metadata(&self) -> anyhow::Result<CodeMetadata> {
    let info = self
      .document
      .get("info")
      .cloned()
      .ok_or_else(|| ConversionError::InvalidDocument {
        message: "the document has no 'info' object".to_string(),
      })?;
    let info = serde_json::from_value::<Info>(info).context("failed to parse the 'info' object")?;

    Ok(CodeMetadata {
      title: info.title,
      version: info.version,
      description: info.description,
    })
  }

  /// Generates the TypeScript declarations of every operation's entry points and their
  /// dependencies, plus every component schema when `include_all_schemas` is set.
  ///
  /// The code carries no file header, see [`Orchestrator::generate_with_header`].
  pub fn generate(&mut self) -> anyhow::Result<GenerationOutput> {
    let mut diagnostics = Diagnostics::new(self.config.warnings_fatal);
    if let Some(sink) = self.sink.take() {
      diagnostics = diagnostics.with_sink(sink);
    }
    let mut ctx = ConversionContext::new(diagnostics);

    let mut convertor = Convertor::new(&self.document, &self.config);
    if let Some(external) = &self.external {
      convertor = convertor.with_foreign_resolver(external);
    }

    let operations = convertor.get_entry_points(&mut ctx)?;
    let mut roots = operations
      .iter()
      .flat_map(|operation| operation.entry_points.iter().copied())
      .collect::<Vec<_>>();
    if self.config.include_all_schemas {
      roots.extend(self.component_roots(&convertor, &mut ctx)?);
    }

    let mut models = Vec::new();
    Renderer::new(&ctx).render_recursive(&roots, &mut HashSet::new(), &mut |model| models.push(model))?;

    let mut stats = GenerationStats::default();
    for model in models.iter().filter(|model| model.name.is_some()) {
      stats.record_model(model);
    }
    stats.record_operations(operations.len());
    stats.record_cycles(detect_cycles(&models));
    stats.record_warnings(ctx.diagnostics.into_warnings());

    let code = format_output(
      &models
        .iter()
        .filter(|model| model.name.is_some())
        .map(|model| model.code.as_str())
        .join("\n\n"),
    );

    Ok(GenerationOutput {
      code,
      operations: operations.into_iter().map(|operation| operation.meta).collect(),
      stats,
    })
  }

  /// Like [`Orchestrator::generate`], with an auto-generated banner naming the API and its source.
  pub fn generate_with_header(&mut self, source_path: &str) -> anyhow::Result<GenerationOutput> {
    let metadata = self.metadata()?;
    let mut output = self.generate()?;

    let description = metadata
      .description
      .as_deref()
      .map(|description| description.trim().replace('\n', "\n * "))
      .unwrap_or_else(|| String::from("No description provided"));

    output.code = format!(
      r"/**
 * AUTO-GENERATED CODE - DO NOT EDIT!
 *
 * {}
 * Source: {}
 * Version: {}
 * Generated by `oapi3ts`
 *
 * {}
 */

{}",
      metadata.title, source_path, metadata.version, description, output.code
    );
    Ok(output)
  }

  fn component_roots(
    &self,
    convertor: &Convertor<'_>,
    ctx: &mut ConversionContext,
  ) -> Result<Vec<DescriptorId>, ConversionError> {
    let Some(schemas) = self.document.pointer("/components/schemas").and_then(Value::as_object) else {
      return Ok(vec![]);
    };

    let mut roots = Vec::new();
    for (name, schema) in schemas {
      let path = child_path(COMPONENT_SCHEMAS, name);
      let model_name = ctx.names.assign(&path, &to_type_name(name));
      let options = ConvertOptions::builder().name(model_name).original_path(path).build();
      roots.extend(convertor.convert_at(ctx, schema, options)?);
    }
    Ok(roots)
  }
}

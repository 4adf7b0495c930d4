use super::{ConvertOptions, Convertor};
use crate::generator::{
  config::ConvertorConfig,
  context::ConversionContext,
  descriptor::DescriptorId,
  errors::{ConversionError, ParsingWarning, WarningKind},
  operations::{ApiMetaInfo, OperationExtractor, OperationFragments},
  schema::SchemaNode,
};

/// One operation after conversion: its metadata and the named entry-point descriptors.
#[derive(Debug, Clone)]
pub(crate) struct ConvertedOperation {
  pub meta: ApiMetaInfo,
  pub entry_points: Vec<DescriptorId>,
}

#[derive(Debug, Clone, Copy)]
enum EntrySlot {
  Parameters,
  Request,
  Response,
  Headers,
}

impl EntrySlot {
  const ALL: [Self; 4] = [Self::Parameters, Self::Request, Self::Response, Self::Headers];

  fn segment(self) -> &'static str {
    match self {
      Self::Parameters => "parameters",
      Self::Request => "requestBody",
      Self::Response => "responses",
      Self::Headers => "headers",
    }
  }

  fn node(self, operation: &OperationFragments) -> Option<SchemaNode> {
    match self {
      Self::Parameters => operation.parameters_node(),
      Self::Request => operation.request_node(),
      Self::Response => operation.response_node(),
      Self::Headers => operation.headers_node(),
    }
  }

  fn model_name(self, config: &ConvertorConfig, base: &str) -> String {
    match self {
      Self::Parameters => config.parameters_name(base),
      Self::Request => config.request_name(base),
      Self::Response => config.response_name(base),
      Self::Headers => config.headers_name(base),
    }
  }

  fn record(self, meta: &mut ApiMetaInfo, name: String) {
    let slot = match self {
      Self::Parameters => &mut meta.parameters_model_name,
      Self::Request => &mut meta.request_model_name,
      Self::Response => &mut meta.response_model_name,
      Self::Headers => &mut meta.headers_model_name,
    };
    *slot = Some(name);
  }
}

impl Convertor<'_> {
  /// Extracts every operation of the document and converts its parameters, request,
  /// response and headers schemas into named entry points.
  pub(crate) fn get_entry_points(&self, ctx: &mut ConversionContext) -> Result<Vec<ConvertedOperation>, ConversionError> {
    let operations = OperationExtractor::new(self.document, self.config).extract(&mut ctx.diagnostics)?;
    operations
      .iter()
      .map(|operation| self.convert_operation(ctx, operation))
      .collect()
  }

  fn convert_operation(
    &self,
    ctx: &mut ConversionContext,
    operation: &OperationFragments,
  ) -> Result<ConvertedOperation, ConversionError> {
    let json_path = &operation.json_path;
    let mut meta = operation.meta.clone();
    let mut entry_points = Vec::new();

    for slot in EntrySlot::ALL {
      let Some(node) = slot.node(operation) else {
        continue;
      };
      let requested = slot.model_name(self.config, &meta.base_type_name);
      let name = self.claim_entry_name(ctx, &requested, json_path)?;
      let options = ConvertOptions::builder()
        .name(name.clone())
        .original_path(format!("{json_path}/{}", slot.segment()))
        .build();

      let ids = self
        .convert(ctx, &node, options)
        .map_err(|err| err.within_operation(&meta.operation_id, json_path))?;
      entry_points.extend(ids);
      slot.record(&mut meta, name);
    }

    Ok(ConvertedOperation { meta, entry_points })
  }

  fn claim_entry_name(&self, ctx: &mut ConversionContext, requested: &str, json_path: &str) -> Result<String, ConversionError> {
    let name = ctx.names.claim(requested);
    if name != requested {
      ctx.diagnostics.warn(
        ParsingWarning::builder()
          .kind(WarningKind::DuplicateModelName)
          .message(format!("model name '{requested}' is taken, using '{name}'"))
          .json_path(json_path)
          .build(),
      )?;
    }
    Ok(name)
  }
}

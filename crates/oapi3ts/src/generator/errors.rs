use std::fmt;

use strum::Display;

/// What went wrong in a recoverable spot of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum WarningKind {
  #[strum(to_string = "empty path key")]
  EmptyPathKey,
  #[strum(to_string = "invalid path item")]
  InvalidPathItem,
  #[strum(to_string = "invalid operation")]
  InvalidOperation,
  #[strum(to_string = "unresolved reference")]
  UnresolvedRef,
  #[strum(to_string = "invalid servers")]
  InvalidServers,
  #[strum(to_string = "missing operationId")]
  MissingOperationId,
  #[strum(to_string = "malformed schema")]
  MalformedSchema,
  #[strum(to_string = "invalid status code")]
  InvalidStatusCode,
  #[strum(to_string = "invalid content type")]
  InvalidContentType,
  #[strum(to_string = "duplicate model name")]
  DuplicateModelName,
}

/// A recoverable problem: the offending element is skipped or replaced by a fallback.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct ParsingWarning {
  pub kind: WarningKind,
  #[builder(into)]
  pub message: String,
  #[builder(into)]
  pub json_path: String,
  #[builder(into)]
  pub related_ref: Option<String>,
  #[builder(into)]
  pub original_error: Option<String>,
}

impl ParsingWarning {
  /// Warnings that drop part of the document rather than degrading it.
  pub fn is_skipped_item(&self) -> bool {
    matches!(
      self.kind,
      WarningKind::EmptyPathKey | WarningKind::InvalidPathItem | WarningKind::InvalidOperation
    )
  }
}

impl fmt::Display for ParsingWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}] {} at {}", self.kind, self.message, self.json_path)?;
    if let Some(reference) = &self.related_ref {
      write!(f, " (ref '{reference}')")?;
    }
    if let Some(error) = &self.original_error {
      write!(f, ": {error}")?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
  #[error("invalid OpenAPI document: {message}")]
  InvalidDocument { message: String },

  #[error("OpenAPI document has no 'paths' object")]
  MissingPaths,

  #[error("server entry at {json_path} has no 'url'")]
  MissingServerUrl { json_path: String },

  #[error("external reference '{reference}' needs a foreign schema resolver, none is configured")]
  MissingForeignResolver { reference: String },

  #[error("failed to resolve external reference '{reference}': {message}")]
  ForeignResolution { reference: String, message: String },

  #[error("anonymous {kind} at {json_path} cannot be rendered as a top-level declaration")]
  AnonymousRootModel { kind: String, json_path: String },

  #[error("no descriptor rule matches the schema at {json_path}")]
  Unclassified { json_path: String },

  #[error("failed to convert composition member at {json_path}")]
  Member {
    json_path: String,
    #[source]
    source: Box<ConversionError>,
  },

  #[error("failed to convert operation '{operation}' at {json_path}")]
  Operation {
    operation: String,
    json_path: String,
    #[source]
    source: Box<ConversionError>,
  },

  #[error("{0}")]
  FatalWarning(ParsingWarning),
}

impl ConversionError {
  /// Wraps the error with the operation it was raised for, unless it already is such a wrapper.
  #[must_use]
  pub fn within_operation(self, operation: &str, json_path: &str) -> Self {
    match self {
      Self::Operation { .. } => self,
      other => Self::Operation {
        operation: operation.to_string(),
        json_path: json_path.to_string(),
        source: Box::new(other),
      },
    }
  }

  /// Wraps the failure of one `allOf`/`oneOf`/`anyOf` member, keeping the innermost location.
  #[must_use]
  pub fn within_member(self, json_path: &str) -> Self {
    match self {
      Self::Member { .. } | Self::Operation { .. } | Self::FatalWarning(_) => self,
      other => Self::Member {
        json_path: json_path.to_string(),
        source: Box::new(other),
      },
    }
  }
}

pub type WarningSink = Box<dyn FnMut(&ParsingWarning)>;

/// Collects the warnings of one conversion run.
#[derive(Default)]
pub struct Diagnostics {
  warnings: Vec<ParsingWarning>,
  sink: Option<WarningSink>,
  fatal: bool,
}

impl fmt::Debug for Diagnostics {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Diagnostics")
      .field("warnings", &self.warnings)
      .field("fatal", &self.fatal)
      .finish_non_exhaustive()
  }
}

impl Diagnostics {
  pub fn new(fatal: bool) -> Self {
    Self {
      fatal,
      ..Self::default()
    }
  }

  #[must_use]
  pub fn with_sink(mut self, sink: WarningSink) -> Self {
    self.sink = Some(sink);
    self
  }

  /// Records a warning, or raises it when warnings are fatal.
  pub fn warn(&mut self, warning: ParsingWarning) -> Result<(), ConversionError> {
    if let Some(sink) = self.sink.as_mut() {
      sink(&warning);
    }
    if self.fatal {
      return Err(ConversionError::FatalWarning(warning));
    }
    self.warnings.push(warning);
    Ok(())
  }

  pub fn warnings(&self) -> &[ParsingWarning] {
    &self.warnings
  }

  pub fn into_warnings(self) -> Vec<ParsingWarning> {
    self.warnings
  }
}

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, Timelike};
use crossterm::style::Stylize;
use serde_json::Value;

use crate::{
  generator::{
    config::ConvertorConfig,
    errors::ParsingWarning,
    metrics::GenerationStats,
    orchestrator::{GenerationOutput, Orchestrator},
  },
  ui::{Colors, GenerateCommand, colors::Role},
  utils::spec::{ExternalDocuments, SpecLoader},
};

fn format_timestamp() -> String {
  let now = Local::now();
  format!("[{:02}:{:02}:{:02}]", now.hour(), now.minute(), now.second())
}

#[derive(Debug, Clone)]
pub struct GenerateConfig {
  pub input: PathBuf,
  pub output: PathBuf,
  pub meta: Option<PathBuf>,
  pub verbose: bool,
  pub quiet: bool,
  pub convertor: ConvertorConfig,
}

impl GenerateConfig {
  pub fn from_command(command: GenerateCommand) -> anyhow::Result<Self> {
    let GenerateCommand {
      input,
      output,
      meta,
      verbose,
      quiet,
      all_schemas,
      implicit_ref_replacement,
      warnings_fatal,
      parameters_name,
      request_name,
      response_name,
      headers_name,
      default_content_type,
    } = command;

    if verbose && quiet {
      anyhow::bail!("--verbose and --quiet cannot be combined");
    }
    for template in [&parameters_name, &request_name, &response_name, &headers_name] {
      if !template.contains("{name}") {
        anyhow::bail!("Invalid name template '{template}': expected a '{{name}}' placeholder");
      }
    }

    let convertor = ConvertorConfig::builder()
      .implicit_types_ref_replacement(implicit_ref_replacement)
      .warnings_fatal(warnings_fatal)
      .include_all_schemas(all_schemas)
      .parameters_model_name(parameters_name)
      .request_model_name(request_name)
      .response_model_name(response_name)
      .headers_model_name(headers_name)
      .default_content_type(default_content_type)
      .build();

    Ok(Self {
      input,
      output,
      meta,
      verbose,
      quiet,
      convertor,
    })
  }

  async fn load_document(&self) -> anyhow::Result<(Value, ExternalDocuments)> {
    let document = SpecLoader::open(&self.input).await?.parse()?;
    let external = ExternalDocuments::preload(&self.input, &document, &self.convertor.json_path_regex).await?;
    Ok((document, external))
  }

  async fn write_file(path: &Path, content: String) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content)
      .await
      .with_context(|| format!("failed to write {}", path.display()))
  }

  async fn write_output(&self, output: &GenerationOutput) -> anyhow::Result<()> {
    Self::write_file(&self.output, output.code.clone()).await?;
    if let Some(meta) = &self.meta {
      let json = serde_json::to_string_pretty(&output.operations)?;
      Self::write_file(meta, json).await?;
    }
    Ok(())
  }
}

struct GenerateLogger<'a> {
  config: &'a GenerateConfig,
  colors: &'a Colors,
}

impl<'a> GenerateLogger<'a> {
  fn new(config: &'a GenerateConfig, colors: &'a Colors) -> Self {
    Self { config, colors }
  }

  fn info(&self, message: &str) {
    if !self.config.quiet {
      println!("{} {message}", format_timestamp().with(self.colors.color(Role::Timestamp)));
    }
  }

  fn stat(&self, label: &str, value: String) {
    if !self.config.quiet {
      println!(
        "            {:<25} {}",
        label.with(self.colors.color(Role::Label)),
        value.with(self.colors.color(Role::Value))
      );
    }
  }

  fn log_loading(&self) {
    self.info(
      &format!("Loading OpenAPI document from: {}", self.config.input.display())
        .with(self.colors.color(Role::Primary))
        .to_string(),
    );
  }

  fn log_external(&self, external: &ExternalDocuments) {
    if !external.is_empty() {
      self.info(
        &format!("Loaded {} referenced document(s)", external.len())
          .with(self.colors.color(Role::Info))
          .to_string(),
      );
    }
  }

  fn log_generating(&self) {
    self.info(&"Generating TypeScript declarations...".with(self.colors.color(Role::Primary)).to_string());
  }

  fn print_statistics(&self, stats: &GenerationStats) {
    if self.config.quiet {
      return;
    }

    self.stat("Models generated:", stats.models_generated.to_string());
    self.stat("", format!("{} interfaces", stats.interfaces_generated));
    self.stat("", format!("{} enums", stats.enums_generated));
    self.stat("", format!("{} type aliases", stats.type_aliases_generated));
    if self.config.verbose {
      for (kind, count) in &stats.models_by_kind {
        self.stat("", format!("{count} from {kind} schemas"));
      }
    }
    self.stat("Operations converted:", stats.operations_converted.to_string());
    if !stats.warnings.is_empty() {
      self.stat("Warnings:", stats.warnings.len().to_string());
    }

    self.print_cycles(stats);
    self.print_warnings(stats);
  }

  fn print_cycles(&self, stats: &GenerationStats) {
    if stats.cycles_detected == 0 {
      return;
    }

    self.stat("Cycles:", stats.cycles_detected.to_string());

    if self.config.verbose {
      for (i, cycle) in stats.cycle_details.iter().enumerate() {
        println!(
          "              {}: {}",
          format!("Cycle {}", i + 1).with(self.colors.color(Role::Accent)),
          cycle.join(" -> ").with(self.colors.color(Role::Info))
        );
      }
    }
  }

  /// Skipped elements are always reported; in verbose mode every warning was already
  /// printed when it was raised.
  fn print_warnings(&self, stats: &GenerationStats) {
    if self.config.verbose {
      return;
    }

    let skipped = stats.warnings.iter().filter(|warning| warning.is_skipped_item()).collect::<Vec<_>>();
    if skipped.is_empty() {
      return;
    }

    println!();
    for warning in skipped {
      eprintln!(
        "{} {}",
        "Skipped:".with(self.colors.color(Role::Accent)),
        warning.to_string().with(self.colors.color(Role::Primary))
      );
    }
  }

  fn log_writing(&self) {
    self.info(
      &format!("Writing to: {}", self.config.output.display())
        .with(self.colors.color(Role::Primary))
        .to_string(),
    );
    if let Some(meta) = &self.config.meta {
      self.info(
        &format!("Writing operation metadata to: {}", meta.display())
          .with(self.colors.color(Role::Primary))
          .to_string(),
      );
    }
  }

  fn log_success(&self) {
    if !self.config.quiet {
      println!();
      println!(
        "{} {}",
        format_timestamp().with(self.colors.color(Role::Timestamp)),
        "Successfully generated TypeScript declarations".with(self.colors.color(Role::Success))
      );
    }
  }
}

/// Prints a warning the moment it is raised.
fn live_warning_sink(colors: Colors) -> Box<dyn FnMut(&ParsingWarning)> {
  Box::new(move |warning| {
    let label = if warning.is_skipped_item() { "Skipped:" } else { "Warning:" };
    eprintln!(
      "{} {} {}",
      format_timestamp().with(colors.color(Role::Timestamp)),
      label.with(colors.color(Role::Accent)),
      warning.to_string().with(colors.color(Role::Primary))
    );
  })
}

pub async fn generate_code(config: GenerateConfig, colors: &Colors) -> anyhow::Result<()> {
  let logger = GenerateLogger::new(&config, colors);

  logger.log_loading();
  let (document, external) = config.load_document().await?;
  logger.log_external(&external);

  logger.log_generating();
  let mut orchestrator = Orchestrator::new(document, config.convertor.clone()).with_external_documents(external);
  if config.verbose {
    orchestrator = orchestrator.with_warning_sink(live_warning_sink(*colors));
  }

  let source_path = config.input.display().to_string();
  let output = orchestrator.generate_with_header(&source_path)?;
  logger.print_statistics(&output.stats);

  logger.log_writing();
  config.write_output(&output).await?;

  logger.log_success();
  Ok(())
}

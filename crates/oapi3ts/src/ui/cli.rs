use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::colors::{ColorMode, Colors, ThemeMode};

#[derive(Parser, Debug)]
#[command(name = "oapi3ts")]
#[command(author, version, about = "OpenAPI 3 to TypeScript type declaration compiler")]
#[command(styles = Colors::clap_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  /// Control color output
  #[arg(long, value_enum, default_value = "auto", global = true)]
  pub color: ColorMode,

  /// Terminal theme (dark or light background)
  #[arg(long, value_enum, default_value = "auto", global = true)]
  pub theme: ThemeMode,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// List information from an OpenAPI document
  List {
    #[command(subcommand)]
    list_command: ListCommands,
  },
  /// Generate TypeScript declarations from an OpenAPI document
  Generate(GenerateCommand),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateCommand {
  /// Path to the OpenAPI document (JSON or YAML)
  #[arg(short, long, value_name = "FILE")]
  pub input: PathBuf,

  /// Path where the generated TypeScript will be written
  #[arg(short, long, value_name = "FILE")]
  pub output: PathBuf,

  /// Also write the operation metadata as JSON to this path
  #[arg(long, value_name = "FILE")]
  pub meta: Option<PathBuf>,

  /// Enable verbose output, printing every warning as it is raised
  #[arg(short, long, default_value_t = false)]
  pub verbose: bool,

  /// Suppress non-essential output (errors only)
  #[arg(short, long, default_value_t = false)]
  pub quiet: bool,

  /// Render every schema under components.schemas, referenced or not
  #[arg(long, default_value_t = false)]
  pub all_schemas: bool,

  /// Replace named ref-only schemas by their target instead of declaring an extending type
  #[arg(long, default_value_t = false)]
  pub implicit_ref_replacement: bool,

  /// Abort on the first warning
  #[arg(long, default_value_t = false)]
  pub warnings_fatal: bool,

  /// Name template of parameter models; `{name}` is the operation name
  #[arg(long, value_name = "TEMPLATE", default_value = "{name}Parameters")]
  pub parameters_name: String,

  /// Name template of request body models
  #[arg(long, value_name = "TEMPLATE", default_value = "{name}Request")]
  pub request_name: String,

  /// Name template of response models
  #[arg(long, value_name = "TEMPLATE", default_value = "{name}Response")]
  pub response_name: String,

  /// Name template of response header models
  #[arg(long, value_name = "TEMPLATE", default_value = "{name}Headers")]
  pub headers_name: String,

  /// Content type assumed for bodies and responses that declare none
  #[arg(long, value_name = "MEDIA_TYPE", default_value = "application/json")]
  pub default_content_type: String,
}

#[derive(Subcommand, Debug)]
pub enum ListCommands {
  /// List all operations defined in the OpenAPI document
  Operations {
    /// Path to the OpenAPI document (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
  },
}

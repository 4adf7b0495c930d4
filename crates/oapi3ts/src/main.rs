#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;

use crate::ui::{Cli, Colors, Commands, ListCommands, colors, colors::Role};

mod generator;
mod ui;
mod utils;


async fn run(cli: Cli, colors: &Colors) -> anyhow::Result<()> {
  match cli.command {
    Commands::List {
      list_command: ListCommands::Operations { input },
    } => ui::commands::list_operations(&input, colors).await,
    Commands::Generate(command) => {
      let config = ui::commands::GenerateConfig::from_command(command)?;
      ui::commands::generate_code(config, colors).await
    }
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  let colors = Colors::new(colors::colors_enabled(cli.color), colors::detect_theme(cli.theme));

  match run(cli, &colors).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("{} {err:#}", "error:".with(colors.color(Role::Accent)).bold());
      ExitCode::FAILURE
    }
  }
}

use std::path::Path;

use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::{
  generator::{config::ConvertorConfig, errors::Diagnostics, operations::OperationExtractor},
  ui::{Colors, colors::Role, term_width},
  utils::spec::SpecLoader,
};

pub async fn list_operations(input: &Path, colors: &Colors) -> anyhow::Result<()> {
  let document = SpecLoader::open(input).await?.parse()?;
  let config = ConvertorConfig::default();
  let mut diagnostics = Diagnostics::new(false);

  let mut operations = OperationExtractor::new(&document, &config)
    .extract(&mut diagnostics)?
    .into_iter()
    .map(|operation| operation.meta)
    .collect::<Vec<_>>();
  operations.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));

  let mut table = Table::new();
  table
    .load_preset("  ── ──            ")
    .set_content_arrangement(ContentArrangement::Dynamic)
    .set_width(term_width());

  let mut row = Row::new();
  for header in ["OPERATION ID", "METHOD", "PATH", "TYPE NAME"] {
    row.add_cell(Cell::new(header).fg(colors.table_color(Role::Label)));
  }
  table.set_header(row);

  for operation in operations {
    let mut row = Row::new();
    row.add_cell(
      Cell::new(&operation.operation_id)
        .fg(colors.table_color(Role::Value))
        .add_attribute(Attribute::Bold),
    );
    row.add_cell(
      Cell::new(operation.method.as_str())
        .fg(colors.table_color(Role::Accent))
        .set_alignment(CellAlignment::Right),
    );
    row.add_cell(Cell::new(&operation.path).fg(colors.table_color(Role::Primary)));
    row.add_cell(Cell::new(&operation.base_type_name).fg(colors.table_color(Role::Info)));
    table.add_row(row);
  }

  println!("{table}");

  for warning in diagnostics.warnings().iter().filter(|warning| warning.is_skipped_item()) {
    eprintln!("Skipped: {warning}");
  }

  Ok(())
}

use std::path::Path;

use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Row, Table};
use itertools::Itertools;
use oas3_ir::{Orchestrator, PipelineConfig, utils::spec::SpecLoader};

use crate::ui::{Colors, colors::IntoComfyColor, term_width};

/// Prints every endpoint of the document with the alias, method and path the
/// endpoint IR assigns.
pub async fn list_endpoints(input: &Path, colors: &Colors) -> anyhow::Result<()> {
  let document = SpecLoader::open(input).await?.parse()?;
  let output = Orchestrator::new(PipelineConfig::default()).run(&document)?;

  let endpoints = output
    .endpoints
    .iter()
    .sorted_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.to_string().cmp(&b.method.to_string())));

  let mut table = Table::new();
  table
    .load_preset("  ── ──            ")
    .set_content_arrangement(ContentArrangement::Dynamic)
    .set_width(term_width());

  let mut row = Row::new();
  row.add_cell(Cell::new("ALIAS").fg(IntoComfyColor::into(colors.label())));
  row.add_cell(Cell::new("METHOD").fg(IntoComfyColor::into(colors.label())));
  row.add_cell(Cell::new("PATH").fg(IntoComfyColor::into(colors.label())));
  row.add_cell(Cell::new("PARAMS").fg(IntoComfyColor::into(colors.label())));
  table.set_header(row);

  for endpoint in endpoints {
    let mut row = Row::new();
    row.add_cell(
      Cell::new(&endpoint.alias)
        .fg(IntoComfyColor::into(colors.value()))
        .add_attribute(Attribute::Bold),
    );
    row.add_cell(
      Cell::new(endpoint.method.to_string().to_uppercase())
        .fg(IntoComfyColor::into(colors.accent()))
        .set_alignment(CellAlignment::Right),
    );
    row.add_cell(Cell::new(&endpoint.path).fg(IntoComfyColor::into(colors.primary())));
    row.add_cell(
      Cell::new(
        endpoint
          .parameters
          .iter()
          .map(|parameter| format!("{}:{}", parameter.location, parameter.name))
          .join(", "),
      )
      .fg(IntoComfyColor::into(colors.info())),
    );
    table.add_row(row);
  }

  println!("{table}");

  Ok(())
}

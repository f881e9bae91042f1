use std::path::{Path, PathBuf};

use chrono::{Local, Timelike};
use crossterm::style::Stylize;
use oas3_ir::{
  Orchestrator, PipelineConfig, PipelineOutput,
  generator::metrics::PipelineStats,
  utils::spec::SpecLoader,
};
use serde_json::Value;

use crate::ui::{Colors, ResolveCommand};

fn format_timestamp() -> String {
  let now = Local::now();
  format!("[{:02}:{:02}:{:02}]", now.hour(), now.minute(), now.second())
}

#[derive(Debug, Clone)]
pub struct ResolveConfig {
  pub input: PathBuf,
  pub output: Option<PathBuf>,
  pub ir: Option<PathBuf>,
  pub pipeline: PipelineConfig,
  pub verbose: bool,
  pub quiet: bool,
}

impl ResolveConfig {
  pub fn from_command(command: ResolveCommand) -> Self {
    let ResolveCommand {
      input,
      output,
      ir,
      force_merge,
      skip_discriminators,
      verbose,
      quiet,
    } = command;

    let pipeline = PipelineConfig::builder()
      .force_merge(force_merge)
      .propagate_discriminators(!skip_discriminators)
      .include_endpoints(ir.is_some())
      .build();

    Self {
      input,
      output,
      ir,
      pipeline,
      verbose,
      quiet,
    }
  }

  async fn load_document(&self) -> anyhow::Result<Value> {
    SpecLoader::open(&self.input).await?.parse()
  }
}

async fn write_json(path: &Path, json: String) -> anyhow::Result<()> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(path, json).await?;
  Ok(())
}

struct ResolveLogger<'a> {
  config: &'a ResolveConfig,
  colors: &'a Colors,
}

impl<'a> ResolveLogger<'a> {
  fn new(config: &'a ResolveConfig, colors: &'a Colors) -> Self {
    Self { config, colors }
  }

  fn info(&self, message: &str) {
    if !self.config.quiet {
      println!("{} {message}", format_timestamp().with(self.colors.timestamp()));
    }
  }

  fn stat(&self, label: &str, value: String) {
    if !self.config.quiet {
      println!(
        "            {:<25} {}",
        label.with(self.colors.label()),
        value.with(self.colors.value())
      );
    }
  }

  fn log_loading(&self) {
    self.info(
      &format!("Loading OpenAPI document from: {}", self.config.input.display())
        .with(self.colors.primary())
        .to_string(),
    );
  }

  fn log_resolving(&self) {
    let message = if self.config.pipeline.force_merge {
      "Resolving schemas (force merge)..."
    } else {
      "Resolving schemas..."
    };
    self.info(&message.with(self.colors.primary()).to_string());
  }

  fn print_statistics(&self, stats: &PipelineStats) {
    if self.config.quiet {
      return;
    }

    self.stat("Schemas merged:", stats.schemas_merged.to_string());
    self.stat("Directives applied:", stats.directives_applied.to_string());
    self.stat(
      "Discriminator values:",
      stats.discriminator_values_propagated.to_string(),
    );
    self.stat("Named schemas:", stats.named_schemas.to_string());
    self.stat("", format!("{} IR nodes", stats.ir_nodes_created));
    if stats.endpoints_converted > 0 {
      self.stat("Endpoints converted:", stats.endpoints_converted.to_string());
    }
    if !stats.warnings.is_empty() {
      self.stat("Warnings:", stats.warnings.len().to_string());
    }

    self.print_cycles(stats);
    self.print_warnings(stats);
  }

  fn print_cycles(&self, stats: &PipelineStats) {
    if stats.cycles_detected == 0 {
      return;
    }

    self.stat("Cycles:", stats.cycles_detected.to_string());

    if self.config.verbose {
      for (i, cycle) in stats.cycle_details.iter().enumerate() {
        println!(
          "              {}: {}",
          format!("Cycle {}", i + 1).with(self.colors.accent()),
          cycle.join(" -> ").with(self.colors.info())
        );
      }
    }
  }

  fn print_warnings(&self, stats: &PipelineStats) {
    let mut printed_header = false;
    for warning in &stats.warnings {
      if !warning.is_auto_fix() && !self.config.verbose {
        continue;
      }

      if !printed_header {
        println!();
        printed_header = true;
      }

      let label = if warning.is_auto_fix() { "Fixed:" } else { "Warning:" };
      eprintln!(
        "{} {}",
        label.with(self.colors.accent()),
        format!("{warning}").with(self.colors.primary())
      );
    }
  }

  fn log_writing(&self, path: &Path) {
    self.info(
      &format!("Writing to: {}", path.display())
        .with(self.colors.primary())
        .to_string(),
    );
  }

  fn log_success(&self) {
    if !self.config.quiet {
      println!();
      println!(
        "{} {}",
        format_timestamp().with(self.colors.timestamp()),
        "Successfully resolved OpenAPI document".with(self.colors.success())
      );
    }
  }
}

pub async fn resolve_document(config: ResolveConfig, colors: &Colors) -> anyhow::Result<()> {
  let logger = ResolveLogger::new(&config, colors);

  logger.log_loading();
  let document = config.load_document().await?;

  logger.log_resolving();
  let output: PipelineOutput = Orchestrator::new(config.pipeline.clone()).run(&document)?;
  logger.print_statistics(&output.stats);

  let resolved = serde_json::to_string_pretty(&output.document)?;
  match &config.output {
    Some(path) => {
      logger.log_writing(path);
      write_json(path, resolved).await?;
    }
    None => println!("{resolved}"),
  }

  if let Some(path) = &config.ir {
    logger.log_writing(path);
    write_json(path, serde_json::to_string_pretty(&output.ir())?).await?;
  }

  logger.log_success();
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn command(ir: Option<&str>, force_merge: bool, skip_discriminators: bool) -> ResolveCommand {
    ResolveCommand {
      input: PathBuf::from("openapi.json"),
      output: None,
      ir: ir.map(PathBuf::from),
      force_merge,
      skip_discriminators,
      verbose: false,
      quiet: true,
    }
  }

  #[test]
  fn test_from_command_defaults() {
    let config = ResolveConfig::from_command(command(None, false, false));
    assert!(!config.pipeline.force_merge);
    assert!(config.pipeline.propagate_discriminators);
    assert!(!config.pipeline.include_endpoints, "endpoints are only needed for IR output");
  }

  #[test]
  fn test_from_command_flags() {
    let config = ResolveConfig::from_command(command(Some("ir.json"), true, true));
    assert!(config.pipeline.force_merge);
    assert!(!config.pipeline.propagate_discriminators);
    assert!(config.pipeline.include_endpoints);
    assert_eq!(config.ir, Some(PathBuf::from("ir.json")));
  }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::colors::{ColorMode, Colors, ThemeMode};

#[derive(Parser, Debug)]
#[command(name = "oas3-ir")]
#[command(author, version, about = "Resolves OpenAPI 3.0 schemas into an ordered IR")]
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
  /// Merge compositions, complete discriminators and emit the IR
  Resolve(ResolveCommand),
}

#[derive(Args, Debug)]
pub struct ResolveCommand {
  /// Path to the bundled OpenAPI document (JSON or YAML)
  #[arg(short, long, value_name = "FILE")]
  pub input: PathBuf,

  /// Where to write the resolved document (stdout if omitted)
  #[arg(short, long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// Where to write the ordered IR as JSON
  #[arg(long, value_name = "FILE")]
  pub ir: Option<PathBuf>,

  /// Merge discriminated parents too, producing flat objects
  #[arg(long, default_value_t = false)]
  pub force_merge: bool,

  /// Leave discriminator properties as declared
  #[arg(long, default_value_t = false)]
  pub skip_discriminators: bool,

  /// Enable verbose output with detailed progress information
  #[arg(short, long, default_value_t = false)]
  pub verbose: bool,

  /// Suppress non-essential output (errors only)
  #[arg(short, long, default_value_t = false)]
  pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum ListCommands {
  /// List every endpoint with its alias, method and path
  Endpoints {
    /// Path to the bundled OpenAPI document
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
  },
}

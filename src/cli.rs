//! Command-line interface for Oker.

use clap::Parser;
use std::path::PathBuf;

/// Oker - bytecode compiler and stack VM for the Oker scripting language
#[derive(Parser)]
#[command(name = "oker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Source file to run
  pub file: PathBuf,

  /// Dump tokens and exit
  #[arg(short = 't', long = "tokens")]
  pub tokens: bool,

  /// Dump the AST and exit
  #[arg(short = 'p', long = "parse")]
  pub parse: bool,

  /// Run semantic analysis only
  #[arg(short = 's', long = "semantic")]
  pub semantic: bool,

  /// Dump pre-optimization bytecode and exit
  #[arg(short = 'b', long = "bytecode")]
  pub bytecode: bool,

  /// Print elapsed execution time in milliseconds
  #[arg(long = "time")]
  pub time: bool,

  /// Announce each phase
  #[arg(short = 'v', long = "verbose")]
  pub verbose: bool,
}

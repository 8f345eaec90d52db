use clap::Parser;
use oker::cli::Cli;
use oker::error::OkerError;
use oker::pipeline;
use owo_colors::OwoColorize;
use std::process;

fn main() {
  let cli = Cli::parse();

  match pipeline::run(&cli) {
    Ok(status) => process::exit(status.code()),
    Err(error) => {
      report(&error);
      process::exit(1);
    }
  }
}

fn report(error: &OkerError) {
  eprintln!("{}: {error}", "error".red().bold());
}

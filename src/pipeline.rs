//! Phase orchestration for the `oker` binary.
//!
//! Runs lex → parse → analyze → generate → optimize → resolve → execute,
//! with early exits for the dump flags.

use crate::cli::Cli;
use crate::codegen::instruction::dump_instructions;
use crate::codegen::{optimize, resolve_labels, CodeGenerator};
use crate::error::OkerResult;
use crate::lexer::Lexer;
use crate::parser::{display, Parser};
use crate::semantic::SemanticAnalyzer;
use crate::vm::{ExitStatus, Vm};
use std::fs;
use std::time::Instant;

pub fn run(cli: &Cli) -> OkerResult<ExitStatus> {
  let source = fs::read_to_string(&cli.file)?;

  if cli.verbose {
    eprintln!("=== Lexical Analysis ===");
  }
  let tokens = Lexer::new(&source).tokenize()?;

  if cli.tokens {
    for token in &tokens {
      println!("{token}");
    }
    return Ok(ExitStatus::Completed);
  }

  if cli.verbose {
    eprintln!("=== Parsing ===");
  }
  let program = Parser::new(tokens).parse()?;

  if cli.parse {
    print!("{}", display::dump_program(&program));
    return Ok(ExitStatus::Completed);
  }

  if cli.verbose {
    eprintln!("=== Semantic Analysis ===");
  }
  SemanticAnalyzer::new().analyze(&program)?;

  if cli.semantic {
    println!("Semantic analysis completed successfully");
    return Ok(ExitStatus::Completed);
  }

  if cli.verbose {
    eprintln!("=== Code Generation ===");
  }
  let symbolic = CodeGenerator::new().generate(&program)?;

  if cli.bytecode {
    let resolved = resolve_labels(symbolic)?;
    print!("{}", dump_instructions(&resolved));
    return Ok(ExitStatus::Completed);
  }

  let code = resolve_labels(optimize::optimize(symbolic))?;

  if cli.verbose {
    eprintln!("=== Execution ===");
  }
  let start = Instant::now();
  let status = Vm::new().execute(&code)?;

  if cli.time {
    let elapsed = start.elapsed();
    println!(
      "\n--- Execution time: {:.3} ms ---",
      elapsed.as_secs_f64() * 1000.0
    );
  }

  Ok(status)
}

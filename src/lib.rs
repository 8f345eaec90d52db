//! Oker: a small imperative scripting language.
//!
//! The pipeline is tokenization → AST construction → semantic validation →
//! bytecode generation → peephole optimization → stack VM execution. Each
//! stage is its own module and usable on its own; [`compile`] and
//! [`execute`] cover the common whole-pipeline case.

pub mod cli;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod semantic;
pub mod vm;

use codegen::instruction::Instruction;
use codegen::{optimize, resolve_labels, CodeGenerator};
use error::OkerResult;
use lexer::Lexer;
use parser::Parser;
use semantic::SemanticAnalyzer;
use vm::{ExitStatus, Vm};

/// Compile source text to resolved, optimized bytecode.
pub fn compile(source: &str) -> OkerResult<Vec<Instruction>> {
  let tokens = Lexer::new(source).tokenize()?;
  let program = Parser::new(tokens).parse()?;
  SemanticAnalyzer::new().analyze(&program)?;
  let symbolic = CodeGenerator::new().generate(&program)?;
  resolve_labels(optimize::optimize(symbolic))
}

/// Execute bytecode to completion on a fresh VM writing to stdout.
pub fn execute(instructions: &[Instruction]) -> OkerResult<ExitStatus> {
  Vm::new().execute(instructions)
}

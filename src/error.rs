//! Error types shared by every stage of the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OkerError {
  #[error("Lexical error at line {line}: {message}")]
  Lex { message: String, line: usize },

  #[error("Parse error at {line}:{column}: {message}")]
  Parse {
    message: String,
    line: usize,
    column: usize,
  },

  #[error("Semantic error: {message}")]
  Semantic { message: String },

  #[error("Codegen error: {message}")]
  Codegen { message: String },

  #[error("Runtime error at instruction {pc}: {message}")]
  Runtime { message: String, pc: usize },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl OkerError {
  pub fn lex(message: impl Into<String>, line: usize) -> Self {
    OkerError::Lex {
      message: message.into(),
      line,
    }
  }

  pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
    OkerError::Parse {
      message: message.into(),
      line,
      column,
    }
  }

  pub fn semantic(message: impl Into<String>) -> Self {
    OkerError::Semantic {
      message: message.into(),
    }
  }

  pub fn codegen(message: impl Into<String>) -> Self {
    OkerError::Codegen {
      message: message.into(),
    }
  }

  pub fn runtime(message: impl Into<String>, pc: usize) -> Self {
    OkerError::Runtime {
      message: message.into(),
      pc,
    }
  }
}

pub type OkerResult<T> = Result<T, OkerError>;

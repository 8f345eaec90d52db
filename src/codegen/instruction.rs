//! Bytecode instruction set.
//!
//! Operands are typed fields on each variant rather than strings. Jump
//! targets are symbolic [`Target::Label`]s while the stream is being built
//! and become absolute [`Target::Addr`]s once `resolve_labels` has run.

use serde::{Deserialize, Serialize};

/// Identifier of a position in the symbolic stream.
pub type LabelId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
  Label(LabelId),
  Addr(u32),
}

impl Target {
  pub fn addr(&self) -> Option<usize> {
    match self {
      Target::Addr(addr) => Some(*addr as usize),
      Target::Label(_) => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
  // Stack literals
  PushNumber(f64),
  PushString(String),
  PushBoolean(bool),

  // Variables
  DeclareVar(String),
  AssignVar(String),
  GetVar(String),

  // Arithmetic
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Neg,

  // Comparison
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,

  // Logical
  And,
  Or,
  Not,

  // Control
  Jump(Target),
  JumpIfFalse(Target),
  JumpIfTrue(Target),

  // Functions
  DefineFunction {
    name: String,
    start: Target,
    params: Vec<String>,
  },
  Call {
    name: String,
    arg_count: usize,
  },
  Return,

  // Built-ins
  BuiltinCall {
    name: String,
    arg_count: usize,
  },

  // Aggregates
  BuildList(usize),
  BuildDict(usize),
  GetIndex,
  SetIndex,

  // Classes
  DefineClass(String),
  CreateInstance {
    class: String,
    arg_count: usize,
  },
  GetProperty(String),
  SetProperty(String),
  GetThis,

  // Try
  TryStart(Target),
  TryEnd,

  // Housekeeping
  Pop,
  Dup,
  Halt,

  // Peephole results
  Increment(String),
  Decrement(String),

  /// Marker for a jump target in the symbolic stream. Emits no code;
  /// stripped by `resolve_labels`.
  Label(LabelId),
}

impl Instruction {
  pub fn name(&self) -> &'static str {
    match self {
      Instruction::PushNumber(_) => "PUSH_NUMBER",
      Instruction::PushString(_) => "PUSH_STRING",
      Instruction::PushBoolean(_) => "PUSH_BOOLEAN",
      Instruction::DeclareVar(_) => "DECLARE_VAR",
      Instruction::AssignVar(_) => "ASSIGN_VAR",
      Instruction::GetVar(_) => "GET_VAR",
      Instruction::Add => "ADD",
      Instruction::Sub => "SUB",
      Instruction::Mul => "MUL",
      Instruction::Div => "DIV",
      Instruction::Mod => "MOD",
      Instruction::Neg => "NEG",
      Instruction::Eq => "EQ",
      Instruction::Ne => "NE",
      Instruction::Lt => "LT",
      Instruction::Le => "LE",
      Instruction::Gt => "GT",
      Instruction::Ge => "GE",
      Instruction::And => "AND",
      Instruction::Or => "OR",
      Instruction::Not => "NOT",
      Instruction::Jump(_) => "JUMP",
      Instruction::JumpIfFalse(_) => "JUMP_IF_FALSE",
      Instruction::JumpIfTrue(_) => "JUMP_IF_TRUE",
      Instruction::DefineFunction { .. } => "DEFINE_FUNCTION",
      Instruction::Call { .. } => "CALL",
      Instruction::Return => "RETURN",
      Instruction::BuiltinCall { .. } => "BUILTIN_CALL",
      Instruction::BuildList(_) => "BUILD_LIST",
      Instruction::BuildDict(_) => "BUILD_DICT",
      Instruction::GetIndex => "GET_INDEX",
      Instruction::SetIndex => "SET_INDEX",
      Instruction::DefineClass(_) => "DEFINE_CLASS",
      Instruction::CreateInstance { .. } => "CREATE_INSTANCE",
      Instruction::GetProperty(_) => "GET_PROPERTY",
      Instruction::SetProperty(_) => "SET_PROPERTY",
      Instruction::GetThis => "GET_THIS",
      Instruction::TryStart(_) => "TRY_START",
      Instruction::TryEnd => "TRY_END",
      Instruction::Pop => "POP",
      Instruction::Dup => "DUP",
      Instruction::Halt => "HALT",
      Instruction::Increment(_) => "INCREMENT",
      Instruction::Decrement(_) => "DECREMENT",
      Instruction::Label(_) => "LABEL",
    }
  }
}

impl std::fmt::Display for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Target::Label(id) => write!(f, "L{id}"),
      Target::Addr(addr) => write!(f, "{addr}"),
    }
  }
}

impl std::fmt::Display for Instruction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Instruction::PushNumber(n) => write!(f, "PUSH_NUMBER {n}"),
      Instruction::PushString(s) => write!(f, "PUSH_STRING \"{}\"", s.escape_debug()),
      Instruction::PushBoolean(b) => write!(f, "PUSH_BOOLEAN {b}"),
      Instruction::DeclareVar(name) => write!(f, "DECLARE_VAR {name}"),
      Instruction::AssignVar(name) => write!(f, "ASSIGN_VAR {name}"),
      Instruction::GetVar(name) => write!(f, "GET_VAR {name}"),
      Instruction::Jump(target) => write!(f, "JUMP {target}"),
      Instruction::JumpIfFalse(target) => write!(f, "JUMP_IF_FALSE {target}"),
      Instruction::JumpIfTrue(target) => write!(f, "JUMP_IF_TRUE {target}"),
      Instruction::DefineFunction {
        name,
        start,
        params,
      } => {
        write!(f, "DEFINE_FUNCTION {name} {start} {}", params.len())?;
        for param in params {
          write!(f, " {param}")?;
        }
        Ok(())
      }
      Instruction::Call { name, arg_count } => write!(f, "CALL {name} {arg_count}"),
      Instruction::BuiltinCall { name, arg_count } => {
        write!(f, "BUILTIN_CALL {name} {arg_count}")
      }
      Instruction::BuildList(count) => write!(f, "BUILD_LIST {count}"),
      Instruction::BuildDict(count) => write!(f, "BUILD_DICT {count}"),
      Instruction::DefineClass(name) => write!(f, "DEFINE_CLASS {name}"),
      Instruction::CreateInstance { class, arg_count } => {
        write!(f, "CREATE_INSTANCE {class} {arg_count}")
      }
      Instruction::GetProperty(name) => write!(f, "GET_PROPERTY {name}"),
      Instruction::SetProperty(name) => write!(f, "SET_PROPERTY {name}"),
      Instruction::TryStart(target) => write!(f, "TRY_START {target}"),
      Instruction::Increment(name) => write!(f, "INCREMENT {name}"),
      Instruction::Decrement(name) => write!(f, "DECREMENT {name}"),
      Instruction::Label(id) => write!(f, "LABEL L{id}"),
      other => write!(f, "{}", other.name()),
    }
  }
}

/// Render a resolved instruction stream the way `--bytecode` prints it.
pub fn dump_instructions(instructions: &[Instruction]) -> String {
  use std::fmt::Write;

  let mut out = String::new();
  for (index, instruction) in instructions.iter().enumerate() {
    let _ = writeln!(out, "{index}: {instruction}");
  }
  out
}

//! Peephole pass over the symbolic instruction stream.
//!
//! Must run before label resolution: collapsing a window shortens the
//! stream, and on the symbolic form that cannot disturb any jump target. A
//! label marker inside the window also blocks the rewrite, so an address
//! that lands mid-pattern keeps its exact meaning.

use super::instruction::Instruction;

/// Collapse `GET_VAR x; PUSH_NUMBER 1; ADD|SUB; ASSIGN_VAR x` into a single
/// `INCREMENT x` / `DECREMENT x`.
pub fn optimize(instructions: Vec<Instruction>) -> Vec<Instruction> {
  let mut result = Vec::with_capacity(instructions.len());
  let mut i = 0;

  while i < instructions.len() {
    if i + 3 < instructions.len() {
      if let Some(collapsed) = match_increment(&instructions[i..i + 4]) {
        result.push(collapsed);
        i += 4;
        continue;
      }
    }
    result.push(instructions[i].clone());
    i += 1;
  }

  result
}

fn match_increment(window: &[Instruction]) -> Option<Instruction> {
  let name = match &window[0] {
    Instruction::GetVar(name) => name,
    _ => return None,
  };

  match &window[1] {
    Instruction::PushNumber(n) if *n == 1.0 => {}
    _ => return None,
  }

  let assigned = match &window[3] {
    Instruction::AssignVar(name) => name,
    _ => return None,
  };
  if assigned != name {
    return None;
  }

  match &window[2] {
    Instruction::Add => Some(Instruction::Increment(name.clone())),
    Instruction::Sub => Some(Instruction::Decrement(name.clone())),
    _ => None,
  }
}

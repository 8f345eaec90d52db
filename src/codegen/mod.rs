//! Lowering from the AST to the linear instruction stream.
//!
//! The generator emits symbolic [`Target::Label`] jump targets together with
//! `Instruction::Label` position markers. The peephole pass runs on that
//! symbolic form, and [`resolve_labels`] then strips the markers and patches
//! every target to an absolute index in a single pass.

pub mod instruction;
pub mod optimize;

use crate::error::{OkerError, OkerResult};
use crate::parser::ast::{BinaryOp, Expr, FunctionDecl, Program, Stmt, UnaryOp};
use crate::vm::builtins;
use instruction::{Instruction, LabelId, Target};
use std::collections::HashMap;

struct LoopContext {
  start: LabelId,
  end: LabelId,
}

pub struct CodeGenerator {
  instructions: Vec<Instruction>,
  next_label: LabelId,
  loop_stack: Vec<LoopContext>,
}

impl Default for CodeGenerator {
  fn default() -> Self {
    Self::new()
  }
}

impl CodeGenerator {
  pub fn new() -> Self {
    Self {
      instructions: Vec::new(),
      next_label: 0,
      loop_stack: Vec::new(),
    }
  }

  /// Lower a program to the symbolic instruction stream, `HALT`-terminated.
  pub fn generate(mut self, program: &Program) -> OkerResult<Vec<Instruction>> {
    for stmt in &program.statements {
      self.generate_statement(stmt)?;
    }
    self.emit(Instruction::Halt);
    Ok(self.instructions)
  }

  fn emit(&mut self, instruction: Instruction) {
    self.instructions.push(instruction);
  }

  fn fresh_label(&mut self) -> LabelId {
    let id = self.next_label;
    self.next_label += 1;
    id
  }

  fn mark_label(&mut self, id: LabelId) {
    self.emit(Instruction::Label(id));
  }

  fn generate_statement(&mut self, stmt: &Stmt) -> OkerResult<()> {
    match stmt {
      Stmt::VarDecl {
        name, initializer, ..
      } => {
        match initializer {
          Some(init) => self.generate_expression(init)?,
          None => self.emit(Instruction::PushNumber(0.0)),
        }
        self.emit(Instruction::DeclareVar(name.clone()));
        Ok(())
      }
      Stmt::Assign { target, value, .. } => self.generate_assignment(target, value),
      Stmt::FunctionDecl(decl) => self.generate_function(decl, None),
      Stmt::ClassDecl { name, methods, .. } => {
        self.emit(Instruction::DefineClass(name.clone()));
        for method in methods {
          self.generate_function(method, Some(name))?;
        }
        Ok(())
      }
      Stmt::If {
        condition,
        then_branch,
        else_branch,
        ..
      } => {
        let else_label = self.fresh_label();
        let end_label = self.fresh_label();

        self.generate_expression(condition)?;
        self.emit(Instruction::JumpIfFalse(Target::Label(else_label)));

        for stmt in then_branch {
          self.generate_statement(stmt)?;
        }

        if !else_branch.is_empty() {
          self.emit(Instruction::Jump(Target::Label(end_label)));
        }

        self.mark_label(else_label);
        for stmt in else_branch {
          self.generate_statement(stmt)?;
        }
        self.mark_label(end_label);
        Ok(())
      }
      Stmt::While {
        condition, body, ..
      } => {
        let start_label = self.fresh_label();
        let end_label = self.fresh_label();
        self.loop_stack.push(LoopContext {
          start: start_label,
          end: end_label,
        });

        self.mark_label(start_label);
        self.generate_expression(condition)?;
        self.emit(Instruction::JumpIfFalse(Target::Label(end_label)));

        for stmt in body {
          self.generate_statement(stmt)?;
        }

        self.emit(Instruction::Jump(Target::Label(start_label)));
        self.mark_label(end_label);
        self.loop_stack.pop();
        Ok(())
      }
      Stmt::Repeat { count, body, .. } => self.generate_repeat(count, body),
      Stmt::Return { value, .. } => {
        match value {
          Some(value) => self.generate_expression(value)?,
          None => self.emit(Instruction::PushNumber(0.0)),
        }
        self.emit(Instruction::Return);
        Ok(())
      }
      Stmt::Break { .. } => {
        let target = self
          .loop_stack
          .last()
          .map(|ctx| ctx.end)
          .ok_or_else(|| OkerError::codegen("'break' outside of a loop"))?;
        self.emit(Instruction::Jump(Target::Label(target)));
        Ok(())
      }
      Stmt::Continue { .. } => {
        let target = self
          .loop_stack
          .last()
          .map(|ctx| ctx.start)
          .ok_or_else(|| OkerError::codegen("'continue' outside of a loop"))?;
        self.emit(Instruction::Jump(Target::Label(target)));
        Ok(())
      }
      Stmt::Try {
        try_block,
        fail_block,
        ..
      } => {
        let fail_label = self.fresh_label();
        let end_label = self.fresh_label();

        self.emit(Instruction::TryStart(Target::Label(fail_label)));
        for stmt in try_block {
          self.generate_statement(stmt)?;
        }
        self.emit(Instruction::TryEnd);
        self.emit(Instruction::Jump(Target::Label(end_label)));

        self.mark_label(fail_label);
        for stmt in fail_block {
          self.generate_statement(stmt)?;
        }
        self.mark_label(end_label);
        Ok(())
      }
      Stmt::ExpressionStmt { expr, .. } => {
        self.generate_expression(expr)?;
        self.emit(Instruction::Pop);
        Ok(())
      }
    }
  }

  fn generate_assignment(&mut self, target: &Expr, value: &Expr) -> OkerResult<()> {
    match target {
      Expr::Identifier { name, .. } => {
        self.generate_expression(value)?;
        self.emit(Instruction::AssignVar(name.clone()));
        Ok(())
      }
      Expr::Index { object, index, .. } => {
        self.generate_expression(value)?;
        self.generate_expression(object)?;
        self.generate_expression(index)?;
        self.emit(Instruction::SetIndex);
        // SET_INDEX pushes the stored value as the expression's result; as
        // a statement that result is discarded
        self.emit(Instruction::Pop);
        Ok(())
      }
      Expr::Member {
        object, property, ..
      } => {
        self.generate_expression(object)?;
        self.generate_expression(value)?;
        self.emit(Instruction::SetProperty(property.clone()));
        self.emit(Instruction::Pop);
        Ok(())
      }
      _ => Err(OkerError::codegen("Invalid assignment target")),
    }
  }

  /// `repeat N` synthesizes a counter counting down to zero.
  fn generate_repeat(&mut self, count: &Expr, body: &[Stmt]) -> OkerResult<()> {
    let start_label = self.fresh_label();
    let end_label = self.fresh_label();
    let counter = format!("__repeat_counter_{}", self.fresh_label());

    self.loop_stack.push(LoopContext {
      start: start_label,
      end: end_label,
    });

    self.generate_expression(count)?;
    self.emit(Instruction::DeclareVar(counter.clone()));

    self.mark_label(start_label);
    self.emit(Instruction::GetVar(counter.clone()));
    self.emit(Instruction::PushNumber(0.0));
    self.emit(Instruction::Gt);
    self.emit(Instruction::JumpIfFalse(Target::Label(end_label)));

    for stmt in body {
      self.generate_statement(stmt)?;
    }

    self.emit(Instruction::GetVar(counter.clone()));
    self.emit(Instruction::PushNumber(1.0));
    self.emit(Instruction::Sub);
    self.emit(Instruction::AssignVar(counter));

    self.emit(Instruction::Jump(Target::Label(start_label)));
    self.mark_label(end_label);
    self.loop_stack.pop();
    Ok(())
  }

  /// Function bodies are inlined behind a jump, then registered by a
  /// `DEFINE_FUNCTION` that executes in normal flow. Methods get the
  /// qualified `Class.method` name the VM uses to fill the method table.
  fn generate_function(&mut self, decl: &FunctionDecl, class: Option<&str>) -> OkerResult<()> {
    let start_label = self.fresh_label();
    let end_label = self.fresh_label();

    self.emit(Instruction::Jump(Target::Label(end_label)));
    self.mark_label(start_label);

    for stmt in &decl.body {
      self.generate_statement(stmt)?;
    }

    self.emit(Instruction::PushNumber(0.0));
    self.emit(Instruction::Return);
    self.mark_label(end_label);

    let name = match class {
      Some(class) => format!("{class}.{}", decl.name),
      None => decl.name.clone(),
    };
    self.emit(Instruction::DefineFunction {
      name,
      start: Target::Label(start_label),
      params: decl.params.clone(),
    });
    Ok(())
  }

  fn generate_expression(&mut self, expr: &Expr) -> OkerResult<()> {
    match expr {
      Expr::NumberLit { value, .. } => {
        self.emit(Instruction::PushNumber(*value));
        Ok(())
      }
      Expr::StringLit { value, .. } => {
        self.emit(Instruction::PushString(value.clone()));
        Ok(())
      }
      Expr::BoolLit { value, .. } => {
        self.emit(Instruction::PushBoolean(*value));
        Ok(())
      }
      Expr::Identifier { name, .. } => {
        if name == "this" {
          self.emit(Instruction::GetThis);
        } else {
          self.emit(Instruction::GetVar(name.clone()));
        }
        Ok(())
      }
      Expr::ListLit { elements, .. } => {
        for element in elements {
          self.generate_expression(element)?;
        }
        self.emit(Instruction::BuildList(elements.len()));
        Ok(())
      }
      Expr::DictLit { entries, .. } => {
        for (key, value) in entries {
          self.generate_expression(key)?;
          self.generate_expression(value)?;
        }
        self.emit(Instruction::BuildDict(entries.len()));
        Ok(())
      }
      Expr::Index { object, index, .. } => {
        self.generate_expression(object)?;
        self.generate_expression(index)?;
        self.emit(Instruction::GetIndex);
        Ok(())
      }
      Expr::Member {
        object, property, ..
      } => {
        self.generate_expression(object)?;
        self.emit(Instruction::GetProperty(property.clone()));
        Ok(())
      }
      Expr::Binary {
        left, op, right, ..
      } => {
        self.generate_expression(left)?;
        self.generate_expression(right)?;
        self.emit(match op {
          BinaryOp::Add => Instruction::Add,
          BinaryOp::Subtract => Instruction::Sub,
          BinaryOp::Multiply => Instruction::Mul,
          BinaryOp::Divide => Instruction::Div,
          BinaryOp::Modulo => Instruction::Mod,
          BinaryOp::Equal => Instruction::Eq,
          BinaryOp::NotEqual => Instruction::Ne,
          BinaryOp::LessThan => Instruction::Lt,
          BinaryOp::LessEqual => Instruction::Le,
          BinaryOp::GreaterThan => Instruction::Gt,
          BinaryOp::GreaterEqual => Instruction::Ge,
          BinaryOp::And => Instruction::And,
          BinaryOp::Or => Instruction::Or,
        });
        Ok(())
      }
      Expr::Unary { op, operand, .. } => {
        self.generate_expression(operand)?;
        self.emit(match op {
          UnaryOp::Negate => Instruction::Neg,
          UnaryOp::Not => Instruction::Not,
        });
        Ok(())
      }
      Expr::Call {
        callee,
        args,
        is_new,
        ..
      } => self.generate_call(callee, args, *is_new),
    }
  }

  fn generate_call(&mut self, callee: &Expr, args: &[Expr], is_new: bool) -> OkerResult<()> {
    match callee {
      Expr::Identifier { name, .. } => {
        // Arguments go out in reverse positional order so popping yields
        // them first-to-last on the other side.
        for arg in args.iter().rev() {
          self.generate_expression(arg)?;
        }
        if is_new {
          self.emit(Instruction::CreateInstance {
            class: name.clone(),
            arg_count: args.len(),
          });
        } else if builtins::is_builtin(name) {
          self.emit(Instruction::BuiltinCall {
            name: name.clone(),
            arg_count: args.len(),
          });
        } else {
          self.emit(Instruction::Call {
            name: name.clone(),
            arg_count: args.len(),
          });
        }
        Ok(())
      }
      Expr::Member {
        object, property, ..
      } => {
        // Receiver first, validated and left on the stack by GET_PROPERTY,
        // then the arguments above it.
        self.generate_expression(object)?;
        self.emit(Instruction::GetProperty(property.clone()));
        for arg in args.iter().rev() {
          self.generate_expression(arg)?;
        }
        self.emit(Instruction::Call {
          name: property.clone(),
          arg_count: args.len(),
        });
        Ok(())
      }
      _ => Err(OkerError::codegen(
        "Can only call functions by name or method",
      )),
    }
  }
}

/// Replace every symbolic label with its absolute instruction index and
/// strip the position markers. Rejects targets that name a label no marker
/// defined.
pub fn resolve_labels(instructions: Vec<Instruction>) -> OkerResult<Vec<Instruction>> {
  let mut addresses: HashMap<LabelId, u32> = HashMap::new();
  let mut address = 0u32;

  for instruction in &instructions {
    match instruction {
      Instruction::Label(id) => {
        addresses.insert(*id, address);
      }
      _ => address += 1,
    }
  }

  let patch = |target: Target| -> OkerResult<Target> {
    match target {
      Target::Label(id) => addresses
        .get(&id)
        .map(|addr| Target::Addr(*addr))
        .ok_or_else(|| OkerError::codegen(format!("Unresolved label L{id}"))),
      Target::Addr(_) => Ok(target),
    }
  };

  let mut resolved = Vec::with_capacity(instructions.len());
  for instruction in instructions {
    let patched = match instruction {
      Instruction::Label(_) => continue,
      Instruction::Jump(target) => Instruction::Jump(patch(target)?),
      Instruction::JumpIfFalse(target) => Instruction::JumpIfFalse(patch(target)?),
      Instruction::JumpIfTrue(target) => Instruction::JumpIfTrue(patch(target)?),
      Instruction::TryStart(target) => Instruction::TryStart(patch(target)?),
      Instruction::DefineFunction {
        name,
        start,
        params,
      } => Instruction::DefineFunction {
        name,
        start: patch(start)?,
        params,
      },
      other => other,
    };
    resolved.push(patched);
  }

  Ok(resolved)
}

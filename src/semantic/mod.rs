//! Semantic analysis: scope and symbol resolution, structural checks, and
//! permissive coarse typing.
//!
//! The analyzer produces no new IR. Its typing is deliberately loose: an
//! `Unknown` operand is accepted everywhere so dynamic patterns are not
//! blocked, and only mismatches that are provable from concrete types are
//! reported.

pub mod symbol;

use crate::error::{OkerError, OkerResult};
use crate::parser::ast::{BinaryOp, Expr, FunctionDecl, Program, Stmt, UnaryOp};
use crate::vm::builtins;
use symbol::{CoarseType, ScopeStack, Symbol, SymbolKind};

pub struct SemanticAnalyzer {
  scopes: ScopeStack,
  loop_depth: usize,
  in_function: bool,
  current_class: Option<String>,
}

impl Default for SemanticAnalyzer {
  fn default() -> Self {
    Self::new()
  }
}

impl SemanticAnalyzer {
  pub fn new() -> Self {
    let mut scopes = ScopeStack::new();
    for name in builtins::names() {
      scopes.define(Symbol::function(name));
    }

    Self {
      scopes,
      loop_depth: 0,
      in_function: false,
      current_class: None,
    }
  }

  pub fn analyze(&mut self, program: &Program) -> OkerResult<()> {
    for stmt in &program.statements {
      self.analyze_statement(stmt)?;
    }
    Ok(())
  }

  fn analyze_statement(&mut self, stmt: &Stmt) -> OkerResult<()> {
    match stmt {
      Stmt::VarDecl {
        name, initializer, ..
      } => {
        let ty = match initializer {
          Some(init) => self.analyze_expression(init)?,
          // Absent initializer defaults to numeric zero
          None => CoarseType::Number,
        };
        self.scopes.define(Symbol::var(name.clone(), ty));
        Ok(())
      }
      Stmt::Assign { target, value, .. } => {
        self.analyze_expression(target)?;
        self.analyze_expression(value)?;
        Ok(())
      }
      Stmt::FunctionDecl(decl) => self.analyze_function(decl),
      Stmt::ClassDecl { name, methods, .. } => self.analyze_class(name, methods),
      Stmt::If {
        condition,
        then_branch,
        else_branch,
        ..
      } => {
        self.analyze_expression(condition)?;
        self.analyze_block(then_branch)?;
        if !else_branch.is_empty() {
          self.analyze_block(else_branch)?;
        }
        Ok(())
      }
      Stmt::While {
        condition, body, ..
      } => {
        self.analyze_expression(condition)?;
        self.loop_depth += 1;
        let result = self.analyze_block(body);
        self.loop_depth -= 1;
        result
      }
      Stmt::Repeat { count, body, .. } => {
        let count_ty = self.analyze_expression(count)?;
        if count_ty != CoarseType::Number && count_ty != CoarseType::Unknown {
          return Err(OkerError::semantic(format!(
            "Repeat count must be a number, got {}",
            count_ty.name()
          )));
        }
        self.loop_depth += 1;
        let result = self.analyze_block(body);
        self.loop_depth -= 1;
        result
      }
      Stmt::Return { value, .. } => {
        if !self.in_function {
          return Err(OkerError::semantic("'return' outside of a function"));
        }
        if let Some(value) = value {
          self.analyze_expression(value)?;
        }
        Ok(())
      }
      Stmt::Break { .. } => {
        if self.loop_depth == 0 {
          return Err(OkerError::semantic("'break' outside of a loop"));
        }
        Ok(())
      }
      Stmt::Continue { .. } => {
        if self.loop_depth == 0 {
          return Err(OkerError::semantic("'continue' outside of a loop"));
        }
        Ok(())
      }
      Stmt::Try {
        try_block,
        fail_block,
        ..
      } => {
        self.analyze_block(try_block)?;
        self.analyze_block(fail_block)
      }
      Stmt::ExpressionStmt { expr, .. } => {
        self.analyze_expression(expr)?;
        Ok(())
      }
    }
  }

  fn analyze_block(&mut self, statements: &[Stmt]) -> OkerResult<()> {
    self.scopes.push_scope();
    let result = statements
      .iter()
      .try_for_each(|stmt| self.analyze_statement(stmt));
    self.scopes.pop_scope();
    result
  }

  fn analyze_function(&mut self, decl: &FunctionDecl) -> OkerResult<()> {
    self.scopes.define(Symbol::function(decl.name.clone()));

    self.scopes.push_scope();
    for param in &decl.params {
      self
        .scopes
        .define(Symbol::var(param.clone(), CoarseType::Unknown));
    }

    let was_in_function = self.in_function;
    self.in_function = true;
    let result = decl
      .body
      .iter()
      .try_for_each(|stmt| self.analyze_statement(stmt));
    self.in_function = was_in_function;
    self.scopes.pop_scope();

    result
  }

  fn analyze_class(&mut self, name: &str, methods: &[FunctionDecl]) -> OkerResult<()> {
    // Defined before the method walk so methods can instantiate their own
    // class.
    self.scopes.define(Symbol::class(name));
    self.current_class = Some(name.to_string());

    self.scopes.push_scope();
    let result = methods.iter().try_for_each(|method| self.analyze_function(method));
    self.scopes.pop_scope();

    self.current_class = None;
    result
  }

  fn analyze_expression(&mut self, expr: &Expr) -> OkerResult<CoarseType> {
    match expr {
      Expr::NumberLit { .. } => Ok(CoarseType::Number),
      Expr::StringLit { .. } => Ok(CoarseType::String),
      Expr::BoolLit { .. } => Ok(CoarseType::Boolean),
      Expr::Identifier { name, .. } => self.analyze_identifier(name),
      Expr::ListLit { elements, .. } => {
        for element in elements {
          self.analyze_expression(element)?;
        }
        Ok(CoarseType::List)
      }
      Expr::DictLit { entries, .. } => {
        for (key, value) in entries {
          self.analyze_expression(key)?;
          self.analyze_expression(value)?;
        }
        Ok(CoarseType::Dictionary)
      }
      Expr::Index { object, index, .. } => self.analyze_index(object, index),
      Expr::Member { object, .. } => self.analyze_member(object),
      Expr::Binary {
        left, op, right, ..
      } => self.analyze_binary(left, *op, right),
      Expr::Unary { op, operand, .. } => self.analyze_unary(*op, operand),
      Expr::Call {
        callee,
        args,
        is_new,
        ..
      } => {
        if *is_new {
          self.analyze_new(callee, args)
        } else {
          self.analyze_call(callee, args)
        }
      }
    }
  }

  fn analyze_identifier(&mut self, name: &str) -> OkerResult<CoarseType> {
    if name == "this" {
      if self.current_class.is_none() {
        return Err(OkerError::semantic(
          "'this' can only be used inside a class method",
        ));
      }
      return Ok(CoarseType::Instance);
    }

    match self.scopes.lookup(name) {
      Some(symbol) => Ok(symbol.ty),
      None => Err(OkerError::semantic(format!("Undefined variable: {name}"))),
    }
  }

  fn analyze_index(&mut self, object: &Expr, index: &Expr) -> OkerResult<CoarseType> {
    let object_ty = self.analyze_expression(object)?;
    let index_ty = self.analyze_expression(index)?;

    match object_ty {
      CoarseType::List => {
        if index_ty != CoarseType::Number && index_ty != CoarseType::Unknown {
          return Err(OkerError::semantic("List index must be a number"));
        }
        Ok(CoarseType::Unknown)
      }
      CoarseType::Dictionary => {
        if index_ty != CoarseType::String && index_ty != CoarseType::Unknown {
          return Err(OkerError::semantic("Dictionary key must be a string"));
        }
        Ok(CoarseType::Unknown)
      }
      CoarseType::Unknown | CoarseType::Instance => Ok(CoarseType::Unknown),
      other => Err(OkerError::semantic(format!(
        "Cannot index a value of type {}",
        other.name()
      ))),
    }
  }

  fn analyze_member(&mut self, object: &Expr) -> OkerResult<CoarseType> {
    let object_ty = self.analyze_expression(object)?;
    if object_ty != CoarseType::Instance && object_ty != CoarseType::Unknown {
      return Err(OkerError::semantic(
        "Member access '.' is only valid on class instances",
      ));
    }
    // Which property an instance has is only known at runtime
    Ok(CoarseType::Unknown)
  }

  fn analyze_binary(
    &mut self,
    left: &Expr,
    op: BinaryOp,
    right: &Expr,
  ) -> OkerResult<CoarseType> {
    let left_ty = self.analyze_expression(left)?;
    let right_ty = self.analyze_expression(right)?;

    let numeric = |ty: CoarseType| ty == CoarseType::Number || ty == CoarseType::Unknown;

    match op {
      BinaryOp::Add => {
        if left_ty == CoarseType::Number && right_ty == CoarseType::Number {
          Ok(CoarseType::Number)
        } else if left_ty == CoarseType::String || right_ty == CoarseType::String {
          Ok(CoarseType::String)
        } else if left_ty == CoarseType::Unknown || right_ty == CoarseType::Unknown {
          Ok(CoarseType::Unknown)
        } else {
          Err(OkerError::semantic(format!(
            "Cannot add {} and {}",
            left_ty.name(),
            right_ty.name()
          )))
        }
      }
      BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
        if numeric(left_ty) && numeric(right_ty) {
          Ok(CoarseType::Number)
        } else {
          Err(OkerError::semantic(format!(
            "Arithmetic '{}' requires numbers, got {} and {}",
            op.symbol(),
            left_ty.name(),
            right_ty.name()
          )))
        }
      }
      BinaryOp::Equal
      | BinaryOp::NotEqual
      | BinaryOp::LessThan
      | BinaryOp::LessEqual
      | BinaryOp::GreaterThan
      | BinaryOp::GreaterEqual
      | BinaryOp::And
      | BinaryOp::Or => Ok(CoarseType::Boolean),
    }
  }

  fn analyze_unary(&mut self, op: UnaryOp, operand: &Expr) -> OkerResult<CoarseType> {
    let operand_ty = self.analyze_expression(operand)?;
    match op {
      UnaryOp::Negate => {
        if operand_ty == CoarseType::Number || operand_ty == CoarseType::Unknown {
          Ok(CoarseType::Number)
        } else {
          Err(OkerError::semantic(format!(
            "Unary '-' requires a number, got {}",
            operand_ty.name()
          )))
        }
      }
      UnaryOp::Not => {
        if operand_ty == CoarseType::Boolean || operand_ty == CoarseType::Unknown {
          Ok(CoarseType::Boolean)
        } else {
          Err(OkerError::semantic(format!(
            "Logical 'not' requires a boolean, got {}",
            operand_ty.name()
          )))
        }
      }
    }
  }

  fn analyze_call(&mut self, callee: &Expr, args: &[Expr]) -> OkerResult<CoarseType> {
    match callee {
      Expr::Identifier { name, .. } => {
        let kind = match self.scopes.lookup(name) {
          Some(symbol) => symbol.kind,
          None => {
            return Err(OkerError::semantic(format!("Undefined function: {name}")));
          }
        };
        if kind != SymbolKind::Function {
          return Err(OkerError::semantic(format!(
            "Cannot call non-function: {name}"
          )));
        }
        for arg in args {
          self.analyze_expression(arg)?;
        }
        Ok(CoarseType::Unknown)
      }
      Expr::Member { object, .. } => {
        // Method call; the method set is only known at runtime
        self.analyze_member(object)?;
        for arg in args {
          self.analyze_expression(arg)?;
        }
        Ok(CoarseType::Unknown)
      }
      _ => Err(OkerError::semantic(
        "Can only call functions by name or method",
      )),
    }
  }

  fn analyze_new(&mut self, callee: &Expr, args: &[Expr]) -> OkerResult<CoarseType> {
    let name = match callee {
      Expr::Identifier { name, .. } => name,
      _ => return Err(OkerError::semantic("Expected a class name after 'new'")),
    };

    match self.scopes.lookup(name) {
      Some(symbol) if symbol.kind == SymbolKind::Class => {}
      _ => {
        return Err(OkerError::semantic(format!(
          "'{name}' is not a defined class"
        )));
      }
    }

    for arg in args {
      self.analyze_expression(arg)?;
    }

    Ok(CoarseType::Instance)
  }
}

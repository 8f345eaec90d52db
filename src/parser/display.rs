//! Indented AST dump backing the `--parse` flag.

use super::ast::{Expr, FunctionDecl, Program, Stmt};
use std::fmt::Write;

pub fn dump_program(program: &Program) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Program:");
  for stmt in &program.statements {
    dump_stmt(stmt, 1, &mut out);
  }
  out
}

fn pad(level: usize) -> String {
  "  ".repeat(level)
}

fn dump_stmt(stmt: &Stmt, level: usize, out: &mut String) {
  let indent = pad(level);
  match stmt {
    Stmt::VarDecl {
      name, initializer, ..
    } => {
      let _ = writeln!(out, "{indent}VariableDeclaration: {name}");
      if let Some(init) = initializer {
        let _ = writeln!(out, "{}Initializer:", pad(level + 1));
        dump_expr(init, level + 2, out);
      }
    }
    Stmt::Assign { target, value, .. } => {
      let _ = writeln!(out, "{indent}Assignment:");
      let _ = writeln!(out, "{}Target:", pad(level + 1));
      dump_expr(target, level + 2, out);
      let _ = writeln!(out, "{}Value:", pad(level + 1));
      dump_expr(value, level + 2, out);
    }
    Stmt::FunctionDecl(decl) => dump_function(decl, level, out),
    Stmt::ClassDecl { name, methods, .. } => {
      let _ = writeln!(out, "{indent}ClassDeclaration: {name}");
      for method in methods {
        dump_function(method, level + 1, out);
      }
    }
    Stmt::If {
      condition,
      then_branch,
      else_branch,
      ..
    } => {
      let _ = writeln!(out, "{indent}IfStatement:");
      let _ = writeln!(out, "{}Condition:", pad(level + 1));
      dump_expr(condition, level + 2, out);
      let _ = writeln!(out, "{}Then:", pad(level + 1));
      for s in then_branch {
        dump_stmt(s, level + 2, out);
      }
      if !else_branch.is_empty() {
        let _ = writeln!(out, "{}Else:", pad(level + 1));
        for s in else_branch {
          dump_stmt(s, level + 2, out);
        }
      }
    }
    Stmt::While {
      condition, body, ..
    } => {
      let _ = writeln!(out, "{indent}WhileStatement:");
      let _ = writeln!(out, "{}Condition:", pad(level + 1));
      dump_expr(condition, level + 2, out);
      let _ = writeln!(out, "{}Body:", pad(level + 1));
      for s in body {
        dump_stmt(s, level + 2, out);
      }
    }
    Stmt::Repeat { count, body, .. } => {
      let _ = writeln!(out, "{indent}RepeatStatement:");
      let _ = writeln!(out, "{}Count:", pad(level + 1));
      dump_expr(count, level + 2, out);
      let _ = writeln!(out, "{}Body:", pad(level + 1));
      for s in body {
        dump_stmt(s, level + 2, out);
      }
    }
    Stmt::Return { value, .. } => {
      let _ = writeln!(out, "{indent}ReturnStatement:");
      if let Some(v) = value {
        let _ = writeln!(out, "{}Value:", pad(level + 1));
        dump_expr(v, level + 2, out);
      }
    }
    Stmt::Break { .. } => {
      let _ = writeln!(out, "{indent}BreakStatement");
    }
    Stmt::Continue { .. } => {
      let _ = writeln!(out, "{indent}ContinueStatement");
    }
    Stmt::Try {
      try_block,
      fail_block,
      ..
    } => {
      let _ = writeln!(out, "{indent}TryStatement:");
      let _ = writeln!(out, "{}Try:", pad(level + 1));
      for s in try_block {
        dump_stmt(s, level + 2, out);
      }
      let _ = writeln!(out, "{}Fail:", pad(level + 1));
      for s in fail_block {
        dump_stmt(s, level + 2, out);
      }
    }
    Stmt::ExpressionStmt { expr, .. } => {
      let _ = writeln!(out, "{indent}ExpressionStatement:");
      dump_expr(expr, level + 1, out);
    }
  }
}

fn dump_function(decl: &FunctionDecl, level: usize, out: &mut String) {
  let indent = pad(level);
  let _ = writeln!(out, "{indent}FunctionDeclaration: {}", decl.name);
  let _ = writeln!(out, "{}Parameters:", pad(level + 1));
  for param in &decl.params {
    let _ = writeln!(out, "{}{param}", pad(level + 2));
  }
  let _ = writeln!(out, "{}Body:", pad(level + 1));
  for stmt in &decl.body {
    dump_stmt(stmt, level + 2, out);
  }
}

fn dump_expr(expr: &Expr, level: usize, out: &mut String) {
  let indent = pad(level);
  match expr {
    Expr::NumberLit { value, .. } => {
      let _ = writeln!(out, "{indent}Number: {value}");
    }
    Expr::StringLit { value, .. } => {
      let _ = writeln!(out, "{indent}String: \"{value}\"");
    }
    Expr::BoolLit { value, .. } => {
      let _ = writeln!(out, "{indent}Boolean: {value}");
    }
    Expr::Identifier { name, .. } => {
      let _ = writeln!(out, "{indent}Identifier: {name}");
    }
    Expr::ListLit { elements, .. } => {
      let _ = writeln!(out, "{indent}ListLiteral:");
      for element in elements {
        dump_expr(element, level + 1, out);
      }
    }
    Expr::DictLit { entries, .. } => {
      let _ = writeln!(out, "{indent}DictLiteral:");
      for (key, value) in entries {
        let _ = writeln!(out, "{}Key:", pad(level + 1));
        dump_expr(key, level + 2, out);
        let _ = writeln!(out, "{}Value:", pad(level + 1));
        dump_expr(value, level + 2, out);
      }
    }
    Expr::Index { object, index, .. } => {
      let _ = writeln!(out, "{indent}IndexExpression:");
      let _ = writeln!(out, "{}Object:", pad(level + 1));
      dump_expr(object, level + 2, out);
      let _ = writeln!(out, "{}Index:", pad(level + 1));
      dump_expr(index, level + 2, out);
    }
    Expr::Member {
      object, property, ..
    } => {
      let _ = writeln!(out, "{indent}MemberExpression: .{property}");
      dump_expr(object, level + 1, out);
    }
    Expr::Binary {
      left, op, right, ..
    } => {
      let _ = writeln!(out, "{indent}BinaryExpression: {}", op.symbol());
      let _ = writeln!(out, "{}Left:", pad(level + 1));
      dump_expr(left, level + 2, out);
      let _ = writeln!(out, "{}Right:", pad(level + 1));
      dump_expr(right, level + 2, out);
    }
    Expr::Unary { op, operand, .. } => {
      let _ = writeln!(out, "{indent}UnaryExpression: {}", op.symbol());
      dump_expr(operand, level + 1, out);
    }
    Expr::Call {
      callee,
      args,
      is_new,
      ..
    } => {
      if *is_new {
        let _ = writeln!(out, "{indent}NewExpression:");
      } else {
        let _ = writeln!(out, "{indent}CallExpression:");
      }
      let _ = writeln!(out, "{}Callee:", pad(level + 1));
      dump_expr(callee, level + 2, out);
      let _ = writeln!(out, "{}Arguments:", pad(level + 1));
      for arg in args {
        dump_expr(arg, level + 2, out);
      }
    }
  }
}

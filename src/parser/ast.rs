//! AST node definitions.
//!
//! Two variant families, expressions and statements, plus the `Program`
//! root. Every node carries the line and column of its first token.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
  pub line: usize,
  pub column: usize,
}

impl Span {
  pub fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  NumberLit {
    value: f64,
    span: Span,
  },
  StringLit {
    value: String,
    span: Span,
  },
  BoolLit {
    value: bool,
    span: Span,
  },
  // `this` is an Identifier with the reserved name "this"
  Identifier {
    name: String,
    span: Span,
  },
  ListLit {
    elements: Vec<Expr>,
    span: Span,
  },
  DictLit {
    entries: Vec<(Expr, Expr)>,
    span: Span,
  },
  Index {
    object: Box<Expr>,
    index: Box<Expr>,
    span: Span,
  },
  Member {
    object: Box<Expr>,
    property: String,
    span: Span,
  },
  Binary {
    left: Box<Expr>,
    op: BinaryOp,
    right: Box<Expr>,
    span: Span,
  },
  Unary {
    op: UnaryOp,
    operand: Box<Expr>,
    span: Span,
  },
  Call {
    callee: Box<Expr>,
    args: Vec<Expr>,
    is_new: bool,
    span: Span,
  },
}

impl Expr {
  pub fn span(&self) -> Span {
    match self {
      Expr::NumberLit { span, .. }
      | Expr::StringLit { span, .. }
      | Expr::BoolLit { span, .. }
      | Expr::Identifier { span, .. }
      | Expr::ListLit { span, .. }
      | Expr::DictLit { span, .. }
      | Expr::Index { span, .. }
      | Expr::Member { span, .. }
      | Expr::Binary { span, .. }
      | Expr::Unary { span, .. }
      | Expr::Call { span, .. } => *span,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  Equal,
  NotEqual,
  LessThan,
  LessEqual,
  GreaterThan,
  GreaterEqual,
  And,
  Or,
}

impl BinaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Subtract => "-",
      BinaryOp::Multiply => "*",
      BinaryOp::Divide => "/",
      BinaryOp::Modulo => "%",
      BinaryOp::Equal => "==",
      BinaryOp::NotEqual => "!=",
      BinaryOp::LessThan => "<",
      BinaryOp::LessEqual => "<=",
      BinaryOp::GreaterThan => ">",
      BinaryOp::GreaterEqual => ">=",
      BinaryOp::And => "and",
      BinaryOp::Or => "or",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Negate,
  Not,
}

impl UnaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      UnaryOp::Negate => "-",
      UnaryOp::Not => "not",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  VarDecl {
    name: String,
    initializer: Option<Expr>,
    span: Span,
  },
  // Target is an Identifier, Index, or Member expression
  Assign {
    target: Expr,
    value: Expr,
    span: Span,
  },
  FunctionDecl(FunctionDecl),
  ClassDecl {
    name: String,
    methods: Vec<FunctionDecl>,
    span: Span,
  },
  If {
    condition: Expr,
    then_branch: Vec<Stmt>,
    else_branch: Vec<Stmt>,
    span: Span,
  },
  While {
    condition: Expr,
    body: Vec<Stmt>,
    span: Span,
  },
  Repeat {
    count: Expr,
    body: Vec<Stmt>,
    span: Span,
  },
  Return {
    value: Option<Expr>,
    span: Span,
  },
  Break {
    span: Span,
  },
  Continue {
    span: Span,
  },
  Try {
    try_block: Vec<Stmt>,
    fail_block: Vec<Stmt>,
    span: Span,
  },
  ExpressionStmt {
    expr: Expr,
    span: Span,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
  pub name: String,
  pub params: Vec<String>,
  pub body: Vec<Stmt>,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub statements: Vec<Stmt>,
}

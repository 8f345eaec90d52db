use std::collections::HashMap;

/// Advisory coarse type used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarseType {
  Number,
  String,
  Boolean,
  List,
  Dictionary,
  Function,
  Class,
  Instance,
  Void,
  Unknown,
}

impl CoarseType {
  pub fn name(&self) -> &'static str {
    match self {
      CoarseType::Number => "number",
      CoarseType::String => "string",
      CoarseType::Boolean => "boolean",
      CoarseType::List => "list",
      CoarseType::Dictionary => "dictionary",
      CoarseType::Function => "function",
      CoarseType::Class => "class",
      CoarseType::Instance => "instance",
      CoarseType::Void => "void",
      CoarseType::Unknown => "unknown",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
  Var,
  Function,
  Class,
}

#[derive(Debug, Clone)]
pub struct Symbol {
  pub name: String,
  pub kind: SymbolKind,
  pub ty: CoarseType,
}

impl Symbol {
  pub fn var(name: impl Into<String>, ty: CoarseType) -> Self {
    Self {
      name: name.into(),
      kind: SymbolKind::Var,
      ty,
    }
  }

  pub fn function(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      kind: SymbolKind::Function,
      ty: CoarseType::Function,
    }
  }

  pub fn class(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      kind: SymbolKind::Class,
      ty: CoarseType::Class,
    }
  }
}

/// A stack of scopes searched innermost-first.
#[derive(Debug, Default)]
pub struct ScopeStack {
  scopes: Vec<HashMap<String, Symbol>>,
}

impl ScopeStack {
  pub fn new() -> Self {
    Self {
      scopes: vec![HashMap::new()],
    }
  }

  pub fn push_scope(&mut self) {
    self.scopes.push(HashMap::new());
  }

  pub fn pop_scope(&mut self) {
    if self.scopes.len() > 1 {
      self.scopes.pop();
    }
  }

  pub fn define(&mut self, symbol: Symbol) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.insert(symbol.name.clone(), symbol);
    }
  }

  pub fn lookup(&self, name: &str) -> Option<&Symbol> {
    self.scopes.iter().rev().find_map(|scope| scope.get(name))
  }

  pub fn exists(&self, name: &str) -> bool {
    self.lookup(name).is_some()
  }
}

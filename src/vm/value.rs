use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type ValueList = Vec<Value>;
pub type ValueDict = IndexMap<String, Value>;

/// A user function or method registered by `DEFINE_FUNCTION`.
#[derive(Debug, Clone)]
pub struct Function {
  pub name: String,
  pub address: usize,
  pub params: Vec<String>,
  pub is_method: bool,
}

/// Class blueprint: the method table fills in as `DEFINE_FUNCTION`
/// instructions with dotted names execute.
#[derive(Debug)]
pub struct OkerClass {
  pub name: String,
  pub methods: RefCell<HashMap<String, Function>>,
}

impl OkerClass {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      methods: RefCell::new(HashMap::new()),
    }
  }
}

#[derive(Debug)]
pub struct OkerInstance {
  pub class: Rc<OkerClass>,
  pub fields: RefCell<HashMap<String, Value>>,
}

impl OkerInstance {
  pub fn new(class: Rc<OkerClass>) -> Self {
    Self {
      class,
      fields: RefCell::new(HashMap::new()),
    }
  }
}

/// Runtime value. Numbers, strings, and booleans are value-typed; lists,
/// dicts, and instances share their payload by reference, so assignment
/// copies the handle and mutation is visible through every alias.
#[derive(Debug, Clone)]
pub enum Value {
  Number(f64),
  Str(String),
  Bool(bool),
  List(Rc<RefCell<ValueList>>),
  Dict(Rc<RefCell<ValueDict>>),
  Class(Rc<OkerClass>),
  Instance(Rc<OkerInstance>),
}

impl Value {
  pub fn list(elements: ValueList) -> Self {
    Value::List(Rc::new(RefCell::new(elements)))
  }

  pub fn dict(entries: ValueDict) -> Self {
    Value::Dict(Rc::new(RefCell::new(entries)))
  }

  pub fn tag(&self) -> &'static str {
    match self {
      Value::Number(_) => "number",
      Value::Str(_) => "string",
      Value::Bool(_) => "boolean",
      Value::List(_) => "list",
      Value::Dict(_) => "dictionary",
      Value::Class(_) => "class",
      Value::Instance(_) => "instance",
    }
  }

  pub fn same_tag(&self, other: &Value) -> bool {
    std::mem::discriminant(self) == std::mem::discriminant(other)
  }

  /// Numeric projection: strings go through the float parser and fall back
  /// to zero, booleans map to 0/1, aggregates to 0.
  pub fn to_number(&self) -> f64 {
    match self {
      Value::Number(n) => *n,
      Value::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
      Value::Bool(b) => {
        if *b {
          1.0
        } else {
          0.0
        }
      }
      _ => 0.0,
    }
  }

  /// Boolean projection: a string is true iff non-empty and not "false";
  /// aggregates are always false.
  pub fn to_bool(&self) -> bool {
    match self {
      Value::Bool(b) => *b,
      Value::Number(n) => *n != 0.0,
      Value::Str(s) => !s.is_empty() && s != "false",
      _ => false,
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      // Aggregates compare by identity, not contents
      (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
      (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
      (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
      (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Number(n) => write!(f, "{n}"),
      Value::Str(s) => write!(f, "{s}"),
      Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
      Value::List(list) => {
        write!(f, "[")?;
        for (i, item) in list.borrow().iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{item}")?;
        }
        write!(f, "]")
      }
      Value::Dict(dict) => {
        write!(f, "{{")?;
        for (i, (key, value)) in dict.borrow().iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "\"{key}\": {value}")?;
        }
        write!(f, "}}")
      }
      Value::Class(class) => write!(f, "class {}", class.name),
      Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
    }
  }
}

//! Built-in function table.
//!
//! Dispatch goes through a name-keyed table of function pointers. The same
//! table backs `is_builtin`, which the semantic pass uses to pre-populate
//! the global scope and the code generator uses to pick `BUILTIN_CALL` over
//! `CALL`.

use super::value::Value;
use super::VmError;
use once_cell::sync::Lazy;
use rand::Rng;
use std::collections::HashMap;
use std::io::Write;

/// Interpreter-global builtin state: the string-builder buffer.
#[derive(Default)]
pub struct Builtins {
  string_builder: String,
}

type BuiltinFn = fn(&mut Builtins, &mut dyn Write, &[Value]) -> Result<Value, VmError>;

const BUILTINS: &[(&str, BuiltinFn)] = &[
  ("say", builtin_say),
  ("input", builtin_input),
  ("str", builtin_str),
  ("num", builtin_num),
  ("bool", builtin_bool),
  ("type", builtin_type),
  ("len", builtin_len),
  ("upper", builtin_upper),
  ("lower", builtin_lower),
  ("strip", builtin_strip),
  ("charAt", builtin_char_at),
  ("split_str", builtin_split_str),
  ("replace_str", builtin_replace_str),
  ("sbuild_new", builtin_sbuild_new),
  ("sbuild_add", builtin_sbuild_add),
  ("sbuild_get", builtin_sbuild_get),
  ("list_add", builtin_list_add),
  ("abs", builtin_abs),
  ("random", builtin_random),
  ("round", builtin_round),
  ("get", builtin_get),
  ("save", builtin_save),
  ("deletef", builtin_deletef),
  ("exists", builtin_exists),
  ("sleep", builtin_sleep),
  ("exit", builtin_exit),
];

static TABLE: Lazy<HashMap<&'static str, BuiltinFn>> =
  Lazy::new(|| BUILTINS.iter().copied().collect());

pub fn names() -> impl Iterator<Item = &'static str> {
  BUILTINS.iter().map(|(name, _)| *name)
}

pub fn is_builtin(name: &str) -> bool {
  TABLE.contains_key(name)
}

impl Builtins {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn call(
    &mut self,
    name: &str,
    out: &mut dyn Write,
    args: &[Value],
  ) -> Result<Value, VmError> {
    match TABLE.get(name) {
      Some(builtin) => builtin(self, out, args),
      None => Err(VmError::runtime(format!(
        "Unknown built-in function: {name}"
      ))),
    }
  }
}

fn io_failed(err: std::io::Error) -> VmError {
  VmError::runtime(format!("I/O error: {err}"))
}

// I/O

fn builtin_say(_: &mut Builtins, out: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let line = args
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join(" ");
  writeln!(out, "{line}").map_err(io_failed)?;
  Ok(Value::Number(0.0))
}

fn builtin_input(_: &mut Builtins, out: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  if let Some(prompt) = args.first() {
    write!(out, "{prompt}").map_err(io_failed)?;
    out.flush().map_err(io_failed)?;
  }

  let mut line = String::new();
  std::io::stdin().read_line(&mut line).map_err(io_failed)?;
  while line.ends_with('\n') || line.ends_with('\r') {
    line.pop();
  }
  Ok(Value::Str(line))
}

// Coercions

fn builtin_str(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  Ok(Value::Str(
    args.first().map(Value::to_string).unwrap_or_default(),
  ))
}

fn builtin_num(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  Ok(Value::Number(
    args.first().map(Value::to_number).unwrap_or(0.0),
  ))
}

fn builtin_bool(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  Ok(Value::Bool(
    args.first().map(Value::to_bool).unwrap_or(false),
  ))
}

fn builtin_type(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let name = match args.first() {
    None => "void",
    Some(Value::Number(_)) => "number",
    Some(Value::Str(_)) => "string",
    Some(Value::Bool(_)) => "boolean",
    Some(Value::List(_)) => "list",
    Some(Value::Dict(_)) => "dictionary",
    Some(_) => "unknown",
  };
  Ok(Value::Str(name.to_string()))
}

// Strings

fn builtin_len(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let len = match args.first() {
    Some(Value::Str(s)) => s.len(),
    Some(Value::List(list)) => list.borrow().len(),
    _ => 0,
  };
  Ok(Value::Number(len as f64))
}

fn builtin_upper(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let s = args.first().map(Value::to_string).unwrap_or_default();
  Ok(Value::Str(s.to_ascii_uppercase()))
}

fn builtin_lower(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let s = args.first().map(Value::to_string).unwrap_or_default();
  Ok(Value::Str(s.to_ascii_lowercase()))
}

fn builtin_strip(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let s = args.first().map(Value::to_string).unwrap_or_default();
  Ok(Value::Str(s.trim().to_string()))
}

fn builtin_char_at(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  if args.len() < 2 {
    return Ok(Value::Str(String::new()));
  }
  let s = args[0].to_string();
  let index = args[1].to_number() as i64;

  let ch = if index >= 0 {
    s.as_bytes().get(index as usize).copied()
  } else {
    None
  };
  Ok(Value::Str(
    ch.map(|b| (b as char).to_string()).unwrap_or_default(),
  ))
}

fn builtin_split_str(
  _: &mut Builtins,
  _: &mut dyn Write,
  args: &[Value],
) -> Result<Value, VmError> {
  if args.len() < 2 {
    return Ok(Value::list(Vec::new()));
  }
  let s = args[0].to_string();
  let delimiter = args[1].to_string();

  let parts: Vec<Value> = if delimiter.is_empty() {
    // An empty delimiter splits into single characters
    s.chars().map(|c| Value::Str(c.to_string())).collect()
  } else {
    s.split(delimiter.as_str())
      .map(|part| Value::Str(part.to_string()))
      .collect()
  };
  Ok(Value::list(parts))
}

fn builtin_replace_str(
  _: &mut Builtins,
  _: &mut dyn Write,
  args: &[Value],
) -> Result<Value, VmError> {
  if args.len() < 3 {
    return Ok(Value::Str(
      args.first().map(Value::to_string).unwrap_or_default(),
    ));
  }
  let source = args[0].to_string();
  let old = args[1].to_string();
  let new = args[2].to_string();

  if old.is_empty() {
    return Ok(Value::Str(source));
  }
  Ok(Value::Str(source.replace(&old, &new)))
}

// String builder

fn builtin_sbuild_new(
  builtins: &mut Builtins,
  _: &mut dyn Write,
  _: &[Value],
) -> Result<Value, VmError> {
  builtins.string_builder.clear();
  Ok(Value::Bool(true))
}

fn builtin_sbuild_add(
  builtins: &mut Builtins,
  _: &mut dyn Write,
  args: &[Value],
) -> Result<Value, VmError> {
  match args.first() {
    Some(value) => {
      builtins.string_builder.push_str(&value.to_string());
      Ok(Value::Bool(true))
    }
    None => Ok(Value::Bool(false)),
  }
}

fn builtin_sbuild_get(
  builtins: &mut Builtins,
  _: &mut dyn Write,
  _: &[Value],
) -> Result<Value, VmError> {
  Ok(Value::Str(builtins.string_builder.clone()))
}

// Lists

fn builtin_list_add(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  if args.len() < 2 {
    return Err(VmError::runtime("list_add expects a list and a value"));
  }
  match &args[0] {
    Value::List(list) => {
      list.borrow_mut().push(args[1].clone());
      Ok(args[0].clone())
    }
    _ => Err(VmError::runtime(
      "First argument to list_add must be a list",
    )),
  }
}

// Math

fn builtin_abs(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  Ok(Value::Number(
    args.first().map(Value::to_number).unwrap_or(0.0).abs(),
  ))
}

fn builtin_random(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let mut rng = rand::thread_rng();
  if args.len() >= 2 {
    let min = args[0].to_number();
    let max = args[1].to_number();
    if max <= min {
      return Ok(Value::Number(min));
    }
    Ok(Value::Number(rng.gen_range(min..max)))
  } else {
    Ok(Value::Number(rng.gen::<f64>()))
  }
}

fn builtin_round(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let n = args.first().map(Value::to_number).unwrap_or(0.0);
  let places = args.get(1).map(Value::to_number).unwrap_or(0.0) as i32;

  if places <= 0 {
    return Ok(Value::Number(n.round()));
  }
  let factor = 10f64.powi(places);
  Ok(Value::Number((n * factor).round() / factor))
}

// Files

fn builtin_get(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let path = match args.first() {
    Some(arg) => arg.to_string(),
    None => return Ok(Value::Bool(false)),
  };
  match std::fs::read_to_string(path) {
    Ok(content) => Ok(Value::Str(content)),
    Err(_) => Ok(Value::Bool(false)),
  }
}

fn builtin_save(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  if args.len() < 2 {
    return Ok(Value::Bool(false));
  }
  let path = args[0].to_string();
  let content = args[1].to_string();
  Ok(Value::Bool(std::fs::write(path, content).is_ok()))
}

fn builtin_deletef(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let path = match args.first() {
    Some(arg) => arg.to_string(),
    None => return Ok(Value::Bool(false)),
  };
  if !std::path::Path::new(&path).exists() {
    return Ok(Value::Bool(false));
  }
  Ok(Value::Bool(std::fs::remove_file(path).is_ok()))
}

fn builtin_exists(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let path = match args.first() {
    Some(arg) => arg.to_string(),
    None => return Ok(Value::Bool(false)),
  };
  Ok(Value::Bool(std::path::Path::new(&path).exists()))
}

// Process

fn builtin_sleep(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  if let Some(arg) = args.first() {
    let seconds = arg.to_number();
    if seconds > 0.0 {
      std::thread::sleep(std::time::Duration::from_millis((seconds * 1000.0) as u64));
    }
  }
  Ok(Value::Number(0.0))
}

fn builtin_exit(_: &mut Builtins, _: &mut dyn Write, args: &[Value]) -> Result<Value, VmError> {
  let code = args.first().map(Value::to_number).unwrap_or(0.0) as i32;
  Err(VmError::Exit(code))
}

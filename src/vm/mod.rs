//! Stack virtual machine.
//!
//! Executes a resolved instruction stream. State is the operand stack, the
//! call-frame stack, the try-frame stack, the global variable map, and the
//! function/class tables. Runtime errors unwind to the innermost try frame
//! when one exists; otherwise execution fails with the offending
//! instruction's index.

pub mod builtins;
pub mod value;

use crate::codegen::instruction::{Instruction, Target};
use crate::error::{OkerError, OkerResult};
use builtins::Builtins;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use value::{Function, OkerClass, OkerInstance, Value};

/// Errors raised while executing a single instruction. `Exit` is the `exit`
/// builtin's signal: it bypasses try frames and ends the run.
#[derive(Debug)]
pub enum VmError {
  Runtime(String),
  Exit(i32),
}

impl VmError {
  pub fn runtime(message: impl Into<String>) -> Self {
    VmError::Runtime(message.into())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
  Completed,
  Exit(i32),
}

impl ExitStatus {
  pub fn code(&self) -> i32 {
    match self {
      ExitStatus::Completed => 0,
      ExitStatus::Exit(code) => *code,
    }
  }
}

struct CallFrame {
  return_pc: usize,
  locals: HashMap<String, Value>,
  receiver: Option<Rc<OkerInstance>>,
  // Constructor frames discard their return value so the new instance stays
  // on top of the stack
  is_ctor: bool,
}

struct TryFrame {
  fail_target: usize,
  stack_depth: usize,
}

enum Flow {
  Next,
  Goto(usize),
  Halt,
}

pub struct Vm {
  pc: usize,
  stack: Vec<Value>,
  call_stack: Vec<CallFrame>,
  try_stack: Vec<TryFrame>,
  globals: HashMap<String, Value>,
  functions: HashMap<String, Function>,
  classes: HashMap<String, Rc<OkerClass>>,
  builtins: Builtins,
  out: Box<dyn Write>,
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

impl Vm {
  pub fn new() -> Self {
    Self::with_writer(Box::new(std::io::stdout()))
  }

  /// Build a VM whose `say`/`input` output goes to the given writer.
  pub fn with_writer(out: Box<dyn Write>) -> Self {
    Self {
      pc: 0,
      stack: Vec::new(),
      call_stack: Vec::new(),
      try_stack: Vec::new(),
      globals: HashMap::new(),
      functions: HashMap::new(),
      classes: HashMap::new(),
      builtins: Builtins::new(),
      out,
    }
  }

  pub fn execute(&mut self, instructions: &[Instruction]) -> OkerResult<ExitStatus> {
    self.pc = 0;

    while self.pc < instructions.len() {
      match self.execute_instruction(&instructions[self.pc]) {
        Ok(Flow::Next) => self.pc += 1,
        Ok(Flow::Goto(target)) => self.pc = target,
        Ok(Flow::Halt) => return Ok(ExitStatus::Completed),
        Err(VmError::Exit(code)) => return Ok(ExitStatus::Exit(code)),
        Err(VmError::Runtime(message)) => match self.try_stack.pop() {
          Some(frame) => {
            self.stack.truncate(frame.stack_depth);
            self.pc = frame.fail_target;
          }
          None => return Err(OkerError::runtime(message, self.pc)),
        },
      }
    }

    Ok(ExitStatus::Completed)
  }

  fn push(&mut self, value: Value) {
    self.stack.push(value);
  }

  fn pop(&mut self) -> Result<Value, VmError> {
    self
      .stack
      .pop()
      .ok_or_else(|| VmError::runtime("Stack underflow"))
  }

  fn peek(&self) -> Result<&Value, VmError> {
    self
      .stack
      .last()
      .ok_or_else(|| VmError::runtime("Stack is empty"))
  }

  fn jump_target(target: &Target) -> Result<usize, VmError> {
    target
      .addr()
      .ok_or_else(|| VmError::runtime("Unresolved jump target"))
  }

  fn get_variable(&self, name: &str) -> Result<Value, VmError> {
    if let Some(frame) = self.call_stack.last() {
      if let Some(value) = frame.locals.get(name) {
        return Ok(value.clone());
      }
    }
    self
      .globals
      .get(name)
      .cloned()
      .ok_or_else(|| VmError::runtime(format!("Undefined variable: {name}")))
  }

  /// Update an existing local, else write the global map.
  fn set_variable(&mut self, name: &str, value: Value) {
    if let Some(frame) = self.call_stack.last_mut() {
      if frame.locals.contains_key(name) {
        frame.locals.insert(name.to_string(), value);
        return;
      }
    }
    self.globals.insert(name.to_string(), value);
  }

  fn declare_variable(&mut self, name: &str, value: Value) {
    match self.call_stack.last_mut() {
      Some(frame) => {
        frame.locals.insert(name.to_string(), value);
      }
      None => {
        self.globals.insert(name.to_string(), value);
      }
    }
  }

  fn execute_instruction(&mut self, instruction: &Instruction) -> Result<Flow, VmError> {
    match instruction {
      Instruction::PushNumber(n) => {
        self.push(Value::Number(*n));
        Ok(Flow::Next)
      }
      Instruction::PushString(s) => {
        self.push(Value::Str(s.clone()));
        Ok(Flow::Next)
      }
      Instruction::PushBoolean(b) => {
        self.push(Value::Bool(*b));
        Ok(Flow::Next)
      }

      Instruction::DeclareVar(name) => {
        let value = self.pop()?;
        self.declare_variable(name, value);
        Ok(Flow::Next)
      }
      Instruction::AssignVar(name) => {
        let value = self.pop()?;
        self.set_variable(name, value);
        Ok(Flow::Next)
      }
      Instruction::GetVar(name) => {
        let value = self.get_variable(name)?;
        self.push(value);
        Ok(Flow::Next)
      }

      Instruction::Add
      | Instruction::Sub
      | Instruction::Mul
      | Instruction::Div
      | Instruction::Mod => {
        self.binary_arithmetic(instruction)?;
        Ok(Flow::Next)
      }
      Instruction::Neg => {
        let operand = self.pop()?;
        self.push(Value::Number(-operand.to_number()));
        Ok(Flow::Next)
      }
      Instruction::Not => {
        let operand = self.pop()?;
        self.push(Value::Bool(!operand.to_bool()));
        Ok(Flow::Next)
      }

      Instruction::Eq
      | Instruction::Ne
      | Instruction::Lt
      | Instruction::Le
      | Instruction::Gt
      | Instruction::Ge => {
        self.comparison(instruction)?;
        Ok(Flow::Next)
      }

      Instruction::And => {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(Value::Bool(left.to_bool() && right.to_bool()));
        Ok(Flow::Next)
      }
      Instruction::Or => {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(Value::Bool(left.to_bool() || right.to_bool()));
        Ok(Flow::Next)
      }

      Instruction::Jump(target) => Ok(Flow::Goto(Self::jump_target(target)?)),
      Instruction::JumpIfFalse(target) => {
        let condition = self.pop()?;
        if !condition.to_bool() {
          Ok(Flow::Goto(Self::jump_target(target)?))
        } else {
          Ok(Flow::Next)
        }
      }
      Instruction::JumpIfTrue(target) => {
        let condition = self.pop()?;
        if condition.to_bool() {
          Ok(Flow::Goto(Self::jump_target(target)?))
        } else {
          Ok(Flow::Next)
        }
      }

      Instruction::DefineFunction {
        name,
        start,
        params,
      } => {
        let address = Self::jump_target(start)?;
        self.define_function(name, address, params)?;
        Ok(Flow::Next)
      }
      Instruction::Call { name, arg_count } => self.call(name, *arg_count),
      Instruction::Return => {
        let return_value = self.pop()?;
        let frame = self
          .call_stack
          .pop()
          .ok_or_else(|| VmError::runtime("Return outside function"))?;
        if !frame.is_ctor {
          self.push(return_value);
        }
        Ok(Flow::Goto(frame.return_pc))
      }

      Instruction::BuiltinCall { name, arg_count } => {
        // Reverse emission means popping yields positional order
        let mut args = Vec::with_capacity(*arg_count);
        for _ in 0..*arg_count {
          args.push(self.pop()?);
        }
        let result = self.builtins.call(name, &mut self.out, &args)?;
        self.push(result);
        Ok(Flow::Next)
      }

      Instruction::BuildList(count) => {
        let mut elements = Vec::with_capacity(*count);
        for _ in 0..*count {
          elements.push(self.pop()?);
        }
        elements.reverse();
        self.push(Value::list(elements));
        Ok(Flow::Next)
      }
      Instruction::BuildDict(count) => {
        let mut entries = Vec::with_capacity(*count);
        for _ in 0..*count {
          let value = self.pop()?;
          let key = self.pop()?;
          entries.push((key.to_string(), value));
        }
        entries.reverse();
        self.push(Value::dict(entries.into_iter().collect()));
        Ok(Flow::Next)
      }

      Instruction::GetIndex => {
        let index = self.pop()?;
        let container = self.pop()?;
        let value = match container {
          Value::List(list) => {
            let list = list.borrow();
            let i = index.to_number() as i64;
            if i < 0 || i as usize >= list.len() {
              return Err(VmError::runtime("List index out of bounds"));
            }
            list[i as usize].clone()
          }
          Value::Dict(dict) => {
            let key = index.to_string();
            match dict.borrow().get(&key) {
              Some(value) => value.clone(),
              None => {
                return Err(VmError::runtime(format!("Dictionary key not found: {key}")));
              }
            }
          }
          _ => {
            return Err(VmError::runtime(
              "Cannot index a non-list/non-dictionary type",
            ));
          }
        };
        self.push(value);
        Ok(Flow::Next)
      }
      Instruction::SetIndex => {
        let new_value = self.pop()?;
        let index = self.pop()?;
        let container = self.pop()?;
        match container {
          Value::List(list) => {
            let mut list = list.borrow_mut();
            let i = index.to_number() as i64;
            if i < 0 || i as usize >= list.len() {
              return Err(VmError::runtime("List index out of bounds"));
            }
            list[i as usize] = new_value.clone();
          }
          Value::Dict(dict) => {
            dict.borrow_mut().insert(index.to_string(), new_value.clone());
          }
          _ => {
            return Err(VmError::runtime(
              "Cannot set index on a non-list/non-dictionary type",
            ));
          }
        }
        // The assignment expression's result
        self.push(new_value);
        Ok(Flow::Next)
      }

      Instruction::DefineClass(name) => {
        self
          .classes
          .insert(name.clone(), Rc::new(OkerClass::new(name.clone())));
        Ok(Flow::Next)
      }
      Instruction::CreateInstance { class, arg_count } => self.create_instance(class, *arg_count),
      Instruction::GetProperty(name) => {
        let object = self.pop()?;
        let instance = match &object {
          Value::Instance(instance) => instance,
          _ => {
            return Err(VmError::runtime("Can only get properties of instances"));
          }
        };
        if let Some(value) = instance.fields.borrow().get(name) {
          let value = value.clone();
          self.push(value);
        } else if instance.class.methods.borrow().contains_key(name) {
          // Leave the receiver in place for the CALL that follows
          self.push(object.clone());
        } else {
          return Err(VmError::runtime(format!(
            "Undefined property '{name}' on instance of {}",
            instance.class.name
          )));
        }
        Ok(Flow::Next)
      }
      Instruction::SetProperty(name) => {
        let value = self.pop()?;
        let object = self.pop()?;
        match object {
          Value::Instance(instance) => {
            instance.fields.borrow_mut().insert(name.clone(), value.clone());
          }
          _ => {
            return Err(VmError::runtime("Can only set properties on instances"));
          }
        }
        self.push(value);
        Ok(Flow::Next)
      }
      Instruction::GetThis => {
        let receiver = self
          .call_stack
          .last()
          .and_then(|frame| frame.receiver.clone())
          .ok_or_else(|| VmError::runtime("'this' can only be used inside a method"))?;
        self.push(Value::Instance(receiver));
        Ok(Flow::Next)
      }

      Instruction::TryStart(target) => {
        self.try_stack.push(TryFrame {
          fail_target: Self::jump_target(target)?,
          stack_depth: self.stack.len(),
        });
        Ok(Flow::Next)
      }
      Instruction::TryEnd => {
        self.try_stack.pop();
        Ok(Flow::Next)
      }

      Instruction::Pop => {
        self.pop()?;
        Ok(Flow::Next)
      }
      Instruction::Dup => {
        let top = self.peek()?.clone();
        self.push(top);
        Ok(Flow::Next)
      }
      Instruction::Halt => Ok(Flow::Halt),

      Instruction::Increment(name) => {
        let value = self.get_variable(name)?;
        self.set_variable(name, Value::Number(value.to_number() + 1.0));
        Ok(Flow::Next)
      }
      Instruction::Decrement(name) => {
        let value = self.get_variable(name)?;
        self.set_variable(name, Value::Number(value.to_number() - 1.0));
        Ok(Flow::Next)
      }

      Instruction::Label(_) => Err(VmError::runtime("Unresolved label in instruction stream")),
    }
  }

  fn binary_arithmetic(&mut self, instruction: &Instruction) -> Result<(), VmError> {
    let right = self.pop()?;
    let left = self.pop()?;

    let result = match instruction {
      Instruction::Add => match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Value::Str(_), _) | (_, Value::Str(_)) => {
          Value::Str(format!("{left}{right}"))
        }
        _ => Value::Number(left.to_number() + right.to_number()),
      },
      Instruction::Sub => Value::Number(left.to_number() - right.to_number()),
      Instruction::Mul => Value::Number(left.to_number() * right.to_number()),
      Instruction::Div => {
        let divisor = right.to_number();
        if divisor == 0.0 {
          return Err(VmError::runtime("Division by zero"));
        }
        Value::Number(left.to_number() / divisor)
      }
      Instruction::Mod => {
        let divisor = right.to_number();
        if divisor == 0.0 {
          return Err(VmError::runtime("Modulo by zero"));
        }
        Value::Number(left.to_number() % divisor)
      }
      _ => return Err(VmError::runtime("Unknown binary operation")),
    };

    self.push(result);
    Ok(())
  }

  fn comparison(&mut self, instruction: &Instruction) -> Result<(), VmError> {
    let right = self.pop()?;
    let left = self.pop()?;

    let result = match instruction {
      // Matching tags compare by value; mixed tags compare their string
      // projections, so "1" == 1
      Instruction::Eq | Instruction::Ne => {
        let equal = if left.same_tag(&right) {
          left == right
        } else {
          left.to_string() == right.to_string()
        };
        if matches!(instruction, Instruction::Eq) {
          equal
        } else {
          !equal
        }
      }
      // Ordering always compares numeric projections
      Instruction::Lt => left.to_number() < right.to_number(),
      Instruction::Le => left.to_number() <= right.to_number(),
      Instruction::Gt => left.to_number() > right.to_number(),
      Instruction::Ge => left.to_number() >= right.to_number(),
      _ => return Err(VmError::runtime("Unknown comparison operation")),
    };

    self.push(Value::Bool(result));
    Ok(())
  }

  fn define_function(
    &mut self,
    name: &str,
    address: usize,
    params: &[String],
  ) -> Result<(), VmError> {
    // A dotted name installs a method; a plain name lands in the global
    // function table, even when the declaration was nested
    if let Some((class_name, method_name)) = name.split_once('.') {
      let class = self
        .classes
        .get(class_name)
        .ok_or_else(|| VmError::runtime(format!("Class '{class_name}' not defined")))?;
      class.methods.borrow_mut().insert(
        method_name.to_string(),
        Function {
          name: method_name.to_string(),
          address,
          params: params.to_vec(),
          is_method: true,
        },
      );
    } else {
      self.functions.insert(
        name.to_string(),
        Function {
          name: name.to_string(),
          address,
          params: params.to_vec(),
          is_method: false,
        },
      );
    }
    Ok(())
  }

  /// Dispatch a `CALL`. An instance sitting `arg_count` below the top makes
  /// this a method call on that instance; otherwise the user-function table
  /// decides.
  fn call(&mut self, name: &str, arg_count: usize) -> Result<Flow, VmError> {
    let receiver_slot = self
      .stack
      .len()
      .checked_sub(arg_count + 1)
      .map(|depth| &self.stack[depth]);

    let function = match receiver_slot {
      Some(Value::Instance(instance)) => {
        let method = instance.class.methods.borrow().get(name).cloned();
        method.ok_or_else(|| {
          VmError::runtime(format!(
            "Undefined method '{name}' on class {}",
            instance.class.name
          ))
        })?
      }
      _ => self
        .functions
        .get(name)
        .cloned()
        .ok_or_else(|| VmError::runtime(format!("Cannot call non-function: {name}")))?,
    };

    self.push_frame(&function, arg_count, false)
  }

  /// Pop the arguments (positional order), consume the receiver for
  /// methods, bind parameters, and enter the function body.
  fn push_frame(
    &mut self,
    function: &Function,
    arg_count: usize,
    is_ctor: bool,
  ) -> Result<Flow, VmError> {
    let mut args = Vec::with_capacity(arg_count);
    for _ in 0..arg_count {
      args.push(self.pop()?);
    }

    let receiver = if function.is_method && !is_ctor {
      match self.pop()? {
        Value::Instance(instance) => Some(instance),
        _ => return Err(VmError::runtime("Method receiver is not an instance")),
      }
    } else {
      None
    };

    let mut locals = HashMap::new();
    for (param, arg) in function.params.iter().zip(args) {
      locals.insert(param.clone(), arg);
    }

    self.call_stack.push(CallFrame {
      return_pc: self.pc + 1,
      locals,
      receiver,
      is_ctor,
    });

    Ok(Flow::Goto(function.address))
  }

  fn create_instance(&mut self, class_name: &str, arg_count: usize) -> Result<Flow, VmError> {
    let class = self
      .classes
      .get(class_name)
      .cloned()
      .ok_or_else(|| VmError::runtime(format!("Class '{class_name}' not defined")))?;

    let instance = Rc::new(OkerInstance::new(class.clone()));
    let constructor = class.methods.borrow().get(class_name).cloned();

    match constructor {
      Some(constructor) => {
        let flow = self.push_frame(&constructor, arg_count, true)?;
        // The instance is the expression's result; the constructor frame
        // holds it as receiver and its return value is discarded
        if let Some(frame) = self.call_stack.last_mut() {
          frame.receiver = Some(instance.clone());
        }
        self.push(Value::Instance(instance));
        Ok(flow)
      }
      None => {
        self.push(Value::Instance(instance));
        Ok(Flow::Next)
      }
    }
  }
}

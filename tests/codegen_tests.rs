use oker::codegen::instruction::{Instruction, Target};
use oker::codegen::{optimize, resolve_labels, CodeGenerator};
use oker::error::OkerError;
use oker::lexer::Lexer;
use oker::parser::ast::Program;
use oker::parser::Parser;

fn parse(source: &str) -> Program {
  let tokens = Lexer::new(source).tokenize().expect("lexer should succeed");
  Parser::new(tokens).parse().expect("parser should succeed")
}

fn generate(source: &str) -> Vec<Instruction> {
  CodeGenerator::new()
    .generate(&parse(source))
    .expect("codegen should succeed")
}

fn generate_resolved(source: &str) -> Vec<Instruction> {
  resolve_labels(generate(source)).expect("label resolution should succeed")
}

fn generate_optimized(source: &str) -> Vec<Instruction> {
  resolve_labels(optimize::optimize(generate(source))).expect("label resolution should succeed")
}

fn opcode_names(instructions: &[Instruction]) -> Vec<&'static str> {
  instructions.iter().map(Instruction::name).collect()
}

/// Every target in a resolved stream, for bounds checks.
fn targets(instructions: &[Instruction]) -> Vec<Target> {
  instructions
    .iter()
    .filter_map(|instruction| match instruction {
      Instruction::Jump(t)
      | Instruction::JumpIfFalse(t)
      | Instruction::JumpIfTrue(t)
      | Instruction::TryStart(t)
      | Instruction::DefineFunction { start: t, .. } => Some(*t),
      _ => None,
    })
    .collect()
}

#[test]
fn binary_declaration_prefix() {
  let code = generate_resolved("let x = 5 + 3");
  assert_eq!(
    opcode_names(&code),
    vec!["PUSH_NUMBER", "PUSH_NUMBER", "ADD", "DECLARE_VAR", "HALT"]
  );
  assert_eq!(code[0], Instruction::PushNumber(5.0));
  assert_eq!(code[1], Instruction::PushNumber(3.0));
  assert_eq!(code[3], Instruction::DeclareVar("x".to_string()));
}

#[test]
fn missing_initializer_pushes_zero() {
  let code = generate_resolved("let x");
  assert_eq!(code[0], Instruction::PushNumber(0.0));
  assert_eq!(code[1], Instruction::DeclareVar("x".to_string()));
}

#[test]
fn expression_statement_pops_its_value() {
  let code = generate_resolved("1 + 2");
  assert_eq!(
    opcode_names(&code),
    vec!["PUSH_NUMBER", "PUSH_NUMBER", "ADD", "POP", "HALT"]
  );
}

#[test]
fn say_lowers_to_builtin_call() {
  let code = generate_resolved("say \"Hello, World!\"");
  assert!(code.contains(&Instruction::BuiltinCall {
    name: "say".to_string(),
    arg_count: 1,
  }));
}

#[test]
fn user_call_lowers_to_call() {
  let code = generate_resolved("makef add(a, b):\n  return a + b\nend\nlet r = add(5, 3)");
  assert!(code.contains(&Instruction::Call {
    name: "add".to_string(),
    arg_count: 2,
  }));
}

#[test]
fn call_arguments_are_emitted_in_reverse_order() {
  let code = generate_resolved("makef f(a, b):\n  return a\nend\nlet r = f(1, 2)");
  let first = code
    .iter()
    .position(|i| *i == Instruction::PushNumber(2.0))
    .expect("second argument");
  let second = code
    .iter()
    .position(|i| *i == Instruction::PushNumber(1.0))
    .expect("first argument");
  assert!(
    first < second,
    "second argument must be emitted before the first"
  );
}

#[test]
fn function_lowering_jumps_over_the_body() {
  let code = generate_resolved("makef f():\n  return 1\nend");
  // JUMP over the body comes first, DEFINE_FUNCTION lands after it
  assert_eq!(code[0].name(), "JUMP");
  let define_at = code
    .iter()
    .position(|i| matches!(i, Instruction::DefineFunction { .. }))
    .expect("define function");
  match &code[0] {
    Instruction::Jump(target) => assert_eq!(target.addr(), Some(define_at)),
    other => panic!("expected jump, got {other:?}"),
  }

  match &code[define_at] {
    Instruction::DefineFunction { name, start, .. } => {
      assert_eq!(name, "f");
      assert_eq!(start.addr(), Some(1));
    }
    other => panic!("expected define function, got {other:?}"),
  }
}

#[test]
fn function_body_ends_with_implicit_zero_return() {
  let code = generate_resolved("makef f():\n  say 1\nend");
  let define_at = code
    .iter()
    .position(|i| matches!(i, Instruction::DefineFunction { .. }))
    .expect("define function");
  assert_eq!(code[define_at - 1], Instruction::Return);
  assert_eq!(code[define_at - 2], Instruction::PushNumber(0.0));
}

#[test]
fn method_names_are_qualified_with_the_class() {
  let code = generate_resolved("class C:\n  makef C(x):\n    this.v = x\n  end\n  makef get():\n    return this.v\n  end\nend");
  assert!(code.contains(&Instruction::DefineClass("C".to_string())));

  let names: Vec<&str> = code
    .iter()
    .filter_map(|i| match i {
      Instruction::DefineFunction { name, .. } => Some(name.as_str()),
      _ => None,
    })
    .collect();
  assert_eq!(names, vec!["C.C", "C.get"]);
}

#[test]
fn method_call_emits_get_property_before_call() {
  let code = generate_resolved(
    "class C:\n  makef get():\n    return 1\n  end\nend\nlet a = new C()\nsay a.get()",
  );
  let get_property = code
    .iter()
    .position(|i| *i == Instruction::GetProperty("get".to_string()))
    .expect("get property");
  let call = code
    .iter()
    .position(|i| {
      *i == Instruction::Call {
        name: "get".to_string(),
        arg_count: 0,
      }
    })
    .expect("call");
  assert!(get_property < call);
}

#[test]
fn new_lowers_to_create_instance() {
  let code = generate_resolved("class C:\nend\nlet a = new C(7)");
  assert!(code.contains(&Instruction::CreateInstance {
    class: "C".to_string(),
    arg_count: 1,
  }));
}

#[test]
fn indexed_assignment_emits_value_object_index() {
  let code = generate_resolved("let l = [1]\nl[0] = 99");
  let set_at = code
    .iter()
    .position(|i| *i == Instruction::SetIndex)
    .expect("set index");
  // value first, then object, then index
  assert_eq!(code[set_at - 3], Instruction::PushNumber(99.0));
  assert_eq!(code[set_at - 2], Instruction::GetVar("l".to_string()));
  assert_eq!(code[set_at - 1], Instruction::PushNumber(0.0));
  // The statement discards the pushed result
  assert_eq!(code[set_at + 1], Instruction::Pop);
}

#[test]
fn member_assignment_emits_object_then_value() {
  let code = generate_resolved(
    "class C:\n  makef C(x):\n    this.v = x\n  end\nend",
  );
  let set_at = code
    .iter()
    .position(|i| *i == Instruction::SetProperty("v".to_string()))
    .expect("set property");
  assert_eq!(code[set_at - 1], Instruction::GetVar("x".to_string()));
  assert_eq!(code[set_at - 2], Instruction::GetThis);
  assert_eq!(code[set_at + 1], Instruction::Pop);
}

#[test]
fn if_without_else_shares_the_end_label() {
  let code = generate_resolved("if true:\n  say 1\nend\nsay 2");
  let names = opcode_names(&code);
  // No unconditional jump is needed when the else branch is empty
  assert!(!names.contains(&"JUMP"));
  assert!(names.contains(&"JUMP_IF_FALSE"));
}

#[test]
fn while_loops_back_to_the_condition() {
  let code = generate_resolved("let i = 0\nwhile i < 3:\n  i = i + 2\nend");
  let condition_at = code
    .iter()
    .position(|i| *i == Instruction::GetVar("i".to_string()))
    .expect("condition load");
  let back_jump = code
    .iter()
    .filter_map(|i| match i {
      Instruction::Jump(t) => t.addr(),
      _ => None,
    })
    .find(|addr| *addr == condition_at);
  assert!(back_jump.is_some(), "expected a jump back to the condition");
}

#[test]
fn repeat_synthesizes_a_counter() {
  let code = generate_resolved("repeat 5:\n  say 1\nend");
  let counter = code
    .iter()
    .find_map(|i| match i {
      Instruction::DeclareVar(name) if name.starts_with("__repeat_counter_") => Some(name.clone()),
      _ => None,
    })
    .expect("synthesized counter");
  assert!(code.contains(&Instruction::GetVar(counter.clone())));
  assert!(code.contains(&Instruction::Gt));
}

#[test]
fn repeat_decrement_collapses_under_optimization() {
  let code = generate_optimized("repeat 5:\n  say 1\nend");
  assert!(code
    .iter()
    .any(|i| matches!(i, Instruction::Decrement(name) if name.starts_with("__repeat_counter_"))));
}

#[test]
fn increment_statement_collapses_to_one_instruction() {
  let code = generate_optimized("let x = 0\nx = x + 1");
  assert_eq!(
    code,
    vec![
      Instruction::PushNumber(0.0),
      Instruction::DeclareVar("x".to_string()),
      Instruction::Increment("x".to_string()),
      Instruction::Halt,
    ]
  );
}

#[test]
fn decrement_statement_collapses_to_one_instruction() {
  let code = generate_optimized("let x = 0\nx = x - 1");
  assert!(code.contains(&Instruction::Decrement("x".to_string())));
}

#[test]
fn try_lowering_brackets_the_protected_block() {
  let code = generate_resolved("try:\n  say 1\nfail:\n  say 2\nend");
  let names = opcode_names(&code);
  let try_start = names.iter().position(|n| *n == "TRY_START").unwrap();
  let try_end = names.iter().position(|n| *n == "TRY_END").unwrap();
  assert!(try_start < try_end);
  // TRY_END is followed by the jump over the fail block
  assert_eq!(names[try_end + 1], "JUMP");

  match &code[try_start] {
    Instruction::TryStart(target) => {
      let fail_target = target.addr().expect("resolved fail target");
      assert!(fail_target > try_end);
      assert!(fail_target < code.len());
    }
    other => panic!("expected try start, got {other:?}"),
  }
}

#[test]
fn break_and_continue_jump_to_loop_labels() {
  let code = generate_resolved(
    "let i = 0\nwhile true:\n  i = i + 2\n  if i > 4:\n    break\n  end\n  continue\nend",
  );
  // Both lower to plain jumps; every jump lands inside the stream
  for target in targets(&code) {
    let addr = target.addr().expect("resolved target");
    assert!(addr < code.len());
  }
}

#[test]
fn break_outside_loop_fails_emission() {
  let program = parse("break");
  let result = CodeGenerator::new().generate(&program);
  assert!(matches!(result, Err(OkerError::Codegen { .. })));
}

#[test]
fn continue_outside_loop_fails_emission() {
  let program = parse("continue");
  let result = CodeGenerator::new().generate(&program);
  assert!(matches!(result, Err(OkerError::Codegen { .. })));
}

#[test]
fn all_jump_targets_are_in_bounds() {
  let source = "
makef fib(n):
  if n < 2:
    return n
  end
  return fib(n - 1) + fib(n - 2)
end

let i = 0
while i < 5:
  i = i + 1
  if i == 3:
    continue
  end
end

try:
  say fib(i)
fail:
  say \"failed\"
end
";
  for code in [generate_resolved(source), {
    let symbolic = generate(source);
    resolve_labels(optimize::optimize(symbolic)).unwrap()
  }] {
    for target in targets(&code) {
      let addr = target.addr().expect("every target must be resolved");
      assert!(addr < code.len(), "target {addr} out of range");
    }
  }
}

#[test]
fn resolution_strips_label_markers() {
  let code = generate_resolved("if true:\n  say 1\nelse:\n  say 2\nend");
  assert!(!code
    .iter()
    .any(|i| matches!(i, Instruction::Label(_))));
}

#[test]
fn unresolved_label_is_rejected() {
  let stream = vec![Instruction::Jump(Target::Label(99)), Instruction::Halt];
  let result = resolve_labels(stream);
  assert!(matches!(result, Err(OkerError::Codegen { .. })));
}

#[test]
fn halt_terminates_every_program() {
  for source in ["", "say 1", "let x = 2"] {
    let code = generate_resolved(source);
    assert_eq!(code.last(), Some(&Instruction::Halt));
  }
}

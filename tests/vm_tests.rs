use oker::error::OkerError;
use oker::vm::{ExitStatus, Vm};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Writer handle shared with the VM so tests can read back `say` output.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
  fn contents(&self) -> String {
    String::from_utf8(self.0.borrow().clone()).expect("output should be UTF-8")
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

fn run(source: &str) -> (String, ExitStatus) {
  let code = oker::compile(source).expect("program should compile");
  let buffer = SharedBuffer::default();
  let mut vm = Vm::with_writer(Box::new(buffer.clone()));
  let status = vm.execute(&code).expect("program should run");
  (buffer.contents(), status)
}

fn run_output(source: &str) -> String {
  let (output, status) = run(source);
  assert_eq!(status, ExitStatus::Completed);
  output
}

fn run_error(source: &str) -> (String, OkerError) {
  let code = oker::compile(source).expect("program should compile");
  let buffer = SharedBuffer::default();
  let mut vm = Vm::with_writer(Box::new(buffer.clone()));
  let error = vm.execute(&code).expect_err("program should fail");
  (buffer.contents(), error)
}

#[test]
fn say_concatenates_strings() {
  assert_eq!(run_output("say \"Hello, \" + \"World!\""), "Hello, World!\n");
}

#[test]
fn arithmetic_and_number_formatting() {
  assert_eq!(run_output("say 2 + 3 * 4"), "14\n");
  assert_eq!(run_output("say 7 / 2"), "3.5\n");
  assert_eq!(run_output("say 7 % 3"), "1\n");
  assert_eq!(run_output("say -(3 + 2)"), "-5\n");
}

#[test]
fn string_number_concatenation() {
  assert_eq!(run_output("say \"n=\" + 5"), "n=5\n");
  assert_eq!(run_output("say 5 + \"!\""), "5!\n");
}

#[test]
fn cross_tag_equality_uses_string_projection() {
  assert_eq!(run_output("say \"1\" == 1"), "true\n");
  assert_eq!(run_output("say \"1\" != 1"), "false\n");
  assert_eq!(run_output("say true == \"true\""), "true\n");
}

#[test]
fn same_tag_equality_compares_values() {
  assert_eq!(run_output("say 1 == 2"), "false\n");
  assert_eq!(run_output("say \"a\" == \"a\""), "true\n");
}

#[test]
fn ordering_compares_numeric_projections() {
  assert_eq!(run_output("say \"10\" > 9"), "true\n");
  // Numeric, not lexicographic: 2 <= 10
  assert_eq!(run_output("say \"2\" <= \"10\""), "true\n");
}

#[test]
fn logic_operators() {
  assert_eq!(run_output("say true and false"), "false\n");
  assert_eq!(run_output("say true or false"), "true\n");
  assert_eq!(run_output("say not true"), "false\n");
}

#[test]
fn repeat_counts_down() {
  let source = "let n = 0; repeat 5: n = n + 1; end; say n";
  assert_eq!(run_output(source), "5\n");
}

#[test]
fn repeat_with_fractional_count_rounds_up() {
  let source = "let n = 0; repeat 2.7: n = n + 1; end; say n";
  assert_eq!(run_output(source), "3\n");
}

#[test]
fn while_with_break_and_continue() {
  let source = "
let i = 0
let total = 0
while i < 5:
  i = i + 1
  if i == 3:
    continue
  end
  if i > 4:
    break
  end
  total = total + i
end
say total
";
  // 1 + 2 + 4; 3 skipped, 5 breaks out
  assert_eq!(run_output(source), "7\n");
}

#[test]
fn else_if_chain_selects_the_right_branch() {
  let source = "
let x = 2
if x == 1:
  say \"one\"
else:
  if x == 2:
    say \"two\"
  else:
    say \"other\"
  end
end
";
  assert_eq!(run_output(source), "two\n");
}

#[test]
fn recursive_fibonacci() {
  let source = "makef fib(n): if n < 2: return n end; return fib(n-1) + fib(n-2) end; say fib(10)";
  assert_eq!(run_output(source), "55\n");
}

#[test]
fn function_arguments_bind_positionally() {
  let source = "makef sub(a, b):\n  return a - b\nend\nsay sub(10, 4)";
  assert_eq!(run_output(source), "6\n");
}

#[test]
fn function_without_return_yields_zero() {
  let source = "makef noop():\n  let x = 1\nend\nsay noop()";
  assert_eq!(run_output(source), "0\n");
}

#[test]
fn locals_shadow_globals() {
  let source = "
let x = 1
makef f():
  let x = 99
  return x
end
say f()
say x
";
  assert_eq!(run_output(source), "99\n1\n");
}

#[test]
fn functions_read_and_write_globals() {
  let source = "
let total = 0
makef bump(k):
  total = total + k
  return total
end
say bump(3)
say bump(4)
";
  assert_eq!(run_output(source), "3\n7\n");
}

#[test]
fn nested_function_declarations_land_globally() {
  // The inner definition only registers when outer's body runs, and it
  // lands in the global function table
  let source = "
makef outer():
  makef inner():
    return 9
  end
  return inner()
end
say outer()
";
  assert_eq!(run_output(source), "9\n");
}

#[test]
fn class_with_constructor_and_method() {
  let source = "class C: makef C(x): this.v = x end; makef get(): return this.v end end; let a = new C(7); say a.get()";
  assert_eq!(run_output(source), "7\n");
}

#[test]
fn field_reads_without_calls() {
  let source = "
class P:
  makef P(x, y):
    this.x = x
    this.y = y
  end
end
let p = new P(3, 4)
say p.x
say p.y
p.x = 30
say p.x
";
  assert_eq!(run_output(source), "3\n4\n30\n");
}

#[test]
fn methods_with_arguments_mutate_state() {
  let source = "
class Counter:
  makef Counter():
    this.n = 0
  end

  makef add(k):
    this.n = this.n + k
    return this.n
  end
end
let c = new Counter()
say c.add(5)
say c.add(2)
";
  assert_eq!(run_output(source), "5\n7\n");
}

#[test]
fn methods_can_call_other_methods_on_this() {
  let source = "
class Greeter:
  makef name():
    return \"oker\"
  end

  makef greet():
    return \"hi \" + this.name()
  end
end
let g = new Greeter()
say g.greet()
";
  assert_eq!(run_output(source), "hi oker\n");
}

#[test]
fn instances_share_by_reference() {
  let source = "
class Box:
  makef Box():
    this.v = 1
  end
end
let a = new Box()
let b = a
b.v = 5
say a.v
";
  assert_eq!(run_output(source), "5\n");
}

#[test]
fn instance_string_projection() {
  let source = "class C:\nend\nlet a = new C()\nsay a";
  assert_eq!(run_output(source), "C instance\n");
}

#[test]
fn lists_index_and_mutate() {
  let source = "let L = [1,2,3]; L[1] = 99; say L[0]; say L[1]; say L[2]";
  assert_eq!(run_output(source), "1\n99\n3\n");
}

#[test]
fn lists_share_by_reference() {
  let source = "
let a = [1]
let b = a
list_add(b, 2)
say len(a)
say a[1]
";
  assert_eq!(run_output(source), "2\n2\n");
}

#[test]
fn list_display_walks_contents() {
  assert_eq!(run_output("say [1, \"two\", true]"), "[1, two, true]\n");
}

#[test]
fn dicts_store_and_extend() {
  let source = "
let d = {\"k\": 1, \"x\": 2}
say d[\"k\"]
d[\"y\"] = 3
say d[\"y\"]
d[\"k\"] = 10
say d[\"k\"]
";
  assert_eq!(run_output(source), "1\n3\n10\n");
}

#[test]
fn dict_keys_are_stringified() {
  // The literal's number key and the looked-up number both project to "1"
  let source = "
makef one():
  return 1
end
let d = {1: \"one\"}
say d[one()]
";
  assert_eq!(run_output(source), "one\n");
}

#[test]
fn division_by_zero_is_caught_by_try() {
  let source = "try: let x = 1/0 fail: say \"caught\" end";
  let (output, status) = run(source);
  assert_eq!(output, "caught\n");
  assert_eq!(status, ExitStatus::Completed);
}

#[test]
fn modulo_by_zero_is_a_runtime_error() {
  let (_, error) = run_error("let x = 1 % 0");
  match error {
    OkerError::Runtime { message, .. } => assert!(message.contains("Modulo")),
    other => panic!("expected runtime error, got {other:?}"),
  }
}

#[test]
fn uncaught_errors_carry_the_instruction_index() {
  let (output, error) = run_error("say \"before\"\nlet x = 1/0");
  assert_eq!(output, "before\n");
  assert!(matches!(error, OkerError::Runtime { .. }));
}

#[test]
fn try_restores_the_operand_stack_depth() {
  // The error fires mid-expression, leaving operands behind; the fail arm
  // still sees a clean stack
  let source = "
let r = 0
try:
  r = 10 + 1 / 0
fail:
  r = 5
end
say r
";
  assert_eq!(run_output(source), "5\n");
}

#[test]
fn failing_fail_block_unwinds_to_the_outer_try() {
  let source = "
try:
  try:
    let x = 1 / 0
  fail:
    say \"inner\"
    let y = 2 / 0
  end
fail:
  say \"outer\"
end
say \"done\"
";
  assert_eq!(run_output(source), "inner\nouter\ndone\n");
}

#[test]
fn runtime_error_inside_function_is_caught_by_caller_try() {
  let source = "
makef boom():
  return 1 / 0
end
try:
  say boom()
fail:
  say \"caught\"
end
";
  assert_eq!(run_output(source), "caught\n");
}

#[test]
fn index_out_of_bounds_is_recoverable() {
  let source = "
let l = [1]
try:
  say l[5]
fail:
  say \"oob\"
end
";
  assert_eq!(run_output(source), "oob\n");
}

#[test]
fn missing_dict_key_is_recoverable() {
  let source = "
let d = {\"a\": 1}
try:
  say d[\"b\"]
fail:
  say \"missing\"
end
";
  assert_eq!(run_output(source), "missing\n");
}

#[test]
fn undefined_method_is_recoverable() {
  let source = "
class C:
end
let a = new C()
try:
  say a.nope()
fail:
  say \"no method\"
end
";
  assert_eq!(run_output(source), "no method\n");
}

#[test]
fn exit_stops_execution_with_the_given_code() {
  let source = "say \"partial\"\nexit(2)\nsay \"never\"";
  let (output, status) = run(source);
  assert_eq!(output, "partial\n");
  assert_eq!(status, ExitStatus::Exit(2));
}

#[test]
fn exit_bypasses_try_frames() {
  let source = "
try:
  exit(3)
fail:
  say \"not caught\"
end
";
  let (output, status) = run(source);
  assert_eq!(output, "");
  assert_eq!(status, ExitStatus::Exit(3));
}

#[test]
fn string_builtins_end_to_end() {
  assert_eq!(run_output("say upper(\"abc\")"), "ABC\n");
  assert_eq!(run_output("say lower(\"AbC\")"), "abc\n");
  assert_eq!(run_output("say strip(\"  pad  \")"), "pad\n");
  assert_eq!(run_output("say len(\"hello\")"), "5\n");
  assert_eq!(run_output("say charAt(\"hello\", 1)"), "e\n");
  assert_eq!(run_output("say replace_str(\"a-b-c\", \"-\", \"+\")"), "a+b+c\n");
}

#[test]
fn split_str_builds_a_list() {
  let source = "
let parts = split_str(\"a,b,c\", \",\")
say len(parts)
say parts[0]
say parts[2]
";
  assert_eq!(run_output(source), "3\na\nc\n");
}

#[test]
fn string_builder_round_trip() {
  let source = "
sbuild_new()
sbuild_add(\"a\")
sbuild_add(1)
sbuild_add(true)
say sbuild_get()
";
  assert_eq!(run_output(source), "a1true\n");
}

#[test]
fn coercion_builtins() {
  assert_eq!(run_output("say num(\"3.5\") + 1"), "4.5\n");
  assert_eq!(run_output("say num(\"junk\")"), "0\n");
  assert_eq!(run_output("say str(42) + \"!\""), "42!\n");
  assert_eq!(run_output("say bool(\"\")"), "false\n");
  assert_eq!(run_output("say bool(\"false\")"), "false\n");
  assert_eq!(run_output("say bool(\"x\")"), "true\n");
}

#[test]
fn type_builtin_names() {
  assert_eq!(run_output("say type(1)"), "number\n");
  assert_eq!(run_output("say type(\"s\")"), "string\n");
  assert_eq!(run_output("say type(true)"), "boolean\n");
  assert_eq!(run_output("say type([1])"), "list\n");
  assert_eq!(run_output("say type({\"a\": 1})"), "dictionary\n");
}

#[test]
fn math_builtins() {
  assert_eq!(run_output("say abs(0 - 7)"), "7\n");
  assert_eq!(run_output("say round(2.5)"), "3\n");
  assert_eq!(run_output("say round(1.25, 1)"), "1.3\n");
}

#[test]
fn random_stays_in_range() {
  let source = "
let i = 0
let ok = true
while i < 20:
  let r = random()
  if r < 0:
    ok = false
  end
  if r >= 1:
    ok = false
  end
  let s = random(5, 10)
  if s < 5:
    ok = false
  end
  if s >= 10:
    ok = false
  end
  i = i + 1
end
say ok
";
  assert_eq!(run_output(source), "true\n");
}

#[test]
fn file_builtins_round_trip() {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("note.txt");
  let path = path.to_str().expect("utf-8 path");

  let source = format!(
    "say exists(\"{path}\")
say save(\"{path}\", \"hello file\")
say exists(\"{path}\")
say get(\"{path}\")
say deletef(\"{path}\")
say exists(\"{path}\")
say get(\"{path}\")
"
  );
  assert_eq!(
    run_output(&source),
    "false\ntrue\ntrue\nhello file\ntrue\nfalse\nfalse\n"
  );
}

#[test]
fn aggregates_are_falsy_in_conditions() {
  // Reference types have no boolean projection of their contents
  let source = "
let l = [1]
if l:
  say \"truthy\"
else:
  say \"falsy\"
end
";
  assert_eq!(run_output(source), "falsy\n");
}

#[test]
fn say_statement_and_call_forms_match() {
  assert_eq!(run_output("say 1\nsay(2)"), "1\n2\n");
}

#[test]
fn comments_are_ignored_by_execution() {
  let source = "
~ leading comment
let x = 1 ~ trailing comment
~~ a block
comment ~~
say x
";
  assert_eq!(run_output(source), "1\n");
}

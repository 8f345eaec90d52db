use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oker::vm::Vm;

const FIB: &str = "
makef fib(n):
  if n < 2:
    return n
  end
  return fib(n - 1) + fib(n - 2)
end

fib(15)
";

fn bench_compile(c: &mut Criterion) {
  c.bench_function("compile_fib", |b| {
    b.iter(|| oker::compile(black_box(FIB)).unwrap())
  });
}

fn bench_execute(c: &mut Criterion) {
  let code = oker::compile(FIB).unwrap();
  c.bench_function("execute_fib_15", |b| {
    b.iter(|| {
      let mut vm = Vm::with_writer(Box::new(std::io::sink()));
      vm.execute(black_box(&code)).unwrap()
    })
  });
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);

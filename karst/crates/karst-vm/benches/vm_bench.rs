//! Interpreter throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use karst_vm::{Vm, VmConfig};

fn bench_fib(c: &mut Criterion) {
    let source = "
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 2) + fib(n - 1);
        }
        fib(15);
    ";

    c.bench_function("fib_15", |b| {
        b.iter(|| {
            let mut vm = Vm::new(VmConfig::default()).expect("config is valid");
            vm.interpret(black_box(source)).expect("program runs");
        })
    });
}

fn bench_loop_arithmetic(c: &mut Criterion) {
    let source = "
        var total = 0;
        for (var i = 0; i < 10000; i = i + 1) {
            total = total + i * 2;
        }
    ";

    c.bench_function("loop_arithmetic_10k", |b| {
        b.iter(|| {
            let mut vm = Vm::new(VmConfig::default()).expect("config is valid");
            vm.interpret(black_box(source)).expect("program runs");
        })
    });
}

fn bench_string_churn(c: &mut Criterion) {
    let source = "
        var last = \"\";
        for (var i = 0; i < 500; i = i + 1) {
            last = \"pre\" + \"post\";
        }
    ";

    c.bench_function("string_churn_500", |b| {
        b.iter(|| {
            let mut vm = Vm::new(VmConfig::default()).expect("config is valid");
            vm.interpret(black_box(source)).expect("program runs");
        })
    });
}

criterion_group!(benches, bench_fib, bench_loop_arithmetic, bench_string_churn);
criterion_main!(benches);

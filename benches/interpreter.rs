use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mython::interpreter::Interpreter;
use mython::{lexer, parser};

const PROGRAM: &str = r#"class Counter:
  def __init__():
    self.value = 0

  def add(step):
    self.value = self.value + step

  def __str__():
    return 'Counter(' + str(self.value) + ')'

class Chain:
  def bump(counter):
    counter.add(1)
    counter.add(2)
    return counter

c = Counter()
chain = Chain()
c.add(1)
c.add(2)
c.add(3)
chain.bump(c)
total = c.value * 2 + 10 / 2 - 1
print c, total
print total > 10 and total <= 100
print str(total) + ' done'
"#;

fn bench_pipeline(c: &mut Criterion) {
    let tokens = lexer::tokenize(PROGRAM).expect("tokenize");
    let program = parser::parse_tokens(tokens).expect("parse");
    let interpreter = Interpreter::new();

    c.bench_function("frontend_tokenize", |b| {
        b.iter(|| {
            let tokens = lexer::tokenize(black_box(PROGRAM)).expect("tokenize");
            black_box(tokens);
        })
    });

    c.bench_function("frontend_tokenize_and_parse", |b| {
        b.iter(|| {
            let tokens = lexer::tokenize(black_box(PROGRAM)).expect("tokenize");
            let parsed = parser::parse_tokens(tokens).expect("parse");
            black_box(parsed);
        })
    });

    c.bench_function("interpreter_run_only", |b| {
        b.iter(|| {
            let output = interpreter.run(black_box(&program)).expect("run");
            black_box(output);
        })
    });

    c.bench_function("interpreter_full_pipeline", |b| {
        b.iter(|| {
            let tokens = lexer::tokenize(black_box(PROGRAM)).expect("tokenize");
            let parsed = parser::parse_tokens(tokens).expect("parse");
            let output = interpreter.run(&parsed).expect("run");
            black_box(output);
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

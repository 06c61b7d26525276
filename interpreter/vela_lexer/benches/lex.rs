//! Lexer throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vela_ir::StringInterner;
use vela_lexer::lex;

fn sample_source() -> String {
    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(
            "// entry {i}\nModel m{i} = PerceptronModel(name(\"model-{i}\"), \
             weights({{0.5, 1.5e2, -3,}}), verbose(true));\n"
        ));
    }
    source
}

fn bench_lex(c: &mut Criterion) {
    let source = sample_source();
    let interner = StringInterner::new();
    c.bench_function("lex_config_script", |b| {
        b.iter(|| lex(black_box(&source), &interner))
    });
}

criterion_group!(benches, bench_lex);
criterion_main!(benches);

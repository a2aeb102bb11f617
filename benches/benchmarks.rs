//! Performance benchmarks for srcx
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use srcx::index::types::{Needle, Record};
use srcx::index::MemoryIndex;
use srcx::plugins::Catalog;
use srcx::query::{highlight, Query};

/// An in-memory index of generated C files with function needles
fn create_benchmark_index() -> MemoryIndex {
    let mut records = Vec::new();
    for i in 0..200 {
        let path = format!("src/module_{}/file_{}.c", i % 10, i);
        records.push(Record::file(&path));
        for line in 0..50u32 {
            let content = format!("int function_{i}_{line}(int x) {{ return helper_{line}(x) + {i}; }}\n");
            let name = format!("function_{i}_{line}");
            let end = 4 + name.chars().count();
            records.push(
                Record::line(&path, line + 1, &content)
                    .with_needle("c_function", Needle::new(&name, Some(&name), 4, end)),
            );
        }
    }
    MemoryIndex::from_records(records)
}

fn bench_query_parsing(c: &mut Criterion) {
    let plugins = Catalog::builtin(4).plugin_set(&["core", "clang", "js"]);
    let queries = vec![
        "simple",
        "two words",
        "\"exact phrase\"",
        "ext:c helper",
        "+function:Stack::Push -path:test",
        "path:src/*.c regexp:\"helper_\\d+\"",
        "@Case -+type-ref:Foo var:bar",
    ];

    let mut group = c.benchmark_group("query_parsing");
    for query in queries {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, &q| {
            b.iter(|| plugins.grammar().parse(black_box(q)))
        });
    }
    group.finish();
}

fn bench_highlight(c: &mut Criterion) {
    let line = "int function_1_2(int x) { return helper_2(x) + 1; } // <b> & more ".repeat(20);
    let extents: Vec<(usize, usize)> = (0..line.chars().count()).step_by(17).map(|s| (s, s + 9)).collect();

    c.bench_function("highlight_line", |b| {
        b.iter(|| highlight(black_box(&line), black_box(extents.iter().copied())))
    });
}

fn bench_search(c: &mut Criterion) {
    let index = create_benchmark_index();
    let plugins = Catalog::builtin(4).plugin_set(&["core", "clang", "js"]);

    let mut group = c.benchmark_group("search");
    for querystr in ["helper_7", "path:module_3 return", "function:function_5_5", "regexp:helper_\\d{2}", "ext:c"] {
        group.bench_with_input(BenchmarkId::from_parameter(querystr), &querystr, |b, &q| {
            b.iter(|| {
                let query = Query::new(&index, black_box(q), plugins.clone()).expect("query parses");
                let (total, rows) = query.results(0, 100).expect("search succeeds");
                (total, rows.count())
            })
        });
    }

    group.bench_function("mixed_results", |b| {
        b.iter(|| {
            let query = Query::new(&index, black_box("module_3"), plugins.clone()).expect("query parses");
            query.mixed_results(0, 100, 5).map(|m| m.total)
        })
    });

    group.bench_function("direct_result", |b| {
        b.iter(|| {
            let query = Query::new(&index, black_box("function_42_7"), plugins.clone()).expect("query parses");
            query.direct_result()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_query_parsing, bench_highlight, bench_search);

criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rome_loader::common::Date;
use rome_loader::text::{Lexer, Parser, Pattern};
use rome_loader::{LoadOptions, World};
use std::cell::Cell;

fn synthetic_save(characters: usize) -> Vec<u8> {
    let mut out = String::from("SAV0103b1a5a2f20004c6e20000\nversion=\"2.0.4\"\ndate=450.10.1\n");
    out.push_str("family={ families={\n");
    for id in 0..characters / 4 {
        out.push_str(&format!("{}={{ key=\"Family{}\" culture=roman prestige=10.5 }}\n", id, id));
    }
    out.push_str("} }\ncharacter={ database={\n");
    for id in 0..characters {
        out.push_str(&format!(
            "{}={{ first_name_loc={{ name=\"Marcus\" }} family={} country=1 birth_date=420.5.1 traits={{ brave just }} }}\n",
            id,
            id / 4
        ));
    }
    out.push_str("} }\ncountry={ country_database={ 1={ tag=\"ROM\" monarch=0 } } }\n");
    out.into_bytes()
}

pub fn lexer_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    for size in [100, 1000, 10000].iter() {
        let data = synthetic_save(*size);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &_size| {
            b.iter(|| Lexer::new(black_box(&data)).count());
        });
    }
    group.finish();
}

pub fn dispatch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for size in [100, 1000, 10000].iter() {
        let data = synthetic_save(*size);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &_size| {
            b.iter(|| {
                let count = Cell::new(0);
                let mut parser = Parser::new();
                parser.register(Pattern::CatchAll, |_, v| {
                    v.skip()?;
                    count.set(count.get() + 1);
                    Ok(())
                });
                parser.parse_slice(black_box(&data)).unwrap();
                count.get()
            });
        });
    }
    group.finish();
}

pub fn world_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("world");
    let options = LoadOptions::builder("bench.rome").build();
    for size in [100, 1000, 10000].iter() {
        let data = synthetic_save(*size);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &_size| {
            b.iter(|| World::parse(black_box(&data), &options).unwrap());
        });
    }
    group.finish();
}

pub fn date_benchmark(c: &mut Criterion) {
    c.bench_function("parse_auc_date", |b| {
        b.iter(|| Date::parse_auc(black_box("450.10.1")).unwrap())
    });
}

criterion_group!(
    benches,
    lexer_benchmark,
    dispatch_benchmark,
    world_benchmark,
    date_benchmark
);
criterion_main!(benches);

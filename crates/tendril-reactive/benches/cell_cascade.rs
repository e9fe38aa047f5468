//! Benchmark: synchronous write cascades through derived cells

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tendril_reactive::Cell;

fn build_chain(depth: usize) -> (Cell<u64>, Cell<u64>) {
	let root = Cell::new(0_u64);
	let mut tail = root.derive(|n| n + 1);
	for _ in 1..depth {
		tail = tail.derive(|n| n + 1);
	}
	(root, tail)
}

fn benchmark_chain_depth(c: &mut Criterion) {
	let mut group = c.benchmark_group("chain_cascade");

	for depth in [1_usize, 10, 100] {
		let (root, tail) = build_chain(depth);
		let mut next = 0_u64;

		group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
			b.iter(|| {
				next += 1;
				root.set(next);
				black_box(tail.get())
			});
		});
	}

	group.finish();
}

fn benchmark_fan_out(c: &mut Criterion) {
	let root = Cell::new(0_u64);
	let subscriptions: Vec<_> = (0..1000)
		.map(|_| root.observe(|value| {
			black_box(*value);
		}))
		.collect();
	let mut next = 0_u64;

	c.bench_function("fan_out_1000_observers", |b| {
		b.iter(|| {
			next += 1;
			root.set(next);
		});
	});

	for subscription in subscriptions {
		subscription.unsubscribe();
	}
}

fn benchmark_idempotent_write(c: &mut Criterion) {
	let root = Cell::new(42_u64);
	let _tail = root.derive(|n| n * 2);

	c.bench_function("idempotent_write", |b| {
		b.iter(|| root.set(black_box(42)));
	});
}

criterion_group!(
	benches,
	benchmark_chain_depth,
	benchmark_fan_out,
	benchmark_idempotent_write
);
criterion_main!(benches);

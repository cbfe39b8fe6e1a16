//! Benchmark: pairwise alignment of random fragmentation trees.
//!
//! Run with:
//! `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ftalign::libs::fragtree::{FragAdapter, FragTree, StandardScoring};
use ftalign::libs::treealign::{Solver, TreeAligner};
use rand::{rngs::SmallRng, Rng, SeedableRng};

// Random tree as Newick. Formulas grow with the subtree, so every loss is valid.
fn random_newick(rng: &mut SmallRng, size: usize) -> String {
    let parents: Vec<usize> = (1..size).map(|i| rng.gen_range(0..i)).collect();
    let oxygen: Vec<bool> = (0..size).map(|_| rng.gen_bool(0.3)).collect();

    let mut children = vec![vec![]; size];
    for (i, &p) in parents.iter().enumerate() {
        children[p].push(i + 1);
    }

    // (carbons, oxygens) of each subtree, children have larger ids
    let mut counts = vec![(0usize, 0usize); size];
    for v in (0..size).rev() {
        let (mut c, mut o) = (1, usize::from(oxygen[v]));
        for &child in &children[v] {
            c += counts[child].0;
            o += counts[child].1;
        }
        counts[v] = (c, o);
    }

    fn write(v: usize, children: &[Vec<usize>], counts: &[(usize, usize)], out: &mut String) {
        if !children[v].is_empty() {
            out.push('(');
            for (k, &child) in children[v].iter().enumerate() {
                if k > 0 {
                    out.push(',');
                }
                write(child, children, counts, out);
            }
            out.push(')');
        }
        let (c, o) = counts[v];
        out.push_str(&format!("C{}H{}", c, 2 * c));
        if o > 0 {
            out.push_str(&format!("O{}", o));
        }
    }

    let mut out = String::new();
    write(0, &children, &counts, &mut out);
    out.push(';');
    out
}

fn random_pair(size: usize) -> (FragTree, FragTree) {
    let mut rng = SmallRng::seed_from_u64(42);
    let left = random_newick(&mut rng, size);
    let right = random_newick(&mut rng, size);
    (
        FragTree::from_newick(&left, "left").unwrap().remove(0),
        FragTree::from_newick(&right, "right").unwrap().remove(0),
    )
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("treealign");
    let scoring = StandardScoring::default();

    for &size in &[20usize, 40] {
        for (solver, joins) in [(Solver::Sparse, 1), (Solver::MultiJoin, 2)] {
            group.bench_function(format!("{:?}_joins{}_n{}", solver, joins, size), |b| {
                b.iter_batched(
                    || random_pair(size),
                    |(left, right)| {
                        let adapter = FragAdapter::new();
                        let aligner = TreeAligner::new(&adapter, &scoring)
                            .joins(joins)
                            .solver(solver);
                        let score = aligner.score(Some(left.root()), Some(right.root())).unwrap();
                        criterion::black_box(score);
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_align);
criterion_main!(benches);

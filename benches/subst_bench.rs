//! Substitution, application and inhabitation benchmarks.
//!
//! Graphs are rebuilt per iteration so that hash-consing never turns a
//! repeated run into a dedup lookup.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use typegraph::{Addr, Heap, SubstEnv, TiMemo, TypeAddr, apply, subst_tm_ty};

/// `(x1 : Int) -> (x2 : Vec(x1)) -> ... -> Vec(x_n)`, `n` binders deep.
fn telescope(heap: &mut Heap, n: u32) -> Addr {
    fn level(heap: &mut Heap, depth: u32, prev: Addr, remaining: u32) -> Addr {
        if remaining == 0 {
            return heap.named(depth, "Vec", &[prev]).addr();
        }
        let domain = heap.named(depth, "Vec", &[prev]).addr();
        heap.ty_fun_with(depth, domain, |heap, x| level(heap, depth + 1, x, remaining - 1))
            .addr()
    }
    let int = heap.named(0, "Int", &[]).addr();
    heap.ty_fun_with(0, int, |heap, x| level(heap, 1, x, n.saturating_sub(1)))
        .addr()
}

/// Apply `func` to `Int` until it is no longer a function, at most `n` times.
fn apply_chain(heap: &mut Heap, memo: &mut TiMemo, func: Addr, n: u32) -> Addr {
    let int = heap.named(0, "Int", &[]);
    let mut current = TypeAddr::new_unchecked(func);
    for _ in 0..n {
        match apply(heap, memo, current, int) {
            Ok(Some(next)) => current = next,
            Ok(None) | Err(_) => break,
        }
    }
    current.addr()
}

/// Balanced union tree with `2^height` leaves.
fn union_tree(heap: &mut Heap, height: u32, names: &[Addr]) -> Addr {
    if height == 0 {
        return names[0];
    }
    let (left, right) = names.split_at(names.len() / 2);
    let a = union_tree(heap, height - 1, left);
    let b = union_tree(heap, height - 1, right);
    heap.union(0, a, b).addr()
}

fn bench_subst(c: &mut Criterion) {
    let mut group = c.benchmark_group("subst_tm_ty");

    for n in [4u32, 16, 64] {
        group.bench_with_input(BenchmarkId::new("telescope", n), &n, |b, &n| {
            b.iter(|| {
                let mut heap = Heap::new();
                let ty = telescope(&mut heap, n);
                let typegraph::NodeData::TyFun { codomain, .. } = *heap.data(ty) else {
                    unreachable!("telescope builds a function type");
                };
                let value = heap.lit_int(0, 7);
                black_box(subst_tm_ty(
                    &mut heap,
                    0,
                    1,
                    &SubstEnv::term(value),
                    None,
                    codomain,
                ))
            })
        });
    }

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for n in [4u32, 16, 64] {
        group.bench_with_input(BenchmarkId::new("telescope", n), &n, |b, &n| {
            b.iter(|| {
                let mut heap = Heap::new();
                let mut memo = TiMemo::new();
                let ty = telescope(&mut heap, n);
                black_box(apply_chain(&mut heap, &mut memo, ty, n))
            })
        });
    }

    group.finish();
}

fn bench_inhabited(c: &mut Criterion) {
    let mut group = c.benchmark_group("inhabited");

    for height in [4u32, 8, 10] {
        group.bench_with_input(
            BenchmarkId::new("union_of_disjoint_intersections", height),
            &height,
            |b, &height| {
                b.iter(|| {
                    let mut heap = Heap::new();
                    let names: Vec<Addr> = (0..1u32 << height)
                        .map(|i| heap.named(0, &format!("T{i}"), &[]).addr())
                        .collect();
                    let tree = union_tree(&mut heap, height, &names);
                    let other = heap.named(0, "Other", &[]).addr();
                    let ty = heap.intersection(0, tree, other).addr();
                    let mut memo = TiMemo::new();
                    black_box(typegraph::type_inhabited(&mut heap, &mut memo, ty))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_subst, bench_apply, bench_inhabited);
criterion_main!(benches);

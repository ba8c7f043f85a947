//! Inhabitation verdicts and memo behaviour.

use std::io;
use std::sync::{Arc, Mutex};
use tg_core::{Addr, Heap, NodeData, Prim, TiError, TiMemo, TiVal, type_inhabited};

/// Log sink shared between a test and the subscriber it installs.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Fixture {
    heap: Heap,
    memo: TiMemo,
    int: Addr,
    str_ty: Addr,
    bool_ty: Addr,
}

impl Fixture {
    fn new() -> Self {
        let mut heap = Heap::new();
        let int = heap.named(0, "Int", &[]).addr();
        let str_ty = heap.named(0, "Str", &[]).addr();
        let bool_ty = heap.named(0, "Bool", &[]).addr();
        Fixture {
            heap,
            memo: TiMemo::new(),
            int,
            str_ty,
            bool_ty,
        }
    }

    fn inhabited(&mut self, ty: Addr) -> TiVal {
        type_inhabited(&mut self.heap, &mut self.memo, ty).expect("no contradiction")
    }

    /// `Int & Str`, provably empty.
    fn empty(&mut self) -> Addr {
        self.heap.intersection(0, self.int, self.str_ty).addr()
    }
}

#[test]
fn base_types() {
    let mut fx = Fixture::new();
    assert_eq!(fx.inhabited(fx.int), TiVal::TRUE);

    let any = fx.heap.any().addr();
    assert_eq!(fx.inhabited(any), TiVal::TRUE);

    let root = fx.heap.type_root().addr();
    assert_eq!(fx.inhabited(root), TiVal::TRUE);

    let lit = fx.heap.lit_int(0, 3);
    assert_eq!(fx.inhabited(lit), TiVal::TRUE);

    let hole = fx.heap.unknown(0).addr();
    assert_eq!(fx.inhabited(hole), TiVal::UNKNOWN);

    let var = fx.heap.ty_var(1).addr();
    assert_eq!(fx.inhabited(var), TiVal::UNKNOWN);

    let applied = fx.heap.named(0, "Vec", &[fx.int]).addr();
    assert_eq!(fx.inhabited(applied), TiVal::UNKNOWN);
}

#[test]
fn unions_need_one_inhabited_side() {
    let mut fx = Fixture::new();
    let hole = fx.heap.unknown(0).addr();
    let empty = fx.empty();

    let u = fx.heap.union(0, hole, fx.int).addr();
    assert_eq!(fx.inhabited(u), TiVal::TRUE);

    let u = fx.heap.union(0, empty, hole).addr();
    assert_eq!(fx.inhabited(u), TiVal::UNKNOWN);

    let other_empty = fx.heap.intersection(0, fx.int, fx.bool_ty).addr();
    let u = fx.heap.union(0, empty, other_empty).addr();
    assert_eq!(fx.inhabited(u), TiVal::FALSE);
}

#[test]
fn intersections_of_distinct_heads_are_empty() {
    let mut fx = Fixture::new();
    let empty = fx.empty();
    assert_eq!(fx.inhabited(empty), TiVal::FALSE);

    let f = fx.heap.ty_fun(0, fx.int, fx.str_ty).addr();
    let fun_and_int = fx.heap.intersection(0, f, fx.int).addr();
    assert_eq!(fx.inhabited(fun_and_int), TiVal::FALSE);

    let same = fx.heap.intersection(0, fx.int, fx.int).addr();
    assert_eq!(fx.inhabited(same), TiVal::TRUE);

    let any = fx.heap.any().addr();
    let with_any = fx.heap.intersection(0, any, fx.str_ty).addr();
    assert_eq!(fx.inhabited(with_any), TiVal::TRUE);
}

#[test]
fn intersections_distribute_over_unions() {
    let mut fx = Fixture::new();
    let either = fx.heap.union(0, fx.int, fx.str_ty).addr();

    let none = fx.heap.intersection(0, either, fx.bool_ty).addr();
    assert_eq!(fx.inhabited(none), TiVal::FALSE);

    let some = fx.heap.intersection(0, fx.str_ty, either).addr();
    assert_eq!(fx.inhabited(some), TiVal::TRUE);
}

#[test]
fn overlapping_function_types_are_not_assumed_inhabited() {
    let mut fx = Fixture::new();
    let f = fx.heap.ty_fun(0, fx.int, fx.str_ty).addr();
    let g = fx.heap.ty_fun(0, fx.str_ty, fx.int).addr();
    let both = fx.heap.intersection(0, f, g).addr();
    assert_eq!(fx.inhabited(both), TiVal::UNKNOWN);

    // An empty side still settles it.
    let empty = fx.empty();
    let dead = fx.heap.ty_fun(0, fx.int, empty).addr();
    let with_dead = fx.heap.intersection(0, dead, g).addr();
    assert_eq!(fx.inhabited(with_dead), TiVal::FALSE);
}

#[test]
fn functions_are_empty_only_from_inhabited_to_empty() {
    let mut fx = Fixture::new();
    let empty = fx.empty();

    let plain = fx.heap.ty_fun(0, fx.int, fx.str_ty).addr();
    assert_eq!(fx.inhabited(plain), TiVal::TRUE);

    let into_empty = fx.heap.ty_fun(0, fx.int, empty).addr();
    assert_eq!(fx.inhabited(into_empty), TiVal::FALSE);

    let from_empty = fx.heap.ty_fun(0, empty, empty).addr();
    assert_eq!(fx.inhabited(from_empty), TiVal::TRUE);

    let hole = fx.heap.unknown(0).addr();
    let from_hole = fx.heap.ty_fun(0, hole, empty).addr();
    assert_eq!(fx.inhabited(from_hole), TiVal::UNKNOWN);
}

#[test]
fn bounds_follow_the_implication() {
    let mut fx = Fixture::new();
    let empty = fx.empty();
    let hole = fx.heap.unknown(0).addr();

    let sub = fx.heap.sub_bound(0, fx.int, fx.str_ty).addr();
    assert_eq!(fx.inhabited(sub), TiVal::TRUE);

    let sub = fx.heap.sub_bound(0, empty, hole).addr();
    assert_eq!(fx.inhabited(sub), TiVal::FALSE);

    let sup = fx.heap.super_bound(0, hole, fx.int).addr();
    assert_eq!(fx.inhabited(sup), TiVal::TRUE);

    let sup = fx.heap.super_bound(0, empty, hole).addr();
    assert_eq!(fx.inhabited(sup), TiVal::FALSE);
}

#[test]
fn contradictory_sub_bound_is_an_error() {
    let mut fx = Fixture::new();
    let empty = fx.empty();
    let bad = fx.heap.sub_bound(0, fx.int, empty).addr();

    let err = type_inhabited(&mut fx.heap, &mut fx.memo, bad).expect_err("contradiction");
    let TiError::Contradiction(contradiction) = err;
    assert_eq!(contradiction.node, bad);
    assert_eq!(contradiction.rule, "sub_bound");
    assert!(contradiction.causes.contains(&fx.int));
    assert!(contradiction.causes.contains(&empty));
}

#[test]
fn contradictions_are_logged_as_errors() {
    let mut fx = Fixture::new();
    let empty = fx.empty();
    let bad = fx.heap.sub_bound(0, fx.int, empty).addr();

    let log = CapturedLog::default();
    let sink = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::ERROR)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, || {
        type_inhabited(&mut fx.heap, &mut fx.memo, bad)
    });

    assert!(result.is_err());
    let text = log.text();
    assert!(text.contains("ERROR"), "{text}");
    assert!(text.contains("inhabitation contradiction"), "{text}");
    assert!(text.contains("sub_bound"), "{text}");
    assert_eq!(text.lines().count(), 1, "{text}");
}

#[test]
fn contradictory_super_bound_is_an_error() {
    let mut fx = Fixture::new();
    let empty = fx.empty();
    let bad = fx.heap.super_bound(0, empty, fx.int).addr();

    let err = type_inhabited(&mut fx.heap, &mut fx.memo, bad).expect_err("contradiction");
    let TiError::Contradiction(contradiction) = err.clone();
    assert_eq!(contradiction.rule, "super_bound");
    assert!(err.to_string().contains("inhabitation contradiction"));
}

#[test]
fn recursive_types() {
    let mut fx = Fixture::new();
    let int = fx.int;
    let unit = fx.heap.named(0, "Unit", &[]).addr();

    // Fix(λr. Unit | (Int -> r))
    let list = fx
        .heap
        .fix(0, |heap, r| {
            let cons = heap.ty_fun(1, int, r).addr();
            heap.union(1, unit, cons).addr()
        })
        .addr();
    assert_eq!(fx.inhabited(list), TiVal::TRUE);

    let loop_ty = fx.heap.fix(0, |_, r| r).addr();
    assert_eq!(fx.inhabited(loop_ty), TiVal::UNKNOWN);

    let selfish = fx.heap.self_ty(0, |_, _| int).addr();
    assert_eq!(fx.inhabited(selfish), TiVal::TRUE);
}

#[test]
fn cyclic_graphs_are_unknown_not_divergent() {
    let mut fx = Fixture::new();
    let slot = fx.heap.reserve(0);
    fx.heap
        .fill(
            slot,
            NodeData::Primitive {
                prim: Prim::Union,
                args: [slot, slot].into_iter().collect(),
            },
        )
        .expect("pending slot");
    assert_eq!(fx.inhabited(slot), TiVal::UNKNOWN);

    let other = fx.heap.reserve(0);
    let int = fx.int;
    fx.heap
        .fill(
            other,
            NodeData::Primitive {
                prim: Prim::Union,
                args: [other, int].into_iter().collect(),
            },
        )
        .expect("pending slot");
    assert_eq!(fx.inhabited(other), TiVal::TRUE);
}

#[test]
fn decided_verdicts_are_memoised() {
    let mut fx = Fixture::new();
    let either = fx.heap.union(0, fx.int, fx.str_ty).addr();

    assert_eq!(fx.inhabited(either), TiVal::TRUE);
    let first = fx.memo.stats();
    assert!(first.derivations >= 2);
    assert_eq!(first.memo_hits, 0);

    assert_eq!(fx.inhabited(either), TiVal::TRUE);
    let second = fx.memo.stats();
    assert_eq!(second.derivations, first.derivations);
    assert_eq!(second.memo_hits, 1);

    let entry = fx.memo.get(either).expect("memo entry");
    assert_eq!(entry.value, Some(TiVal::TRUE));
    assert_eq!(entry.derivations[0].rule, "union");
    assert_eq!(entry.causes, vec![fx.int]);
}

#[test]
fn memo_is_keyed_by_address() {
    let mut fx = Fixture::new();
    assert_eq!(fx.inhabited(fx.int), TiVal::TRUE);
    let before = fx.memo.stats().derivations;

    let data = fx.heap.data(fx.int).clone();
    let twin = fx.heap.allocate_fresh(0, data);
    assert_eq!(fx.inhabited(twin), TiVal::TRUE);
    assert_eq!(fx.memo.stats().derivations, before + 1);
    assert!(fx.memo.get(twin).is_some());
}

#[test]
fn undecided_nodes_are_revisited_after_resolution() {
    let mut fx = Fixture::new();
    let hole = fx.heap.unknown(0).addr();
    assert_eq!(fx.inhabited(hole), TiVal::UNKNOWN);
    assert_eq!(fx.memo.get(hole).and_then(|e| e.value), None);

    fx.heap.install_indirection(hole, fx.int).expect("install");
    assert_eq!(fx.inhabited(hole), TiVal::TRUE);
    assert_eq!(fx.memo.stats().stale_discards, 1);
}

#[test]
fn a_union_waiting_on_a_hole_settles_once_it_resolves() {
    let mut fx = Fixture::new();
    let hole = fx.heap.unknown(0).addr();
    let empty = fx.empty();
    let u = fx.heap.union(0, empty, hole).addr();
    assert_eq!(fx.inhabited(u), TiVal::UNKNOWN);

    fx.heap.install_indirection(hole, fx.str_ty).expect("install");
    assert_eq!(fx.inhabited(u), TiVal::TRUE);
}

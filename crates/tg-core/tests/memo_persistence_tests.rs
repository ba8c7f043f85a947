//! Saving and reloading the inhabitation memo.

use std::fs;
use tempfile::TempDir;
use tg_core::{Addr, Heap, MemoError, TiMemo, TiVal, type_inhabited};

/// The same small graph, built the same way every time.
struct Graph {
    heap: Heap,
    either: Addr,
    empty: Addr,
    fun: Addr,
}

fn build() -> Graph {
    let mut heap = Heap::new();
    let int = heap.named(0, "Int", &[]).addr();
    let str_ty = heap.named(0, "Str", &[]).addr();
    let bool_ty = heap.named(0, "Bool", &[]).addr();
    let either = heap.union(0, int, str_ty).addr();
    let empty = heap.intersection(0, either, bool_ty).addr();
    let fun = heap.ty_fun(0, int, empty).addr();
    Graph {
        heap,
        either,
        empty,
        fun,
    }
}

fn solve_all(graph: &mut Graph, memo: &mut TiMemo) -> Vec<TiVal> {
    [graph.either, graph.empty, graph.fun]
        .into_iter()
        .map(|ty| type_inhabited(&mut graph.heap, memo, ty).expect("no contradiction"))
        .collect()
}

#[test]
fn saving_a_loaded_memo_reproduces_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ti_memo.json");

    let mut graph = build();
    let mut memo = TiMemo::new();
    solve_all(&mut graph, &mut memo);
    memo.save(&path).expect("save");
    let original = fs::read_to_string(&path).expect("read");

    let reloaded = TiMemo::try_load(&path).expect("load");
    assert_eq!(reloaded.len(), memo.len());
    reloaded.save(&path).expect("save again");
    assert_eq!(fs::read_to_string(&path).expect("read"), original);
    assert!(original.ends_with('\n'));
}

#[test]
fn a_reloaded_memo_answers_without_new_derivations() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ti_memo.json");

    let mut first = build();
    let mut memo = TiMemo::new();
    let verdicts = solve_all(&mut first, &mut memo);
    assert_eq!(verdicts, vec![TiVal::TRUE, TiVal::FALSE, TiVal::FALSE]);
    memo.save(&path).expect("save");

    let mut second = build();
    let mut reloaded = TiMemo::load(&path);
    assert_eq!(solve_all(&mut second, &mut reloaded), verdicts);

    let stats = reloaded.stats();
    assert_eq!(stats.derivations, 0);
    assert_eq!(stats.memo_hits, 3);
    assert_eq!(stats.stale_discards, 0);
}

#[test]
fn missing_or_corrupt_files_degrade_to_an_empty_memo() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("absent.json");
    assert!(TiMemo::load(&missing).is_empty());
    assert!(matches!(TiMemo::try_load(&missing), Err(MemoError::Io(_))));

    let corrupt = dir.path().join("corrupt.json");
    fs::write(&corrupt, "[{\"node\": 3, \"finger").expect("write");
    assert!(TiMemo::load(&corrupt).is_empty());
    assert!(matches!(TiMemo::try_load(&corrupt), Err(MemoError::Json(_))));

    // Still usable afterwards.
    let mut graph = build();
    let mut memo = TiMemo::load(&corrupt);
    assert_eq!(
        type_inhabited(&mut graph.heap, &mut memo, graph.either).expect("no contradiction"),
        TiVal::TRUE
    );
}

#[test]
fn entries_for_a_different_graph_are_discarded() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ti_memo.json");

    let mut a = Heap::new();
    let int = a.named(0, "Int", &[]).addr();
    let str_ty = a.named(0, "Str", &[]).addr();
    let both = a.intersection(0, int, str_ty).addr();
    let mut memo = TiMemo::new();
    assert_eq!(
        type_inhabited(&mut a, &mut memo, both).expect("no contradiction"),
        TiVal::FALSE
    );
    memo.save(&path).expect("save");

    // Same address, different node.
    let mut b = Heap::new();
    let int = b.named(0, "Int", &[]).addr();
    let str_ty = b.named(0, "Str", &[]).addr();
    let either = b.union(0, int, str_ty).addr();
    assert_eq!(either, both);

    let mut reloaded = TiMemo::load(&path);
    assert_eq!(
        type_inhabited(&mut b, &mut reloaded, either).expect("no contradiction"),
        TiVal::TRUE
    );
    assert_eq!(reloaded.stats().stale_discards, 1);
    assert_eq!(reloaded.stats().memo_hits, 0);
}

#[test]
fn duplicate_records_are_rejected() {
    let mut graph = build();
    let mut memo = TiMemo::new();
    solve_all(&mut graph, &mut memo);

    let text = memo.to_json_string().expect("serialise");
    let mut records: Vec<serde_json::Value> = serde_json::from_str(&text).expect("json array");
    let first = records[0].clone();
    let node = Addr(first["node"].as_u64().expect("numeric node") as u32);
    records.push(first);
    let doctored = serde_json::to_string(&records).expect("serialise");

    match TiMemo::from_json_str(&doctored) {
        Err(MemoError::DuplicateNode { node: dup }) => assert_eq!(dup, node),
        other => panic!("expected a duplicate-node error, got {other:?}"),
    }
}

#[test]
fn undecided_work_is_not_carried_into_a_reordered_heap() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ti_memo.json");

    // Hole first, then Int.
    let mut a = Heap::new();
    let hole_a = a.unknown(0).addr();
    let int_a = a.named(0, "Int", &[]).addr();
    let pair_a = a.union(0, hole_a, hole_a).addr();
    let mut memo = TiMemo::new();
    assert_eq!(
        type_inhabited(&mut a, &mut memo, pair_a).expect("no contradiction"),
        TiVal::UNKNOWN
    );
    assert_eq!(
        type_inhabited(&mut a, &mut memo, int_a).expect("no contradiction"),
        TiVal::TRUE
    );
    memo.save(&path).expect("save");

    // Int first, then the hole: the union lands on the same address with
    // the same shape, but its operands moved.
    let mut b = Heap::new();
    let int_b = b.named(0, "Int", &[]).addr();
    let hole_b = b.unknown(0).addr();
    let pair_b = b.union(0, hole_b, hole_b).addr();
    assert_eq!(pair_b, pair_a);
    assert_eq!(hole_b, int_a);
    assert_eq!(b.fingerprint(pair_b), a.fingerprint(pair_a));

    let mut reloaded = TiMemo::load(&path);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(
        type_inhabited(&mut b, &mut reloaded, pair_b).expect("no contradiction"),
        TiVal::UNKNOWN
    );
    assert_eq!(
        type_inhabited(&mut b, &mut reloaded, hole_b).expect("no contradiction"),
        TiVal::UNKNOWN
    );
    assert_eq!(reloaded.stats().stale_discards, 1);

    let mut fresh = TiMemo::new();
    assert_eq!(
        type_inhabited(&mut b, &mut fresh, pair_b).expect("no contradiction"),
        TiVal::UNKNOWN
    );
    assert_eq!(
        type_inhabited(&mut b, &mut fresh, int_b).expect("no contradiction"),
        TiVal::TRUE
    );
}

#[test]
fn only_decided_verdicts_are_written() {
    let mut heap = Heap::new();
    let hole = heap.unknown(0).addr();
    let int = heap.named(0, "Int", &[]).addr();
    let either = heap.union(0, int, hole).addr();
    let mut memo = TiMemo::new();
    for ty in [hole, either] {
        type_inhabited(&mut heap, &mut memo, ty).expect("no contradiction");
    }
    assert!(memo.get(hole).is_some_and(|entry| entry.value.is_none()));

    let reloaded = TiMemo::from_json_str(&memo.to_json_string().expect("serialise"))
        .expect("parse");
    assert!(reloaded.get(hole).is_none());
    let entry = reloaded.get(either).expect("decided entry survives");
    assert_eq!(entry.value, Some(TiVal::TRUE));
    assert!(entry.derivations.is_empty());
}

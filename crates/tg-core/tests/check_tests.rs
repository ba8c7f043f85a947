use crate::check::{Violation, check, check_report};
use crate::heap::Heap;

#[test]
fn well_formed_graphs_pass() {
    let mut heap = Heap::new();
    let int = heap.named(0, "Int", &[]).addr();
    let dependent = heap.ty_fun_with(0, int, |heap, x| heap.named(1, "Vec", &[x]).addr());
    let selfish = heap.self_ty(0, |heap, this| {
        heap.ty_fun_with(1, this, |heap, x| heap.named(2, "Pair", &[this, x]).addr())
            .addr()
    });

    assert!(check(&heap, dependent.addr()));
    assert!(check(&heap, selfish.addr()));
    assert!(check(&heap, heap.type_root().addr()));
}

#[test]
fn children_deeper_than_their_scope_are_reported() {
    let mut heap = Heap::new();
    let deep = heap.lit_int(2, 1);
    let shallow = heap.lit_int(0, 2);
    let pair = heap.tm_pair(0, deep, shallow);

    let report = check_report(&heap, pair);
    assert_eq!(
        report.violations,
        vec![Violation::DepthExceedsScope {
            node: deep,
            depth: 2,
            scope: 0,
        }]
    );
    assert!(!check(&heap, pair));
}

#[test]
fn variables_outside_every_binder_escape() {
    let mut heap = Heap::new();
    let x = heap.tm_var(1);
    let lit = heap.lit_int(0, 1);
    let pair = heap.tm_pair(0, x, lit);

    let report = check_report(&heap, pair);
    assert!(report.violations.contains(&Violation::EscapedVariable { node: x }));

    let at_zero = heap.tm_var(0);
    assert_eq!(
        check_report(&heap, at_zero).violations,
        vec![Violation::EscapedVariable { node: at_zero }]
    );
}

#[test]
fn unfilled_slots_are_reported() {
    let mut heap = Heap::new();
    let slot = heap.reserve(0);
    let lit = heap.lit_int(0, 1);
    let pair = heap.tm_pair(0, slot, lit);
    assert_eq!(
        check_report(&heap, pair).violations,
        vec![Violation::UnfilledSlot { node: slot }]
    );
}

#[test]
fn indirection_targets_are_checked_in_the_same_scope() {
    let mut heap = Heap::new();
    let deep = heap.lit_int(2, 7);
    let hole = heap.unknown(0).addr();
    heap.install_indirection(hole, deep).expect("install");
    let lit = heap.lit_int(0, 1);
    let pair = heap.tm_pair(0, hole, lit);

    let report = check_report(&heap, pair);
    assert_eq!(
        report.violations,
        vec![Violation::DepthExceedsScope {
            node: deep,
            depth: 2,
            scope: 0,
        }]
    );
}

#[test]
fn violations_accumulate_and_render() {
    let mut heap = Heap::new();
    let slot = heap.reserve(0);
    let x = heap.tm_var(1);
    let pair = heap.tm_pair(0, slot, x);

    let report = check_report(&heap, pair);
    assert_eq!(report.violations.len(), 3);
    let text = report.to_string();
    assert!(text.starts_with("3 violation(s)"));
    assert!(text.contains("unfilled slot"));
    assert!(text.contains("escaped variable"));
}

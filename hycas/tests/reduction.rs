use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use hycas::prelude::*;
use hycas::reduction::beautify::beautify;
use hycas::reduction::store::MapStore;
use hycas::tree::owned::shapes::*;

fn simplified_in(tree: &OwnedTree, ctx: &ProjectionContext) -> OwnedTree {
    let mut arena = Arena::new();
    let h = arena.push_tree(tree).unwrap();
    Simplifier::default().simplify(&mut arena, h, ctx).unwrap();
    assert!(arena.is_well_formed());
    arena.snapshot_tree(h).unwrap()
}

fn simplified(tree: &OwnedTree) -> OwnedTree {
    simplified_in(tree, &ProjectionContext::default())
}

#[test]
fn constants_fold() {
    assert_eq!(simplified(&add([int(2), int(3)])), int(5));
    assert_eq!(simplified(&mult([int(4), rational(1, 8)])), rational(1, 2));
    assert_eq!(simplified(&pow(int(2), int(10))), int(1024));
    assert_eq!(simplified(&div(int(6), int(4))), rational(3, 2));
}

#[test]
fn equal_expressions_share_one_form() {
    assert_eq!(
        simplified(&add([sym("b"), sym("a")])),
        simplified(&add([sym("a"), sym("b")]))
    );
    assert_eq!(
        simplified(&mult([sym("y"), int(2), sym("x")])),
        simplified(&mult([sym("x"), sym("y"), int(2)]))
    );
    assert_eq!(
        simplified(&add([sym("x"), sym("x")])),
        simplified(&mult([int(2), sym("x")]))
    );
}

#[test]
fn cancellation_to_zero() {
    assert_eq!(simplified(&sub(sym("x"), sym("x"))), int(0));
    assert_eq!(simplified(&div(sym("x"), sym("x"))), int(1));
}

#[test]
fn degrees() {
    let degrees = ProjectionContext::default().with_angle_unit(AngleUnit::Degree);
    assert_eq!(simplified_in(&cos(int(60)), &degrees), rational(1, 2));
    assert_eq!(simplified_in(&sin(int(90)), &degrees), int(1));
}

#[test]
fn beautified_results_are_stable() {
    let inputs = [
        sub(sym("x"), sym("y")),
        div(int(1), sym("x")),
        pow(sym("x"), int(-2)),
        sqrt(sym("x")),
        div(ln(sym("x")), ln(int(2))),
        mult([int(-1), sym("x"), pow(sym("y"), int(-1))]),
        cos(sym("x")),
        pow(e(), sym("x")),
    ];
    let ctx = ProjectionContext::default();
    for input in &inputs {
        let mut arena = Arena::new();
        let h = arena.push_tree(input).unwrap();
        Simplifier::default().simplify(&mut arena, h, &ctx).unwrap();
        let once = arena.snapshot_tree(h).unwrap();
        let at = arena.resolve(h).unwrap();
        assert!(!beautify(&mut arena, at, &ctx, &mut NeverInterrupt).unwrap());
        assert_eq!(arena.snapshot_tree(h).unwrap(), once);
    }
}

#[test]
fn overflow_falls_back_to_floats() {
    // 2^400 needs more than 32 bytes exactly but fits as a float.
    let mut arena = Arena::with_capacity(32, 4);
    let h = arena.push_tree(&pow(int(2), int(400))).unwrap();
    let strategy = Simplifier::default()
        .simplify(&mut arena, h, &ProjectionContext::default())
        .unwrap();
    assert_eq!(strategy, Strategy::NumbersToFloat);
    assert!(arena.size() <= arena.capacity());
    assert_eq!(arena.get(h).unwrap().node_type(), NodeType::Float);
    assert_eq!(arena.snapshot_tree(h).unwrap(), float(2f64.powi(400)));
}

#[test]
fn overflow_without_fallback_is_reported() {
    let config = EngineConfig::from_toml_str("fallback = []").unwrap();
    let mut arena = Arena::with_capacity(32, 4);
    let h = arena.push_tree(&pow(int(2), int(400))).unwrap();
    let before = arena.bytes().to_vec();
    let err = Simplifier::new(config)
        .simplify(&mut arena, h, &ProjectionContext::default())
        .unwrap_err();
    assert!(matches!(err, CalcError::CapacityExceeded { .. }));
    assert_eq!(arena.bytes(), before.as_slice());
    assert_eq!(arena.snapshot_tree(h).unwrap(), pow(int(2), int(400)));
}

#[test]
fn raised_flag_cancels() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut arena = Arena::new();
    let h = arena.push_tree(&add([int(2), int(3)])).unwrap();
    let err = Simplifier::default()
        .with_interrupt(flag)
        .simplify(&mut arena, h, &ProjectionContext::default())
        .unwrap_err();
    assert!(matches!(err, CalcError::Cancelled));
    assert_eq!(arena.snapshot_tree(h).unwrap(), add([int(2), int(3)]));
}

#[test]
fn stored_symbols_are_substituted() {
    let mut store = MapStore::new();
    store.define_symbol("a", int(2));
    let mut arena = Arena::new();
    let h = arena.push_tree(&add([sym("a"), int(3), sym("b")])).unwrap();
    Simplifier::default()
        .with_store(store)
        .simplify(&mut arena, h, &ProjectionContext::default())
        .unwrap();
    assert_eq!(arena.snapshot_tree(h).unwrap(), add([int(5), sym("b")]));
}

#[test]
fn other_trees_are_left_alone() {
    let mut arena = Arena::new();
    let before = arena.push_tree(&add([int(1), int(1)])).unwrap();
    let h = arena.push_tree(&mult([sym("x"), sym("x")])).unwrap();
    let after = arena.push_tree(&sub(int(3), int(1))).unwrap();
    Simplifier::default()
        .simplify(&mut arena, h, &ProjectionContext::default())
        .unwrap();
    assert_eq!(arena.snapshot_tree(h).unwrap(), pow(sym("x"), int(2)));
    assert_eq!(arena.snapshot_tree(before).unwrap(), add([int(1), int(1)]));
    assert_eq!(arena.snapshot_tree(after).unwrap(), sub(int(3), int(1)));
}

use hycas::pattern::find_match;
use hycas::prelude::*;
use hycas::tree::owned::shapes::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use Tag::{A, B, C};

fn random_term(budget: usize, rng: &mut impl Rng) -> OwnedTree {
    if budget == 0 || rng.random_bool(0.4) {
        return match rng.random_range(0..=2) {
            0 => int(rng.random_range(-9..=9)),
            1 => sym(["x", "y", "z"][rng.random_range(0..3)]),
            _ => e(),
        };
    }
    match rng.random_range(0..=3) {
        0 => mult((0..rng.random_range(2..=3)).map(|_| random_term(budget - 1, rng))),
        1 => pow(random_term(budget - 1, rng), random_term(budget - 1, rng)),
        2 => ln(random_term(budget - 1, rng)),
        _ => add((0..rng.random_range(2..=3)).map(|_| random_term(budget - 1, rng))),
    }
}

#[test]
fn building_from_a_match_gives_the_subject_back() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let patterns = [
        add([A.zero_or_more(), B.one(), C.zero_or_more()]),
        add([A.one(), B.one_or_more()]),
        add([A.one_or_more(), B.one()]),
    ];
    for _ in 0..100 {
        let subject = add((0..rng.random_range(2..=5)).map(|_| random_term(2, &mut rng)));
        for pattern in &patterns {
            let bindings = match_tree(pattern.root(), subject.root()).unwrap();
            assert_eq!(build(pattern.root(), &bindings).unwrap(), subject);
        }
        // A tree without placeholders matches only itself and builds itself.
        let bindings = match_tree(subject.root(), subject.root()).unwrap();
        assert_eq!(build(subject.root(), &bindings).unwrap(), subject);
    }
}

#[test]
fn repeated_tags_bind_equal_content() {
    let pattern = add([A.one(), A.one()]);
    assert!(match_tree(pattern.root(), add([sym("x"), sym("x")]).root()).is_some());
    assert!(match_tree(pattern.root(), add([sym("x"), sym("y")]).root()).is_none());

    let pattern = mult([A.zero_or_more(), ln(B.one()), C.zero_or_more(), ln(B.one())]);
    let subject = mult([int(2), ln(sym("x")), sym("y"), ln(sym("x"))]);
    let bindings = match_tree(pattern.root(), subject.root()).unwrap();
    assert_eq!(bindings.tree(B).map(OwnedTree::from_tree), Some(sym("x")));
    assert_eq!(bindings.get(C).map(|c| c.len()), Some(1));
}

#[test]
fn replacing_with_the_pattern_itself_is_the_identity() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let pattern = add([A.zero_or_more(), B.one(), C.zero_or_more()]);
    for _ in 0..50 {
        let subject = add((0..rng.random_range(2..=4)).map(|_| random_term(2, &mut rng)));
        let mut arena = Arena::new();
        let h = arena.push_tree(&subject).unwrap();
        match_and_replace(&mut arena, h, &pattern, &pattern).unwrap();
        assert_eq!(arena.snapshot_tree(h).unwrap(), subject);
        assert!(arena.is_well_formed());
    }
}

#[test]
fn replace_rewrites_in_place() {
    let mut arena = Arena::new();
    let other = arena.push_tree(&sym("before")).unwrap();
    let h = arena
        .push_tree(&add([sym("a"), ln(mult([sym("x"), sym("y")])), sym("b")]))
        .unwrap();
    let after = arena.push_tree(&sym("after")).unwrap();

    let pattern = ln(mult([A.one(), B.one()]));
    let target = find_match(pattern.root(), arena.get(h).unwrap())
        .map(|(tree, _)| tree.offset())
        .unwrap();
    let target = arena.register(target).unwrap();
    match_and_replace(&mut arena, target, &pattern, &add([ln(A.one()), ln(B.one())])).unwrap();

    assert_eq!(
        arena.snapshot_tree(h).unwrap(),
        add([sym("a"), add([ln(sym("x")), ln(sym("y"))]), sym("b")])
    );
    assert_eq!(
        arena.snapshot_tree(target).unwrap(),
        add([ln(sym("x")), ln(sym("y"))])
    );
    assert_eq!(arena.snapshot_tree(other).unwrap(), sym("before"));
    assert_eq!(arena.snapshot_tree(after).unwrap(), sym("after"));
}

#[test]
fn squashed_variadics_collapse() {
    // x·y matched against the sum pattern A + B*: A = x·y, B is empty.
    let pattern = add([A.one(), B.zero_or_more()]);
    let subject = mult([sym("x"), sym("y")]);
    let bindings = match_tree(pattern.root(), subject.root()).unwrap();
    assert_eq!(bindings.get(B).map(|b| b.len()), Some(0));
    assert_eq!(
        build(add([A.one(), B.zero_or_more()]).root(), &bindings).unwrap(),
        subject
    );
}

#[test]
fn rewrite_failure_reports_capacity() {
    let mut arena = Arena::with_capacity(32, 4);
    let h = arena.push_tree(&exp(sym("x"))).unwrap();
    let before = arena.bytes().to_vec();
    let huge = add((0..12).map(|i| exp(mult([int(i), A.one()]))));
    let err = match_and_replace(&mut arena, h, &exp(A.one()), &huge).unwrap_err();
    assert!(matches!(err, CalcError::CapacityExceeded { .. }));
    assert_eq!(arena.bytes(), before.as_slice());
}

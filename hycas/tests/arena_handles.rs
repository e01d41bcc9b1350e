use hycas::prelude::*;
use hycas::tree::owned::shapes::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn random_tree(budget: usize, rng: &mut impl Rng) -> OwnedTree {
    if budget == 0 || rng.random_bool(0.3) {
        return match rng.random_range(0..=3) {
            0 => int(rng.random_range(-20..=20)),
            1 => rational(rng.random_range(-9..=9), rng.random_range(2..=9)),
            2 => sym(["x", "y", "z", "t"][rng.random_range(0..4)]),
            _ => pi(),
        };
    }
    match rng.random_range(0..=4) {
        0 => add((0..rng.random_range(2..=4)).map(|_| random_tree(budget - 1, rng))),
        1 => mult((0..rng.random_range(2..=4)).map(|_| random_tree(budget - 1, rng))),
        2 => pow(random_tree(budget - 1, rng), int(rng.random_range(-3..=3))),
        3 => cos(random_tree(budget - 1, rng)),
        _ => func("f", random_tree(budget - 1, rng)),
    }
}

fn assert_all_intact(arena: &Arena, expected: &[(Handle, OwnedTree)]) {
    assert!(arena.is_well_formed());
    for (handle, tree) in expected {
        assert_eq!(&arena.snapshot_tree(*handle).unwrap(), tree);
    }
}

fn nary_children(tree: &OwnedTree) -> Option<Vec<OwnedTree>> {
    matches!(tree.root().node_type(), NodeType::Add | NodeType::Mult)
        .then(|| tree.root().children().map(OwnedTree::from_tree).collect())
}

fn rebuild(like: &OwnedTree, children: Vec<OwnedTree>) -> OwnedTree {
    match like.root().node_type() {
        NodeType::Add => add(children),
        _ => mult(children),
    }
}

/// A live root that is a sum or a product, if any.
fn pick_nary(live: &[(Handle, OwnedTree)], rng: &mut impl Rng) -> Option<usize> {
    let candidates: Vec<usize> = (0..live.len())
        .filter(|&i| nary_children(&live[i].1).is_some())
        .collect();
    (!candidates.is_empty()).then(|| candidates[rng.random_range(0..candidates.len())])
}

/// Some other live root than `target`.
fn pick_other(live: &[(Handle, OwnedTree)], target: usize, rng: &mut impl Rng) -> Option<usize> {
    (live.len() >= 2).then(|| {
        let other = rng.random_range(0..live.len() - 1);
        if other >= target { other + 1 } else { other }
    })
}

fn child_handle(arena: &mut Arena, root: Handle, index: usize) -> Handle {
    let offset = arena.get(root).unwrap().child(index).unwrap().offset();
    arena.register(offset).unwrap()
}

#[test]
fn random_edits_keep_other_handles_stable() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
    let mut arena = Arena::with_capacity(64 * 1024, 256);
    let mut live: Vec<(Handle, OwnedTree)> = (0..6)
        .map(|_| {
            let tree = random_tree(3, &mut rng);
            (arena.push_tree(&tree).unwrap(), tree)
        })
        .collect();

    for _ in 0..400 {
        if live.len() < 3 {
            let tree = random_tree(3, &mut rng);
            live.push((arena.push_tree(&tree).unwrap(), tree));
        }
        match rng.random_range(0..=7) {
            0 => {
                let index = rng.random_range(0..live.len());
                let tree = random_tree(3, &mut rng);
                arena.replace_tree(live[index].0, &tree).unwrap();
                live[index].1 = tree;
            }
            1 => {
                let index = rng.random_range(0..live.len());
                let (handle, _) = live.swap_remove(index);
                arena.remove(handle, Extent::Tree).unwrap();
                assert!(!arena.is_live(handle));
                arena.release(handle);
            }
            2 => {
                let tree = random_tree(3, &mut rng);
                live.push((arena.push_tree(&tree).unwrap(), tree));
            }
            3 => {
                // A fresh sibling next to a child of a sum or product.
                let Some(index) = pick_nary(&live, &mut rng) else { continue };
                let mut children = nary_children(&live[index].1).unwrap();
                if children.len() >= 8 {
                    continue;
                }
                let at = rng.random_range(0..children.len());
                let anchor = child_handle(&mut arena, live[index].0, at);
                let tree = random_tree(2, &mut rng);
                let after = rng.random_bool(0.5);
                let position = if after {
                    Position::After(anchor)
                } else {
                    Position::Before(anchor)
                };
                let inserted = arena.insert(position, Source::Owned(&tree)).unwrap();
                assert_eq!(arena.snapshot_tree(inserted).unwrap(), tree);
                assert_eq!(arena.snapshot_tree(anchor).unwrap(), children[at]);
                children.insert(at + after as usize, tree);
                live[index].1 = rebuild(&live[index].1, children);
                arena.release(anchor);
                arena.release(inserted);
            }
            4 => {
                // Another root moves in as a sibling.
                let Some(target) = pick_nary(&live, &mut rng) else { continue };
                let Some(source) = pick_other(&live, target, &mut rng) else { continue };
                let mut children = nary_children(&live[target].1).unwrap();
                if children.len() >= 8 {
                    continue;
                }
                let at = rng.random_range(0..children.len());
                let anchor = child_handle(&mut arena, live[target].0, at);
                let (moved, moved_tree) = live[source].clone();
                let inserted = arena.insert(Position::After(anchor), Source::Move(moved)).unwrap();
                assert_eq!(arena.snapshot_tree(moved).unwrap(), moved_tree);
                assert_eq!(arena.snapshot_tree(inserted).unwrap(), moved_tree);
                children.insert(at + 1, moved_tree);
                live[target].1 = rebuild(&live[target].1, children);
                for handle in [anchor, inserted, moved] {
                    arena.release(handle);
                }
                live.swap_remove(source);
            }
            5 => {
                // Another root moves over a child.
                let Some(target) = pick_nary(&live, &mut rng) else { continue };
                let Some(source) = pick_other(&live, target, &mut rng) else { continue };
                let mut children = nary_children(&live[target].1).unwrap();
                let at = rng.random_range(0..children.len());
                let slot = child_handle(&mut arena, live[target].0, at);
                let (moved, moved_tree) = live[source].clone();
                arena
                    .replace(slot, Extent::Tree, Source::Move(moved), Extent::Tree)
                    .unwrap();
                assert_eq!(arena.snapshot_tree(slot).unwrap(), moved_tree);
                children[at] = moved_tree;
                live[target].1 = rebuild(&live[target].1, children);
                arena.release(slot);
                arena.release(moved);
                live.swap_remove(source);
            }
            6 => {
                let Some(index) = pick_nary(&live, &mut rng) else { continue };
                let children = nary_children(&live[index].1).unwrap();
                let at = rng.random_range(0..children.len());
                let child = child_handle(&mut arena, live[index].0, at);
                arena.sort(live[index].0).unwrap();
                assert_eq!(arena.snapshot_tree(child).unwrap(), children[at]);

                let sorted = arena.snapshot_tree(live[index].0).unwrap();
                let content = |trees: &[OwnedTree]| {
                    let mut bytes: Vec<Vec<u8>> =
                        trees.iter().map(|t| t.as_bytes().to_vec()).collect();
                    bytes.sort();
                    bytes
                };
                assert_eq!(content(&nary_children(&sorted).unwrap()), content(&children));
                live[index].1 = sorted;
                arena.release(child);
            }
            _ => {
                // The detached child becomes a root of its own.
                let Some(index) = pick_nary(&live, &mut rng) else { continue };
                let mut children = nary_children(&live[index].1).unwrap();
                if children.len() <= 2 {
                    continue;
                }
                let at = rng.random_range(0..children.len());
                let child = child_handle(&mut arena, live[index].0, at);
                arena.detach(child).unwrap();
                let detached = children.remove(at);
                live[index].1 = rebuild(&live[index].1, children);
                live.push((child, detached));
            }
        }
        assert_all_intact(&arena, &live);
    }
}

#[test]
fn sorting_moves_inner_handles_with_their_children() {
    let mut arena = Arena::new();
    let h = arena
        .push_tree(&add([sym("c"), ln(sym("b")), sym("a")]))
        .unwrap();
    let log = child_handle(&mut arena, h, 1);
    let c = child_handle(&mut arena, h, 0);
    assert!(arena.sort(h).unwrap());
    assert_eq!(arena.snapshot_tree(log).unwrap(), ln(sym("b")));
    assert_eq!(arena.snapshot_tree(c).unwrap(), sym("c"));
    let sorted = arena.snapshot_tree(h).unwrap();
    assert_eq!(nary_children(&sorted).unwrap().len(), 3);
    assert!(arena.is_well_formed());
}

#[test]
fn inner_handles_follow_edits_around_them() {
    let mut arena = Arena::new();
    let h = arena
        .push_tree(&add([sym("a"), mult([int(2), sym("x")]), sym("b")]))
        .unwrap();
    let product = arena.get(h).unwrap().child(1).unwrap().offset();
    let inner = arena.register(product).unwrap();

    let first = arena.get(h).unwrap().child(0).unwrap().offset();
    let first = arena.register(first).unwrap();
    arena
        .replace_tree(first, &pow(sym("a"), add([int(1), sym("y"), sym("z")])))
        .unwrap();

    assert_eq!(arena.snapshot_tree(inner).unwrap(), mult([int(2), sym("x")]));
    arena
        .insert(Position::Before(inner), Source::Owned(&int(7)))
        .unwrap();
    assert_eq!(arena.snapshot_tree(inner).unwrap(), mult([int(2), sym("x")]));
    assert_eq!(
        arena.snapshot_tree(h).unwrap(),
        add([
            pow(sym("a"), add([int(1), sym("y"), sym("z")])),
            int(7),
            mult([int(2), sym("x")]),
            sym("b"),
        ])
    );
}

#[test]
fn rollback_restores_bytes_and_handles() {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    for _ in 0..20 {
        let mut arena = Arena::new();
        let kept: Vec<(Handle, OwnedTree)> = (0..4)
            .map(|_| {
                let tree = random_tree(3, &mut rng);
                (arena.push_tree(&tree).unwrap(), tree)
            })
            .collect();
        let before = arena.bytes().to_vec();

        let checkpoint = arena.checkpoint();
        let mut created = Vec::new();
        for _ in 0..10 {
            let index = rng.random_range(0..kept.len());
            arena
                .replace_tree(kept[index].0, &random_tree(3, &mut rng))
                .unwrap();
            created.push(arena.push_tree(&random_tree(2, &mut rng)).unwrap());
        }
        arena.rollback(checkpoint);

        assert_eq!(arena.bytes(), before.as_slice());
        assert_all_intact(&arena, &kept);
        for handle in created {
            assert!(matches!(arena.resolve(handle), Err(CalcError::Uninitialized)));
        }
    }
}

#[test]
fn nested_checkpoints() {
    let mut arena = Arena::new();
    let h = arena.push_tree(&sym("x")).unwrap();

    let outer = arena.checkpoint();
    arena.replace_tree(h, &int(1)).unwrap();
    let inner = arena.checkpoint();
    arena.replace_tree(h, &int(2)).unwrap();
    arena.rollback(inner);
    assert_eq!(arena.snapshot_tree(h).unwrap(), int(1));
    arena.rollback(outer);
    assert_eq!(arena.snapshot_tree(h).unwrap(), sym("x"));

    let outer = arena.checkpoint();
    let inner = arena.checkpoint();
    arena.replace_tree(h, &int(3)).unwrap();
    arena.commit(inner);
    arena.rollback(outer);
    assert_eq!(arena.snapshot_tree(h).unwrap(), sym("x"));
}

#[test]
fn failed_edits_leave_the_arena_untouched() {
    let mut arena = Arena::with_capacity(24, 8);
    let h = arena.push_tree(&add([sym("a"), sym("b")])).unwrap();
    let before = arena.bytes().to_vec();

    let big = add((0..10).map(|i| sym(&format!("v{i}"))));
    let err = arena.replace_tree(h, &big).unwrap_err();
    assert!(matches!(err, CalcError::CapacityExceeded { .. }));
    assert!(err.is_recoverable());

    let err = arena
        .atomically(|arena| {
            arena.replace_tree(h, &int(0))?;
            arena.replace_tree(h, &big)
        })
        .unwrap_err();
    assert!(matches!(err, CalcError::CapacityExceeded { .. }));
    assert_eq!(arena.bytes(), before.as_slice());
    assert_eq!(arena.snapshot_tree(h).unwrap(), add([sym("a"), sym("b")]));
}

#[test]
fn handle_table_fills_up() {
    let mut arena = Arena::with_capacity(1024, 2);
    let a = arena.push_tree(&int(1)).unwrap();
    arena.push_tree(&int(2)).unwrap();
    let before = arena.bytes().to_vec();
    assert!(matches!(arena.push_tree(&int(3)), Err(CalcError::TableFull { .. })));
    assert_eq!(arena.bytes(), before.as_slice());

    arena.release(a);
    assert!(arena.push_tree(&int(3)).is_ok());
}

//! Iterative walkers over encoded trees.
//!
//! [`apply_bottom_up`] and [`apply_top_down`] are editing traversals over a tree in an
//! [`Arena`]. The callback may rewrite the subtree rooted at the node it receives (and push
//! scratch content at the end of the buffer), but must not touch anything else.
//!
//! Both use an explicit stack rather than recursion, relying on the fact that an edit confined
//! to a subtree never moves the subtree's ancestors or its earlier siblings.
use smallvec::SmallVec;

use crate::error::CalcResult;
use crate::tree::arena::Arena;
use crate::tree::node::{NodeOffset, TreeRef};

/// Whether any node of `tree` satisfies `predicate`.
pub fn any_node(tree: TreeRef<'_>, mut predicate: impl FnMut(TreeRef<'_>) -> bool) -> bool {
    tree.descendants().any(|node| predicate(node))
}

/// Apply `f` to every node of the tree at `at`, children before parents. Returns whether any
/// call reported a change.
pub fn apply_bottom_up<F>(arena: &mut Arena, at: NodeOffset, mut f: F) -> CalcResult<bool>
where
    F: FnMut(&mut Arena, NodeOffset) -> CalcResult<bool>,
{
    let mut changed = false;
    let mut stack: SmallVec<[(NodeOffset, usize); 16]> = SmallVec::new();
    stack.push((at, 0));
    while let Some((node, index)) = stack.last_mut() {
        let (node, index_value) = (*node, *index);
        let tree = arena.tree(node);
        if index_value < tree.number_of_children() {
            let child = tree.child(index_value).map(|c| c.offset());
            *index += 1;
            if let Some(child) = child {
                stack.push((child, 0));
            }
        } else {
            stack.pop();
            changed |= f(arena, node)?;
        }
    }
    Ok(changed)
}

/// Apply `f` to every node of the tree at `at`, parents before children. Children are those
/// present after `f` ran on their parent.
pub fn apply_top_down<F>(arena: &mut Arena, at: NodeOffset, mut f: F) -> CalcResult<bool>
where
    F: FnMut(&mut Arena, NodeOffset) -> CalcResult<bool>,
{
    let mut changed = f(arena, at)?;
    let mut stack: SmallVec<[(NodeOffset, usize); 16]> = SmallVec::new();
    stack.push((at, 0));
    while let Some((node, index)) = stack.last_mut() {
        let (node, index_value) = (*node, *index);
        let child = arena.tree(node).child(index_value).map(|c| c.offset());
        match child {
            Some(child) => {
                *index += 1;
                changed |= f(arena, child)?;
                stack.push((child, 0));
            }
            None => {
                stack.pop();
            }
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::edit::{Extent, RawSource};
    use crate::tree::node_type::NodeType;
    use crate::tree::owned::shapes::*;

    #[test]
    fn any_node_searches_the_whole_tree() {
        let tree = add([sym("a"), mult([int(2), ln(sym("b"))])]);
        assert!(any_node(tree.root(), |node| node.node_type() == NodeType::Ln));
        assert!(!any_node(tree.root(), |node| node.name() == Some("c")));
    }

    #[test]
    fn bottom_up_sees_rewritten_children() {
        let mut arena = Arena::new();
        let at = arena.push(&add([sym("x"), ln(sym("x")), sym("y")])).unwrap();
        let mut visited = Vec::new();
        apply_bottom_up(&mut arena, at, |arena, node| {
            visited.push(arena.tree(node).node_type());
            if arena.tree(node).name() == Some("x") {
                arena.replace_at(node, Extent::Tree, RawSource::Bytes(int(7).as_bytes()), Extent::Tree)?;
                return Ok(true);
            }
            Ok(false)
        })
        .unwrap();
        assert_eq!(arena.to_owned_tree(at), add([int(7), ln(int(7)), sym("y")]));
        assert_eq!(visited.last(), Some(&NodeType::Add));
        assert!(arena.is_well_formed());
    }

    #[test]
    fn top_down_visits_new_children() {
        let mut arena = Arena::new();
        let at = arena.push(&sub(sym("a"), sym("b"))).unwrap();
        let mut count = 0;
        apply_top_down(&mut arena, at, |arena, node| {
            count += 1;
            if arena.tree(node).node_type() == NodeType::Sub {
                let replacement = add([sym("a"), mult([int(-1), sym("b")])]);
                arena.replace_at(node, Extent::Tree, RawSource::Bytes(replacement.as_bytes()), Extent::Tree)?;
                return Ok(true);
            }
            Ok(false)
        })
        .unwrap();
        // add, a, mult, -1, b
        assert_eq!(count, 5);
    }
}

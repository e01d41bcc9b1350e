//! Building trees from a structure and placeholder bindings.
use crate::error::{CalcError, CalcResult};
use crate::pattern::matcher::Bindings;
use crate::pattern::placeholder::Placeholder;
use crate::tree::node::{MAX_NARY_CHILDREN, TreeRef};
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;

/// Instantiate `structure`, replacing each placeholder by a copy of the trees bound to it.
///
/// A placeholder used several times is copied each time. Variadic bindings splice their
/// trees into the enclosing n-ary node; an `Add` or `Mult` that received variadic content
/// and ended up with fewer than two children collapses to its neutral element or its only
/// child.
///
/// Fails with [`CalcError::Malformed`] when a placeholder is unbound, or when a binding
/// that does not hold exactly one tree is used where a single tree is required.
pub fn build(structure: TreeRef<'_>, bindings: &Bindings<'_>) -> CalcResult<OwnedTree> {
    let mut out = Vec::with_capacity(structure.tree_size());
    let count = emit(structure, bindings, &mut out)?;
    if count != 1 {
        return Err(CalcError::Malformed(format!(
            "structure root expands to {count} trees"
        )));
    }
    Ok(OwnedTree::from_raw(out))
}

/// Append the instantiation of `node` to `out`; returns the number of trees written.
fn emit(node: TreeRef<'_>, bindings: &Bindings<'_>, out: &mut Vec<u8>) -> CalcResult<usize> {
    if let Some(placeholder) = Placeholder::read(node) {
        let binding = bindings.get(placeholder.tag).ok_or_else(|| {
            CalcError::Malformed(format!("placeholder {:?} is not bound", placeholder.tag))
        })?;
        out.extend_from_slice(binding.bytes());
        return Ok(binding.len());
    }

    let start = out.len();
    out.extend_from_slice(node.node_bytes());
    if !node.node_type().is_nary() {
        for child in node.children() {
            let count = emit(child, bindings, out)?;
            if count != 1 {
                return Err(CalcError::Malformed(format!(
                    "{:?} needs one tree per child, a binding gave {count}",
                    node.node_type()
                )));
            }
        }
        return Ok(1);
    }

    let mut count = 0;
    let mut variadic = false;
    for child in node.children() {
        variadic |= Placeholder::read(child).is_some_and(|p| p.is_variadic());
        count += emit(child, bindings, out)?;
    }
    if count > MAX_NARY_CHILDREN {
        return Err(CalcError::Malformed(format!(
            "{:?} cannot hold {count} children",
            node.node_type()
        )));
    }
    out[start + 1] = count as u8;

    let neutral = match node.node_type() {
        NodeType::Add => NodeType::Zero,
        NodeType::Mult => NodeType::One,
        _ => return Ok(1),
    };
    if variadic && count == 0 {
        out.truncate(start);
        out.push(neutral.tag());
    } else if variadic && count == 1 {
        out.drain(start..start + 2);
    }
    Ok(1)
}

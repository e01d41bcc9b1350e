//! Boundary with the storage of user-defined symbols and functions.
use std::collections::HashMap;

use crate::error::{CalcError, CalcResult};
use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;

/// A stored function `name(parameter) = body`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub parameter: String,
    pub body: OwnedTree,
}

impl FunctionDefinition {
    pub fn new(parameter: impl Into<String>, body: OwnedTree) -> Self {
        Self {
            parameter: parameter.into(),
            body,
        }
    }

    /// The body with every occurrence of the parameter replaced by `argument`.
    pub fn apply(&self, argument: TreeRef<'_>) -> CalcResult<OwnedTree> {
        substitute(self.body.root(), &self.parameter, argument)
    }
}

/// Read access to stored definitions.
pub trait SymbolStore {
    fn symbol(&self, name: &str) -> Option<&OwnedTree>;
    fn function(&self, name: &str) -> Option<&FunctionDefinition>;
}

/// A store without any definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStore;

impl SymbolStore for EmptyStore {
    fn symbol(&self, _name: &str) -> Option<&OwnedTree> {
        None
    }

    fn function(&self, _name: &str) -> Option<&FunctionDefinition> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapStore {
    symbols: HashMap<String, OwnedTree>,
    functions: HashMap<String, FunctionDefinition>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_symbol(&mut self, name: impl Into<String>, value: OwnedTree) {
        self.symbols.insert(name.into(), value);
    }

    pub fn define_function(&mut self, name: impl Into<String>, definition: FunctionDefinition) {
        self.functions.insert(name.into(), definition);
    }

    pub fn forget(&mut self, name: &str) {
        self.symbols.remove(name);
        self.functions.remove(name);
    }
}

impl SymbolStore for MapStore {
    fn symbol(&self, name: &str) -> Option<&OwnedTree> {
        self.symbols.get(name)
    }

    fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }
}

/// Copy `tree`, replacing every user symbol called `name` by `value`.
///
/// Symbols are leaves, so copying node headers in preorder and splicing `value` in place of
/// the matching leaves yields a well-formed tree.
pub fn substitute(tree: TreeRef<'_>, name: &str, value: TreeRef<'_>) -> CalcResult<OwnedTree> {
    let mut out = Vec::with_capacity(tree.tree_size());
    for node in tree.descendants() {
        if node.is(NodeType::UserSymbol) && node.name() == Some(name) {
            out.extend_from_slice(value.tree_bytes());
        } else {
            out.extend_from_slice(node.node_bytes());
        }
    }
    OwnedTree::from_encoded(out).map_err(|e| CalcError::Malformed(format!("substitution: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::owned::shapes::*;

    #[test]
    fn function_application() {
        let square_plus_x = FunctionDefinition::new("x", add([pow(sym("x"), int(2)), sym("x")]));
        let applied = square_plus_x.apply(add([sym("y"), int(1)]).root()).unwrap();
        assert_eq!(
            applied,
            add([pow(add([sym("y"), int(1)]), int(2)), add([sym("y"), int(1)])])
        );
    }

    #[test]
    fn map_store_lookups() {
        let mut store = MapStore::new();
        store.define_symbol("a", int(3));
        assert_eq!(store.symbol("a"), Some(&int(3)));
        assert!(store.function("a").is_none());
        store.forget("a");
        assert!(store.symbol("a").is_none());
        assert!(EmptyStore.symbol("a").is_none());
    }
}

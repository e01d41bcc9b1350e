//! Hycas: the symbolic core of a calculator engine.
//!
//! Expressions live as variable-length nodes in depth-first preorder inside one flat,
//! capacity-bounded buffer (the [`Arena`](tree::arena::Arena)). External code holds
//! generational [`Handle`](tree::handle::Handle)s that keep pointing at the same logical tree
//! while content shifts around it.
//!
//! Layers
//!  - [`tree`]: encoding, arena, handles, edit primitives and checkpoints.
//!  - [`pattern`]: placeholder patterns matched against trees, and construction from bindings.
//!  - [`reduction`]: projection, systematic reduction, bounded advanced search and
//!    beautification, with rollback and strategy fallback on overflow or interruption.
//!
//! Example
//! ```
//! use hycas::prelude::*;
//! use hycas::tree::owned::shapes::*;
//!
//! let mut arena = Arena::new();
//! let h = arena.push_tree(&add([sym("b"), int(2), sym("a"), int(3)])).unwrap();
//! let mut simplifier = Simplifier::new(EngineConfig::default());
//! simplifier.simplify(&mut arena, h, &ProjectionContext::default()).unwrap();
//! assert_eq!(arena.snapshot_tree(h).unwrap(), add([int(5), sym("a"), sym("b")]));
//! ```

/// Engine resource bounds and fallback policy.
pub mod config;
/// Crate error type.
pub mod error;
/// Exact rationals and floats stored in number nodes.
pub mod number;
/// Pattern matching and construction.
pub mod pattern;
/// The reduction pipeline.
pub mod reduction;
/// Encoding, arena, handles and edit primitives.
pub mod tree;

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::config::EngineConfig;
    pub use crate::error::{CalcError, CalcResult};
    pub use crate::pattern::placeholder::{Filter, Placeholder, Tag};
    pub use crate::pattern::{Bindings, build, match_and_replace, match_tree};
    pub use crate::reduction::context::{
        AngleUnit, ComplexFormat, ProjectionContext, Strategy, SymbolicComputation, UnitFormat,
    };
    pub use crate::reduction::interrupt::{Interrupt, NeverInterrupt};
    pub use crate::reduction::Simplifier;
    pub use crate::tree::arena::Arena;
    pub use crate::tree::checkpoint::Checkpoint;
    pub use crate::tree::edit::{Extent, Position, Source};
    pub use crate::tree::handle::Handle;
    pub use crate::tree::node::TreeRef;
    pub use crate::tree::node_type::NodeType;
    pub use crate::tree::owned::OwnedTree;
    pub use crate::tree::pretty::PrettyTree;
}

//! Trees: encoding, the arena that stores them, and the primitives that edit them.
//!
//! Role
//! - [`node_type`] and [`node`] define the byte encoding and zero-copy navigation.
//! - [`arena::Arena`] owns the single buffer; [`handle::Handle`]s keep durable references
//!   into it as content shifts.
//! - [`edit`] and [`checkpoint`] are the only ways to mutate the buffer.
//!
//! Example
//! ```
//! use hycas::tree::arena::Arena;
//! use hycas::tree::owned::shapes::*;
//!
//! let mut arena = Arena::new();
//! let h = arena.push_tree(&add([sym("x"), int(1)])).unwrap();
//! let _ = arena.push_tree(&sym("y")).unwrap();
//! arena.replace_tree(h, &mult([int(2), sym("x")])).unwrap();
//! assert_eq!(arena.snapshot_tree(h).unwrap(), mult([int(2), sym("x")]));
//! ```
pub mod arena;
pub mod checkpoint;
pub mod comparison;
pub mod edit;
pub mod handle;
pub mod node;
pub mod node_type;
pub mod owned;
pub mod pretty;
pub mod walker;

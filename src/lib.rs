//! Reactive cells that discover their own dependencies.
//!
//! A [`Cell`] holds either a constant or a derivation. Every cell read while a
//! derivation runs becomes an upstream edge; the edges are dropped and
//! rediscovered on each evaluation. Writing a cell re-evaluates everything
//! downstream of it, depth-first and synchronously.
//!
//! Propagation is not glitch-free: in a diamond (`a -> b`, `a -> c`,
//! `b, c -> d`) a write to `a` evaluates `d` twice, the first time with `c`
//! still holding its previous value.

pub mod macros;
pub mod tracker;

mod addr;
mod cell;
mod dependencies;
mod error;
mod rule;

pub use addr::CellId;
pub use cell::Cell;
pub use error::{BoxError, Error, Result};
pub use rule::Rule;

use addr::WeakNodeAddr;

/// Type-erased view of a cell, used by the adjacency lists.
pub(crate) trait Node: 'static {
	fn id(&self) -> CellId;

	/// Re-runs the rule and propagates to everything downstream.
	fn evaluate(&self) -> Result<()>;

	/// Notify this node that `derived` read it during its
	/// latest evaluation.
	fn used_by(&self, derived: WeakNodeAddr);

	/// Notify this node that `derived` stopped reading it.
	fn not_used_by(&self, derived: CellId);
}

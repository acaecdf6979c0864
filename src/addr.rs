use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Node;

/// Stable identity of a cell.
///
/// Ids are unique for the lifetime of the process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

impl CellId {
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		CellId(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for CellId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Owning handle to a node, compared by identity.
#[derive(Clone)]
pub(crate) struct NodeAddr {
	id: CellId,
	ptr: Rc<dyn Node>,
}

impl NodeAddr {
	pub fn new(ptr: Rc<dyn Node>) -> Self {
		NodeAddr { id: ptr.id(), ptr }
	}

	pub fn id(&self) -> CellId {
		self.id
	}
}

impl Deref for NodeAddr {
	type Target = Rc<dyn Node>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl PartialEq for NodeAddr {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for NodeAddr {}

/// Non-owning handle to a node, compared by identity.
#[derive(Clone)]
pub(crate) struct WeakNodeAddr {
	id: CellId,
	ptr: Weak<dyn Node>,
}

impl WeakNodeAddr {
	pub fn new(id: CellId, ptr: Weak<dyn Node>) -> Self {
		WeakNodeAddr { id, ptr }
	}

	pub fn id(&self) -> CellId {
		self.id
	}

	pub fn is_alive(&self) -> bool {
		self.ptr.strong_count() > 0
	}
}

impl Deref for WeakNodeAddr {
	type Target = Weak<dyn Node>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl PartialEq for WeakNodeAddr {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for WeakNodeAddr {}

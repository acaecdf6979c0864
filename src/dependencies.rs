use std::rc::Weak;

use fxhash::FxHashSet;
use smallvec::SmallVec;

use crate::addr::{NodeAddr, WeakNodeAddr};
use crate::{CellId, Node};

/// Cells read during the latest evaluation, in first-read order.
#[derive(Default)]
pub(crate) struct Upstream {
	nodes: SmallVec<[NodeAddr; 4]>,
}

impl Upstream {
	pub fn new() -> Self {
		Self {
			nodes: SmallVec::new(),
		}
	}

	/// Builds the list from raw tracker reads, keeping the first
	/// occurrence of every cell.
	pub fn from_reads(reads: impl IntoIterator<Item = NodeAddr>) -> Self {
		let mut seen = FxHashSet::default();
		let nodes = reads
			.into_iter()
			.filter(|node| seen.insert(node.id()))
			.collect();

		Self { nodes }
	}

	/// Removes `parent` from the downstream list of every cell in here.
	pub fn detach(&self, parent: CellId) {
		for node in &self.nodes {
			node.not_used_by(parent)
		}
	}

	/// Adds `parent` to the downstream list of every cell in here.
	pub fn attach(&self, parent: CellId, this: &Weak<dyn Node>) {
		for node in &self.nodes {
			node.used_by(WeakNodeAddr::new(parent, this.clone()))
		}
	}

	pub fn ids(&self) -> Vec<CellId> {
		self.nodes.iter().map(NodeAddr::id).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// Cells that read this one during their latest evaluation.
#[derive(Default)]
pub(crate) struct Downstream {
	nodes: SmallVec<[WeakNodeAddr; 4]>,
}

impl Downstream {
	pub fn new() -> Self {
		Self {
			nodes: SmallVec::new(),
		}
	}

	pub fn insert(&mut self, node: WeakNodeAddr) {
		if !self.nodes.contains(&node) {
			self.nodes.push(node);
		}
	}

	pub fn remove(&mut self, id: CellId) {
		self.nodes.retain(|node| node.id() != id);
	}

	/// Drops entries whose cell is gone and returns a copy of the rest,
	/// so the caller can propagate while peers edit the live list.
	pub fn snapshot(&mut self) -> SmallVec<[WeakNodeAddr; 4]> {
		self.nodes.retain(|node| node.is_alive());
		self.nodes.clone()
	}

	pub fn ids(&self) -> Vec<CellId> {
		self.nodes
			.iter()
			.filter(|node| node.is_alive())
			.map(WeakNodeAddr::id)
			.collect()
	}
}

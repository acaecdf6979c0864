//! Evaluation tracker.
//!
//! While a cell runs its rule, every cell read on the same thread records
//! itself into the innermost open frame. When the rule returns, the frame is
//! harvested into the new upstream list of the evaluating cell.
//!
//! Frames form a stack, so a cell built or written from inside another
//! cell's rule captures its own reads without disturbing the outer capture.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::addr::NodeAddr;
use crate::dependencies::Upstream;
use crate::{CellId, Node};

thread_local! {
	static FRAMES: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

struct Frame {
	/// `None` for frames opened by [`untracked`].
	cell: Option<CellId>,
	reads: SmallVec<[NodeAddr; 8]>,
}

/// Guard for one open frame. Dropping it closes the frame, which also
/// happens when the rule fails or unwinds.
pub(crate) struct Evaluation {
	depth: usize,
}

impl Evaluation {
	pub(crate) fn start(cell: CellId) -> Self {
		Self::open(Some(cell))
	}

	fn open(cell: Option<CellId>) -> Self {
		let depth = FRAMES.with(|frames| {
			let mut frames = frames.borrow_mut();
			frames.push(Frame {
				cell,
				reads: SmallVec::new(),
			});
			frames.len()
		});

		Evaluation { depth }
	}

	/// Closes the frame and turns its reads into an upstream list.
	pub(crate) fn finish(self) -> Upstream {
		let reads = FRAMES.with(|frames| {
			frames
				.borrow_mut()
				.get_mut(self.depth - 1)
				.map(|frame| std::mem::take(&mut frame.reads))
				.unwrap_or_default()
		});

		Upstream::from_reads(reads)
	}
}

impl Drop for Evaluation {
	fn drop(&mut self) {
		let closed = FRAMES.with(|frames| {
			let mut frames = frames.borrow_mut();
			let at = (self.depth - 1).min(frames.len());
			frames.split_off(at)
		});

		// Released outside the borrow: dropping a read may drop a cell.
		drop(closed);
	}
}

pub(crate) fn record(node: Rc<dyn Node>) {
	FRAMES.with(|frames| {
		if let Some(frame) = frames.borrow_mut().last_mut() {
			if frame.cell.is_some() {
				frame.reads.push(NodeAddr::new(node));
			}
		}
	});
}

/// Whether a cell is currently evaluating on this thread.
pub fn is_tracking() -> bool {
	FRAMES.with(|frames| matches!(frames.borrow().last(), Some(frame) if frame.cell.is_some()))
}

/// Number of open frames, including [`untracked`] ones.
pub fn depth() -> usize {
	FRAMES.with(|frames| frames.borrow().len())
}

/// The cell whose rule is running in the innermost frame.
pub fn current() -> Option<CellId> {
	FRAMES.with(|frames| frames.borrow().last().and_then(|frame| frame.cell))
}

/// Reads recorded so far by the innermost frame, duplicates included.
pub fn tracked() -> Vec<CellId> {
	FRAMES.with(|frames| {
		frames
			.borrow()
			.last()
			.map(|frame| frame.reads.iter().map(NodeAddr::id).collect())
			.unwrap_or_default()
	})
}

/// Returns and clears the reads recorded so far by the innermost frame.
///
/// Meant for debugging: cleared reads do not become upstream edges of the
/// evaluating cell. Returns `None` when nothing is evaluating.
pub fn take() -> Option<Vec<CellId>> {
	let reads = FRAMES.with(|frames| {
		frames
			.borrow_mut()
			.last_mut()
			.filter(|frame| frame.cell.is_some())
			.map(|frame| std::mem::take(&mut frame.reads))
	})?;

	Some(reads.iter().map(NodeAddr::id).collect())
}

/// Runs `func` with dependency recording switched off.
pub fn untracked<R>(func: impl FnOnce() -> R) -> R {
	let _frame = Evaluation::open(None);
	func()
}

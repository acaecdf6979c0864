use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::addr::WeakNodeAddr;
use crate::dependencies::{Downstream, Upstream};
use crate::tracker::{self, Evaluation};
use crate::{BoxError, CellId, Error, Node, Result, Rule};

const UNNAMED: &str = "<unnamed>";

/// A reactive cell.
///
/// A cell holds the value produced by its [`Rule`]. Cells read while the rule
/// runs become its upstream; writing any of them re-evaluates this cell, and
/// everything downstream of it, before the write returns.
///
/// ```
/// use reactor::Cell;
///
/// let a = Cell::new(1);
/// let b = Cell::derived({
/// 	let a = a.clone();
/// 	move || a.read() * 2
/// });
///
/// a.set(5).unwrap();
/// assert_eq!(b.read(), 10);
/// ```
pub struct Cell<T> {
	body: Rc<CellBody<T>>,
}

struct CellBody<T> {
	id: CellId,
	name: &'static str,
	value: RefCell<T>,
	inner: RefCell<CellInner<T>>,
	this: Weak<CellBody<T>>,
}

struct CellInner<T> {
	rule: Rc<Rule<T>>,
	upstream: Upstream,
	downstream: Downstream,
}

impl<T> Drop for CellBody<T> {
	fn drop(&mut self) {
		let upstream = std::mem::take(&mut self.inner.get_mut().upstream);
		if !upstream.is_empty() {
			upstream.detach(self.id);
			tracing::trace!(cell = %self.id, name = self.name, "unlinked");
		}
	}
}

impl<T> Clone for Cell<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Cell<T>
where
	T: Default + Clone + 'static,
{
	fn default() -> Self {
		Cell::new(Default::default())
	}
}

impl<T> Cell<T>
where
	T: Clone + 'static,
{
	pub fn new(value: T) -> Self {
		let id = CellId::next();
		Self::assemble(id, UNNAMED, value.clone(), Upstream::new(), Rule::Constant(value))
	}

	pub fn derived(func: impl Fn() -> T + 'static) -> Self {
		let id = CellId::next();
		let evaluation = Evaluation::start(id);
		let value = func();
		let upstream = evaluation.finish();
		Self::assemble(id, UNNAMED, value, upstream, Rule::derive(func))
	}

	pub fn try_derived(func: impl Fn() -> Result<T, BoxError> + 'static) -> Result<Self> {
		Self::with_rule(Rule::try_derive(func))
	}

	pub fn with_rule(rule: Rule<T>) -> Result<Self> {
		Self::new_with_name(UNNAMED, rule)
	}

	/// Builds a cell whose `name` shows up in logs and `Debug` output.
	pub fn new_with_name(name: &'static str, rule: Rule<T>) -> Result<Self> {
		let id = CellId::next();
		let (value, upstream) = run(id, name, &rule)?;
		Ok(Self::assemble(id, name, value, upstream, rule))
	}

	fn assemble(id: CellId, name: &'static str, value: T, upstream: Upstream, rule: Rule<T>) -> Self {
		let body = Rc::new_cyclic(|this| CellBody {
			id,
			name,
			value: RefCell::new(value),
			inner: RefCell::new(CellInner {
				rule: Rc::new(rule),
				upstream: Upstream::new(),
				downstream: Downstream::new(),
			}),
			this: this.clone(),
		});

		body.attach(upstream);
		tracing::trace!(cell = %id, name, "created");

		Cell { body }
	}

	/// Returns the current value and, when called from a rule, makes this
	/// cell an upstream of the evaluating cell.
	#[inline]
	pub fn read(&self) -> T {
		self.track();
		self.body.value.borrow().clone()
	}

	/// Like [`Cell::read`], without cloning the value.
	///
	/// Writing this cell from inside `func` fails with [`Error::Busy`].
	#[inline]
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.track();
		func(&self.body.value.borrow())
	}

	/// Returns the current value without recording a dependency.
	#[inline]
	pub fn peek(&self) -> T {
		self.body.value.borrow().clone()
	}

	/// Replaces the rule and propagates the new value downstream.
	pub fn write(&self, rule: impl Into<Rule<T>>) -> Result<()> {
		self.body.write(rule.into())
	}

	#[inline]
	pub fn set(&self, value: T) -> Result<()> {
		self.write(Rule::Constant(value))
	}

	#[inline]
	pub fn derive(&self, func: impl Fn() -> T + 'static) -> Result<()> {
		self.write(Rule::derive(func))
	}

	#[inline]
	pub fn try_derive(&self, func: impl Fn() -> Result<T, BoxError> + 'static) -> Result<()> {
		self.write(Rule::try_derive(func))
	}

	/// Sets a constant computed from the current value.
	pub fn update(&self, func: impl FnOnce(&T) -> T) -> Result<()> {
		let next = func(&self.body.value.borrow());
		self.set(next)
	}

	pub fn id(&self) -> CellId {
		self.body.id
	}

	pub fn name(&self) -> &'static str {
		self.body.name
	}

	pub fn is_constant(&self) -> bool {
		self.body.inner.borrow().rule.is_constant()
	}

	/// Cells read during the latest evaluation, in first-read order.
	pub fn upstream(&self) -> Vec<CellId> {
		self.body.inner.borrow().upstream.ids()
	}

	/// Live cells that read this one during their latest evaluation.
	pub fn downstream(&self) -> Vec<CellId> {
		self.body.inner.borrow().downstream.ids()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	pub(crate) fn node(&self) -> Rc<dyn Node> {
		self.body.clone()
	}

	fn track(&self) {
		tracker::record(self.node());
	}
}

/// Runs `rule` inside its own tracker frame.
fn run<T: Clone>(id: CellId, name: &'static str, rule: &Rule<T>) -> Result<(T, Upstream)> {
	let evaluation = Evaluation::start(id);
	match rule.run() {
		Ok(value) => Ok((value, evaluation.finish())),
		Err(source) => {
			tracing::debug!(cell = %id, name, error = %source, "rule failed");
			Err(Error::Evaluation { cell: id, source })
		}
	}
}

impl<T> CellBody<T>
where
	T: Clone + 'static,
{
	fn write(&self, rule: Rule<T>) -> Result<()> {
		let previous = std::mem::replace(&mut self.inner.borrow_mut().rule, Rc::new(rule));
		drop(previous);
		self.evaluate()
	}

	fn assign(&self, value: T) -> Result<()> {
		let mut slot = self
			.value
			.try_borrow_mut()
			.map_err(|_| Error::Busy { cell: self.id })?;
		let previous = std::mem::replace(&mut *slot, value);
		drop(slot);
		drop(previous);
		Ok(())
	}

	fn attach(&self, upstream: Upstream) {
		let previous = std::mem::take(&mut self.inner.borrow_mut().upstream);
		previous.detach(self.id);
		drop(previous);

		let this = self.this.clone() as Weak<dyn Node>;
		upstream.attach(self.id, &this);
		self.inner.borrow_mut().upstream = upstream;
	}
}

impl<T> Node for CellBody<T>
where
	T: Clone + 'static,
{
	fn id(&self) -> CellId {
		self.id
	}

	fn evaluate(&self) -> Result<()> {
		let (previous, rule) = {
			let mut inner = self.inner.borrow_mut();
			(std::mem::take(&mut inner.upstream), inner.rule.clone())
		};
		previous.detach(self.id);
		drop(previous);

		let (value, upstream) = run(self.id, self.name, &rule)?;
		self.assign(value)?;

		let downstream = self.inner.borrow_mut().downstream.snapshot();
		tracing::trace!(
			cell = %self.id,
			name = self.name,
			downstream = downstream.len(),
			"propagating"
		);

		let propagated = downstream
			.iter()
			.filter_map(|node| node.upgrade())
			.try_for_each(|node| node.evaluate());

		// Attach even after a failed pass, so the adjacency stays mutual.
		self.attach(upstream);

		if let Err(err) = &propagated {
			let failed = err.cell();
			tracing::debug!(cell = %self.id, name = self.name, %failed, "propagation aborted");
		}

		propagated
	}

	fn used_by(&self, derived: WeakNodeAddr) {
		self.inner.borrow_mut().downstream.insert(derived);
	}

	fn not_used_by(&self, derived: CellId) {
		self.inner.borrow_mut().downstream.remove(derived);
	}
}

impl<T> Debug for Cell<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut out = f.debug_struct("Cell");
		out.field("id", &self.body.id).field("name", &self.body.name);
		match self.body.value.try_borrow() {
			Ok(value) => out.field("value", &*value),
			Err(_) => out.field("value", &"<busy>"),
		};
		out.finish()
	}
}

use std::cell::RefCell;
use std::error::Error as _;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use mockall::predicate::eq;
use reactor::{cell, define, tracker, Cell, Error, Rule};


use mock::Spy;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::TRACE)
		.with_test_writer()
		.try_init();
}

fn non_negative(a: &Cell<i64>) -> Cell<i64> {
	Cell::try_derived({
		let a = a.clone();
		move || {
			let value = a.read();
			if value < 0 {
				Err("negative".into())
			} else {
				Ok(value * 2)
			}
		}
	})
	.unwrap()
}

#[test]
fn derived() {
	init_tracing();

	let a = Cell::new(1);
	let b = cell!((a) => a.read() * 2);
	assert_eq!(b.read(), 2);

	a.set(5).unwrap();
	assert_eq!(b.read(), 10);
}

#[test]
fn rule_becomes_derivation() {
	let a = Cell::new(1);
	let b = cell!((a) => a.read() + 1);

	a.derive(|| 100).unwrap();
	assert_eq!(a.read(), 100);
	assert_eq!(b.read(), 101);
	assert!(!a.is_constant());

	a.write(7).unwrap();
	assert_eq!(b.read(), 8);
	assert!(a.is_constant());

	a.write(Rule::derive(|| 3)).unwrap();
	assert_eq!(b.read(), 4);
}

#[test]
fn chains_propagate() {
	let a = Cell::new(1);
	let b = cell!((a) => a.read() + 1);
	let c = cell!((b) => b.read() * 10);

	a.update(|value| value + 1).unwrap();
	assert_eq!(a.read(), 2);
	assert_eq!(c.read(), 30);
}

#[test]
fn constant_has_no_upstream() {
	let a = Cell::new(1);
	let readers: Vec<_> = (0..3).map(|_| cell!((a) => a.read() + a.read())).collect();

	assert!(a.upstream().is_empty());
	a.set(2).unwrap();
	assert!(a.upstream().is_empty());

	assert_eq!(a.downstream().len(), 3);
	assert!(readers.iter().all(|reader| reader.read() == 4));
}

#[test]
fn reading_twice_adds_one_edge() {
	let a = Cell::new(1);
	let b = Cell::new(2);
	let seen = cell!((a, b) => {
		a.read();
		a.read();
		b.read();
		tracker::tracked()
	});

	assert_eq!(seen.read(), vec![a.id(), a.id(), b.id()]);
	assert_eq!(seen.upstream(), vec![a.id(), b.id()]);
	assert_eq!(a.downstream(), vec![seen.id()]);
	assert_eq!(b.downstream(), vec![seen.id()]);
}

#[test]
fn dependencies_are_rediscovered() {
	init_tracing();

	let flag = Cell::new(true);
	let a = Cell::new(1);
	let b = Cell::new(2);

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(eq(1)).times(1).return_const(());

	let c = cell!((flag, a, b, mock) => {
		let value = if flag.read() { a.read() } else { b.read() };
		mock.get().trigger(value);
		value
	});

	mock.get().checkpoint();
	assert_eq!(c.upstream(), vec![flag.id(), a.id()]);
	assert_eq!(a.downstream(), vec![c.id()]);
	assert!(b.downstream().is_empty());

	mock.get().expect_trigger().with(eq(2)).times(1).return_const(());
	flag.set(false).unwrap();
	mock.get().checkpoint();

	assert_eq!(c.upstream(), vec![flag.id(), b.id()]);
	assert!(a.downstream().is_empty());
	assert_eq!(b.downstream(), vec![c.id()]);

	mock.get().expect_trigger().times(0).return_const(());
	a.set(10).unwrap();
	mock.get().checkpoint();
	assert_eq!(c.read(), 2);
}

#[test]
fn diamond_evaluates_join_twice() {
	init_tracing();

	let a = Cell::new(1);
	let b = cell!((a) => a.read() * 10);
	let c = cell!((a) => a.read() * 100);

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(eq(110)).times(1).return_const(());

	let d = cell!((b, c, mock) => {
		let sum = b.read() + c.read();
		mock.get().trigger(sum);
		sum
	});

	mock.get().checkpoint();

	// The first pass reaches `d` through `b` while `c` is still stale.
	mock.get().expect_trigger().with(eq(120)).times(1).return_const(());
	mock.get().expect_trigger().with(eq(220)).times(1).return_const(());
	a.set(2).unwrap();
	mock.get().checkpoint();

	assert_eq!(d.read(), 220);
}

#[test]
fn propagation_is_depth_first_in_downstream_order() {
	let log = Rc::new(RefCell::new(Vec::new()));

	let a = Cell::new(1);
	let b = cell!((a, log) => {
		log.borrow_mut().push("b");
		a.read()
	});
	let c = cell!((a, log) => {
		log.borrow_mut().push("c");
		a.read()
	});
	let d = cell!((b, log) => {
		log.borrow_mut().push("d");
		b.read()
	});

	log.borrow_mut().clear();
	a.set(2).unwrap();

	assert_eq!(*log.borrow(), vec!["b", "d", "c"]);
	assert_eq!((c.read(), d.read()), (2, 2));
}

#[test]
fn nested_cell_keeps_outer_capture() {
	let x = Cell::new(1);
	let y = Cell::new(10);

	let outer = cell!((x, y) => {
		let before = y.read();
		let inner = cell!((x) => x.read() * 2);
		before + inner.peek()
	});

	assert_eq!(outer.read(), 12);
	assert_eq!(outer.upstream(), vec![y.id()]);
	// `inner` is dropped with the rule's scope and unlinks itself.
	assert!(x.downstream().is_empty());

	y.set(20).unwrap();
	assert_eq!(outer.read(), 22);

	x.set(5).unwrap();
	assert_eq!(outer.read(), 22);
}

#[test]
fn nested_write_keeps_outer_capture() {
	let a = Cell::new(1);
	let b = Cell::new(2);
	let last = Cell::new(0);

	let sum = cell!((a, b, last) => {
		let first = a.read();
		last.set(first).unwrap();
		first + b.read()
	});

	assert_eq!(sum.upstream(), vec![a.id(), b.id()]);
	assert_eq!(last.peek(), 1);

	a.set(5).unwrap();
	assert_eq!(sum.read(), 7);
	assert_eq!(last.peek(), 5);
}

#[test]
fn take_discards_recorded_reads() {
	let a = Cell::new(1);
	let b = Cell::new(2);

	let c = cell!((a, b) => {
		a.read();
		let wiped = tracker::take().unwrap_or_default();
		b.read();
		wiped.len()
	});

	assert_eq!(c.read(), 1);
	assert_eq!(c.upstream(), vec![b.id()]);
	assert!(a.downstream().is_empty());
	assert_eq!(tracker::take(), None);
}

#[test]
fn failing_rule_keeps_value_and_drops_edges() {
	init_tracing();

	let a = Cell::new(1);
	let b = non_negative(&a);
	assert_eq!(b.read(), 2);

	let err = a.set(-1).unwrap_err();
	assert!(matches!(err, Error::Evaluation { cell, .. } if cell == b.id()));
	assert_eq!(err.to_string(), format!("rule of cell {} failed", b.id()));
	assert_eq!(err.source().map(ToString::to_string), Some("negative".to_string()));

	assert_eq!(b.peek(), 2);
	assert!(b.upstream().is_empty());
	assert!(a.downstream().is_empty());
	assert!(!tracker::is_tracking());
	assert_eq!(tracker::depth(), 0);

	a.set(3).unwrap();
	assert_eq!(b.peek(), 2);

	let a2 = a.clone();
	b.try_derive(move || Ok(a2.read() * 2)).unwrap();
	assert_eq!(b.read(), 6);
	assert_eq!(a.downstream(), vec![b.id()]);
}

#[test]
fn failing_downstream_stops_the_pass() {
	let a = Cell::new(1);
	let b = non_negative(&a);
	let c = cell!((a) => a.read() + 1);

	let err = a.set(-1).unwrap_err();
	assert_eq!(err.cell(), b.id());

	assert_eq!(a.peek(), -1);
	assert_eq!(b.peek(), 2);
	assert_eq!(c.peek(), 2);
	assert_eq!(a.downstream(), vec![c.id()]);
}

#[test]
fn failing_construction() {
	let result = Cell::<i64>::try_derived(|| Err("nope".into()));
	assert!(matches!(result, Err(Error::Evaluation { .. })));
	assert_eq!(tracker::depth(), 0);
}

#[test]
fn panicking_rule_closes_its_frame() {
	let a = Cell::new(1);
	let b = cell!((a) => {
		let value = a.read();
		if value == 0 {
			panic!("division by zero");
		}
		10 / value
	});

	let result = std::panic::catch_unwind(AssertUnwindSafe(|| a.set(0)));
	assert!(result.is_err());
	assert_eq!(tracker::depth(), 0);
	assert_eq!(b.peek(), 10);
}

#[test]
fn write_while_borrowed_is_busy() {
	let a = Cell::new(1);

	let result = a.with(|_| a.set(2));
	assert!(matches!(result, Err(Error::Busy { cell }) if cell == a.id()));
	assert_eq!(a.peek(), 1);
}

#[test]
fn dropped_dependents_unlink() {
	let a = Cell::new(1);
	{
		let b = cell!((a) => a.read());
		assert_eq!(a.downstream(), vec![b.id()]);
	}
	assert!(a.downstream().is_empty());
	a.set(2).unwrap();

	let doubled = {
		let hidden = Cell::new(5);
		cell!((hidden) => hidden.read() * 2)
	};
	assert_eq!(doubled.read(), 10);
	assert_eq!(doubled.upstream().len(), 1);
}

#[test]
fn named_cells_and_macros() {
	let a = Cell::new(2);
	let total = Cell::new_with_name("total", Rule::derive({
		let a = a.clone();
		move || a.read() * 3
	}))
	.unwrap();

	assert_eq!(total.name(), "total");
	assert!(format!("{:?}", total).contains("\"total\""));

	define!(total, (a) => a.read() + 100).unwrap();
	assert_eq!(total.read(), 102);
	a.set(3).unwrap();
	assert_eq!(total.read(), 103);

	let plain = cell!(=> 42);
	assert!(plain.upstream().is_empty());
	assert!(!plain.ptr_eq(&total));
	assert!(plain.ptr_eq(&plain.clone()));
}

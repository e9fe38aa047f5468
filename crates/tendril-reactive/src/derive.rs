//! Derivation
//!
//! Derived cells are ordinary [`Cell`]s whose value is recomputed whenever a
//! parent changes. Recomputation happens inside the parent's `set`, so after
//! any write returns every derived cell downstream of it is consistent.
//!
//! The link between a parent and a derived cell is one shared
//! [`Subscription`] recorded on both ends: destroying either the parent or
//! the derived cell releases it.
//!
//! Diamond-shaped graphs are not deduplicated. A cell computed from two cells
//! that both depend on the same root recomputes once per path when that root
//! changes.

extern crate alloc;
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::cell::{Cell, Registration};
use crate::node::{CellId, NodeKind};
use crate::same_value::SameValue;
use crate::subscription::Subscription;

/// A cell that other cells can be computed from, regardless of value type
///
/// Used to pass heterogeneous dependencies to [`Cell::computed`].
pub trait Source {
	/// Identifier of the underlying cell
	fn source_id(&self) -> CellId;

	/// Call `on_change` after every change of the underlying cell
	///
	/// The returned link is also recorded on the source, so destroying the
	/// source releases it.
	fn link_change(&self, on_change: Rc<dyn Fn()>) -> Subscription;
}

impl<T: 'static> Source for Cell<T> {
	fn source_id(&self) -> CellId {
		self.id()
	}

	fn link_change(&self, on_change: Rc<dyn Fn()>) -> Subscription {
		self.link_downstream(Rc::new(move |_: &T| on_change()))
	}
}

impl<T: 'static> Cell<T> {
	/// Create a cell whose value is `transform` applied to this cell's value
	///
	/// The derived cell starts with `transform(current)` and is rewritten on
	/// every change of this cell. Its only parent is this cell.
	///
	/// # Example
	///
	/// ```
	/// use tendril_reactive::Cell;
	///
	/// let celsius = Cell::new(20.0);
	/// let fahrenheit = celsius.derive(|c| c * 9.0 / 5.0 + 32.0);
	///
	/// celsius.set(100.0);
	/// assert_eq!(fahrenheit.get(), 212.0);
	/// ```
	pub fn derive<U, F>(&self, transform: F) -> Cell<U>
	where
		U: SameValue + Clone + 'static,
		F: Fn(&T) -> U + 'static,
	{
		let initial = self.with(&transform);
		let derived = Cell::create(
			initial,
			NodeKind::DerivedCell,
			vec![self.id()],
			Registration::plain(),
		);

		let target = derived.clone();
		let link = self.link_downstream(Rc::new(move |value: &T| target.set(transform(value))));
		derived.inner.upstream.borrow_mut().push(link);

		derived
	}
}

impl<T: SameValue + Clone + 'static> Cell<T> {
	/// Create a cell recomputed from scratch when any dependency changes
	///
	/// `compute` reads whatever it needs; `dependencies` lists the cells whose
	/// changes trigger a recomputation, in the order they become the new
	/// cell's parents. An empty dependency list yields a cell that never
	/// changes and logs a warning.
	///
	/// # Example
	///
	/// ```
	/// use tendril_reactive::Cell;
	///
	/// let a = Cell::new(1);
	/// let b = Cell::new(2);
	/// let (a2, b2) = (a.clone(), b.clone());
	/// let sum = Cell::computed(move || a2.get() + b2.get(), &[&a, &b]);
	///
	/// b.set(5);
	/// assert_eq!(sum.get(), 6);
	/// ```
	pub fn computed<F>(compute: F, dependencies: &[&dyn Source]) -> Cell<T>
	where
		F: Fn() -> T + 'static,
	{
		if dependencies.is_empty() {
			tracing::warn!(
				target: "tendril::reactive",
				value_type = core::any::type_name::<T>(),
				"computed cell has no dependencies and will never update"
			);
		}

		let compute: Rc<dyn Fn() -> T> = Rc::new(compute);
		let parents: Vec<CellId> = dependencies.iter().map(|dep| dep.source_id()).collect();
		let cell = Cell::create(
			compute(),
			NodeKind::DerivedCell,
			parents,
			Registration::plain(),
		);

		for dependency in dependencies {
			let target = cell.clone();
			let compute = Rc::clone(&compute);
			let link = dependency.link_change(Rc::new(move || target.set(compute())));
			cell.inner.upstream.borrow_mut().push(link);
		}

		cell
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::RefCell;
	use rstest::rstest;

	#[rstest]
	fn test_derive_initial_value_and_parent() {
		let source = Cell::new(3);
		let doubled = source.derive(|n| n * 2);

		assert_eq!(doubled.get(), 6);
		assert_eq!(doubled.kind(), NodeKind::DerivedCell);
		assert_eq!(doubled.parents(), &[source.id()]);
	}

	#[rstest]
	fn test_derive_tracks_writes() {
		let source = Cell::new(1);
		let label = source.derive(|n| format!("n={n}"));

		source.set(7);

		assert_eq!(label.get(), "n=7");
	}

	#[rstest]
	fn test_derived_change_suppressed_when_output_is_same() {
		let source = Cell::new(1);
		let parity = source.derive(|n| n % 2);
		let hits = Rc::new(RefCell::new(0));
		let hits_clone = hits.clone();
		let _sub = parity.observe(move |_| *hits_clone.borrow_mut() += 1);

		source.set(3);
		assert_eq!(*hits.borrow(), 0);

		source.set(4);
		assert_eq!(*hits.borrow(), 1);
	}

	#[rstest]
	fn test_chain_cascades_synchronously() {
		let a = Cell::new(1);
		let b = a.derive(|n| n + 1);
		let c = b.derive(|n| n * 10);
		let d = c.derive(|n| n - 1);

		a.set(4);

		assert_eq!(d.get(), 49);
	}

	#[rstest]
	fn test_destroying_derived_releases_link() {
		let source = Cell::new(0);
		let derived = source.derive(|n| n + 1);
		assert_eq!(source.observer_count(), 1);

		derived.destroy();

		assert_eq!(source.observer_count(), 0);
		source.set(10);
		assert_eq!(derived.get(), 1);
	}

	#[rstest]
	fn test_destroying_source_releases_link() {
		let source = Cell::new(0);
		let derived = source.derive(|n| n + 1);

		source.destroy();

		assert_eq!(source.observer_count(), 0);
		assert!(derived.inner.upstream.borrow().iter().all(|l| !l.is_active()));
	}

	#[rstest]
	fn test_computed_over_two_dependencies() {
		let a = Cell::new(1);
		let b = Cell::new(2);
		let (a2, b2) = (a.clone(), b.clone());
		let sum = Cell::computed(move || a2.get() + b2.get(), &[&a, &b]);

		assert_eq!(sum.get(), 3);
		assert_eq!(sum.parents(), &[a.id(), b.id()]);

		a.set(10);
		assert_eq!(sum.get(), 12);
		b.set(20);
		assert_eq!(sum.get(), 30);
	}

	#[rstest]
	fn test_computed_mixed_value_types() {
		let name = Cell::new(String::from("ada"));
		let visits = Cell::new(2_u32);
		let (n, v) = (name.clone(), visits.clone());
		let greeting = Cell::computed(move || format!("{} x{}", n.get(), v.get()), &[&name, &visits]);

		visits.set(3);

		assert_eq!(greeting.get(), "ada x3");
	}

	#[rstest]
	fn test_computed_without_dependencies_never_updates() {
		let external = Cell::new(1);
		let reader = external.clone();
		let frozen = Cell::computed(move || reader.get(), &[]);

		external.set(2);

		assert_eq!(frozen.get(), 1);
		assert!(frozen.parents().is_empty());
	}

	#[rstest]
	fn test_diamond_recomputes_once_per_path() {
		let root = Cell::new(1);
		let left = root.derive(|n| n + 1);
		let right = root.derive(|n| n * 2);
		let (l, r) = (left.clone(), right.clone());
		let runs = Rc::new(RefCell::new(0));
		let runs_clone = runs.clone();
		let joined = Cell::computed(
			move || {
				*runs_clone.borrow_mut() += 1;
				l.get() + r.get()
			},
			&[&left, &right],
		);
		let initial_runs = *runs.borrow();

		root.set(5);

		assert_eq!(*runs.borrow() - initial_runs, 2);
		assert_eq!(joined.get(), 16);
	}
}

//! Cell - Synchronous Reactive Value
//!
//! `Cell<T>` is the reactive primitive of tendril. It owns a value, an ordered
//! list of observers and a list of cleanups run on destruction.
//!
//! ## Key Features
//!
//! - **Strict change detection**: a write notifies only if the new value is not
//!   the [`SameValue`] as the old one (`NaN` equals `NaN`, `+0.0` differs from
//!   `-0.0`).
//! - **Synchronous push**: `set()` invokes every observer, in registration
//!   order, before it returns. A single write can cascade through a chain of
//!   derived cells of any depth. There is no batching and no scheduler.
//! - **Cheap handles**: cloning a `Cell` clones an `Rc`; all clones share the
//!   same value and observers.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tendril_reactive::Cell;
//!
//! let count = Cell::new(0);
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let log_clone = log.clone();
//! let _sub = count.observe(move |v| log_clone.borrow_mut().push(*v));
//!
//! count.set(5);
//! count.set(5); // same value, no notification
//! assert_eq!(*log.borrow(), vec![5]);
//! ```

use core::cell::RefCell;
use core::fmt;

extern crate alloc;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::node::{CellId, NodeKind};
use crate::same_value::SameValue;
use crate::subscription::{Cleanup, IntoCleanup, Subscription, run_cleanups};
use crate::tracker::{CellDescriptor, TrackedCell, current_tracker};

type Observer<T> = Rc<dyn Fn(&T) + 'static>;
type Serializer<T> = fn(&T) -> Option<serde_json::Value>;
type Decoder<T> = fn(serde_json::Value) -> Result<T, serde_json::Error>;

struct ObserverEntry<T: 'static> {
	key: u64,
	callback: Observer<T>,
}

/// How a new cell announces itself to the creation tracker
pub(crate) enum Registration<T: 'static> {
	/// Never visible to trackers
	Detached,
	/// Registered with the active tracker, if any
	Tracked {
		serializer: Option<Serializer<T>>,
		decoder: Option<Decoder<T>>,
	},
}

impl<T: 'static> Registration<T> {
	pub(crate) fn plain() -> Self {
		Self::Tracked {
			serializer: None,
			decoder: None,
		}
	}
}

pub(crate) struct CellInner<T: 'static> {
	id: CellId,
	kind: NodeKind,
	parents: Vec<CellId>,
	value: RefCell<T>,
	observers: RefCell<Vec<ObserverEntry<T>>>,
	next_key: RefCell<u64>,
	cleanups: RefCell<Vec<Cleanup>>,
	/// Links to the cells this one is computed from
	pub(crate) upstream: RefCell<Vec<Subscription>>,
	/// Links to the cells computed from this one
	pub(crate) downstream: RefCell<Vec<Subscription>>,
	destroyed: RefCell<bool>,
	serializer: Option<Serializer<T>>,
}

impl<T: 'static> CellInner<T> {
	fn add_observer(&self, callback: Observer<T>) -> u64 {
		let key = {
			let mut next = self.next_key.borrow_mut();
			let key = *next;
			*next += 1;
			key
		};
		self.observers
			.borrow_mut()
			.push(ObserverEntry { key, callback });
		key
	}

	fn remove_observer(&self, key: u64) {
		self.observers.borrow_mut().retain(|entry| entry.key != key);
	}

	fn has_observer(&self, key: u64) -> bool {
		self.observers.borrow().iter().any(|entry| entry.key == key)
	}
}

/// A reactive value box that notifies observers on change
///
/// See the [module documentation](self) for the notification rules.
pub struct Cell<T: 'static> {
	pub(crate) inner: Rc<CellInner<T>>,
}

impl<T: 'static> Clone for Cell<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: 'static> Cell<T> {
	/// Create a root cell
	///
	/// The cell registers with the active render or hydration context, if one
	/// exists, so it takes part in the positional id sequence. Its value is
	/// not captured for hydration: the cell appears in the payload graph only,
	/// and a value written to it during a server render does not reach the
	/// client, which starts again from the `value` passed here. Use
	/// [`Cell::hydratable`] for state that must survive the trip from server
	/// to client.
	pub fn new(value: T) -> Self {
		Self::create(value, NodeKind::RootCell, Vec::new(), Registration::plain())
	}

	/// Create a root cell that never registers with a context
	///
	/// Intended for framework-internal state such as the navigation path,
	/// which must not shift the positional ids of application cells.
	pub fn detached(value: T) -> Self {
		Self::create(value, NodeKind::RootCell, Vec::new(), Registration::Detached)
	}

	pub(crate) fn create(
		value: T,
		kind: NodeKind,
		parents: Vec<CellId>,
		registration: Registration<T>,
	) -> Self {
		let descriptor = CellDescriptor {
			id: CellId::next(),
			kind,
			parents,
			type_name: core::any::type_name::<T>(),
		};

		let (tracker, serializer, decoder) = match registration {
			Registration::Detached => (None, None, None),
			Registration::Tracked {
				serializer,
				decoder,
			} => (current_tracker(), serializer, decoder),
		};

		let mut value = value;
		if let (Some(tracker), Some(decode)) = (&tracker, decoder) {
			if kind == NodeKind::RootCell {
				if let Some(seed) = tracker.seed(&descriptor) {
					match decode(seed) {
						Ok(seeded) => value = seeded,
						Err(error) => tracker.reject_seed(&descriptor, &error),
					}
				}
			}
		}

		let cell = Self {
			inner: Rc::new(CellInner {
				id: descriptor.id,
				kind,
				parents: descriptor.parents.clone(),
				value: RefCell::new(value),
				observers: RefCell::new(Vec::new()),
				next_key: RefCell::new(0),
				cleanups: RefCell::new(Vec::new()),
				upstream: RefCell::new(Vec::new()),
				downstream: RefCell::new(Vec::new()),
				destroyed: RefCell::new(false),
				serializer,
			}),
		};

		if let Some(tracker) = tracker {
			tracker.register(descriptor, Rc::new(cell.clone()));
		}

		cell
	}

	/// Identifier of this cell
	pub fn id(&self) -> CellId {
		self.inner.id
	}

	/// Root or derived
	pub fn kind(&self) -> NodeKind {
		self.inner.kind
	}

	/// Identifiers of the cells this one is computed from
	pub fn parents(&self) -> &[CellId] {
		&self.inner.parents
	}

	/// Read the current value by reference
	///
	/// The borrow is held for the duration of `f`; writing to this cell from
	/// inside `f` panics.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.inner.value.borrow())
	}

	/// Register an observer called with the new value after every change
	///
	/// The observer is not invoked immediately. The returned subscription
	/// removes it; dropping the subscription keeps it registered.
	pub fn observe<F>(&self, callback: F) -> Subscription
	where
		F: Fn(&T) + 'static,
	{
		let key = self.inner.add_observer(Rc::new(callback));
		let weak: Weak<CellInner<T>> = Rc::downgrade(&self.inner);
		Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.remove_observer(key);
			}
		})
	}

	/// Append a cleanup run when this cell is destroyed
	pub fn add_cleanup(&self, cleanup: impl IntoCleanup) {
		self.inner.cleanups.borrow_mut().push(cleanup.into_cleanup());
	}

	/// Number of observers currently registered
	pub fn observer_count(&self) -> usize {
		self.inner.observers.borrow().len()
	}

	/// Whether [`destroy`](Self::destroy) has been called
	pub fn is_destroyed(&self) -> bool {
		*self.inner.destroyed.borrow()
	}

	/// Tear the cell down
	///
	/// Clears the observers, releases the links to the cells this one is
	/// derived from and to the cells derived from it, then runs every cleanup
	/// in registration order. A panicking cleanup is logged and does not stop
	/// the others. Calling `destroy` again does nothing.
	pub fn destroy(&self) {
		self.inner.observers.borrow_mut().clear();
		*self.inner.destroyed.borrow_mut() = true;

		let links: Vec<Subscription> = {
			let mut upstream = self.inner.upstream.borrow_mut();
			let mut downstream = self.inner.downstream.borrow_mut();
			upstream.drain(..).chain(downstream.drain(..)).collect()
		};
		for link in links {
			link.unsubscribe();
		}

		let cleanups = core::mem::take(&mut *self.inner.cleanups.borrow_mut());
		run_cleanups(cleanups);
	}

	/// Whether two handles point at the same cell
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Observe this cell on behalf of a downstream cell
	///
	/// The link is recorded on both ends so destroying either releases it.
	pub(crate) fn link_downstream(&self, callback: Observer<T>) -> Subscription {
		let key = self.inner.add_observer(callback);
		let weak: Weak<CellInner<T>> = Rc::downgrade(&self.inner);
		let link = Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.remove_observer(key);
			}
		});

		let mut downstream = self.inner.downstream.borrow_mut();
		downstream.retain(Subscription::is_active);
		downstream.push(link.clone());
		link
	}
}

impl<T: Clone + 'static> Cell<T> {
	/// Get a copy of the current value
	///
	/// Reading has no side effects and never notifies.
	pub fn get(&self) -> T {
		self.inner.value.borrow().clone()
	}

	/// Register `apply` to run now and after every change
	///
	/// This is the primitive every DOM property binding is built on.
	pub fn bind<Tg, F>(&self, target: Tg, apply: F) -> Subscription
	where
		Tg: 'static,
		F: Fn(&T, &Tg) + 'static,
	{
		let current = self.get();
		apply(&current, &target);
		self.observe(move |value| apply(value, &target))
	}

	fn notify(&self) {
		let pending: Vec<(u64, Observer<T>)> = self
			.inner
			.observers
			.borrow()
			.iter()
			.map(|entry| (entry.key, Rc::clone(&entry.callback)))
			.collect();
		if pending.is_empty() {
			return;
		}

		let value = self.get();
		for (key, callback) in pending {
			// Observers removed by an earlier observer in this pass are skipped
			if self.inner.has_observer(key) {
				callback(&value);
			}
		}
	}
}

impl<T: SameValue + Clone + 'static> Cell<T> {
	/// Write a new value
	///
	/// If the value is the [`SameValue`] as the current one nothing happens.
	/// Otherwise the value is stored and every observer is called
	/// synchronously, in registration order, before this returns.
	pub fn set(&self, value: T) {
		let changed = {
			let mut current = self.inner.value.borrow_mut();
			if current.same_value(&value) {
				false
			} else {
				*current = value;
				true
			}
		};

		if changed {
			self.notify();
		}
	}

	/// Compute the next value from the current one and write it
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&T) -> T,
	{
		let next = {
			let current = self.inner.value.borrow();
			f(&current)
		};
		self.set(next);
	}
}

impl<T: Serialize + DeserializeOwned + 'static> Cell<T> {
	/// Create a root cell whose value travels from server to client
	///
	/// During a server render the value is captured into the hydration
	/// payload. During client hydration the captured value replaces `value`,
	/// so no server-side computation has to run again.
	pub fn hydratable(value: T) -> Self {
		fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
			serde_json::to_value(value).ok()
		}

		Self::create(
			value,
			NodeKind::RootCell,
			Vec::new(),
			Registration::Tracked {
				serializer: Some(snapshot::<T> as Serializer<T>),
				decoder: Some(serde_json::from_value::<T> as Decoder<T>),
			},
		)
	}
}

impl<T: 'static> TrackedCell for Cell<T> {
	fn cell_id(&self) -> CellId {
		self.inner.id
	}

	fn snapshot(&self) -> Option<serde_json::Value> {
		let serializer = self.inner.serializer?;
		serializer(&self.inner.value.borrow())
	}

	fn observer_count(&self) -> usize {
		Cell::observer_count(self)
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Cell<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cell")
			.field("id", &self.inner.id)
			.field("kind", &self.inner.kind)
			.field("value", &*self.inner.value.borrow())
			.field("observers", &self.observer_count())
			.finish()
	}
}

//! Creation tracking
//!
//! Cells announce themselves to the active [`CreationTracker`] when they are
//! constructed. A render context uses this to build its working set for
//! hydration capture; a hydrating client context additionally answers
//! [`CreationTracker::seed`] so root cells start from the server's values.
//!
//! Trackers are found in two places, in order:
//!
//! 1. a thread-local override installed with [`with_tracker`],
//! 2. the lookup function registered once per process with
//!    [`set_tracker_lookup`] (the pages crate resolves its task-local render
//!    context here).

use core::cell::RefCell;
use std::sync::OnceLock;

extern crate alloc;
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::node::{CellId, NodeKind};

/// Static description of a cell at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDescriptor {
	/// Process-wide identifier of the cell
	pub id: CellId,
	/// Root or derived
	pub kind: NodeKind,
	/// Identifiers of the cells this one is computed from, in order
	pub parents: Vec<CellId>,
	/// `core::any::type_name` of the value type
	pub type_name: &'static str,
}

/// Type-erased view of a live cell held by a tracker
pub trait TrackedCell {
	/// Identifier of the cell
	fn cell_id(&self) -> CellId;

	/// Current value as JSON, if the cell was created as hydratable
	fn snapshot(&self) -> Option<serde_json::Value>;

	/// Number of observers currently registered on the cell
	fn observer_count(&self) -> usize;
}

/// Receiver of cell-creation events
pub trait CreationTracker {
	/// Offer a seed value for a root cell about to be created
	///
	/// Only called for hydratable root cells. Returning `Some` replaces the
	/// cell's initial value.
	fn seed(&self, _descriptor: &CellDescriptor) -> Option<serde_json::Value> {
		None
	}

	/// A seed returned by [`seed`](Self::seed) did not deserialize into the
	/// cell's value type
	fn reject_seed(&self, _descriptor: &CellDescriptor, _error: &serde_json::Error) {}

	/// Record a newly created cell
	fn register(&self, descriptor: CellDescriptor, cell: Rc<dyn TrackedCell>);
}

/// Function resolving the ambient tracker, if any
pub type TrackerLookup = fn() -> Option<Rc<dyn CreationTracker>>;

static LOOKUP: OnceLock<TrackerLookup> = OnceLock::new();

thread_local! {
	static OVERRIDES: RefCell<Vec<Rc<dyn CreationTracker>>> = const { RefCell::new(Vec::new()) };
}

/// Register the process-wide tracker lookup
///
/// Only the first registration wins; later calls are ignored and return
/// `false`.
pub fn set_tracker_lookup(lookup: TrackerLookup) -> bool {
	LOOKUP.set(lookup).is_ok()
}

/// Run `f` with `tracker` receiving every cell created on this thread
///
/// Overrides nest; the innermost one wins.
pub fn with_tracker<R>(tracker: Rc<dyn CreationTracker>, f: impl FnOnce() -> R) -> R {
	struct PopGuard;

	impl Drop for PopGuard {
		fn drop(&mut self) {
			let _ = OVERRIDES.try_with(|stack| stack.borrow_mut().pop());
		}
	}

	OVERRIDES.with(|stack| stack.borrow_mut().push(tracker));
	let _guard = PopGuard;
	f()
}

/// The tracker that should observe a cell created right now
pub fn current_tracker() -> Option<Rc<dyn CreationTracker>> {
	let overridden = OVERRIDES
		.try_with(|stack| stack.borrow().last().cloned())
		.ok()
		.flatten();
	overridden.or_else(|| LOOKUP.get().and_then(|lookup| lookup()))
}

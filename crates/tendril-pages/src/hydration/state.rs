//! Hydration phase tracking
//!
//! The phase is per thread: the DOM and every cell live on one thread, and
//! only one hydration may run on it at a time.

use std::cell::RefCell;
use std::rc::Rc;

use super::runtime::HydrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HydrationPhase {
	Idle,
	Hydrating,
}

type Listener = Rc<dyn Fn() + 'static>;

thread_local! {
	static PHASE: RefCell<HydrationPhase> = const { RefCell::new(HydrationPhase::Idle) };
	static COMPLETED: RefCell<bool> = const { RefCell::new(false) };
	static LISTENERS: RefCell<Vec<Listener>> = const { RefCell::new(Vec::new()) };
}

/// Whether a hydration is running on this thread.
pub fn is_hydrating() -> bool {
	PHASE.with(|phase| *phase.borrow() == HydrationPhase::Hydrating)
}

/// Whether a hydration has completed successfully on this thread.
pub fn is_hydration_complete() -> bool {
	COMPLETED.with(|completed| *completed.borrow())
}

/// Registers a callback run after every successful hydration on this thread.
pub fn on_hydration_complete<F>(callback: F)
where
	F: Fn() + 'static,
{
	LISTENERS.with(|listeners| listeners.borrow_mut().push(Rc::new(callback)));
}

/// Holds the thread in the hydrating phase until dropped
pub(crate) struct HydrationGuard {
	_private: (),
}

impl HydrationGuard {
	/// Enters the hydrating phase.
	pub(crate) fn begin() -> Result<Self, HydrationError> {
		PHASE.with(|phase| {
			let mut phase = phase.borrow_mut();
			if *phase == HydrationPhase::Hydrating {
				return Err(HydrationError::AlreadyHydrating);
			}
			*phase = HydrationPhase::Hydrating;
			Ok(Self { _private: () })
		})
	}

	/// Leaves the hydrating phase and notifies completion listeners.
	pub(crate) fn complete(self) {
		drop(self);
		COMPLETED.with(|completed| *completed.borrow_mut() = true);

		// Listeners may register further listeners
		let listeners = LISTENERS.with(|listeners| listeners.borrow().clone());
		for listener in listeners {
			listener();
		}
	}
}

impl Drop for HydrationGuard {
	fn drop(&mut self) {
		let _ = PHASE.try_with(|phase| *phase.borrow_mut() = HydrationPhase::Idle);
	}
}

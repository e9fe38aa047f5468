//! Subscriptions and cleanups
//!
//! A [`Subscription`] is the unsubscribe handle returned by `observe`, `bind`
//! and the derivation links. Dropping it does **not** unsubscribe; release is
//! always explicit, either by calling [`Subscription::unsubscribe`] or by
//! handing it to a scope or cell as a cleanup.

use core::cell::RefCell;
use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

extern crate alloc;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

/// A deferred teardown action
pub type Cleanup = Box<dyn FnOnce() + 'static>;

type ReleaseFn = Box<dyn FnOnce() + 'static>;

/// Handle that releases a registration exactly once
///
/// Clones share the same registration: releasing through any clone releases
/// it for all of them. This is what lets a derived cell and its source each
/// hold the link between them and release it from either side.
#[derive(Clone)]
pub struct Subscription {
	release: Rc<RefCell<Option<ReleaseFn>>>,
}

impl Subscription {
	/// Create a subscription that runs `release` when unsubscribed
	pub fn new<F>(release: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self {
			release: Rc::new(RefCell::new(Some(Box::new(release)))),
		}
	}

	/// A subscription with nothing to release
	pub fn noop() -> Self {
		Self {
			release: Rc::new(RefCell::new(None)),
		}
	}

	/// Release the registration; later calls do nothing
	pub fn unsubscribe(&self) {
		// Take before calling so a re-entrant unsubscribe sees `None`
		let release = self.release.borrow_mut().take();
		if let Some(release) = release {
			release();
		}
	}

	/// Whether the registration has not been released yet
	pub fn is_active(&self) -> bool {
		self.release.borrow().is_some()
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.is_active())
			.finish()
	}
}

/// Conversion into a [`Cleanup`]
///
/// Implemented for plain closures and for [`Subscription`], so scopes and
/// cells accept either a teardown function or an unsubscribe handle.
pub trait IntoCleanup {
	/// Convert into a boxed teardown action
	fn into_cleanup(self) -> Cleanup;
}

impl<F> IntoCleanup for F
where
	F: FnOnce() + 'static,
{
	fn into_cleanup(self) -> Cleanup {
		Box::new(self)
	}
}

impl IntoCleanup for Subscription {
	fn into_cleanup(self) -> Cleanup {
		Box::new(move || self.unsubscribe())
	}
}

/// Run every cleanup in order, isolating panics
///
/// A panicking cleanup is caught and logged; the remaining cleanups still run.
/// Returns the number of cleanups that panicked.
pub fn run_cleanups(cleanups: Vec<Cleanup>) -> usize {
	let mut failures = 0;
	for (index, cleanup) in cleanups.into_iter().enumerate() {
		if let Err(payload) = catch_unwind(AssertUnwindSafe(cleanup)) {
			failures += 1;
			tracing::error!(
				target: "tendril::reactive",
				index,
				reason = panic_message(&*payload),
				"cleanup panicked; continuing with remaining cleanups"
			);
		}
	}
	failures
}

fn panic_message(payload: &(dyn core::any::Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<alloc::string::String>() {
		message.as_str()
	} else {
		"<non-string panic payload>"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unsubscribe_runs_once() {
		let count = Rc::new(RefCell::new(0));
		let count_clone = count.clone();
		let sub = Subscription::new(move || *count_clone.borrow_mut() += 1);

		assert!(sub.is_active());
		sub.unsubscribe();
		sub.unsubscribe();

		assert_eq!(*count.borrow(), 1);
		assert!(!sub.is_active());
	}

	#[rstest]
	fn test_clones_share_release() {
		let count = Rc::new(RefCell::new(0));
		let count_clone = count.clone();
		let sub = Subscription::new(move || *count_clone.borrow_mut() += 1);
		let other = sub.clone();

		other.unsubscribe();
		sub.unsubscribe();

		assert_eq!(*count.borrow(), 1);
		assert!(!sub.is_active());
	}

	#[rstest]
	fn test_noop_is_inactive() {
		let sub = Subscription::noop();
		assert!(!sub.is_active());
		sub.unsubscribe();
	}

	fn failing_cleanup() {
		panic!("second cleanup failed");
	}

	#[rstest]
	fn test_run_cleanups_isolates_panics() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let first = log.clone();
		let third = log.clone();

		let cleanups: Vec<Cleanup> = vec![
			(move || first.borrow_mut().push("first")).into_cleanup(),
			failing_cleanup.into_cleanup(),
			(move || third.borrow_mut().push("third")).into_cleanup(),
		];

		let failures = run_cleanups(cleanups);

		assert_eq!(failures, 1);
		assert_eq!(*log.borrow(), vec!["first", "third"]);
	}

	#[rstest]
	fn test_subscription_into_cleanup() {
		let released = Rc::new(RefCell::new(false));
		let released_clone = released.clone();
		let sub = Subscription::new(move || *released_clone.borrow_mut() = true);

		run_cleanups(vec![sub.clone().into_cleanup()]);

		assert!(*released.borrow());
		assert!(!sub.is_active());
	}
}

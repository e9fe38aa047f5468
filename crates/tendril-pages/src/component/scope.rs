//! Component lifecycle scopes
//!
//! Every constructed component owns a [`Scope`]. The scope collects the
//! cleanups of everything the component wired up (bindings, listeners, timers)
//! and the scopes of the components constructed inside it. Destroying a scope
//! destroys its children first, then runs its own cleanups, exactly once.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tendril_reactive::{Cleanup, IntoCleanup, run_cleanups};

use crate::dom::Node;

type AttachCallback = Box<dyn FnOnce(&Node) + 'static>;

struct ScopeInner {
	name: Cow<'static, str>,
	cleanups: RefCell<Vec<Cleanup>>,
	children: RefCell<Vec<Scope>>,
	on_attached: RefCell<Vec<AttachCallback>>,
	attached: RefCell<bool>,
	destroyed: RefCell<bool>,
}

/// Lifecycle container of a component
#[derive(Clone)]
pub struct Scope {
	inner: Rc<ScopeInner>,
}

/// Non-owning handle to a [`Scope`]
#[derive(Clone)]
pub struct WeakScope {
	inner: Weak<ScopeInner>,
}

impl WeakScope {
	/// Returns the scope if it is still alive.
	pub fn upgrade(&self) -> Option<Scope> {
		self.inner.upgrade().map(|inner| Scope { inner })
	}
}

impl Scope {
	/// Creates an empty scope.
	pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
		Self {
			inner: Rc::new(ScopeInner {
				name: name.into(),
				cleanups: RefCell::new(Vec::new()),
				children: RefCell::new(Vec::new()),
				on_attached: RefCell::new(Vec::new()),
				attached: RefCell::new(false),
				destroyed: RefCell::new(false),
			}),
		}
	}

	/// Name of the component owning this scope.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Registers a cleanup or subscription released when the scope is destroyed.
	///
	/// On an already destroyed scope the cleanup runs immediately.
	pub fn track(&self, cleanup: impl IntoCleanup) {
		let cleanup = cleanup.into_cleanup();
		if self.is_destroyed() {
			run_cleanups(vec![cleanup]);
			return;
		}
		self.inner.cleanups.borrow_mut().push(cleanup);
	}

	/// Registers a callback run once the owning node is in a live tree.
	pub fn on_attached<F>(&self, callback: F)
	where
		F: FnOnce(&Node) + 'static,
	{
		self.inner.on_attached.borrow_mut().push(Box::new(callback));
	}

	/// Links `child` so it is attached and destroyed with this scope.
	///
	/// Linking the same scope twice has no effect. Destroyed children are
	/// pruned on every call.
	pub fn add_child(&self, child: &Scope) {
		if child.ptr_eq(self) {
			return;
		}
		if self.is_destroyed() {
			child.destroy();
			return;
		}
		let mut children = self.inner.children.borrow_mut();
		children.retain(|existing| !existing.is_destroyed());
		if !children.iter().any(|existing| existing.ptr_eq(child)) {
			children.push(child.clone());
		}
	}

	/// Number of live child scopes.
	pub fn child_count(&self) -> usize {
		self.inner
			.children
			.borrow()
			.iter()
			.filter(|child| !child.is_destroyed())
			.count()
	}

	/// Number of pending cleanups.
	pub fn cleanup_count(&self) -> usize {
		self.inner.cleanups.borrow().len()
	}

	/// Runs the attach callbacks of every child, then of this scope.
	///
	/// Only the first call has an effect.
	pub fn attach(&self, node: &Node) {
		if self.is_attached() || self.is_destroyed() {
			return;
		}
		*self.inner.attached.borrow_mut() = true;

		let children = self.inner.children.borrow().clone();
		for child in children {
			child.attach(node);
		}

		let callbacks = std::mem::take(&mut *self.inner.on_attached.borrow_mut());
		for callback in callbacks {
			callback(node);
		}
	}

	/// Whether [`attach`](Self::attach) has run.
	pub fn is_attached(&self) -> bool {
		*self.inner.attached.borrow()
	}

	/// Destroys every child scope, then runs this scope's cleanups.
	///
	/// Later calls do nothing.
	pub fn destroy(&self) {
		if self.is_destroyed() {
			return;
		}

		let children = std::mem::take(&mut *self.inner.children.borrow_mut());
		for child in children {
			child.destroy();
		}

		let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
		let failures = run_cleanups(cleanups);
		*self.inner.destroyed.borrow_mut() = true;
		self.inner.on_attached.borrow_mut().clear();

		// Cleanups registered by the cleanups above
		let late = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
		let failures = failures + run_cleanups(late);

		tracing::trace!(
			target: "tendril::component",
			scope = %self.inner.name,
			failures,
			"scope destroyed"
		);
	}

	/// Whether [`destroy`](Self::destroy) has completed.
	pub fn is_destroyed(&self) -> bool {
		*self.inner.destroyed.borrow()
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakScope {
		WeakScope {
			inner: Rc::downgrade(&self.inner),
		}
	}

	/// Whether both handles refer to the same scope.
	pub fn ptr_eq(&self, other: &Scope) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl std::fmt::Debug for Scope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Scope")
			.field("name", &self.inner.name)
			.field("children", &self.child_count())
			.field("cleanups", &self.cleanup_count())
			.field("attached", &self.is_attached())
			.field("destroyed", &self.is_destroyed())
			.finish()
	}
}

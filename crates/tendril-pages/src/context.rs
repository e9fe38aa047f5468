//! Render Context
//!
//! A [`RenderContext`] holds everything that must be isolated per request:
//! the marker-id counter, the navigation path, request data, the component
//! construction stack and the cell working set.
//!
//! ## Installation
//!
//! - **Server**: each render runs inside [`RenderContext::sync_scope`] or the
//!   async [`RenderContext::scope`]. The context is a `tokio` task-local, so
//!   two renders interleaved on the same thread each see only their own
//!   state.
//! - **Client**: one implicit context per thread, installed once with
//!   [`RenderContext::install_client`].
//!
//! Code that needs a context and runs outside both fails with
//! [`ContextError::NoActiveContext`]. A missing context is a caller bug, so
//! there is no silent fallback.
//!
//! ## Example
//!
//! ```
//! use tendril_pages::context::{RenderContext, current_path, next_id};
//!
//! let ctx = RenderContext::new();
//! ctx.navigate("/about");
//!
//! RenderContext::sync_scope(ctx, || {
//!     assert_eq!(next_id().unwrap(), 0);
//!     assert_eq!(next_id().unwrap(), 1);
//!     assert_eq!(current_path().unwrap(), "/about");
//! });
//!
//! assert!(next_id().is_err());
//! ```

pub mod registry;

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tendril_reactive::{Cell, CreationTracker, set_tracker_lookup};

use crate::component::Scope;

pub use registry::{CellRegistry, RecordedCell, ReplayIssue};

/// Errors raised when context-dependent code runs in the wrong place
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
	/// No render context is active on this task or thread
	#[error(
		"`{operation}` requires an active render context; run it inside RenderContext::sync_scope, RenderContext::scope or after RenderContext::install_client"
	)]
	NoActiveContext {
		/// The operation that needed the context
		operation: &'static str,
	},
	/// No component is being constructed
	#[error("`{operation}` must be called while a component is being constructed")]
	NoActiveScope {
		/// The operation that needed the scope
		operation: &'static str,
	},
}

tokio::task_local! {
	static RENDER_CONTEXT: RenderContext;
}

thread_local! {
	static CLIENT_CONTEXT: RefCell<Option<RenderContext>> = const { RefCell::new(None) };
}

struct ContextInner {
	id: u64,
	next_marker: RefCell<u64>,
	path: Cell<String>,
	data: RefCell<HashMap<String, String>>,
	scopes: RefCell<Vec<Scope>>,
	registry: Rc<CellRegistry>,
}

/// Per-request rendering state
///
/// Cloning yields another handle to the same context.
#[derive(Clone)]
pub struct RenderContext {
	inner: Rc<ContextInner>,
}

/// Non-owning handle to a [`RenderContext`]
#[derive(Clone)]
pub struct WeakRenderContext {
	inner: Weak<ContextInner>,
}

impl WeakRenderContext {
	/// Returns the context if it is still alive.
	pub fn upgrade(&self) -> Option<RenderContext> {
		self.inner.upgrade().map(|inner| RenderContext { inner })
	}
}

fn ambient_tracker() -> Option<Rc<dyn CreationTracker>> {
	RenderContext::try_current().map(|ctx| ctx.registry() as Rc<dyn CreationTracker>)
}

impl RenderContext {
	/// Creates a server render context that records every cell created in it.
	pub fn new() -> Self {
		Self::with_recording(true)
	}

	fn with_recording(recording: bool) -> Self {
		static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

		// The first context registers the lookup; later calls are no-ops.
		set_tracker_lookup(ambient_tracker);

		let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
		tracing::trace!(target: "tendril::context", context = id, recording, "render context created");

		Self {
			inner: Rc::new(ContextInner {
				id,
				next_marker: RefCell::new(0),
				path: Cell::detached(String::from("/")),
				data: RefCell::new(HashMap::new()),
				scopes: RefCell::new(Vec::new()),
				registry: Rc::new(CellRegistry::new(recording)),
			}),
		}
	}

	/// Installs the implicit client context for this thread and returns it.
	///
	/// The client context does not record cells until hydration turns
	/// recording on. Calling this again returns the installed context.
	pub fn install_client() -> RenderContext {
		CLIENT_CONTEXT.with(|slot| {
			slot.borrow_mut()
				.get_or_insert_with(|| Self::with_recording(false))
				.clone()
		})
	}

	/// Removes the client context of this thread, if any.
	pub fn uninstall_client() -> Option<RenderContext> {
		CLIENT_CONTEXT.with(|slot| slot.borrow_mut().take())
	}

	/// Runs `f` with `context` active.
	pub fn sync_scope<R>(context: RenderContext, f: impl FnOnce() -> R) -> R {
		RENDER_CONTEXT.sync_scope(context, f)
	}

	/// Runs `future` with `context` active across every `.await`.
	pub async fn scope<F: Future>(context: RenderContext, future: F) -> F::Output {
		RENDER_CONTEXT.scope(context, future).await
	}

	/// Returns the active context: the task-local one, otherwise the client one.
	pub fn try_current() -> Option<RenderContext> {
		RENDER_CONTEXT
			.try_with(RenderContext::clone)
			.ok()
			.or_else(|| CLIENT_CONTEXT.with(|slot| slot.borrow().clone()))
	}

	/// Returns the active context or fails naming `operation`.
	pub fn current(operation: &'static str) -> Result<RenderContext, ContextError> {
		Self::try_current().ok_or(ContextError::NoActiveContext { operation })
	}

	/// Identifier of this context, unique within the process.
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakRenderContext {
		WeakRenderContext {
			inner: Rc::downgrade(&self.inner),
		}
	}

	/// Whether both handles refer to the same context.
	pub fn ptr_eq(&self, other: &RenderContext) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Allocates the next marker id.
	pub fn next_id(&self) -> u64 {
		let mut next = self.inner.next_marker.borrow_mut();
		let id = *next;
		*next += 1;
		id
	}

	/// Restarts marker ids from zero, so a replay assigns the server's ids.
	pub(crate) fn reset_markers(&self) {
		*self.inner.next_marker.borrow_mut() = 0;
	}

	/// Current navigation path.
	pub fn path(&self) -> String {
		self.inner.path.get()
	}

	/// Changes the navigation path, notifying path observers.
	pub fn navigate(&self, path: impl Into<String>) {
		let path = path.into();
		tracing::debug!(target: "tendril::context", context = self.inner.id, %path, "navigate");
		self.inner.path.set(path);
	}

	/// The cell holding the navigation path.
	pub fn path_cell(&self) -> Cell<String> {
		self.inner.path.clone()
	}

	/// Stores a request data entry.
	pub fn insert_data(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.data.borrow_mut().insert(key.into(), value.into());
	}

	/// Reads a request data entry.
	pub fn data(&self, key: &str) -> Option<String> {
		self.inner.data.borrow().get(key).cloned()
	}

	/// Pushes a scope onto the construction stack.
	pub fn push_scope(&self, scope: Scope) {
		self.inner.scopes.borrow_mut().push(scope);
	}

	/// Pops the top of the construction stack.
	pub fn pop_scope(&self) -> Option<Scope> {
		self.inner.scopes.borrow_mut().pop()
	}

	/// The scope currently being constructed.
	pub fn current_scope(&self) -> Option<Scope> {
		self.inner.scopes.borrow().last().cloned()
	}

	/// Runs `f` with `scope` on top of the construction stack.
	pub fn with_scope<R>(&self, scope: &Scope, f: impl FnOnce() -> R) -> R {
		struct PopGuard<'a>(&'a RenderContext);

		impl Drop for PopGuard<'_> {
			fn drop(&mut self) {
				self.0.pop_scope();
			}
		}

		self.push_scope(scope.clone());
		let _guard = PopGuard(self);
		f()
	}

	/// The cell working set of this context.
	pub fn registry(&self) -> Rc<CellRegistry> {
		Rc::clone(&self.inner.registry)
	}
}

impl Default for RenderContext {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for RenderContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RenderContext")
			.field("id", &self.inner.id)
			.field("next_marker", &*self.inner.next_marker.borrow())
			.field("path", &self.path())
			.field("scope_depth", &self.inner.scopes.borrow().len())
			.field("recorded_cells", &self.inner.registry.len())
			.finish()
	}
}

/// Allocates the next marker id from the active context.
pub fn next_id() -> Result<u64, ContextError> {
	RenderContext::current("next_id").map(|ctx| ctx.next_id())
}

/// Reads the navigation path of the active context.
pub fn current_path() -> Result<String, ContextError> {
	RenderContext::current("current_path").map(|ctx| ctx.path())
}

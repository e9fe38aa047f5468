//! Hydration runtime
//!
//! [`hydrate`] re-runs the construction code on the client with root cells
//! seeded from the payload, then walks the resulting view alongside the
//! server-rendered DOM and attaches bindings and listeners to the existing
//! nodes.

use tendril_reactive::NodeKind;

use super::state::HydrationGuard;
use crate::binding::BindingDescriptor;
use crate::component::{Cursor, Hydrator, IntoView, MountError, Mounted, Scope};
use crate::context::{ContextError, RenderContext, ReplayIssue};
use crate::dom::{DomError, Node};
use crate::ssr::capture::graph_of;
use crate::ssr::payload::{HydrationPayload, PayloadError};

/// Errors that can occur during hydration.
#[derive(Debug, thiserror::Error)]
pub enum HydrationError {
	/// Another hydration is running on this thread
	#[error("a hydration is already running on this thread")]
	AlreadyHydrating,
	/// The DOM does not have the shape of the view
	#[error("structure mismatch at {path}: expected {expected}, found {found}")]
	StructureMismatch {
		/// Position in the tree
		path: String,
		/// What the view needed
		expected: String,
		/// What the DOM held
		found: String,
	},
	/// A bound element carries a different marker id than replayed
	#[error("marker mismatch: expected data-tendril-id=\"{expected}\", found {found:?}")]
	MarkerMismatch {
		/// Marker id allocated by the client
		expected: u64,
		/// Attribute value found on the element
		found: Option<String>,
	},
	/// A bound element's bindings differ from the server's
	#[error("binding mismatch on marker {marker}: server recorded {expected:?}, client declared {found:?}")]
	BindingMismatch {
		/// Marker id of the element
		marker: u64,
		/// Descriptors recorded by the server
		expected: Vec<BindingDescriptor>,
		/// Descriptors declared by the client view
		found: Vec<BindingDescriptor>,
	},
	/// A region's opening comment is missing
	#[error("region marker <!--{marker}--> not found")]
	RegionMarkerMissing {
		/// Comment text
		marker: String,
	},
	/// The client's creation trace diverged from the server's
	#[error("creation trace mismatch: server recorded {expected}, client produced {found}")]
	TraceMismatch {
		/// Description of the server trace
		expected: String,
		/// Description of the client trace
		found: String,
	},
	/// A captured value did not fit the cell created at its position
	#[error("captured value for cell {position} was rejected: {reason}")]
	SeedRejected {
		/// Positional id
		position: u64,
		/// Deserialization error
		reason: String,
	},
	/// The cell at a position has a different kind than on the server
	#[error("cell {position} is {found:?} on the client but {expected:?} on the server")]
	KindMismatch {
		/// Positional id
		position: u64,
		/// Kind recorded by the server
		expected: NodeKind,
		/// Kind created by the client
		found: NodeKind,
	},
	/// The payload could not be read
	#[error(transparent)]
	PayloadParse(#[from] PayloadError),
	/// Content created during hydration could not be mounted
	#[error(transparent)]
	Mount(#[from] MountError),
	/// A tree operation failed
	#[error(transparent)]
	Dom(#[from] DomError),
	/// Hydration needed a context that was not available
	#[error(transparent)]
	Context(#[from] ContextError),
}

/// Options for hydration.
#[derive(Debug, Clone)]
pub struct HydrationOptions {
	/// Whether the payload signature must match the client's trace.
	pub verify_signature: bool,
	/// Path to navigate the client context to before building.
	pub initial_path: Option<String>,
}

impl Default for HydrationOptions {
	fn default() -> Self {
		Self {
			verify_signature: true,
			initial_path: None,
		}
	}
}

impl HydrationOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Skips the signature check.
	pub fn skip_signature(mut self) -> Self {
		self.verify_signature = false;
		self
	}

	/// Sets the path the client starts at.
	pub fn initial_path(mut self, path: impl Into<String>) -> Self {
		self.initial_path = Some(path.into());
		self
	}
}

/// Hydrates the server markup below `root` with the view returned by `build`.
///
/// `build` must be the same construction code the server ran. Hydratable root
/// cells it creates are seeded from `payload` in creation order; derived cells
/// recompute from their seeded parents. The resulting view is matched against
/// the children of `root` without recreating them.
///
/// The working set and the hydration phase are reset whether hydration
/// succeeds or fails. Listeners registered with
/// [`on_hydration_complete`](super::on_hydration_complete) run on success.
pub fn hydrate<V, F>(
	payload: &HydrationPayload,
	root: &Node,
	options: HydrationOptions,
	build: F,
) -> Result<Mounted, HydrationError>
where
	V: IntoView,
	F: FnOnce() -> V,
{
	let guard = HydrationGuard::begin()?;
	let context = match RenderContext::try_current() {
		Some(context) => context,
		None => RenderContext::install_client(),
	};
	if let Some(path) = &options.initial_path {
		context.navigate(path.clone());
	}

	tracing::debug!(
		target: "tendril::hydration",
		context = context.id(),
		cells = payload.graph.nodes.len(),
		bound_elements = payload.bindings.len(),
		"hydration started"
	);

	let registry = context.registry();
	let was_recording = registry.is_recording();
	registry.clear();
	registry.begin_replay(payload.observables.clone(), payload.graph.kinds());
	registry.set_recording(true);
	context.reset_markers();

	let scope = Scope::new("root");
	let result: Result<Vec<Node>, HydrationError> = RenderContext::sync_scope(context.clone(), || {
		let view = context.with_scope(&scope, || build().into_view());
		let hydrator = Hydrator::new(context.clone(), &payload.bindings);
		let mut cursor = Cursor::children_of(root, "root");
		let nodes = hydrator.hydrate(view, &scope, &mut cursor);
		// A diverged trace explains any structural error, so it is reported first
		verify_trace(&context, payload, &options)?;
		let nodes = nodes?;
		cursor.finish()?;
		Ok(nodes)
	});

	let result = match result {
		Ok(nodes) => {
			if root.is_connected() {
				scope.attach(root);
			}
			Ok(Mounted::new(nodes, scope))
		}
		Err(error) => {
			tracing::error!(target: "tendril::hydration", %error, "hydration failed");
			scope.destroy();
			Err(error)
		}
	};

	registry.finish_replay();
	registry.clear();
	registry.set_recording(was_recording);

	match result {
		Ok(mounted) => {
			guard.complete();
			tracing::debug!(target: "tendril::hydration", "hydration complete");
			Ok(mounted)
		}
		Err(error) => Err(error),
	}
}

/// Reads the payload embedded in `html`, then hydrates like [`hydrate`].
pub fn hydrate_from_html<V, F>(
	html: &str,
	root: &Node,
	options: HydrationOptions,
	build: F,
) -> Result<Mounted, HydrationError>
where
	V: IntoView,
	F: FnOnce() -> V,
{
	let payload = HydrationPayload::from_html(html)?;
	hydrate(&payload, root, options, build)
}

/// Compares the client's creation trace with the server's.
fn verify_trace(
	context: &RenderContext,
	payload: &HydrationPayload,
	options: &HydrationOptions,
) -> Result<(), HydrationError> {
	let registry = context.registry();

	for issue in registry.finish_replay() {
		match issue {
			ReplayIssue::SeedRejected { position, reason } => {
				return Err(HydrationError::SeedRejected { position, reason });
			}
			ReplayIssue::KindMismatch {
				position,
				expected,
				found,
			} => {
				return Err(HydrationError::KindMismatch {
					position,
					expected,
					found,
				});
			}
			ReplayIssue::UnexpectedCell { .. } => {}
		}
	}

	let expected = payload.graph.nodes.len();
	let found = registry.len();
	if expected != found {
		return Err(HydrationError::TraceMismatch {
			expected: format!("{expected} cells"),
			found: format!("{found} cells"),
		});
	}

	if options.verify_signature {
		if let Some(signature) = &payload.signature {
			let client = graph_of(&registry).signature();
			if &client != signature {
				return Err(HydrationError::TraceMismatch {
					expected: format!("signature {signature}"),
					found: format!("signature {client}"),
				});
			}
		}
	}

	Ok(())
}

//! Turning views into DOM nodes
//!
//! Two walks share this module:
//!
//! - [`Renderer`] creates fresh nodes. On the server it also stamps marker
//!   attributes on bound elements and records their binding descriptors.
//! - [`Hydrator`] claims the nodes a server render left behind, checking
//!   each one against the view before attaching bindings and listeners.
//!
//! Both walks allocate marker ids in the same pre-order, so the client
//! arrives at the ids the server emitted.

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::scope::Scope;
use super::show;
use super::view::{ElementView, IntoView, PropertyBinding, View};
use crate::binding::BindingDescriptor;
use crate::context::{CellRegistry, ContextError, RenderContext};
use crate::dom::{DomError, EventHandler, Node, NodeType};
use crate::hydration::HydrationError;
use crate::router;
use crate::ssr::markers::HYDRATION_ATTR_ID;

/// Errors raised while mounting a view
#[derive(Debug, thiserror::Error)]
pub enum MountError {
	/// A tree operation failed
	#[error(transparent)]
	Dom(#[from] DomError),
	/// Mounting ran outside a render context
	#[error(transparent)]
	Context(#[from] ContextError),
}

/// A view mounted into the DOM
///
/// Dropping a `Mounted` leaves the nodes in place; call
/// [`unmount`](Self::unmount) to remove them and release every binding.
#[derive(Debug)]
pub struct Mounted {
	nodes: Vec<Node>,
	scope: Scope,
}

impl Mounted {
	pub(crate) fn new(nodes: Vec<Node>, scope: Scope) -> Self {
		Self { nodes, scope }
	}

	/// Top-level nodes created or claimed by the mount.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Root scope of the mounted tree.
	pub fn scope(&self) -> &Scope {
		&self.scope
	}

	/// Removes the top-level nodes from their parent, then destroys the root scope.
	pub fn unmount(&self) {
		for node in &self.nodes {
			node.remove();
		}
		self.scope.destroy();
	}
}

/// Builds a view and mounts it at the end of `parent`.
///
/// `build` runs under a fresh root scope of the active render context.
/// Attach callbacks run when `parent` is part of a document.
///
/// # Example
///
/// ```
/// use tendril_pages::component::{ElementView, mount};
/// use tendril_pages::context::RenderContext;
/// use tendril_pages::dom::Node;
/// use tendril_reactive::Cell;
///
/// let document = Node::document();
/// let root = Node::element("div");
/// document.append_child(&root).unwrap();
///
/// let count = Cell::new(1);
/// let mounted = RenderContext::sync_scope(RenderContext::new(), || {
///     mount(&root, || ElementView::new("span").bind_text(&count))
/// })
/// .unwrap();
///
/// count.set(2);
/// assert_eq!(root.inner_html(), "<span>2</span>");
///
/// mounted.unmount();
/// assert_eq!(root.inner_html(), "");
/// ```
pub fn mount<V, F>(parent: &Node, build: F) -> Result<Mounted, MountError>
where
	V: IntoView,
	F: FnOnce() -> V,
{
	let context = RenderContext::current("mount")?;
	let scope = Scope::new("root");
	let view = context.with_scope(&scope, || build().into_view());

	let nodes = Renderer::new(context, false).render(view, &scope)?;
	for node in &nodes {
		parent.append_child(node)?;
	}
	if parent.is_connected() {
		scope.attach(parent);
	}

	Ok(Mounted::new(nodes, scope))
}

/// Whether a binding replaces the children of its element
fn owns_content(bindings: &[PropertyBinding]) -> bool {
	bindings
		.iter()
		.any(|binding| matches!(binding.prop.as_str(), "textContent" | "innerText"))
}

fn drop_shadowed_children(element: &mut ElementView) {
	if owns_content(&element.bindings) && !element.children.is_empty() {
		tracing::warn!(
			target: "tendril::component",
			tag = %element.tag,
			"child views of an element with a text binding are ignored"
		);
		element.children.clear();
	}
}

/// Positional descriptors of `bindings`, skipping cells outside the working set.
fn describe_bindings(registry: &CellRegistry, bindings: &[PropertyBinding]) -> Vec<BindingDescriptor> {
	bindings
		.iter()
		.filter_map(|binding| match registry.position_of(binding.cell) {
			Some(position) => Some(BindingDescriptor::new(position, binding.prop.clone())),
			None => {
				tracing::warn!(
					target: "tendril::hydration",
					cell = %binding.cell,
					prop = %binding.prop,
					"bound cell was not created in this render; the binding cannot be replayed"
				);
				None
			}
		})
		.collect()
}

/// Attaches bindings and listeners, registering their release on `owner`.
fn wire(
	node: &Node,
	bindings: &[PropertyBinding],
	listeners: Vec<(Cow<'static, str>, EventHandler)>,
	owner: &Scope,
) {
	for binding in bindings {
		owner.track((binding.attach)(node));
	}
	for (event_type, handler) in listeners {
		let id = node.add_event_listener(event_type.into_owned(), handler);
		let weak = node.downgrade();
		owner.track(move || {
			if let Some(node) = weak.upgrade() {
				node.remove_event_listener(id);
			}
		});
	}
}

/// Creates DOM nodes for a view
pub(crate) struct Renderer {
	context: RenderContext,
	markers: bool,
}

impl Renderer {
	pub(crate) fn new(context: RenderContext, markers: bool) -> Self {
		Self { context, markers }
	}

	pub(crate) fn context(&self) -> &RenderContext {
		&self.context
	}

	/// Renders `view`, registering everything it wires up on `owner`.
	pub(crate) fn render(&self, view: View, owner: &Scope) -> Result<Vec<Node>, MountError> {
		match view {
			View::Element(element) => Ok(vec![self.render_element(element, owner)?]),
			View::Text(text) => Ok(vec![Node::text(text)]),
			View::Fragment(children) => {
				let mut nodes = Vec::new();
				for child in children {
					nodes.extend(self.render(child, owner)?);
				}
				Ok(nodes)
			}
			View::Component(component) => {
				owner.add_child(&component.scope);
				self.render(*component.body, &component.scope)
			}
			View::Show(view) => show::render(self, view, owner),
			View::Outlet(view) => router::render_outlet(self, view, owner),
			View::Empty => Ok(Vec::new()),
		}
	}

	fn render_element(&self, mut element: ElementView, owner: &Scope) -> Result<Node, MountError> {
		drop_shadowed_children(&mut element);

		let node = Node::element(element.tag.as_ref());
		for (name, value) in &element.attrs {
			node.set_attribute(name, value.as_ref());
		}

		if !element.bindings.is_empty() {
			let marker = self.context.next_id();
			if self.markers {
				node.set_attribute(HYDRATION_ATTR_ID, marker.to_string());
			}
			let registry = self.context.registry();
			if registry.is_recording() {
				for descriptor in describe_bindings(&registry, &element.bindings) {
					registry.record_binding(marker, descriptor);
				}
			}
		}

		wire(&node, &element.bindings, element.listeners, owner);

		for child in element.children {
			for child_node in self.render(child, owner)? {
				node.append_child(&child_node)?;
			}
		}

		Ok(node)
	}
}

/// Position inside the children of an existing node
pub(crate) struct Cursor {
	parent: Node,
	next: Option<Node>,
	claimed: usize,
	path: String,
}

impl Cursor {
	pub(crate) fn children_of(parent: &Node, path: impl Into<String>) -> Self {
		Self {
			parent: parent.clone(),
			next: parent.first_child(),
			claimed: 0,
			path: path.into(),
		}
	}

	fn peek(&self) -> Option<&Node> {
		self.next.as_ref()
	}

	fn take(&mut self) -> Option<Node> {
		let node = self.next.take()?;
		self.next = node.next_sibling();
		self.claimed += 1;
		Some(node)
	}

	fn position(&self) -> String {
		format!("{}/{}", self.path, self.claimed)
	}

	/// Fails if any child was left unclaimed.
	pub(crate) fn finish(self) -> Result<(), HydrationError> {
		match self.next {
			None => Ok(()),
			Some(extra) => Err(HydrationError::StructureMismatch {
				path: format!("{}/{}", self.path, self.claimed),
				expected: "no further nodes".to_string(),
				found: extra.describe(),
			}),
		}
	}
}

fn describe_found(node: Option<&Node>) -> String {
	node.map_or_else(|| "nothing".to_string(), Node::describe)
}

/// Claims server-rendered nodes for a view
pub(crate) struct Hydrator<'a> {
	context: RenderContext,
	expected: &'a BTreeMap<u64, Vec<BindingDescriptor>>,
}

impl<'a> Hydrator<'a> {
	pub(crate) fn new(context: RenderContext, expected: &'a BTreeMap<u64, Vec<BindingDescriptor>>) -> Self {
		Self { context, expected }
	}

	pub(crate) fn context(&self) -> &RenderContext {
		&self.context
	}

	/// Claims the nodes for `view` starting at `cursor`.
	pub(crate) fn hydrate(
		&self,
		view: View,
		owner: &Scope,
		cursor: &mut Cursor,
	) -> Result<Vec<Node>, HydrationError> {
		match view {
			View::Element(element) => Ok(vec![self.hydrate_element(element, owner, cursor)?]),
			View::Text(text) => {
				let path = cursor.position();
				match cursor.take() {
					Some(node) if node.node_type() == NodeType::Text => {
						if node.text_content() != text {
							tracing::debug!(
								target: "tendril::hydration",
								%path,
								"server text differs from the client view; using the client text"
							);
							node.set_text_content(&text);
						}
						Ok(vec![node])
					}
					other => Err(HydrationError::StructureMismatch {
						path,
						expected: "text".to_string(),
						found: describe_found(other.as_ref()),
					}),
				}
			}
			View::Fragment(children) => {
				let mut nodes = Vec::new();
				for child in children {
					nodes.extend(self.hydrate(child, owner, cursor)?);
				}
				Ok(nodes)
			}
			View::Component(component) => {
				owner.add_child(&component.scope);
				self.hydrate(*component.body, &component.scope, cursor)
			}
			View::Show(view) => show::hydrate(self, view, owner, cursor),
			View::Outlet(view) => router::hydrate_outlet(self, view, owner, cursor),
			View::Empty => Ok(Vec::new()),
		}
	}

	fn hydrate_element(
		&self,
		mut element: ElementView,
		owner: &Scope,
		cursor: &mut Cursor,
	) -> Result<Node, HydrationError> {
		drop_shadowed_children(&mut element);

		let path = cursor.position();
		let node = match cursor.take() {
			Some(node) if node.tag_name() == Some(element.tag.as_ref()) => node,
			other => {
				return Err(HydrationError::StructureMismatch {
					path,
					expected: format!("<{}>", element.tag),
					found: describe_found(other.as_ref()),
				});
			}
		};

		if !element.bindings.is_empty() {
			let marker = self.context.next_id();
			let found = node.get_attribute(HYDRATION_ATTR_ID);
			if found.as_deref() != Some(marker.to_string().as_str()) {
				return Err(HydrationError::MarkerMismatch {
					expected: marker,
					found,
				});
			}

			let described = describe_bindings(&self.context.registry(), &element.bindings);
			let expected = self.expected.get(&marker).cloned().unwrap_or_default();
			if described != expected {
				return Err(HydrationError::BindingMismatch {
					marker,
					expected,
					found: described,
				});
			}
		}

		let text_bound = owns_content(&element.bindings);
		wire(&node, &element.bindings, element.listeners, owner);

		if !text_bound {
			let mut children = Cursor::children_of(&node, format!("{path}<{}>", element.tag));
			for child in element.children {
				self.hydrate(child, owner, &mut children)?;
			}
			children.finish()?;
		}

		Ok(node)
	}

	/// Claims the start comment of a region.
	pub(crate) fn claim_region_start(&self, cursor: &mut Cursor, data: &str) -> Result<Node, HydrationError> {
		if let Some(node) = cursor.peek() {
			if node.comment_data().as_deref() == Some(data) {
				return cursor
					.take()
					.ok_or_else(|| HydrationError::RegionMarkerMissing {
						marker: data.to_string(),
					});
			}
		}

		if cursor.parent.find_comment(data).is_some() {
			return Err(HydrationError::StructureMismatch {
				path: cursor.position(),
				expected: format!("<!--{data}-->"),
				found: describe_found(cursor.peek()),
			});
		}
		Err(HydrationError::RegionMarkerMissing {
			marker: data.to_string(),
		})
	}

	/// Claims the end comment of a region if it is next.
	pub(crate) fn claim_region_end(&self, cursor: &mut Cursor, data: &str) -> Option<Node> {
		match cursor.peek() {
			Some(node) if node.comment_data().as_deref() == Some(data) => cursor.take(),
			_ => None,
		}
	}

	/// Claims the end comment of a region, creating it where it should be if missing.
	pub(crate) fn claim_or_create_region_end(
		&self,
		cursor: &mut Cursor,
		data: &str,
	) -> Result<Node, HydrationError> {
		if let Some(end) = self.claim_region_end(cursor, data) {
			return Ok(end);
		}
		tracing::debug!(
			target: "tendril::hydration",
			marker = data,
			"region end marker missing; creating it"
		);
		let end = Node::comment(data);
		cursor.parent.insert_before(&end, cursor.next.as_ref())?;
		Ok(end)
	}
}

//! In-memory DOM
//!
//! A small document object model used as the construction target for both
//! server rendering and client hydration. It provides the subset of the
//! browser DOM the component system relies on: element, text, comment and
//! document nodes, attributes, ordered children with parent links, event
//! listeners, and HTML serialization.
//!
//! Nodes are reference counted handles. Cloning a [`Node`] clones the handle,
//! not the subtree; use [`Node::deep_clone`] for a structural copy.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Errors raised by tree mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
	/// The reference node is not a child of the node being mutated
	#[error("the node is not a child of this node")]
	NotAChild,
	/// The mutation would produce an invalid tree
	#[error("invalid tree mutation: {0}")]
	HierarchyRequest(&'static str),
}

/// Kind of a DOM node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// An element such as `<div>`
	Element,
	/// A text node
	Text,
	/// A comment node, used for region markers
	Comment,
	/// The root of a document
	Document,
}

/// Event delivered to listeners
#[derive(Debug)]
pub struct Event {
	event_type: String,
	target: Node,
	stopped: RefCell<bool>,
}

impl Event {
	/// Creates an event of the given type targeted at `target`.
	pub fn new(event_type: impl Into<String>, target: &Node) -> Self {
		Self {
			event_type: event_type.into(),
			target: target.clone(),
			stopped: RefCell::new(false),
		}
	}

	/// The event type, e.g. `"click"`.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// The node the event was dispatched on.
	pub fn target(&self) -> &Node {
		&self.target
	}

	/// Stops the event from bubbling further up the tree.
	pub fn stop_propagation(&self) {
		*self.stopped.borrow_mut() = true;
	}

	fn is_stopped(&self) -> bool {
		*self.stopped.borrow()
	}
}

/// Event listener callback
pub type EventHandler = Rc<dyn Fn(&Event) + 'static>;

/// Handle identifying a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
	id: ListenerId,
	event_type: String,
	handler: EventHandler,
}

enum NodeData {
	Element {
		tag: String,
		attrs: RefCell<Vec<(String, String)>>,
	},
	Text(RefCell<String>),
	Comment(RefCell<String>),
	Document,
}

struct NodeInner {
	data: NodeData,
	parent: RefCell<Weak<NodeInner>>,
	children: RefCell<Vec<Node>>,
	listeners: RefCell<Vec<Listener>>,
	next_listener: RefCell<u64>,
}

/// A node in the in-memory DOM
#[derive(Clone)]
pub struct Node {
	inner: Rc<NodeInner>,
}

/// Non-owning reference to a [`Node`]
#[derive(Clone)]
pub struct WeakNode {
	inner: Weak<NodeInner>,
}

impl WeakNode {
	/// Returns the node if it is still alive.
	pub fn upgrade(&self) -> Option<Node> {
		self.inner.upgrade().map(|inner| Node { inner })
	}
}

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

impl Node {
	fn from_data(data: NodeData) -> Self {
		Self {
			inner: Rc::new(NodeInner {
				data,
				parent: RefCell::new(Weak::new()),
				children: RefCell::new(Vec::new()),
				listeners: RefCell::new(Vec::new()),
				next_listener: RefCell::new(0),
			}),
		}
	}

	/// Creates an empty document.
	pub fn document() -> Self {
		Self::from_data(NodeData::Document)
	}

	/// Creates a detached element.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::from_data(NodeData::Element {
			tag: tag.into().to_ascii_lowercase(),
			attrs: RefCell::new(Vec::new()),
		})
	}

	/// Creates a detached text node.
	pub fn text(content: impl Into<String>) -> Self {
		Self::from_data(NodeData::Text(RefCell::new(content.into())))
	}

	/// Creates a detached comment node.
	pub fn comment(data: impl Into<String>) -> Self {
		Self::from_data(NodeData::Comment(RefCell::new(data.into())))
	}

	/// Returns the node type.
	pub fn node_type(&self) -> NodeType {
		match &self.inner.data {
			NodeData::Element { .. } => NodeType::Element,
			NodeData::Text(_) => NodeType::Text,
			NodeData::Comment(_) => NodeType::Comment,
			NodeData::Document => NodeType::Document,
		}
	}

	/// Returns the tag name for elements.
	pub fn tag_name(&self) -> Option<&str> {
		match &self.inner.data {
			NodeData::Element { tag, .. } => Some(tag),
			_ => None,
		}
	}

	/// Short human readable description, used in diagnostics.
	pub fn describe(&self) -> String {
		match &self.inner.data {
			NodeData::Element { tag, .. } => format!("<{tag}>"),
			NodeData::Text(text) => format!("text {:?}", text.borrow()),
			NodeData::Comment(data) => format!("<!--{}-->", data.borrow()),
			NodeData::Document => "#document".to_string(),
		}
	}

	/// Returns the comment text for comment nodes.
	pub fn comment_data(&self) -> Option<String> {
		match &self.inner.data {
			NodeData::Comment(data) => Some(data.borrow().clone()),
			_ => None,
		}
	}

	/// Whether both handles refer to the same node.
	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakNode {
		WeakNode {
			inner: Rc::downgrade(&self.inner),
		}
	}

	// ------------------------------------------------------------------
	// Attributes
	// ------------------------------------------------------------------

	/// Returns an attribute value.
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		match &self.inner.data {
			NodeData::Element { attrs, .. } => attrs
				.borrow()
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	/// Whether the attribute is present.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.get_attribute(name).is_some()
	}

	/// Sets an attribute, keeping its position if it already exists.
	///
	/// Has no effect on non-element nodes.
	pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
		if let NodeData::Element { attrs, .. } = &self.inner.data {
			let value = value.into();
			let mut attrs = attrs.borrow_mut();
			match attrs.iter_mut().find(|(key, _)| key == name) {
				Some(entry) => entry.1 = value,
				None => attrs.push((name.to_string(), value)),
			}
		}
	}

	/// Removes an attribute.
	pub fn remove_attribute(&self, name: &str) {
		if let NodeData::Element { attrs, .. } = &self.inner.data {
			attrs.borrow_mut().retain(|(key, _)| key != name);
		}
	}

	/// Returns all attributes in insertion order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		match &self.inner.data {
			NodeData::Element { attrs, .. } => attrs.borrow().clone(),
			_ => Vec::new(),
		}
	}

	// ------------------------------------------------------------------
	// Text
	// ------------------------------------------------------------------

	/// Returns the text content of this node and its descendants.
	pub fn text_content(&self) -> String {
		match &self.inner.data {
			NodeData::Text(text) | NodeData::Comment(text) => text.borrow().clone(),
			NodeData::Element { .. } | NodeData::Document => {
				let mut out = String::new();
				self.collect_text(&mut out);
				out
			}
		}
	}

	fn collect_text(&self, out: &mut String) {
		for child in self.inner.children.borrow().iter() {
			match &child.inner.data {
				NodeData::Text(text) => out.push_str(&text.borrow()),
				NodeData::Element { .. } => child.collect_text(out),
				_ => {}
			}
		}
	}

	/// Replaces the text content.
	///
	/// On elements every child is removed and replaced by a single text node.
	pub fn set_text_content(&self, content: &str) {
		match &self.inner.data {
			NodeData::Text(text) | NodeData::Comment(text) => {
				*text.borrow_mut() = content.to_string();
			}
			NodeData::Element { .. } | NodeData::Document => {
				let old = std::mem::take(&mut *self.inner.children.borrow_mut());
				for child in old {
					*child.inner.parent.borrow_mut() = Weak::new();
				}
				if !content.is_empty() {
					let text = Node::text(content);
					*text.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
					self.inner.children.borrow_mut().push(text);
				}
			}
		}
	}

	// ------------------------------------------------------------------
	// Tree structure
	// ------------------------------------------------------------------

	/// Returns the parent node.
	pub fn parent(&self) -> Option<Node> {
		self.inner.parent.borrow().upgrade().map(|inner| Node { inner })
	}

	/// Returns a snapshot of the children.
	pub fn children(&self) -> Vec<Node> {
		self.inner.children.borrow().clone()
	}

	/// Number of children.
	pub fn child_count(&self) -> usize {
		self.inner.children.borrow().len()
	}

	/// Returns the first child.
	pub fn first_child(&self) -> Option<Node> {
		self.inner.children.borrow().first().cloned()
	}

	/// Returns the sibling following this node.
	pub fn next_sibling(&self) -> Option<Node> {
		let parent = self.parent()?;
		let siblings = parent.inner.children.borrow();
		let index = siblings.iter().position(|n| n.ptr_eq(self))?;
		siblings.get(index + 1).cloned()
	}

	/// Whether this node is attached, through its ancestors, to a document.
	pub fn is_connected(&self) -> bool {
		let mut current = self.clone();
		loop {
			if current.node_type() == NodeType::Document {
				return true;
			}
			match current.parent() {
				Some(parent) => current = parent,
				None => return false,
			}
		}
	}

	fn is_inclusive_ancestor_of(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node.ptr_eq(self) {
				return true;
			}
			current = node.parent();
		}
		false
	}

	fn check_insertable(&self, child: &Node) -> Result<(), DomError> {
		if matches!(self.node_type(), NodeType::Text | NodeType::Comment) {
			return Err(DomError::HierarchyRequest("text and comment nodes have no children"));
		}
		if child.node_type() == NodeType::Document {
			return Err(DomError::HierarchyRequest("a document cannot be inserted"));
		}
		if child.is_inclusive_ancestor_of(self) {
			return Err(DomError::HierarchyRequest("a node cannot contain its ancestor"));
		}
		Ok(())
	}

	/// Appends `child`, moving it from its current parent if needed.
	pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
		self.check_insertable(child)?;
		child.remove();
		*child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
		self.inner.children.borrow_mut().push(child.clone());
		Ok(())
	}

	/// Inserts `child` before `reference`, or appends it when `reference` is `None`.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		let Some(reference) = reference else {
			return self.append_child(child);
		};
		if child.ptr_eq(reference) {
			return Ok(());
		}
		self.check_insertable(child)?;
		if !self.contains_child(reference) {
			return Err(DomError::NotAChild);
		}

		child.remove();
		let mut children = self.inner.children.borrow_mut();
		let index = children
			.iter()
			.position(|n| n.ptr_eq(reference))
			.ok_or(DomError::NotAChild)?;
		*child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
		children.insert(index, child.clone());
		Ok(())
	}

	/// Removes `child` from this node.
	pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
		let mut children = self.inner.children.borrow_mut();
		let index = children
			.iter()
			.position(|n| n.ptr_eq(child))
			.ok_or(DomError::NotAChild)?;
		children.remove(index);
		*child.inner.parent.borrow_mut() = Weak::new();
		Ok(())
	}

	/// Detaches this node from its parent, if any.
	pub fn remove(&self) {
		if let Some(parent) = self.parent() {
			let _ = parent.remove_child(self);
		}
	}

	fn contains_child(&self, child: &Node) -> bool {
		self.inner.children.borrow().iter().any(|n| n.ptr_eq(child))
	}

	// ------------------------------------------------------------------
	// Events
	// ------------------------------------------------------------------

	/// Registers a listener and returns its handle.
	pub fn add_event_listener(&self, event_type: impl Into<String>, handler: EventHandler) -> ListenerId {
		let id = {
			let mut next = self.inner.next_listener.borrow_mut();
			let id = ListenerId(*next);
			*next += 1;
			id
		};
		self.inner.listeners.borrow_mut().push(Listener {
			id,
			event_type: event_type.into(),
			handler,
		});
		id
	}

	/// Removes a listener. Returns `false` if it was not registered.
	pub fn remove_event_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.inner.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|listener| listener.id != id);
		listeners.len() != before
	}

	/// Number of listeners registered for `event_type`.
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.inner
			.listeners
			.borrow()
			.iter()
			.filter(|listener| listener.event_type == event_type)
			.count()
	}

	/// Dispatches an event of `event_type` on this node, bubbling to ancestors.
	///
	/// Returns the number of listeners invoked.
	pub fn dispatch_event(&self, event_type: &str) -> usize {
		let event = Event::new(event_type, self);
		let mut invoked = 0;
		let mut current = Some(self.clone());

		while let Some(node) = current {
			let handlers: Vec<EventHandler> = node
				.inner
				.listeners
				.borrow()
				.iter()
				.filter(|listener| listener.event_type == event_type)
				.map(|listener| Rc::clone(&listener.handler))
				.collect();
			for handler in handlers {
				handler(&event);
				invoked += 1;
			}
			if event.is_stopped() {
				break;
			}
			current = node.parent();
		}

		invoked
	}

	// ------------------------------------------------------------------
	// Queries
	// ------------------------------------------------------------------

	/// Finds the first descendant element carrying `name="value"`, in document order.
	pub fn find_by_attr(&self, name: &str, value: &str) -> Option<Node> {
		self.find_descendant(&|node| node.get_attribute(name).as_deref() == Some(value))
	}

	/// Finds the first descendant comment whose text equals `data`.
	pub fn find_comment(&self, data: &str) -> Option<Node> {
		self.find_descendant(&|node| node.comment_data().as_deref() == Some(data))
	}

	fn find_descendant(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<Node> {
		for child in self.inner.children.borrow().iter() {
			if predicate(child) {
				return Some(child.clone());
			}
			if let Some(found) = child.find_descendant(predicate) {
				return Some(found);
			}
		}
		None
	}

	/// Copies this node and its subtree. Listeners are not copied.
	pub fn deep_clone(&self) -> Node {
		let copy = match &self.inner.data {
			NodeData::Element { tag, attrs } => Node::from_data(NodeData::Element {
				tag: tag.clone(),
				attrs: RefCell::new(attrs.borrow().clone()),
			}),
			NodeData::Text(text) => Node::text(text.borrow().clone()),
			NodeData::Comment(data) => Node::comment(data.borrow().clone()),
			NodeData::Document => Node::document(),
		};
		for child in self.inner.children.borrow().iter() {
			let child_copy = child.deep_clone();
			*child_copy.inner.parent.borrow_mut() = Rc::downgrade(&copy.inner);
			copy.inner.children.borrow_mut().push(child_copy);
		}
		copy
	}

	// ------------------------------------------------------------------
	// Serialization
	// ------------------------------------------------------------------

	/// Serializes this node and its subtree to HTML.
	pub fn to_html(&self) -> String {
		let mut out = String::new();
		self.write_html(&mut out);
		out
	}

	/// Serializes the children of this node to HTML.
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		for child in self.inner.children.borrow().iter() {
			child.write_html(&mut out);
		}
		out
	}

	fn write_html(&self, out: &mut String) {
		match &self.inner.data {
			NodeData::Element { tag, attrs } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attrs.borrow().iter() {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&escape_attr(value));
					out.push('"');
				}
				out.push('>');
				if VOID_ELEMENTS.contains(&tag.as_str()) {
					return;
				}
				for child in self.inner.children.borrow().iter() {
					child.write_html(out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
			NodeData::Text(text) => out.push_str(&escape_text(&text.borrow())),
			NodeData::Comment(data) => {
				out.push_str("<!--");
				out.push_str(&data.borrow());
				out.push_str("-->");
			}
			NodeData::Document => {
				for child in self.inner.children.borrow().iter() {
					child.write_html(out);
				}
			}
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("node", &self.describe())
			.field("children", &self.child_count())
			.finish()
	}
}

/// Escapes text content for HTML.
pub fn escape_text(s: &str) -> String {
	s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escapes a string for use in an HTML attribute value.
pub fn escape_attr(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('"', "&quot;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_append_and_serialize() {
		let div = Node::element("div");
		div.set_attribute("class", "box");
		div.append_child(&Node::text("a < b")).unwrap();
		div.append_child(&Node::comment("show:0")).unwrap();

		assert_eq!(
			div.to_html(),
			r#"<div class="box">a &lt; b<!--show:0--></div>"#
		);
	}

	#[rstest]
	fn test_void_elements_have_no_closing_tag() {
		let input = Node::element("input");
		input.set_attribute("value", "\"x\"");
		assert_eq!(input.to_html(), r#"<input value="&quot;x&quot;">"#);
	}

	#[rstest]
	fn test_append_moves_node_between_parents() {
		let a = Node::element("a");
		let b = Node::element("b");
		let child = Node::text("x");

		a.append_child(&child).unwrap();
		b.append_child(&child).unwrap();

		assert_eq!(a.child_count(), 0);
		assert!(child.parent().unwrap().ptr_eq(&b));
	}

	#[rstest]
	fn test_insert_before_reference() {
		let parent = Node::element("ul");
		let last = Node::element("li");
		let first = Node::element("li");
		first.set_attribute("id", "first");
		parent.append_child(&last).unwrap();

		parent.insert_before(&first, Some(&last)).unwrap();

		assert!(parent.first_child().unwrap().ptr_eq(&first));
		assert!(first.next_sibling().unwrap().ptr_eq(&last));
	}

	#[rstest]
	fn test_insert_before_foreign_reference_fails() {
		let parent = Node::element("div");
		let stranger = Node::element("span");

		let result = parent.insert_before(&Node::text("x"), Some(&stranger));

		assert_eq!(result, Err(DomError::NotAChild));
	}

	#[rstest]
	fn test_cannot_insert_ancestor() {
		let outer = Node::element("div");
		let inner = Node::element("div");
		outer.append_child(&inner).unwrap();

		assert!(matches!(
			inner.append_child(&outer),
			Err(DomError::HierarchyRequest(_))
		));
	}

	#[rstest]
	fn test_is_connected_follows_document() {
		let doc = Node::document();
		let div = Node::element("div");
		let span = Node::element("span");
		div.append_child(&span).unwrap();
		assert!(!span.is_connected());

		doc.append_child(&div).unwrap();
		assert!(span.is_connected());

		div.remove();
		assert!(!span.is_connected());
	}

	#[rstest]
	fn test_set_text_content_replaces_children() {
		let p = Node::element("p");
		p.append_child(&Node::element("b")).unwrap();

		p.set_text_content("hello");

		assert_eq!(p.child_count(), 1);
		assert_eq!(p.text_content(), "hello");
	}

	#[rstest]
	fn test_dispatch_bubbles_until_stopped() {
		let outer = Node::element("div");
		let button = Node::element("button");
		outer.append_child(&button).unwrap();

		let log = Rc::new(RefCell::new(Vec::new()));
		let inner_log = log.clone();
		button.add_event_listener(
			"click",
			Rc::new(move |_: &Event| inner_log.borrow_mut().push("button")),
		);
		let outer_log = log.clone();
		outer.add_event_listener(
			"click",
			Rc::new(move |_: &Event| outer_log.borrow_mut().push("outer")),
		);

		assert_eq!(button.dispatch_event("click"), 2);
		assert_eq!(*log.borrow(), vec!["button", "outer"]);

		button.add_event_listener("click", Rc::new(|event: &Event| event.stop_propagation()));
		assert_eq!(button.dispatch_event("click"), 2);
	}

	#[rstest]
	fn test_remove_event_listener() {
		let node = Node::element("button");
		let id = node.add_event_listener("click", Rc::new(|_: &Event| {}));

		assert_eq!(node.listener_count("click"), 1);
		assert!(node.remove_event_listener(id));
		assert!(!node.remove_event_listener(id));
		assert_eq!(node.listener_count("click"), 0);
	}

	#[rstest]
	fn test_deep_clone_drops_listeners() {
		let div = Node::element("div");
		let button = Node::element("button");
		button.add_event_listener("click", Rc::new(|_: &Event| {}));
		div.append_child(&button).unwrap();

		let copy = div.deep_clone();

		assert_eq!(copy.to_html(), div.to_html());
		assert_eq!(copy.first_child().unwrap().listener_count("click"), 0);
		assert!(!copy.first_child().unwrap().ptr_eq(&button));
	}

	#[rstest]
	fn test_queries() {
		let root = Node::element("div");
		let inner = Node::element("span");
		inner.set_attribute("data-tendril-id", "3");
		root.append_child(&Node::comment("outlet:1")).unwrap();
		root.append_child(&inner).unwrap();

		assert!(root.find_by_attr("data-tendril-id", "3").unwrap().ptr_eq(&inner));
		assert!(root.find_comment("outlet:1").is_some());
		assert!(root.find_comment("outlet:2").is_none());
	}
}

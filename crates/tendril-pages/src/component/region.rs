//! Swappable DOM regions
//!
//! A region is the part of the tree between a `label:id` and a `/label:id`
//! comment. The content in between belongs to a branch scope, a child of the
//! scope owning the region. Swapping destroys the branch scope (which removes
//! its nodes), builds the next view under a fresh branch scope and inserts it
//! between the markers.

use std::cell::RefCell;
use std::rc::Rc;

use super::mount::Renderer;
use super::scope::{Scope, WeakScope};
use super::view::View;
use crate::context::{RenderContext, WeakRenderContext};
use crate::dom::Node;
use crate::hydration::is_hydrating;
use crate::ssr::markers::region_end;

pub(crate) struct Region {
	label: &'static str,
	id: u64,
	start: Node,
	end: RefCell<Option<Node>>,
	nodes: RefCell<Vec<Node>>,
	branch: RefCell<Option<Scope>>,
	owner: WeakScope,
	context: WeakRenderContext,
}

impl Region {
	/// Creates a region anchored at `start`.
	///
	/// Destroying `owner` removes both markers from the tree.
	pub(crate) fn new(
		label: &'static str,
		id: u64,
		start: Node,
		owner: &Scope,
		context: &RenderContext,
	) -> Rc<Self> {
		let region = Rc::new(Self {
			label,
			id,
			start,
			end: RefCell::new(None),
			nodes: RefCell::new(Vec::new()),
			branch: RefCell::new(None),
			owner: owner.downgrade(),
			context: context.downgrade(),
		});

		let weak = Rc::downgrade(&region);
		owner.track(move || {
			if let Some(region) = weak.upgrade() {
				region.start.remove();
				if let Some(end) = region.end.borrow().as_ref() {
					end.remove();
				}
			}
		});
		region
	}

	pub(crate) fn set_end(&self, end: Node) {
		*self.end.borrow_mut() = Some(end);
	}

	pub(crate) fn set_nodes(&self, nodes: Vec<Node>) {
		*self.nodes.borrow_mut() = nodes;
	}

	/// Creates the scope owning the next branch.
	///
	/// Destroying that scope removes whatever content the region holds.
	pub(crate) fn open_branch(self: &Rc<Self>) -> Scope {
		let scope = Scope::new(format!("{}:{}", self.label, self.id));
		if let Some(owner) = self.owner.upgrade() {
			owner.add_child(&scope);
		}

		let weak = Rc::downgrade(self);
		scope.track(move || {
			if let Some(region) = weak.upgrade() {
				let nodes = std::mem::take(&mut *region.nodes.borrow_mut());
				for node in nodes {
					node.remove();
				}
			}
		});

		*self.branch.borrow_mut() = Some(scope.clone());
		scope
	}

	/// Replaces the current content with the view returned by `build`.
	pub(crate) fn swap(self: &Rc<Self>, build: impl FnOnce() -> View) {
		let Some(context) = self.context.upgrade() else {
			tracing::debug!(
				target: "tendril::component",
				region = self.label,
				id = self.id,
				"render context dropped; region left unchanged"
			);
			return;
		};

		let previous = self.branch.borrow_mut().take();
		if let Some(previous) = previous {
			previous.destroy();
		}

		let scope = self.open_branch();
		// Observers fire outside any render, so the context is re-entered here
		let rendered = RenderContext::sync_scope(context.clone(), || {
			let view = context.with_scope(&scope, build);
			Renderer::new(context.clone(), false).render(view, &scope)
		});
		let nodes = match rendered {
			Ok(nodes) => nodes,
			Err(error) => {
				tracing::error!(
					target: "tendril::component",
					region = self.label,
					id = self.id,
					%error,
					"failed to render region content"
				);
				return;
			}
		};

		if let Some(parent) = self.start.parent() {
			let reference = self
				.end
				.borrow()
				.clone()
				.or_else(|| self.start.next_sibling());
			for node in &nodes {
				if let Err(error) = parent.insert_before(node, reference.as_ref()) {
					tracing::error!(
						target: "tendril::component",
						region = self.label,
						id = self.id,
						%error,
						"failed to insert region content"
					);
				}
			}
			if parent.is_connected() {
				scope.attach(&parent);
			}
		}

		self.set_nodes(nodes);
	}

	/// Makes sure the end marker exists, inserting it after the content.
	///
	/// While hydrating, a marker already present among the following
	/// siblings is reused.
	pub(crate) fn ensure_end(&self) {
		if self.end.borrow().is_some() {
			return;
		}
		let Some(parent) = self.start.parent() else {
			return;
		};
		let data = region_end(self.label, self.id);

		if is_hydrating() {
			let mut sibling = self.start.next_sibling();
			while let Some(node) = sibling {
				if node.comment_data().as_deref() == Some(data.as_str()) {
					self.set_end(node);
					return;
				}
				sibling = node.next_sibling();
			}
		}

		let end = Node::comment(data);
		let reference = match self.nodes.borrow().last() {
			Some(last) => last.next_sibling(),
			None => self.start.next_sibling(),
		};
		match parent.insert_before(&end, reference.as_ref()) {
			Ok(()) => self.set_end(end),
			Err(error) => tracing::error!(
				target: "tendril::component",
				region = self.label,
				id = self.id,
				%error,
				"failed to insert region end marker"
			),
		}
	}
}

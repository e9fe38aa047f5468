//! Conditional regions
//!
//! [`show`] renders one of two branches depending on a `Cell<bool>` and swaps
//! them whenever the cell changes. The branch lives between `show:N` and
//! `/show:N` comments so hydration can find it again.

use std::rc::Rc;

use tendril_reactive::Cell;

use super::mount::{Cursor, Hydrator, MountError, Renderer};
use super::region::Region;
use super::scope::Scope;
use super::view::{IntoView, View};
use crate::dom::Node;
use crate::hydration::HydrationError;
use crate::ssr::markers::{region_end, region_start};

const LABEL: &str = "show";

type Branch = Rc<dyn Fn() -> View>;

/// A region switching between two branches
pub struct ShowView {
	when: Cell<bool>,
	then: Branch,
	otherwise: Branch,
}

/// Shows the view built by `then` while `when` holds `true`.
///
/// # Example
///
/// ```
/// use tendril_pages::component::{ElementView, show};
/// use tendril_reactive::Cell;
///
/// let open = Cell::new(false);
/// let view = show(&open, || ElementView::new("p").child("open"))
///     .otherwise(|| "closed");
/// ```
pub fn show<V, F>(when: &Cell<bool>, then: F) -> ShowView
where
	V: IntoView,
	F: Fn() -> V + 'static,
{
	ShowView {
		when: when.clone(),
		then: Rc::new(move || then().into_view()),
		otherwise: Rc::new(View::empty),
	}
}

impl ShowView {
	/// Sets the view shown while the condition is `false`.
	pub fn otherwise<V, F>(mut self, otherwise: F) -> Self
	where
		V: IntoView,
		F: Fn() -> V + 'static,
	{
		self.otherwise = Rc::new(move || otherwise().into_view());
		self
	}

	fn branch(&self, flag: bool) -> Branch {
		if flag {
			Rc::clone(&self.then)
		} else {
			Rc::clone(&self.otherwise)
		}
	}

	/// Swaps branches whenever the condition changes.
	fn watch(&self, region: &Rc<Region>, owner: &Scope) {
		let region = Rc::clone(region);
		let then = Rc::clone(&self.then);
		let otherwise = Rc::clone(&self.otherwise);
		let subscription = self.when.observe(move |flag| {
			let branch = if *flag { Rc::clone(&then) } else { Rc::clone(&otherwise) };
			region.swap(move || branch());
		});
		owner.track(subscription);
	}
}

impl IntoView for ShowView {
	fn into_view(self) -> View {
		View::Show(self)
	}
}

pub(crate) fn render(renderer: &Renderer, show: ShowView, owner: &Scope) -> Result<Vec<Node>, MountError> {
	let context = renderer.context();
	let id = context.next_id();
	let start = Node::comment(region_start(LABEL, id));
	let end = Node::comment(region_end(LABEL, id));

	let region = Region::new(LABEL, id, start.clone(), owner, context);
	region.set_end(end.clone());

	let scope = region.open_branch();
	let branch = show.branch(show.when.get());
	let view = context.with_scope(&scope, || branch());
	let content = renderer.render(view, &scope)?;
	region.set_nodes(content.clone());
	show.watch(&region, owner);

	let mut nodes = Vec::with_capacity(content.len() + 2);
	nodes.push(start);
	nodes.extend(content);
	nodes.push(end);
	Ok(nodes)
}

pub(crate) fn hydrate(
	hydrator: &Hydrator<'_>,
	show: ShowView,
	owner: &Scope,
	cursor: &mut Cursor,
) -> Result<Vec<Node>, HydrationError> {
	let context = hydrator.context();
	let id = context.next_id();
	let start = hydrator.claim_region_start(cursor, &region_start(LABEL, id))?;
	let region = Region::new(LABEL, id, start.clone(), owner, context);

	let scope = region.open_branch();
	let branch = show.branch(show.when.get());
	let view = context.with_scope(&scope, || branch());
	let content = hydrator.hydrate(view, &scope, cursor)?;
	region.set_nodes(content.clone());

	let end = hydrator.claim_or_create_region_end(cursor, &region_end(LABEL, id))?;
	region.set_end(end.clone());
	show.watch(&region, owner);

	let mut nodes = Vec::with_capacity(content.len() + 2);
	nodes.push(start);
	nodes.extend(content);
	nodes.push(end);
	Ok(nodes)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{ElementView, component, mount};
	use crate::context::RenderContext;
	use rstest::rstest;
	use std::cell::RefCell;

	#[rstest]
	fn test_show_swaps_branches() {
		let document = Node::document();
		let root = Node::element("div");
		document.append_child(&root).unwrap();
		let open = Cell::new(false);
		let ctx = RenderContext::new();

		let _mounted = RenderContext::sync_scope(ctx.clone(), || {
			let open = open.clone();
			mount(&root, move || {
				show(&open, || ElementView::new("p").child("open")).otherwise(|| "closed")
			})
		})
		.unwrap();
		assert_eq!(root.inner_html(), "<!--show:0-->closed<!--/show:0-->");

		open.set(true);
		assert_eq!(root.inner_html(), "<!--show:0--><p>open</p><!--/show:0-->");

		open.set(false);
		assert_eq!(root.inner_html(), "<!--show:0-->closed<!--/show:0-->");
	}

	#[rstest]
	fn test_swapped_branch_scope_is_destroyed() {
		let root = Node::element("div");
		let open = Cell::new(true);
		let destroyed = Rc::new(RefCell::new(0));
		let ctx = RenderContext::new();

		let _mounted = RenderContext::sync_scope(ctx.clone(), || {
			let open = open.clone();
			let destroyed = destroyed.clone();
			mount(&root, move || {
				show(&open, move || {
					let destroyed = destroyed.clone();
					component("Panel", move |scope| {
						scope.track(move || *destroyed.borrow_mut() += 1);
						ElementView::new("section")
					})
				})
			})
		})
		.unwrap();

		open.set(false);

		assert_eq!(*destroyed.borrow(), 1);
		assert_eq!(root.inner_html(), "<!--show:0--><!--/show:0-->");
	}

	#[rstest]
	fn test_unmount_releases_condition() {
		let root = Node::element("div");
		let open = Cell::new(true);
		let ctx = RenderContext::new();

		let mounted = RenderContext::sync_scope(ctx, || {
			let open = open.clone();
			mount(&root, move || show(&open, || "on"))
		})
		.unwrap();
		assert_eq!(open.observer_count(), 1);

		mounted.unmount();

		assert_eq!(open.observer_count(), 0);
		assert_eq!(root.child_count(), 0);
	}
}

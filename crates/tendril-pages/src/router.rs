//! Path-driven outlet
//!
//! An [`outlet`] renders the first [`Route`] whose matcher accepts the render
//! context's navigation path and swaps content when the path changes.
//!
//! The outlet emits an `outlet:N` comment before its content. The closing
//! `/outlet:N` comment is inserted once the outlet is attached to a live
//! tree; during hydration a closing comment left by the server is reused.
//!
//! ## Example
//!
//! ```
//! use tendril_pages::component::mount;
//! use tendril_pages::context::RenderContext;
//! use tendril_pages::dom::Node;
//! use tendril_pages::router::{Route, outlet};
//!
//! let document = Node::document();
//! let root = Node::element("main");
//! document.append_child(&root).unwrap();
//!
//! let ctx = RenderContext::new();
//! RenderContext::sync_scope(ctx.clone(), || {
//!     mount(&root, || {
//!         outlet([
//!             Route::new("/", || "home"),
//!             Route::new("/about", || "about"),
//!         ])
//!     })
//! })
//! .unwrap();
//! assert_eq!(root.inner_html(), "<!--outlet:0-->home<!--/outlet:0-->");
//!
//! ctx.navigate("/about");
//! assert_eq!(root.inner_html(), "<!--outlet:0-->about<!--/outlet:0-->");
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{Cursor, Hydrator, IntoView, MountError, Region, Renderer, Scope, View};
use crate::context::RenderContext;
use crate::dom::Node;
use crate::hydration::HydrationError;
use crate::ssr::markers::{region_end, region_start};

const LABEL: &str = "outlet";

type Builder = Rc<dyn Fn() -> View>;

/// Decides whether a route accepts a path
pub trait PathMatcher {
	/// Whether `path` selects the route.
	fn matches(&self, path: &str) -> bool;
}

impl PathMatcher for String {
	fn matches(&self, path: &str) -> bool {
		self == path
	}
}

impl PathMatcher for &'static str {
	fn matches(&self, path: &str) -> bool {
		*self == path
	}
}

/// A matcher paired with the view it selects
pub struct Route {
	matcher: Box<dyn PathMatcher>,
	build: Builder,
}

impl Route {
	/// Creates a route.
	pub fn new<M, V, F>(matcher: M, build: F) -> Self
	where
		M: PathMatcher + 'static,
		V: IntoView,
		F: Fn() -> V + 'static,
	{
		Self {
			matcher: Box::new(matcher),
			build: Rc::new(move || build().into_view()),
		}
	}

	/// Whether this route accepts `path`.
	pub fn matches(&self, path: &str) -> bool {
		self.matcher.matches(path)
	}
}

struct RouteTable {
	routes: Vec<Route>,
	fallback: Option<Builder>,
}

impl RouteTable {
	/// Index of the first matching route; `None` selects the fallback.
	fn resolve(&self, path: &str) -> Option<usize> {
		self.routes.iter().position(|route| route.matches(path))
	}

	fn build(&self, selected: Option<usize>) -> View {
		let builder = match selected {
			Some(index) => self.routes.get(index).map(|route| &route.build),
			None => self.fallback.as_ref(),
		};
		builder.map_or(View::Empty, |build| build())
	}
}

/// A region showing the route matching the current path
pub struct OutletView {
	table: RouteTable,
}

/// Creates an outlet over `routes`, tried in order.
pub fn outlet(routes: impl IntoIterator<Item = Route>) -> OutletView {
	OutletView {
		table: RouteTable {
			routes: routes.into_iter().collect(),
			fallback: None,
		},
	}
}

impl OutletView {
	/// Sets the view shown when no route matches.
	pub fn fallback<V, F>(mut self, build: F) -> Self
	where
		V: IntoView,
		F: Fn() -> V + 'static,
	{
		self.table.fallback = Some(Rc::new(move || build().into_view()));
		self
	}

	/// Number of routes.
	pub fn route_count(&self) -> usize {
		self.table.routes.len()
	}
}

impl IntoView for OutletView {
	fn into_view(self) -> View {
		View::Outlet(self)
	}
}

/// Swaps content on navigation and closes the region once attached.
fn follow(context: &RenderContext, table: RouteTable, region: &Rc<Region>, selected: Option<usize>, owner: &Scope) {
	let attached = Rc::clone(region);
	owner.on_attached(move |_| attached.ensure_end());

	let table = Rc::new(table);
	let region = Rc::clone(region);
	let current = RefCell::new(selected);
	let subscription = context.path_cell().observe(move |path| {
		let next = table.resolve(path);
		if current.replace(next) == next {
			return;
		}
		tracing::debug!(target: "tendril::component", %path, route = ?next, "outlet route changed");
		let table = Rc::clone(&table);
		region.swap(move || table.build(next));
	});
	owner.track(subscription);
}

pub(crate) fn render_outlet(
	renderer: &Renderer,
	outlet: OutletView,
	owner: &Scope,
) -> Result<Vec<Node>, MountError> {
	let context = renderer.context();
	let id = context.next_id();
	let start = Node::comment(region_start(LABEL, id));
	let region = Region::new(LABEL, id, start.clone(), owner, context);

	let selected = outlet.table.resolve(&context.path());
	let scope = region.open_branch();
	let view = context.with_scope(&scope, || outlet.table.build(selected));
	let content = renderer.render(view, &scope)?;
	region.set_nodes(content.clone());
	follow(context, outlet.table, &region, selected, owner);

	let mut nodes = Vec::with_capacity(content.len() + 1);
	nodes.push(start);
	nodes.extend(content);
	Ok(nodes)
}

pub(crate) fn hydrate_outlet(
	hydrator: &Hydrator<'_>,
	outlet: OutletView,
	owner: &Scope,
	cursor: &mut Cursor,
) -> Result<Vec<Node>, HydrationError> {
	let context = hydrator.context();
	let id = context.next_id();
	let start = hydrator.claim_region_start(cursor, &region_start(LABEL, id))?;
	let region = Region::new(LABEL, id, start.clone(), owner, context);

	let selected = outlet.table.resolve(&context.path());
	let scope = region.open_branch();
	let view = context.with_scope(&scope, || outlet.table.build(selected));
	let content = hydrator.hydrate(view, &scope, cursor)?;
	region.set_nodes(content.clone());

	let mut nodes = Vec::with_capacity(content.len() + 2);
	nodes.push(start);
	nodes.extend(content);
	if let Some(end) = hydrator.claim_region_end(cursor, &region_end(LABEL, id)) {
		region.set_end(end.clone());
		nodes.push(end);
	}
	follow(context, outlet.table, &region, selected, owner);
	Ok(nodes)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::mount;
	use rstest::rstest;

	#[rstest]
	#[case("/", Some(0))]
	#[case("/users", Some(1))]
	#[case("/users/", None)]
	fn test_exact_matching(#[case] path: &str, #[case] expected: Option<usize>) {
		let table = outlet([Route::new("/", || "home"), Route::new(String::from("/users"), || "users")]).table;
		assert_eq!(table.resolve(path), expected);
	}

	#[rstest]
	fn test_end_marker_waits_for_attach() {
		let root = Node::element("main");
		let ctx = RenderContext::new();

		let mounted = RenderContext::sync_scope(ctx.clone(), || {
			mount(&root, || outlet([Route::new("/", || "home")]))
		})
		.unwrap();
		assert_eq!(root.inner_html(), "<!--outlet:0-->home");

		let document = Node::document();
		document.append_child(&root).unwrap();
		mounted.scope().attach(&root);

		assert_eq!(root.inner_html(), "<!--outlet:0-->home<!--/outlet:0-->");
	}

	#[rstest]
	fn test_fallback_and_navigation() {
		let document = Node::document();
		let root = Node::element("main");
		document.append_child(&root).unwrap();
		let ctx = RenderContext::new();
		ctx.navigate("/missing");

		let _mounted = RenderContext::sync_scope(ctx.clone(), || {
			mount(&root, || {
				outlet([Route::new("/", || "home")]).fallback(|| "not found")
			})
		})
		.unwrap();
		assert_eq!(root.inner_html(), "<!--outlet:0-->not found<!--/outlet:0-->");

		ctx.navigate("/");
		assert_eq!(root.inner_html(), "<!--outlet:0-->home<!--/outlet:0-->");

		ctx.navigate("/elsewhere");
		assert_eq!(root.inner_html(), "<!--outlet:0-->not found<!--/outlet:0-->");
	}

	#[rstest]
	fn test_same_route_does_not_rebuild() {
		let document = Node::document();
		let root = Node::element("main");
		document.append_child(&root).unwrap();
		let ctx = RenderContext::new();
		let builds = Rc::new(RefCell::new(0));

		let _mounted = RenderContext::sync_scope(ctx.clone(), || {
			let builds = builds.clone();
			mount(&root, move || {
				outlet([]).fallback(move || {
					*builds.borrow_mut() += 1;
					"anything"
				})
			})
		})
		.unwrap();

		ctx.navigate("/a");
		ctx.navigate("/b");

		assert_eq!(*builds.borrow(), 1);
	}
}

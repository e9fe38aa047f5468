//! View tree and the IntoView trait.

use std::borrow::Cow;
use std::fmt::Display;
use std::rc::Rc;

use tendril_reactive::{Cell, CellId, IntoCleanup, Subscription};

use super::scope::Scope;
use super::show::ShowView;
use crate::binding::bind_property;
use crate::context::{ContextError, RenderContext};
use crate::dom::{Event, EventHandler, Node};
use crate::router::OutletView;

/// A unified representation of renderable content.
///
/// `View` is a closed set of node shapes. Mounting and hydration match on it
/// instead of inspecting values at runtime.
pub enum View {
	/// A DOM element.
	Element(ElementView),
	/// A static text node.
	Text(Cow<'static, str>),
	/// Several views without a wrapper element.
	Fragment(Vec<View>),
	/// A constructed component and its scope.
	Component(ComponentView),
	/// A region showing one of two branches depending on a cell.
	Show(ShowView),
	/// A region showing the route matching the current path.
	Outlet(OutletView),
	/// Renders nothing.
	Empty,
}

impl View {
	/// Creates an element view.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> ElementView {
		ElementView::new(tag)
	}

	/// Creates a text view.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment view.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoView>) -> Self {
		Self::Fragment(children.into_iter().map(IntoView::into_view).collect())
	}

	/// Creates an empty view.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Short name of the variant, used in diagnostics.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Element(_) => "element",
			Self::Text(_) => "text",
			Self::Fragment(_) => "fragment",
			Self::Component(_) => "component",
			Self::Show(_) => "show",
			Self::Outlet(_) => "outlet",
			Self::Empty => "empty",
		}
	}
}

impl std::fmt::Debug for View {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Element(el) => f.debug_tuple("Element").field(el).finish(),
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
			Self::Component(c) => f.debug_tuple("Component").field(&c.name).finish(),
			Self::Show(_) => f.write_str("Show"),
			Self::Outlet(_) => f.write_str("Outlet"),
			Self::Empty => f.write_str("Empty"),
		}
	}
}

/// A cell bound to a property of the element it is declared on
pub(crate) struct PropertyBinding {
	pub(crate) prop: String,
	pub(crate) cell: CellId,
	pub(crate) attach: Rc<dyn Fn(&Node) -> Subscription>,
}

/// Represents a DOM element in the view tree.
pub struct ElementView {
	pub(crate) tag: Cow<'static, str>,
	pub(crate) attrs: Vec<(Cow<'static, str>, Cow<'static, str>)>,
	pub(crate) children: Vec<View>,
	pub(crate) bindings: Vec<PropertyBinding>,
	pub(crate) listeners: Vec<(Cow<'static, str>, EventHandler)>,
}

impl std::fmt::Debug for ElementView {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ElementView")
			.field("tag", &self.tag)
			.field("attrs", &self.attrs)
			.field("children", &self.children)
			.field(
				"bindings",
				&self.bindings.iter().map(|b| &b.prop).collect::<Vec<_>>(),
			)
			.field("listeners_count", &self.listeners.len())
			.finish()
	}
}

impl ElementView {
	/// Creates a new element view.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		Self {
			tag: tag.into(),
			attrs: Vec::new(),
			children: Vec::new(),
			bindings: Vec::new(),
			listeners: Vec::new(),
		}
	}

	/// Adds a static attribute.
	pub fn attr(
		mut self,
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Adds a child view.
	pub fn child(mut self, child: impl IntoView) -> Self {
		self.children.push(child.into_view());
		self
	}

	/// Adds multiple child views.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoView>) -> Self {
		self.children
			.extend(children.into_iter().map(IntoView::into_view));
		self
	}

	/// Binds `cell` to the element property `prop`.
	///
	/// See [`apply_property`](crate::binding::apply_property) for how
	/// property names map onto the element.
	pub fn bind<T>(mut self, prop: impl Into<String>, cell: &Cell<T>) -> Self
	where
		T: Display + Clone + 'static,
	{
		let prop = prop.into();
		let source = cell.clone();
		let bound_prop = prop.clone();
		self.bindings.push(PropertyBinding {
			prop,
			cell: cell.id(),
			attach: Rc::new(move |node: &Node| bind_property(&source, node, &bound_prop)),
		});
		self
	}

	/// Binds `cell` to the text content of the element.
	pub fn bind_text<T>(self, cell: &Cell<T>) -> Self
	where
		T: Display + Clone + 'static,
	{
		self.bind("textContent", cell)
	}

	/// Adds an event listener.
	pub fn on<F>(mut self, event_type: impl Into<Cow<'static, str>>, handler: F) -> Self
	where
		F: Fn(&Event) + 'static,
	{
		self.listeners.push((event_type.into(), Rc::new(handler)));
		self
	}

	/// Returns the tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Returns the static attributes.
	pub fn attrs(&self) -> &[(Cow<'static, str>, Cow<'static, str>)] {
		&self.attrs
	}

	/// Returns the child views.
	pub fn child_views(&self) -> &[View] {
		&self.children
	}

	/// Names of the bound properties, in declaration order.
	pub fn bound_props(&self) -> Vec<&str> {
		self.bindings.iter().map(|b| b.prop.as_str()).collect()
	}

	/// Number of event listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}
}

/// A constructed component
pub struct ComponentView {
	pub(crate) name: Cow<'static, str>,
	pub(crate) scope: Scope,
	pub(crate) body: Box<View>,
}

impl ComponentView {
	/// The component name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The scope created for this component.
	pub fn scope(&self) -> &Scope {
		&self.scope
	}
}

/// Conversion into a [`View`]
pub trait IntoView {
	/// Converts `self` into a view.
	fn into_view(self) -> View;
}

impl IntoView for View {
	fn into_view(self) -> View {
		self
	}
}

impl IntoView for ElementView {
	fn into_view(self) -> View {
		View::Element(self)
	}
}

impl IntoView for ComponentView {
	fn into_view(self) -> View {
		View::Component(self)
	}
}

impl IntoView for &'static str {
	fn into_view(self) -> View {
		View::Text(Cow::Borrowed(self))
	}
}

impl IntoView for String {
	fn into_view(self) -> View {
		View::Text(Cow::Owned(self))
	}
}

impl IntoView for Cow<'static, str> {
	fn into_view(self) -> View {
		View::Text(self)
	}
}

impl IntoView for () {
	fn into_view(self) -> View {
		View::Empty
	}
}

impl<V: IntoView> IntoView for Option<V> {
	fn into_view(self) -> View {
		self.map_or(View::Empty, IntoView::into_view)
	}
}

impl<V: IntoView> IntoView for Vec<V> {
	fn into_view(self) -> View {
		View::Fragment(self.into_iter().map(IntoView::into_view).collect())
	}
}

/// Constructs a component under a fresh [`Scope`].
///
/// The scope becomes a child of the component currently being constructed,
/// if any, and stays on the construction stack while `build` runs, so
/// components built inside `build` link to it in turn.
///
/// # Example
///
/// ```
/// use tendril_pages::component::{ElementView, component};
/// use tendril_pages::context::RenderContext;
/// use tendril_reactive::Cell;
///
/// RenderContext::sync_scope(RenderContext::new(), || {
///     let view = component("Counter", |scope| {
///         let count = Cell::new(0);
///         scope.track(|| println!("counter destroyed"));
///         ElementView::new("span").bind_text(&count)
///     });
///     assert_eq!(view.kind_name(), "component");
/// });
/// ```
pub fn component<V, F>(name: impl Into<Cow<'static, str>>, build: F) -> View
where
	V: IntoView,
	F: FnOnce(&Scope) -> V,
{
	let name = name.into();
	let scope = Scope::new(name.clone());

	let body = match RenderContext::try_current() {
		Some(ctx) => {
			if let Some(parent) = ctx.current_scope() {
				parent.add_child(&scope);
			}
			ctx.with_scope(&scope, || build(&scope).into_view())
		}
		None => {
			tracing::warn!(
				target: "tendril::component",
				component = %name,
				"component constructed outside a render context; nested components will not be linked to it"
			);
			build(&scope).into_view()
		}
	};

	View::Component(ComponentView {
		name,
		scope,
		body: Box::new(body),
	})
}

/// The scope of the component currently being constructed.
pub fn current_scope() -> Result<Scope, ContextError> {
	RenderContext::current("current_scope")?
		.current_scope()
		.ok_or(ContextError::NoActiveScope {
			operation: "current_scope",
		})
}

/// Registers a cleanup on the component currently being constructed.
pub fn on_cleanup(cleanup: impl IntoCleanup) -> Result<(), ContextError> {
	let scope = RenderContext::current("on_cleanup")?
		.current_scope()
		.ok_or(ContextError::NoActiveScope {
			operation: "on_cleanup",
		})?;
	scope.track(cleanup);
	Ok(())
}

/// Registers an attach callback on the component currently being constructed.
pub fn on_attached<F>(callback: F) -> Result<(), ContextError>
where
	F: FnOnce(&Node) + 'static,
{
	let scope = RenderContext::current("on_attached")?
		.current_scope()
		.ok_or(ContextError::NoActiveScope {
			operation: "on_attached",
		})?;
	scope.on_attached(callback);
	Ok(())
}

/// Trait for reusable UI components.
///
/// # Example
///
/// ```ignore
/// use tendril_pages::component::{Component, ElementView, IntoView, Scope, View};
///
/// struct Greeting {
///     name: String,
/// }
///
/// impl Component for Greeting {
///     fn render(&self, _scope: &Scope) -> View {
///         ElementView::new("p")
///             .attr("class", "greeting")
///             .child(format!("Hello, {}!", self.name))
///             .into_view()
///     }
///
///     fn name() -> &'static str {
///         "Greeting"
///     }
/// }
///
/// let view = Greeting { name: "World".into() }.into_component();
/// ```
pub trait Component: 'static {
	/// Renders the component into a view.
	fn render(&self, scope: &Scope) -> View;

	/// Returns the component's name for debugging.
	fn name() -> &'static str
	where
		Self: Sized;

	/// Constructs the component under its own scope.
	fn into_component(self) -> View
	where
		Self: Sized,
	{
		component(Self::name(), move |scope| self.render(scope))
	}
}

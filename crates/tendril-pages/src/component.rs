//! Component system
//!
//! Components are plain functions run under their own [`Scope`]. The view they
//! return is mounted into the DOM by [`mount`] on the client, by the server
//! renderer, or claimed from server markup by hydration.
//!
//! ## Features
//!
//! - **Scopes**: nested lifecycle containers, destroyed children first
//! - **Views**: a closed [`View`] enum with elements, text, fragments,
//!   components and reactive regions
//! - **Bindings**: cells bound to element properties with [`ElementView::bind`]
//! - **Regions**: [`show`] for conditional content, [`outlet`](crate::router::outlet)
//!   for routed content
//!
//! ## Example
//!
//! ```
//! use tendril_pages::component::{ElementView, component};
//! use tendril_pages::context::RenderContext;
//! use tendril_reactive::Cell;
//!
//! fn counter() -> tendril_pages::component::View {
//!     component("Counter", |_scope| {
//!         let count = Cell::hydratable(0_i64);
//!         let increment = count.clone();
//!         ElementView::new("button")
//!             .bind_text(&count)
//!             .on("click", move |_| increment.update(|n| n + 1))
//!     })
//! }
//!
//! RenderContext::sync_scope(RenderContext::new(), || {
//!     let view = counter();
//!     assert_eq!(view.kind_name(), "component");
//! });
//! ```

mod mount;
mod region;
mod scope;
mod show;
mod view;

pub use mount::{MountError, Mounted, mount};
pub use scope::{Scope, WeakScope};
pub use show::{ShowView, show};
pub use view::{
	Component, ComponentView, ElementView, IntoView, View, component, current_scope, on_attached,
	on_cleanup,
};

pub(crate) use mount::{Cursor, Hydrator, Renderer};
pub(crate) use region::Region;

//! Tendril Pages - Components, Server Rendering and Hydration
//!
//! Builds user interfaces out of `tendril-reactive` cells, renders them to HTML
//! on the server and makes that HTML interactive again on the client.
//!
//! ## Features
//!
//! - **Components**: functions run under a lifecycle [`Scope`] that releases
//!   every binding, listener and child component on unmount
//! - **Per-request isolation**: all rendering state lives in a
//!   [`RenderContext`]; concurrent renders never share ids or cells
//! - **Hybrid Rendering**: SSR with a serialized hydration payload, then
//!   client-side hydration that claims the existing DOM
//! - **Verified replay**: hydration checks the creation trace, marker ids and
//!   bindings and fails loudly on divergence
//!
//! ## Architecture
//!
//! - [`dom`]: the in-memory DOM everything renders into
//! - [`context`]: the per-request render context and cell working set
//! - [`component`]: scopes, views, mounting and conditional regions
//! - [`binding`]: cell to property bindings and their descriptors
//! - [`router`]: path-driven outlets
//! - [`ssr`]: server rendering and hydration capture
//! - [`hydration`]: client-side hydration replay
//!
//! ## Example
//!
//! ```
//! use tendril_pages::component::{ElementView, View, component};
//! use tendril_pages::dom::Node;
//! use tendril_pages::hydration::{HydrationOptions, hydrate};
//! use tendril_pages::ssr::{HydrationPayload, SsrRenderer};
//! use tendril_reactive::Cell;
//!
//! fn greeting() -> View {
//!     component("Greeting", |_| {
//!         let name = Cell::hydratable(String::from("world"));
//!         let shout = name.derive(|n| n.to_uppercase());
//!         ElementView::new("p").bind_text(&shout)
//!     })
//! }
//!
//! // Server
//! let renderer = SsrRenderer::new();
//! let output = renderer.render(greeting).unwrap();
//! let page = renderer.wrap_in_html(&output).unwrap();
//!
//! // Client
//! let payload = HydrationPayload::from_html(&page).unwrap();
//! let document = Node::document();
//! let root = output.container.deep_clone();
//! document.append_child(&root).unwrap();
//! hydrate(&payload, &root, HydrationOptions::new(), greeting).unwrap();
//!
//! assert_eq!(root.inner_html(), r#"<p data-tendril-id="0">WORLD</p>"#);
//! ```

#![warn(missing_docs)]

pub mod binding;
pub mod component;
pub mod context;
pub mod dom;
pub mod hydration;
pub mod router;
pub mod ssr;

pub use binding::BindingDescriptor;
pub use component::{
	Component, ElementView, IntoView, MountError, Mounted, Scope, View, component, mount, show,
};
pub use context::{ContextError, RenderContext};
pub use dom::Node;
pub use hydration::{HydrationError, HydrationOptions, hydrate};
pub use router::{PathMatcher, Route, outlet};
pub use ssr::{HydrationPayload, SsrError, SsrOptions, SsrOutput, SsrRenderer};

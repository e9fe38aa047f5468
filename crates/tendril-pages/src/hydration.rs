//! Client-side hydration
//!
//! Hydration makes server-rendered markup interactive without rebuilding it.
//! The client runs the same construction code as the server; because both
//! create cells in the same order, a cell's position in the creation order
//! identifies it on both sides. Captured values are replayed by position,
//! and the DOM is claimed node by node while the view is walked.
//!
//! ## Safety nets
//!
//! Positional correlation breaks silently when the two executions diverge,
//! so a hydration fails loudly instead when
//!
//! - the number of created cells or the graph signature differs
//!   ([`HydrationError::TraceMismatch`])
//! - a cell has a different kind than on the server
//!   ([`HydrationError::KindMismatch`])
//! - a captured value does not deserialize into the cell's type
//!   ([`HydrationError::SeedRejected`])
//! - the DOM, a marker id or an element's bindings do not match the view
//!
//! ## Example
//!
//! ```
//! use tendril_pages::component::{ElementView, component};
//! use tendril_pages::dom::Node;
//! use tendril_pages::hydration::{HydrationOptions, hydrate};
//! use tendril_pages::ssr::SsrRenderer;
//! use tendril_reactive::Cell;
//!
//! fn app() -> tendril_pages::component::View {
//!     component("Counter", |_| {
//!         let count = Cell::hydratable(0_i64);
//!         let increment = count.clone();
//!         ElementView::new("button")
//!             .bind_text(&count)
//!             .on("click", move |_| increment.update(|n| n + 1))
//!     })
//! }
//!
//! let output = SsrRenderer::new().render(app).unwrap();
//!
//! let document = Node::document();
//! let root = output.container.deep_clone();
//! document.append_child(&root).unwrap();
//!
//! let _mounted = hydrate(&output.payload, &root, HydrationOptions::new(), app).unwrap();
//! root.first_child().unwrap().dispatch_event("click");
//! assert_eq!(root.inner_html(), r#"<button data-tendril-id="0">1</button>"#);
//! ```

mod runtime;
mod state;

pub use runtime::{HydrationError, HydrationOptions, hydrate, hydrate_from_html};
pub use state::{is_hydrating, is_hydration_complete, on_hydration_complete};

//! Server-Side Rendering (SSR) support.
//!
//! A server render builds the view inside a fresh [`RenderContext`](crate::context::RenderContext),
//! mounts it into an in-memory element and captures everything the client
//! needs to hydrate the resulting markup.
//!
//! ## Features
//!
//! - **Markers**: bound elements carry `data-tendril-id`, regions are
//!   delimited by comments
//! - **Capture**: hydratable root values, the graph shape and the binding
//!   descriptors are serialized into a [`HydrationPayload`]
//! - **Isolation**: every render has its own context, so interleaved async
//!   renders never share counters or cells
//!
//! ## Example
//!
//! ```
//! use tendril_pages::component::{ElementView, component};
//! use tendril_pages::ssr::{HydrationPayload, SsrOptions, SsrRenderer};
//! use tendril_reactive::Cell;
//!
//! let renderer = SsrRenderer::with_options(SsrOptions::new().title("Counter"));
//! let page = renderer
//!     .render_page(|| {
//!         component("Counter", |_| {
//!             let count = Cell::hydratable(0_i64);
//!             ElementView::new("button").bind_text(&count)
//!         })
//!     })
//!     .unwrap();
//!
//! let payload = HydrationPayload::from_html(&page).unwrap();
//! assert_eq!(payload.graph.nodes.len(), 1);
//! ```

pub mod capture;
pub mod markers;
pub mod payload;
pub mod renderer;

pub use capture::{capture, capture_current};
pub use markers::{HYDRATION_ATTR_ID, PAYLOAD_SCRIPT_ID, RegionMarker};
pub use payload::{GraphNode, GraphSnapshot, HydrationPayload, PayloadError};
pub use renderer::{SsrError, SsrOptions, SsrOutput, SsrRenderer};

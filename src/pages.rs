//! Components, server rendering and hydration
//!
//! This module provides access to `tendril-pages`.
//!
//! ## Example
//!
//! ```
//! use tendril::pages::{ElementView, SsrRenderer, View, component};
//! use tendril::Cell;
//!
//! fn hello() -> View {
//!     component("Hello", |_| {
//!         let name = Cell::hydratable(String::from("tendril"));
//!         ElementView::new("h1").bind_text(&name)
//!     })
//! }
//!
//! let output = SsrRenderer::new().render(hello).unwrap();
//! assert_eq!(output.html, r#"<h1 data-tendril-id="0">tendril</h1>"#);
//! assert_eq!(output.payload.observables[&0], serde_json::json!("tendril"));
//! ```

pub use tendril_pages::*;

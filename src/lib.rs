//! # Tendril
//!
//! Fine-grained reactive cells for Rust user interfaces, with server-side
//! rendering and client-side hydration.
//!
//! ## Feature Flags
//!
//! - `pages` (default) - components, server rendering and hydration
//!   (via `tendril-pages`)
//!
//! Without `pages` only the reactive core is available.
//!
//! ## Quick Example
//!
//! ```
//! use tendril::prelude::*;
//!
//! let count = Cell::new(2);
//! let doubled = count.derive(|n| n * 2);
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub use tendril_reactive::{
	Cell, CellId, NodeKind, SameValue, Source, Subscription, current_tracker, with_tracker,
};

#[cfg(feature = "pages")]
pub mod pages;

/// Commonly used types.
pub mod prelude {
	pub use crate::{Cell, SameValue, Subscription};

	#[cfg(feature = "pages")]
	pub use crate::pages::{
		Component, ElementView, HydrationOptions, IntoView, Scope, SsrRenderer, View, component,
		hydrate, mount, outlet, show,
	};
}

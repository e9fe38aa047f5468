//! Tendril Reactive - Synchronous Push-Based Cells
//!
//! The reactive core of tendril. It has no knowledge of the DOM, of rendering
//! or of hydration; those live in `tendril-pages` and plug in through the
//! [`tracker`] hook.
//!
//! ## Features
//!
//! - **Cells**: [`Cell<T>`] holds a value and notifies observers on change
//! - **Strict identity**: writes are compared with [`SameValue`], so `NaN`
//!   over `NaN` is silent and `-0.0` over `+0.0` is a change
//! - **Derivation**: [`Cell::derive`] and [`Cell::computed`] build derived
//!   cells that are consistent as soon as the triggering `set` returns
//! - **Explicit teardown**: every registration returns a [`Subscription`];
//!   [`Cell::destroy`] releases observers, links and cleanups
//!
//! ## Architecture
//!
//! - [`cell`]: the cell type, reads, writes, observation and teardown
//! - [`derive`](mod@derive): derived cells and the [`Source`] trait
//! - [`same_value`]: the change-detection rule
//! - [`subscription`]: unsubscribe handles and cleanup execution
//! - [`tracker`]: the hook through which a render context sees cells being created
//! - [`node`]: cell identifiers and node kinds
//!
//! ## Example
//!
//! ```
//! use tendril_reactive::Cell;
//!
//! let first = Cell::new(String::from("Ada"));
//! let last = Cell::new(String::from("Lovelace"));
//!
//! let (f, l) = (first.clone(), last.clone());
//! let full = Cell::computed(move || format!("{} {}", f.get(), l.get()), &[&first, &last]);
//! let shout = full.derive(|name| name.to_uppercase());
//!
//! first.set(String::from("Augusta"));
//! assert_eq!(shout.get(), "AUGUSTA LOVELACE");
//! ```

#![warn(missing_docs)]

pub mod cell;
pub mod derive;
pub mod node;
pub mod same_value;
pub mod subscription;
pub mod tracker;

pub use cell::Cell;
pub use derive::Source;
pub use node::{CellId, NodeKind};
pub use same_value::SameValue;
pub use subscription::{Cleanup, IntoCleanup, Subscription, run_cleanups};
pub use tracker::{
	CellDescriptor, CreationTracker, TrackedCell, TrackerLookup, current_tracker,
	set_tracker_lookup, with_tracker,
};

//! Node identity and kinds
//!
//! Every reactive cell receives a process-wide [`CellId`] at construction.
//! [`NodeKind`] is the closed set of node shapes the rest of the framework
//! pattern-matches on instead of probing values for their shape.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a reactive cell
///
/// Identifiers are ordinals assigned from a process-wide counter, so they are
/// unique across threads and render contexts. They are *not* the positional
/// ids used in hydration payloads; those are assigned per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

impl CellId {
	/// Allocate the next unique identifier
	pub fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	/// The raw ordinal value
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for CellId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "cell#{}", self.0)
	}
}

/// Kind of node in the reactive/view graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
	/// A cell holding genuine input state
	RootCell,
	/// A cell whose value is a function of other cells
	DerivedCell,
	/// A constructed component owning a scope
	Component,
	/// A DOM text node
	Text,
}

impl NodeKind {
	/// Whether this node is a reactive cell of either kind
	pub fn is_cell(self) -> bool {
		matches!(self, Self::RootCell | Self::DerivedCell)
	}

	/// Stable short tag used when fingerprinting a creation trace
	pub fn tag(self) -> &'static str {
		match self {
			Self::RootCell => "root",
			Self::DerivedCell => "derived",
			Self::Component => "component",
			Self::Text => "text",
		}
	}
}

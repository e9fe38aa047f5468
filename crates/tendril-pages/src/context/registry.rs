//! Per-context cell working set
//!
//! While recording, every cell created inside the owning render context is
//! appended here in creation order. A cell's index in this list is its
//! positional id: the only identity shared by the server and the client,
//! which run independent executions of the same construction code.
//!
//! During hydration the registry also answers seed requests from the
//! payload and compares the client's creation sequence with the server's.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tendril_reactive::{CellDescriptor, CellId, CreationTracker, NodeKind, TrackedCell};

use crate::binding::BindingDescriptor;

/// A cell recorded in the working set
#[derive(Clone)]
pub struct RecordedCell {
	/// Positional id within the working set
	pub position: u64,
	/// Description captured at construction
	pub descriptor: CellDescriptor,
	/// Live handle used to snapshot the value
	pub handle: Rc<dyn TrackedCell>,
}

/// Difference noticed while replaying a server trace on the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayIssue {
	/// A seed value did not deserialize into the cell's type
	SeedRejected {
		/// Positional id of the cell
		position: u64,
		/// Deserialization error
		reason: String,
	},
	/// The cell at this position has a different kind than on the server
	KindMismatch {
		/// Positional id of the cell
		position: u64,
		/// Kind recorded by the server
		expected: NodeKind,
		/// Kind created by the client
		found: NodeKind,
	},
	/// The client created more cells than the server did
	UnexpectedCell {
		/// Positional id of the extra cell
		position: u64,
	},
}

#[derive(Default)]
struct Replay {
	seeds: BTreeMap<u64, serde_json::Value>,
	kinds: Vec<NodeKind>,
	issues: Vec<ReplayIssue>,
}

/// Working set of cells and binding records for one render context
#[derive(Default)]
pub struct CellRegistry {
	recording: RefCell<bool>,
	cells: RefCell<Vec<RecordedCell>>,
	positions: RefCell<HashMap<CellId, u64>>,
	bindings: RefCell<BTreeMap<u64, Vec<BindingDescriptor>>>,
	replay: RefCell<Option<Replay>>,
}

impl CellRegistry {
	/// Creates an empty registry.
	pub fn new(recording: bool) -> Self {
		Self {
			recording: RefCell::new(recording),
			..Self::default()
		}
	}

	/// Whether newly created cells are recorded.
	pub fn is_recording(&self) -> bool {
		*self.recording.borrow()
	}

	/// Turns recording on or off.
	pub fn set_recording(&self, recording: bool) {
		*self.recording.borrow_mut() = recording;
	}

	/// Number of recorded cells.
	pub fn len(&self) -> usize {
		self.cells.borrow().len()
	}

	/// Whether no cell has been recorded.
	pub fn is_empty(&self) -> bool {
		self.cells.borrow().is_empty()
	}

	/// Positional id of a recorded cell.
	pub fn position_of(&self, id: CellId) -> Option<u64> {
		self.positions.borrow().get(&id).copied()
	}

	/// Recorded cells in creation order.
	pub fn cells(&self) -> Vec<RecordedCell> {
		self.cells.borrow().clone()
	}

	/// Records a binding of a cell onto the element carrying `marker`.
	pub fn record_binding(&self, marker: u64, descriptor: BindingDescriptor) {
		self.bindings
			.borrow_mut()
			.entry(marker)
			.or_default()
			.push(descriptor);
	}

	/// Every recorded binding, keyed by marker id.
	pub fn bindings(&self) -> BTreeMap<u64, Vec<BindingDescriptor>> {
		self.bindings.borrow().clone()
	}

	/// Starts replaying a server trace.
	///
	/// `seeds` maps positional ids to captured root values; `kinds` lists the
	/// server's cell kinds in creation order.
	pub fn begin_replay(&self, seeds: BTreeMap<u64, serde_json::Value>, kinds: Vec<NodeKind>) {
		*self.replay.borrow_mut() = Some(Replay {
			seeds,
			kinds,
			issues: Vec::new(),
		});
	}

	/// Ends the replay and returns every difference noticed.
	pub fn finish_replay(&self) -> Vec<ReplayIssue> {
		self.replay
			.borrow_mut()
			.take()
			.map(|replay| replay.issues)
			.unwrap_or_default()
	}

	/// Forgets every recorded cell, binding and replay state.
	pub fn clear(&self) {
		self.cells.borrow_mut().clear();
		self.positions.borrow_mut().clear();
		self.bindings.borrow_mut().clear();
		self.replay.borrow_mut().take();
	}

	fn next_position(&self) -> u64 {
		self.cells.borrow().len() as u64
	}
}

impl CreationTracker for CellRegistry {
	fn seed(&self, descriptor: &CellDescriptor) -> Option<serde_json::Value> {
		if !self.is_recording() || descriptor.kind != NodeKind::RootCell {
			return None;
		}
		let position = self.next_position();
		self.replay
			.borrow()
			.as_ref()
			.and_then(|replay| replay.seeds.get(&position).cloned())
	}

	fn reject_seed(&self, descriptor: &CellDescriptor, error: &serde_json::Error) {
		let position = self.next_position();
		tracing::warn!(
			target: "tendril::hydration",
			position,
			value_type = descriptor.type_name,
			%error,
			"captured value does not fit the cell type; keeping the local initial value"
		);
		if let Some(replay) = self.replay.borrow_mut().as_mut() {
			replay.issues.push(ReplayIssue::SeedRejected {
				position,
				reason: error.to_string(),
			});
		}
	}

	fn register(&self, descriptor: CellDescriptor, handle: Rc<dyn TrackedCell>) {
		if !self.is_recording() {
			return;
		}

		let position = self.next_position();
		if let Some(replay) = self.replay.borrow_mut().as_mut() {
			match replay.kinds.get(position as usize) {
				Some(&expected) if expected != descriptor.kind => {
					replay.issues.push(ReplayIssue::KindMismatch {
						position,
						expected,
						found: descriptor.kind,
					});
				}
				Some(_) => {}
				None => replay.issues.push(ReplayIssue::UnexpectedCell { position }),
			}
		}

		self.positions.borrow_mut().insert(descriptor.id, position);
		self.cells.borrow_mut().push(RecordedCell {
			position,
			descriptor,
			handle,
		});
	}
}

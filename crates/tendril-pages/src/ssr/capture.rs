//! Hydration capture
//!
//! Turns the working set of a finished render into a [`HydrationPayload`].

use std::collections::BTreeMap;

use tendril_reactive::NodeKind;

use super::payload::{GraphNode, GraphSnapshot, HydrationPayload};
use crate::context::{CellRegistry, ContextError, RenderContext};

/// Shape of the graph recorded in `registry`.
pub(crate) fn graph_of(registry: &CellRegistry) -> GraphSnapshot {
	let cells = registry.cells();
	let nodes: Vec<GraphNode> = cells
		.iter()
		.map(|cell| GraphNode {
			id: cell.position,
			parents: cell
				.descriptor
				.parents
				.iter()
				.filter_map(|parent| registry.position_of(*parent))
				.collect(),
			kind: cell.descriptor.kind,
		})
		.collect();
	let root_ids = nodes
		.iter()
		.filter(|node| node.kind == NodeKind::RootCell)
		.map(|node| node.id)
		.collect();
	GraphSnapshot { nodes, root_ids }
}

/// Captures the working set into a payload, then clears it.
///
/// Only root cells created with [`Cell::hydratable`](tendril_reactive::Cell::hydratable)
/// contribute a value; every recorded cell appears in the graph.
pub fn capture(registry: &CellRegistry) -> HydrationPayload {
	let graph = graph_of(registry);

	let mut observables = BTreeMap::new();
	for cell in registry.cells() {
		if cell.descriptor.kind != NodeKind::RootCell {
			continue;
		}
		if let Some(value) = cell.handle.snapshot() {
			observables.insert(cell.position, value);
		}
	}

	let signature = Some(graph.signature());
	let payload = HydrationPayload {
		observables,
		bindings: registry.bindings(),
		graph,
		signature,
	};

	tracing::debug!(
		target: "tendril::hydration",
		cells = payload.graph.nodes.len(),
		observables = payload.observables.len(),
		bound_elements = payload.bindings.len(),
		"hydration payload captured"
	);

	registry.clear();
	payload
}

/// Captures the working set of the active render context.
pub fn capture_current() -> Result<HydrationPayload, ContextError> {
	let context = RenderContext::current("capture_current")?;
	Ok(capture(&context.registry()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use tendril_reactive::{Cell, Source};

	#[rstest]
	fn test_capture_sum_graph() {
		let ctx = RenderContext::new();

		let (payload, sum) = RenderContext::sync_scope(ctx.clone(), || {
			let a = Cell::hydratable(2_i64);
			let b = Cell::hydratable(3_i64);
			let (a2, b2) = (a.clone(), b.clone());
			let sum = Cell::computed(move || a2.get() + b2.get(), &[&a as &dyn Source, &b]);
			(capture_current().unwrap(), sum)
		});

		assert_eq!(sum.get(), 5);
		assert_eq!(payload.observables.len(), 2);
		assert!(!payload.observables.contains_key(&2));
		assert!(!payload.observables.values().any(|value| *value == json!(5)));
		assert_eq!(payload.observables[&0], json!(2));
		assert_eq!(payload.observables[&1], json!(3));
		assert_eq!(payload.graph.nodes.len(), 3);
		assert_eq!(payload.graph.nodes[2].parents, vec![0, 1]);
		assert_eq!(payload.graph.nodes[2].kind, NodeKind::DerivedCell);
		assert_eq!(payload.graph.root_ids, vec![0, 1]);
		assert!(payload.signature_matches());
		assert!(ctx.registry().is_empty());
	}

	#[rstest]
	fn test_plain_roots_are_graph_only() {
		let ctx = RenderContext::new();

		let payload = RenderContext::sync_scope(ctx, || {
			let _local = Cell::new(vec![1, 2]);
			let _shared = Cell::hydratable(String::from("x"));
			capture_current().unwrap()
		});

		assert_eq!(payload.observables.keys().copied().collect::<Vec<_>>(), vec![1]);
		assert_eq!(payload.graph.root_ids, vec![0, 1]);
	}

	#[rstest]
	fn test_signature_differs_with_shape() {
		let first = RenderContext::sync_scope(RenderContext::new(), || {
			let a = Cell::new(1);
			let _d = a.derive(|v| v + 1);
			capture_current().unwrap()
		});
		let second = RenderContext::sync_scope(RenderContext::new(), || {
			let _a = Cell::new(1);
			let _b = Cell::new(2);
			capture_current().unwrap()
		});

		assert_ne!(first.signature, second.signature);
	}
}

//! Hydration payload
//!
//! The payload is the JSON document a server render hands to the client:
//!
//! ```json
//! {
//!   "observables": { "0": 5 },
//!   "bindings": { "0": [{ "cellId": 0, "prop": "textContent" }] },
//!   "graph": {
//!     "nodes": [{ "id": 0, "parents": [], "kind": "rootCell" }],
//!     "rootIds": [0]
//!   },
//!   "signature": "…"
//! }
//! ```
//!
//! Every id is positional: the index of the cell in the render's creation
//! order. The signature fingerprints the shape of the graph so the client can
//! tell when its own execution diverged from the server's.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tendril_reactive::NodeKind;

use super::markers::PAYLOAD_SCRIPT_ID;
use crate::binding::BindingDescriptor;

/// Errors raised while reading a payload
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
	/// The page has no payload script
	#[error("no hydration payload script found in the page")]
	Missing,
	/// The payload is not valid JSON of the expected shape
	#[error("invalid hydration payload: {0}")]
	Parse(#[from] serde_json::Error),
}

/// One cell of the captured graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
	/// Positional id
	pub id: u64,
	/// Positional ids of the parents, in order
	pub parents: Vec<u64>,
	/// Root or derived
	pub kind: NodeKind,
}

/// Shape of the reactive graph at capture time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
	/// Every recorded cell in creation order
	pub nodes: Vec<GraphNode>,
	/// Positional ids of the root cells
	pub root_ids: Vec<u64>,
}

impl GraphSnapshot {
	/// Kinds of the nodes in creation order.
	pub fn kinds(&self) -> Vec<NodeKind> {
		self.nodes.iter().map(|node| node.kind).collect()
	}

	/// Hex SHA-256 fingerprint of the graph shape.
	///
	/// Each node contributes one `id:kind:parents` line.
	pub fn signature(&self) -> String {
		let mut hasher = Sha256::new();
		for node in &self.nodes {
			let parents = node
				.parents
				.iter()
				.map(u64::to_string)
				.collect::<Vec<_>>()
				.join(",");
			hasher.update(format!("{}:{}:{}\n", node.id, node.kind.tag(), parents).as_bytes());
		}
		hex::encode(hasher.finalize())
	}
}

/// Serialized state handed from the server render to the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydrationPayload {
	/// Captured values of serializable root cells, by positional id
	pub observables: BTreeMap<u64, serde_json::Value>,
	/// Binding descriptors by marker id
	pub bindings: BTreeMap<u64, Vec<BindingDescriptor>>,
	/// Shape of the reactive graph
	pub graph: GraphSnapshot,
	/// Fingerprint of `graph`
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
}

impl HydrationPayload {
	/// Serializes to compact JSON.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Serializes to indented JSON.
	pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}

	/// Deserializes from JSON.
	pub fn from_json(json: &str) -> Result<Self, PayloadError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Embeds the payload in a `<script type="application/json">` element.
	///
	/// `</` is written as `<\/` so values cannot close the script early.
	pub fn to_script_tag(&self, pretty: bool) -> Result<String, serde_json::Error> {
		let json = if pretty {
			self.to_json_pretty()?
		} else {
			self.to_json()?
		};
		Ok(format!(
			r#"<script id="{}" type="application/json">{}</script>"#,
			PAYLOAD_SCRIPT_ID,
			escape_json_for_script(&json)
		))
	}

	/// Extracts the payload embedded in a page by [`to_script_tag`](Self::to_script_tag).
	pub fn from_html(html: &str) -> Result<Self, PayloadError> {
		// Escaped text and attribute values never contain a raw `<`
		let marker = format!(r#"<script id="{PAYLOAD_SCRIPT_ID}""#);
		let tag_start = html.find(&marker).ok_or(PayloadError::Missing)?;
		let body_start = html[tag_start..]
			.find('>')
			.map(|offset| tag_start + offset + 1)
			.ok_or(PayloadError::Missing)?;
		let body_end = html[body_start..]
			.find("</script>")
			.map(|offset| body_start + offset)
			.ok_or(PayloadError::Missing)?;

		// `<\/` is a valid JSON escape of `</`
		Self::from_json(&html[body_start..body_end])
	}

	/// Whether the stored signature matches the graph, if one is stored.
	pub fn signature_matches(&self) -> bool {
		self.signature
			.as_deref()
			.is_none_or(|signature| signature == self.graph.signature())
	}
}

fn escape_json_for_script(json: &str) -> String {
	json.replace("</", "<\\/")
}

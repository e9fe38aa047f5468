//! Hydration markers for SSR.
//!
//! These markers are embedded in the SSR-rendered HTML so the client can find
//! the bound elements and swappable regions again:
//!
//! - bound elements carry `data-tendril-id="<n>"`
//! - regions are delimited by `<!--label:n-->` and `<!--/label:n-->`

/// The attribute name carrying the marker id of a bound element.
pub const HYDRATION_ATTR_ID: &str = "data-tendril-id";

/// The id of the script element embedding the hydration payload.
pub const PAYLOAD_SCRIPT_ID: &str = "tendril-hydration";

/// Text of the comment opening region `id`.
pub fn region_start(label: &str, id: u64) -> String {
	format!("{label}:{id}")
}

/// Text of the comment closing region `id`.
pub fn region_end(label: &str, id: u64) -> String {
	format!("/{label}:{id}")
}

/// A parsed region comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMarker {
	/// Region kind, such as `show` or `outlet`
	pub label: String,
	/// Marker id
	pub id: u64,
	/// Whether this is the closing comment
	pub closing: bool,
}

impl RegionMarker {
	/// Parses the text of a region comment.
	///
	/// Returns `None` for comments that are not region markers.
	pub fn parse(data: &str) -> Option<Self> {
		let (closing, rest) = match data.strip_prefix('/') {
			Some(rest) => (true, rest),
			None => (false, data),
		};
		let (label, id) = rest.rsplit_once(':')?;
		if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
			return None;
		}
		Some(Self {
			label: label.to_string(),
			id: id.parse().ok()?,
			closing,
		})
	}
}

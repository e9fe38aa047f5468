//! Cell to DOM property bindings
//!
//! A binding writes a cell's value into a property of a DOM node right away
//! and again after every change. Bound elements are what hydration has to
//! find again on the client, so every binding made while mounting is also
//! recorded as a [`BindingDescriptor`] against the element's marker id.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tendril_reactive::{Cell, Subscription};

use crate::dom::Node;

/// Serialized record of one binding on a marked element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingDescriptor {
	/// Positional id of the source cell
	#[serde(rename = "cellId")]
	pub cell_id: u64,
	/// Bound property name
	pub prop: String,
}

impl BindingDescriptor {
	/// Creates a descriptor.
	pub fn new(cell_id: u64, prop: impl Into<String>) -> Self {
		Self {
			cell_id,
			prop: prop.into(),
		}
	}
}

/// Properties reflected as boolean attributes
const BOOLEAN_PROPERTIES: &[&str] = &["hidden", "disabled", "checked", "readonly", "required"];

/// Writes `value` into property `prop` of `node`.
///
/// - `textContent` replaces the children with a single text node
/// - `className` and `class` set the `class` attribute
/// - boolean properties add the attribute for `"true"` and remove it otherwise
/// - anything else sets the attribute of the same name
pub fn apply_property(node: &Node, prop: &str, value: &str) {
	match prop {
		"textContent" | "innerText" => node.set_text_content(value),
		"className" | "class" => node.set_attribute("class", value),
		_ if BOOLEAN_PROPERTIES.contains(&prop) => {
			if value == "true" {
				node.set_attribute(prop, "");
			} else {
				node.remove_attribute(prop);
			}
		}
		_ => node.set_attribute(prop, value),
	}
}

/// Binds `cell` to property `prop` of `node`.
///
/// The current value is applied immediately. The returned subscription stops
/// the binding.
pub fn bind_property<T>(cell: &Cell<T>, node: &Node, prop: &str) -> Subscription
where
	T: Display + Clone + 'static,
{
	let prop = prop.to_string();
	cell.bind(node.downgrade(), move |value, target| {
		if let Some(node) = target.upgrade() {
			apply_property(&node, &prop, &value.to_string());
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("title", "hello", r#"<p title="hello"></p>"#)]
	#[case("className", "big", r#"<p class="big"></p>"#)]
	#[case("hidden", "true", r#"<p hidden=""></p>"#)]
	#[case("hidden", "false", "<p></p>")]
	#[case("textContent", "hi", "<p>hi</p>")]
	fn test_apply_property(#[case] prop: &str, #[case] value: &str, #[case] expected: &str) {
		let node = Node::element("p");
		apply_property(&node, prop, value);
		assert_eq!(node.to_html(), expected);
	}

	#[rstest]
	fn test_bind_property_tracks_changes() {
		let count = Cell::new(1);
		let span = Node::element("span");

		let sub = bind_property(&count, &span, "textContent");
		assert_eq!(span.text_content(), "1");

		count.set(2);
		assert_eq!(span.text_content(), "2");

		sub.unsubscribe();
		count.set(3);
		assert_eq!(span.text_content(), "2");
	}

	#[rstest]
	fn test_bind_boolean_property() {
		let disabled = Cell::new(false);
		let button = Node::element("button");
		let _sub = bind_property(&disabled, &button, "disabled");
		assert!(!button.has_attribute("disabled"));

		disabled.set(true);
		assert!(button.has_attribute("disabled"));
	}

	#[rstest]
	fn test_descriptor_wire_format() {
		let descriptor = BindingDescriptor::new(2, "textContent");
		assert_eq!(
			serde_json::to_string(&descriptor).unwrap(),
			r#"{"cellId":2,"prop":"textContent"}"#
		);
	}
}

//! SSR Renderer for component-based server-side rendering.

use std::collections::BTreeMap;
use std::future::Future;

use super::capture::capture;
use super::payload::HydrationPayload;
use crate::component::{IntoView, MountError, Renderer, Scope};
use crate::context::RenderContext;
use crate::dom::{DomError, Node, escape_attr, escape_text};

/// Errors raised by a server render
#[derive(Debug, thiserror::Error)]
pub enum SsrError {
	/// The view could not be mounted
	#[error("failed to render view: {0}")]
	Mount(#[from] MountError),
	/// A tree operation failed
	#[error(transparent)]
	Dom(#[from] DomError),
	/// The payload could not be serialized
	#[error("failed to serialize hydration payload: {0}")]
	Serialize(#[from] serde_json::Error),
}

/// Options for SSR rendering.
#[derive(Debug, Clone)]
pub struct SsrOptions {
	/// Whether to stamp marker attributes on bound elements.
	pub include_hydration_markers: bool,
	/// Whether full pages embed the payload script.
	pub include_payload_script: bool,
	/// Whether the embedded payload is indented.
	pub pretty_payload: bool,
	/// Language attribute for the HTML element.
	pub lang: String,
	/// Page title.
	pub title: Option<String>,
	/// Id of the element the view is rendered into.
	pub root_id: String,
	/// Navigation path the render starts at.
	pub path: String,
	/// Request data made available through the render context.
	pub data: BTreeMap<String, String>,
}

impl Default for SsrOptions {
	fn default() -> Self {
		Self {
			include_hydration_markers: true,
			include_payload_script: true,
			pretty_payload: cfg!(feature = "pretty-payload"),
			lang: "en".to_string(),
			title: None,
			root_id: "app".to_string(),
			path: "/".to_string(),
			data: BTreeMap::new(),
		}
	}
}

impl SsrOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the language.
	pub fn lang(mut self, lang: impl Into<String>) -> Self {
		self.lang = lang.into();
		self
	}

	/// Sets the page title.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	/// Sets the id of the root element.
	pub fn root_id(mut self, id: impl Into<String>) -> Self {
		self.root_id = id.into();
		self
	}

	/// Sets the request path.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	/// Adds a request data entry.
	pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.data.insert(key.into(), value.into());
		self
	}

	/// Disables hydration markers.
	///
	/// The output can still be displayed but no longer hydrated.
	pub fn no_hydration(mut self) -> Self {
		self.include_hydration_markers = false;
		self.include_payload_script = false;
		self
	}

	/// Indents the embedded payload.
	pub fn pretty(mut self, pretty: bool) -> Self {
		self.pretty_payload = pretty;
		self
	}
}

/// Result of a server render
#[derive(Debug)]
pub struct SsrOutput {
	/// Markup of the rendered view, without the root element
	pub html: String,
	/// Captured hydration payload
	pub payload: HydrationPayload,
	/// Detached copy of the root element as rendered, without listeners
	pub container: Node,
}

/// The main SSR renderer.
///
/// # Example
///
/// ```
/// use tendril_pages::component::{ElementView, component};
/// use tendril_pages::ssr::SsrRenderer;
/// use tendril_reactive::Cell;
///
/// let output = SsrRenderer::new()
///     .render(|| {
///         component("Counter", |_| {
///             let count = Cell::hydratable(5_i64);
///             ElementView::new("span").bind_text(&count)
///         })
///     })
///     .unwrap();
///
/// assert_eq!(output.html, r#"<span data-tendril-id="0">5</span>"#);
/// assert_eq!(output.payload.observables.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SsrRenderer {
	options: SsrOptions,
}

impl SsrRenderer {
	/// Creates a new renderer with default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a renderer with custom options.
	pub fn with_options(options: SsrOptions) -> Self {
		Self { options }
	}

	/// Returns the options.
	pub fn options(&self) -> &SsrOptions {
		&self.options
	}

	fn prepare_context(&self) -> RenderContext {
		let context = RenderContext::new();
		context.navigate(self.options.path.clone());
		for (key, value) in &self.options.data {
			context.insert_data(key.clone(), value.clone());
		}
		context
	}

	/// Renders the view returned by `build` in a fresh render context.
	pub fn render<V, F>(&self, build: F) -> Result<SsrOutput, SsrError>
	where
		V: IntoView,
		F: FnOnce() -> V,
	{
		let context = self.prepare_context();
		RenderContext::sync_scope(context.clone(), || self.render_in(&context, build))
	}

	/// Renders like [`render`](Self::render), keeping the render context
	/// active across every `.await` of `build`.
	///
	/// Concurrent renders on one thread do not see each other's state.
	pub async fn render_async<V, F, Fut>(&self, build: F) -> Result<SsrOutput, SsrError>
	where
		V: IntoView,
		F: FnOnce() -> Fut,
		Fut: Future<Output = V>,
	{
		let context = self.prepare_context();
		RenderContext::scope(context.clone(), async {
			let view = build().await;
			self.render_in(&context, move || view)
		})
		.await
	}

	fn render_in<V, F>(&self, context: &RenderContext, build: F) -> Result<SsrOutput, SsrError>
	where
		V: IntoView,
		F: FnOnce() -> V,
	{
		let document = Node::document();
		let container = Node::element("div");
		container.set_attribute("id", self.options.root_id.clone());
		document.append_child(&container)?;

		let scope = Scope::new("root");
		let view = context.with_scope(&scope, || build().into_view());

		let renderer = Renderer::new(context.clone(), self.options.include_hydration_markers);
		let rendered = renderer.render(view, &scope).and_then(|nodes| {
			for node in &nodes {
				container.append_child(node)?;
			}
			Ok(())
		});
		if let Err(error) = rendered {
			scope.destroy();
			context.registry().clear();
			return Err(error.into());
		}
		scope.attach(&container);

		let payload = capture(&context.registry());
		let html = container.inner_html();
		// Tearing down regions empties them, so the output keeps a copy
		let snapshot = container.deep_clone();
		scope.destroy();

		tracing::debug!(
			target: "tendril::hydration",
			context = context.id(),
			bytes = html.len(),
			"server render finished"
		);

		Ok(SsrOutput {
			html,
			payload,
			container: snapshot,
		})
	}

	/// Wraps a render output in a full HTML document.
	pub fn wrap_in_html(&self, output: &SsrOutput) -> Result<String, SsrError> {
		let mut html = String::with_capacity(output.html.len() + 512);

		html.push_str("<!DOCTYPE html>\n");
		html.push_str(&format!("<html lang=\"{}\">\n", escape_attr(&self.options.lang)));
		html.push_str("<head>\n");
		html.push_str("<meta charset=\"UTF-8\">\n");
		if let Some(title) = &self.options.title {
			html.push_str(&format!("<title>{}</title>\n", escape_text(title)));
		}
		html.push_str("</head>\n");

		html.push_str("<body>\n");
		html.push_str(&format!("<div id=\"{}\">", escape_attr(&self.options.root_id)));
		html.push_str(&output.html);
		html.push_str("</div>\n");

		if self.options.include_payload_script {
			html.push_str(&output.payload.to_script_tag(self.options.pretty_payload)?);
			html.push('\n');
		}

		html.push_str("</body>\n");
		html.push_str("</html>");
		Ok(html)
	}

	/// Renders and wraps in one step.
	pub fn render_page<V, F>(&self, build: F) -> Result<String, SsrError>
	where
		V: IntoView,
		F: FnOnce() -> V,
	{
		let output = self.render(build)?;
		self.wrap_in_html(&output)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{ElementView, View, component, on_attached};
	use crate::context::current_path;
	use rstest::rstest;
	use std::cell::RefCell;
	use std::rc::Rc;
	use tendril_reactive::Cell;

	#[rstest]
	fn test_options_builder() {
		let options = SsrOptions::new()
			.lang("fr")
			.title("Accueil")
			.path("/a")
			.data("user", "ada")
			.pretty(true);

		assert_eq!(options.lang, "fr");
		assert_eq!(options.title.as_deref(), Some("Accueil"));
		assert_eq!(options.path, "/a");
		assert_eq!(options.data["user"], "ada");
		assert!(options.pretty_payload);
		assert!(!SsrOptions::new().no_hydration().include_hydration_markers);
	}

	#[rstest]
	fn test_request_state_is_visible() {
		let renderer = SsrRenderer::with_options(SsrOptions::new().path("/users").data("user", "ada"));

		let output = renderer
			.render(|| {
				let context = RenderContext::current("test").unwrap();
				let text = format!("{} {}", current_path().unwrap(), context.data("user").unwrap());
				ElementView::new("p").child(text)
			})
			.unwrap();

		assert_eq!(output.html, "<p>/users ada</p>");
	}

	#[rstest]
	fn test_root_scope_is_attached_then_destroyed() {
		let log = Rc::new(RefCell::new(Vec::new()));

		let log_clone = log.clone();
		SsrRenderer::new()
			.render(move || {
				component("Page", move |scope| {
					let attached = log_clone.clone();
					on_attached(move |_| attached.borrow_mut().push("attached")).unwrap();
					let destroyed = log_clone.clone();
					scope.track(move || destroyed.borrow_mut().push("destroyed"));
					View::empty()
				})
			})
			.unwrap();

		assert_eq!(*log.borrow(), vec!["attached", "destroyed"]);
	}

	#[rstest]
	fn test_no_hydration_omits_markers() {
		let renderer = SsrRenderer::with_options(SsrOptions::new().no_hydration());

		let output = renderer
			.render(|| ElementView::new("b").bind_text(&Cell::hydratable(1_i64)))
			.unwrap();
		let page = renderer.wrap_in_html(&output).unwrap();

		assert_eq!(output.html, "<b>1</b>");
		assert!(!page.contains("tendril-hydration"));
	}

	#[rstest]
	fn test_wrap_in_html_embeds_payload() {
		let renderer = SsrRenderer::with_options(SsrOptions::new().title("<Home>").root_id("root"));

		let page = renderer
			.render_page(|| ElementView::new("b").bind_text(&Cell::hydratable(String::from("</script>"))))
			.unwrap();

		assert!(page.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
		assert!(page.contains("<title>&lt;Home&gt;</title>"));
		assert!(page.contains("<div id=\"root\"><b data-tendril-id=\"0\">&lt;/script&gt;</b></div>"));
		let payload = HydrationPayload::from_html(&page).unwrap();
		assert_eq!(payload.observables[&0], serde_json::json!("</script>"));
	}

	#[rstest]
	fn test_page_text_quoting_the_script_id_still_parses() {
		let text = "see id=\"tendril-hydration\" here";

		let page = SsrRenderer::new()
			.render_page(|| {
				component("Note", move |_| {
					ElementView::new("p").bind_text(&Cell::hydratable(String::from(text)))
				})
			})
			.unwrap();

		let payload = HydrationPayload::from_html(&page).unwrap();
		assert_eq!(payload.observables[&0], serde_json::json!(text));
	}
}

//! End-to-end server render and hydration tests

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use serde_json::json;
use tendril_pages::binding::BindingDescriptor;
use tendril_pages::component::{ElementView, IntoView, View, component};
use tendril_pages::context::RenderContext;
use tendril_pages::dom::Node;
use tendril_pages::hydration::{
	HydrationError, HydrationOptions, hydrate, hydrate_from_html, is_hydrating, on_hydration_complete,
};
use tendril_pages::ssr::{HydrationPayload, SsrOptions, SsrOutput, SsrRenderer};
use tendril_reactive::{Cell, NodeKind};

/// Counter whose server-side start value comes from request data
fn counter() -> View {
	component("Counter", |_| {
		let start = RenderContext::current("counter")
			.ok()
			.and_then(|ctx| ctx.data("start"))
			.and_then(|value| value.parse().ok())
			.unwrap_or(0_i64);
		let count = Cell::hydratable(start);
		let doubled = count.derive(|n| n * 2);
		let increment = count.clone();

		ElementView::new("div")
			.attr("class", "counter")
			.child(ElementView::new("span").bind_text(&count))
			.child(ElementView::new("em").bind_text(&doubled))
			.child(
				ElementView::new("button")
					.on("click", move |_| increment.update(|n| n + 1))
					.child("+"),
			)
	})
}

fn render_counter() -> SsrOutput {
	SsrRenderer::with_options(SsrOptions::new().data("start", "5"))
		.render(counter)
		.unwrap()
}

/// Copies the server markup into a live client document
fn client_root(output: &SsrOutput) -> (Node, Node) {
	let document = Node::document();
	let root = output.container.deep_clone();
	document.append_child(&root).unwrap();
	(document, root)
}

#[rstest]
fn test_server_render_markup_and_payload() {
	let output = render_counter();

	assert_eq!(
		output.html,
		r#"<div class="counter"><span data-tendril-id="0">5</span><em data-tendril-id="1">10</em><button>+</button></div>"#
	);
	assert_eq!(output.payload.observables.len(), 1);
	assert_eq!(output.payload.observables[&0], json!(5));
	assert_eq!(output.payload.graph.nodes.len(), 2);
	assert_eq!(output.payload.graph.nodes[1].parents, vec![0]);
	assert_eq!(output.payload.graph.nodes[1].kind, NodeKind::DerivedCell);
	assert_eq!(
		output.payload.bindings[&1],
		vec![BindingDescriptor::new(1, "textContent")]
	);
}

#[rstest]
fn test_round_trip_through_page_html() {
	let renderer = SsrRenderer::with_options(SsrOptions::new().data("start", "5"));
	let output = renderer.render(counter).unwrap();
	let page = renderer.wrap_in_html(&output).unwrap();

	let payload = HydrationPayload::from_html(&page).unwrap();
	assert_eq!(payload, output.payload);

	let (_document, root) = client_root(&output);
	let span = root.find_by_attr("data-tendril-id", "0").unwrap();
	let button = root.first_child().unwrap().children()[2].clone();

	let mounted = hydrate(&payload, &root, HydrationOptions::new(), counter).unwrap();

	// Existing nodes are reused, seeded values win over the client's initial value
	assert!(root.find_by_attr("data-tendril-id", "0").unwrap().ptr_eq(&span));
	assert_eq!(span.text_content(), "5");
	assert_eq!(button.listener_count("click"), 1);

	button.dispatch_event("click");
	assert_eq!(
		root.inner_html(),
		r#"<div class="counter"><span data-tendril-id="0">6</span><em data-tendril-id="1">12</em><button>+</button></div>"#
	);

	mounted.unmount();
	assert_eq!(root.child_count(), 0);
	assert_eq!(button.listener_count("click"), 0);
	assert!(!is_hydrating());
}

#[rstest]
fn test_hydrate_from_html() {
	let renderer = SsrRenderer::with_options(SsrOptions::new().data("start", "2"));
	let output = renderer.render(counter).unwrap();
	let page = renderer.wrap_in_html(&output).unwrap();
	let (_document, root) = client_root(&output);

	hydrate_from_html(&page, &root, HydrationOptions::new(), counter).unwrap();

	assert_eq!(root.find_by_attr("data-tendril-id", "1").unwrap().text_content(), "4");
}

#[rstest]
fn test_missing_payload_script() {
	let root = Node::element("div");

	let result = hydrate_from_html("<p></p>", &root, HydrationOptions::new(), View::empty);

	assert!(matches!(result, Err(HydrationError::PayloadParse(_))));
	assert!(!is_hydrating());
}

#[rstest]
fn test_extra_client_cell_is_a_trace_mismatch() {
	let output = render_counter();
	let (_document, root) = client_root(&output);

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), || {
		let view = counter();
		let _extra = Cell::new(1_i64);
		view
	});

	match result {
		Err(HydrationError::TraceMismatch { expected, found }) => {
			assert_eq!(expected, "2 cells");
			assert_eq!(found, "3 cells");
		}
		other => panic!("expected a trace mismatch, got {other:?}"),
	}
	assert!(!is_hydrating());
	let client = RenderContext::install_client();
	assert!(client.registry().is_empty());
	assert!(!client.registry().is_recording());
}

#[rstest]
fn test_different_parents_fail_the_signature() {
	let output = render_counter();
	let (_document, root) = client_root(&output);

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), || {
		component("Counter", |_| {
			let count = Cell::hydratable(0_i64);
			let other = Cell::computed(|| 0_i64, &[]);
			ElementView::new("div")
				.attr("class", "counter")
				.child(ElementView::new("span").bind_text(&count))
				.child(ElementView::new("em").bind_text(&other))
				.child(ElementView::new("button").child("+"))
		})
	});

	assert!(matches!(result, Err(HydrationError::TraceMismatch { .. })));
}

#[rstest]
fn test_skipping_the_signature_check() {
	let mut output = render_counter();
	output.payload.signature = Some(String::from("not a signature"));
	let (_document, root) = client_root(&output);

	let strict = hydrate(&output.payload, &root, HydrationOptions::new(), counter);
	assert!(matches!(strict, Err(HydrationError::TraceMismatch { .. })));

	let (_document, root) = client_root(&output);
	let relaxed = hydrate(
		&output.payload,
		&root,
		HydrationOptions::new().skip_signature(),
		counter,
	);
	assert!(relaxed.is_ok());
}

#[rstest]
fn test_kind_mismatch() {
	let output = render_counter();
	let (_document, root) = client_root(&output);

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), || {
		let _a = Cell::hydratable(0_i64);
		let _b = Cell::new(0_i64);
		View::empty()
	});

	assert!(matches!(
		result,
		Err(HydrationError::KindMismatch {
			position: 1,
			expected: NodeKind::DerivedCell,
			found: NodeKind::RootCell,
		})
	));
}

#[rstest]
fn test_seed_of_wrong_type_is_rejected() {
	let output = SsrRenderer::new()
		.render(|| ElementView::new("p").bind_text(&Cell::hydratable(String::from("text"))))
		.unwrap();
	let (_document, root) = client_root(&output);

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), || {
		ElementView::new("p").bind_text(&Cell::hydratable(0_i64))
	});

	assert!(matches!(
		result,
		Err(HydrationError::SeedRejected { position: 0, .. })
	));
}

#[rstest]
fn test_tampered_marker() {
	let output = render_counter();
	let (_document, root) = client_root(&output);
	root.find_by_attr("data-tendril-id", "1")
		.unwrap()
		.set_attribute("data-tendril-id", "7");

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), counter);

	match result {
		Err(HydrationError::MarkerMismatch { expected, found }) => {
			assert_eq!(expected, 1);
			assert_eq!(found.as_deref(), Some("7"));
		}
		other => panic!("expected a marker mismatch, got {other:?}"),
	}
}

#[rstest]
fn test_binding_mismatch() {
	let output = SsrRenderer::new()
		.render(|| ElementView::new("p").bind_text(&Cell::hydratable(1_i64)))
		.unwrap();
	let (_document, root) = client_root(&output);

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), || {
		ElementView::new("p").bind("title", &Cell::hydratable(1_i64))
	});

	match result {
		Err(HydrationError::BindingMismatch {
			marker,
			expected,
			found,
		}) => {
			assert_eq!(marker, 0);
			assert_eq!(expected, vec![BindingDescriptor::new(0, "textContent")]);
			assert_eq!(found, vec![BindingDescriptor::new(0, "title")]);
		}
		other => panic!("expected a binding mismatch, got {other:?}"),
	}
}

fn article() -> View {
	ElementView::new("article")
		.child(ElementView::new("h1").child("Title"))
		.child("body")
		.into_view()
}

#[rstest]
#[case::wrong_tag(|| ElementView::new("section").into_view())]
#[case::text_for_element(|| ElementView::new("article").child("Title").child("body").into_view())]
#[case::missing_node(|| ElementView::new("article").child(ElementView::new("h1").child("Title")).into_view())]
#[case::extra_node(|| View::fragment([article(), ElementView::new("footer").into_view()]))]
#[case::nothing(View::empty)]
fn test_structure_mismatch(#[case] build: fn() -> View) {
	let output = SsrRenderer::new().render(article).unwrap();
	let (_document, root) = client_root(&output);

	let result = hydrate(&output.payload, &root, HydrationOptions::new(), build);

	assert!(
		matches!(result, Err(HydrationError::StructureMismatch { .. })),
		"unexpected result {result:?}"
	);
	assert!(!is_hydrating());
}

#[rstest]
fn test_nested_hydration_is_refused() {
	let output = render_counter();
	let (_document, root) = client_root(&output);
	let other_root = Node::element("div");
	let nested = RefCell::new(None);

	let outer = hydrate(&output.payload, &root, HydrationOptions::new(), || {
		*nested.borrow_mut() = Some(hydrate(
			&HydrationPayload::default(),
			&other_root,
			HydrationOptions::new(),
			View::empty,
		));
		counter()
	});

	assert!(outer.is_ok());
	assert!(matches!(
		nested.into_inner(),
		Some(Err(HydrationError::AlreadyHydrating))
	));
}

#[rstest]
fn test_completion_listeners_run_on_success_only() {
	let calls = Rc::new(RefCell::new(0));
	let calls_clone = calls.clone();
	on_hydration_complete(move || *calls_clone.borrow_mut() += 1);

	let output = render_counter();
	let (_document, root) = client_root(&output);
	let failed = hydrate(&output.payload, &root, HydrationOptions::new(), View::empty);
	assert!(failed.is_err());
	assert_eq!(*calls.borrow(), 0);

	let (_document, root) = client_root(&output);
	hydrate(&output.payload, &root, HydrationOptions::new(), counter).unwrap();
	assert_eq!(*calls.borrow(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_interleaved_async_renders_are_isolated() {
	async fn render(label: &'static str) -> SsrOutput {
		SsrRenderer::new()
			.render_async(|| async move {
				let first = Cell::hydratable(format!("{label}-first"));
				tokio::task::yield_now().await;
				let second = Cell::hydratable(format!("{label}-second"));
				tokio::task::yield_now().await;
				View::fragment([
					ElementView::new("p").bind_text(&first),
					ElementView::new("p").bind_text(&second),
				])
			})
			.await
			.unwrap()
	}

	let local = tokio::task::LocalSet::new();
	let (a, b) = local
		.run_until(async {
			let a = tokio::task::spawn_local(render("a"));
			let b = tokio::task::spawn_local(render("b"));
			(a.await.unwrap(), b.await.unwrap())
		})
		.await;

	for (output, label) in [(a, "a"), (b, "b")] {
		assert_eq!(
			output.html,
			format!(
				r#"<p data-tendril-id="0">{label}-first</p><p data-tendril-id="1">{label}-second</p>"#
			)
		);
		assert_eq!(output.payload.observables.len(), 2);
		assert_eq!(output.payload.observables[&0], json!(format!("{label}-first")));
		assert_eq!(output.payload.observables[&1], json!(format!("{label}-second")));
	}
}

/// Plain cell that the server overwrites while rendering
fn visits() -> View {
	component("Visits", |_| {
		let visits = Cell::new(0_i64);
		let on_server = RenderContext::current("visits")
			.ok()
			.and_then(|ctx| ctx.data("server"))
			.is_some();
		if on_server {
			visits.set(7);
		}
		ElementView::new("b").bind_text(&visits)
	})
}

#[rstest]
fn test_plain_cell_state_stays_on_the_server() {
	let output = SsrRenderer::with_options(SsrOptions::new().data("server", "yes"))
		.render(visits)
		.unwrap();
	assert_eq!(output.html, r#"<b data-tendril-id="0">7</b>"#);
	assert!(output.payload.observables.is_empty());
	assert_eq!(output.payload.graph.root_ids, vec![0]);

	let (_document, root) = client_root(&output);
	let _mounted = hydrate(&output.payload, &root, HydrationOptions::new(), visits).unwrap();

	assert_eq!(root.inner_html(), r#"<b data-tendril-id="0">0</b>"#);
}

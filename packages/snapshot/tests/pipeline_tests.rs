//! End-to-end: open → instrument → edit → snapshot

use clonup_editor::{
    EditCommand, EditableDocument, ElementAddresser, RenderingSurface, SelectionController,
    SurfaceHandle,
};
use clonup_snapshot::{ManagedDomainSet, SnapshotPipeline, DEFAULT_MANAGED_ROOT};

fn open(html: &str) -> (SurfaceHandle, SelectionController) {
    let doc = EditableDocument::open(html, "shop").unwrap();
    let (mut surface, events) = RenderingSurface::new(doc, ElementAddresser::from_seed("t"));
    surface.initialize();
    let surface = SurfaceHandle::new(surface);
    let controller = SelectionController::new(surface.clone(), events);
    (surface, controller)
}

fn select(surface: &SurfaceHandle, controller: &mut SelectionController, tag: &str) {
    let node = surface.borrow().tree().elements_by_tag(tag)[0];
    surface.borrow_mut().click(node).unwrap();
    controller.handle_events();
}

fn snapshot(surface: &SurfaceHandle) -> String {
    let pipeline = SnapshotPipeline::new(ManagedDomainSet::new("shop", &[DEFAULT_MANAGED_ROOT]));
    pipeline
        .serialize_document(surface.borrow().document())
        .unwrap()
        .html
}

#[test]
fn test_edited_image_source_survives_save() {
    let (surface, mut controller) = open(
        r#"<!DOCTYPE html><html><head></head><body><img id="x" src="/old.jpg"></body></html>"#,
    );
    select(&surface, &mut controller, "img");

    controller
        .apply(EditCommand::Src("https://cdn.example/new.jpg".into()))
        .unwrap();
    let html = snapshot(&surface);

    assert_eq!(
        html,
        "<!DOCTYPE html>\n<html><head></head><body><img id=\"x\" src=\"https://cdn.example/new.jpg\"></body></html>"
    );
}

#[test]
fn test_attribute_fidelity_without_id() {
    let (surface, mut controller) = open(
        r#"<!DOCTYPE html><html><head></head><body><main><img src="a.png" alt="A"></main></body></html>"#,
    );
    select(&surface, &mut controller, "img");

    controller.apply(EditCommand::Src("b.png".into())).unwrap();
    controller.apply(EditCommand::Alt("B".into())).unwrap();
    let html = snapshot(&surface);

    assert!(html.contains(r#"<img src="b.png" alt="B">"#), "{html}");
    assert!(!html.contains("a.png"));
}

#[test]
fn test_no_instrumentation_in_output() {
    let original = r#"<!DOCTYPE html><html><head><title>T</title></head><body><section><h2>Hi</h2><a href="/x">x</a></section><footer>f</footer></body></html>"#;
    let (surface, mut controller) = open(original);
    select(&surface, &mut controller, "h2");
    select(&surface, &mut controller, "a");

    let live_markup = clonup_dom::serialize_document(surface.borrow().tree());
    assert!(live_markup.contains("data-clonup-"));

    let html = snapshot(&surface);

    assert!(!html.contains("data-clonup-"), "{html}");
    assert!(!html.contains("clonup-"), "{html}");
    assert_eq!(
        html,
        "<!DOCTYPE html>\n<html><head><title>T</title></head><body><section><h2>Hi</h2><a href=\"/x\">x</a></section><footer>f</footer></body></html>"
    );
}

#[test]
fn test_managed_urls_become_relative() {
    let (surface, _controller) = open(
        r#"<!DOCTYPE html><html><head></head><body>
        <img src="https://shop.clonup.site/img.png">
        <a href="https://www.shop.clonup.site/about">About</a>
        <div style="background-image: url('//shop.clonup.site/bg.jpg')">bg</div>
        <img src="https://cdn.example/keep.png">
        </body></html>"#,
    );

    let html = snapshot(&surface);

    assert!(html.contains(r#"src="/img.png""#), "{html}");
    assert!(html.contains(r#"href="/about""#), "{html}");
    assert!(html.contains("url('/bg.jpg')"), "{html}");
    assert!(html.contains(r#"src="https://cdn.example/keep.png""#), "{html}");
    assert!(!html.contains("shop.clonup.site"));
}

#[test]
fn test_entities_are_not_double_escaped() {
    let (surface, _controller) =
        open("<!DOCTYPE html><html><head></head><body><p>Fish &amp; Chips</p></body></html>");

    let html = snapshot(&surface);

    assert!(html.contains("<p>Fish &amp; Chips</p>"), "{html}");
    assert!(!html.contains("&amp;amp;"));
}

#[test]
fn test_inserted_markup_is_kept_clean() {
    let (surface, mut controller) =
        open("<!DOCTYPE html><html><head></head><body><main><p>x</p></main></body></html>");
    let main = surface.borrow().tree().elements_by_tag("main")[0];
    surface
        .borrow_mut()
        .insert_html(main, 2, r#"<figure><img src="/new.png"></figure>"#)
        .unwrap();
    controller.handle_events();

    let html = snapshot(&surface);

    assert!(
        html.contains(r#"<main><p>x</p><figure><img src="/new.png"></figure></main>"#),
        "{html}"
    );
}

#[test]
fn test_snapshot_leaves_live_tree_untouched() {
    let (surface, mut controller) =
        open("<!DOCTYPE html><html><head></head><body><main><p>x</p></main></body></html>");
    select(&surface, &mut controller, "p");
    let before = clonup_dom::serialize_document(surface.borrow().tree());

    let first = snapshot(&surface);
    let second = snapshot(&surface);

    assert_eq!(first, second);
    assert_eq!(clonup_dom::serialize_document(surface.borrow().tree()), before);
}

#[test]
fn test_top_level_paragraph_keeps_its_content() {
    let (surface, mut controller) = open(
        r#"<!DOCTYPE html><html><head></head><body><p id="a">Hello <b>world</b></p></body></html>"#,
    );
    select(&surface, &mut controller, "p");

    let html = snapshot(&surface);

    assert!(
        html.contains(r#"<body><p id="a">Hello <b>world</b></p></body>"#),
        "{html}"
    );
}

#[test]
fn test_edit_to_managed_url_is_saved_relative() {
    let (surface, mut controller) = open(
        r#"<!DOCTYPE html><html><head></head><body><main><img id="hero" src="/a.png"></main></body></html>"#,
    );
    select(&surface, &mut controller, "img");

    controller
        .apply(EditCommand::Src("https://shop.clonup.site/new.png".into()))
        .unwrap();
    let html = snapshot(&surface);

    assert!(html.contains(r#"<img id="hero" src="/new.png">"#), "{html}");
    assert!(!html.contains("shop.clonup.site"), "{html}");
}

#[test]
fn test_unselected_link_keeps_programmatic_href() {
    let (surface, _controller) = open(
        r#"<!DOCTYPE html><html><head></head><body><nav><a href="/old">Shop</a></nav></body></html>"#,
    );
    {
        let mut surface = surface.borrow_mut();
        let a = surface.tree().elements_by_tag("a")[0];
        surface
            .tree_mut()
            .set_attr(a, "href", "https://shop.clonup.site/new");
    }

    let html = snapshot(&surface);

    assert!(html.contains(r#"<nav><a href="/new">Shop</a></nav>"#), "{html}");
    assert!(!html.contains("/old"), "{html}");
}

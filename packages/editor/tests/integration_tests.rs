//! Controller + surface behaviour over realistic captured pages

use clonup_editor::{
    EditCommand, EditableDocument, ElementAddress, ElementAddresser, EditorError,
    RenderingSurface, SelectionController, SurfaceHandle,
};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Shop</title></head>
<body>
  <header><h1 id="title">Summer sale</h1></header>
  <main>
    <p class="lead">Everything must go</p>
    <img id="hero" src="/hero.jpg" alt="Hero">
    <button>Buy</button>
  </main>
</body>
</html>"#;

fn open(html: &str) -> (SurfaceHandle, SelectionController) {
    let doc = EditableDocument::open(html, "shop").unwrap();
    let (mut surface, events) = RenderingSurface::new(doc, ElementAddresser::from_seed("it"));
    surface.initialize();
    let surface = SurfaceHandle::new(surface);
    let controller = SelectionController::new(surface.clone(), events);
    (surface, controller)
}

fn click(surface: &SurfaceHandle, controller: &mut SelectionController, tag: &str) -> ElementAddress {
    let node = surface.borrow().tree().elements_by_tag(tag)[0];
    let id = surface.borrow_mut().click(node).unwrap();
    controller.handle_events();
    id
}

fn count(surface: &SurfaceHandle, tag: &str) -> usize {
    surface.borrow().tree().elements_by_tag(tag).len()
}

#[test]
fn test_link_wrap_is_idempotent() {
    let (surface, mut controller) = open(PAGE);
    click(&surface, &mut controller, "button");

    controller.wrap_link("https://shop.example/checkout").unwrap();
    controller.wrap_link("https://shop.example/checkout").unwrap();

    assert_eq!(count(&surface, "a"), 1);
    let surface_ref = surface.borrow();
    let tree = surface_ref.tree();
    let a = tree.elements_by_tag("a")[0];
    let button = tree.elements_by_tag("button")[0];
    assert_eq!(tree.parent(button), Some(a));
    assert_eq!(tree.attr(a, "href"), Some("https://shop.example/checkout"));
    assert!(tree.closest(tree.parent(a).unwrap(), "a").is_none());
    assert_eq!(controller.state().selected_tag.as_deref(), Some("a"));
}

#[test]
fn test_link_wrap_via_href_command_updates_existing_anchor() {
    let (surface, mut controller) = open(r#"<body><p><a href="/old"><span>Go</span></a></p></body>"#);
    click(&surface, &mut controller, "span");

    controller.apply(EditCommand::Href("/new".into())).unwrap();

    assert_eq!(count(&surface, "a"), 1);
    assert_eq!(controller.state().fields.href, "/new");
}

#[test]
fn test_link_wrap_refuses_element_containing_a_link() {
    let (surface, mut controller) =
        open(r#"<body><div class="card"><a href="/inner">Inner</a> text</div></body>"#);
    click(&surface, &mut controller, "div");
    let version = surface.borrow().document().version;

    let err = controller.wrap_link("/outer").unwrap_err();

    assert!(matches!(err, EditorError::InvalidInput { field: "link", .. }));
    assert_eq!(count(&surface, "a"), 1);
    assert_eq!(surface.borrow().document().version, version);
    let surface_ref = surface.borrow();
    let tree = surface_ref.tree();
    let div = tree.elements_by_tag("div")[0];
    assert_eq!(tree.parent(div), tree.body());
}

#[test]
fn test_link_wrap_refuses_body() {
    let (surface, mut controller) = open(PAGE);
    click(&surface, &mut controller, "body");

    let err = controller.wrap_link("/anywhere").unwrap_err();

    assert!(matches!(err, EditorError::InvalidInput { field: "link", .. }));
    assert_eq!(count(&surface, "a"), 0);
}

#[test]
fn test_link_wrap_rejects_malformed_url() {
    let (surface, mut controller) = open(PAGE);
    click(&surface, &mut controller, "button");

    let err = controller.wrap_link("javascript:alert(1)").unwrap_err();
    assert!(matches!(err, EditorError::InvalidInput { field: "link", .. }));
    assert_eq!(count(&surface, "a"), 0);
}

#[test]
fn test_addresses_are_stable_and_distinct() {
    let (surface, mut controller) = open(PAGE);

    let first = click(&surface, &mut controller, "img");
    let again = click(&surface, &mut controller, "img");
    assert_eq!(first, again);

    // re-instrumentation after an insertion does not disturb existing ids
    let main = surface.borrow().tree().elements_by_tag("main")[0];
    surface
        .borrow_mut()
        .insert_html(main, 0, "<img src=\"/inserted.png\">")
        .unwrap();
    controller.handle_events();

    let hero = surface.borrow().tree().find_by_attr("id", "hero").unwrap();
    let after = surface.borrow_mut().click(hero).unwrap();
    controller.handle_events();
    assert_eq!(first, after);

    let button = click(&surface, &mut controller, "button");
    assert_ne!(first, button);
}

#[test]
fn test_remove_refuses_document_root() {
    let (surface, mut controller) = open(PAGE);
    click(&surface, &mut controller, "html");

    assert!(matches!(controller.remove_selected(), Err(EditorError::RootRemoval)));
    assert_eq!(count(&surface, "html"), 1);
}

#[test]
fn test_remove_deletes_exactly_the_subtree() {
    let (surface, mut controller) = open(PAGE);
    click(&surface, &mut controller, "header");
    let before = surface.borrow().tree().elements().len();

    controller.remove_selected().unwrap();

    assert!(controller.state().is_empty());
    assert_eq!(count(&surface, "header"), 0);
    assert_eq!(count(&surface, "h1"), 0);
    assert_eq!(count(&surface, "main"), 1);
    // header, its drag handle and the h1
    assert_eq!(surface.borrow().tree().elements().len(), before - 3);
}

#[test]
fn test_edits_apply_to_live_tree_immediately() {
    let (surface, mut controller) = open(PAGE);
    click(&surface, &mut controller, "img");

    controller.apply(EditCommand::Src("https://cdn.example/new.jpg".into())).unwrap();
    controller.apply(EditCommand::Alt("New hero".into())).unwrap();
    controller.apply(EditCommand::BorderRadius("8px".into())).unwrap();

    let surface_ref = surface.borrow();
    let tree = surface_ref.tree();
    let img = tree.find_by_attr("id", "hero").unwrap();
    assert_eq!(tree.attr(img, "src"), Some("https://cdn.example/new.jpg"));
    assert_eq!(tree.attr(img, "alt"), Some("New hero"));
    assert_eq!(tree.attr(img, "style"), Some("border-radius: 8px;"));
    assert_eq!(controller.state().fields.src, "https://cdn.example/new.jpg");
    assert_eq!(surface_ref.document().version, 3);
}

#[test]
fn test_selection_message_for_removed_element_is_tolerated() {
    let (surface, mut controller) = open(PAGE);
    let p = surface.borrow().tree().elements_by_tag("p")[0];
    surface.borrow_mut().click(p).unwrap();
    surface.borrow_mut().tree_mut().remove(p);

    assert_eq!(controller.handle_events(), 1);
    assert!(controller.state().is_empty());
    assert!(controller.apply(EditCommand::Text("ignored".into())).is_ok());
}

//! # Edit Commands
//!
//! Property edits issued by the controller's field editors.
//!
//! Each command is a tagged variant (`{ "kind": "padding", "value": "8px" }`)
//! and is applied through an explicit handler table, so the set of editable
//! properties is enumerable via [`CommandKind::ALL`] and every kind is
//! guaranteed a handler by an exhaustive `match`.

use crate::EditorError;
use clonup_dom::markers::is_instrumentation_class;
use clonup_dom::{DomTree, NodeData, NodeId, StyleDeclarations};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Horizontal alignment choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// A single property edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum EditCommand {
    Text(String),
    ElementId(String),
    Class(String),
    Href(String),
    Src(String),
    Alt(String),
    BackgroundColor(String),
    Color(String),
    BorderRadius(String),
    Padding(String),
    Margin(String),
    Align(Alignment),
    Width(String),
    Height(String),
    FontFamily(String),
    FontSize(String),
    FontWeight(String),
    FontStyle(String),
}

/// Discriminant of [`EditCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Text,
    ElementId,
    Class,
    Href,
    Src,
    Alt,
    BackgroundColor,
    Color,
    BorderRadius,
    Padding,
    Margin,
    Align,
    Width,
    Height,
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
}

impl CommandKind {
    pub const ALL: [CommandKind; 18] = [
        CommandKind::Text,
        CommandKind::ElementId,
        CommandKind::Class,
        CommandKind::Href,
        CommandKind::Src,
        CommandKind::Alt,
        CommandKind::BackgroundColor,
        CommandKind::Color,
        CommandKind::BorderRadius,
        CommandKind::Padding,
        CommandKind::Margin,
        CommandKind::Align,
        CommandKind::Width,
        CommandKind::Height,
        CommandKind::FontFamily,
        CommandKind::FontSize,
        CommandKind::FontWeight,
        CommandKind::FontStyle,
    ];

    /// CSS property written by a plain style command
    pub fn style_property(self) -> Option<&'static str> {
        match self {
            CommandKind::BackgroundColor => Some("background-color"),
            CommandKind::Color => Some("color"),
            CommandKind::BorderRadius => Some("border-radius"),
            CommandKind::Padding => Some("padding"),
            CommandKind::Margin => Some("margin"),
            CommandKind::Width => Some("width"),
            CommandKind::Height => Some("height"),
            CommandKind::FontFamily => Some("font-family"),
            CommandKind::FontSize => Some("font-size"),
            CommandKind::FontWeight => Some("font-weight"),
            CommandKind::FontStyle => Some("font-style"),
            CommandKind::Text
            | CommandKind::ElementId
            | CommandKind::Class
            | CommandKind::Href
            | CommandKind::Src
            | CommandKind::Alt
            | CommandKind::Align => None,
        }
    }

    /// Whether the command edits the element's style (skipped on
    /// non-stylable tags)
    pub fn is_style(self) -> bool {
        self.style_property().is_some() || self == CommandKind::Align
    }
}

impl EditCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            EditCommand::Text(_) => CommandKind::Text,
            EditCommand::ElementId(_) => CommandKind::ElementId,
            EditCommand::Class(_) => CommandKind::Class,
            EditCommand::Href(_) => CommandKind::Href,
            EditCommand::Src(_) => CommandKind::Src,
            EditCommand::Alt(_) => CommandKind::Alt,
            EditCommand::BackgroundColor(_) => CommandKind::BackgroundColor,
            EditCommand::Color(_) => CommandKind::Color,
            EditCommand::BorderRadius(_) => CommandKind::BorderRadius,
            EditCommand::Padding(_) => CommandKind::Padding,
            EditCommand::Margin(_) => CommandKind::Margin,
            EditCommand::Align(_) => CommandKind::Align,
            EditCommand::Width(_) => CommandKind::Width,
            EditCommand::Height(_) => CommandKind::Height,
            EditCommand::FontFamily(_) => CommandKind::FontFamily,
            EditCommand::FontSize(_) => CommandKind::FontSize,
            EditCommand::FontWeight(_) => CommandKind::FontWeight,
            EditCommand::FontStyle(_) => CommandKind::FontStyle,
        }
    }

    /// String payload (everything except `Align`)
    pub fn text_value(&self) -> Option<&str> {
        match self {
            EditCommand::Align(_) => None,
            EditCommand::Text(v)
            | EditCommand::ElementId(v)
            | EditCommand::Class(v)
            | EditCommand::Href(v)
            | EditCommand::Src(v)
            | EditCommand::Alt(v)
            | EditCommand::BackgroundColor(v)
            | EditCommand::Color(v)
            | EditCommand::BorderRadius(v)
            | EditCommand::Padding(v)
            | EditCommand::Margin(v)
            | EditCommand::Width(v)
            | EditCommand::Height(v)
            | EditCommand::FontFamily(v)
            | EditCommand::FontSize(v)
            | EditCommand::FontWeight(v)
            | EditCommand::FontStyle(v) => Some(v),
        }
    }

    /// Reject malformed input before anything touches the document
    pub fn validate(&self) -> Result<(), EditorError> {
        match self {
            EditCommand::Href(href) => validate_href(href),
            EditCommand::Src(src) => validate_src(src),
            EditCommand::ElementId(id) => {
                if id.chars().any(char::is_whitespace) {
                    Err(EditorError::invalid("id", "must not contain whitespace"))
                } else {
                    Ok(())
                }
            }
            EditCommand::Text(_) | EditCommand::Class(_) | EditCommand::Alt(_) | EditCommand::Align(_) => Ok(()),
            other => {
                let value = other.text_value().unwrap_or_default();
                if value.contains([';', '{', '}']) {
                    Err(EditorError::invalid("style value", format!("{:?} is not a single CSS value", value)))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Link targets: fragment, relative path, or http(s)/mailto/tel URL
pub fn validate_href(href: &str) -> Result<(), EditorError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(EditorError::invalid("link", "URL is required"));
    }
    if href.chars().any(char::is_whitespace) {
        return Err(EditorError::invalid("link", "URL must not contain whitespace"));
    }
    if href.starts_with(['#', '/', '?', '.']) {
        return Ok(());
    }
    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "mailto" | "tel") => Ok(()),
        Ok(url) => Err(EditorError::invalid(
            "link",
            format!("unsupported scheme {:?}", url.scheme()),
        )),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(()),
        Err(e) => Err(EditorError::invalid("link", e.to_string())),
    }
}

/// Media sources: relative path or http(s)/data URL, never empty
pub fn validate_src(src: &str) -> Result<(), EditorError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(EditorError::invalid("source", "URL is required"));
    }
    if src.starts_with(['/', '.']) {
        return Ok(());
    }
    match Url::parse(src) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "data" | "blob") => Ok(()),
        Ok(url) => Err(EditorError::invalid(
            "source",
            format!("unsupported scheme {:?}", url.scheme()),
        )),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(()),
        Err(e) => Err(EditorError::invalid("source", e.to_string())),
    }
}

/// Tags that accept no style edits at all
const NON_STYLABLE_TAGS: &[&str] = &[
    "html", "head", "meta", "link", "script", "style", "noscript", "title", "base", "br",
    "template", "source", "track", "param",
];

/// Replaced / inline-box elements aligned through their own margins
const SELF_ALIGNED_TAGS: &[&str] = &[
    "a", "button", "img", "input", "video", "iframe", "select", "textarea", "picture", "svg",
];

/// Elements that carry a `src`
const SRC_TAGS: &[&str] = &[
    "img", "video", "audio", "source", "iframe", "embed", "input", "track", "script",
];

pub fn is_stylable(tag: &str) -> bool {
    !NON_STYLABLE_TAGS.contains(&tag)
}

pub fn is_self_aligned(tag: &str) -> bool {
    SELF_ALIGNED_TAGS.contains(&tag)
}

/// Handler applying one command kind to a live element
pub type Handler = fn(&mut DomTree, NodeId, &EditCommand);

/// Handler for each command kind
pub fn handler_for(kind: CommandKind) -> Handler {
    match kind {
        CommandKind::Text => apply_text,
        CommandKind::ElementId => apply_element_id,
        CommandKind::Class => apply_class,
        CommandKind::Href => apply_href,
        CommandKind::Src => apply_src,
        CommandKind::Alt => apply_alt,
        CommandKind::Align => apply_align,
        CommandKind::BackgroundColor
        | CommandKind::Color
        | CommandKind::BorderRadius
        | CommandKind::Padding
        | CommandKind::Margin
        | CommandKind::Width
        | CommandKind::Height
        | CommandKind::FontFamily
        | CommandKind::FontSize
        | CommandKind::FontWeight
        | CommandKind::FontStyle => apply_style_property,
    }
}

/// Kind → handler dispatch table
#[derive(Debug, Clone)]
pub struct HandlerTable {
    handlers: HashMap<CommandKind, Handler>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self {
            handlers: CommandKind::ALL
                .iter()
                .map(|kind| (*kind, handler_for(*kind)))
                .collect(),
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = CommandKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Apply `command` to `node`; returns `false` if no handler is registered
    pub fn dispatch(&self, tree: &mut DomTree, node: NodeId, command: &EditCommand) -> bool {
        match self.handlers.get(&command.kind()) {
            Some(handler) => {
                handler(tree, node, command);
                true
            }
            None => false,
        }
    }
}

fn apply_text(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    let Some(text) = command.text_value() else {
        return;
    };

    if tree.child_elements(node).is_empty() {
        tree.set_text(node, text);
        return;
    }

    // Mixed content: rewrite the element's own text, keep child elements
    let direct_text: Vec<NodeId> = tree
        .children(node)
        .iter()
        .copied()
        .filter(|c| matches!(tree.data(*c), NodeData::Text(_)))
        .collect();
    match direct_text.split_first() {
        Some((first, rest)) => {
            tree.set_text_data(*first, text);
            for extra in rest {
                tree.remove(*extra);
            }
        }
        None => {
            let text_node = tree.create_text(text);
            tree.insert_at(node, 0, text_node);
        }
    }
}

fn set_or_clear(tree: &mut DomTree, node: NodeId, name: &str, value: &str) {
    if value.trim().is_empty() {
        tree.remove_attr(node, name);
    } else {
        tree.set_attr(node, name, value.trim());
    }
}

fn apply_element_id(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    set_or_clear(tree, node, "id", command.text_value().unwrap_or_default());
}

/// Replace the author classes while keeping instrumentation classes
fn apply_class(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    let mut classes: Vec<String> = command
        .text_value()
        .unwrap_or_default()
        .split_ascii_whitespace()
        .filter(|c| !is_instrumentation_class(c))
        .map(str::to_string)
        .collect();
    classes.extend(
        tree.classes(node)
            .into_iter()
            .filter(|c| is_instrumentation_class(c))
            .map(str::to_string),
    );
    set_or_clear(tree, node, "class", &classes.join(" "));
}

fn apply_href(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    if tree.tag(node) == Some("a") {
        set_or_clear(tree, node, "href", command.text_value().unwrap_or_default());
    }
}

fn apply_src(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    let Some(tag) = tree.tag(node) else {
        return;
    };
    if !SRC_TAGS.contains(&tag) {
        return;
    }
    let is_img = tag == "img";
    set_or_clear(tree, node, "src", command.text_value().unwrap_or_default());
    // a srcset would keep rendering the old image
    if is_img {
        tree.remove_attr(node, "srcset");
    }
}

fn apply_alt(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    tree.set_attr(node, "alt", command.text_value().unwrap_or_default());
}

fn update_style(tree: &mut DomTree, node: NodeId, edit: impl FnOnce(&mut StyleDeclarations)) {
    let mut style = StyleDeclarations::parse(tree.attr(node, "style").unwrap_or_default());
    edit(&mut style);
    if style.is_empty() {
        tree.remove_attr(node, "style");
    } else {
        tree.set_attr(node, "style", style.to_string());
    }
}

fn apply_style_property(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    let (Some(property), Some(value)) = (command.kind().style_property(), command.text_value()) else {
        return;
    };
    update_style(tree, node, |style| style.set(property, value));
}

/// `text-align` for text containers; margin-auto + block display for
/// elements whose own box `text-align` cannot move
fn apply_align(tree: &mut DomTree, node: NodeId, command: &EditCommand) {
    let EditCommand::Align(alignment) = command else {
        return;
    };
    let Some(tag) = tree.tag(node) else {
        return;
    };
    let self_aligned = is_self_aligned(tag);
    let is_img = tag == "img";

    if !self_aligned {
        update_style(tree, node, |style| style.set("text-align", alignment.as_str()));
        return;
    }

    let (left, right) = match alignment {
        Alignment::Left => ("0", "auto"),
        Alignment::Center => ("auto", "auto"),
        Alignment::Right => ("auto", "0"),
    };
    update_style(tree, node, |style| {
        style.set("display", "block");
        style.set("margin-left", left);
        style.set("margin-right", right);
        if !is_img && style.get("width").is_none() {
            style.set("width", "fit-content");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonup_dom::parse_document;

    fn first(tree: &DomTree, tag: &str) -> NodeId {
        tree.elements_by_tag(tag)[0]
    }

    #[test]
    fn test_every_kind_has_a_handler() {
        let table = HandlerTable::new();
        assert_eq!(table.kinds().count(), CommandKind::ALL.len());
    }

    #[test]
    fn test_command_serialization() {
        let command = EditCommand::BackgroundColor("#fff".to_string());
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, r##"{"kind":"backgroundColor","value":"#fff"}"##);

        let align: EditCommand = serde_json::from_str(r#"{"kind":"align","value":"center"}"#).unwrap();
        assert_eq!(align, EditCommand::Align(Alignment::Center));
    }

    #[test]
    fn test_href_validation() {
        assert!(validate_href("https://example.com/a").is_ok());
        assert!(validate_href("/pricing").is_ok());
        assert!(validate_href("#faq").is_ok());
        assert!(validate_href("mailto:a@b.c").is_ok());
        assert!(validate_href("page.html").is_ok());
        assert!(validate_href("").is_err());
        assert!(validate_href("javascript:alert(1)").is_err());
        assert!(validate_href("https://exa mple.com").is_err());
    }

    #[test]
    fn test_style_value_validation() {
        assert!(EditCommand::Padding("4px 8px".into()).validate().is_ok());
        assert!(EditCommand::Color("red; position: fixed".into()).validate().is_err());
        assert!(EditCommand::Src(" ".into()).validate().is_err());
        assert!(EditCommand::ElementId("a b".into()).validate().is_err());
    }

    #[test]
    fn test_text_keeps_child_elements() {
        let mut tree = parse_document("<body><button>Buy <span>now</span></button></body>").unwrap();
        let button = first(&tree, "button");
        apply_text(&mut tree, button, &EditCommand::Text("Order".into()));
        assert_eq!(tree.text_content(button), "Ordernow");
        assert_eq!(tree.elements_by_tag("span").len(), 1);
    }

    #[test]
    fn test_class_keeps_instrumentation() {
        let mut tree = parse_document("<body><p class=\"old clonup-selected\">x</p></body>").unwrap();
        let p = first(&tree, "p");
        apply_class(&mut tree, p, &EditCommand::Class("lead".into()));
        assert_eq!(tree.attr(p, "class"), Some("lead clonup-selected"));
    }

    #[test]
    fn test_src_drops_srcset() {
        let mut tree = parse_document("<body><img src=\"a.png\" srcset=\"a2.png 2x\"></body>").unwrap();
        let img = first(&tree, "img");
        apply_src(&mut tree, img, &EditCommand::Src("b.png".into()));
        assert_eq!(tree.attr(img, "src"), Some("b.png"));
        assert_eq!(tree.attr(img, "srcset"), None);
    }

    #[test]
    fn test_align_text_container_uses_text_align() {
        let mut tree = parse_document("<body><h2>t</h2></body>").unwrap();
        let h2 = first(&tree, "h2");
        apply_align(&mut tree, h2, &EditCommand::Align(Alignment::Right));
        assert_eq!(tree.attr(h2, "style"), Some("text-align: right;"));
    }

    #[test]
    fn test_align_image_uses_margins() {
        let mut tree = parse_document("<body><img src=\"a.png\" style=\"margin: 4px\"></body>").unwrap();
        let img = first(&tree, "img");
        apply_align(&mut tree, img, &EditCommand::Align(Alignment::Center));
        let style = StyleDeclarations::parse(tree.attr(img, "style").unwrap());
        assert_eq!(style.get("display"), Some("block"));
        assert_eq!(style.get("margin-left"), Some("auto"));
        assert_eq!(style.get("margin-right"), Some("auto"));
        assert_eq!(style.get("text-align"), None);
        assert_eq!(style.get("width"), None);
    }

    #[test]
    fn test_empty_style_value_removes_property() {
        let mut tree = parse_document("<body><div style=\"padding: 4px\">x</div></body>").unwrap();
        let div = first(&tree, "div");
        apply_style_property(&mut tree, div, &EditCommand::Padding(String::new()));
        assert_eq!(tree.attr(div, "style"), None);
    }
}

//! Scripted edits.
//!
//! A JSON list of steps replayed against an [`EditSession`], so edits can be
//! applied without the interactive surface:
//!
//! ```json
//! { "steps": [
//!     { "op": "select", "target": "#hero" },
//!     { "op": "apply", "command": { "kind": "src", "value": "/new.jpg" } },
//!     { "op": "select", "target": "button:0" },
//!     { "op": "link", "href": "/checkout" },
//!     { "op": "scripts", "location": "head", "text": "<script>fbq('init', '1')</script>" }
//! ] }
//! ```

use crate::{EditSession, WorkspaceError};
use clonup_dom::markers::is_editor_element;
use clonup_dom::{DomTree, NodeId};
use clonup_editor::EditCommand;
use clonup_scripts::ScriptLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Names one element of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementTarget {
    /// `#value` — the element with that `id` attribute
    Id(String),
    /// `tag:n` — the n-th (zero-based) element with that tag
    Nth { tag: String, index: usize },
}

impl ElementTarget {
    pub fn resolve(&self, tree: &DomTree) -> Option<NodeId> {
        match self {
            ElementTarget::Id(id) => tree.find_by_attr("id", id),
            ElementTarget::Nth { tag, index } => tree
                .elements_by_tag(tag)
                .into_iter()
                .filter(|node| !is_editor_element(tree, *node))
                .nth(*index),
        }
    }
}

impl FromStr for ElementTarget {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix('#') {
            if id.is_empty() {
                return Err(WorkspaceError::TargetNotFound(s.to_string()));
            }
            return Ok(ElementTarget::Id(id.to_string()));
        }

        let (tag, index) = match s.split_once(':') {
            Some((tag, index)) => {
                let index = index
                    .parse()
                    .map_err(|_| WorkspaceError::TargetNotFound(s.to_string()))?;
                (tag, index)
            }
            None => (s, 0),
        };
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(WorkspaceError::TargetNotFound(s.to_string()));
        }
        Ok(ElementTarget::Nth {
            tag: tag.to_ascii_lowercase(),
            index,
        })
    }
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementTarget::Id(id) => write!(f, "#{id}"),
            ElementTarget::Nth { tag, index } => write!(f, "{tag}:{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditStep {
    Select {
        target: String,
    },
    Apply {
        command: EditCommand,
    },
    Link {
        href: String,
    },
    Remove,
    Insert {
        parent: String,
        index: usize,
        html: String,
    },
    Move {
        target: String,
        parent: String,
        index: usize,
    },
    Scripts {
        location: ScriptLocation,
        text: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    pub steps: Vec<EditStep>,
}

impl EditScript {
    pub fn from_json(json: &str) -> Result<Self, WorkspaceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Replay every step; stops at the first failure, naming the step
    pub fn apply(&self, session: &mut EditSession) -> Result<usize, WorkspaceError> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(step = index, ?step, "Applying edit step");
            apply_step(session, step).map_err(|err| WorkspaceError::EditStep {
                step: index + 1,
                reason: err.to_string(),
            })?;
        }
        Ok(self.steps.len())
    }
}

fn apply_step(session: &mut EditSession, step: &EditStep) -> Result<(), WorkspaceError> {
    match step {
        EditStep::Select { target } => {
            session.select(&target.parse()?)?;
        }
        EditStep::Apply { command } => session.apply(command.clone())?,
        EditStep::Link { href } => session.wrap_link(href)?,
        EditStep::Remove => session.remove_selected()?,
        EditStep::Insert {
            parent,
            index,
            html,
        } => {
            session.insert_html(&parent.parse()?, *index, html)?;
        }
        EditStep::Move {
            target,
            parent,
            index,
        } => session.move_element(&target.parse()?, &parent.parse()?, *index)?,
        EditStep::Scripts { location, text } => session.set_script_text(*location, text.clone()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonup_dom::parse_document;

    #[test]
    fn test_parse_targets() {
        assert_eq!(
            "#hero".parse::<ElementTarget>().unwrap(),
            ElementTarget::Id("hero".to_string())
        );
        assert_eq!(
            "IMG:2".parse::<ElementTarget>().unwrap(),
            ElementTarget::Nth {
                tag: "img".to_string(),
                index: 2
            }
        );
        assert_eq!("h1".parse::<ElementTarget>().unwrap().to_string(), "h1:0");
        assert!("#".parse::<ElementTarget>().is_err());
        assert!("p:x".parse::<ElementTarget>().is_err());
        assert!("a b".parse::<ElementTarget>().is_err());
    }

    #[test]
    fn test_resolve_skips_editor_elements() {
        let tree = parse_document(
            r#"<body><div data-clonup-handle="true" class="clonup-drag-handle"></div><div id="real"></div></body>"#,
        )
        .unwrap();
        let target: ElementTarget = "div:0".parse().unwrap();
        let node = target.resolve(&tree).unwrap();
        assert_eq!(tree.attr(node, "id"), Some("real"));
    }

    #[test]
    fn test_parse_script() {
        let script = EditScript::from_json(
            r##"{ "steps": [
                { "op": "select", "target": "#hero" },
                { "op": "apply", "command": { "kind": "alt", "value": "Hero" } },
                { "op": "remove" },
                { "op": "scripts", "location": "body", "text": "" }
            ] }"##,
        )
        .unwrap();

        assert_eq!(script.steps.len(), 4);
        assert_eq!(
            script.steps[1],
            EditStep::Apply {
                command: EditCommand::Alt("Hero".to_string())
            }
        );
        assert_eq!(script.steps[2], EditStep::Remove);
    }
}

//! HTML markup of the feature tree for the browser panel.
//!
//! Containers become `<details>`/`<summary>`, feature leaves become `<span>`
//! elements carrying a `data-shape-id` attribute which the viewer script reads
//! on click.

use std::fmt::Write;

use crate::tree::{FeatureTree, NodeId, NodeKind};

/// CSS class of a highlighted tree element.
pub const SELECTED_CLASS: &str = "feature-selected";

pub fn render_html(tree: &FeatureTree) -> String {
    let mut out = String::new();
    render_node(tree, tree.root(), &mut out);
    out
}

fn render_node(tree: &FeatureTree, id: NodeId, out: &mut String) {
    let Some(node) = tree.node(id) else { return };
    let label = escape_html(&node.label);

    let mut classes = Vec::new();
    if node.highlighted {
        classes.push(SELECTED_CLASS);
    }
    if node.hidden {
        classes.push("hidden");
    }
    let class_attr = if classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", classes.join(" "))
    };

    match node.kind {
        NodeKind::Message => {
            let _ = write!(out, "<div class=\"error-message\">{label}</div>");
        }
        NodeKind::Parameter => {
            let _ = write!(out, "<article class=\"parameter\">{label}</article>");
        }
        NodeKind::Feature => {
            let tag = node
                .shape_tag()
                .map(|t| format!(" data-shape-id=\"{t}\""))
                .unwrap_or_default();
            let _ = write!(out, "<span{class_attr}{tag}>{label}</span>");
        }
        NodeKind::Part | NodeKind::Group | NodeKind::SubGroup => {
            let open = if node.open { " open" } else { "" };
            let _ = write!(
                out,
                "<details{class_attr}{open}><summary><div class=\"label\">{label}</div>"
            );
            if let Some(swatch) = node.swatch {
                let _ = write!(
                    out,
                    "<div class=\"color-square\" style=\"background-color: {}\"></div>",
                    swatch.css()
                );
            }
            out.push_str("</summary>");
            for &child in tree.children(id) {
                render_node(tree, child, out);
            }
            out.push_str("</details>");
        }
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

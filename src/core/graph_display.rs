// src/core/graph_display.rs

use crate::core::tree::{Node, NodeId, ParameterTree};
use std::fmt::Write;

/// Controls what [`render_parameter_tree`] includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Include parameters flagged as advanced.
    pub show_advanced: bool,
    /// Append each parameter's description.
    pub show_descriptions: bool,
}

/// Renders an ASCII tree of sections and parameters, in declaration order.
pub fn render_parameter_tree(tree: &ParameterTree, options: &DisplayOptions) -> String {
    let mut out = String::new();
    let root = tree.root();
    let children = visible_children(tree, root, options);
    if children.is_empty() {
        out.push_str("(no parameters)\n");
        return out;
    }
    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        render_node(tree, *child, options, "", is_last, &mut out);
    }
    out
}

fn visible_children(tree: &ParameterTree, id: NodeId, options: &DisplayOptions) -> Vec<NodeId> {
    tree.children(id)
        .map(|(_, child)| child)
        .filter(|child| match tree.node(*child) {
            Some(Node::Leaf(parameter)) => options.show_advanced || !parameter.is_advanced(),
            Some(Node::Section(_)) => true,
            None => false,
        })
        .collect()
}

/// Recursive function to render a node and its descendants.
fn render_node(
    tree: &ParameterTree,
    id: NodeId,
    options: &DisplayOptions,
    prefix: &str,
    is_last: bool,
    out: &mut String,
) {
    let connector = if is_last { "└─" } else { "├─" };

    match tree.node(id) {
        Some(Node::Section(section)) => {
            let _ = write!(out, "{}{}{}/", prefix, connector, section.name());
            if options.show_descriptions && !section.description().is_empty() {
                let _ = write!(out, "  # {}", section.description());
            }
            out.push('\n');
        }
        Some(Node::Leaf(parameter)) => {
            let mut markers = String::new();
            if !parameter.is_optional() {
                markers.push_str(" (required)");
            }
            if parameter.is_advanced() {
                markers.push_str(" (advanced)");
            }
            let value = if parameter.is_null() {
                "<null>".to_string()
            } else {
                format!("\"{}\"", parameter.string_rep())
            };
            let _ = write!(
                out,
                "{}{}{} [{}] = {}{}",
                prefix,
                connector,
                parameter.key(),
                parameter.mnemonic(),
                value,
                markers
            );
            if options.show_descriptions && !parameter.description().is_empty() {
                let _ = write!(out, "  # {}", parameter.description());
            }
            out.push('\n');
        }
        None => return,
    }

    // Prepare the prefix for the children of this node
    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    let children = visible_children(tree, id, options);
    for (i, child) in children.iter().enumerate() {
        let is_last_child = i == children.len() - 1;
        render_node(tree, *child, options, &child_prefix, is_last_child, out);
    }
}

// MARK: --- UNIT TESTS ---

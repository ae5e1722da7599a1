// src/core/tree.rs

//! # Configuration Tree
//!
//! An ordered hierarchy of sections and parameters mirroring the `NODE`/`ITEM`
//! structure of a CTD document. Nodes live in an arena and are addressed by
//! [`NodeId`] handles; every section owns its children exclusively, so the
//! structure is always a tree. The parent link is only used to rebuild paths.
//!
//! Paths are dot-joined names from the root (`"1.2.z"`). Each segment must match
//! a child name exactly and case-sensitively; the empty path is the root.

use crate::{
    constants::DEFAULT_SECTION,
    core::parameters::{Parameter, ParameterError},
};
use indexmap::IndexMap;
use thiserror::Error;

/// Errors of path resolution and tree edits. A failed edit leaves the tree unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("No node found at path '{path}'.")]
    PathNotFound { path: String },
    #[error("Node at path '{path}' is a section, not a parameter.")]
    NotALeaf { path: String },
    #[error("Node at path '{path}' is a parameter, not a section.")]
    NotASection { path: String },
    #[error("Section '{section}' already contains a child named '{name}'.")]
    DuplicateName { section: String, name: String },
    #[error("'{name}' is not a valid node name: names must be non-empty and free of '.'.")]
    InvalidName { name: String },
    #[error("Cannot update '{path}': {source}")]
    Parameter {
        path: String,
        #[source]
        source: ParameterError,
    },
}

type TreeResult<T> = Result<T, TreeError>;

/// Stable handle to a node of a [`ParameterTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A named grouping node. Children keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    description: String,
    category: String,
    children: IndexMap<String, NodeId>,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A tree node: a section or a parameter leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Section(Section),
    Leaf(Parameter),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Section(s) => s.name(),
            Self::Leaf(p) => p.key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    parent: Option<NodeId>,
    node: Node,
}

/// Ordered hierarchy of sections and parameters addressed by dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTree {
    slots: Vec<Slot>,
}

impl Default for ParameterTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterTree {
    /// Creates a tree holding only the (unnamed) root section.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                parent: None,
                node: Node::Section(Section {
                    name: String::new(),
                    description: String::new(),
                    category: DEFAULT_SECTION.to_string(),
                    children: IndexMap::new(),
                }),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).map(|slot| &slot.node)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|slot| slot.parent)
    }

    pub fn section(&self, id: NodeId) -> Option<&Section> {
        match self.node(id) {
            Some(Node::Section(section)) => Some(section),
            _ => None,
        }
    }

    /// Number of parameters in the whole tree.
    pub fn leaf_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.node, Node::Leaf(_)))
            .count()
    }

    /// Children of a section in insertion order. Empty for leaves.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> {
        self.section(id)
            .into_iter()
            .flat_map(|s| s.children.iter().map(|(name, child)| (name.as_str(), *child)))
    }

    /// Resolves a dotted path to a node handle.
    pub fn resolve(&self, path: &str) -> TreeResult<NodeId> {
        let mut current = self.root();
        if path.is_empty() {
            return Ok(current);
        }
        for segment in path.split('.') {
            current = self
                .section(current)
                .and_then(|section| section.children.get(segment))
                .copied()
                .ok_or_else(|| TreeError::PathNotFound {
                    path: path.to_string(),
                })?;
        }
        Ok(current)
    }

    /// Rebuilds the dotted path of a node from its parent links.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(slot) = self.slots.get(node_id.0)
                && slot.parent.is_some()
            {
                names.push(slot.node.name());
                current = slot.parent;
            } else {
                break;
            }
        }
        names.reverse();
        names.join(".")
    }

    /// Returns the section at `path`, creating every missing section on the way.
    pub fn get_or_create_section(&mut self, path: &str) -> TreeResult<NodeId> {
        let mut current = self.root();
        if path.is_empty() {
            return Ok(current);
        }
        let segments: Vec<&str> = path.split('.').collect();
        if let Some(empty) = segments.iter().find(|segment| segment.is_empty()) {
            return Err(TreeError::InvalidName {
                name: empty.to_string(),
            });
        }

        // Walk the existing prefix first so a failure leaves the tree untouched.
        let mut depth = 0;
        while let Some(segment) = segments.get(depth) {
            let existing = match self.node(current) {
                Some(Node::Section(section)) => section.children.get(*segment).copied(),
                _ => None,
            };
            let Some(id) = existing else { break };
            if !matches!(self.node(id), Some(Node::Section(_))) {
                return Err(TreeError::NotASection {
                    path: self.path_of(id),
                });
            }
            current = id;
            depth += 1;
        }

        for segment in segments.iter().skip(depth) {
            current = self.insert_section(current, segment, "")?;
        }
        Ok(current)
    }

    /// Appends a new, empty section named `name` under `parent`.
    pub fn insert_section(
        &mut self,
        parent: NodeId,
        name: &str,
        description: &str,
    ) -> TreeResult<NodeId> {
        let category = {
            let parent_path = self.path_of(parent);
            if parent_path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", parent_path, name)
            }
        };
        self.attach(
            parent,
            name,
            Node::Section(Section {
                name: name.to_string(),
                description: description.to_string(),
                category,
                children: IndexMap::new(),
            }),
        )
    }

    /// Appends `parameter` under `parent`, keyed by the parameter's key.
    pub fn insert_parameter(&mut self, parent: NodeId, parameter: Parameter) -> TreeResult<NodeId> {
        let name = parameter.key().to_string();
        self.attach(parent, &name, Node::Leaf(parameter))
    }

    fn attach(&mut self, parent: NodeId, name: &str, node: Node) -> TreeResult<NodeId> {
        if name.is_empty() || name.contains('.') {
            return Err(TreeError::InvalidName {
                name: name.to_string(),
            });
        }
        let id = NodeId(self.slots.len());
        let parent_path = self.path_of(parent);
        match self.slots.get_mut(parent.0).map(|slot| &mut slot.node) {
            Some(Node::Section(section)) => {
                if section.children.contains_key(name) {
                    return Err(TreeError::DuplicateName {
                        section: parent_path,
                        name: name.to_string(),
                    });
                }
                section.children.insert(name.to_string(), id);
            }
            _ => return Err(TreeError::NotASection { path: parent_path }),
        }
        log::trace!("Attached '{}' under '{}' as {:?}", name, parent_path, id);
        self.slots.push(Slot {
            parent: Some(parent),
            node,
        });
        Ok(id)
    }

    /// The parameter at `path`.
    pub fn get_leaf(&self, path: &str) -> TreeResult<&Parameter> {
        let id = self.resolve(path)?;
        match self.node(id) {
            Some(Node::Leaf(parameter)) => Ok(parameter),
            _ => Err(TreeError::NotALeaf {
                path: path.to_string(),
            }),
        }
    }

    pub fn get_leaf_mut(&mut self, path: &str) -> TreeResult<&mut Parameter> {
        let id = self.resolve(path)?;
        match self.slots.get_mut(id.0).map(|slot| &mut slot.node) {
            Some(Node::Leaf(parameter)) => Ok(parameter),
            _ => Err(TreeError::NotALeaf {
                path: path.to_string(),
            }),
        }
    }

    /// Parses `value` with the grammar of the parameter at `path` and stores it.
    /// The parameter is left untouched on failure.
    pub fn set_value_at_path(&mut self, path: &str, value: &str) -> TreeResult<()> {
        log::debug!("Setting '{}' = '{}'", path, value);
        self.get_leaf_mut(path)?
            .fill_from_string(value)
            .map_err(|source| TreeError::Parameter {
                path: path.to_string(),
                source,
            })
    }

    /// Names of the children of the section at `path`, in insertion order.
    pub fn list_children(&self, path: &str) -> TreeResult<Vec<&str>> {
        let id = self.resolve(path)?;
        match self.node(id) {
            Some(Node::Section(section)) => Ok(section.children.keys().map(String::as_str).collect()),
            _ => Err(TreeError::NotASection {
                path: path.to_string(),
            }),
        }
    }

    /// Every parameter with its dotted path, in depth-first declaration order.
    pub fn leaves(&self) -> Vec<(String, &Parameter)> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(self.root(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, id: NodeId, out: &mut Vec<(String, &'a Parameter)>) {
        for (_, child) in self.children(id) {
            match self.node(child) {
                Some(Node::Leaf(parameter)) => out.push((self.path_of(child), parameter)),
                Some(Node::Section(_)) => self.collect_leaves(child, out),
                None => {}
            }
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::{ScalarKind, Value, ValueKind};

    fn sample_tree() -> ParameterTree {
        let mut tree = ParameterTree::new();
        let root = tree.root();
        tree.insert_parameter(root, Parameter::new("x", Value::Double(1.0)).unwrap())
            .unwrap();
        let one = tree.get_or_create_section("1").unwrap();
        tree.insert_parameter(one, Parameter::new("end_id", Value::Int(5)).unwrap())
            .unwrap();
        let two = tree.get_or_create_section("1.2").unwrap();
        tree.insert_parameter(two, Parameter::empty("z", ValueKind::Scalar(ScalarKind::Int)))
            .unwrap();
        tree.insert_parameter(
            one,
            Parameter::empty("o", ValueKind::Scalar(ScalarKind::File)),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_paths_resolve_deterministically() {
        let tree = sample_tree();
        let first = tree.resolve("1.2.z").unwrap();
        let second = tree.resolve("1.2.z").unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.path_of(first), "1.2.z");
        assert_eq!(tree.get_leaf("1.end_id").unwrap().value(), Some(&Value::Int(5)));
    }

    #[test]
    fn test_absent_paths_fail() {
        let tree = sample_tree();
        for path in ["2", "1.2.y", "x.y", "1..z", "1.2.z."] {
            assert!(
                matches!(tree.resolve(path), Err(TreeError::PathNotFound { .. })),
                "path '{}' should not resolve",
                path
            );
        }
        assert!(matches!(tree.get_leaf("1"), Err(TreeError::NotALeaf { .. })));
    }

    #[test]
    fn test_segments_match_exactly() {
        let mut tree = ParameterTree::new();
        let root = tree.root();
        tree.insert_section(root, "01", "").unwrap();
        tree.insert_section(root, "1", "").unwrap();
        let id = tree.resolve("1").unwrap();
        assert_eq!(tree.section(id).unwrap().name(), "1");
        assert!(tree.resolve("001").is_err());
        assert!(tree.resolve("X").is_err());
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let tree = sample_tree();
        assert_eq!(tree.list_children("").unwrap(), ["x", "1"]);
        assert_eq!(tree.list_children("1").unwrap(), ["end_id", "2", "o"]);
        let paths: Vec<String> = tree.leaves().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["x", "1.end_id", "1.2.z", "1.o"]);
    }

    #[test]
    fn test_duplicate_and_invalid_names_are_rejected() {
        let mut tree = sample_tree();
        let one = tree.resolve("1").unwrap();
        let dup = Parameter::empty("end_id", ValueKind::Scalar(ScalarKind::Int));
        assert!(matches!(
            tree.insert_parameter(one, dup),
            Err(TreeError::DuplicateName { .. })
        ));
        assert!(matches!(
            tree.insert_section(one, "a.b", ""),
            Err(TreeError::InvalidName { .. })
        ));
        let leaf = tree.resolve("x").unwrap();
        assert!(matches!(
            tree.insert_section(leaf, "child", ""),
            Err(TreeError::NotASection { .. })
        ));
    }

    #[test]
    fn test_set_value_at_path() {
        let mut tree = sample_tree();
        tree.set_value_at_path("1.2.z", "1979").unwrap();
        let z = tree.get_leaf("1.2.z").unwrap();
        assert_eq!(z.value(), Some(&Value::Int(1979)));
        assert!(!z.is_defaulted());

        let err = tree.set_value_at_path("1.2.z", "abc").unwrap_err();
        assert!(matches!(
            err,
            TreeError::Parameter {
                source: ParameterError::InvalidParameterValue { .. },
                ..
            }
        ));
        assert_eq!(tree.get_leaf("1.2.z").unwrap().value(), Some(&Value::Int(1979)));
        assert!(matches!(
            tree.set_value_at_path("1.q", "1"),
            Err(TreeError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_get_or_create_section_reuses_and_rejects_leaves() {
        let mut tree = sample_tree();
        let existing = tree.resolve("1.2").unwrap();
        assert_eq!(tree.get_or_create_section("1.2").unwrap(), existing);
        let created = tree.get_or_create_section("1.2.3.4").unwrap();
        assert_eq!(tree.path_of(created), "1.2.3.4");
        assert_eq!(tree.section(created).unwrap().category(), "1.2.3.4");
        assert!(matches!(
            tree.get_or_create_section("x.sub"),
            Err(TreeError::NotASection { .. })
        ));
    }

    #[test]
    fn test_get_or_create_section_leaves_tree_untouched_on_failure() {
        let mut tree = ParameterTree::new();
        assert!(matches!(
            tree.get_or_create_section("a..b"),
            Err(TreeError::InvalidName { .. })
        ));
        assert!(tree.list_children("").unwrap().is_empty());

        let mut tree = sample_tree();
        assert!(matches!(
            tree.get_or_create_section("1.new.end_id."),
            Err(TreeError::InvalidName { .. })
        ));
        assert!(matches!(
            tree.get_or_create_section("1.end_id.deeper"),
            Err(TreeError::NotASection { .. })
        ));
        assert_eq!(tree.list_children("1").unwrap(), ["end_id", "2", "o"]);
    }
}

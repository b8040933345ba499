//! Serializable tree description.
//!
//! An HTML parser (or a test) hands the engine a [`TreeNode`]: text is a bare
//! JSON string, an element is an object with `tag`, optional `attrs` and
//! optional `children`.
//!
//! ```json
//! { "tag": "div", "attrs": { "id": "d" },
//!   "children": [ { "tag": "p", "children": ["foo"] } ] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sprig_common::warning::warn_once;

use crate::{Attributes, Document, DomError, NodeId, NodeType};

/// One node of a tree description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// A text node.
    Text(String),
    /// An element with its attributes and children.
    Element {
        /// Tag name, any case.
        tag: String,
        /// Attribute names and values.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        /// Child nodes in order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<TreeNode>,
    },
}

impl TreeNode {
    /// Shorthand for an element description.
    #[must_use]
    pub fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<Self>) -> Self {
        Self::Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    /// Shorthand for a text description.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl Document {
    /// Build a document whose root element is described by `tree`.
    ///
    /// Attribute names that differ only in case collapse to one attribute;
    /// the last one in name order wins and a warning is printed.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::NotAnElement`] if `tree` is a text node.
    pub fn from_tree(tree: &TreeNode) -> Result<Self, DomError> {
        let mut doc = Self::new();
        let root = doc.build(tree)?;
        doc.set_root(root)?;
        Ok(doc)
    }

    /// Allocate the nodes described by `tree` and return the detached top node.
    ///
    /// # Errors
    ///
    /// Propagates [`Document::append_child`] failures, which cannot happen for
    /// freshly allocated nodes.
    pub fn build(&mut self, tree: &TreeNode) -> Result<NodeId, DomError> {
        match tree {
            TreeNode::Text(text) => Ok(self.create_text(text.as_str())),
            TreeNode::Element {
                tag,
                attrs,
                children,
            } => {
                let mut map = Attributes::new();
                for (name, value) in attrs {
                    if map.contains(name) {
                        warn_once(
                            "DOM",
                            &format!("attribute `{name}` on <{tag}> replaces an earlier one"),
                        );
                    }
                    map.set(name, value.as_str());
                }
                let id = self.create_element(tag, map);
                for child in children {
                    let child_id = self.build(child)?;
                    self.append_child(id, child_id)?;
                }
                Ok(id)
            }
        }
    }

    /// Describe the subtree rooted at `id`, or `None` for an unknown id.
    #[must_use]
    pub fn to_tree(&self, id: NodeId) -> Option<TreeNode> {
        match self.get(id)?.node_type() {
            NodeType::Text(text) => Some(TreeNode::Text(text.clone())),
            NodeType::Element(data) => Some(TreeNode::Element {
                tag: data.tag_name().to_string(),
                attrs: data
                    .attrs()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                children: self
                    .children(id)
                    .iter()
                    .filter_map(|&c| self.to_tree(c))
                    .collect(),
            }),
        }
    }
}

//! Document tree for the sprig selector engine.
//!
//! This crate provides an arena-based tree of element and text nodes
//! following the [DOM Living Standard](https://dom.spec.whatwg.org/).
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues. Parents
//! own their children through the child list; the child-to-parent link is a
//! plain index and carries no ownership.
//!
//! Every [`Document`] has its own [`DocumentId`], and every [`NodeId`] records
//! the document that allocated it, so nodes can never be attached across
//! documents.

pub mod attributes;
pub mod builder;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

pub use attributes::Attributes;
pub use builder::TreeNode;

/// Source of fresh document identities.
static NEXT_DOCUMENT_ID: AtomicU32 = AtomicU32::new(0);

/// Identity of one [`Document`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u32);

/// A type-safe index into a [`Document`].
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
///
/// Equality is node identity: two ids are equal only if they name the same
/// slot of the same document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    document: DocumentId,
    index: usize,
}

impl NodeId {
    /// The document that allocated this node.
    #[must_use]
    pub const fn document(self) -> DocumentId {
        self.document
    }

    /// Position of the node in its document's arena (allocation order).
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}:{})", self.document.0, self.index)
    }
}

/// Tree-integrity violations reported by [`Document`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node was allocated by a different document.
    #[error("{0:?} belongs to a different document")]
    ForeignNode(NodeId),

    /// The node was appended somewhere already.
    #[error("{0:?} already has a parent")]
    AlreadyAttached(NodeId),

    /// The operation needs an element but got a text node.
    #[error("{0:?} is not an element")]
    NotAnElement(NodeId),

    /// [§ 4.2.3 Mutation algorithms](https://dom.spec.whatwg.org/#concept-node-ensure-pre-insertion-validity)
    /// "If node is a host-including inclusive ancestor of parent, then throw a
    /// `HierarchyRequestError`."
    #[error("cannot append {child:?} under its own descendant {parent:?}")]
    HierarchyRequest {
        /// The would-be parent.
        parent: NodeId,
        /// The node being appended.
        child: NodeId,
    },
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Node is an abstract interface that is used by all nodes in a tree."
///
/// This node stores indices for parent/child/sibling relationships,
/// enabling O(1) traversal in any direction.
#[derive(Debug, Clone)]
pub struct Node {
    node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    next_sibling: Option<NodeId>,
    prev_sibling: Option<NodeId>,
}

impl Node {
    /// "Each node has an associated node type"
    #[must_use]
    pub const fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    /// "An object that participates in a tree has a parent, which is either
    /// null or an object."
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    /// "A node has an associated list of children"
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    /// "Element nodes are simply known as elements."
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    /// "Text nodes are known as text."
    Text(String),
}

/// Element-specific data.
///
/// NOTE: We only store the local name and attributes. Namespaces are
/// expressed the way the selector grammar does, as a `prefix:name` tag.
#[derive(Debug, Clone)]
pub struct ElementData {
    tag_name: String,
    attrs: Attributes,
}

impl ElementData {
    /// Create element data; the tag name is lower-cased.
    #[must_use]
    pub fn new(tag_name: &str, attrs: Attributes) -> Self {
        Self {
            tag_name: tag_name.to_lowercase(),
            attrs,
        }
    }

    /// "An element's local name", lower-cased.
    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// "An element has an associated attribute list"
    #[must_use]
    pub const fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Value of the attribute called `name`, in any letter case.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    /// Returns the element's id attribute value if present.
    ///
    /// Per [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The id attribute specifies its element's unique identifier (ID)."
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id")
    }

    /// Returns the class names from the class attribute.
    ///
    /// Per [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The class attribute, if specified, must have a value that is a set of
    /// space-separated tokens representing the various classes that the element belongs to."
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs.get("class").unwrap_or("").split_whitespace()
    }

    /// Whether one of the element's class names equals `class_name`,
    /// ignoring case. Both sides are folded with Unicode lowercasing.
    #[must_use]
    pub fn has_class(&self, class_name: &str) -> bool {
        let class_name = class_name.to_lowercase();
        self.classes().any(|c| c.to_lowercase() == class_name)
    }
}

/// Arena-based document with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// "The DOM represents a document as a tree. A tree is a finite hierarchical
/// tree structure."
///
/// All nodes live in one vector and refer to each other by [`NodeId`]. The
/// document is the single owner of its nodes; readers borrow it immutably, so
/// no traversal can overlap a mutation.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    /// Create an empty document with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)),
            nodes: Vec::new(),
            root: None,
        }
    }

    /// This document's identity.
    #[must_use]
    pub const fn id(&self) -> DocumentId {
        self.id
    }

    /// [§ 4.5](https://dom.spec.whatwg.org/#document-element)
    /// "The document element of a document is the element whose parent is
    /// that document, if it exists; otherwise null."
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the document element.
    ///
    /// # Errors
    ///
    /// Fails if `id` belongs to another document, is not an element, or is
    /// already attached under a parent.
    pub fn set_root(&mut self, id: NodeId) -> Result<(), DomError> {
        let node = self.node(id)?;
        if !matches!(node.node_type, NodeType::Element(_)) {
            return Err(DomError::NotAnElement(id));
        }
        if node.parent.is_some() {
            return Err(DomError::AlreadyAttached(id));
        }
        self.root = Some(id);
        Ok(())
    }

    /// Get a node by its ID. `None` for ids of other documents.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.document == self.id {
            self.nodes.get(id.index)
        } else {
            None
        }
    }

    /// Whether `id` names a node of this document.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of nodes allocated in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId {
            document: self.id,
            index: self.nodes.len(),
        };
        self.nodes.push(Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// [§ 4.5](https://dom.spec.whatwg.org/#dom-document-createelement)
    ///
    /// Allocate a detached element. The tag name is lower-cased.
    pub fn create_element(&mut self, tag_name: &str, attrs: Attributes) -> NodeId {
        self.alloc(NodeType::Element(ElementData::new(tag_name, attrs)))
    }

    /// [§ 4.5](https://dom.spec.whatwg.org/#dom-document-createtextnode)
    ///
    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeType::Text(text.into()))
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::ForeignNode(id))
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before null."
    ///
    /// Appends `child` as the last child of `parent`, updating all relationships.
    ///
    /// # Errors
    ///
    /// Fails if either node belongs to another document, if `parent` is a text
    /// node, if `child` already has a parent or is the document element, or if
    /// `child` is an inclusive ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !matches!(self.node(parent)?.node_type, NodeType::Element(_)) {
            return Err(DomError::NotAnElement(parent));
        }
        if self.node(child)?.parent.is_some() || self.root == Some(child) {
            return Err(DomError::AlreadyAttached(child));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let prev_last_child = self.nodes[parent.index].children.last().copied();
        self.nodes[parent.index].children.push(child);
        self.nodes[child.index].parent = Some(parent);

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.index].next_sibling = Some(child);
            self.nodes[child.index].prev_sibling = Some(prev_id);
        }
        Ok(())
    }

    /// Replace or add an attribute on an element.
    ///
    /// # Errors
    ///
    /// Fails if `id` belongs to another document or is a text node.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let _ = self.node(id)?;
        match &mut self.nodes[id.index].node_type {
            NodeType::Element(data) => {
                data.attrs.set(name, value);
                Ok(())
            }
            NodeType::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Position of `id` in its parent's child list, counting text and
    /// element nodes alike. `None` for a node without a parent.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Iterate over all ancestors of a node, from parent to the top.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Iterate over preceding siblings (from immediately before to first child).
    #[must_use]
    pub fn preceding_siblings(&self, id: NodeId) -> PrecedingSiblingIterator<'_> {
        PrecedingSiblingIterator {
            tree: self,
            current: self.prev_sibling(id),
        }
    }

    /// [§ 4.2.6 Descendant](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// "An object A is called a descendant of an object B, if either A is a
    /// child of B or A is a child of an object C that is a descendant of B."
    ///
    /// Iterate over the descendants of `id` in tree order (pre-order,
    /// depth-first), excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> DescendantIterator<'_> {
        DescendantIterator {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            NodeType::Text(_) => None,
        })
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            NodeType::Element(_) => None,
        })
    }

    /// Whether this node is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.as_element(id).is_some()
    }

    /// The combined text of a node.
    ///
    /// Every descendant text node is trimmed; the non-empty pieces are joined
    /// with a single space in tree order. For a text node this is its own
    /// trimmed payload.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        if let Some(text) = self.as_text(id) {
            return text.trim().to_string();
        }
        let pieces: Vec<&str> = self
            .descendants(id)
            .filter_map(|d| self.as_text(d))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        pieces.join(" ")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a Document,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Iterator over preceding siblings of a node.
pub struct PrecedingSiblingIterator<'a> {
    tree: &'a Document,
    current: Option<NodeId>,
}

impl Iterator for PrecedingSiblingIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.prev_sibling(id);
        Some(id)
    }
}

/// Pre-order iterator over the descendants of a node.
pub struct DescendantIterator<'a> {
    tree: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

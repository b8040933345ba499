//! Running selectors against documents.

use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use sprig_dom::{Document, NodeId};

use crate::error::SelectError;
use crate::matcher::Matcher;
use crate::parser::parse;

/// A parsed selector, ready to be run against any number of documents.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    matcher: Matcher,
}

impl Selector {
    /// Parse `selector`.
    ///
    /// # Errors
    ///
    /// [`SelectError::EmptySelector`] for blank input, otherwise
    /// [`SelectError::Parse`] when the text is not a valid selector.
    pub fn parse(selector: &str) -> Result<Self, SelectError> {
        let source = selector.trim();
        if source.is_empty() {
            return Err(SelectError::EmptySelector);
        }
        let matcher = parse(source)?;
        debug!("parsed selector {source:?} as `{matcher}`");
        Ok(Self {
            source: source.to_string(),
            matcher,
        })
    }

    /// Wrap an already built matcher tree.
    #[must_use]
    pub fn from_matcher(matcher: Matcher) -> Self {
        Self {
            source: matcher.to_string(),
            matcher,
        }
    }

    /// The selector text, trimmed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled matcher tree.
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Whether `candidate` matches in a query started at `root`.
    #[must_use]
    pub fn matches(&self, doc: &Document, root: NodeId, candidate: NodeId) -> bool {
        self.matcher.matches(doc, root, candidate)
    }

    /// Every element in the subtree of `root` (including `root`) that
    /// matches, in document order.
    ///
    /// # Errors
    ///
    /// [`SelectError::InvalidRoot`] if `root` is not an element of `doc`.
    pub fn select(&self, doc: &Document, root: NodeId) -> Result<Vec<NodeId>, SelectError> {
        let found: Vec<NodeId> = candidates(doc, root)?
            .filter(|&candidate| self.matches(doc, root, candidate))
            .collect();
        trace!("`{}` matched {} element(s) under {root:?}", self.matcher, found.len());
        Ok(found)
    }

    /// The first match in document order, if any.
    ///
    /// # Errors
    ///
    /// [`SelectError::InvalidRoot`] if `root` is not an element of `doc`.
    pub fn select_first(
        &self,
        doc: &Document,
        root: NodeId,
    ) -> Result<Option<NodeId>, SelectError> {
        Ok(candidates(doc, root)?.find(|&candidate| self.matches(doc, root, candidate)))
    }

    /// [`select`](Self::select) from the document's root element.
    ///
    /// # Errors
    ///
    /// [`SelectError::NoDocumentRoot`] if the document has no root.
    pub fn select_document(&self, doc: &Document) -> Result<Vec<NodeId>, SelectError> {
        let root = doc.root().ok_or(SelectError::NoDocumentRoot)?;
        self.select(doc, root)
    }

    /// Run the selector from each root in turn and concatenate the results.
    ///
    /// Each root is its own query root. Overlapping subtrees can yield the
    /// same element more than once.
    ///
    /// # Errors
    ///
    /// [`SelectError::InvalidRoot`] for the first root that is not an
    /// element of `doc`.
    pub fn select_all(
        &self,
        doc: &Document,
        roots: impl IntoIterator<Item = NodeId>,
    ) -> Result<Vec<NodeId>, SelectError> {
        let mut found = Vec::new();
        for root in roots {
            found.extend(self.select(doc, root)?);
        }
        Ok(found)
    }
}

/// Shows the matcher tree, not the source text.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.matcher)
    }
}

impl FromStr for Selector {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `root` followed by its descendant elements in pre-order.
fn candidates(
    doc: &Document,
    root: NodeId,
) -> Result<impl Iterator<Item = NodeId> + '_, SelectError> {
    if !doc.is_element(root) {
        return Err(SelectError::InvalidRoot(root));
    }
    Ok(std::iter::once(root)
        .chain(doc.descendants(root))
        .filter(|&id| doc.is_element(id)))
}

/// Every element under `root` (inclusive) matching `selector`, in document
/// order.
///
/// # Errors
///
/// Fails if the selector is blank or invalid, or if `root` is not an
/// element of `doc`.
///
/// # Example
///
/// ```
/// use sprig_dom::{Document, TreeNode};
///
/// let tree = TreeNode::element(
///     "ul",
///     &[],
///     vec![
///         TreeNode::element("li", &[("class", "a")], vec![]),
///         TreeNode::element("li", &[], vec![]),
///     ],
/// );
/// let doc = Document::from_tree(&tree).unwrap();
/// let root = doc.root().unwrap();
/// assert_eq!(sprig_select::query(&doc, root, "li.a").unwrap().len(), 1);
/// ```
pub fn query(doc: &Document, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectError> {
    Selector::parse(selector)?.select(doc, root)
}

/// First element under `root` (inclusive) matching `selector`.
///
/// # Errors
///
/// Same as [`query`].
pub fn query_first(
    doc: &Document,
    root: NodeId,
    selector: &str,
) -> Result<Option<NodeId>, SelectError> {
    Selector::parse(selector)?.select_first(doc, root)
}

/// [`query`] from the document's root element.
///
/// # Errors
///
/// Same as [`query`], plus [`SelectError::NoDocumentRoot`].
pub fn query_document(doc: &Document, selector: &str) -> Result<Vec<NodeId>, SelectError> {
    Selector::parse(selector)?.select_document(doc)
}

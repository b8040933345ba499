//! Selector engine for sprig documents.
//!
//! Selector text is parsed into a [`Matcher`] tree once and can then be run
//! against any [`sprig_dom::Document`]:
//!
//! ```
//! use sprig_dom::{Document, TreeNode};
//! use sprig_select::Selector;
//!
//! let tree = TreeNode::element(
//!     "div",
//!     &[],
//!     vec![TreeNode::element("p", &[("class", "info")], vec![TreeNode::text("hi")])],
//! );
//! let doc = Document::from_tree(&tree).unwrap();
//!
//! let selector: Selector = "div > p.info:contains(HI)".parse().unwrap();
//! assert_eq!(selector.select_document(&doc).unwrap().len(), 1);
//! ```
//!
//! Supported syntax: `tag`, `ns|tag`, `#id`, `.class`, `*`, attribute tests
//! (`[k]`, `[^prefix]`, `[k=v]`, `[k!=v]`, `[k^=v]`, `[k$=v]`, `[k*=v]`,
//! `[k~=regex]`), the combinators `>`, `+`, `~`, whitespace and `,`, and the
//! pseudo-classes `:lt(n)`, `:gt(n)`, `:eq(n)`, `:has(sel)`, `:not(sel)`,
//! `:contains(text)` and `:matches(regex)`.

pub mod error;
pub mod matcher;
pub mod parser;
pub mod query;
pub mod reader;

pub use error::{ParseError, SelectError};
pub use matcher::{AttributeMatcher, IndexComparison, Matcher};
pub use parser::{MAX_NESTING, parse};
pub use query::{Selector, query, query_document, query_first};
pub use reader::{TokenReader, unescape};

//! Errors raised while parsing selectors and running queries.

use sprig_dom::NodeId;
use thiserror::Error;

/// A selector string could not be turned into a matcher.
///
/// Every variant carries the text that was being parsed, so the message
/// points at the offending part of the selector.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// No production recognizes the text at the cursor.
    #[error("could not parse query \"{query}\": unexpected token at \"{remainder}\"")]
    UnexpectedToken {
        /// The (sub-)selector being parsed.
        query: String,
        /// Everything from the unrecognized token onwards.
        remainder: String,
    },

    /// A fixed sequence the parser relies on was not at the cursor.
    #[error("expected \"{expected}\" at \"{remainder}\"")]
    ExpectedSequence {
        /// The sequence that had to be present.
        expected: String,
        /// The unconsumed input.
        remainder: String,
    },

    /// `:lt`, `:gt` or `:eq` with an argument that is not an integer.
    #[error("index must be numeric, found \"{argument}\" in \"{query}\"")]
    InvalidIndex {
        /// The (sub-)selector being parsed.
        query: String,
        /// The argument text.
        argument: String,
    },

    /// `:has`, `:not`, `:contains` or `:matches` with nothing inside.
    #[error("{pseudo}(...) must not be empty in \"{query}\" at \"{remainder}\"")]
    EmptyArgument {
        /// The pseudo-class name including the colon.
        pseudo: &'static str,
        /// The (sub-)selector being parsed.
        query: String,
        /// The unconsumed input from the pseudo-class onwards.
        remainder: String,
    },

    /// Selectors nested inside pseudo-class arguments beyond `limit` levels.
    #[error("selector nests deeper than {limit} levels in \"{query}\" at \"{remainder}\"")]
    NestingTooDeep {
        /// The maximum nesting depth.
        limit: usize,
        /// The (sub-)selector being parsed.
        query: String,
        /// The argument that would have been parsed one level deeper.
        remainder: String,
    },

    /// `#`, `.` or `[` not followed by a name.
    #[error("{kind} must not be empty in \"{query}\" at \"{remainder}\"")]
    EmptyName {
        /// What kind of name was expected.
        kind: &'static str,
        /// The (sub-)selector being parsed.
        query: String,
        /// The unconsumed input after the marker.
        remainder: String,
    },

    /// An attribute comparison without a value, e.g. `[href=]`.
    #[error("attribute [{key}{operator}] needs a value in \"{query}\"")]
    EmptyAttributeValue {
        /// The attribute name.
        key: String,
        /// The comparison operator.
        operator: &'static str,
        /// The (sub-)selector being parsed.
        query: String,
    },

    /// A `:matches(...)` or `[key~=...]` pattern that does not compile.
    #[error("invalid regular expression \"{pattern}\"")]
    InvalidRegex {
        /// The pattern text.
        pattern: String,
        /// Why the regex engine rejected it.
        #[source]
        source: regex::Error,
    },
}

/// A query could not be run.
#[derive(Debug, Clone, Error)]
pub enum SelectError {
    /// The selector was empty or only whitespace.
    #[error("selector must not be empty")]
    EmptySelector,

    /// The query root is not an element of the queried document.
    #[error("{0:?} is not an element of this document")]
    InvalidRoot(NodeId),

    /// A whole-document query on a document without a root element.
    #[error("document has no root element")]
    NoDocumentRoot,

    /// The selector did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

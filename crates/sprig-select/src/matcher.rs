//! Matcher tree produced by the parser.
//!
//! A [`Matcher`] answers one question: does `candidate` match, given the
//! element the query was started from (`root`)? Leaf matchers test a single
//! property of the candidate; structural matchers move through the tree and
//! test a wrapped matcher against the node they reach.
//!
//! Structural matchers never leave the query through `root` sideways or
//! upwards from `root` itself: a candidate equal to `root` has no matching
//! parent, ancestor or preceding sibling. Ancestor walks that start below
//! `root` may continue above it.

use std::fmt;

use regex::Regex;
use sprig_dom::{Document, ElementData, NodeId};

/// How an element's index among its parent's children is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexComparison {
    /// `:lt(n)`
    LessThan,
    /// `:gt(n)`
    GreaterThan,
    /// `:eq(n)`
    Equal,
}

impl IndexComparison {
    /// The pseudo-class name, without the colon.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::LessThan => "lt",
            Self::GreaterThan => "gt",
            Self::Equal => "eq",
        }
    }

    fn holds(self, index: i32, argument: i32) -> bool {
        match self {
            Self::LessThan => index < argument,
            Self::GreaterThan => index > argument,
            Self::Equal => index == argument,
        }
    }
}

/// Attribute tests written inside `[...]`.
///
/// Names and plain comparison values are stored lowercased. Values are
/// compared against the trimmed, lowercased attribute value; the regex form
/// runs against the raw value.
#[derive(Debug, Clone)]
pub enum AttributeMatcher {
    /// `[key]`
    Exists(String),
    /// `[^prefix]`: some attribute name starts with the prefix.
    NamePrefix(String),
    /// `[key=value]`
    Equals(String, String),
    /// `[key!=value]`: also matches when the attribute is absent.
    NotEquals(String, String),
    /// `[key^=value]`
    Prefix(String, String),
    /// `[key$=value]`
    Suffix(String, String),
    /// `[key*=value]`
    Substring(String, String),
    /// `[key~=pattern]`
    Regex(String, Regex),
}

impl AttributeMatcher {
    /// Test the attribute list of `element`.
    #[must_use]
    pub fn matches(&self, element: &ElementData) -> bool {
        let attrs = element.attrs();
        let normalized = |key: &str| attrs.get(key).map(|v| v.trim().to_lowercase());

        match self {
            Self::Exists(key) => attrs.contains(key),
            Self::NamePrefix(prefix) => {
                attrs.names().any(|name| name.starts_with(prefix.as_str()))
            }
            Self::Equals(key, value) => normalized(key).is_some_and(|v| v == *value),
            Self::NotEquals(key, value) => !normalized(key).is_some_and(|v| v == *value),
            Self::Prefix(key, value) => {
                normalized(key).is_some_and(|v| v.starts_with(value.as_str()))
            }
            Self::Suffix(key, value) => {
                normalized(key).is_some_and(|v| v.ends_with(value.as_str()))
            }
            Self::Substring(key, value) => {
                normalized(key).is_some_and(|v| v.contains(value.as_str()))
            }
            Self::Regex(key, pattern) => attrs.get(key).is_some_and(|v| pattern.is_match(v)),
        }
    }
}

impl fmt::Display for AttributeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists(key) => write!(f, "[{key}]"),
            Self::NamePrefix(prefix) => write!(f, "[^{prefix}]"),
            Self::Equals(key, value) => write!(f, "[{key}={value}]"),
            Self::NotEquals(key, value) => write!(f, "[{key}!={value}]"),
            Self::Prefix(key, value) => write!(f, "[{key}^={value}]"),
            Self::Suffix(key, value) => write!(f, "[{key}$={value}]"),
            Self::Substring(key, value) => write!(f, "[{key}*={value}]"),
            Self::Regex(key, pattern) => write!(f, "[{key}~={}]", pattern.as_str()),
        }
    }
}

/// A compiled selector.
///
/// The tree is immutable once built and holds no references into any
/// document, so one matcher can be evaluated against many documents from
/// many threads.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Tag name, lowercased. Namespaced names use `ns:tag`.
    Tag(String),
    /// Exact `id` attribute value.
    Id(String),
    /// One of the whitespace-separated classes, compared without case.
    Class(String),
    /// An attribute test.
    Attribute(AttributeMatcher),
    /// `*`
    Universal,
    /// Position among the parent's child nodes, text nodes included.
    Index(IndexComparison, i32),
    /// The element's text contains this lowercased string, ignoring case.
    ContainsText(String),
    /// The element's text matches this pattern.
    MatchesText(Regex),
    /// Every branch matches.
    And(Vec<Matcher>),
    /// At least one branch matches.
    Or(Vec<Matcher>),
    /// The candidate is the query root.
    Root,
    /// Some descendant element (not the candidate itself) matches.
    Has(Box<Matcher>),
    /// The wrapped matcher does not match.
    Not(Box<Matcher>),
    /// The parent matches.
    Parent(Box<Matcher>),
    /// Some ancestor matches.
    Ancestor(Box<Matcher>),
    /// The nearest preceding element sibling matches.
    Previous(Box<Matcher>),
    /// Some preceding element sibling matches.
    Before(Box<Matcher>),
}

impl Matcher {
    /// Build a disjunction.
    ///
    /// More than one matcher is grouped into a single conjunction that
    /// becomes the only branch, so `or([a, b])` behaves like `a` and `b`.
    /// Selector parsing builds [`Matcher::Or`] directly and is unaffected.
    #[must_use]
    pub fn or(matchers: Vec<Self>) -> Self {
        if matchers.len() > 1 {
            Self::Or(vec![Self::And(matchers)])
        } else {
            Self::Or(matchers)
        }
    }

    /// Build a conjunction.
    #[must_use]
    pub fn and(matchers: Vec<Self>) -> Self {
        Self::And(matchers)
    }

    /// Whether `candidate` matches, for a query started at `root`.
    ///
    /// Nodes that are not elements of `doc` never match.
    #[must_use]
    pub fn matches(&self, doc: &Document, root: NodeId, candidate: NodeId) -> bool {
        let Some(element) = doc.as_element(candidate) else {
            return false;
        };

        match self {
            Self::Tag(name) => element.tag_name() == name.as_str(),
            Self::Id(id) => element.id() == Some(id.as_str()),
            Self::Class(class_name) => element.has_class(class_name),
            Self::Attribute(attribute) => attribute.matches(element),
            Self::Universal => true,
            Self::Index(comparison, argument) => doc
                .index_in_parent(candidate)
                .and_then(|index| i32::try_from(index).ok())
                .is_some_and(|index| comparison.holds(index, *argument)),
            Self::ContainsText(needle) => {
                doc.text(candidate).to_lowercase().contains(needle.as_str())
            }
            Self::MatchesText(pattern) => pattern.is_match(&doc.text(candidate)),
            Self::And(matchers) => matchers.iter().all(|m| m.matches(doc, root, candidate)),
            Self::Or(matchers) => matchers.iter().any(|m| m.matches(doc, root, candidate)),
            Self::Root => candidate == root,
            Self::Has(inner) => doc
                .descendants(candidate)
                .any(|descendant| inner.matches(doc, root, descendant)),
            Self::Not(inner) => !inner.matches(doc, root, candidate),
            Self::Parent(inner) => {
                candidate != root
                    && doc
                        .parent(candidate)
                        .is_some_and(|parent| inner.matches(doc, root, parent))
            }
            Self::Ancestor(inner) => {
                candidate != root
                    && doc
                        .ancestors(candidate)
                        .any(|ancestor| inner.matches(doc, root, ancestor))
            }
            Self::Previous(inner) => {
                candidate != root
                    && doc
                        .preceding_siblings(candidate)
                        .find(|&sibling| doc.is_element(sibling))
                        .is_some_and(|sibling| inner.matches(doc, root, sibling))
            }
            Self::Before(inner) => {
                candidate != root
                    && doc
                        .preceding_siblings(candidate)
                        .any(|sibling| inner.matches(doc, root, sibling))
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, matchers: &[Matcher], separator: &str) -> fmt::Result {
    for (i, matcher) in matchers.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{matcher}")?;
    }
    Ok(())
}

/// Debug rendering of the matcher tree.
///
/// Conjunctions are space-separated and disjunctions comma-separated;
/// structural matchers show as pseudo-classes wrapping their argument,
/// e.g. `.foo > ol` renders as `ol :parent(.foo)`.
impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(name) => f.write_str(name),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class_name) => write!(f, ".{class_name}"),
            Self::Attribute(attribute) => write!(f, "{attribute}"),
            Self::Universal => f.write_str("*"),
            Self::Index(comparison, argument) => write!(f, ":{}({argument})", comparison.name()),
            Self::ContainsText(needle) => write!(f, ":contains({needle})"),
            Self::MatchesText(pattern) => write!(f, ":matches({})", pattern.as_str()),
            Self::And(matchers) => write_joined(f, matchers, " "),
            Self::Or(matchers) => write_joined(f, matchers, ", "),
            Self::Root => f.write_str(":root"),
            Self::Has(inner) => write!(f, ":has({inner})"),
            Self::Not(inner) => write!(f, ":not({inner})"),
            Self::Parent(inner) => write!(f, ":parent({inner})"),
            Self::Ancestor(inner) => write!(f, ":ancestor({inner})"),
            Self::Previous(inner) => write!(f, ":prev({inner})"),
            Self::Before(inner) => write!(f, ":prev*({inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use sprig_dom::Attributes;

    use super::*;

    fn tag(name: &str) -> Matcher {
        Matcher::Tag(name.to_string())
    }

    /// `<div><p/>text<p class="x"/><span/></div>`
    fn fixture() -> (Document, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let div = doc.create_element("div", Attributes::new());
        doc.set_root(div).unwrap();
        let first = doc.create_element("p", Attributes::new());
        let text = doc.create_text("text");
        let second = doc.create_element("p", [("class", "x")].into_iter().collect());
        let span = doc.create_element("span", Attributes::new());
        for id in [first, text, second, span] {
            doc.append_child(div, id).unwrap();
        }
        (doc, div, vec![first, text, second, span])
    }

    #[test]
    fn test_matcher_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Matcher>();
    }

    #[test]
    fn test_or_constructor_groups_branches() {
        let or = Matcher::or(vec![tag("a"), tag("b")]);
        let Matcher::Or(branches) = &or else {
            panic!("expected Or, got {or:?}");
        };
        assert_eq!(branches.len(), 1);
        assert!(matches!(&branches[0], Matcher::And(inner) if inner.len() == 2));

        let single = Matcher::or(vec![tag("a")]);
        assert!(matches!(single, Matcher::Or(ref branches) if branches.len() == 1));
    }

    #[test]
    fn test_or_constructor_requires_all() {
        let (doc, div, kids) = fixture();
        let grouped = Matcher::or(vec![tag("p"), Matcher::Class("x".to_string())]);
        assert!(!grouped.matches(&doc, div, kids[0]));
        assert!(grouped.matches(&doc, div, kids[2]));
    }

    #[test]
    fn test_text_nodes_never_match() {
        let (doc, div, kids) = fixture();
        assert!(!Matcher::Universal.matches(&doc, div, kids[1]));
        assert!(!Matcher::Not(Box::new(tag("p"))).matches(&doc, div, kids[1]));
    }

    #[test]
    fn test_index_counts_text_nodes() {
        let (doc, div, kids) = fixture();
        let eq2 = Matcher::Index(IndexComparison::Equal, 2);
        assert!(eq2.matches(&doc, div, kids[2]));
        assert!(!eq2.matches(&doc, div, kids[0]));
        // The root has no parent and no index.
        let gt = Matcher::Index(IndexComparison::GreaterThan, -5);
        assert!(!gt.matches(&doc, div, div));
        assert!(gt.matches(&doc, div, kids[0]));
    }

    #[test]
    fn test_previous_skips_text_nodes() {
        let (doc, div, kids) = fixture();
        let prev_p = Matcher::Previous(Box::new(tag("p")));
        assert!(prev_p.matches(&doc, div, kids[2]));
        assert!(prev_p.matches(&doc, div, kids[3]));
        assert!(!prev_p.matches(&doc, div, kids[0]));

        let before_first = Matcher::Before(Box::new(Matcher::Index(IndexComparison::Equal, 0)));
        assert!(before_first.matches(&doc, div, kids[3]));
    }

    #[test]
    fn test_structural_matchers_stop_at_root() {
        let (doc, div, kids) = fixture();
        let parent_div = Matcher::Parent(Box::new(tag("div")));
        assert!(parent_div.matches(&doc, div, kids[0]));
        // Starting at the paragraph, it becomes the root and has no usable parent.
        assert!(!parent_div.matches(&doc, kids[0], kids[0]));
        assert!(!Matcher::Ancestor(Box::new(Matcher::Universal)).matches(&doc, div, div));
    }

    #[test]
    fn test_has_excludes_self() {
        let (doc, div, kids) = fixture();
        let has_p = Matcher::Has(Box::new(tag("p")));
        assert!(has_p.matches(&doc, div, div));
        assert!(!has_p.matches(&doc, div, kids[0]));
    }

    #[test]
    fn test_attribute_not_equals_matches_absent() {
        let (doc, div, kids) = fixture();
        let not_x = Matcher::Attribute(AttributeMatcher::NotEquals(
            "class".to_string(),
            "x".to_string(),
        ));
        assert!(not_x.matches(&doc, div, kids[0]));
        assert!(!not_x.matches(&doc, div, kids[2]));
    }

    #[test]
    fn test_display() {
        let matcher = Matcher::Or(vec![
            Matcher::And(vec![
                tag("ol"),
                Matcher::Parent(Box::new(Matcher::Class("foo".to_string()))),
            ]),
            Matcher::Before(Box::new(Matcher::Index(IndexComparison::LessThan, 3))),
        ]);
        assert_eq!(matcher.to_string(), "ol :parent(.foo), :prev*(:lt(3))");
        assert_eq!(
            Matcher::Attribute(AttributeMatcher::Regex(
                "href".to_string(),
                Regex::new("^/a+$").unwrap()
            ))
            .to_string(),
            "[href~=^/a+$]"
        );
    }
}

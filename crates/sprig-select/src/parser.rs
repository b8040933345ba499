//! Selector text to [`Matcher`] tree.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! group     := sequence ("," sequence)*
//! sequence  := compound (combinator compound)*
//! combinator:= ">" | "+" | "~" | whitespace
//! compound  := simple+
//! simple    := "#" ident | "." ident | tag | "[" attribute "]" | "*"
//!            | ":lt(" n ")" | ":gt(" n ")" | ":eq(" n ")"
//!            | ":has(" group ")" | ":not(" group ")"
//!            | ":contains(" text ")" | ":matches(" regex ")"
//! ```
//!
//! The right-hand side of every combinator is parsed recursively as a
//! sub-selector that runs up to the next combinator, with bracketed and
//! parenthesized groups passed through unchanged. A combinator applied to
//! a group only binds to the group's last branch, so `a, b > c` is `a` or
//! `c` whose parent is `b`.

use regex::Regex;
use sprig_common::warning::warn_once;

use crate::error::ParseError;
use crate::matcher::{AttributeMatcher, IndexComparison, Matcher};
use crate::reader::{TokenReader, unescape};

/// Characters that combine two compound selectors. Whitespace also does.
const COMBINATORS: [char; 4] = [',', '>', '+', '~'];

/// How deep sub-selectors may nest, e.g. `:not(:has(...))`.
pub const MAX_NESTING: usize = 128;

/// Comparison operators allowed inside `[...]`, in match order.
const ATTRIBUTE_OPERATORS: [&str; 6] = ["=", "!=", "^=", "$=", "*=", "~="];

/// Parse `query` into a matcher tree.
///
/// Surrounding whitespace is ignored. Tag names, class names, attribute
/// names, plain attribute values and `:contains` text are lowercased; ids and
/// regular expressions keep their case.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first token that could not be
/// parsed. Empty input is an [`ParseError::UnexpectedToken`] with an empty
/// remainder. Arguments nested more than [`MAX_NESTING`] levels deep are a
/// [`ParseError::NestingTooDeep`].
pub fn parse(query: &str) -> Result<Matcher, ParseError> {
    QueryParser::new(query, 0).parse()
}

/// How two compound selectors are related.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    /// `a > b`
    Child,
    /// `a b`
    Descendant,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
    /// `a, b`
    Group,
}

impl Combinator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(Self::Child),
            '+' => Some(Self::NextSibling),
            '~' => Some(Self::SubsequentSibling),
            ',' => Some(Self::Group),
            c if c.is_whitespace() => Some(Self::Descendant),
            _ => None,
        }
    }

    /// Relate `right` to `left`. The result matches the right-hand element.
    fn join(self, left: Matcher, right: Matcher) -> Matcher {
        match self {
            Self::Child => Matcher::And(vec![right, Matcher::Parent(Box::new(left))]),
            Self::Descendant => Matcher::And(vec![right, Matcher::Ancestor(Box::new(left))]),
            Self::NextSibling => Matcher::And(vec![right, Matcher::Previous(Box::new(left))]),
            Self::SubsequentSibling => Matcher::And(vec![right, Matcher::Before(Box::new(left))]),
            Self::Group => Matcher::Or(vec![left, right]),
        }
    }
}

struct QueryParser {
    reader: TokenReader,
    query: String,
    matchers: Vec<Matcher>,
    depth: usize,
}

impl QueryParser {
    fn new(query: &str, depth: usize) -> Self {
        let query = query.trim().to_string();
        Self {
            reader: TokenReader::new(&query),
            query,
            matchers: Vec::new(),
            depth,
        }
    }

    /// Parse a sub-selector one level below this one.
    fn parse_inner(&self, sub_query: &str) -> Result<Matcher, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING,
                query: self.query.clone(),
                remainder: sub_query.to_string(),
            });
        }
        Self::new(sub_query, self.depth + 1).parse()
    }

    fn at_combinator(&self) -> bool {
        self.reader.matches_any_char(&COMBINATORS) || self.reader.matches_whitespace()
    }

    fn parse(mut self) -> Result<Matcher, ParseError> {
        let _ = self.reader.consume_whitespace();

        if self.reader.matches_any_char(&COMBINATORS) {
            // A leading combinator relates to the query root: "> p".
            self.matchers.push(Matcher::Root);
            let c = self.reader.consume();
            self.combinator(c)?;
        } else {
            self.find_elements()?;
        }

        while !self.reader.is_empty() {
            let seen_whitespace = self.reader.consume_whitespace();

            if self.reader.matches_any_char(&COMBINATORS) {
                let c = self.reader.consume();
                self.combinator(c)?;
            } else if seen_whitespace {
                self.combinator(' ')?;
            } else {
                self.find_elements()?;
            }
        }

        Ok(self.take_matchers())
    }

    /// Collapse the compound parsed so far into one matcher.
    fn take_matchers(&mut self) -> Matcher {
        if self.matchers.len() > 1 {
            return Matcher::And(std::mem::take(&mut self.matchers));
        }
        self.matchers.pop().unwrap_or_else(|| Matcher::And(Vec::new()))
    }

    fn combinator(&mut self, c: char) -> Result<(), ParseError> {
        let Some(combinator) = Combinator::from_char(c) else {
            return Err(self.unexpected_token());
        };

        let _ = self.reader.consume_whitespace();
        let sub_query = self.consume_sub_query();
        let right = self.parse_inner(&sub_query)?;
        let left = self.take_matchers();

        let combined = match left {
            Matcher::Or(mut branches) if combinator == Combinator::Group => {
                branches.push(right);
                Matcher::Or(branches)
            }
            Matcher::Or(mut branches) => {
                // Combinators bind tighter than ",": only the last branch changes.
                match branches.pop() {
                    Some(last) => branches.push(combinator.join(last, right)),
                    None => branches.push(right),
                }
                Matcher::Or(branches)
            }
            left => combinator.join(left, right),
        };

        self.matchers.push(combined);
        Ok(())
    }

    /// Text up to the next combinator, keeping `(...)` and `[...]` whole.
    fn consume_sub_query(&mut self) -> String {
        let mut sub_query = String::new();

        while !self.reader.is_empty() {
            if self.reader.matches("(") {
                sub_query.push('(');
                sub_query.push_str(&self.reader.chomp_balanced('(', ')'));
                sub_query.push(')');
            } else if self.reader.matches("[") {
                sub_query.push('[');
                sub_query.push_str(&self.reader.chomp_balanced('[', ']'));
                sub_query.push(']');
            } else if self.at_combinator() {
                break;
            } else {
                sub_query.push(self.reader.consume());
            }
        }

        sub_query
    }

    fn find_elements(&mut self) -> Result<(), ParseError> {
        let matcher = if self.reader.match_chomp("#") {
            self.by_id()?
        } else if self.reader.match_chomp(".") {
            self.by_class()?
        } else if self.reader.matches_word() {
            self.by_tag()?
        } else if self.reader.matches("[") {
            self.by_attribute()?
        } else if self.reader.match_chomp("*") {
            Matcher::Universal
        } else if self.reader.match_chomp(":lt(") {
            self.index_matcher(IndexComparison::LessThan)?
        } else if self.reader.match_chomp(":gt(") {
            self.index_matcher(IndexComparison::GreaterThan)?
        } else if self.reader.match_chomp(":eq(") {
            self.index_matcher(IndexComparison::Equal)?
        } else if self.reader.matches(":has(") {
            Matcher::Has(Box::new(self.nested(":has")?))
        } else if self.reader.matches(":not(") {
            Matcher::Not(Box::new(self.nested(":not")?))
        } else if self.reader.matches(":contains(") {
            self.contains()?
        } else if self.reader.matches(":matches(") {
            self.matches_regex()?
        } else {
            return Err(self.unexpected_token());
        };

        self.matchers.push(matcher);
        Ok(())
    }

    fn unexpected_token(&mut self) -> ParseError {
        ParseError::UnexpectedToken {
            query: self.query.clone(),
            remainder: self.reader.consume_remainder(),
        }
    }

    fn empty_name(&self, kind: &'static str) -> ParseError {
        ParseError::EmptyName {
            kind,
            query: self.query.clone(),
            remainder: self.reader.to_string(),
        }
    }

    fn by_id(&mut self) -> Result<Matcher, ParseError> {
        let id = self.reader.consume_css_identifier();
        if id.is_empty() {
            return Err(self.empty_name("id"));
        }
        Ok(Matcher::Id(id))
    }

    fn by_class(&mut self) -> Result<Matcher, ParseError> {
        let class_name = self.reader.consume_css_identifier();
        if class_name.is_empty() {
            return Err(self.empty_name("class name"));
        }
        Ok(Matcher::Class(class_name.to_lowercase()))
    }

    fn by_tag(&mut self) -> Result<Matcher, ParseError> {
        let tag_name = self.reader.consume_element_selector();
        let tag_name = tag_name.trim().replace('|', ":").to_lowercase();
        if tag_name.is_empty() {
            return Err(self.empty_name("tag name"));
        }
        Ok(Matcher::Tag(tag_name))
    }

    fn by_attribute(&mut self) -> Result<Matcher, ParseError> {
        let mut clause = TokenReader::new(&self.reader.chomp_balanced('[', ']'));
        let key = clause
            .consume_to_any(&ATTRIBUTE_OPERATORS)
            .trim()
            .to_ascii_lowercase();
        if key.is_empty() {
            return Err(self.empty_name("attribute name"));
        }
        let _ = clause.consume_whitespace();

        if clause.is_empty() {
            return match key.strip_prefix('^') {
                Some("") => Err(self.empty_name("attribute name prefix")),
                Some(prefix) => Ok(Matcher::Attribute(AttributeMatcher::NamePrefix(
                    prefix.to_string(),
                ))),
                None => Ok(Matcher::Attribute(AttributeMatcher::Exists(key))),
            };
        }

        if clause.match_chomp("~=") {
            let pattern = clause.consume_remainder();
            let regex = compile(&pattern)?;
            return Ok(Matcher::Attribute(AttributeMatcher::Regex(key, regex)));
        }

        let operators: [(&'static str, fn(String, String) -> AttributeMatcher); 5] = [
            ("=", AttributeMatcher::Equals),
            ("!=", AttributeMatcher::NotEquals),
            ("^=", AttributeMatcher::Prefix),
            ("$=", AttributeMatcher::Suffix),
            ("*=", AttributeMatcher::Substring),
        ];
        for (operator, build) in operators {
            if clause.match_chomp(operator) {
                let value = attribute_value(&clause.consume_remainder());
                if value.is_empty() {
                    return Err(ParseError::EmptyAttributeValue {
                        key,
                        operator,
                        query: self.query.clone(),
                    });
                }
                return Ok(Matcher::Attribute(build(key, value)));
            }
        }

        Err(ParseError::UnexpectedToken {
            query: self.query.clone(),
            remainder: clause.consume_remainder(),
        })
    }

    fn index_matcher(&mut self, comparison: IndexComparison) -> Result<Matcher, ParseError> {
        let argument = self.reader.chomp_to(")");
        let argument = argument.trim();
        let index: i32 = argument.parse().map_err(|_| ParseError::InvalidIndex {
            query: self.query.clone(),
            argument: argument.to_string(),
        })?;

        let never_matches = match comparison {
            IndexComparison::LessThan => index <= 0,
            IndexComparison::Equal => index < 0,
            IndexComparison::GreaterThan => false,
        };
        if never_matches {
            warn_once(
                "Selector",
                &format!(":{}({index}) can never match", comparison.name()),
            );
        }

        Ok(Matcher::Index(comparison, index))
    }

    /// Argument of a pseudo-class that takes a selector: `:has(...)`, `:not(...)`.
    fn nested(&mut self, pseudo: &'static str) -> Result<Matcher, ParseError> {
        let remainder = self.reader.to_string();
        self.reader.consume_sequence(pseudo)?;
        let sub_query = self.reader.chomp_balanced('(', ')');
        if sub_query.trim().is_empty() {
            return Err(self.empty_argument(pseudo, remainder));
        }
        self.parse_inner(&sub_query)
    }

    fn contains(&mut self) -> Result<Matcher, ParseError> {
        let remainder = self.reader.to_string();
        self.reader.consume_sequence(":contains")?;
        let search_text = unescape(&self.reader.chomp_balanced('(', ')'));
        if search_text.is_empty() {
            return Err(self.empty_argument(":contains", remainder));
        }
        Ok(Matcher::ContainsText(search_text.to_lowercase()))
    }

    fn matches_regex(&mut self) -> Result<Matcher, ParseError> {
        let remainder = self.reader.to_string();
        self.reader.consume_sequence(":matches")?;
        let pattern = self.reader.chomp_balanced('(', ')');
        if pattern.is_empty() {
            return Err(self.empty_argument(":matches", remainder));
        }
        Ok(Matcher::MatchesText(compile(&pattern)?))
    }

    fn empty_argument(&self, pseudo: &'static str, remainder: String) -> ParseError {
        ParseError::EmptyArgument {
            pseudo,
            query: self.query.clone(),
            remainder,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, ParseError> {
    Regex::new(pattern).map_err(|source| ParseError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Normalize a plain attribute value: unescape, trim, drop one pair of
/// matching quotes, lowercase.
fn attribute_value(raw: &str) -> String {
    let value = unescape(raw);
    let value = value.trim();
    let unquoted = ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value);
    unquoted.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(query: &str) -> String {
        parse(query).unwrap().to_string()
    }

    #[test]
    fn test_or_getting_and() {
        let matcher = parse("a b, c d, e f").unwrap();
        let Matcher::Or(branches) = &matcher else {
            panic!("expected Or, got {matcher:?}");
        };
        assert_eq!(branches.len(), 3);
        for branch in branches {
            let Matcher::And(parts) = branch else {
                panic!("expected And, got {branch:?}");
            };
            assert_eq!(parts.len(), 2);
            assert!(matches!(parts[0], Matcher::Tag(_)));
            assert!(matches!(parts[1], Matcher::Ancestor(_)));
        }
    }

    #[test]
    fn test_immediate_parent_run() {
        assert_eq!(render("div > p"), "p :parent(div)");
        assert_eq!(render("div>p>span"), "span :parent(p :parent(div))");
    }

    #[test]
    fn test_group_binds_loosest() {
        assert_eq!(
            render(".foo > ol, ol > li + li"),
            "ol :parent(.foo), li :prev(li :parent(ol))"
        );
        assert_eq!(
            render(".foo > ol, ol li + li"),
            "ol :parent(.foo), li :prev(li :ancestor(ol))"
        );
    }

    #[test]
    fn test_compound_without_combinator() {
        assert_eq!(render("#foo[bar]"), "#foo [bar]");
        assert_eq!(render("li.Active:lt(2)"), "li .active :lt(2)");
    }

    #[test]
    fn test_leading_combinator_uses_root() {
        assert_eq!(render("> p"), "p :parent(:root)");
        assert_eq!(render("~ p"), "p :prev*(:root)");
    }

    #[test]
    fn test_attribute_forms() {
        assert_eq!(render("[Title]"), "[title]");
        assert_eq!(render("[^data-]"), "[^data-]");
        assert_eq!(render("[href = '/Home' ]"), "[href=/home]");
        assert_eq!(render("[data!=\"foo\"]"), "[data!=foo]");
        assert_eq!(render("[src$=.PNG]"), "[src$=.png]");
        assert_eq!(render("[href~=^/A+$]"), "[href~=^/A+$]");
    }

    #[test]
    fn test_pseudo_classes() {
        assert_eq!(render("p:contains(Hello \\(World\\))"), "p :contains(hello (world))");
        assert_eq!(render("p:matches(^\\d+$)"), "p :matches(^\\d+$)");
        assert_eq!(render("div:has(p > a)"), "div :has(a :parent(p))");
        assert_eq!(render("div:not(.x, .y)"), "div :not(.x, .y)");
        assert_eq!(render("svg|rect"), "svg:rect");
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let err = parse("   ").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { ref remainder, .. } if remainder.is_empty()
        ));
    }

    #[test]
    fn test_unexpected_token_reports_remainder() {
        let err = parse("div ?x").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { ref remainder, .. } if remainder == "?x"
        ));
        assert!(matches!(parse("p >").unwrap_err(), ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(parse("li:eq(x)").unwrap_err(), ParseError::InvalidIndex { .. }));
        assert!(matches!(parse("li:gt()").unwrap_err(), ParseError::InvalidIndex { .. }));
        assert!(matches!(
            parse("div:has()").unwrap_err(),
            ParseError::EmptyArgument { pseudo: ":has", .. }
        ));
        assert!(matches!(
            parse("p:contains()").unwrap_err(),
            ParseError::EmptyArgument { pseudo: ":contains", ref remainder, .. }
                if remainder == ":contains()"
        ));
        assert!(matches!(parse("p:matches([)").unwrap_err(), ParseError::InvalidRegex { .. }));
        assert!(matches!(parse("#").unwrap_err(), ParseError::EmptyName { kind: "id", .. }));
        assert!(matches!(parse("[=x]").unwrap_err(), ParseError::EmptyName { .. }));
        assert!(matches!(
            parse("[href=]").unwrap_err(),
            ParseError::EmptyAttributeValue { operator: "=", .. }
        ));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let nested = |depth: usize| format!("{}p{}", ":not(".repeat(depth), ")".repeat(depth));

        assert!(parse(&nested(MAX_NESTING)).is_ok());
        assert!(matches!(
            parse(&nested(MAX_NESTING + 1)).unwrap_err(),
            ParseError::NestingTooDeep { limit: MAX_NESTING, ref remainder, .. }
                if remainder == "p"
        ));

        let err = parse(&nested(20_000)).unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep { .. }), "{err}");
    }

    #[test]
    fn test_negative_index_warns() {
        assert_eq!(render("li:lt(-1)"), "li :lt(-1)");
        assert!(sprig_common::warning::has_warned("Selector", ":lt(-1) can never match"));
    }

    #[test]
    fn test_attribute_value_quotes() {
        assert_eq!(attribute_value(" 'Foo' "), "foo");
        assert_eq!(attribute_value("\"mixed'"), "\"mixed'");
        assert_eq!(attribute_value("a\\]b"), "a]b");
    }
}

//! Character reader the selector parser consumes from.
//!
//! The reader owns a buffer of `char`s and a cursor. Lookahead methods
//! (`peek`, `matches*`) never move the cursor; `consume*` and `chomp*`
//! methods do. Reading past the end yields the `'\0'` sentinel instead of
//! failing, so the parser can probe freely near the end of input.

use std::fmt;

use crate::error::ParseError;

/// Escape character for selector text.
pub const ESCAPE: char = '\\';

/// Returned by [`TokenReader::peek`] and friends when there is no input left.
pub const EOF: char = '\0';

/// Case-insensitive character comparison.
fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Cursor over the characters of a selector string.
#[derive(Debug, Clone)]
pub struct TokenReader {
    input: Vec<char>,
    position: usize,
}

impl TokenReader {
    /// Create a reader positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// True when every character has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Number of characters left to consume.
    #[must_use]
    pub fn remaining_len(&self) -> usize {
        self.input.len().saturating_sub(self.position)
    }

    fn rest(&self) -> &[char] {
        self.input.get(self.position..).unwrap_or(&[])
    }

    /// The character at the cursor, or [`EOF`].
    #[must_use]
    pub fn peek(&self) -> char {
        self.input.get(self.position).copied().unwrap_or(EOF)
    }

    /// The character after the cursor, or [`EOF`].
    #[must_use]
    pub fn peek_next(&self) -> char {
        self.input.get(self.position + 1).copied().unwrap_or(EOF)
    }

    /// Take the character at the cursor. Returns [`EOF`] at the end.
    pub fn consume(&mut self) -> char {
        let c = self.peek();
        self.advance();
        c
    }

    /// Skip one character, if there is one.
    pub fn advance(&mut self) {
        if !self.is_empty() {
            self.position += 1;
        }
    }

    /// Put `seq` in front of the unconsumed input.
    pub fn push_front(&mut self, seq: &str) {
        let mut input: Vec<char> = seq.chars().collect();
        input.extend_from_slice(self.rest());
        self.input = input;
        self.position = 0;
    }

    /// Whether the unconsumed input starts with `seq`, ignoring case.
    #[must_use]
    pub fn matches(&self, seq: &str) -> bool {
        self.starts_with(seq, chars_eq_ignore_case)
    }

    /// Whether the unconsumed input starts with `seq`, exactly.
    #[must_use]
    pub fn matches_case_sensitive(&self, seq: &str) -> bool {
        self.starts_with(seq, |a, b| a == b)
    }

    fn starts_with(&self, seq: &str, eq: impl Fn(char, char) -> bool) -> bool {
        let rest = self.rest();
        let mut len = 0;
        for c in seq.chars() {
            match rest.get(len) {
                Some(&r) if eq(r, c) => len += 1,
                _ => return false,
            }
        }
        true
    }

    /// Whether any of `seqs` matches at the cursor, ignoring case.
    #[must_use]
    pub fn matches_any(&self, seqs: &[&str]) -> bool {
        seqs.iter().any(|seq| self.matches(seq))
    }

    /// Whether the character at the cursor is one of `chars`.
    #[must_use]
    pub fn matches_any_char(&self, chars: &[char]) -> bool {
        !self.is_empty() && chars.contains(&self.peek())
    }

    /// Whether the character at the cursor is whitespace.
    #[must_use]
    pub fn matches_whitespace(&self) -> bool {
        !self.is_empty() && self.peek().is_whitespace()
    }

    /// Whether the character at the cursor is a letter or digit.
    #[must_use]
    pub fn matches_word(&self) -> bool {
        !self.is_empty() && self.peek().is_alphanumeric()
    }

    /// Consume `seq` if it is at the cursor (ignoring case). Returns whether
    /// it was.
    pub fn match_chomp(&mut self, seq: &str) -> bool {
        if self.matches(seq) {
            self.position += seq.chars().count();
            true
        } else {
            false
        }
    }

    /// Consume `seq`, which must be at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::ExpectedSequence`] without moving the cursor if
    /// the input does not start with `seq`.
    pub fn consume_sequence(&mut self, seq: &str) -> Result<(), ParseError> {
        if self.match_chomp(seq) {
            Ok(())
        } else {
            Err(ParseError::ExpectedSequence {
                expected: seq.to_string(),
                remainder: self.to_string(),
            })
        }
    }

    /// Consume up to, not including, the first exact occurrence of `seq`.
    /// Consumes everything if `seq` does not occur.
    pub fn consume_to(&mut self, seq: &str) -> String {
        let needle: Vec<char> = seq.chars().collect();
        let rest = self.rest();
        let len = if needle.is_empty() {
            0
        } else {
            rest.windows(needle.len())
                .position(|window| window == needle.as_slice())
                .unwrap_or(rest.len())
        };
        self.take(len)
    }

    /// Like [`consume_to`](Self::consume_to), ignoring case.
    pub fn consume_to_ignore_case(&mut self, seq: &str) -> String {
        let start = self.position;
        while !self.is_empty() && !self.matches(seq) {
            self.position += 1;
        }
        self.input[start..self.position].iter().collect()
    }

    /// Consume up to the first position where any of `seqs` matches.
    pub fn consume_to_any(&mut self, seqs: &[&str]) -> String {
        let start = self.position;
        while !self.is_empty() && !self.matches_any(seqs) {
            self.position += 1;
        }
        self.input[start..self.position].iter().collect()
    }

    /// Consume up to `seq` and then `seq` itself, returning the text before it.
    pub fn chomp_to(&mut self, seq: &str) -> String {
        let data = self.consume_to(seq);
        let _ = self.match_chomp(seq);
        data
    }

    /// Like [`chomp_to`](Self::chomp_to), ignoring case.
    pub fn chomp_to_ignore_case(&mut self, seq: &str) -> String {
        let data = self.consume_to_ignore_case(seq);
        let _ = self.match_chomp(seq);
        data
    }

    /// Consume a balanced `open`..`close` group and return what is inside.
    ///
    /// Delimiters preceded by [`ESCAPE`] do not count towards the depth and
    /// are kept verbatim in the result. On unbalanced input everything up to
    /// the end is consumed and the text after the first `open` is returned.
    pub fn chomp_balanced(&mut self, open: char, close: char) -> String {
        let mut accum = String::new();
        let mut depth = 0_usize;
        let mut last = EOF;

        loop {
            if self.is_empty() {
                break;
            }
            let c = self.consume();
            if last != ESCAPE {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth = depth.saturating_sub(1);
                }
            }
            if depth > 0 && last != EOF {
                accum.push(c);
            }
            last = c;
            if depth == 0 {
                break;
            }
        }
        accum
    }

    /// Consume whitespace at the cursor. Returns whether any was consumed.
    pub fn consume_whitespace(&mut self) -> bool {
        let start = self.position;
        while self.matches_whitespace() {
            self.position += 1;
        }
        self.position > start
    }

    fn consume_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.position;
        while !self.is_empty() && accept(self.peek()) {
            self.position += 1;
        }
        self.input[start..self.position].iter().collect()
    }

    /// Consume a run of letters and digits.
    pub fn consume_word(&mut self) -> String {
        self.consume_while(char::is_alphanumeric)
    }

    /// Consume an id or class name: letters, digits, `-` and `_`.
    pub fn consume_css_identifier(&mut self) -> String {
        self.consume_while(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Consume a tag name, which may carry a namespace prefix (`ns|tag`).
    pub fn consume_element_selector(&mut self) -> String {
        self.consume_while(|c| c.is_alphanumeric() || c == '|' || c == '_' || c == '-')
    }

    /// Consume an attribute name: letters, digits, `-`, `_` and `:`.
    pub fn consume_attribute_key(&mut self) -> String {
        self.consume_while(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
    }

    /// Consume and return everything left.
    pub fn consume_remainder(&mut self) -> String {
        self.take(self.remaining_len())
    }

    fn take(&mut self, len: usize) -> String {
        let end = (self.position + len).min(self.input.len());
        let taken = self.input[self.position..end].iter().collect();
        self.position = end;
        taken
    }
}

/// The unconsumed input.
impl fmt::Display for TokenReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.rest() {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Remove escape characters: `\x` becomes `x` and `\\` becomes `\`.
#[must_use]
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = EOF;
    for c in input.chars() {
        if c == ESCAPE {
            if last == ESCAPE {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        last = c;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_consume() {
        let mut reader = TokenReader::new("ab");
        assert_eq!(reader.peek(), 'a');
        assert_eq!(reader.peek_next(), 'b');
        assert_eq!(reader.consume(), 'a');
        assert_eq!(reader.peek_next(), EOF);
        assert_eq!(reader.consume(), 'b');
        assert!(reader.is_empty());
        assert_eq!(reader.peek(), EOF);
        assert_eq!(reader.consume(), EOF);
        assert_eq!(reader.remaining_len(), 0);
    }

    #[test]
    fn test_chomp_balanced() {
        let mut reader = TokenReader::new(":contains(one (two) three) four");
        let pre = reader.consume_to("(");
        let guts = reader.chomp_balanced('(', ')');
        let remainder = reader.consume_remainder();

        assert_eq!(pre, ":contains");
        assert_eq!(guts, "one (two) three");
        assert_eq!(remainder, " four");
    }

    #[test]
    fn test_chomp_escaped_balanced() {
        let mut reader = TokenReader::new(":contains(one (two) \\( \\) \\) three) four");
        let pre = reader.consume_to("(");
        let guts = reader.chomp_balanced('(', ')');
        let remainder = reader.consume_remainder();

        assert_eq!(pre, ":contains");
        assert_eq!(guts, "one (two) \\( \\) \\) three");
        assert_eq!(unescape(&guts), "one (two) ( ) ) three");
        assert_eq!(remainder, " four");
    }

    #[test]
    fn test_chomp_balanced_matches_as_much_as_possible() {
        let mut reader = TokenReader::new("unbalanced(something(or another");
        let _ = reader.consume_to("(");
        let guts = reader.chomp_balanced('(', ')');
        assert_eq!(guts, "something(or another");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("one \\( \\) \\\\"), "one ( ) \\");
    }

    #[test]
    fn test_chomp_to_ignore_case() {
        let text = "<textarea>one < two </TEXTarea>";
        let mut reader = TokenReader::new(text);
        let data = reader.chomp_to_ignore_case("</textarea");
        assert_eq!(data, "<textarea>one < two ");

        let mut reader = TokenReader::new("<textarea> one two < three </oops>");
        let data = reader.chomp_to_ignore_case("</textarea");
        assert_eq!(data, "<textarea> one two < three </oops>");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_push_front() {
        let mut reader = TokenReader::new("One Two");
        let _ = reader.consume_word();
        reader.push_front("Three");
        assert_eq!(reader.consume_remainder(), "Three Two");
    }

    #[test]
    fn test_match_chomp_ignores_case() {
        let mut reader = TokenReader::new(":HAS(p)");
        assert!(reader.matches(":has("));
        assert!(!reader.matches_case_sensitive(":has("));
        assert!(reader.match_chomp(":has"));
        assert_eq!(reader.to_string(), "(p)");
    }

    #[test]
    fn test_consume_sequence() {
        let mut reader = TokenReader::new(":not(p)");
        assert!(reader.consume_sequence(":not").is_ok());
        let err = reader.consume_sequence(":has").unwrap_err();
        assert!(matches!(
            err,
            ParseError::ExpectedSequence { ref remainder, .. } if remainder == "(p)"
        ));
    }

    #[test]
    fn test_identifier_consumers() {
        let mut reader = TokenReader::new("my-id_2.next");
        assert_eq!(reader.consume_css_identifier(), "my-id_2");
        assert!(reader.match_chomp("."));

        let mut reader = TokenReader::new("svg|rect>g");
        assert_eq!(reader.consume_element_selector(), "svg|rect");

        let mut reader = TokenReader::new("xml:lang=en");
        assert_eq!(reader.consume_attribute_key(), "xml:lang");

        let mut reader = TokenReader::new("grüße welt");
        assert_eq!(reader.consume_word(), "grüße");
        assert!(reader.consume_whitespace());
        assert!(!reader.consume_whitespace());
    }

    #[test]
    fn test_consume_to_any() {
        let mut reader = TokenReader::new("data-x!=foo");
        assert_eq!(reader.consume_to_any(&["=", "!="]), "data-x");
        assert!(reader.matches("!="));

        let mut reader = TokenReader::new("plain");
        assert_eq!(reader.consume_to_any(&["="]), "plain");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_consume_to_missing_sequence_takes_everything() {
        let mut reader = TokenReader::new("abc");
        assert_eq!(reader.consume_to(")"), "abc");
        assert_eq!(reader.chomp_to(")"), "");
    }
}

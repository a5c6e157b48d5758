//! Content expressions: `"paragraph+ heading*"`-style rules compiled into a
//! [`ContentMatch`] state machine.
//!
//! Expressions are a flat sequence of terms, each a node-type-or-group name
//! followed by an optional quantifier (`+`, `*`, `?`; bare means exactly
//! one). This is deliberately simpler than full regular-expression content
//! models (no grouping, no alternation) per the design's "simplified
//! regular content expression" contract. The grammar is small enough that
//! hand-rolling a scanner would be easy, but we parse it with
//! `richtext-parsec` combinators the same way `helix-core` compiles its
//! snippet and path grammars, since this is exactly the kind of tiny
//! tokens-plus-quantifiers grammar that library exists for.

use richtext_parsec::{take_while, Parser};

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    One,
    OneOrMore,
    ZeroOrMore,
    ZeroOrOne,
}

impl Quantifier {
    fn bounds(self) -> (usize, usize) {
        match self {
            Quantifier::One => (1, 1),
            Quantifier::OneOrMore => (1, usize::MAX),
            Quantifier::ZeroOrMore => (0, usize::MAX),
            Quantifier::ZeroOrOne => (0, 1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentTerm {
    /// The literal node-type-or-group name this term matches against.
    pub token: String,
    pub min: usize,
    pub max: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parses a content expression into its terms. Returns `Err` with a
/// human-readable reason on malformed input (empty token, stray quantifier).
pub fn parse_terms(expr: &str) -> Result<Vec<ContentTerm>, String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(Vec::new());
    }

    // The expression grammar is intentionally tiny (whitespace-separated
    // tokens), so rather than fight combinator lifetimes over a borrowed
    // `&str`, split on whitespace first and run a single-token parser
    // (name + optional quantifier) through richtext_parsec per token.
    let mut terms = Vec::new();
    for token in expr.split_whitespace() {
        terms.push(parse_one_term(token)?);
    }
    Ok(terms)
}

fn parse_one_term(token: &str) -> Result<ContentTerm, String> {
    let name_parser = richtext_parsec::filter(take_while(is_name_char), |s: &&str| !s.is_empty());
    match name_parser.parse(token) {
        Ok((rest, name)) => {
            let quant = match rest {
                "" => Quantifier::One,
                "+" => Quantifier::OneOrMore,
                "*" => Quantifier::ZeroOrMore,
                "?" => Quantifier::ZeroOrOne,
                other => return Err(format!("unexpected trailing {other:?} in {token:?}")),
            };
            let (min, max) = quant.bounds();
            Ok(ContentTerm {
                token: name.to_string(),
                min,
                max,
            })
        }
        Err(_) => Err(format!("empty or invalid token {token:?}")),
    }
}

/// A point in the compiled content-match state machine: how many terms of
/// the expression have been fully consumed, and how many repetitions of
/// the current term have matched so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMatch {
    terms: std::sync::Arc<[ContentTerm]>,
    term_idx: usize,
    count: usize,
}

impl ContentMatch {
    pub fn compile(expr: &str) -> Result<Self, String> {
        let terms = parse_terms(expr)?;
        Ok(Self {
            terms: terms.into(),
            term_idx: 0,
            count: 0,
        })
    }

    pub fn from_schema_error(
        node: &str,
        expr: &str,
    ) -> Result<Self, SchemaError> {
        Self::compile(expr).map_err(|_| SchemaError::InvalidContentExpression {
            node: node.to_string(),
            expr: expr.to_string(),
        })
    }

    /// Attempt to match one more child whose type token set (own name plus
    /// group memberships) is given by `matches_token`. Returns the state
    /// reached after matching, or `None` if no term can accept it.
    pub fn match_token(&self, matches_token: impl Fn(&str) -> bool) -> Option<ContentMatch> {
        let mut term_idx = self.term_idx;
        let mut count = self.count;
        loop {
            if term_idx >= self.terms.len() {
                return None;
            }
            let term = &self.terms[term_idx];
            if count < term.max && matches_token(&term.token) {
                return Some(ContentMatch {
                    terms: self.terms.clone(),
                    term_idx,
                    count: count + 1,
                });
            }
            if count >= term.min {
                term_idx += 1;
                count = 0;
                continue;
            }
            return None;
        }
    }

    /// Whether one more child matching `matches_token` could be accepted
    /// from this state, without actually advancing it. Used by
    /// `NodeType::find_wrapping` to test candidate wrapper types.
    pub fn allows_type(&self, matches_token: impl Fn(&str) -> bool) -> bool {
        self.match_token(matches_token).is_some()
    }

    /// Whether the current state is a valid place to stop (every remaining
    /// term, including any partially satisfied current term, is optional).
    pub fn valid_end(&self) -> bool {
        let mut term_idx = self.term_idx;
        let mut count = self.count;
        loop {
            if term_idx >= self.terms.len() {
                return true;
            }
            let term = &self.terms[term_idx];
            if count < term.min {
                return false;
            }
            term_idx += 1;
            count = 0;
        }
    }

    /// The token of the next term that still requires a match, if any --
    /// used to drive `default_type`/autofill.
    pub fn next_required_token(&self) -> Option<&str> {
        let mut term_idx = self.term_idx;
        let mut count = self.count;
        loop {
            let term = self.terms.get(term_idx)?;
            if count < term.min {
                return Some(&term.token);
            }
            term_idx += 1;
            count = 0;
        }
    }

    /// Rough compatibility check used when joining two node types across a
    /// replace boundary: do the remaining tokens of both matches overlap,
    /// or are both sides already satisfied. This is a simplification of
    /// ProseMirror's full reachable-edge-set comparison, acceptable since
    /// our content expressions are a flat sequence rather than a general
    /// graph.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        if self.valid_end() && other.valid_end() {
            return true;
        }
        let remaining = |m: &ContentMatch| -> Vec<&str> {
            m.terms[m.term_idx..].iter().map(|t| t.token.as_str()).collect()
        };
        let a = remaining(self);
        let b = remaining(other);
        a.iter().any(|tok| b.contains(tok))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_quantifiers() {
        let terms = parse_terms("paragraph+ heading* image?").unwrap();
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0].token, "paragraph");
        assert_eq!((terms[0].min, terms[0].max), (1, usize::MAX));
        assert_eq!((terms[1].min, terms[1].max), (0, usize::MAX));
        assert_eq!((terms[2].min, terms[2].max), (0, 1));
    }

    #[test]
    fn empty_expression_matches_nothing_and_is_valid_end() {
        let m = ContentMatch::compile("").unwrap();
        assert!(m.valid_end());
        assert!(m.match_token(|_| true).is_none());
    }

    #[test]
    fn sequential_terms_require_order() {
        let m = ContentMatch::compile("heading paragraph+").unwrap();
        assert!(!m.valid_end());
        let m = m.match_token(|t| t == "heading").unwrap();
        assert!(!m.valid_end());
        let m = m.match_token(|t| t == "paragraph").unwrap();
        assert!(m.valid_end());
        let m2 = m.match_token(|t| t == "paragraph").unwrap();
        assert!(m2.valid_end());
    }
}

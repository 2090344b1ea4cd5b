//! Cursor over a token stream that builds a rewritten output stream.
//!
//! The cursor tracks parenthesis depth and a stack of the function calls it
//! is currently inside, so handlers can ask "is this comma directly inside
//! CONCAT?" without re-parsing.

use crate::token::{Filter, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Upper-cased function name.
    pub function: String,
    /// Depth before the call's opening parenthesis.
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    input: Vec<Token>,
    output: Vec<Token>,
    /// Number of input tokens already passed over.
    position: usize,
    current: Option<Token>,
    depth: usize,
    call_stack: Vec<CallFrame>,
    last_function_call: Option<String>,
    unbalanced: bool,
}

impl Rewriter {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            input: tokens,
            ..Self::default()
        }
    }

    /// A fresh rewriter over a fragment of another stream.
    pub fn from_slice(tokens: &[Token]) -> Self {
        Self::new(tokens.to_vec())
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn call_stack(&self) -> &[CallFrame] {
        &self.call_stack
    }

    /// Innermost frame whose function is one of `names`.
    pub fn find_call(&self, names: &[&str]) -> Option<&CallFrame> {
        self.call_stack
            .iter()
            .rev()
            .find(|f| names.iter().any(|n| n.eq_ignore_ascii_case(&f.function)))
    }

    pub fn innermost_call(&self) -> Option<&CallFrame> {
        self.call_stack.last()
    }

    /// True once a `)` was seen with no matching `(`.
    pub fn is_unbalanced(&self) -> bool {
        self.unbalanced
    }

    pub fn has_more(&self) -> bool {
        self.position < self.input.len()
    }

    /// Tokens not yet passed over.
    pub fn remaining(&self) -> &[Token] {
        &self.input[self.position..]
    }

    pub fn output(&self) -> &[Token] {
        &self.output
    }

    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    /// Next token satisfying `filter`, without moving the cursor.
    pub fn peek(&self, filter: &Filter<'_>) -> Option<&Token> {
        let mut depth = self.depth;
        for token in self.remaining() {
            let at = step_depth(token, &mut depth);
            if token.matches(filter) && filter.depth.map_or(true, |d| d == at) {
                return Some(token);
            }
        }
        None
    }

    /// The n-th (1-based) significant token ahead of the cursor.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.remaining()
            .iter()
            .filter(|t| !t.is_semantically_void())
            .nth(n.checked_sub(1)?)
    }

    /// Moves past tokens up to and including the first match, copying every
    /// one of them to the output.
    pub fn consume(&mut self, filter: &Filter<'_>) -> Option<Token> {
        while let Some((token, at)) = self.advance() {
            self.output.push(token.clone());
            if token.matches(filter) && filter.depth.map_or(true, |d| d == at) {
                return Some(token);
            }
        }
        None
    }

    pub fn consume_all(&mut self) {
        while self.consume(&Filter::any()).is_some() {}
    }

    /// Like `consume`, but nothing is copied. A single space survives when
    /// whitespace was dropped so neighbours do not glue together.
    pub fn skip(&mut self, filter: &Filter<'_>) -> Option<Token> {
        let mut skipped_whitespace = false;
        while let Some((token, at)) = self.advance() {
            if token.matches(filter) && filter.depth.map_or(true, |d| d == at) {
                if skipped_whitespace && !self.output_ends_with_space() {
                    self.output.push(Token::whitespace());
                }
                return Some(token);
            }
            if token.kind == TokenKind::Whitespace {
                skipped_whitespace = true;
            }
        }
        if skipped_whitespace && !self.output_ends_with_space() {
            self.output.push(Token::whitespace());
        }
        None
    }

    /// Moves exactly one token forward without writing anything.
    pub fn skip_one(&mut self) -> Option<Token> {
        self.advance().map(|(token, _)| token)
    }

    /// Moves past tokens up to and including the first match and hands them
    /// back instead of writing them to the output.
    pub fn skip_and_return_all(&mut self, filter: &Filter<'_>) -> Vec<Token> {
        let mut taken = Vec::new();
        while let Some((token, at)) = self.advance() {
            let found = token.matches(filter) && filter.depth.map_or(true, |d| d == at);
            taken.push(token);
            if found {
                break;
            }
        }
        taken
    }

    pub fn add(&mut self, token: Token) {
        self.output.push(token);
    }

    pub fn add_many(&mut self, tokens: impl IntoIterator<Item = Token>) {
        self.output.extend(tokens);
    }

    pub fn drop_last(&mut self) -> Option<Token> {
        self.output.pop()
    }

    /// Removes and returns every output token from `index` on.
    pub fn split_output(&mut self, index: usize) -> Vec<Token> {
        self.output.split_off(index.min(self.output.len()))
    }

    pub fn replace_all(&mut self, tokens: Vec<Token>) -> Vec<Token> {
        std::mem::replace(&mut self.output, tokens)
    }

    /// Drops trailing whitespace and comments from the output.
    pub fn trim_output(&mut self) {
        while self.output.last().is_some_and(|t| t.is_semantically_void()) {
            self.output.pop();
        }
    }

    pub fn render(&self) -> String {
        render(&self.output)
    }

    fn output_ends_with_space(&self) -> bool {
        self.output
            .last()
            .map_or(true, |t| t.kind == TokenKind::Whitespace)
    }

    /// Steps one token forward, updating depth and the call stack. Returns
    /// the token and the depth it sits at; both parentheses of a pair report
    /// the depth outside them.
    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.input.get(self.position)?.clone();
        self.position += 1;

        let at = if token.is_operator("(") {
            if let Some(function) = self.last_function_call.take() {
                self.call_stack.push(CallFrame {
                    function,
                    depth: self.depth,
                });
            }
            self.depth += 1;
            self.depth - 1
        } else if token.is_operator(")") {
            if self.depth == 0 {
                self.unbalanced = true;
            } else {
                self.depth -= 1;
            }
            if self.call_stack.last().is_some_and(|f| f.depth == self.depth) {
                self.call_stack.pop();
            }
            self.depth
        } else {
            self.depth
        };

        if token.is_function() {
            self.last_function_call = Some(token.value_upper());
        } else if !token.is_semantically_void() {
            self.last_function_call = None;
        }

        self.current = Some(token.clone());
        Some((token, at))
    }
}

pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

fn step_depth(token: &Token, depth: &mut usize) -> usize {
    if token.is_operator("(") {
        *depth += 1;
        *depth - 1
    } else if token.is_operator(")") {
        *depth = depth.saturating_sub(1);
        *depth
    } else {
        *depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::token::TokenFlags;

    fn rewriter(sql: &str) -> Rewriter {
        Rewriter::new(tokenize(sql).unwrap())
    }

    #[test]
    fn test_consume_all_renders_input() {
        let sql = "SELECT a, b FROM t WHERE (x = 1)";
        let mut r = rewriter(sql);
        r.consume_all();
        assert_eq!(r.render(), sql);
        assert_eq!(r.depth(), 0);
        assert!(r.call_stack().is_empty());
    }

    #[test]
    fn test_peek_does_not_move() {
        let r = rewriter("SELECT a FROM t");
        let from = r.peek(&Filter::keyword(&["FROM"])).unwrap();
        assert_eq!(from.value_str(), "FROM");
        assert_eq!(r.peek_nth(1).unwrap().value_str(), "SELECT");
        assert_eq!(r.peek_nth(2).unwrap().text, "a");
        assert!(r.peek_nth(0).is_none());
        assert!(r.current().is_none());
    }

    #[test]
    fn test_peek_at_depth() {
        let r = rewriter("SELECT (SELECT 1 LIMIT 1) LIMIT 2");
        let limit = r.peek(&Filter::keyword(&["LIMIT"]).at_depth(0));
        assert_eq!(limit.unwrap().position, 26);
    }

    #[test]
    fn test_skip_keeps_one_space() {
        let mut r = rewriter("SELECT a  /* c */  FROM t");
        r.consume(&Filter::any().with_values(&["a"]));
        r.skip(&Filter::keyword(&["FROM"]));
        assert_eq!(r.render(), "SELECT a ");
        r.consume_all();
        assert_eq!(r.render(), "SELECT a  t");
    }

    #[test]
    fn test_call_stack_tracks_innermost_function() {
        let mut r = rewriter("SELECT CONCAT(a, UPPER(b), (c)), d");
        let mut seen = Vec::new();
        while let Some(t) = r.consume(&Filter::operator(&[","])) {
            let frame = r.innermost_call().map(|f| (f.function.clone(), f.depth));
            seen.push((t.position, frame, r.depth()));
        }
        assert_eq!(
            seen,
            vec![
                (15, Some(("CONCAT".to_string(), 0)), 1),
                (25, Some(("CONCAT".to_string(), 0)), 1),
                (31, None, 0),
            ]
        );
        assert!(r.call_stack().is_empty());
    }

    #[test]
    fn test_nested_concat_attribution() {
        let mut r = rewriter("CONCAT(a, CONCAT(b, c))");
        let mut depths = Vec::new();
        while r.consume(&Filter::operator(&[","])).is_some() {
            let frame = r.find_call(&["CONCAT"]).unwrap();
            depths.push((frame.depth, r.depth()));
        }
        // the first comma belongs to the outer call, the second to the inner
        assert_eq!(depths, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_unbalanced_close_is_detected() {
        let mut r = rewriter("SELECT 1)");
        r.consume_all();
        assert!(r.is_unbalanced());
        assert_eq!(r.depth(), 0);
    }

    #[test]
    fn test_parenthesis_after_non_function_pushes_nothing() {
        let mut r = rewriter("SELECT a IN (1, 2)");
        r.consume(&Filter::operator(&["("]));
        assert!(r.call_stack().is_empty());
        assert_eq!(r.depth(), 1);
    }

    #[test]
    fn test_skip_and_return_and_replace() {
        let mut r = rewriter("SELECT a, b FROM t");
        r.consume(&Filter::keyword(&["SELECT"]));
        let taken = r.skip_and_return_all(&Filter::keyword(&["FROM"]));
        assert_eq!(render(&taken), " a, b FROM");
        let old = r.replace_all(vec![Token::keyword("DELETE"), Token::whitespace()]);
        assert_eq!(render(&old), "SELECT");
        r.consume_all();
        assert_eq!(r.render(), "DELETE  t");
        assert_eq!(r.drop_last().unwrap().text, "t");
    }

    #[test]
    fn test_current_token_follows_cursor() {
        let mut r = rewriter("SELECT COUNT(*) FROM t");
        let star = r.consume(&Filter::kind(TokenKind::Operator).with_flags(TokenFlags::WILDCARD));
        assert!(star.is_some());
        assert_eq!(r.current().unwrap().text, "*");
        assert_eq!(r.innermost_call().unwrap().function, "COUNT");
    }
}

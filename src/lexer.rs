//! MySQL lexer.
//!
//! Sub-lexers are tried in a fixed order at every offset: delimiter,
//! whitespace, number, comment, operator, bool, string, symbol, keyword,
//! label and finally the catch-all for bare identifiers. Two passes run over
//! the finished stream: `*` is tagged as a wildcard where it cannot be a
//! multiplication, and function keywords used as plain column names lose
//! their keyword status.

use crate::error::{Result, TranslateError};
use crate::keywords;
use crate::token::{Token, TokenFlags, TokenKind};

pub fn tokenize(sql: &str) -> Result<Vec<Token>> {
    Lexer::new(sql).run()
}

/// Splits a script into statement texts, honouring `DELIMITER` directives.
pub fn split_statements(sql: &str) -> Result<Vec<String>> {
    let tokens = tokenize(sql)?;
    let mut statements = Vec::new();
    let mut current: Vec<&Token> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let at_start = current.iter().all(|t| t.is_semantically_void());
        if at_start && token.kind == TokenKind::Keyword && token.value_upper() == "DELIMITER" {
            // the directive is KEYWORD, WHITESPACE, DELIMITER
            i += 1;
            while i < tokens.len() && tokens[i].kind != TokenKind::Delimiter {
                i += 1;
            }
            i += 1;
            current.clear();
            continue;
        }
        if token.kind == TokenKind::Delimiter {
            flush(&mut current, &mut statements);
        } else {
            current.push(token);
        }
        i += 1;
    }
    flush(&mut current, &mut statements);
    Ok(statements)
}

fn flush(current: &mut Vec<&Token>, statements: &mut Vec<String>) {
    if current.iter().any(|t| !t.is_semantically_void()) {
        let text: String = current.iter().map(|t| t.text.as_str()).collect();
        statements.push(text.trim().to_string());
    }
    current.clear();
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    delimiter: String,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            delimiter: ";".to_string(),
            tokens: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<Vec<Token>> {
        while self.pos < self.src.len() {
            let token = self.next_token()?;
            let directive = token.kind == TokenKind::Keyword
                && token.value_upper() == "DELIMITER"
                && self
                    .last_significant()
                    .map_or(true, |t| t.kind == TokenKind::Delimiter);
            self.push(token);
            if directive {
                self.lex_delimiter_directive()?;
            }
        }
        mark_wildcards(&mut self.tokens);
        demote_plain_names(&mut self.tokens);
        Ok(self.tokens)
    }

    fn push(&mut self, token: Token) {
        self.pos += token.text.len();
        self.tokens.push(token);
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn token(&self, len: usize, kind: TokenKind, flags: TokenFlags) -> Token {
        Token::at(&self.rest()[..len], kind, flags, self.pos)
    }

    fn last_significant(&self) -> Option<&Token> {
        self.tokens.iter().rev().find(|t| !t.is_semantically_void())
    }

    fn next_token(&mut self) -> Result<Token> {
        if let Some(t) = self.lex_delimiter() {
            return Ok(t);
        }
        if let Some(t) = self.lex_whitespace() {
            return Ok(t);
        }
        if let Some(t) = self.lex_number() {
            return Ok(t);
        }
        if let Some(t) = self.lex_comment() {
            return Ok(t);
        }
        if let Some(t) = self.lex_operator() {
            return Ok(t);
        }
        if let Some(t) = self.lex_bool() {
            return Ok(t);
        }
        if let Some(t) = self.lex_string()? {
            return Ok(t);
        }
        if let Some(t) = self.lex_symbol()? {
            return Ok(t);
        }
        if let Some(t) = self.lex_keyword() {
            return Ok(t);
        }
        if let Some(t) = self.lex_label() {
            return Ok(t);
        }
        self.lex_unknown()
    }

    fn lex_delimiter(&self) -> Option<Token> {
        self.rest()
            .starts_with(self.delimiter.as_str())
            .then(|| self.token(self.delimiter.len(), TokenKind::Delimiter, TokenFlags::empty()))
    }

    fn lex_whitespace(&self) -> Option<Token> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        (len > 0).then(|| self.token(len, TokenKind::Whitespace, TokenFlags::empty()))
    }

    fn negative_allowed(&self) -> bool {
        match self.last_significant() {
            None => true,
            Some(t) => match t.kind {
                TokenKind::Operator => t.text != ")",
                TokenKind::Keyword | TokenKind::Delimiter => true,
                _ => false,
            },
        }
    }

    fn lex_number(&self) -> Option<Token> {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if let Some(len) = quoted_literal(rest, 'x', |c| c.is_ascii_hexdigit()) {
            return Some(self.token(len, TokenKind::Number, TokenFlags::HEX));
        }
        if let Some(len) = quoted_literal(rest, 'b', |c| c == '0' || c == '1') {
            return Some(self.token(len, TokenKind::Number, TokenFlags::BINARY));
        }
        if let Some(len) = prefixed_literal(rest, "0x", |c| c.is_ascii_hexdigit()) {
            return Some(self.token(len, TokenKind::Number, TokenFlags::HEX));
        }
        if let Some(len) = prefixed_literal(rest, "0b", |c| c == '0' || c == '1') {
            return Some(self.token(len, TokenKind::Number, TokenFlags::BINARY));
        }

        let mut flags = TokenFlags::empty();
        let mut i = 0;
        if bytes.first() == Some(&b'-') {
            if !self.negative_allowed() {
                return None;
            }
            flags |= TokenFlags::NEGATIVE;
            i = 1;
        }
        let int_digits = count_digits(&bytes[i..]);
        i += int_digits;
        let mut frac_digits = 0;
        if bytes.get(i) == Some(&b'.') {
            frac_digits = count_digits(&bytes[i + 1..]);
            if frac_digits > 0 {
                if int_digits == 0 && self.last_significant().is_some_and(|t| t.is_identifier_like()) {
                    return None;
                }
                flags |= TokenFlags::FLOAT;
                i += 1 + frac_digits;
            }
        }
        if int_digits == 0 && frac_digits == 0 {
            return None;
        }
        if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
            let mut j = i + 1;
            if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
                j += 1;
            }
            let exp_digits = count_digits(&bytes[j..]);
            if exp_digits > 0 {
                flags |= TokenFlags::APPROXIMATE;
                i = j + exp_digits;
            }
        }
        if rest[i..].chars().next().is_some_and(is_ident_char) {
            return None;
        }
        Some(self.token(i, TokenKind::Number, flags))
    }

    fn lex_comment(&self) -> Option<Token> {
        let rest = self.rest();
        let to_eol = || rest.find('\n').unwrap_or(rest.len());
        if rest.starts_with('#') {
            return Some(self.token(to_eol(), TokenKind::Comment, TokenFlags::BASH_COMMENT));
        }
        if rest.starts_with("--") && rest[2..].chars().next().map_or(true, char::is_whitespace) {
            return Some(self.token(to_eol(), TokenKind::Comment, TokenFlags::SQL_COMMENT));
        }
        if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map_or(rest.len(), |end| end + 4);
            let mut flags = TokenFlags::C_COMMENT;
            if rest.starts_with("/*!") {
                flags |= TokenFlags::MYSQL_COMMAND;
            }
            return Some(self.token(len, TokenKind::Comment, flags));
        }
        None
    }

    fn lex_operator(&self) -> Option<Token> {
        let rest = self.rest();
        keywords::operators()
            .iter()
            .find(|(op, _)| rest.starts_with(op))
            .map(|(op, flags)| self.token(op.len(), TokenKind::Operator, *flags))
    }

    fn lex_bool(&self) -> Option<Token> {
        let rest = self.rest();
        ["TRUE", "FALSE"]
            .iter()
            .find_map(|word| match_phrase(rest, word))
            .map(|len| self.token(len, TokenKind::Bool, TokenFlags::empty()))
    }

    fn lex_string(&self) -> Result<Option<Token>> {
        let rest = self.rest();
        let (quote, flags) = match rest.chars().next() {
            Some('\'') => ('\'', TokenFlags::SINGLE_QUOTES),
            Some('"') => ('"', TokenFlags::DOUBLE_QUOTES),
            _ => return Ok(None),
        };
        match scan_quoted(rest, quote, true) {
            Some(len) => Ok(Some(self.token(len, TokenKind::String, flags))),
            None => Err(TranslateError::UnterminatedString { offset: self.pos }),
        }
    }

    fn lex_symbol(&self) -> Result<Option<Token>> {
        let rest = self.rest();
        let mut chars = rest.chars();
        let token = match (chars.next(), chars.next()) {
            (Some('`'), _) => {
                let len = scan_quoted(rest, '`', false)
                    .ok_or(TranslateError::UnterminatedString { offset: self.pos })?;
                self.token(len, TokenKind::Symbol, TokenFlags::BACKTICK)
            }
            (Some('@'), Some('@')) => {
                let len = 2 + ident_len(&rest[2..], true);
                self.token(len, TokenKind::Symbol, TokenFlags::SYSTEM)
            }
            (Some('@'), Some(q @ ('\'' | '"' | '`'))) => {
                let len = 1 + scan_quoted(&rest[1..], q, q != '`')
                    .ok_or(TranslateError::UnterminatedString { offset: self.pos })?;
                self.token(len, TokenKind::Symbol, TokenFlags::VARIABLE)
            }
            (Some('@'), _) => {
                let len = 1 + ident_len(&rest[1..], true);
                self.token(len, TokenKind::Symbol, TokenFlags::VARIABLE)
            }
            (Some('?'), _) => self.token(1, TokenKind::Symbol, TokenFlags::PARAMETER),
            (Some(':'), Some(c)) if c.is_alphabetic() || c == '_' => {
                let len = 1 + ident_len(&rest[1..], false);
                self.token(len, TokenKind::Symbol, TokenFlags::PARAMETER)
            }
            _ => return Ok(None),
        };
        Ok(Some(token))
    }

    fn lex_keyword(&self) -> Option<Token> {
        let rest = self.rest();
        if !rest.chars().next().is_some_and(is_ident_start) {
            return None;
        }
        for (phrase, flags) in keywords::composed_keywords() {
            if let Some(len) = match_phrase(rest, phrase) {
                return Some(self.token(len, TokenKind::Keyword, flags));
            }
        }
        let len = ident_len(rest, false);
        keywords::keyword_flags(&rest[..len]).map(|flags| self.token(len, TokenKind::Keyword, flags))
    }

    fn lex_label(&self) -> Option<Token> {
        let rest = self.rest();
        if !rest.chars().next().is_some_and(is_ident_start) {
            return None;
        }
        let len = ident_len(rest, false);
        let after = &rest[len..];
        let is_label = after.starts_with(':')
            && after[1..].chars().next().map_or(true, char::is_whitespace);
        is_label.then(|| self.token(len + 1, TokenKind::Label, TokenFlags::empty()))
    }

    fn lex_unknown(&self) -> Result<Token> {
        let rest = self.rest();
        let len = ident_len(rest, false);
        if len > 0 {
            return Ok(self.token(len, TokenKind::None, TokenFlags::empty()));
        }
        let ch = rest.chars().next().unwrap_or('\0');
        Err(TranslateError::UnexpectedCharacter {
            ch,
            offset: self.pos,
        })
    }

    /// `DELIMITER x` switches the active statement delimiter.
    fn lex_delimiter_directive(&mut self) -> Result<()> {
        if let Some(ws) = self.lex_whitespace() {
            self.push(ws);
        }
        let rest = self.rest();
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if len == 0 {
            return Err(TranslateError::Parse(
                "DELIMITER requires a delimiter string".into(),
            ));
        }
        let token = self.token(len, TokenKind::Delimiter, TokenFlags::empty());
        self.delimiter = token.text.clone();
        self.push(token);
        Ok(())
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ident_len(s: &str, allow_dots: bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !(is_ident_char(*c) || (allow_dots && *c == '.')))
        .map_or(s.len(), |(i, _)| i)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of `x'..'` style literals whose body satisfies `valid`.
fn quoted_literal(s: &str, prefix: char, valid: impl Fn(char) -> bool) -> Option<usize> {
    let mut chars = s.chars();
    if !chars.next()?.eq_ignore_ascii_case(&prefix) || chars.next()? != '\'' {
        return None;
    }
    let body = &s[2..];
    let end = body.find('\'')?;
    body[..end].chars().all(valid).then_some(end + 3)
}

fn prefixed_literal(s: &str, prefix: &str, valid: impl Fn(char) -> bool) -> Option<usize> {
    let head = s.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let body = &s[prefix.len()..];
    let digits = body.find(|c: char| !valid(c)).unwrap_or(body.len());
    if digits == 0 || body[digits..].chars().next().is_some_and(is_ident_char) {
        return None;
    }
    Some(prefix.len() + digits)
}

/// Finds the end of a quoted run, handling doubled quotes and, optionally,
/// backslash escapes. Returns the length including both quotes.
fn scan_quoted(s: &str, quote: char, backslash: bool) -> Option<usize> {
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if backslash && c == '\\' {
            chars.next();
            continue;
        }
        if c == quote {
            if matches!(chars.peek(), Some((_, next)) if *next == quote) {
                chars.next();
                continue;
            }
            return Some(i + c.len_utf8());
        }
    }
    None
}

/// Matches a space-separated phrase case-insensitively, allowing any run of
/// whitespace between words. The phrase must end at a word boundary.
fn match_phrase(s: &str, phrase: &str) -> Option<usize> {
    let mut pos = 0;
    for (n, word) in phrase.split(' ').enumerate() {
        if n > 0 {
            let ws = s[pos..]
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(s.len() - pos);
            if ws == 0 {
                return None;
            }
            pos += ws;
        }
        let candidate = s.get(pos..pos + word.len())?;
        if !candidate.eq_ignore_ascii_case(word) {
            return None;
        }
        pos += word.len();
    }
    if s[pos..].chars().next().is_some_and(is_ident_char) {
        return None;
    }
    Some(pos)
}

fn next_significant(tokens: &[Token], from: usize) -> Option<&Token> {
    tokens.get(from..)?.iter().find(|t| !t.is_semantically_void())
}

fn prev_significant(tokens: &[Token], before: usize) -> Option<&Token> {
    tokens[..before].iter().rev().find(|t| !t.is_semantically_void())
}

fn mark_wildcards(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if !tokens[i].is_operator("*") {
            continue;
        }
        let wildcard = match next_significant(tokens, i + 1) {
            None => true,
            Some(next) => {
                next.kind == TokenKind::Delimiter
                    || next.is_keyword(&["FROM", "USING"])
                    || next.is_operator(",")
                    || next.is_operator(")")
            }
        };
        if wildcard {
            tokens[i].flags |= TokenFlags::WILDCARD;
        }
    }
}

/// Function names used as columns (`SELECT date FROM ...`) and any keyword
/// qualified by a table (`p.status`) become plain identifiers.
fn demote_plain_names(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if tokens[i].kind != TokenKind::Keyword {
            continue;
        }
        let qualified = prev_significant(tokens, i).is_some_and(|p| p.is_operator("."));
        let demote = qualified
            || (tokens[i].is_function()
                && match next_significant(tokens, i + 1) {
                    None => true,
                    Some(next) => {
                        next.kind == TokenKind::Delimiter
                            || next.is_keyword(&["FROM", "SET", "WHERE"])
                            || next.is_operator(",")
                            || next.is_operator(".")
                    }
                });
        if demote {
            let t = &tokens[i];
            tokens[i] = Token::at(t.text.clone(), TokenKind::None, TokenFlags::empty(), t.position);
        }
    }
}

use bitflags::bitflags;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Bare identifiers and anything no other sub-lexer claimed.
    None,
    Keyword,
    Operator,
    Whitespace,
    Comment,
    Bool,
    Number,
    String,
    Symbol,
    Delimiter,
    Label,
}

bitflags! {
    /// Qualifiers for a [`TokenKind`]. Tested with bitwise AND, so a token can
    /// satisfy several flag queries at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenFlags: u32 {
        // keywords
        const RESERVED = 1 << 0;
        const COMPOSED = 1 << 1;
        const DATA_TYPE = 1 << 2;
        const KEY = 1 << 3;
        const FUNCTION = 1 << 4;
        // numbers
        const HEX = 1 << 5;
        const FLOAT = 1 << 6;
        const APPROXIMATE = 1 << 7;
        const NEGATIVE = 1 << 8;
        const BINARY = 1 << 9;
        // strings
        const SINGLE_QUOTES = 1 << 10;
        const DOUBLE_QUOTES = 1 << 11;
        // operators
        const ARITHMETIC = 1 << 12;
        const LOGICAL = 1 << 13;
        const BITWISE = 1 << 14;
        const ASSIGNMENT = 1 << 15;
        const SQL = 1 << 16;
        // comments
        const BASH_COMMENT = 1 << 17;
        const C_COMMENT = 1 << 18;
        const SQL_COMMENT = 1 << 19;
        const MYSQL_COMMAND = 1 << 20;
        // symbols
        const VARIABLE = 1 << 21;
        const SYSTEM = 1 << 22;
        const BACKTICK = 1 << 23;
        const PARAMETER = 1 << 24;
        /// `*` used as the SQL wildcard rather than multiplication.
        const WILDCARD = 1 << 25;
    }
}

/// Semantic value extracted from a token's text at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Text(s) => f.write_str(s),
            TokenValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            TokenValue::Int(i) => write!(f, "{i}"),
            TokenValue::Float(x) => write!(f, "{x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub flags: TokenFlags,
    pub value: TokenValue,
    pub position: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, flags: TokenFlags) -> Self {
        Self::at(text, kind, flags, 0)
    }

    pub fn at(text: impl Into<String>, kind: TokenKind, flags: TokenFlags, position: usize) -> Self {
        let text = text.into();
        let value = extract_value(&text, kind, flags);
        Self {
            text,
            kind,
            flags,
            value,
            position,
        }
    }

    pub fn keyword(text: &str) -> Self {
        Self::new(text, TokenKind::Keyword, TokenFlags::RESERVED)
    }

    pub fn function(name: &str) -> Self {
        Self::new(name, TokenKind::Keyword, TokenFlags::FUNCTION)
    }

    pub fn operator(text: &str) -> Self {
        let flags = match text {
            "(" | ")" | "," | "." | ";" => TokenFlags::SQL,
            _ => TokenFlags::empty(),
        };
        Self::new(text, TokenKind::Operator, flags)
    }

    pub fn whitespace() -> Self {
        Self::new(" ", TokenKind::Whitespace, TokenFlags::empty())
    }

    pub fn newline() -> Self {
        Self::new("\n", TokenKind::Whitespace, TokenFlags::empty())
    }

    /// A backtick-quoted identifier.
    pub fn identifier(name: &str) -> Self {
        Self::new(quote_identifier(name), TokenKind::Symbol, TokenFlags::BACKTICK)
    }

    pub fn parameter(name: &str) -> Self {
        Self::new(name, TokenKind::Symbol, TokenFlags::PARAMETER)
    }

    pub fn number(n: i64) -> Self {
        let flags = if n < 0 {
            TokenFlags::NEGATIVE
        } else {
            TokenFlags::empty()
        };
        Self::new(n.to_string(), TokenKind::Number, flags)
    }

    /// A token rendered verbatim; used for prebuilt SQL fragments.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(text, TokenKind::None, TokenFlags::empty())
    }

    pub fn is_semantically_void(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn value_str(&self) -> Cow<'_, str> {
        match &self.value {
            TokenValue::Text(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }

    pub fn value_upper(&self) -> String {
        self.value_str().to_ascii_uppercase()
    }

    pub fn matches(&self, filter: &Filter<'_>) -> bool {
        if filter.kind.is_none() && filter.flags.is_none() && filter.values.is_none() {
            return !self.is_semantically_void();
        }
        if let Some(kind) = filter.kind {
            if self.kind != kind {
                return false;
            }
        }
        if let Some(flags) = filter.flags {
            if !self.flags.intersects(flags) {
                return false;
            }
        }
        if let Some(values) = filter.values {
            let value = self.value_str();
            if !values.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
                return false;
            }
        }
        true
    }

    pub fn is_keyword(&self, values: &[&str]) -> bool {
        self.matches(&Filter::keyword(values))
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    pub fn is_function(&self) -> bool {
        self.kind == TokenKind::Keyword && self.flags.contains(TokenFlags::FUNCTION)
    }

    /// True for tokens that can name a table or column.
    pub fn is_identifier_like(&self) -> bool {
        match self.kind {
            TokenKind::None | TokenKind::Symbol => !self.flags.contains(TokenFlags::PARAMETER),
            TokenKind::Keyword => !self.flags.contains(TokenFlags::RESERVED),
            TokenKind::String => self.flags.contains(TokenFlags::DOUBLE_QUOTES),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Pattern used by `Token::matches` and the rewriter's cursor operations.
///
/// An empty filter matches every token that is not whitespace or a comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filter<'a> {
    pub kind: Option<TokenKind>,
    pub flags: Option<TokenFlags>,
    pub values: Option<&'a [&'a str]>,
    pub depth: Option<usize>,
}

impl<'a> Filter<'a> {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn kind(kind: TokenKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn keyword(values: &'a [&'a str]) -> Self {
        Self {
            kind: Some(TokenKind::Keyword),
            values: Some(values),
            ..Self::default()
        }
    }

    pub fn operator(values: &'a [&'a str]) -> Self {
        Self {
            kind: Some(TokenKind::Operator),
            values: Some(values),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: TokenFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_values(mut self, values: &'a [&'a str]) -> Self {
        self.values = Some(values);
        self
    }

    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a value as an SQL string literal; used only where SQLite refuses
/// bound parameters (DDL defaults).
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn extract_value(text: &str, kind: TokenKind, flags: TokenFlags) -> TokenValue {
    match kind {
        TokenKind::Keyword => {
            let collapsed = if flags.contains(TokenFlags::COMPOSED) {
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            } else {
                text.to_string()
            };
            if flags.contains(TokenFlags::RESERVED) {
                TokenValue::Text(collapsed.to_ascii_uppercase())
            } else {
                TokenValue::Text(collapsed)
            }
        }
        TokenKind::Whitespace => TokenValue::Text(" ".into()),
        TokenKind::Bool => TokenValue::Bool(text.eq_ignore_ascii_case("true")),
        TokenKind::Number => extract_number(text, flags),
        TokenKind::String => TokenValue::Text(unquote_string(text)),
        TokenKind::Symbol => TokenValue::Text(unwrap_symbol(text, flags)),
        TokenKind::Label => TokenValue::Text(text.trim_end_matches(':').to_string()),
        _ => TokenValue::Text(text.to_string()),
    }
}

fn extract_number(text: &str, flags: TokenFlags) -> TokenValue {
    let negative = flags.contains(TokenFlags::NEGATIVE);
    let body = text.trim_start_matches('-').trim();
    let sign = if negative { -1 } else { 1 };

    if flags.contains(TokenFlags::BINARY) {
        let digits = body
            .trim_start_matches(['b', 'B'])
            .trim_start_matches("0b")
            .trim_matches('\'');
        return match i64::from_str_radix(digits, 2) {
            Ok(n) => TokenValue::Int(sign * n),
            Err(_) => TokenValue::Text(text.to_string()),
        };
    }
    if flags.contains(TokenFlags::HEX) {
        let digits = if let Some(rest) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            rest
        } else {
            body.trim_start_matches(['x', 'X']).trim_matches('\'')
        };
        return match i64::from_str_radix(digits, 16) {
            Ok(n) => TokenValue::Int(sign * n),
            Err(_) => TokenValue::Text(text.to_string()),
        };
    }
    if flags.intersects(TokenFlags::FLOAT | TokenFlags::APPROXIMATE) {
        return match body.parse::<f64>() {
            Ok(x) => TokenValue::Float(sign as f64 * x),
            Err(_) => TokenValue::Text(text.to_string()),
        };
    }
    match body.parse::<i64>() {
        Ok(n) => TokenValue::Int(sign * n),
        Err(_) => match body.parse::<f64>() {
            Ok(x) => TokenValue::Float(sign as f64 * x),
            Err(_) => TokenValue::Text(text.to_string()),
        },
    }
}

/// Strips the quotes and resolves MySQL escape sequences. `\%` and `\_` keep
/// their backslash, as MySQL does, so LIKE patterns still see the escape.
pub(crate) fn unquote_string(text: &str) -> String {
    let mut chars = text.chars();
    let Some(quote) = chars.next() else {
        return String::new();
    };
    let inner: Vec<char> = chars.collect();
    let end = if inner.last() == Some(&quote) {
        inner.len() - 1
    } else {
        inner.len()
    };
    let mut out = String::with_capacity(end);
    let mut i = 0;
    while i < end {
        let c = inner[i];
        if c == quote && i + 1 < end && inner[i + 1] == quote {
            out.push(quote);
            i += 2;
            continue;
        }
        if c == '\\' && i + 1 < end {
            let next = inner[i + 1];
            match next {
                '0' => out.push('\0'),
                'b' => out.push('\u{8}'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'Z' => out.push('\u{1a}'),
                '%' | '_' => {
                    out.push('\\');
                    out.push(next);
                }
                other => out.push(other),
            }
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn unwrap_symbol(text: &str, flags: TokenFlags) -> String {
    if flags.contains(TokenFlags::BACKTICK) {
        let inner = text
            .strip_prefix('`')
            .map(|s| s.strip_suffix('`').unwrap_or(s))
            .unwrap_or(text);
        return inner.replace("``", "`");
    }
    if flags.contains(TokenFlags::SYSTEM) {
        return text.trim_start_matches('@').to_string();
    }
    if flags.contains(TokenFlags::VARIABLE) {
        let rest = text.trim_start_matches('@');
        return match rest.chars().next() {
            Some('`') => unwrap_symbol(rest, TokenFlags::BACKTICK),
            Some('\'') | Some('"') => unquote_string(rest),
            _ => rest.to_string(),
        };
    }
    if flags.contains(TokenFlags::PARAMETER) {
        if text == "?" {
            return text.to_string();
        }
        return text.trim_start_matches(':').to_string();
    }
    text.to_string()
}

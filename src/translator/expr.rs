//! Token-level passes shared by every statement handler: literal binding
//! and the MySQL-to-SQLite expression rewrites.

use super::{LikeState, Translator};
use crate::error::{Result, TranslateError};
use crate::functions::parse_datetime;
use crate::rewriter::Rewriter;
use crate::token::{Filter, Token, TokenFlags, TokenKind, TokenValue};
use regex::Regex;
use std::sync::OnceLock;

/// Escape character SQLite sees in rewritten LIKE patterns.
const LIKE_ESCAPE: char = '\u{1a}';

const ZERO_DATE: &str = "0000-00-00 00:00:00";

const FUNCTION_ALIASES: &[(&str, &str)] = &[
    ("SUBSTRING", "SUBSTR"),
    ("CHAR_LENGTH", "LENGTH"),
    ("CHARACTER_LENGTH", "LENGTH"),
    ("RAND", "RANDOM"),
    ("LCASE", "LOWER"),
    ("UCASE", "UPPER"),
    ("LAST_INSERT_ID", "LAST_INSERT_ROWID"),
    ("LEAST", "MIN"),
    ("GREATEST", "MAX"),
    ("IF", "IIF"),
    ("DATE_ADD", "DATETIME"),
    ("DATE_SUB", "DATETIME"),
    ("LEFT", "SUBSTR"),
];

fn cast_type(mysql: &str) -> Option<&'static str> {
    Some(match mysql {
        "BINARY" => "BLOB",
        "SIGNED" | "UNSIGNED" => "INTEGER",
        "CHAR" | "VARCHAR" | "NCHAR" | "JSON" | "DATE" | "DATETIME" | "TIME" => "TEXT",
        "DECIMAL" => "REAL",
        _ => return None,
    })
}

/// Rewrites a MySQL `DATE_FORMAT` pattern for SQLite's `strftime`.
pub(crate) fn strftime_format(mysql: &str) -> String {
    let mut out = String::with_capacity(mysql.len());
    let mut chars = mysql.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(spec) = chars.next() else {
            out.push('%');
            break;
        };
        let mapped = match spec {
            'Y' => "%Y",
            'y' => "%y",
            'm' | 'c' => "%m",
            'd' => "%d",
            'e' => "%e",
            'H' => "%H",
            'k' => "%k",
            'h' | 'I' => "%I",
            'l' => "%l",
            'i' => "%M",
            's' | 'S' => "%S",
            'p' => "%p",
            'M' => "%B",
            'b' => "%b",
            'W' => "%A",
            'a' => "%a",
            'j' => "%j",
            'w' => "%w",
            'T' => "%H:%M:%S",
            'r' => "%I:%M:%S %p",
            'U' => "%U",
            'u' => "%W",
            'f' => "000000",
            '%' => "%%",
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(mapped);
    }
    out
}

fn iso_datetime() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})T(\d{2}:\d{2}:\d{2})(\.\d+)?Z?$").ok())
        .as_ref()
}

fn dateish() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}( \d{2}:\d{2}:\d{2})?$").ok())
        .as_ref()
}

/// Normalizes ISO-8601 timestamps and replaces impossible calendar dates
/// with the zero date.
pub(crate) fn normalize_date_literal(value: &str, strict: bool) -> Result<String> {
    let value = match iso_datetime().and_then(|re| re.captures(value)) {
        Some(caps) => format!("{} {}", &caps[1], &caps[2]),
        None => value.to_string(),
    };
    if !dateish().is_some_and(|re| re.is_match(&value)) || value.starts_with("0000-00-00") {
        return Ok(value);
    }
    if parse_datetime(&value).is_some() {
        return Ok(value);
    }
    if strict {
        return Err(TranslateError::Parse(format!("invalid date '{value}'")));
    }
    Ok(ZERO_DATE.to_string())
}

impl Translator {
    /// Runs the shared passes over everything left in `rw`.
    pub(super) fn translate_rest(&mut self, rw: &mut Rewriter) -> Result<()> {
        while let Some(token) = rw.skip_one() {
            self.translate_token(rw, token)?;
        }
        self.finish_like(rw);
        self.close_having(rw);
        Ok(())
    }

    /// Translates one token the cursor just moved past.
    pub(super) fn translate_token(&mut self, rw: &mut Rewriter, token: Token) -> Result<()> {
        if self.like_ends_at(rw, &token) {
            self.finish_like(rw);
        }
        let handled = self.bind_literal(rw, &token)? || self.translate_expression(rw, &token)?;
        if !handled {
            rw.add(token.clone());
        }
        if !token.is_semantically_void() {
            self.session.previous = Some(token);
        }
        Ok(())
    }

    fn like_ends_at(&self, rw: &Rewriter, token: &Token) -> bool {
        let Some(like) = self.session.like else {
            return false;
        };
        match token.kind {
            TokenKind::Delimiter => true,
            TokenKind::Keyword => {
                token.flags.contains(TokenFlags::RESERVED)
                    && !token.is_function()
                    && !token.is_keyword(&["BINARY", "ESCAPE"])
                    && rw.depth() <= like.depth
            }
            TokenKind::Operator if token.text == "," => rw.depth() == like.depth,
            TokenKind::Operator if token.text == ")" => rw.depth() < like.depth,
            _ => false,
        }
    }

    pub(super) fn close_having(&mut self, rw: &mut Rewriter) {
        if std::mem::take(&mut self.session.having_open) {
            rw.trim_output();
            rw.add(Token::raw(") "));
        }
    }

    pub(super) fn finish_like(&mut self, rw: &mut Rewriter) {
        if let Some(like) = self.session.like.take() {
            if like.escaped {
                rw.add(Token::raw(" ESCAPE char(26) "));
            }
        }
    }

    /// Replaces a string literal with a bound placeholder.
    fn bind_literal(&mut self, rw: &mut Rewriter, token: &Token) -> Result<bool> {
        if token.kind != TokenKind::String {
            return Ok(false);
        }
        if self.session.previous.as_ref().is_some_and(|p| p.is_keyword(&["AS"])) {
            return Ok(false);
        }
        let mut value = normalize_date_literal(&token.value_str(), self.config.strict_dates)?;
        if let Some(like) = self.session.like.as_mut() {
            if value.contains("\\_") || value.contains("\\%") {
                value = value
                    .replace("\\_", &format!("{LIKE_ESCAPE}_"))
                    .replace("\\%", &format!("{LIKE_ESCAPE}%"));
                like.escaped = true;
            }
        }
        let placeholder = self.session.bind(value);
        rw.add(placeholder);
        Ok(true)
    }

    fn translate_expression(&mut self, rw: &mut Rewriter, token: &Token) -> Result<bool> {
        let upper = token.value_upper();
        let calls_function = token.is_function() && rw.peek_nth(1).is_some_and(|t| t.is_operator("("));

        if calls_function {
            return self.translate_call(rw, &upper);
        }

        match token.kind {
            TokenKind::Operator if token.text == "," => {
                if self.in_call_at_depth(rw, "CONCAT") {
                    rw.add(Token::raw(" ||"));
                    return Ok(true);
                }
                if self.in_call_at_depth(rw, "LEFT") {
                    rw.add(Token::raw(", 1,"));
                    return Ok(true);
                }
                Ok(false)
            }
            TokenKind::Number if token.flags.contains(TokenFlags::BINARY) => {
                match token.value {
                    TokenValue::Int(n) => rw.add(Token::number(n)),
                    _ => rw.add(token.clone()),
                }
                Ok(true)
            }
            TokenKind::Keyword => self.translate_keyword(rw, token, &upper),
            _ => Ok(false),
        }
    }

    fn translate_call(&mut self, rw: &mut Rewriter, name: &str) -> Result<bool> {
        match name {
            "CONCAT" => Ok(true),
            "DATE_FORMAT" => {
                self.translate_date_format(rw)?;
                Ok(true)
            }
            _ => match FUNCTION_ALIASES.iter().find(|(from, _)| *from == name) {
                Some((_, to)) => {
                    rw.add(Token::function(to));
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    fn translate_keyword(&mut self, rw: &mut Rewriter, token: &Token, upper: &str) -> Result<bool> {
        match upper {
            "FROM" if rw.peek_nth(1).is_some_and(|t| t.is_keyword(&["DUAL"])) => {
                rw.skip(&Filter::keyword(&["DUAL"]));
                Ok(true)
            }
            "AS" if self.in_call_at_depth(rw, "CAST") => {
                rw.add(token.clone());
                self.translate_cast_type(rw);
                Ok(true)
            }
            "INTERVAL" => {
                self.translate_interval(rw)?;
                Ok(true)
            }
            "REGEXP" | "RLIKE" => {
                rw.add(Token::keyword("REGEXP"));
                if rw.peek_nth(1).is_some_and(|t| t.is_keyword(&["BINARY"])) {
                    rw.skip(&Filter::keyword(&["BINARY"]));
                    rw.add(Token::raw("char(0) ||"));
                }
                Ok(true)
            }
            "BINARY" => Ok(true),
            "WHERE" if rw.depth() == 0 => {
                rw.add(token.clone());
                self.session.where_at = Some(rw.output_len());
                Ok(true)
            }
            "GROUP BY" if rw.depth() == 0 => {
                self.session.has_group_by = true;
                Ok(false)
            }
            // without GROUP BY, HAVING filters rows like a second WHERE
            "HAVING" if rw.depth() == 0 && !self.session.has_group_by => {
                match self.session.where_at {
                    Some(at) => {
                        let condition = rw.split_output(at);
                        rw.add(Token::raw(" ("));
                        rw.add_many(condition);
                        rw.trim_output();
                        rw.add(Token::raw(") AND ("));
                    }
                    None => rw.add(Token::raw("WHERE (")),
                }
                self.session.having_open = true;
                Ok(true)
            }
            "ORDER BY" | "LIMIT" | "UNION" | "UNION ALL" | "EXCEPT" | "INTERSECT" | "WINDOW"
                if rw.depth() == 0 =>
            {
                self.close_having(rw);
                if upper.starts_with("UNION") || upper == "EXCEPT" || upper == "INTERSECT" {
                    self.session.where_at = None;
                    self.session.has_group_by = false;
                }
                Ok(false)
            }
            "LIKE" => {
                self.session.like = Some(LikeState {
                    depth: rw.depth(),
                    escaped: false,
                });
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn in_call_at_depth(&self, rw: &Rewriter, name: &str) -> bool {
        rw.innermost_call()
            .is_some_and(|f| f.function == name && f.depth + 1 == rw.depth())
    }

    /// Called right after `CAST(... AS`.
    fn translate_cast_type(&mut self, rw: &mut Rewriter) {
        let Some(mapped) = rw.peek_nth(1).and_then(|t| cast_type(&t.value_upper())) else {
            return;
        };
        let depth = rw.depth();
        let skipped = rw.skip(&Filter::any()).map(|t| t.value_upper());
        if matches!(skipped.as_deref(), Some("SIGNED" | "UNSIGNED"))
            && rw.peek_nth(1).is_some_and(|t| matches!(t.value_upper().as_str(), "INT" | "INTEGER"))
        {
            rw.skip(&Filter::any());
        }
        rw.add(Token::raw(mapped));
        if rw.peek_nth(1).is_some_and(|t| t.is_operator("(")) {
            rw.skip(&Filter::operator(&[")"]).at_depth(depth));
        }
    }

    /// `INTERVAL n UNIT` becomes a bound `DATETIME` modifier such as `+1 day`.
    fn translate_interval(&mut self, rw: &mut Rewriter) -> Result<()> {
        let amount = rw
            .skip(&Filter::any())
            .ok_or_else(|| TranslateError::Parse("INTERVAL without a value".into()))?;
        let unit = rw
            .skip(&Filter::any())
            .ok_or_else(|| TranslateError::Parse("INTERVAL without a unit".into()))?;

        let mut n: i64 = match &amount.value {
            TokenValue::Int(n) => *n,
            TokenValue::Float(x) => *x as i64,
            TokenValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| TranslateError::Unsupported(format!("INTERVAL amount {}", amount.text)))?,
            TokenValue::Bool(_) => {
                return Err(TranslateError::Unsupported(format!("INTERVAL amount {}", amount.text)))
            }
        };
        if rw.find_call(&["DATE_ADD", "DATE_SUB"]).is_some_and(|f| f.function == "DATE_SUB") {
            n = -n;
        }
        let (n, unit) = match unit.value_upper().as_str() {
            "SECOND" => (n, "second"),
            "MINUTE" => (n, "minute"),
            "HOUR" => (n, "hour"),
            "DAY" => (n, "day"),
            "WEEK" => (n * 7, "day"),
            "MONTH" => (n, "month"),
            "QUARTER" => (n * 3, "month"),
            "YEAR" => (n, "year"),
            other => return Err(TranslateError::Unsupported(format!("INTERVAL unit {other}"))),
        };
        let placeholder = self.session.bind(format!("{n:+} {unit}"));
        rw.add(placeholder);
        Ok(())
    }

    /// `DATE_FORMAT(expr, 'fmt')` becomes `STRFTIME('fmt', expr)`.
    fn translate_date_format(&mut self, rw: &mut Rewriter) -> Result<()> {
        let depth = rw.depth();
        rw.skip(&Filter::operator(&["("]));
        let mut argument = rw.skip_and_return_all(&Filter::operator(&[","]).at_depth(depth + 1));
        if argument.last().is_some_and(|t| t.is_operator(",")) {
            argument.pop();
        } else {
            return Err(TranslateError::Parse("DATE_FORMAT needs two arguments".into()));
        }
        let format = rw
            .skip(&Filter::any())
            .filter(|t| t.kind == TokenKind::String)
            .ok_or_else(|| TranslateError::Unsupported("DATE_FORMAT with a non-literal format".into()))?;

        let format = self.session.bind(strftime_format(&format.value_str()));
        rw.add_many([Token::function("STRFTIME"), Token::operator("("), format, Token::raw(", ")]);

        let mut inner = Rewriter::new(argument);
        self.translate_rest(&mut inner)?;
        let translated: Vec<Token> = inner
            .output()
            .iter()
            .skip_while(|t| t.is_semantically_void())
            .cloned()
            .collect();
        rw.add_many(translated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::Cell;

    fn translator() -> Translator {
        Translator::open_in_memory(Config::default()).unwrap()
    }

    fn scalar(t: &mut Translator, sql: &str) -> Cell {
        let rows = t.query(sql).unwrap().into_rows().unwrap();
        rows.rows[0][0].clone()
    }

    #[test]
    fn test_strftime_format() {
        assert_eq!(strftime_format("%Y-%m-%d %H:%i:%s"), "%Y-%m-%d %H:%M:%S");
        assert_eq!(strftime_format("%W, %M %e"), "%A, %B %e");
        assert_eq!(strftime_format("100%%"), "100%%");
    }

    #[test]
    fn test_normalize_date_literal() {
        assert_eq!(
            normalize_date_literal("2024-01-02T03:04:05Z", false).unwrap(),
            "2024-01-02 03:04:05"
        );
        assert_eq!(normalize_date_literal("2024-02-30", false).unwrap(), ZERO_DATE);
        assert_eq!(
            normalize_date_literal("0000-00-00 00:00:00", true).unwrap(),
            ZERO_DATE
        );
        assert_eq!(normalize_date_literal("hello", true).unwrap(), "hello");
        assert!(normalize_date_literal("2023-13-01 00:00:00", true).is_err());
    }

    #[test]
    fn test_literals_are_bound() {
        let mut t = translator();
        assert_eq!(scalar(&mut t, "SELECT 'o''hara'"), Cell::text("o'hara"));
        assert_eq!(t.executed_queries(), ["SELECT :param0"]);
    }

    #[test]
    fn test_concat_and_nested_concat() {
        let mut t = translator();
        assert_eq!(
            scalar(&mut t, "SELECT CONCAT('a', CONCAT('b', 'c'), 'd')"),
            Cell::text("abcd")
        );
        assert_eq!(
            t.executed_queries()[0],
            "SELECT (:param0 || (:param1 || :param2) || :param3)"
        );
    }

    #[test]
    fn test_function_aliases() {
        let mut t = translator();
        assert_eq!(scalar(&mut t, "SELECT UCASE(SUBSTRING('hello', 2, 3))"), Cell::text("ELL"));
        assert_eq!(scalar(&mut t, "SELECT LEFT('hello', 2)"), Cell::text("he"));
        assert_eq!(scalar(&mut t, "SELECT IF(1 > 2, 'y', 'n')"), Cell::text("n"));
        assert_eq!(scalar(&mut t, "SELECT GREATEST(3, 9, 4)"), Cell::Int(9));
        assert_eq!(scalar(&mut t, "SELECT CHAR_LENGTH('abc')"), Cell::Int(3));
    }

    #[test]
    fn test_cast_types() {
        let mut t = translator();
        assert_eq!(scalar(&mut t, "SELECT CAST('42' AS UNSIGNED INTEGER)"), Cell::Int(42));
        assert_eq!(scalar(&mut t, "SELECT CAST(7 AS CHAR(10))"), Cell::text("7"));
        assert_eq!(scalar(&mut t, "SELECT CAST('1.5' AS DECIMAL(10,2))"), Cell::Float(1.5));
    }

    #[test]
    fn test_date_arithmetic() {
        let mut t = translator();
        assert_eq!(
            scalar(&mut t, "SELECT DATE_ADD('2024-01-31 10:00:00', INTERVAL 1 DAY)"),
            Cell::text("2024-02-01 10:00:00")
        );
        assert_eq!(
            scalar(&mut t, "SELECT DATE_SUB('2024-01-15 00:00:00', INTERVAL 2 WEEK)"),
            Cell::text("2024-01-01 00:00:00")
        );
        assert_eq!(
            scalar(&mut t, "SELECT DATE_ADD('2024-01-01 00:00:00', INTERVAL 1 QUARTER)"),
            Cell::text("2024-04-01 00:00:00")
        );
        assert!(t.query("SELECT DATE_ADD(NOW(), INTERVAL 1 FORTNIGHT)").is_err());
    }

    #[test]
    fn test_date_format() {
        let mut t = translator();
        assert_eq!(
            scalar(&mut t, "SELECT DATE_FORMAT('2024-03-05 07:08:09', '%d/%m/%Y %H:%i')"),
            Cell::text("05/03/2024 07:08")
        );
        assert!(t.query("SELECT DATE_FORMAT(NOW(), @fmt)").is_err());
    }

    #[test]
    fn test_from_dual_and_binary_literal() {
        let mut t = translator();
        assert_eq!(scalar(&mut t, "SELECT b'101' + 1 FROM DUAL"), Cell::Int(6));
    }

    #[test]
    fn test_regexp_binary() {
        let mut t = translator();
        assert_eq!(scalar(&mut t, "SELECT 'Hello' REGEXP '^h'"), Cell::Int(1));
        assert_eq!(scalar(&mut t, "SELECT 'Hello' REGEXP BINARY '^h'"), Cell::Int(0));
        assert_eq!(scalar(&mut t, "SELECT 'Hello' RLIKE BINARY '^H'"), Cell::Int(1));
    }

    #[test]
    fn test_like_escape() {
        let mut t = translator();
        t.query("CREATE TABLE opts (name VARCHAR(50))").unwrap();
        t.query("INSERT INTO opts VALUES ('_site_x'), ('asite_y')").unwrap();
        let rows = t
            .query("SELECT name FROM opts WHERE name LIKE '\\_site%' ORDER BY name")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.rows, vec![vec![Cell::text("_site_x")]]);
        assert!(t.executed_queries()[0].contains("ESCAPE char(26)"));
    }

    #[test]
    fn test_having_without_group_by() {
        let mut t = translator();
        t.query("CREATE TABLE n (v INT)").unwrap();
        t.query("INSERT INTO n VALUES (1), (2), (3)").unwrap();
        let rows = t.query("SELECT v FROM n HAVING v > 1").unwrap().into_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(t.executed_queries()[0].contains("WHERE ("));
    }

    #[test]
    fn test_having_keeps_where_grouping() {
        let mut t = translator();
        t.query("CREATE TABLE n (a INT, b INT)").unwrap();
        t.query("INSERT INTO n VALUES (1, 0), (0, 1), (0, 0)").unwrap();

        let rows = t
            .query("SELECT a, b FROM n WHERE a = 1 OR b = 1 HAVING a = 0")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.rows, vec![vec![Cell::Int(0), Cell::Int(1)]]);

        // a WHERE inside a subquery does not count as the outer one
        let rows = t
            .query("SELECT a FROM n HAVING a IN (SELECT a FROM n WHERE b = 0) ORDER BY a LIMIT 5")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.rows, vec![vec![Cell::Int(0)], vec![Cell::Int(0)], vec![Cell::Int(1)]]);
    }
}

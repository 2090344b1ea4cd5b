//! MySQL builtins that rewritten SQL expects SQLite to know about.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Datelike, Utc};
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Installs scalar functions on a connection.
pub trait FunctionRegistry {
    fn register(&self, conn: &Connection) -> rusqlite::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFunctions;

impl FunctionRegistry for BuiltinFunctions {
    fn register(&self, conn: &Connection) -> rusqlite::Result<()> {
        let pure = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
        let volatile = FunctionFlags::SQLITE_UTF8;

        conn.create_scalar_function("regexp", 2, pure, regexp)?;
        conn.create_scalar_function("now", 0, volatile, |_| Ok(Local::now().format(DATETIME_FORMAT).to_string()))?;
        conn.create_scalar_function("curdate", 0, volatile, |_| Ok(Local::now().format("%Y-%m-%d").to_string()))?;
        conn.create_scalar_function("curtime", 0, volatile, |_| Ok(Local::now().format("%H:%M:%S").to_string()))?;
        conn.create_scalar_function("utc_timestamp", 0, volatile, |_| Ok(Utc::now().format(DATETIME_FORMAT).to_string()))?;
        conn.create_scalar_function("unix_timestamp", -1, volatile, unix_timestamp)?;
        conn.create_scalar_function("from_unixtime", 1, pure, from_unixtime)?;
        conn.create_scalar_function("year", 1, pure, |ctx| Ok(date_part(ctx, |d| i64::from(d.year()))))?;
        conn.create_scalar_function("month", 1, pure, |ctx| Ok(date_part(ctx, |d| i64::from(d.month()))))?;
        conn.create_scalar_function("dayofmonth", 1, pure, |ctx| Ok(date_part(ctx, |d| i64::from(d.day()))))?;
        conn.create_scalar_function("hour", 1, pure, |ctx| Ok(time_part(ctx, |t| i64::from(t.hour()))))?;
        conn.create_scalar_function("minute", 1, pure, |ctx| Ok(time_part(ctx, |t| i64::from(t.minute()))))?;
        conn.create_scalar_function("second", 1, pure, |ctx| Ok(time_part(ctx, |t| i64::from(t.second()))))?;
        conn.create_scalar_function("isnull", 1, pure, |ctx| {
            Ok(matches!(ctx.get_raw(0), ValueRef::Null) as i64)
        })?;
        // locks are meaningless on a single connection
        conn.create_scalar_function("get_lock", 2, volatile, |_| Ok(1i64))?;
        conn.create_scalar_function("release_lock", 1, volatile, |_| Ok(1i64))?;
        conn.create_scalar_function("field", -1, pure, field)?;
        Ok(())
    }
}

fn text_arg(ctx: &Context<'_>, i: usize) -> Option<String> {
    if i >= ctx.len() {
        return None;
    }
    match ctx.get_raw(i) {
        ValueRef::Null => None,
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(x) => Some(x.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn regex_cache() -> &'static Mutex<HashMap<String, Regex>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// `X REGEXP Y` arrives as `regexp(Y, X)`. A leading NUL in the pattern marks
/// a case-sensitive (`REGEXP BINARY`) match.
fn regexp(ctx: &Context<'_>) -> rusqlite::Result<Option<bool>> {
    let (Some(pattern), Some(value)) = (text_arg(ctx, 0), text_arg(ctx, 1)) else {
        return Ok(None);
    };
    let source = match pattern.strip_prefix('\0') {
        Some(sensitive) => sensitive.to_string(),
        None => format!("(?i){pattern}"),
    };
    let mut cache = regex_cache().lock();
    let re = match cache.get(&source) {
        Some(re) => re.clone(),
        None => {
            let re = Regex::new(&source).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            cache.insert(source, re.clone());
            re
        }
    };
    Ok(Some(re.is_match(&value)))
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn date_part(ctx: &Context<'_>, part: impl Fn(&NaiveDateTime) -> i64) -> Option<i64> {
    text_arg(ctx, 0).and_then(|s| parse_datetime(&s)).map(|d| part(&d))
}

fn time_part(ctx: &Context<'_>, part: impl Fn(&NaiveTime) -> i64) -> Option<i64> {
    let text = text_arg(ctx, 0)?;
    let time = parse_datetime(&text)
        .map(|d| d.time())
        .or_else(|| NaiveTime::parse_from_str(text.trim(), "%H:%M:%S").ok())?;
    Some(part(&time))
}

/// Timestamps are interpreted as UTC so `from_unixtime(unix_timestamp(x))`
/// returns `x`.
fn unix_timestamp(ctx: &Context<'_>) -> rusqlite::Result<Option<i64>> {
    if ctx.len() == 0 {
        return Ok(Some(Utc::now().timestamp()));
    }
    Ok(text_arg(ctx, 0)
        .and_then(|s| parse_datetime(&s))
        .map(|d| Utc.from_utc_datetime(&d).timestamp()))
}

fn from_unixtime(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let seconds = match ctx.get_raw(0) {
        ValueRef::Integer(n) => n,
        ValueRef::Real(x) => x as i64,
        ValueRef::Text(t) => match std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()) {
            Some(n) => n,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Utc
        .timestamp_opt(seconds, 0)
        .single()
        .map(|d| d.format(DATETIME_FORMAT).to_string()))
}

/// 1-based position of the first argument among the rest, 0 if absent.
fn field(ctx: &Context<'_>) -> rusqlite::Result<i64> {
    let Some(needle) = text_arg(ctx, 0) else {
        return Ok(0);
    };
    for i in 1..ctx.len() {
        if text_arg(ctx, i).is_some_and(|candidate| candidate == needle) {
            return Ok(i as i64);
        }
    }
    Ok(0)
}

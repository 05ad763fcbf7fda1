//! Search expressions.
//!
//! A source's `search` field is free text such as `UNSEEN SINCE 2024-01-01`.
//! It is split on whitespace and every token shaped like an ISO-8601 date is
//! turned into a real calendar date, so the IMAP query gets the server's
//! `DD-Mon-YYYY` form instead of the literal text.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const ISO_8601_DATE_FORMAT: &str = "%Y-%m-%d";

static ISO_8601_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern compiles"));

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchToken {
    Term(String),
    Date(NaiveDate),
}

impl fmt::Display for SearchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchToken::Term(t) => f.write_str(t),
            SearchToken::Date(d) => write!(
                f,
                "{:02}-{}-{:04}",
                d.day(),
                MONTHS[d.month0() as usize],
                d.year()
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("`{token}` looks like a date but is not a valid YYYY-MM-DD date")]
    InvalidDate {
        token: String,
        #[source]
        cause: chrono::ParseError,
    },

    /// IMAP search atoms and quoted strings are 7-bit only.
    #[error("`{token}` contains non-ASCII characters, which cannot be sent in an IMAP search")]
    NonAscii { token: String },
}

/// Split `expr` on whitespace, turning `YYYY-MM-DD` tokens into dates.
///
/// A token with the date shape that does not parse is an error; it is never
/// passed on as plain text.
pub fn parse_search(expr: &str) -> Result<Vec<SearchToken>, ParseError> {
    expr.split_whitespace().map(parse_token).collect()
}

fn parse_token(token: &str) -> Result<SearchToken, ParseError> {
    if !ISO_8601_DATE_PATTERN.is_match(token) {
        return Ok(SearchToken::Term(token.to_string()));
    }

    NaiveDate::parse_from_str(token, ISO_8601_DATE_FORMAT)
        .map(SearchToken::Date)
        .map_err(|cause| ParseError::InvalidDate {
            token: token.to_string(),
            cause,
        })
}

/// Render tokens as the criteria of an IMAP `SEARCH` command.
///
/// No tokens means every message. Terms outside 7-bit ASCII are refused.
pub fn to_imap_criteria(tokens: &[SearchToken]) -> Result<String, ParseError> {
    if tokens.is_empty() {
        return Ok("ALL".to_string());
    }

    let parts = tokens
        .iter()
        .map(|t| match t {
            SearchToken::Term(term) if !term.is_ascii() => Err(ParseError::NonAscii {
                token: term.clone(),
            }),
            SearchToken::Term(term) if needs_quoting(term) => Ok(quote(term)),
            other => Ok(other.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(parts.join(" "))
}

fn needs_quoting(term: &str) -> bool {
    term.chars().any(|c| {
        c.is_control() || matches!(c, '(' | ')' | '{' | ' ' | '%' | '*' | '"' | '\\' | ']')
    })
}

fn quote(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('"');
    for c in term.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

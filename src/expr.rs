//! # Numeric Expressions — CLI Input Parsing
//!
//! Parses the numeric forms accepted on the command line into
//! arbitrary-precision integers:
//!
//! - plain decimal, with `_` or `1,000,000`-style group separators,
//! - power notation `b^e`,
//! - scientific shorthand `1e9` / `10E100`,
//! - additive expressions `a + b` combining any of the above,
//!
//! and inclusive ranges in the forms `L,R`, `[L, R]`, `range[L, R]`,
//! `L..R`, and `L:R`. All failures are reported as
//! [`SieveError::Parse`] with a textual diagnostic.

use rug::ops::Pow;
use rug::Integer;

use crate::SieveError;

fn parse_err(expr: &str, why: &str) -> SieveError {
    SieveError::Parse(format!("{why}: {expr:?}"))
}

/// Normalize a decimal token: trim, drop a leading `+`, strip `_`
/// separators, and validate `1,000,000`-style grouping.
fn normalize_decimal(token: &str) -> Option<String> {
    let token = token.trim();
    let token = token.strip_prefix('+').unwrap_or(token);
    if token.is_empty() {
        return None;
    }

    if !token.contains(',') {
        let digits: String = token.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return Some(digits);
    }

    // Comma groups: first 1–3 digits, every later group exactly 3.
    let mut normalized = String::with_capacity(token.len());
    for (idx, group) in token.split(',').enumerate() {
        let valid_len = if idx == 0 {
            (1..=3).contains(&group.len())
        } else {
            group.len() == 3
        };
        if !valid_len || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        normalized.push_str(group);
    }
    Some(normalized)
}

fn parse_decimal(token: &str) -> Result<Integer, SieveError> {
    let normalized =
        normalize_decimal(token).ok_or_else(|| parse_err(token, "malformed integer"))?;
    Integer::parse(&normalized)
        .map(Integer::from)
        .map_err(|_| parse_err(token, "malformed integer"))
}

fn parse_exponent(token: &str) -> Result<u32, SieveError> {
    parse_decimal(token)?
        .to_u32()
        .ok_or_else(|| parse_err(token, "exponent too large"))
}

/// Parse a single term: decimal, `b^e`, or scientific shorthand.
fn parse_term(term: &str) -> Result<Integer, SieveError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(parse_err(term, "empty term"));
    }

    let pow_at = term.find('^');
    let sci_at = term.find(['e', 'E']);
    if pow_at.is_some() && sci_at.is_some() {
        return Err(parse_err(term, "mixed power and scientific notation"));
    }

    if let Some(at) = pow_at {
        let (base, exp) = (&term[..at], &term[at + 1..]);
        if exp.contains(['^', 'e', 'E']) {
            return Err(parse_err(term, "nested exponent"));
        }
        let base = parse_decimal(base)?;
        let exp = parse_exponent(exp)?;
        return Ok(base.pow(exp));
    }

    if let Some(at) = sci_at {
        let (mantissa, exp) = (&term[..at], &term[at + 1..]);
        if exp.contains(['^', 'e', 'E']) {
            return Err(parse_err(term, "nested exponent"));
        }
        let mantissa = parse_decimal(mantissa)?;
        let exp = parse_exponent(exp)?;
        return Ok(mantissa * Integer::from(10u32).pow(exp));
    }

    parse_decimal(term)
}

/// Parse an additive numeric expression into an arbitrary-precision value.
pub fn parse_numeric(expr: &str) -> Result<Integer, SieveError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(parse_err(expr, "empty expression"));
    }
    let mut total = Integer::new();
    for term in expr.split('+') {
        total += parse_term(term)?;
    }
    Ok(total)
}

/// Parse a numeric expression that must fit an unsigned 64-bit value.
pub fn parse_numeric_u64(expr: &str) -> Result<u64, SieveError> {
    parse_numeric(expr)?
        .to_u64()
        .ok_or_else(|| parse_err(expr, "value exceeds 64 bits"))
}

/// Parse an inclusive range expression into `(lower, upper)` bounds.
pub fn parse_range(expr: &str) -> Result<(Integer, Integer), SieveError> {
    let mut body = expr.trim();
    if let Some(stripped) = body.strip_prefix("range[") {
        body = stripped
            .strip_suffix(']')
            .ok_or_else(|| parse_err(expr, "unclosed range bracket"))?;
    } else if let Some(stripped) = body.strip_prefix('[') {
        body = stripped
            .strip_suffix(']')
            .ok_or_else(|| parse_err(expr, "unclosed bracket"))?;
    }

    let parts: Option<(&str, &str)> = if let Some(at) = body.find("..") {
        Some((&body[..at], &body[at + 2..]))
    } else if let Some(at) = body.find(':') {
        Some((&body[..at], &body[at + 1..]))
    } else {
        None
    };

    let bounds = |left: &str, right: &str| -> Result<(Integer, Integer), SieveError> {
        let lower = parse_numeric(left)?;
        let upper = parse_numeric(right)?;
        if upper < lower {
            return Err(parse_err(expr, "range bounds out of order"));
        }
        Ok((lower, upper))
    };

    if let Some((left, right)) = parts {
        return bounds(left, right);
    }

    // Comma-separated form: ambiguous against group separators, so try each
    // comma as the split point until one parses.
    for (at, _) in body.match_indices(',') {
        if let Ok(pair) = bounds(&body[..at], &body[at + 1..]) {
            return Ok(pair);
        }
    }
    Err(parse_err(expr, "unrecognized range expression"))
}

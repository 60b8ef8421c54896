// Utility helpers for codes, numbers and basic statistics.
//
// This module centralizes all the "dirty" cell handling so the rest of the
// code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static THOUSANDS_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,3}(,[0-9]{3})+(?:\.[0-9]+)?$").unwrap());
static TRAILING_DECIMAL_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\d+)$").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.\-eE+]").unwrap());

/// Canonical form of an identifier used as a join key.
///
/// Missing becomes the empty string, anything else is trimmed. Case is kept
/// as-is: codes are uppercase by convention and are never folded.
pub fn normalize_code(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Coerce a cell into a number, or `None` when it holds no usable value.
///
/// - Empty, `na`, `n/a` and `null` (any case) are missing.
/// - Wrapping single or double quotes are stripped.
/// - A trailing `%` divides the result by 100.
/// - With both `,` and `.` present, commas are thousands separators.
/// - With only commas, `1,234,567`-style groups are thousands separators;
///   otherwise the last comma is the decimal point.
/// - Spaces and currency symbols are dropped, then the longest numeric
///   prefix is parsed. Never returns NaN or infinity.
pub fn numeric_val(raw: &str) -> Option<f64> {
    let mut s = raw.trim().to_string();
    let lower = s.to_ascii_lowercase();
    if s.is_empty() || lower == "na" || lower == "n/a" || lower == "null" {
        return None;
    }

    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s = s[1..s.len() - 1].trim().to_string();
    }

    let is_pct = s.ends_with('%');
    if is_pct {
        s = s[..s.len() - 1].trim().to_string();
    }

    if s.contains(',') && s.contains('.') {
        s = s.replace(',', "");
    } else if s.contains(',') {
        let commas = s.matches(',').count();
        if commas > 1 && THOUSANDS_GROUPS.is_match(&s) {
            s = s.replace(',', "");
        } else {
            s = TRAILING_DECIMAL_COMMA.replace(&s, ".$1").into_owned();
        }
    }

    let s = WHITESPACE.replace_all(&s, "");
    let s = NON_NUMERIC.replace_all(&s, "");

    let n = parse_float_prefix(&s)?;
    if !n.is_finite() {
        return None;
    }
    Some(if is_pct { n / 100.0 } else { n })
}

/// `numeric_val` for optional cells.
pub fn numeric_opt(raw: Option<&str>) -> Option<f64> {
    numeric_val(raw?)
}

// Parse the longest leading `[+-]digits[.digits][e[+-]digits]` run, the way a
// lenient float reader stops at the first character that cannot continue it.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }
    let mut end = i;
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }
    s[..end].parse::<f64>().ok()
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.57`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Missing values render as `-`.
pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

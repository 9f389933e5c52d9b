//! Pure predicates and parsers the chain methods are built from.
//!
//! Everything here is a total function over [Value](crate::Value) or `&str`;
//! the chain layer decides what a `false` means for the request.

use std::sync::LazyLock;

use regex::Regex;

use crate::value::{format_number, Value};

/// Largest integer exactly representable in an IEEE-754 double, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Smallest safely representable integer, `-(2^53 - 1)`.
pub const MIN_SAFE_INTEGER: f64 = -9_007_199_254_740_991.0;

/// Whether `n` lies within the safe-integer range, bounds inclusive.
pub fn in_safe_range(n: f64) -> bool {
    (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&n)
}

/// Whether `n` is a finite number with no fractional part. `5.00` counts,
/// `5.0001` does not.
pub fn is_integer(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}

static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:0|[1-9][0-9]*)$").unwrap());

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:[0-9]+|\.[0-9]+|[0-9]+\.[0-9]+)$").unwrap());

static FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap()
});

static ALPHA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]*$").unwrap());

static ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]*$").unwrap());

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]*$").unwrap());

static ASCII_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\x00-\x7F]*$").unwrap());

static BASE64_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{4})$")
        .unwrap()
});

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});

static UUID_V3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9A-F]{8}-[0-9A-F]{4}-3[0-9A-F]{3}-[0-9A-F]{4}-[0-9A-F]{12}$").unwrap()
});

static UUID_V4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9A-F]{8}-[0-9A-F]{4}-4[0-9A-F]{3}-[89AB][0-9A-F]{3}-[0-9A-F]{12}$")
        .unwrap()
});

static UUID_V5_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9A-F]{8}-[0-9A-F]{4}-5[0-9A-F]{3}-[89AB][0-9A-F]{3}-[0-9A-F]{12}$")
        .unwrap()
});

static UUID_ANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}$").unwrap()
});

/// A full integer literal, no trailing garbage and no leading zeros.
///
/// Numbers qualify through their string form, so `Number(5.0)` passes and
/// `Number(5.5)` does not.
pub fn is_int_string(value: &Value) -> bool {
    match value {
        Value::String(s) => INT_RE.is_match(s),
        Value::Number(n) => INT_RE.is_match(&format_number(*n)),
        _ => false,
    }
}

/// A plain decimal numeral like `+4.55` or `-6.0001`. Use this over the
/// float check when `5e3` and `Infinity` should not slip through.
pub fn is_decimal_string(value: &Value) -> bool {
    match value {
        Value::String(s) => DECIMAL_RE.is_match(s),
        Value::Number(n) => DECIMAL_RE.is_match(&format_number(*n)),
        _ => false,
    }
}

/// Anything a float parse would fully consume, including scientific
/// notation and the literal infinities. Numbers pass unless they are NaN.
pub fn is_float_string(value: &Value) -> bool {
    match value {
        Value::Number(n) => !n.is_nan(),
        Value::String(s) => {
            let s = s.trim();
            s == "Infinity" || s == "-Infinity" || FLOAT_RE.is_match(s)
        }
        _ => false,
    }
}

/// Numeric form of a value that already passed [is_int_string](is_int_string).
pub fn parse_int(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Numeric form of a value that already passed one of the float/decimal
/// checks.
pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => {
            let s = s.trim();
            match s {
                "Infinity" => Some(f64::INFINITY),
                "-Infinity" => Some(f64::NEG_INFINITY),
                _ => s.parse::<f64>().ok(),
            }
        }
        _ => None,
    }
}

pub fn is_alpha(s: &str) -> bool {
    ALPHA_RE.is_match(s)
}

pub fn is_alphanumeric(s: &str) -> bool {
    ALPHANUMERIC_RE.is_match(s)
}

pub fn is_numeric(s: &str) -> bool {
    NUMERIC_RE.is_match(s)
}

pub fn is_ascii(s: &str) -> bool {
    ASCII_RE.is_match(s)
}

/// Standard-alphabet base64 with correct padding; the empty string passes
/// trivially.
pub fn is_base64(s: &str) -> bool {
    s.is_empty() || BASE64_RE.is_match(s)
}

/// The empty string is not an address.
pub fn is_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Three- or six-digit hex color, `#` optional.
pub fn is_hex_color(s: &str) -> bool {
    HEX_COLOR_RE.is_match(s)
}

/// RFC-4122 version selector for [is_uuid](crate::Validator::is_uuid).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UuidVersion {
    V3,
    V4,
    V5,
    /// Any version nibble, no variant-bit requirement.
    #[default]
    All,
}

impl UuidVersion {
    fn regex(self) -> &'static Regex {
        match self {
            UuidVersion::V3 => &UUID_V3_RE,
            UuidVersion::V4 => &UUID_V4_RE,
            UuidVersion::V5 => &UUID_V5_RE,
            UuidVersion::All => &UUID_ANY_RE,
        }
    }

    /// Suffix used in default error messages, empty for `All`.
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            UuidVersion::V3 => "v3",
            UuidVersion::V4 => "v4",
            UuidVersion::V5 => "v5",
            UuidVersion::All => "",
        }
    }
}

/// Case-insensitive UUID check, matching the version nibble and, for
/// v3/v4/v5, the RFC-4122 variant bits.
pub fn is_uuid(s: &str, version: UuidVersion) -> bool {
    version.regex().is_match(s)
}

//! Scalar coercion: raw scalar text to a typed [`Value`].
//!
//! Quoted scalars (any non-plain style) are strings. Plain, untagged scalars
//! are guessed in this order: null, boolean, integer, float, timestamp, and
//! finally string. A built-in tag fixes the target type and turns an
//! unparseable text into [`Error::MalformedScalar`] instead of a string.
//!
//! Integers are recognised in two phases. A lenient shape check admits digit
//! groups separated by `_` or `,`; a strict conversion then drops the
//! separators and parses. Text that passes the first phase but not the
//! second (`0x_`, `0b,`, or a value past `i64`) is returned unchanged as a
//! string rather than failing the document.

use base64::Engine as _;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::Error;
use crate::tags::{self, BuiltinTag, TagClass};
use crate::value::Value;

/// Coerce `text` under an optional raw tag.
///
/// Only built-in scalar tags are understood here; any other tag is a
/// [`Error::DisallowedTag`]. Class and custom tags are the resolver's job.
pub fn coerce(text: &str, tag: Option<&str>, quoted: bool) -> Result<Value, Error> {
    match tag {
        None => coerce_tagged(text, None, quoted),
        Some(raw) => match tags::classify(raw) {
            TagClass::Builtin(builtin) if builtin.is_scalar() => {
                coerce_tagged(text, Some(builtin), quoted)
            }
            _ => Err(Error::disallowed_tag(raw)),
        },
    }
}

/// Coerce `text` under an already classified built-in tag.
pub fn coerce_tagged(text: &str, tag: Option<BuiltinTag>, quoted: bool) -> Result<Value, Error> {
    match tag {
        Some(BuiltinTag::Str) => Ok(Value::String(text.to_owned())),
        Some(BuiltinTag::Binary) => decode_binary(text).map(Value::Binary),
        _ if quoted => Ok(Value::String(text.to_owned())),
        None => Ok(guess(text)),
        Some(BuiltinTag::Null) => {
            if is_null(text) {
                Ok(Value::Null)
            } else {
                Err(Error::malformed("!!null", text, "expected `~`, `null` or empty"))
            }
        }
        Some(BuiltinTag::Bool) => parse_bool(text)
            .map(Value::Bool)
            .ok_or_else(|| Error::malformed("!!bool", text, "not a boolean literal")),
        Some(BuiltinTag::Int) => match scan_int(text) {
            IntScan::Value(i) => Ok(Value::Int(i)),
            IntScan::Fallback => Err(Error::malformed("!!int", text, "no digits or out of range")),
            IntScan::NotInteger => Err(Error::malformed("!!int", text, "not an integer literal")),
        },
        Some(BuiltinTag::Float) => parse_float(text)
            .or_else(|| match scan_int(text) {
                IntScan::Value(i) => Some(i as f64),
                _ => None,
            })
            .map(Value::Float)
            .ok_or_else(|| Error::malformed("!!float", text, "not a floating point literal")),
        Some(BuiltinTag::Timestamp) => parse_timestamp(text)
            .ok_or_else(|| Error::malformed("!!timestamp", text, "not a date or date-time")),
        Some(collection) => Err(Error::disallowed_tag(collection.as_str())),
    }
}

/// Type guessing for plain, untagged scalars.
fn guess(text: &str) -> Value {
    if is_null(text) {
        return Value::Null;
    }
    if let Some(b) = parse_bool(text) {
        return Value::Bool(b);
    }
    match scan_int(text) {
        IntScan::Value(i) => return Value::Int(i),
        IntScan::Fallback => return Value::String(text.to_owned()),
        IntScan::NotInteger => {}
    }
    if let Some(f) = parse_float(text) {
        return Value::Float(f);
    }
    if looks_like_timestamp(text) {
        if let Some(ts) = parse_timestamp(text) {
            return ts;
        }
    }
    Value::String(text.to_owned())
}

pub(crate) fn is_null(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

/// YAML 1.1 booleans, case-insensitive. Single letters `y`/`n` stay strings.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    const TRUE: &[&str] = &["true", "yes", "on"];
    const FALSE: &[&str] = &["false", "no", "off"];
    if TRUE.iter().any(|t| text.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|f| text.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
enum IntScan {
    /// Does not have the shape of an integer at all.
    NotInteger,
    Value(i64),
    /// Integer-shaped, but strict conversion failed.
    Fallback,
}

fn is_separator(c: char) -> bool {
    c == '_' || c == ','
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else {
        (false, text.strip_prefix('+').unwrap_or(text))
    }
}

fn strip_radix_prefix<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.as_bytes().get(..prefix.len())?;
    // The prefix is ASCII, so a match leaves `prefix.len()` on a char boundary.
    head.eq_ignore_ascii_case(prefix.as_bytes())
        .then(|| &text[prefix.len()..])
}

fn scan_int(text: &str) -> IntScan {
    let (neg, rest) = split_sign(text);
    let (radix, digits) = if let Some(d) = strip_radix_prefix(rest, "0x") {
        (16, d)
    } else if let Some(d) = strip_radix_prefix(rest, "0b") {
        (2, d)
    } else if let Some(d) = strip_radix_prefix(rest, "0o") {
        (8, d)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    let lenient = if radix == 10 {
        decimal_shape(digits)
    } else {
        !digits.is_empty() && digits.chars().all(|c| is_separator(c) || c.is_digit(radix))
    };
    if !lenient {
        return IntScan::NotInteger;
    }

    match strict_int(digits, radix, neg) {
        Some(i) => IntScan::Value(i),
        None => IntScan::Fallback,
    }
}

/// `0`, or a non-zero digit followed by digits where each separator sits
/// between two digits.
fn decimal_shape(digits: &str) -> bool {
    match digits.as_bytes() {
        [b'0'] => true,
        [b'1'..=b'9', tail @ ..] => {
            let mut i = 0;
            while i < tail.len() {
                match tail[i] {
                    b'0'..=b'9' => i += 1,
                    b'_' | b',' if tail.get(i + 1).is_some_and(u8::is_ascii_digit) => i += 2,
                    _ => return false,
                }
            }
            true
        }
        _ => false,
    }
}

fn strict_int(digits: &str, radix: u32, neg: bool) -> Option<i64> {
    let mut magnitude: u128 = 0;
    let mut saw_digit = false;
    for c in digits.chars() {
        if is_separator(c) {
            continue;
        }
        let d = c.to_digit(radix)?;
        magnitude = magnitude
            .checked_mul(radix as u128)?
            .checked_add(d as u128)?;
        saw_digit = true;
    }
    if !saw_digit {
        return None;
    }
    let magnitude = i128::try_from(magnitude).ok()?;
    let signed = if neg { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

pub(crate) fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => return Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Some(f64::NAN),
        _ => {}
    }

    // Rust's own parser also takes `inf`, `NaN` and `infinity`; those words
    // must stay strings, so the shape is checked here first.
    let (_, body) = split_sign(text);
    let starts_numeric = body
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || b == b'.');
    let has_digit = body.bytes().any(|b| b.is_ascii_digit());
    let has_fraction_or_exponent = body.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'));
    let charset_ok = body.bytes().all(|b| {
        b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-' | b'_' | b',')
    });
    if !(starts_numeric && has_digit && has_fraction_or_exponent && charset_ok) {
        return None;
    }

    let cleaned: String = text.chars().filter(|c| !is_separator(*c)).collect();
    cleaned.parse::<f64>().ok()
}

fn decode_binary(text: &str) -> Result<Vec<u8>, Error> {
    // Base64 in YAML may be wrapped over several lines.
    let cleaned: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|err| Error::malformed("!!binary", text, err.to_string()))
}

fn looks_like_timestamp(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 8 && b[..4].iter().all(u8::is_ascii_digit) && b[4] == b'-'
}

/// Parse a bare date (`2002-12-14`), an ISO-8601 date-time
/// (`2001-12-14t21:59:43.10-05:00`) or a spaced one (`2001-12-14 21:59:43.10 -5`).
/// A date-time without a zone is UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<Value> {
    let split = text.find(['T', 't', ' ', '\t']);
    let (date_text, time_text) = match split {
        Some(i) => (&text[..i], Some(text[i + 1..].trim_start())),
        None => (text, None),
    };
    let date = parse_date(date_text)?;
    let Some(time_text) = time_text else {
        return Some(Value::Date(date));
    };
    let (time, offset_seconds) = parse_time_and_zone(time_text)?;
    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .map(Value::Timestamp)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.splitn(3, '-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if year.len() != 4 || month.len() > 2 || day.len() > 2 {
        return None;
    }
    if !(all_digits(year) && all_digits(month) && all_digits(day)) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Take between `min` and `max` leading ASCII digits.
fn take_digits(text: &str, min: usize, max: usize) -> Option<(u32, &str)> {
    let len = text.bytes().take_while(u8::is_ascii_digit).count().min(max);
    if len < min {
        return None;
    }
    Some((text[..len].parse().ok()?, &text[len..]))
}

fn parse_time_and_zone(text: &str) -> Option<(NaiveTime, i32)> {
    let (hour, rest) = take_digits(text, 1, 2)?;
    let (minute, rest) = take_digits(rest.strip_prefix(':')?, 2, 2)?;
    let (second, mut rest) = take_digits(rest.strip_prefix(':')?, 2, 2)?;

    let mut nanos = 0u32;
    if let Some(fraction) = rest.strip_prefix('.') {
        let len = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        // Digits past nanosecond precision are dropped.
        let kept = &fraction[..len.min(9)];
        nanos = kept.parse::<u32>().ok()? * 10u32.pow(9 - kept.len() as u32);
        rest = &fraction[len..];
    }

    let offset = parse_zone(rest.trim_start())?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some((time, offset))
}

/// Zone designator to an offset in seconds: empty or `Z` is UTC, otherwise
/// `±h`, `±hh`, `±hhmm` or `±hh:mm`.
fn parse_zone(zone: &str) -> Option<i32> {
    if matches!(zone, "" | "Z" | "z") {
        return Some(0);
    }
    let (sign, body) = if let Some(body) = zone.strip_prefix('+') {
        (1, body)
    } else {
        (-1, zone.strip_prefix('-')?)
    };
    let (hours, rest) = take_digits(body, 1, 2)?;
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    let minutes = if rest.is_empty() {
        0
    } else {
        let (minutes, tail) = take_digits(rest, 2, 2)?;
        if !tail.is_empty() {
            return None;
        }
        minutes
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours as i32 * 3600 + minutes as i32 * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn plain(text: &str) -> Value {
        coerce(text, None, false).expect("untagged plain scalars never fail")
    }

    #[test]
    fn null_and_bool_literals() {
        for text in ["", "~", "null", "Null", "NULL"] {
            assert_eq!(plain(text), Value::Null, "{text:?}");
        }
        for (text, b) in [("yes", true), ("On", true), ("TRUE", true), ("no", false), ("off", false)] {
            assert_eq!(plain(text), Value::Bool(b), "{text:?}");
        }
        assert_eq!(plain("y"), Value::from("y"));
        assert_eq!(plain("nULl"), Value::from("nULl"));
    }

    #[test]
    fn integers_in_every_radix() {
        assert_eq!(plain("42"), Value::Int(42));
        assert_eq!(plain("-17"), Value::Int(-17));
        assert_eq!(plain("+3"), Value::Int(3));
        assert_eq!(plain("0x1F"), Value::Int(31));
        assert_eq!(plain("0b1010"), Value::Int(10));
        assert_eq!(plain("0o17"), Value::Int(15));
        assert_eq!(plain("017"), Value::Int(15));
        assert_eq!(plain("1_000"), Value::Int(1000));
        assert_eq!(plain("1,000,000"), Value::Int(1_000_000));
        assert_eq!(plain("0xdead_beef"), Value::Int(0xdead_beef));
        assert_eq!(plain("-9223372036854775808"), Value::Int(i64::MIN));
    }

    #[test]
    fn grouped_literals_without_digits_fall_back_to_string() {
        assert_eq!(scan_int("0x_"), IntScan::Fallback);
        assert_eq!(plain("0x_"), Value::from("0x_"));
        assert_eq!(plain("0b,"), Value::from("0b,"));
        assert_eq!(plain("-0x__"), Value::from("-0x__"));
        assert_eq!(plain("99999999999999999999"), Value::from("99999999999999999999"));
    }

    #[test]
    fn misplaced_decimal_separators_are_not_integers() {
        assert_eq!(scan_int("1__0"), IntScan::NotInteger);
        assert_eq!(scan_int("1_"), IntScan::NotInteger);
        assert_eq!(plain("1__0"), Value::from("1__0"));
        assert_eq!(plain("08"), Value::from("08"));
    }

    #[test]
    fn floats_and_special_values() {
        assert_eq!(plain("1.5"), Value::Float(1.5));
        assert_eq!(plain("-2.5e3"), Value::Float(-2500.0));
        assert_eq!(plain("1e3"), Value::Float(1000.0));
        assert_eq!(plain(".5"), Value::Float(0.5));
        assert_eq!(plain("1_000.25"), Value::Float(1000.25));
        assert_eq!(plain(".inf"), Value::Float(f64::INFINITY));
        assert_eq!(plain("-.Inf"), Value::Float(f64::NEG_INFINITY));
        assert!(plain(".NaN").as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn float_words_stay_strings() {
        for text in ["inf", "nan", "NaN", "infinity", "-inf", "e5", "1.2.3", "."] {
            assert_eq!(plain(text), Value::from(text), "{text:?}");
        }
    }

    #[test]
    fn timestamps_in_three_forms() {
        let Value::Date(date) = plain("2002-12-14") else {
            panic!("expected a date");
        };
        assert_eq!((date.year(), date.month(), date.day()), (2002, 12, 14));

        let Value::Timestamp(iso) = plain("2001-12-14t21:59:43.10-05:00") else {
            panic!("expected a timestamp");
        };
        let Value::Timestamp(spaced) = plain("2001-12-14 21:59:43.10 -5") else {
            panic!("expected a timestamp");
        };
        assert_eq!(iso, spaced);
        assert_eq!(iso.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(iso.nanosecond(), 100_000_000);

        let Value::Timestamp(utc) = plain("2001-12-15T02:59:43.1Z") else {
            panic!("expected a timestamp");
        };
        assert_eq!(utc, iso);
    }

    #[test]
    fn date_like_garbage_is_a_string_unless_tagged() {
        assert_eq!(plain("2001-13-45"), Value::from("2001-13-45"));
        assert_eq!(plain("2001-12-14 lunch"), Value::from("2001-12-14 lunch"));
        let err = coerce("2001-13-45", Some("!!timestamp"), false).unwrap_err();
        assert!(matches!(err, Error::MalformedScalar { .. }), "{err:?}");
    }

    #[test]
    fn quoted_text_is_always_a_string() {
        assert_eq!(coerce("123", None, true).unwrap(), Value::from("123"));
        assert_eq!(coerce("123", Some("!!int"), true).unwrap(), Value::from("123"));
        assert_eq!(coerce("true", Some("!!bool"), true).unwrap(), Value::from("true"));
        assert_eq!(coerce("~", None, true).unwrap(), Value::from("~"));
    }

    #[test]
    fn tags_fix_the_target_type() {
        assert_eq!(coerce("123", Some("!!str"), false).unwrap(), Value::from("123"));
        assert_eq!(coerce("7", Some("!!float"), false).unwrap(), Value::Float(7.0));
        assert_eq!(
            coerce("0x_", Some("tag:yaml.org,2002:int"), false)
                .unwrap_err()
                .to_string(),
            "invalid !!int scalar `0x_`: no digits or out of range"
        );
        assert!(coerce("maybe", Some("!!bool"), false).is_err());
        assert!(coerce("x", Some("!!null"), false).is_err());
    }

    #[test]
    fn binary_is_base64_decoded() {
        assert_eq!(
            coerce("SGVs\nbG8h", Some("!!binary"), false).unwrap(),
            Value::Binary(b"Hello!".to_vec())
        );
        assert!(matches!(
            coerce("AQ?=", Some("!binary"), false),
            Err(Error::MalformedScalar { .. })
        ));
    }

    #[test]
    fn non_scalar_and_unknown_tags_are_rejected() {
        assert!(matches!(
            coerce("x", Some("!!map"), false),
            Err(Error::DisallowedTag { .. })
        ));
        assert!(matches!(
            coerce("x", Some("!ruby/object:Kernel"), false),
            Err(Error::DisallowedTag { .. })
        ));
    }
}

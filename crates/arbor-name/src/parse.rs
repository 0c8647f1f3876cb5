//! Low-level lexing helpers for the string representation of names.
//!
//! Separators inside quoted values or preceded by a backslash are literal.
//! Values are unescaped once at parse time and escaped again whenever a name
//! is rendered back to text.

use crate::error::NameError;

/// Characters that must always be escaped inside a value.
const SPECIAL: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '='];

/// Splits `input` on every unescaped, unquoted separator.
pub(crate) fn split_unescaped(
    input: &str,
    is_separator: impl Fn(char) -> bool,
) -> Result<Vec<&str>, NameError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut quoted = false;

    for (index, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            separator if !quoted && is_separator(separator) => {
                parts.push(input.get(start..index).unwrap_or_default());
                start = index + separator.len_utf8();
            }
            _ => {}
        }
    }

    if escaped {
        return Err(NameError::invalid_escape(input));
    }
    if quoted {
        return Err(NameError::unterminated_quote(input));
    }
    parts.push(input.get(start..).unwrap_or_default());
    Ok(parts)
}

/// Trims surrounding whitespace, keeping a trailing space that was escaped.
pub(crate) fn trim_value(raw: &str) -> &str {
    let leading = raw.trim_start();
    let trimmed = leading.trim_end();
    let backslashes = trimmed.chars().rev().take_while(|ch| *ch == '\\').count();
    if backslashes % 2 == 1 && trimmed.len() < leading.len() {
        leading.get(..=trimmed.len()).unwrap_or(trimmed)
    } else {
        trimmed
    }
}

/// Resolves quoting and backslash escapes (`\,` and `\2C` alike).
pub(crate) fn unescape_value(raw: &str) -> Result<String, NameError> {
    let body = match raw.strip_prefix('"') {
        Some(rest) => rest
            .strip_suffix('"')
            .ok_or_else(|| NameError::unterminated_quote(raw))?,
        None => raw,
    };

    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buffer = [0_u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
            continue;
        }
        let escaped = chars.next().ok_or_else(|| NameError::invalid_escape(raw))?;
        if let Some(high) = escaped.to_digit(16) {
            let low = chars
                .next()
                .and_then(|next| next.to_digit(16))
                .ok_or_else(|| NameError::invalid_escape(raw))?;
            let byte = u8::try_from(high * 16 + low).map_err(|_| NameError::invalid_escape(raw))?;
            bytes.push(byte);
        } else if SPECIAL.contains(&escaped) || escaped == ' ' || escaped == '#' {
            let mut buffer = [0_u8; 4];
            bytes.extend_from_slice(escaped.encode_utf8(&mut buffer).as_bytes());
        } else {
            return Err(NameError::invalid_escape(raw));
        }
    }

    String::from_utf8(bytes).map_err(|_| NameError::invalid_escape(raw))
}

/// Escapes a value so it can be embedded in the string form of a name.
///
/// ```
/// use arbor_name::escape_value;
///
/// assert_eq!(escape_value("Smith, John"), "Smith\\, John");
/// assert_eq!(escape_value(" padded "), "\\ padded\\ ");
/// ```
#[must_use]
pub fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (position, ch) in value.chars().enumerate() {
        let leading = position == 0 && (ch == '#' || ch == ' ');
        let trailing = position == last && ch == ' ';
        if SPECIAL.contains(&ch) || leading || trailing {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Canonical form of an attribute type: trimmed and ASCII-lowercased.
#[must_use]
pub fn normalize_attribute_type(attr_type: &str) -> String {
    attr_type.trim().to_ascii_lowercase()
}

/// Canonical form of a value under case-ignore matching.
///
/// Leading and trailing whitespace is dropped, inner runs collapse to a single
/// space and the result is lowercased.
#[must_use]
pub fn normalize_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Accepts descriptors (`cn`, `x-custom`) and numeric OIDs (`2.5.4.3`).
pub(crate) fn is_valid_attribute_type(attr_type: &str) -> bool {
    match attr_type.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => attr_type
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-'),
        Some(first) if first.is_ascii_digit() => attr_type
            .split('.')
            .all(|arc| !arc.is_empty() && arc.chars().all(|ch| ch.is_ascii_digit())),
        _ => false,
    }
}

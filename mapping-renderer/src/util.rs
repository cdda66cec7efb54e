//! The six `$util` helpers of API Gateway mapping templates.
//!
//! All of them are pure functions of their input. Inside templates they are
//! reached through [`crate::context::Util`].

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::UtilError;

/// Decoder for input whose padding has already been stripped. Any `=` left
/// over is an error; non-zero trailing bits are accepted.
const UNPADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Backslash and the control characters U+0000..U+0013. Every other
/// character, including `"` and U+0014..U+001F, is left alone.
static ESCAPE_TABLE: LazyLock<HashMap<char, String>> = LazyLock::new(|| {
    let mut table = HashMap::with_capacity(21);
    table.insert('\\', "\\\\".to_string());
    for code in 0u8..20 {
        table.insert(char::from(code), format!("\\u{code:04x}"));
    }
    table
});

/// Base64-encode a binary string: every character must be in
/// U+0000..U+00FF and stands for one byte.
pub fn base64_encode(input: &str) -> Result<String, UtilError> {
    let mut bytes = Vec::with_capacity(input.len());
    for (offset, character) in input.chars().enumerate() {
        let byte = u8::try_from(u32::from(character))
            .map_err(|_| UtilError::NonLatin1 { character, offset })?;
        bytes.push(byte);
    }
    Ok(STANDARD.encode(bytes))
}

/// Decode base64 into a binary string (one character per byte).
///
/// Forgiving decode: ASCII whitespace is skipped and padding is optional,
/// but padding that is present must complete a four-character group. So
/// `SQ` and `SQ==` decode while `SQ=` does not.
pub fn base64_decode(input: &str) -> Result<String, UtilError> {
    let mut compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.len() % 4 == 0 {
        for _ in 0..2 {
            if compact.ends_with('=') {
                compact.pop();
            }
        }
    }
    let bytes = UNPADDED.decode(compact)?;
    Ok(bytes.into_iter().map(char::from).collect())
}

/// Percent-encode the UTF-8 bytes of every character outside the
/// URI-component unreserved set. Spaces become `%20`, not `+`.
pub fn url_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Reverse [`url_encode`]. `+` is not treated as a space.
pub fn url_decode(input: &str) -> Result<String, UtilError> {
    let bytes = input.as_bytes();
    let mut offset = 0;
    while let Some(found) = bytes[offset..].iter().position(|b| *b == b'%') {
        let at = offset + found;
        let well_formed = bytes
            .get(at + 1..at + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(UtilError::MalformedPercent { offset: at });
        }
        offset = at + 3;
    }
    Ok(percent_decode_str(input).decode_utf8()?.into_owned())
}

/// Escape `input` for embedding in a double-quoted JavaScript string.
///
/// Only backslash and U+0000..U+0013 are rewritten; the latter always as
/// `\u00hh`, so a newline becomes `\u000a`. Not idempotent: escaping twice
/// doubles the backslashes.
pub fn escape_javascript(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match ESCAPE_TABLE.get(&c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Strict JSON parse. Object key order is preserved.
pub fn parse_json(input: &str) -> Result<serde_json::Value, UtilError> {
    Ok(serde_json::from_str(input)?)
}

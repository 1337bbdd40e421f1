//! W3C trace baggage parsing.
//!
//! A `baggage` header looks like `key1=value1,key2=value2;property`.
//! Member properties are dropped, malformed members are skipped, and values
//! are percent-decoded. The result is a [`CallMetadata`] so context kinds can
//! read it with the same decoders they use for call metadata.

use crate::metadata::CallMetadata;

/// Name of the HTTP header carrying trace baggage.
pub const BAGGAGE_HEADER: &str = "baggage";

/// Parses a W3C baggage header value.
#[must_use]
pub fn parse(header: &str) -> CallMetadata {
    header
        .split(',')
        .filter_map(|member| {
            let kv = member.split(';').next()?.trim();
            let (key, value) = kv.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), percent_decode(value.trim())?))
        })
        .collect()
}

/// Decodes `%XX` escapes. Returns `None` on a truncated or non-hex escape or
/// if the decoded bytes are not UTF-8.
fn percent_decode(raw: &str) -> Option<String> {
    if !raw.contains('%') {
        return Some(raw.to_string());
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

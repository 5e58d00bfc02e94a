use crate::core::error::ValidationError;
use percent_encoding::percent_decode_str;

/// Split a raw query string into percent-decoded key/value byte pairs.
///
/// Values stay as bytes since `info_hash` and `peer_id` are binary. Pairs
/// without `=` get an empty value, empty segments are skipped.
pub fn parse_query(raw: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, ValidationError> {
    let mut pairs = Vec::new();

    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }

        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        let key = url_decode(key)?;
        let value = url_decode(value)?;
        pairs.push((key, value));
    }

    Ok(pairs)
}

/// Decode URL-encoded bytes (percent-encoding, `+` as space).
///
/// `percent_decode_str` passes broken escapes through untouched, so they are
/// rejected up front.
pub fn url_decode(encoded: &str) -> Result<Vec<u8>, ValidationError> {
    if let Some(offset) = find_bad_escape(encoded.as_bytes()) {
        return Err(ValidationError::InvalidEncoding(format!(
            "bad percent-escape at offset {}",
            offset
        )));
    }

    // A literal `+` is a space; an escaped `%2B` stays a plus
    let spaced = encoded.replace('+', " ");
    Ok(percent_decode_str(&spaced).collect())
}

fn find_bad_escape(bytes: &[u8]) -> Option<usize> {
    let is_hex = |offset: usize| bytes.get(offset).is_some_and(u8::is_ascii_hexdigit);

    bytes
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'%')
        .map(|(offset, _)| offset)
        .find(|&offset| !(is_hex(offset + 1) && is_hex(offset + 2)))
}

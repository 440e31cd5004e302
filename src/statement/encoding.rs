//! Text decoding for non-PDF statement files.
//!
//! A buffer counts as text when it carries a BOM, decodes as strict UTF-8,
//! or survives a lossless round-trip through one of the legacy single-byte
//! code pages German banks still export with.

use encoding_rs::Encoding;

/// Legacy code pages probed in order after UTF-8 fails.
const LEGACY_CODE_PAGES: &[&Encoding] = &[encoding_rs::WINDOWS_1252, encoding_rs::ISO_8859_15];

/// Decode statement bytes into text lines.
///
/// Returns `None` when the buffer does not look like a text file at all;
/// that is the normal "not this format" signal for the recognizer, not an
/// error.
pub fn decode_statement_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    // BOM wins over everything else.
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            return None;
        }
        return Some(text.into_owned());
    }

    // Embedded NUL bytes mean binary data, not a code-page guess.
    if bytes.contains(&0) {
        return None;
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }

    // Last resort: a legacy code page that reproduces the input byte-for-byte.
    for encoding in LEGACY_CODE_PAGES {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            continue;
        }
        let (round_trip, _, unmappable) = encoding.encode(&text);
        if !unmappable && round_trip.as_ref() == bytes {
            return Some(text.into_owned());
        }
    }

    None
}

/// Split decoded statement text into lines, tolerating all three newline
/// conventions found in bank exports.
pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(|l| l.to_string())
        .collect()
}

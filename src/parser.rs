//! Retrieval-time body extraction
//!
//! Turns a captured message's raw text into displayable plaintext. The
//! body is scanned once, tracking the most recent transfer-encoding
//! declaration; whenever a boundary line is hit the accumulated part is
//! flushed, decoded if it was declared quoted-printable. All parts are
//! concatenated in document order: the sink shows everything that was
//! submitted, it never picks a preferred alternative.
//!
//! An encoding declaration carries over into a following part that
//! does not declare its own.

use std::sync::LazyLock;

use regex::Regex;

use crate::message::Message;
use crate::store::{MessageStore, StoreError};

static TRANSFER_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Content-Transfer-Encoding:")
        .unwrap_or_else(|e| panic!("invalid transfer-encoding pattern: {e}"))
});

/// Extract the displayable text of a captured message.
///
/// Never fails: a missing boundary or malformed headers yield whatever
/// text accumulated, possibly empty.
pub fn extract_text(message: &Message) -> String {
    // Header block ends at the first blank line; no body, no output
    let Some((_, body)) = message.data.split_once("\n\n") else {
        return String::new();
    };

    let marker = if message.boundary.is_empty() {
        None
    } else {
        Some(format!("--{}", message.boundary))
    };

    let mut out = String::new();
    let mut encoding: Option<String> = None;
    let mut seen_encoding = false;
    let mut part = String::new();

    for line in body.lines() {
        if TRANSFER_ENCODING.is_match(line) {
            seen_encoding = true;
            if let Some(token) = line.split_whitespace().nth(1) {
                encoding = Some(token.to_owned());
            }
            continue;
        }
        if !seen_encoding {
            continue;
        }
        if let Some(marker) = &marker
            && line.starts_with(marker.as_str())
        {
            flush_part(&mut out, &mut part, encoding.as_deref());
            continue;
        }
        part.push_str(line);
        part.push('\n');
    }
    flush_part(&mut out, &mut part, encoding.as_deref());
    out
}

/// Look up a message and extract its text; the composed operation the
/// read boundary exposes
pub fn retrieve(store: &MessageStore, id: &str) -> Result<String, StoreError> {
    let message = store.get(id).ok_or(StoreError::NotFound)?;
    Ok(extract_text(&message))
}

fn flush_part(out: &mut String, part: &mut String, encoding: Option<&str>) {
    if part.is_empty() {
        return;
    }
    match encoding {
        Some(enc) if enc.eq_ignore_ascii_case("quoted-printable") => {
            out.push_str(&decode_quoted_printable(part));
        }
        _ => out.push_str(part),
    }
    part.clear();
}

/// Decode quoted-printable text: `=XX` hexadecimal escapes, `=` before a
/// line break is a soft break that joins the lines. Malformed escapes
/// pass through literally so decoding never aborts a retrieval.
pub fn decode_quoted_printable(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            // Soft line break
            if bytes.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            if let (Some(hi), Some(lo)) = (hex_value(i + 1, bytes), hex_value(i + 2, bytes)) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(i: usize, bytes: &[u8]) -> Option<u8> {
    bytes.get(i).and_then(|b| (*b as char).to_digit(16)).map(|v| v as u8)
}

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use tracing::debug;

use crate::error::{EcomapError, Result};

/// Text decoded from a source file together with the encoding that produced it.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
    /// How the encoding was chosen: `bom`, `priority` or `heuristic`
    pub detection: &'static str,
}

/// Decode raw file bytes.
///
/// Order: byte-order mark, then each candidate in priority order (accepted only when it
/// decodes cleanly), then a NUL-parity check for BOM-less UTF-16.
pub fn decode_bytes(path: &Path, bytes: &[u8], candidates: &[&'static Encoding]) -> Result<DecodedText> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        debug!(encoding = encoding.name(), "byte-order mark found");
        return decode_clean(encoding, &bytes[bom_len..])
            .map(|text| DecodedText {
                text,
                encoding: encoding.name(),
                detection: "bom",
            })
            .ok_or_else(|| EcomapError::Encoding {
                path: path.to_path_buf(),
                message: format!("content does not match its {} byte-order mark", encoding.name()),
            });
    }

    for &encoding in candidates {
        if let Some(text) = decode_clean(encoding, bytes) {
            return Ok(DecodedText {
                text,
                encoding: encoding.name(),
                detection: "priority",
            });
        }
        debug!(encoding = encoding.name(), "candidate encoding rejected");
    }

    if let Some(encoding) = sniff_utf16(bytes) {
        if let Some(text) = decode_clean(encoding, bytes) {
            return Ok(DecodedText {
                text,
                encoding: encoding.name(),
                detection: "heuristic",
            });
        }
    }

    let tried: Vec<&str> = candidates.iter().map(|e| e.name()).collect();
    Err(EcomapError::Encoding {
        path: path.to_path_buf(),
        message: format!("no candidate encoding decoded cleanly (tried {})", tried.join(", ")),
    })
}

/// Strict decode: malformed sequences, replacement characters and stray control
/// characters all disqualify the candidate.
fn decode_clean(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let decoded: Cow<str> = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    if decoded.chars().any(is_disallowed) {
        return None;
    }
    Some(decoded.into_owned())
}

fn is_disallowed(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => false,
        '\u{fffd}' => true,
        c if (c as u32) < 0x20 || c == '\u{7f}' => true,
        '\u{80}'..='\u{9f}' => true,
        _ => false,
    }
}

/// ASCII-heavy UTF-16 text has a NUL in every other byte.
fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.len() < 4 || bytes.len() % 2 != 0 {
        return None;
    }
    let pairs = bytes.len() / 2;
    let even_nuls = bytes.iter().step_by(2).filter(|b| **b == 0).count();
    let odd_nuls = bytes.iter().skip(1).step_by(2).filter(|b| **b == 0).count();

    let threshold = pairs * 3 / 10;
    if odd_nuls > threshold && even_nuls <= pairs / 20 {
        Some(UTF_16LE)
    } else if even_nuls > threshold && odd_nuls <= pairs / 20 {
        Some(UTF_16BE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    fn defaults() -> Vec<&'static Encoding> {
        vec![UTF_8, WINDOWS_1252]
    }

    #[test]
    fn utf8_is_preferred_when_clean() {
        let decoded = decode_bytes(Path::new("a.csv"), "município;valor\n".as_bytes(), &defaults()).unwrap();
        assert_eq!(decoded.encoding, "UTF-8");
        assert_eq!(decoded.detection, "priority");
        assert!(decoded.text.starts_with("município"));
    }

    #[test]
    fn latin1_bytes_fall_back_to_windows_1252() {
        let (bytes, _, _) = WINDOWS_1252.encode("Município;São José\n");
        let decoded = decode_bytes(Path::new("a.csv"), &bytes, &defaults()).unwrap();
        assert_eq!(decoded.encoding, "windows-1252");
        assert!(decoded.text.contains("São José"));
    }

    #[test]
    fn bom_wins_and_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"ano,valor\n");
        let decoded = decode_bytes(Path::new("a.csv"), &bytes, &defaults()).unwrap();
        assert_eq!(decoded.detection, "bom");
        assert_eq!(decoded.text, "ano,valor\n");
    }

    #[test]
    fn bomless_utf16_is_sniffed() {
        let bytes: Vec<u8> = "ano,valor\n2021,10\n".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let decoded = decode_bytes(Path::new("a.csv"), &bytes, &defaults()).unwrap();
        assert_eq!(decoded.encoding, "UTF-16LE");
        assert_eq!(decoded.detection, "heuristic");
        assert!(decoded.text.starts_with("ano,valor"));
    }

    #[test]
    fn undecodable_bytes_fail() {
        let bytes = [0x61, 0xFF, 0xFE, 0x81, 0x00, 0x62, 0x63];
        let err = decode_bytes(Path::new("bad.csv"), &bytes, &[UTF_8]).unwrap_err();
        assert_eq!(err.kind(), "encoding_error");
    }
}

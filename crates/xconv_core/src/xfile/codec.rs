//! Shift-JIS text codec for legacy files.

use encoding_rs::SHIFT_JIS;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("character {ch:?} on line {line} cannot be written as Shift-JIS")]
    Unmappable { ch: char, line: usize },
}

/// Decode legacy file bytes.
///
/// Malformed sequences are dropped and reported once, so everything that
/// decodes can be encoded again.
pub fn decode(bytes: &[u8]) -> String {
    let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    if !had_errors {
        return text.into_owned();
    }
    log::warn!("Input contains bytes that are not valid Shift-JIS; they were dropped");
    text.chars().filter(|&ch| ch != char::REPLACEMENT_CHARACTER).collect()
}

/// Encode legacy text. Any character outside Shift-JIS is an error.
pub fn encode(text: &str) -> Result<Vec<u8>, EncodingError> {
    let (bytes, _, had_unmappable) = SHIFT_JIS.encode(text);
    if !had_unmappable {
        return Ok(bytes.into_owned());
    }

    let mut buf = [0u8; 4];
    for (i, line) in text.lines().enumerate() {
        for ch in line.chars() {
            let (_, _, unmappable) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
            if unmappable {
                return Err(EncodingError::Unmappable { ch, line: i + 1 });
            }
        }
    }
    Err(EncodingError::Unmappable { ch: '\u{fffd}', line: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let text = "Material mat {\n\t1.000000;\n}\n";
        assert_eq!(encode(text).unwrap(), text.as_bytes());
        assert_eq!(decode(text.as_bytes()), text);
    }

    #[test]
    fn test_japanese_texture_name() {
        let text = "\"\u{8eca}\u{4e21}.bmp\";";
        let bytes = encode(text).unwrap();

        assert_ne!(bytes, text.as_bytes());
        assert_eq!(decode(&bytes), text);
    }

    #[test]
    fn test_malformed_bytes_dropped() {
        let text = decode(b"{tex\xffture.bmp}\n");

        assert_eq!(text, "{texture.bmp}\n");
        assert_eq!(encode(&text).unwrap(), b"{texture.bmp}\n");
    }

    #[test]
    fn test_unmappable_reports_line() {
        let err = encode("ok\nbad \u{1f600}\n").unwrap_err();
        assert_eq!(err, EncodingError::Unmappable { ch: '\u{1f600}', line: 2 });
    }
}

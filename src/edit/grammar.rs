//! Value grammar for compound frame specifications such as
//! `description:text:language`.

use crate::common::error::{MaloneyError, Result};

const ESCAPE_CHAR: char = '\\';

/// Split `value` on `sep`.
///
/// With `escape` enabled a backslash before `sep` or before another
/// backslash makes that character literal and is itself dropped; before any
/// other character the backslash is kept. Once `maxsplit` pieces have been
/// split off, remaining separators are literal.
pub fn split(value: &str, sep: char, escape: bool, maxsplit: Option<usize>) -> Vec<String> {
    let maxsplit = maxsplit.unwrap_or(usize::MAX);

    if !escape {
        return value.splitn(maxsplit.saturating_add(1), sep).map(str::to_string).collect();
    }

    let mut result = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            if c != ESCAPE_CHAR && c != sep {
                current.push(ESCAPE_CHAR);
            }
            current.push(c);
            escaped = false;
        } else if c == ESCAPE_CHAR {
            escaped = true;
        } else if c == sep && result.len() < maxsplit {
            result.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    result.push(current);
    result
}

/// Decode backslash escape sequences in raw argument bytes.
///
/// Understands the usual single-character escapes, octal `\ooo`, hex `\xhh`
/// and line continuations. Unknown escapes are kept verbatim.
pub fn unescape_bytes(frame: &str, data: &[u8]) -> Result<Vec<u8>> {
    let invalid = |reason: String| MaloneyError::InvalidEscape {
        frame: frame.to_string(),
        reason,
    };

    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }

        let Some(&next) = data.get(i) else {
            return Err(invalid("trailing \\ in string".into()));
        };
        i += 1;
        match next {
            b'\n' => {}
            b'\\' => out.push(b'\\'),
            b'\'' => out.push(b'\''),
            b'"' => out.push(b'"'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0B),
            b'0'..=b'7' => {
                let mut value = u32::from(next - b'0');
                for _ in 0..2 {
                    match data.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            b'x' => {
                let hex = data
                    .get(i..i + 2)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(v) => {
                        out.push(v);
                        i += 2;
                    }
                    None => return Err(invalid(format!("invalid \\x escape at position {}", i - 2))),
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

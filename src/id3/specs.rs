use crate::common::error::{MaloneyError, Result};

/// Text encoding byte used in ID3v2 frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Encoding {
    Latin1 = 0,
    Utf16 = 1,
    Utf16Be = 2,
    Utf8 = 3,
}

impl Encoding {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Encoding::Latin1),
            1 => Ok(Encoding::Utf16),
            2 => Ok(Encoding::Utf16Be),
            3 => Ok(Encoding::Utf8),
            _ => Err(MaloneyError::ID3(format!("Invalid encoding byte: {}", b))),
        }
    }

    pub fn terminator_len(self) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => 1,
            Encoding::Utf16 | Encoding::Utf16Be => 2,
        }
    }
}

/// Decode text from bytes using the specified encoding.
///
/// Decoding is lenient: malformed sequences become U+FFFD, matching how
/// tag readers generally treat damaged frames.
pub fn decode_text(data: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Latin1 => encoding_rs::mem::decode_latin1(data).into_owned(),
        // `decode` sniffs the BOM and picks the matching byte order.
        Encoding::Utf16 => encoding_rs::UTF_16LE.decode(data).0.into_owned(),
        Encoding::Utf16Be => encoding_rs::UTF_16BE
            .decode_without_bom_handling(data)
            .0
            .into_owned(),
        Encoding::Utf8 => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Encode text to bytes using the specified encoding.
pub fn encode_text(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
        Encoding::Utf16 => {
            let mut result = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                result.extend_from_slice(&unit.to_le_bytes());
            }
            result
        }
        Encoding::Utf16Be => text
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect(),
        Encoding::Utf8 => text.as_bytes().to_vec(),
    }
}

/// Position of the first terminator for the given encoding.
pub fn find_terminator(data: &[u8], encoding: Encoding) -> Option<usize> {
    match encoding {
        Encoding::Latin1 | Encoding::Utf8 => memchr::memchr(0, data),
        Encoding::Utf16 | Encoding::Utf16Be => data
            .chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|i| i * 2),
    }
}

/// Read terminated text, returning `(text, bytes_consumed)`.
/// Text running to the end of the data is accepted without a terminator.
pub fn read_encoded_text(data: &[u8], encoding: Encoding) -> (String, usize) {
    match find_terminator(data, encoding) {
        Some(pos) => (
            decode_text(&data[..pos], encoding),
            pos + encoding.terminator_len(),
        ),
        None => (decode_text(data, encoding), data.len()),
    }
}

/// Split a multi-value text payload on its terminators, dropping the
/// trailing empty entry some writers leave behind.
pub fn split_values(data: &[u8], encoding: Encoding) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (text, consumed) = read_encoded_text(rest, encoding);
        values.push(text);
        rest = &rest[consumed..];
    }
    if values.last().is_some_and(|v| v.is_empty()) {
        values.pop();
    }
    values
}

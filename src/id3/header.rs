use crate::common::error::{MaloneyError, Result};

/// Size of the fixed ID3v2 header (and of the optional v2.4 footer).
pub const HEADER_LEN: usize = 10;

/// Integers stored with a configurable number of significant bits per byte.
/// ID3v2 uses 7 bits ("syncsafe") for tag sizes and v2.4 frame sizes.
pub struct BitPaddedInt;

impl BitPaddedInt {
    pub fn decode(data: &[u8], bits: u8) -> u32 {
        let mask = (1u32 << bits) - 1;
        data.iter()
            .fold(0u32, |acc, &b| (acc << bits) | (u32::from(b) & mask))
    }

    pub fn syncsafe(data: &[u8]) -> u32 {
        Self::decode(data, 7)
    }

    /// Encode `value` as a 4-byte syncsafe integer.
    pub fn encode_syncsafe(value: u32) -> [u8; 4] {
        [
            ((value >> 21) & 0x7F) as u8,
            ((value >> 14) & 0x7F) as u8,
            ((value >> 7) & 0x7F) as u8,
            (value & 0x7F) as u8,
        ]
    }
}

/// The tag version as `(major, revision)`, e.g. `(4, 0)` for ID3v2.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TagVersion(pub u8, pub u8);

impl TagVersion {
    pub const V22: TagVersion = TagVersion(2, 0);
    pub const V23: TagVersion = TagVersion(3, 0);
    pub const V24: TagVersion = TagVersion(4, 0);

    pub fn major(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for TagVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID3v2.{}.{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderFlags {
    pub unsynchronisation: bool,
    pub extended: bool,
    pub experimental: bool,
    pub footer: bool,
}

/// Parsed 10-byte ID3v2 header.
#[derive(Debug, Clone)]
pub struct TagHeader {
    pub version: TagVersion,
    pub flags: HeaderFlags,
    /// Tag size excluding the header and footer.
    pub size: u32,
}

impl TagHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN || &data[0..3] != b"ID3" {
            return Err(MaloneyError::ID3NoHeader);
        }

        let major = data[3];
        let revision = data[4];
        if !(2..=4).contains(&major) {
            return Err(MaloneyError::ID3UnsupportedVersion(format!(
                "ID3v2.{}.{}",
                major, revision
            )));
        }

        let flag_byte = data[5];
        let flags = HeaderFlags {
            unsynchronisation: flag_byte & 0x80 != 0,
            extended: flag_byte & 0x40 != 0,
            experimental: flag_byte & 0x20 != 0,
            footer: major == 4 && flag_byte & 0x10 != 0,
        };

        let size_bytes = &data[6..10];
        if size_bytes.iter().any(|&b| b & 0x80 != 0) {
            return Err(MaloneyError::ID3("header size is not syncsafe".into()));
        }

        Ok(TagHeader {
            version: TagVersion(major, revision),
            flags,
            size: BitPaddedInt::syncsafe(size_bytes),
        })
    }

    /// Full tag size including header and optional footer.
    pub fn full_size(&self) -> usize {
        let mut s = self.size as usize + HEADER_LEN;
        if self.flags.footer {
            s += HEADER_LEN;
        }
        s
    }
}

/// Some v2.4 writers (notably iTunes) store frame sizes as plain integers.
/// Walk the frames both ways and pick the interpretation that lands on more
/// frame boundaries. Returns the number of bits per size byte.
pub fn determine_bpi(data: &[u8]) -> u8 {
    fn walk(data: &[u8], bits: u8) -> u32 {
        let mut pos = 0usize;
        let mut valid = 0u32;
        while pos + HEADER_LEN <= data.len() {
            let id = &data[pos..pos + 4];
            if !id.iter().all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
                break;
            }
            let size = BitPaddedInt::decode(&data[pos + 4..pos + 8], bits) as usize;
            if size == 0 || pos + HEADER_LEN + size > data.len() {
                break;
            }
            valid += 1;
            pos += HEADER_LEN + size;
        }
        valid
    }

    if walk(data, 7) >= walk(data, 8) {
        7
    } else {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v23_header() {
        let data = [b'I', b'D', b'3', 3, 0, 0x40, 0, 0, 0x02, 0x01];
        let header = TagHeader::parse(&data).unwrap();
        assert_eq!(header.version, TagVersion::V23);
        assert!(header.flags.extended);
        assert!(!header.flags.footer);
        assert_eq!(header.size, 257);
        assert_eq!(header.full_size(), 267);
    }

    #[test]
    fn rejects_missing_and_unsupported_headers() {
        assert!(matches!(
            TagHeader::parse(b"TAG\x04\x00\x00\x00\x00\x00\x00"),
            Err(MaloneyError::ID3NoHeader)
        ));
        assert!(matches!(
            TagHeader::parse(b"ID3\x05\x00\x00\x00\x00\x00\x00"),
            Err(MaloneyError::ID3UnsupportedVersion(_))
        ));
    }

    #[test]
    fn syncsafe_encoding_is_reversible() {
        for value in [0u32, 127, 128, 1024, 0x0FFF_FFFF] {
            assert_eq!(BitPaddedInt::syncsafe(&BitPaddedInt::encode_syncsafe(value)), value);
        }
    }

    #[test]
    fn detects_plain_integer_frame_sizes() {
        // A 200-byte frame: 0xC8 is not a valid syncsafe byte, so only the
        // 8-bit reading reaches the second frame.
        let mut data = Vec::new();
        data.extend_from_slice(b"TIT2\x00\x00\x00\xC8\x00\x00");
        data.extend(std::iter::repeat(b'a').take(200));
        data.extend_from_slice(b"TALB\x00\x00\x00\x01\x00\x00x");
        assert_eq!(determine_bpi(&data), 8);
    }
}

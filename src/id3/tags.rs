use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

use crate::common::error::{MaloneyError, Result};
use crate::id3::frames::{self, convert_v22_frame_id, Frame, FrameKind, OpaqueFrame, TextFrame};
use crate::id3::header::{determine_bpi, BitPaddedInt, TagHeader, TagVersion, HEADER_LEN};
use crate::id3::specs::Encoding;
use crate::id3::unsynch;

/// v2.3 frames with no v2.4 counterpart; dropped on upgrade.
const OBSOLETE_V23_FRAMES: &[&str] = &["EQUA", "RVAD", "TRDA", "TSIZ"];

/// Ordered, mutable collection of ID3v2 frames.
///
/// Text and URL frames are keyed by id and hold a single instance; COMM,
/// TXXX and POPM frames may repeat.
#[derive(Debug, Clone)]
pub struct Id3Tag {
    frames: Vec<Frame>,
    version: TagVersion,
}

impl Default for Id3Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl Id3Tag {
    pub fn new() -> Self {
        Id3Tag {
            frames: Vec::with_capacity(16),
            version: TagVersion::V24,
        }
    }

    pub fn version(&self) -> TagVersion {
        self.version
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// All frames with the given id, in tag order.
    pub fn getall(&self, id: &str) -> Vec<&Frame> {
        self.frames.iter().filter(|f| f.frame_id() == id).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.frame_id() == id)
    }

    /// First value of a text frame.
    pub fn text(&self, id: &str) -> Option<&str> {
        match self.get(id)? {
            Frame::Text(f) => f.text.first().map(String::as_str),
            _ => None,
        }
    }

    /// Append a frame as read from a file, without any replace semantics.
    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Apply an edit. Single-instance frames replace any frame with the same
    /// id; multi-instance frames are appended. Upgrades the tag to v2.4.
    pub fn apply(&mut self, frame: Frame) {
        self.upgrade();

        let multi = FrameKind::of(frame.frame_id()).is_ok_and(FrameKind::is_multi_instance);
        if multi {
            self.frames.push(frame);
            return;
        }

        match self.frames.iter().position(|f| f.frame_id() == frame.frame_id()) {
            Some(pos) => {
                self.frames[pos] = frame;
                let id = self.frames[pos].frame_id().to_string();
                let mut seen = 0usize;
                self.frames.retain(|f| {
                    if f.frame_id() != id {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.frames.push(frame),
        }
    }

    /// Delete every frame with the given id. Returns the number removed.
    pub fn delall(&mut self, id: &str) -> usize {
        let before = self.frames.len();
        self.frames.retain(|f| f.frame_id() != id);
        before - self.frames.len()
    }

    /// Convert the frame set to ID3v2.4 and mark the tag as v2.4.
    pub fn upgrade(&mut self) {
        if self.version == TagVersion::V24 {
            return;
        }

        if self.get("TDRC").is_none() {
            if let Some(year) = self.text("TYER").map(str::to_string) {
                let mut date = year;
                if let Some(dm) = self.text("TDAT").filter(|s| is_four_digits(s)) {
                    date.push_str(&format!("-{}-{}", &dm[2..4], &dm[0..2]));
                    if let Some(hm) = self.text("TIME").filter(|s| is_four_digits(s)) {
                        date.push_str(&format!("T{}:{}", &hm[0..2], &hm[2..4]));
                    }
                }
                self.push(Frame::Text(TextFrame {
                    id: "TDRC".into(),
                    encoding: Encoding::Utf8,
                    text: vec![date],
                }));
            }
        }

        if self.get("TDOR").is_none() {
            if let Some(year) = self.text("TORY").map(str::to_string) {
                self.push(Frame::Text(TextFrame {
                    id: "TDOR".into(),
                    encoding: Encoding::Utf8,
                    text: vec![year],
                }));
            }
        }

        let has_tipl = self.get("TIPL").is_some();
        for frame in &mut self.frames {
            if let Frame::Opaque(f) = frame {
                if f.id == "IPLS" && !has_tipl {
                    f.id = "TIPL".into();
                }
            }
        }

        self.frames.retain(|f| {
            let id = f.frame_id();
            !matches!(id, "TYER" | "TDAT" | "TIME" | "TORY" | "IPLS")
                && !OBSOLETE_V23_FRAMES.contains(&id)
        });

        debug!("upgraded tag from {} to {}", self.version, TagVersion::V24);
        self.version = TagVersion::V24;
    }

    /// Parse the frames of a tag body (the bytes following the header).
    pub fn read(data: &[u8], header: &TagHeader) -> Result<Self> {
        let mut tag = Id3Tag {
            frames: Vec::new(),
            version: header.version,
        };
        let major = header.version.major();

        let unsynced;
        let mut data = data;
        if header.flags.unsynchronisation && major < 4 {
            unsynced = unsynch::decode(data);
            data = &unsynced;
        }

        let mut offset = 0usize;
        if header.flags.extended && major >= 3 {
            if data.len() < 4 {
                return Err(MaloneyError::ID3("truncated extended header".into()));
            }
            offset = if major == 4 {
                BitPaddedInt::syncsafe(&data[0..4]) as usize
            } else {
                BigEndian::read_u32(&data[0..4]) as usize + 4
            };
            if offset > data.len() {
                return Err(MaloneyError::ID3("extended header exceeds tag".into()));
            }
        }

        if major == 2 {
            tag.read_v22_frames(&data[offset..]);
        } else {
            tag.read_v23_v24_frames(&data[offset..], major);
        }
        Ok(tag)
    }

    /// Read v2.2 frames (6-byte headers), mapping ids to their v2.4 names.
    fn read_v22_frames(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 6 <= data.len() {
            let id_bytes = &data[offset..offset + 3];
            if !is_frame_id(id_bytes) {
                break;
            }
            let size = (usize::from(data[offset + 3]) << 16)
                | (usize::from(data[offset + 4]) << 8)
                | usize::from(data[offset + 5]);
            offset += 6;
            if size == 0 || offset + size > data.len() {
                break;
            }
            let body = &data[offset..offset + size];
            offset += size;

            let id = String::from_utf8_lossy(id_bytes);
            if id == "PIC" {
                if let Some(frame) = convert_v22_picture(body) {
                    self.push(frame);
                }
                continue;
            }
            match convert_v22_frame_id(&id) {
                Some(new_id) => self.push_parsed(new_id, body),
                None => debug!("dropping v2.2 frame {} without v2.4 equivalent", id),
            }
        }
    }

    /// Read v2.3/v2.4 frames (10-byte headers).
    fn read_v23_v24_frames(&mut self, data: &[u8], major: u8) {
        let bpi = if major == 4 { determine_bpi(data) } else { 8 };
        let mut offset = 0usize;

        while offset + HEADER_LEN <= data.len() {
            let id_bytes = &data[offset..offset + 4];
            if !is_frame_id(id_bytes) {
                break;
            }
            let size = BitPaddedInt::decode(&data[offset + 4..offset + 8], bpi) as usize;
            let flags = BigEndian::read_u16(&data[offset + 8..offset + 10]);
            offset += HEADER_LEN;
            if size == 0 || offset + size > data.len() {
                break;
            }
            let mut body = &data[offset..offset + size];
            offset += size;

            let id = String::from_utf8_lossy(id_bytes).into_owned();
            let (grouped, compressed, encrypted, unsynchronised, data_length) = if major == 4 {
                (
                    flags & 0x0040 != 0,
                    flags & 0x0008 != 0,
                    flags & 0x0004 != 0,
                    flags & 0x0002 != 0,
                    flags & 0x0001 != 0,
                )
            } else {
                (
                    flags & 0x0020 != 0,
                    flags & 0x0080 != 0,
                    flags & 0x0040 != 0,
                    false,
                    flags & 0x0080 != 0,
                )
            };

            if encrypted {
                debug!("dropping encrypted frame {}", id);
                continue;
            }
            // v2.4 puts the group id before the data length, v2.3 after the
            // decompressed size
            if major == 4 && grouped && !body.is_empty() {
                body = &body[1..];
            }
            if data_length && body.len() >= 4 {
                body = &body[4..];
            }
            if major == 3 && grouped && !body.is_empty() {
                body = &body[1..];
            }

            let mut owned;
            if unsynchronised {
                owned = unsynch::decode(body);
                body = &owned;
            }
            if compressed {
                match decompress_zlib(body) {
                    Ok(inflated) => {
                        owned = inflated;
                        body = &owned;
                    }
                    Err(_) => {
                        debug!("dropping frame {} with bad compressed data", id);
                        continue;
                    }
                }
            }

            self.push_parsed(&id, body);
        }
    }

    fn push_parsed(&mut self, id: &str, body: &[u8]) {
        let frame = frames::parse_frame(id, body).unwrap_or_else(|e| {
            debug!("keeping unparseable {} frame as raw data: {}", id, e);
            Frame::Opaque(OpaqueFrame {
                id: id.to_string(),
                data: body.to_vec(),
            })
        });
        self.push(frame);
    }

    /// Serialize all frames as ID3v2.4 frames (headers included).
    pub fn render(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(4096);
        for frame in &self.frames {
            let body = frame.write_data();
            data.extend_from_slice(frame.frame_id().as_bytes());
            data.extend_from_slice(&BitPaddedInt::encode_syncsafe(body.len() as u32));
            data.extend_from_slice(&[0u8; 2]);
            data.extend_from_slice(&body);
        }
        data
    }
}

fn is_four_digits(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_frame_id(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// v2.2 PIC frames carry a 3-char image format instead of a MIME type.
fn convert_v22_picture(body: &[u8]) -> Option<Frame> {
    if body.len() < 5 {
        return None;
    }
    let format = String::from_utf8_lossy(&body[1..4]).to_ascii_lowercase();
    let mime = match format.as_str() {
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{}", other),
    };
    let mut data = Vec::with_capacity(body.len() + mime.len());
    data.push(body[0]);
    data.extend_from_slice(mime.as_bytes());
    data.push(0);
    data.extend_from_slice(&body[4..]);
    Some(Frame::Opaque(OpaqueFrame {
        id: "APIC".into(),
        data,
    }))
}

fn decompress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|_| MaloneyError::ID3BadCompressedData)?;
    Ok(result)
}

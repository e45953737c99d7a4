use crate::id3::header::{BitPaddedInt, TagVersion};
use crate::id3::tags::Id3Tag;

/// Padding appended after the frames, so later edits can grow in place.
pub const DEFAULT_PADDING: usize = 1024;

/// Build a complete ID3v2.4 tag (header, frames and padding).
pub fn render_tag(tag: &Id3Tag) -> Vec<u8> {
    let frame_data = tag.render();
    let total_size = frame_data.len() + DEFAULT_PADDING;

    let mut out = Vec::with_capacity(10 + total_size);
    out.extend_from_slice(b"ID3");
    out.push(TagVersion::V24.0);
    out.push(TagVersion::V24.1);
    out.push(0);
    out.extend_from_slice(&BitPaddedInt::encode_syncsafe(total_size as u32));
    out.extend_from_slice(&frame_data);
    out.resize(out.len() + DEFAULT_PADDING, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::header::TagHeader;

    #[test]
    fn empty_tag_is_header_plus_padding() {
        let rendered = render_tag(&Id3Tag::new());
        assert_eq!(rendered.len(), 10 + DEFAULT_PADDING);
        let header = TagHeader::parse(&rendered).unwrap();
        assert_eq!(header.version, TagVersion::V24);
        assert_eq!(header.full_size(), rendered.len());
    }
}

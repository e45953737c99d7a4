/// Length of an ID3v1 trailer.
pub const ID3V1_LEN: usize = 128;

/// Offset of a trailing ID3v1 tag, if the data ends with one.
pub fn find_id3v1(data: &[u8]) -> Option<usize> {
    let offset = data.len().checked_sub(ID3V1_LEN)?;
    (&data[offset..offset + 3] == b"TAG").then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_trailer_only_at_the_end() {
        let mut data = vec![0xFFu8; 300];
        assert_eq!(find_id3v1(&data), None);
        data[172..175].copy_from_slice(b"TAG");
        assert_eq!(find_id3v1(&data), Some(172));
        assert_eq!(find_id3v1(b"TAG"), None);
    }
}

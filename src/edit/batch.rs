use crate::common::error::{MaloneyError, Result};
use crate::edit::grammar;
use crate::id3::frames::FrameKind;

/// A single `(frame id, raw value)` edit instruction as given by the user.
///
/// Values are kept as bytes until normalisation so that arguments which are
/// not valid in the preferred encoding can be reported instead of being
/// silently mangled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub frame: String,
    pub value: Vec<u8>,
}

impl Edit {
    pub fn new(frame: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Edit {
            frame: frame.into(),
            value: value.into(),
        }
    }
}

/// Normalise one raw value: empty values are skipped, escapes are decoded
/// when enabled, and the result must be valid UTF-8.
pub fn normalize_value(frame: &str, raw: &[u8], escape: bool) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let bytes = if escape {
        grammar::unescape_bytes(frame, raw)?
    } else {
        raw.to_vec()
    };

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| MaloneyError::UnencodableValue {
            frame: frame.to_string(),
            reason: format!(
                "value is not valid UTF-8 (invalid byte at position {})",
                e.utf8_error().valid_up_to()
            ),
        })
}

/// Pending edits grouped by frame id.
///
/// Ids keep the order in which they were first seen and values for one id
/// accumulate in the order they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBatch {
    entries: Vec<(String, Vec<String>)>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise and group raw edits.
    pub fn from_edits<'a, I>(edits: I, escape: bool) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Edit>,
    {
        let mut batch = EditBatch::new();
        for edit in edits {
            if let Some(value) = normalize_value(&edit.frame, &edit.value, escape)? {
                batch.push(&edit.frame, value);
            }
        }
        Ok(batch)
    }

    pub fn push(&mut self, frame: &str, value: String) {
        match self.entries.iter_mut().find(|(id, _)| id == frame) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((frame.to_string(), vec![value])),
        }
    }

    /// Reject ids outside the frame registry.
    pub fn validate(&self) -> Result<()> {
        for (id, _) in &self.entries {
            FrameKind::of(id)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(id, values)| (id.as_str(), values.as_slice()))
    }

    pub fn get(&self, frame: &str) -> Option<&[String]> {
        self.iter().find(|(id, _)| *id == frame).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_values_per_frame_in_order() {
        let edits = vec![
            Edit::new("TCON", "Book"),
            Edit::new("TIT2", "Der Fall"),
            Edit::new("TCON", ""),
            Edit::new("TCON", "Krimi"),
        ];
        let batch = EditBatch::from_edits(&edits, false).unwrap();

        let ids: Vec<&str> = batch.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["TCON", "TIT2"]);
        assert_eq!(batch.get("TCON").unwrap(), ["Book", "Krimi"]);
    }

    #[test]
    fn escapes_are_decoded_only_when_enabled() {
        let edits = vec![Edit::new("TIT2", r"a\tb")];
        let raw = EditBatch::from_edits(&edits, false).unwrap();
        let decoded = EditBatch::from_edits(&edits, true).unwrap();
        assert_eq!(raw.get("TIT2").unwrap(), [r"a\tb"]);
        assert_eq!(decoded.get("TIT2").unwrap(), ["a\tb"]);
    }

    #[test]
    fn undecodable_bytes_are_reported() {
        let edits = vec![Edit::new("TIT2", b"caf\xE9".to_vec())];
        assert!(matches!(
            EditBatch::from_edits(&edits, false),
            Err(MaloneyError::UnencodableValue { frame, .. }) if frame == "TIT2"
        ));
    }

    #[test]
    fn validate_rejects_unknown_ids() {
        let mut batch = EditBatch::new();
        batch.push("TIT2", "ok".into());
        assert!(batch.validate().is_ok());
        batch.push("NOPE", "x".into());
        assert!(matches!(batch.validate(), Err(MaloneyError::UnknownFrameId(_))));
    }
}

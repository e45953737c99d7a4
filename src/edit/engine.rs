use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::common::error::{MaloneyError, Result};
use crate::edit::batch::{Edit, EditBatch};
use crate::edit::grammar;
use crate::id3::frames::{
    CommentFrame, Frame, FrameKind, PopularimeterFrame, TextFrame, UrlFrame, UserTextFrame,
};
use crate::id3::specs::Encoding;
use crate::id3::{self, TaggedFile};

const DEFAULT_COMMENT_LANG: &str = "eng";

/// Options shared by every file of an edit run.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditOptions {
    /// Interpret backslash escapes in values and in the `:` separators.
    pub escape: bool,
}

/// Outcome of a batch over several files.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn record_failure(&mut self, path: &Path, err: &MaloneyError) {
        error!("{}: {}", path.display(), err);
        self.failed.push((path.to_path_buf(), err.to_string()));
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn parse_number<T: std::str::FromStr>(frame: &str, field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MaloneyError::malformed(frame, format!("{} {:?} is not a valid number", field, value)))
}

fn build_popularimeter(value: &str, escape: bool) -> Result<Frame> {
    let fields = grammar::split(value, ':', escape, None);
    let (email, rating, count): (String, u8, u64) = match fields.as_slice() {
        [email] => (email.clone(), 0, 0),
        [email, rating] => (email.clone(), parse_number("POPM", "rating", rating)?, 0),
        [email, rating, count] => (
            email.clone(),
            parse_number("POPM", "rating", rating)?,
            parse_number("POPM", "count", count)?,
        ),
        _ => {
            return Err(MaloneyError::malformed(
                "POPM",
                format!("expected email:rating:count, got {} fields", fields.len()),
            ))
        }
    };
    Ok(Frame::Popularimeter(PopularimeterFrame {
        email,
        rating,
        count,
    }))
}

fn build_comment(value: &str, escape: bool) -> Result<Frame> {
    let mut fields = grammar::split(value, ':', escape, None);
    let (desc, text, lang) = match fields.len() {
        1 => (String::new(), fields.remove(0), DEFAULT_COMMENT_LANG.to_string()),
        2 => {
            let text = fields.remove(1);
            (fields.remove(0), text, DEFAULT_COMMENT_LANG.to_string())
        }
        _ => {
            // desc:text:lang, where the text itself may contain separators
            let lang = fields.pop().unwrap_or_default();
            let desc = fields.remove(0);
            (desc, fields.join(":"), lang)
        }
    };

    if lang.len() != 3 || !lang.is_ascii() {
        return Err(MaloneyError::malformed(
            "COMM",
            format!("language {:?} is not a 3-letter code", lang),
        ));
    }

    Ok(Frame::Comment(CommentFrame {
        encoding: Encoding::Utf8,
        lang,
        desc,
        text,
    }))
}

fn build_user_text(value: &str, escape: bool) -> Frame {
    let mut fields = grammar::split(value, ':', escape, Some(1));
    let text = fields.pop().unwrap_or_default();
    let desc = fields.pop().unwrap_or_default();
    Frame::UserText(UserTextFrame {
        encoding: Encoding::Utf8,
        desc,
        text: vec![text],
    })
}

/// Build the frames for one batch entry.
///
/// POPM, COMM and TXXX yield one frame per value; text and URL frames yield
/// a single frame carrying every value.
pub fn build_frames(id: &str, values: &[String], escape: bool) -> Result<Vec<Frame>> {
    match FrameKind::of(id)? {
        FrameKind::Popularimeter => values
            .iter()
            .map(|v| build_popularimeter(v, escape))
            .collect(),
        FrameKind::Comment => values.iter().map(|v| build_comment(v, escape)).collect(),
        FrameKind::UserText => Ok(values.iter().map(|v| build_user_text(v, escape)).collect()),
        FrameKind::Url => Ok(vec![Frame::Url(UrlFrame {
            id: id.to_string(),
            url: values.join("/"),
        })]),
        FrameKind::Text => Ok(vec![Frame::Text(TextFrame {
            id: id.to_string(),
            encoding: Encoding::Utf8,
            text: values.to_vec(),
        })]),
    }
}

/// Build every frame of a batch. Fails on the first malformed value.
pub fn build_batch_frames(batch: &EditBatch, escape: bool) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for (id, values) in batch.iter() {
        frames.extend(build_frames(id, values, escape)?);
    }
    Ok(frames)
}

/// Load one file, remove `deletes`, apply `frames` and save.
pub fn edit_file(path: &Path, deletes: &[String], frames: Vec<Frame>) -> Result<()> {
    let mut file = TaggedFile::load(path)?;
    for id in deletes {
        file.tag_mut().delall(id);
    }
    for frame in frames {
        file.tag_mut().apply(frame);
    }
    file.save()
}

/// Apply raw edits to every file.
///
/// Usage errors (unknown frame id, broken escape, undecodable value) abort
/// before any file is touched. Per-file failures are logged and the
/// remaining files are still processed.
pub fn apply_edits(edits: &[Edit], files: &[PathBuf], options: EditOptions) -> Result<BatchReport> {
    let batch = EditBatch::from_edits(edits, options.escape)?;
    batch.validate()?;

    let mut report = BatchReport::default();
    for path in files {
        info!("Writing {}", path.display());
        let result = build_batch_frames(&batch, options.escape)
            .and_then(|frames| edit_file(path, &[], frames));
        match result {
            Ok(()) => report.processed.push(path.clone()),
            Err(e) => report.record_failure(path, &e),
        }
    }
    Ok(report)
}

/// Delete every instance of the given frame ids. Files without a tag are
/// skipped.
pub fn delete_frames(ids: &[String], files: &[PathBuf]) -> BatchReport {
    let mut report = BatchReport::default();
    for path in files {
        info!("deleting {} from {}", ids.join(","), path.display());
        match TaggedFile::read_existing(path) {
            Ok(None) => {
                info!("No ID3 header found; skipping.");
                report.skipped.push(path.clone());
            }
            Ok(Some(_)) => match edit_file(path, ids, Vec::new()) {
                Ok(()) => report.processed.push(path.clone()),
                Err(e) => report.record_failure(path, &e),
            },
            Err(e) => report.record_failure(path, &e),
        }
    }
    report
}

/// Strip whole tags. No version upgrade happens here.
pub fn delete_tags(files: &[PathBuf], v1: bool, v2: bool) -> BatchReport {
    let mut report = BatchReport::default();
    for path in files {
        info!("deleting ID3 tag info in {}", path.display());
        match id3::delete_tags(path, v1, v2) {
            Ok(true) => report.processed.push(path.clone()),
            Ok(false) => report.skipped.push(path.clone()),
            Err(e) => report.record_failure(path, &e),
        }
    }
    report
}

/// Rewrite each file's tag as ID3v2.4 without changing any values.
pub fn convert(files: &[PathBuf]) -> BatchReport {
    let mut report = BatchReport::default();
    for path in files {
        info!("Converting {}", path.display());
        match edit_file(path, &[], Vec::new()) {
            Ok(()) => report.processed.push(path.clone()),
            Err(e) => report.record_failure(path, &e),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(id: &str, value: &str) -> Frame {
        build_frames(id, &[value.to_string()], false)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn popularimeter_fields_default_to_zero() {
        assert_eq!(
            one("POPM", "foo@bar:128:3"),
            Frame::Popularimeter(PopularimeterFrame {
                email: "foo@bar".into(),
                rating: 128,
                count: 3,
            })
        );
        assert_eq!(
            one("POPM", "foo@bar"),
            Frame::Popularimeter(PopularimeterFrame {
                email: "foo@bar".into(),
                rating: 0,
                count: 0,
            })
        );
    }

    #[test]
    fn popularimeter_rejects_bad_numbers() {
        for bad in ["foo@bar:high", "foo@bar:1:many", "foo@bar:256", "a:1:2:3"] {
            assert!(
                matches!(
                    build_frames("POPM", &[bad.to_string()], false),
                    Err(MaloneyError::MalformedFrameValue { .. })
                ),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn comment_field_layouts() {
        let comment = |desc: &str, text: &str, lang: &str| {
            Frame::Comment(CommentFrame {
                encoding: Encoding::Utf8,
                lang: lang.into(),
                desc: desc.into(),
                text: text.into(),
            })
        };
        assert_eq!(one("COMM", "desc:text:eng"), comment("desc", "text", "eng"));
        assert_eq!(one("COMM", "onlytext"), comment("", "onlytext", "eng"));
        assert_eq!(one("COMM", "desc:text"), comment("desc", "text", "eng"));
        assert_eq!(
            one("COMM", ":Maloney: 12:30 Uhr:deu"),
            comment("", "Maloney: 12:30 Uhr", "deu")
        );
        assert!(build_frames("COMM", &["d:t:english".to_string()], false).is_err());
    }

    #[test]
    fn escaped_separator_stays_in_comment_text() {
        let frames = build_frames("COMM", &[r"a\:b:c".to_string()], true).unwrap();
        assert!(matches!(&frames[0], Frame::Comment(c) if c.desc == "a:b" && c.text == "c"));
    }

    #[test]
    fn user_text_splits_once() {
        assert_eq!(
            one("TXXX", "source:srf:audio"),
            Frame::UserText(UserTextFrame {
                encoding: Encoding::Utf8,
                desc: "source".into(),
                text: vec!["srf:audio".into()],
            })
        );
        assert!(matches!(one("TXXX", "plain"), Frame::UserText(f) if f.desc.is_empty()));
    }

    #[test]
    fn text_and_url_frames_carry_all_values() {
        let frames = build_frames("TCON", &["Book".into(), "Krimi".into()], false).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pprint(), "Book/Krimi");

        let frames = build_frames("COMM", &["a".into(), "b".into()], false).unwrap();
        assert_eq!(frames.len(), 2);

        let url = one("WOAR", "https://www.srf.ch/audio/maloney");
        assert!(matches!(url, Frame::Url(u) if u.url == "https://www.srf.ch/audio/maloney"));
    }
}

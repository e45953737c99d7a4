pub mod frames;
pub mod header;
pub mod id3v1;
pub mod specs;
pub mod tags;
pub mod unsynch;
pub mod writer;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::error::{MaloneyError, Result};
use crate::common::util;
use crate::id3::header::{TagHeader, HEADER_LEN};
use crate::id3::tags::Id3Tag;

/// Parse the ID3v2 tag at the start of `data`.
///
/// Returns `Ok(None)` when there is no tag, and the tag plus the number of
/// bytes it occupies otherwise.
pub fn parse_tag(data: &[u8]) -> Result<Option<(Id3Tag, usize)>> {
    let header = match TagHeader::parse(data) {
        Ok(h) => h,
        Err(MaloneyError::ID3NoHeader) => return Ok(None),
        Err(e) => return Err(e),
    };

    let full_size = header.full_size();
    if full_size > data.len() {
        return Err(MaloneyError::ID3(format!(
            "tag size {} exceeds file size {}",
            full_size,
            data.len()
        )));
    }

    let body = &data[HEADER_LEN..HEADER_LEN + header.size as usize];
    let tag = Id3Tag::read(body, &header)?;
    Ok(Some((tag, full_size)))
}

/// Length of the ID3v2 region at the start of `data`, 0 when absent.
fn tag_region_len(data: &[u8]) -> usize {
    TagHeader::parse(data)
        .map(|h| h.full_size().min(data.len()))
        .unwrap_or(0)
}

/// A media file together with its (possibly empty) ID3v2 tag.
#[derive(Debug)]
pub struct TaggedFile {
    path: PathBuf,
    tag: Id3Tag,
}

impl TaggedFile {
    /// Read the tag of `path`. A file without a tag yields an empty v2.4 tag.
    pub fn load(path: &Path) -> Result<Self> {
        let data = util::read_all(path)?;
        let tag = match parse_tag(&data) {
            Ok(Some((tag, _))) => tag,
            Ok(None) => {
                info!("No ID3 header found in {}; creating a new tag", path.display());
                Id3Tag::new()
            }
            Err(e) => {
                return Err(MaloneyError::TagRead {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };
        debug!("loaded {} frames ({}) from {}", tag.len(), tag.version(), path.display());
        Ok(TaggedFile {
            path: path.to_path_buf(),
            tag,
        })
    }

    /// Read the tag of `path` only if it has one.
    pub fn read_existing(path: &Path) -> Result<Option<Id3Tag>> {
        let data = util::read_all(path)?;
        parse_tag(&data)
            .map(|found| found.map(|(tag, _)| tag))
            .map_err(|e| MaloneyError::TagRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tag(&self) -> &Id3Tag {
        &self.tag
    }

    pub fn tag_mut(&mut self) -> &mut Id3Tag {
        &mut self.tag
    }

    /// Write the tag back as ID3v2.4, replacing any previous tag region.
    ///
    /// The new file is assembled in memory and swapped in atomically.
    pub fn save(&mut self) -> Result<()> {
        self.tag.upgrade();
        let rendered = writer::render_tag(&self.tag);

        let existing = util::read_all(&self.path)?;
        let audio = &existing[tag_region_len(&existing)..];
        util::replace_atomically(&self.path, &[&rendered, audio])?;

        debug!("wrote {} byte tag to {}", rendered.len(), self.path.display());
        Ok(())
    }
}

/// Remove the ID3v2 tag (`v2`) and/or the ID3v1 trailer (`v1`) from a file.
/// Returns whether anything was removed.
pub fn delete_tags(path: &Path, v1: bool, v2: bool) -> Result<bool> {
    let data = util::read_all(path)?;
    let start = if v2 { tag_region_len(&data) } else { 0 };
    let end = if v1 {
        id3v1::find_id3v1(&data)
            .filter(|&offset| offset >= start)
            .unwrap_or(data.len())
    } else {
        data.len()
    };

    if start == 0 && end == data.len() {
        return Ok(false);
    }
    util::replace_atomically(path, &[&data[start..end]])?;
    Ok(true)
}

//! Matching a lookup key to a catalog record.
//!
//! The strategies are tried in a fixed order and the first hit wins:
//! remote id, episode number, title, alternative title and, for media files,
//! the episode number derived from the file's embedded track number.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::error::{MaloneyError, Result};
use crate::common::util;
use crate::episode::catalog::{CatalogPatch, EpisodeCatalog, EpisodeRecord};
use crate::id3::TaggedFile;

/// The strategy that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    RemoteId,
    EpisodeNumber,
    Title,
    AlternativeTitle,
    TrackNumber,
}

/// Values fetched from the broadcaster alongside a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFields {
    pub uid: String,
    pub lead: String,
}

/// What to look up.
#[derive(Debug, Clone)]
pub struct Lookup {
    key: String,
    remote: Option<RemoteFields>,
    media: Option<PathBuf>,
}

impl Lookup {
    pub fn new(key: impl Into<String>) -> Self {
        Lookup {
            key: key.into(),
            remote: None,
            media: None,
        }
    }

    /// Lookup keyed by the NFKD-normalised file stem, with the track-number
    /// fallback enabled.
    pub fn for_file(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| util::nfkd(&s.to_string_lossy()))
            .unwrap_or_default();
        Lookup::new(stem).with_media(path)
    }

    pub fn with_media(mut self, path: &Path) -> Self {
        self.media = Some(path.to_path_buf());
        self
    }

    pub fn with_remote(mut self, remote: RemoteFields) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    /// The matched record with any fresh remote values already applied.
    pub record: EpisodeRecord,
    pub step: MatchStep,
    /// Backfill for the catalog; only present for remote lookups.
    pub patch: Option<CatalogPatch>,
}

pub struct Resolver<'a> {
    catalog: &'a EpisodeCatalog,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a EpisodeCatalog) -> Self {
        Resolver { catalog }
    }

    /// Run the fallback chain. Exhausting it yields `UnresolvedMetadata`.
    pub fn resolve(&self, lookup: &Lookup) -> Result<Resolution> {
        let key = lookup.key();
        let uid = lookup.remote.as_ref().map(|r| r.uid.as_str());

        // an empty key would match records with empty fields
        let keyed = !key.is_empty();

        let found = self
            .catalog
            .find(|r| {
                r.remote_id
                    .as_deref()
                    .is_some_and(|id| (keyed && id == key) || Some(id) == uid)
            })
            .map(|m| (m, MatchStep::RemoteId))
            .or_else(|| {
                self.catalog
                    .find(|r| keyed && r.episode_number == key)
                    .map(|m| (m, MatchStep::EpisodeNumber))
            })
            .or_else(|| {
                self.catalog
                    .find(|r| keyed && r.title == key)
                    .map(|m| (m, MatchStep::Title))
            })
            .or_else(|| {
                self.catalog
                    .find(|r| keyed && r.has_alternative_title(key))
                    .map(|m| (m, MatchStep::AlternativeTitle))
            })
            .or_else(|| {
                let track = lookup.media.as_deref().and_then(track_key)?;
                debug!("falling back to embedded track number {}", track);
                self.catalog
                    .find(|r| r.episode_number == track)
                    .map(|m| (m, MatchStep::TrackNumber))
            });

        let ((index, record), step) =
            found.ok_or_else(|| MaloneyError::UnresolvedMetadata(key.to_string()))?;
        debug!("{:?} matched episode {:?} via {:?}", key, record.episode_number, step);

        let mut record = record.clone();
        let patch = lookup.remote.as_ref().map(|remote| {
            record.lead = Some(remote.lead.clone());
            record.remote_id = Some(remote.uid.clone());
            CatalogPatch {
                index,
                lead: Some(remote.lead.clone()),
                remote_id: Some(remote.uid.clone()),
            }
        });

        Ok(Resolution {
            index,
            record,
            step,
            patch,
        })
    }
}

/// Episode key derived from a file's TRCK frame: the track number without
/// any `/total` suffix, zero-padded to three digits.
fn track_key(path: &Path) -> Option<String> {
    let tag = match TaggedFile::read_existing(path) {
        Ok(Some(tag)) => tag,
        Ok(None) => return None,
        Err(e) => {
            warn!("{}", e);
            return None;
        }
    };
    let track = tag.text("TRCK")?;
    let number = track.split('/').next().unwrap_or_default().trim();
    if number.is_empty() {
        return None;
    }
    Some(format!("{:0>3}", number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::frames::{Frame, TextFrame};
    use crate::id3::specs::Encoding;

    fn record(title: &str, episode: &str, uid: Option<&str>) -> EpisodeRecord {
        EpisodeRecord {
            title: title.into(),
            alternative_titles: Vec::new(),
            episode_number: episode.into(),
            date: "2020-05-01".into(),
            lead: None,
            remote_id: uid.map(str::to_string),
        }
    }

    fn catalog() -> EpisodeCatalog {
        let mut alt = record("Die Erbschaft", "101", None);
        alt.alternative_titles = vec!["Das Erbe".into()];
        EpisodeCatalog::new(vec![
            record("Der Fall", "042", None),
            record("007", "200", None),
            record("Die Agentin", "007", Some("urn:srf:audio:1")),
            alt,
        ])
    }

    #[test]
    fn earlier_steps_take_precedence() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog);

        // "007" is both a title and an episode number; the number wins.
        let by_number = resolver.resolve(&Lookup::new("007")).unwrap();
        assert_eq!(by_number.step, MatchStep::EpisodeNumber);
        assert_eq!(by_number.record.title, "Die Agentin");

        let by_uid = resolver.resolve(&Lookup::new("urn:srf:audio:1")).unwrap();
        assert_eq!(by_uid.step, MatchStep::RemoteId);
        assert_eq!(by_uid.index, 2);
    }

    #[test]
    fn remote_id_beats_episode_number() {
        let catalog = EpisodeCatalog::new(vec![
            record("Eins", "300", None),
            record("Zwei", "301", Some("300")),
        ]);
        let resolution = Resolver::new(&catalog).resolve(&Lookup::new("300")).unwrap();
        assert_eq!(resolution.step, MatchStep::RemoteId);
        assert_eq!(resolution.record.title, "Zwei");
    }

    #[test]
    fn titles_and_alternative_titles() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog);
        assert_eq!(resolver.resolve(&Lookup::new("Der Fall")).unwrap().step, MatchStep::Title);
        let alt = resolver.resolve(&Lookup::new("Das Erbe")).unwrap();
        assert_eq!(alt.step, MatchStep::AlternativeTitle);
        assert_eq!(alt.record.episode_number, "101");
    }

    #[test]
    fn unresolved_key_is_reported() {
        let catalog = catalog();
        let err = Resolver::new(&catalog).resolve(&Lookup::new("Unbekannt")).unwrap_err();
        assert!(matches!(err, MaloneyError::UnresolvedMetadata(k) if k == "Unbekannt"));
    }

    #[test]
    fn empty_key_does_not_match_empty_fields() {
        let mut blank = record("", "", None);
        blank.alternative_titles = vec![String::new()];
        let mut records = catalog().records().to_vec();
        records.push(blank);
        let catalog = EpisodeCatalog::new(records);
        let resolver = Resolver::new(&catalog);
        assert!(matches!(
            resolver.resolve(&Lookup::new("")),
            Err(MaloneyError::UnresolvedMetadata(_))
        ));

        let lookup = Lookup::new("").with_remote(RemoteFields {
            uid: "urn:srf:audio:1".into(),
            lead: String::new(),
        });
        assert_eq!(resolver.resolve(&lookup).unwrap().step, MatchStep::RemoteId);
    }

    #[test]
    fn remote_lookup_carries_patch() {
        let catalog = catalog();
        let lookup = Lookup::new("Das Erbe").with_remote(RemoteFields {
            uid: "urn:srf:audio:9".into(),
            lead: "Maloney erbt".into(),
        });
        let resolution = Resolver::new(&catalog).resolve(&lookup).unwrap();
        assert_eq!(resolution.record.lead(), Some("Maloney erbt"));
        assert_eq!(
            resolution.patch,
            Some(CatalogPatch {
                index: 3,
                lead: Some("Maloney erbt".into()),
                remote_id: Some("urn:srf:audio:9".into()),
            })
        );
        // the catalog itself is untouched until the caller applies the patch
        assert_eq!(catalog.get(3).unwrap().lead, None);

        let plain = Resolver::new(&catalog).resolve(&Lookup::new("Das Erbe")).unwrap();
        assert_eq!(plain.patch, None);
    }

    #[test]
    fn falls_back_to_embedded_track_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unrelated name.mp3");
        std::fs::write(&path, b"\xFF\xFB\x90\x00").unwrap();

        let catalog = catalog();
        let resolver = Resolver::new(&catalog);

        // no tag at all: unresolved
        assert!(resolver.resolve(&Lookup::for_file(&path)).is_err());

        let mut file = TaggedFile::load(&path).unwrap();
        file.tag_mut().apply(Frame::Text(TextFrame {
            id: "TRCK".into(),
            encoding: Encoding::Utf8,
            text: vec!["42/120".into()],
        }));
        file.save().unwrap();

        let resolution = resolver.resolve(&Lookup::for_file(&path)).unwrap();
        assert_eq!(resolution.step, MatchStep::TrackNumber);
        assert_eq!(resolution.record.episode_number, "042");
    }
}

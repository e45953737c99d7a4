//! End-to-end flows: tagging a freshly downloaded episode and re-tagging or
//! renaming files that are already in the collection.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::common::error::{MaloneyError, Result};
use crate::edit::engine::{self, BatchReport};
use crate::edit::EditBatch;
use crate::episode::{
    EpisodeCatalog, EpisodeRecord, Lookup, ProgramProfile, RemoteEpisode, RemoteFields, Resolver,
};

/// What `import_download` did with the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Moved to and tagged at this path.
    Tagged(PathBuf),
    /// A file with the canonical name already exists; the input was left alone.
    AlreadyPresent(PathBuf),
}

/// Replace the file's comments and write the tags describing `record`.
pub fn retag_episode(path: &Path, record: &EpisodeRecord, profile: &ProgramProfile) -> Result<()> {
    info!("Adding ID3 tags to {}", path.display());
    let edits = profile.render_edits(record);
    let batch = EditBatch::from_edits(&edits, false)?;
    let frames = engine::build_batch_frames(&batch, false)?;
    engine::edit_file(path, &["COMM".to_string()], frames)
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // different filesystem
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}

/// Tag and file a freshly downloaded episode.
///
/// The remote title (and uid, when known) is looked up in the catalog. A hit
/// backfills the catalog record and supplies number and date; a miss falls
/// back to the remote values with the placeholder episode number.
pub fn import_download(
    file: &Path,
    remote: &RemoteEpisode,
    uid: Option<&str>,
    catalog: &mut EpisodeCatalog,
    profile: &ProgramProfile,
    out_dir: &Path,
) -> Result<ImportOutcome> {
    let uid = uid.map(str::to_string).or_else(|| remote.uid.clone());

    let mut lookup = Lookup::new(remote.title.as_str());
    if let Some(uid) = &uid {
        lookup = lookup.with_remote(RemoteFields {
            uid: uid.clone(),
            lead: remote.lead.clone(),
        });
    }

    let resolved = Resolver::new(catalog).resolve(&lookup);
    let record = match resolved {
        Ok(resolution) => {
            if let Some(patch) = &resolution.patch {
                catalog.apply_patch(patch);
            }
            resolution.record
        }
        Err(MaloneyError::UnresolvedMetadata(_)) => {
            if !catalog.is_empty() {
                warn!("Could not find episode information for: {}", remote.title);
            }
            let mut record = remote.to_record();
            record.remote_id = uid;
            record
        }
        Err(e) => return Err(e),
    };

    let target = out_dir.join(profile.canonical_filename(&record));
    if target.exists() {
        info!(
            "Episode \"{} ({})\" already exists: {}",
            record.title,
            record.date,
            target.display()
        );
        return Ok(ImportOutcome::AlreadyPresent(target));
    }

    move_file(file, &target)?;
    retag_episode(&target, &record, profile)?;
    Ok(ImportOutcome::Tagged(target))
}

fn rename_one(path: &Path, catalog: &EpisodeCatalog, profile: &ProgramProfile) -> Result<PathBuf> {
    let resolution = Resolver::new(catalog).resolve(&Lookup::for_file(path))?;
    let name = profile.canonical_filename(&resolution.record);
    let target = path.with_file_name(name);
    if target != path {
        info!("Renaming {} to {}", path.display(), target.display());
        fs::rename(path, &target)?;
    }
    retag_episode(&target, &resolution.record, profile)?;
    Ok(target)
}

/// Rename each `.mp3` file to its canonical name and re-tag it from the
/// catalog. Files that cannot be matched are reported and left alone.
pub fn rename_files(files: &[PathBuf], catalog: &EpisodeCatalog, profile: &ProgramProfile) -> BatchReport {
    let mut report = BatchReport::default();
    for path in files {
        if !path.is_file() {
            warn!("{}: not a file", path.display());
            report.skipped.push(path.clone());
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
            warn!("Can only rename .mp3: {}", path.display());
            report.skipped.push(path.clone());
            continue;
        }

        match rename_one(path, catalog, profile) {
            Ok(target) => report.processed.push(target),
            Err(MaloneyError::UnresolvedMetadata(key)) => {
                warn!("{}: no episode information for {:?}", path.display(), key);
                report.skipped.push(path.clone());
            }
            Err(e) => report.record_failure(path, &e),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::frames::Frame;
    use crate::id3::TaggedFile;

    const AUDIO: &[u8] = b"\xFF\xFB\x90\x00audio";

    fn catalog() -> EpisodeCatalog {
        EpisodeCatalog::from_json_str(
            r#"[{"title": "Der Fall", "episode": "042", "date": "2020-05-01",
                 "lead": "Maloney ermittelt"}]"#,
        )
        .unwrap()
    }

    fn remote(title: &str) -> RemoteEpisode {
        RemoteEpisode {
            uid: Some("urn:srf:audio:1".into()),
            title: title.into(),
            lead: "Neuer Lead".into(),
            date: "2020-05-03".into(),
            published_date: None,
            https_url: None,
        }
    }

    #[test]
    fn import_matches_catalog_and_backfills() {
        let dir = tempfile::tempdir().unwrap();
        let download = dir.path().join("download.mp3");
        fs::write(&download, AUDIO).unwrap();
        let mut catalog = catalog();

        let outcome = import_download(
            &download,
            &remote("Der Fall"),
            None,
            &mut catalog,
            &ProgramProfile::default(),
            dir.path(),
        )
        .unwrap();

        let target = dir.path().join("Philip Maloney - 042 - Der Fall (2020-05-01).mp3");
        assert_eq!(outcome, ImportOutcome::Tagged(target.clone()));
        assert!(!download.exists());
        assert_eq!(catalog.get(0).unwrap().lead(), Some("Neuer Lead"));
        assert_eq!(catalog.get(0).unwrap().remote_id.as_deref(), Some("urn:srf:audio:1"));

        let tag = TaggedFile::read_existing(&target).unwrap().unwrap();
        assert_eq!(tag.text("TRCK"), Some("042"));
        assert!(matches!(tag.get("COMM"), Some(Frame::Comment(c)) if c.text == "Neuer Lead"));
    }

    #[test]
    fn import_unknown_episode_uses_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let download = dir.path().join("download.mp3");
        fs::write(&download, AUDIO).unwrap();
        let mut catalog = catalog();
        let before = catalog.clone();

        let outcome = import_download(
            &download,
            &remote("Neu"),
            None,
            &mut catalog,
            &ProgramProfile::default(),
            dir.path(),
        )
        .unwrap();

        let target = dir.path().join("Philip Maloney - xxx - Neu (2020-05-03).mp3");
        assert_eq!(outcome, ImportOutcome::Tagged(target.clone()));
        assert_eq!(catalog, before);
        let tag = TaggedFile::read_existing(&target).unwrap().unwrap();
        assert_eq!(tag.get("TRCK"), None);
        assert_eq!(tag.text("TIT2"), Some("Neu (2020-05-03)"));
    }

    #[test]
    fn import_skips_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let download = dir.path().join("download.mp3");
        fs::write(&download, AUDIO).unwrap();
        let existing = dir.path().join("Philip Maloney - 042 - Der Fall (2020-05-01).mp3");
        fs::write(&existing, b"old").unwrap();

        let outcome = import_download(
            &download,
            &remote("Der Fall"),
            None,
            &mut catalog(),
            &ProgramProfile::default(),
            dir.path(),
        )
        .unwrap();
        assert_eq!(outcome, ImportOutcome::AlreadyPresent(existing.clone()));
        assert!(download.exists());
        assert_eq!(fs::read(&existing).unwrap(), b"old");
    }

    #[test]
    fn rename_skips_other_extensions_and_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("Der Fall.txt");
        let unknown = dir.path().join("Unbekannt.mp3");
        fs::write(&text, AUDIO).unwrap();
        fs::write(&unknown, AUDIO).unwrap();

        let report = rename_files(
            &[text.clone(), unknown.clone()],
            &catalog(),
            &ProgramProfile::default(),
        );
        assert!(report.processed.is_empty());
        assert_eq!(report.skipped, vec![text.clone(), unknown.clone()]);
        assert!(report.is_success());
        assert!(text.exists() && unknown.exists());
    }
}

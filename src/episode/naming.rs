use std::path::Path;

use serde::Deserialize;

use crate::common::error::Result;
use crate::edit::Edit;
use crate::episode::catalog::EpisodeRecord;

/// Fixed per-program tag values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgramProfile {
    pub program: String,
    pub artist: String,
    pub genre: String,
    /// ISO 639-2 code used for TLAN and the comment language.
    pub language: String,
    /// Episode number used in file names when the catalog has none.
    pub placeholder: String,
}

impl Default for ProgramProfile {
    fn default() -> Self {
        ProgramProfile {
            program: "Philip Maloney".into(),
            artist: "Roger Graf".into(),
            genre: "Book".into(),
            language: "deu".into(),
            placeholder: "xxx".into(),
        }
    }
}

impl ProgramProfile {
    /// Load a profile; keys missing from the file keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// `"<program> - <number> - <title> (<date>).mp3"`
    pub fn canonical_filename(&self, record: &EpisodeRecord) -> String {
        let number = if record.episode_number.is_empty() {
            self.placeholder.as_str()
        } else {
            record.episode_number.as_str()
        };
        format!(
            "{} - {} - {} ({}).mp3",
            self.program,
            number,
            sanitize(&record.title),
            record.date
        )
    }

    /// Tag edits describing `record`. Callers delete existing COMM frames
    /// first so that the lead replaces any older comment.
    pub fn render_edits(&self, record: &EpisodeRecord) -> Vec<Edit> {
        let mut edits = vec![
            Edit::new("TALB", self.program.as_str()),
            Edit::new("TPE1", self.artist.as_str()),
            Edit::new("TCON", self.genre.as_str()),
            Edit::new("TLAN", self.language.as_str()),
            Edit::new("TDRC", record.date.as_str()),
            Edit::new("TIT2", format!("{} ({})", record.title, record.date)),
        ];
        if !record.episode_number.is_empty() {
            edits.push(Edit::new("TRCK", record.episode_number.as_str()));
        }
        if let Some(lead) = record.lead() {
            edits.push(Edit::new("COMM", format!(":{}:{}", lead, self.language)));
        }
        edits
    }
}

// Titles end up as a path component.
fn sanitize(title: &str) -> String {
    title.replace(['/', '\0'], "-")
}

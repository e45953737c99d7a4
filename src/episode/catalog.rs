use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::error::{MaloneyError, Result};
use crate::common::util;

/// One episode of the program as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_titles: Vec<String>,
    /// Zero-padded episode number; empty when unknown.
    #[serde(rename = "episode")]
    pub episode_number: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    /// Identifier of the episode on the broadcaster's platform.
    #[serde(rename = "uid", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

impl EpisodeRecord {
    pub fn has_alternative_title(&self, title: &str) -> bool {
        self.alternative_titles.iter().any(|t| t == title)
    }

    /// The lead text, if there is a non-empty one.
    pub fn lead(&self) -> Option<&str> {
        self.lead.as_deref().filter(|l| !l.is_empty())
    }
}

/// Fresh values for one catalog record, produced by the resolver and
/// applied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPatch {
    pub index: usize,
    pub lead: Option<String>,
    pub remote_id: Option<String>,
}

/// Ordered list of episode records; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeCatalog {
    records: Vec<EpisodeRecord>,
}

impl EpisodeCatalog {
    pub fn new(records: Vec<EpisodeRecord>) -> Self {
        EpisodeCatalog { records }
    }

    /// Parse catalog JSON after NFKD normalisation, so that titles compare
    /// equal regardless of how the source composed its accents.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let normalized = util::nfkd(json);
        let records: Vec<EpisodeRecord> = serde_json::from_str(&normalized)?;
        Ok(EpisodeCatalog { records })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = util::read_all(path)
            .map_err(|e| MaloneyError::Catalog(format!("{}: {}", path.display(), e)))?;
        let text = String::from_utf8(data).map_err(|_| {
            MaloneyError::Catalog(format!("{}: catalog is not valid UTF-8", path.display()))
        })?;
        let catalog = Self::from_json_str(&text)
            .map_err(|e| MaloneyError::Catalog(format!("{}: {}", path.display(), e)))?;
        debug!("loaded {} episodes from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        util::replace_atomically(path, &[json.as_bytes()])
    }

    pub fn records(&self) -> &[EpisodeRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&EpisodeRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record matching `predicate`, with its index.
    pub fn find<P>(&self, mut predicate: P) -> Option<(usize, &EpisodeRecord)>
    where
        P: FnMut(&EpisodeRecord) -> bool,
    {
        self.records.iter().enumerate().find(|&(_, r)| predicate(r))
    }

    /// Apply resolver backfill. Unknown indices are ignored.
    pub fn apply_patch(&mut self, patch: &CatalogPatch) {
        if let Some(record) = self.records.get_mut(patch.index) {
            if let Some(lead) = &patch.lead {
                record.lead = Some(lead.clone());
            }
            if let Some(remote_id) = &patch.remote_id {
                record.remote_id = Some(remote_id.clone());
            }
        }
    }
}

//! Episode records published by the broadcaster as "media composition" JSON.

use serde::Deserialize;
use tracing::debug;

use crate::common::error::{MaloneyError, Result};
use crate::common::util;
use crate::episode::catalog::EpisodeRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaComposition {
    #[serde(default)]
    chapter_list: Vec<Chapter>,
    episode: Option<EpisodeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Chapter {
    title: String,
    #[serde(default)]
    lead: String,
    date: String,
    urn: Option<String>,
    #[serde(default)]
    resource_list: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeInfo {
    published_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    protocol: String,
    url: String,
}

/// One episode as described by the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEpisode {
    pub uid: Option<String>,
    pub title: String,
    pub lead: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub published_date: Option<String>,
    /// Last HTTPS resource of the first chapter.
    pub https_url: Option<String>,
}

impl RemoteEpisode {
    pub fn from_media_composition(json: &str) -> Result<Self> {
        let normalized = util::nfkd(json);
        let composition: MediaComposition = serde_json::from_str(&normalized)?;
        let chapter = composition
            .chapter_list
            .into_iter()
            .next()
            .ok_or_else(|| MaloneyError::Catalog("media composition has no chapters".into()))?;

        let https_url = chapter
            .resource_list
            .iter()
            .rev()
            .find(|r| r.protocol.contains("HTTPS"))
            .map(|r| r.url.clone());
        let date = chapter.date.chars().take(10).collect();

        let episode = RemoteEpisode {
            uid: chapter.urn,
            title: chapter.title,
            lead: chapter.lead,
            date,
            published_date: composition.episode.and_then(|e| e.published_date),
            https_url,
        };
        debug!("remote episode {:?} ({})", episode.title, episode.date);
        Ok(episode)
    }

    /// Record used when the catalog has no entry for this episode.
    pub fn to_record(&self) -> EpisodeRecord {
        EpisodeRecord {
            title: self.title.clone(),
            alternative_titles: Vec::new(),
            episode_number: String::new(),
            date: self.date.clone(),
            lead: Some(self.lead.clone()).filter(|l| !l.is_empty()),
            remote_id: self.uid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOSITION: &str = r#"{
        "episode": {"publishedDate": "2020-05-01T11:00:00+02:00"},
        "chapterList": [{
            "urn": "urn:srf:audio:1234",
            "title": "Der Fall",
            "lead": "Maloney ermittelt",
            "date": "2020-05-03T11:00:00+02:00",
            "resourceList": [
                {"protocol": "HTTPS", "url": "https://example.org/a.mp3"},
                {"protocol": "HLS", "url": "https://example.org/a.m3u8"},
                {"protocol": "HTTPS", "url": "https://example.org/b.mp3"}
            ]
        }]
    }"#;

    #[test]
    fn extracts_first_chapter() {
        let episode = RemoteEpisode::from_media_composition(COMPOSITION).unwrap();
        assert_eq!(episode.uid.as_deref(), Some("urn:srf:audio:1234"));
        assert_eq!(episode.title, "Der Fall");
        assert_eq!(episode.date, "2020-05-03");
        assert_eq!(episode.published_date.as_deref(), Some("2020-05-01T11:00:00+02:00"));
        assert_eq!(episode.https_url.as_deref(), Some("https://example.org/b.mp3"));
    }

    #[test]
    fn lead_defaults_to_empty() {
        let json = r#"{"chapterList": [{"title": "Grüezi", "date": "2019-01-01"}]}"#;
        let episode = RemoteEpisode::from_media_composition(json).unwrap();
        assert_eq!(episode.lead, "");
        assert_eq!(episode.title, "Gru\u{0308}ezi");
        assert_eq!(episode.https_url, None);
        assert_eq!(episode.to_record().lead, None);
        assert_eq!(episode.to_record().episode_number, "");
    }

    #[test]
    fn empty_chapter_list_is_an_error() {
        assert!(RemoteEpisode::from_media_composition(r#"{"chapterList": []}"#).is_err());
        assert!(RemoteEpisode::from_media_composition("not json").is_err());
    }
}

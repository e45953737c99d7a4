//! ID3v2 tag editing and episode metadata resolution for "Philip Maloney"
//! radio play recordings.

pub mod common;
pub mod edit;
pub mod episode;
pub mod id3;
pub mod workflow;

pub use common::error::{MaloneyError, Result};
pub use edit::{apply_edits, BatchReport, Edit, EditBatch, EditOptions};
pub use episode::{EpisodeCatalog, EpisodeRecord, ProgramProfile, RemoteEpisode, Resolver};
pub use id3::TaggedFile;
pub use workflow::{import_download, rename_files, ImportOutcome};

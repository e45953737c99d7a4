pub mod catalog;
pub mod naming;
pub mod remote;
pub mod resolver;

pub use catalog::{CatalogPatch, EpisodeCatalog, EpisodeRecord};
pub use naming::ProgramProfile;
pub use remote::RemoteEpisode;
pub use resolver::{Lookup, MatchStep, RemoteFields, Resolution, Resolver};

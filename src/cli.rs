use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "maloney-tagger")]
#[command(author, version, about = "Tag and rename Philip Maloney episodes")]
pub struct Cli {
    /// Program profile (TOML) overriding album, artist, genre and language
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Frame values given on the command line. Values stay raw so that
/// arguments which are not valid UTF-8 can be reported per frame.
#[derive(Args, Debug, Default)]
pub struct FrameValues {
    /// Set the artist (TPE1)
    #[arg(short = 'a', long)]
    pub artist: Vec<OsString>,

    /// Set the album (TALB)
    #[arg(short = 'A', long)]
    pub album: Vec<OsString>,

    /// Set the title (TIT2)
    #[arg(short = 't', long)]
    pub song: Vec<OsString>,

    /// Add a comment, as "[description:]text[:language]" (COMM)
    #[arg(short = 'c', long)]
    pub comment: Vec<OsString>,

    /// Set the genre (TCON)
    #[arg(short = 'g', long)]
    pub genre: Vec<OsString>,

    /// Set the recording date (TDRC)
    #[arg(short = 'y', long, visible_alias = "date")]
    pub year: Vec<OsString>,

    /// Set the track number (TRCK)
    #[arg(short = 'T', long)]
    pub track: Vec<OsString>,

    /// Set any supported frame, as ID=VALUE (e.g. TLAN=deu, POPM=a@b:128:1)
    #[arg(short = 'f', long = "frame", value_name = "ID=VALUE")]
    pub frames: Vec<OsString>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write frames to one or more files
    Tag {
        #[command(flatten)]
        values: FrameValues,

        /// Interpret backslash escapes in values and separators
        #[arg(short, long)]
        escape: bool,

        /// Files to tag
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete every instance of the given frames
    DeleteFrames {
        /// Comma separated frame ids (e.g. COMM,TXXX)
        #[arg(required = true, value_delimiter = ',')]
        frames: Vec<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete whole tags
    Delete {
        /// Only delete the ID3v1 trailer
        #[arg(short = '1', long, conflicts_with = "v2_only")]
        v1_only: bool,

        /// Only delete the ID3v2 tag
        #[arg(short = '2', long)]
        v2_only: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rewrite tags as ID3v2.4 without changing their values
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the frames of each file
    List {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rename and re-tag files from the episode catalog
    Rename {
        /// Episode catalog (JSON)
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Tag a downloaded episode and move it into the collection
    Import {
        /// Downloaded audio file
        file: PathBuf,

        /// Media composition JSON describing the episode
        #[arg(short, long)]
        metadata: PathBuf,

        /// Episode catalog (JSON)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Broadcaster uid, overriding the one in the metadata
        #[arg(short, long)]
        uid: Option<String>,

        /// Directory to store the episode in
        #[arg(short, long, default_value = ".")]
        outdir: PathBuf,

        /// Write backfilled lead and uid into the catalog
        #[arg(short, long, requires = "catalog")]
        write_catalog: bool,
    },
}

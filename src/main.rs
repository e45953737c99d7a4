mod cli;

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, FrameValues};
use maloney_tagger::edit::engine;
use maloney_tagger::{
    apply_edits, import_download, rename_files, BatchReport, Edit, EditOptions, EpisodeCatalog,
    ImportOutcome, ProgramProfile, RemoteEpisode, TaggedFile,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(unix)]
fn os_bytes(value: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    value.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn os_bytes(value: &OsStr) -> Vec<u8> {
    value.to_string_lossy().into_owned().into_bytes()
}

fn collect_edits(values: &FrameValues) -> Result<Vec<Edit>> {
    let named: [(&str, &Vec<OsString>); 7] = [
        ("TPE1", &values.artist),
        ("TALB", &values.album),
        ("TIT2", &values.song),
        ("COMM", &values.comment),
        ("TCON", &values.genre),
        ("TDRC", &values.year),
        ("TRCK", &values.track),
    ];

    let mut edits = Vec::new();
    for (frame, raw) in named {
        edits.extend(raw.iter().map(|v| Edit::new(frame, os_bytes(v))));
    }
    for assignment in &values.frames {
        let bytes = os_bytes(assignment);
        let Some(eq) = bytes.iter().position(|&b| b == b'=') else {
            bail!("expected ID=VALUE, got {:?}", assignment);
        };
        let frame = std::str::from_utf8(&bytes[..eq])
            .with_context(|| format!("frame id in {:?} is not valid UTF-8", assignment))?;
        edits.push(Edit::new(frame.to_ascii_uppercase(), &bytes[eq + 1..]));
    }
    Ok(edits)
}

fn finish(report: BatchReport) -> Result<()> {
    tracing::info!(
        "{} processed, {} skipped, {} failed",
        report.processed.len(),
        report.skipped.len(),
        report.failed.len()
    );
    if !report.is_success() {
        bail!("{} file(s) failed", report.failed.len());
    }
    Ok(())
}

fn list(files: &[PathBuf]) -> Result<()> {
    let mut report = BatchReport::default();
    for path in files {
        match TaggedFile::read_existing(path) {
            Ok(Some(tag)) => {
                println!("IDv2 tag info for {}", path.display());
                for frame in tag.frames() {
                    println!("{}={}", frame.hash_key(), frame.pprint());
                }
                report.processed.push(path.clone());
            }
            Ok(None) => {
                println!("No ID3 header found in {}", path.display());
                report.skipped.push(path.clone());
            }
            Err(e) => report.record_failure(path, &e),
        }
    }
    finish(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the level follows -v
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        match cli.verbose {
            0 => "maloney_tagger=warn",
            1 => "maloney_tagger=info",
            2 => "maloney_tagger=debug",
            _ => "maloney_tagger=trace",
        }
        .to_string()
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let profile = match &cli.profile {
        Some(path) => ProgramProfile::from_toml_file(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => ProgramProfile::default(),
    };

    match cli.command {
        Commands::Tag {
            values,
            escape,
            files,
        } => {
            let edits = collect_edits(&values)?;
            if edits.is_empty() {
                bail!("no frames to write");
            }
            finish(apply_edits(&edits, &files, EditOptions { escape })?)
        }
        Commands::DeleteFrames { frames, files } => {
            let ids: Vec<String> = frames.iter().map(|f| f.trim().to_ascii_uppercase()).collect();
            finish(engine::delete_frames(&ids, &files))
        }
        Commands::Delete {
            v1_only,
            v2_only,
            files,
        } => finish(engine::delete_tags(&files, !v2_only, !v1_only)),
        Commands::Convert { files } => finish(engine::convert(&files)),
        Commands::List { files } => list(&files),
        Commands::Rename { catalog, files } => {
            let catalog = EpisodeCatalog::load(&catalog)?;
            finish(rename_files(&files, &catalog, &profile))
        }
        Commands::Import {
            file,
            metadata,
            catalog: catalog_path,
            uid,
            outdir,
            write_catalog,
        } => {
            let json = std::fs::read_to_string(&metadata)
                .with_context(|| format!("Failed to read {}", metadata.display()))?;
            let remote = RemoteEpisode::from_media_composition(&json)?;
            let mut catalog = match &catalog_path {
                Some(path) => EpisodeCatalog::load(path)?,
                None => EpisodeCatalog::default(),
            };

            match import_download(&file, &remote, uid.as_deref(), &mut catalog, &profile, &outdir)? {
                ImportOutcome::Tagged(path) => println!("{}", path.display()),
                ImportOutcome::AlreadyPresent(path) => {
                    println!("Skipping, already present: {}", path.display())
                }
            }

            if write_catalog {
                if let Some(path) = &catalog_path {
                    catalog.save(path)?;
                }
            }
            Ok(())
        }
    }
}

//! Command-line front end for the evidence export engine

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use exovault_core::{CompressionFlags, CompressionLevel, EvidenceFormat, OutputFormat};
use exovault_export::{ExportSession, OutputOpen, OutputOptions, SessionOptions};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exovault", version, about = "Forensic evidence export tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export media from an evidence container to another container,
    /// a raw image, or standard output
    Export(ExportArgs),
    /// Export the logical file tree embedded in an evidence container
    /// to a directory
    ExportFiles(ExportFilesArgs),
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Input segment file(s); a single first segment is expanded to the
    /// full set
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output path; "-" writes raw media to standard output
    #[arg(short, long)]
    target: PathBuf,

    /// Output container format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Raw)]
    format: FormatArg,

    /// Evidence sub-format for container output
    #[arg(long, value_enum, default_value_t = EvidenceFormatArg::Encase6)]
    evidence_format: EvidenceFormatArg,

    /// Compression level for container output
    #[arg(short, long, value_enum, default_value_t = CompressionArg::None)]
    compression: CompressionArg,

    /// Store all-zero chunks compressed even at compression level none
    #[arg(long)]
    compress_empty_blocks: bool,

    /// Target segment file size in bytes (0 = format default; for raw
    /// output, a single unsplit file)
    #[arg(long, default_value_t = 0)]
    segment_size: u64,

    /// Sectors per chunk for container output
    #[arg(long, default_value_t = 64)]
    sectors_per_chunk: u32,

    /// Digest(s) to calculate over the exported media (default: md5)
    #[arg(short, long, value_enum)]
    digest: Vec<DigestArg>,

    /// Zero-fill chunks that fail checksum verification
    #[arg(short, long)]
    wipe_chunk_on_error: bool,

    /// Swap byte pairs (16-bit-sample media; raw output only)
    #[arg(short, long)]
    swap_byte_pairs: bool,

    /// Use the container's high-level buffer API instead of the chunk API
    #[arg(long)]
    buffered: bool,
}

#[derive(clap::Args)]
struct ExportFilesArgs {
    /// Input segment file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Target directory (must exist)
    #[arg(short, long)]
    target: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Ewf,
    Raw,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    None,
    Fast,
    Best,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DigestArg {
    Md5,
    Sha1,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EvidenceFormatArg {
    Encase2,
    Encase3,
    Encase4,
    Encase5,
    Encase6,
    Linen5,
    Linen6,
    Ewfx,
    Smart,
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FormatArg::Ewf => "ewf",
            FormatArg::Raw => "raw",
        })
    }
}

impl std::fmt::Display for CompressionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompressionArg::None => "none",
            CompressionArg::Fast => "fast",
            CompressionArg::Best => "best",
        })
    }
}

impl std::fmt::Display for EvidenceFormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let format: EvidenceFormat = (*self).into();
        f.write_str(format.name())
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Ewf => OutputFormat::Ewf,
            FormatArg::Raw => OutputFormat::Raw,
        }
    }
}

impl From<CompressionArg> for CompressionLevel {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => CompressionLevel::None,
            CompressionArg::Fast => CompressionLevel::Fast,
            CompressionArg::Best => CompressionLevel::Best,
        }
    }
}

impl From<EvidenceFormatArg> for EvidenceFormat {
    fn from(arg: EvidenceFormatArg) -> Self {
        match arg {
            EvidenceFormatArg::Encase2 => EvidenceFormat::Encase2,
            EvidenceFormatArg::Encase3 => EvidenceFormat::Encase3,
            EvidenceFormatArg::Encase4 => EvidenceFormat::Encase4,
            EvidenceFormatArg::Encase5 => EvidenceFormat::Encase5,
            EvidenceFormatArg::Encase6 => EvidenceFormat::Encase6,
            EvidenceFormatArg::Linen5 => EvidenceFormat::Linen5,
            EvidenceFormatArg::Linen6 => EvidenceFormat::Linen6,
            EvidenceFormatArg::Ewfx => EvidenceFormat::Ewfx,
            EvidenceFormatArg::Smart => EvidenceFormat::Smart,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Export(args) => run_export(args),
        Command::ExportFiles(args) => run_export_files(args),
    }
}

fn run_export(args: ExportArgs) -> anyhow::Result<()> {
    let digests = if args.digest.is_empty() {
        vec![DigestArg::Md5]
    } else {
        args.digest.clone()
    };
    let options = SessionOptions {
        calculate_md5: digests.contains(&DigestArg::Md5),
        calculate_sha1: digests.contains(&DigestArg::Sha1),
        wipe_chunk_on_error: args.wipe_chunk_on_error,
        swap_byte_pairs: args.swap_byte_pairs,
        chunk_level_access: !args.buffered,
    };
    let mut session = ExportSession::new(options);
    session
        .open_input(&args.input)
        .context("opening input container")?;

    let opened = session
        .open_output(args.format.into(), &args.target)
        .context("opening output")?;
    if opened == OutputOpen::Unavailable {
        anyhow::bail!("unable to open output: {}", args.target.display());
    }

    let output_options = OutputOptions {
        evidence_format: args.evidence_format.into(),
        compression_level: args.compression.into(),
        compression_flags: CompressionFlags {
            compress_empty_blocks: args.compress_empty_blocks,
        },
        segment_file_size: args.segment_size,
        sectors_per_chunk: args.sectors_per_chunk,
    };
    session
        .set_output_values(&output_options)
        .context("configuring output")?;

    let written = session.transfer().context("transferring media")?;
    session.finalize().context("finalizing output")?;
    info!(bytes = written, "export complete");

    let mut stderr = io::stderr();
    session.write_hash_values(&mut stderr)?;
    session.write_checksum_errors(&mut stderr)?;
    session.close().context("closing containers")?;
    Ok(())
}

fn run_export_files(args: ExportFilesArgs) -> anyhow::Result<()> {
    let mut session = ExportSession::new(SessionOptions {
        calculate_md5: false,
        ..SessionOptions::default()
    });
    session
        .open_input(&args.input)
        .context("opening input container")?;
    session
        .export_file_tree(&args.target)
        .context("exporting file tree")?;
    session.close().context("closing input")?;
    Ok(())
}

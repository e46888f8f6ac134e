use clap::Parser;
use sirna_offtarget::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build a `.sot` seed index snapshot from a transcriptome FASTA.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input transcriptome FASTA path
    #[arg(short, long)]
    input: PathBuf,

    /// Output `.sot` path
    #[arg(short, long)]
    output: PathBuf,

    /// Minimum transcript length to index
    #[arg(long, default_value_t = DEFAULT_MIN_TRANSCRIPT_LEN)]
    min_len: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = BuildConfig::default().min_transcript_len(args.min_len);

    let (idx, report) = build_index_from_fasta(&args.input, &cfg)?;
    SnapshotWriter::new(&idx).write_to(&args.output)?;

    tracing::info!(
        output = %args.output.display(),
        transcripts = report.indexed,
        seeds = report.seed_entries,
        skipped = report.skipped(),
        duplicates = report.duplicates,
        "wrote seed index"
    );
    Ok(())
}

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use sirna_offtarget::output::{write_json, write_summary_json, write_tsv};
use sirna_offtarget::*;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Tsv,
    Json,
    Summary,
}

/// Predict siRNA off-target sites against a seed index.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Prebuilt `.sot` snapshot
    #[arg(long, conflicts_with = "fasta")]
    index: Option<PathBuf>,

    /// Transcriptome FASTA (index is built in memory)
    #[arg(long)]
    fasta: Option<PathBuf>,

    /// Guide strand, 19-23 nt (repeatable)
    #[arg(short, long = "guide", required = true)]
    guides: Vec<String>,

    /// Name reported in the summary output
    #[arg(long, default_value = "sirna")]
    name: String,

    /// Seed mismatches tolerated (0-2)
    #[arg(long, default_value_t = 1)]
    max_seed_mismatches: u8,

    /// Report duplexes with ΔG at or below this (kcal/mol)
    #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
    energy_threshold: f64,

    /// Use a neutral accessibility instead of the AU proxy
    #[arg(long, default_value_t = false)]
    no_structure: bool,

    /// Also search seeds within the mismatch budget
    #[arg(long, default_value_t = false)]
    fuzzy: bool,

    /// Cap on scored seed hits per guide (0 = unbounded)
    #[arg(long, default_value_t = 50_000)]
    max_candidates: usize,

    /// Minimum transcript length when building from FASTA
    #[arg(long, default_value_t = DEFAULT_MIN_TRANSCRIPT_LEN)]
    min_len: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Tsv)]
    format: Format,

    /// Rows kept per guide in summary output
    #[arg(long, default_value_t = AnalysisSummary::DEFAULT_TOP)]
    top: usize,
}

fn load_index(args: &Args) -> anyhow::Result<SeedIndex> {
    match (&args.index, &args.fasta) {
        (Some(p), _) => {
            SeedIndex::open(p).with_context(|| format!("loading {}", p.display()))
        }
        (None, Some(p)) => {
            let cfg = BuildConfig::default().min_transcript_len(args.min_len);
            let (idx, _) = build_index_from_fasta(p, &cfg)
                .with_context(|| format!("indexing {}", p.display()))?;
            Ok(idx)
        }
        (None, None) => bail!("one of --index or --fasta is required"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let index = load_index(&args)?;

    let params = SearchParams::default()
        .max_seed_mismatches(args.max_seed_mismatches)
        .energy_threshold(args.energy_threshold)
        .include_structure(!args.no_structure)
        .max_candidates((args.max_candidates > 0).then_some(args.max_candidates))
        .seed_search(if args.fuzzy {
            SeedSearch::Hamming
        } else {
            SeedSearch::Exact
        });

    let results = analyze_batch(&index, &args.guides, &params);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (i, (guide, res)) in args.guides.iter().zip(results).enumerate() {
        let analysis = res.with_context(|| format!("guide {guide}"))?;
        match args.format {
            Format::Tsv => write_tsv(&mut out, &analysis, i == 0)?,
            Format::Json => write_json(&mut out, &analysis)?,
            Format::Summary => {
                let name = if args.guides.len() > 1 {
                    format!("{}_{}", args.name, i + 1)
                } else {
                    args.name.clone()
                };
                write_summary_json(&mut out, &AnalysisSummary::new(name, &analysis, args.top))?
            }
        }
    }
    out.flush()?;
    Ok(())
}

//! Builders: one sequential pass over the transcriptome into a fresh
//! [`SeedIndex`]. An async wrapper (tokio) is available behind `async`.

use rustc_hash::FxHashSet;
use std::path::Path;

use crate::encode::{MAP_LUT, SEED_LEN, SEED_SPACE};
use crate::index::{Posting, SeedIndex};
use crate::radix::counting_sort_postings;
use crate::transcript::{Transcript, TranscriptRecord};

/// Transcripts shorter than this are not indexed by default.
pub const DEFAULT_MIN_TRANSCRIPT_LEN: usize = 50;

const PROGRESS_EVERY: usize = 1000;

/// Build-time configuration.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    min_transcript_len: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            min_transcript_len: DEFAULT_MIN_TRANSCRIPT_LEN,
        }
    }
}

impl BuildConfig {
    /// Minimum transcript length to index (shorter ones are skipped). Never below 7.
    pub fn min_transcript_len(mut self, n: usize) -> Self {
        self.min_transcript_len = n.max(SEED_LEN);
        self
    }

    pub fn min_len(&self) -> usize {
        self.min_transcript_len
    }
}

/// Per-record accounting for one build.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BuildReport {
    /// Records read from the source.
    pub processed: usize,
    /// Transcripts that made it into the index.
    pub indexed: usize,
    pub skipped_short: usize,
    pub skipped_malformed: usize,
    /// Later records whose identifier was already taken.
    pub duplicates: usize,
    pub seed_entries: usize,
    /// 7-mer windows skipped because they contained an ambiguity code.
    pub ambiguous_windows: usize,
}

impl BuildReport {
    pub fn skipped(&self) -> usize {
        self.skipped_short + self.skipped_malformed + self.duplicates
    }
}

/// Build a seed index from a record source.
///
/// Bad records are skipped and counted; an `Err` from the source aborts the build.
pub fn build_index<I>(
    records: I,
    cfg: &BuildConfig,
) -> Result<(SeedIndex, BuildReport), std::io::Error>
where
    I: IntoIterator<Item = std::io::Result<TranscriptRecord>>,
{
    let mut report = BuildReport::default();
    let mut transcripts: Vec<Transcript> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut codes: Vec<u32> = Vec::new();
    let mut posts: Vec<Posting> = Vec::new();

    for item in records {
        let rec = item?;
        report.processed += 1;

        // first occurrence of an id wins, even if it is later rejected
        let id = rec.id.trim();
        if !id.is_empty() && !seen.insert(id.to_string()) {
            tracing::warn!(id, "duplicate transcript id, keeping first");
            report.duplicates += 1;
            continue;
        }

        let transcript = match Transcript::from_record(&rec) {
            Ok(t) => t,
            Err(fault) => {
                tracing::warn!(id = %rec.id, ?fault, "skipping malformed record");
                report.skipped_malformed += 1;
                continue;
            }
        };
        if transcript.len() < cfg.min_transcript_len {
            tracing::debug!(id = transcript.id(), len = transcript.len(), "skipping short transcript");
            report.skipped_short += 1;
            continue;
        }
        if let Err(e) = to_u32(transcript.len(), "transcript length") {
            tracing::warn!(id = transcript.id(), error = %e, "skipping oversized transcript");
            report.skipped_malformed += 1;
            continue;
        }

        let ordinal = to_u32(transcripts.len(), "transcript count")?;
        report.ambiguous_windows +=
            extract_seeds_rolling(&mut codes, &mut posts, ordinal, transcript.bytes());
        to_u32(codes.len(), "seed entry count")?;
        transcripts.push(transcript);
        report.indexed += 1;

        if report.indexed % PROGRESS_EVERY == 0 {
            tracing::info!(
                transcripts = report.indexed,
                seeds = codes.len(),
                "indexing transcriptome"
            );
        }
    }

    report.seed_entries = codes.len();
    let (offsets, postings) = counting_sort_postings(&codes, &posts, SEED_SPACE);
    tracing::info!(
        processed = report.processed,
        indexed = report.indexed,
        short = report.skipped_short,
        malformed = report.skipped_malformed,
        duplicates = report.duplicates,
        seeds = report.seed_entries,
        "seed index build complete"
    );
    Ok((SeedIndex::from_parts(transcripts, offsets, postings), report))
}

/// Build from a FASTA file using rust-bio's reader.
pub fn build_index_from_fasta(
    path: &Path,
    cfg: &BuildConfig,
) -> Result<(SeedIndex, BuildReport), std::io::Error> {
    let records = crate::io::read_fasta(path)?;
    build_index(records, cfg)
}

/// Async variant of [`build_index_from_fasta`]; the build runs on the blocking pool.
#[cfg(feature = "async")]
pub async fn build_index_from_fasta_async(
    path: &Path,
    cfg: BuildConfig,
) -> Result<(SeedIndex, BuildReport), std::io::Error> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || build_index_from_fasta(&path, &cfg))
        .await
        .map_err(std::io::Error::other)?
}

/// Ordinals, positions and offsets are stored as `u32`.
fn to_u32(n: usize, what: &str) -> Result<u32, std::io::Error> {
    u32::try_from(n).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{what} {n} exceeds the u32 index limit"),
        )
    })
}

// ---- Rolling extraction ----

/// Push every unambiguous 7-mer of `seq` (forward strand). Returns the number
/// of windows skipped for ambiguity. `seq.len()` must fit in a `u32`.
fn extract_seeds_rolling(
    codes: &mut Vec<u32>,
    posts: &mut Vec<Posting>,
    transcript: u32,
    seq: &[u8],
) -> usize {
    let k = SEED_LEN;
    if seq.len() < k {
        return 0;
    }

    let mask: u32 = (1u32 << (2 * k)) - 1;
    let mut fwd: u32 = 0;
    let mut len: usize = 0;
    let mut indexed = 0usize;

    for (i, &b) in seq.iter().enumerate() {
        let v = MAP_LUT[b as usize];
        if v > 3 {
            // ambiguous: reset
            fwd = 0;
            len = 0;
            continue;
        }
        fwd = ((fwd << 2) | v as u32) & mask;
        len += 1;

        if len >= k {
            codes.push(fwd);
            posts.push(Posting {
                transcript,
                pos: (i + 1 - k) as u32,
            });
            indexed += 1;
        }
    }
    (seq.len() + 1 - k) - indexed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn u32_limit_is_an_error() {
        assert_eq!(to_u32(7, "x").unwrap(), 7);
        assert_eq!(to_u32(u32::MAX as usize, "x").unwrap(), u32::MAX);
        let err = to_u32(u32::MAX as usize + 1, "seed entry count").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(err.to_string().starts_with("seed entry count"));
    }
}

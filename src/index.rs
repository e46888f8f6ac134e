//! SeedIndex: immutable 7-mer → occurrence table over a transcriptome, plus
//! the swappable handle queries read it through.

use bytemuck::{Pod, Zeroable};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::builder::{BuildConfig, BuildReport, build_index};
use crate::encode::{SEED_LEN, SEED_SPACE, encode_kmer, hamming_neighbors, normalize};
use crate::transcript::{Transcript, TranscriptRecord};

/// Posting entry: `(transcript ordinal, pos)`.
#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable, PartialEq, Eq, Debug)]
pub struct Posting {
    /// Transcript ordinal within the index (0-based).
    pub transcript: u32,
    /// 0-based start of the 7-mer within the transcript.
    pub pos: u32,
}

#[derive(Debug, Error)]
/// Errors returned by SeedIndex.
pub enum IndexError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid snapshot file.
    #[error("Invalid SOT file: {0}")]
    Format(String),
    /// Bytemuck cast failed.
    #[error("Cast error: {0}")]
    Cast(String),
    /// A posting points outside the transcript table or past a transcript end.
    #[error("seed entry references missing transcript #{ordinal} at {position}")]
    Integrity { ordinal: u32, position: u32 },
}

/// One resolved seed occurrence.
#[derive(Clone, Copy, Debug)]
pub struct SeedHit<'a> {
    pub transcript: &'a Transcript,
    pub position: usize,
}

impl SeedHit<'_> {
    #[inline]
    pub fn transcript_id(&self) -> &str {
        self.transcript.id()
    }
}

/// Immutable seed index. Rebuilding produces a new value; see [`IndexHandle`].
#[derive(Debug)]
pub struct SeedIndex {
    transcripts: Vec<Transcript>,
    by_id: FxHashMap<String, u32>,
    offsets: Vec<u32>,
    postings: Vec<Posting>,
}

impl Default for SeedIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl SeedIndex {
    /// Index over no transcripts.
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), vec![0; SEED_SPACE + 1], Vec::new())
    }

    pub(crate) fn from_parts(
        transcripts: Vec<Transcript>,
        offsets: Vec<u32>,
        postings: Vec<Posting>,
    ) -> Self {
        debug_assert_eq!(offsets.len(), SEED_SPACE + 1);
        let by_id = transcripts
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id().to_string(), i as u32))
            .collect();
        SeedIndex {
            transcripts,
            by_id,
            offsets,
            postings,
        }
    }

    /// Build from records with the default configuration.
    pub fn build<I>(records: I) -> Result<(Self, BuildReport), std::io::Error>
    where
        I: IntoIterator<Item = std::io::Result<TranscriptRecord>>,
    {
        build_index(records, &BuildConfig::default())
    }

    /// Seed length (always 7).
    #[inline]
    pub fn k(&self) -> usize {
        SEED_LEN
    }

    /// Number of seed entries.
    #[inline]
    pub fn total_entries(&self) -> usize {
        self.postings.len()
    }

    #[inline]
    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    /// Transcript by identifier.
    pub fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.by_id
            .get(id)
            .and_then(|&i| self.transcripts.get(i as usize))
    }

    /// Raw postings for an LSB-aligned 7-mer code.
    #[inline]
    pub fn postings(&self, code: u32) -> &[Posting] {
        let c = code as usize;
        if c >= SEED_SPACE {
            return &[];
        }
        let start = self.offsets[c] as usize;
        let end = self.offsets[c + 1] as usize;
        &self.postings[start..end]
    }

    /// Map a posting back to its transcript.
    pub fn resolve(&self, p: Posting) -> Result<SeedHit<'_>, IndexError> {
        let transcript = self
            .transcripts
            .get(p.transcript as usize)
            .filter(|t| p.pos as usize + SEED_LEN <= t.len())
            .ok_or(IndexError::Integrity {
                ordinal: p.transcript,
                position: p.pos,
            })?;
        Ok(SeedHit {
            transcript,
            position: p.pos as usize,
        })
    }

    /// Exact lookup of one 7-mer (case-insensitive, `T` accepted).
    ///
    /// Anything that is not an unambiguous 7-mer cannot be indexed and yields nothing.
    pub fn lookup_seed(&self, sevenmer: &str) -> Vec<SeedHit<'_>> {
        let norm = normalize(sevenmer);
        if norm.len() != SEED_LEN {
            return Vec::new();
        }
        match encode_kmer(norm.as_bytes()) {
            Some(code) => self.lookup_code(code),
            None => Vec::new(),
        }
    }

    /// Resolved hits for a code. Entries failing integrity checks are logged and skipped.
    pub fn lookup_code(&self, code: u32) -> Vec<SeedHit<'_>> {
        self.postings(code)
            .iter()
            .filter_map(|&p| match self.resolve(p) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping seed entry");
                    None
                }
            })
            .collect()
    }

    /// Union of hits for every code within `max_dist` substitutions of `code`.
    /// Exact hits come first.
    pub fn lookup_neighbors(&self, code: u32, max_dist: usize) -> Vec<SeedHit<'_>> {
        hamming_neighbors(code, SEED_LEN, max_dist)
            .into_iter()
            .flat_map(|c| self.lookup_code(c))
            .collect()
    }

    // -------- Internal helpers used by the snapshot writer --------

    pub(crate) fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub(crate) fn all_postings(&self) -> &[Posting] {
        &self.postings
    }
}

/// The "current index" pointer shared by queries and rebuilds.
///
/// Readers clone an `Arc` and keep using that generation for as long as they
/// hold it. Rebuilds run one at a time and never block readers while building.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<SeedIndex>>,
    generation: AtomicU64,
    build_lock: Mutex<()>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new(SeedIndex::empty())
    }
}

impl IndexHandle {
    pub fn new(index: SeedIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            generation: AtomicU64::new(0),
            build_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the current index.
    pub fn current(&self) -> Arc<SeedIndex> {
        Arc::clone(&self.current.read())
    }

    /// Number of times the index has been replaced.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the current index wholesale. Returns the new generation.
    pub fn publish(&self, index: SeedIndex) -> u64 {
        let next = Arc::new(index);
        let mut slot = self.current.write();
        *slot = next;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Build a fresh index from `records` and publish it.
    ///
    /// Concurrent rebuilds are serialized. On error the current index is untouched.
    pub fn rebuild<I>(&self, records: I, cfg: &BuildConfig) -> Result<BuildReport, std::io::Error>
    where
        I: IntoIterator<Item = std::io::Result<TranscriptRecord>>,
    {
        let _guard = self.build_lock.lock();
        let (index, report) = build_index(records, cfg)?;
        let generation = self.publish(index);
        tracing::info!(generation, transcripts = report.indexed, "published seed index");
        Ok(report)
    }
}

//! siRNA off-target prediction over a transcriptome seed index (edition 2024).
//!
//! Pipeline:
//! - Build a 7-mer seed index once from transcript sequences ([`build_index`]).
//! - Query it with the reverse complement of a guide's seed (positions 2–8).
//! - Align each hit antiparallel to the guide, score it with a position-weighted
//!   nearest-neighbor ΔG and a composite risk, filter, and rank ([`analyze`]).
//!
//! A built [`SeedIndex`] is immutable. Rebuilds produce a new value that an
//! [`IndexHandle`] swaps in atomically, so running queries never see a
//! half-built table. Snapshots can be stored as `.sot` files
//! ([`SnapshotWriter`], [`SeedIndex::open`]).
//!
//! G:U wobble pairs count as paired everywhere (alignment, seed quality, ΔG).

mod builder;
pub mod encode;
mod index;
mod io;
pub mod output;
mod radix;
mod search;
pub mod thermo;
mod transcript;

pub use builder::{BuildConfig, BuildReport, DEFAULT_MIN_TRANSCRIPT_LEN, build_index, build_index_from_fasta};
#[cfg(feature = "async")]
pub use builder::build_index_from_fasta_async;
pub use encode::{
    SEED_LEN, ValidationError, is_complementary, is_valid_guide, normalize, reverse,
    reverse_complement, validate_guide,
};
pub use index::{IndexError, IndexHandle, Posting, SeedHit, SeedIndex};
pub use io::{SnapshotWriter, read_fasta, read_fasta_from};
#[cfg(feature = "async")]
pub use search::analyze_async;
pub use search::{
    Analysis, AnalysisSummary, Fraction, OffTargetCandidate, RiskTier, SEED_START, SearchParams,
    SearchStats, SeedSearch, Stage, analyze, analyze_batch, analyze_with_progress,
    extract_window, format_alignment, score_site,
};
pub use thermo::{AlignmentError, RiskTerms, binding_energy, risk_score};
pub use transcript::{Transcript, TranscriptRecord, UNKNOWN_GENE};

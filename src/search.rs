//! Off-target search: seed lookup → window extraction → duplex scoring →
//! filtering → ranking.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encode::{
    SEED_LEN, ValidationError, encode_kmer, is_complementary, reverse, reverse_complement,
    validate_guide,
};
use crate::index::{SeedHit, SeedIndex};
use crate::thermo::{
    AlignmentError, NEUTRAL_ACCESSIBILITY, RiskTerms, accessibility_proxy, au_content,
    binding_energy, risk_score, round_to, site_context,
};

/// Guide offset of the seed region (biological positions 2–8).
pub const SEED_START: usize = 1;

/// Share of the guide that must fit inside the transcript.
const MIN_COVERAGE: f64 = 0.8;

/// Default cap on scored seed hits per request.
pub const DEFAULT_MAX_CANDIDATES: usize = 50_000;

/// How seed hits are discovered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedSearch {
    /// Exact 7-mer lookup; the mismatch budget only filters.
    #[default]
    Exact,
    /// Also look up every 7-mer within `max_seed_mismatches` substitutions.
    Hamming,
}

/// Query-time parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchParams {
    max_seed_mismatches: u8,
    energy_threshold: f64,
    include_structure: bool,
    max_candidates: Option<usize>,
    seed_search: SeedSearch,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_seed_mismatches: 1,
            energy_threshold: -10.0,
            include_structure: true,
            max_candidates: Some(DEFAULT_MAX_CANDIDATES),
            seed_search: SeedSearch::Exact,
        }
    }
}

impl SearchParams {
    /// Seed mismatches tolerated by the filter (0..=2).
    pub fn max_seed_mismatches(mut self, n: u8) -> Self {
        self.max_seed_mismatches = n;
        self
    }
    /// Keep only duplexes with ΔG at or below this (kcal/mol, <= 0).
    pub fn energy_threshold(mut self, dg: f64) -> Self {
        self.energy_threshold = dg;
        self
    }
    /// Use the accessibility proxy instead of a neutral 0.5.
    pub fn include_structure(mut self, yes: bool) -> Self {
        self.include_structure = yes;
        self
    }
    /// Cap scored seed hits; `None` scores all of them.
    pub fn max_candidates(mut self, n: Option<usize>) -> Self {
        self.max_candidates = n;
        self
    }
    pub fn seed_search(mut self, s: SeedSearch) -> Self {
        self.seed_search = s;
        self
    }

    pub fn seed_mismatch_budget(&self) -> u8 {
        self.max_seed_mismatches
    }
    pub fn threshold(&self) -> f64 {
        self.energy_threshold
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_seed_mismatches > 2 {
            return Err(ValidationError::SeedMismatches(self.max_seed_mismatches));
        }
        if !self.energy_threshold.is_finite() || self.energy_threshold > 0.0 {
            return Err(ValidationError::EnergyThreshold(self.energy_threshold));
        }
        Ok(())
    }
}

/// `matched/total`, rendered and serialized as e.g. `"7/7"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fraction {
    pub num: usize,
    pub den: usize,
}

impl Fraction {
    pub fn ratio(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl Serialize for Fraction {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        let (n, m) = s
            .split_once('/')
            .ok_or_else(|| serde::de::Error::custom("expected \"n/m\""))?;
        Ok(Fraction {
            num: n.trim().parse().map_err(serde::de::Error::custom)?,
            den: m.trim().parse().map_err(serde::de::Error::custom)?,
        })
    }
}

/// One scored guide/site alignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffTargetCandidate {
    pub gene_symbol: String,
    pub transcript_id: String,
    pub position: usize,
    /// kcal/mol, 2 decimals.
    pub delta_g: f64,
    /// 0–1, 3 decimals.
    pub risk_score: f64,
    pub seed_matches: Fraction,
    pub mismatches: usize,
    pub alignment_coverage: Fraction,
    pub alignment: String,
    /// Percent, 2 decimals.
    pub au_content: f64,
    /// 0–1, 2 decimals.
    pub structure_accessibility: f64,
    pub in_utr3: bool,
}

impl OffTargetCandidate {
    pub fn risk_tier(&self) -> RiskTier {
        RiskTier::of(self.risk_score)
    }
}

/// Coarse risk band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    High,
    Moderate,
    Low,
}

impl RiskTier {
    /// `> 0.7` high, `0.5..=0.7` moderate, below low.
    pub fn of(score: f64) -> Self {
        if score > 0.7 {
            RiskTier::High
        } else if score >= 0.5 {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }
}

/// Pipeline counters for one analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub seed_hits: usize,
    pub scored: usize,
    pub dropped_alignment: usize,
    pub filtered_seed: usize,
    pub filtered_energy: usize,
    /// More seed hits were found than `max_candidates` allowed scoring.
    pub truncated: bool,
}

/// Result of [`analyze`].
#[derive(Clone, Debug, Serialize)]
pub struct Analysis {
    /// Normalized guide.
    pub guide: String,
    pub seed: String,
    /// Key the index was queried with.
    pub seed_rc: String,
    /// Ranked by risk, highest first.
    pub candidates: Vec<OffTargetCandidate>,
    pub stats: SearchStats,
}

/// Pipeline stage reported to progress observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    SeedLookup,
    Scoring,
    Done,
}

impl Stage {
    pub fn percent(self) -> u8 {
        match self {
            Stage::SeedLookup => 20,
            Stage::Scoring => 80,
            Stage::Done => 100,
        }
    }
}

/// Find, score, filter and rank off-target sites of `guide`.
///
/// Fails only on an invalid guide or parameters; unusable sites are dropped.
pub fn analyze(
    index: &SeedIndex,
    guide: &str,
    params: &SearchParams,
) -> Result<Analysis, ValidationError> {
    analyze_with_progress(index, guide, params, |_| {})
}

/// [`analyze`] with a stage callback.
pub fn analyze_with_progress<F>(
    index: &SeedIndex,
    guide: &str,
    params: &SearchParams,
    mut progress: F,
) -> Result<Analysis, ValidationError>
where
    F: FnMut(Stage),
{
    let guide = validate_guide(guide)?;
    params.validate()?;
    let g = guide.as_bytes();

    let seed = &g[SEED_START..SEED_START + SEED_LEN];
    let seed_rc = reverse_complement(seed);

    progress(Stage::SeedLookup);
    let mut hits = match encode_kmer(&seed_rc) {
        Some(code) => match params.seed_search {
            SeedSearch::Exact => index.lookup_code(code),
            SeedSearch::Hamming => {
                index.lookup_neighbors(code, params.max_seed_mismatches as usize)
            }
        },
        None => Vec::new(),
    };

    let mut stats = SearchStats {
        seed_hits: hits.len(),
        ..SearchStats::default()
    };
    if let Some(cap) = params.max_candidates {
        if hits.len() > cap {
            tracing::warn!(found = hits.len(), cap, "seed hits truncated");
            hits.truncate(cap);
            stats.truncated = true;
        }
    }

    progress(Stage::Scoring);
    let scored: Vec<Result<OffTargetCandidate, AlignmentError>> = hits
        .par_iter()
        .map(|hit| score_site(g, hit, params.include_structure))
        .collect();

    let budget = params.max_seed_mismatches as usize;
    let mut candidates = Vec::new();
    for (hit, res) in hits.iter().zip(scored) {
        let cand = match res {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(
                    transcript = hit.transcript_id(),
                    position = hit.position,
                    error = %e,
                    "dropping candidate"
                );
                stats.dropped_alignment += 1;
                continue;
            }
        };
        stats.scored += 1;
        if cand.seed_matches.num + budget < cand.seed_matches.den {
            tracing::trace!(
                transcript = %cand.transcript_id,
                position = cand.position,
                seed = %cand.seed_matches,
                "below seed threshold"
            );
            stats.filtered_seed += 1;
            continue;
        }
        if cand.delta_g > params.energy_threshold {
            stats.filtered_energy += 1;
            continue;
        }
        candidates.push(cand);
    }

    // stable: equal scores keep discovery order
    candidates.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

    tracing::info!(
        guide = %guide,
        seed_hits = stats.seed_hits,
        reported = candidates.len(),
        dropped = stats.dropped_alignment,
        "analysis complete"
    );
    progress(Stage::Done);

    Ok(Analysis {
        seed: String::from_utf8_lossy(seed).into_owned(),
        seed_rc: String::from_utf8_lossy(&seed_rc).into_owned(),
        guide,
        candidates,
        stats,
    })
}

/// Analyze independent guides in parallel. Results keep input order.
pub fn analyze_batch<S>(
    index: &SeedIndex,
    guides: &[S],
    params: &SearchParams,
) -> Vec<Result<Analysis, ValidationError>>
where
    S: AsRef<str> + Sync,
{
    guides
        .par_iter()
        .map(|g| analyze(index, g.as_ref(), params))
        .collect()
}

/// [`analyze`] against the handle's current index, on the blocking pool.
#[cfg(feature = "async")]
pub async fn analyze_async(
    handle: &crate::index::IndexHandle,
    guide: String,
    params: SearchParams,
) -> Result<Analysis, ValidationError> {
    let index = handle.current();
    tokio::task::spawn_blocking(move || analyze(&index, &guide, &params))
        .await
        .expect("spawn_blocking failed")
}

/// Forward-strand window `[position, position + guide_len)` clipped to the transcript.
pub fn extract_window(seq: &[u8], position: usize, guide_len: usize) -> Result<&[u8], AlignmentError> {
    if position >= seq.len() {
        return Err(AlignmentError::PositionOutOfRange {
            position,
            len: seq.len(),
        });
    }
    let end = position.saturating_add(guide_len).min(seq.len());
    let available = end - position;
    let required = ((guide_len as f64 * MIN_COVERAGE) as usize).max(SEED_LEN);
    if available < required {
        return Err(AlignmentError::WindowTooShort {
            available,
            required,
        });
    }
    Ok(&seq[position..end])
}

/// Score one seed hit: align, compute ΔG, seed quality, context and risk.
pub fn score_site(
    guide: &[u8],
    hit: &SeedHit<'_>,
    include_structure: bool,
) -> Result<OffTargetCandidate, AlignmentError> {
    let transcript = hit.transcript;
    let seq = transcript.bytes();
    let position = hit.position;

    let window = extract_window(seq, position, guide.len())?;
    // target read 3'→5' against the guide's 5'→3'
    let target = reverse(window);

    let aligned = guide.len().min(target.len());
    let g = &guide[..aligned];
    let t = &target[..aligned];

    let delta_g = binding_energy(g, t)?;
    let mismatches = g
        .iter()
        .zip(t)
        .filter(|&(&a, &b)| !is_complementary(a, b))
        .count();

    let seed_end = (SEED_START + SEED_LEN).min(aligned);
    let seed_len = seed_end.saturating_sub(SEED_START);
    let seed_matches = (SEED_START..seed_end)
        .filter(|&i| is_complementary(g[i], t[i]))
        .count();

    let context = site_context(seq, position);
    let au = au_content(context);
    let accessibility = if include_structure {
        accessibility_proxy(context)
    } else {
        NEUTRAL_ACCESSIBILITY
    };

    let risk = risk_score(&RiskTerms {
        delta_g,
        au_content: au,
        accessibility,
        seed_matches,
        seed_len,
    });

    Ok(OffTargetCandidate {
        gene_symbol: transcript.gene_symbol().to_string(),
        transcript_id: transcript.id().to_string(),
        position,
        delta_g: round_to(delta_g, 2),
        risk_score: round_to(risk, 3),
        seed_matches: Fraction {
            num: seed_matches,
            den: seed_len,
        },
        mismatches,
        alignment_coverage: Fraction {
            num: aligned,
            den: guide.len(),
        },
        alignment: format_alignment(g, t),
        au_content: round_to(au, 2),
        structure_accessibility: round_to(accessibility, 2),
        in_utr3: transcript.utr3().contains(&position),
    })
}

/// Three-line diagram: guide 5′→3′, `:` per paired column, target 3′→5′.
pub fn format_alignment(guide: &[u8], target: &[u8]) -> String {
    let n = guide.len().min(target.len());
    let marks: String = (0..n)
        .map(|i| {
            if is_complementary(guide[i], target[i]) {
                ':'
            } else {
                ' '
            }
        })
        .collect();
    format!(
        "siRNA:  5'-{}-3'\n           {}\nTarget: 3'-{}-5'",
        String::from_utf8_lossy(&guide[..n]),
        marks,
        String::from_utf8_lossy(&target[..n])
    )
}

/// Job-style digest of an analysis.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisSummary {
    pub name: String,
    pub sirna_sequence: String,
    pub high_risk_count: usize,
    pub moderate_risk_count: usize,
    pub low_risk_count: usize,
    pub total_offtargets: usize,
    /// Highest-risk candidates, at most `top` of them.
    pub offtargets: Vec<OffTargetCandidate>,
    pub stats: SearchStats,
}

impl AnalysisSummary {
    pub const DEFAULT_TOP: usize = 100;

    pub fn new(name: impl Into<String>, analysis: &Analysis, top: usize) -> Self {
        let count = |tier| {
            analysis
                .candidates
                .iter()
                .filter(|c| c.risk_tier() == tier)
                .count()
        };
        Self {
            name: name.into(),
            sirna_sequence: analysis.guide.clone(),
            high_risk_count: count(RiskTier::High),
            moderate_risk_count: count(RiskTier::Moderate),
            low_risk_count: count(RiskTier::Low),
            total_offtargets: analysis.candidates.len(),
            offtargets: analysis.candidates.iter().take(top).cloned().collect(),
            stats: analysis.stats.clone(),
        }
    }
}

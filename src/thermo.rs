//! Nearest-neighbor duplex energy and composite off-target risk.
//!
//! Conventions
//! - The guide is read 5′→3′.
//! - The target window is already reversed, i.e. read 3′→5′, so column `i`
//!   of guide and target form one base pair.
//! - Stack keys are `GUIDE_PAIR/TARGET_PAIR`, e.g. `AG/UC` is the stack
//!   5′-AG-3′ over 3′-UC-5′.

use thiserror::Error;

use crate::encode::{is_complementary, map_base};

/// Added once when either guide terminus is A or U (kcal/mol).
pub const TERMINAL_AU_PENALTY: f64 = 0.45;

/// Step weights by region (0-indexed step `i` pairs columns `i` and `i + 1`).
pub const SEED_WEIGHT: f64 = 1.5;
pub const CENTRAL_WEIGHT: f64 = 1.0;
pub const SUPPLEMENTARY_WEIGHT: f64 = 0.8;

/// ΔG range mapped onto `[0, 1]` by the risk score.
const DG_FLOOR: f64 = -25.0;

const RISK_W_DG: f64 = 0.30;
const RISK_W_AU: f64 = 0.10;
const RISK_W_ACCESS: f64 = 0.20;
const RISK_W_SEED: f64 = 0.40;

/// Accessibility used when structure scoring is switched off.
pub const NEUTRAL_ACCESSIBILITY: f64 = 0.5;

/// Flank taken around a site for context features.
pub const CONTEXT_UPSTREAM: usize = 30;
pub const CONTEXT_DOWNSTREAM: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// A target window that cannot be aligned against the guide.
pub enum AlignmentError {
    #[error("target window too short: {available} nt available, {required} required")]
    WindowTooShort { available: usize, required: usize },
    #[error("guide and target differ in length ({guide} vs {target})")]
    LengthMismatch { guide: usize, target: usize },
    #[error("site position {position} outside transcript of {len} nt")]
    PositionOutOfRange { position: usize, len: usize },
}

#[inline]
const fn stack_slot(g: &[u8; 2], t: &[u8; 2]) -> usize {
    const fn code(b: u8) -> usize {
        match b {
            b'A' => 0,
            b'C' => 1,
            b'G' => 2,
            _ => 3,
        }
    }
    (code(g[0]) << 6) | (code(g[1]) << 4) | (code(t[0]) << 2) | code(t[1])
}

/// Stack ΔG table (kcal/mol, 37 °C), indexed by guide/target dinucleotide codes.
/// Eighteen keyed stacks. Any stack not listed, paired or not, contributes 0.0.
pub static NN_STACKS: [f64; 256] = {
    const ENTRIES: [(&[u8; 2], &[u8; 2], f64); 18] = [
        // Watson-Crick
        (b"AA", b"UU", -0.9),
        (b"AU", b"UA", -1.1),
        (b"UA", b"AU", -1.3),
        (b"UU", b"AA", -0.9),
        (b"GA", b"UC", -2.1),
        (b"GU", b"CA", -2.1),
        (b"CG", b"GC", -2.4),
        (b"GC", b"CG", -2.1),
        (b"CA", b"GU", -2.1),
        (b"UC", b"GA", -2.1),
        (b"CU", b"GA", -2.1),
        (b"AG", b"CU", -2.1),
        (b"GG", b"CC", -3.3),
        (b"CC", b"GG", -3.3),
        // G:U wobble
        (b"GU", b"UG", -1.4),
        (b"UG", b"GU", -1.4),
        (b"GU", b"AU", -1.3),
        (b"UG", b"UA", -1.0),
    ];
    let mut t = [0.0f64; 256];
    let mut i = 0;
    while i < ENTRIES.len() {
        let (g, p, dg) = ENTRIES[i];
        t[stack_slot(g, p)] = dg;
        i += 1;
    }
    t
};

/// ΔG of one stack. Unknown or ambiguous keys contribute 0.0.
#[inline]
pub fn stack_energy(guide_pair: [u8; 2], target_pair: [u8; 2]) -> f64 {
    if guide_pair
        .iter()
        .chain(target_pair.iter())
        .any(|&b| map_base(b).is_none())
    {
        return 0.0;
    }
    let up = |p: [u8; 2]| [p[0].to_ascii_uppercase(), p[1].to_ascii_uppercase()];
    NN_STACKS[stack_slot(&up(guide_pair), &up(target_pair))]
}

/// Region weight for step `i`: seed 1..=7, central 8..=12, supplementary otherwise.
#[inline]
pub fn position_weight(step: usize) -> f64 {
    match step {
        1..=7 => SEED_WEIGHT,
        8..=12 => CENTRAL_WEIGHT,
        _ => SUPPLEMENTARY_WEIGHT,
    }
}

/// Weighted nearest-neighbor ΔG of `guide` (5′→3′) over `target` (3′→5′).
///
/// Steps with an unpaired column contribute nothing.
pub fn binding_energy(guide: &[u8], target: &[u8]) -> Result<f64, AlignmentError> {
    if guide.len() != target.len() {
        return Err(AlignmentError::LengthMismatch {
            guide: guide.len(),
            target: target.len(),
        });
    }
    let mut dg = 0.0f64;
    for i in 0..guide.len().saturating_sub(1) {
        if !(is_complementary(guide[i], target[i]) && is_complementary(guide[i + 1], target[i + 1]))
        {
            continue;
        }
        let stack = stack_energy([guide[i], guide[i + 1]], [target[i], target[i + 1]]);
        dg += stack * position_weight(i);
    }
    if let (Some(&first), Some(&last)) = (guide.first(), guide.last()) {
        if is_au(first) || is_au(last) {
            dg += TERMINAL_AU_PENALTY;
        }
    }
    Ok(dg)
}

#[inline]
fn is_au(b: u8) -> bool {
    matches!(b.to_ascii_uppercase(), b'A' | b'U' | b'T')
}

/// A+U percentage of `seq` (0–100). Empty input is 0.
pub fn au_content(seq: &[u8]) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let au = seq.iter().filter(|&&b| is_au(b)).count();
    au as f64 / seq.len() as f64 * 100.0
}

/// `[pos - 30, pos + 51)` clipped to the sequence: the site base plus 30 nt
/// upstream and 50 nt downstream.
pub fn site_context(seq: &[u8], pos: usize) -> &[u8] {
    let start = pos.saturating_sub(CONTEXT_UPSTREAM).min(seq.len());
    let end = pos
        .saturating_add(CONTEXT_DOWNSTREAM + 1)
        .min(seq.len());
    &seq[start..end.max(start)]
}

/// Accessibility stand-in: AU fraction of the site context, in `[0, 1]`.
pub fn accessibility_proxy(context: &[u8]) -> f64 {
    (au_content(context) / 100.0).min(1.0)
}

/// Inputs to the composite risk score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskTerms {
    pub delta_g: f64,
    /// Percent, 0–100.
    pub au_content: f64,
    /// 0–1.
    pub accessibility: f64,
    pub seed_matches: usize,
    pub seed_len: usize,
}

/// Weighted risk in `[0, 1]`; seed quality carries the largest weight.
pub fn risk_score(t: &RiskTerms) -> f64 {
    let dg_norm = ((t.delta_g - DG_FLOOR) / -DG_FLOOR).clamp(0.0, 1.0);
    let seed_quality = if t.seed_len > 0 {
        t.seed_matches as f64 / t.seed_len as f64
    } else {
        0.0
    };
    let risk = (1.0 - dg_norm) * RISK_W_DG
        + (t.au_content / 100.0) * RISK_W_AU
        + t.accessibility * RISK_W_ACCESS
        + seed_quality * RISK_W_SEED;
    if risk.is_nan() {
        return 0.0;
    }
    risk.clamp(0.0, 1.0)
}

/// Round half away from zero to `decimals` places.
#[inline]
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}

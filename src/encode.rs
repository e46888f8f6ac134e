//! RNA alphabet handling: normalization, guide validation, base pairing and
//! 2-bit seed encoding.
//!
//! Conventions
//! - All internal sequences are upper-case RNA (`T` is rewritten to `U`).
//! - Seed codes are **LSB-aligned**: a k-mer occupies the lower `2k` bits,
//!   first base in the most significant pair.

use thiserror::Error;

/// Seed length used by the index and the search pipeline.
pub const SEED_LEN: usize = 7;

/// Number of distinct seed codes (`4^SEED_LEN`).
pub const SEED_SPACE: usize = 1 << (2 * SEED_LEN);

/// Shortest accepted guide strand.
pub const MIN_GUIDE_LEN: usize = 19;
/// Longest accepted guide strand.
pub const MAX_GUIDE_LEN: usize = 23;

/// 256-entry LUT: ASCII → 2-bit (A=0, C=1, G=2, T/U=3), 0xFF otherwise.
pub static MAP_LUT: [u8; 256] = {
    const X: u8 = 0xFF;
    let mut t = [X; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t[b'U' as usize] = 3;
    t[b'u' as usize] = 3;
    t
};

const RNA: [u8; 4] = [b'A', b'C', b'G', b'U'];

/// Rejections for query input. Fatal to a request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("guide length {len} outside {MIN_GUIDE_LEN}..={MAX_GUIDE_LEN} nt")]
    Length { len: usize },
    #[error("guide contains invalid base {base:?} at position {pos}")]
    InvalidBase { base: char, pos: usize },
    #[error("max seed mismatches must be 0, 1 or 2 (got {0})")]
    SeedMismatches(u8),
    #[error("energy threshold must be a finite value <= 0.0 kcal/mol (got {0})")]
    EnergyThreshold(f64),
}

/// 2-bit code of a base. `None` if ambiguous.
#[inline]
pub fn map_base(b: u8) -> Option<u8> {
    let v = MAP_LUT[b as usize];
    if v <= 3 { Some(v) } else { None }
}

/// Upper-case and rewrite `T` to `U`.
pub fn normalize(seq: &str) -> String {
    seq.chars()
        .map(|c| match c.to_ascii_uppercase() {
            'T' => 'U',
            other => other,
        })
        .collect()
}

/// Normalize a guide and check it is 19–23 nt over {A,C,G,U}.
pub fn validate_guide(seq: &str) -> Result<String, ValidationError> {
    let guide = normalize(seq.trim());
    let len = guide.chars().count();
    if !(MIN_GUIDE_LEN..=MAX_GUIDE_LEN).contains(&len) {
        return Err(ValidationError::Length { len });
    }
    if let Some((pos, base)) = guide
        .chars()
        .enumerate()
        .find(|(_, c)| !matches!(c, 'A' | 'C' | 'G' | 'U'))
    {
        return Err(ValidationError::InvalidBase { base, pos });
    }
    Ok(guide)
}

/// `true` iff `seq` normalizes to a valid guide.
pub fn is_valid_guide(seq: &str) -> bool {
    validate_guide(seq).is_ok()
}

/// Watson-Crick or G:U wobble pairing.
#[inline]
pub fn is_complementary(b1: u8, b2: u8) -> bool {
    match (map_base(b1), map_base(b2)) {
        // A:U and C:G differ in both bits; G:U and U:G are the wobble pairs.
        (Some(x), Some(y)) => x ^ y == 0b11 || (x | y == 0b11 && x & y == 0b10),
        _ => false,
    }
}

/// Watson-Crick complement. Ambiguous bases map to `N`.
#[inline]
pub fn complement(b: u8) -> u8 {
    match map_base(b) {
        Some(v) => RNA[(v ^ 0b11) as usize],
        None => b'N',
    }
}

pub fn reverse(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().copied().collect()
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Encode a window to an **LSB-aligned** code. `None` if longer than 16 or ambiguous.
#[inline]
pub fn encode_kmer(window: &[u8]) -> Option<u32> {
    let k = window.len();
    if k == 0 || k > 16 {
        return None;
    }
    let mut code: u32 = 0;
    for &b in window {
        let v = map_base(b)? as u32;
        code = (code << 2) | v;
    }
    Some(code)
}

/// Decode an LSB-aligned code back to RNA letters.
pub fn decode_kmer(code: u32, k: usize) -> String {
    (0..k)
        .rev()
        .map(|i| RNA[((code >> (2 * i)) & 0b11) as usize] as char)
        .collect()
}

/// Reverse-complement an LSB-aligned code (lower `2k` bits used).
#[inline]
pub fn revcomp_code(code: u32, k: usize) -> u32 {
    debug_assert!(k <= 16);
    let mut rc: u32 = 0;
    for i in 0..k {
        let base = (code >> (i * 2)) & 0b11;
        let comp = base ^ 0b11;
        let shift = (k - 1 - i) * 2;
        rc |= comp << shift;
    }
    rc
}

/// Every code within Hamming distance `max_dist` of `code`, `code` itself first.
///
/// Neighbours follow in ascending code order; each code appears once.
pub fn hamming_neighbors(code: u32, k: usize, max_dist: usize) -> Vec<u32> {
    let mut out = vec![code];
    let mut seen = rustc_hash::FxHashSet::default();
    seen.insert(code);
    let mut frontier = vec![code];
    for _ in 0..max_dist.min(k) {
        let mut next = Vec::new();
        for &c in &frontier {
            for pos in 0..k {
                let shift = 2 * pos;
                let orig = (c >> shift) & 0b11;
                for sub in 0..4u32 {
                    if sub == orig {
                        continue;
                    }
                    let n = (c & !(0b11 << shift)) | (sub << shift);
                    if seen.insert(n) {
                        next.push(n);
                    }
                }
            }
        }
        frontier = next;
        out.extend_from_slice(&frontier);
    }
    out[1..].sort_unstable();
    out
}

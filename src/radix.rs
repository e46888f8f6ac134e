//! Counting sort of `(seed code, posting)` pairs into a direct-addressed table.
//! One counting pass over a `4^k` key space. Stable via prefix sums.

use crate::index::Posting;

/// Group `vals` by `keys` (each `< key_space`). At most `u32::MAX` entries;
/// the builder enforces this.
///
/// Returns `(offsets, postings)` where the postings of key `c` are
/// `postings[offsets[c]..offsets[c + 1]]`, in their original relative order.
pub fn counting_sort_postings(
    keys: &[u32],
    vals: &[Posting],
    key_space: usize,
) -> (Vec<u32>, Vec<Posting>) {
    debug_assert_eq!(keys.len(), vals.len());
    debug_assert!(keys.len() <= u32::MAX as usize, "offsets are u32");
    let n = keys.len();

    // Count occurrences
    let mut offsets = vec![0u32; key_space + 1];
    for &k in keys {
        offsets[k as usize + 1] += 1;
    }

    // Prefix sums -> start positions
    for c in 1..=key_space {
        offsets[c] += offsets[c - 1];
    }

    // Scatter (stable)
    let mut cursor = offsets[..key_space].to_vec();
    let mut out = vec![Posting::default(); n];
    for i in 0..n {
        let k = keys[i] as usize;
        out[cursor[k] as usize] = vals[i];
        cursor[k] += 1;
    }

    (offsets, out)
}

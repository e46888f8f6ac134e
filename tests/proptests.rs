use proptest::prelude::*;
use sirna_offtarget::*;

const RNA: &[u8] = b"ACGU";

/// Naive scan: every start of an exact occurrence of `kmer` in `seq`.
fn naive_positions(seq: &[u8], kmer: &[u8]) -> Vec<usize> {
    if seq.len() < kmer.len() {
        return Vec::new();
    }
    (0..=seq.len() - kmer.len())
        .filter(|&i| &seq[i..i + kmer.len()] == kmer)
        .collect()
}

fn rna(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(RNA.to_vec()), len)
}

fn records(seqs: &[Vec<u8>]) -> Vec<std::io::Result<TranscriptRecord>> {
    seqs.iter()
        .enumerate()
        .map(|(i, s)| Ok(TranscriptRecord::new(format!("T{i}"), s)))
        .collect()
}

proptest! {
    #[test]
    fn prop_risk_in_unit_interval(
        delta_g in -80.0f64..5.0,
        au in 0.0f64..=100.0,
        access in 0.0f64..=1.0,
        seed_len in 0usize..=7,
        seed_frac in 0.0f64..=1.0,
    ) {
        let seed_matches = (seed_len as f64 * seed_frac) as usize;
        let r = risk_score(&RiskTerms {
            delta_g,
            au_content: au,
            accessibility: access,
            seed_matches,
            seed_len,
        });
        prop_assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn prop_energy_deterministic_and_bounded(
        guide in rna(19..24),
        target_seed in rna(23..24),
    ) {
        let target = &target_seed[..guide.len()];
        let a = binding_energy(&guide, target).unwrap();
        let b = binding_energy(&guide, target).unwrap();
        prop_assert_eq!(a.to_bits(), b.to_bits());
        prop_assert!(a <= thermo::TERMINAL_AU_PENALTY);
    }

    #[test]
    fn prop_seed_lookup_matches_scan(
        seqs in prop::collection::vec(rna(50..160), 1..5),
        pick in any::<prop::sample::Index>(),
        plant in any::<prop::sample::Index>(),
    ) {
        let mut seqs = seqs;
        let kmer = b"GCAGUGG";
        let which = pick.index(seqs.len());
        let at = plant.index(seqs[which].len() - kmer.len() + 1);
        seqs[which][at..at + kmer.len()].copy_from_slice(kmer);

        let (idx, _) = SeedIndex::build(records(&seqs)).unwrap();
        let got: Vec<(String, usize)> = idx
            .lookup_seed("GCAGUGG")
            .iter()
            .map(|h| (h.transcript_id().to_string(), h.position))
            .collect();
        let want: Vec<(String, usize)> = seqs
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                naive_positions(s, kmer).into_iter().map(move |p| (format!("T{i}"), p))
            })
            .collect();
        let planted = (format!("T{which}"), at);
        prop_assert!(got.contains(&planted));
        prop_assert_eq!(got, want);
    }

    #[test]
    fn prop_reported_candidates_obey_filters(
        guide in rna(19..24),
        seqs in prop::collection::vec(rna(50..120), 1..6),
        plant in any::<prop::sample::Index>(),
        mm in 0u8..=2,
        threshold in -30.0f64..=0.0,
        fuzzy in any::<bool>(),
    ) {
        // give the guide at least one full antiparallel site
        let mut seqs = seqs;
        let site = reverse_complement(&guide);
        let t = &mut seqs[0];
        let at = plant.index(t.len() - site.len() + 1);
        t[at..at + site.len()].copy_from_slice(&site);

        let (idx, _) = SeedIndex::build(records(&seqs)).unwrap();
        let mode = if fuzzy { SeedSearch::Hamming } else { SeedSearch::Exact };
        let params = SearchParams::default()
            .max_seed_mismatches(mm)
            .energy_threshold(threshold)
            .seed_search(mode);
        let guide = String::from_utf8(guide).unwrap();
        let a = analyze(&idx, &guide, &params).unwrap();

        prop_assert_eq!(
            a.stats.seed_hits,
            a.stats.dropped_alignment + a.stats.filtered_seed + a.stats.filtered_energy
                + a.candidates.len()
        );
        for c in &a.candidates {
            prop_assert!(c.delta_g <= threshold);
            prop_assert!(c.seed_matches.num + mm as usize >= c.seed_matches.den);
            prop_assert!((0.0..=1.0).contains(&c.risk_score));
            prop_assert!(c.alignment_coverage.num >= c.alignment_coverage.den * 8 / 10);
            let len = idx.transcript(&c.transcript_id).unwrap().len();
            prop_assert!(c.position + c.alignment_coverage.num <= len);
        }
        for w in a.candidates.windows(2) {
            prop_assert!(w[0].risk_score >= w[1].risk_score);
        }
    }
}

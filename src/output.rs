//! Result rendering: tab-separated table and JSON.

use std::io::Write;

use crate::search::{Analysis, AnalysisSummary, OffTargetCandidate};

pub const TSV_HEADER: &str = "guide\tgene_symbol\ttranscript_id\tposition\tdelta_g\trisk_score\tseed_matches\tmismatches\talignment_coverage\tau_content\tstructure_accessibility\tin_utr3";

/// One line per candidate, no alignment diagram.
pub fn write_tsv<W: Write>(w: &mut W, analysis: &Analysis, with_header: bool) -> std::io::Result<()> {
    if with_header {
        writeln!(w, "{TSV_HEADER}")?;
    }
    for c in &analysis.candidates {
        write_tsv_row(w, &analysis.guide, c)?;
    }
    Ok(())
}

fn write_tsv_row<W: Write>(w: &mut W, guide: &str, c: &OffTargetCandidate) -> std::io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{:.2}\t{:.3}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{}",
        guide,
        c.gene_symbol,
        c.transcript_id,
        c.position,
        c.delta_g,
        c.risk_score,
        c.seed_matches,
        c.mismatches,
        c.alignment_coverage,
        c.au_content,
        c.structure_accessibility,
        c.in_utr3,
    )
}

/// Full analysis as pretty JSON.
pub fn write_json<W: Write>(w: &mut W, analysis: &Analysis) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, analysis)?;
    writeln!(w)
}

/// Summary digest as pretty JSON.
pub fn write_summary_json<W: Write>(w: &mut W, summary: &AnalysisSummary) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, summary)?;
    writeln!(w)
}

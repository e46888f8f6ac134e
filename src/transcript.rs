//! Transcript records: the immutable unit of the transcriptome.

use std::ops::Range;

use crate::encode::normalize;

/// Gene symbol used when none can be recovered from the header.
pub const UNKNOWN_GENE: &str = "Unknown";

/// One `(identifier, raw sequence, optional metadata)` triple from a transcriptome source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub id: String,
    pub sequence: Vec<u8>,
    /// Free-text header description (FASTA text after the identifier).
    pub description: Option<String>,
}

impl TranscriptRecord {
    pub fn new(id: impl Into<String>, sequence: impl AsRef<[u8]>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.as_ref().to_vec(),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

impl From<bio::io::fasta::Record> for TranscriptRecord {
    fn from(rec: bio::io::fasta::Record) -> Self {
        Self {
            id: rec.id().to_string(),
            sequence: rec.seq().to_vec(),
            description: rec.desc().map(String::from),
        }
    }
}

/// Why a source record was not turned into a [`Transcript`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecordFault {
    EmptyId,
    EmptySequence,
    /// Byte that is not an IUPAC nucleotide letter (or gap).
    BadSymbol { byte: u8, pos: usize },
}

/// Normalized transcript. The sequence is upper-case RNA; it may still carry
/// IUPAC ambiguity letters, which the seed index skips over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    id: String,
    gene_symbol: String,
    sequence: String,
    utr3: Range<usize>,
}

impl Transcript {
    /// Build directly from already-trusted parts. `utr3` defaults to the whole sequence.
    pub fn new(
        id: impl Into<String>,
        gene_symbol: impl Into<String>,
        sequence: &str,
        utr3: Option<Range<usize>>,
    ) -> Self {
        let sequence = normalize(sequence);
        let len = sequence.len();
        let utr3 = clamp_utr(utr3, len);
        Self {
            id: id.into(),
            gene_symbol: gene_symbol.into(),
            sequence,
            utr3,
        }
    }

    pub(crate) fn from_record(rec: &TranscriptRecord) -> Result<Self, RecordFault> {
        let id = rec.id.trim();
        if id.is_empty() {
            return Err(RecordFault::EmptyId);
        }
        if rec.sequence.is_empty() {
            return Err(RecordFault::EmptySequence);
        }
        let mut seq = String::with_capacity(rec.sequence.len());
        for (pos, &b) in rec.sequence.iter().enumerate() {
            let up = b.to_ascii_uppercase();
            match up {
                b'T' => seq.push('U'),
                b'A' | b'C' | b'G' | b'U' | b'N' | b'R' | b'Y' | b'S' | b'W' | b'K' | b'M'
                | b'B' | b'D' | b'H' | b'V' | b'-' => seq.push(up as char),
                b'\r' | b'\n' | b' ' | b'\t' => {}
                _ => return Err(RecordFault::BadSymbol { byte: b, pos }),
            }
        }
        if seq.is_empty() {
            return Err(RecordFault::EmptySequence);
        }
        let desc = rec.description.as_deref();
        let utr3 = desc.and_then(parse_utr3);
        let len = seq.len();
        Ok(Self {
            id: id.to_string(),
            gene_symbol: desc
                .and_then(gene_symbol_from_description)
                .unwrap_or_else(|| UNKNOWN_GENE.to_string()),
            sequence: seq,
            utr3: clamp_utr(utr3, len),
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn gene_symbol(&self) -> &str {
        &self.gene_symbol
    }

    #[inline]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.sequence.as_bytes()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// 3′-UTR bounds (half-open). Whole transcript when unknown.
    #[inline]
    pub fn utr3(&self) -> Range<usize> {
        self.utr3.clone()
    }
}

fn clamp_utr(utr3: Option<Range<usize>>, len: usize) -> Range<usize> {
    match utr3 {
        Some(r) if r.start < r.end && r.start < len => r.start..r.end.min(len),
        _ => 0..len,
    }
}

/// Best-effort gene symbol from a FASTA description.
///
/// Tried in order: `gene_symbol:X` / `gene=X` tags, a RefSeq-style `(X)`,
/// then the third token of `Genus species X ...`.
pub fn gene_symbol_from_description(desc: &str) -> Option<String> {
    for tok in desc.split_whitespace() {
        for tag in ["gene_symbol:", "gene_symbol=", "gene=", "gene:"] {
            if let Some(v) = tok.strip_prefix(tag) {
                let v = v.trim_matches(|c: char| c == '[' || c == ']' || c == ',' || c == ';');
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    if let (Some(open), Some(close)) = (desc.find('('), desc.find(')')) {
        let inner = desc[open + 1..close.max(open + 1)].trim();
        if !inner.is_empty() && !inner.contains(char::is_whitespace) {
            return Some(inner.to_string());
        }
    }
    desc.split_whitespace()
        .nth(2)
        .map(|t| t.trim_end_matches(',').to_string())
        .filter(|t| !t.is_empty())
}

/// `utr3:START-END` (0-based, half-open) from a description.
fn parse_utr3(desc: &str) -> Option<Range<usize>> {
    let tok = desc
        .split_whitespace()
        .find_map(|t| t.strip_prefix("utr3:").or_else(|| t.strip_prefix("utr3=")))?;
    let (s, e) = tok.split_once('-')?;
    let start = s.parse().ok()?;
    let end = e.parse().ok()?;
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refseq_header_symbol() {
        let d = "Homo sapiens BRCA1 DNA repair associated (BRCA1), transcript variant 1, mRNA";
        assert_eq!(gene_symbol_from_description(d).as_deref(), Some("BRCA1"));
        let d = "Homo sapiens TP53 mRNA";
        assert_eq!(gene_symbol_from_description(d).as_deref(), Some("TP53"));
        assert_eq!(
            gene_symbol_from_description("cdna gene_symbol:GAPDH chromosome:1").as_deref(),
            Some("GAPDH")
        );
        assert_eq!(gene_symbol_from_description("short"), None);
    }

    #[test]
    fn record_normalization() {
        let rec = TranscriptRecord::new("NM_1", b"acgtn").with_description("x y Z utr3:1-3");
        let t = Transcript::from_record(&rec).unwrap();
        assert_eq!(t.sequence(), "ACGUN");
        assert_eq!(t.gene_symbol(), "Z");
        assert_eq!(t.utr3(), 1..3);

        let bad = TranscriptRecord::new("NM_2", b"ACG1");
        assert_eq!(
            Transcript::from_record(&bad),
            Err(RecordFault::BadSymbol { byte: b'1', pos: 3 })
        );
        assert_eq!(
            Transcript::from_record(&TranscriptRecord::new(" ", b"ACGU")),
            Err(RecordFault::EmptyId)
        );
    }
}

use sirna_offtarget::*;
use std::io::Cursor;

const GUIDE: &str = "UCCACUGCGAUGCCACUGC";
const SITE: &str = "GCAGUGGCAUCGCAGUGGA";

fn sample_index() -> SeedIndex {
    let records = vec![
        Ok(TranscriptRecord::new("NM_1", format!("{}{}AAAA", "A".repeat(30), SITE))
            .with_description("Homo sapiens ALPHA mRNA utr3:20-53")),
        Ok(TranscriptRecord::new("NM_2", format!("{}{}GCGC", "GC".repeat(15), SITE))
            .with_description("Homo sapiens BETA mRNA")),
        Ok(TranscriptRecord::new("NM_3", "ACGUN".repeat(12))),
    ];
    SeedIndex::build(records).unwrap().0
}

fn snapshot_bytes(idx: &SeedIndex) -> Vec<u8> {
    let mut buf = Vec::new();
    SnapshotWriter::new(idx).write(&mut buf).unwrap();
    buf
}

#[test]
fn snapshot_round_trip_on_disk() {
    let idx = sample_index();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx.sot");
    SnapshotWriter::new(&idx).write_to(&path).unwrap();

    let loaded = SeedIndex::open(&path).unwrap();
    assert_eq!(loaded.total_entries(), idx.total_entries());
    assert_eq!(loaded.transcripts(), idx.transcripts());
    assert_eq!(loaded.transcript("NM_1").unwrap().utr3(), 20..53);
    assert_eq!(loaded.transcript("NM_3").unwrap().gene_symbol(), UNKNOWN_GENE);

    let params = SearchParams::default();
    let before = analyze(&idx, GUIDE, &params).unwrap();
    let after = analyze(&loaded, GUIDE, &params).unwrap();
    assert_eq!(before.candidates, after.candidates);
    assert_eq!(before.stats, after.stats);
    assert_eq!(after.candidates.len(), 2);
}

#[test]
fn snapshot_output_is_deterministic() {
    let a = snapshot_bytes(&sample_index());
    let b = snapshot_bytes(&sample_index());
    assert_eq!(a, b);
    assert_eq!(&a[..4], &0x534F_5431u32.to_le_bytes());
}

#[test]
fn empty_index_round_trips() {
    let bytes = snapshot_bytes(&SeedIndex::empty());
    let loaded = SeedIndex::read_snapshot(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(loaded.total_entries(), 0);
    assert!(loaded.transcripts().is_empty());
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = snapshot_bytes(&sample_index());
    bytes[0] ^= 0xFF;
    let err = SeedIndex::read_snapshot(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, IndexError::Format(_)), "{err}");
}

#[test]
fn unsupported_version_is_rejected() {
    let mut bytes = snapshot_bytes(&sample_index());
    bytes[4] = 9;
    let err = SeedIndex::read_snapshot(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, IndexError::Format(_)));
}

#[test]
fn truncated_snapshot_is_io_error() {
    let bytes = snapshot_bytes(&sample_index());
    let cut = bytes[..bytes.len() - 3].to_vec();
    let err = SeedIndex::read_snapshot(&mut Cursor::new(cut)).unwrap_err();
    assert!(matches!(err, IndexError::Io(_)));
}

/// Header for `transcripts` records and `total` postings.
fn header(transcripts: u32, total: u64) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0x534F_5431u32.to_le_bytes());
    b.extend_from_slice(&1u32.to_le_bytes());
    b.extend_from_slice(&7u16.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    b.extend_from_slice(&transcripts.to_le_bytes());
    b.extend_from_slice(&total.to_le_bytes());
    b
}

#[test]
fn oversized_sequence_length_is_format_error() {
    let mut bytes = header(1, 0);
    bytes.extend_from_slice(&0u32.to_le_bytes()); // id
    bytes.extend_from_slice(&0u32.to_le_bytes()); // gene
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.extend_from_slice(b"ACGU");
    let err = SeedIndex::read_snapshot(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, IndexError::Format(_)), "{err}");
}

#[test]
fn oversized_posting_count_fails_on_eof() {
    let total = u32::MAX;
    let mut bytes = header(0, total as u64);
    let mut offsets = vec![0u32; 4usize.pow(7) + 1];
    *offsets.last_mut().unwrap() = total;
    for o in offsets {
        bytes.extend_from_slice(&o.to_le_bytes());
    }
    bytes.extend_from_slice(&[0u8; 16]);
    let err = SeedIndex::read_snapshot(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, IndexError::Io(_)), "{err}");
}

#[test]
fn dangling_posting_is_dropped_on_load() {
    let idx = sample_index();
    let total = idx.total_entries();
    let mut bytes = snapshot_bytes(&idx);

    // last posting: point it at a transcript that does not exist
    let at = bytes.len() - 8;
    bytes[at..at + 4].copy_from_slice(&77u32.to_le_bytes());

    let loaded = SeedIndex::read_snapshot(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(loaded.total_entries(), total - 1);
    // the rest of the table still resolves
    assert_eq!(loaded.lookup_seed("GCAGUGG").len(), idx.lookup_seed("GCAGUGG").len());
}

#[test]
fn posting_resolution_checks_bounds() {
    let idx = sample_index();
    let ok = Posting { transcript: 0, pos: 0 };
    assert_eq!(idx.resolve(ok).unwrap().transcript_id(), "NM_1");
    let past_end = Posting { transcript: 0, pos: 50 };
    assert!(matches!(
        idx.resolve(past_end),
        Err(IndexError::Integrity { ordinal: 0, position: 50 })
    ));
    let missing = Posting { transcript: 9, pos: 0 };
    assert!(idx.resolve(missing).is_err());
}

#[test]
fn fasta_file_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx.fa");
    let fasta = format!(
        ">NM_1 Homo sapiens ALPHA mRNA\n{}\n>NM_1 again\n{}\n>NM_2 short\nACGU\n",
        "ACGU".repeat(20),
        "GGCC".repeat(20)
    );
    std::fs::write(&path, fasta).unwrap();

    let (idx, report) = build_index_from_fasta(&path, &BuildConfig::default()).unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.skipped_short, 1);
    assert!(idx.transcript("NM_1").unwrap().sequence().starts_with("ACGU"));

    let missing = dir.path().join("nope.fa");
    assert!(build_index_from_fasta(&missing, &BuildConfig::default()).is_err());
}

#[cfg(feature = "async")]
#[tokio::test]
async fn async_build_and_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx.fa");
    std::fs::write(&path, format!(">NM_1 Homo sapiens ALPHA mRNA\n{}{}AAAA\n", "A".repeat(30), SITE))
        .unwrap();

    let (idx, _) = build_index_from_fasta_async(&path, BuildConfig::default()).await.unwrap();
    let handle = IndexHandle::new(idx);
    let a = analyze_async(&handle, GUIDE.to_string(), SearchParams::default())
        .await
        .unwrap();
    assert_eq!(a.candidates.len(), 1);
    assert_eq!(a.candidates[0].gene_symbol, "ALPHA");
}

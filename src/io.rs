//! Transcriptome input and the on-disk `.sot` snapshot of a built index.
//!
//! Snapshot layout (all integers little-endian):
//! header, then one record per transcript, then the `4^7 + 1` offsets
//! table (`u32`), then the postings array (`Posting`, 8 bytes each).
//! Transcript record: `id_len u32, id, gene_len u32, gene, utr3_start u64,
//! utr3_end u64, seq_len u64, seq`.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::encode::{SEED_LEN, SEED_SPACE};
use crate::index::{IndexError, Posting, SeedIndex};
use crate::transcript::{Transcript, TranscriptRecord};

pub const SOT_MAGIC: u32 = 0x53_4F_54_31; // "SOT1"
pub const SOT_VERSION: u32 = 1;

/// Longest identifier/gene string accepted when loading.
const MAX_LABEL_LEN: u32 = 1 << 16;

/// Postings read per allocation step when loading.
const POSTINGS_CHUNK: usize = 1 << 16;

/// Stream FASTA records as [`TranscriptRecord`]s.
pub fn read_fasta(
    path: &Path,
) -> std::io::Result<impl Iterator<Item = std::io::Result<TranscriptRecord>>> {
    let file = File::open(path)?;
    Ok(read_fasta_from(file))
}

/// Stream FASTA records from any reader.
pub fn read_fasta_from<R: Read>(
    reader: R,
) -> impl Iterator<Item = std::io::Result<TranscriptRecord>> {
    bio::io::fasta::Reader::new(reader)
        .records()
        .map(|r| r.map(TranscriptRecord::from))
}

#[derive(Clone, Copy, Debug, Default)]
struct FileHeader {
    magic: u32,
    version: u32,
    k: u16,
    reserved0: u16,
    transcripts: u32,
    total_entries: u64,
}

impl FileHeader {
    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LE>(self.magic)?;
        w.write_u32::<LE>(self.version)?;
        w.write_u16::<LE>(self.k)?;
        w.write_u16::<LE>(self.reserved0)?;
        w.write_u32::<LE>(self.transcripts)?;
        w.write_u64::<LE>(self.total_entries)?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        Ok(FileHeader {
            magic: r.read_u32::<LE>()?,
            version: r.read_u32::<LE>()?,
            k: r.read_u16::<LE>()?,
            reserved0: r.read_u16::<LE>()?,
            transcripts: r.read_u32::<LE>()?,
            total_entries: r.read_u64::<LE>()?,
        })
    }
}

/// Writer that serializes a [`SeedIndex`] to a `.sot` file.
pub struct SnapshotWriter<'a> {
    idx: &'a SeedIndex,
}

impl<'a> SnapshotWriter<'a> {
    pub fn new(idx: &'a SeedIndex) -> Self {
        Self { idx }
    }

    /// Serialize to disk. Output is deterministic for a given index.
    pub fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), IndexError> {
        let header = FileHeader {
            magic: SOT_MAGIC,
            version: SOT_VERSION,
            k: SEED_LEN as u16,
            reserved0: 0,
            transcripts: self.idx.transcripts().len() as u32,
            total_entries: self.idx.total_entries() as u64,
        };
        header.write_to(w)?;

        for t in self.idx.transcripts() {
            write_label(w, t.id())?;
            write_label(w, t.gene_symbol())?;
            let utr = t.utr3();
            w.write_u64::<LE>(utr.start as u64)?;
            w.write_u64::<LE>(utr.end as u64)?;
            w.write_u64::<LE>(t.len() as u64)?;
            w.write_all(t.bytes())?;
        }

        w.write_all(bytemuck::cast_slice::<u32, u8>(self.idx.offsets()))?;
        w.write_all(bytemuck::cast_slice::<Posting, u8>(self.idx.all_postings()))?;
        Ok(())
    }
}

fn write_label<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    w.write_u32::<LE>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

fn read_label<R: Read>(r: &mut R) -> Result<String, IndexError> {
    let len = r.read_u32::<LE>()?;
    if len > MAX_LABEL_LEN {
        return Err(IndexError::Format(format!("label length {len} too large")));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| IndexError::Format(format!("label: {e}")))
}

impl SeedIndex {
    /// Load a `.sot` snapshot into memory.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let file = File::open(path)?;
        Self::read_snapshot(&mut BufReader::new(file))
    }

    /// Load a snapshot from any reader.
    ///
    /// Structural damage is a [`IndexError::Format`]. Postings that point at a
    /// missing transcript are logged and dropped.
    pub fn read_snapshot<R: Read>(r: &mut R) -> Result<Self, IndexError> {
        let header = FileHeader::read_from(r)?;
        if header.magic != SOT_MAGIC {
            return Err(IndexError::Format("bad magic".into()));
        }
        if header.version != SOT_VERSION {
            return Err(IndexError::Format("unsupported version".into()));
        }
        if header.k as usize != SEED_LEN {
            return Err(IndexError::Format(format!("unsupported k={}", header.k)));
        }

        let mut transcripts = Vec::with_capacity(header.transcripts.min(1 << 20) as usize);
        for _ in 0..header.transcripts {
            let id = read_label(r)?;
            let gene = read_label(r)?;
            let utr_start = r.read_u64::<LE>()? as usize;
            let utr_end = r.read_u64::<LE>()? as usize;
            let len = r.read_u64::<LE>()?;
            // grow with the data actually present rather than the claimed length
            let mut seq = Vec::new();
            r.by_ref().take(len).read_to_end(&mut seq)?;
            if seq.len() as u64 != len {
                return Err(IndexError::Format(format!(
                    "sequence of {id}: {len} bytes declared, {} present",
                    seq.len()
                )));
            }
            let seq = String::from_utf8(seq)
                .map_err(|e| IndexError::Format(format!("sequence of {id}: {e}")))?;
            transcripts.push(Transcript::new(id, gene, &seq, Some(utr_start..utr_end)));
        }

        let mut offsets = vec![0u32; SEED_SPACE + 1];
        r.read_exact(bytemuck::cast_slice_mut::<u32, u8>(&mut offsets))?;
        if offsets.windows(2).any(|w| w[0] > w[1])
            || offsets[SEED_SPACE] as u64 != header.total_entries
        {
            return Err(IndexError::Format("offsets table inconsistent".into()));
        }

        let postings = read_postings(r, header.total_entries as usize)?;

        let (offsets, postings) = drop_dangling(&transcripts, offsets, postings);
        Ok(SeedIndex::from_parts(transcripts, offsets, postings))
    }
}

/// Read `total` postings in bounded chunks so a corrupt count fails on EOF
/// instead of allocating up front.
fn read_postings<R: Read>(r: &mut R, total: usize) -> Result<Vec<Posting>, IndexError> {
    let mut postings = Vec::new();
    while postings.len() < total {
        let start = postings.len();
        let n = (total - start).min(POSTINGS_CHUNK);
        postings.resize(start + n, Posting::default());
        r.read_exact(
            bytemuck::try_cast_slice_mut::<Posting, u8>(&mut postings[start..])
                .map_err(|e| IndexError::Cast(format!("{e:?}")))?,
        )?;
    }
    Ok(postings)
}

/// Remove postings that do not land inside a known transcript.
fn drop_dangling(
    transcripts: &[Transcript],
    offsets: Vec<u32>,
    postings: Vec<Posting>,
) -> (Vec<u32>, Vec<Posting>) {
    let valid = |p: &Posting| {
        transcripts
            .get(p.transcript as usize)
            .is_some_and(|t| p.pos as usize + SEED_LEN <= t.len())
    };
    if postings.iter().all(valid) {
        return (offsets, postings);
    }

    let mut kept_offsets = Vec::with_capacity(offsets.len());
    let mut kept = Vec::with_capacity(postings.len());
    kept_offsets.push(0u32);
    for c in 0..SEED_SPACE {
        for p in &postings[offsets[c] as usize..offsets[c + 1] as usize] {
            if valid(p) {
                kept.push(*p);
            } else {
                let e = IndexError::Integrity {
                    ordinal: p.transcript,
                    position: p.pos,
                };
                tracing::warn!(error = %e, "dropping seed entry from snapshot");
            }
        }
        kept_offsets.push(kept.len() as u32);
    }
    (kept_offsets, kept)
}

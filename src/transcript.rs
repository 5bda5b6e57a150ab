//! Gene transcript models
//!
//! The analyses only need a few things from a gene model: the chromosome
//! and strand, conversion of a CDS offset to a chromosomal position and a
//! check whether a position is coding. These are described by the
//! [`Transcript`] trait, so that any gene model can be plugged in.
//!
//! [`ExonTranscript`] is a simple implementation that is built from the
//! genomic coordinates of the CDS segments of a transcript.
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::{WeightsError, WeightsResult};

mod table;
pub use table::TranscriptTable;

/// Number of CDS segments that are stored inline before allocating
const INLINE_CDS_SEGMENTS: usize = 16;

/// The strand of the chromosome a transcript is located on
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl FromStr for Strand {
    type Err = WeightsError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "1" | "+1" => Ok(Strand::Forward),
            "-" | "-1" => Ok(Strand::Reverse),
            _ => Err(WeightsError::InvalidInput(format!("invalid strand: {s}"))),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// A gene transcript that can convert between CDS and chromosomal coordinates
///
/// CDS offsets are 0-based and count from the first base of the start codon,
/// i.e. they run against the chromosome on the reverse strand.
/// Chromosomal positions are 1-based.
pub trait Transcript {
    /// The transcript identifier, e.g. `ENST00000375048`
    fn id(&self) -> &str;

    /// The chromosome, as written in the input tables (e.g. `1` or `X`)
    fn chrom(&self) -> &str;

    fn strand(&self) -> Strand;

    /// Returns the chromosomal position of the CDS offset `cds_pos`
    ///
    /// # Errors
    ///
    /// [`WeightsError::OutOfRange`] if `cds_pos` is beyond the end of the CDS
    fn position_on_chrom(&self, cds_pos: u64) -> WeightsResult<u64>;

    /// Returns `true` if `pos` is part of the coding sequence
    fn in_coding_region(&self, pos: u64) -> bool;

    /// The chromosomal ranges of all CDS segments, in ascending order
    fn coding_ranges(&self) -> Vec<RangeInclusive<u64>>;

    /// The total length of the coding sequence
    fn cds_length(&self) -> u64 {
        self.coding_ranges()
            .iter()
            .map(|range| range.end() - range.start() + 1)
            .sum()
    }
}

/// Provides [`Transcript`]s by their identifier
///
/// Usually backed by a gene annotation service or, as in [`TranscriptTable`],
/// a table of transcript structures.
pub trait TranscriptResolver {
    type Transcript: Transcript;

    /// Returns the transcript with the given ID
    ///
    /// # Errors
    ///
    /// Implementations return an error if the transcript is unknown or
    /// cannot be built. Callers usually skip such transcripts.
    fn resolve(&self, transcript_id: &str) -> WeightsResult<Self::Transcript>;
}

/// Removes the version suffix from a transcript ID
///
/// ```
/// use mutation_weights::transcript::strip_version;
///
/// assert_eq!(strip_version("ENST00000375048.3"), "ENST00000375048");
/// assert_eq!(strip_version("ENST00000375048"), "ENST00000375048");
/// ```
pub fn strip_version(transcript_id: &str) -> &str {
    transcript_id
        .split_once('.')
        .map_or(transcript_id, |(base, _)| base)
}

/// A transcript defined by the chromosomal coordinates of its CDS segments
///
/// # Examples
///
/// ```
/// use mutation_weights::{ExonTranscript, Strand, Transcript};
///
/// let tx = ExonTranscript::new(
///     "ENST01",
///     "GENE1",
///     "1",
///     Strand::Forward,
///     [(100, 109), (200, 219)],
/// ).unwrap();
///
/// assert_eq!(tx.cds_length(), 30);
/// assert_eq!(tx.position_on_chrom(0).unwrap(), 100);
/// assert_eq!(tx.position_on_chrom(10).unwrap(), 200);
/// assert!(tx.in_coding_region(105));
/// assert!(!tx.in_coding_region(150));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExonTranscript {
    id: String,
    gene: String,
    chrom: String,
    strand: Strand,
    /// CDS segments as inclusive `(start, end)`, sorted and non-overlapping
    cds: SmallVec<[(u64, u64); INLINE_CDS_SEGMENTS]>,
}

impl ExonTranscript {
    /// Constructs a new transcript from its CDS segments
    ///
    /// The segments can be given in any order.
    ///
    /// # Errors
    ///
    /// [`WeightsError::InvalidInput`] if there are no segments, a segment
    /// ends before it starts or two segments overlap
    pub fn new<I: IntoIterator<Item = (u64, u64)>>(
        id: &str,
        gene: &str,
        chrom: &str,
        strand: Strand,
        cds: I,
    ) -> WeightsResult<Self> {
        let mut cds: SmallVec<[(u64, u64); INLINE_CDS_SEGMENTS]> = cds.into_iter().collect();
        if cds.is_empty() {
            return Err(WeightsError::InvalidInput(format!(
                "transcript {id} has no CDS"
            )));
        }
        if let Some((start, end)) = cds.iter().find(|(start, end)| start > end) {
            return Err(WeightsError::InvalidInput(format!(
                "CDS segment {start}-{end} of {id} ends before it starts"
            )));
        }
        cds.sort_unstable();
        if cds.windows(2).any(|pair| pair[0].1 >= pair[1].0) {
            return Err(WeightsError::InvalidInput(format!(
                "transcript {id} has overlapping CDS segments"
            )));
        }

        Ok(ExonTranscript {
            id: id.to_string(),
            gene: gene.to_string(),
            chrom: chrom.to_string(),
            strand,
            cds,
        })
    }

    /// The gene symbol of the transcript
    pub fn gene(&self) -> &str {
        &self.gene
    }
}

impl Transcript for ExonTranscript {
    fn id(&self) -> &str {
        &self.id
    }

    fn chrom(&self) -> &str {
        &self.chrom
    }

    fn strand(&self) -> Strand {
        self.strand
    }

    fn position_on_chrom(&self, cds_pos: u64) -> WeightsResult<u64> {
        let mut remaining = cds_pos;
        match self.strand {
            Strand::Forward => {
                for &(start, end) in &self.cds {
                    let len = end - start + 1;
                    if remaining < len {
                        return Ok(start + remaining);
                    }
                    remaining -= len;
                }
            }
            Strand::Reverse => {
                for &(start, end) in self.cds.iter().rev() {
                    let len = end - start + 1;
                    if remaining < len {
                        return Ok(end - remaining);
                    }
                    remaining -= len;
                }
            }
        }
        Err(WeightsError::OutOfRange {
            transcript: self.id.clone(),
            position: cds_pos,
        })
    }

    fn in_coding_region(&self, pos: u64) -> bool {
        let idx = self.cds.partition_point(|&(_, end)| end < pos);
        self.cds.get(idx).map_or(false, |&(start, _)| start <= pos)
    }

    fn coding_ranges(&self) -> Vec<RangeInclusive<u64>> {
        self.cds.iter().map(|&(start, end)| start..=end).collect()
    }
}

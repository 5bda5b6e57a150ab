//! Regional constraint within transcripts
//!
//! The regional constraint table splits transcripts into amino acid regions
//! and lists for each region how strongly the observed number of missense
//! variants departs from the null model (`chisq_diff_null`) and the ratio
//! of observed to expected variants (`obs_exp`).
//!
//! A region is *constrained* if the departure is significant and the
//! observed/expected ratio is at or below a threshold. [`constrained_positions`]
//! converts all constrained regions of a transcript into the set of coding
//! chromosomal positions they cover.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

use crate::parser;
use crate::transcript::{Strand, Transcript};
use crate::{WeightsError, WeightsResult, DEFAULT_RATIO_THRESHOLD, DEFAULT_SIGNIFICANCE_THRESHOLD};

pub mod classify;
pub use classify::{classify, constrained_sites, constrained_transcripts, ConstrainedSites};

/// Degrees of freedom of the chi-squared test of a region against the null model
const CHISQ_DEGREES_OF_FREEDOM: f64 = 1.0;

/// The set of chromosomal positions within the constrained regions of a transcript
pub type ConstrainedPositions = HashSet<u64>;

/// The thresholds that decide whether a region is constrained
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Maximum p-value of the departure from the null model
    pub significance: f64,
    /// Maximum observed/expected ratio
    pub ratio: f64,
}

impl Thresholds {
    pub fn new(significance: f64, ratio: f64) -> Self {
        Self {
            significance,
            ratio,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE_THRESHOLD,
            ratio: DEFAULT_RATIO_THRESHOLD,
        }
    }
}

impl Display for Thresholds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p <= {:e}, obs/exp <= {}", self.significance, self.ratio)
    }
}

/// An inclusive range of 1-based amino acid positions
///
/// # Examples
///
/// ```
/// use mutation_weights::constraint::AminoAcidRange;
///
/// let range: AminoAcidRange = "1-10".parse().unwrap();
/// assert_eq!(range.cds_offsets(), (0, 29));
///
/// assert!("10".parse::<AminoAcidRange>().is_err());
/// assert!("10-1".parse::<AminoAcidRange>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AminoAcidRange {
    start: u64,
    end: u64,
}

impl AminoAcidRange {
    /// Constructs a new range, `start` and `end` are included
    ///
    /// # Errors
    ///
    /// [`WeightsError::InvalidRegion`] if `start` is 0 or larger than `end`
    pub fn new(start: u64, end: u64) -> WeightsResult<Self> {
        if start == 0 || start > end {
            return Err(WeightsError::InvalidRegion(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// The 0-based CDS offsets of the first base of the first codon
    /// and the last base of the last codon
    pub fn cds_offsets(&self) -> (u64, u64) {
        ((self.start - 1) * 3, (self.end - 1) * 3 + 2)
    }

    /// Converts the range to chromosomal coordinates of `tx`
    ///
    /// The returned range is always ascending, also for transcripts on the
    /// reverse strand. It can contain intronic positions if the region spans
    /// an exon boundary.
    ///
    /// # Errors
    ///
    /// [`WeightsError::OutOfRange`] if the range extends beyond the CDS
    pub fn to_chrom<T: Transcript>(&self, tx: &T) -> WeightsResult<RangeInclusive<u64>> {
        let (cds_start, cds_end) = self.cds_offsets();
        let start = tx.position_on_chrom(cds_start)?;
        let end = tx.position_on_chrom(cds_end)?;
        match tx.strand() {
            Strand::Forward => Ok(start..=end),
            Strand::Reverse => Ok(end..=start),
        }
    }
}

impl FromStr for AminoAcidRange {
    type Err = WeightsError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((start, end)) = s.trim().split_once('-') else {
            return Err(WeightsError::InvalidRegion(s.to_string()));
        };
        let start = start
            .parse::<u64>()
            .map_err(|_| WeightsError::InvalidRegion(s.to_string()))?;
        let end = end
            .parse::<u64>()
            .map_err(|_| WeightsError::InvalidRegion(s.to_string()))?;
        AminoAcidRange::new(start, end)
    }
}

impl Display for AminoAcidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A single row of the regional constraint table
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConstraintRegion {
    /// HGNC symbol of the gene
    pub gene: String,
    /// Transcript ID, possibly with version suffix
    pub transcript: String,
    #[serde(rename = "chr")]
    pub chrom: String,
    /// The amino acid range of the region, e.g. `1-260`
    pub amino_acids: String,
    /// Chi-squared statistic for the departure from the null mutation model
    pub chisq_diff_null: f64,
    /// Observed/expected ratio of missense variants in the region
    pub obs_exp: f64,
}

impl ConstraintRegion {
    /// The one-sided p-value of the chi-squared statistic (1 degree of freedom)
    ///
    /// # Errors
    ///
    /// [`WeightsError::InvalidStatistic`] if the statistic is not a finite number
    pub fn p_value(&self) -> WeightsResult<f64> {
        let chi2 = ChiSquared::new(CHISQ_DEGREES_OF_FREEDOM)?;
        self.p_value_with(&chi2)
    }

    fn p_value_with(&self, chi2: &ChiSquared) -> WeightsResult<f64> {
        if !self.chisq_diff_null.is_finite() {
            return Err(WeightsError::InvalidStatistic(self.chisq_diff_null));
        }
        Ok(chi2.sf(self.chisq_diff_null))
    }

    /// A missing (`NaN`) ratio never exceeds the ratio threshold
    fn passes(&self, chi2: &ChiSquared, thresholds: &Thresholds) -> WeightsResult<bool> {
        let p_value = self.p_value_with(chi2)?;
        let above_ratio = self.obs_exp.partial_cmp(&thresholds.ratio) == Some(Ordering::Greater);
        Ok(p_value <= thresholds.significance && !above_ratio)
    }

    /// Returns `true` if the region is significantly constrained
    ///
    /// # Errors
    ///
    /// [`WeightsError::InvalidStatistic`] if the statistic is not a finite number
    pub fn is_constrained(&self, thresholds: &Thresholds) -> WeightsResult<bool> {
        let chi2 = ChiSquared::new(CHISQ_DEGREES_OF_FREEDOM)?;
        self.passes(&chi2, thresholds)
    }

    /// Parses the amino acid range of the region
    ///
    /// # Errors
    ///
    /// [`WeightsError::InvalidRegion`] if the range is malformed
    pub fn amino_acid_range(&self) -> WeightsResult<AminoAcidRange> {
        self.amino_acids.parse()
    }
}

/// Returns all coding positions of `tx` within constrained regions
///
/// A region is constrained if the p-value of its chi-squared statistic is at most
/// `thresholds.significance` and its observed/expected ratio is at most
/// `thresholds.ratio`. The amino acid range of each constrained region is
/// converted to chromosomal coordinates and every position in it that is
/// part of the coding sequence is included.
///
/// # Errors
///
/// - [`WeightsError::InvalidStatistic`]: a region has a non-finite statistic
/// - [`WeightsError::InvalidRegion`]: a constrained region has a malformed range
/// - [`WeightsError::OutOfRange`]: a constrained region extends beyond the CDS
///
/// # Examples
///
/// ```
/// use mutation_weights::{constrained_positions, ConstraintRegion, ExonTranscript, Strand, Thresholds};
///
/// let tx = ExonTranscript::new("ENST01", "GENE1", "1", Strand::Forward, [(101, 115), (201, 215)]).unwrap();
/// let region = ConstraintRegion {
///     gene: "GENE1".to_string(),
///     transcript: "ENST01.1".to_string(),
///     chrom: "1".to_string(),
///     amino_acids: "5-6".to_string(),
///     chisq_diff_null: 30.0,
///     obs_exp: 0.2,
/// };
///
/// let positions = constrained_positions(&tx, [&region], &Thresholds::default()).unwrap();
/// // codons 5 and 6 span the intron between both CDS segments
/// let mut positions: Vec<u64> = positions.into_iter().collect();
/// positions.sort_unstable();
/// assert_eq!(positions, vec![113, 114, 115, 201, 202, 203]);
/// ```
pub fn constrained_positions<'a, T, I>(
    tx: &T,
    regions: I,
    thresholds: &Thresholds,
) -> WeightsResult<ConstrainedPositions>
where
    T: Transcript,
    I: IntoIterator<Item = &'a ConstraintRegion>,
{
    let chi2 = ChiSquared::new(CHISQ_DEGREES_OF_FREEDOM)?;

    let intervals = regions
        .into_iter()
        .filter_map(|region| match region.passes(&chi2, thresholds) {
            Ok(true) => Some(
                region
                    .amino_acid_range()
                    .and_then(|range| range.to_chrom(tx)),
            ),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        })
        .collect::<WeightsResult<Vec<RangeInclusive<u64>>>>()?;

    let positions: ConstrainedPositions = intervals
        .into_iter()
        .flat_map(|interval| interval.filter(|pos| tx.in_coding_region(*pos)))
        .collect();

    debug!(
        "{}: {} constrained positions ({})",
        tx.id(),
        positions.len(),
        thresholds
    );
    Ok(positions)
}

/// All rows of the regional constraint table
///
/// Rows are kept in their original order and are indexed
/// by transcript ID and gene symbol.
#[derive(Debug, Default, Clone)]
pub struct ConstraintTable {
    regions: Vec<ConstraintRegion>,
    transcripts: BTreeMap<String, Vec<usize>>,
}

impl ConstraintTable {
    /// Builds a `ConstraintTable` from its rows
    pub fn new(regions: Vec<ConstraintRegion>) -> Self {
        let mut transcripts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, region) in regions.iter().enumerate() {
            transcripts
                .entry(region.transcript.clone())
                .or_default()
                .push(idx);
        }
        Self {
            regions,
            transcripts,
        }
    }

    /// Loads the (optionally gzipped) regional constraint table
    ///
    /// # Errors
    ///
    /// - [`WeightsError::CannotOpenFile`]: the file does not exist
    /// - [`WeightsError::Csv`]: the file is not a valid constraint table
    pub fn from_file<P: AsRef<Path>>(path: P) -> WeightsResult<Self> {
        Ok(Self::new(parser::constraint::parse(path)?))
    }

    /// Iterates the regions grouped by transcript, ordered by transcript ID
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec<&ConstraintRegion>)> {
        self.transcripts.iter().map(|(transcript, rows)| {
            (
                transcript.as_str(),
                rows.iter().map(|idx| &self.regions[*idx]).collect(),
            )
        })
    }

    /// All regions of a gene, in the order of the table
    pub fn gene_regions(&self, symbol: &str) -> Vec<&ConstraintRegion> {
        self.regions
            .iter()
            .filter(|region| region.gene == symbol)
            .collect()
    }

    /// The symbols of all genes in the table
    pub fn genes(&self) -> HashSet<&str> {
        self.regions.iter().map(|region| region.gene.as_str()).collect()
    }

    /// The number of transcripts in the table
    pub fn transcript_count(&self) -> usize {
        self.transcripts.len()
    }

    /// The number of rows in the table
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

//! Per-site mutation rates
//!
//! A [`SiteRate`] is the probability of one specific SNV at one site of a
//! gene. Rates come from a sequence-context mutation model, which is
//! represented by the [`SiteRateModel`] trait. [`RateTable`] implements the
//! trait with a precomputed table of per-site rates.
//!
//! - [`assembly`] collects the site rates across all transcripts of a gene
//! - [`gene`] sums the site rates per gene, in and outside constrained regions
//! - [`expected`] scales rates to the expected number of mutations in the cohort
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser;
use crate::transcript::Transcript;
use crate::WeightsResult;

pub mod assembly;
pub mod expected;
pub mod gene;

/// Number of intronic bases next to each CDS segment that carry splice site rates
pub const SPLICE_PADDING: u64 = 8;

/// The consequence of an SNV at a site
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteConsequence {
    Nonsense,
    Missense,
    Synonymous,
    SpliceLof,
    SpliceRegion,
}

impl SiteConsequence {
    pub const ALL: [SiteConsequence; 5] = [
        SiteConsequence::Nonsense,
        SiteConsequence::Missense,
        SiteConsequence::Synonymous,
        SiteConsequence::SpliceLof,
        SiteConsequence::SpliceRegion,
    ];

    /// Returns `true` for consequences that truncate the protein
    pub fn is_truncating(&self) -> bool {
        matches!(self, SiteConsequence::Nonsense | SiteConsequence::SpliceLof)
    }
}

impl Display for SiteConsequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SiteConsequence::Nonsense => "nonsense",
            SiteConsequence::Missense => "missense",
            SiteConsequence::Synonymous => "synonymous",
            SiteConsequence::SpliceLof => "splice_lof",
            SiteConsequence::SpliceRegion => "splice_region",
        };
        write!(f, "{name}")
    }
}

/// The mutation probability of a single SNV
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SiteRate {
    /// HGNC symbol of the gene
    pub symbol: String,
    pub chrom: String,
    pub pos: u64,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    pub alt: String,
    pub cq: SiteConsequence,
    pub prob: f64,
}

/// A sequence-context mutation model
pub trait SiteRateModel {
    /// Returns the rates of all possible SNVs within the coding region
    /// (and splice sites) of `tx`
    ///
    /// Sites within any of the `masked` ranges are left out. The `symbol`
    /// of the returned rates is not necessarily set.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the rates cannot be calculated
    fn site_rates<T: Transcript>(
        &self,
        tx: &T,
        masked: &[RangeInclusive<u64>],
    ) -> WeightsResult<Vec<SiteRate>>;
}

/// A table of precomputed per-site mutation rates
///
/// Duplicated sites (same `chrom`, `pos` and `alt`) are removed when the
/// table is built, only the first one is kept. Rates are sorted by
/// `symbol`, `chrom` and `pos`.
#[derive(Debug, Default, Clone)]
pub struct RateTable {
    rates: Vec<SiteRate>,
    /// Indices into `rates` for each chromosome, sorted by position
    chroms: HashMap<String, Vec<usize>>,
}

impl RateTable {
    /// Builds a `RateTable`, removing duplicated sites
    pub fn new(rates: Vec<SiteRate>) -> Self {
        let total = rates.len();
        let mut seen: HashSet<(String, u64, String)> = HashSet::with_capacity(total);
        let mut rates: Vec<SiteRate> = rates
            .into_iter()
            .filter(|site| seen.insert((site.chrom.clone(), site.pos, site.alt.clone())))
            .collect();
        if rates.len() < total {
            debug!("Removed {} duplicated sites", total - rates.len());
        }
        rates.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.chrom.cmp(&b.chrom))
                .then_with(|| a.pos.cmp(&b.pos))
        });

        let mut chroms: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, site) in rates.iter().enumerate() {
            chroms.entry(site.chrom.clone()).or_default().push(idx);
        }
        for index in chroms.values_mut() {
            index.sort_by_key(|idx| rates[*idx].pos);
        }

        Self { rates, chroms }
    }

    /// Loads a (optionally gzipped) table of per-site rates
    ///
    /// # Errors
    ///
    /// - [`crate::WeightsError::CannotOpenFile`]: the file does not exist
    /// - [`crate::WeightsError::Csv`]: the file is not a valid rate table
    pub fn from_file<P: AsRef<Path>>(path: P) -> WeightsResult<Self> {
        Ok(Self::new(parser::rates::parse(path)?))
    }

    /// All rates, sorted by `symbol`, `chrom` and `pos`
    pub fn rates(&self) -> &[SiteRate] {
        &self.rates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SiteRate> {
        self.rates.iter()
    }

    /// The symbols of all genes in the table
    pub fn symbols(&self) -> BTreeSet<&str> {
        self.rates.iter().map(|site| site.symbol.as_str()).collect()
    }

    /// All rates on `chrom` within `range`, ordered by position
    pub fn chrom_rates(&self, chrom: &str, range: RangeInclusive<u64>) -> Vec<&SiteRate> {
        let Some(index) = self.chroms.get(chrom) else {
            return Vec::new();
        };
        let lower = index.partition_point(|idx| self.rates[*idx].pos < *range.start());
        let upper = index.partition_point(|idx| self.rates[*idx].pos <= *range.end());
        if lower >= upper {
            return Vec::new();
        }
        index[lower..upper]
            .iter()
            .map(|idx| &self.rates[*idx])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// The coding ranges of `tx`, extended by [`SPLICE_PADDING`] on both sides
pub(crate) fn padded_ranges<T: Transcript>(tx: &T) -> Vec<RangeInclusive<u64>> {
    tx.coding_ranges()
        .into_iter()
        .map(|range| range.start().saturating_sub(SPLICE_PADDING)..=range.end() + SPLICE_PADDING)
        .collect()
}

impl SiteRateModel for RateTable {
    /// Selects the rates on the chromosome of `tx` within its CDS segments,
    /// padded by [`SPLICE_PADDING`] bases on each side
    fn site_rates<T: Transcript>(
        &self,
        tx: &T,
        masked: &[RangeInclusive<u64>],
    ) -> WeightsResult<Vec<SiteRate>> {
        let padded = padded_ranges(tx);
        let (Some(first), Some(last)) = (padded.first(), padded.last()) else {
            return Ok(Vec::new());
        };

        Ok(self
            .chrom_rates(tx.chrom(), *first.start()..=*last.end())
            .into_iter()
            .filter(|site| padded.iter().any(|range| range.contains(&site.pos)))
            .filter(|site| !masked.iter().any(|range| range.contains(&site.pos)))
            .cloned()
            .collect())
    }
}

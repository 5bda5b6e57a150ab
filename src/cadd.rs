//! Enrichment of de novos by CADD pathogenicity score
//!
//! To calibrate weights for missense variants, the per-site mutation rates
//! of all dominant genes are merged with the CADD score of each SNV. The
//! missense sites are then binned by their score and the number of observed
//! de novos in each bin is compared to the summed expected rates.
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constraint::{constrained_positions, ConstrainedPositions, ConstraintTable, Thresholds};
use crate::parser;
use crate::rates::{SiteConsequence, SiteRate};
use crate::transcript::TranscriptResolver;
use crate::utils::{contiguous_blocks, f64_from_usize};
use crate::variants::{ConsequenceClass, DeNovo};
use crate::{WeightsError, WeightsResult};

/// Width of the score bins
pub const SCORE_BIN_WIDTH: f64 = 5.0;
/// Lower bound of the highest score bin
pub const SCORE_BIN_LAST: f64 = 35.0;

/// Constraint thresholds that are used to annotate scored sites
pub const ANNOTATION_THRESHOLDS: Thresholds = Thresholds {
    significance: 1e-3,
    ratio: 0.4,
};

/// The CADD score of a single SNV
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CaddScore {
    pub chrom: String,
    pub pos: u64,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    pub alt: String,
    /// The raw CADD score
    pub raw: f64,
    /// The PHRED-scaled CADD score
    pub score: f64,
}

/// A site with its expected rate, CADD score and constraint status
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredSite {
    pub rate: SiteRate,
    /// `None` if the site has no CADD score
    pub raw: Option<f64>,
    /// `None` if the site has no CADD score
    pub score: Option<f64>,
    pub constrained: bool,
}

/// Left join of site rates with CADD scores on chromosome, position and alleles
///
/// Every site is kept, sites without a matching score get `None`.
/// If a SNV has several scores, the first one is used.
pub fn merge_rates_and_cadd(sites: Vec<SiteRate>, scores: &[CaddScore]) -> Vec<ScoredSite> {
    let mut lookup: HashMap<(&str, u64, &str, &str), &CaddScore> = HashMap::with_capacity(scores.len());
    for score in scores {
        lookup
            .entry((
                score.chrom.as_str(),
                score.pos,
                score.ref_allele.as_str(),
                score.alt.as_str(),
            ))
            .or_insert(score);
    }

    let scored: Vec<ScoredSite> = sites
        .into_iter()
        .map(|rate| {
            let score = lookup
                .get(&(rate.chrom.as_str(), rate.pos, rate.ref_allele.as_str(), rate.alt.as_str()))
                .copied();
            ScoredSite {
                raw: score.map(|s| s.raw),
                score: score.map(|s| s.score),
                constrained: false,
                rate,
            }
        })
        .collect();
    debug!(
        "{} of {} sites have a CADD score",
        scored.iter().filter(|site| site.score.is_some()).count(),
        scored.len()
    );
    scored
}

/// Marks all sites that are located in a constrained region of their gene
///
/// The constrained positions of a gene are taken from the first transcript
/// listed for the gene in `table`, using all constraint rows of the gene.
/// Genes that are not in the table, or whose transcript cannot be resolved,
/// have no constrained sites.
///
/// # Errors
///
/// Returns an error if a constrained region cannot be converted to
/// positions of the transcript
pub fn annotate_constraint<R: TranscriptResolver>(
    sites: &mut [ScoredSite],
    table: &ConstraintTable,
    resolver: &R,
    thresholds: &Thresholds,
) -> WeightsResult<()> {
    let symbols: HashSet<String> = sites.iter().map(|site| site.rate.symbol.clone()).collect();

    let mut constrained: HashMap<String, ConstrainedPositions> = HashMap::new();
    for symbol in symbols {
        let regions = table.gene_regions(&symbol);
        let Some(first) = regions.first() else {
            continue;
        };
        let tx = match resolver.resolve(&first.transcript) {
            Ok(tx) => tx,
            Err(err) => {
                warn!("Skipping constraint of {}: {}", symbol, err);
                continue;
            }
        };
        let positions = constrained_positions(&tx, regions.iter().copied(), thresholds)?;
        constrained.insert(symbol, positions);
    }

    for site in sites.iter_mut() {
        site.constrained = constrained
            .get(&site.rate.symbol)
            .map_or(false, |positions| positions.contains(&site.rate.pos));
    }
    info!(
        "{} of {} sites are constrained ({})",
        sites.iter().filter(|site| site.constrained).count(),
        sites.len(),
        thresholds
    );
    Ok(())
}

/// Subsets of sites that are analysed separately
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Partition {
    All,
    Constrained,
    Unconstrained,
}

impl Partition {
    pub const ALL: [Partition; 3] = [
        Partition::All,
        Partition::Constrained,
        Partition::Unconstrained,
    ];

    pub fn includes(&self, site: &ScoredSite) -> bool {
        match self {
            Partition::All => true,
            Partition::Constrained => site.constrained,
            Partition::Unconstrained => !site.constrained,
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::All => write!(f, "all"),
            Partition::Constrained => write!(f, "constrained"),
            Partition::Unconstrained => write!(f, "unconstrained"),
        }
    }
}

/// The enrichment of de novos within a range of CADD scores
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreBin {
    /// Lowest score of the bin (inclusive)
    pub min: f64,
    /// Highest score of the bin (exclusive), `None` if unbounded
    pub max: Option<f64>,
    /// Observed / expected de novos
    pub ratio: f64,
    /// Number of sites in the bin
    pub sites: usize,
}

/// Compares the observed de novos at sites within a score range to the
/// expected number of mutations at those sites
///
/// Sites with `min <= score < max` are selected, sites without a score are
/// never selected. The observed count is the number of distinct de novo
/// `(chrom, pos, alt)` among the selected sites.
///
/// # Errors
///
/// [`WeightsError::ZeroExpected`] if the summed rate of the selected sites is zero
pub fn score_bin_enrichment<'a, I>(
    sites: I,
    de_novos: &[DeNovo],
    min: f64,
    max: Option<f64>,
) -> WeightsResult<ScoreBin>
where
    I: IntoIterator<Item = &'a ScoredSite>,
{
    let selected: Vec<&ScoredSite> = sites
        .into_iter()
        .filter(|site| match site.score {
            Some(score) => score >= min && max.map_or(true, |max| score < max),
            None => false,
        })
        .collect();

    let expected: f64 = selected.iter().map(|site| site.rate.prob).sum();
    if expected == 0.0 {
        return Err(WeightsError::ZeroExpected(format!(
            "CADD scores {min}-{}",
            max.map_or("".to_string(), |max| max.to_string())
        )));
    }

    let keys: HashSet<(&str, u64, &str)> = selected
        .iter()
        .map(|site| (site.rate.chrom.as_str(), site.rate.pos, site.rate.alt.as_str()))
        .collect();
    let observed = de_novos
        .iter()
        .map(|variant| (variant.chrom.as_str(), variant.start_pos, variant.alt_allele.as_str()))
        .collect::<HashSet<_>>()
        .intersection(&keys)
        .count();

    Ok(ScoreBin {
        min,
        max,
        ratio: f64_from_usize(observed) / expected,
        sites: selected.len(),
    })
}

/// Calculates the enrichment in consecutive score bins of [`SCORE_BIN_WIDTH`],
/// starting at 0 up to the bin starting at [`SCORE_BIN_LAST`]
///
/// # Errors
///
/// [`WeightsError::ZeroExpected`] if a bin has no expected mutations
pub fn score_bins(sites: &[&ScoredSite], de_novos: &[DeNovo]) -> WeightsResult<Vec<ScoreBin>> {
    let mut bins = Vec::new();
    let mut min = 0.0;
    while min <= SCORE_BIN_LAST {
        bins.push(score_bin_enrichment(
            sites.iter().copied(),
            de_novos,
            min,
            Some(min + SCORE_BIN_WIDTH),
        )?);
        min += SCORE_BIN_WIDTH;
    }
    Ok(bins)
}

/// The cumulative proportion of each count of the total
///
/// All proportions are 0 if the total is 0.
///
/// ```
/// use mutation_weights::cadd::cumulative_proportions;
///
/// assert_eq!(cumulative_proportions(&[1, 1, 2]), vec![0.25, 0.5, 1.0]);
/// assert_eq!(cumulative_proportions(&[0, 0]), vec![0.0, 0.0]);
/// ```
pub fn cumulative_proportions(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    let total = f64_from_usize(total);
    counts
        .iter()
        .scan(0usize, |running, count| {
            *running += count;
            Some(f64_from_usize(*running) / total)
        })
        .collect()
}

/// The enrichment of loss-of-function de novos in `genes` over the
/// expected rate of all truncating sites
///
/// # Errors
///
/// [`WeightsError::ZeroExpected`] if the truncating sites have no expected mutations
pub fn ptv_site_enrichment<S>(
    de_novos: &[DeNovo],
    genes: &HashSet<S>,
    sites: &[SiteRate],
) -> WeightsResult<f64>
where
    S: Hash + Eq + Borrow<str>,
{
    let observed = de_novos
        .iter()
        .filter(|variant| genes.contains(variant.hgnc.as_str()))
        .filter(|variant| {
            ConsequenceClass::from_consequence(&variant.consequence) == Some(ConsequenceClass::Lof)
        })
        .count();
    let expected: f64 = sites
        .iter()
        .filter(|site| site.cq.is_truncating())
        .map(|site| site.prob)
        .sum();
    if expected == 0.0 {
        return Err(WeightsError::ZeroExpected("PTV sites".to_string()));
    }
    Ok(f64_from_usize(observed) / expected)
}

/// Score bins of the missense sites of every [`Partition`]
///
/// # Errors
///
/// See [`score_bins`]
pub fn missense_score_bins(
    sites: &[ScoredSite],
    de_novos: &[DeNovo],
) -> WeightsResult<BTreeMap<Partition, Vec<ScoreBin>>> {
    Partition::ALL
        .iter()
        .map(|partition| {
            let missense: Vec<&ScoredSite> = sites
                .iter()
                .filter(|site| site.rate.cq == SiteConsequence::Missense)
                .filter(|site| partition.includes(site))
                .collect();
            Ok((*partition, score_bins(&missense, de_novos)?))
        })
        .collect()
}

/// Loads the CADD scores of all sites from a genome-wide CADD release
///
/// The positions of the sites are grouped into contiguous blocks per
/// chromosome, only scores within those blocks are kept.
///
/// # Errors
///
/// Returns an error if the release cannot be opened or contains invalid lines
pub fn release_scores<P: AsRef<Path>>(path: P, sites: &[SiteRate]) -> WeightsResult<Vec<CaddScore>> {
    let mut positions: HashMap<&str, Vec<u64>> = HashMap::new();
    for site in sites {
        positions.entry(site.chrom.as_str()).or_default().push(site.pos);
    }
    let blocks: HashMap<&str, Vec<RangeInclusive<u64>>> = positions
        .into_iter()
        .map(|(chrom, positions)| (chrom, contiguous_blocks(positions)))
        .collect();
    debug!(
        "Searching {} blocks",
        blocks.values().map(Vec::len).sum::<usize>()
    );

    parser::cadd::filter_release(path, |chrom, pos| {
        blocks.get(chrom).map_or(false, |blocks| {
            let idx = blocks.partition_point(|block| *block.end() < pos);
            blocks.get(idx).map_or(false, |block| block.contains(&pos))
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constraint::test::region;
    use crate::rates::test::site;
    use crate::variants::test::de_novo;
    use crate::{ExonTranscript, Strand, TranscriptTable};

    fn cadd(chrom: &str, pos: u64, alt: &str, score: f64) -> CaddScore {
        CaddScore {
            chrom: chrom.to_string(),
            pos,
            ref_allele: "A".to_string(),
            alt: alt.to_string(),
            raw: score / 10.0,
            score,
        }
    }

    fn scored(pos: u64, score: Option<f64>, prob: f64) -> ScoredSite {
        ScoredSite {
            rate: site("GENE1", "1", pos, "G", SiteConsequence::Missense, prob),
            raw: None,
            score,
            constrained: false,
        }
    }

    #[test]
    fn left_join() {
        let sites = vec![
            site("GENE1", "1", 100, "G", SiteConsequence::Missense, 1.0),
            site("GENE1", "1", 100, "T", SiteConsequence::Missense, 1.0),
            site("GENE1", "1", 101, "G", SiteConsequence::Missense, 1.0),
        ];
        let scores = vec![cadd("1", 100, "G", 12.0), cadd("1", 100, "G", 30.0), cadd("1", 101, "G", 25.0)];
        let merged = merge_rates_and_cadd(sites, &scores);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].score, Some(12.0));
        assert_eq!(merged[1].score, None);
        assert_eq!(merged[2].score, Some(25.0));
    }

    #[test]
    fn bin_enrichment() {
        let sites = vec![
            scored(100, Some(4.9), 1.0),
            scored(101, Some(5.0), 2.0),
            scored(102, Some(9.99), 2.0),
            scored(103, Some(10.0), 8.0),
            scored(104, None, 8.0),
        ];
        let mut variants = vec![de_novo("1", 101, "missense_variant"), de_novo("1", 102, "missense_variant")];
        // the same SNV in another proband is only counted once
        variants.push(de_novo("1", 101, "missense_variant"));

        let bin = score_bin_enrichment(&sites, &variants, 5.0, Some(10.0)).unwrap();
        assert_eq!(bin.sites, 2);
        assert!((bin.ratio - 0.5).abs() < f64::EPSILON);

        let open = score_bin_enrichment(&sites, &variants, 0.0, None).unwrap();
        assert_eq!(open.sites, 4);

        assert!(matches!(
            score_bin_enrichment(&sites, &variants, 20.0, Some(25.0)),
            Err(WeightsError::ZeroExpected(_))
        ));
    }

    #[test]
    fn all_bins() {
        let sites: Vec<ScoredSite> = (0..40)
            .map(|score| scored(100 + score, Some(score as f64), 1.0))
            .collect();
        let refs: Vec<&ScoredSite> = sites.iter().collect();
        let bins = score_bins(&refs, &[]).unwrap();
        assert_eq!(bins.len(), 8);
        assert!(bins.iter().all(|bin| bin.sites == 5));
        assert_eq!(bins[7].max, Some(40.0));

        let counts: Vec<usize> = bins.iter().map(|bin| bin.sites).collect();
        let cdf = cumulative_proportions(&counts);
        assert!((cdf[3] - 0.5).abs() < f64::EPSILON);
        assert!((cdf[7] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn annotate_first_transcript() {
        let resolver = TranscriptTable::from_transcripts([ExonTranscript::new(
            "ENST01",
            "GENE1",
            "1",
            Strand::Forward,
            [(1001, 1030)],
        )
        .unwrap()]);
        let table = ConstraintTable::new(vec![region("ENST01.1", "1-2", 50.0, 0.1)]);
        let mut sites = vec![scored(1001, Some(20.0), 1.0), scored(1010, Some(20.0), 1.0)];
        let mut other = scored(1001, None, 1.0);
        other.rate.symbol = "GENE2".to_string();
        sites.push(other);

        annotate_constraint(&mut sites, &table, &resolver, &ANNOTATION_THRESHOLDS).unwrap();
        let flags: Vec<bool> = sites.iter().map(|site| site.constrained).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn ptv_enrichment() {
        let sites = vec![
            site("GENE1", "1", 100, "T", SiteConsequence::Nonsense, 1.0),
            site("GENE1", "1", 101, "T", SiteConsequence::SpliceLof, 1.0),
            site("GENE1", "1", 102, "T", SiteConsequence::Missense, 5.0),
        ];
        let genes: HashSet<String> = ["GENE1".to_string()].into_iter().collect();
        let variants = vec![
            de_novo("1", 100, "stop_gained"),
            de_novo("1", 102, "missense_variant"),
        ];
        let ratio = ptv_site_enrichment(&variants, &genes, &sites).unwrap();
        assert!((ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn partitions() {
        let mut sites = vec![scored(1, Some(1.0), 1.0), scored(2, Some(2.0), 1.0)];
        sites[0].constrained = true;
        assert!(Partition::Constrained.includes(&sites[0]));
        assert!(!Partition::Constrained.includes(&sites[1]));
        assert!(Partition::All.includes(&sites[1]));
        assert_eq!(Partition::Unconstrained.to_string(), "unconstrained");
    }
}

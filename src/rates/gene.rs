//! Mutation rates summed per gene
use tracing::{debug, info};

use crate::constraint::{constrained_transcripts, ConstraintTable, Thresholds};
use crate::rates::{SiteConsequence, SiteRateModel};
use crate::transcript::{Transcript, TranscriptResolver};
use crate::utils::f64_from_u64;
use crate::WeightsResult;

/// Frameshift rates are approximated as this multiple of the nonsense rate
pub const FRAMESHIFT_MULTIPLIER: f64 = 1.25;

/// The summed mutation rates of a gene, by consequence
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneRates {
    pub symbol: String,
    pub chrom: String,
    /// Length of the coding sequence
    pub length: u64,
    pub syn: f64,
    pub mis: f64,
    pub non: f64,
    pub splice_site: f64,
    pub splice_region: f64,
    /// Approximated by [`include_indel_rates`]
    pub frameshift: f64,
}

impl GeneRates {
    /// Constructs new `GeneRates` with all rates at zero
    pub fn new(symbol: &str, chrom: &str, length: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            chrom: chrom.to_string(),
            length,
            ..Default::default()
        }
    }

    /// Adds the probability of a site
    pub fn add(&mut self, cq: SiteConsequence, prob: f64) {
        match cq {
            SiteConsequence::Synonymous => self.syn += prob,
            SiteConsequence::Missense => self.mis += prob,
            SiteConsequence::Nonsense => self.non += prob,
            SiteConsequence::SpliceLof => self.splice_site += prob,
            SiteConsequence::SpliceRegion => self.splice_region += prob,
        }
    }
}

/// Approximates the frameshift rate of every gene
///
/// The frameshift rate of a gene is its share of the total coding length
/// times the total nonsense rate times [`FRAMESHIFT_MULTIPLIER`].
/// If the total coding length is zero, the frameshift rates are left unchanged.
///
/// ```
/// use mutation_weights::rates::gene::{include_indel_rates, GeneRates};
///
/// let mut a = GeneRates::new("A", "1", 100);
/// a.non = 2.0;
/// let mut b = GeneRates::new("B", "1", 300);
/// b.non = 6.0;
/// let mut genes = vec![a, b];
///
/// include_indel_rates(&mut genes);
/// assert!((genes[0].frameshift - 2.5).abs() < 1e-12);
/// assert!((genes[1].frameshift - 7.5).abs() < 1e-12);
/// ```
pub fn include_indel_rates(genes: &mut [GeneRates]) {
    let nonsense: f64 = genes.iter().map(|gene| gene.non).sum();
    let length: u64 = genes.iter().map(|gene| gene.length).sum();
    if length == 0 {
        return;
    }
    let length = f64_from_u64(length);
    for gene in genes.iter_mut() {
        gene.frameshift = f64_from_u64(gene.length) / length * nonsense * FRAMESHIFT_MULTIPLIER;
    }
}

/// Gene rates split into constrained and unconstrained parts of each gene
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionRates {
    pub constrained: Vec<GeneRates>,
    pub unconstrained: Vec<GeneRates>,
}

/// Sums the site rates of every transcript in `table`, separately for sites
/// inside and outside of constrained regions
///
/// Both lists contain one entry per resolved transcript, in the same order.
/// Transcripts that can't be resolved are skipped with a warning.
///
/// # Errors
///
/// Returns an error if a constrained region cannot be converted to
/// positions of its transcript, or if the [`SiteRateModel`] fails
pub fn rates_by_constraint<R, M>(
    table: &ConstraintTable,
    resolver: &R,
    model: &M,
    thresholds: &Thresholds,
) -> WeightsResult<RegionRates>
where
    R: TranscriptResolver,
    M: SiteRateModel,
{
    let mut rates = RegionRates::default();
    for constrained in constrained_transcripts(table, resolver, thresholds)? {
        let tx = &constrained.transcript;
        let Some(first) = constrained.regions.first() else {
            continue;
        };

        let mut inside = GeneRates::new(&first.gene, &first.chrom, tx.cds_length());
        let mut outside = inside.clone();
        for site in model.site_rates(tx, &[])? {
            if constrained.positions.contains(&site.pos) {
                inside.add(site.cq, site.prob);
            } else {
                outside.add(site.cq, site.prob);
            }
        }
        debug!(
            "{} {}: constrained mis={:e} unconstrained mis={:e}",
            first.gene,
            tx.id(),
            inside.mis,
            outside.mis
        );
        rates.constrained.push(inside);
        rates.unconstrained.push(outside);
    }
    info!(
        "Rates for {} transcripts ({})",
        rates.constrained.len(),
        thresholds
    );
    Ok(rates)
}

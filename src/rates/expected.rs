//! Expected numbers of de novo mutations in the cohort
//!
//! Mutation rates are per haploid genome and generation. Each proband
//! transmits two autosomal copies, so the expected number of mutations in
//! autosomal genes is the rate times `2 * (male + female)`.
//!
//! The non-pseudoautosomal part of chrX is transmitted less often (only
//! once to male probands) and, because of the higher mutation rate in the
//! male germline, at a different rate by fathers and mothers. Rates on
//! chrX are corrected by [`Cohort::x_factor`].
use std::path::Path;

use crate::parser;
use crate::rates::gene::GeneRates;
use crate::rates::SiteRate;
use crate::stats::{CountTable, GeneCounts};
use crate::utils::f64_from_u64;
use crate::WeightsResult;

/// Ratio of the paternal to the maternal mutation rate
pub const ALPHA: f64 = 3.4;

/// Missense indel rates are approximated as the frameshift rate divided by this
pub const MISSENSE_INDEL_DIVISOR: f64 = 9.0;

/// Returns `true` for the X chromosome
///
/// ```
/// use mutation_weights::rates::expected::is_x_chrom;
///
/// assert!(is_x_chrom("X"));
/// assert!(is_x_chrom("chrX"));
/// assert!(!is_x_chrom("1"));
/// ```
pub fn is_x_chrom(chrom: &str) -> bool {
    matches!(chrom, "X" | "chrX")
}

/// The number of male and female probands of the cohort
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cohort {
    pub male: u64,
    pub female: u64,
}

impl Cohort {
    pub fn new(male: u64, female: u64) -> Self {
        Self { male, female }
    }

    /// Counts the probands of the trios in the cohort
    ///
    /// # Errors
    ///
    /// Returns an error if one of the tables cannot be opened or parsed
    pub fn from_files<P: AsRef<Path>>(trios_path: P, families_path: P) -> WeightsResult<Self> {
        parser::trios::count(trios_path, families_path)
    }

    pub fn probands(&self) -> u64 {
        self.male + self.female
    }

    /// The number of transmitted autosomal copies
    pub fn autosomal(&self) -> f64 {
        2.0 * f64_from_u64(self.probands())
    }

    /// The correction factor of rates on chrX relative to autosomal rates
    ///
    /// A cohort without probands has no transmissions to correct and gives 1.
    ///
    /// ```
    /// use mutation_weights::Cohort;
    ///
    /// let cohort = Cohort::new(1, 1);
    /// assert!((cohort.x_factor() - 0.613_636_363_6).abs() < 1e-9);
    /// ```
    pub fn x_factor(&self) -> f64 {
        if self.probands() == 0 {
            return 1.0;
        }
        let female_transmit = f64_from_u64(self.probands());
        let male_transmit = f64_from_u64(self.female);

        let male_k = 2.0 / (1.0 + (1.0 / ALPHA));
        let female_k = 2.0 / (1.0 + ALPHA);

        (male_transmit * male_k + female_transmit * female_k) / self.autosomal()
    }

    /// The factor to convert a rate on `chrom` to the expected number of mutations
    pub fn scale(&self, chrom: &str) -> f64 {
        if is_x_chrom(chrom) {
            self.autosomal() * self.x_factor()
        } else {
            self.autosomal()
        }
    }
}

/// Converts the per-gene rates into expected counts of de novos
///
/// Genes that appear more than once are summed up.
///
/// ```
/// use mutation_weights::Cohort;
/// use mutation_weights::rates::gene::GeneRates;
/// use mutation_weights::rates::expected::expected_mutations;
///
/// let mut gene = GeneRates::new("ARID1B", "6", 6750);
/// gene.non = 1e-6;
/// gene.splice_site = 1e-6;
/// gene.frameshift = 9e-6;
///
/// let expected = expected_mutations(&[gene], &Cohort::new(50, 50));
/// let counts = expected.get("ARID1B").unwrap();
/// assert!((counts.lof_snv - 4e-4).abs() < 1e-12);
/// assert!((counts.lof_indel - 1.8e-3).abs() < 1e-12);
/// assert!((counts.missense_indel - 2e-4).abs() < 1e-12);
/// ```
pub fn expected_mutations(genes: &[GeneRates], cohort: &Cohort) -> CountTable<f64> {
    let mut expected = CountTable::new();
    for gene in genes {
        let scale = cohort.scale(&gene.chrom);
        let counts = GeneCounts {
            lof_snv: (gene.non + gene.splice_site) * scale,
            lof_indel: gene.frameshift * scale,
            missense_snv: gene.mis * scale,
            missense_indel: gene.frameshift / MISSENSE_INDEL_DIVISOR * scale,
            synonymous_snv: gene.syn * scale,
        };
        let entry = expected.gene_mut(&gene.symbol);
        entry.lof_snv += counts.lof_snv;
        entry.lof_indel += counts.lof_indel;
        entry.missense_snv += counts.missense_snv;
        entry.missense_indel += counts.missense_indel;
        entry.synonymous_snv += counts.synonymous_snv;
    }
    expected
}

/// Converts per-site rates into expected counts of de novos
pub fn expected_site_rates(sites: Vec<SiteRate>, cohort: &Cohort) -> Vec<SiteRate> {
    sites
        .into_iter()
        .map(|site| SiteRate {
            prob: site.prob * cohort.scale(&site.chrom),
            ..site
        })
        .collect()
}

//! Enrichment of de novo mutations over the expected number of mutations
//!
//! Observed and expected counts are kept per gene in a [`CountTable`], split
//! into the five [`SubCategory`]s of variants. For the enrichment tests the
//! sub-categories are combined into the functional [`Group`]s:
//!
//! - PTV (protein truncating): `lof_snv` + `lof_indel`
//! - PAV (protein altering): `missense_snv` + `missense_indel`
//!
//! The probability of observing at least the number of de novos by chance
//! is calculated with the survival function of the Poisson distribution.
//!
//! [`fisher::compare_regions`] compares the enrichment of two partitions
//! (e.g. constrained and unconstrained regions) with each other.
use std::collections::BTreeMap;
use std::fmt::Display;
use std::iter::Sum;

use statrs::distribution::{DiscreteCDF, Poisson};
use tracing::debug;

use crate::utils::f64_from_u64;
use crate::{WeightsError, WeightsResult};

pub mod fisher;

/// The counting categories of de novo variants
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubCategory {
    LofSnv,
    LofIndel,
    MissenseSnv,
    MissenseIndel,
    SynonymousSnv,
}

impl SubCategory {
    /// All categories, in table order
    pub const ALL: [SubCategory; 5] = [
        SubCategory::LofSnv,
        SubCategory::LofIndel,
        SubCategory::MissenseSnv,
        SubCategory::MissenseIndel,
        SubCategory::SynonymousSnv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubCategory::LofSnv => "lof_snv",
            SubCategory::LofIndel => "lof_indel",
            SubCategory::MissenseSnv => "missense_snv",
            SubCategory::MissenseIndel => "missense_indel",
            SubCategory::SynonymousSnv => "synonymous_snv",
        }
    }
}

impl Display for SubCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Functional groups of variants that are tested for enrichment
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    /// Protein truncating variants
    Ptv,
    /// Protein altering variants
    Pav,
}

impl Group {
    pub const ALL: [Group; 2] = [Group::Ptv, Group::Pav];

    /// The sub-categories that are summed up for the group
    pub fn members(&self) -> [SubCategory; 2] {
        match self {
            Group::Ptv => [SubCategory::LofSnv, SubCategory::LofIndel],
            Group::Pav => [SubCategory::MissenseSnv, SubCategory::MissenseIndel],
        }
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Group::Ptv => write!(f, "PTV"),
            Group::Pav => write!(f, "PAV"),
        }
    }
}

/// Observed or expected counts of a single gene
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeneCounts<T> {
    pub lof_snv: T,
    pub lof_indel: T,
    pub missense_snv: T,
    pub missense_indel: T,
    pub synonymous_snv: T,
}

impl<T: Copy> GeneCounts<T> {
    pub fn get(&self, category: SubCategory) -> T {
        match category {
            SubCategory::LofSnv => self.lof_snv,
            SubCategory::LofIndel => self.lof_indel,
            SubCategory::MissenseSnv => self.missense_snv,
            SubCategory::MissenseIndel => self.missense_indel,
            SubCategory::SynonymousSnv => self.synonymous_snv,
        }
    }

    pub fn get_mut(&mut self, category: SubCategory) -> &mut T {
        match category {
            SubCategory::LofSnv => &mut self.lof_snv,
            SubCategory::LofIndel => &mut self.lof_indel,
            SubCategory::MissenseSnv => &mut self.missense_snv,
            SubCategory::MissenseIndel => &mut self.missense_indel,
            SubCategory::SynonymousSnv => &mut self.synonymous_snv,
        }
    }
}

/// Per-gene counts of de novo variants
///
/// Observed counts use `CountTable<u64>`, expected counts `CountTable<f64>`.
/// Genes are kept sorted by their symbol.
///
/// # Examples
///
/// ```
/// use mutation_weights::stats::{CountTable, Group, SubCategory};
///
/// let mut counts: CountTable<u64> = CountTable::new();
/// counts.gene_mut("ARID1B").lof_snv += 2;
/// counts.gene_mut("ARID1B").lof_indel += 1;
/// counts.gene_mut("KMT2A").lof_snv += 1;
///
/// assert_eq!(counts.total(SubCategory::LofSnv), 3);
/// assert_eq!(counts.group_total(Group::Ptv), 4);
/// assert_eq!(counts.group_total(Group::Pav), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountTable<T> {
    genes: BTreeMap<String, GeneCounts<T>>,
}

impl<T: Copy + Default> CountTable<T> {
    pub fn new() -> Self {
        Self {
            genes: BTreeMap::new(),
        }
    }

    /// Returns the counts of a gene, adding the gene if needed
    pub fn gene_mut(&mut self, symbol: &str) -> &mut GeneCounts<T> {
        self.genes.entry(symbol.to_string()).or_default()
    }

    /// Adds or replaces the counts of a gene
    pub fn insert(&mut self, symbol: String, counts: GeneCounts<T>) {
        self.genes.insert(symbol, counts);
    }

    pub fn get(&self, symbol: &str) -> Option<&GeneCounts<T>> {
        self.genes.get(symbol)
    }

    /// Iterates the genes and their counts, ordered by symbol
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneCounts<T>)> {
        self.genes.iter().map(|(symbol, counts)| (symbol.as_str(), counts))
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl<T: Copy + Default + Sum<T>> CountTable<T> {
    /// The sum of a sub-category across all genes
    pub fn total(&self, category: SubCategory) -> T {
        self.genes.values().map(|counts| counts.get(category)).sum()
    }

    /// The sum of all sub-categories of a group across all genes
    pub fn group_total(&self, group: Group) -> T {
        group
            .members()
            .iter()
            .map(|category| self.total(*category))
            .sum()
    }
}

impl<T: Copy + Default> FromIterator<(String, GeneCounts<T>)> for CountTable<T> {
    fn from_iter<I: IntoIterator<Item = (String, GeneCounts<T>)>>(iter: I) -> Self {
        Self {
            genes: iter.into_iter().collect(),
        }
    }
}

/// The enrichment of observed over expected de novos of a [`Group`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnrichmentResult {
    /// Total number of observed de novos
    pub observed: u64,
    /// Total number of expected de novos
    pub expected: f64,
    /// Observed / expected
    pub ratio: f64,
    /// Probability to observe at least `observed` de novos by chance
    pub p_value: f64,
}

impl EnrichmentResult {
    /// Calculates the enrichment of `observed` de novos over `expected`
    ///
    /// # Errors
    ///
    /// - [`WeightsError::ZeroExpected`]: `expected` is zero
    /// - [`WeightsError::Statistics`]: `expected` is negative or not finite
    ///
    /// # Examples
    ///
    /// ```
    /// use mutation_weights::stats::EnrichmentResult;
    ///
    /// let result = EnrichmentResult::new(5, 2.0, "PTV").unwrap();
    /// assert!((result.ratio - 2.5).abs() < f64::EPSILON);
    /// assert!((result.p_value - 0.052653).abs() < 1e-6);
    ///
    /// let result = EnrichmentResult::new(0, 2.0, "PTV").unwrap();
    /// assert!((result.p_value - 1.0).abs() < f64::EPSILON);
    ///
    /// assert!(EnrichmentResult::new(3, 0.0, "PTV").is_err());
    /// ```
    pub fn new(observed: u64, expected: f64, label: &str) -> WeightsResult<Self> {
        if expected == 0.0 {
            return Err(WeightsError::ZeroExpected(label.to_string()));
        }
        let poisson = Poisson::new(expected)?;
        let p_value = match observed {
            0 => 1.0,
            n => poisson.sf(n - 1),
        };
        Ok(Self {
            observed,
            expected,
            ratio: f64_from_u64(observed) / expected,
            p_value,
        })
    }
}

impl Display for EnrichmentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "observed={}\texpected={:.3}\tratio={:.3}\tp={:e}",
            self.observed, self.expected, self.ratio, self.p_value
        )
    }
}

/// Calculates the enrichment of a single [`Group`]
///
/// # Errors
///
/// See [`EnrichmentResult::new`]
pub fn group_enrichment(
    observed: &CountTable<u64>,
    expected: &CountTable<f64>,
    group: Group,
) -> WeightsResult<EnrichmentResult> {
    let result = EnrichmentResult::new(
        observed.group_total(group),
        expected.group_total(group),
        &group.to_string(),
    )?;
    debug!("{}: {}", group, result);
    Ok(result)
}

/// Calculates the enrichment of PTVs and PAVs
///
/// Genes that are only present in one of the tables still count
/// towards the totals.
///
/// # Errors
///
/// See [`EnrichmentResult::new`]
pub fn enrichment(
    observed: &CountTable<u64>,
    expected: &CountTable<f64>,
) -> WeightsResult<BTreeMap<Group, EnrichmentResult>> {
    Group::ALL
        .iter()
        .map(|group| Ok((*group, group_enrichment(observed, expected, *group)?)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn observed() -> CountTable<u64> {
        let mut counts = CountTable::new();
        *counts.gene_mut("GENE1") = GeneCounts {
            lof_snv: 3,
            lof_indel: 2,
            missense_snv: 4,
            missense_indel: 0,
            synonymous_snv: 1,
        };
        counts.gene_mut("GENE2").missense_snv = 6;
        counts
    }

    fn expected() -> CountTable<f64> {
        let mut counts = CountTable::new();
        *counts.gene_mut("GENE1") = GeneCounts {
            lof_snv: 1.2,
            lof_indel: 0.8,
            missense_snv: 3.0,
            missense_indel: 0.5,
            synonymous_snv: 2.0,
        };
        counts.gene_mut("GENE3").missense_snv = 1.5;
        counts
    }

    #[test]
    fn group_sums() {
        let obs = observed();
        assert_eq!(obs.group_total(Group::Ptv), 5);
        assert_eq!(obs.group_total(Group::Pav), 10);
        let exp = expected();
        assert!((exp.group_total(Group::Ptv) - 2.0).abs() < 1e-12);
        assert!((exp.group_total(Group::Pav) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn enrichment_of_both_groups() {
        let result = enrichment(&observed(), &expected()).unwrap();
        assert_eq!(result.len(), 2);

        let ptv = result[&Group::Ptv];
        assert_eq!(ptv.observed, 5);
        assert!((ptv.ratio - 2.5).abs() < 1e-12);
        assert!((ptv.p_value - 0.052_653).abs() < 1e-6);

        let pav = result[&Group::Pav];
        assert_eq!(pav.observed, 10);
        assert!((pav.ratio - 2.0).abs() < 1e-12);
        assert!(pav.p_value < 0.05);
    }

    #[test]
    fn zero_expected_is_an_error() {
        let mut exp = CountTable::new();
        exp.gene_mut("GENE1").synonymous_snv = 1.0;
        assert!(matches!(
            enrichment(&observed(), &exp),
            Err(WeightsError::ZeroExpected(_))
        ));
    }

    #[test]
    fn p_value_decreases_with_observed() {
        let mut previous = 1.0;
        for observed in 1..20 {
            let result = EnrichmentResult::new(observed, 4.0, "PAV").unwrap();
            assert!(result.p_value <= previous);
            assert!(result.p_value > 0.0);
            previous = result.p_value;
        }
    }

    #[test]
    fn category_names() {
        let names: Vec<&str> = SubCategory::ALL.iter().map(SubCategory::as_str).collect();
        assert_eq!(
            names,
            vec!["lof_snv", "lof_indel", "missense_snv", "missense_indel", "synonymous_snv"]
        );
        assert_eq!(Group::Pav.to_string(), "PAV");
    }
}

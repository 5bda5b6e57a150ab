//! Enrichment of de novos within and outside of constrained regions
//!
//! [`check_regional_enrichment`] runs the complete comparison for one pair
//! of constraint thresholds, [`sweep`] repeats it over a [`SweepGrid`].
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use tracing::{error, info};

use crate::constraint::{classify, ConstraintTable, Thresholds};
use crate::rates::expected::{expected_mutations, Cohort};
use crate::rates::gene::{include_indel_rates, rates_by_constraint};
use crate::rates::SiteRateModel;
use crate::stats::fisher::{compare_regions, FisherResult};
use crate::stats::{enrichment, EnrichmentResult, Group};
use crate::transcript::TranscriptResolver;
use crate::variants::{count_de_novos, DeNovo};
use crate::WeightsResult;

/// Everything that is needed to compare constrained and unconstrained regions
pub struct StudyData<'a, R, M> {
    /// The regional constraint table
    pub constraint: &'a ConstraintTable,
    /// Validated de novos, usually restricted to the genes of `constraint`
    pub de_novos: &'a [DeNovo],
    pub resolver: &'a R,
    pub model: &'a M,
    pub cohort: Cohort,
}

/// Result of [`check_regional_enrichment`]
#[derive(Clone, Debug, PartialEq)]
pub struct RegionalEnrichment {
    pub thresholds: Thresholds,
    pub constrained: BTreeMap<Group, EnrichmentResult>,
    pub unconstrained: BTreeMap<Group, EnrichmentResult>,
    /// Comparison of PTV enrichment between both partitions
    pub ptv_diff: FisherResult,
    /// Comparison of PAV enrichment between both partitions
    pub pav_diff: FisherResult,
}

impl Display for RegionalEnrichment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.thresholds)?;
        for (group, result) in &self.constrained {
            writeln!(f, "constrained\t{group}\t{result}")?;
        }
        for (group, result) in &self.unconstrained {
            writeln!(f, "unconstrained\t{group}\t{result}")?;
        }
        writeln!(f, "PTV diff\t{}", self.ptv_diff)?;
        write!(f, "PAV diff\t{}", self.pav_diff)
    }
}

/// Keeps the de novos in genes of the constraint table
pub fn constraint_gene_de_novos(de_novos: &[DeNovo], table: &ConstraintTable) -> Vec<DeNovo> {
    let genes = table.genes();
    de_novos
        .iter()
        .filter(|variant| genes.contains(variant.hgnc.as_str()))
        .cloned()
        .collect()
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Compares the de novo enrichment in constrained and unconstrained regions
///
/// ```mermaid
/// graph TD
///     C[Constraint table] --> R[Rates by constraint]
///     M[Site rate model] --> R
///     R --> I[Indel rates]
///     I --> E[Expected counts]
///     P[Cohort] --> E
///     C --> K[Classify de novos]
///     D[De novos] --> K
///     K --> O[Observed counts]
///     E --> N[Enrichment]
///     O --> N
///     N --> F[Fisher PTV / PAV]
/// ```
///
/// Expected counts are calculated separately for the constrained and
/// unconstrained parts of all transcripts. The de novos are split by
/// whether they are located in a constrained region and counted per gene.
///
/// # Errors
///
/// - [`ZeroExpected`](crate::WeightsError::ZeroExpected): no expected PTVs or PAVs in one of the partitions
/// - any error of [`rates_by_constraint`] or [`classify`]
pub fn check_regional_enrichment<R, M>(
    data: &StudyData<'_, R, M>,
    thresholds: &Thresholds,
) -> WeightsResult<RegionalEnrichment>
where
    R: TranscriptResolver,
    M: SiteRateModel,
{
    let mut rates = rates_by_constraint(data.constraint, data.resolver, data.model, thresholds)?;
    include_indel_rates(&mut rates.constrained);
    include_indel_rates(&mut rates.unconstrained);

    let constrained_exp = expected_mutations(&rates.constrained, &data.cohort);
    let unconstrained_exp = expected_mutations(&rates.unconstrained, &data.cohort);

    let in_constraint = classify(data.constraint, data.de_novos, data.resolver, thresholds)?;
    let (inside, outside): (Vec<_>, Vec<_>) = data
        .de_novos
        .iter()
        .zip(in_constraint)
        .partition(|(_, constrained)| *constrained);

    let constrained_obs = count_de_novos(inside.into_iter().map(|(variant, _)| variant));
    let unconstrained_obs = count_de_novos(outside.into_iter().map(|(variant, _)| variant));

    let constrained = enrichment(&constrained_obs, &constrained_exp)?;
    let unconstrained = enrichment(&unconstrained_obs, &unconstrained_exp)?;

    let ptv_diff = compare_regions(&constrained, &unconstrained, Group::Ptv)?;
    let pav_diff = compare_regions(&constrained, &unconstrained, Group::Pav)?;

    Ok(RegionalEnrichment {
        thresholds: *thresholds,
        constrained,
        unconstrained,
        ptv_diff,
        pav_diff,
    })
}

/// The grid of constraint thresholds that is analysed by [`sweep`]
#[derive(Clone, Debug, PartialEq)]
pub struct SweepGrid {
    pub significance: Vec<f64>,
    pub ratios: Vec<f64>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            significance: vec![1e-2, 1e-3, 1e-4, 1e-5, 1e-6],
            ratios: vec![0.2, 0.4, 0.6, 0.8, 1.0],
        }
    }
}

impl SweepGrid {
    /// All threshold pairs, ordered by significance first
    ///
    /// ```
    /// use mutation_weights::analysis::SweepGrid;
    ///
    /// let grid = SweepGrid::default();
    /// let thresholds: Vec<_> = grid.thresholds().collect();
    /// assert_eq!(thresholds.len(), 25);
    /// assert!((thresholds[1].significance - 1e-2).abs() < f64::EPSILON);
    /// assert!((thresholds[1].ratio - 0.4).abs() < f64::EPSILON);
    /// ```
    pub fn thresholds(&self) -> impl Iterator<Item = Thresholds> + '_ {
        self.significance.iter().flat_map(move |significance| {
            self.ratios
                .iter()
                .map(move |ratio| Thresholds::new(*significance, *ratio))
        })
    }
}

/// Runs [`check_regional_enrichment`] for all thresholds of `grid`
///
/// # Errors
///
/// The first error of [`check_regional_enrichment`], including
/// [`ZeroExpected`](crate::WeightsError::ZeroExpected) for threshold pairs that leave one of the
/// partitions without expected mutations
pub fn sweep<R, M>(data: &StudyData<'_, R, M>, grid: &SweepGrid) -> WeightsResult<Vec<RegionalEnrichment>>
where
    R: TranscriptResolver,
    M: SiteRateModel,
{
    let mut results = Vec::new();
    for thresholds in grid.thresholds() {
        let result = check_regional_enrichment(data, &thresholds).map_err(|err| {
            error!("Enrichment failed for {}: {}", thresholds, err);
            err
        })?;
        info!("{}", result);
        results.push(result);
    }
    Ok(results)
}

/// The genes of the de novos, for reporting
pub fn de_novo_genes(de_novos: &[DeNovo]) -> HashSet<&str> {
    de_novos.iter().map(|variant| variant.hgnc.as_str()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constraint::test::region;
    use crate::rates::test::site;
    use crate::rates::{RateTable, SiteConsequence};
    use crate::variants::test::de_novo;
    use crate::{ExonTranscript, Strand, TranscriptTable, WeightsError};

    fn resolver() -> TranscriptTable {
        TranscriptTable::from_transcripts([ExonTranscript::new(
            "ENST01",
            "GENE1",
            "1",
            Strand::Forward,
            [(1001, 1060)],
        )
        .unwrap()])
    }

    fn model() -> RateTable {
        let mut sites = Vec::new();
        for pos in 1001..=1060 {
            sites.push(site("GENE1", "1", pos, "G", SiteConsequence::Missense, 1e-5));
            sites.push(site("GENE1", "1", pos, "T", SiteConsequence::Nonsense, 2e-6));
        }
        RateTable::new(sites)
    }

    fn constraint() -> ConstraintTable {
        ConstraintTable::new(vec![
            region("ENST01.1", "1-10", 50.0, 0.1),
            region("ENST01.1", "11-20", 0.5, 1.1),
        ])
    }

    fn de_novos() -> Vec<DeNovo> {
        let mut variants: Vec<DeNovo> = (0..6)
            .map(|i| de_novo("1", 1001 + i, "missense_variant"))
            .collect();
        variants.push(de_novo("1", 1002, "stop_gained"));
        variants.push(de_novo("1", 1040, "missense_variant"));
        variants.push(de_novo("1", 1045, "stop_gained"));
        variants
    }

    #[test]
    fn constrained_enrichment() {
        let variants = de_novos();
        let table = constraint();
        let data = StudyData {
            constraint: &table,
            de_novos: &variants,
            resolver: &resolver(),
            model: &model(),
            cohort: Cohort::new(500, 500),
        };
        let result = check_regional_enrichment(&data, &Thresholds::default()).unwrap();

        assert_eq!(result.constrained[&Group::Pav].observed, 6);
        assert_eq!(result.constrained[&Group::Ptv].observed, 1);
        assert_eq!(result.unconstrained[&Group::Pav].observed, 1);
        assert_eq!(result.unconstrained[&Group::Ptv].observed, 1);

        // 30 constrained sites, 2000 transmissions
        let pav = result.constrained[&Group::Pav];
        let frameshift = 0.5 * 60.0 * 2e-6 * 1.25;
        let expected = (30.0 * 1e-5 + frameshift / 9.0) * 2000.0;
        assert!((pav.expected - expected).abs() < 1e-9);
        assert!(pav.ratio > result.unconstrained[&Group::Pav].ratio);
    }

    #[test]
    fn sweep_over_grid() {
        let variants = de_novos();
        let table = constraint();
        let data = StudyData {
            constraint: &table,
            de_novos: &variants,
            resolver: &resolver(),
            model: &model(),
            cohort: Cohort::new(500, 500),
        };
        let grid = SweepGrid {
            significance: vec![1e-2, 1e-4],
            ratios: vec![0.2, 1.0],
        };
        let results = sweep(&data, &grid).unwrap();
        assert_eq!(results.len(), 4);
        assert!((results[3].thresholds.significance - 1e-4).abs() < f64::EPSILON);
        assert!((results[3].thresholds.ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sweep_fails_on_empty_partition() {
        let variants = de_novos();
        let table = constraint();
        let data = StudyData {
            constraint: &table,
            de_novos: &variants,
            resolver: &resolver(),
            model: &model(),
            cohort: Cohort::new(500, 500),
        };
        let grid = SweepGrid {
            significance: vec![1e-4],
            ratios: vec![0.05, 1.0],
        };
        // a ratio of 0.05 leaves no constrained region
        assert!(matches!(
            sweep(&data, &grid),
            Err(WeightsError::ZeroExpected(_))
        ));
    }

    #[test]
    fn restrict_to_constraint_genes() {
        let mut variants = de_novos();
        let mut other = de_novo("2", 10, "stop_gained");
        other.hgnc = "GENE2".to_string();
        variants.push(other);
        let kept = constraint_gene_de_novos(&variants, &constraint());
        assert_eq!(kept.len(), 9);
        assert_eq!(de_novo_genes(&kept).len(), 1);
    }
}

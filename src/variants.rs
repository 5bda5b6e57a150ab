//! De novo variants of the study cohort
//!
//! De novo calls are loaded from a standardised table and merged with the
//! results of validation experiments. Calls that failed validation, or
//! turned out to be inherited, are removed before any analysis.
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::parser;
use crate::stats::{CountTable, SubCategory};
use crate::WeightsResult;

/// VEP consequences that cause a loss of function
pub const LOF_CONSEQUENCES: [&str; 8] = [
    "transcript_ablation",
    "splice_donor_variant",
    "splice_acceptor_variant",
    "stop_gained",
    "frameshift_variant",
    "initiator_codon_variant",
    "start_lost",
    "conserved_exon_terminus_variant",
];

/// VEP consequences that alter the protein sequence
pub const MISSENSE_CONSEQUENCES: [&str; 6] = [
    "stop_lost",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "transcript_amplification",
    "protein_altering_variant",
];

pub const SYNONYMOUS_CONSEQUENCES: [&str; 1] = ["synonymous_variant"];

/// Validation outcomes that remove a variant from the analyses
pub const EXCLUDED_STATUSES: [&str; 2] = ["false_positive", "inherited"];

/// Whether a variant is a single nucleotide variant or an indel
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    Snv,
    Indel,
}

impl Display for VariantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantType::Snv => write!(f, "snv"),
            VariantType::Indel => write!(f, "indel"),
        }
    }
}

/// The broad functional class of a VEP consequence
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ConsequenceClass {
    Lof,
    Missense,
    Synonymous,
}

impl ConsequenceClass {
    /// Returns the class of a VEP consequence, or `None` for
    /// consequences that are not counted (e.g. `intron_variant`)
    ///
    /// ```
    /// use mutation_weights::variants::ConsequenceClass;
    ///
    /// assert_eq!(ConsequenceClass::from_consequence("stop_gained"), Some(ConsequenceClass::Lof));
    /// assert_eq!(ConsequenceClass::from_consequence("stop_lost"), Some(ConsequenceClass::Missense));
    /// assert_eq!(ConsequenceClass::from_consequence("intron_variant"), None);
    /// ```
    pub fn from_consequence(consequence: &str) -> Option<Self> {
        if LOF_CONSEQUENCES.contains(&consequence) {
            Some(ConsequenceClass::Lof)
        } else if MISSENSE_CONSEQUENCES.contains(&consequence) {
            Some(ConsequenceClass::Missense)
        } else if SYNONYMOUS_CONSEQUENCES.contains(&consequence) {
            Some(ConsequenceClass::Synonymous)
        } else {
            None
        }
    }
}

/// A de novo variant in a proband
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DeNovo {
    pub person_id: String,
    pub chrom: String,
    pub start_pos: u64,
    pub end_pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    /// HGNC symbol of the affected gene
    pub hgnc: String,
    /// The most severe VEP consequence
    pub consequence: String,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
}

impl DeNovo {
    /// The key that links a variant to its validation result
    pub fn key(&self) -> VariantKey {
        VariantKey {
            person_id: self.person_id.clone(),
            chrom: self.chrom.clone(),
            start_pos: self.start_pos,
            end_pos: self.end_pos,
            ref_allele: self.ref_allele.clone(),
            alt_allele: self.alt_allele.clone(),
            hgnc: self.hgnc.clone(),
            consequence: self.consequence.clone(),
        }
    }

    pub fn is_snv(&self) -> bool {
        self.variant_type == VariantType::Snv
    }

    /// The counting category of the variant, `None` if the
    /// consequence is not counted
    pub fn sub_category(&self) -> Option<SubCategory> {
        let class = ConsequenceClass::from_consequence(&self.consequence)?;
        match (class, self.variant_type) {
            (ConsequenceClass::Lof, VariantType::Snv) => Some(SubCategory::LofSnv),
            (ConsequenceClass::Lof, VariantType::Indel) => Some(SubCategory::LofIndel),
            (ConsequenceClass::Missense, VariantType::Snv) => Some(SubCategory::MissenseSnv),
            (ConsequenceClass::Missense, VariantType::Indel) => Some(SubCategory::MissenseIndel),
            (ConsequenceClass::Synonymous, VariantType::Snv) => Some(SubCategory::SynonymousSnv),
            (ConsequenceClass::Synonymous, VariantType::Indel) => None,
        }
    }
}

/// Identifies a de novo call across the de novo and validation tables
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct VariantKey {
    pub person_id: String,
    pub chrom: String,
    pub start_pos: u64,
    pub end_pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub hgnc: String,
    pub consequence: String,
}

/// A row of the validation results table
#[derive(Debug, Deserialize)]
pub struct ValidationRecord {
    person_id: String,
    chrom: String,
    start_pos: u64,
    end_pos: u64,
    ref_allele: String,
    alt_allele: String,
    hgnc: String,
    consequence: String,
    status: String,
}

impl ValidationRecord {
    /// Splits the record into the variant key and the validation status
    pub fn into_parts(self) -> (VariantKey, String) {
        (
            VariantKey {
                person_id: self.person_id,
                chrom: self.chrom,
                start_pos: self.start_pos,
                end_pos: self.end_pos,
                ref_allele: self.ref_allele,
                alt_allele: self.alt_allele,
                hgnc: self.hgnc,
                consequence: self.consequence,
            },
            self.status,
        )
    }
}

/// Removes variants that failed validation and, unless `keep_indels`
/// is set, all indels
///
/// Variants without a validation result are kept.
pub fn filter_validated(
    de_novos: Vec<DeNovo>,
    validations: &HashMap<VariantKey, String>,
    keep_indels: bool,
) -> Vec<DeNovo> {
    let total = de_novos.len();
    let kept: Vec<DeNovo> = de_novos
        .into_iter()
        .filter(|variant| {
            validations
                .get(&variant.key())
                .map_or(true, |status| !EXCLUDED_STATUSES.contains(&status.as_str()))
        })
        .filter(|variant| keep_indels || variant.is_snv())
        .collect();
    debug!("Kept {} of {} de novos", kept.len(), total);
    kept
}

/// Loads the de novo table and removes invalid calls
///
/// # Errors
///
/// Returns an error if either table cannot be opened or parsed
pub fn load_de_novos<P: AsRef<Path>>(
    de_novos_path: P,
    validations_path: P,
    keep_indels: bool,
) -> WeightsResult<Vec<DeNovo>> {
    let de_novos = parser::de_novos::parse(de_novos_path)?;
    let validations = parser::de_novos::parse_validations(validations_path)?;
    let de_novos = filter_validated(de_novos, &validations, keep_indels);
    info!("Loaded {} de novos", de_novos.len());
    Ok(de_novos)
}

/// Counts the de novos of each gene by [`SubCategory`]
///
/// Variants with consequences outside the counted classes are ignored.
///
/// ```
/// use mutation_weights::variants::{count_de_novos, DeNovo, VariantType};
/// use mutation_weights::stats::SubCategory;
///
/// let variant = DeNovo {
///     person_id: "P1".to_string(),
///     chrom: "6".to_string(),
///     start_pos: 157100100,
///     end_pos: 157100100,
///     ref_allele: "G".to_string(),
///     alt_allele: "A".to_string(),
///     hgnc: "ARID1B".to_string(),
///     consequence: "stop_gained".to_string(),
///     variant_type: VariantType::Snv,
/// };
///
/// let counts = count_de_novos(&[variant]);
/// assert_eq!(counts.total(SubCategory::LofSnv), 1);
/// assert_eq!(counts.total(SubCategory::MissenseSnv), 0);
/// ```
pub fn count_de_novos<'a, I: IntoIterator<Item = &'a DeNovo>>(de_novos: I) -> CountTable<u64> {
    let mut counts = CountTable::new();
    for variant in de_novos {
        if let Some(category) = variant.sub_category() {
            *counts.gene_mut(&variant.hgnc).get_mut(category) += 1;
        }
    }
    counts
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) fn de_novo(chrom: &str, pos: u64, consequence: &str) -> DeNovo {
        DeNovo {
            person_id: format!("P{pos}"),
            chrom: chrom.to_string(),
            start_pos: pos,
            end_pos: pos,
            ref_allele: "A".to_string(),
            alt_allele: "G".to_string(),
            hgnc: "GENE1".to_string(),
            consequence: consequence.to_string(),
            variant_type: VariantType::Snv,
        }
    }

    fn indel(chrom: &str, pos: u64, consequence: &str) -> DeNovo {
        DeNovo {
            variant_type: VariantType::Indel,
            ref_allele: "AT".to_string(),
            ..de_novo(chrom, pos, consequence)
        }
    }

    #[test]
    fn sub_categories() {
        assert_eq!(
            de_novo("1", 1, "stop_gained").sub_category(),
            Some(SubCategory::LofSnv)
        );
        assert_eq!(
            indel("1", 1, "frameshift_variant").sub_category(),
            Some(SubCategory::LofIndel)
        );
        assert_eq!(
            indel("1", 1, "inframe_deletion").sub_category(),
            Some(SubCategory::MissenseIndel)
        );
        assert_eq!(
            de_novo("1", 1, "synonymous_variant").sub_category(),
            Some(SubCategory::SynonymousSnv)
        );
        assert_eq!(de_novo("1", 1, "intron_variant").sub_category(), None);
    }

    #[test]
    fn remove_failed_validations() {
        let variants = vec![
            de_novo("1", 100, "missense_variant"),
            de_novo("1", 200, "missense_variant"),
            de_novo("1", 300, "missense_variant"),
            de_novo("1", 400, "missense_variant"),
        ];
        let mut validations = HashMap::new();
        validations.insert(variants[0].key(), "false_positive".to_string());
        validations.insert(variants[1].key(), "inherited".to_string());
        validations.insert(variants[2].key(), "de_novo".to_string());

        let kept = filter_validated(variants, &validations, false);
        let positions: Vec<u64> = kept.iter().map(|v| v.start_pos).collect();
        assert_eq!(positions, vec![300, 400]);
    }

    #[test]
    fn drop_indels() {
        let variants = vec![
            de_novo("1", 100, "stop_gained"),
            indel("1", 200, "frameshift_variant"),
        ];
        let validations = HashMap::new();
        assert_eq!(filter_validated(variants.clone(), &validations, false).len(), 1);
        assert_eq!(filter_validated(variants, &validations, true).len(), 2);
    }

    #[test]
    fn count_per_gene() {
        let mut other = de_novo("2", 50, "missense_variant");
        other.hgnc = "GENE2".to_string();
        let variants = vec![
            de_novo("1", 100, "stop_gained"),
            de_novo("1", 101, "splice_donor_variant"),
            de_novo("1", 102, "missense_variant"),
            indel("1", 103, "frameshift_variant"),
            de_novo("1", 104, "5_prime_UTR_variant"),
            other,
        ];
        let counts = count_de_novos(&variants);
        assert_eq!(counts.len(), 2);
        let gene1 = counts.get("GENE1").unwrap();
        assert_eq!(gene1.lof_snv, 2);
        assert_eq!(gene1.lof_indel, 1);
        assert_eq!(gene1.missense_snv, 1);
        assert_eq!(counts.get("GENE2").unwrap().missense_snv, 1);
    }
}

//! Assembly of the per-site rates of whole genes
//!
//! Genes usually have several transcripts that share most of their exons.
//! To count every site only once, the transcripts are processed from the
//! longest to the shortest and each transcript only contributes the sites
//! that are not covered by any of the transcripts processed before,
//! including their splice site padding.
use std::ops::RangeInclusive;

use tracing::{debug, warn};

use crate::rates::{padded_ranges, SiteRate, SiteRateModel};
use crate::transcript::{Transcript, TranscriptTable};
use crate::WeightsResult;

/// Collects the rates of all sites across the transcripts of a gene
///
/// All rates are labelled with `symbol` and sorted by `pos` and `alt`.
/// A gene without transcripts gives an empty list.
///
/// # Errors
///
/// Returns the errors of the [`SiteRateModel`]
///
/// # Examples
///
/// ```
/// use mutation_weights::{ExonTranscript, Strand};
/// use mutation_weights::rates::{RateTable, SiteConsequence, SiteRate};
/// use mutation_weights::rates::assembly::gene_site_rates;
///
/// let site = |pos: u64| SiteRate {
///     symbol: String::new(),
///     chrom: "1".to_string(),
///     pos,
///     ref_allele: "A".to_string(),
///     alt: "G".to_string(),
///     cq: SiteConsequence::Missense,
///     prob: 1e-8,
/// };
/// let model = RateTable::new(vec![site(100), site(300), site(500)]);
///
/// let long = ExonTranscript::new("T1", "GENE1", "1", Strand::Forward, [(100, 200), (300, 400)]).unwrap();
/// let short = ExonTranscript::new("T2", "GENE1", "1", Strand::Forward, [(300, 400), (500, 520)]).unwrap();
///
/// let rates = gene_site_rates("GENE1", [&short, &long], &model).unwrap();
/// let positions: Vec<u64> = rates.iter().map(|site| site.pos).collect();
/// // site 300 is shared by both transcripts but only counted once
/// assert_eq!(positions, vec![100, 300, 500]);
/// assert!(rates.iter().all(|site| site.symbol == "GENE1"));
/// ```
pub fn gene_site_rates<'a, T, I, M>(symbol: &str, transcripts: I, model: &M) -> WeightsResult<Vec<SiteRate>>
where
    T: Transcript + 'a,
    I: IntoIterator<Item = &'a T>,
    M: SiteRateModel,
{
    let mut transcripts: Vec<&T> = transcripts.into_iter().collect();
    transcripts.sort_by_key(|tx| std::cmp::Reverse(tx.cds_length()));

    let mut masked: Vec<RangeInclusive<u64>> = Vec::new();
    let mut rates: Vec<SiteRate> = Vec::new();
    for tx in transcripts {
        let sites = model.site_rates(tx, &masked)?;
        debug!("{} {}: {} new sites", symbol, tx.id(), sites.len());
        rates.extend(sites.into_iter().map(|site| SiteRate {
            symbol: symbol.to_string(),
            ..site
        }));
        masked.extend(padded_ranges(tx));
    }

    rates.sort_by(|a, b| a.pos.cmp(&b.pos).then_with(|| a.alt.cmp(&b.alt)));
    Ok(rates)
}

/// Collects the per-site rates of many genes
///
/// Genes without transcripts in `transcripts` are skipped with a warning.
///
/// # Errors
///
/// Returns the errors of the [`SiteRateModel`]
pub fn genes_site_rates<'a, I, M>(
    symbols: I,
    transcripts: &TranscriptTable,
    model: &M,
) -> WeightsResult<Vec<SiteRate>>
where
    I: IntoIterator<Item = &'a str>,
    M: SiteRateModel,
{
    let mut rates = Vec::new();
    for symbol in symbols {
        let gene_transcripts = transcripts.gene_transcripts(symbol);
        if gene_transcripts.is_empty() {
            warn!("No transcripts for {}", symbol);
            continue;
        }
        rates.extend(gene_site_rates(symbol, gene_transcripts, model)?);
    }
    Ok(rates)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rates::test::site;
    use crate::rates::{RateTable, SiteConsequence};
    use crate::{ExonTranscript, Strand};

    fn model() -> RateTable {
        RateTable::new(vec![
            site("", "1", 105, "T", SiteConsequence::Missense, 1e-8),
            site("", "1", 105, "C", SiteConsequence::Synonymous, 2e-8),
            site("", "1", 110, "G", SiteConsequence::Nonsense, 3e-8),
            site("", "1", 305, "G", SiteConsequence::Missense, 4e-8),
        ])
    }

    #[test]
    fn no_transcripts() {
        let transcripts: Vec<ExonTranscript> = Vec::new();
        assert!(gene_site_rates("GENE1", &transcripts, &model())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn sorted_by_position_and_allele() {
        let tx = ExonTranscript::new("T1", "GENE1", "1", Strand::Reverse, [(100, 120), (300, 310)]).unwrap();
        let rates = gene_site_rates("GENE1", [&tx], &model()).unwrap();
        let keys: Vec<(u64, &str)> = rates.iter().map(|s| (s.pos, s.alt.as_str())).collect();
        assert_eq!(keys, vec![(105, "C"), (105, "T"), (110, "G"), (305, "G")]);
    }

    #[test]
    fn shorter_transcripts_only_add_new_sites() {
        let long = ExonTranscript::new("T1", "GENE1", "1", Strand::Forward, [(100, 140)]).unwrap();
        let short = ExonTranscript::new("T2", "GENE1", "1", Strand::Forward, [(100, 110), (300, 310)]).unwrap();
        let rates = gene_site_rates("GENE1", [&short, &long], &model()).unwrap();
        assert_eq!(rates.len(), 4);

        let table = TranscriptTable::from_transcripts([long, short]);
        let rates = genes_site_rates(["GENE1", "GENE2"], &table, &model()).unwrap();
        assert_eq!(rates.len(), 4);
    }
}

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::constraint::{constrained_positions, ConstrainedPositions, ConstraintRegion, ConstraintTable, Thresholds};
use crate::transcript::{Transcript, TranscriptResolver};
use crate::variants::DeNovo;
use crate::WeightsResult;

/// A resolved transcript together with its constraint regions
/// and the constrained positions derived from them
#[derive(Debug)]
pub struct ConstrainedTranscript<'a, T> {
    pub transcript: T,
    pub regions: Vec<&'a ConstraintRegion>,
    pub positions: ConstrainedPositions,
}

/// Resolves every transcript of `table` and computes its constrained positions
///
/// Transcripts that the resolver doesn't know are skipped with a warning.
///
/// # Errors
///
/// Returns an error if a constrained region of a resolved transcript
/// cannot be converted to chromosomal positions
pub fn constrained_transcripts<'a, R: TranscriptResolver>(
    table: &'a ConstraintTable,
    resolver: &R,
    thresholds: &Thresholds,
) -> WeightsResult<Vec<ConstrainedTranscript<'a, R::Transcript>>> {
    let mut transcripts = Vec::with_capacity(table.transcript_count());
    for (transcript_id, regions) in table.iter() {
        let transcript = match resolver.resolve(transcript_id) {
            Ok(tx) => tx,
            Err(err) => {
                warn!("Skipping transcript {}: {}", transcript_id, err);
                continue;
            }
        };
        let positions = constrained_positions(&transcript, regions.iter().copied(), thresholds)?;
        transcripts.push(ConstrainedTranscript {
            transcript,
            regions,
            positions,
        });
    }
    Ok(transcripts)
}

/// The constrained positions of all transcripts, by chromosome
///
/// # Examples
///
/// ```
/// use mutation_weights::constraint::ConstrainedSites;
///
/// let sites: ConstrainedSites = [
///     ("1".to_string(), [100, 101].into_iter().collect()),
///     ("1".to_string(), [101, 102].into_iter().collect()),
///     ("X".to_string(), [100].into_iter().collect()),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(sites.len(), 4);
/// assert!(sites.contains("1", 102));
/// assert!(!sites.contains("2", 100));
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstrainedSites {
    sites: HashMap<String, HashSet<u64>>,
}

impl ConstrainedSites {
    /// Returns `true` if `pos` on `chrom` is constrained
    pub fn contains(&self, chrom: &str, pos: u64) -> bool {
        self.sites
            .get(chrom)
            .map_or(false, |positions| positions.contains(&pos))
    }

    /// Returns for each variant whether it is located at a constrained site
    pub fn classify(&self, variants: &[DeNovo]) -> Vec<bool> {
        variants
            .iter()
            .map(|variant| self.contains(&variant.chrom, variant.start_pos))
            .collect()
    }

    /// The total number of constrained positions
    pub fn len(&self) -> usize {
        self.sites.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.values().all(HashSet::is_empty)
    }

    fn merge(mut self, chrom: String, positions: HashSet<u64>) -> Self {
        self.sites.entry(chrom).or_default().extend(positions);
        self
    }
}

impl FromIterator<(String, HashSet<u64>)> for ConstrainedSites {
    fn from_iter<I: IntoIterator<Item = (String, HashSet<u64>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ConstrainedSites::default(), |sites, (chrom, positions)| {
                sites.merge(chrom, positions)
            })
    }
}

/// Collects the constrained positions of all transcripts of `table`
///
/// # Errors
///
/// See [`constrained_transcripts`]
pub fn constrained_sites<R: TranscriptResolver>(
    table: &ConstraintTable,
    resolver: &R,
    thresholds: &Thresholds,
) -> WeightsResult<ConstrainedSites> {
    let sites: ConstrainedSites = constrained_transcripts(table, resolver, thresholds)?
        .into_iter()
        .map(|constrained| {
            (
                constrained.transcript.chrom().to_string(),
                constrained.positions,
            )
        })
        .collect();
    info!("{} constrained sites ({})", sites.len(), thresholds);
    Ok(sites)
}

/// Flags every de novo variant that lies in a constrained region
///
/// The result has the same length and order as `variants`.
///
/// # Errors
///
/// See [`constrained_transcripts`]
pub fn classify<R: TranscriptResolver>(
    table: &ConstraintTable,
    variants: &[DeNovo],
    resolver: &R,
    thresholds: &Thresholds,
) -> WeightsResult<Vec<bool>> {
    Ok(constrained_sites(table, resolver, thresholds)?.classify(variants))
}

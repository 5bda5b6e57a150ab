use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::parser;
use crate::transcript::{strip_version, ExonTranscript, Transcript, TranscriptResolver};
use crate::{WeightsError, WeightsResult};

/// An in-memory collection of [`ExonTranscript`]s
///
/// Transcripts are stored by their ID without version suffix and
/// can be looked up by ID or by gene symbol.
///
/// # Examples
///
/// ```
/// use mutation_weights::{ExonTranscript, Strand, Transcript, TranscriptResolver, TranscriptTable};
///
/// let short = ExonTranscript::new("ENST01", "GENE1", "1", Strand::Forward, [(1, 30)]).unwrap();
/// let long = ExonTranscript::new("ENST02", "GENE1", "1", Strand::Forward, [(1, 60)]).unwrap();
/// let table = TranscriptTable::from_transcripts([short, long]);
///
/// // the version suffix is ignored
/// assert!(table.resolve("ENST01.4").is_ok());
/// assert!(table.resolve("ENST03").is_err());
///
/// // longest transcript first
/// let ids: Vec<&str> = table.gene_transcripts("GENE1").iter().map(|tx| tx.id()).collect();
/// assert_eq!(ids, vec!["ENST02", "ENST01"]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct TranscriptTable {
    transcripts: HashMap<String, ExonTranscript>,
    genes: HashMap<String, Vec<String>>,
}

impl TranscriptTable {
    /// Builds a `TranscriptTable` from a list of transcripts
    ///
    /// If an ID appears more than once, the last transcript is kept
    pub fn from_transcripts<I: IntoIterator<Item = ExonTranscript>>(transcripts: I) -> Self {
        let mut table = TranscriptTable::default();
        for tx in transcripts {
            table.insert(tx);
        }
        table
    }

    /// Loads a table of transcript structures
    ///
    /// The (optionally gzipped) file must contain the tab-separated columns
    /// `transcript`, `gene`, `chrom`, `strand`, `cds_starts` and `cds_ends`.
    ///
    /// # Errors
    ///
    /// - [`WeightsError::CannotOpenFile`]: the file does not exist
    /// - [`WeightsError::InvalidInput`]: the table is malformed
    ///
    /// Rows without a valid CDS are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WeightsResult<Self> {
        let transcripts = parser::transcripts::parse(path)?;
        Ok(Self::from_transcripts(transcripts))
    }

    /// Adds a transcript, replacing any transcript with the same ID
    pub fn insert(&mut self, tx: ExonTranscript) {
        let id = strip_version(tx.id()).to_string();
        let gene = tx.gene().to_string();
        if let Some(previous) = self.transcripts.insert(id.clone(), tx) {
            debug!("Replacing transcript {}", id);
            if previous.gene() != gene {
                if let Some(ids) = self.genes.get_mut(previous.gene()) {
                    ids.retain(|other| other != &id);
                    if ids.is_empty() {
                        self.genes.remove(previous.gene());
                    }
                }
            }
        }
        let ids = self.genes.entry(gene).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Returns the transcript with the given ID, ignoring any version suffix
    pub fn get(&self, transcript_id: &str) -> Option<&ExonTranscript> {
        self.transcripts.get(strip_version(transcript_id))
    }

    /// All transcripts of a gene, sorted by CDS length (longest first)
    ///
    /// Returns an empty list for unknown genes
    pub fn gene_transcripts(&self, symbol: &str) -> Vec<&ExonTranscript> {
        let mut transcripts: Vec<&ExonTranscript> = self
            .genes
            .get(symbol)
            .map(|ids| ids.iter().filter_map(|id| self.transcripts.get(id)).collect())
            .unwrap_or_default();
        transcripts.sort_by(|a, b| {
            b.cds_length()
                .cmp(&a.cds_length())
                .then_with(|| a.id().cmp(b.id()))
        });
        transcripts
    }

    /// The number of transcripts in the table
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    /// Returns `true` if the table contains no transcripts
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}

impl TranscriptResolver for TranscriptTable {
    type Transcript = ExonTranscript;

    fn resolve(&self, transcript_id: &str) -> WeightsResult<ExonTranscript> {
        self.get(transcript_id)
            .cloned()
            .ok_or_else(|| WeightsError::DoesNotExist(transcript_id.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Strand;

    #[test]
    fn replace_duplicate_ids() {
        let a = ExonTranscript::new("ENST01.1", "G", "1", Strand::Forward, [(1, 3)]).unwrap();
        let b = ExonTranscript::new("ENST01.2", "G", "1", Strand::Forward, [(1, 6)]).unwrap();
        let table = TranscriptTable::from_transcripts([a, b]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.gene_transcripts("G").len(), 1);
        assert_eq!(table.resolve("ENST01").unwrap().cds_length(), 6);
    }

    #[test]
    fn replace_with_other_gene() {
        let a = ExonTranscript::new("ENST01", "OLD", "1", Strand::Forward, [(1, 3)]).unwrap();
        let b = ExonTranscript::new("ENST01", "NEW", "1", Strand::Forward, [(1, 6)]).unwrap();
        let c = ExonTranscript::new("ENST02", "OLD", "1", Strand::Forward, [(1, 9)]).unwrap();
        let mut table = TranscriptTable::from_transcripts([a, c]);
        table.insert(b);

        let old: Vec<&str> = table.gene_transcripts("OLD").iter().map(|tx| tx.id()).collect();
        assert_eq!(old, vec!["ENST02"]);
        let new: Vec<&str> = table.gene_transcripts("NEW").iter().map(|tx| tx.id()).collect();
        assert_eq!(new, vec!["ENST01"]);
    }

    #[test]
    fn unknown_gene() {
        let table = TranscriptTable::default();
        assert!(table.is_empty());
        assert!(table.gene_transcripts("FOO").is_empty());
        assert!(matches!(
            table.resolve("ENST01"),
            Err(WeightsError::DoesNotExist(_))
        ));
    }
}

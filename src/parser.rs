//! Reading and writing the study tables
//!
//! All tables are tab-separated with a header row and can be gzip
//! compressed. Compression is detected by the `.gz` file extension.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{WeightsError, WeightsResult};

const GZ_BUF_SIZE: usize = 1 << 20;
const PLAIN_BUF_SIZE: usize = 32 * 1024;

fn is_gzipped(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// Opens a (possibly gzipped) file into a `BufRead`
///
/// # Errors
///
/// [`WeightsError::CannotOpenFile`] if the file can't be opened
pub fn open_with_gz<P: AsRef<Path>>(path: P) -> WeightsResult<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|_| WeightsError::CannotOpenFile(path.display().to_string()))?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::with_capacity(
            GZ_BUF_SIZE,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(PLAIN_BUF_SIZE, file)))
    }
}

/// Creates a (possibly gzipped) file for writing
///
/// # Errors
///
/// [`WeightsError::CannotOpenFile`] if the file can't be created
pub fn create_with_gz<P: AsRef<Path>>(path: P) -> WeightsResult<Box<dyn Write>> {
    let path = path.as_ref();
    let file =
        File::create(path).map_err(|_| WeightsError::CannotOpenFile(path.display().to_string()))?;
    if is_gzipped(path) {
        Ok(Box::new(GzEncoder::new(
            BufWriter::new(file),
            Compression::default(),
        )))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Returns a reader for a table with a header row and the given delimiter
pub fn table_reader<R: std::io::Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader)
}

/// Returns a reader for a tab-separated file
///
/// # Errors
///
/// [`WeightsError::CannotOpenFile`] if the file can't be opened
pub fn tsv_reader<P: AsRef<Path>>(path: P) -> WeightsResult<csv::Reader<Box<dyn BufRead>>> {
    Ok(table_reader(open_with_gz(path)?, b'\t'))
}

/// Returns a writer for a tab-separated file, gzip compressed if the path ends in `.gz`
///
/// # Errors
///
/// [`WeightsError::CannotOpenFile`] if the file can't be created
pub fn tsv_writer<P: AsRef<Path>>(path: P) -> WeightsResult<csv::Writer<Box<dyn Write>>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(create_with_gz(path)?))
}

/// Deserializes all rows of a tab-separated file
fn read_rows<T, P>(path: P) -> WeightsResult<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let mut reader = tsv_reader(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Writes all rows to a tab-separated (optionally gzipped) file
///
/// # Errors
///
/// Returns an error if the file cannot be created or written
pub fn write_rows<'a, T, I, P>(path: P, rows: I) -> WeightsResult<()>
where
    T: serde::Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
    P: AsRef<Path>,
{
    let mut writer = tsv_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Module to parse the regional constraint table
///
/// ```text
/// gene    transcript          chr  amino_acids  chisq_diff_null  obs_exp
/// ARID1B  ENST00000346085.5   6    1-1240       0.21             0.93
/// ARID1B  ENST00000346085.5   6    1241-2249    25.88            0.31
/// ```
pub mod constraint {
    use std::path::Path;

    use crate::constraint::ConstraintRegion;
    use crate::WeightsResult;

    /// Parses all rows of the regional constraint table
    pub fn parse<P: AsRef<Path>>(path: P) -> WeightsResult<Vec<ConstraintRegion>> {
        super::read_rows(path)
    }
}

/// Module to parse the transcript structure table
///
/// ```text
/// transcript       gene    chrom  strand  cds_starts       cds_ends
/// ENST00000346085  ARID1B  6      +       157099063,157150361  157100605,157150555
/// ```
pub mod transcripts {
    use std::path::Path;

    use serde::Deserialize;
    use tracing::warn;

    use crate::transcript::ExonTranscript;
    use crate::{Strand, WeightsError, WeightsResult};

    #[derive(Deserialize)]
    struct TranscriptRow {
        transcript: String,
        gene: String,
        chrom: String,
        strand: String,
        cds_starts: String,
        cds_ends: String,
    }

    /// Parses a comma-separated list of positions, ignoring a trailing comma
    fn positions(list: &str) -> WeightsResult<Vec<u64>> {
        list.split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.parse::<u64>().map_err(WeightsError::from))
            .collect()
    }

    fn transcript_from_row(row: &TranscriptRow) -> WeightsResult<ExonTranscript> {
        let strand: Strand = row.strand.parse()?;
        let starts = positions(&row.cds_starts)?;
        let ends = positions(&row.cds_ends)?;
        if starts.len() != ends.len() {
            return Err(WeightsError::InvalidInput(format!(
                "{}: {} CDS starts but {} ends",
                row.transcript,
                starts.len(),
                ends.len()
            )));
        }
        ExonTranscript::new(
            &row.transcript,
            &row.gene,
            &row.chrom,
            strand,
            starts.into_iter().zip(ends),
        )
    }

    /// Parses all transcripts of the transcript structure table
    ///
    /// Rows that don't describe a valid coding transcript (e.g. non-coding
    /// transcripts without CDS) are skipped with a warning.
    pub fn parse<P: AsRef<Path>>(path: P) -> WeightsResult<Vec<ExonTranscript>> {
        let rows: Vec<TranscriptRow> = super::read_rows(path)?;
        let mut transcripts = Vec::with_capacity(rows.len());
        for row in &rows {
            match transcript_from_row(row) {
                Ok(tx) => transcripts.push(tx),
                Err(err) => warn!("Skipping transcript {}: {}", row.transcript, err),
            }
        }
        Ok(transcripts)
    }

}

/// Module to parse de novo variants and their validation results
pub mod de_novos {
    use std::collections::HashMap;
    use std::path::Path;

    use crate::variants::{DeNovo, ValidationRecord, VariantKey};
    use crate::WeightsResult;

    /// Parses all rows of a standardised de novo table
    ///
    /// ```text
    /// person_id  chrom  start_pos  end_pos  ref_allele  alt_allele  hgnc    consequence       type
    /// DDDP1001   6      157100100  157100100  G         A           ARID1B  stop_gained       snv
    /// ```
    pub fn parse<P: AsRef<Path>>(path: P) -> WeightsResult<Vec<DeNovo>> {
        super::read_rows(path)
    }

    /// Parses the validation table into a lookup of validation status by variant
    ///
    /// If a variant is listed multiple times, the first status is used
    pub fn parse_validations<P: AsRef<Path>>(
        path: P,
    ) -> WeightsResult<HashMap<VariantKey, String>> {
        let rows: Vec<ValidationRecord> = super::read_rows(path)?;
        let mut validations = HashMap::with_capacity(rows.len());
        for row in rows {
            let (key, status) = row.into_parts();
            validations.entry(key).or_insert(status);
        }
        Ok(validations)
    }
}

/// Module to count the male and female probands of the cohort
pub mod trios {
    use std::collections::HashSet;
    use std::path::Path;

    use serde::Deserialize;
    use tracing::debug;

    use crate::rates::expected::Cohort;
    use crate::WeightsResult;

    #[derive(Deserialize)]
    struct Trio {
        proband_stable_id: String,
    }

    #[derive(Deserialize)]
    struct FamilyMember {
        individual_id: String,
        sex: String,
    }

    /// Counts male and female probands of all trios
    ///
    /// `trios_path` lists the probands (`proband_stable_id`), `families_path`
    /// the sex of every individual (`individual_id`, `sex` as `M` or `F`).
    pub fn count<P: AsRef<Path>>(trios_path: P, families_path: P) -> WeightsResult<Cohort> {
        let trios: Vec<Trio> = super::read_rows(trios_path)?;
        let probands: HashSet<String> = trios.into_iter().map(|t| t.proband_stable_id).collect();

        let families: Vec<FamilyMember> = super::read_rows(families_path)?;
        let mut cohort = Cohort::default();
        for member in families
            .iter()
            .filter(|member| probands.contains(&member.individual_id))
        {
            match member.sex.as_str() {
                "M" => cohort.male += 1,
                "F" => cohort.female += 1,
                other => debug!("Ignoring proband {} with sex {}", member.individual_id, other),
            }
        }
        Ok(cohort)
    }
}

/// Module to read and write per-site mutation rates
///
/// ```text
/// symbol  chrom  pos        ref  alt  cq        prob
/// ARID1B  6      157099063  A    G    missense  1.2e-08
/// ```
pub mod rates {
    use std::path::Path;

    use crate::rates::SiteRate;
    use crate::WeightsResult;

    /// Parses all rows of a per-site rate table
    pub fn parse<P: AsRef<Path>>(path: P) -> WeightsResult<Vec<SiteRate>> {
        super::read_rows(path)
    }

    /// Writes per-site rates
    pub fn write<P: AsRef<Path>>(path: P, rates: &[SiteRate]) -> WeightsResult<()> {
        super::write_rows(path, rates)
    }
}

/// Module to parse CADD pathogenicity scores
pub mod cadd {
    use std::io::BufRead;
    use std::path::Path;

    use crate::cadd::CaddScore;
    use crate::{WeightsError, WeightsResult};

    /// Parses a table of CADD scores with the columns `chrom`, `pos`, `ref`,
    /// `alt`, `raw` and `score`
    pub fn parse<P: AsRef<Path>>(path: P) -> WeightsResult<Vec<CaddScore>> {
        super::read_rows(path)
    }

    /// Writes CADD scores
    pub fn write<P: AsRef<Path>>(path: P, scores: &[CaddScore]) -> WeightsResult<()> {
        super::write_rows(path, scores)
    }

    /// Parses a single line of the genome-wide CADD release
    ///
    /// ```text
    /// 1   10001   T   A   0.337057    6.254
    /// ```
    pub(crate) fn release_line(line: &str) -> WeightsResult<CaddScore> {
        let mut cols = line.trim_end().split('\t');

        let Some(chrom) = cols.next() else {
            return Err(WeightsError::InvalidInput(line.to_string()));
        };
        let Some(pos) = cols.next() else {
            return Err(WeightsError::InvalidInput(line.to_string()));
        };
        let Some(ref_allele) = cols.next() else {
            return Err(WeightsError::InvalidInput(line.to_string()));
        };
        let Some(alt) = cols.next() else {
            return Err(WeightsError::InvalidInput(line.to_string()));
        };
        let Some(raw) = cols.next() else {
            return Err(WeightsError::InvalidInput(line.to_string()));
        };
        let Some(score) = cols.next() else {
            return Err(WeightsError::InvalidInput(line.to_string()));
        };

        Ok(CaddScore {
            chrom: chrom.to_string(),
            pos: pos.parse()?,
            ref_allele: ref_allele.to_string(),
            alt: alt.to_string(),
            raw: raw.parse()?,
            score: score.parse()?,
        })
    }

    /// Streams the genome-wide CADD release and keeps the scores accepted by `keep`
    ///
    /// Comment lines (starting with `#`) are skipped.
    pub fn filter_release<P, F>(path: P, mut keep: F) -> WeightsResult<Vec<CaddScore>>
    where
        P: AsRef<Path>,
        F: FnMut(&str, u64) -> bool,
    {
        let reader = super::open_with_gz(path)?;
        let mut scores = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let score = release_line(&line)?;
            if keep(&score.chrom, score.pos) {
                scores.push(score);
            }
        }
        Ok(scores)
    }

    #[cfg(test)]
    mod test_cadd_parsing {
        use super::*;

        #[test]
        fn correct_line() {
            let score = release_line("1\t10001\tT\tA\t0.337057\t6.254\n").unwrap();
            assert_eq!(score.chrom, "1");
            assert_eq!(score.pos, 10001);
            assert_eq!(score.ref_allele, "T");
            assert_eq!(score.alt, "A");
            assert!((score.score - 6.254).abs() < f64::EPSILON);
        }

        #[test]
        fn missing_score() {
            assert!(release_line("1\t10001\tT\tA\t0.337057").is_err());
        }

        #[test]
        fn invalid_position() {
            assert!(matches!(
                release_line("1\tabc\tT\tA\t0.3\t6.2"),
                Err(WeightsError::ParseIntError)
            ));
        }
    }
}

/// Module to parse the developmental disorders gene list (DDG2P)
///
/// The file is comma-separated.
pub mod ddg2p {
    use std::collections::HashSet;
    use std::path::Path;

    use serde::Deserialize;

    use crate::WeightsResult;

    /// Requirements that describe a dominant mode of inheritance
    const DOMINANT_REQUIREMENTS: [&str; 2] = ["monoallelic", "x-linked dominant"];
    /// Categories of genes with sufficient evidence
    const CONFIDENT_CATEGORIES: [&str; 3] = ["confirmed", "probable", "both DD and IF"];
    const POSSIBLE_CATEGORY: &str = "possible";

    #[derive(Deserialize)]
    pub(crate) struct Ddg2pRow {
        #[serde(rename = "gene symbol")]
        pub(crate) symbol: String,
        #[serde(rename = "allelic requirement")]
        pub(crate) requirement: Option<String>,
        #[serde(rename = "DDD category")]
        pub(crate) category: Option<String>,
    }

    impl Ddg2pRow {
        pub(crate) fn is_dominant(&self, include_possible: bool) -> bool {
            let (Some(requirement), Some(category)) = (&self.requirement, &self.category) else {
                return false;
            };
            if !DOMINANT_REQUIREMENTS.iter().any(|r| requirement.contains(r)) {
                return false;
            }
            CONFIDENT_CATEGORIES.iter().any(|c| category.contains(c))
                || (include_possible && category.contains(POSSIBLE_CATEGORY))
        }
    }

    /// Returns the symbols of all dominant DDG2P genes
    ///
    /// Set `include_possible` to also include genes with only "possible" evidence
    pub fn dominant_genes<P: AsRef<Path>>(
        path: P,
        include_possible: bool,
    ) -> WeightsResult<HashSet<String>> {
        let mut reader = super::table_reader(super::open_with_gz(path)?, b',');
        let mut genes = HashSet::new();
        for row in reader.deserialize() {
            let row: Ddg2pRow = row?;
            if row.is_dominant(include_possible) {
                genes.insert(row.symbol);
            }
        }
        Ok(genes)
    }

}

//! Regional constraint and de novo mutation enrichment
//!
//! This crate contains the analyses used to check whether de novo mutations
//! in dominant developmental disorder genes are enriched within sub-regions
//! of genes that are under regional constraint.
//!
//! The two central pieces are
//! - [`constraint::constrained_positions`], which finds all coding positions of a
//!   transcript that fall within a significantly constrained region, and
//! - [`stats::enrichment`] / [`stats::fisher::compare_regions`], which compare
//!   observed de novo counts to the expected counts from per-site mutation rates.
//!
//! Everything else loads the study tables, assembles mutation rates and
//! ties the steps together (see [`analysis`]).
//!
//! Gene models and the sequence-context mutation rate model are provided
//! by other tools. They are represented by the [`Transcript`],
//! [`TranscriptResolver`] and [`rates::SiteRateModel`] traits. This crate
//! ships file-backed implementations of each ([`ExonTranscript`],
//! [`TranscriptTable`] and [`rates::RateTable`]).
use core::fmt::Debug;
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

pub mod analysis;
pub mod cadd;
pub mod constraint;
pub mod parser;
pub mod rates;
pub mod stats;
pub mod transcript;
pub mod utils;
pub mod variants;

pub use constraint::{constrained_positions, ConstraintRegion, ConstraintTable, Thresholds};
pub use rates::expected::Cohort;
pub use transcript::{ExonTranscript, Strand, Transcript, TranscriptResolver, TranscriptTable};
pub use variants::DeNovo;

/// Default p-value threshold for a region to count as constrained
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 1e-4;
/// Default upper limit of the observed/expected ratio of a constrained region
pub const DEFAULT_RATIO_THRESHOLD: f64 = 1.0;

/// Errors of all analyses in this crate
#[derive(Error, Debug)]
pub enum WeightsError {
    #[error("{0} does not exist")]
    DoesNotExist(String),
    #[error("unable to open file {0}")]
    CannotOpenFile(String),
    #[error("invalid data: {0}")]
    InvalidInput(String),
    #[error("invalid amino acid region: {0}")]
    InvalidRegion(String),
    #[error("CDS position {position} is outside of transcript {transcript}")]
    OutOfRange { transcript: String, position: u64 },
    #[error("expected count for {0} is zero")]
    ZeroExpected(String),
    #[error("invalid test statistic: {0}")]
    InvalidStatistic(f64),
    #[error("statistics error: {0}")]
    Statistics(#[from] statrs::StatsError),
    #[error("unable to parse Integer")]
    ParseIntError,
    #[error("unable to parse Float")]
    ParseFloatError,
    #[error("invalid table: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseIntError> for WeightsError {
    fn from(_: ParseIntError) -> Self {
        WeightsError::ParseIntError
    }
}

impl From<ParseFloatError> for WeightsError {
    fn from(_: ParseFloatError) -> Self {
        WeightsError::ParseFloatError
    }
}

/// Shortcut for `Result<T, WeightsError>`
pub type WeightsResult<T> = Result<T, WeightsError>;

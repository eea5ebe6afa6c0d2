use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Labels in the samples table that the class map does not know about.
    #[error("unrecognized labels found in samples table: {}", join_labels(.0))]
    InvalidLabel(BTreeSet<String>),

    #[error("index {index} out of range for reader of length {len}")]
    OutOfRange {
        index: usize,
        len: usize,
    },

    #[error("samples table is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid class map {path}: {reason}")]
    ClassMap {
        path: PathBuf,
        reason: String,
    },

    #[error("line {line}: cannot parse `{value}` in column `{column}`")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error("output has {rows} rows but target has {targets} entries")]
    ShapeMismatch {
        rows: usize,
        targets: usize,
    },

    #[error("output has no class columns")]
    NoClasses,

    #[error("verification rate {rate} leaves no verified samples")]
    NoVerifiedSamples {
        rate: f64,
    },
}

fn join_labels(labels: &BTreeSet<String>) -> String {
    labels
        .iter()
        .map(|label| format!("{label:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn parse(line: u64, column: &str, value: &str) -> Error {
    Error::Parse {
        line,
        column: column.to_string(),
        value: value.to_string(),
    }
}

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::{ s, Array1, Array2, ArrayView1, ArrayView2 };
use tracing::info;

use crate::error::{ self, Error, Result };

const TARGET_COLUMN: &str = "target";

/// Model outputs dumped to csv: a `target` column plus one score column per
/// class, in header order.
#[derive(Debug, Clone)]
pub struct Predictions {
    classes: Vec<String>,
    output: Array2<f32>,
    target: Array1<usize>,
}

impl Predictions {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Predictions> {
        let path = path.as_ref();
        let predictions = Self::from_reader(File::open(path)?)?;
        info!(
            path = %path.display(),
            samples = predictions.len(),
            classes = predictions.num_classes(),
            "loaded predictions"
        );
        Ok(predictions)
    }

    pub fn from_reader<R: Read>(source: R) -> Result<Predictions> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(source);

        let headers = csv_reader.headers()?.clone();
        let target_idx = headers
            .iter()
            .position(|header| header.trim() == TARGET_COLUMN)
            .ok_or(Error::MissingColumn(TARGET_COLUMN))?;
        let classes: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != target_idx)
            .map(|(_, header)| header.trim().to_string())
            .collect();

        let mut scores: Vec<f32> = Vec::new();
        let mut targets: Vec<usize> = Vec::new();

        for record in csv_reader.records() {
            let record = record?;
            let line = record
                .position()
                .map(|pos| pos.line())
                .unwrap_or_default();

            for (idx, value) in record.iter().enumerate() {
                let value = value.trim();
                if idx == target_idx {
                    let target = value
                        .parse::<usize>()
                        .map_err(|_| error::parse(line, TARGET_COLUMN, value))?;
                    targets.push(target);
                } else {
                    let score = value
                        .parse::<f32>()
                        .map_err(|_| error::parse(line, &headers[idx], value))?;
                    scores.push(score);
                }
            }
        }

        let rows = if classes.is_empty() { targets.len() } else { scores.len() / classes.len() };
        let output = Array2::from_shape_vec((targets.len(), classes.len()), scores).map_err(
            |_| Error::ShapeMismatch {
                rows,
                targets: targets.len(),
            }
        )?;

        Ok(Predictions {
            classes,
            output,
            target: Array1::from(targets),
        })
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn output(&self) -> ArrayView2<'_, f32> {
        self.output.view()
    }

    pub fn target(&self) -> ArrayView1<'_, usize> {
        self.target.view()
    }

    pub fn loader(&self, batch_size: usize) -> PredictionLoader<'_> {
        PredictionLoader::new(self, batch_size)
    }
}

/// One batch of model outputs and the matching targets.
#[derive(Debug, Clone)]
pub struct PredictionBatch<'a> {
    pub output: ArrayView2<'a, f32>,
    pub target: ArrayView1<'a, usize>,
}

impl PredictionBatch<'_> {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// Walks the predictions in file order, `batch_size` rows at a time.
pub struct PredictionLoader<'a> {
    predictions: &'a Predictions,
    batch_size: usize,
    batch_index: usize,
}

impl<'a> PredictionLoader<'a> {
    pub fn new(predictions: &'a Predictions, batch_size: usize) -> PredictionLoader<'a> {
        PredictionLoader {
            predictions,
            batch_size: batch_size.max(1),
            batch_index: 0,
        }
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Number of batches based on the dataset size and batch size
    pub fn len_batch(&self) -> usize {
        self.predictions.len().div_ceil(self.batch_size)
    }
}

impl<'a> Iterator for PredictionLoader<'a> {
    type Item = PredictionBatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let predictions = self.predictions;
        let total = predictions.len();
        let start = self.batch_index * self.batch_size;
        if start >= total {
            return None;
        }
        let end = (start + self.batch_size).min(total);
        self.batch_index += 1;

        Some(PredictionBatch {
            output: predictions.output.slice(s![start..end, ..]),
            target: predictions.target.slice(s![start..end]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "target,cat,dog,bird\n0,0.7,0.2,0.1\n2,0.1,0.3,0.6\n1,0.5,0.4,0.1\n";

    #[test]
    fn parses_scores_and_targets() {
        let predictions = Predictions::from_reader(CSV.as_bytes()).unwrap();

        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions.classes(), &["cat", "dog", "bird"]);
        assert_eq!(predictions.target().to_vec(), vec![0, 2, 1]);
        assert_eq!(predictions.output()[[1, 2]], 0.6);
    }

    #[test]
    fn target_column_may_be_anywhere() {
        let csv = "a,target,b\n0.1,1,0.9\n";
        let predictions = Predictions::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(predictions.classes(), &["a", "b"]);
        assert_eq!(predictions.output().row(0).to_vec(), vec![0.1, 0.9]);
    }

    #[test]
    fn batches_cover_every_row_once() {
        let predictions = Predictions::from_reader(CSV.as_bytes()).unwrap();
        let loader = predictions.loader(2);
        assert_eq!(loader.len_batch(), 2);

        let sizes: Vec<usize> = loader.map(|batch| batch.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn bad_score_reports_column() {
        let csv = "target,cat\n0,oops\n";
        let err = Predictions::from_reader(csv.as_bytes()).unwrap_err();

        match err {
            Error::Parse { column, value, .. } => {
                assert_eq!(column, "cat");
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_target_column() {
        let csv = "cat,dog\n0.1,0.9\n";
        assert!(matches!(
            Predictions::from_reader(csv.as_bytes()),
            Err(Error::MissingColumn("target"))
        ));
    }
}

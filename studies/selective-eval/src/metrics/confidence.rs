use ndarray::{ ArrayView1, ArrayView2 };
use tracing::debug;

use crate::error::{ Error, Result };
use crate::metrics::topk::{ check_shapes, top1 };

/// Verification rates reported by default.
pub const EVAL_VERIFICATION_RATES: [f64; 5] = [0.01, 0.02, 0.05, 0.1, 0.2];

/// Collects top-1 correctness and top-1 confidence for every example, so the
/// accuracy can be measured when the least confident predictions are checked
/// by hand.
#[derive(Debug, Default, Clone)]
pub struct CorrectnessConfidenceMeter {
    predictions_correct: Vec<Vec<bool>>,
    confidences: Vec<Vec<f32>>,
}

impl CorrectnessConfidenceMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.predictions_correct.clear();
        self.confidences.clear();
    }

    /// Appends one correctness flag and one confidence per row of `output`.
    pub fn update(
        &mut self,
        output: ArrayView2<'_, f32>,
        target: ArrayView1<'_, usize>
    ) -> Result<()> {
        check_shapes(&output, &target)?;
        if output.ncols() == 0 {
            return Err(Error::NoClasses);
        }

        let mut correct = Vec::with_capacity(target.len());
        let mut confidences = Vec::with_capacity(target.len());
        for (row, &label) in output.outer_iter().zip(target.iter()) {
            let (pred, confidence) = top1(row).ok_or(Error::NoClasses)?;
            correct.push(pred == label);
            confidences.push(confidence);
        }

        self.predictions_correct.push(correct);
        self.confidences.push(confidences);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.confidences.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accuracy when the `round(vr * N)` least confident predictions are
    /// verified and therefore counted as correct.
    ///
    /// An empty meter yields NaN.
    pub fn final_accuracy(&self, verification_rates: &[f64]) -> Vec<f64> {
        let correct_sorted = self.correct_sorted_by_confidence();
        let total = correct_sorted.len();

        verification_rates
            .iter()
            .map(|&rate| {
                let n_verified = n_verified(rate, total);
                let unverified_correct = count_correct(&correct_sorted[n_verified..]);
                ((n_verified + unverified_correct) as f64) / (total as f64)
            })
            .collect()
    }

    /// Expected accuracy when the verification budget is spread over the
    /// least confident predictions instead of cut off at a hard threshold.
    ///
    /// The i-th least confident prediction (1-indexed) is weighted by
    /// `i / n_verified`, the remaining ones count as-is, and `(n - 1) / 2`
    /// is added before dividing by N. A rate that verifies no example is an
    /// error.
    pub fn average_final_accuracy(&self, verification_rates: &[f64]) -> Result<Vec<f64>> {
        let correct_sorted = self.correct_sorted_by_confidence();
        let total = correct_sorted.len();

        verification_rates
            .iter()
            .map(|&rate| {
                let n_verified = n_verified(rate, total);
                if n_verified == 0 {
                    return Err(Error::NoVerifiedSamples { rate });
                }

                let n = n_verified as f64;
                let weighted: f64 = correct_sorted[..n_verified]
                    .iter()
                    .enumerate()
                    .filter(|(_, correct)| **correct)
                    .map(|(i, _)| ((i + 1) as f64) / n)
                    .sum();
                let unverified_correct = count_correct(&correct_sorted[n_verified..]) as f64;

                Ok(((n - 1.0) / 2.0 + weighted + unverified_correct) / (total as f64))
            })
            .collect()
    }

    /// Correctness flags ordered by ascending confidence. Equal confidences
    /// keep the order they were recorded in.
    fn correct_sorted_by_confidence(&self) -> Vec<bool> {
        let mut pairs: Vec<(bool, f32)> = self.predictions_correct
            .iter()
            .flatten()
            .copied()
            .zip(self.confidences.iter().flatten().copied())
            .collect();
        pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
        debug!(samples = pairs.len(), "sorted predictions by confidence");
        pairs
            .into_iter()
            .map(|(correct, _)| correct)
            .collect()
    }
}

/// `round(rate * total)` with ties going to the even neighbour, kept inside
/// `0..=total`.
pub fn n_verified(rate: f64, total: usize) -> usize {
    let n = (rate * (total as f64)).round_ties_even();
    if n <= 0.0 { 0 } else { (n as usize).min(total) }
}

fn count_correct(correct: &[bool]) -> usize {
    correct
        .iter()
        .filter(|c| **c)
        .count()
}

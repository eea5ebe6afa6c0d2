use std::sync::mpsc::Sender;

use serde::Serialize;
use tracing::{ debug, info, warn };
use ui::state::EvalState;

use crate::data::Predictions;
use crate::error::{ Error, Result };
use crate::metrics::{ accuracy, AverageMeter, CorrectnessConfidenceMeter, EVAL_VERIFICATION_RATES };

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOptions {
    pub batch_size: usize,
    pub topk: Vec<usize>,
    pub verification_rates: Vec<f64>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            batch_size: 256,
            topk: vec![1, 5],
            verification_rates: EVAL_VERIFICATION_RATES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKResult {
    pub k: usize,
    /// Percentage of samples with the target among the top k.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub rate: f64,
    pub final_accuracy: f64,
    /// `None` when the rate verifies no sample at all.
    pub average_final_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub samples: usize,
    pub classes: usize,
    pub top_k: Vec<TopKResult>,
    pub verification: Vec<VerificationResult>,
}

/// Runs the top-k meters and the confidence meter over `predictions`, batch
/// by batch. When `tx` is given a snapshot is sent after every batch and once
/// more when the report is ready.
pub fn evaluate(
    predictions: &Predictions,
    options: &EvalOptions,
    tx: Option<&Sender<EvalState>>
) -> Result<EvalReport> {
    let loader = predictions.loader(options.batch_size);

    let mut state = EvalState::default();
    state.progress.max_batch = loader.len_batch();
    state.progress.batch_size = options.batch_size;
    state.progress.total_samples = loader.len();
    send(tx, &state);

    let mut topk_meters: Vec<AverageMeter> = vec![AverageMeter::new(); options.topk.len()];
    let mut confidence_meter = CorrectnessConfidenceMeter::new();

    for (i, batch) in loader.enumerate() {
        let acc = accuracy(batch.output, batch.target, &options.topk)?;
        for (meter, value) in topk_meters.iter_mut().zip(&acc) {
            meter.update_n(*value, batch.len() as f64);
        }
        confidence_meter.update(batch.output, batch.target)?;

        debug!(batch = i, size = batch.len(), accuracy = ?acc, "evaluated batch");

        state.progress.current_batch = i + 1;
        state.progress.samples_seen += batch.len();
        if let Some(top1) = acc.first() {
            state.history.push((format!("Batch {}", i + 1), format!("{top1:.2}%")));
        }
        state.topk = topk_rows(&options.topk, &topk_meters);
        send(tx, &state);
    }

    let top_k: Vec<TopKResult> = options.topk
        .iter()
        .zip(&topk_meters)
        .map(|(&k, meter)| TopKResult { k, accuracy: meter.avg() })
        .collect();

    let final_accuracy = confidence_meter.final_accuracy(&options.verification_rates);
    let mut verification = Vec::with_capacity(options.verification_rates.len());
    for (&rate, &final_accuracy) in options.verification_rates.iter().zip(&final_accuracy) {
        let average_final_accuracy = match confidence_meter.average_final_accuracy(&[rate]) {
            Ok(values) => values.first().copied(),
            Err(Error::NoVerifiedSamples { rate }) => {
                warn!(rate, samples = confidence_meter.len(), "rate verifies no sample");
                None
            }
            Err(err) => {
                return Err(err);
            }
        };
        verification.push(VerificationResult { rate, final_accuracy, average_final_accuracy });
    }

    state.curves.final_accuracy = verification
        .iter()
        .map(|v| (v.rate * 100.0, v.final_accuracy * 100.0))
        .collect();
    state.curves.average_final_accuracy = verification
        .iter()
        .filter_map(|v| v.average_final_accuracy.map(|afa| (v.rate * 100.0, afa * 100.0)))
        .collect();
    state.finished = true;
    send(tx, &state);

    let report = EvalReport {
        samples: confidence_meter.len(),
        classes: predictions.num_classes(),
        top_k,
        verification,
    };
    info!(samples = report.samples, "evaluation finished");
    Ok(report)
}

impl EvalReport {
    /// One line per metric, in the order they were requested.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let topk = self.top_k
            .iter()
            .map(|result| format!("Acc@{} {:.3}", result.k, result.accuracy))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("* {topk} ({} samples)", self.samples));

        for result in &self.verification {
            let afa = result.average_final_accuracy
                .map(|afa| format!("{:.3}", afa * 100.0))
                .unwrap_or_else(|| "-".to_string());
            lines.push(
                format!(
                    "* vr {:.2}: final accuracy {:.3} | average final accuracy {}",
                    result.rate,
                    result.final_accuracy * 100.0,
                    afa
                )
            );
        }
        lines
    }
}

fn topk_rows(topk: &[usize], meters: &[AverageMeter]) -> Vec<(String, String)> {
    topk.iter()
        .zip(meters)
        .map(|(k, meter)| (format!("Acc@{k}"), format!("{:.2}%", meter.avg())))
        .collect()
}

fn send(tx: Option<&Sender<EvalState>>, state: &EvalState) {
    if let Some(tx) = tx {
        // the dashboard may already be gone
        tx.send(state.clone()).ok();
    }
}

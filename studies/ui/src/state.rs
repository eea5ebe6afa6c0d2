use std::sync::{ Arc, Mutex };

/// Accuracy (y, in %) against verification rate (x, in %).
#[derive(Debug, Default, Clone)]
pub struct Curves {
    pub final_accuracy: Vec<(f64, f64)>,
    pub average_final_accuracy: Vec<(f64, f64)>,
}

#[derive(Debug, Default, Clone)]
pub struct Progress {
    pub current_batch: usize,
    pub max_batch: usize,
    pub batch_size: usize,
    pub samples_seen: usize,
    pub total_samples: usize,
}

impl Progress {
    pub fn ratio(&self) -> f64 {
        if self.total_samples == 0 {
            0.0
        } else {
            ((self.samples_seen as f64) / (self.total_samples as f64)).clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct EvalState {
    pub progress: Progress,
    pub curves: Curves,
    /// (metric, value) rows such as ("Acc@1", "76.13%").
    pub topk: Vec<(String, String)>,
    pub history: Vec<(String, String)>,
    pub finished: bool,
}

pub type StateMutex = Arc<Mutex<EvalState>>;

//! Eval metrics and related.

pub mod average;
pub mod confidence;
pub mod topk;

pub use average::AverageMeter;
pub use confidence::{ CorrectnessConfidenceMeter, EVAL_VERIFICATION_RATES };
pub use topk::accuracy;

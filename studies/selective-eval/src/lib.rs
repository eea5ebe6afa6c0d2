//! Dataset reader and evaluation metrics for image classifiers: a csv-driven
//! `filename -> label` reader, running averages, top-k accuracy and
//! selective prediction accuracy under verification budgets.

pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod metrics;

pub use error::{ Error, Result };

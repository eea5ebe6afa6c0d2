pub mod class_map;
pub mod predictions;
pub mod reader;

pub use class_map::ClassMap;
pub use predictions::{ PredictionBatch, PredictionLoader, Predictions };
pub use reader::{ CsvPathsReader, FilenameForm, Reader, Sample };

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ self, Read };
use std::path::{ Path, PathBuf };

use tracing::{ debug, info };

use crate::data::class_map::ClassMap;
use crate::error::{ Error, Result };

const FILENAME_COLUMN: &str = "filename";
const LABEL_COLUMN: &str = "label";

/// How a stored filename is reported by [`Reader::filename`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FilenameForm {
    /// Only the final path component.
    Basename,
    /// The filename exactly as stored in the samples table.
    Absolute,
    /// The filename relative to the images directory.
    #[default]
    RelativeToRoot,
}

/// An opened sample. The file handle is closed when the sample is dropped.
#[derive(Debug)]
pub struct Sample {
    pub file: File,
    pub label: usize,
}

impl Sample {
    pub fn into_parts(self) -> (File, usize) {
        (self.file, self.label)
    }
}

impl Read for Sample {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Random access over (file, label) pairs.
pub trait Reader {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens the sample at `index` for binary reading.
    fn get_item(&self, index: usize) -> Result<Sample>;

    fn filename(&self, index: usize, form: FilenameForm) -> Result<PathBuf>;

    fn filenames(&self, form: FilenameForm) -> Result<Vec<PathBuf>> {
        (0..self.len()).map(|index| self.filename(index, form)).collect()
    }

    /// Runs `f` on the opened sample and closes the handle before returning.
    fn with_item<T, F>(&self, index: usize, f: F) -> Result<T>
        where Self: Sized, F: FnOnce(&mut File, usize) -> T
    {
        let mut sample = self.get_item(index)?;
        let out = f(&mut sample.file, sample.label);
        drop(sample);
        Ok(out)
    }
}

/// Reads images from a single folder, driven by a csv of `filename,label`
/// rows with filenames relative to that folder.
#[derive(Debug, Clone)]
pub struct CsvPathsReader {
    images_dir: PathBuf,
    samples: Vec<(PathBuf, usize)>,
}

impl CsvPathsReader {
    pub fn new<D, P>(images_dir: D, samples_csv_path: P, class_map: &ClassMap) -> Result<Self>
        where D: AsRef<Path>, P: AsRef<Path>
    {
        let samples_csv_path = samples_csv_path.as_ref();
        let file = File::open(samples_csv_path)?;
        let reader = Self::from_reader(images_dir, file, class_map)?;
        info!(
            samples = reader.len(),
            table = %samples_csv_path.display(),
            images_dir = %reader.images_dir.display(),
            "loaded samples table"
        );
        Ok(reader)
    }

    /// Builds the reader from any csv source. Every value is kept as a string
    /// until labels are translated through `class_map`.
    pub fn from_reader<D: AsRef<Path>, R: Read>(
        images_dir: D,
        source: R,
        class_map: &ClassMap
    ) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(source);

        let headers = csv_reader.headers()?.clone();
        let filename_idx = column_index(&headers, FILENAME_COLUMN)?;
        let label_idx = column_index(&headers, LABEL_COLUMN)?;

        let mut rows: Vec<(String, String)> = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let filename = record.get(filename_idx).unwrap_or_default().to_string();
            let label = record.get(label_idx).unwrap_or_default().to_string();
            rows.push((filename, label));
        }

        let unrecognized: BTreeSet<String> = rows
            .iter()
            .filter(|(_, label)| !class_map.contains(label))
            .map(|(_, label)| label.clone())
            .collect();
        if !unrecognized.is_empty() {
            return Err(Error::InvalidLabel(unrecognized));
        }

        let samples = rows
            .into_iter()
            .filter_map(|(filename, label)| {
                class_map.get(&label).map(|idx| (PathBuf::from(filename), idx))
            })
            .collect::<Vec<_>>();

        debug!(samples = samples.len(), classes = class_map.len(), "translated sample labels");

        Ok(CsvPathsReader {
            images_dir: images_dir.as_ref().to_path_buf(),
            samples,
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Class ids in row order.
    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples.iter().map(|(_, label)| *label)
    }

    fn sample(&self, index: usize) -> Result<&(PathBuf, usize)> {
        self.samples.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.samples.len(),
        })
    }
}

impl Reader for CsvPathsReader {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get_item(&self, index: usize) -> Result<Sample> {
        let (filename, label) = self.sample(index)?;
        let path = self.images_dir.join(filename);
        debug!(index, path = %path.display(), label, "opening sample");
        let file = File::open(&path)?;
        Ok(Sample { file, label: *label })
    }

    fn filename(&self, index: usize, form: FilenameForm) -> Result<PathBuf> {
        let (filename, _) = self.sample(index)?;
        let filename = match form {
            FilenameForm::Basename =>
                filename.file_name().map(PathBuf::from).unwrap_or_default(),
            FilenameForm::Absolute => filename.clone(),
            FilenameForm::RelativeToRoot =>
                filename
                    .strip_prefix(&self.images_dir)
                    .unwrap_or(filename.as_path())
                    .to_path_buf(),
        };
        Ok(filename)
    }
}

fn column_index(headers: &csv::StringRecord, column: &'static str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or(Error::MissingColumn(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_map() -> ClassMap {
        ClassMap::from_labels(["cat", "dog"])
    }

    #[test]
    fn translates_labels_in_row_order() {
        let csv = "filename,label\na.jpg,dog\nb.jpg,cat\nc.jpg,dog\n";
        let reader = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap();

        assert_eq!(reader.len(), 3);
        assert_eq!(reader.labels().collect::<Vec<_>>(), vec![1, 0, 1]);
    }

    #[test]
    fn ignores_extra_columns_and_their_order() {
        let csv = "label,width,filename\ncat,32,a.jpg\n";
        let reader = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap();

        assert_eq!(reader.filename(0, FilenameForm::Absolute).unwrap(), PathBuf::from("a.jpg"));
        assert_eq!(reader.labels().next(), Some(0));
    }

    #[test]
    fn reports_every_unrecognized_label() {
        let csv = "filename,label\na.jpg,cat\nb.jpg,bird\nc.jpg,fish\nd.jpg,bird\n";
        let err = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap_err();

        match err {
            Error::InvalidLabel(labels) => {
                assert_eq!(
                    labels.into_iter().collect::<Vec<_>>(),
                    vec!["bird".to_string(), "fish".to_string()]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_labels_are_compared_as_strings() {
        let map: ClassMap = [("3", 0), ("10", 1)].into_iter().collect();
        let csv = "filename,label\na.jpg,10\nb.jpg,3\n";
        let reader = CsvPathsReader::from_reader("/images", csv.as_bytes(), &map).unwrap();

        assert_eq!(reader.labels().collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn missing_label_column_is_an_error() {
        let csv = "filename,class\na.jpg,cat\n";
        let err = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn("label")));
    }

    #[test]
    fn empty_table_is_allowed() {
        let csv = "filename,label\n";
        let reader = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap();
        assert!(reader.is_empty());
        assert!(reader.filenames(FilenameForm::Basename).unwrap().is_empty());
    }

    #[test]
    fn filename_forms() {
        let csv = "filename,label\nsub/a.jpg,cat\n/images/sub/b.jpg,dog\n";
        let reader = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap();

        assert_eq!(reader.filename(0, FilenameForm::Basename).unwrap(), PathBuf::from("a.jpg"));
        assert_eq!(reader.filename(0, FilenameForm::Absolute).unwrap(), PathBuf::from("sub/a.jpg"));
        assert_eq!(
            reader.filename(0, FilenameForm::RelativeToRoot).unwrap(),
            PathBuf::from("sub/a.jpg")
        );

        assert_eq!(
            reader.filename(1, FilenameForm::Absolute).unwrap(),
            PathBuf::from("/images/sub/b.jpg")
        );
        assert_eq!(
            reader.filename(1, FilenameForm::RelativeToRoot).unwrap(),
            PathBuf::from("sub/b.jpg")
        );
        assert_eq!(FilenameForm::default(), FilenameForm::RelativeToRoot);
    }

    #[test]
    fn out_of_range_index() {
        let csv = "filename,label\na.jpg,cat\n";
        let reader = CsvPathsReader::from_reader("/images", csv.as_bytes(), &class_map()).unwrap();

        assert!(matches!(reader.get_item(1), Err(Error::OutOfRange { index: 1, len: 1 })));
        assert!(
            matches!(reader.filename(5, FilenameForm::Basename), Err(Error::OutOfRange { .. }))
        );
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ Error, Result };

/// Maps raw label strings to integer class ids.
///
/// Ids are passed through untouched, so they do not have to be contiguous or
/// start at zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassMap {
    class_to_idx: HashMap<String, usize>,
}

impl ClassMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns ids in iteration order, the first label getting id 0.
    pub fn from_labels<I, S>(labels: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        let mut map = ClassMap::new();
        for (idx, label) in labels.into_iter().enumerate() {
            map.insert(label, idx);
        }
        map
    }

    /// Loads a class map from disk.
    ///
    /// `.txt` files hold one class name per line (id = line order, blank
    /// lines skipped). `.json` files hold an object of `label: id` pairs.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ClassMap> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        let map = match extension.as_deref() {
            Some("txt") => {
                let contents = fs::read_to_string(path)?;
                ClassMap::from_labels(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                )
            }
            Some("json") => {
                let contents = fs::read_to_string(path)?;
                let class_to_idx: HashMap<String, usize> = serde_json::from_str(&contents)?;
                ClassMap { class_to_idx }
            }
            _ => {
                return Err(Error::ClassMap {
                    path: path.to_path_buf(),
                    reason: "expected a .txt or .json file".to_string(),
                });
            }
        };

        debug!(path = %path.display(), classes = map.len(), "loaded class map");
        Ok(map)
    }

    pub fn insert<S: Into<String>>(&mut self, label: S, idx: usize) -> Option<usize> {
        self.class_to_idx.insert(label.into(), idx)
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.class_to_idx.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.class_to_idx.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.class_to_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_to_idx.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.class_to_idx.iter().map(|(label, idx)| (label.as_str(), *idx))
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for ClassMap {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        ClassMap {
            class_to_idx: iter
                .into_iter()
                .map(|(label, idx)| (label.into(), idx))
                .collect(),
        }
    }
}

//! Label-index mapping for classifier outputs.
//!
//! Stored as a flat JSON object, `{"hola": 0, "gracias": 1}`. Indices must
//! be unique and cover `0..K` so every classifier output position has
//! exactly one label.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use signgate_common::error::{SigngateError, SigngateResult};

/// Bidirectional label <-> class-index table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, usize>", into = "BTreeMap<String, usize>")]
pub struct LabelMap {
    by_index: Vec<String>,
}

impl LabelMap {
    /// Labels in class-index order.
    pub fn from_labels<I, S>(labels: I) -> SigngateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = labels
            .into_iter()
            .enumerate()
            .map(|(i, l)| (l.into(), i))
            .collect::<BTreeMap<_, _>>();
        Self::try_from(map)
    }

    /// Read a label map file.
    pub fn load(path: impl AsRef<Path>) -> SigngateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SigngateError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Label for a class index.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.by_index.get(index).map(String::as_str)
    }

    /// Class index for a label.
    pub fn index(&self, label: &str) -> Option<usize> {
        self.by_index.iter().position(|l| l == label)
    }

    /// Number of classes (K).
    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    /// Labels in class-index order.
    pub fn labels(&self) -> &[String] {
        &self.by_index
    }
}

impl TryFrom<BTreeMap<String, usize>> for LabelMap {
    type Error = SigngateError;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        if map.is_empty() {
            return Err(SigngateError::model("label map is empty"));
        }
        let len = map.len();
        let mut by_index: Vec<Option<String>> = vec![None; len];
        for (label, index) in map {
            let slot = by_index.get_mut(index).ok_or_else(|| {
                SigngateError::model(format!(
                    "label {label:?} has index {index}, outside 0..{len}"
                ))
            })?;
            if let Some(existing) = slot {
                return Err(SigngateError::model(format!(
                    "labels {existing:?} and {label:?} share index {index}"
                )));
            }
            *slot = Some(label);
        }
        Ok(Self {
            by_index: by_index.into_iter().flatten().collect(),
        })
    }
}

impl From<LabelMap> for BTreeMap<String, usize> {
    fn from(map: LabelMap) -> Self {
        map.by_index
            .into_iter()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_lookup() {
        let map: LabelMap =
            serde_json::from_str(r#"{"hola": 0, "gracias": 1, "si": 2, "no": 3}"#).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.label(1), Some("gracias"));
        assert_eq!(map.index("no"), Some(3));
        assert_eq!(map.label(4), None);
        assert_eq!(map.labels()[0], "hola");
    }

    #[test]
    fn test_rejects_gaps() {
        let result: Result<LabelMap, _> = serde_json::from_str(r#"{"hola": 0, "gracias": 2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_index_names_the_bound() {
        let err = LabelMap::try_from(BTreeMap::from([
            ("hola".to_string(), 0),
            ("gracias".to_string(), 5),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("outside 0..2"), "{err}");
    }

    #[test]
    fn test_rejects_duplicate_index() {
        let result: Result<LabelMap, _> = serde_json::from_str(r#"{"hola": 0, "si": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_labels_keeps_order() {
        let map = LabelMap::from_labels(["hola", "gracias", "si"]).unwrap();
        assert_eq!(map.index("si"), Some(2));
        let json = serde_json::to_string(&map).unwrap();
        let parsed: LabelMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }
}

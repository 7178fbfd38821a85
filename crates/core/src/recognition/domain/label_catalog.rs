use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Mapping from identity label to person name.
///
/// Built at training time with dense labels starting at 0, one per person
/// folder in enumeration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    names: BTreeMap<u32, String>,
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    labels: Vec<LabelEntry>,
}

#[derive(Serialize, Deserialize)]
struct LabelEntry {
    id: u32,
    name: String,
}

impl LabelCatalog {
    /// Assigns labels `0..names.len()` in the order given.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| (i as u32, n.into()))
            .collect();
        Self { names }
    }

    pub fn name(&self, label: u32) -> Option<&str> {
        self.names.get(&label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(label, name)` pairs in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let file = CatalogFile {
            labels: self
                .iter()
                .map(|(id, name)| LabelEntry {
                    id,
                    name: name.to_string(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&file)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self {
            names: file.labels.into_iter().map(|e| (e.id, e.name)).collect(),
        })
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::shared::constants::IMAGE_EXTENSIONS;

#[derive(Error, Debug)]
pub enum DataFolderError {
    #[error("invalid person name '{0}'")]
    InvalidName(String),
    #[error("person '{0}' already exists")]
    AlreadyExists(String),
    #[error("person '{0}' does not exist")]
    UnknownPerson(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of an image import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub copied: Vec<PathBuf>,
    /// Files that were not images or could not be copied.
    pub skipped: usize,
}

/// Training photo store: one subfolder per person, named after them.
pub struct DataFolder {
    root: PathBuf,
}

impl DataFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Person folders as `(name, path)`, sorted by name.
    pub fn persons(&self) -> io::Result<Vec<(String, PathBuf)>> {
        let mut persons: Vec<(String, PathBuf)> = fs::read_dir(&self.root)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Some((name, path))
            })
            .collect();
        persons.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(persons)
    }

    pub fn add_person(&self, name: &str) -> Result<PathBuf, DataFolderError> {
        let folder = self.person_path(name)?;
        if folder.exists() {
            return Err(DataFolderError::AlreadyExists(name.trim().to_string()));
        }
        fs::create_dir_all(&folder).map_err(|source| DataFolderError::Io {
            path: folder.clone(),
            source,
        })?;
        log::info!("Added person folder {}", folder.display());
        Ok(folder)
    }

    /// Copies `files` into the person's folder. A name that is already
    /// taken gets a `_yyyyMMddHHmmss` suffix before the extension.
    pub fn add_images(&self, name: &str, files: &[PathBuf]) -> Result<ImportSummary, DataFolderError> {
        self.add_images_at(name, files, Local::now())
    }

    fn add_images_at(
        &self,
        name: &str,
        files: &[PathBuf],
        now: DateTime<Local>,
    ) -> Result<ImportSummary, DataFolderError> {
        let folder = self.person_path(name)?;
        if !folder.is_dir() {
            return Err(DataFolderError::UnknownPerson(name.trim().to_string()));
        }

        let mut summary = ImportSummary::default();
        for file in files {
            if !is_training_image(file) {
                log::warn!("Skipping {}: not a supported image", file.display());
                summary.skipped += 1;
                continue;
            }
            let Some(file_name) = file.file_name() else {
                summary.skipped += 1;
                continue;
            };

            let mut dest = folder.join(file_name);
            if dest.exists() {
                dest = timestamped(&dest, now);
            }
            match fs::copy(file, &dest) {
                Ok(_) => summary.copied.push(dest),
                Err(e) => {
                    log::warn!("Could not copy {}: {e}", file.display());
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    fn person_path(&self, name: &str) -> Result<PathBuf, DataFolderError> {
        let trimmed = name.trim();
        let valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed.contains(['/', '\\']);
        if !valid {
            return Err(DataFolderError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(trimmed))
    }
}

/// Training photos directly inside `folder`, sorted by path.
pub fn image_files(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(folder) else {
        log::warn!("Cannot list {}", folder.display());
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_training_image(path))
        .collect();
    files.sort();
    files
}

pub fn is_training_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn timestamped(path: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}_{}", now.format("%Y%m%d%H%M%S"));
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

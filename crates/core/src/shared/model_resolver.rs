use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("configured model {0} does not exist")]
    Missing(PathBuf),
    #[error("no user cache directory on this platform")]
    NoCacheDir,
    #[error("cannot create {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fetching {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot store model at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Called as bytes arrive with `(received, expected)`; `expected` is 0
/// when the server sends no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Locates the detector weights.
///
/// A configured path is used as-is and must exist. Otherwise `name` is
/// looked up in the per-user model cache and fetched from `url` on first
/// use.
pub fn resolve(
    configured: Option<&Path>,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    match configured {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ModelResolveError::Missing(path.to_path_buf())),
        None => resolve_in(&model_cache_dir()?, name, url, progress),
    }
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let target = cache_dir.join(name);
    if target.is_file() {
        log::debug!("Using cached model {}", target.display());
        return Ok(target);
    }

    fs::create_dir_all(cache_dir).map_err(|source| ModelResolveError::CacheDir {
        path: cache_dir.to_path_buf(),
        source,
    })?;
    log::info!("Fetching {name} into {}", cache_dir.display());
    download(url, &target, progress)?;
    Ok(target)
}

/// `FaceWatch/models` under the platform's data (macOS) or cache
/// directory.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|dir| dir.join("FaceWatch").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` to a `.part` sibling and renames it into place, so an
/// interrupted fetch never leaves a truncated model behind.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let partial = dest.with_extension("part");
    let outcome = fetch_to(url, &partial, progress)
        .and_then(|()| rename(&partial, dest));
    if outcome.is_err() {
        let _ = fs::remove_file(&partial);
    }
    outcome
}

fn fetch_to(url: &str, path: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;
    let write_err = |source| ModelResolveError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::create(path).map_err(write_err)?;
    let mut sink = ProgressWriter {
        inner: io::BufWriter::new(file),
        written: 0,
        expected: response.content_length().unwrap_or(0),
        progress,
    };
    io::copy(&mut response, &mut sink).map_err(write_err)?;
    sink.flush().map_err(write_err)
}

fn rename(from: &Path, to: &Path) -> Result<(), ModelResolveError> {
    fs::rename(from, to).map_err(|source| ModelResolveError::Write {
        path: to.to_path_buf(),
        source,
    })
}

/// Counts bytes on their way to `inner` and reports them.
struct ProgressWriter<W> {
    inner: W,
    written: u64,
    expected: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(report) = &self.progress {
            report(self.written, self.expected);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const NOWHERE: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_existing_configured_model_wins() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("custom.onnx");
        fs::write(&model, b"weights").unwrap();

        assert_eq!(resolve(Some(&model), "other.onnx", NOWHERE, None).unwrap(), model);
    }

    #[test]
    fn test_absent_configured_model_is_not_downloaded() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("absent.onnx");

        let err = resolve(Some(&model), "other.onnx", NOWHERE, None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == model));
        assert!(!model.exists());
    }

    #[test]
    fn test_cached_model_skips_network() {
        let cache = TempDir::new().unwrap();
        fs::write(cache.path().join("face.onnx"), b"weights").unwrap();

        let path = resolve_in(cache.path(), "face.onnx", NOWHERE, None).unwrap();
        assert_eq!(path, cache.path().join("face.onnx"));
    }

    #[test]
    fn test_failed_fetch_leaves_cache_clean() {
        let cache = TempDir::new().unwrap();
        let dir = cache.path().join("models");

        assert!(resolve_in(&dir, "face.onnx", NOWHERE, None).is_err());
        assert!(!dir.join("face.onnx").exists());
        assert!(!dir.join("face.part").exists());
    }

    #[test]
    fn test_cache_dir_is_app_specific() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("FaceWatch"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_progress_writer_reports_running_total() {
        let seen = Arc::new(AtomicU64::new(0));
        let sink_seen = seen.clone();
        let mut writer = ProgressWriter {
            inner: Vec::new(),
            written: 0,
            expected: 6,
            progress: Some(Box::new(move |done, total| {
                assert_eq!(total, 6);
                sink_seen.store(done, Ordering::SeqCst);
            })),
        };

        writer.write_all(b"abc").unwrap();
        writer.write_all(b"def").unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert_eq!(writer.inner, b"abcdef");
    }
}

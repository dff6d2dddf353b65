use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("model {0} not found locally and no download URL is configured")]
    NotAvailable(String),
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where a model file may come from.
#[derive(Clone, Debug, Default)]
pub struct ModelSource {
    /// Explicit file; when set, nothing else is consulted.
    pub path: Option<PathBuf>,
    /// Fallback download location, fetched into the cache on first use.
    pub url: Option<String>,
}

/// Locates model files on disk, downloading into a cache directory when allowed.
pub struct ModelResolver {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelResolver {
    pub fn new(cache_dir: PathBuf, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            bundled_dir,
        }
    }

    /// Resolver rooted at the platform model cache.
    pub fn platform(bundled_dir: Option<PathBuf>) -> Result<Self, ModelResolveError> {
        Ok(Self::new(model_cache_dir()?, bundled_dir))
    }

    /// Resolve a model file by name.
    ///
    /// Resolution order:
    /// 1. Explicit path from `source`
    /// 2. Cache directory
    /// 3. Bundled directory
    /// 4. Download from `source.url` into the cache
    pub fn resolve(
        &self,
        name: &str,
        source: &ModelSource,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = &source.path {
            return if path.exists() {
                Ok(path.clone())
            } else {
                Err(ModelResolveError::MissingFile(path.clone()))
            };
        }

        let cached_path = self.cache_dir.join(name);
        if cached_path.exists() {
            return Ok(cached_path);
        }

        if let Some(dir) = &self.bundled_dir {
            let bundled_path = dir.join(name);
            if bundled_path.exists() {
                return Ok(bundled_path);
            }
        }

        let url = source
            .url
            .as_deref()
            .ok_or_else(|| ModelResolveError::NotAvailable(name.to_string()))?;
        fs::create_dir_all(&self.cache_dir).map_err(ModelResolveError::CacheDir)?;
        log::info!("Downloading model {name} from {url}");
        download(url, &cached_path, progress)?;
        Ok(cached_path)
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceRecognizer/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceRecognizer/models/` or `~/.cache/FaceRecognizer/models/`
/// - Windows: `%LOCALAPPDATA%/FaceRecognizer/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    };
    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver(tmp: &TempDir) -> ModelResolver {
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        ModelResolver::new(tmp.path().join("cache"), Some(bundled))
    }

    #[test]
    fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("mine.onnx");
        fs::write(&explicit, b"model").unwrap();
        let source = ModelSource {
            path: Some(explicit.clone()),
            url: None,
        };

        let resolved = resolver(&tmp).resolve("m.onnx", &source, None).unwrap();

        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let source = ModelSource {
            path: Some(tmp.path().join("absent.onnx")),
            url: Some("http://invalid.example.com/m.onnx".into()),
        };

        let err = resolver(&tmp).resolve("m.onnx", &source, None).unwrap_err();

        assert!(matches!(err, ModelResolveError::MissingFile(_)));
    }

    #[test]
    fn test_cache_checked_before_bundled() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp);
        fs::create_dir_all(tmp.path().join("cache")).unwrap();
        fs::write(tmp.path().join("cache").join("m.onnx"), b"cached").unwrap();
        fs::write(tmp.path().join("bundled").join("m.onnx"), b"bundled").unwrap();

        let resolved = r.resolve("m.onnx", &ModelSource::default(), None).unwrap();

        assert_eq!(fs::read(resolved).unwrap(), b"cached");
    }

    #[test]
    fn test_bundled_used_when_cache_empty() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp);
        fs::write(tmp.path().join("bundled").join("m.onnx"), b"bundled").unwrap();

        let resolved = r.resolve("m.onnx", &ModelSource::default(), None).unwrap();

        assert_eq!(resolved, tmp.path().join("bundled").join("m.onnx"));
    }

    #[test]
    fn test_not_available_without_url() {
        let tmp = TempDir::new().unwrap();
        let err = resolver(&tmp)
            .resolve("m.onnx", &ModelSource::default(), None)
            .unwrap_err();
        assert!(matches!(err, ModelResolveError::NotAvailable(name) if name == "m.onnx"));
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_invalid_url_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}

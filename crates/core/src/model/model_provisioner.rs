use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::model::downloader::{DownloadError, Downloader, HttpDownloader, ProgressFn};
use crate::shared::constants::{
    APP_DIR_NAME, COMPRESSED_MODEL_NAME, MODEL_DIR_ENV, MODEL_MIRRORS, MODEL_NAME,
};

const PART_SUFFIX: &str = ".part";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("could not download the model from any mirror: {}", .urls.join(", "))]
    DownloadFailed { urls: Vec<String> },
    #[error("failed to create model directory {path}: {source}")]
    ModelDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decompress {path}: {source}")]
    Decompress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not determine model directory")]
    NoModelDir,
}

/// Makes sure the 68-point shape predictor exists on disk.
///
/// The model is fetched as a bzip2 archive from the first mirror that
/// answers, decompressed under a temporary name and renamed into place, so
/// a present model file is always complete.
pub struct ModelProvisioner {
    model_dir: PathBuf,
    mirrors: Vec<String>,
    downloader: Box<dyn Downloader>,
    progress: Option<ProgressFn>,
}

impl ModelProvisioner {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            mirrors: MODEL_MIRRORS.iter().map(|u| u.to_string()).collect(),
            downloader: Box::new(HttpDownloader),
            progress: None,
        }
    }

    /// Provisioner rooted at [`default_model_dir`].
    pub fn from_env() -> Result<Self, ModelError> {
        Ok(Self::new(default_model_dir()?))
    }

    pub fn with_mirrors<I, S>(mut self, mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mirrors = mirrors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_downloader(mut self, downloader: Box<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    /// Where the decompressed model lives.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_NAME)
    }

    fn compressed_path(&self) -> PathBuf {
        self.model_dir.join(COMPRESSED_MODEL_NAME)
    }

    /// Resolve the model file to use.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used and the model is downloaded there on first use; once present no
    /// network access happens.
    pub fn ensure_model(&self, path: Option<&Path>) -> Result<PathBuf, ModelError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ModelError::ModelNotFound(path.to_path_buf()));
            }
            return Ok(path.to_path_buf());
        }

        let model = self.model_path();
        if model.exists() {
            return Ok(model);
        }
        self.download_model()
    }

    /// Download, decompress and publish the model, trying mirrors in order.
    ///
    /// A compressed archive left behind by an interrupted earlier run is
    /// reused when every mirror fails. Concurrent callers each write private
    /// temporary files; whoever loses the race to publish gets the model the
    /// winner put in place.
    pub fn download_model(&self) -> Result<PathBuf, ModelError> {
        let model = self.model_path();
        match self.fetch_and_publish(&model) {
            Err(e) if model.is_file() => {
                log::debug!("Model was published concurrently ({e})");
                Ok(model)
            }
            result => result.map(|()| model),
        }
    }

    fn fetch_and_publish(&self, model: &Path) -> Result<(), ModelError> {
        fs::create_dir_all(&self.model_dir).map_err(|source| ModelError::ModelDir {
            path: self.model_dir.clone(),
            source,
        })?;

        let compressed = self.compressed_path();
        let mut fetched = false;
        for url in &self.mirrors {
            log::info!("Downloading shape predictor model from {url} ...");
            match self.fetch_to(url, &compressed) {
                Ok(bytes) => {
                    log::info!("Downloaded {bytes} bytes from {url}");
                    fetched = true;
                    break;
                }
                Err(e) => log::warn!("Could not download from {url}: {e}"),
            }
        }

        if !fetched {
            if !compressed.is_file() {
                return Err(ModelError::DownloadFailed {
                    urls: self.mirrors.clone(),
                });
            }
            log::warn!(
                "All mirrors failed; reusing existing archive {}",
                compressed.display()
            );
        }

        log::info!("Decompressing model into {}", self.model_dir.display());
        decompress(&compressed, model)?;

        match fs::remove_file(&compressed) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(ModelError::Write {
                path: compressed,
                source: e,
            }),
            _ => Ok(()),
        }
    }

    fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        // Dropping the temp file on error removes it.
        let mut file = BufWriter::new(part_file(dest)?);
        let bytes = self
            .downloader
            .fetch(url, &mut file, self.progress.as_ref())?;
        let temp = file.into_inner().map_err(|e| e.into_error())?;
        temp.persist(dest).map_err(|e| e.error)?;
        Ok(bytes)
    }
}

/// Model directory: `$FACEMARK_MODEL_DIR` when set, otherwise a
/// platform-specific location.
///
/// - macOS: `~/Library/Application Support/Facemark/models/`
/// - Linux: `$XDG_CACHE_HOME/Facemark/models/` or `~/.cache/Facemark/models/`
/// - Windows: `%LOCALAPPDATA%/Facemark/models/`
pub fn default_model_dir() -> Result<PathBuf, ModelError> {
    model_dir_from(std::env::var_os(MODEL_DIR_ENV))
}

fn model_dir_from(env_override: Option<OsString>) -> Result<PathBuf, ModelError> {
    if let Some(dir) = env_override.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelError::NoModelDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelError::NoModelDir)
    }
}

/// A uniquely named `<dest>.XXXXXX.part` file next to `dest`, removed
/// unless persisted.
fn part_file(dest: &Path) -> io::Result<NamedTempFile> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut prefix = dest.file_name().unwrap_or_default().to_owned();
    prefix.push(".");
    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(PART_SUFFIX)
        .tempfile_in(dir)
}

/// Decompress a single-stream bzip2 file, publishing `dest` atomically.
fn decompress(src: &Path, dest: &Path) -> Result<(), ModelError> {
    let decompress_err = |source: io::Error| ModelError::Decompress {
        path: src.to_path_buf(),
        source,
    };
    let write_err = |source: io::Error| ModelError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let input = File::open(src).map_err(decompress_err)?;
    let mut decoder = BzDecoder::new(BufReader::new(input));
    let mut output = BufWriter::new(part_file(dest).map_err(write_err)?);

    io::copy(&mut decoder, &mut output).map_err(decompress_err)?;
    let temp = output
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(dest).map_err(|e| write_err(e.error))?;
    Ok(())
}

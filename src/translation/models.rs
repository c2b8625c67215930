//! Model file management for the local translator
//!
//! Downloads, caches and verifies the Marian ONNX export files. Files are
//! fetched from a Hugging Face repository and kept in a per-repository
//! directory under the application data dir.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Environment variable that disables downloads
pub const OFFLINE_ENV: &str = "SCREEN_TRANSLATOR_OFFLINE";

/// Files that make up a Marian ONNX export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    /// Encoder graph
    Encoder,
    /// Decoder graph (no past key values)
    Decoder,
    /// Token to id map
    Vocabulary,
    /// Model configuration with the special token ids
    Config,
}

impl ModelFile {
    pub const ALL: [ModelFile; 4] = [
        ModelFile::Encoder,
        ModelFile::Decoder,
        ModelFile::Vocabulary,
        ModelFile::Config,
    ];

    /// Path inside the repository
    pub fn remote_path(&self) -> &'static str {
        match self {
            ModelFile::Encoder => "onnx/encoder_model.onnx",
            ModelFile::Decoder => "onnx/decoder_model.onnx",
            ModelFile::Vocabulary => "vocab.json",
            ModelFile::Config => "config.json",
        }
    }

    /// Local file name
    pub fn filename(&self) -> &'static str {
        match self {
            ModelFile::Encoder => "encoder_model.onnx",
            ModelFile::Decoder => "decoder_model.onnx",
            ModelFile::Vocabulary => "vocab.json",
            ModelFile::Config => "config.json",
        }
    }

    /// Smallest plausible size in bytes; anything below is a broken download
    pub fn min_size(&self) -> u64 {
        match self {
            ModelFile::Encoder | ModelFile::Decoder => 1_000_000,
            ModelFile::Vocabulary => 10_000,
            ModelFile::Config => 100,
        }
    }

    pub fn download_url(&self, repository: &str) -> String {
        format!(
            "https://huggingface.co/{}/resolve/main/{}",
            repository,
            self.remote_path()
        )
    }
}

/// Manifest of downloaded files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelManifest {
    pub repository: String,
    pub files: Vec<ModelFileInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFileInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    /// Seconds since the Unix epoch
    pub downloaded_at: u64,
}

/// Downloads and caches the files of one model repository
pub struct ModelManager {
    repository: String,
    models_dir: PathBuf,
}

impl ModelManager {
    /// Manager storing files under `<data dir>/models/<repository>`
    pub fn new(repository: &str) -> Result<Self> {
        let data_dir = crate::storage::get_data_dir()?;
        let models_dir = data_dir.join("models").join(sanitize(repository));
        Self::with_dir(repository, models_dir)
    }

    /// Manager storing files in `models_dir`
    pub fn with_dir(repository: &str, models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)
            .with_context(|| format!("Failed to create models directory {:?}", models_dir))?;
        Ok(Self {
            repository: repository.to_string(),
            models_dir,
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn file_path(&self, file: ModelFile) -> PathBuf {
        self.models_dir.join(file.filename())
    }

    /// Whether a file exists with a plausible size
    pub fn is_available(&self, file: ModelFile) -> bool {
        std::fs::metadata(self.file_path(file))
            .map(|m| m.len() >= file.min_size())
            .unwrap_or(false)
    }

    pub fn is_ready(&self) -> bool {
        ModelFile::ALL.iter().all(|&f| self.is_available(f))
    }

    /// Make sure every file is present, downloading what is missing
    pub fn ensure_all(&self) -> Result<()> {
        let missing: Vec<ModelFile> = ModelFile::ALL
            .iter()
            .copied()
            .filter(|&f| !self.is_available(f))
            .collect();

        if missing.is_empty() {
            debug!("Model files for {} already present in {:?}", self.repository, self.models_dir);
            return Ok(());
        }

        if std::env::var_os(OFFLINE_ENV).is_some() {
            anyhow::bail!(
                "Offline mode: missing {:?}. Download them from https://huggingface.co/{} into {:?}",
                missing.iter().map(|f| f.filename()).collect::<Vec<_>>(),
                self.repository,
                self.models_dir
            );
        }

        let rt = Runtime::new().context("Failed to create tokio runtime")?;
        for file in missing {
            let url = file.download_url(&self.repository);
            info!("Downloading {} from {}", file.filename(), url);

            let path = self.file_path(file);
            let info = rt.block_on(download_file(&url, &path))?;

            if !self.is_available(file) {
                anyhow::bail!("Downloaded {} is smaller than expected", file.filename());
            }
            self.record(info)?;
        }

        info!("Model {} ready in {:?}", self.repository, self.models_dir);
        Ok(())
    }

    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let path = self.models_dir.join("manifest.json");
        if !path.exists() {
            return Ok(ModelManifest {
                repository: self.repository.clone(),
                files: Vec::new(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(self.models_dir.join("manifest.json"), content)?;
        Ok(())
    }

    fn record(&self, info: ModelFileInfo) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        manifest.repository = self.repository.clone();

        match manifest.files.iter_mut().find(|f| f.filename == info.filename) {
            Some(existing) => *existing = info,
            None => manifest.files.push(info),
        }
        self.save_manifest(&manifest)
    }
}

/// Stream `url` into a temp file next to `path`, then rename it into place
async fn download_file(url: &str, path: &Path) -> Result<ModelFileInfo> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to send download request")?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }
    debug!("Download size: {:?} bytes", response.content_length());

    let temp_path = path.with_extension("part");
    let mut file = std::fs::File::create(&temp_path).context("Failed to create temp file")?;

    let mut hasher = Sha256::new();
    let mut size: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Error reading download stream")?;
        file.write_all(&chunk).context("Failed to write to temp file")?;
        hasher.update(&chunk);
        size += chunk.len() as u64;
    }

    file.flush().context("Failed to flush temp file")?;
    drop(file);

    std::fs::rename(&temp_path, path).context("Failed to move downloaded file into place")?;

    Ok(ModelFileInfo {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_bytes: size,
        sha256: format!("{:x}", hasher.finalize()),
        downloaded_at: SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    })
}

/// Repository name as a single path component
fn sanitize(repository: &str) -> String {
    repository
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

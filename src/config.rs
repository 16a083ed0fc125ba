use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::core::ResizePolicy;
use crate::foundation::error::{StickerError, StickerResult};

/// Run-wide settings. Built once, validated, then shared read-only by every worker.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub layout: OutputLayout,
    /// Number of assets converted concurrently.
    pub workers: usize,
    /// Height the still frame is resized to before it is centered on the canvas.
    pub still_target_height: u32,
    /// Policy used when only the canonical variant is requested.
    pub canonical_policy: ResizePolicy,
    /// Keep the bridge's intermediate file in the scratch directory after transcoding.
    pub keep_intermediate: bool,
    pub bridge: BridgeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layout: OutputLayout::default(),
            workers: 2,
            still_target_height: 240,
            canonical_policy: ResizePolicy::Scale,
            keep_intermediate: false,
            bridge: BridgeConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_path(path: &Path) -> StickerResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes).map_err(|e| {
            StickerError::config(format!("parse config '{}': {e}", path.display()))
        })?;
        Ok(cfg)
    }

    pub fn validate(&self) -> StickerResult<()> {
        if self.workers == 0 {
            return Err(StickerError::config("workers must be at least 1"));
        }
        if self.still_target_height == 0 {
            return Err(StickerError::config("still_target_height must be non-zero"));
        }
        self.bridge.validate()
    }
}

/// Destination directories. Each is created on demand before any asset is touched.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputLayout {
    pub static_dir: PathBuf,
    pub animated_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("emotes/static"),
            animated_dir: PathBuf::from("emotes/animated"),
            scratch_dir: PathBuf::from("emotes/tmp"),
        }
    }
}

impl OutputLayout {
    /// Create every directory. Failure here is fatal for the run.
    pub fn ensure(&self) -> StickerResult<()> {
        for dir in [&self.static_dir, &self.animated_dir, &self.scratch_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                StickerError::config(format!(
                    "failed to create output directory '{}': {e}",
                    dir.display()
                ))
            })?;
        }
        tracing::debug!(
            static_dir = %self.static_dir.display(),
            animated_dir = %self.animated_dir.display(),
            scratch_dir = %self.scratch_dir.display(),
            "output directories ready"
        );
        Ok(())
    }

    pub fn still_path(&self, name: &str) -> PathBuf {
        self.static_dir.join(format!("{name}.png"))
    }

    /// Reserve a fresh `{name}-XXXXXX.gif` in the scratch directory. The file is deleted when the
    /// returned handle drops, unless it is kept with [`tempfile::TempPath::keep`].
    pub fn intermediate_file(&self, name: &str) -> StickerResult<tempfile::TempPath> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{name}-"))
            .suffix(".gif")
            .tempfile_in(&self.scratch_dir)
            .with_context(|| {
                format!(
                    "reserve intermediate for '{name}' in '{}'",
                    self.scratch_dir.display()
                )
            })?;
        Ok(file.into_temp_path())
    }
}

/// Endpoint and limits for the remote webp-to-gif service.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub upload_url: String,
    /// Multipart field name carrying the source file.
    pub upload_field: String,
    /// Regex locating the download link inside the trigger response HTML.
    pub save_link_pattern: String,
    /// Applied to every HTTP step separately.
    pub timeout_secs: u64,
    pub chunk_size: usize,
    /// Total attempts per asset, first try included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on every further retry.
    pub backoff_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            upload_url: "https://ezgif.com/webp-to-gif".to_string(),
            upload_field: "new-image".to_string(),
            save_link_pattern: r"https://ezgif\.com/save/ezgif-\d-\w+\.gif".to_string(),
            timeout_secs: 60,
            chunk_size: 8192,
            max_attempts: 1,
            backoff_ms: 500,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> StickerResult<()> {
        if self.upload_url.trim().is_empty() {
            return Err(StickerError::config("bridge.upload_url must not be empty"));
        }
        reqwest::Url::parse(&self.upload_url)
            .map_err(|e| StickerError::config(format!("bridge.upload_url is invalid: {e}")))?;
        regex::Regex::new(&self.save_link_pattern).map_err(|e| {
            StickerError::config(format!("bridge.save_link_pattern does not compile: {e}"))
        })?;
        if self.chunk_size == 0 {
            return Err(StickerError::config("bridge.chunk_size must be non-zero"));
        }
        if self.max_attempts == 0 {
            return Err(StickerError::config("bridge.max_attempts must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(StickerError::config("bridge.timeout_secs must be non-zero"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before attempt number `attempt` (1-based; the first attempt has none).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64 << (attempt - 2).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

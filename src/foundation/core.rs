use std::path::{Path, PathBuf};

use crate::foundation::error::{StickerError, StickerResult};

/// Edge length of the square sticker canvas, in pixels.
pub const CANVAS_SIZE: u32 = 512;

/// One input handed over by the asset-acquisition side: a local file and the name its outputs
/// are written under.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceAsset {
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl SourceAsset {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, animated: bool) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            animated,
        }
    }

    /// Reject names that cannot be used verbatim as a file stem inside an output directory.
    pub fn validate(&self) -> StickerResult<()> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(StickerError::validation("asset name must not be empty"));
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(StickerError::validation(format!(
                "asset name '{name}' must be a plain file stem"
            )));
        }
        Ok(())
    }
}

/// Reject a batch in which two assets would write the same outputs.
pub fn ensure_unique_names(assets: &[SourceAsset]) -> StickerResult<()> {
    let mut seen = std::collections::HashSet::with_capacity(assets.len());
    for asset in assets {
        if !seen.insert(asset.name.as_str()) {
            return Err(StickerError::validation(format!(
                "asset name '{}' appears more than once",
                asset.name
            )));
        }
    }
    Ok(())
}

/// Geometric treatment applied to an animated source before encoding.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    /// Scale the longer side to the canvas size.
    #[default]
    Scale,
    /// Pad onto a transparent canvas without resampling.
    Pad,
}

impl ResizePolicy {
    pub const ALL: [ResizePolicy; 2] = [ResizePolicy::Scale, ResizePolicy::Pad];

    pub fn variant_tag(self) -> VariantTag {
        match self {
            Self::Scale => VariantTag::Default,
            Self::Pad => VariantTag::Pad,
        }
    }
}

/// Label distinguishing the geometric variants of one source in output file names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantTag {
    Default,
    Pad,
}

impl VariantTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pad => "pad",
        }
    }
}

/// Fixed encoder contract for animated stickers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeSpec {
    pub fps: u32,
    pub pixel_format: &'static str,
    pub video_codec: &'static str,
    pub container_ext: &'static str,
    pub strip_audio: bool,
}

impl Default for EncodeSpec {
    fn default() -> Self {
        Self {
            fps: 30,
            pixel_format: "yuva420p",
            video_codec: "libvpx-vp9",
            container_ext: "webm",
            strip_audio: true,
        }
    }
}

/// A file produced for one asset.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub variant_tag: VariantTag,
    /// Set when the long-duration branch cut the clip short.
    pub trimmed: bool,
}

/// All files produced for one asset, in encode order.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct OutputSet {
    pub files: Vec<OutputFile>,
}

impl OutputSet {
    pub fn single(file: OutputFile) -> Self {
        Self { files: vec![file] }
    }

    pub fn push(&mut self, file: OutputFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }
}

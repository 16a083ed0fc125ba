use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{SourceAsset, ensure_unique_names};
use crate::foundation::error::{StickerError, StickerResult};

/// Read a JSON array of `{ "path", "name", "animated" }` entries.
///
/// Relative paths are taken relative to the manifest's own directory. Names must be unique.
pub fn load_manifest(path: &Path) -> StickerResult<Vec<SourceAsset>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read manifest '{}'", path.display()))?;
    let mut assets: Vec<SourceAsset> = serde_json::from_slice(&bytes).map_err(|e| {
        StickerError::config(format!("parse manifest '{}': {e}", path.display()))
    })?;
    ensure_unique_names(&assets)?;

    let root = path.parent().unwrap_or_else(|| Path::new("."));
    for asset in &mut assets {
        if asset.path.is_relative() {
            asset.path = root.join(&asset.path);
        }
    }
    Ok(assets)
}

use crate::bridge::BridgeError;

/// Result alias used across the crate.
pub type StickerResult<T> = Result<T, StickerError>;

/// Every failure the pipeline can report for a single asset (or for the run as a whole, in the
/// case of [`StickerError::Config`]).
#[derive(thiserror::Error, Debug)]
pub enum StickerError {
    /// Invalid per-asset input, such as an unusable output name.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unusable run configuration. The only kind that aborts a whole batch.
    #[error("config error: {0}")]
    Config(String),

    /// The media file could not be opened or carries no decodable stream.
    #[error("probe error: {0}")]
    Probe(String),

    /// A still frame could not be decoded, composed or written.
    #[error("rasterize error: {0}")]
    Rasterize(String),

    /// The remote conversion service failed one of its protocol steps.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Filter graph or encoder failure.
    #[error("transcode error: {0}")]
    Transcode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StickerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    pub fn rasterize(msg: impl Into<String>) -> Self {
        Self::Rasterize(msg.into())
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode(msg.into())
    }

    /// `true` for errors that should stop the whole run rather than one asset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

//! Stickerize turns emote images into messaging-platform stickers.
//!
//! - Still images are resized and centered on a transparent 512×512 PNG canvas.
//! - Animated WebP sources are converted to GIF through a remote service, probed, then
//!   re-encoded to VP9/WebM with alpha, fitted to 512 px and kept to about three seconds.
//!
//! The entry point is [`TranscodePipeline`], which converts one [`SourceAsset`] at a time or a
//! whole batch on a worker pool.
#![forbid(unsafe_code)]

mod foundation;

pub mod bridge;
pub mod config;
pub mod manifest;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod raster;
pub mod transcode;

pub use crate::foundation::core::{
    CANVAS_SIZE, EncodeSpec, OutputFile, OutputSet, ResizePolicy, SourceAsset, VariantTag,
    ensure_unique_names,
};
pub use crate::foundation::error::{StickerError, StickerResult};

pub use crate::bridge::{BridgeError, FormatBridge, RemoteFormatBridge};
pub use crate::config::{BridgeConfig, OutputLayout, PipelineConfig};
pub use crate::manifest::load_manifest;
pub use crate::pipeline::{AssetState, BatchReport, TranscodePipeline};
pub use crate::probe::{ProbeResult, probe};
pub use crate::progress::{IndicatifReporter, NullReporter, ProgressReporter};
pub use crate::raster::Rasterizer;
pub use crate::transcode::{DurationClass, EncodePlan, VideoTranscoder};

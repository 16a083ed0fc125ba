//! Per-asset orchestration and the batch worker pool.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tempfile::TempPath;

use crate::bridge::{BridgeError, FormatBridge, RemoteFormatBridge};
use crate::config::PipelineConfig;
use crate::foundation::core::{
    EncodeSpec, OutputFile, OutputSet, ResizePolicy, SourceAsset, ensure_unique_names,
};
use crate::foundation::error::{StickerError, StickerResult};
use crate::probe;
use crate::progress::{CompletionCounter, ProgressReporter};
use crate::raster::Rasterizer;
use crate::transcode::VideoTranscoder;

/// Lifecycle of one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetState {
    Idle,
    Rasterized,
    BridgeConverted,
    Probed,
    Transcoded,
    Done,
    Failed,
}

impl AssetState {
    /// Whether `self -> next` is a legal step.
    pub fn allows(self, next: AssetState) -> bool {
        use AssetState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Rasterized | BridgeConverted) => true,
            (Rasterized, Done) => true,
            (BridgeConverted, Probed) => true,
            (Probed, Transcoded) => true,
            (Transcoded, Done) => true,
            _ => false,
        }
    }
}

struct AssetRun<'a> {
    name: &'a str,
    state: AssetState,
}

impl<'a> AssetRun<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            state: AssetState::Idle,
        }
    }

    fn advance(&mut self, next: AssetState) {
        debug_assert!(
            self.state.allows(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(asset = self.name, from = ?self.state, to = ?next, "state");
        self.state = next;
    }
}

fn release_intermediate(scratch: TempPath, keep: bool) {
    if keep {
        match scratch.keep() {
            Ok(path) => tracing::debug!(path = %path.display(), "intermediate kept"),
            Err(e) => tracing::warn!(error = %e, "failed to keep intermediate"),
        }
        return;
    }
    let shown = scratch.display().to_string();
    match scratch.close() {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %shown, error = %e, "failed to remove intermediate"),
    }
}

/// Outcome of a batch. Order follows the input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(String, OutputSet)>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Converts source assets into stickers.
pub struct TranscodePipeline {
    config: Arc<PipelineConfig>,
    bridge: Box<dyn FormatBridge>,
    rasterizer: Rasterizer,
    transcoder: VideoTranscoder,
}

impl TranscodePipeline {
    /// Validate `config`, create the output directories and connect to the remote bridge.
    pub fn new(config: PipelineConfig) -> StickerResult<Self> {
        config.validate()?;
        let bridge = RemoteFormatBridge::from_config(&config.bridge)?;
        Self::with_bridge(config, Box::new(bridge))
    }

    /// Like [`TranscodePipeline::new`] with a caller-supplied bridge.
    pub fn with_bridge(
        config: PipelineConfig,
        bridge: Box<dyn FormatBridge>,
    ) -> StickerResult<Self> {
        config.validate()?;
        config.layout.ensure()?;
        let rasterizer = Rasterizer::new(config.still_target_height);
        let transcoder = VideoTranscoder::new(EncodeSpec::default(), &config.layout.animated_dir);
        Ok(Self {
            config: Arc::new(config),
            bridge,
            rasterizer,
            transcoder,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Policies to encode: every variant, or only the canonical one.
    pub fn variants(&self, all_variants: bool) -> Vec<ResizePolicy> {
        if all_variants {
            ResizePolicy::ALL.to_vec()
        } else {
            vec![self.config.canonical_policy]
        }
    }

    /// Convert one asset.
    pub fn convert(&self, asset: &SourceAsset, all_variants: bool) -> StickerResult<OutputSet> {
        asset.validate()?;
        if !asset.path.is_file() {
            return Err(StickerError::validation(format!(
                "source '{}' does not exist",
                asset.path.display()
            )));
        }

        let mut run = AssetRun::new(&asset.name);
        let result = if asset.animated {
            self.convert_animated(&mut run, asset, all_variants)
        } else {
            self.convert_still(&mut run, asset)
        };
        match &result {
            Ok(_) => run.advance(AssetState::Done),
            Err(_) => run.advance(AssetState::Failed),
        }
        result
    }

    fn convert_still(
        &self,
        run: &mut AssetRun<'_>,
        asset: &SourceAsset,
    ) -> StickerResult<OutputSet> {
        let out = self.config.layout.still_path(&asset.name);
        self.rasterizer.rasterize(&asset.path, &out)?;
        run.advance(AssetState::Rasterized);
        tracing::info!(output = %out.display(), "still sticker written");
        Ok(OutputSet::single(OutputFile {
            path: out,
            variant_tag: ResizePolicy::Scale.variant_tag(),
            trimmed: false,
        }))
    }

    fn convert_animated(
        &self,
        run: &mut AssetRun<'_>,
        asset: &SourceAsset,
        all_variants: bool,
    ) -> StickerResult<OutputSet> {
        let scratch = self.config.layout.intermediate_file(&asset.name)?;
        let result = self.encode_intermediate(run, asset, &scratch, all_variants);
        release_intermediate(scratch, self.config.keep_intermediate);
        result
    }

    fn encode_intermediate(
        &self,
        run: &mut AssetRun<'_>,
        asset: &SourceAsset,
        intermediate: &Path,
        all_variants: bool,
    ) -> StickerResult<OutputSet> {
        self.bridge_with_retry(&asset.path, intermediate)?;
        run.advance(AssetState::BridgeConverted);
        tracing::info!(intermediate = %intermediate.display(), "bridge conversion done");

        let probe = probe::probe(intermediate)?;
        run.advance(AssetState::Probed);

        let variants = self.variants(all_variants);
        let outputs = self
            .transcoder
            .transcode(intermediate, &asset.name, &probe, &variants)?;
        run.advance(AssetState::Transcoded);
        Ok(outputs)
    }

    fn bridge_with_retry(&self, src: &Path, dst: &Path) -> Result<(), BridgeError> {
        let cfg = &self.config.bridge;
        let mut attempt = 1;
        loop {
            let delay = cfg.backoff_before(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            match self.bridge.convert(src, dst) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < cfg.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max = cfg.max_attempts,
                        error = %e,
                        "bridge attempt failed"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Convert every asset on a pool of `workers` threads. Per-asset failures are logged and
    /// collected. Duplicate names and pool setup failures are returned as errors before any
    /// asset is touched.
    pub fn run_batch(
        &self,
        assets: &[SourceAsset],
        all_variants: bool,
        reporter: &dyn ProgressReporter,
    ) -> StickerResult<BatchReport> {
        ensure_unique_names(assets)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("stickerize-{i}"))
            .build()
            .map_err(|e| StickerError::config(format!("failed to start worker pool: {e}")))?;

        reporter.start(assets.len() as u64);
        let counter = CompletionCounter::new(reporter);
        let results: Vec<StickerResult<OutputSet>> = pool.install(|| {
            assets
                .par_iter()
                .map(|asset| {
                    let span = tracing::info_span!("asset", name = %asset.name);
                    let _enter = span.enter();
                    let result = self.convert(asset, all_variants);
                    if let Err(e) = &result {
                        tracing::error!(
                            path = %asset.path.display(),
                            error = %e,
                            "conversion failed"
                        );
                    }
                    counter.complete(&asset.name, result.is_ok());
                    result
                })
                .collect()
        });
        reporter.finish();

        let mut report = BatchReport::default();
        for (asset, result) in assets.iter().zip(results) {
            match result {
                Ok(outputs) => report.succeeded.push((asset.name.clone(), outputs)),
                Err(e) => report.failed.push((asset.name.clone(), e.to_string())),
            }
        }
        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;

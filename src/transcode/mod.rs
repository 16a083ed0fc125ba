//! Re-encoding of the bridge's intermediate GIF into VP9/WebM stickers.
//!
//! Planning is pure: [`VideoTranscoder::plan`] turns a probe result and the requested
//! variants into one [`EncodePlan`] per variant. Execution shells out to the system `ffmpeg`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::core::{EncodeSpec, OutputFile, OutputSet, ResizePolicy, VariantTag};
use crate::foundation::error::{StickerError, StickerResult};
use crate::probe::ProbeResult;

/// Duration classes and geometry filters.
pub mod policy;

pub use policy::DurationClass;

/// One fully resolved `ffmpeg` invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub variant_tag: VariantTag,
    pub trimmed: bool,
    /// Filter chain in application order.
    pub filters: Vec<String>,
    /// Frame size the chain is expected to produce.
    pub frame_size: (u32, u32),
}

impl EncodePlan {
    /// The `-vf` argument.
    pub fn filter_chain(&self) -> String {
        self.filters.join(",")
    }

    pub fn ffmpeg_args(&self, spec: &EncodeSpec) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-nostdin", "-v", "error", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(self.input.clone().into_os_string());
        if spec.strip_audio {
            args.push("-an".into());
        }
        args.extend(
            [
                "-vf".to_string(),
                self.filter_chain(),
                "-c:v".to_string(),
                spec.video_codec.to_string(),
                "-pix_fmt".to_string(),
                spec.pixel_format.to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(self.output.clone().into_os_string());
        args
    }
}

/// Builds and runs the filter/encode pipeline for animated stickers.
#[derive(Clone, Debug)]
pub struct VideoTranscoder {
    spec: EncodeSpec,
    out_dir: PathBuf,
}

impl VideoTranscoder {
    pub fn new(spec: EncodeSpec, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            out_dir: out_dir.into(),
        }
    }

    pub fn spec(&self) -> &EncodeSpec {
        &self.spec
    }

    /// Resolve one encode per distinct policy in `variants`, in request order.
    pub fn plan(
        &self,
        intermediate: &Path,
        name: &str,
        probe: &ProbeResult,
        variants: &[ResizePolicy],
    ) -> StickerResult<Vec<EncodePlan>> {
        if variants.is_empty() {
            return Err(StickerError::transcode("no output variant requested"));
        }

        let class = DurationClass::classify(probe.duration);
        let mut seen = Vec::with_capacity(variants.len());
        let mut plans = Vec::with_capacity(variants.len());
        for &policy in variants {
            if seen.contains(&policy) {
                continue;
            }
            seen.push(policy);

            let mut filters = vec![format!("fps={}", self.spec.fps)];
            filters.extend(policy::geometry_filters(policy, probe));
            filters.extend(class.filters());

            let tag = policy.variant_tag();
            plans.push(EncodePlan {
                input: intermediate.to_path_buf(),
                output: self.output_path(name, tag, class.is_trimmed()),
                variant_tag: tag,
                trimmed: class.is_trimmed(),
                filters,
                frame_size: policy::output_size(policy, probe.width, probe.height),
            });
        }
        Ok(plans)
    }

    /// `{name}_{tag}.webm`, with `_trimmed` appended when the clip was cut.
    pub fn output_path(&self, name: &str, tag: VariantTag, trimmed: bool) -> PathBuf {
        let suffix = if trimmed { "_trimmed" } else { "" };
        self.out_dir.join(format!(
            "{name}_{}{suffix}.{}",
            tag.as_str(),
            self.spec.container_ext
        ))
    }

    /// Plan and run every encode. Stops at the first failing variant and removes the variants
    /// already written.
    #[tracing::instrument(level = "debug", skip_all, fields(name = name))]
    pub fn transcode(
        &self,
        intermediate: &Path,
        name: &str,
        probe: &ProbeResult,
        variants: &[ResizePolicy],
    ) -> StickerResult<OutputSet> {
        let plans = self.plan(intermediate, name, probe, variants)?;
        if !is_ffmpeg_on_path() {
            return Err(StickerError::transcode(
                "ffmpeg is required for animated stickers, but was not found on PATH",
            ));
        }

        execute_plans(plans, |plan| run_ffmpeg(plan, &self.spec))
    }
}

/// Run `encode` for each plan in order. When one fails, the outputs already written are removed.
fn execute_plans(
    plans: Vec<EncodePlan>,
    mut encode: impl FnMut(&EncodePlan) -> StickerResult<()>,
) -> StickerResult<OutputSet> {
    let mut outputs = OutputSet::default();
    for plan in plans {
        tracing::debug!(
            variant = plan.variant_tag.as_str(),
            filters = %plan.filter_chain(),
            frame_size = ?plan.frame_size,
            "encoding"
        );
        if let Err(e) = encode(&plan) {
            discard_outputs(&outputs);
            return Err(e);
        }
        tracing::info!(output = %plan.output.display(), "encoded");
        outputs.push(OutputFile {
            path: plan.output,
            variant_tag: plan.variant_tag,
            trimmed: plan.trimmed,
        });
    }
    Ok(outputs)
}

fn discard_outputs(outputs: &OutputSet) {
    for path in outputs.paths() {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial variant"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove variant")
            }
        }
    }
}

fn run_ffmpeg(plan: &EncodePlan, spec: &EncodeSpec) -> StickerResult<()> {
    let out = Command::new("ffmpeg")
        .args(plan.ffmpeg_args(spec))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| StickerError::transcode(format!("failed to spawn ffmpeg: {e}")))?;

    if !out.status.success() {
        let _ = std::fs::remove_file(&plan.output);
        return Err(StickerError::transcode(format!(
            "ffmpeg exited with status {} for '{}': {}",
            out.status,
            plan.output.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if !plan.output.is_file() {
        return Err(StickerError::transcode(format!(
            "ffmpeg reported success but '{}' was not written",
            plan.output.display()
        )));
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/transcode/mod.rs"]
mod tests;

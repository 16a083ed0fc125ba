use crate::foundation::core::{CANVAS_SIZE, ResizePolicy};
use crate::probe::ProbeResult;

/// Clips longer than this are sped up.
pub const SPEEDUP_ABOVE_SECS: f64 = 3.0;
/// Clips longer than this are trimmed instead of sped up.
pub const TRIM_ABOVE_SECS: f64 = 4.5;
/// Effective duration of a sped-up clip.
pub const SPEEDUP_TARGET_SECS: f64 = 2.9;
/// End of the kept window `[0, TRIM_END_SECS)` for trimmed clips.
pub const TRIM_END_SECS: f64 = 3.0;
/// PTS multiplier applied when the source reports no duration.
pub const FALLBACK_PTS_FACTOR: f64 = 1.0;

/// Time-domain bucket of a probed clip. Exactly one applies per encode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DurationClass {
    NoDuration,
    /// `<= 3.0s`: left alone.
    Short(f64),
    /// `(3.0s, 4.5s]`: sped up to [`SPEEDUP_TARGET_SECS`].
    Medium(f64),
    /// `> 4.5s`: cut to the first [`TRIM_END_SECS`].
    Long(f64),
}

impl DurationClass {
    pub fn classify(duration: Option<f64>) -> Self {
        match duration {
            None => Self::NoDuration,
            Some(d) if d > TRIM_ABOVE_SECS => Self::Long(d),
            Some(d) if d > SPEEDUP_ABOVE_SECS => Self::Medium(d),
            Some(d) => Self::Short(d),
        }
    }

    pub fn is_trimmed(self) -> bool {
        matches!(self, Self::Long(_))
    }

    /// Filters implementing this class, in application order.
    pub fn filters(self) -> Vec<String> {
        match self {
            Self::NoDuration => vec![format!("setpts={}*PTS", fmt_num(FALLBACK_PTS_FACTOR))],
            Self::Short(_) => Vec::new(),
            Self::Medium(d) => vec![format!(
                "setpts=({}/{})*PTS",
                fmt_num(SPEEDUP_TARGET_SECS),
                fmt_num(d)
            )],
            Self::Long(_) => vec![
                format!("trim=start=0:end={}", fmt_num(TRIM_END_SECS)),
                "setpts=PTS-STARTPTS".to_string(),
            ],
        }
    }

    /// Expected output duration, when it can be known from the probe alone.
    pub fn effective_secs(self) -> Option<f64> {
        match self {
            Self::NoDuration => None,
            Self::Short(d) => Some(d),
            Self::Medium(_) => Some(SPEEDUP_TARGET_SECS),
            Self::Long(_) => Some(TRIM_END_SECS),
        }
    }
}

/// Filters bringing the frame inside the canvas under `policy`.
///
/// Orientation is decided from the probed source: landscape and square frames are fitted on
/// width, portrait frames on height.
pub fn geometry_filters(policy: ResizePolicy, probe: &ProbeResult) -> Vec<String> {
    let c = CANVAS_SIZE;
    let landscape = probe.is_landscape_or_square();
    match policy {
        ResizePolicy::Scale => {
            if landscape {
                vec![format!("scale={c}:-1:flags=lanczos")]
            } else {
                vec![format!("scale=-1:{c}:flags=lanczos")]
            }
        }
        ResizePolicy::Pad => {
            let mut filters = Vec::with_capacity(2);
            if probe.width > c || probe.height > c {
                filters.push(format!(
                    "scale={c}:{c}:force_original_aspect_ratio=decrease:flags=lanczos"
                ));
            }
            if landscape {
                filters.push(format!(
                    "pad=w={c}:h='min(ih*2,{c})':x='(ow-iw)/2':y='(oh-ih)/2':color=white@0"
                ));
            } else {
                filters.push(format!(
                    "pad=w='min(iw*2,{c})':h={c}:x='(ow-iw)/2':y='(oh-ih)/2':color=white@0"
                ));
            }
            filters
        }
    }
}

/// Output frame size `geometry_filters` produces for a `width`×`height` source.
pub fn output_size(policy: ResizePolicy, width: u32, height: u32) -> (u32, u32) {
    let c = CANVAS_SIZE;
    let landscape = width >= height;
    match policy {
        ResizePolicy::Scale => {
            if landscape {
                (c, scaled_other(height, width))
            } else {
                (scaled_other(width, height), c)
            }
        }
        ResizePolicy::Pad => {
            let (w, h) = if width > c || height > c {
                if landscape {
                    (c, scaled_other(height, width).min(c))
                } else {
                    (scaled_other(width, height).min(c), c)
                }
            } else {
                (width, height)
            };
            if landscape {
                (c, (h * 2).min(c))
            } else {
                ((w * 2).min(c), c)
            }
        }
    }
}

// `-1` in ffmpeg's scale keeps the ratio, rounding to the nearest pixel.
fn scaled_other(other: u32, fitted: u32) -> u32 {
    let v = (f64::from(other) * f64::from(CANVAS_SIZE) / f64::from(fitted)).round() as u32;
    v.max(1)
}

/// Shortest decimal rendering, e.g. `2.9`, `3.5`, `3`.
pub(crate) fn fmt_num(v: f64) -> String {
    format!("{v}")
}

#[cfg(test)]
#[path = "../../tests/unit/transcode/policy.rs"]
mod tests;

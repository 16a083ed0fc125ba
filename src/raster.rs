use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage, imageops::FilterType};

use crate::foundation::core::CANVAS_SIZE;
use crate::foundation::error::{StickerError, StickerResult};

/// Composites a still frame onto a transparent square canvas.
#[derive(Clone, Copy, Debug)]
pub struct Rasterizer {
    target_height: u32,
}

impl Rasterizer {
    pub fn new(target_height: u32) -> Self {
        Self { target_height }
    }

    /// Decode `src`, compose it and write the canvas to `out` as PNG.
    #[tracing::instrument(level = "debug", skip_all, fields(src = %src.display()))]
    pub fn rasterize(&self, src: &Path, out: &Path) -> StickerResult<()> {
        let frame = ImageReader::open(src)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| StickerError::rasterize(format!("open '{}': {e}", src.display())))?
            .decode()
            .map_err(|e| StickerError::rasterize(format!("decode '{}': {e}", src.display())))?;

        let canvas = self.compose(&frame)?;
        canvas
            .save_with_format(out, ImageFormat::Png)
            .map_err(|e| StickerError::rasterize(format!("write '{}': {e}", out.display())))?;
        Ok(())
    }

    /// Resize `frame` and center it on a fully transparent canvas.
    pub fn compose(&self, frame: &DynamicImage) -> StickerResult<RgbaImage> {
        let rgba = frame.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(StickerError::rasterize("source frame has zero size"));
        }

        let (w, h) = fitted_size(width, height, self.target_height);
        // Lanczos runs on premultiplied texels.
        let mut premul = rgba;
        premultiply_rgba8_in_place(&mut premul);
        let mut resized = image::imageops::resize(&premul, w, h, FilterType::Lanczos3);
        unpremultiply_rgba8_in_place(&mut resized);

        let mut canvas = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, Rgba([0, 0, 0, 0]));
        let (x, y) = centered_offset(w, h);
        image::imageops::overlay(&mut canvas, &resized, i64::from(x), i64::from(y));
        Ok(canvas)
    }
}

/// Size of the resized frame: height becomes `target_height` with the aspect ratio kept.
///
/// Frames that would come out wider than the canvas are scaled down further so the width is
/// exactly the canvas size; nothing is ever cropped.
pub fn fitted_size(width: u32, height: u32, target_height: u32) -> (u32, u32) {
    let canvas = f64::from(CANVAS_SIZE);
    let target_height = target_height.min(CANVAS_SIZE);
    let scaled_w = (f64::from(width) * f64::from(target_height) / f64::from(height)).round();
    if scaled_w <= canvas {
        return ((scaled_w as u32).max(1), target_height.max(1));
    }
    let clamped_h = (f64::from(height) * canvas / f64::from(width)).round();
    (CANVAS_SIZE, (clamped_h as u32).max(1))
}

/// Top-left position that centers a `w`×`h` frame on the canvas.
pub fn centered_offset(w: u32, h: u32) -> (u32, u32) {
    (
        CANVAS_SIZE.saturating_sub(w) / 2,
        CANVAS_SIZE.saturating_sub(h) / 2,
    )
}

fn premultiply_rgba8_in_place(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let a = u16::from(px[3]);
        if a == 0 {
            px.0 = [0, 0, 0, 0];
            continue;
        }
        for c in &mut px.0[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

fn unpremultiply_rgba8_in_place(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px.0[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/raster.rs"]
mod tests;

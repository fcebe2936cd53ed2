/// Export rasterizer
///
/// Produces the saved pixels with exact per-pixel arithmetic, independent of
/// any display backend:
/// 1. source sub-rectangle (committed crop or full image)
/// 2. center-pivoted flip/rotate, nearest-neighbour at pixel centres
/// 3. color pass: brightness, contrast, saturation, then clamp
/// 4. optional Gaussian blur
/// 5. JPEG encoding

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

use super::blur;
use super::transform::Orientation;
use crate::error::{EditorError, EditorResult};
use crate::state::edit::IDENTITY_PERCENT;
use crate::state::{EditState, PixelRect, SourceImage};

/// Encoded output ready for upload
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Rasterize the edited image (steps 1-4)
pub fn rasterize(source: &SourceImage, state: &EditState) -> RgbaImage {
    let (width, height) = source.dimensions();
    let region = match state.crop {
        Some(crop) => crop.to_pixel_rect(width, height),
        None => PixelRect::full(width, height),
    };

    let mut output = transform_region(source.pixels(), region, Orientation::from_state(state));
    color_pass(&mut output, state);
    if state.blur_radius > 0.0 {
        output = blur::gaussian_blur(&output, state.blur_radius);
    }
    output
}

/// Copy `region` of `pixels` into a region-sized buffer under the
/// center-pivot transform. Output pixels whose centre maps outside the
/// region stay transparent black.
pub fn transform_region(pixels: &RgbaImage, region: PixelRect, orientation: Orientation) -> RgbaImage {
    let mut output = RgbaImage::new(region.width, region.height);
    let pivot = orientation.pivot(region.width as f64, region.height as f64);
    let (w, h) = (region.width as f64, region.height as f64);

    for (ox, oy, pixel) in output.enumerate_pixels_mut() {
        let (sx, sy) = pivot.unmap(ox as f64 + 0.5, oy as f64 + 0.5);
        let (sx, sy) = (sx.floor(), sy.floor());
        if sx < 0.0 || sy < 0.0 || sx >= w || sy >= h {
            continue;
        }
        *pixel = *pixels.get_pixel(region.x + sx as u32, region.y + sy as u32);
    }
    output
}

/// Apply brightness, contrast and saturation in place. Alpha is untouched.
pub fn color_pass(image: &mut RgbaImage, state: &EditState) {
    if state.brightness == IDENTITY_PERCENT
        && state.contrast == IDENTITY_PERCENT
        && state.saturation == IDENTITY_PERCENT
    {
        return;
    }
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let [r, g, b] = adjust_rgb(
            [r as f32, g as f32, b as f32],
            state.brightness,
            state.contrast,
            state.saturation,
        );
        *pixel = Rgba([r, g, b, a]);
    }
}

/// Exact color arithmetic for one RGB triple.
///
/// - brightness: `v * b/100`
/// - contrast (skipped at 100): `(v - 128) * (1 + (c-100)/100) + 128`
/// - saturation (skipped at 100): `L + (v - L) * s/100`,
///   `L = 0.2989 R + 0.587 G + 0.114 B`
///
/// Intermediate values are unclamped; the result is clamped to [0, 255] and
/// rounded.
pub fn adjust_rgb(rgb: [f32; 3], brightness: u16, contrast: u16, saturation: u16) -> [u8; 3] {
    let mut v = rgb;

    let b = brightness as f32 / 100.0;
    for c in &mut v {
        *c *= b;
    }

    if contrast != IDENTITY_PERCENT {
        let k = 1.0 + (contrast as f32 - 100.0) / 100.0;
        for c in &mut v {
            *c = (*c - 128.0) * k + 128.0;
        }
    }

    if saturation != IDENTITY_PERCENT {
        let s = saturation as f32 / 100.0;
        let luma = 0.2989 * v[0] + 0.587 * v[1] + 0.114 * v[2];
        for c in &mut v {
            *c = luma + (*c - luma) * s;
        }
    }

    v.map(|c| c.clamp(0.0, 255.0).round() as u8)
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> EditorResult<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EditorError::encode("Cannot encode an empty image"));
    }
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| EditorError::encode(e.to_string()))?;
    Ok(bytes)
}

/// Full export: rasterize then encode
pub fn export(source: &SourceImage, state: &EditState, quality: u8) -> EditorResult<ExportedImage> {
    let raster = rasterize(source, state);
    let bytes = encode_jpeg(&raster, quality)?;
    tracing::debug!(
        width = raster.width(),
        height = raster.height(),
        bytes = bytes.len(),
        "export encoded"
    );
    Ok(ExportedImage {
        bytes,
        width: raster.width(),
        height: raster.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Adjustment, CropRect, FlipAxis};
    use image::imageops;

    /// Every pixel distinct enough to catch geometry mistakes
    fn gradient(width: u32, height: u32) -> SourceImage {
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 13) % 256) as u8, 255])
        });
        SourceImage::new("gradient", pixels)
    }

    #[test]
    fn test_identity_export_is_pixel_identical() {
        let source = gradient(37, 21);
        let out = rasterize(&source, &EditState::default());
        assert_eq!(&out, source.pixels());
    }

    #[test]
    fn test_brightness_half_on_gray() {
        let source = SourceImage::new("gray", RgbaImage::from_pixel(100, 100, Rgba([128, 128, 128, 200])));
        let state = EditState::default().with_adjustment(Adjustment::Brightness, 50.0);
        let out = rasterize(&source, &state);
        for p in out.pixels() {
            assert_eq!(p.0, [64, 64, 64, 200]);
        }
    }

    #[test]
    fn test_contrast_double_clamps() {
        assert_eq!(adjust_rgb([192.0, 128.0, 0.0], 100, 200, 100), [255, 128, 0]);
        assert_eq!(adjust_rgb([100.0, 100.0, 100.0], 100, 0, 100), [128, 128, 128]);
    }

    #[test]
    fn test_saturation_zero_uses_luma() {
        let [r, g, b] = adjust_rgb([255.0, 0.0, 0.0], 100, 100, 0);
        // 0.2989 * 255 = 76.2
        assert_eq!([r, g, b], [76, 76, 76]);
    }

    #[test]
    fn test_stages_run_before_clamp() {
        // Brightness pushes past 255, contrast pulls it back in:
        // (300 - 128) * 0.5 + 128 = 214, not (255 - 128) * 0.5 + 128
        assert_eq!(adjust_rgb([200.0, 200.0, 200.0], 150, 50, 100), [214, 214, 214]);
    }

    #[test]
    fn test_crop_then_rotate_matches_rotated_crop() {
        let source = gradient(200, 100);
        let state = EditState::default()
            .with_crop(CropRect::new(0.0, 0.0, 100.0, 100.0))
            .with_rotation_delta(90);

        let out = rasterize(&source, &state);
        assert_eq!(out.dimensions(), (100, 100));

        let region = imageops::crop_imm(source.pixels(), 0, 0, 100, 100).to_image();
        assert_eq!(out, imageops::rotate90(&region));
    }

    #[test]
    fn test_half_turn_and_flips_on_rectangle() {
        let source = gradient(40, 30);
        let half = rasterize(&source, &EditState::default().with_rotation_delta(180));
        assert_eq!(half, imageops::rotate180(source.pixels()));

        let mirrored = rasterize(
            &source,
            &EditState::default().with_flip_toggled(FlipAxis::Horizontal),
        );
        assert_eq!(mirrored, imageops::flip_horizontal(source.pixels()));

        // Both flips equal a half turn
        let both = EditState::default()
            .with_flip_toggled(FlipAxis::Horizontal)
            .with_flip_toggled(FlipAxis::Vertical);
        assert_eq!(rasterize(&source, &both), half);
    }

    #[test]
    fn test_quarter_turn_on_rectangle_clips_to_frame() {
        let source = gradient(40, 20);
        let out = rasterize(&source, &EditState::default().with_rotation_delta(90));
        assert_eq!(out.dimensions(), (40, 20));
        // Columns outside the rotated footprint are empty
        assert_eq!(out.get_pixel(0, 10).0, [0, 0, 0, 0]);
        assert_eq!(out.get_pixel(20, 10).0[3], 255);
    }

    #[test]
    fn test_export_encodes_jpeg_close_to_source() {
        let source = SourceImage::new("flat", RgbaImage::from_pixel(32, 32, Rgba([90, 140, 200, 255])));
        let exported = export(&source, &EditState::default(), 92).unwrap();
        assert_eq!((exported.width, exported.height), (32, 32));
        assert_eq!(&exported.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&exported.bytes).unwrap().to_rgb8();
        for p in decoded.pixels() {
            for (got, want) in p.0.iter().zip([90u8, 140, 200]) {
                assert!((*got as i32 - want as i32).abs() <= 3);
            }
        }
    }

    #[test]
    fn test_blur_runs_last() {
        let mut pixels = RgbaImage::from_pixel(9, 9, Rgba([0, 0, 0, 255]));
        pixels.put_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let source = SourceImage::new("dot", pixels);
        let state = EditState::default().with_adjustment(Adjustment::Blur, 1.0);
        let out = rasterize(&source, &state);
        assert!(out.get_pixel(4, 4).0[0] < 255);
        assert!(out.get_pixel(5, 4).0[0] > 0);
    }
}

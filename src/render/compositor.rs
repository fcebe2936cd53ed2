/// Preview compositors
///
/// A compositor executes a `PreviewFrame`'s draw commands onto an RGBA
/// surface. The software compositor leans on the `image` crate's fast
/// operations; the GPU compositor (see `gpu`) shares the overlay helpers
/// defined here.

use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};

use super::preview::{DrawCommand, PreviewFrame};
use super::transform::Orientation;
use crate::error::EditorResult;
use crate::state::{CropRect, PixelRect, SourceImage};

/// Executes preview draw commands
pub trait Compositor: Send {
    /// Short backend name for logs and the status bar
    fn name(&self) -> &'static str;

    fn composite(&mut self, source: &SourceImage, frame: &PreviewFrame) -> EditorResult<RgbaImage>;
}

/// The source downscaled to the preview scale, cached across frames
#[derive(Debug, Default)]
pub struct ScaledSourceCache {
    key: Option<(String, u32, u32, u32)>,
    image: RgbaImage,
}

impl ScaledSourceCache {
    /// Source pixels at `scale`, recomputed only when the source or the
    /// scale changes
    pub fn get(&mut self, source: &SourceImage, scale: f32) -> &RgbaImage {
        let (w, h) = scaled_dims(source.dimensions(), scale);
        let key = (source.photo_id.clone(), w, h, scale.to_bits());
        if self.key.as_ref() != Some(&key) {
            self.image = if (w, h) == source.dimensions() {
                source.pixels().clone()
            } else {
                imageops::resize(source.pixels(), w, h, FilterType::Triangle)
            };
            self.key = Some(key);
        }
        &self.image
    }
}

fn scaled_dims((w, h): (u32, u32), scale: f32) -> (u32, u32) {
    (
        ((w as f32 * scale).round() as u32).max(1),
        ((h as f32 * scale).round() as u32).max(1),
    )
}

/// Software compositor built on `image::imageops`
#[derive(Debug, Default)]
pub struct SoftwareCompositor {
    cache: ScaledSourceCache,
}

impl SoftwareCompositor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Compositor for SoftwareCompositor {
    fn name(&self) -> &'static str {
        "software"
    }

    fn composite(&mut self, source: &SourceImage, frame: &PreviewFrame) -> EditorResult<RgbaImage> {
        let (sw, sh) = frame.surface_size();
        let mut surface = RgbaImage::new(sw, sh);
        let scaled = self.cache.get(source, frame.scale);

        for command in &frame.commands {
            match command {
                DrawCommand::DrawSource {
                    src,
                    orientation,
                    filters,
                } => {
                    let region = scale_pixel_rect(*src, frame.scale, scaled.dimensions());
                    let cropped =
                        imageops::crop_imm(scaled, region.x, region.y, region.width, region.height)
                            .to_image();
                    let mut layer = orient(cropped, *orientation);
                    filters.apply_color(&mut layer);
                    let sigma = filters.blur() * frame.scale;
                    if sigma > 0.0 {
                        layer = imageops::blur(&layer, sigma);
                    }
                    // Center-pivot: the transformed region stays centered on the frame
                    let x = (sw as i64 - layer.width() as i64) / 2;
                    let y = (sh as i64 - layer.height() as i64) / 2;
                    imageops::overlay(&mut surface, &layer, x, y);
                }
                other => paint_overlay_command(&mut surface, scaled, other, frame.scale),
            }
        }
        Ok(surface)
    }
}

/// Rotate then flip, matching the center-pivot matrix order
fn orient(image: RgbaImage, orientation: Orientation) -> RgbaImage {
    if orientation.is_identity() {
        return image;
    }
    let mut image = match orientation.rotation {
        90 => imageops::rotate90(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate270(&image),
        _ => image,
    };
    if orientation.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut image);
    }
    if orientation.flip_vertical {
        imageops::flip_vertical_in_place(&mut image);
    }
    image
}

/// Map a source pixel rectangle onto a source scaled by `scale`
fn scale_pixel_rect(rect: PixelRect, scale: f32, bounds: (u32, u32)) -> PixelRect {
    CropRect::new(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    )
    .scaled(scale)
    .to_pixel_rect(bounds.0, bounds.1)
}

/// Paint one non-source command. `scaled_source` is the full source at the
/// frame's scale; overlays only appear when no crop is committed, so frame
/// and source coordinates coincide.
pub(crate) fn paint_overlay_command(
    surface: &mut RgbaImage,
    scaled_source: &RgbaImage,
    command: &DrawCommand,
    scale: f32,
) {
    match command {
        DrawCommand::Clear => {
            for pixel in surface.pixels_mut() {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }
        DrawCommand::FillRect { rect, color } => {
            let color = *color;
            for_each_in(surface, rect.scaled(scale), |pixel| pixel.blend(&color));
        }
        DrawCommand::ClearRect { rect } => {
            for_each_in(surface, rect.scaled(scale), |pixel| *pixel = Rgba([0, 0, 0, 0]));
        }
        DrawCommand::DrawSourceClipped { clip } => {
            let Some((x0, y0, x1, y1)) = surface_span(surface, clip.scaled(scale)) else {
                return;
            };
            for y in y0..y1.min(scaled_source.height()) {
                for x in x0..x1.min(scaled_source.width()) {
                    let src = *scaled_source.get_pixel(x, y);
                    surface.get_pixel_mut(x, y).blend(&src);
                }
            }
        }
        DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        } => {
            let half = line_width / 2.0;
            let outer = CropRect::new(
                rect.x - half,
                rect.y - half,
                rect.width + line_width,
                rect.height + line_width,
            );
            let bands = [
                CropRect::new(outer.x, outer.y, outer.width, *line_width),
                CropRect::new(outer.x, outer.y + outer.height - line_width, outer.width, *line_width),
                CropRect::new(outer.x, outer.y, *line_width, outer.height),
                CropRect::new(outer.x + outer.width - line_width, outer.y, *line_width, outer.height),
            ];
            let color = *color;
            for band in bands {
                for_each_in(surface, band.scaled(scale), |pixel| *pixel = color);
            }
        }
        DrawCommand::DrawSource { .. } => {}
    }
}

/// Integer span of `rect` clipped to the surface, as (x0, y0, x1, y1)
fn surface_span(surface: &RgbaImage, rect: CropRect) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = surface.dimensions();
    let x0 = rect.x.round().max(0.0) as u32;
    let y0 = rect.y.round().max(0.0) as u32;
    let x1 = ((rect.x + rect.width).round().max(0.0) as u32).min(w);
    let y1 = ((rect.y + rect.height).round().max(0.0) as u32).min(h);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

fn for_each_in(surface: &mut RgbaImage, rect: CropRect, mut f: impl FnMut(&mut Rgba<u8>)) {
    let Some((x0, y0, x1, y1)) = surface_span(surface, rect) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            f(surface.get_pixel_mut(x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::export;
    use crate::render::preview::{self, Overlay, OVERLAY_SHADE, SELECTION_COLOR};
    use crate::state::{Adjustment, EditState, FlipAxis};

    fn gradient(size: u32) -> SourceImage {
        let pixels = RgbaImage::from_fn(size, size, |x, y| {
            Rgba([(x * 9 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        SourceImage::new("g", pixels)
    }

    fn composite(source: &SourceImage, state: &EditState, overlay: &Overlay, max: u32) -> RgbaImage {
        let frame = preview::render(source.dimensions(), state, 1.0, overlay, max);
        SoftwareCompositor::new().composite(source, &frame).unwrap()
    }

    #[test]
    fn test_geometry_agrees_with_export_on_square_frames() {
        let source = gradient(24);
        let mut state = EditState::default();
        for step in 0..8 {
            state = state.with_rotation_delta(90);
            if step % 3 == 0 {
                state = state.with_flip_toggled(FlipAxis::Horizontal);
            }
            if step % 2 == 0 {
                state = state.with_flip_toggled(FlipAxis::Vertical);
            }
            let preview = composite(&source, &state, &Overlay::default(), 4096);
            assert_eq!(preview, export::rasterize(&source, &state), "{:?}", state);
        }
    }

    #[test]
    fn test_surface_is_downscaled() {
        let source = gradient(64);
        let preview = composite(&source, &EditState::default(), &Overlay::default(), 16);
        assert_eq!(preview.dimensions(), (16, 16));
    }

    #[test]
    fn test_preview_tone_is_close_to_export() {
        let source = gradient(16);
        let state = EditState::default()
            .with_adjustment(Adjustment::Brightness, 120.0)
            .with_adjustment(Adjustment::Contrast, 80.0);
        let preview = composite(&source, &state, &Overlay::default(), 4096);
        let exact = export::rasterize(&source, &state);
        for (a, b) in preview.pixels().zip(exact.pixels()) {
            for c in 0..3 {
                assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 3);
            }
        }
    }

    #[test]
    fn test_overlay_darkens_outside_and_shows_source_inside() {
        let source = SourceImage::new("w", RgbaImage::from_pixel(40, 40, Rgba([200, 200, 200, 255])));
        let state = EditState::default().with_adjustment(Adjustment::Brightness, 50.0);
        let overlay = Overlay {
            crop_tool_active: true,
            selection: Some(CropRect::new(10.0, 10.0, 20.0, 20.0)),
        };
        let out = composite(&source, &state, &overlay, 4096);

        // Outside: filtered (100) then shaded by 45% black
        let outside = out.get_pixel(2, 20).0;
        let shade = OVERLAY_SHADE.0[3] as f32 / 255.0;
        let expected = (100.0 * (1.0 - shade)).round() as i32;
        assert!((outside[0] as i32 - expected).abs() <= 1);

        // Inside: unfiltered source
        assert_eq!(out.get_pixel(20, 20).0, [200, 200, 200, 255]);

        // Border and corner handles
        assert_eq!(*out.get_pixel(20, 10), SELECTION_COLOR);
        assert_eq!(*out.get_pixel(31, 31), SELECTION_COLOR);
    }
}

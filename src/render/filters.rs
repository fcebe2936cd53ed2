/// Display filter chain used by the preview path
///
/// These follow the usual compositing-filter definitions (brightness as a
/// multiplier, contrast about mid-grey, saturate as a Rec.709 matrix) and
/// quantize to 8 bits after every stage, the way a display backend runs one
/// filter pass after another. They are allowed to differ slightly from the
/// exact export arithmetic in `export.rs`.

use image::RgbaImage;

use crate::state::edit::IDENTITY_PERCENT;
use crate::state::EditState;

/// One compositing filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    /// Percent multiplier
    Brightness(u16),
    /// Percent contrast about mid-grey
    Contrast(u16),
    /// Percent saturation
    Saturate(u16),
    /// Gaussian standard deviation in frame pixels
    Blur(f32),
}

/// Ordered filter chain: brightness, contrast, saturate, blur.
/// Identity filters are omitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChain(Vec<FilterOp>);

impl FilterChain {
    pub fn from_state(state: &EditState) -> Self {
        let mut ops = Vec::with_capacity(4);
        if state.brightness != IDENTITY_PERCENT {
            ops.push(FilterOp::Brightness(state.brightness));
        }
        if state.contrast != IDENTITY_PERCENT {
            ops.push(FilterOp::Contrast(state.contrast));
        }
        if state.saturation != IDENTITY_PERCENT {
            ops.push(FilterOp::Saturate(state.saturation));
        }
        if state.blur_radius > 0.0 {
            ops.push(FilterOp::Blur(state.blur_radius));
        }
        Self(ops)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Blur deviation of the chain (0.0 when there is no blur)
    pub fn blur(&self) -> f32 {
        self.0
            .iter()
            .find_map(|op| match op {
                FilterOp::Blur(sigma) => Some(*sigma),
                _ => None,
            })
            .unwrap_or(0.0)
    }

    /// Percent values for brightness, contrast and saturate (100 when absent)
    pub fn tone(&self) -> [u16; 3] {
        let mut tone = [IDENTITY_PERCENT; 3];
        for op in &self.0 {
            match op {
                FilterOp::Brightness(p) => tone[0] = *p,
                FilterOp::Contrast(p) => tone[1] = *p,
                FilterOp::Saturate(p) => tone[2] = *p,
                FilterOp::Blur(_) => {}
            }
        }
        tone
    }

    /// CSS-style filter string, e.g. `brightness(50%) blur(2px)`
    pub fn to_css(&self) -> String {
        if self.is_empty() {
            return "none".to_string();
        }
        self.0
            .iter()
            .map(|op| match op {
                FilterOp::Brightness(p) => format!("brightness({}%)", p),
                FilterOp::Contrast(p) => format!("contrast({}%)", p),
                FilterOp::Saturate(p) => format!("saturate({}%)", p),
                FilterOp::Blur(px) => format!("blur({}px)", px),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Apply the color filters (not blur) in chain order. Alpha is untouched.
    pub fn apply_color(&self, image: &mut RgbaImage) {
        for op in &self.0 {
            match *op {
                FilterOp::Brightness(p) => {
                    let k = p as f32 / 100.0;
                    apply_lut(image, &build_lut(|v| v * k));
                }
                FilterOp::Contrast(p) => {
                    let k = p as f32 / 100.0;
                    apply_lut(image, &build_lut(|v| (v - 127.5) * k + 127.5));
                }
                FilterOp::Saturate(p) => saturate(image, p as f32 / 100.0),
                FilterOp::Blur(_) => {}
            }
        }
    }
}

fn build_lut(f: impl Fn(f32) -> f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, out) in lut.iter_mut().enumerate() {
        *out = f(i as f32).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn apply_lut(image: &mut RgbaImage, lut: &[u8; 256]) {
    for pixel in image.pixels_mut() {
        for c in &mut pixel.0[..3] {
            *c = lut[*c as usize];
        }
    }
}

/// Saturation matrix from the filter-effects definition (Rec.709 luma)
fn saturate(image: &mut RgbaImage, s: f32) {
    let m = [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ];
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        for (c, row) in pixel.0[..3].iter_mut().zip(m.iter()) {
            *c = (row[0] * r + row[1] * g + row[2] * b).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Adjustment;
    use image::Rgba;

    #[test]
    fn test_identity_filters_are_omitted() {
        let chain = FilterChain::from_state(&EditState::default());
        assert!(chain.is_empty());
        assert_eq!(chain.to_css(), "none");
    }

    #[test]
    fn test_chain_order_is_fixed() {
        let state = EditState::default()
            .with_adjustment(Adjustment::Blur, 2.0)
            .with_adjustment(Adjustment::Saturation, 0.0)
            .with_adjustment(Adjustment::Brightness, 150.0);
        let chain = FilterChain::from_state(&state);
        assert_eq!(chain.to_css(), "brightness(150%) saturate(0%) blur(2px)");
        assert_eq!(chain.tone(), [150, 100, 0]);
        assert_eq!(chain.blur(), 2.0);
    }

    #[test]
    fn test_zero_saturate_is_gray() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([200, 40, 90, 77]));
        FilterChain(vec![FilterOp::Saturate(0)]).apply_color(&mut img);
        let p = img.get_pixel(1, 1).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], 77);
    }

    #[test]
    fn test_brightness_halves() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        FilterChain(vec![FilterOp::Brightness(50)]).apply_color(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [64, 64, 64, 255]);
    }
}

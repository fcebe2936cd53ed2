/// Separable Gaussian blur for the export path
///
/// Kernel: standard deviation σ = blur radius in pixels, half-width ⌈3σ⌉,
/// weights normalized to sum 1. Edges replicate the nearest pixel. All four
/// channels are filtered.

use image::RgbaImage;

/// Normalized 1D Gaussian weights, centre tap in the middle
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Blur `image` with a Gaussian of deviation `sigma`
pub fn gaussian_blur(image: &RgbaImage, sigma: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if sigma <= 0.0 || width == 0 || height == 0 {
        return image.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;
    let (w, h) = (width as usize, height as usize);
    let src = image.as_raw();

    // Horizontal pass into f32, vertical pass back to u8
    let mut horizontal = vec![0f32; w * h * 4];
    for y in 0..h {
        let row = y * w * 4;
        for x in 0..w {
            let mut acc = [0f32; 4];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, w as i64 - 1) as usize;
                let idx = row + sx * 4;
                for c in 0..4 {
                    acc[c] += src[idx + c] as f32 * weight;
                }
            }
            horizontal[row + x * 4..row + x * 4 + 4].copy_from_slice(&acc);
        }
    }

    let mut out = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0f32; 4];
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - radius).clamp(0, h as i64 - 1) as usize;
                let idx = (sy * w + x) * 4;
                for c in 0..4 {
                    acc[c] += horizontal[idx + c] * weight;
                }
            }
            let idx = (y * w + x) * 4;
            for c in 0..4 {
                out[idx + c] = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    RgbaImage::from_raw(width, height, out).unwrap_or_else(|| image.clone())
}

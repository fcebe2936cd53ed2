/// Crop geometry: rectangles, drag normalization and aspect presets

use serde::{Deserialize, Serialize};

/// Fraction of the constraining image side covered by an aspect preset
const ASPECT_COVERAGE: f32 = 0.8;

/// A point in source-image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A crop rectangle in source-image pixel space.
///
/// Coordinates may be fractional because they come from pointer positions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// An integer rectangle inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Zero-sized rectangle anchored at `p` (start of a drag)
    pub fn at(p: Point) -> Self {
        Self::new(p.x, p.y, 0.0, 0.0)
    }

    /// Rectangle spanned by two corners.
    ///
    /// The origin is the element-wise minimum of the corners, so width and
    /// height are never negative whichever direction the drag moved.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Whether the rectangle can be committed
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Corner points in the order top-left, top-right, bottom-left, bottom-right
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x, self.y + self.height),
            Point::new(self.x + self.width, self.y + self.height),
        ]
    }

    /// Snap to whole pixels inside an image of the given size.
    ///
    /// Origin and extent are rounded to the nearest pixel, then clipped to
    /// the image. The result is at least 1x1 so a committed crop always
    /// yields a raster.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let max_x = image_width.saturating_sub(1);
        let max_y = image_height.saturating_sub(1);
        let x = (self.x.max(0.0).round() as u32).min(max_x);
        let y = (self.y.max(0.0).round() as u32).min(max_y);
        let width = (self.width.max(0.0).round() as u32)
            .min(image_width - x)
            .max(1);
        let height = (self.height.max(0.0).round() as u32)
            .min(image_height - y)
            .max(1);
        PixelRect { x, y, width, height }
    }

    /// Scale every coordinate by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

impl PixelRect {
    /// The whole of a `width` x `height` raster
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Aspect-ratio presets offered by the crop tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Free,
    Square,
    FourThree,
    SixteenNine,
    ThreeFour,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Free,
        AspectRatio::Square,
        AspectRatio::FourThree,
        AspectRatio::SixteenNine,
        AspectRatio::ThreeFour,
    ];

    /// Width divided by height, or None for free-form
    pub fn ratio(self) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Square => Some(1.0),
            AspectRatio::FourThree => Some(4.0 / 3.0),
            AspectRatio::SixteenNine => Some(16.0 / 9.0),
            AspectRatio::ThreeFour => Some(3.0 / 4.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Free => "Free",
            AspectRatio::Square => "1:1",
            AspectRatio::FourThree => "4:3",
            AspectRatio::SixteenNine => "16:9",
            AspectRatio::ThreeFour => "3:4",
        }
    }

    /// Centered rectangle with this ratio inside a `width` x `height` image.
    ///
    /// When the image is wider than the target ratio the height is
    /// constrained to 80% of the image height, otherwise the width is
    /// constrained to 80% of the image width. Returns None for `Free` or an
    /// empty image.
    pub fn centered_rect(self, width: u32, height: u32) -> Option<CropRect> {
        let target = self.ratio()?;
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (width as f32, height as f32);

        let (crop_w, crop_h) = if w / h > target {
            let crop_h = h * ASPECT_COVERAGE;
            (crop_h * target, crop_h)
        } else {
            let crop_w = w * ASPECT_COVERAGE;
            (crop_w, crop_w / target)
        };

        Some(CropRect::new(
            (w - crop_w) / 2.0,
            (h - crop_h) / 2.0,
            crop_w,
            crop_h,
        ))
    }
}

/// Map a position on the displayed surface to frame pixel coordinates.
///
/// `position` is relative to the surface's top-left corner and `displayed`
/// is the on-screen size of the surface. The surface may be shown at any
/// magnification; the ratio `frame / displayed` undoes it.
pub fn surface_to_frame(
    position: (f32, f32),
    displayed: (f32, f32),
    frame: (u32, u32),
) -> Point {
    let scale_x = if displayed.0 > 0.0 { frame.0 as f32 / displayed.0 } else { 1.0 };
    let scale_y = if displayed.1 > 0.0 { frame.1 as f32 / displayed.1 } else { 1.0 };
    Point::new(position.0 * scale_x, position.1 * scale_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_corners_normalize_in_every_direction() {
        let pairs = [
            ((10.0, 10.0), (40.0, 30.0)),
            ((40.0, 30.0), (10.0, 10.0)),
            ((40.0, 10.0), (10.0, 30.0)),
            ((10.0, 30.0), (40.0, 10.0)),
        ];
        for ((ax, ay), (bx, by)) in pairs {
            let rect = CropRect::from_corners(Point::new(ax, ay), Point::new(bx, by));
            assert_eq!(rect, CropRect::new(10.0, 10.0, 30.0, 20.0));
        }
    }

    /// Any finite coordinate, including the extremes
    fn arb_coord() -> impl Strategy<Value = f32> {
        use proptest::num::f32::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
        POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
    }

    fn arb_point() -> impl Strategy<Value = Point> {
        (arb_coord(), arb_coord()).prop_map(|(x, y)| Point::new(x, y))
    }

    proptest! {
        #[test]
        fn corners_origin_is_elementwise_min(a in arb_point(), b in arb_point()) {
            let rect = CropRect::from_corners(a, b);
            prop_assert!(rect.width >= 0.0 && rect.height >= 0.0);
            prop_assert_eq!(rect.x, a.x.min(b.x));
            prop_assert_eq!(rect.y, a.y.min(b.y));
        }

        #[test]
        fn corners_are_order_independent(a in arb_point(), b in arb_point()) {
            prop_assert_eq!(CropRect::from_corners(a, b), CropRect::from_corners(b, a));
        }
    }

    #[test]
    fn test_zero_drag_has_no_area() {
        let p = Point::new(5.0, 5.0);
        assert!(!CropRect::at(p).has_area());
        assert!(!CropRect::from_corners(p, Point::new(5.0, 50.0)).has_area());
    }

    #[test]
    fn test_pixel_rect_is_clipped_to_image() {
        let rect = CropRect::new(90.4, -3.0, 40.0, 10.6).to_pixel_rect(100, 50);
        assert_eq!(
            rect,
            PixelRect {
                x: 90,
                y: 0,
                width: 10,
                height: 11
            }
        );

        let sliver = CropRect::new(10.0, 10.0, 0.2, 0.2).to_pixel_rect(100, 50);
        assert_eq!((sliver.width, sliver.height), (1, 1));
    }

    #[test]
    fn test_aspect_on_wide_image_constrains_height() {
        let rect = AspectRatio::Square.centered_rect(200, 100).unwrap();
        assert_eq!(rect, CropRect::new(60.0, 10.0, 80.0, 80.0));
    }

    #[test]
    fn test_aspect_on_tall_image_constrains_width() {
        let rect = AspectRatio::SixteenNine.centered_rect(90, 160).unwrap();
        assert!((rect.width - 72.0).abs() < 1e-4);
        assert!((rect.height - 40.5).abs() < 1e-4);
        assert!((rect.x - 9.0).abs() < 1e-4);
        assert!((rect.y - 59.75).abs() < 1e-4);
    }

    #[test]
    fn test_free_aspect_and_empty_image_give_nothing() {
        assert_eq!(AspectRatio::Free.centered_rect(100, 100), None);
        assert_eq!(AspectRatio::FourThree.centered_rect(0, 100), None);
    }

    #[test]
    fn test_surface_mapping_undoes_display_scale() {
        let p = surface_to_frame((50.0, 25.0), (100.0, 50.0), (400, 200));
        assert_eq!(p, Point::new(200.0, 100.0));
    }
}

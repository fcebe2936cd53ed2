/// Non-destructive edit state for the photo editor
///
/// `EditState` is a small value type. Every tool interaction produces a new
/// state from the previous one; nothing mutates a state in place. Both the
/// preview renderer and the export rasterizer read it.

use serde::{Deserialize, Serialize};

use super::crop::CropRect;

/// Identity value for the percentage adjustments.
pub const IDENTITY_PERCENT: u16 = 100;
/// Upper bound of the percentage adjustments.
pub const MAX_PERCENT: u16 = 200;
/// Upper bound of the blur radius, in pixels.
pub const MAX_BLUR_RADIUS: f32 = 20.0;

/// A single adjustable slider value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjustment {
    Brightness,
    Contrast,
    Saturation,
    /// Blur radius in pixels
    Blur,
}

impl Adjustment {
    /// Inclusive domain of this adjustment
    pub fn range(self) -> (f32, f32) {
        match self {
            Adjustment::Brightness | Adjustment::Contrast | Adjustment::Saturation => {
                (0.0, MAX_PERCENT as f32)
            }
            Adjustment::Blur => (0.0, MAX_BLUR_RADIUS),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Adjustment::Brightness => "Brightness",
            Adjustment::Contrast => "Contrast",
            Adjustment::Saturation => "Saturation",
            Adjustment::Blur => "Blur",
        }
    }
}

/// Axis for flip operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// All pending adjustments for one editor session
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EditState {
    // ========== Tone ==========

    /// Brightness percent (0 to 200, 100 = no adjustment)
    pub brightness: u16,

    /// Contrast percent (0 to 200, 100 = no adjustment)
    pub contrast: u16,

    /// Saturation percent (0 = grayscale, 100 = original, 200 = doubled)
    pub saturation: u16,

    // ========== Geometry ==========

    /// Clockwise rotation in degrees, always one of 0, 90, 180, 270
    pub rotation: u16,

    /// Mirror left-right
    pub flip_horizontal: bool,

    /// Mirror top-bottom
    pub flip_vertical: bool,

    // ========== Effects ==========

    /// Blur radius in pixels (0.0 to 20.0)
    pub blur_radius: f32,

    /// Committed crop in source-image pixel space (None = full image)
    pub crop: Option<CropRect>,
}

impl Default for EditState {
    /// All-identity state (no adjustments)
    fn default() -> Self {
        Self {
            brightness: IDENTITY_PERCENT,
            contrast: IDENTITY_PERCENT,
            saturation: IDENTITY_PERCENT,
            rotation: 0,
            flip_horizontal: false,
            flip_vertical: false,
            blur_radius: 0.0,
            crop: None,
        }
    }
}

impl EditState {
    /// Convert to JSON (used as the edit recipe in save logs)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Check if this represents an unedited image (all values at default)
    pub fn is_unedited(&self) -> bool {
        *self == Self::default()
    }

    /// Current value of an adjustment
    pub fn adjustment(&self, field: Adjustment) -> f32 {
        match field {
            Adjustment::Brightness => self.brightness as f32,
            Adjustment::Contrast => self.contrast as f32,
            Adjustment::Saturation => self.saturation as f32,
            Adjustment::Blur => self.blur_radius,
        }
    }

    /// New state with `field` set to `value`, clamped to the field's domain.
    ///
    /// Percentages are rounded to whole percent. NaN is treated as the
    /// field's lower bound.
    pub fn with_adjustment(self, field: Adjustment, value: f32) -> Self {
        let (min, max) = field.range();
        let value = if value.is_nan() { min } else { value.clamp(min, max) };
        let percent = value.round() as u16;

        match field {
            Adjustment::Brightness => Self { brightness: percent, ..self },
            Adjustment::Contrast => Self { contrast: percent, ..self },
            Adjustment::Saturation => Self { saturation: percent, ..self },
            Adjustment::Blur => Self { blur_radius: value, ..self },
        }
    }

    /// New state rotated by `delta_degrees`.
    ///
    /// The result wraps modulo 360 and snaps to the nearest quarter turn, so
    /// rotation stays within {0, 90, 180, 270}.
    pub fn with_rotation_delta(self, delta_degrees: i32) -> Self {
        let raw = (self.rotation as i32 + delta_degrees.rem_euclid(360)).rem_euclid(360);
        let quarter = ((raw as f32 / 90.0).round() as i32).rem_euclid(4);
        Self {
            rotation: (quarter * 90) as u16,
            ..self
        }
    }

    /// New state with the given flip toggled
    pub fn with_flip_toggled(self, axis: FlipAxis) -> Self {
        match axis {
            FlipAxis::Horizontal => Self {
                flip_horizontal: !self.flip_horizontal,
                ..self
            },
            FlipAxis::Vertical => Self {
                flip_vertical: !self.flip_vertical,
                ..self
            },
        }
    }

    /// New state with `crop` replacing any previous crop
    pub fn with_crop(self, crop: CropRect) -> Self {
        Self {
            crop: Some(crop),
            ..self
        }
    }
}

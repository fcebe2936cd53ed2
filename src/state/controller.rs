/// Edit state controller
///
/// Holds the current `EditState`, the crop rectangle being dragged and the
/// display-only state (active tool, zoom). Tool widgets call the operations
/// below; each one replaces the `EditState` wholesale.

use super::crop::{AspectRatio, CropRect, Point};
use super::edit::{Adjustment, EditState, FlipAxis};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.1;

/// Tool panels of the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Adjust,
    Crop,
    Zoom,
    Blur,
    Transform,
}

impl Tool {
    pub const ALL: [Tool; 5] = [Tool::Adjust, Tool::Crop, Tool::Zoom, Tool::Blur, Tool::Transform];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Adjust => "Adjust",
            Tool::Crop => "Crop",
            Tool::Zoom => "Zoom",
            Tool::Blur => "Blur",
            Tool::Transform => "Transform",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditController {
    state: EditState,
    /// Crop being drawn, only while the crop tool is active
    pending_crop: Option<CropRect>,
    /// Anchor corner of an active drag
    drag_anchor: Option<Point>,
    aspect: AspectRatio,
    tool: Tool,
    zoom: f32,
    /// Source dimensions, known once the image has decoded
    source_size: Option<(u32, u32)>,
}

impl Default for EditController {
    fn default() -> Self {
        Self {
            state: EditState::default(),
            pending_crop: None,
            drag_anchor: None,
            aspect: AspectRatio::Free,
            tool: Tool::Adjust,
            zoom: 1.0,
            source_size: None,
        }
    }
}

impl EditController {
    /// Controller for a loaded source image
    pub fn with_source_size(width: u32, height: u32) -> Self {
        Self {
            source_size: Some((width, height)),
            ..Self::default()
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn pending_crop(&self) -> Option<CropRect> {
        self.pending_crop
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Whether the crop selection overlay should be drawn
    pub fn crop_overlay_visible(&self) -> bool {
        self.tool == Tool::Crop && self.state.crop.is_none()
    }

    fn replace(&mut self, next: EditState) {
        if next != self.state {
            tracing::debug!(?next, "edit state replaced");
        }
        self.state = next;
    }

    pub fn set_adjustment(&mut self, field: Adjustment, value: f32) {
        self.replace(self.state.with_adjustment(field, value));
    }

    pub fn set_rotation(&mut self, delta_degrees: i32) {
        self.replace(self.state.with_rotation_delta(delta_degrees));
    }

    pub fn toggle_flip(&mut self, axis: FlipAxis) {
        self.replace(self.state.with_flip_toggled(axis));
    }

    /// Switch tool panels. Leaving the crop tool discards the pending crop.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == Tool::Crop && tool != Tool::Crop {
            self.pending_crop = None;
            self.drag_anchor = None;
        }
        self.tool = tool;
    }

    /// Pointer-down on the surface: start a zero-sized rectangle at `point`.
    ///
    /// Only meaningful while the crop overlay is visible: surface
    /// coordinates equal source coordinates only when no crop is committed.
    pub fn begin_crop_drag(&mut self, point: Point) {
        if !self.crop_overlay_visible() {
            return;
        }
        self.drag_anchor = Some(point);
        self.pending_crop = Some(CropRect::at(point));
    }

    /// Pointer-move: span the rectangle between the anchor and `point`
    pub fn update_crop_drag(&mut self, point: Point) {
        if let Some(anchor) = self.drag_anchor {
            self.pending_crop = Some(CropRect::from_corners(anchor, point));
        }
    }

    /// Pointer-up or leave: stop dragging but keep the rectangle
    pub fn end_crop_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Select an aspect preset and, when an image is loaded, replace the
    /// pending crop with a centered rectangle of that ratio.
    ///
    /// Unlike a drag this works with a crop committed: the rectangle is in
    /// original coordinates and committing it replaces the old crop.
    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) {
        self.aspect = aspect;
        let Some((width, height)) = self.source_size else {
            return;
        };
        if let Some(rect) = aspect.centered_rect(width, height) {
            self.drag_anchor = None;
            self.pending_crop = Some(rect);
        }
    }

    /// Promote the pending crop into the edit state.
    ///
    /// Returns false and changes nothing when there is no pending rectangle
    /// or it has zero width or height.
    pub fn commit_crop(&mut self) -> bool {
        match self.pending_crop {
            Some(rect) if rect.has_area() => {
                self.replace(self.state.with_crop(rect));
                self.pending_crop = None;
                self.drag_anchor = None;
                self.tool = Tool::Adjust;
                true
            }
            _ => false,
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            // Round to the slider step so repeated nudges don't drift.
            self.zoom = ((zoom / ZOOM_STEP).round() * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.set_zoom(self.zoom + delta);
    }

    /// Back to all-identity edits, no pending crop, zoom 100%, adjust tool
    pub fn reset(&mut self) {
        self.replace(EditState::default());
        self.pending_crop = None;
        self.drag_anchor = None;
        self.aspect = AspectRatio::Free;
        self.tool = Tool::Adjust;
        self.zoom = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop_ready() -> EditController {
        let mut controller = EditController::with_source_size(200, 100);
        controller.set_tool(Tool::Crop);
        controller
    }

    #[test]
    fn test_drag_builds_normalized_rect() {
        let mut c = crop_ready();
        c.begin_crop_drag(Point::new(50.0, 60.0));
        assert_eq!(c.pending_crop(), Some(CropRect::new(50.0, 60.0, 0.0, 0.0)));

        c.update_crop_drag(Point::new(20.0, 80.0));
        assert_eq!(c.pending_crop(), Some(CropRect::new(20.0, 60.0, 30.0, 20.0)));

        c.end_crop_drag();
        assert!(!c.is_dragging());
        assert_eq!(c.pending_crop(), Some(CropRect::new(20.0, 60.0, 30.0, 20.0)));

        // Moves after pointer-up are ignored
        c.update_crop_drag(Point::new(0.0, 0.0));
        assert_eq!(c.pending_crop(), Some(CropRect::new(20.0, 60.0, 30.0, 20.0)));
    }

    #[test]
    fn test_drag_ignored_outside_crop_tool() {
        let mut c = EditController::with_source_size(200, 100);
        c.begin_crop_drag(Point::new(1.0, 1.0));
        assert_eq!(c.pending_crop(), None);
    }

    #[test]
    fn test_commit_zero_area_is_noop() {
        let mut c = crop_ready();
        c.begin_crop_drag(Point::new(10.0, 10.0));
        c.update_crop_drag(Point::new(10.0, 90.0));
        let before = *c.state();

        assert!(!c.commit_crop());
        assert_eq!(*c.state(), before);
        assert_eq!(c.state().crop, None);
        assert_eq!(c.tool(), Tool::Crop);

        let mut empty = crop_ready();
        assert!(!empty.commit_crop());
        assert_eq!(empty.state().crop, None);
    }

    #[test]
    fn test_commit_moves_pending_into_state() {
        let mut c = crop_ready();
        c.begin_crop_drag(Point::new(0.0, 0.0));
        c.update_crop_drag(Point::new(100.0, 100.0));
        c.end_crop_drag();

        assert!(c.commit_crop());
        assert_eq!(c.state().crop, Some(CropRect::new(0.0, 0.0, 100.0, 100.0)));
        assert_eq!(c.pending_crop(), None);
        assert_eq!(c.tool(), Tool::Adjust);
    }

    #[test]
    fn test_aspect_preset_replaces_committed_crop() {
        let mut c = crop_ready();
        c.begin_crop_drag(Point::new(0.0, 0.0));
        c.update_crop_drag(Point::new(10.0, 10.0));
        assert!(c.commit_crop());

        c.set_tool(Tool::Crop);
        c.set_aspect_ratio(AspectRatio::Square);
        assert!(c.commit_crop());
        // Defined against the original image, not the previous crop
        assert_eq!(c.state().crop, Some(CropRect::new(60.0, 10.0, 80.0, 80.0)));
    }

    #[test]
    fn test_aspect_needs_loaded_image() {
        let mut c = EditController::default();
        c.set_tool(Tool::Crop);
        c.set_aspect_ratio(AspectRatio::Square);
        assert_eq!(c.aspect(), AspectRatio::Square);
        assert_eq!(c.pending_crop(), None);

        let mut free = crop_ready();
        free.set_aspect_ratio(AspectRatio::Free);
        assert_eq!(free.pending_crop(), None);
    }

    #[test]
    fn test_leaving_crop_tool_discards_pending() {
        let mut c = crop_ready();
        c.begin_crop_drag(Point::new(5.0, 5.0));
        c.update_crop_drag(Point::new(50.0, 50.0));
        c.set_tool(Tool::Blur);
        assert_eq!(c.pending_crop(), None);
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_zoom_is_clamped_and_stepped() {
        let mut c = EditController::default();
        c.zoom_by(10.0);
        assert_eq!(c.zoom(), MAX_ZOOM);
        c.set_zoom(0.0);
        assert_eq!(c.zoom(), MIN_ZOOM);
        c.set_zoom(1.04);
        assert!((c.zoom() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut c = crop_ready();
        c.set_adjustment(Adjustment::Brightness, 150.0);
        c.set_rotation(90);
        c.toggle_flip(FlipAxis::Vertical);
        c.set_zoom(2.0);
        c.begin_crop_drag(Point::new(1.0, 1.0));

        c.reset();
        assert!(c.state().is_unedited());
        assert_eq!(c.pending_crop(), None);
        assert_eq!(c.zoom(), 1.0);
        assert_eq!(c.tool(), Tool::Adjust);
    }
}

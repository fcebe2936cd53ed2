use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Program};
use iced::{Rectangle, Renderer, Theme};

use crate::state::controller::ZOOM_STEP;
use crate::state::crop::surface_to_frame;
use crate::state::Point;
use crate::Message;

/// Pointer layer stacked over the preview image.
///
/// Draws nothing itself; it turns mouse input into crop-gesture and zoom
/// messages, mapping screen positions into frame pixels.
#[derive(Debug, Clone, Copy)]
pub struct CropCanvas {
    /// Frame size in source pixels
    pub frame_size: (u32, u32),
    /// Whether pointer drags draw a crop rectangle
    pub crop_active: bool,
}

impl Program<Message> for CropCanvas {
    type State = DragState;

    fn draw(
        &self,
        _state: &Self::State,
        _renderer: &Renderer,
        _theme: &Theme,
        _bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        // The preview image underneath already carries the overlay
        vec![]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            // Mouse wheel for zooming
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.is_over(bounds) {
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::ZoomBy(wheel_zoom_delta(delta))),
                    );
                }
            }

            // Mouse button press - start a crop rectangle
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if self.crop_active {
                    if let Some(pos) = cursor.position_in(bounds) {
                        state.is_dragging = true;
                        let point = self.frame_point((pos.x, pos.y), bounds);
                        return (canvas::event::Status::Captured, Some(Message::CropPressed(point)));
                    }
                }
            }

            // Mouse move - resize while dragging, clamped to the surface
            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if state.is_dragging {
                    let local = (
                        (position.x - bounds.x).clamp(0.0, bounds.width),
                        (position.y - bounds.y).clamp(0.0, bounds.height),
                    );
                    let point = self.frame_point(local, bounds);
                    return (canvas::event::Status::Captured, Some(Message::CropMoved(point)));
                }
            }

            // Release or leaving the window ends the drag, keeping the rectangle
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
            | canvas::Event::Mouse(mouse::Event::CursorLeft) => {
                if state.is_dragging {
                    state.is_dragging = false;
                    return (canvas::event::Status::Captured, Some(Message::CropReleased));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if self.crop_active && cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

impl CropCanvas {
    fn frame_point(&self, local: (f32, f32), bounds: Rectangle) -> Point {
        surface_to_frame(local, (bounds.width, bounds.height), self.frame_size)
    }
}

/// Zoom change for one wheel event
pub fn wheel_zoom_delta(delta: mouse::ScrollDelta) -> f32 {
    match delta {
        mouse::ScrollDelta::Lines { y, .. } => y.signum() * ZOOM_STEP,
        mouse::ScrollDelta::Pixels { y, .. } => y * 0.01,
    }
}

/// State for drag interactions
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub is_dragging: bool,
}

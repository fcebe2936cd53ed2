/// Preview renderer
///
/// `render` is a pure function of the source size, the edit state, the zoom
/// and the crop overlay. It produces an ordered list of draw commands in
/// frame coordinates; a `Compositor` executes them onto a display surface.
/// Because the output is plain data, callers can skip compositing when the
/// frame equals the previous one.

use image::Rgba;

use super::filters::FilterChain;
use super::transform::Orientation;
use crate::state::{CropRect, EditController, EditState, PixelRect};

/// Darkening laid over the frame outside the crop selection (45% black)
pub const OVERLAY_SHADE: Rgba<u8> = Rgba([0, 0, 0, 115]);
/// Selection border and handle color
pub const SELECTION_COLOR: Rgba<u8> = Rgba([0x3b, 0x82, 0xf6, 0xff]);
/// Selection border width in surface pixels
pub const SELECTION_LINE_WIDTH: f32 = 3.0;
/// Corner handle edge length in surface pixels
pub const HANDLE_SIZE: f32 = 12.0;

/// Crop-selection overlay inputs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Overlay {
    /// The crop tool is the active tool
    pub crop_tool_active: bool,
    /// Rectangle being dragged, in source pixels
    pub selection: Option<CropRect>,
}

impl Overlay {
    pub fn from_controller(controller: &EditController) -> Self {
        Self {
            crop_tool_active: controller.crop_overlay_visible(),
            selection: controller.pending_crop(),
        }
    }
}

/// One display-surface operation, in frame coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Reset the surface to transparent
    Clear,
    /// Draw `src` of the source image into the frame under the center-pivot
    /// transform, through the filter chain
    DrawSource {
        src: PixelRect,
        orientation: Orientation,
        filters: FilterChain,
    },
    /// Blend a color over a rectangle
    FillRect { rect: CropRect, color: Rgba<u8> },
    /// Make a rectangle transparent
    ClearRect { rect: CropRect },
    /// Copy the untransformed, unfiltered source into `clip` only
    DrawSourceClipped { clip: CropRect },
    /// Outline a rectangle, centered on its edges
    StrokeRect {
        rect: CropRect,
        color: Rgba<u8>,
        line_width: f32,
    },
}

/// Everything needed to paint one preview
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewFrame {
    /// Frame size in source pixels (crop size, or the full source)
    pub frame_width: u32,
    pub frame_height: u32,
    /// Surface pixels per frame pixel (<= 1.0)
    pub scale: f32,
    /// Display magnification, applied around the surface center
    pub zoom: f32,
    pub commands: Vec<DrawCommand>,
}

impl PreviewFrame {
    /// Size of the raster the compositor produces
    pub fn surface_size(&self) -> (u32, u32) {
        (
            ((self.frame_width as f32 * self.scale).round() as u32).max(1),
            ((self.frame_height as f32 * self.scale).round() as u32).max(1),
        )
    }

    /// On-screen size after zoom
    pub fn display_size(&self) -> (f32, f32) {
        let (w, h) = self.surface_size();
        (w as f32 * self.zoom, h as f32 * self.zoom)
    }

    /// Whether both frames composite to the same pixels (zoom aside)
    pub fn same_surface(&self, other: &PreviewFrame) -> bool {
        self.frame_width == other.frame_width
            && self.frame_height == other.frame_height
            && self.scale == other.scale
            && self.commands == other.commands
    }
}

/// Build the draw commands for one preview.
///
/// `max_dimension` bounds the longest surface side; larger frames are drawn
/// at a reduced scale.
pub fn render(
    source_size: (u32, u32),
    state: &EditState,
    zoom: f32,
    overlay: &Overlay,
    max_dimension: u32,
) -> PreviewFrame {
    let (source_width, source_height) = source_size;
    let src = match state.crop {
        Some(crop) => crop.to_pixel_rect(source_width, source_height),
        None => PixelRect::full(source_width, source_height),
    };

    let longest = src.width.max(src.height).max(1);
    let scale = (max_dimension.max(1) as f32 / longest as f32).min(1.0);

    let mut commands = vec![
        DrawCommand::Clear,
        DrawCommand::DrawSource {
            src,
            orientation: Orientation::from_state(state),
            filters: FilterChain::from_state(state),
        },
    ];

    let selection = overlay
        .selection
        .filter(|rect| overlay.crop_tool_active && state.crop.is_none() && rect.has_area());
    if let Some(rect) = selection {
        push_overlay(&mut commands, rect, src, scale);
    }

    PreviewFrame {
        frame_width: src.width,
        frame_height: src.height,
        scale,
        zoom,
        commands,
    }
}

fn push_overlay(commands: &mut Vec<DrawCommand>, rect: CropRect, frame: PixelRect, scale: f32) {
    let whole = CropRect::new(0.0, 0.0, frame.width as f32, frame.height as f32);
    // Border and handles keep a fixed on-surface size
    let line_width = SELECTION_LINE_WIDTH / scale;
    let handle = HANDLE_SIZE / scale;

    commands.push(DrawCommand::FillRect {
        rect: whole,
        color: OVERLAY_SHADE,
    });
    commands.push(DrawCommand::ClearRect { rect });
    commands.push(DrawCommand::DrawSourceClipped { clip: rect });
    commands.push(DrawCommand::StrokeRect {
        rect,
        color: SELECTION_COLOR,
        line_width,
    });
    for corner in rect.corners() {
        commands.push(DrawCommand::FillRect {
            rect: CropRect::new(corner.x - handle / 2.0, corner.y - handle / 2.0, handle, handle),
            color: SELECTION_COLOR,
        });
    }
}

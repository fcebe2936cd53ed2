/// State management module
///
/// This module handles all editor state, including:
/// - The decoded source image (data.rs)
/// - Non-destructive edit parameters (edit.rs)
/// - Crop geometry and aspect presets (crop.rs)
/// - The controller tool widgets talk to (controller.rs)

pub mod controller;
pub mod crop;
pub mod data;
pub mod edit;

pub use controller::{EditController, Tool};
pub use crop::{AspectRatio, CropRect, PixelRect, Point};
pub use data::SourceImage;
pub use edit::{Adjustment, EditState, FlipAxis};

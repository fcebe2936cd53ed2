/// GPU-accelerated preview compositing
///
/// This module provides the hardware path of the preview renderer using
/// wgpu and a custom WGSL shader.
///
/// Architecture:
/// - `shaders.rs` - WGSL shader source code
/// - `pipeline.rs` - wgpu device, pipeline and the `Compositor` impl
///
/// The shader draws the source region with the center-pivot transform and
/// the filter chain; overlay commands are painted on the CPU afterwards.

pub mod pipeline;
pub mod shaders;

pub use pipeline::{GpuCompositor, GpuContext};

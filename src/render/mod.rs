/// Preview rendering and export
///
/// - `preview` turns an edit state into draw commands
/// - `compositor` executes those commands in software
/// - `export` produces the exact saved pixels and the JPEG
pub mod blur;
pub mod compositor;
pub mod export;
pub mod filters;
pub mod preview;
pub mod transform;

pub use compositor::{Compositor, SoftwareCompositor};

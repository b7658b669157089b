//! Source plugin contract.
//!
//! A source is anything that can produce frames: a still image, a
//! procedural generator, a decoder living in another crate. The engine
//! only depends on the `open`/`init`/`feed`/`close` shape below; concrete
//! media decoders are external collaborators that implement it.

mod generator;
mod image_file;
mod solid;

pub use generator::GeneratorSource;
pub use image_file::ImageSource;
pub use solid::SolidSource;

use crate::foundation::core::Fps;
use crate::foundation::error::{MixelError, MixelResult};
use crate::frame::FrameBuffer;
use std::path::Path;

/// Geometry and cadence handed to a source at init time.
#[derive(Clone, Copy, Debug)]
pub struct SourceConfig {
    /// Requested frame width (sources may keep their native size).
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Output cadence the source will be fed at.
    pub fps: Fps,
}

/// A frame producer driven by a layer's worker thread.
///
/// Lifecycle: `open` validates the descriptor, `init` allocates buffers
/// sized from the [`SourceConfig`], then `feed` runs once per go signal on
/// the worker thread. `close` releases everything and is called exactly
/// once after a successful `open`; the layer guarantees this even when the
/// worker is torn down mid-stream.
pub trait Source: Send {
    /// Validate and prepare the source descriptor. No worker exists yet.
    fn open(&mut self, descriptor: &str) -> MixelResult<()>;

    /// Allocate frame resources. Runs on the owning thread, before the
    /// worker starts.
    fn init(&mut self, cfg: &SourceConfig) -> MixelResult<()>;

    /// Produce the next frame, or `None` when nothing is available this
    /// cycle. `None` is not an error; a persistently dry source gets its
    /// layer auto-deactivated by the null-feed policy.
    fn feed(&mut self) -> Option<FrameBuffer>;

    /// Release all source-held resources.
    fn close(&mut self);

    /// Native frame size, known after `init`.
    fn size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Build the appropriate source for a descriptor.
///
/// `color://RRGGBB` descriptors become a [`SolidSource`]; paths with a
/// known still-image extension become an [`ImageSource`]. The descriptor
/// is not opened here; the layer's `open` does that.
pub fn create_source(descriptor: &str) -> MixelResult<Box<dyn Source>> {
    if descriptor.starts_with("color://") {
        return Ok(Box::new(SolidSource::new()));
    }

    let ext = Path::new(descriptor)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg" | "bmp" | "gif" | "webp") => Ok(Box::new(ImageSource::new())),
        _ => Err(MixelError::source(format!(
            "no source type matches descriptor '{descriptor}'"
        ))),
    }
}

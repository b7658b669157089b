use crate::foundation::clock::FrameClock;
use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::foundation::error::MixelResult;
use crate::frame::FrameBuffer;

/// Where composed frames go: a window backend, an encoder, a test sink.
/// Presentation backends are external collaborators; the engine only
/// pushes finished surfaces through this boundary.
pub trait PresentTarget: Send {
    /// Receive one composed output frame.
    fn present(&mut self, surface: &FrameBuffer);
}

/// Target that discards every frame.
#[derive(Debug, Default)]
pub struct NullPresent;

impl PresentTarget for NullPresent {
    fn present(&mut self, _surface: &FrameBuffer) {}
}

/// Target that keeps the last presented frame, for tests and probes.
///
/// Clones share state, so a clone kept outside the context observes what
/// the boxed original receives.
#[derive(Clone, Debug, Default)]
pub struct CapturePresent {
    inner: std::sync::Arc<parking_lot::Mutex<CaptureInner>>,
}

#[derive(Debug, Default)]
struct CaptureInner {
    last: Option<FrameBuffer>,
    presented: u64,
}

impl CapturePresent {
    /// Empty capture target.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the most recently presented frame.
    pub fn last(&self) -> Option<FrameBuffer> {
        self.inner.lock().last.clone()
    }

    /// How many frames have been presented.
    pub fn presented(&self) -> u64 {
        self.inner.lock().presented
    }
}

impl PresentTarget for CapturePresent {
    fn present(&mut self, surface: &FrameBuffer) {
        let mut inner = self.inner.lock();
        inner.last = Some(surface.clone());
        inner.presented += 1;
    }
}

/// The shared output surface and the frame-cadence authority.
///
/// Layers accumulate onto the surface in z order each frame; `present`
/// pushes the result to the attached target.
pub struct ViewPort {
    canvas: Canvas,
    surface: FrameBuffer,
    clear_color: Rgba8,
    clear_enabled: bool,
    clock: FrameClock,
    target: Box<dyn PresentTarget>,
}

impl ViewPort {
    /// Build a viewport with its accumulation surface and clock.
    pub fn new(canvas: Canvas, fps: Fps, target: Box<dyn PresentTarget>) -> MixelResult<Self> {
        Ok(Self {
            canvas,
            surface: FrameBuffer::solid(canvas.width, canvas.height, Rgba8::BLACK)?,
            clear_color: Rgba8::BLACK,
            clear_enabled: true,
            clock: FrameClock::new(fps),
            target,
        })
    }

    /// Output geometry.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// The cadence authority.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub(crate) fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    /// Background color used when clearing.
    pub fn set_clear_color(&mut self, color: Rgba8) {
        self.clear_color = color;
    }

    /// Toggle per-frame clearing; with clearing off, layers accumulate
    /// over the previous frame (trail effect).
    pub fn set_clear_enabled(&mut self, enabled: bool) {
        self.clear_enabled = enabled;
    }

    /// Reallocate the surface for a new output size.
    pub fn resize(&mut self, canvas: Canvas) -> MixelResult<()> {
        self.surface = FrameBuffer::solid(canvas.width, canvas.height, self.clear_color)?;
        self.canvas = canvas;
        Ok(())
    }

    /// Begin a frame: clear the accumulation surface if enabled.
    pub(crate) fn new_frame(&mut self) {
        if self.clear_enabled {
            self.surface.fill(self.clear_color);
        }
    }

    pub(crate) fn surface_mut(&mut self) -> &mut FrameBuffer {
        &mut self.surface
    }

    /// Read access to the accumulation surface.
    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    /// Push the composed surface to the present target.
    pub(crate) fn present(&mut self) {
        self.target.present(&self.surface);
    }
}

use crate::foundation::error::MixelResult;
use crate::frame::FrameBuffer;
use crate::source::{Source, SourceConfig};

/// Procedural source wrapping a per-cycle closure.
///
/// The closure receives the cycle counter and returns the next frame, or
/// `None` for a dry cycle. This is the hook for scripted and test-driven
/// content; it is constructed programmatically rather than through the
/// descriptor factory.
pub struct GeneratorSource {
    produce: Box<dyn FnMut(u64) -> Option<FrameBuffer> + Send>,
    cycle: u64,
    closed: bool,
}

impl GeneratorSource {
    /// Wrap a frame-producing closure.
    pub fn new(produce: impl FnMut(u64) -> Option<FrameBuffer> + Send + 'static) -> Self {
        Self {
            produce: Box::new(produce),
            cycle: 0,
            closed: false,
        }
    }
}

impl Source for GeneratorSource {
    fn open(&mut self, _descriptor: &str) -> MixelResult<()> {
        Ok(())
    }

    fn init(&mut self, _cfg: &SourceConfig) -> MixelResult<()> {
        Ok(())
    }

    fn feed(&mut self) -> Option<FrameBuffer> {
        if self.closed {
            return None;
        }
        let frame = (self.produce)(self.cycle);
        self.cycle += 1;
        frame
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    #[test]
    fn generator_counts_cycles() {
        let mut s = GeneratorSource::new(|cycle| {
            FrameBuffer::solid(2, 2, Rgba8::opaque(cycle as u8, 0, 0)).ok()
        });
        s.open("").unwrap();
        assert_eq!(s.feed().unwrap().get_pixel(0, 0), Some(Rgba8::opaque(0, 0, 0)));
        assert_eq!(s.feed().unwrap().get_pixel(0, 0), Some(Rgba8::opaque(1, 0, 0)));
    }

    #[test]
    fn closed_generator_feeds_null() {
        let mut s = GeneratorSource::new(|_| FrameBuffer::new(2, 2).ok());
        assert!(s.feed().is_some());
        s.close();
        assert!(s.feed().is_none());
    }
}

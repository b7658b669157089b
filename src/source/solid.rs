use crate::foundation::core::{Rgb, Rgba8};
use crate::foundation::error::{MixelError, MixelResult};
use crate::frame::FrameBuffer;
use crate::source::{Source, SourceConfig};

/// Source producing fixed solid-color frames, opened from a
/// `color://RRGGBB` descriptor.
#[derive(Debug, Default)]
pub struct SolidSource {
    color: Option<Rgba8>,
    frame: Option<FrameBuffer>,
}

impl SolidSource {
    /// An unopened solid source.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source pre-seeded with a color, bypassing descriptor parsing.
    pub fn with_color(color: Rgba8) -> Self {
        Self {
            color: Some(color),
            frame: None,
        }
    }
}

impl Source for SolidSource {
    fn open(&mut self, descriptor: &str) -> MixelResult<()> {
        if self.color.is_some() {
            return Ok(());
        }
        let hex = descriptor
            .strip_prefix("color://")
            .ok_or_else(|| MixelError::source(format!("not a color descriptor: '{descriptor}'")))?;
        let rgb = Rgb::from_hex(hex)
            .map_err(|e| MixelError::source(format!("bad color descriptor: {e}")))?;
        self.color = Some(Rgba8::opaque(rgb.r, rgb.g, rgb.b));
        Ok(())
    }

    fn init(&mut self, cfg: &SourceConfig) -> MixelResult<()> {
        let color = self
            .color
            .ok_or_else(|| MixelError::init("solid source init before open"))?;
        self.frame = Some(
            FrameBuffer::solid(cfg.width, cfg.height, color)
                .map_err(|e| MixelError::init(e.to_string()))?,
        );
        Ok(())
    }

    fn feed(&mut self) -> Option<FrameBuffer> {
        self.frame.clone()
    }

    fn close(&mut self) {
        self.frame = None;
    }

    fn size(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| (f.width(), f.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Fps;

    fn cfg() -> SourceConfig {
        SourceConfig {
            width: 4,
            height: 4,
            fps: Fps::new(30, 1).unwrap(),
        }
    }

    #[test]
    fn open_parses_color_descriptor() {
        let mut s = SolidSource::new();
        s.open("color://00ff00").unwrap();
        s.init(&cfg()).unwrap();
        let frame = s.feed().unwrap();
        assert_eq!(frame.get_pixel(0, 0), Some(Rgba8::opaque(0, 255, 0)));
    }

    #[test]
    fn open_rejects_garbage() {
        let mut s = SolidSource::new();
        assert!(s.open("color://nothex").is_err());
        assert!(s.open("file.png").is_err());
    }

    #[test]
    fn init_before_open_fails() {
        let mut s = SolidSource::new();
        assert!(matches!(s.init(&cfg()), Err(MixelError::Init(_))));
    }

    #[test]
    fn feed_after_close_is_null() {
        let mut s = SolidSource::with_color(Rgba8::BLACK);
        s.open("ignored").unwrap();
        s.init(&cfg()).unwrap();
        assert!(s.feed().is_some());
        s.close();
        assert!(s.feed().is_none());
    }
}

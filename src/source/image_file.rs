use crate::foundation::error::{MixelError, MixelResult};
use crate::frame::FrameBuffer;
use crate::source::{Source, SourceConfig};

/// Still-image source. The file is decoded at `open`, converted to an
/// RGBA frame at `init`, and fed unchanged every cycle.
#[derive(Default)]
pub struct ImageSource {
    decoded: Option<image::DynamicImage>,
    frame: Option<FrameBuffer>,
}

impl ImageSource {
    /// An unopened image source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Source for ImageSource {
    fn open(&mut self, descriptor: &str) -> MixelResult<()> {
        let img = image::open(descriptor)
            .map_err(|e| MixelError::source(format!("cannot open '{descriptor}': {e}")))?;
        self.decoded = Some(img);
        Ok(())
    }

    fn init(&mut self, cfg: &SourceConfig) -> MixelResult<()> {
        let img = self
            .decoded
            .take()
            .ok_or_else(|| MixelError::init("image source init before open"))?;

        // Downscale to the requested geometry when the image exceeds it;
        // smaller images keep their native size.
        let img = if img.width() > cfg.width || img.height() > cfg.height {
            img.resize(cfg.width, cfg.height, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        let mut frame = FrameBuffer::new(w, h).map_err(|e| MixelError::init(e.to_string()))?;
        frame.data_mut().copy_from_slice(rgba.as_raw());
        self.frame = Some(frame);
        Ok(())
    }

    fn feed(&mut self) -> Option<FrameBuffer> {
        self.frame.clone()
    }

    fn close(&mut self) {
        self.decoded = None;
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

    #[test]
    fn open_missing_file_is_a_source_error() {
        let mut s = ImageSource::new();
        assert!(matches!(
            s.open("/nonexistent/definitely-missing.png"),
            Err(MixelError::Source(_))
        ));
    }

    #[test]
    fn init_before_open_fails() {
        let mut s = ImageSource::new();
        let cfg = SourceConfig {
            width: 8,
            height: 8,
            fps: Fps::new(30, 1).unwrap(),
        };
        assert!(matches!(s.init(&cfg), Err(MixelError::Init(_))));
    }
}

use crate::foundation::error::{MixelError, MixelResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Rational output frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Frames per `den` seconds.
    pub num: u32,
    /// Denominator, always > 0.
    pub den: u32,
}

impl Fps {
    /// Validating constructor; both parts must be non-zero.
    pub fn new(num: u32, den: u32) -> MixelResult<Self> {
        if num == 0 {
            return Err(MixelError::init("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(MixelError::init("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// The rate as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Seconds per frame.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Seconds per frame as a [`std::time::Duration`].
    pub fn frame_duration(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_duration_secs())
    }
}

/// Output surface geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Validating constructor; zero-sized canvases are rejected.
    pub fn new(width: u32, height: u32) -> MixelResult<Self> {
        if width == 0 || height == 0 {
            return Err(MixelError::init("Canvas must be non-empty"));
        }
        Ok(Self { width, height })
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 = opaque.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    /// Construct from channel values.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from an RGB triple.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Channel array in memory order.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// An RGB triple, used for color-key transparency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Pure black, the conventional default key color.
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Parse a `RRGGBB` hex triple.
    pub fn from_hex(s: &str) -> MixelResult<Self> {
        let s = s.trim().trim_start_matches('#');
        if s.len() != 6 {
            return Err(MixelError::param(format!(
                "expected RRGGBB hex triple, got '{s}'"
            )));
        }
        let parse = |r: &str| {
            u8::from_str_radix(r, 16)
                .map_err(|_| MixelError::param(format!("bad hex digits in '{s}'")))
        };
        Ok(Self {
            r: parse(&s[0..2])?,
            g: parse(&s[2..4])?,
            b: parse(&s[4..6])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero_parts() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        let ntsc = Fps::new(30000, 1001).unwrap();
        assert!((ntsc.as_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn frame_duration_matches_rate() {
        let fps = Fps::new(25, 1).unwrap();
        assert!((fps.frame_duration_secs() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn rgb_hex_parses_and_rejects() {
        assert_eq!(Rgb::from_hex("00ff00").unwrap(), Rgb { r: 0, g: 255, b: 0 });
        assert!(Rgb::from_hex("#102030").is_ok());
        assert!(Rgb::from_hex("xyzxyz").is_err());
        assert!(Rgb::from_hex("fff").is_err());
    }
}

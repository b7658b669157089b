use crate::foundation::error::{MixelError, MixelResult};
use crate::frame::FrameBuffer;
use crate::geometry::Geometry;
use smallvec::SmallVec;

/// A per-frame, chainable transform of a frame buffer.
///
/// Filters run on the render thread in insertion order, each receiving the
/// previous filter's output and returning a (possibly new) buffer. A
/// filter that fails is skipped for that frame (logged, not fatal) and
/// the previous buffer passes through unchanged.
pub trait Filter: Send {
    /// Filter name as registered with the factory.
    fn name(&self) -> &str;

    /// Transform one frame given the owning layer's geometry.
    fn apply(&mut self, frame: &FrameBuffer, geo: &Geometry) -> MixelResult<FrameBuffer>;
}

/// Ordered filter chain; insertion order is application order.
#[derive(Default)]
pub(crate) struct FilterChain {
    entries: SmallVec<[Box<dyn Filter>; 4]>,
}

impl FilterChain {
    pub(crate) fn push(&mut self, filter: Box<dyn Filter>) {
        self.entries.push(filter);
    }

    pub(crate) fn remove_by_name(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|f| f.name() != name);
        self.entries.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Apply the whole chain to `frame`. Failures skip that filter for
    /// this frame and keep going.
    pub(crate) fn run(&mut self, frame: &FrameBuffer, geo: &Geometry) -> FrameBuffer {
        let mut current = frame.clone();
        for f in self.entries.iter_mut() {
            match f.apply(&current, geo) {
                Ok(next) => current = next,
                Err(e) => {
                    tracing::warn!(filter = f.name(), error = %e, "filter skipped for this frame");
                }
            }
        }
        current
    }
}

/// Invert every color channel, leaving alpha untouched.
#[derive(Debug, Default)]
pub struct Invert;

impl Filter for Invert {
    fn name(&self) -> &str {
        "invert"
    }

    fn apply(&mut self, frame: &FrameBuffer, _geo: &Geometry) -> MixelResult<FrameBuffer> {
        let mut out = frame.clone();
        for px in out.data_mut().chunks_exact_mut(4) {
            px[0] = 255 - px[0];
            px[1] = 255 - px[1];
            px[2] = 255 - px[2];
        }
        Ok(out)
    }
}

/// Scale every color channel by a constant gain.
#[derive(Debug)]
pub struct Brightness {
    gain: f32,
}

impl Brightness {
    /// Gain must be finite and non-negative.
    pub fn new(gain: f32) -> MixelResult<Self> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(MixelError::filter("brightness gain must be finite and >= 0"));
        }
        Ok(Self { gain })
    }
}

impl Filter for Brightness {
    fn name(&self) -> &str {
        "brightness"
    }

    fn apply(&mut self, frame: &FrameBuffer, _geo: &Geometry) -> MixelResult<FrameBuffer> {
        let mut out = frame.clone();
        for px in out.data_mut().chunks_exact_mut(4) {
            for c in &mut px[0..3] {
                *c = (f32::from(*c) * self.gain).round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok(out)
    }
}

/// Swap the red and blue channels.
#[derive(Debug, Default)]
pub struct ChannelSwap;

impl Filter for ChannelSwap {
    fn name(&self) -> &str {
        "channelswap"
    }

    fn apply(&mut self, frame: &FrameBuffer, _geo: &Geometry) -> MixelResult<FrameBuffer> {
        let mut out = frame.clone();
        for px in out.data_mut().chunks_exact_mut(4) {
            px.swap(0, 2);
        }
        Ok(out)
    }
}

/// Build a filter by normalized kind name with JSON parameters, the form
/// the scripting boundary delivers.
pub fn create_filter(kind: &str, params: &serde_json::Value) -> MixelResult<Box<dyn Filter>> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(MixelError::filter("filter kind must be non-empty"));
    }

    match kind.as_str() {
        "invert" => Ok(Box::new(Invert)),
        "brightness" => {
            let gain = get_f32(params, "gain")?;
            Ok(Box::new(Brightness::new(gain)?))
        }
        "channelswap" | "channel_swap" | "channel-swap" => Ok(Box::new(ChannelSwap)),
        _ => Err(MixelError::filter(format!("unknown filter kind '{kind}'"))),
    }
}

fn get_f32(obj: &serde_json::Value, key: &str) -> MixelResult<f32> {
    let Some(v) = obj.get(key) else {
        return Err(MixelError::filter(format!("missing filter param '{key}'")));
    };
    v.as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| MixelError::filter(format!("filter param '{key}' must be a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    struct AlwaysFails;

    impl Filter for AlwaysFails {
        fn name(&self) -> &str {
            "alwaysfails"
        }

        fn apply(&mut self, _frame: &FrameBuffer, _geo: &Geometry) -> MixelResult<FrameBuffer> {
            Err(MixelError::filter("unsupported pixel geometry"))
        }
    }

    fn frame() -> FrameBuffer {
        FrameBuffer::solid(2, 2, Rgba8::new(10, 20, 30, 200)).unwrap()
    }

    #[test]
    fn invert_preserves_alpha() {
        let out = Invert.apply(&frame(), &Geometry::new(2, 2)).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(Rgba8::new(245, 235, 225, 200)));
    }

    #[test]
    fn chain_applies_in_insertion_order() {
        let mut chain = FilterChain::default();
        chain.push(Box::new(Brightness::new(2.0).unwrap()));
        chain.push(Box::new(ChannelSwap));
        let out = chain.run(&frame(), &Geometry::new(2, 2));
        // Doubled first, swapped second.
        assert_eq!(out.get_pixel(0, 0), Some(Rgba8::new(60, 40, 20, 200)));
    }

    #[test]
    fn failing_filter_is_skipped_not_fatal() {
        let mut chain = FilterChain::default();
        chain.push(Box::new(AlwaysFails));
        chain.push(Box::new(Invert));
        let input = frame();
        let out = chain.run(&input, &Geometry::new(2, 2));
        // The failing stage passes its input through; invert still runs.
        assert_eq!(out.get_pixel(0, 0), Some(Rgba8::new(245, 235, 225, 200)));
    }

    #[test]
    fn pure_chain_is_idempotent_across_runs() {
        let mut chain = FilterChain::default();
        chain.push(Box::new(Invert));
        chain.push(Box::new(Brightness::new(0.5).unwrap()));
        let input = frame();
        let a = chain.run(&input, &Geometry::new(2, 2));
        let b = chain.run(&input, &Geometry::new(2, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn factory_parses_kinds_and_params() {
        assert!(create_filter("invert", &serde_json::json!({})).is_ok());
        assert!(create_filter("  Brightness ", &serde_json::json!({"gain": 1.5})).is_ok());
        assert!(matches!(
            create_filter("brightness", &serde_json::json!({})),
            Err(MixelError::Filter(_))
        ));
        assert!(matches!(
            create_filter("glow", &serde_json::json!({})),
            Err(MixelError::Filter(_))
        ));
    }

    #[test]
    fn remove_by_name() {
        let mut chain = FilterChain::default();
        chain.push(Box::new(Invert));
        chain.push(Box::new(ChannelSwap));
        assert!(chain.remove_by_name("invert"));
        assert!(!chain.remove_by_name("invert"));
        assert_eq!(chain.len(), 1);
    }
}

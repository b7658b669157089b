use std::sync::Arc;

/// Read-only per-frame audio input consumed by automations.
///
/// The engine never writes through this boundary; a capture backend owns
/// the write side and the render loop samples `level()` once per frame.
pub trait AudioCollector: Send + Sync {
    /// Current input level, normalized to `0.0..=1.0`.
    fn level(&self) -> f32;
}

/// Collector that always reports silence; the default for a context with
/// no audio backend attached.
#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioCollector for SilentAudio {
    fn level(&self) -> f32 {
        0.0
    }
}

/// A level cell shared between a capture thread (writer) and the render
/// loop (reader).
#[derive(Debug, Default)]
pub struct SharedLevel {
    level: parking_lot::RwLock<f32>,
}

impl SharedLevel {
    /// New silent cell, ready to be handed to both sides.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Write side: store the latest capture level, clamped to `0.0..=1.0`.
    pub fn store(&self, level: f32) {
        *self.level.write() = level.clamp(0.0, 1.0);
    }
}

impl AudioCollector for SharedLevel {
    fn level(&self) -> f32 {
        *self.level.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_audio_is_zero() {
        assert_eq!(SilentAudio.level(), 0.0);
    }

    #[test]
    fn shared_level_clamps_and_round_trips() {
        let cell = SharedLevel::new();
        cell.store(0.5);
        assert_eq!(cell.level(), 0.5);
        cell.store(7.0);
        assert_eq!(cell.level(), 1.0);
        cell.store(-1.0);
        assert_eq!(cell.level(), 0.0);
    }
}

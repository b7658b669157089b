use crate::animation::Tick;
use crate::audio::{AudioCollector, SilentAudio};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{MixelError, MixelResult};
use crate::layer::{Layer, LayerState};
use crate::viewport::{PresentTarget, ViewPort};
use std::sync::Arc;

/// Counters accumulated by the render loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames composed and presented.
    pub frames: u64,
    /// Worker cycles that missed the frame deadline (stale frame shown).
    pub deadline_misses: u64,
    /// Layers auto-deactivated by the null-feed policy.
    pub auto_deactivated: u64,
    /// Layers removed after their fade pulse completed.
    pub faded_out: u64,
}

/// Owner of the layer collection and driver of the render loop.
///
/// The collection is ordered; iteration order is compositing (z) order,
/// with higher indices composited later, on top. The collection is only
/// mutated through `&mut self` between frames, so a frame in progress
/// always sees one consistent ordering.
pub struct Context {
    viewport: ViewPort,
    layers: Vec<Layer>,
    audio: Arc<dyn AudioCollector>,
    stats: RenderStats,
    paused: bool,
    quit: bool,
    frame: u64,
}

impl Context {
    /// Build a context around an output canvas, target rate, and a
    /// presentation backend.
    pub fn new(canvas: Canvas, fps: Fps, target: Box<dyn PresentTarget>) -> MixelResult<Self> {
        Ok(Self {
            viewport: ViewPort::new(canvas, fps, target)?,
            layers: Vec::new(),
            audio: Arc::new(SilentAudio),
            stats: RenderStats::default(),
            paused: false,
            quit: false,
            frame: 0,
        })
    }

    /// The output viewport.
    pub fn viewport(&self) -> &ViewPort {
        &self.viewport
    }

    /// Mutable access to the output viewport.
    pub fn viewport_mut(&mut self) -> &mut ViewPort {
        &mut self.viewport
    }

    /// Attach an audio collector; automations read its level each frame.
    pub fn set_audio(&mut self, audio: Arc<dyn AudioCollector>) {
        self.audio = audio;
    }

    /// Accumulated loop counters.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Toggle the whole mix on pause; layers freeze on their last frames.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Ask [`run`](Self::run) to stop after the current frame.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    // ------------------------------------------------------------------
    // Layer collection
    // ------------------------------------------------------------------

    /// Number of layers in the mix.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer names in compositing order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(Layer::name).collect()
    }

    /// Find a layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Find a layer by name, mutably.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name() == name)
    }

    /// Position of a layer in compositing order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name() == name)
    }

    /// Initialize an opened layer against this context's geometry and
    /// append it to the top of the mix. The layer must have completed
    /// `open`; a layer already running (explicit-size init) is appended
    /// as-is. Returns the name the layer ended up with, which differs
    /// from the requested one when deduplication kicked in.
    pub fn add_layer(&mut self, mut layer: Layer) -> MixelResult<String> {
        match layer.state() {
            LayerState::Opened => {
                layer.init(self.viewport.canvas(), self.viewport.clock().fps())?;
            }
            LayerState::Running => {}
            other => {
                return Err(MixelError::init(format!(
                    "layer '{}' cannot join a context in state {other:?}",
                    layer.name()
                )));
            }
        }

        let unique = self.unique_name(layer.name());
        if unique != layer.name() {
            layer.set_name(unique.clone());
        }
        tracing::info!(layer = %layer.name(), "layer added");
        self.layers.push(layer);
        Ok(unique)
    }

    /// Detach a layer from compositing, then stop its worker
    /// (join-before-free). The layer is never observable half-removed: it
    /// leaves the collection before its worker is asked to stop.
    pub fn rem_layer(&mut self, name: &str) -> MixelResult<()> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| MixelError::param(format!("no layer named '{name}'")))?;
        let mut layer = self.layers.remove(idx);
        layer.close();
        tracing::info!(layer = name, "layer removed");
        Ok(())
    }

    /// Move a layer one step toward the top of the mix. Stable at the
    /// top: moving the topmost layer up is a no-op.
    pub fn layer_up(&mut self, name: &str) -> MixelResult<()> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| MixelError::param(format!("no layer named '{name}'")))?;
        if idx + 1 < self.layers.len() {
            self.layers.swap(idx, idx + 1);
        }
        Ok(())
    }

    /// Move a layer one step toward the bottom of the mix. Stable at the
    /// bottom.
    pub fn layer_down(&mut self, name: &str) -> MixelResult<()> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| MixelError::param(format!("no layer named '{name}'")))?;
        if idx > 0 {
            self.layers.swap(idx, idx - 1);
        }
        Ok(())
    }

    /// Move a layer to an absolute position, clamped to the collection.
    pub fn move_layer(&mut self, name: &str, position: usize) -> MixelResult<()> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| MixelError::param(format!("no layer named '{name}'")))?;
        let position = position.min(self.layers.len() - 1);
        if position != idx {
            let layer = self.layers.remove(idx);
            self.layers.insert(position, layer);
        }
        Ok(())
    }

    fn unique_name(&self, base: &str) -> String {
        if self.layer(base).is_none() {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.layer(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    // ------------------------------------------------------------------
    // Render loop
    // ------------------------------------------------------------------

    /// Compose and present one output frame.
    ///
    /// Workers are signaled in parallel and awaited up to the frame
    /// deadline; a worker that misses it composites with its previous
    /// frame rather than blocking the mix. Automations run before
    /// filters, filters before the ordered composite.
    pub fn render_frame(&mut self) -> MixelResult<()> {
        if self.paused {
            self.viewport.present();
            return Ok(());
        }

        let deadline = self.viewport.clock().deadline();

        let was_active: Vec<bool> = self.layers.iter().map(Layer::is_active).collect();

        // Late results from a previous cycle refresh the stale cache
        // before this cycle's go.
        for layer in &mut self.layers {
            layer.drain_late();
        }
        for layer in &mut self.layers {
            layer.signal_go();
        }
        for layer in &mut self.layers {
            if layer.collect_until(deadline) {
                self.stats.deadline_misses += 1;
            }
        }

        for (layer, was) in self.layers.iter().zip(&was_active) {
            if *was && !layer.is_active() && layer.state() == LayerState::Running {
                self.stats.auto_deactivated += 1;
            }
        }

        let tick = Tick {
            dt_secs: self.viewport.clock().delta_secs(),
            frame: self.frame,
            audio_level: self.audio.level(),
        };
        for layer in &mut self.layers {
            layer.run_automations(&tick);
            layer.run_filters();
        }

        self.viewport.new_frame();
        for layer in &mut self.layers {
            layer.composite_onto(self.viewport.surface_mut());
        }
        self.viewport.present();

        // Faded-out layers leave the mix at the frame boundary.
        let mut i = 0;
        while i < self.layers.len() {
            if self.layers[i].fade_complete() {
                let mut layer = self.layers.remove(i);
                layer.close();
                self.stats.faded_out += 1;
            } else {
                i += 1;
            }
        }

        self.frame += 1;
        self.stats.frames += 1;
        Ok(())
    }

    /// Run the paced loop for `frames` output frames, or until
    /// [`request_quit`](Self::request_quit).
    pub fn run(&mut self, frames: u64) -> MixelResult<RenderStats> {
        self.viewport.clock_mut().restart();
        for _ in 0..frames {
            if self.quit {
                break;
            }
            self.render_frame()?;
            self.viewport_mut().clock_mut().wait_frame();
        }
        Ok(self.stats)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        for layer in &mut self.layers {
            layer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;
    use crate::layer::create_layer;
    use crate::viewport::CapturePresent;

    fn ctx() -> Context {
        Context::new(
            Canvas::new(4, 4).unwrap(),
            Fps::new(1000, 1).unwrap(),
            Box::new(CapturePresent::new()),
        )
        .unwrap()
    }

    fn solid(hex: &str) -> Layer {
        create_layer(&format!("color://{hex}")).unwrap()
    }

    #[test]
    fn add_layer_requires_opened_state() {
        let mut ctx = ctx();
        let layer = Layer::with_source("color://123456", Box::new(crate::source::SolidSource::new()));
        assert!(ctx.add_layer(layer).is_err());
        assert_eq!(ctx.layer_count(), 0);

        ctx.add_layer(solid("ff0000")).unwrap();
        assert_eq!(ctx.layer_count(), 1);
    }

    #[test]
    fn duplicate_names_are_disambiguated() {
        let mut ctx = ctx();
        ctx.add_layer(solid("ff0000")).unwrap();
        ctx.add_layer(solid("ff0000")).unwrap();
        assert_eq!(ctx.layer_names(), vec!["color-ff0000", "color-ff0000-2"]);
    }

    #[test]
    fn reorder_ops_are_stable_at_edges() {
        let mut ctx = ctx();
        ctx.add_layer(solid("aa0000")).unwrap();
        ctx.add_layer(solid("00bb00")).unwrap();
        ctx.add_layer(solid("0000cc")).unwrap();
        let names = |c: &Context| {
            c.layer_names()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        };
        let initial = names(&ctx);

        ctx.layer_up(&initial[2].clone()).unwrap();
        assert_eq!(names(&ctx), initial);
        ctx.layer_down(&initial[0].clone()).unwrap();
        assert_eq!(names(&ctx), initial);
        ctx.move_layer(&initial[1].clone(), 1).unwrap();
        assert_eq!(names(&ctx), initial);

        ctx.move_layer(&initial[2].clone(), 0).unwrap();
        assert_eq!(names(&ctx)[0], initial[2]);
        assert!(ctx.rem_layer("missing").is_err());
    }

    #[test]
    fn rem_layer_detaches_and_closes() {
        let mut ctx = ctx();
        ctx.add_layer(solid("ff0000")).unwrap();
        ctx.rem_layer("color-ff0000").unwrap();
        assert_eq!(ctx.layer_count(), 0);
    }

    #[test]
    fn paused_context_presents_without_advancing() {
        let mut ctx = ctx();
        ctx.add_layer(solid("ff0000")).unwrap();
        ctx.set_paused(true);
        ctx.render_frame().unwrap();
        assert_eq!(ctx.frame(), 0);
        assert_eq!(ctx.stats().frames, 0);
    }

    #[test]
    fn render_frame_composites_in_order() {
        let mut ctx = Context::new(
            Canvas::new(4, 4).unwrap(),
            Fps::new(50, 1).unwrap(),
            Box::new(CapturePresent::new()),
        )
        .unwrap();
        ctx.add_layer(solid("ff0000")).unwrap();
        ctx.add_layer(solid("0000ff")).unwrap();
        ctx.run(3).unwrap();
        assert_eq!(
            ctx.viewport().surface().get_pixel(0, 0),
            Some(Rgba8::opaque(0, 0, 255))
        );
    }
}

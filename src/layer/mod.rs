//! The layer core: one independently-scheduled visual source plus its
//! per-frame processing state.

mod worker;

pub(crate) use worker::{FeedWorker, WorkerPoll};

use crate::animation::{Automation, AutomationChain, AutomationKind, Target, Tick};
use crate::blit::{self, BlendMode};
use crate::filter::{Filter, FilterChain};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{MixelError, MixelResult};
use crate::frame::FrameBuffer;
use crate::geometry::Geometry;
use crate::param::{ParamSet, ParamValue, Parameter};
use crate::source::{Source, SourceConfig, create_source};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Dry feed cycles tolerated before a layer auto-deactivates.
pub const DEFAULT_MAX_NULL_FEEDS: u32 = 30;

const OPACITY: &str = "opacity";

/// Lifecycle phase of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerState {
    /// Constructed, descriptor not yet validated.
    Created,
    /// Source descriptor validated; no worker exists yet.
    Opened,
    /// Worker running, participating in frames.
    Running,
    /// Worker alive but receiving no go signals; last frame stays up.
    Paused,
    /// Shutdown in progress.
    Closing,
    /// Worker joined, buffers released.
    Closed,
}

/// Build a layer for a descriptor, with the source type detected from the
/// descriptor, and validate it. The layer is ready for a context's
/// `add_layer` afterwards.
pub fn create_layer(descriptor: &str) -> MixelResult<Layer> {
    let source = create_source(descriptor)?;
    let mut layer = Layer::with_source(descriptor, source);
    layer.open()?;
    Ok(layer)
}

struct SourceGuard {
    source: Box<dyn Source>,
    opened: bool,
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        // Sources are closed exactly once after a successful open, wherever
        // the guard ends up (owning layer or worker thread).
        if self.opened {
            self.source.close();
        }
    }
}

struct Pulse {
    step: u8,
    ceiling: u8,
    value: u8,
    rising: bool,
}

/// An independently-scheduled visual source plus its per-frame processing
/// state: worker, filter chain, automation chain, geometry, blend mode.
pub struct Layer {
    name: String,
    descriptor: String,
    state: LayerState,
    active: Arc<AtomicBool>,
    hidden: bool,
    fade: bool,
    geo: Geometry,
    params: ParamSet,
    opacity: u8,
    blend: BlendMode,
    filters: FilterChain,
    automations: AutomationChain,
    pulse: Option<Pulse>,
    source: Option<SourceGuard>,
    worker: Option<FeedWorker>,
    fed: Option<FrameBuffer>,
    filtered: Option<FrameBuffer>,
    null_feeds: u32,
    max_null_feeds: u32,
    frames_produced: u64,
}

impl Layer {
    /// Wrap an already-constructed source. Most callers want
    /// [`create_layer`] instead; this is the entry point for custom
    /// source implementations.
    pub fn with_source(descriptor: &str, source: Box<dyn Source>) -> Self {
        let mut params = ParamSet::new();
        params.define(Parameter::number(OPACITY, 255.0, 0.0, 255.0));
        params.define(Parameter::number("x", 0.0, -1.0e6, 1.0e6));
        params.define(Parameter::number("y", 0.0, -1.0e6, 1.0e6));
        params.define(Parameter::number("zoom", 1.0, 0.01, 100.0));
        params.define(Parameter::number("rotation", 0.0, 0.0, 360.0));

        Self {
            name: name_from_descriptor(descriptor),
            descriptor: descriptor.to_string(),
            state: LayerState::Created,
            active: Arc::new(AtomicBool::new(false)),
            hidden: false,
            fade: false,
            geo: Geometry::new(0, 0),
            params,
            opacity: 255,
            blend: BlendMode::Rgb,
            filters: FilterChain::default(),
            automations: AutomationChain::new(),
            pulse: None,
            source: Some(SourceGuard {
                source,
                opened: false,
            }),
            worker: None,
            fed: None,
            filtered: None,
            null_feeds: 0,
            max_null_feeds: DEFAULT_MAX_NULL_FEEDS,
            frames_produced: 0,
        }
    }

    /// Layer name, unique within a context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the layer. Contexts deduplicate on add.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The source descriptor this layer was built from.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> LayerState {
        self.state
    }

    /// Whether the layer participates in feeding and compositing.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Whether the blitter skips this layer.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Hide or show the layer; a hidden layer keeps feeding.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Read-only geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geo
    }

    /// Current parameter values.
    pub fn parameters(&self) -> &ParamSet {
        &self.params
    }

    /// Dry feed cycles observed in a row by the render loop.
    pub fn null_feeds(&self) -> u32 {
        self.null_feeds
    }

    /// Tolerance before auto-deactivation; effective for workers started
    /// after the call.
    pub fn set_max_null_feeds(&mut self, max: u32) {
        self.max_null_feeds = max;
    }

    /// Frames produced by the worker so far.
    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Validate and prepare the source descriptor. No worker exists yet.
    pub fn open(&mut self) -> MixelResult<()> {
        if self.state != LayerState::Created {
            return Err(MixelError::source(format!(
                "layer '{}' cannot open in state {:?}",
                self.name, self.state
            )));
        }
        let guard = self
            .source
            .as_mut()
            .ok_or_else(|| MixelError::source("layer has no source"))?;
        guard.source.open(&self.descriptor)?;
        guard.opened = true;
        self.state = LayerState::Opened;
        tracing::debug!(layer = %self.name, "opened");
        Ok(())
    }

    /// Allocate frame resources sized to the context's output geometry and
    /// start the worker thread.
    pub fn init(&mut self, canvas: Canvas, fps: Fps) -> MixelResult<()> {
        self.init_sized(canvas.width, canvas.height, fps)
    }

    /// [`init`](Self::init) with an explicit size override.
    pub fn init_sized(&mut self, width: u32, height: u32, fps: Fps) -> MixelResult<()> {
        if self.state != LayerState::Opened {
            return Err(MixelError::init(format!(
                "layer '{}' cannot init in state {:?}",
                self.name, self.state
            )));
        }
        let mut guard = self
            .source
            .take()
            .ok_or_else(|| MixelError::init("layer has no source"))?;

        let cfg = SourceConfig {
            width,
            height,
            fps,
        };
        if let Err(e) = guard.source.init(&cfg) {
            self.source = Some(guard);
            return Err(e);
        }

        let (w, h) = guard.source.size().unwrap_or((width, height));
        self.geo.w = w;
        self.geo.h = h;

        let active = Arc::clone(&self.active);
        let max_null = self.max_null_feeds;
        let name = self.name.clone();
        let mut nulls = 0u32;
        let task = move || {
            let frame = guard.source.feed();
            if frame.is_some() {
                nulls = 0;
            } else {
                nulls += 1;
                if nulls > max_null {
                    // Bound the resource waste of a dead source without
                    // terminating the worker; the tolerance window restarts
                    // if the layer is reactivated.
                    active.store(false, Ordering::Relaxed);
                    nulls = 0;
                    tracing::info!(layer = %name, "auto-deactivated after persistent null feeds");
                }
            }
            frame
        };

        self.worker = Some(FeedWorker::spawn(&self.name, task)?);
        self.active.store(true, Ordering::Relaxed);
        self.state = LayerState::Running;
        tracing::debug!(layer = %self.name, w, h, "worker started");
        Ok(())
    }

    /// Resume a paused layer and reactivate an auto-deactivated one.
    pub fn start(&mut self) {
        if self.state == LayerState::Paused {
            self.state = LayerState::Running;
        }
        if self.state == LayerState::Running {
            self.active.store(true, Ordering::Relaxed);
            self.null_feeds = 0;
        }
    }

    /// Stop sending go signals; the last produced frame keeps compositing.
    pub fn pause(&mut self) {
        if self.state == LayerState::Running {
            self.state = LayerState::Paused;
        }
    }

    /// Wake and join the worker, release buffers. Idempotent, and safe to
    /// call while the worker is mid-cycle.
    pub fn close(&mut self) {
        if self.state == LayerState::Closed {
            return;
        }
        self.state = LayerState::Closing;
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        // A layer that never reached init still owns its source; dropping
        // the guard closes it.
        self.source = None;
        self.fed = None;
        self.filtered = None;
        self.active.store(false, Ordering::Relaxed);
        self.state = LayerState::Closed;
        tracing::debug!(layer = %self.name, "closed");
    }

    // ------------------------------------------------------------------
    // Parameters and geometry
    // ------------------------------------------------------------------

    /// Write a controllable parameter; scalar writes clamp to the
    /// parameter's admissible range.
    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> MixelResult<()> {
        self.params.set(name, value)?;
        let stored = self
            .params
            .get(name)
            .and_then(|p| p.value().as_number())
            .unwrap_or(0.0);
        match name {
            OPACITY => self.opacity = stored.round() as u8,
            "x" => self.geo.x = stored,
            "y" => self.geo.y = stored,
            "zoom" => self.geo.set_zoom(stored, stored),
            "rotation" => self.geo.set_rotate(stored),
            _ => {}
        }
        Ok(())
    }

    /// Read a controllable parameter.
    pub fn get_parameter(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name).map(|p| p.value())
    }

    /// Move to an absolute position; coordinates refer to the upper-left
    /// corner.
    pub fn set_position(&mut self, x: f64, y: f64) -> MixelResult<()> {
        self.set_parameter("x", ParamValue::Number(x))?;
        self.set_parameter("y", ParamValue::Number(y))
    }

    /// Slide toward a position at a constant speed (pixels per second).
    pub fn slide_position(&mut self, x: f64, y: f64, speed: f64) {
        self.automations.push(Automation::new(
            Target::X,
            AutomationKind::Slide { to: x, speed },
        ));
        self.automations.push(Automation::new(
            Target::Y,
            AutomationKind::Slide { to: y, speed },
        ));
    }

    /// Set the magnification for both axes.
    pub fn set_zoom(&mut self, x: f64, y: f64) {
        self.geo.set_zoom(x, y);
        let _ = self.params.set("zoom", ParamValue::Number(self.geo.zoom_x));
    }

    /// Set the rotation angle in degrees.
    pub fn set_rotate(&mut self, angle: f64) {
        self.geo.set_rotate(angle);
        let _ = self
            .params
            .set("rotation", ParamValue::Number(self.geo.rotation));
    }

    /// Continuously rotate and zoom with per-second increments.
    pub fn set_spin(&mut self, rotation: f64, zoom: f64) {
        self.geo.set_spin(rotation, zoom);
    }

    /// Scale and center on the canvas.
    pub fn fit(&mut self, canvas: Canvas, keep_aspect: bool) {
        self.geo.fit(canvas, keep_aspect);
    }

    // ------------------------------------------------------------------
    // Blend mode
    // ------------------------------------------------------------------

    /// Select the blend mode by name. On an unknown name the previous mode
    /// stays active and an error is returned.
    pub fn set_blit(&mut self, name: &str) -> MixelResult<()> {
        self.blend = BlendMode::parse(name)?;
        Ok(())
    }

    /// Name of the currently selected blend mode.
    pub fn get_blit(&self) -> &'static str {
        self.blend.name()
    }

    /// Switch to alpha blending at zero opacity and pulse up to `ceiling`
    /// and back; when the pulse completes the owning context removes the
    /// layer.
    pub fn pulse_alpha(&mut self, step: u8, ceiling: u8) {
        self.blend = BlendMode::Alpha;
        let _ = self.set_parameter(OPACITY, ParamValue::Number(0.0));
        self.fade = true;
        self.pulse = Some(Pulse {
            step: step.max(1),
            ceiling,
            value: 0,
            rising: true,
        });
    }

    /// Whether a fade pulse has run to completion.
    pub fn fade_complete(&self) -> bool {
        self.fade && self.pulse.is_none()
    }

    // ------------------------------------------------------------------
    // Chains
    // ------------------------------------------------------------------

    /// Append a filter; insertion order is application order.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Remove all filters with the given name. Returns whether any were
    /// removed.
    pub fn remove_filter(&mut self, name: &str) -> bool {
        self.filters.remove_by_name(name)
    }

    /// Number of filters in the chain.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Append an automation; insertion order is execution order.
    pub fn add_automation(&mut self, automation: Automation) {
        self.automations.push(automation);
    }

    /// Number of automations in the chain.
    pub fn automation_count(&self) -> usize {
        self.automations.len()
    }

    // ------------------------------------------------------------------
    // Frame cycle, driven by the context
    // ------------------------------------------------------------------

    /// Whether this layer should be fed this frame.
    pub(crate) fn eligible(&self) -> bool {
        self.state == LayerState::Running && self.is_active()
    }

    /// Drain a late result from a previous cycle, if any, so the stale
    /// cache is as fresh as possible before the next go.
    pub(crate) fn drain_late(&mut self) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        if !worker.in_flight() {
            return;
        }
        match worker.try_collect() {
            WorkerPoll::Ready(out) => self.adopt(out),
            WorkerPoll::Pending => {}
            WorkerPoll::Gone => self.worker_gone(),
        }
    }

    /// Signal one feed cycle. Returns false for ineligible layers and for
    /// workers still busy with a previous cycle.
    pub(crate) fn signal_go(&mut self) -> bool {
        if !self.eligible() {
            return false;
        }
        self.worker
            .as_mut()
            .map(FeedWorker::signal_go)
            .unwrap_or(false)
    }

    /// Wait for this layer's cycle until `deadline`. Returns true when the
    /// deadline was missed and the stale frame will composite instead.
    pub(crate) fn collect_until(&mut self, deadline: Instant) -> bool {
        let Some(worker) = self.worker.as_mut() else {
            return false;
        };
        if !worker.in_flight() {
            return false;
        }
        match worker.collect_deadline(deadline) {
            WorkerPoll::Ready(out) => {
                self.adopt(out);
                false
            }
            WorkerPoll::Pending => {
                tracing::debug!(layer = %self.name, "deadline missed, compositing stale frame");
                true
            }
            WorkerPoll::Gone => {
                self.worker_gone();
                false
            }
        }
    }

    fn adopt(&mut self, out: Option<FrameBuffer>) {
        match out {
            Some(frame) => {
                self.null_feeds = 0;
                self.frames_produced += 1;
                if frame.width() != self.geo.w || frame.height() != self.geo.h {
                    self.geo.w = frame.width();
                    self.geo.h = frame.height();
                }
                self.fed = Some(frame);
            }
            None => {
                self.null_feeds = self.null_feeds.saturating_add(1);
            }
        }
    }

    fn worker_gone(&mut self) {
        tracing::error!(layer = %self.name, "worker thread died; deactivating layer");
        self.worker = None;
        self.active.store(false, Ordering::Relaxed);
    }

    /// Run the automation chain in insertion order; finished one-shots
    /// remove themselves.
    pub(crate) fn run_automations(&mut self, tick: &Tick) {
        if self.geo.has_spin() {
            self.geo.apply_spin(tick.dt_secs);
        }

        let mut chain = std::mem::take(&mut self.automations);
        chain.retain(|a| {
            let current = self.read_target(a.target());
            let out = a.step(tick, current);
            self.write_target(a.target().clone(), out.value);
            !out.finished
        });
        self.automations = chain;

        if let Some(mut pulse) = self.pulse.take() {
            let mut done = false;
            if pulse.rising {
                let next = pulse.value.saturating_add(pulse.step);
                if next >= pulse.ceiling {
                    pulse.value = pulse.ceiling;
                    pulse.rising = false;
                } else {
                    pulse.value = next;
                }
            } else {
                pulse.value = pulse.value.saturating_sub(pulse.step);
                done = pulse.value == 0;
            }
            let _ = self.set_parameter(OPACITY, ParamValue::Number(f64::from(pulse.value)));
            if !done {
                self.pulse = Some(pulse);
            }
        }
    }

    fn read_target(&self, target: &Target) -> f64 {
        match target {
            Target::Param(name) => self
                .params
                .get(name)
                .and_then(|p| p.value().as_number())
                .unwrap_or(0.0),
            Target::X => self.geo.x,
            Target::Y => self.geo.y,
            Target::Zoom => self.geo.zoom_x,
            Target::Rotation => self.geo.rotation,
        }
    }

    fn write_target(&mut self, target: Target, value: f64) {
        let result = match target {
            Target::Param(name) => self.set_parameter(&name, ParamValue::Number(value)),
            Target::X => self.set_parameter("x", ParamValue::Number(value)),
            Target::Y => self.set_parameter("y", ParamValue::Number(value)),
            Target::Zoom => self.set_parameter("zoom", ParamValue::Number(value)),
            Target::Rotation => self.set_parameter("rotation", ParamValue::Number(value)),
        };
        if let Err(e) = result {
            tracing::warn!(layer = %self.name, error = %e, "automation write dropped");
        }
    }

    /// Run the filter chain on the most recent fed frame.
    pub(crate) fn run_filters(&mut self) {
        if self.filters.is_empty() {
            self.filtered = None;
            return;
        }
        if let Some(fed) = self.fed.as_ref() {
            self.filtered = Some(self.filters.run(fed, &self.geo));
        }
    }

    /// Composite this layer onto the output surface with the current blend
    /// mode. Hidden and inactive layers are skipped.
    pub(crate) fn composite_onto(&mut self, surface: &mut FrameBuffer) {
        if self.hidden || !self.is_active() {
            return;
        }
        let frame = if self.filters.is_empty() {
            self.fed.as_ref()
        } else {
            self.filtered.as_ref().or(self.fed.as_ref())
        };
        let Some(frame) = frame else {
            return;
        };
        blit::composite(surface, frame, &self.geo, self.blend, self.opacity);
    }
}

impl Drop for Layer {
    fn drop(&mut self) {
        // Join-before-free: never leak a running worker.
        self.close();
    }
}

fn name_from_descriptor(descriptor: &str) -> String {
    if let Some(hex) = descriptor.strip_prefix("color://") {
        return format!("color-{hex}");
    }
    Path::new(descriptor)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| descriptor.to_string())
}

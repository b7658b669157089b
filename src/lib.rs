//! Mixel is a real-time layer mixing and compositing engine.
//!
//! Independent visual sources ("layers") each run on their own worker
//! thread and are composited into a single output frame at a fixed rate:
//!
//! - Open a [`Layer`] from a source descriptor and add it to a [`Context`]
//! - The context's render loop signals every worker once per frame, waits
//!   up to the frame deadline, and composites what it has; a slow source
//!   shows its previous frame rather than stalling the mix
//! - Per-layer [`Filter`] and automation chains run on every frame before
//!   the blit; layer z order is the context's collection order
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod blit;
/// Scripting-facing named operations and the handle registry.
pub mod bridge;
/// Audio input boundary consumed by automations.
pub mod audio;
/// Orchestrator: layer collection and render loop.
pub mod context;
/// Per-frame buffer transforms.
pub mod filter;
/// Raw frame buffers.
pub mod frame;
/// Layer geometry state.
pub mod geometry;
/// The layer core and its worker.
pub mod layer;
/// Controllable, clamped parameters.
pub mod param;
/// Source plugin contract and reference sources.
pub mod source;
/// Output surface and presentation boundary.
pub mod viewport;

pub use crate::foundation::clock::FrameClock;
pub use crate::foundation::core::{Affine, Canvas, Fps, Point, Rect, Rgb, Rgba8, Vec2};
pub use crate::foundation::error::{MixelError, MixelResult};

pub use crate::animation::{Automation, AutomationKind, Target, Tick};
pub use crate::audio::{AudioCollector, SharedLevel, SilentAudio};
pub use crate::blit::BlendMode;
pub use crate::bridge::{Handle, HandleRegistry};
pub use crate::context::{Context, RenderStats};
pub use crate::filter::{Filter, create_filter};
pub use crate::frame::FrameBuffer;
pub use crate::geometry::Geometry;
pub use crate::layer::{Layer, LayerState, create_layer};
pub use crate::param::{ParamValue, Parameter};
pub use crate::source::{Source, SourceConfig, create_source};
pub use crate::viewport::{CapturePresent, NullPresent, PresentTarget, ViewPort};

use smallvec::SmallVec;

/// Per-frame timing and input sample handed to every automation.
#[derive(Clone, Copy, Debug)]
pub struct Tick {
    /// Nominal frame interval in seconds.
    pub dt_secs: f64,
    /// Monotonic frame counter of the owning context.
    pub frame: u64,
    /// Audio collector level for this frame, `0.0..=1.0`.
    pub audio_level: f32,
}

/// The single field an automation drives.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Target {
    /// A named layer parameter (e.g. `"opacity"`).
    Param(String),
    /// Horizontal position.
    X,
    /// Vertical position.
    Y,
    /// Both zoom axes.
    Zoom,
    /// Rotation angle in degrees.
    Rotation,
}

/// What an automation computes each frame.
///
/// One-shot kinds (`Ramp`, `Slide`) remove themselves from the chain on
/// completion; periodic kinds wrap per their own policy and run until
/// removed externally.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AutomationKind {
    /// Linear ramp over a fixed number of frames; lands exactly on `to`
    /// and finishes.
    Ramp {
        /// Start value.
        from: f64,
        /// End value, reached exactly on the final frame.
        to: f64,
        /// Duration in frames, minimum 1.
        frames: u64,
    },
    /// Sine oscillation around an offset.
    Oscillator {
        /// Peak deviation from `offset`.
        amp: f64,
        /// Oscillations per second.
        freq_hz: f64,
        /// Center value.
        offset: f64,
    },
    /// Triangle wave between two bounds.
    Bounce {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
        /// Sweep speed in value units per second.
        speed: f64,
    },
    /// Move the current value toward a goal at constant speed; finishes on
    /// arrival.
    Slide {
        /// Goal value.
        to: f64,
        /// Speed in value units per second.
        speed: f64,
    },
    /// Follow the audio input level scaled by a gain.
    AudioFollow {
        /// Multiplier applied to the normalized level.
        gain: f64,
    },
}

pub(crate) struct StepOut {
    pub(crate) value: f64,
    pub(crate) finished: bool,
}

/// A time-driven modifier bound to exactly one parameter or geometry
/// field, run once per frame in chain insertion order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Automation {
    target: Target,
    kind: AutomationKind,
    #[serde(skip)]
    elapsed: f64,
    #[serde(skip)]
    steps: u64,
}

impl Automation {
    /// Bind a kind to its target field.
    pub fn new(target: Target, kind: AutomationKind) -> Self {
        Self {
            target,
            kind,
            elapsed: 0.0,
            steps: 0,
        }
    }

    /// The bound target field.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Advance one frame. `current` is the present value of the target
    /// field, used by relative kinds.
    pub(crate) fn step(&mut self, tick: &Tick, current: f64) -> StepOut {
        self.elapsed += tick.dt_secs;
        self.steps += 1;

        match self.kind {
            AutomationKind::Ramp { from, to, frames } => {
                let frames = frames.max(1);
                let n = self.steps.min(frames);
                let t = n as f64 / frames as f64;
                StepOut {
                    value: from + (to - from) * t,
                    finished: self.steps >= frames,
                }
            }
            AutomationKind::Oscillator {
                amp,
                freq_hz,
                offset,
            } => StepOut {
                value: offset + amp * (std::f64::consts::TAU * freq_hz * self.elapsed).sin(),
                finished: false,
            },
            AutomationKind::Bounce { low, high, speed } => {
                let span = (high - low).abs();
                if span == 0.0 || speed <= 0.0 {
                    return StepOut {
                        value: low,
                        finished: false,
                    };
                }
                let pos = (speed * self.elapsed) % (2.0 * span);
                let tri = if pos < span { pos } else { 2.0 * span - pos };
                StepOut {
                    value: low.min(high) + tri,
                    finished: false,
                }
            }
            AutomationKind::Slide { to, speed } => {
                let max_step = speed.abs() * tick.dt_secs;
                let delta = to - current;
                if delta.abs() <= max_step {
                    StepOut {
                        value: to,
                        finished: true,
                    }
                } else {
                    StepOut {
                        value: current + max_step.copysign(delta),
                        finished: false,
                    }
                }
            }
            AutomationKind::AudioFollow { gain } => StepOut {
                value: f64::from(tick.audio_level) * gain,
                finished: false,
            },
        }
    }
}

pub(crate) type AutomationChain = SmallVec<[Automation; 4]>;

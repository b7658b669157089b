use crate::foundation::core::Fps;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MEASURE_WINDOW: usize = 32;

/// Paces the render loop toward a target frame rate and measures the rate
/// actually achieved.
///
/// The clock is drift-free: each frame's deadline advances by the nominal
/// frame duration from the previous deadline, not from "now", so small
/// per-frame jitter does not accumulate. If the loop falls more than one
/// whole frame behind, the schedule resynchronizes instead of trying to
/// catch up with a burst.
#[derive(Debug)]
pub struct FrameClock {
    fps: Fps,
    budget: Duration,
    deadline: Instant,
    completed: VecDeque<Instant>,
}

impl FrameClock {
    /// Create a clock whose first frame is due one frame interval from now.
    pub fn new(fps: Fps) -> Self {
        let budget = fps.frame_duration();
        Self {
            fps,
            budget,
            deadline: Instant::now() + budget,
            completed: VecDeque::with_capacity(MEASURE_WINDOW),
        }
    }

    /// The configured target rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Nominal duration of one frame.
    pub fn frame_budget(&self) -> Duration {
        self.budget
    }

    /// Nominal per-frame interval in seconds, the time step handed to
    /// automations.
    pub fn delta_secs(&self) -> f64 {
        self.fps.frame_duration_secs()
    }

    /// Deadline of the frame currently in progress. Workers that have not
    /// reported by this instant composite with their previous frame.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Restart the schedule so the next frame is due one interval from
    /// now. Used when the loop resumes after setup or a long pause.
    pub fn restart(&mut self) {
        self.deadline = Instant::now() + self.budget;
    }

    /// Sleep out the remainder of the current frame and advance the
    /// schedule. Call once per frame, after presenting.
    pub fn wait_frame(&mut self) {
        let now = Instant::now();
        if now < self.deadline {
            std::thread::sleep(self.deadline - now);
        }

        let done = Instant::now();
        if self.completed.len() == MEASURE_WINDOW {
            self.completed.pop_front();
        }
        self.completed.push_back(done);

        self.deadline += self.budget;
        if done > self.deadline + self.budget {
            // More than a frame behind: resync rather than burst.
            self.deadline = done + self.budget;
        }
    }

    /// Frame rate achieved over the recent window, or `None` until at
    /// least two frames have completed.
    pub fn measured_fps(&self) -> Option<f64> {
        let first = self.completed.front()?;
        let last = self.completed.back()?;
        if self.completed.len() < 2 {
            return None;
        }
        let span = last.duration_since(*first).as_secs_f64();
        if span <= 0.0 {
            return None;
        }
        Some((self.completed.len() - 1) as f64 / span)
    }
}

use crate::foundation::error::{MixelError, MixelResult};
use crate::frame::FrameBuffer;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, select, unbounded};
use std::thread::JoinHandle;
use std::time::Instant;

/// Result of polling a worker for its cycle output.
pub(crate) enum WorkerPoll {
    /// The cycle finished; `None` means the source fed nothing.
    Ready(Option<FrameBuffer>),
    /// The cycle is still running.
    Pending,
    /// The worker thread is gone (panicked source).
    Gone,
}

/// One producer thread driven cycle-by-cycle from the render loop.
///
/// The loop signals "go", the worker runs its per-cycle closure once and
/// reports the result on the "done" channel. At most one cycle is ever in
/// flight. A dedicated quit channel, checked before the go signal, wakes a
/// parked worker unconditionally so `stop` always terminates it without
/// relying on another go cycle.
pub(crate) struct FeedWorker {
    go_tx: Sender<()>,
    done_rx: Receiver<Option<FrameBuffer>>,
    quit_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl FeedWorker {
    /// Spawn the worker thread around the per-cycle closure. The closure's
    /// captured state (including the source) drops on the worker thread
    /// when it exits, before `stop`'s join returns.
    pub(crate) fn spawn(
        name: &str,
        mut cycle: impl FnMut() -> Option<FrameBuffer> + Send + 'static,
    ) -> MixelResult<Self> {
        let (go_tx, go_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<Option<FrameBuffer>>(1);
        let (quit_tx, quit_rx) = unbounded::<()>();

        let thread_name = format!("layer-{name}");
        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                loop {
                    // Quit wins over a queued go signal.
                    if quit_rx.try_recv().is_ok() {
                        break;
                    }
                    select! {
                        recv(quit_rx) -> _ => break,
                        recv(go_rx) -> msg => {
                            if msg.is_err() {
                                break;
                            }
                            let out = cycle();
                            if done_tx.send(out).is_err() {
                                break;
                            }
                        }
                    }
                }
            })
            .map_err(|e| MixelError::init(format!("cannot spawn layer worker: {e}")))?;

        Ok(Self {
            go_tx,
            done_rx,
            quit_tx,
            handle: Some(handle),
            in_flight: false,
        })
    }

    /// Whether a cycle is currently in flight.
    pub(crate) fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Signal the worker to run one cycle. Returns false when a cycle is
    /// already in flight or the worker is stopped.
    pub(crate) fn signal_go(&mut self) -> bool {
        if self.in_flight || self.handle.is_none() {
            return false;
        }
        match self.go_tx.try_send(()) {
            Ok(()) => {
                self.in_flight = true;
                true
            }
            Err(_) => false,
        }
    }

    /// Non-blocking poll for the in-flight cycle.
    pub(crate) fn try_collect(&mut self) -> WorkerPoll {
        if !self.in_flight {
            return WorkerPoll::Pending;
        }
        match self.done_rx.try_recv() {
            Ok(out) => {
                self.in_flight = false;
                WorkerPoll::Ready(out)
            }
            Err(TryRecvError::Empty) => WorkerPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                WorkerPoll::Gone
            }
        }
    }

    /// Wait for the in-flight cycle until `deadline`. `Pending` after the
    /// deadline is the caller's cue to composite a stale frame.
    pub(crate) fn collect_deadline(&mut self, deadline: Instant) -> WorkerPoll {
        if !self.in_flight {
            return WorkerPoll::Pending;
        }
        match self.done_rx.recv_deadline(deadline) {
            Ok(out) => {
                self.in_flight = false;
                WorkerPoll::Ready(out)
            }
            Err(RecvTimeoutError::Timeout) => WorkerPoll::Pending,
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = false;
                WorkerPoll::Gone
            }
        }
    }

    /// Wake and join the worker. Idempotent; safe while the worker is
    /// parked on "go" or mid-cycle inside a blocking feed.
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.quit_tx.send(());
        if handle.join().is_err() {
            tracing::error!("layer worker panicked during shutdown");
        }
        self.in_flight = false;
    }
}

impl Drop for FeedWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

//! The detection pipeline: a dedicated thread with exclusive timing access.
//!
//! Decoding measures pulses in the hundreds of microseconds with ±30%
//! windows, so the decode loop must never wait on network I/O,
//! serialization, persistence, or animation math. It runs on its own OS
//! thread (optionally at maximum scheduling priority) and shares exactly
//! three things with the control side:
//!
//! - the race-active flag and race-start time ([`SharedRace`], written by
//!   the controller, read here),
//! - the bounded handoff channel (produced here with a non-blocking push,
//!   consumed by the gate driver),
//! - nothing else. The per-racer debounce table is owned by this thread
//!   outright, so control-side jitter can never skew it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::line::IrReceiveLine;
use crate::protocol::IrDetector;
use crate::types::{DetectionEvent, RACER_COUNT, RacerId};

/// Repeat detections for one racer inside this window are multipath or
/// jitter re-triggers, not genuine second crossings.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Handoff channel capacity. Small on purpose: during saturation the newest
/// event is dropped rather than letting the queue grow or the producer
/// block.
pub const HANDOFF_CAPACITY: usize = 10;

/// Idle yield between decode attempts while no race is active. Keeps the
/// host scheduler (and any watchdog) fed without ever interrupting a
/// measurement; the sleep sits strictly between decode calls.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Scalars shared between the control loop and the detection thread.
///
/// The controller writes, the detection thread reads. The start time is
/// microseconds on a shared monotonic epoch; a change of start time is also
/// the detection thread's signal to reset its debounce table.
#[derive(Debug)]
pub struct SharedRace {
    epoch: Instant,
    active: AtomicBool,
    start_micros: AtomicU64,
}

impl SharedRace {
    pub fn new() -> Self {
        Self { epoch: Instant::now(), active: AtomicBool::new(false), start_micros: AtomicU64::new(0) }
    }

    /// Mark a race as started now. Returns the start time on the shared
    /// epoch.
    pub fn begin_race(&self) -> Duration {
        let start = self.now_micros();
        self.start_micros.store(start, Ordering::Release);
        self.active.store(true, Ordering::Release);
        Duration::from_micros(start)
    }

    /// Flip the active flag off. The detection thread observes this before
    /// its next decode attempt; any in-flight decode finishes or times out
    /// on its own.
    pub fn end_race(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn start_micros(&self) -> u64 {
        self.start_micros.load(Ordering::Acquire)
    }

    /// Microseconds elapsed on the shared epoch.
    pub fn now_micros(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

impl Default for SharedRace {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-racer debounce, owned by the detection thread.
#[derive(Debug)]
struct DebounceGate {
    window: Duration,
    last_accept: [Option<Instant>; RACER_COUNT],
}

impl DebounceGate {
    fn new(window: Duration) -> Self {
        Self { window, last_accept: [None; RACER_COUNT] }
    }

    /// Accept or reject a detection at `now`. Accepting updates the racer's
    /// last-accepted time, which is monotonically non-decreasing for the
    /// life of a race.
    fn accept(&mut self, racer: RacerId, now: Instant) -> bool {
        if let Some(previous) = self.last_accept[racer.index()]
            && now.duration_since(previous) < self.window
        {
            return false;
        }
        self.last_accept[racer.index()] = Some(now);
        true
    }

    fn reset(&mut self) {
        self.last_accept = [None; RACER_COUNT];
    }
}

/// Producer half of the bounded handoff channel.
///
/// The push never blocks: a full channel drops the newest event and bumps
/// the saturation counter, which the gate handle exposes as a soft anomaly
/// (the consumer is falling behind).
#[derive(Debug, Clone)]
pub struct HandoffSender {
    tx: mpsc::Sender<DetectionEvent>,
    dropped: Arc<AtomicU64>,
}

impl HandoffSender {
    fn push(&self, event: DetectionEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                trace!(racer = %event.racer, timestamp = ?event.timestamp, "event handed off");
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    racer = %event.racer,
                    dropped_total = total,
                    "handoff channel full, dropping newest event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("handoff consumer gone, discarding event");
            }
        }
    }
}

/// Create the bounded handoff channel plus its saturation counter.
pub fn handoff_channel() -> (HandoffSender, mpsc::Receiver<DetectionEvent>, Arc<AtomicU64>) {
    let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));
    (HandoffSender { tx, dropped: Arc::clone(&dropped) }, rx, dropped)
}

/// Handle to the running detection thread.
pub struct DetectionPipeline {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl DetectionPipeline {
    /// Spawn the detection loop on a dedicated thread.
    ///
    /// With the `realtime` feature the thread requests maximum scheduling
    /// priority; failure to get it is logged and otherwise ignored. The
    /// gate still works, with wider effective jitter under host load.
    pub fn spawn<L>(line: L, shared: Arc<SharedRace>, handoff: HandoffSender) -> Self
    where
        L: IrReceiveLine + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let handle = std::thread::Builder::new()
            .name("lightgate-detect".into())
            .spawn(move || run_detection_loop(line, shared, handoff, thread_shutdown))
            .expect("failed to spawn detection thread");

        Self { handle, shutdown }
    }

    /// Request shutdown without waiting. The loop observes the flag before
    /// its next decode attempt.
    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Request shutdown and join the thread. Worst-case latency is bounded
    /// by the protocol's own timeouts (one sync acquisition window).
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Release);
        if self.handle.join().is_err() {
            warn!("detection thread panicked during shutdown");
        }
    }
}

fn run_detection_loop<L: IrReceiveLine>(
    line: L,
    shared: Arc<SharedRace>,
    handoff: HandoffSender,
    shutdown: Arc<AtomicBool>,
) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::{ThreadPriority, set_current_thread_priority};

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(()) => info!("detection thread priority set to max"),
            Err(e) => warn!(
                "failed to raise detection thread priority: {:?}. \
                 On Linux this needs CAP_SYS_NICE; continuing at normal priority.",
                e
            ),
        }
    }

    let mut detector = IrDetector::new(line);
    let mut debounce = DebounceGate::new(DEBOUNCE_WINDOW);
    let mut observed_start = shared.start_micros();

    info!("detection thread started");

    while !shutdown.load(Ordering::Acquire) {
        if !shared.is_active() {
            // Yield between decode attempts only, never inside one.
            std::thread::sleep(IDLE_POLL);
            continue;
        }

        let start_micros = shared.start_micros();
        if start_micros != observed_start {
            debounce.reset();
            observed_start = start_micros;
            debug!("race start observed, debounce table reset");
        }

        let Some(racer) = detector.decode() else {
            continue;
        };

        if !debounce.accept(racer, Instant::now()) {
            trace!(%racer, "detection inside debounce window, discarded");
            continue;
        }

        let timestamp = Duration::from_micros(shared.now_micros().saturating_sub(start_micros));
        handoff.push(DetectionEvent { racer, timestamp });
    }

    info!("detection thread stopped");
}

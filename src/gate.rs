//! Gate assembly: wiring the detection thread to the control side.
//!
//! [`Lightgate::open`] spawns two execution contexts and returns a
//! [`RaceGate`] handle:
//!
//! - the detection thread ([`DetectionPipeline`]), hard-realtime, owning
//!   the IR line exclusively;
//! - the gate driver, a tokio task that consumes the handoff channel,
//!   applies events to the [`RaceController`], ticks the indicator
//!   animator every 20 ms, and fans accepted crossings out to subscribers
//!   for asynchronous logging.
//!
//! Every control-plane method on the handle is a synchronous read or write
//! of controller-owned state; none of them can touch detection-thread
//! state, so a slow dashboard can never cost a crossing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::audio::{
    CROSSING_TONE, CUE_TONE, START_TONE_HZ, STOP_TONE_HZ, ToneSink, crossing_tone_hz,
};
use crate::controller::{Crossing, FastestLap, RaceController, RaceSnapshot};
use crate::error::Result;
use crate::indicator::{GateStatus, IndicatorAnimator, PixelStrip};
use crate::line::IrReceiveLine;
use crate::pipeline::{DetectionPipeline, SharedRace, handoff_channel};
use crate::profiles::ProfileStore;
use crate::types::{DetectionEvent, LapRecord, RaceMode, RaceResult, RacerId, RacerProfile};

/// The driver renders one animator frame per tick.
pub const ANIMATION_TICK: Duration = Duration::from_millis(20);

/// Capacity of the crossing fan-out; subscribers that lag this far behind
/// miss crossings rather than backpressuring the driver.
const CROSSING_FANOUT_CAPACITY: usize = 32;

/// Unified entry point for assembling a race gate.
///
/// # Example
///
/// ```rust,no_run
/// use lightgate::{Lightgate, line::SimulatedLine};
/// use lightgate::audio::NullToneSink;
/// use lightgate::indicator::NullStrip;
/// use lightgate::profiles::MemoryProfileStore;
///
/// #[tokio::main]
/// async fn main() {
///     let gate = Lightgate::open(
///         SimulatedLine::new(),
///         Box::new(MemoryProfileStore::new()),
///         Box::new(NullStrip::default()),
///         Box::new(NullToneSink),
///     )
///     .await;
///
///     gate.start_race();
///     // ... race runs, beacons cross ...
///     gate.stop_race();
/// }
/// ```
pub struct Lightgate;

impl Lightgate {
    /// Spawn the detection thread and gate driver over the given hardware.
    ///
    /// Must be called from within a tokio runtime. Resource faults (a
    /// corrupt profile file, storage that cannot be read) never fail the
    /// open: the gate boots degraded (factory profiles,
    /// [`GateStatus::Degraded`] on the indicator) and races run normally.
    pub async fn open<L>(
        line: L,
        store: Box<dyn ProfileStore>,
        strip: Box<dyn PixelStrip>,
        audio: Box<dyn ToneSink>,
    ) -> RaceGate
    where
        L: IrReceiveLine + Send + 'static,
    {
        let shared = Arc::new(SharedRace::new());
        let controller =
            Arc::new(Mutex::new(RaceController::new(store, Arc::clone(&shared))));

        let boot_status = if lock(&controller).is_degraded() {
            GateStatus::Degraded
        } else {
            GateStatus::Idle
        };
        let animator = Arc::new(Mutex::new(IndicatorAnimator::new()));
        lock(&animator).set_status(boot_status);

        let audio = Arc::new(Mutex::new(audio));
        let (crossings, _) = broadcast::channel(CROSSING_FANOUT_CAPACITY);
        let cancel = CancellationToken::new();

        let (handoff, events, dropped) = handoff_channel();
        let pipeline = DetectionPipeline::spawn(line, Arc::clone(&shared), handoff);

        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(drive(
            events,
            Arc::clone(&controller),
            Arc::clone(&animator),
            Arc::clone(&audio),
            strip,
            crossings.clone(),
            cancel.clone(),
            ready_tx,
        ));

        // The driver signals once its tick loop is live, so a crossing that
        // arrives immediately after open cannot beat the consumer.
        let _ = ready_rx.await;

        info!(status = ?boot_status, "gate opened");

        RaceGate {
            controller,
            animator,
            audio,
            shared,
            dropped,
            crossings,
            cancel,
            pipeline: Some(pipeline),
        }
    }
}

/// Handle to a running gate.
///
/// Dropping the handle requests shutdown of both execution contexts;
/// [`RaceGate::shutdown`] additionally joins the detection thread.
pub struct RaceGate {
    controller: Arc<Mutex<RaceController>>,
    animator: Arc<Mutex<IndicatorAnimator>>,
    audio: Arc<Mutex<Box<dyn ToneSink>>>,
    shared: Arc<SharedRace>,
    dropped: Arc<AtomicU64>,
    crossings: broadcast::Sender<Crossing>,
    cancel: CancellationToken,
    pipeline: Option<DetectionPipeline>,
}

impl RaceGate {
    /// Start a race under the currently selected mode. Restarting while
    /// active is allowed and starts the session over.
    pub fn start_race(&self) {
        lock(&self.controller).start_race();
        lock(&self.animator).set_status(GateStatus::Detecting);
        lock(&self.audio).play_tone(START_TONE_HZ, CUE_TONE);
    }

    /// Stop the race, freezing recorded data.
    pub fn stop_race(&self) {
        let degraded = {
            let mut controller = lock(&self.controller);
            controller.stop_race();
            controller.is_degraded()
        };
        let status = if degraded { GateStatus::Degraded } else { GateStatus::Idle };
        lock(&self.animator).set_status(status);
        lock(&self.audio).play_tone(STOP_TONE_HZ, CUE_TONE);
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Whether the gate is running with a failed resource (see
    /// [`Lightgate::open`]).
    pub fn is_degraded(&self) -> bool {
        lock(&self.controller).is_degraded()
    }

    pub fn mode(&self) -> RaceMode {
        lock(&self.controller).mode()
    }

    /// Select the mode for the next race; rejected while one is active.
    pub fn set_mode(&self, mode: RaceMode) -> Result<()> {
        lock(&self.controller).set_mode(mode)
    }

    pub fn racer_name(&self, racer: RacerId) -> String {
        lock(&self.controller).racer_name(racer).to_string()
    }

    /// Rename a racer (non-empty, ≤ 30 bytes) and persist the profiles.
    pub fn set_racer_name(&self, racer: RacerId, name: &str) -> Result<()> {
        lock(&self.controller).set_racer_name(racer, name)
    }

    pub fn results(&self) -> Vec<RaceResult> {
        lock(&self.controller).results().to_vec()
    }

    pub fn laps(&self) -> Vec<LapRecord> {
        lock(&self.controller).laps().to_vec()
    }

    pub fn fastest_lap(&self) -> Option<FastestLap> {
        lock(&self.controller).fastest_lap()
    }

    pub fn profiles(&self) -> Vec<RacerProfile> {
        lock(&self.controller).profiles().to_vec()
    }

    /// A serializable point-in-time view of the whole session.
    pub fn snapshot(&self) -> RaceSnapshot {
        lock(&self.controller).snapshot()
    }

    /// Events dropped at the handoff channel because the consumer fell
    /// behind. Non-zero values are a soft anomaly worth surfacing.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Subscribe to accepted crossings as a stream.
    ///
    /// This is the asynchronous logging hook: each subscriber gets every
    /// crossing from subscription time on, without ever backpressuring the
    /// race path. Slow subscribers skip missed crossings.
    pub fn subscribe_crossings(&self) -> impl Stream<Item = Crossing> + Send + 'static {
        BroadcastStream::new(self.crossings.subscribe())
            .filter_map(|crossing| async move { crossing.ok() })
    }

    /// Shut down the driver task and join the detection thread. Worst-case
    /// latency is one protocol timeout.
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
        debug!("gate shut down");
    }
}

impl Drop for RaceGate {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(pipeline) = self.pipeline.take() {
            // Request only; joining in Drop could stall an executor thread
            // for a protocol timeout.
            pipeline.request_stop();
        }
    }
}

/// The gate driver loop: apply events, tick the animator, fan out
/// crossings.
#[allow(clippy::too_many_arguments)]
async fn drive(
    mut events: mpsc::Receiver<DetectionEvent>,
    controller: Arc<Mutex<RaceController>>,
    animator: Arc<Mutex<IndicatorAnimator>>,
    audio: Arc<Mutex<Box<dyn ToneSink>>>,
    mut strip: Box<dyn PixelStrip>,
    crossings: broadcast::Sender<Crossing>,
    cancel: CancellationToken,
    ready: oneshot::Sender<()>,
) {
    let mut ticker = tokio::time::interval(ANIMATION_TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("gate driver started");
    let _ = ready.send(());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("gate driver cancelled");
                break;
            }
            event = events.recv() => {
                match event {
                    Some(event) => {
                        let outcome = lock(&controller).handle_event(event);
                        if let Some(crossing) = outcome {
                            lock(&animator).trigger_pulse(crossing.racer, Instant::now());
                            lock(&audio)
                                .play_tone(crossing_tone_hz(crossing.racer), CROSSING_TONE);
                            // Fan out for asynchronous logging; nobody
                            // listening is fine.
                            let _ = crossings.send(crossing);
                        }
                    }
                    None => {
                        debug!("handoff channel closed, gate driver exiting");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                lock(&animator).render(Instant::now(), strip.as_mut());
            }
        }
    }

    info!("gate driver stopped");
}

/// Lock a control-side mutex, riding through poisoning: a panicked
/// control-plane call must not take the race down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

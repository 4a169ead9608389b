//! Indicator ring animation.
//!
//! The animator is pure color math driven by elapsed time: the gate driver
//! calls [`IndicatorAnimator::render`] once per control-loop pass and the
//! animator writes that instant's colors into a [`PixelStrip`]. It owns no
//! timer and never sleeps, so a stalled strip or a slow pass can delay
//! frames but never block anything else.
//!
//! At most one racer pulse is active at a time. Triggering a new pulse
//! while one is running replaces it immediately: last trigger wins, no
//! queueing or blending.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::types::{RacerId, Rgb, racer_color};

/// Total length of a racer pulse effect.
pub const PULSE_DURATION: Duration = Duration::from_millis(500);

/// Period of the triangular breathing ramp (0→1 over the first half,
/// 1→0 over the second).
pub const BREATH_PERIOD: Duration = Duration::from_millis(250);

/// The rotation offset advances one pixel position per step.
pub const ROTATE_STEP: Duration = Duration::from_millis(20);

/// Pixel output hardware: set colors, then commit the buffer.
///
/// Implementations are external (WS2812 drivers and the like); the
/// in-crate [`NullStrip`] keeps the gate running with no display attached.
pub trait PixelStrip: Send {
    /// Number of addressable pixels.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage a color; visible after the next [`commit`](PixelStrip::commit).
    fn set_pixel(&mut self, index: usize, color: Rgb);

    /// Latch the staged colors to the hardware.
    fn commit(&mut self);
}

/// A strip with no hardware behind it. Degraded-boot fallback.
#[derive(Debug, Clone, Copy)]
pub struct NullStrip {
    pixels: usize,
}

impl NullStrip {
    pub fn new(pixels: usize) -> Self {
        Self { pixels }
    }
}

impl Default for NullStrip {
    fn default() -> Self {
        Self::new(16)
    }
}

impl PixelStrip for NullStrip {
    fn len(&self) -> usize {
        self.pixels
    }

    fn set_pixel(&mut self, _index: usize, _color: Rgb) {}

    fn commit(&mut self) {}
}

/// Steady gate status shown when no pulse is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateStatus {
    /// Powered, no race running. Dim blue.
    #[default]
    Idle,
    /// Race active, watching for beacons. Dim green.
    Detecting,
    /// Booted with a failed resource (storage, display). Dim red.
    Degraded,
}

impl GateStatus {
    pub fn color(self) -> Rgb {
        match self {
            GateStatus::Idle => Rgb::new(0, 50, 100),
            GateStatus::Detecting => Rgb::new(0, 100, 0),
            GateStatus::Degraded => Rgb::new(100, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pulse {
    racer: RacerId,
    started: Instant,
}

/// Time-phase-driven indicator state.
#[derive(Debug, Default)]
pub struct IndicatorAnimator {
    status: GateStatus,
    pulse: Option<Pulse>,
}

impl IndicatorAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> GateStatus {
        self.status
    }

    /// Change the steady status color. Does not interrupt an active pulse;
    /// the new status shows once the pulse expires.
    pub fn set_status(&mut self, status: GateStatus) {
        self.status = status;
    }

    /// Start (or restart) the pulse effect for a racer.
    pub fn trigger_pulse(&mut self, racer: RacerId, now: Instant) {
        trace!(%racer, replaced = self.pulse.is_some(), "indicator pulse triggered");
        self.pulse = Some(Pulse { racer, started: now });
    }

    /// The racer whose pulse is currently active at `now`, if any.
    pub fn active_pulse(&self, now: Instant) -> Option<RacerId> {
        self.pulse
            .filter(|pulse| now.duration_since(pulse.started) < PULSE_DURATION)
            .map(|pulse| pulse.racer)
    }

    /// Write this instant's colors into the strip and commit.
    pub fn render(&mut self, now: Instant, strip: &mut dyn PixelStrip) {
        if let Some(pulse) = self.pulse {
            let elapsed = now.duration_since(pulse.started);
            if elapsed < PULSE_DURATION {
                self.render_pulse(pulse.racer, elapsed, strip);
                return;
            }
            // Pulse finished; fall back to the steady status.
            self.pulse = None;
        }

        let color = self.status.color();
        for index in 0..strip.len() {
            strip.set_pixel(index, color);
        }
        strip.commit();
    }

    fn render_pulse(&self, racer: RacerId, elapsed: Duration, strip: &mut dyn PixelStrip) {
        let color = racer_color(racer).scaled(breathing_intensity(elapsed));
        let offset = rotation_offset(elapsed, strip.len());
        let len = strip.len();
        for index in 0..len {
            strip.set_pixel((index + offset) % len, color);
        }
        strip.commit();
    }
}

/// Triangular breathing intensity for a pulse at `elapsed`: a linear ramp
/// 0→1 over the first half of [`BREATH_PERIOD`], then 1→0 over the second.
pub fn breathing_intensity(elapsed: Duration) -> f32 {
    let period_us = BREATH_PERIOD.as_micros() as u64;
    let phase = (elapsed.as_micros() as u64 % period_us) as f32 / period_us as f32;
    if phase < 0.5 { phase * 2.0 } else { (1.0 - phase) * 2.0 }
}

/// Rotation offset for a pulse at `elapsed`: advances one position per
/// [`ROTATE_STEP`], wrapping around the strip.
pub fn rotation_offset(elapsed: Duration, pixel_count: usize) -> usize {
    if pixel_count == 0 {
        return 0;
    }
    (elapsed.as_millis() as u64 / ROTATE_STEP.as_millis() as u64) as usize % pixel_count
}

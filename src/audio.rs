//! Audio feedback: fire-and-forget tones.
//!
//! The gate only ever *requests* tones; the sink (an I2S amp, a piezo, a
//! desktop mixer) is an external collaborator behind [`ToneSink`] and must
//! be non-blocking or internally time-bounded. Each racer gets an audibly
//! distinct crossing pitch so spectators can follow a race by ear.

use std::time::Duration;

use crate::types::RacerId;

/// Base frequency for crossing tones, in Hz.
pub const CROSSING_TONE_BASE_HZ: u32 = 800;

/// Per-racer pitch step above the base, in Hz.
pub const CROSSING_TONE_STEP_HZ: u32 = 100;

/// Crossing tone length.
pub const CROSSING_TONE: Duration = Duration::from_millis(150);

/// Race-start cue: 1 kHz.
pub const START_TONE_HZ: u32 = 1_000;

/// Race-stop cue: 500 Hz.
pub const STOP_TONE_HZ: u32 = 500;

/// Start/stop cue length.
pub const CUE_TONE: Duration = Duration::from_millis(200);

/// The crossing pitch assigned to a racer.
pub fn crossing_tone_hz(racer: RacerId) -> u32 {
    CROSSING_TONE_BASE_HZ + u32::from(racer.value()) * CROSSING_TONE_STEP_HZ
}

/// Best-effort tone output.
///
/// Calls are fire-and-forget: implementations must not block the control
/// loop, and failures are theirs to swallow. A dead speaker never affects
/// a race.
pub trait ToneSink: Send {
    fn play_tone(&mut self, frequency_hz: u32, duration: Duration);
}

/// A sink that discards every tone. Used when no audio hardware is wired
/// up, and as the degraded fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullToneSink;

impl ToneSink for NullToneSink {
    fn play_tone(&mut self, _frequency_hz: u32, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_tones_are_distinct_per_racer() {
        let tones: Vec<_> = RacerId::ALL.iter().map(|&id| crossing_tone_hz(id)).collect();
        for (index, tone) in tones.iter().enumerate() {
            assert_eq!(*tone, 800 + 100 * index as u32);
        }
    }
}

//! Test utilities: canned beacon waveforms and tracing setup.
//!
//! Shared between the crate's unit tests and the criterion benches (which
//! build the library with the `benchmark` feature instead of `cfg(test)`).

#![cfg(any(test, feature = "benchmark"))]

use crate::line::SimulatedLine;
use crate::protocol::BeaconTransmitter;
use crate::types::RacerId;

/// A clean, noiseless transmission: `frames` back-to-back frames of one
/// beacon, then permanent silence.
pub fn beacon_waveform(id: RacerId, frames: usize) -> SimulatedLine {
    let mut beacon = BeaconTransmitter::new(SimulatedLine::new());
    beacon.transmit_frames(id, frames);
    beacon.into_line()
}

/// Sequential beacon blocks: each `(id, frames)` entry transmitted in
/// order, separated by a short dark stretch, as when racers cross the gate
/// one after another.
pub fn sequential_waveform(blocks: &[(RacerId, usize)]) -> SimulatedLine {
    let mut beacon = BeaconTransmitter::new(SimulatedLine::new());
    for &(id, frames) in blocks {
        beacon.transmit_frames(id, frames);
        let mut line = beacon.into_line();
        line.push_idle(5_000);
        beacon = BeaconTransmitter::new(line);
    }
    beacon.into_line()
}

/// A waveform that opens with garbage (an overlong burst) before the real
/// transmission, to exercise resynchronization.
pub fn corrupted_prefix_waveform(id: RacerId, frames: usize) -> SimulatedLine {
    let mut line = SimulatedLine::new();
    line.push_active(1_500);
    line.push_idle(500);
    let mut beacon = BeaconTransmitter::new(line);
    beacon.transmit_frames(id, frames);
    beacon.into_line()
}

/// Install a fmt subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::IrDetector;

    #[test]
    fn canned_waveforms_decode() {
        let id = RacerId::new(3).unwrap();
        let mut detector = IrDetector::new(beacon_waveform(id, 2));
        assert_eq!(detector.decode(), Some(id));

        let mut detector = IrDetector::new(corrupted_prefix_waveform(id, 2));
        assert_eq!(detector.decode(), None);
        assert_eq!(detector.decode(), Some(id));
    }
}

//! Wire-format timing constants and tolerance windows.
//!
//! These values are bit-exact contracts shared with the beacon firmware;
//! changing any of them is a protocol break. All durations are in
//! microseconds of carrier-on ("burst") or carrier-off ("gap") time.

/// Modulation carrier frequency the receiver demodulates, in Hz.
pub const CARRIER_HZ: u32 = 38_000;

/// Nominal sync burst length.
pub const SYNC_BURST_US: u64 = 270;

/// Nominal sync gap length. Unique to sync: no data symbol produces a gap
/// this long, which is what makes mid-stream resynchronization possible.
pub const SYNC_GAP_US: u64 = 900;

/// Nominal data-bit burst length.
pub const BIT_BURST_US: u64 = 270;

/// Nominal gap encoding a 0 bit.
pub const SHORT_GAP_US: u64 = 300;

/// Nominal gap encoding a 1 bit.
pub const LONG_GAP_US: u64 = 600;

/// Payload width: racer ids are exactly three bits, MSB first.
pub const PAYLOAD_BITS: u32 = 3;

/// Per-measurement timeout for a single burst or gap. A pulse that outlives
/// this is "no signal", the normal steady state between transmissions.
pub const PULSE_TIMEOUT_US: u64 = 2_000;

/// How long `decode` waits for the line to go active before reporting no
/// detection.
pub const SYNC_ACQUIRE_TIMEOUT_US: u64 = 100_000;

/// Decoder tolerance applied around each nominal duration.
pub const TOLERANCE_PERCENT: u64 = 30;

/// An inclusive microsecond acceptance window for one symbol class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseWindow {
    pub min_us: u64,
    pub max_us: u64,
}

impl PulseWindow {
    /// The ±[`TOLERANCE_PERCENT`] window around a nominal duration.
    pub const fn around(nominal_us: u64) -> Self {
        let slack = nominal_us * TOLERANCE_PERCENT / 100;
        Self { min_us: nominal_us - slack, max_us: nominal_us + slack }
    }

    pub const fn contains(self, micros: u64) -> bool {
        micros >= self.min_us && micros <= self.max_us
    }
}

/// Acceptance window for the sync burst.
pub const SYNC_BURST: PulseWindow = PulseWindow::around(SYNC_BURST_US);

/// Acceptance window for the sync gap.
pub const SYNC_GAP: PulseWindow = PulseWindow::around(SYNC_GAP_US);

/// Acceptance window for a data-bit burst.
pub const BIT_BURST: PulseWindow = PulseWindow::around(BIT_BURST_US);

/// Acceptance window for a 0-bit gap.
pub const SHORT_GAP: PulseWindow = PulseWindow::around(SHORT_GAP_US);

/// Acceptance window for a 1-bit gap.
pub const LONG_GAP: PulseWindow = PulseWindow::around(LONG_GAP_US);

/// Classify a data-bit gap duration.
///
/// Returns the bit value, or `None` for anything outside both windows,
/// including the ambiguous band strictly between them, which is rejected
/// rather than guessed.
pub const fn classify_bit_gap(micros: u64) -> Option<u8> {
    if SHORT_GAP.contains(micros) {
        Some(0)
    } else if LONG_GAP.contains(micros) {
        Some(1)
    } else {
        None
    }
}

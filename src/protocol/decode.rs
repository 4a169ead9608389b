//! Gate-side frame decoder.

use tracing::trace;

use crate::line::IrReceiveLine;
use crate::types::RacerId;

use super::timing::{
    BIT_BURST, PAYLOAD_BITS, PULSE_TIMEOUT_US, SYNC_ACQUIRE_TIMEOUT_US, SYNC_BURST, SYNC_GAP,
    classify_bit_gap,
};

/// Decodes racer-id frames from a demodulated IR receive line.
///
/// The decoder is stateless between calls: any measurement that falls
/// outside its window aborts the current frame and the next [`decode`]
/// re-attempts sync acquisition from scratch. Against a continuous,
/// unframed bitstream this makes the decoder self-resynchronizing: one
/// garbled frame costs at most itself plus the frame it bled into.
///
/// [`decode`]: IrDetector::decode
pub struct IrDetector<L: IrReceiveLine> {
    line: L,
}

impl<L: IrReceiveLine> IrDetector<L> {
    pub fn new(line: L) -> Self {
        Self { line }
    }

    /// Attempt to decode one frame.
    ///
    /// Returns `None` for every non-frame outcome: no carrier within the
    /// acquisition window (the normal steady state), a pulse timeout, a
    /// duration outside its tolerance window, or an ambiguous bit gap.
    /// None of these are errors and none leave residual state.
    pub fn decode(&mut self) -> Option<RacerId> {
        if !self.acquire_sync() {
            return None;
        }

        let mut value = 0u8;
        for _ in 0..PAYLOAD_BITS {
            value = (value << 1) | self.read_bit()?;
        }

        // Three bits cannot exceed the id range.
        let id = RacerId::new(value).expect("3-bit payload is always a valid racer id");
        trace!(racer = %id, "decoded beacon frame");
        Some(id)
    }

    /// Release the underlying line.
    pub fn into_line(self) -> L {
        self.line
    }

    /// Wait for carrier, then validate the sync burst + sync gap pair.
    fn acquire_sync(&mut self) -> bool {
        let start = self.line.now_micros();
        while !self.line.is_active() {
            if self.line.now_micros().saturating_sub(start) > SYNC_ACQUIRE_TIMEOUT_US {
                return false;
            }
        }

        let Some(burst) = self.measure_while(true) else {
            return false;
        };
        if !SYNC_BURST.contains(burst) {
            return false;
        }

        let Some(gap) = self.measure_while(false) else {
            return false;
        };
        SYNC_GAP.contains(gap)
    }

    /// Read one data bit: fixed burst, then a gap whose duration encodes
    /// the value.
    fn read_bit(&mut self) -> Option<u8> {
        let burst = self.measure_while(true)?;
        if !BIT_BURST.contains(burst) {
            return None;
        }

        let gap = self.measure_while(false)?;
        classify_bit_gap(gap)
    }

    /// Measure how long the line stays at `level`, against the fixed pulse
    /// timeout. This is deliberately a tight poll over the line's monotonic
    /// clock: the tolerance windows are ±30% of hundreds of microseconds,
    /// so measurement latency must stay in the low microseconds.
    fn measure_while(&mut self, level: bool) -> Option<u64> {
        let start = self.line.now_micros();
        while self.line.is_active() == level {
            if self.line.now_micros().saturating_sub(start) > PULSE_TIMEOUT_US {
                return None;
            }
        }
        Some(self.line.now_micros().saturating_sub(start))
    }
}

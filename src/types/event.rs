//! Detection events handed from the detection thread to the controller.

use std::time::Duration;

use super::racer::RacerId;

/// A validated, debounced beacon detection.
///
/// Produced by the detection pipeline and owned by it until delivered over
/// the handoff channel; the timestamp is captured on the detection thread so
/// consumer latency can never skew it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionEvent {
    /// The decoded beacon id.
    pub racer: RacerId,
    /// Time since race start, measured against the shared monotonic epoch.
    pub timestamp: Duration,
}

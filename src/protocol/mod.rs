//! The infrared pulse-distance wire protocol.
//!
//! A beacon continuously repeats one frame: a sync pair (burst + a gap whose
//! duration no data bit produces), then three payload bits MSB-first, each a
//! fixed burst followed by a short (0) or long (1) gap. Frames are
//! transmitted back-to-back; the channel is lossy by design and correctness
//! comes from continuous retransmission, not acknowledgment.
//!
//! Both sides of the codec live here and stay pure: the encoder drives an
//! [`IrTransmitLine`](crate::line::IrTransmitLine), the decoder busy-polls
//! an [`IrReceiveLine`](crate::line::IrReceiveLine), and neither touches any
//! other I/O.
//!
//! ## Usage Example
//!
//! ```rust
//! use lightgate::line::SimulatedLine;
//! use lightgate::protocol::{BeaconTransmitter, IrDetector};
//! use lightgate::types::RacerId;
//!
//! let id = RacerId::new(4)?;
//! let mut beacon = BeaconTransmitter::new(SimulatedLine::new());
//! beacon.transmit_frame(id);
//!
//! let mut detector = IrDetector::new(beacon.into_line());
//! assert_eq!(detector.decode(), Some(id));
//! # Ok::<(), lightgate::GateError>(())
//! ```

mod decode;
mod encode;
pub mod timing;

pub use decode::IrDetector;
pub use encode::BeaconTransmitter;

//! Type-safe Rust library for infrared race timing gates.
//!
//! Lightgate times races between wearable infrared beacons and a receiving
//! gate. Each beacon continuously transmits its fixed 3-bit racer id over a
//! pulse-distance-modulated IR channel; the gate decodes transmissions,
//! timestamps them, and keeps either first-past-the-post results or
//! continuous lap records.
//!
//! # Features
//!
//! - **Bit-exact wire codec**: both sides of the pulse-distance protocol,
//!   self-resynchronizing against a lossy, gapless bitstream
//! - **Hard-realtime detection**: a dedicated thread owns the IR line and
//!   its microsecond timing; everything else runs best-effort
//! - **Race and lap timing**: debounce, arrival ranking, fastest-lap and
//!   persisted personal-best tracking
//! - **Host-testable**: all hardware behind traits, with a deterministic
//!   simulated line shipped in-crate
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lightgate::{Lightgate, RaceMode};
//! use lightgate::audio::NullToneSink;
//! use lightgate::indicator::NullStrip;
//! use lightgate::line::SimulatedLine;
//! use lightgate::profiles::FileProfileStore;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> lightgate::Result<()> {
//!     let gate = Lightgate::open(
//!         SimulatedLine::new(), // a real build passes its GPIO-backed line
//!         Box::new(FileProfileStore::new("profiles.bin")),
//!         Box::new(NullStrip::default()),
//!         Box::new(NullToneSink),
//!     )
//!     .await;
//!
//!     gate.set_mode(RaceMode::LapTimer)?;
//!     gate.start_race();
//!
//!     let mut crossings = Box::pin(gate.subscribe_crossings());
//!     while let Some(crossing) = crossings.next().await {
//!         println!("racer {} crossed at {:?}", crossing.racer, crossing.timestamp);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire protocol and its line primitives
pub mod line;
pub mod protocol;

// Detection-side architecture
pub mod pipeline;

// Control-side architecture
pub mod audio;
pub mod controller;
pub mod gate;
pub mod indicator;
pub mod profiles;

// Core exports
pub use error::{GateError, Result};
pub use types::{
    DetectionEvent, LapRecord, RaceMode, RaceResult, RacerId, RacerProfile, Rgb,
};

// Protocol exports
pub use protocol::{BeaconTransmitter, IrDetector};

// Pipeline exports
pub use pipeline::{DEBOUNCE_WINDOW, DetectionPipeline, HANDOFF_CAPACITY, SharedRace};

// Controller exports
pub use controller::{Crossing, CrossingDetail, FastestLap, RaceController, RaceSnapshot};

// Main API exports
pub use gate::{Lightgate, RaceGate};

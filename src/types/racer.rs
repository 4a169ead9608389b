//! Racer identity and profile types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GateError;

/// Number of racer slots supported by the wire protocol (3-bit payload).
pub const RACER_COUNT: usize = 8;

/// Maximum length of a persisted display name, in bytes.
pub const MAX_NAME_LEN: usize = 30;

/// A validated racer identifier in `[0, 7]`.
///
/// The wire protocol carries exactly three payload bits, so every id that
/// exists in the system fits this range by construction. Deserialization
/// goes through the same validation as [`RacerId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RacerId(u8);

impl RacerId {
    /// All valid racer ids, in order.
    pub const ALL: [RacerId; RACER_COUNT] = [
        RacerId(0),
        RacerId(1),
        RacerId(2),
        RacerId(3),
        RacerId(4),
        RacerId(5),
        RacerId(6),
        RacerId(7),
    ];

    /// Create a racer id, rejecting values outside `[0, 7]`.
    pub fn new(value: u8) -> Result<Self, GateError> {
        if value as usize >= RACER_COUNT {
            return Err(GateError::InvalidRacer { value });
        }
        Ok(RacerId(value))
    }

    /// The raw 3-bit id value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The id as a table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for RacerId {
    type Error = GateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RacerId::new(value)
    }
}

impl From<RacerId> for u8 {
    fn from(id: RacerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RacerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A racer's persisted identity: display name and personal best lap.
///
/// Profiles survive across sessions; `start_race` never touches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacerProfile {
    pub id: RacerId,
    pub display_name: String,
    /// Fastest lap across all sessions, if any plausible lap was recorded.
    pub personal_best: Option<Duration>,
}

impl RacerProfile {
    /// The factory profile for a slot: "Racer N", no personal best.
    pub fn default_for(id: RacerId) -> Self {
        Self { id, display_name: format!("Racer {id}"), personal_best: None }
    }

    /// Validate a display name for assignment or persistence.
    ///
    /// Names must be non-empty and fit the fixed storage slot.
    pub fn validate_name(name: &str) -> Result<(), GateError> {
        if name.is_empty() {
            return Err(GateError::invalid_name("display name must not be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(GateError::invalid_name(format!(
                "display name is {} bytes, maximum is {MAX_NAME_LEN}",
                name.len()
            )));
        }
        Ok(())
    }
}

/// The factory profile table: one default profile per slot.
pub fn default_profiles() -> [RacerProfile; RACER_COUNT] {
    RacerId::ALL.map(RacerProfile::default_for)
}

//! Race mode selection.

use serde::{Deserialize, Serialize};

/// How the gate interprets crossings while a race is active.
///
/// Selected while idle; a race runs entirely under the mode it started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceMode {
    /// First crossing per racer wins; later crossings are ignored.
    #[default]
    Race,
    /// Every debounced crossing is recorded as a lap.
    LapTimer,
}

impl RaceMode {
    /// The wire name used by the control plane (`"race"` / `"lap"`).
    pub fn as_str(self) -> &'static str {
        match self {
            RaceMode::Race => "race",
            RaceMode::LapTimer => "lap",
        }
    }
}

impl std::fmt::Display for RaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RaceMode {
    type Err = crate::error::GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "race" => Ok(RaceMode::Race),
            "lap" | "lap_timer" => Ok(RaceMode::LapTimer),
            other => Err(crate::error::GateError::parse_error(
                "race mode",
                format!("unknown mode '{other}' (expected 'race' or 'lap')"),
            )),
        }
    }
}

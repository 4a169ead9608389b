//! Serializable session snapshots for the control plane.
//!
//! The gate itself speaks no HTTP; whatever serves the dashboard gets
//! owned, serde-ready values with millisecond timestamps (what the wire
//! format and the UI both want) and display names resolved at capture time.

use serde::Serialize;

use super::RaceController;
use crate::types::RaceMode;

/// One finish line entry in race mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub racer: u8,
    pub name: String,
    pub time_ms: u64,
    pub position: u8,
}

/// One lap entry in lap-timer mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LapEntry {
    pub racer: u8,
    pub name: String,
    pub lap_time_ms: u64,
    pub timestamp_ms: u64,
}

/// The session-wide fastest lap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastestLapEntry {
    pub racer: u8,
    pub name: String,
    pub lap_time_ms: u64,
}

/// One persisted racer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileEntry {
    pub racer: u8,
    pub name: String,
    pub personal_best_ms: Option<u64>,
}

/// A complete point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceSnapshot {
    pub mode: RaceMode,
    pub active: bool,
    pub degraded: bool,
    pub results: Vec<ResultEntry>,
    pub laps: Vec<LapEntry>,
    pub fastest_lap: Option<FastestLapEntry>,
    pub profiles: Vec<ProfileEntry>,
}

impl RaceSnapshot {
    pub(super) fn capture(controller: &RaceController) -> Self {
        let name_of = |racer: crate::types::RacerId| controller.racer_name(racer).to_string();

        Self {
            mode: controller.mode(),
            active: controller.is_active(),
            degraded: controller.is_degraded(),
            results: controller
                .results()
                .iter()
                .map(|result| ResultEntry {
                    racer: result.racer.value(),
                    name: name_of(result.racer),
                    time_ms: result.timestamp.as_millis() as u64,
                    position: result.position,
                })
                .collect(),
            laps: controller
                .laps()
                .iter()
                .map(|lap| LapEntry {
                    racer: lap.racer.value(),
                    name: name_of(lap.racer),
                    lap_time_ms: lap.lap_time.as_millis() as u64,
                    timestamp_ms: lap.timestamp.as_millis() as u64,
                })
                .collect(),
            fastest_lap: controller.fastest_lap().map(|fastest| FastestLapEntry {
                racer: fastest.racer.value(),
                name: name_of(fastest.racer),
                lap_time_ms: fastest.lap_time.as_millis() as u64,
            }),
            profiles: controller
                .profiles()
                .iter()
                .map(|profile| ProfileEntry {
                    racer: profile.id.value(),
                    name: profile.display_name.clone(),
                    personal_best_ms: profile
                        .personal_best
                        .map(|best| best.as_millis() as u64),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SharedRace;
    use crate::profiles::MemoryProfileStore;
    use crate::types::{DetectionEvent, RacerId};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn snapshot_serializes_for_the_control_plane() {
        let mut controller = RaceController::new(
            Box::new(MemoryProfileStore::new()),
            Arc::new(SharedRace::new()),
        );
        controller.set_mode(RaceMode::LapTimer).unwrap();
        controller.set_racer_name(RacerId::new(2).unwrap(), "FastFlyer").unwrap();
        controller.start_race();
        controller.handle_event(DetectionEvent {
            racer: RacerId::new(2).unwrap(),
            timestamp: Duration::from_millis(1_200),
        });

        let snapshot = controller.snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["mode"], "lap_timer");
        assert_eq!(json["active"], true);
        assert_eq!(json["laps"][0]["racer"], 2);
        assert_eq!(json["laps"][0]["name"], "FastFlyer");
        assert_eq!(json["laps"][0]["lap_time_ms"], 1_200);
        assert_eq!(json["fastest_lap"]["racer"], 2);
        assert_eq!(json["profiles"][2]["personal_best_ms"], 1_200);
        assert_eq!(json["profiles"][0]["personal_best_ms"], serde_json::Value::Null);
    }

    #[test]
    fn snapshot_of_idle_gate_is_empty_but_complete() {
        let controller = RaceController::new(
            Box::new(MemoryProfileStore::new()),
            Arc::new(SharedRace::new()),
        );
        let snapshot = controller.snapshot();
        assert!(!snapshot.active);
        assert!(snapshot.results.is_empty());
        assert!(snapshot.laps.is_empty());
        assert!(snapshot.fastest_lap.is_none());
        assert_eq!(snapshot.profiles.len(), 8);
    }
}

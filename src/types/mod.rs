//! Core types for race timing data.
//!
//! The data model follows the wire protocol's constraints: ids are 3 bits
//! ([`RacerId`] enforces the range), tables are fixed at [`RACER_COUNT`]
//! slots, and timestamps are [`std::time::Duration`]s relative to race
//! start, captured on the detection thread.
//!
//! ## Usage Example
//!
//! ```rust
//! use lightgate::types::{RacerId, RacerProfile};
//!
//! let id = RacerId::new(3)?;
//! assert_eq!(id.index(), 3);
//!
//! let profile = RacerProfile::default_for(id);
//! assert_eq!(profile.display_name, "Racer 3");
//! assert!(profile.personal_best.is_none());
//! # Ok::<(), lightgate::GateError>(())
//! ```

mod color;
mod event;
mod mode;
mod racer;
mod record;

pub use color::{RACER_COLORS, Rgb, racer_color};
pub use event::DetectionEvent;
pub use mode::RaceMode;
pub use racer::{MAX_NAME_LEN, RACER_COUNT, RacerId, RacerProfile, default_profiles};
pub use record::{LapRecord, RaceResult};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        #[test]
        fn prop_racer_id_accepts_exactly_the_protocol_range(value in any::<u8>()) {
            let result = RacerId::new(value);
            if value < RACER_COUNT as u8 {
                let id = result.unwrap();
                prop_assert_eq!(id.value(), value);
                prop_assert_eq!(id.index(), value as usize);
            } else {
                let matched = matches!(result, Err(GateError::InvalidRacer { value: v }) if v == value);
                prop_assert!(matched);
            }
        }

        #[test]
        fn prop_racer_id_serde_roundtrip(value in 0u8..8) {
            let id = RacerId::new(value).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            prop_assert_eq!(&json, &value.to_string());
            let back: RacerId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, id);
        }

        #[test]
        fn prop_out_of_range_ids_never_deserialize(value in 8u8..) {
            let json = value.to_string();
            let result: std::result::Result<RacerId, _> = serde_json::from_str(&json);
            prop_assert!(result.is_err());
        }

        #[test]
        fn prop_color_scaling_never_exceeds_channel(intensity in -2.0f32..3.0, r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let scaled = Rgb::new(r, g, b).scaled(intensity);
            prop_assert!(scaled.r <= r);
            prop_assert!(scaled.g <= g);
            prop_assert!(scaled.b <= b);
        }

        #[test]
        fn prop_name_validation_tracks_byte_length(len in 0usize..64) {
            let name: String = "x".repeat(len);
            let result = RacerProfile::validate_name(&name);
            if len == 0 || len > MAX_NAME_LEN {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn racer_id_all_covers_every_slot() {
        assert_eq!(RacerId::ALL.len(), RACER_COUNT);
        for (index, id) in RacerId::ALL.iter().enumerate() {
            assert_eq!(id.index(), index);
        }
    }

    #[test]
    fn default_profiles_fill_every_slot() {
        let profiles = default_profiles();
        assert_eq!(profiles.len(), RACER_COUNT);
        for (index, profile) in profiles.iter().enumerate() {
            assert_eq!(profile.id.index(), index);
            assert_eq!(profile.display_name, format!("Racer {index}"));
            assert!(profile.personal_best.is_none());
        }
    }

    #[test]
    fn name_validation_is_byte_based() {
        // 11 three-byte characters: fine on chars, over on bytes.
        let name = "あ".repeat(11);
        assert_eq!(name.chars().count(), 11);
        assert!(matches!(
            RacerProfile::validate_name(&name),
            Err(GateError::InvalidName { .. })
        ));
    }

    #[test]
    fn race_mode_wire_names_roundtrip() {
        assert_eq!("race".parse::<RaceMode>().unwrap(), RaceMode::Race);
        assert_eq!("lap".parse::<RaceMode>().unwrap(), RaceMode::LapTimer);
        assert_eq!(RaceMode::Race.as_str(), "race");
        assert_eq!(RaceMode::LapTimer.as_str(), "lap");
        assert!(matches!("sprint".parse::<RaceMode>(), Err(GateError::Parse { .. })));
    }

    #[test]
    fn racer_colors_are_distinct() {
        for a in RacerId::ALL {
            for b in RacerId::ALL {
                if a != b {
                    assert_ne!(racer_color(a), racer_color(b), "colors for {a} and {b} collide");
                }
            }
        }
    }

    #[test]
    fn detection_event_is_copy() {
        let event = DetectionEvent {
            racer: RacerId::new(5).unwrap(),
            timestamp: Duration::from_millis(1200),
        };
        let copy = event;
        assert_eq!(copy, event);
    }
}

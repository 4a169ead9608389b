//! Persisted racer profiles.
//!
//! Profiles are the only state that outlives a session: eight fixed slots,
//! each a display name plus an optional personal-best lap. The on-disk
//! layout is deliberately tiny and versioned:
//!
//! ```text
//! magic "LGPF" | version u16 LE | 8 × { name_len u8 ≤ 30 | name UTF-8 | best_lap_ms u32 LE }
//! ```
//!
//! `best_lap_ms == 0` means "no personal best yet"; laps below the
//! plausibility floor never become bests, so a real 0 ms best is
//! impossible.
//!
//! Decoding validates everything and fails with a descriptive
//! [`GateError::ProfileFormat`]; a corrupt file degrades the boot (factory
//! profiles, degraded status) but never stops a race from running.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{GateError, Result};
use crate::types::{MAX_NAME_LEN, RACER_COUNT, RacerProfile, default_profiles};

/// File magic for profile data.
pub const PROFILE_MAGIC: [u8; 4] = *b"LGPF";

/// Current on-disk format version.
pub const PROFILE_FORMAT_VERSION: u16 = 1;

/// Storage for the fixed profile table.
///
/// Invoked at startup and on every name or personal-best change. The
/// medium is the implementation's business: a file here, NVS or an SD card
/// on a real gate.
pub trait ProfileStore: Send {
    fn load(&mut self) -> Result<[RacerProfile; RACER_COUNT]>;
    fn save(&mut self, profiles: &[RacerProfile; RACER_COUNT]) -> Result<()>;
}

/// Serialize the profile table to the on-disk layout.
pub fn encode_profiles(profiles: &[RacerProfile; RACER_COUNT]) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + RACER_COUNT * (1 + MAX_NAME_LEN + 4));
    out.extend_from_slice(&PROFILE_MAGIC);
    out.extend_from_slice(&PROFILE_FORMAT_VERSION.to_le_bytes());

    for profile in profiles {
        debug_assert!(profile.display_name.len() <= MAX_NAME_LEN);
        out.push(profile.display_name.len() as u8);
        out.extend_from_slice(profile.display_name.as_bytes());
        let best_ms = profile
            .personal_best
            .map(|best| u32::try_from(best.as_millis()).unwrap_or(u32::MAX))
            .unwrap_or(0);
        out.extend_from_slice(&best_ms.to_le_bytes());
    }

    out
}

/// Parse and validate the on-disk layout back into a profile table.
pub fn decode_profiles(data: &[u8]) -> Result<[RacerProfile; RACER_COUNT]> {
    let mut cursor = Cursor { data, offset: 0 };

    let magic = cursor.take(4, "header")?;
    if magic != PROFILE_MAGIC {
        return Err(GateError::profile_format(
            "header",
            format!("bad magic {magic:02x?}, expected {PROFILE_MAGIC:02x?}"),
        ));
    }

    let version = u16::from_le_bytes(cursor.take(2, "header")?.try_into().expect("2 bytes"));
    if version != PROFILE_FORMAT_VERSION {
        return Err(GateError::profile_format(
            "header",
            format!("unsupported version {version}, expected {PROFILE_FORMAT_VERSION}"),
        ));
    }

    let mut profiles = default_profiles();
    for (slot, profile) in profiles.iter_mut().enumerate() {
        let context = format!("slot {slot}");

        let name_len = cursor.take(1, &context)?[0] as usize;
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(GateError::profile_format(
                context,
                format!("name length {name_len} outside 1..={MAX_NAME_LEN}"),
            ));
        }

        let name_bytes = cursor.take(name_len, &context)?;
        let name = std::str::from_utf8(name_bytes).map_err(|e| {
            GateError::profile_format(context.clone(), format!("name is not UTF-8: {e}"))
        })?;

        let best_ms =
            u32::from_le_bytes(cursor.take(4, &context)?.try_into().expect("4 bytes"));

        profile.display_name = name.to_string();
        profile.personal_best =
            (best_ms > 0).then(|| Duration::from_millis(u64::from(best_ms)));
    }

    if cursor.offset != data.len() {
        return Err(GateError::profile_format(
            "trailer",
            format!("{} unexpected trailing bytes", data.len() - cursor.offset),
        ));
    }

    Ok(profiles)
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, context: &str) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).ok_or_else(|| {
            GateError::profile_format(context, "record length overflows the buffer")
        })?;
        if end > self.data.len() {
            return Err(GateError::profile_format(
                context,
                format!(
                    "truncated: wanted {len} bytes at offset {}, file has {}",
                    self.offset,
                    self.data.len()
                ),
            ));
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }
}

/// File-backed profile store.
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&mut self) -> Result<[RacerProfile; RACER_COUNT]> {
        if !self.path.exists() {
            // First boot: factory profiles, nothing to report.
            info!(path = %self.path.display(), "no profile file, using factory profiles");
            return Ok(default_profiles());
        }

        let data = std::fs::read(&self.path)
            .map_err(|e| GateError::storage_error(self.path.clone(), e))?;
        let profiles = decode_profiles(&data)?;
        debug!(path = %self.path.display(), "profiles loaded");
        Ok(profiles)
    }

    fn save(&mut self, profiles: &[RacerProfile; RACER_COUNT]) -> Result<()> {
        std::fs::write(&self.path, encode_profiles(profiles))
            .map_err(|e| GateError::storage_error(self.path.clone(), e))?;
        debug!(path = %self.path.display(), "profiles saved");
        Ok(())
    }
}

/// In-memory profile store for tests and hostless demos.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Option<[RacerProfile; RACER_COUNT]>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved table, if any.
    pub fn saved(&self) -> Option<&[RacerProfile; RACER_COUNT]> {
        self.profiles.as_ref()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&mut self) -> Result<[RacerProfile; RACER_COUNT]> {
        Ok(self.profiles.clone().unwrap_or_else(default_profiles))
    }

    fn save(&mut self, profiles: &[RacerProfile; RACER_COUNT]) -> Result<()> {
        self.profiles = Some(profiles.clone());
        Ok(())
    }
}

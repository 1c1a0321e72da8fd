//! Persisted island records and per-island invasion statistics.
//!
//! Two JSON files live under the storage directory: `islands.json` (the
//! island claims the scheduler scans) and `invasions.json` (long-lived
//! invasion statistics, mutated only at invasion start/end).

mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use error::StorageError;

/// Current unix time in seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ─── Island records ─────────────────────────────────────────────────────────

/// A player-owned island claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandRecord {
    pub id: u64,
    pub owner: String,
    /// Island progression level.
    pub level: f32,
    /// Minimum corner of the claimed box.
    pub bounds_min: [f32; 3],
    /// Maximum corner of the claimed box.
    pub bounds_max: [f32; 3],
    #[serde(default)]
    pub abandoned: bool,
}

// ─── Invasion statistics ────────────────────────────────────────────────────

/// Per-island invasion statistics, persisted across invasions.
///
/// Read by the difficulty calculator at invasion start; mutated by the
/// outcome recorder at invasion end (and the watermark/timestamp at start).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvasionData {
    /// Unix seconds of the last invasion start.
    #[serde(default)]
    pub last_invasion_time: u64,
    /// Consecutive successful invasions.
    #[serde(default)]
    pub current_streak: u32,
    /// Total invasion bosses slain.
    #[serde(default)]
    pub boss_kills: u32,
    #[serde(default)]
    pub successful_invasions: u32,
    /// Monotonic watermark, updated at invasion start.
    #[serde(default)]
    pub highest_tier_reached: u32,
}

impl InvasionData {
    /// Record a successful invasion. `boss_killed` additionally bumps the
    /// boss kill counter.
    pub fn record_success(&mut self, boss_killed: bool) {
        self.successful_invasions += 1;
        self.current_streak += 1;
        if boss_killed {
            self.boss_kills += 1;
        }
    }

    /// Record a failed invasion. Resets the streak, nothing else.
    pub fn record_failure(&mut self) {
        self.current_streak = 0;
    }

    /// Raise the difficulty watermark if `tier` exceeds it.
    pub fn raise_watermark(&mut self, tier: u32) {
        if tier > self.highest_tier_reached {
            self.highest_tier_reached = tier;
        }
    }
}

// ─── Store ──────────────────────────────────────────────────────────────────

/// On-disk store for island records and invasion statistics.
pub struct InvasionStore {
    dir: Option<PathBuf>,
    pub islands: HashMap<u64, IslandRecord>,
    data: HashMap<u64, InvasionData>,
}

impl InvasionStore {
    /// Open the store under `dir`, loading both files if present.
    /// Missing files start empty; a malformed file is an error.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let islands = load_map(&dir.join("islands.json"))?;
        let data = load_map(&dir.join("invasions.json"))?;

        Ok(Self {
            dir: Some(dir),
            islands,
            data,
        })
    }

    /// An empty store with no backing directory. Useful for tests and dry
    /// runs; `save` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            islands: HashMap::new(),
            data: HashMap::new(),
        }
    }

    /// Invasion statistics for an island, creating a fresh record on first
    /// access.
    pub fn data_mut(&mut self, island_id: u64) -> &mut InvasionData {
        self.data.entry(island_id).or_default()
    }

    /// Invasion statistics for an island, if any exist yet.
    pub fn data(&self, island_id: u64) -> Option<&InvasionData> {
        self.data.get(&island_id)
    }

    /// Write both files back to disk, keeping a `.bak` of the previous
    /// invasion statistics. No-op for an in-memory store.
    pub fn save(&self) -> Result<(), StorageError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        save_map(&dir.join("islands.json"), &self.islands, false)?;
        save_map(&dir.join("invasions.json"), &self.data, true)?;
        Ok(())
    }
}

fn load_map<T: for<'de> Deserialize<'de>>(
    path: &Path,
) -> Result<HashMap<u64, T>, StorageError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        warn!("{} is empty, starting fresh", path.display());
        return Ok(HashMap::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

fn save_map<T: Serialize>(
    path: &Path,
    map: &HashMap<u64, T>,
    backup: bool,
) -> Result<(), StorageError> {
    if backup && path.exists() {
        let bak = path.with_extension("json.bak");
        std::fs::copy(path, bak).ok();
    }
    let contents = serde_json::to_string_pretty(map)?;
    std::fs::write(path, contents)?;
    Ok(())
}

//! The invasion eligibility gate.
//!
//! Decides, per scheduling scan, whether an island gets a new invasion. All
//! conditions must hold; missing data is "not eligible", never an error.

use rand::Rng;

use hellblock_storage::InvasionData;

use super::difficulty;
use super::InvasionConfig;
use crate::bounds::IslandBounds;

/// Per-island progression snapshot fed to the gate each scan.
#[derive(Debug, Clone)]
pub struct IslandSnapshot {
    pub island_id: u64,
    pub owner: String,
    pub level: f32,
    pub bounds: IslandBounds,
    pub abandoned: bool,
    /// At least one eligible member online and inside bounds.
    pub online_player_present: bool,
    /// A mutually-exclusive siege event is running on this island.
    pub siege_active: bool,
    pub severe_weather: bool,
}

/// Run the gate. Returns the computed difficulty tier when the island should
/// be invaded this scan, `None` otherwise.
///
/// The one-active-invasion-per-island invariant is enforced by the caller's
/// registry before this is consulted.
pub fn check(
    snapshot: &IslandSnapshot,
    data: &InvasionData,
    config: &InvasionConfig,
    now_epoch_secs: u64,
    rng: &mut impl Rng,
) -> Option<u32> {
    if snapshot.abandoned || snapshot.level < config.min_island_level {
        return None;
    }
    if snapshot.siege_active || snapshot.severe_weather {
        return None;
    }
    if now_epoch_secs.saturating_sub(data.last_invasion_time) < config.cooldown_secs {
        return None;
    }
    if !snapshot.online_player_present {
        return None;
    }
    if snapshot.bounds.volume() < config.min_bounds_volume {
        return None;
    }

    let level_bonus = (snapshot.level as f64 / config.level_bonus_divisor)
        .min(config.level_bonus_cap);
    let chance = config.base_chance + level_bonus + config.flat_bonus;
    let roll: f64 = rng.gen_range(0.0..100.0);
    if roll > chance {
        return None;
    }

    Some(difficulty::tier(
        snapshot.level,
        data.current_streak,
        data.boss_kills,
        config.max_tier,
    ))
}

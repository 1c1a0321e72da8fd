//! Invasion orchestration: eligibility, difficulty, waves, retreat, loot.

pub mod difficulty;
pub mod director;
pub mod eligibility;
pub mod events;
pub mod loot;
pub mod retreat;
pub mod state;
pub mod waves;

/// Tuning knobs for the invasion scheduler.
#[derive(Debug, Clone)]
pub struct InvasionConfig {
    /// Difficulty tier ceiling.
    pub max_tier: u32,
    /// Minimum island level to be invaded.
    pub min_island_level: f32,
    /// Minimum bounds volume (blocks³); smaller islands are skipped.
    pub min_bounds_volume: f32,
    /// Seconds between invasions of the same island.
    pub cooldown_secs: u64,
    /// Base invasion chance per scan, percent.
    pub base_chance: f64,
    /// Island level divided by this feeds the level bonus.
    pub level_bonus_divisor: f64,
    /// Ceiling on the level bonus, percent.
    pub level_bonus_cap: f64,
    /// Flat chance bonus, percent.
    pub flat_bonus: f64,
    /// Ticks from invasion start to the first wave offset.
    pub base_delay_ticks: u64,
    /// Floor for inter-wave spacing at high tiers.
    pub min_wave_spacing_ticks: u64,
    /// Forced-failure deadline, in ticks from invasion start.
    pub max_duration_ticks: u64,
    /// Consecutive player-absent fine updates before abandonment.
    pub abandonment_updates: u32,
    /// Chance a riding-capable raider spawns mounted.
    pub mount_chance: f64,
    /// Attempts to find a clear spawn position before skipping a mob.
    pub spawn_attempts: u32,
    /// Required clearance radius around a spawn position.
    pub spawn_clearance: f32,
    /// Attempts to find a retreat exit before the despawn fallback.
    pub exit_search_attempts: u32,
    /// Required clearance radius around the exit.
    pub exit_clearance: f32,
    /// Minimum distance from the exit to every bounds face.
    pub exit_margin: f32,
    /// Retreat steering speed, blocks per game tick.
    pub retreat_speed: f32,
    /// Mobs within this distance of the exit despawn.
    pub arrival_radius: f32,
    /// Movement below this per fine update counts as stalled.
    pub stall_epsilon: f32,
    /// Consecutive stalled fine updates before a nudge teleport.
    pub stall_updates: u32,
    /// Nudge teleport distance toward the exit.
    pub nudge_distance: f32,
}

impl Default for InvasionConfig {
    fn default() -> Self {
        Self {
            max_tier: 10,
            min_island_level: 100.0,
            min_bounds_volume: 1000.0,
            cooldown_secs: 1800,
            base_chance: 20.0,
            level_bonus_divisor: 50.0,
            level_bonus_cap: 30.0,
            flat_bonus: 5.0,
            base_delay_ticks: 100,
            min_wave_spacing_ticks: 40,
            max_duration_ticks: 6000, // 5 minutes
            abandonment_updates: 30,
            mount_chance: 0.25,
            spawn_attempts: 8,
            spawn_clearance: 1.0,
            exit_search_attempts: 24,
            exit_clearance: 2.0,
            exit_margin: 2.0,
            retreat_speed: 0.25,
            arrival_radius: 1.5,
            stall_epsilon: 0.05,
            stall_updates: 40,
            nudge_distance: 2.0,
        }
    }
}

//! Wave scheduling and spawning.
//!
//! Waves are precomputed as due-ticks at invasion start and fired by the
//! director's fine update when due — no per-wave callbacks to cancel.

use rand::Rng;
use tracing::debug;

use super::difficulty::DifficultyProfile;
use super::state::{InvasionState, WaveSlot};
use super::InvasionConfig;
use crate::mob_registry::MobRegistry;
use crate::world_ops::WorldOps;

/// Build the wave schedule for an invasion starting at `start_tick`.
///
/// Wave `i` is due at `start + base_delay + i * spacing`; spacing shrinks as
/// the tier rises (faster pacing), floored at the configured minimum, so the
/// sequence is always strictly increasing.
pub fn build_schedule(
    profile: &DifficultyProfile,
    config: &InvasionConfig,
    start_tick: u64,
) -> Vec<WaveSlot> {
    let spacing = wave_spacing(profile.tier, config);
    (1..=profile.wave_count)
        .map(|wave| WaveSlot {
            wave,
            due_tick: start_tick + config.base_delay_ticks + wave as u64 * spacing,
            spawned: false,
        })
        .collect()
}

/// Inter-wave spacing in ticks for a tier.
pub fn wave_spacing(tier: u32, config: &InvasionConfig) -> u64 {
    (160u64.saturating_sub(tier as u64 * 10)).max(config.min_wave_spacing_ticks)
}

/// Spawn one wave of raiders into the island bounds. Returns the number of
/// entities spawned (riders and mounts both count).
pub fn spawn_wave<W: WorldOps, R: Rng>(
    world: &mut W,
    registry: &MobRegistry,
    state: &mut InvasionState,
    config: &InvasionConfig,
    rng: &mut R,
) -> u32 {
    let raiders = registry.raiders();
    if raiders.is_empty() {
        return 0;
    }

    let count = state.profile.mobs_per_wave + rng.gen_range(0..=2);
    let mut spawned = 0;

    for _ in 0..count {
        let pos = match find_spawn_position(world, state, config, rng) {
            Some(p) => p,
            None => {
                // Degraded path: no clear spot, skip this mob.
                debug!(island_id = state.island_id, "no clear spawn position, skipping mob");
                continue;
            }
        };

        let def = raiders[rng.gen_range(0..raiders.len())];
        let rider_id = match world.spawn_entity(&def.type_id, pos) {
            Some(id) => id,
            None => continue,
        };
        state.mob_ids.insert(rider_id);
        spawned += 1;

        if def.can_ride && rng.gen_bool(config.mount_chance) {
            let mount = registry.mount();
            if let Some(mount_id) = world.spawn_entity(&mount.type_id, pos) {
                state.mob_ids.insert(mount_id);
                state.register_mount(rider_id, mount_id);
                spawned += 1;
            }
        }
    }

    state.total_spawned += spawned;
    spawned
}

/// Spawn the boss, buffed when the profile says so. Returns its runtime id.
pub fn spawn_boss<W: WorldOps, R: Rng>(
    world: &mut W,
    registry: &MobRegistry,
    state: &mut InvasionState,
    config: &InvasionConfig,
    rng: &mut R,
) -> Option<u64> {
    let pos = find_spawn_position(world, state, config, rng)
        .unwrap_or_else(|| state.bounds.center());
    let boss_id = world.spawn_entity(&registry.boss().type_id, pos)?;
    if state.profile.boss_has_buffs {
        world.strengthen_entity(boss_id, 1.5, 1.25);
    }
    // The boss is tracked through boss_id, not mob_ids: victory and retreat
    // both key off the regular mobs remaining after the boss falls.
    state.boss_id = Some(boss_id);
    state.total_spawned += 1;
    Some(boss_id)
}

/// Pick a clear spawn position inside bounds, with bounded attempts.
fn find_spawn_position<W: WorldOps, R: Rng>(
    world: &mut W,
    state: &InvasionState,
    config: &InvasionConfig,
    rng: &mut R,
) -> Option<(f32, f32, f32)> {
    for _ in 0..config.spawn_attempts {
        let pos = state.bounds.random_point(rng);
        if world.is_area_clear(pos, config.spawn_clearance) {
            return Some(pos);
        }
    }
    None
}

//! Post-boss-kill retreat: herd the remaining mobs to an exit portal.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use tracing::debug;

use super::InvasionConfig;
use crate::bounds::IslandBounds;
use crate::world_ops::WorldOps;

/// An active retreat: the exit point plus per-mob stall bookkeeping.
#[derive(Debug)]
pub struct RetreatPlan {
    pub exit: (f32, f32, f32),
    /// Last seen position and consecutive stalled updates, per mob.
    progress: HashMap<u64, ((f32, f32, f32), u32)>,
}

impl RetreatPlan {
    pub fn new(exit: (f32, f32, f32)) -> Self {
        Self {
            exit,
            progress: HashMap::new(),
        }
    }
}

/// Search for a valid exit: a clear volume fully inside bounds with margin.
/// Bounded random attempts; `None` means the caller takes the despawn
/// fallback.
pub fn find_exit<W: WorldOps, R: Rng>(
    world: &mut W,
    bounds: &IslandBounds,
    config: &InvasionConfig,
    rng: &mut R,
) -> Option<(f32, f32, f32)> {
    for _ in 0..config.exit_search_attempts {
        let pos = bounds.random_point(rng);
        if bounds.contains_with_margin(pos, config.exit_margin)
            && world.is_area_clear(pos, config.exit_clearance)
        {
            return Some(pos);
        }
    }
    None
}

/// Place a small portal frame at the exit.
pub fn place_portal<W: WorldOps>(world: &mut W, exit: (f32, f32, f32)) {
    let (x, y, z) = (exit.0 as i32, exit.1 as i32, exit.2 as i32);
    world.set_block((x - 1, y, z), "minecraft:crying_obsidian");
    world.set_block((x + 1, y, z), "minecraft:crying_obsidian");
    world.set_block((x - 1, y + 2, z), "minecraft:crying_obsidian");
    world.set_block((x + 1, y + 2, z), "minecraft:crying_obsidian");
}

/// One fine-update step of the retreat: steer every remaining mob toward the
/// exit, despawn arrivals, nudge stallers. Removes despawned mobs from
/// `mob_ids`; the retreat is over when the set is empty.
pub fn step<W: WorldOps>(
    world: &mut W,
    bounds: &IslandBounds,
    config: &InvasionConfig,
    plan: &mut RetreatPlan,
    mob_ids: &mut HashSet<u64>,
) {
    let mut arrived = Vec::new();

    for &id in mob_ids.iter() {
        let pos = match world.entity_position(id) {
            Some(p) => p,
            // Removed by unrelated causes: same as already gone.
            None => {
                arrived.push(id);
                continue;
            }
        };

        let dx = plan.exit.0 - pos.0;
        let dy = plan.exit.1 - pos.1;
        let dz = plan.exit.2 - pos.2;
        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
        if dist <= config.arrival_radius {
            world.remove_entity(id);
            arrived.push(id);
            continue;
        }

        // Stall detection against the position seen last update.
        let stalled = match plan.progress.get(&id) {
            Some((last, count)) => {
                let moved = ((pos.0 - last.0).powi(2)
                    + (pos.1 - last.1).powi(2)
                    + (pos.2 - last.2).powi(2))
                .sqrt();
                if moved < config.stall_epsilon {
                    count + 1
                } else {
                    0
                }
            }
            None => 0,
        };
        plan.progress.insert(id, (pos, stalled));

        if stalled >= config.stall_updates {
            let nudged = bounds.clamp((
                pos.0 + dx / dist * config.nudge_distance,
                pos.1 + dy / dist * config.nudge_distance,
                pos.2 + dz / dist * config.nudge_distance,
            ));
            debug!(runtime_id = id, "stalled retreat mob, nudging toward exit");
            world.teleport_entity(id, nudged);
            plan.progress.insert(id, (nudged, 0));
        }

        world.steer_entity(id, plan.exit, config.retreat_speed);
    }

    for id in arrived {
        mob_ids.remove(&id);
        plan.progress.remove(&id);
    }
}

/// Fallback when no exit exists: despawn everything immediately.
pub fn despawn_all<W: WorldOps>(world: &mut W, mob_ids: &mut HashSet<u64>) {
    for id in mob_ids.drain() {
        world.remove_entity(id);
    }
}

//! The invasion director: owns all active invasions and drives them.
//!
//! Two entry points, both called from the server's single tick timeline
//! (no locking needed under that single-writer invariant):
//! - [`InvasionDirector::scan`] — coarse cadence, runs the eligibility gate
//!   over every island and starts new invasions.
//! - [`InvasionDirector::update`] — fine cadence (~1 s), steps every active
//!   invasion's state machine: fires due waves, reconciles dead entities,
//!   enforces timeout/abandonment, and runs the retreat.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, info, warn};

use hellblock_storage::InvasionStore;

use super::difficulty::{self, DifficultyProfile};
use super::eligibility::{self, IslandSnapshot};
use super::events::{FailureReason, InvasionEvent};
use super::loot::{self, LootEntry};
use super::retreat::{self, RetreatPlan};
use super::state::{InvasionPhase, InvasionState};
use super::waves;
use super::InvasionConfig;
use crate::mob_registry::MobRegistry;
use crate::world_ops::WorldOps;

pub struct InvasionDirector {
    config: InvasionConfig,
    mob_registry: MobRegistry,
    loot_table: Vec<LootEntry>,
    /// The one shared mutable map: island id → live invasion.
    active: HashMap<u64, InvasionState>,
    events: Vec<InvasionEvent>,
}

impl InvasionDirector {
    pub fn new(config: InvasionConfig) -> Self {
        Self {
            config,
            mob_registry: MobRegistry::new(),
            loot_table: loot::default_table(),
            active: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn is_active(&self, island_id: u64) -> bool {
        self.active.contains_key(&island_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn state(&self, island_id: u64) -> Option<&InvasionState> {
        self.active.get(&island_id)
    }

    /// Drain all pending invasion events.
    pub fn drain_events(&mut self) -> Vec<InvasionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Coarse scan: run the eligibility gate over each island snapshot and
    /// start invasions where it passes. Re-running the scan immediately is a
    /// no-op for islands that just started (the registry check comes first).
    pub fn scan<R: Rng>(
        &mut self,
        snapshots: &[IslandSnapshot],
        store: &mut InvasionStore,
        now_epoch_secs: u64,
        now_tick: u64,
        rng: &mut R,
    ) {
        for snapshot in snapshots {
            if self.active.contains_key(&snapshot.island_id) {
                continue;
            }
            let data = store
                .data(snapshot.island_id)
                .cloned()
                .unwrap_or_default();
            if let Some(tier) =
                eligibility::check(snapshot, &data, &self.config, now_epoch_secs, rng)
            {
                self.start_invasion(snapshot, tier, store, now_epoch_secs, now_tick);
            }
        }
    }

    /// Start an invasion bypassing the chance roll (operator command). The
    /// one-per-island invariant still holds. Returns `false` if one is
    /// already running.
    pub fn force_start(
        &mut self,
        snapshot: &IslandSnapshot,
        store: &mut InvasionStore,
        now_epoch_secs: u64,
        now_tick: u64,
    ) -> bool {
        if self.active.contains_key(&snapshot.island_id) {
            return false;
        }
        let data = store
            .data(snapshot.island_id)
            .cloned()
            .unwrap_or_default();
        let tier = difficulty::tier(
            snapshot.level,
            data.current_streak,
            data.boss_kills,
            self.config.max_tier,
        );
        self.start_invasion(snapshot, tier, store, now_epoch_secs, now_tick);
        true
    }

    fn start_invasion(
        &mut self,
        snapshot: &IslandSnapshot,
        tier: u32,
        store: &mut InvasionStore,
        now_epoch_secs: u64,
        now_tick: u64,
    ) {
        let profile = DifficultyProfile::for_tier(tier);
        let schedule = waves::build_schedule(&profile, &self.config, now_tick);
        let state = InvasionState::new(
            snapshot.island_id,
            snapshot.owner.clone(),
            snapshot.bounds,
            snapshot.level,
            profile,
            now_tick,
            schedule,
        );

        let data = store.data_mut(snapshot.island_id);
        data.last_invasion_time = now_epoch_secs;
        data.raise_watermark(tier);

        info!(
            island_id = snapshot.island_id,
            owner = %snapshot.owner,
            tier,
            waves = profile.wave_count,
            "invasion started"
        );
        self.events.push(InvasionEvent::InvasionStarted {
            island_id: snapshot.island_id,
            tier,
            wave_count: profile.wave_count,
        });
        self.active.insert(snapshot.island_id, state);
    }

    /// Fine update: step every active invasion once.
    pub fn update<W: WorldOps, R: Rng>(
        &mut self,
        world: &mut W,
        store: &mut InvasionStore,
        now_tick: u64,
        rng: &mut R,
    ) {
        let ids: Vec<u64> = self.active.keys().copied().collect();
        for id in ids {
            let mut state = match self.active.remove(&id) {
                Some(s) => s,
                None => continue,
            };
            let finished = self.step_invasion(world, store, &mut state, now_tick, rng);
            if !finished {
                self.active.insert(id, state);
            }
        }
    }

    /// Cancel everything (shutdown): despawn all invasion entities and drop
    /// the state. No outcome is recorded.
    pub fn cancel_all<W: WorldOps>(&mut self, world: &mut W) {
        for (_, mut state) in self.active.drain() {
            retreat::despawn_all(world, &mut state.mob_ids);
            if let Some(boss_id) = state.boss_id.take() {
                world.remove_entity(boss_id);
            }
            info!(island_id = state.island_id, "invasion cancelled");
        }
    }

    /// One state-machine step for one invasion. Returns `true` when the
    /// invasion is over and its state must be discarded.
    fn step_invasion<W: WorldOps, R: Rng>(
        &mut self,
        world: &mut W,
        store: &mut InvasionStore,
        state: &mut InvasionState,
        now_tick: u64,
        rng: &mut R,
    ) -> bool {
        // Reconcile against the world first: entities removed by unrelated
        // causes read the same as dead.
        state.mob_ids.retain(|&id| world.is_alive(id));
        state.release_dead_riders();

        // Timeout beats everything, in any phase.
        if state.timed_out(now_tick, self.config.max_duration_ticks) {
            self.fail(world, store, state, FailureReason::Timeout);
            return true;
        }

        // Abandonment: nobody inside bounds for too many updates.
        if world.players_within(&state.bounds) == 0 {
            state.absent_updates += 1;
            if state.absent_updates >= self.config.abandonment_updates {
                self.fail(world, store, state, FailureReason::Abandoned);
                return true;
            }
        } else {
            state.absent_updates = 0;
        }

        match state.phase {
            InvasionPhase::Waves => {
                for wave in state.due_waves(now_tick) {
                    let mob_count =
                        waves::spawn_wave(world, &self.mob_registry, state, &self.config, rng);
                    state.mark_wave_spawned(wave);
                    debug!(
                        island_id = state.island_id,
                        wave, mob_count, "wave spawned"
                    );
                    self.events.push(InvasionEvent::WaveSpawned {
                        island_id: state.island_id,
                        wave,
                        mob_count,
                    });

                    if wave == state.profile.wave_count {
                        if let Some(boss_id) =
                            waves::spawn_boss(world, &self.mob_registry, state, &self.config, rng)
                        {
                            info!(island_id = state.island_id, boss_id, "boss spawned");
                            self.events.push(InvasionEvent::BossSpawned {
                                island_id: state.island_id,
                                runtime_id: boss_id,
                            });
                        }
                        state.phase = InvasionPhase::Boss;
                    }
                }
                false
            }

            InvasionPhase::Boss => {
                let boss_alive = state
                    .boss_id
                    .map(|id| world.is_alive(id))
                    .unwrap_or(false);
                if boss_alive {
                    return false;
                }

                state.boss_id = None;
                state.boss_killed = true;
                info!(island_id = state.island_id, "boss killed");
                self.events.push(InvasionEvent::BossKilled {
                    island_id: state.island_id,
                });

                if state.mob_ids.is_empty() {
                    self.victory(store, state, rng, true);
                    return true;
                }

                match retreat::find_exit(world, &state.bounds, &self.config, rng) {
                    Some(exit) => {
                        retreat::place_portal(world, exit);
                        info!(
                            island_id = state.island_id,
                            remaining = state.mob_ids.len(),
                            "retreat triggered"
                        );
                        self.events.push(InvasionEvent::RetreatTriggered {
                            island_id: state.island_id,
                            remaining: state.mob_ids.len() as u32,
                        });
                        state.phase = InvasionPhase::Retreat(RetreatPlan::new(exit));
                        false
                    }
                    None => {
                        // Degraded path: no exit, despawn the stragglers.
                        // The success sticks but the reward path is forfeit.
                        warn!(
                            island_id = state.island_id,
                            "no retreat exit found, despawning remaining mobs"
                        );
                        retreat::despawn_all(world, &mut state.mob_ids);
                        self.victory(store, state, rng, false);
                        true
                    }
                }
            }

            InvasionPhase::Retreat(ref mut plan) => {
                retreat::step(world, &state.bounds, &self.config, plan, &mut state.mob_ids);
                if state.mob_ids.is_empty() {
                    self.victory(store, state, rng, true);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn victory<R: Rng>(
        &mut self,
        store: &mut InvasionStore,
        state: &InvasionState,
        rng: &mut R,
        with_loot: bool,
    ) {
        store
            .data_mut(state.island_id)
            .record_success(state.boss_killed);

        let rewards = if with_loot {
            loot::generate_loot(
                rng,
                &self.loot_table,
                &state.profile,
                state.island_level as f64,
            )
        } else {
            Vec::new()
        };

        info!(
            island_id = state.island_id,
            tier = state.profile.tier,
            rewards = rewards.len(),
            "invasion victory"
        );
        self.events.push(InvasionEvent::InvasionVictory {
            island_id: state.island_id,
            loot: rewards,
        });
    }

    fn fail<W: WorldOps>(
        &mut self,
        world: &mut W,
        store: &mut InvasionStore,
        state: &mut InvasionState,
        reason: FailureReason,
    ) {
        retreat::despawn_all(world, &mut state.mob_ids);
        if let Some(boss_id) = state.boss_id.take() {
            world.remove_entity(boss_id);
        }
        store.data_mut(state.island_id).record_failure();

        info!(
            island_id = state.island_id,
            ?reason,
            waves_spawned = state.current_wave,
            "invasion failed"
        );
        self.events.push(InvasionEvent::InvasionFailed {
            island_id: state.island_id,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::IslandBounds;
    use crate::island_world::IslandWorld;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(level: f32) -> IslandSnapshot {
        IslandSnapshot {
            island_id: 1,
            owner: "alex".into(),
            level,
            bounds: IslandBounds::new((-32.0, 0.0, -32.0), (32.0, 64.0, 32.0)),
            abandoned: false,
            online_player_present: true,
            siege_active: false,
            severe_weather: false,
        }
    }

    fn certain_config() -> InvasionConfig {
        InvasionConfig {
            base_chance: 100.0,
            cooldown_secs: 0,
            ..Default::default()
        }
    }

    /// Run fine updates (with interleaved game ticks) until all waves and
    /// the boss have spawned.
    fn run_to_boss_phase(
        director: &mut InvasionDirector,
        world: &mut IslandWorld,
        store: &mut InvasionStore,
        rng: &mut StdRng,
    ) {
        for step in 1..=200u64 {
            let now_tick = step * 20;
            director.update(world, store, now_tick, rng);
            world.tick();
            if matches!(
                director.state(1).map(|s| &s.phase),
                Some(InvasionPhase::Boss)
            ) {
                return;
            }
        }
        panic!("invasion never reached boss phase");
    }

    #[test]
    fn scan_is_idempotent_per_island() {
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(1);
        let snaps = vec![snapshot(400.0)];

        director.scan(&snaps, &mut store, 10_000, 0, &mut rng);
        director.scan(&snaps, &mut store, 10_000, 0, &mut rng);
        assert_eq!(director.active_count(), 1);
    }

    #[test]
    fn start_updates_watermark_and_timestamp() {
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(1);

        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);
        let data = store.data(1).unwrap();
        assert_eq!(data.last_invasion_time, 10_000);
        assert_eq!(data.highest_tier_reached, 5); // 1 + 400/100

        let events = director.drain_events();
        assert!(matches!(
            events[0],
            InvasionEvent::InvasionStarted { tier: 5, wave_count: 5, .. }
        ));
    }

    #[test]
    fn force_start_rejects_duplicate() {
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(certain_config());
        let snap = snapshot(400.0);

        assert!(director.force_start(&snap, &mut store, 10_000, 0));
        assert!(!director.force_start(&snap, &mut store, 10_000, 0));
        assert_eq!(director.active_count(), 1);
    }

    #[test]
    fn victory_records_success_exactly_once() {
        let mut world = IslandWorld::new(1);
        world.spawn_player((0.0, 32.0, 0.0));
        let mut store = InvasionStore::in_memory();
        store.data_mut(1).current_streak = 2;
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(42);

        // level 400 → tier 5 → waveCount 5, boss on the final wave.
        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);
        run_to_boss_phase(&mut director, &mut world, &mut store, &mut rng);

        // Players clear the field, then the boss.
        let boss_id = director.state(1).unwrap().boss_id.unwrap();
        let mob_ids: Vec<u64> = director.state(1).unwrap().mob_ids.iter().copied().collect();
        for id in mob_ids {
            world.damage_mob(id, 10_000.0);
        }
        world.damage_mob(boss_id, 10_000.0);

        director.update(&mut world, &mut store, 5000, &mut rng);
        assert!(!director.is_active(1));

        let data = store.data(1).unwrap();
        assert_eq!(data.successful_invasions, 1);
        assert_eq!(data.current_streak, 3);
        assert_eq!(data.boss_kills, 1);

        let events = director.drain_events();
        let victories = events
            .iter()
            .filter(|e| matches!(e, InvasionEvent::InvasionVictory { .. }))
            .count();
        assert_eq!(victories, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, InvasionEvent::BossKilled { .. })));
    }

    #[test]
    fn timeout_is_failure_with_no_loot() {
        let mut world = IslandWorld::new(1);
        world.spawn_player((0.0, 32.0, 0.0));
        let mut store = InvasionStore::in_memory();
        store.data_mut(1).current_streak = 3;
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(7);

        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);

        // Two of five waves spawn (tier 5 spacing = 110: due 210 and 320)...
        director.update(&mut world, &mut store, 350, &mut rng);
        assert_eq!(director.state(1).unwrap().current_wave, 2);

        // ...then the deadline passes with the boss never killed.
        director.update(&mut world, &mut store, 6001, &mut rng);
        assert!(!director.is_active(1));

        let data = store.data(1).unwrap();
        assert_eq!(data.current_streak, 0);
        assert_eq!(data.successful_invasions, 0);

        let events = director.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            InvasionEvent::InvasionFailed {
                reason: FailureReason::Timeout,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, InvasionEvent::InvasionVictory { .. })));

        // Everything the invasion spawned is gone.
        world.tick();
        assert!(world.all_mob_ids().is_empty());
    }

    #[test]
    fn retreat_then_single_victory() {
        let mut world = IslandWorld::new(1);
        world.spawn_player((0.0, 32.0, 0.0));
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(13);

        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);
        run_to_boss_phase(&mut director, &mut world, &mut store, &mut rng);

        // Leave exactly 3 regular mobs, then kill the boss.
        let boss_id = director.state(1).unwrap().boss_id.unwrap();
        let mob_ids: Vec<u64> = director.state(1).unwrap().mob_ids.iter().copied().collect();
        for &id in mob_ids.iter().skip(3) {
            world.damage_mob(id, 10_000.0);
        }
        world.damage_mob(boss_id, 10_000.0);

        director.update(&mut world, &mut store, 700, &mut rng);
        assert!(director.is_active(1), "retreat should still be running");
        let events = director.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            InvasionEvent::RetreatTriggered { remaining: 3, .. }
        )));

        // Let the retreat play out (staying inside the invasion deadline):
        // fine updates with game ticks between.
        let mut finished_at = None;
        for step in 0..260u64 {
            let now_tick = 700 + step * 20;
            director.update(&mut world, &mut store, now_tick, &mut rng);
            if !director.is_active(1) {
                finished_at = Some(step);
                break;
            }
            for _ in 0..20 {
                world.tick();
            }
        }
        assert!(finished_at.is_some(), "retreat never finished");

        let data = store.data(1).unwrap();
        assert_eq!(data.successful_invasions, 1);
        assert_eq!(data.boss_kills, 1);

        let victories = director
            .drain_events()
            .iter()
            .filter(|e| matches!(e, InvasionEvent::InvasionVictory { .. }))
            .count();
        assert_eq!(victories, 1);
    }

    #[test]
    fn no_exit_fallback_forfeits_loot() {
        let mut world = IslandWorld::new(1);
        world.spawn_player((0.0, 32.0, 0.0));
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(21);

        // Roomy enough to be invaded, but thinner on one axis than twice the
        // exit margin, so no retreat exit can exist.
        let snap = IslandSnapshot {
            bounds: IslandBounds::new((-32.0, 0.0, -1.5), (32.0, 64.0, 1.5)),
            ..snapshot(400.0)
        };
        director.scan(&[snap], &mut store, 10_000, 0, &mut rng);
        run_to_boss_phase(&mut director, &mut world, &mut store, &mut rng);

        // Boss falls with regular mobs still standing.
        let boss_id = director.state(1).unwrap().boss_id.unwrap();
        assert!(!director.state(1).unwrap().mob_ids.is_empty());
        world.damage_mob(boss_id, 10_000.0);

        director.update(&mut world, &mut store, 700, &mut rng);
        assert!(!director.is_active(1));

        // The success sticks, the reward path does not.
        let data = store.data(1).unwrap();
        assert_eq!(data.successful_invasions, 1);
        assert_eq!(data.boss_kills, 1);
        assert_eq!(data.current_streak, 1);

        let events = director.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            InvasionEvent::InvasionVictory { loot, .. } if loot.is_empty()
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, InvasionEvent::RetreatTriggered { .. })));

        world.tick();
        assert!(world.all_mob_ids().is_empty());
    }

    #[test]
    fn timeout_during_retreat_is_failure() {
        let mut world = IslandWorld::new(1);
        world.spawn_player((0.0, 32.0, 0.0));
        let mut store = InvasionStore::in_memory();
        store.data_mut(1).current_streak = 2;
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(17);

        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);
        run_to_boss_phase(&mut director, &mut world, &mut store, &mut rng);

        // Boss dies with 3 mobs left; the retreat starts.
        let boss_id = director.state(1).unwrap().boss_id.unwrap();
        let mob_ids: Vec<u64> = director.state(1).unwrap().mob_ids.iter().copied().collect();
        for &id in mob_ids.iter().skip(3) {
            world.damage_mob(id, 10_000.0);
        }
        world.damage_mob(boss_id, 10_000.0);
        director.update(&mut world, &mut store, 700, &mut rng);
        assert!(matches!(
            director.state(1).map(|s| &s.phase),
            Some(InvasionPhase::Retreat(_))
        ));

        // The stragglers never make it out before the deadline: the earlier
        // boss kill does not save the outcome.
        director.update(&mut world, &mut store, 6001, &mut rng);
        assert!(!director.is_active(1));

        let data = store.data(1).unwrap();
        assert_eq!(data.current_streak, 0);
        assert_eq!(data.successful_invasions, 0);
        assert_eq!(data.boss_kills, 0);

        let events = director.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            InvasionEvent::InvasionFailed {
                reason: FailureReason::Timeout,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, InvasionEvent::InvasionVictory { .. })));

        world.tick();
        assert!(world.all_mob_ids().is_empty());
    }

    #[test]
    fn abandonment_fails_the_invasion() {
        let mut world = IslandWorld::new(1); // no players at all
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(InvasionConfig {
            abandonment_updates: 3,
            ..certain_config()
        });
        let mut rng = StdRng::seed_from_u64(5);

        // Snapshot claims presence (the player left right after the scan).
        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);
        for step in 1..=3 {
            director.update(&mut world, &mut store, step * 20, &mut rng);
        }
        assert!(!director.is_active(1));
        assert!(director.drain_events().iter().any(|e| matches!(
            e,
            InvasionEvent::InvasionFailed {
                reason: FailureReason::Abandoned,
                ..
            }
        )));
    }

    #[test]
    fn cancel_all_despawns_without_outcome() {
        let mut world = IslandWorld::new(1);
        world.spawn_player((0.0, 32.0, 0.0));
        let mut store = InvasionStore::in_memory();
        let mut director = InvasionDirector::new(certain_config());
        let mut rng = StdRng::seed_from_u64(3);

        director.scan(&[snapshot(400.0)], &mut store, 10_000, 0, &mut rng);
        run_to_boss_phase(&mut director, &mut world, &mut store, &mut rng);
        director.drain_events();

        director.cancel_all(&mut world);
        assert_eq!(director.active_count(), 0);
        world.tick();
        assert!(world.all_mob_ids().is_empty());

        let data = store.data(1).unwrap();
        assert_eq!(data.successful_invasions, 0);
        assert_eq!(data.current_streak, 0);
        assert!(director.drain_events().is_empty());
    }
}

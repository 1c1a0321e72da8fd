//! Per-island invasion state machine.

use std::collections::{HashMap, HashSet};

use super::difficulty::DifficultyProfile;
use super::retreat::RetreatPlan;
use crate::bounds::IslandBounds;

/// One scheduled wave: due tick and whether it has fired.
#[derive(Debug, Clone)]
pub struct WaveSlot {
    /// 1-based wave number.
    pub wave: u32,
    pub due_tick: u64,
    pub spawned: bool,
}

/// Where the invasion is in its lifecycle.
#[derive(Debug)]
pub enum InvasionPhase {
    /// Waves still pending; the final wave also brings the boss.
    Waves,
    /// All waves spawned, boss alive.
    Boss,
    /// Boss dead, remaining mobs routing to the exit.
    Retreat(RetreatPlan),
}

/// Live state of one island's invasion. At most one exists per island at a
/// time; the director's registry enforces that.
#[derive(Debug)]
pub struct InvasionState {
    pub island_id: u64,
    pub owner: String,
    pub bounds: IslandBounds,
    /// Island level at invasion start, snapshot for loot scaling.
    pub island_level: f32,
    pub profile: DifficultyProfile,
    pub phase: InvasionPhase,
    /// All living invasion-spawned entities.
    pub mob_ids: HashSet<u64>,
    pub boss_id: Option<u64>,
    pub boss_killed: bool,
    pub current_wave: u32,
    pub total_spawned: u32,
    pub start_tick: u64,
    pub wave_schedule: Vec<WaveSlot>,
    /// Rider runtime id → mount runtime id.
    mounts: HashMap<u64, u64>,
    /// Consecutive fine updates with no player inside bounds.
    pub absent_updates: u32,
}

impl InvasionState {
    pub fn new(
        island_id: u64,
        owner: String,
        bounds: IslandBounds,
        island_level: f32,
        profile: DifficultyProfile,
        start_tick: u64,
        wave_schedule: Vec<WaveSlot>,
    ) -> Self {
        Self {
            island_id,
            owner,
            bounds,
            island_level,
            profile,
            phase: InvasionPhase::Waves,
            mob_ids: HashSet::new(),
            boss_id: None,
            boss_killed: false,
            current_wave: 0,
            total_spawned: 0,
            start_tick,
            wave_schedule,
            mounts: HashMap::new(),
            absent_updates: 0,
        }
    }

    /// Record a rider/mount pair.
    pub fn register_mount(&mut self, rider_id: u64, mount_id: u64) {
        self.mounts.insert(rider_id, mount_id);
    }

    /// The mount a rider sits on, if any.
    pub fn mount_of(&self, rider_id: u64) -> Option<u64> {
        self.mounts.get(&rider_id).copied()
    }

    /// The rider of a mount, if any.
    pub fn rider_of(&self, mount_id: u64) -> Option<u64> {
        self.mounts
            .iter()
            .find(|(_, &m)| m == mount_id)
            .map(|(&r, _)| r)
    }

    /// Drop mappings whose rider is no longer a live invasion mob. The mount
    /// stays a regular invasion mob.
    pub fn release_dead_riders(&mut self) {
        let mob_ids = &self.mob_ids;
        self.mounts.retain(|rider, _| mob_ids.contains(rider));
    }

    /// Whether the invasion has exceeded its deadline.
    pub fn timed_out(&self, now_tick: u64, max_duration_ticks: u64) -> bool {
        now_tick.saturating_sub(self.start_tick) > max_duration_ticks
    }

    /// Waves due at `now_tick` that have not fired yet, in order.
    pub fn due_waves(&self, now_tick: u64) -> Vec<u32> {
        self.wave_schedule
            .iter()
            .filter(|slot| !slot.spawned && slot.due_tick <= now_tick)
            .map(|slot| slot.wave)
            .collect()
    }

    /// Mark a wave as fired and advance the wave counter.
    pub fn mark_wave_spawned(&mut self, wave: u32) {
        if let Some(slot) = self.wave_schedule.iter_mut().find(|s| s.wave == wave) {
            slot.spawned = true;
        }
        self.current_wave = self.current_wave.max(wave);
    }

    /// Whether every scheduled wave has fired.
    pub fn all_waves_spawned(&self) -> bool {
        self.wave_schedule.iter().all(|slot| slot.spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InvasionState {
        InvasionState::new(
            1,
            "alex".into(),
            IslandBounds::new((-32.0, 0.0, -32.0), (32.0, 64.0, 32.0)),
            250.0,
            DifficultyProfile::for_tier(3),
            1000,
            vec![
                WaveSlot {
                    wave: 1,
                    due_tick: 1100,
                    spawned: false,
                },
                WaveSlot {
                    wave: 2,
                    due_tick: 1200,
                    spawned: false,
                },
            ],
        )
    }

    #[test]
    fn mount_lookup_both_ways() {
        let mut st = state();
        st.register_mount(10, 20);
        assert_eq!(st.mount_of(10), Some(20));
        assert_eq!(st.rider_of(20), Some(10));
        assert_eq!(st.mount_of(20), None);
        assert_eq!(st.rider_of(10), None);
    }

    #[test]
    fn dead_rider_releases_mapping() {
        let mut st = state();
        st.mob_ids.insert(20);
        st.register_mount(10, 20);
        // Rider 10 never entered mob_ids (already dead).
        st.release_dead_riders();
        assert_eq!(st.mount_of(10), None);
        assert!(st.mob_ids.contains(&20));
    }

    #[test]
    fn due_waves_in_order() {
        let st = state();
        assert!(st.due_waves(1050).is_empty());
        assert_eq!(st.due_waves(1150), vec![1]);
        assert_eq!(st.due_waves(5000), vec![1, 2]);
    }

    #[test]
    fn mark_wave_advances_counter() {
        let mut st = state();
        st.mark_wave_spawned(1);
        assert_eq!(st.current_wave, 1);
        assert_eq!(st.due_waves(5000), vec![2]);
        assert!(!st.all_waves_spawned());
        st.mark_wave_spawned(2);
        assert!(st.all_waves_spawned());
    }

    #[test]
    fn timeout_check() {
        let st = state();
        assert!(!st.timed_out(3000, 6000));
        assert!(st.timed_out(7001, 6000));
    }
}

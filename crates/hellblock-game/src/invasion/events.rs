//! Invasion notifications for external collaborators (messaging, rewards,
//! statistics). Fire-and-forget: the director queues them, the server layer
//! drains them.

/// Why an invasion was recorded as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Exceeded the max duration.
    Timeout,
    /// No eligible player stayed inside bounds.
    Abandoned,
}

/// Events produced by the invasion director.
#[derive(Debug, Clone)]
pub enum InvasionEvent {
    InvasionStarted {
        island_id: u64,
        tier: u32,
        wave_count: u32,
    },
    WaveSpawned {
        island_id: u64,
        wave: u32,
        mob_count: u32,
    },
    BossSpawned {
        island_id: u64,
        runtime_id: u64,
    },
    BossKilled {
        island_id: u64,
    },
    RetreatTriggered {
        island_id: u64,
        remaining: u32,
    },
    InvasionVictory {
        island_id: u64,
        loot: Vec<(String, u32)>,
    },
    InvasionFailed {
        island_id: u64,
        reason: FailureReason,
    },
}

//! The world collaborator seam.
//!
//! Invasion orchestration depends only on this trait, never on concrete
//! world types, so the state machines stay testable against any world
//! implementation. `IslandWorld` is the in-process implementation.

use crate::bounds::IslandBounds;

/// Capability surface the orchestrator needs from the hosting world.
pub trait WorldOps {
    /// Spawn an entity of the given type. Returns its runtime id, or `None`
    /// if the type is unknown.
    fn spawn_entity(&mut self, type_id: &str, pos: (f32, f32, f32)) -> Option<u64>;

    /// Remove an entity outright. `false` if it no longer exists.
    fn remove_entity(&mut self, runtime_id: u64) -> bool;

    /// Whether the entity still exists and is not dead. Entities removed by
    /// unrelated causes read as not alive, never as an error.
    fn is_alive(&mut self, runtime_id: u64) -> bool;

    fn entity_position(&mut self, runtime_id: u64) -> Option<(f32, f32, f32)>;

    /// All entities within `radius` of `center`, with positions.
    fn entities_near(&mut self, center: (f32, f32, f32), radius: f32)
        -> Vec<(u64, (f32, f32, f32))>;

    /// Point the entity at a goal; the world moves it there over time.
    fn steer_entity(&mut self, runtime_id: u64, target: (f32, f32, f32), speed: f32);

    fn teleport_entity(&mut self, runtime_id: u64, pos: (f32, f32, f32));

    /// Scale an entity's max health and attack damage (boss buffs).
    fn strengthen_entity(&mut self, runtime_id: u64, health_mult: f32, damage_mult: f32);

    /// Place a block (retreat portal frames).
    fn set_block(&mut self, pos: (i32, i32, i32), block: &str);

    /// Whether a sphere around `center` is free of entities and placed
    /// blocks.
    fn is_area_clear(&mut self, center: (f32, f32, f32), radius: f32) -> bool;

    /// Number of player mirrors currently inside the bounds.
    fn players_within(&mut self, bounds: &IslandBounds) -> u32;
}

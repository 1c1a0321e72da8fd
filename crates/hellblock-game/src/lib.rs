//! Game logic: ECS island world, invasion orchestration, and loot.

pub mod bounds;
pub mod components;
pub mod invasion;
pub mod island_world;
pub mod mob_registry;
pub mod world_ops;

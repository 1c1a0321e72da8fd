//! ECS components for invasion mobs and player mirrors.

use bevy_ecs::prelude::*;

/// Identity for an entity.
#[derive(Component, Debug, Clone)]
pub struct EntityId {
    pub unique_id: i64,
    pub runtime_id: u64,
}

/// Position in the world.
#[derive(Component, Debug, Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Steering goal: the movement system walks the entity toward `target` at
/// `speed` blocks per game tick, stopping on arrival.
#[derive(Component, Debug, Clone, Copy)]
pub struct MoveTarget {
    pub target: (f32, f32, f32),
    pub speed: f32,
}

/// Health points.
#[derive(Component, Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

/// Base attack damage dealt by this mob.
#[derive(Component, Debug, Clone, Copy)]
pub struct AttackDamage(pub f32);

/// The mob type identifier, e.g. `"minecraft:zombified_piglin"`.
#[derive(Component, Debug, Clone)]
pub struct MobType(pub String);

/// Marker: this entity is a mob (non-player).
#[derive(Component, Debug)]
pub struct Mob;

/// Marker: this entity is an invasion boss.
#[derive(Component, Debug)]
pub struct Boss;

/// Marker: this entity is a player mirror.
#[derive(Component, Debug)]
pub struct Player;

/// Marker: this entity is dead (pending cleanup).
#[derive(Component, Debug)]
pub struct Dead;

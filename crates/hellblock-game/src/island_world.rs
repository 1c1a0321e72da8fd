//! ECS island world: bevy_ecs World, entity management, tick systems, and
//! the event queue consumed by the server layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use bevy_ecs::prelude::*;

use crate::bounds::IslandBounds;
use crate::components::*;
use crate::mob_registry::MobRegistry;
use crate::world_ops::WorldOps;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Outgoing events queued by ECS operations for the server layer to consume.
#[derive(Resource, Default)]
pub struct OutgoingEvents {
    pub events: Vec<GameEvent>,
}

/// Global tick counter (incremented every 50 ms).
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// Thread-safe entity ID allocator (shared by mobs and player mirrors).
#[derive(Resource)]
pub struct EntityIdAllocator {
    next: AtomicI64,
}

impl EntityIdAllocator {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }

    /// Allocate the next unique entity ID.
    pub fn allocate(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Game events (ECS → server layer)
// ---------------------------------------------------------------------------

/// Entity-level events produced by the world.
#[derive(Debug, Clone)]
pub enum GameEvent {
    MobSpawned {
        runtime_id: u64,
        mob_type: String,
        position: (f32, f32, f32),
    },
    MobDied {
        runtime_id: u64,
    },
    EntityRemoved {
        runtime_id: u64,
    },
}

// ---------------------------------------------------------------------------
// IslandWorld
// ---------------------------------------------------------------------------

/// The ECS world hosting all islands' mobs and player mirrors.
pub struct IslandWorld {
    pub world: World,
    pub mob_registry: MobRegistry,
    /// Blocks placed through the seam (retreat portal frames).
    pub placed_blocks: HashMap<(i32, i32, i32), String>,
}

impl IslandWorld {
    /// Create a new world with the given starting entity ID.
    pub fn new(starting_entity_id: i64) -> Self {
        let mut world = World::new();
        world.insert_resource(OutgoingEvents::default());
        world.insert_resource(TickCounter::default());
        world.insert_resource(EntityIdAllocator::new(starting_entity_id));

        Self {
            world,
            mob_registry: MobRegistry::new(),
            placed_blocks: HashMap::new(),
        }
    }

    /// Run one game tick: steering movement, then dead cleanup.
    pub fn tick(&mut self) {
        self.world.resource_mut::<TickCounter>().0 += 1;
        system_move_targets(&mut self.world);
        system_cleanup_dead(&mut self.world);
    }

    /// Drain all pending outgoing events.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.world.resource_mut::<OutgoingEvents>().events)
    }

    /// Return the current tick count.
    pub fn current_tick(&mut self) -> u64 {
        self.world.resource::<TickCounter>().0
    }

    /// Spawn a mob entity. Returns its runtime id, or `None` if the type is
    /// unknown.
    pub fn spawn_mob(&mut self, type_id: &str, pos: (f32, f32, f32)) -> Option<u64> {
        let def = self.mob_registry.get(type_id)?.clone();
        let unique_id = self.world.resource::<EntityIdAllocator>().allocate();
        let runtime_id = unique_id as u64;

        let mut entity = self.world.spawn((
            EntityId {
                unique_id,
                runtime_id,
            },
            Position {
                x: pos.0,
                y: pos.1,
                z: pos.2,
            },
            Health {
                current: def.max_health,
                max: def.max_health,
            },
            AttackDamage(def.attack_damage),
            MobType(type_id.to_string()),
            Mob,
        ));
        if def.role == crate::mob_registry::MobRole::Boss {
            entity.insert(Boss);
        }

        self.world
            .resource_mut::<OutgoingEvents>()
            .events
            .push(GameEvent::MobSpawned {
                runtime_id,
                mob_type: type_id.to_string(),
                position: pos,
            });

        Some(runtime_id)
    }

    /// Spawn an ECS mirror entity for a player. Returns its runtime id.
    pub fn spawn_player(&mut self, pos: (f32, f32, f32)) -> u64 {
        let unique_id = self.world.resource::<EntityIdAllocator>().allocate();
        let runtime_id = unique_id as u64;
        self.world.spawn((
            EntityId {
                unique_id,
                runtime_id,
            },
            Position {
                x: pos.0,
                y: pos.1,
                z: pos.2,
            },
            Health {
                current: 20.0,
                max: 20.0,
            },
            Player,
        ));
        runtime_id
    }

    /// Despawn the ECS mirror entity for a player.
    pub fn despawn_player(&mut self, runtime_id: u64) {
        let mut to_despawn = None;
        let mut query = self
            .world
            .query_filtered::<(Entity, &EntityId), With<Player>>();
        for (entity, eid) in query.iter(&self.world) {
            if eid.runtime_id == runtime_id {
                to_despawn = Some(entity);
                break;
            }
        }
        if let Some(entity) = to_despawn {
            self.world.despawn(entity);
        }
    }

    /// Deal damage to a mob. Returns remaining health, or `None` if the mob
    /// no longer exists.
    pub fn damage_mob(&mut self, runtime_id: u64, damage: f32) -> Option<f32> {
        let target = self.find_mob_entity(runtime_id)?;

        let new_health = {
            let mut health = self.world.get_mut::<Health>(target)?;
            health.current = (health.current - damage).max(0.0);
            health.current
        };

        if new_health <= 0.0 {
            self.world
                .resource_mut::<OutgoingEvents>()
                .events
                .push(GameEvent::MobDied { runtime_id });
            self.world.entity_mut(target).insert(Dead);
        }

        Some(new_health)
    }

    /// All alive mob runtime ids (for status reporting).
    pub fn all_mob_ids(&mut self) -> Vec<u64> {
        let mut query = self
            .world
            .query_filtered::<&EntityId, (With<Mob>, Without<Dead>)>();
        query.iter(&self.world).map(|eid| eid.runtime_id).collect()
    }

    /// Find a mob entity by runtime_id (alive only).
    fn find_mob_entity(&mut self, runtime_id: u64) -> Option<Entity> {
        let mut query = self
            .world
            .query_filtered::<(Entity, &EntityId), (With<Mob>, Without<Dead>)>();
        for (entity, eid) in query.iter(&self.world) {
            if eid.runtime_id == runtime_id {
                return Some(entity);
            }
        }
        None
    }

    /// Find any alive entity (mob or player) by runtime_id.
    fn find_entity(&mut self, runtime_id: u64) -> Option<Entity> {
        let mut query = self
            .world
            .query_filtered::<(Entity, &EntityId), Without<Dead>>();
        for (entity, eid) in query.iter(&self.world) {
            if eid.runtime_id == runtime_id {
                return Some(entity);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// World seam implementation
// ---------------------------------------------------------------------------

impl WorldOps for IslandWorld {
    fn spawn_entity(&mut self, type_id: &str, pos: (f32, f32, f32)) -> Option<u64> {
        self.spawn_mob(type_id, pos)
    }

    fn remove_entity(&mut self, runtime_id: u64) -> bool {
        if let Some(entity) = self.find_mob_entity(runtime_id) {
            self.world
                .resource_mut::<OutgoingEvents>()
                .events
                .push(GameEvent::EntityRemoved { runtime_id });
            self.world.despawn(entity);
            true
        } else {
            false
        }
    }

    fn is_alive(&mut self, runtime_id: u64) -> bool {
        self.find_mob_entity(runtime_id).is_some()
    }

    fn entity_position(&mut self, runtime_id: u64) -> Option<(f32, f32, f32)> {
        let entity = self.find_entity(runtime_id)?;
        self.world
            .get::<Position>(entity)
            .map(|p| (p.x, p.y, p.z))
    }

    fn entities_near(
        &mut self,
        center: (f32, f32, f32),
        radius: f32,
    ) -> Vec<(u64, (f32, f32, f32))> {
        let radius_sq = radius * radius;
        let mut result = Vec::new();
        let mut query = self
            .world
            .query_filtered::<(&EntityId, &Position), Without<Dead>>();
        for (eid, pos) in query.iter(&self.world) {
            let dx = pos.x - center.0;
            let dy = pos.y - center.1;
            let dz = pos.z - center.2;
            if dx * dx + dy * dy + dz * dz <= radius_sq {
                result.push((eid.runtime_id, (pos.x, pos.y, pos.z)));
            }
        }
        result
    }

    fn steer_entity(&mut self, runtime_id: u64, target: (f32, f32, f32), speed: f32) {
        if let Some(entity) = self.find_mob_entity(runtime_id) {
            self.world
                .entity_mut(entity)
                .insert(MoveTarget { target, speed });
        }
    }

    fn teleport_entity(&mut self, runtime_id: u64, pos: (f32, f32, f32)) {
        if let Some(entity) = self.find_mob_entity(runtime_id) {
            if let Some(mut p) = self.world.get_mut::<Position>(entity) {
                p.x = pos.0;
                p.y = pos.1;
                p.z = pos.2;
            }
        }
    }

    fn strengthen_entity(&mut self, runtime_id: u64, health_mult: f32, damage_mult: f32) {
        if let Some(entity) = self.find_mob_entity(runtime_id) {
            if let Some(mut health) = self.world.get_mut::<Health>(entity) {
                health.max *= health_mult;
                health.current = health.max;
            }
            if let Some(mut damage) = self.world.get_mut::<AttackDamage>(entity) {
                damage.0 *= damage_mult;
            }
        }
    }

    fn set_block(&mut self, pos: (i32, i32, i32), block: &str) {
        self.placed_blocks.insert(pos, block.to_string());
    }

    fn is_area_clear(&mut self, center: (f32, f32, f32), radius: f32) -> bool {
        if !self.entities_near(center, radius).is_empty() {
            return false;
        }
        let radius_sq = radius * radius;
        !self.placed_blocks.keys().any(|&(x, y, z)| {
            let dx = x as f32 + 0.5 - center.0;
            let dy = y as f32 + 0.5 - center.1;
            let dz = z as f32 + 0.5 - center.2;
            dx * dx + dy * dy + dz * dz <= radius_sq
        })
    }

    fn players_within(&mut self, bounds: &IslandBounds) -> u32 {
        let mut count = 0;
        let mut query = self.world.query_filtered::<&Position, With<Player>>();
        for pos in query.iter(&self.world) {
            if bounds.contains((pos.x, pos.y, pos.z)) {
                count += 1;
            }
        }
        count
    }
}

// ---------------------------------------------------------------------------
// Systems (manual, called by IslandWorld::tick)
// ---------------------------------------------------------------------------

/// Walk entities toward their steering goal, stopping on arrival.
fn system_move_targets(world: &mut World) {
    let mut query =
        world.query_filtered::<(&mut Position, &MoveTarget), (With<Mob>, Without<Dead>)>();
    for (mut pos, goal) in query.iter_mut(world) {
        let dx = goal.target.0 - pos.x;
        let dy = goal.target.1 - pos.y;
        let dz = goal.target.2 - pos.z;
        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
        if dist < 0.1 {
            continue;
        }
        let step = goal.speed.min(dist);
        pos.x += dx / dist * step;
        pos.y += dy / dist * step;
        pos.z += dz / dist * step;
    }
}

/// Remove dead entities after their death events have been emitted.
fn system_cleanup_dead(world: &mut World) {
    let dead_entities: Vec<Entity> = world
        .query_filtered::<Entity, With<Dead>>()
        .iter(world)
        .collect();
    for entity in dead_entities {
        world.despawn(entity);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

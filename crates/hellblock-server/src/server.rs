//! The running server: owns the ECS world, the invasion director, and the
//! persistent store, and drives all three from one tick timeline.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use hellblock_game::bounds::IslandBounds;
use hellblock_game::invasion::director::InvasionDirector;
use hellblock_game::invasion::eligibility::IslandSnapshot;
use hellblock_game::invasion::events::InvasionEvent;
use hellblock_game::invasion::state::InvasionPhase;
use hellblock_game::island_world::{GameEvent, IslandWorld};
use hellblock_game::world_ops::WorldOps;
use hellblock_storage::{unix_timestamp, InvasionStore, IslandRecord, StorageError};

use crate::config::ServerConfig;

pub struct HellblockServer {
    world: IslandWorld,
    director: InvasionDirector,
    store: InvasionStore,
    rng: StdRng,
    update_interval_ticks: u64,
    scan_interval_secs: u64,
    next_scan_at: u64,
    /// Islands with an operator-declared siege; invasions are suppressed.
    sieges: HashSet<u64>,
    severe_weather: bool,
}

impl HellblockServer {
    pub fn new(config: &ServerConfig) -> Result<Self, StorageError> {
        let mut store = InvasionStore::open(&config.storage.path)?;
        if store.islands.is_empty() {
            store.islands.insert(
                1,
                IslandRecord {
                    id: 1,
                    owner: "alex".into(),
                    level: 250.0,
                    bounds_min: [-48.0, 0.0, -48.0],
                    bounds_max: [48.0, 96.0, 48.0],
                    abandoned: false,
                },
            );
            store.save()?;
            info!("no islands on record, seeded a default island");
        }

        Ok(Self {
            world: IslandWorld::new(1000),
            director: InvasionDirector::new(config.invasion.to_invasion_config()),
            store,
            rng: StdRng::from_entropy(),
            update_interval_ticks: config.server.update_interval_ticks.max(1),
            scan_interval_secs: config.server.scan_interval_secs.max(1),
            // First scan fires one interval after startup.
            next_scan_at: unix_timestamp() + config.server.scan_interval_secs.max(1),
            sieges: HashSet::new(),
            severe_weather: false,
        })
    }

    /// One 50 ms game tick: ECS systems, then the invasion cadences.
    pub fn game_tick(&mut self) {
        self.world.tick();
        let tick = self.world.current_tick();

        if tick.is_multiple_of(self.update_interval_ticks) {
            self.director
                .update(&mut self.world, &mut self.store, tick, &mut self.rng);
        }

        let now = unix_timestamp();
        if now >= self.next_scan_at {
            self.next_scan_at = now + self.scan_interval_secs;
            let snapshots = self.build_snapshots();
            self.director
                .scan(&snapshots, &mut self.store, now, tick, &mut self.rng);
            if let Err(e) = self.store.save() {
                warn!("failed to save invasion store: {e}");
            }
        }

        self.publish_events();
    }

    /// Snapshot every recorded island for the eligibility gate.
    fn build_snapshots(&mut self) -> Vec<IslandSnapshot> {
        let mut snapshots = Vec::with_capacity(self.store.islands.len());
        for record in self.store.islands.values() {
            let bounds = IslandBounds::from_record(record);
            snapshots.push(IslandSnapshot {
                island_id: record.id,
                owner: record.owner.clone(),
                level: record.level,
                bounds,
                abandoned: record.abandoned,
                online_player_present: self.world.players_within(&bounds) > 0,
                siege_active: self.sieges.contains(&record.id),
                severe_weather: self.severe_weather,
            });
        }
        snapshots
    }

    fn publish_events(&mut self) {
        for event in self.director.drain_events() {
            match event {
                InvasionEvent::InvasionStarted {
                    island_id,
                    tier,
                    wave_count,
                } => info!("island {island_id}: invasion started (tier {tier}, {wave_count} waves)"),
                InvasionEvent::WaveSpawned {
                    island_id,
                    wave,
                    mob_count,
                } => info!("island {island_id}: wave {wave} spawned ({mob_count} mobs)"),
                InvasionEvent::BossSpawned {
                    island_id,
                    runtime_id,
                } => info!("island {island_id}: boss spawned (entity {runtime_id})"),
                InvasionEvent::BossKilled { island_id } => {
                    info!("island {island_id}: boss killed")
                }
                InvasionEvent::RetreatTriggered {
                    island_id,
                    remaining,
                } => info!("island {island_id}: {remaining} mobs retreating"),
                InvasionEvent::InvasionVictory { island_id, loot } => {
                    info!("island {island_id}: invasion repelled, {} reward stacks", loot.len());
                    for (item, amount) in loot {
                        info!("island {island_id}: reward {amount}x {item}");
                    }
                }
                InvasionEvent::InvasionFailed { island_id, reason } => {
                    info!("island {island_id}: invasion failed ({reason:?})")
                }
            }
        }

        for event in self.world.drain_events() {
            match event {
                GameEvent::MobSpawned {
                    runtime_id,
                    mob_type,
                    position,
                } => debug!("spawned {mob_type} as entity {runtime_id} at {position:?}"),
                GameEvent::MobDied { runtime_id } => debug!("entity {runtime_id} died"),
                GameEvent::EntityRemoved { runtime_id } => {
                    debug!("entity {runtime_id} removed")
                }
            }
        }
    }

    /// Handle one console line. Returns `true` when the server should stop.
    pub fn handle_console_command(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match cmd {
            "status" => self.cmd_status(),
            "invade" => self.cmd_invade(&args),
            "player" => self.cmd_player(&args),
            "kill" => self.cmd_kill(&args),
            "slay" => self.cmd_slay(&args),
            "siege" => self.cmd_siege(&args),
            "weather" => {
                self.severe_weather = !self.severe_weather;
                if self.severe_weather {
                    info!("severe weather started (invasions suppressed)");
                } else {
                    info!("severe weather cleared");
                }
            }
            "stop" => {
                info!("Stopping server...");
                return true;
            }
            "help" => {
                info!("commands: status | invade <island> | player <x> <y> <z> | kill <entity> | slay <island> | siege <island> | weather | stop");
            }
            _ => warn!("unknown command: {cmd} (try 'help')"),
        }
        false
    }

    fn cmd_status(&mut self) {
        let tick = self.world.current_tick();
        let mobs = self.world.all_mob_ids().len();
        info!(
            "tick {tick}, {} islands, {} active invasions, {mobs} mobs",
            self.store.islands.len(),
            self.director.active_count(),
        );
        for record in self.store.islands.values() {
            match self.director.state(record.id) {
                Some(st) => {
                    let phase = match st.phase {
                        InvasionPhase::Waves => "waves",
                        InvasionPhase::Boss => "boss",
                        InvasionPhase::Retreat(_) => "retreat",
                    };
                    info!(
                        "island {}: tier {} invasion, phase {phase}, wave {}/{}, {} mobs",
                        record.id,
                        st.profile.tier,
                        st.current_wave,
                        st.profile.wave_count,
                        st.mob_ids.len(),
                    );
                }
                None => info!(
                    "island {}: quiet (owner {}, level {})",
                    record.id, record.owner, record.level
                ),
            }
        }
    }

    fn cmd_invade(&mut self, args: &[&str]) {
        let Some(island_id) = args.first().and_then(|a| a.parse::<u64>().ok()) else {
            warn!("usage: invade <island>");
            return;
        };
        let Some(snapshot) = self
            .build_snapshots()
            .into_iter()
            .find(|s| s.island_id == island_id)
        else {
            warn!("no island {island_id} on record");
            return;
        };
        let tick = self.world.current_tick();
        if self
            .director
            .force_start(&snapshot, &mut self.store, unix_timestamp(), tick)
        {
            info!("forced invasion on island {island_id}");
        } else {
            warn!("island {island_id} already has an active invasion");
        }
    }

    fn cmd_player(&mut self, args: &[&str]) {
        let coords: Vec<f32> = args.iter().filter_map(|a| a.parse().ok()).collect();
        if coords.len() != 3 {
            warn!("usage: player <x> <y> <z>");
            return;
        }
        let id = self.world.spawn_player((coords[0], coords[1], coords[2]));
        info!("spawned player mirror as entity {id}");
    }

    fn cmd_kill(&mut self, args: &[&str]) {
        let Some(runtime_id) = args.first().and_then(|a| a.parse::<u64>().ok()) else {
            warn!("usage: kill <entity>");
            return;
        };
        match self.world.damage_mob(runtime_id, f32::MAX) {
            Some(_) => info!("killed entity {runtime_id}"),
            None => warn!("no living mob with id {runtime_id}"),
        }
    }

    /// Kill every entity of an island's invasion (the fast-forward lever).
    fn cmd_slay(&mut self, args: &[&str]) {
        let Some(island_id) = args.first().and_then(|a| a.parse::<u64>().ok()) else {
            warn!("usage: slay <island>");
            return;
        };
        let Some(st) = self.director.state(island_id) else {
            warn!("no active invasion on island {island_id}");
            return;
        };
        let mut targets: Vec<u64> = st.mob_ids.iter().copied().collect();
        targets.extend(st.boss_id);
        for id in &targets {
            self.world.damage_mob(*id, f32::MAX);
        }
        info!("slew {} invasion entities on island {island_id}", targets.len());
    }

    /// Toggle the mutually-exclusive siege event for an island.
    fn cmd_siege(&mut self, args: &[&str]) {
        let Some(island_id) = args.first().and_then(|a| a.parse::<u64>().ok()) else {
            warn!("usage: siege <island>");
            return;
        };
        if self.sieges.remove(&island_id) {
            info!("siege ended on island {island_id}");
        } else {
            self.sieges.insert(island_id);
            info!("siege started on island {island_id} (invasions suppressed)");
        }
    }

    /// Cancel running invasions and flush the store.
    pub fn shutdown(&mut self) {
        self.director.cancel_all(&mut self.world);
        if let Err(e) = self.store.save() {
            warn!("failed to save invasion store on shutdown: {e}");
        } else {
            info!("invasion store saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server(name: &str) -> HellblockServer {
        let dir = std::env::temp_dir().join(format!("hellblock-server-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = ServerConfig {
            storage: crate::config::StorageSection {
                path: dir.to_string_lossy().into_owned(),
            },
            ..Default::default()
        };
        HellblockServer::new(&config).unwrap()
    }

    #[test]
    fn seeds_default_island() {
        let server = test_server("seed");
        assert_eq!(server.store.islands.len(), 1);
        assert!(server.store.islands.contains_key(&1));
    }

    #[test]
    fn stop_command_requests_shutdown() {
        let mut server = test_server("stop");
        assert!(!server.handle_console_command("status"));
        assert!(!server.handle_console_command("nonsense"));
        assert!(server.handle_console_command("stop"));
    }

    #[test]
    fn forced_invasion_then_ticks() {
        let mut server = test_server("invade");
        server.handle_console_command("player 0 48 0");
        server.handle_console_command("invade 1");
        assert!(server.director.is_active(1));

        // Rejected while one is running.
        server.handle_console_command("invade 1");
        assert_eq!(server.director.active_count(), 1);

        // Drive past the first wave's due tick.
        for _ in 0..400 {
            server.game_tick();
        }
        let st = server.director.state(1).unwrap();
        assert!(st.current_wave >= 1);
        assert!(!st.mob_ids.is_empty());
    }

    #[test]
    fn siege_and_weather_toggles_feed_snapshots() {
        let mut server = test_server("siege");

        server.handle_console_command("siege 1");
        assert!(server.build_snapshots()[0].siege_active);
        server.handle_console_command("siege 1");
        assert!(!server.build_snapshots()[0].siege_active);

        server.handle_console_command("weather");
        assert!(server.build_snapshots()[0].severe_weather);
        server.handle_console_command("weather");
        assert!(!server.build_snapshots()[0].severe_weather);
    }

    #[test]
    fn slay_kills_invasion_entities() {
        let mut server = test_server("slay");
        server.handle_console_command("player 0 48 0");
        server.handle_console_command("invade 1");
        for _ in 0..400 {
            server.game_tick();
        }
        assert!(!server.director.state(1).unwrap().mob_ids.is_empty());

        server.handle_console_command("slay 1");
        server.world.tick();
        assert!(server.world.all_mob_ids().len() <= 1); // boss may not be up yet
    }
}

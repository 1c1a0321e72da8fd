//! Invasion mob type definitions.
//!
//! A registry of the Nether mobs an invasion can field, plus the boss. Wave
//! composition draws from the `Raider` role; `Mount` types only appear under
//! a rider.

/// How a mob type is used when assembling a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobRole {
    /// Regular wave filler.
    Raider,
    /// Spawned under a rider, never alone.
    Mount,
    /// The final-wave boss.
    Boss,
}

/// Definition of a mob type.
#[derive(Debug, Clone)]
pub struct MobDefinition {
    /// Identifier, e.g. `"minecraft:zombified_piglin"`.
    pub type_id: String,
    pub display_name: String,
    pub role: MobRole,
    pub max_health: f32,
    pub attack_damage: f32,
    /// Whether this raider can spawn mounted on a strider.
    pub can_ride: bool,
}

/// Registry of mob types an invasion can spawn.
pub struct MobRegistry {
    mobs: Vec<MobDefinition>,
}

impl Default for MobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MobRegistry {
    pub fn new() -> Self {
        Self {
            mobs: vec![
                MobDefinition {
                    type_id: "minecraft:zombified_piglin".into(),
                    display_name: "Zombified Piglin".into(),
                    role: MobRole::Raider,
                    max_health: 20.0,
                    attack_damage: 5.0,
                    can_ride: true,
                },
                MobDefinition {
                    type_id: "minecraft:wither_skeleton".into(),
                    display_name: "Wither Skeleton".into(),
                    role: MobRole::Raider,
                    max_health: 20.0,
                    attack_damage: 8.0,
                    can_ride: false,
                },
                MobDefinition {
                    type_id: "minecraft:blaze".into(),
                    display_name: "Blaze".into(),
                    role: MobRole::Raider,
                    max_health: 20.0,
                    attack_damage: 6.0,
                    can_ride: false,
                },
                MobDefinition {
                    type_id: "minecraft:magma_cube".into(),
                    display_name: "Magma Cube".into(),
                    role: MobRole::Raider,
                    max_health: 16.0,
                    attack_damage: 6.0,
                    can_ride: false,
                },
                MobDefinition {
                    type_id: "minecraft:strider".into(),
                    display_name: "Strider".into(),
                    role: MobRole::Mount,
                    max_health: 20.0,
                    attack_damage: 0.0,
                    can_ride: false,
                },
                MobDefinition {
                    type_id: "hellblock:infernal_warden".into(),
                    display_name: "Infernal Warden".into(),
                    role: MobRole::Boss,
                    max_health: 200.0,
                    attack_damage: 12.0,
                    can_ride: false,
                },
            ],
        }
    }

    /// Look up a mob definition by type identifier.
    pub fn get(&self, type_id: &str) -> Option<&MobDefinition> {
        self.mobs.iter().find(|m| m.type_id == type_id)
    }

    /// All regular wave raiders.
    pub fn raiders(&self) -> Vec<&MobDefinition> {
        self.mobs
            .iter()
            .filter(|m| m.role == MobRole::Raider)
            .collect()
    }

    /// The boss definition.
    pub fn boss(&self) -> &MobDefinition {
        self.mobs
            .iter()
            .find(|m| m.role == MobRole::Boss)
            .expect("registry always contains a boss")
    }

    /// The mount type used for mounted raiders.
    pub fn mount(&self) -> &MobDefinition {
        self.mobs
            .iter()
            .find(|m| m.role == MobRole::Mount)
            .expect("registry always contains a mount")
    }
}

//! Difficulty-scaled loot generation.
//!
//! Base drops are chance-gated table rolls scaled by the profile's loot
//! multiplier. A single scaling knob blends island progression and tier to
//! drive duplication (more at the top end) and placement skips (fewer at the
//! top end), so reward sets stay variable instead of deterministically
//! farmable.

use rand::seq::SliceRandom;
use rand::Rng;

use super::difficulty::DifficultyProfile;

/// Hard cap on reward stacks per invasion.
pub const LOOT_CAP: usize = 7;

/// Chance of the guaranteed rare book reward.
const RARE_BOOK_CHANCE: f64 = 0.30;
/// Chance of one of the alternative special rewards.
const SPECIAL_CHANCE: f64 = 0.10;

const SPECIAL_REWARDS: [&str; 3] = [
    "minecraft:netherite_scrap",
    "minecraft:ancient_debris",
    "minecraft:wither_skeleton_skull",
];

/// One row of the static loot table.
#[derive(Debug, Clone)]
pub struct LootEntry {
    pub item: &'static str,
    pub min: u32,
    pub max: u32,
    /// Roll-to-drop probability in [0,1].
    pub chance: f64,
}

/// The static invasion loot table, defined once at startup.
pub fn default_table() -> Vec<LootEntry> {
    vec![
        LootEntry {
            item: "minecraft:quartz",
            min: 4,
            max: 12,
            chance: 0.90,
        },
        LootEntry {
            item: "minecraft:gold_nugget",
            min: 6,
            max: 16,
            chance: 0.80,
        },
        LootEntry {
            item: "minecraft:glowstone_dust",
            min: 3,
            max: 8,
            chance: 0.70,
        },
        LootEntry {
            item: "minecraft:magma_cream",
            min: 2,
            max: 6,
            chance: 0.60,
        },
        LootEntry {
            item: "minecraft:blaze_powder",
            min: 2,
            max: 5,
            chance: 0.50,
        },
        LootEntry {
            item: "minecraft:nether_wart",
            min: 2,
            max: 6,
            chance: 0.45,
        },
        LootEntry {
            item: "minecraft:ghast_tear",
            min: 1,
            max: 2,
            chance: 0.25,
        },
    ]
}

/// Blend of island progression and encounter difficulty in [0,1].
pub fn scaling_factor(island_level: f64, tier: u32) -> f64 {
    0.7 * (island_level / 1000.0).clamp(0.0, 1.0) + 0.3 * (tier as f64 / 10.0).clamp(0.0, 1.0)
}

/// Probability each placed item is duplicated once.
pub fn duplication_chance(scaling: f64) -> f64 {
    0.05 + (0.25 - 0.05) * scaling
}

/// Probability a placement attempt is skipped.
pub fn skip_chance(scaling: f64) -> f64 {
    0.30 - (0.30 - 0.10) * scaling
}

/// Generate the reward list for a finished invasion.
pub fn generate_loot<R: Rng>(
    rng: &mut R,
    table: &[LootEntry],
    profile: &DifficultyProfile,
    island_level: f64,
) -> Vec<(String, u32)> {
    let scaling = scaling_factor(island_level, profile.tier);
    let dup_chance = duplication_chance(scaling);
    let skip = skip_chance(scaling);

    // Base table rolls, scaled by the profile multiplier.
    let mut rolled: Vec<(String, u32)> = Vec::new();
    for entry in table {
        if rng.gen::<f64>() >= entry.chance {
            continue;
        }
        let base = rng.gen_range(entry.min..=entry.max);
        let amount = ((base as f64 * profile.loot_multiplier).round() as u32).max(1);
        rolled.push((entry.item.to_string(), amount));
    }

    // Distribute into the output slots: each placement attempt can be
    // skipped, each placed item can spawn one duplicate attempt.
    let mut out: Vec<(String, u32)> = Vec::new();
    for (item, amount) in rolled {
        if rng.gen::<f64>() < skip {
            continue;
        }
        out.push((item.clone(), amount));
        if rng.gen::<f64>() < dup_chance && rng.gen::<f64>() >= skip {
            out.push((item, amount));
        }
    }

    // Rare extras bypass the skip roll.
    if rng.gen::<f64>() < RARE_BOOK_CHANCE {
        out.push(("minecraft:enchanted_book".to_string(), 1));
    }
    if rng.gen::<f64>() < SPECIAL_CHANCE {
        let special = SPECIAL_REWARDS[rng.gen_range(0..SPECIAL_REWARDS.len())];
        out.push((special.to_string(), 1));
    }

    out.shuffle(rng);
    out.truncate(LOOT_CAP);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn scaling_factor_scenario() {
        // islandLevel=1000, tier=10 → 1.0, dup 0.25, skip 0.10
        let s = scaling_factor(1000.0, 10);
        assert!((s - 1.0).abs() < 1e-9);
        assert!((duplication_chance(s) - 0.25).abs() < 1e-9);
        assert!((skip_chance(s) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn scaling_factor_floor() {
        let s = scaling_factor(0.0, 0);
        assert!((s - 0.0).abs() < 1e-9);
        assert!((duplication_chance(s) - 0.05).abs() < 1e-9);
        assert!((skip_chance(s) - 0.30).abs() < 1e-9);
    }

    #[test]
    fn scaling_factor_monotonic_and_bounded() {
        let mut last = -1.0;
        for level in [0.0, 100.0, 500.0, 1000.0, 5000.0] {
            let s = scaling_factor(level, 5);
            assert!(s >= last);
            assert!((0.0..=1.0).contains(&s));
            last = s;
        }
        let mut last = -1.0;
        for tier in 0..=20 {
            let s = scaling_factor(400.0, tier);
            assert!(s >= last);
            assert!((0.0..=1.0).contains(&s));
            last = s;
        }
    }

    #[test]
    fn loot_respects_cap_and_amounts() {
        let table = default_table();
        let mut rng = StdRng::seed_from_u64(11);
        for tier in 1..=10 {
            let profile = DifficultyProfile::for_tier(tier);
            for _ in 0..200 {
                let loot = generate_loot(&mut rng, &table, &profile, 800.0);
                assert!(loot.len() <= LOOT_CAP);
                assert!(loot.iter().all(|(_, amount)| *amount >= 1));
            }
        }
    }

    #[test]
    fn higher_multiplier_scales_amounts() {
        let table = vec![LootEntry {
            item: "minecraft:quartz",
            min: 10,
            max: 10,
            chance: 1.0,
        }];
        let mut rng = StdRng::seed_from_u64(3);
        let low = DifficultyProfile::for_tier(1); // multiplier 1.0
        let high = DifficultyProfile::for_tier(10); // multiplier 2.35

        let amount_of = |rng: &mut StdRng, profile: &DifficultyProfile| loop {
            let loot = generate_loot(rng, &table, profile, 0.0);
            if let Some((_, amount)) = loot.iter().find(|(item, _)| item == "minecraft:quartz") {
                return *amount;
            }
        };
        assert_eq!(amount_of(&mut rng, &low), 10);
        assert_eq!(amount_of(&mut rng, &high), 24); // round(10 * 2.35)
    }

    #[test]
    fn special_rewards_come_from_known_set() {
        let table = default_table();
        let mut rng = StdRng::seed_from_u64(77);
        let profile = DifficultyProfile::for_tier(5);
        let known: Vec<&str> = table
            .iter()
            .map(|e| e.item)
            .chain(SPECIAL_REWARDS)
            .chain(["minecraft:enchanted_book"])
            .collect();

        for _ in 0..300 {
            for (item, _) in generate_loot(&mut rng, &table, &profile, 500.0) {
                assert!(known.contains(&item.as_str()), "unknown item {item}");
            }
        }
    }
}

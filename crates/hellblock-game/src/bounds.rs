//! Axis-aligned island bounds math.

use rand::Rng;

use hellblock_storage::IslandRecord;

/// The axis-aligned box an island claims. All invasion activity (spawns,
/// retreat exits, steering nudges) stays inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IslandBounds {
    pub min: (f32, f32, f32),
    pub max: (f32, f32, f32),
}

impl IslandBounds {
    pub fn new(min: (f32, f32, f32), max: (f32, f32, f32)) -> Self {
        Self { min, max }
    }

    pub fn from_record(record: &IslandRecord) -> Self {
        Self {
            min: (
                record.bounds_min[0],
                record.bounds_min[1],
                record.bounds_min[2],
            ),
            max: (
                record.bounds_max[0],
                record.bounds_max[1],
                record.bounds_max[2],
            ),
        }
    }

    pub fn volume(&self) -> f32 {
        let dx = (self.max.0 - self.min.0).max(0.0);
        let dy = (self.max.1 - self.min.1).max(0.0);
        let dz = (self.max.2 - self.min.2).max(0.0);
        dx * dy * dz
    }

    pub fn contains(&self, pos: (f32, f32, f32)) -> bool {
        pos.0 >= self.min.0
            && pos.0 <= self.max.0
            && pos.1 >= self.min.1
            && pos.1 <= self.max.1
            && pos.2 >= self.min.2
            && pos.2 <= self.max.2
    }

    /// Clamp a position to stay inside the box.
    pub fn clamp(&self, pos: (f32, f32, f32)) -> (f32, f32, f32) {
        (
            pos.0.clamp(self.min.0, self.max.0),
            pos.1.clamp(self.min.1, self.max.1),
            pos.2.clamp(self.min.2, self.max.2),
        )
    }

    /// Whether `pos` is at least `margin` blocks inside every face.
    pub fn contains_with_margin(&self, pos: (f32, f32, f32), margin: f32) -> bool {
        pos.0 >= self.min.0 + margin
            && pos.0 <= self.max.0 - margin
            && pos.1 >= self.min.1 + margin
            && pos.1 <= self.max.1 - margin
            && pos.2 >= self.min.2 + margin
            && pos.2 <= self.max.2 - margin
    }

    /// Uniform random point inside the box.
    pub fn random_point(&self, rng: &mut impl Rng) -> (f32, f32, f32) {
        (
            sample_axis(rng, self.min.0, self.max.0),
            sample_axis(rng, self.min.1, self.max.1),
            sample_axis(rng, self.min.2, self.max.2),
        )
    }

    pub fn center(&self) -> (f32, f32, f32) {
        (
            (self.min.0 + self.max.0) * 0.5,
            (self.min.1 + self.max.1) * 0.5,
            (self.min.2 + self.max.2) * 0.5,
        )
    }
}

fn sample_axis(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

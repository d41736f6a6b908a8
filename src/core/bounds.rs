use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned world-space range enclosing a prim's geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// The empty range: any union with it yields the other operand.
    pub fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f64 {
        self.size().max_element()
    }
}

/// The host's active playback range, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: f64,
    pub end: f64,
}

impl FrameRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Integer frames from `trunc(start)` to `trunc(end)`, inclusive.
    pub fn frames(&self) -> impl Iterator<Item = i64> {
        (self.start.trunc() as i64)..=(self.end.trunc() as i64)
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start <= self.end
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self::new(1.0, 240.0)
    }
}

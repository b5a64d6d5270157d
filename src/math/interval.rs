use glam::DVec3;

/// Running minimum/maximum along one axis.
///
/// A fresh value is inverted (`min = f64::MAX`, `max = f64::MIN`) so the first
/// update always wins; `is_valid` tells whether anything was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl Default for MinMax {
    fn default() -> Self {
        Self {
            min: f64::MAX,
            max: f64::MIN,
        }
    }
}

impl MinMax {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Widen the interval to include `value`.
    pub fn update(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Widen the interval to include every value in `values`.
    pub fn extend(&mut self, values: &[f64]) {
        for &v in values {
            self.update(v);
        }
    }

    /// Length of the interval (`max - min`).
    pub fn extent(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Smallest interval covering both `self` and `other`.
    pub fn merge(&self, other: &MinMax) -> MinMax {
        MinMax {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl FromIterator<f64> for MinMax {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut mm = MinMax::default();
        for v in iter {
            mm.update(v);
        }
        mm
    }
}

/// Axis-aligned box kept as three independent intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub x: MinMax,
    pub y: MinMax,
    pub z: MinMax,
}

impl BoundingBox {
    pub fn update(&mut self, p: DVec3) {
        self.x.update(p.x);
        self.y.update(p.y);
        self.z.update(p.z);
    }

    pub fn is_valid(&self) -> bool {
        self.x.is_valid() && self.y.is_valid() && self.z.is_valid()
    }

    /// Inclusive containment test on all three axes.
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Sum of the three axis extents.
    pub fn extent_sum(&self) -> f64 {
        self.x.extent() + self.y.extent() + self.z.extent()
    }

    /// Split into `level³` equal cells ordered x-major, then y, then z.
    ///
    /// The last cell on each axis is closed at the original maximum so that
    /// rounding never leaves a sliver of the box uncovered.
    pub fn split(&self, level: usize) -> Vec<BoundingBox> {
        if level <= 1 {
            return vec![*self];
        }
        let cells = |mm: &MinMax| -> Vec<MinMax> {
            let step = mm.extent() / level as f64;
            (0..level)
                .map(|i| {
                    let max = if i + 1 < level {
                        mm.min + (i + 1) as f64 * step
                    } else {
                        mm.max
                    };
                    MinMax::new(mm.min + i as f64 * step, max)
                })
                .collect()
        };
        let xs = cells(&self.x);
        let ys = cells(&self.y);
        let zs = cells(&self.z);

        let mut boxes = Vec::with_capacity(level * level * level);
        for x in &xs {
            for y in &ys {
                for z in &zs {
                    boxes.push(BoundingBox {
                        x: *x,
                        y: *y,
                        z: *z,
                    });
                }
            }
        }
        boxes
    }
}

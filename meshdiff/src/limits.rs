//! Axis-aligned limits used to cull the point cloud and clip the result.

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

/// Closed interval `[min, max]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Endpoints in `[min, max]` order.
    pub fn endpoints(&self) -> [f64; 2] {
        [self.min, self.max]
    }
}

/// Optional range for each of the X, Y and Z axes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisLimits {
    ranges: [Option<Range>; 3],
}

impl AxisLimits {
    /// Limits with no axis populated.
    pub fn none() -> Self {
        Self::default()
    }

    /// Limits restricting only the Z axis.
    pub fn depth(z: Range) -> Self {
        Self::none().with(Axis::Z, z)
    }

    /// Limits restricting all three axes.
    pub fn cube(x: Range, y: Range, z: Range) -> Self {
        Self::none().with(Axis::X, x).with(Axis::Y, y).with(Axis::Z, z)
    }

    pub fn with(mut self, axis: Axis, range: Range) -> Self {
        self.ranges[axis.index()] = Some(range);
        self
    }

    pub fn get(&self, axis: Axis) -> Option<Range> {
        self.ranges[axis.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(Option::is_none)
    }

    /// Returns the three ranges if every axis is populated.
    pub fn all(&self) -> Option<[Range; 3]> {
        match self.ranges {
            [Some(x), Some(y), Some(z)] => Some([x, y, z]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        let r = Range::new(-1.0, 2.0);
        assert!(r.contains(-1.0));
        assert!(r.contains(2.0));
        assert!(!r.contains(2.0001));
    }

    #[test]
    fn cube_limits_are_complete() {
        let r = Range::new(0.0, 1.0);
        assert!(AxisLimits::cube(r, r, r).all().is_some());
        assert!(AxisLimits::depth(r).all().is_none());
        assert!(AxisLimits::none().is_empty());
        assert_eq!(AxisLimits::depth(r).get(Axis::Z), Some(r));
    }
}

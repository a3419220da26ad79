//! Bounded trait point allocation.
//!
//! Each prompted trait may receive between a feasibility floor and a ceiling:
//! the ceiling never exceeds the remaining budget or the per-trait cap, and
//! the floor reserves enough points that every later trait can still fill the
//! budget without breaking its own cap.

use crate::error::SetupError;

/// Validated `(totalBudget, perTraitCap, numTraits)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointBudget {
    total: u32,
    cap: u32,
    num_traits: usize,
}

/// Inclusive range of legal points for one trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointBounds {
    pub min: u32,
    pub max: u32,
}

impl PointBounds {
    pub fn contains(&self, points: u32) -> bool {
        (self.min..=self.max).contains(&points)
    }

    /// Every legal value, in ascending order.
    pub fn options(&self) -> impl Iterator<Item = u32> {
        self.min..=self.max
    }
}

impl PointBudget {
    pub fn new(total: u32, cap: u32, num_traits: usize) -> Result<Self, SetupError> {
        if num_traits == 0 {
            return Err(SetupError::ConfigurationInvariantViolation(
                "at least one trait is required".into(),
            ));
        }
        if (num_traits as u64) * u64::from(cap) < u64::from(total) {
            return Err(SetupError::ConfigurationInvariantViolation(format!(
                "{num_traits} traits capped at {cap} cannot reach a budget of {total}"
            )));
        }
        Ok(Self {
            total,
            cap,
            num_traits,
        })
    }

    /// The 60 point, 20 per trait, 5 trait configuration.
    pub fn standard() -> Self {
        Self {
            total: 60,
            cap: 20,
            num_traits: 5,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn num_traits(&self) -> usize {
        self.num_traits
    }

    /// Index of the trait that always receives the exact remainder.
    pub fn last_index(&self) -> usize {
        self.num_traits - 1
    }

    /// Legal points for trait `index` when `points_so_far` are already spent.
    ///
    /// Crossed bounds mean the caller reached a state the configuration should
    /// have made impossible; this is reported instead of clamped.
    pub fn bounds(&self, index: usize, points_so_far: u32) -> Result<PointBounds, SetupError> {
        if index >= self.num_traits {
            return Err(SetupError::ConfigurationInvariantViolation(format!(
                "trait index {index} out of range for {} traits",
                self.num_traits
            )));
        }
        if points_so_far > self.total {
            return Err(SetupError::ConfigurationInvariantViolation(format!(
                "{points_so_far} points assigned exceeds the budget of {}",
                self.total
            )));
        }
        let remaining = self.total - points_so_far;
        let later_traits = (self.num_traits - index - 1) as u64;
        let headroom = u64::from(self.cap) * later_traits;
        let max = self.cap.min(remaining);
        let min = u64::from(remaining).saturating_sub(headroom) as u32;
        if min > max {
            return Err(SetupError::ConfigurationInvariantViolation(format!(
                "point bounds crossed at trait {index}: min {min} > max {max} with {points_so_far} assigned"
            )));
        }
        Ok(PointBounds { min, max })
    }

    /// Value every trait from `index` onwards is forced to, if any.
    ///
    /// Either the budget is spent (all zeros) or the floor has reached the cap
    /// (all capped). In both cases no further prompt is needed.
    pub fn forced_fill(&self, index: usize, points_so_far: u32) -> Result<Option<u32>, SetupError> {
        if points_so_far == self.total {
            return Ok(Some(0));
        }
        let bounds = self.bounds(index, points_so_far)?;
        if bounds.min == self.cap {
            return Ok(Some(self.cap));
        }
        Ok(None)
    }
}

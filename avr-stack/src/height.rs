//! Stack height tracking

use serde::{Deserialize, Serialize};
use std::fmt;

/// Worst-case stack usage of a firmware image
///
/// Ordered so that `Unbounded` is greater than every bounded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackUsage {
    /// Maximum height in bytes
    Bounded(u32),
    /// No finite maximum could be established
    Unbounded,
}

impl StackUsage {
    /// Bytes for a bounded result
    pub fn bytes(self) -> Option<u32> {
        match self {
            StackUsage::Bounded(bytes) => Some(bytes),
            StackUsage::Unbounded => None,
        }
    }

    #[inline]
    pub fn is_unbounded(self) -> bool {
        self == StackUsage::Unbounded
    }
}

impl fmt::Display for StackUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackUsage::Bounded(bytes) => write!(f, "{} bytes", bytes),
            StackUsage::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Running maximum of observed stack heights
///
/// Never decreases. Promotion to unbounded is one-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxHeight {
    max: u32,
    unbounded: bool,
}

impl MaxHeight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observed height into the maximum; negative heights never raise it
    #[inline]
    pub fn observe(&mut self, height: i32) {
        if height > 0 {
            self.max = self.max.max(height as u32);
        }
    }

    /// Promote to unbounded
    pub fn promote(&mut self) {
        self.unbounded = true;
    }

    /// Largest finite height observed, even after promotion
    pub fn peak(&self) -> u32 {
        self.max
    }

    pub fn get(&self) -> StackUsage {
        if self.unbounded {
            StackUsage::Unbounded
        } else {
            StackUsage::Bounded(self.max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_keeps_maximum() {
        let mut max = MaxHeight::new();
        assert_eq!(max.get(), StackUsage::Bounded(0));
        max.observe(3);
        max.observe(1);
        max.observe(-2);
        assert_eq!(max.get(), StackUsage::Bounded(3));
    }

    #[test]
    fn test_promotion_is_sticky() {
        let mut max = MaxHeight::new();
        max.observe(4);
        max.promote();
        max.observe(10);
        assert_eq!(max.get(), StackUsage::Unbounded);
        assert_eq!(max.peak(), 10);
    }

    #[test]
    fn test_usage_ordering() {
        assert!(StackUsage::Bounded(u32::MAX) < StackUsage::Unbounded);
        assert!(StackUsage::Bounded(2) < StackUsage::Bounded(4));
    }

    #[test]
    fn test_usage_display() {
        assert_eq!(StackUsage::Bounded(4).to_string(), "4 bytes");
        assert_eq!(StackUsage::Unbounded.to_string(), "unbounded");
        assert_eq!(StackUsage::Bounded(4).bytes(), Some(4));
        assert_eq!(StackUsage::Unbounded.bytes(), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tracker_is_monotone(heights in prop::collection::vec(-64i32..256, 1..64)) {
                let mut max = MaxHeight::new();
                let mut previous = 0;
                for &h in &heights {
                    max.observe(h);
                    let now = max.peak();
                    prop_assert!(now >= previous);
                    prop_assert!(now as i64 >= h as i64);
                    previous = now;
                }
            }
        }
    }
}

//! Median over a sliding multiset of values
//!

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

/// A multiset of f64 values supporting ordered lookup at both ends
///
#[derive(Default)]
struct ValueMultiset {
    counts: BTreeMap<OrderedFloat<f64>, usize>,
    len: usize,
}

impl ValueMultiset {
    fn insert(&mut self, value: f64) {
        *self.counts.entry(OrderedFloat(value)).or_insert(0) += 1;
        self.len += 1;
    }

    /// Return false if `value` is not present
    fn remove(&mut self, value: f64) -> bool {
        let key = OrderedFloat(value);
        let Some(count) = self.counts.get_mut(&key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&key);
        }
        self.len -= 1;
        true
    }

    fn first(&self) -> Option<f64> {
        self.counts.first_key_value().map(|(k, _)| k.0)
    }

    fn last(&self) -> Option<f64> {
        self.counts.last_key_value().map(|(k, _)| k.0)
    }

    fn pop_first(&mut self) -> Option<f64> {
        let value = self.first()?;
        self.remove(value);
        Some(value)
    }

    fn pop_last(&mut self) -> Option<f64> {
        let value = self.last()?;
        self.remove(value);
        Some(value)
    }
}

/// Median of a changing set of values with O(log n) add and remove
///
/// Values are split into a lower and upper half, where the lower half holds the extra value when
/// the total count is odd. The median of an even count is the mean of the two middle values.
///
#[derive(Default)]
pub struct RollingMedian {
    lower: ValueMultiset,
    upper: ValueMultiset,
}

impl RollingMedian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lower.len + self.upper.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, value: f64) {
        assert!(!value.is_nan());
        match self.lower.last() {
            Some(lower_max) if value > lower_max => self.upper.insert(value),
            _ => self.lower.insert(value),
        }
        self.rebalance();
    }

    /// Remove one copy of `value`, returning false if it is not present
    pub fn remove(&mut self, value: f64) -> bool {
        let removed = self.lower.remove(value) || self.upper.remove(value);
        if removed {
            self.rebalance();
        }
        removed
    }

    pub fn median(&self) -> Option<f64> {
        let lower_max = self.lower.last()?;
        if self.lower.len > self.upper.len {
            Some(lower_max)
        } else {
            let upper_min = self.upper.first()?;
            Some((lower_max + upper_min) / 2.0)
        }
    }

    fn rebalance(&mut self) {
        while self.lower.len > self.upper.len + 1 {
            let value = self.lower.pop_last().unwrap();
            self.upper.insert(value);
        }
        while self.upper.len > self.lower.len {
            let value = self.upper.pop_first().unwrap();
            self.lower.insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_median() {
        let mut rm = RollingMedian::new();
        assert_eq!(rm.median(), None);
        assert!(rm.is_empty());

        rm.add(5.0);
        assert_eq!(rm.median(), Some(5.0));
        rm.add(1.0);
        assert_eq!(rm.median(), Some(3.0));
        rm.add(3.0);
        assert_eq!(rm.median(), Some(3.0));
        rm.add(3.0);
        assert_eq!(rm.median(), Some(3.0));
        rm.add(10.0);
        assert_eq!(rm.median(), Some(3.0));
        assert_eq!(rm.len(), 5);

        assert!(rm.remove(3.0));
        assert_eq!(rm.median(), Some(4.0));
        assert!(rm.remove(1.0));
        assert_eq!(rm.median(), Some(5.0));
        assert!(!rm.remove(7.0));
        assert_eq!(rm.len(), 3);

        assert!(rm.remove(10.0));
        assert!(rm.remove(5.0));
        assert!(rm.remove(3.0));
        assert!(rm.is_empty());
        assert_eq!(rm.median(), None);
    }

    #[test]
    fn test_rolling_median_duplicates() {
        let mut rm = RollingMedian::new();
        for _ in 0..4 {
            rm.add(2.0);
        }
        rm.add(1.0);
        assert_eq!(rm.median(), Some(2.0));
        assert!(rm.remove(2.0));
        assert!(rm.remove(2.0));
        assert_eq!(rm.median(), Some(2.0));
        assert!(rm.remove(2.0));
        assert_eq!(rm.median(), Some(1.5));
    }
}

use std::collections::VecDeque;

/// Default number of recent values kept for lag/rolling covariates
pub const DEFAULT_WINDOW_CAPACITY: usize = 7;

/// Fixed-capacity FIFO of the most recent known or predicted values.
///
/// Pushing onto a full window evicts the oldest value.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Seed with the tail of `history` (at most `capacity` values, oldest first)
    pub fn seeded<I>(capacity: usize, history: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut window = Self::new(capacity);
        for value in history {
            window.push(value);
        }
        window
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Most recently pushed value
    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Mean of the last `n` values (all of them if fewer are held)
    pub fn mean_of_last(&self, n: usize) -> Option<f64> {
        let take = n.min(self.values.len());
        if take == 0 {
            return None;
        }
        let sum: f64 = self.values.iter().rev().take(take).sum();
        Some(sum / take as f64)
    }

    /// Mean of the whole window
    pub fn mean(&self) -> Option<f64> {
        self.mean_of_last(self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values oldest first
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut window = SlidingWindow::new(3);
        window.push(1.0);
        window.push(2.0);
        window.push(3.0);
        assert_eq!(window.values(), vec![1.0, 2.0, 3.0]);

        window.push(4.0);
        assert_eq!(window.values(), vec![2.0, 3.0, 4.0]);
        assert_eq!(window.last(), Some(4.0));
    }

    #[test]
    fn test_seeded_keeps_tail() {
        let window = SlidingWindow::seeded(7, (1..=10).map(|v| v as f64));
        assert_eq!(window.values(), vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_means() {
        let window = SlidingWindow::seeded(7, vec![10.0, 12.0, 9.0, 11.0, 13.0, 8.0, 14.0]);
        assert_eq!(window.mean_of_last(3), Some((13.0 + 8.0 + 14.0) / 3.0));
        assert_eq!(window.mean(), Some(11.0));

        let short = SlidingWindow::seeded(7, vec![4.0, 6.0]);
        assert_eq!(short.mean_of_last(3), Some(5.0));
    }

    #[test]
    fn test_empty_window() {
        let window = SlidingWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 7);
        assert_eq!(window.last(), None);
        assert_eq!(window.mean(), None);
    }

    proptest! {
        #[test]
        fn prop_window_holds_last_pushes_in_order(values in prop::collection::vec(-1e6f64..1e6, 0..50)) {
            let mut window = SlidingWindow::new(7);
            for v in &values {
                window.push(*v);
                prop_assert!(window.len() <= 7);
            }
            let expected: Vec<f64> = values.iter().copied().skip(values.len().saturating_sub(7)).collect();
            prop_assert_eq!(window.values(), expected);
        }
    }
}

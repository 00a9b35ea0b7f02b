//! Fixed-window moving average over integer distance samples.

use crate::util::div_round_nearest;

/// Ring buffer of the last `window` samples with an incrementally maintained sum.
///
/// Each `push` is O(1). Until the window has filled, the mean is taken over the samples
/// seen so far. The mean is rounded to the nearest integer, ties away from zero.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buf: Vec<i32>,
    next: usize,
    len: usize,
    sum: i64,
}

impl MovingAverage {
    /// `window` is clamped to at least 1.
    pub fn new(window: usize) -> Self {
        Self {
            buf: vec![0; window.max(1)],
            next: 0,
            len: 0,
            sum: 0,
        }
    }

    /// Add a sample and return the current smoothed value.
    pub fn push(&mut self, sample: i32) -> i32 {
        let cap = self.buf.len();
        if self.len == cap {
            self.sum -= i64::from(self.buf[self.next]);
        } else {
            self.len += 1;
        }
        self.buf[self.next] = sample;
        self.sum += i64::from(sample);
        self.next = (self.next + 1) % cap;
        self.mean_unchecked()
    }

    /// Current smoothed value, `None` before the first sample.
    pub fn current(&self) -> Option<i32> {
        (self.len > 0).then(|| self.mean_unchecked())
    }

    fn mean_unchecked(&self) -> i32 {
        let len = i64::try_from(self.len).unwrap_or(i64::MAX);
        // the mean of i32 samples always fits in i32
        div_round_nearest(self.sum, len) as i32
    }

    pub fn window(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vector() {
        let mut ma = MovingAverage::new(5);
        let out: Vec<i32> = [10, 20, 30, 40, 50, 60]
            .into_iter()
            .map(|s| ma.push(s))
            .collect();
        assert_eq!(out, vec![10, 15, 20, 25, 30, 40]);
        assert!(ma.is_full());
    }

    #[test]
    fn zero_window_behaves_as_passthrough() {
        let mut ma = MovingAverage::new(0);
        assert_eq!(ma.window(), 1);
        assert_eq!(ma.push(7), 7);
        assert_eq!(ma.push(-3), -3);
    }

    #[test]
    fn current_is_none_until_first_sample() {
        let mut ma = MovingAverage::new(3);
        assert!(ma.is_empty());
        assert_eq!(ma.current(), None);
        ma.push(4);
        ma.push(5);
        // (4 + 5) / 2 = 4.5 rounds away from zero
        assert_eq!(ma.current(), Some(5));
    }

    #[test]
    fn extreme_samples_do_not_overflow() {
        let mut ma = MovingAverage::new(4);
        for _ in 0..10 {
            assert_eq!(ma.push(i32::MAX), i32::MAX);
        }
        for _ in 0..4 {
            ma.push(i32::MIN);
        }
        assert_eq!(ma.current(), Some(i32::MIN));
    }
}

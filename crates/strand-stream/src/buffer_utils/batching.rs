use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

/// Buffers raw stream parts between delta flushes
///
/// Flushes are driven two ways: the ticker (time window, used inside
/// `tokio::select!`) and a size cap checked with [`PartBatcher::is_full`].
pub struct PartBatcher<T> {
    batch: Vec<T>,
    ticker: Interval,
    window_ms: u64,
    max_parts: usize,
}

impl<T> PartBatcher<T> {
    /// Create a batcher flushing every `window_ms` or at `max_parts` buffered parts
    pub fn new(window_ms: u64, max_parts: usize) -> Self {
        let mut ticker = interval(Duration::from_millis(window_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            batch: Vec::new(),
            ticker,
            window_ms,
            max_parts: max_parts.max(1),
        }
    }

    pub fn push(&mut self, part: T) {
        self.batch.push(part);
    }

    /// Size cap reached; flush without waiting for the ticker
    pub fn is_full(&self) -> bool {
        self.batch.len() >= self.max_parts
    }

    /// Take the current batch, leaving an empty one
    pub fn take(&mut self) -> Vec<T> {
        std::mem::take(&mut self.batch)
    }

    /// Buffered parts, oldest first
    pub fn parts(&self) -> &[T] {
        &self.batch
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Ticker for use in `tokio::select!`
    pub fn ticker(&mut self) -> &mut Interval {
        &mut self.ticker
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batcher_basic() {
        let mut batcher = PartBatcher::<i32>::new(50, 3);

        batcher.push(1);
        batcher.push(2);
        assert!(!batcher.is_full());
        batcher.push(3);

        assert_eq!(batcher.len(), 3);
        assert!(batcher.is_full());

        let batch = batcher.take();
        assert_eq!(batch, vec![1, 2, 3]);
        assert!(batcher.is_empty());
    }

    #[tokio::test]
    async fn test_zero_cap_is_clamped() {
        let mut batcher = PartBatcher::<i32>::new(0, 0);
        assert!(!batcher.is_full());
        batcher.push(1);
        assert!(batcher.is_full());
        assert_eq!(batcher.window_ms(), 0);
    }
}

//! Round-robin interleaving of pending work across many queues.

use crate::buffered::BufferedFrontier;
use crate::frontier::Frontier;

/// Anything that hands out pending work one item at a time.
pub trait UpdateSource {
    type Item;

    /// Take the next item, or `None` once this source is exhausted.
    fn pop_update(&mut self) -> Option<Self::Item>;

    /// Whether the source has finished for good.
    fn done(&self) -> bool;
}

impl<F: Frontier> UpdateSource for BufferedFrontier<F> {
    type Item = Vec<u8>;

    fn pop_update(&mut self) -> Option<Vec<u8>> {
        BufferedFrontier::pop_update(self)
    }

    fn done(&self) -> bool {
        BufferedFrontier::done(self)
    }
}

/// Lazily yields `(item, source_index)` pairs, sweeping the sources in
/// order and taking one item from each per sweep.
///
/// A source that returns `None` is dropped for the rest of the scan, so the
/// iterator only pops as many items as are actually consumed.
#[derive(Debug)]
pub struct Zigzag<'a, S> {
    sources: &'a mut [S],
    live: Vec<usize>,
    next: Vec<usize>,
    pos: usize,
}

impl<'a, S: UpdateSource> Zigzag<'a, S> {
    /// Start a sweep over the sources that are not yet done.
    pub fn new(sources: &'a mut [S]) -> Self {
        let live = (0..sources.len()).filter(|&i| !sources[i].done()).collect();
        Self {
            sources,
            live,
            next: Vec::new(),
            pos: 0,
        }
    }
}

impl<S: UpdateSource> Iterator for Zigzag<'_, S> {
    type Item = (S::Item, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos == self.live.len() {
                if self.next.is_empty() {
                    return None;
                }
                self.live = std::mem::take(&mut self.next);
                self.pos = 0;
            }
            let idx = self.live[self.pos];
            self.pos += 1;
            if let Some(item) = self.sources[idx].pop_update() {
                self.next.push(idx);
                return Some((item, idx));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSource {
        vals: Vec<u32>,
    }

    impl UpdateSource for MockSource {
        type Item = u32;

        fn pop_update(&mut self) -> Option<u32> {
            if self.vals.is_empty() {
                None
            } else {
                Some(self.vals.remove(0))
            }
        }

        fn done(&self) -> bool {
            self.vals.is_empty()
        }
    }

    fn sources(vals: &[&[u32]]) -> Vec<MockSource> {
        vals.iter()
            .map(|v| MockSource { vals: v.to_vec() })
            .collect()
    }

    #[test]
    fn test_zigzag_order() {
        let mut fs = sources(&[&[0], &[1, 3, 4], &[], &[2]]);
        let order: Vec<(u32, usize)> = Zigzag::new(&mut fs).collect();
        assert_eq!(order, vec![(0, 0), (1, 1), (2, 3), (3, 1), (4, 1)]);
    }

    #[test]
    fn test_zigzag_is_lazy() {
        let mut fs = sources(&[&[0, 2], &[1, 3]]);
        let first: Vec<(u32, usize)> = Zigzag::new(&mut fs).take(3).collect();
        assert_eq!(first, vec![(0, 0), (1, 1), (2, 0)]);
        // The unconsumed item is still queued
        assert_eq!(fs[1].vals, vec![3]);
    }

    #[test]
    fn test_zigzag_empty() {
        let mut fs = sources(&[&[], &[]]);
        assert_eq!(Zigzag::new(&mut fs).next(), None);
    }
}

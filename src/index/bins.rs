//! Fixed-size genomic bins of interval ids.
//!
//! An interval is registered in every bin its span touches, so a point query
//! only has to scan the single bin containing the position.

/// A set of fixed-size bins over one chromosome.
#[derive(Clone, Debug)]
pub struct Bins {
    /// The size of each bin in positions.
    bin_size: u32,

    /// The interval ids registered in each bin.
    bins: Vec<Vec<u32>>,

    /// The number of distinct intervals registered.
    len: usize,
}

impl Bins {
    /// Creates an empty set of bins. `bin_size` must be non-zero.
    pub(crate) fn new(bin_size: u32) -> Self {
        debug_assert!(bin_size > 0);

        Self {
            bin_size,
            bins: Vec::new(),
            len: 0,
        }
    }

    /// Registers interval `id` spanning `start..=end`.
    pub(crate) fn insert(&mut self, id: u32, start: u32, end: u32) {
        let first = self.bin_of(start);
        let last = self.bin_of(end);

        if self.bins.len() <= last {
            self.bins.resize_with(last + 1, Vec::new);
        }

        for bin in &mut self.bins[first..=last] {
            bin.push(id);
        }

        self.len += 1;
    }

    /// Gets the ids registered in the bin containing `position`.
    pub fn candidates(&self, position: u32) -> &[u32] {
        self.bins
            .get(self.bin_of(position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Gets the size of each bin.
    pub fn bin_size(&self) -> u32 {
        self.bin_size
    }

    /// Gets the number of bins allocated.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Gets the number of distinct intervals registered.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no intervals are registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the bin index of `position`.
    fn bin_of(&self, position: u32) -> usize {
        (position / self.bin_size) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_within_one_bin() {
        let mut bins = Bins::new(100);
        bins.insert(0, 110, 150);

        assert_eq!(bins.num_bins(), 2);
        assert_eq!(bins.candidates(120), &[0]);
        assert!(bins.candidates(50).is_empty());
        assert!(bins.candidates(10_000).is_empty());
    }

    #[test]
    fn test_interval_crossing_bin_boundaries() {
        let mut bins = Bins::new(100);
        bins.insert(0, 50, 250);
        bins.insert(1, 199, 200);

        assert_eq!(bins.len(), 2);
        assert_eq!(bins.candidates(0), &[0]);
        assert_eq!(bins.candidates(150), &[0, 1]);
        assert_eq!(bins.candidates(299), &[0, 1]);
        assert!(bins.candidates(300).is_empty());
    }
}

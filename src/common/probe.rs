/// The linear probe sequence of a key: `(hash + i) mod capacity` for
/// `i = 0..capacity`.
///
/// The addition is done in `usize`, so the sequence never wraps at `u32::MAX`
/// before the modulo is taken.
#[derive(Clone, Debug)]
pub(crate) struct Probe {
    start: usize,
    i: usize,
    capacity: usize,
}

impl Probe {
    pub(crate) fn new(hash: u32, capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            start: hash as usize % capacity,
            i: 0,
            capacity,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.capacity {
            return None;
        }
        let index = (self.start + self.i) % self.capacity;
        self.i += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.capacity - self.i;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for Probe {}

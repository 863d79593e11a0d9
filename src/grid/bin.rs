/// The particle indices currently filed in one grid cell.
///
/// `capacity` is the logical slot count; it doubles whenever an append finds
/// the bin full. Order among the stored indices carries no meaning.
#[derive(Debug, Clone)]
pub struct Bin {
    indices: Vec<usize>,
    capacity: usize,
}

impl Bin {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            indices: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Empties the bin but keeps its capacity.
    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Appends `particle`, doubling the capacity first if the bin is full.
    pub fn append(&mut self, particle: usize) {
        if self.indices.len() == self.capacity {
            let grown = self.capacity * 2;
            self.indices.reserve_exact(grown - self.indices.len());
            self.capacity = grown;
        }
        self.indices.push(particle);
    }

    /// Removes `particle`, shifting later entries left.
    /// Returns `false` (bin untouched) if the particle is not filed here.
    pub fn remove(&mut self, particle: usize) -> bool {
        match self.indices.iter().position(|&i| i == particle) {
            Some(slot) => {
                self.indices.remove(slot);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_and_overflow(initial: usize) {
        let mut bin = Bin::with_capacity(initial);
        for i in 0..initial {
            bin.append(i * 3);
        }
        assert_eq!(bin.capacity(), initial);

        bin.append(usize::MAX);
        assert_eq!(bin.capacity(), initial * 2);
        assert_eq!(bin.len(), initial + 1);
        for i in 0..initial {
            assert_eq!(bin.indices()[i], i * 3);
        }
        assert_eq!(bin.indices()[initial], usize::MAX);
    }

    #[test]
    fn capacity_doubles_from_one() {
        fill_and_overflow(1);
    }

    #[test]
    fn capacity_doubles_from_twenty() {
        fill_and_overflow(20);
    }

    #[test]
    fn capacity_doubles_from_one_thousand() {
        fill_and_overflow(1000);
    }

    #[test]
    fn repeated_growth_keeps_doubling() {
        let mut bin = Bin::with_capacity(1);
        for i in 0..9 {
            bin.append(i);
        }
        assert_eq!(bin.capacity(), 16);
        assert_eq!(bin.indices(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn remove_shifts_tail_left() {
        let mut bin = Bin::with_capacity(4);
        for i in [10, 11, 12, 13] {
            bin.append(i);
        }
        assert!(bin.remove(11));
        assert_eq!(bin.indices(), &[10, 12, 13]);
        assert_eq!(bin.capacity(), 4);
    }

    #[test]
    fn remove_missing_leaves_bin_untouched() {
        let mut bin = Bin::with_capacity(4);
        bin.append(5);
        bin.append(6);
        assert!(!bin.remove(7));
        assert_eq!(bin.indices(), &[5, 6]);

        let mut empty = Bin::with_capacity(2);
        assert!(!empty.remove(0));
        assert!(empty.is_empty());
    }
}

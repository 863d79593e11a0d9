//! Spatial bins over the square domain.
//!
//! Each bin sits behind its own lock so migration only contends on the two
//! bins a particle leaves and enters. The force phase never locks: it takes
//! a [`GridView`] through `&mut BinGrid`, which the borrow checker keeps
//! from overlapping with any migration.

mod bin;
mod shape;

pub use bin::Bin;
pub use shape::GridShape;

use crate::error::BinningError;
use crate::particle::Particle;
use parking_lot::Mutex;
use simulation_common::Vec2;

pub struct BinGrid {
    shape: GridShape,
    bins: Vec<Mutex<Bin>>,
}

impl BinGrid {
    /// Allocates `num_bins` empty bins of `initial_capacity` slots laid out over the domain.
    pub fn new(num_bins: usize, domain_size: f64, initial_capacity: usize) -> Self {
        let shape = GridShape::new(num_bins.max(1), domain_size);
        let bins = (0..shape.num_bins())
            .map(|_| Mutex::new(Bin::with_capacity(initial_capacity)))
            .collect();
        Self { shape, bins }
    }

    #[inline(always)]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    #[inline(always)]
    pub fn locate(&self, pos: Vec2) -> (usize, usize) {
        self.shape.locate(pos)
    }

    /// Rebuilds every bin's contents from scratch. Only used before the first step.
    pub fn assign_all(&mut self, particles: &[Particle]) {
        for bin in self.bins.iter_mut() {
            bin.get_mut().clear();
        }
        for (i, particle) in particles.iter().enumerate() {
            let (row, col) = self.shape.locate(particle.pos);
            let bin = self.shape.index(row, col);
            self.bins[bin].get_mut().append(i);
        }
    }

    /// Files `particle` in `bin`, holding only that bin's lock.
    pub fn append(&self, bin: usize, particle: usize) {
        self.bins[bin].lock().append(particle);
    }

    /// Unfiles `particle` from `bin`, holding only that bin's lock.
    pub fn remove(&self, bin: usize, particle: usize) -> Result<(), BinningError> {
        let mut guard = self.bins[bin].lock();
        if guard.remove(particle) {
            return Ok(());
        }
        let (row, col) = self.shape.row_col(bin);
        Err(BinningError::ParticleNotFound {
            particle,
            bin,
            row,
            col,
            contents: guard.indices().to_vec(),
        })
    }

    /// Moves `particle` between bins. The two locks are taken one after the other, never nested.
    pub fn migrate(&self, particle: usize, from: usize, to: usize) -> Result<(), BinningError> {
        self.remove(from, particle)?;
        self.append(to, particle);
        Ok(())
    }

    /// Lock-free read access to every bin for the duration of the borrow.
    pub fn view(&mut self) -> GridView<'_> {
        GridView {
            shape: &self.shape,
            bins: self.bins.iter_mut().map(|m| &*m.get_mut()).collect(),
        }
    }

    /// Current particle count per bin, row-major.
    pub fn occupancy(&mut self) -> Vec<usize> {
        self.bins.iter_mut().map(|m| m.get_mut().len()).collect()
    }

    /// Verifies that every particle is filed exactly once, in the bin containing its position.
    pub fn check_partition(&mut self, particles: &[Particle]) -> Result<(), BinningError> {
        let mut filed_in = vec![None; particles.len()];
        let mut seen = vec![0usize; particles.len()];
        let mut binned = 0;

        for (bin_idx, bin) in self.bins.iter_mut().enumerate() {
            let bin = bin.get_mut();
            binned += bin.len();
            for &particle in bin.indices() {
                // An index past the store can only come from corruption; count it as unbinnable
                let Some(count) = seen.get_mut(particle) else {
                    return Err(BinningError::MembershipCount { particle, found: 0 });
                };
                *count += 1;
                filed_in[particle] = Some(bin_idx);
            }
        }

        if binned != particles.len() {
            return Err(BinningError::Conservation { binned, particles: particles.len() });
        }

        for (i, particle) in particles.iter().enumerate() {
            if seen[i] != 1 {
                return Err(BinningError::MembershipCount { particle: i, found: seen[i] });
            }
            let (row, col) = self.shape.locate(particle.pos);
            let expected = self.shape.index(row, col);
            if let Some(filed) = filed_in[i] {
                if filed != expected {
                    return Err(BinningError::WrongBin {
                        particle: i,
                        x: particle.pos.x,
                        y: particle.pos.y,
                        filed,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    /// Releases every bin's storage.
    pub fn teardown(self) {
        let (slots, empty) = self
            .bins
            .into_iter()
            .map(Mutex::into_inner)
            .fold((0, 0), |(slots, empty), bin| (slots + bin.capacity(), empty + bin.is_empty() as usize));
        log::debug!("Released bin storage ({} slots, {} bins empty at exit).", slots, empty);
    }
}

/// Shared, unlocked view of all bins, valid while no migration can run.
pub struct GridView<'a> {
    shape: &'a GridShape,
    bins: Vec<&'a Bin>,
}

impl<'a> GridView<'a> {
    #[inline(always)]
    pub fn locate(&self, pos: Vec2) -> (usize, usize) {
        self.shape.locate(pos)
    }

    /// The up-to-9 bins around `(row, col)`, in no particular order.
    #[inline(always)]
    pub fn neighbors_of(&self, row: usize, col: usize) -> impl Iterator<Item = &'a Bin> + '_ {
        self.shape.neighbor_indices(row, col).map(move |i| self.bins[i])
    }

    #[cfg(test)]
    pub fn bin(&self, row: usize, col: usize) -> &'a Bin {
        self.bins[self.shape.index(row, col)]
    }
}

use simulation_common::Vec2;

/// Splits `num_bins` into `(rows, cols)`.
///
/// `rows` is the largest divisor of `num_bins` not exceeding its square root,
/// so the layout is as square as the bin count allows. Prime counts degrade
/// to a single row.
pub fn compute_grid_shape(num_bins: usize) -> (usize, usize) {
    let root = (num_bins as f64).sqrt() as usize;
    let rows = (1..=root.max(1))
        .rev()
        .find(|r| num_bins % r == 0)
        .unwrap_or(1);
    (rows, num_bins / rows)
}

/// Row-major bin layout over the square domain `[0, domain_size]^2`.
/// Rows run along `y`, columns along `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
    pub bin_width: f64,  // x extent of one bin
    pub bin_height: f64, // y extent of one bin
}

impl GridShape {
    pub fn new(num_bins: usize, domain_size: f64) -> Self {
        let (rows, cols) = compute_grid_shape(num_bins);
        Self {
            rows,
            cols,
            bin_width: domain_size / cols.max(1) as f64,
            bin_height: domain_size / rows as f64,
        }
    }

    #[inline(always)]
    pub fn num_bins(&self) -> usize {
        self.rows * self.cols
    }

    // Calculates the (row, col) of the bin containing `pos`
    #[inline(always)]
    pub fn locate(&self, pos: Vec2) -> (usize, usize) {
        // Negative and NaN coordinates saturate to 0 in the cast
        let row = (pos.y / self.bin_height).floor() as usize;
        let col = (pos.x / self.bin_width).floor() as usize;
        // Clamp to grid dimensions; a particle sitting exactly on the far wall belongs to the last bin
        (row.min(self.rows - 1), col.min(self.cols - 1))
    }

    #[inline(always)]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline(always)]
    pub fn row_col(&self, bin: usize) -> (usize, usize) {
        (bin / self.cols, bin % self.cols)
    }

    /// Flat indices of the up-to-9 bins in `row±1 × col±1`, clamped to the grid.
    pub fn neighbor_indices(&self, row: usize, col: usize) -> impl Iterator<Item = usize> + '_ {
        let rows = row.saturating_sub(1)..=(row + 1).min(self.rows - 1);
        rows.flat_map(move |r| {
            let cols = col.saturating_sub(1)..=(col + 1).min(self.cols - 1);
            cols.map(move |c| self.index(r, c))
        })
    }

    /// Whether 8-neighbour traversal sees every pair within `cutoff`.
    pub fn covers_cutoff(&self, cutoff: f64) -> bool {
        self.bin_width >= cutoff && self.bin_height >= cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_bins_make_three_by_four() {
        assert_eq!(compute_grid_shape(12), (3, 4));
    }

    #[test]
    fn prime_bin_count_falls_back_to_single_row() {
        assert_eq!(compute_grid_shape(7), (1, 7));
        assert_eq!(compute_grid_shape(101), (1, 101));
    }

    #[test]
    fn shape_is_deterministic_and_exact() {
        for n in 1..500 {
            let (rows, cols) = compute_grid_shape(n);
            assert_eq!(rows * cols, n);
            assert!(rows <= cols);
            assert_eq!(compute_grid_shape(n), (rows, cols));
        }
        assert_eq!(compute_grid_shape(1), (1, 1));
        assert_eq!(compute_grid_shape(16), (4, 4));
        assert_eq!(compute_grid_shape(250), (10, 25));
    }

    #[test]
    fn locate_clamps_to_grid() {
        let shape = GridShape::new(12, 1.2);
        assert_eq!(shape.locate(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(shape.locate(Vec2::new(1.2, 1.2)), (2, 3));
        assert_eq!(shape.locate(Vec2::new(-0.1, 5.0)), (2, 0));
        assert_eq!(shape.locate(Vec2::new(0.35, 0.45)), (1, 1));
    }

    #[test]
    fn neighbors_are_clamped_without_wraparound() {
        let shape = GridShape::new(12, 1.2); // 3 x 4
        let mut corner: Vec<usize> = shape.neighbor_indices(0, 0).collect();
        corner.sort_unstable();
        assert_eq!(corner, vec![0, 1, 4, 5]);

        let mut interior: Vec<usize> = shape.neighbor_indices(1, 1).collect();
        interior.sort_unstable();
        assert_eq!(interior, vec![0, 1, 2, 4, 5, 6, 8, 9, 10]);

        let mut far_edge: Vec<usize> = shape.neighbor_indices(2, 3).collect();
        far_edge.sort_unstable();
        assert_eq!(far_edge, vec![6, 7, 10, 11]);
    }

    #[test]
    fn single_row_grid_has_horizontal_neighbors_only() {
        let shape = GridShape::new(7, 0.7);
        let mut n: Vec<usize> = shape.neighbor_indices(0, 3).collect();
        n.sort_unstable();
        assert_eq!(n, vec![2, 3, 4]);
        assert!(shape.covers_cutoff(0.05));
        assert!(!shape.covers_cutoff(0.2));
    }
}

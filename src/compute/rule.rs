//! Cell transition rules.

use super::Dims;

/// A pure per-cell transition function.
///
/// `next_state` computes the state of cell `index` in the next generation
/// from the current generation `grid`. Implementations must not keep mutable
/// state between calls: workers invoke the same rule concurrently on
/// disjoint indices of the same grid.
pub trait Rule<T>: Sync {
    fn next_state(&self, grid: &[T], index: usize, dims: Dims) -> T;
}

impl<T, F> Rule<T> for F
where
    F: Fn(&[T], usize, Dims) -> T + Sync,
{
    #[inline]
    fn next_state(&self, grid: &[T], index: usize, dims: Dims) -> T {
        self(grid, index, dims)
    }
}

/// Positive modulo: wraps negative offsets onto `0..m`.
#[inline]
pub fn pmod(v: isize, m: usize) -> usize {
    v.rem_euclid(m as isize) as usize
}

/// Toroidal Moore-neighborhood rule on binary cells (B3/S23).
///
/// A cell is alive in the next generation if it has exactly 3 live
/// neighbors, or if it is alive and has exactly 2. Row offsets wrap modulo
/// `rows` and column offsets modulo `cols`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifeRule;

impl LifeRule {
    /// Number of live cells among the 8 neighbors of `index`.
    pub fn live_neighbors(grid: &[u8], index: usize, dims: Dims) -> u8 {
        let (row, col) = dims.coords(index);
        let (row, col) = (row as isize, col as isize);

        let mut sum = 0;
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = pmod(row + dr, dims.rows);
                let c = pmod(col + dc, dims.cols);
                sum += grid[dims.index(r, c)];
            }
        }
        sum
    }
}

impl Rule<u8> for LifeRule {
    #[inline]
    fn next_state(&self, grid: &[u8], index: usize, dims: Dims) -> u8 {
        match (grid[index], Self::live_neighbors(grid, index, dims)) {
            (_, 3) => 1,
            (1, 2) => 1,
            _ => 0,
        }
    }
}

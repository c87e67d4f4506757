//! # Symbolic Matrices
//!
//! Square matrices of [`RatFunc`] cells, used for metrics and their
//! inverses. Inversion is exact Gauss–Jordan elimination; diagonal matrices
//! are inverted cell by cell.

use crate::error::CasError;
use crate::ratfunc::RatFunc;

/// Square matrix stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymMatrix {
    size: usize,
    cells: Vec<RatFunc>,
}

impl SymMatrix {
    /// All-zero matrix.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![RatFunc::zero(); size * size],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::new(size);
        for i in 0..size {
            matrix.set(i, i, RatFunc::one());
        }
        matrix
    }

    /// Build from rows. `None` when the rows do not form a square.
    pub fn from_rows(rows: Vec<Vec<RatFunc>>) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        Some(Self {
            size,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> &RatFunc {
        &self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: RatFunc) {
        self.cells[row * self.size + col] = value;
    }

    /// Every `m[i][j] - m[j][i]` is exactly zero.
    pub fn is_symmetric(&self) -> bool {
        (0..self.size)
            .all(|i| (i + 1..self.size).all(|j| (self.get(i, j) - self.get(j, i)).is_zero()))
    }

    pub fn is_diagonal(&self) -> bool {
        (0..self.size).all(|i| (0..self.size).all(|j| i == j || self.get(i, j).is_zero()))
    }

    /// Matrix product. Both operands must have the same size.
    pub fn mul(&self, other: &SymMatrix) -> SymMatrix {
        let n = self.size;
        let mut product = SymMatrix::new(n);
        for i in 0..n {
            for j in 0..n {
                let mut sum = RatFunc::zero();
                for k in 0..n {
                    let (a, b) = (self.get(i, k), other.get(k, j));
                    if a.is_zero() || b.is_zero() {
                        continue;
                    }
                    sum = &sum + &(a * b);
                }
                product.set(i, j, sum);
            }
        }
        product
    }

    /// Exact inverse, or [`CasError::SingularMatrix`].
    pub fn inverse(&self) -> Result<SymMatrix, CasError> {
        let n = self.size;
        if self.is_diagonal() {
            let mut inverse = SymMatrix::new(n);
            for i in 0..n {
                let cell = self.get(i, i);
                if cell.is_zero() {
                    return Err(CasError::SingularMatrix);
                }
                inverse.set(i, i, cell.recip()?);
            }
            return Ok(inverse);
        }

        let mut work = self.clone();
        let mut inverse = SymMatrix::identity(n);
        for col in 0..n {
            let pivot_row = (col..n)
                .find(|row| !work.get(*row, col).is_zero())
                .ok_or(CasError::SingularMatrix)?;
            if pivot_row != col {
                work.swap_rows(pivot_row, col);
                inverse.swap_rows(pivot_row, col);
            }
            let pivot = work.get(col, col).recip()?;
            work.scale_row(col, &pivot);
            inverse.scale_row(col, &pivot);
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = work.get(row, col).clone();
                if factor.is_zero() {
                    continue;
                }
                work.subtract_row(row, col, &factor);
                inverse.subtract_row(row, col, &factor);
            }
        }
        Ok(inverse)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for col in 0..self.size {
            self.cells.swap(a * self.size + col, b * self.size + col);
        }
    }

    fn scale_row(&mut self, row: usize, factor: &RatFunc) {
        for col in 0..self.size {
            let scaled = self.get(row, col) * factor;
            self.set(row, col, scaled);
        }
    }

    /// `row -= factor * source`.
    fn subtract_row(&mut self, row: usize, source: usize, factor: &RatFunc) {
        for col in 0..self.size {
            let source_cell = self.get(source, col);
            if source_cell.is_zero() {
                continue;
            }
            let updated = self.get(row, col) - &(factor * source_cell);
            self.set(row, col, updated);
        }
    }
}

//! Local well blocks and their eliminated contribution to the reservoir
//! system.
//!
//! With reservoir unknowns `x` and well unknowns `y` the coupled system is
//!
//! ```text
//! [ A + S   C ] [dx]   [R      ]
//! [ B       D ] [dy] = [resWell]
//! ```
//!
//! where `S` holds the direct perforation source derivatives. Eliminating
//! `dy` leaves `(A + S - C D⁻¹ B) dx = R - C D⁻¹ resWell`, which is what
//! [`WellContributions`] carries.

use crate::{Block, Vector3};

/// Source term of one perforation at its cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSource {
    pub cell: usize,
    /// Derivatives of the cell's residual w.r.t. the cell's unknowns
    pub jacobian: Block,
    pub residual: Vector3,
}

/// `-C_i D⁻¹ B_j` between the cells of perforations `i` and `j`.
#[derive(Clone, Debug, PartialEq)]
pub struct Coupling {
    pub row_cell: usize,
    pub col_cell: usize,
    pub block: Block,
}

/// What one well adds to the reservoir-only Newton system.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WellContributions {
    pub sources: Vec<CellSource>,
    pub coupling: Vec<Coupling>,
    /// `-C_i D⁻¹ resWell` per perforated cell
    pub residual_correction: Vec<(usize, Vector3)>,
}

impl WellContributions {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.coupling.is_empty() && self.residual_correction.is_empty()
    }
}

/// Local blocks of a standard well, rebuilt by every assembly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WellBlocks {
    /// Perforated cells, one per block of `b` and `c`
    pub cells: Vec<usize>,
    /// `B_j[row][pv] = dR_well[row] / dx_cell(j)[pv]`
    pub b: Vec<Block>,
    /// `C_j[eq][wv] = d(-eta cq_s_j[eq]) / dy[wv]`
    pub c: Vec<Block>,
    pub d: Block,
    pub inv_d: Block,
    pub res_well: Vector3,
}

impl WellBlocks {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Eliminated coupling and residual corrections for every perforation pair.
    pub fn eliminate(&self) -> (Vec<Coupling>, Vec<(usize, Vector3)>) {
        let n = self.cells.len();
        let mut coupling = Vec::with_capacity(n * n);
        let mut residual = Vec::with_capacity(n);
        for (i, c_i) in self.c.iter().enumerate() {
            let c_inv_d = c_i * self.inv_d;
            residual.push((self.cells[i], -(c_inv_d * self.res_well)));
            for (j, b_j) in self.b.iter().enumerate() {
                coupling.push(Coupling {
                    row_cell: self.cells[i],
                    col_cell: self.cells[j],
                    block: -(c_inv_d * b_j),
                });
            }
        }
        (coupling, residual)
    }

    /// Well update `D⁻¹ (resWell - Σ_j B_j dx_j)` for a cell-major reservoir
    /// update `dx`.
    pub fn well_update(&self, dx: &[f64]) -> Vector3 {
        let mut rhs = self.res_well;
        for (cell, b_j) in self.cells.iter().zip(&self.b) {
            let base = cell * 3;
            let dx_j = Vector3::new(dx[base], dx[base + 1], dx[base + 2]);
            rhs -= b_j * dx_j;
        }
        self.inv_d * rhs
    }
}

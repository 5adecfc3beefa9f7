//! Reduced global Newton system.
//!
//! Unknowns are laid out cell-major, `NUM_EQ` entries per cell in the slot
//! order `(pressure, s_w, s_g)`. Equation rows follow the phase order
//! `(water, oil, gas)`.

use nalgebra::{DMatrix, DVector};
use wf_pvt::NUM_EQ;
use wf_wells::{Block, Vector3, WellContributions};

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalSystem {
    num_cells: usize,
    jacobian: DMatrix<f64>,
    residual: DVector<f64>,
}

impl GlobalSystem {
    pub fn new(num_cells: usize) -> Self {
        let n = num_cells * NUM_EQ;
        Self {
            num_cells,
            jacobian: DMatrix::zeros(n, n),
            residual: DVector::zeros(n),
        }
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.jacobian
    }

    pub fn residual(&self) -> &DVector<f64> {
        &self.residual
    }

    pub fn add_block(&mut self, row_cell: usize, col_cell: usize, block: &Block) {
        let mut view = self.jacobian.fixed_view_mut::<NUM_EQ, NUM_EQ>(
            row_cell * NUM_EQ,
            col_cell * NUM_EQ,
        );
        view += block;
    }

    pub fn add_residual(&mut self, cell: usize, r: &Vector3) {
        let mut view = self.residual.fixed_rows_mut::<NUM_EQ>(cell * NUM_EQ);
        view += r;
    }

    pub fn residual_block(&self, cell: usize) -> Vector3 {
        self.residual.fixed_rows::<NUM_EQ>(cell * NUM_EQ).into_owned()
    }

    pub fn block(&self, row_cell: usize, col_cell: usize) -> Block {
        self.jacobian
            .fixed_view::<NUM_EQ, NUM_EQ>(row_cell * NUM_EQ, col_cell * NUM_EQ)
            .into_owned()
    }

    /// Add one well's eliminated contribution.
    pub fn scatter(&mut self, contributions: &WellContributions) {
        for source in &contributions.sources {
            self.add_block(source.cell, source.cell, &source.jacobian);
            self.add_residual(source.cell, &source.residual);
        }
        for coupling in &contributions.coupling {
            self.add_block(coupling.row_cell, coupling.col_cell, &coupling.block);
        }
        for (cell, correction) in &contributions.residual_correction {
            self.add_residual(*cell, correction);
        }
    }

    /// Replace the equations of `cell` by `dx_cell = 0`.
    pub fn pin(&mut self, cell: usize) {
        let start = cell * NUM_EQ;
        for row in start..start + NUM_EQ {
            self.jacobian.row_mut(row).fill(0.0);
            self.jacobian[(row, row)] = 1.0;
            self.residual[row] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_wells::{CellSource, Coupling};

    #[test]
    fn scatter_accumulates_blocks() {
        let mut system = GlobalSystem::new(2);
        let contributions = WellContributions {
            sources: vec![CellSource {
                cell: 1,
                jacobian: Block::identity(),
                residual: Vector3::new(1.0, 2.0, 3.0),
            }],
            coupling: vec![
                Coupling {
                    row_cell: 1,
                    col_cell: 0,
                    block: Block::from_element(0.5),
                },
                Coupling {
                    row_cell: 1,
                    col_cell: 1,
                    block: Block::identity(),
                },
            ],
            residual_correction: vec![(1, Vector3::new(-1.0, 0.0, 1.0))],
        };
        system.scatter(&contributions);
        system.scatter(&contributions);

        assert_eq!(system.block(1, 1), Block::identity() * 4.0);
        assert_eq!(system.block(1, 0), Block::from_element(1.0));
        assert_eq!(system.block(0, 0), Block::zeros());
        assert_eq!(system.residual_block(1), Vector3::new(0.0, 4.0, 8.0));
        assert_eq!(system.residual_block(0), Vector3::zeros());
    }

    #[test]
    fn pin_decouples_rows() {
        let mut system = GlobalSystem::new(2);
        system.add_block(0, 1, &Block::from_element(2.0));
        system.add_block(0, 0, &Block::from_element(3.0));
        system.add_residual(0, &Vector3::new(1.0, 1.0, 1.0));
        system.pin(0);
        assert_eq!(system.block(0, 0), Block::identity());
        assert_eq!(system.block(0, 1), Block::zeros());
        assert_eq!(system.residual_block(0), Vector3::zeros());
    }
}

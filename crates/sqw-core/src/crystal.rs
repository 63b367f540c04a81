//! Minimal crystal description consumed by the correlation engine.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SqwError};

fn lattice_error(code: &str, message: impl Into<String>) -> SqwError {
    SqwError::Lattice(ErrorInfo::new(code, message))
}

/// Unit cell with sublattice positions and symmetry classes.
///
/// Lattice vectors are stored as the columns of `latvecs`. Positions are in
/// fractional (lattice) coordinates. Two sublattices are symmetry equivalent
/// exactly when they carry the same class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    latvecs: Matrix3<f64>,
    positions: Vec<Vector3<f64>>,
    classes: Vec<usize>,
}

impl Crystal {
    /// Builds a crystal, validating the lattice and the class labels.
    ///
    /// When `classes` is `None` every sublattice is placed in its own class.
    pub fn new(
        latvecs: Matrix3<f64>,
        positions: Vec<Vector3<f64>>,
        classes: Option<Vec<usize>>,
    ) -> Result<Self, SqwError> {
        if positions.is_empty() {
            return Err(lattice_error(
                "empty-basis",
                "a crystal requires at least one sublattice",
            ));
        }
        if latvecs.determinant().abs() < 1e-12 {
            return Err(lattice_error(
                "singular-lattice",
                "lattice vectors must be linearly independent",
            ));
        }
        let classes = classes.unwrap_or_else(|| (0..positions.len()).collect());
        if classes.len() != positions.len() {
            return Err(SqwError::Lattice(
                ErrorInfo::new(
                    "class-count-mismatch",
                    "one symmetry class label is required per sublattice",
                )
                .with_context("positions", positions.len())
                .with_context("classes", classes.len()),
            ));
        }
        Ok(Self {
            latvecs,
            positions,
            classes,
        })
    }

    /// Simple cubic lattice with a single site at the origin.
    pub fn cubic(a: f64) -> Self {
        Self {
            latvecs: Matrix3::identity() * a,
            positions: vec![Vector3::zeros()],
            classes: vec![0],
        }
    }

    /// Lattice vectors as matrix columns.
    pub fn latvecs(&self) -> &Matrix3<f64> {
        &self.latvecs
    }

    /// Reciprocal lattice vectors as matrix columns, `a_i · b_j = 2π δ_ij`.
    pub fn recipvecs(&self) -> Matrix3<f64> {
        let inverse = self
            .latvecs
            .try_inverse()
            .unwrap_or_else(Matrix3::zeros);
        inverse.transpose() * (2.0 * std::f64::consts::PI)
    }

    /// Number of sublattices in the unit cell.
    pub fn natoms(&self) -> usize {
        self.positions.len()
    }

    /// Fractional positions of all sublattices.
    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    /// Cartesian position of sublattice `atom`.
    pub fn cartesian_position(&self, atom: usize) -> Vector3<f64> {
        self.latvecs * self.positions[atom]
    }

    /// Symmetry class label of sublattice `atom`.
    pub fn class(&self, atom: usize) -> usize {
        self.classes[atom]
    }

    /// Symmetry-equivalence oracle.
    pub fn equivalent(&self, a: usize, b: usize) -> bool {
        self.classes[a] == self.classes[b]
    }
}

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::{Crystal, SpinSystem, Vec3};

fn lattice_error(code: &str, message: impl Into<String>) -> SqwError {
    SqwError::Lattice(ErrorInfo::new(code, message))
}

/// Exchange bond from sublattice `i` in cell `c` to sublattice `j` in cell `c + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    /// Source sublattice.
    pub i: usize,
    /// Destination sublattice.
    pub j: usize,
    /// Cell offset of the destination.
    pub offset: [i32; 3],
    /// Heisenberg coupling `J` in `E = J S_i · S_j`.
    pub coupling: f64,
}

/// Classical dipole spins on a periodic supercell.
///
/// Energy is `Σ_bonds J S_i · S_j − Σ_i B · S_i`; each bond is listed once and
/// acts on both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinLattice {
    crystal: Crystal,
    latsize: [usize; 3],
    spin_magnitude: f64,
    dipoles: Vec<Vec3>,
    bonds: Vec<Bond>,
    field: Vec3,
}

impl SpinLattice {
    /// Creates a lattice with every spin polarised along +z.
    pub fn new(
        crystal: Crystal,
        latsize: [usize; 3],
        spin_magnitude: f64,
    ) -> Result<Self, SqwError> {
        if latsize.iter().any(|&l| l == 0) {
            return Err(SqwError::Lattice(
                ErrorInfo::new("empty-lattice", "every lattice extent must be positive")
                    .with_context("latsize", format!("{latsize:?}")),
            ));
        }
        if !(spin_magnitude > 0.0) {
            return Err(lattice_error(
                "invalid-spin-magnitude",
                "spin magnitude must be positive",
            ));
        }
        let nsites = latsize.iter().product::<usize>() * crystal.natoms();
        Ok(Self {
            crystal,
            latsize,
            spin_magnitude,
            dipoles: vec![Vec3::new(0.0, 0.0, spin_magnitude); nsites],
            bonds: Vec::new(),
            field: Vec3::zeros(),
        })
    }

    /// Adds a Heisenberg bond.
    pub fn add_bond(&mut self, bond: Bond) -> Result<(), SqwError> {
        let natoms = self.crystal.natoms();
        if bond.i >= natoms || bond.j >= natoms {
            return Err(SqwError::Lattice(
                ErrorInfo::new("bond-out-of-range", "bond references a missing sublattice")
                    .with_context("i", bond.i)
                    .with_context("j", bond.j)
                    .with_context("natoms", natoms),
            ));
        }
        self.bonds.push(bond);
        Ok(())
    }

    /// Sets the uniform Zeeman field.
    pub fn set_field(&mut self, field: Vec3) {
        self.field = field;
    }

    /// Spin length κ.
    pub fn spin_magnitude(&self) -> f64 {
        self.spin_magnitude
    }

    /// Flat dipole storage, ordered by `(x, y, z, atom)`.
    pub fn dipoles(&self) -> &[Vec3] {
        &self.dipoles
    }

    pub(crate) fn dipoles_mut(&mut self) -> &mut [Vec3] {
        &mut self.dipoles
    }

    /// Points every spin along `direction`.
    pub fn polarize(&mut self, direction: Vec3) -> Result<(), SqwError> {
        let norm = direction.norm();
        if norm == 0.0 {
            return Err(lattice_error("zero-direction", "cannot polarize along zero vector"));
        }
        let spin = direction * (self.spin_magnitude / norm);
        self.dipoles.iter_mut().for_each(|s| *s = spin);
        Ok(())
    }

    /// Sets a single site's dipole, rescaled to the spin magnitude.
    pub fn set_dipole(&mut self, cell: [usize; 3], atom: usize, direction: Vec3) -> Result<(), SqwError> {
        let norm = direction.norm();
        if norm == 0.0 {
            return Err(lattice_error("zero-direction", "cannot orient spin along zero vector"));
        }
        let idx = self.site_index(cell, atom);
        self.dipoles[idx] = direction * (self.spin_magnitude / norm);
        Ok(())
    }

    /// Draws every spin uniformly from the sphere.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let kappa = self.spin_magnitude;
        for spin in self.dipoles.iter_mut() {
            let v = loop {
                let v = Vec3::new(
                    rng.sample(StandardNormal),
                    rng.sample(StandardNormal),
                    rng.sample(StandardNormal),
                );
                if v.norm() > 1e-12 {
                    break v;
                }
            };
            *spin = v * (kappa / v.norm());
        }
    }

    pub(crate) fn site_index(&self, cell: [usize; 3], atom: usize) -> usize {
        let [_, ly, lz] = self.latsize;
        ((cell[0] * ly + cell[1]) * lz + cell[2]) * self.crystal.natoms() + atom
    }

    fn shifted(&self, cell: [usize; 3], offset: [i32; 3]) -> [usize; 3] {
        let mut out = [0usize; 3];
        for axis in 0..3 {
            let l = self.latsize[axis] as i64;
            out[axis] = (cell[axis] as i64 + offset[axis] as i64).rem_euclid(l) as usize;
        }
        out
    }

    fn cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [lx, ly, lz] = self.latsize;
        (0..lx).flat_map(move |x| (0..ly).flat_map(move |y| (0..lz).map(move |z| [x, y, z])))
    }

    /// Total energy of an arbitrary dipole field laid out like [`Self::dipoles`].
    pub fn energy_of(&self, dipoles: &[Vec3]) -> f64 {
        let mut energy = 0.0;
        for cell in self.cells() {
            for bond in &self.bonds {
                let a = self.site_index(cell, bond.i);
                let b = self.site_index(self.shifted(cell, bond.offset), bond.j);
                energy += bond.coupling * dipoles[a].dot(&dipoles[b]);
            }
        }
        energy - dipoles.iter().map(|s| self.field.dot(s)).sum::<f64>()
    }

    /// Total energy of the current configuration.
    pub fn energy(&self) -> f64 {
        self.energy_of(&self.dipoles)
    }

    /// Writes `∂E/∂S_i` for the dipole field `dipoles` into `grad`.
    pub fn energy_gradient(&self, dipoles: &[Vec3], grad: &mut [Vec3]) {
        grad.iter_mut().for_each(|g| *g = -self.field);
        for cell in self.cells() {
            for bond in &self.bonds {
                let a = self.site_index(cell, bond.i);
                let b = self.site_index(self.shifted(cell, bond.offset), bond.j);
                grad[a] += dipoles[b] * bond.coupling;
                grad[b] += dipoles[a] * bond.coupling;
            }
        }
    }
}

impl SpinSystem for SpinLattice {
    fn crystal(&self) -> &Crystal {
        &self.crystal
    }

    fn latsize(&self) -> [usize; 3] {
        self.latsize
    }

    fn dipole(&self, cell: [usize; 3], atom: usize) -> Vec3 {
        self.dipoles[self.site_index(cell, atom)]
    }
}

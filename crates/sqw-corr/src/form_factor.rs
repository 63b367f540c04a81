//! Magnetic form factors and their propagation to equivalent sublattices.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::Crystal;

/// `⟨j0⟩` coefficients `A, a, B, b, C, c, D` for common transition-metal ions.
const ION_TABLE: &[(&str, [f64; 7])] = &[
    ("Fe2", [0.0263, 34.9597, 0.3668, 15.9435, 0.6188, 5.5935, -0.0119]),
    ("Mn2", [0.4220, 17.684, 0.5948, 6.005, 0.0043, -0.609, -0.0219]),
    ("Cu2", [0.0232, 34.969, 0.4023, 11.564, 0.5882, 3.843, -0.0137]),
    ("Ni2", [0.0163, 35.8826, 0.3916, 13.2233, 0.6052, 4.3388, -0.0133]),
    ("Co2", [0.4332, 14.3553, 0.5857, 4.6077, -0.0382, 0.1338, 0.0179]),
];

/// Dipolar magnetic form factor `F(|q|)`.
///
/// With `j2` present the result is `⟨j0⟩ + (2 - g)/g ⟨j2⟩`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFactor {
    /// `⟨j0⟩` coefficients.
    pub j0: [f64; 7],
    /// Optional `⟨j2⟩` coefficients.
    #[serde(default)]
    pub j2: Option<[f64; 7]>,
    /// Landé g-factor weighting the `⟨j2⟩` term.
    #[serde(default = "default_g")]
    pub g_lande: f64,
}

fn default_g() -> f64 {
    2.0
}

impl FormFactor {
    /// Tabulated `⟨j0⟩` form factor for a named ion.
    pub fn ion(name: &str) -> Result<Self, SqwError> {
        ION_TABLE
            .iter()
            .find(|(ion, _)| *ion == name)
            .map(|(_, j0)| Self {
                j0: *j0,
                j2: None,
                g_lande: default_g(),
            })
            .ok_or_else(|| {
                SqwError::Config(
                    ErrorInfo::new("unknown-ion", "no form factor tabulated for ion")
                        .with_context("ion", name)
                        .with_hint("supply the coefficients explicitly"),
                )
            })
    }

    /// Evaluates the form factor at wavevector magnitude `q` (inverse length).
    pub fn evaluate(&self, q: f64) -> f64 {
        let s2 = (q / (4.0 * PI)).powi(2);
        let j0 = expansion(&self.j0, s2);
        match &self.j2 {
            Some(j2) => j0 + (2.0 - self.g_lande) / self.g_lande * s2 * expansion(j2, s2),
            None => j0,
        }
    }
}

fn expansion(c: &[f64; 7], s2: f64) -> f64 {
    c[0] * (-c[1] * s2).exp() + c[2] * (-c[3] * s2).exp() + c[4] * (-c[5] * s2).exp() + c[6]
}

/// Form factor assigned to one representative sublattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFactorEntry {
    /// Representative sublattice index.
    pub atom: usize,
    /// Form factor for its symmetry class.
    pub form_factor: FormFactor,
}

/// Per-sublattice form factors after symmetry propagation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFactorTable {
    per_atom: Vec<Option<FormFactor>>,
}

impl FormFactorTable {
    /// Copies each entry onto every sublattice equivalent to its representative.
    pub fn propagate(crystal: &Crystal, entries: &[FormFactorEntry]) -> Result<Self, SqwError> {
        let natoms = crystal.natoms();
        let mut per_atom: Vec<Option<FormFactor>> = vec![None; natoms];
        let mut owner: Vec<Option<usize>> = vec![None; natoms];
        for entry in entries {
            if entry.atom >= natoms {
                return Err(SqwError::Query(
                    ErrorInfo::new("atom-out-of-range", "form factor references a missing sublattice")
                        .with_context("atom", entry.atom)
                        .with_context("natoms", natoms),
                ));
            }
            for target in 0..natoms {
                if !crystal.equivalent(entry.atom, target) {
                    continue;
                }
                if let Some(previous) = owner[target] {
                    return Err(SqwError::Query(
                        ErrorInfo::new(
                            "conflicting-form-factor",
                            "two form factors were assigned to the same symmetry class",
                        )
                        .with_context("first", previous)
                        .with_context("second", entry.atom),
                    ));
                }
                owner[target] = Some(entry.atom);
                per_atom[target] = Some(entry.form_factor.clone());
            }
        }
        Ok(Self { per_atom })
    }

    /// Form factor of `atom`, if one was assigned.
    pub fn get(&self, atom: usize) -> Option<&FormFactor> {
        self.per_atom.get(atom).and_then(Option::as_ref)
    }

    /// Form factor of `atom` at `q`, defaulting to one.
    pub fn factor(&self, atom: usize, q: f64) -> f64 {
        self.get(atom).map_or(1.0, |ff| ff.evaluate(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn j0_is_normalised_at_origin() {
        let ff = FormFactor::ion("Fe2").unwrap();
        let sum = ff.j0[0] + ff.j0[2] + ff.j0[4] + ff.j0[6];
        assert!((ff.evaluate(0.0) - sum).abs() < 1e-12);
        assert!((ff.evaluate(0.0) - 1.0).abs() < 0.02);
        assert!(ff.evaluate(4.0) < ff.evaluate(1.0));
    }

    #[test]
    fn unknown_ion_is_reported() {
        assert_eq!(FormFactor::ion("Xx9").unwrap_err().code(), "unknown-ion");
    }

    #[test]
    fn j2_term_vanishes_for_g_two() {
        let mut ff = FormFactor::ion("Ni2").unwrap();
        let bare = ff.evaluate(3.0);
        ff.j2 = Some([1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!((ff.evaluate(3.0) - bare).abs() < 1e-14);
        ff.g_lande = 1.0;
        assert!(ff.evaluate(3.0) > bare);
    }
}

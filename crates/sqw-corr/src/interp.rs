//! Stencils and weights mapping arbitrary wavevectors onto lattice points.

use serde::{Deserialize, Serialize};
use sqw_core::Vec3;

/// How intensities between discrete lattice wavevectors are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    /// Nearest lattice point, ties resolved toward the lower index.
    #[default]
    None,
    /// Trilinear interpolation over the eight surrounding lattice points.
    Linear,
}

/// Lattice points (unwrapped integer indices `m = L q`) a query depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stencil {
    points: Vec<[i64; 3]>,
}

impl Stencil {
    /// Points in evaluation order.
    pub fn points(&self) -> &[[i64; 3]] {
        &self.points
    }
}

impl Interpolation {
    /// Lattice points contributing to `q` (in reciprocal lattice units).
    pub fn stencil(self, q: &Vec3, latsize: [usize; 3]) -> Stencil {
        let scaled = scaled(q, latsize);
        match self {
            Interpolation::None => Stencil {
                points: vec![[
                    round_half_down(scaled[0]),
                    round_half_down(scaled[1]),
                    round_half_down(scaled[2]),
                ]],
            },
            Interpolation::Linear => {
                let base = [
                    scaled[0].floor() as i64,
                    scaled[1].floor() as i64,
                    scaled[2].floor() as i64,
                ];
                Stencil {
                    points: (0..8)
                        .map(|corner| {
                            [
                                base[0] + (corner & 1) as i64,
                                base[1] + ((corner >> 1) & 1) as i64,
                                base[2] + ((corner >> 2) & 1) as i64,
                            ]
                        })
                        .collect(),
                }
            }
        }
    }

    /// Weights of the stencil points for `q`; they sum to one.
    pub fn weights(self, q: &Vec3, stencil: &Stencil, latsize: [usize; 3]) -> Vec<f64> {
        match self {
            Interpolation::None => vec![1.0],
            Interpolation::Linear => {
                let scaled = scaled(q, latsize);
                let base = stencil.points[0];
                let frac = [
                    scaled[0] - base[0] as f64,
                    scaled[1] - base[1] as f64,
                    scaled[2] - base[2] as f64,
                ];
                (0..8)
                    .map(|corner| {
                        (0..3)
                            .map(|axis| {
                                if (corner >> axis) & 1 == 1 {
                                    frac[axis]
                                } else {
                                    1.0 - frac[axis]
                                }
                            })
                            .product::<f64>()
                    })
                    .collect()
            }
        }
    }
}

fn scaled(q: &Vec3, latsize: [usize; 3]) -> [f64; 3] {
    [
        q[0] * latsize[0] as f64,
        q[1] * latsize[1] as f64,
        q[2] * latsize[2] as f64,
    ]
}

fn round_half_down(x: f64) -> i64 {
    (x - 0.5).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_round_toward_lower_index() {
        assert_eq!(round_half_down(2.5), 2);
        assert_eq!(round_half_down(-0.5), -1);
        assert_eq!(round_half_down(2.51), 3);
    }

    #[test]
    fn linear_weights_sum_to_one() {
        let q = Vec3::new(0.13, -0.42, 0.77);
        let stencil = Interpolation::Linear.stencil(&q, [4, 5, 6]);
        let weights = Interpolation::Linear.weights(&q, &stencil, [4, 5, 6]);
        assert_eq!(weights.len(), 8);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exact_lattice_point_has_unit_corner_weight() {
        let q = Vec3::new(0.25, 0.0, 0.5);
        let stencil = Interpolation::Linear.stencil(&q, [4, 2, 2]);
        let weights = Interpolation::Linear.weights(&q, &stencil, [4, 2, 2]);
        assert_eq!(stencil.points()[0], [1, 0, 1]);
        assert!((weights[0] - 1.0).abs() < 1e-12);
    }
}

//! Classical-to-quantum intensity corrections.

use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};

/// Frequency and temperature dependent factor applied to classical intensities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuantumCorrection {
    /// `βω / (1 - e^{-βω})`, the harmonic-oscillator correspondence factor.
    #[default]
    Harmonic,
    /// `2 / (1 + e^{-βω})`, detailed balance restored symmetrically.
    DetailedBalance,
}

impl QuantumCorrection {
    /// Checks that `kt` is a usable temperature for this correction.
    pub fn validate(self, kt: f64) -> Result<(), SqwError> {
        let usable = match self {
            QuantumCorrection::Harmonic => kt > 0.0,
            QuantumCorrection::DetailedBalance => kt >= 0.0,
        };
        if usable {
            Ok(())
        } else {
            Err(SqwError::Query(
                ErrorInfo::new("invalid-temperature", "temperature is outside the correction's domain")
                    .with_context("kt", kt)
                    .with_context("correction", format!("{self:?}")),
            ))
        }
    }

    /// Multiplicative factor at frequency `omega` and temperature `kt`.
    ///
    /// Both corrections tend to one as `kt → ∞` and equal one at `omega = 0`.
    pub fn factor(self, omega: f64, kt: f64) -> f64 {
        if omega == 0.0 {
            return 1.0;
        }
        match self {
            QuantumCorrection::Harmonic => {
                let x = omega / kt;
                if x == 0.0 {
                    1.0
                } else {
                    -x / (-x).exp_m1()
                }
            }
            QuantumCorrection::DetailedBalance => {
                if kt == 0.0 {
                    if omega > 0.0 {
                        2.0
                    } else {
                        0.0
                    }
                } else {
                    2.0 / (1.0 + (-omega / kt).exp())
                }
            }
        }
    }
}

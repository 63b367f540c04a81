//! Persisting accumulated correlations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::Crystal;

use crate::correlations::{FrequencySchedule, SampledCorrelations};
use crate::observables::ObservableInfo;

fn serde_error(code: &str, err: impl ToString) -> SqwError {
    SqwError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (key, sorted(val)))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// JSON text with object keys in lexicographic order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, SqwError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    serde_json::to_string(&sorted(value)).map_err(|err| serde_error("json-write", err))
}

/// Hex SHA-256 of the canonical JSON form of `value`.
pub fn stable_hash<T: Serialize>(value: &T) -> Result<String, SqwError> {
    let text = canonical_json(value)?;
    Ok(format!("{:x}", Sha256::digest(text.as_bytes())))
}

#[derive(Serialize)]
struct Metadata<'a> {
    crystal: &'a Crystal,
    latsize: [usize; 3],
    info: &'a ObservableInfo,
    schedule: &'a FrequencySchedule,
    subtract_mean: bool,
}

impl SampledCorrelations {
    /// Hash identifying the accumulation parameters, independent of the data.
    ///
    /// Accumulators with equal hashes can be merged.
    pub fn metadata_hash(&self) -> Result<String, SqwError> {
        stable_hash(&Metadata {
            crystal: self.crystal(),
            latsize: self.latsize(),
            info: self.info(),
            schedule: self.schedule(),
            subtract_mean: self.subtracts_mean(),
        })
    }
}

/// Self-verifying serialized form of a [`SampledCorrelations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSnapshot {
    /// Parameter hash, see [`SampledCorrelations::metadata_hash`].
    pub metadata_hash: String,
    /// SHA-256 of `payload`.
    pub content_hash: String,
    /// Canonical JSON of the accumulator.
    pub payload: String,
}

impl CorrelationSnapshot {
    /// Captures the current state of `correlations`.
    pub fn capture(correlations: &SampledCorrelations) -> Result<Self, SqwError> {
        let payload = canonical_json(correlations)?;
        Ok(Self {
            metadata_hash: correlations.metadata_hash()?,
            content_hash: format!("{:x}", Sha256::digest(payload.as_bytes())),
            payload,
        })
    }

    /// Encodes the snapshot with `bincode`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SqwError> {
        bincode::serialize(self).map_err(|err| serde_error("bincode-serialize", err))
    }

    /// Decodes bytes produced by [`CorrelationSnapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SqwError> {
        bincode::deserialize(bytes).map_err(|err| serde_error("bincode-deserialize", err))
    }

    /// Verifies the content hash and rebuilds the accumulator.
    pub fn restore(&self) -> Result<SampledCorrelations, SqwError> {
        let actual = format!("{:x}", Sha256::digest(self.payload.as_bytes()));
        if actual != self.content_hash {
            return Err(SqwError::Serde(
                ErrorInfo::new("hash-mismatch", "snapshot payload does not match its hash")
                    .with_context("expected", &self.content_hash)
                    .with_context("actual", actual),
            ));
        }
        let restored: SampledCorrelations =
            serde_json::from_str(&self.payload).map_err(|err| serde_error("json-read", err))?;
        let expected = restored.expected_shape();
        if restored.data().shape() != expected {
            return Err(SqwError::Serde(
                ErrorInfo::new("snapshot-shape-mismatch", "correlation tensor does not match its parameters")
                    .with_context("expected", format!("{expected:?}"))
                    .with_context("actual", format!("{:?}", restored.data().shape())),
            ));
        }
        Ok(restored)
    }
}

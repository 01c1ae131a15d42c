//! Common types used across fedgate modules.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Error, Result};

/// Timestamp wrapper for consistent serialization.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get current UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Identifier of a participating data node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random node identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to correlate log lines.
        let s = self.0.simple().to_string();
        write!(f, "{}", &s[..8])
    }
}

/// Model parameters as an ordered sequence of numeric blocks.
///
/// Opaque to the coordination core beyond shape compatibility: a block may
/// be a flattened layer, a centroid, or anything else the model defines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Parameter blocks in model-defined order.
    pub blocks: Vec<Vec<f32>>,
}

impl ModelParameters {
    /// Create from a list of blocks.
    pub fn new(blocks: Vec<Vec<f32>>) -> Self {
        Self { blocks }
    }

    /// Create from a single block.
    pub fn single(block: Vec<f32>) -> Self {
        Self {
            blocks: vec![block],
        }
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Per-block lengths, in order.
    pub fn shape(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.len()).collect()
    }

    /// Whether another parameter set has identical shape.
    pub fn same_shape(&self, other: &ModelParameters) -> bool {
        self.shape() == other.shape()
    }

    /// Whether there are no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Zero-filled parameters with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self {
            blocks: self.blocks.iter().map(|b| vec![0.0; b.len()]).collect(),
        }
    }

    /// Check shape compatibility against an expected shape.
    pub fn check_shape(&self, expected: &[usize]) -> Result<()> {
        let found = self.shape();
        if found != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", expected),
                found: format!("{:?}", found),
            });
        }
        Ok(())
    }
}

/// Metric snapshot from evaluating a model against labeled data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Loss value (lower is better)
    pub loss: f32,
    /// Accuracy in [0, 1]
    pub accuracy: f32,
}

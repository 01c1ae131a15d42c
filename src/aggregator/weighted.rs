//! Weighted mean aggregation.

use crate::aggregator::{check_inputs, AggregationProtocol};
use crate::core::{Error, ModelParameters, Result};

/// Per-block elementwise weighted mean with normalized weights.
///
/// Holds immutable per-node weights fixed at construction, typically
/// proportional to node sample counts. A per-call weights slice (the
/// surviving subset of a round) overrides the stored ones. Weights are
/// normalized to sum to 1 before use, so uniform weights reproduce
/// [`Mean`](crate::aggregator::Mean).
#[derive(Clone, Debug)]
pub struct WeightedMean {
    weights: Vec<f32>,
}

impl WeightedMean {
    /// Create with fixed per-node weights.
    ///
    /// Rejects negative, non-finite or all-zero weights at construction;
    /// weight problems never surface mid-run.
    pub fn new(weights: Vec<f32>) -> Result<Self> {
        validate_weights(&weights)?;
        Ok(Self { weights })
    }

    /// The stored weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

fn validate_weights(weights: &[f32]) -> Result<()> {
    if weights.is_empty() {
        return Err(Error::Configuration("weights are empty".to_string()));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(Error::Configuration(
            "weights must be finite and non-negative".to_string(),
        ));
    }
    if weights.iter().sum::<f32>() <= 0.0 {
        return Err(Error::Configuration(
            "weights must not all be zero".to_string(),
        ));
    }
    Ok(())
}

impl AggregationProtocol for WeightedMean {
    fn name(&self) -> &'static str {
        "weighted_mean"
    }

    fn aggregate(
        &self,
        params: &[ModelParameters],
        weights: Option<&[f32]>,
    ) -> Result<ModelParameters> {
        check_inputs(params, weights)?;

        let active = weights.unwrap_or(&self.weights);
        if active.len() != params.len() {
            return Err(Error::Configuration(format!(
                "{} stored weights for {} parameter sets",
                active.len(),
                params.len()
            )));
        }
        validate_weights(active)?;

        let total: f32 = active.iter().sum();
        let mut aggregated = params[0].zeros_like();

        for (p, w) in params.iter().zip(active.iter()) {
            let normalized = w / total;
            for (block, acc) in p.blocks.iter().zip(aggregated.blocks.iter_mut()) {
                for (x, a) in block.iter().zip(acc.iter_mut()) {
                    *a += normalized * x;
                }
            }
        }

        Ok(aggregated)
    }
}

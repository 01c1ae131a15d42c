//! Aggregation protocols combining per-node model parameters.
//!
//! A protocol is a pure function over its inputs: a list of per-node
//! parameter sets (plus optional per-node weights) in, one aggregated
//! parameter set out. Strategies: plain mean, weighted mean, and
//! cluster-based consensus for centroid models.

pub mod cluster;
pub mod mean;
pub mod weighted;

use crate::core::{Error, ModelParameters, Result};

pub use cluster::ClusterConsensus;
pub use mean::Mean;
pub use weighted::WeightedMean;

/// Protocol mapping per-node parameters to one global parameter set.
pub trait AggregationProtocol: Send + Sync {
    /// Stable strategy name for logs and reports.
    fn name(&self) -> &'static str;

    /// Aggregate the surviving nodes' parameters.
    ///
    /// `weights`, when given, line up with `params` by index (already
    /// restricted to the surviving subset). All parameter sets must have
    /// identical shape; a violation is fatal to the round.
    fn aggregate(
        &self,
        params: &[ModelParameters],
        weights: Option<&[f32]>,
    ) -> Result<ModelParameters>;
}

/// Validate shared aggregation preconditions.
///
/// Empty input means no node survived the round; shape disagreement is a
/// fatal [`Error::ShapeMismatch`]; a weights slice of the wrong length is
/// a configuration fault.
pub(crate) fn check_inputs(
    params: &[ModelParameters],
    weights: Option<&[f32]>,
) -> Result<()> {
    let first = params.first().ok_or(Error::NoViableParticipants)?;

    for p in &params[1..] {
        if !first.same_shape(p) {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", first.shape()),
                found: format!("{:?}", p.shape()),
            });
        }
    }

    if let Some(w) = weights {
        if w.len() != params.len() {
            return Err(Error::Configuration(format!(
                "{} weights for {} parameter sets",
                w.len(),
                params.len()
            )));
        }
    }

    Ok(())
}

//! Plain elementwise mean aggregation.

use crate::aggregator::{check_inputs, AggregationProtocol};
use crate::core::{ModelParameters, Result};

/// Per-block elementwise arithmetic mean across nodes.
///
/// Order-independent and deterministic. Ignores the optional weights;
/// callers wanting weighted averaging use
/// [`WeightedMean`](crate::aggregator::WeightedMean).
#[derive(Clone, Copy, Debug, Default)]
pub struct Mean;

impl AggregationProtocol for Mean {
    fn name(&self) -> &'static str {
        "mean"
    }

    fn aggregate(
        &self,
        params: &[ModelParameters],
        weights: Option<&[f32]>,
    ) -> Result<ModelParameters> {
        check_inputs(params, weights)?;

        let mut aggregated = params[0].zeros_like();
        for p in params {
            for (block, acc) in p.blocks.iter().zip(aggregated.blocks.iter_mut()) {
                for (x, a) in block.iter().zip(acc.iter_mut()) {
                    *a += x;
                }
            }
        }

        let n = params.len() as f32;
        for block in &mut aggregated.blocks {
            for a in block.iter_mut() {
                *a /= n;
            }
        }

        Ok(aggregated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    fn params(values: &[&[f32]]) -> Vec<ModelParameters> {
        values
            .iter()
            .map(|v| ModelParameters::single(v.to_vec()))
            .collect()
    }

    #[test]
    fn test_mean_aggregation() {
        let input = params(&[&[1.0, 2.0, 3.0], &[3.0, 4.0, 5.0]]);
        let result = Mean.aggregate(&input, None).unwrap();
        assert!((result.blocks[0][0] - 2.0).abs() < 1e-5);
        assert!((result.blocks[0][1] - 3.0).abs() < 1e-5);
        assert!((result.blocks[0][2] - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_mean_multi_block() {
        let a = ModelParameters::new(vec![vec![1.0, 1.0], vec![10.0]]);
        let b = ModelParameters::new(vec![vec![3.0, 3.0], vec![20.0]]);
        let result = Mean.aggregate(&[a, b], None).unwrap();

        assert!((result.blocks[0][0] - 2.0).abs() < 1e-5);
        assert!((result.blocks[1][0] - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_mean_order_independent() {
        let forward = params(&[&[1.0, 5.0], &[2.0, 6.0], &[3.0, 7.0]]);
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = Mean.aggregate(&forward, None).unwrap();
        let b = Mean.aggregate(&reversed, None).unwrap();

        for (x, y) in a.blocks[0].iter().zip(b.blocks[0].iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mean_single_node() {
        let input = params(&[&[42.0, 7.0]]);
        let result = Mean.aggregate(&input, None).unwrap();
        assert_eq!(result.blocks[0], vec![42.0, 7.0]);
    }

    #[test]
    fn test_mean_shape_mismatch_produces_no_result() {
        let a = ModelParameters::single(vec![1.0, 2.0]);
        let b = ModelParameters::new(vec![vec![1.0], vec![2.0]]);
        assert!(matches!(
            Mean.aggregate(&[a, b], None),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_mean_empty_input() {
        assert!(matches!(
            Mean.aggregate(&[], None),
            Err(Error::NoViableParticipants)
        ));
    }
}

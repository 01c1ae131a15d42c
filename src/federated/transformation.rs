//! In-place transformations over a node's private data.
//!
//! Contract at this boundary: a transformation must be a total function
//! over the data's declared schema (every record, every feature) and must
//! be deterministic and side-effect-safe. If `apply` fails partway, the
//! node's data is *not* guaranteed to be in its pre-call state; callers
//! treat such a node as suspect for the rest of the run.

use crate::core::Result;
use crate::private::data::LabeledData;

/// A transformation applied to every node's private data in place.
pub trait FederatedTransformation: Send + Sync {
    /// Mutate `data` in place.
    fn apply(&self, data: &mut LabeledData) -> Result<()>;
}

/// Feature-wise normalization: `(x - mean) / std` per feature.
#[derive(Clone, Debug)]
pub struct Normalize {
    /// Per-feature means
    pub mean: Vec<f32>,
    /// Per-feature standard deviations
    pub std: Vec<f32>,
}

impl Normalize {
    /// Create from global feature means and standard deviations.
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { mean, std }
    }
}

impl FederatedTransformation for Normalize {
    fn apply(&self, data: &mut LabeledData) -> Result<()> {
        for record in &mut data.records {
            for (i, x) in record.iter_mut().enumerate() {
                let mean = self.mean.get(i).copied().unwrap_or(0.0);
                let std = self.std.get(i).copied().unwrap_or(1.0);
                if std != 0.0 {
                    *x = (*x - mean) / std;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let mut data = LabeledData::new(vec![vec![10.0, 4.0], vec![20.0, 8.0]], vec![0.0, 1.0]);
        let t = Normalize::new(vec![15.0, 6.0], vec![5.0, 2.0]);

        t.apply(&mut data).unwrap();

        assert!((data.records[0][0] + 1.0).abs() < 1e-5);
        assert!((data.records[1][0] - 1.0).abs() < 1e-5);
        assert!((data.records[0][1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_zero_std_leaves_feature() {
        let mut data = LabeledData::new(vec![vec![3.0]], vec![0.0]);
        let t = Normalize::new(vec![1.0], vec![0.0]);

        t.apply(&mut data).unwrap();
        assert!((data.records[0][0] - 3.0).abs() < 1e-5);
    }
}

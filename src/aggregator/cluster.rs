//! Cluster-based consensus aggregation for centroid-style models.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::aggregator::{check_inputs, AggregationProtocol};
use crate::core::{Error, ModelParameters, Result};

/// Consensus by re-clustering the union of all nodes' centroids.
///
/// Treats each parameter block as one centroid. All nodes' centroid sets
/// are concatenated and re-clustered into `target_centroids` new
/// centroids with Lloyd's algorithm. Random initialization is driven by
/// an explicit seed fixed at construction, so every aggregate call is
/// reproducible; assignment ties go to the lowest-index centroid.
#[derive(Clone, Debug)]
pub struct ClusterConsensus {
    target_centroids: usize,
    iterations: usize,
    seed: u64,
}

impl ClusterConsensus {
    /// Create with the target centroid count and a reproducibility seed.
    pub fn new(target_centroids: usize, seed: u64) -> Result<Self> {
        if target_centroids == 0 {
            return Err(Error::Configuration(
                "target centroid count must be positive".to_string(),
            ));
        }
        Ok(Self {
            target_centroids,
            iterations: 20,
            seed,
        })
    }

    /// Set the number of Lloyd iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

impl AggregationProtocol for ClusterConsensus {
    fn name(&self) -> &'static str {
        "cluster_consensus"
    }

    fn aggregate(
        &self,
        params: &[ModelParameters],
        weights: Option<&[f32]>,
    ) -> Result<ModelParameters> {
        check_inputs(params, weights)?;

        // Blocks are centroids; within a node they must share one dimension.
        let dim = params[0].blocks.first().map(|b| b.len()).unwrap_or(0);
        let mut pool: Vec<Vec<f32>> = Vec::new();
        for p in params {
            for block in &p.blocks {
                if block.len() != dim {
                    return Err(Error::ShapeMismatch {
                        expected: format!("centroid dimension {}", dim),
                        found: format!("centroid dimension {}", block.len()),
                    });
                }
                pool.push(block.clone());
            }
        }

        if pool.len() < self.target_centroids {
            return Err(Error::Configuration(format!(
                "{} pooled centroids cannot form {} clusters",
                pool.len(),
                self.target_centroids
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let centroids = kmeans(&pool, self.target_centroids, self.iterations, &mut rng);
        Ok(ModelParameters::new(centroids))
    }
}

/// Lloyd's k-means over `points`, returning `k` centroids.
///
/// Initialization picks `k` distinct points via `rng`. Assignment uses
/// squared euclidean distance with ties broken by lowest centroid index;
/// a cluster left empty keeps its previous centroid.
pub(crate) fn kmeans(
    points: &[Vec<f32>],
    k: usize,
    iterations: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f32>> {
    debug_assert!(points.len() >= k && k > 0);

    let mut centroids: Vec<Vec<f32>> = sample(rng, points.len(), k)
        .into_iter()
        .map(|i| points[i].clone())
        .collect();

    for _ in 0..iterations {
        let assignments: Vec<usize> = points
            .iter()
            .map(|p| nearest_centroid(p, &centroids))
            .collect();

        let dim = centroids[0].len();
        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (point, &cluster) in points.iter().zip(assignments.iter()) {
            counts[cluster] += 1;
            for (s, x) in sums[cluster].iter_mut().zip(point.iter()) {
                *s += x;
            }
        }

        for (cluster, count) in counts.iter().enumerate() {
            if *count > 0 {
                for (c, s) in centroids[cluster].iter_mut().zip(sums[cluster].iter()) {
                    *c = s / *count as f32;
                }
            }
        }
    }

    centroids
}

/// Index of the closest centroid by squared distance, lowest index wins ties.
pub(crate) fn nearest_centroid(point: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let dist: f32 = point
            .iter()
            .zip(c.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_params() -> Vec<ModelParameters> {
        // Two nodes, each holding one centroid near 0 and one near 10.
        vec![
            ModelParameters::new(vec![vec![0.1, 0.0], vec![10.0, 10.1]]),
            ModelParameters::new(vec![vec![-0.1, 0.2], vec![9.9, 10.0]]),
        ]
    }

    #[test]
    fn test_rejects_zero_targets() {
        assert!(ClusterConsensus::new(0, 7).is_err());
    }

    #[test]
    fn test_consensus_finds_both_clusters() {
        let agg = ClusterConsensus::new(2, 42).unwrap();
        let result = agg.aggregate(&two_cluster_params(), None).unwrap();

        assert_eq!(result.num_blocks(), 2);
        let mut magnitudes: Vec<f32> = result
            .blocks
            .iter()
            .map(|c| c.iter().map(|x| x.abs()).sum::<f32>())
            .collect();
        magnitudes.sort_by(|a, b| a.partial_cmp(b).unwrap());

        // One consensus centroid near the origin, one near (10, 10).
        assert!(magnitudes[0] < 1.0);
        assert!((magnitudes[1] - 20.0).abs() < 1.0);
    }

    #[test]
    fn test_consensus_deterministic_for_seed() {
        let agg = ClusterConsensus::new(2, 123).unwrap();
        let a = agg.aggregate(&two_cluster_params(), None).unwrap();
        let b = agg.aggregate(&two_cluster_params(), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_few_centroids() {
        let agg = ClusterConsensus::new(5, 0).unwrap();
        let params = vec![ModelParameters::new(vec![vec![1.0], vec![2.0]])];
        assert!(matches!(
            agg.aggregate(&params, None),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_mixed_centroid_dims_rejected() {
        let agg = ClusterConsensus::new(1, 0).unwrap();
        let params = vec![ModelParameters::new(vec![vec![1.0, 2.0], vec![3.0]])];
        assert!(matches!(
            agg.aggregate(&params, None),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_nearest_centroid_tie_breaks_low() {
        let centroids = vec![vec![1.0], vec![1.0]];
        assert_eq!(nearest_centroid(&[1.0], &centroids), 0);
    }

    #[test]
    fn test_kmeans_converges_on_means() {
        let points = vec![vec![0.0], vec![2.0], vec![10.0], vec![12.0]];
        let mut rng = StdRng::seed_from_u64(9);
        let mut centroids = kmeans(&points, 2, 30, &mut rng);
        centroids.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap());

        assert!((centroids[0][0] - 1.0).abs() < 1e-3);
        assert!((centroids[1][0] - 11.0).abs() < 1e-3);
    }
}

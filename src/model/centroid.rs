//! Reference centroid model for cluster-consensus federations.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::aggregator::cluster::{kmeans, nearest_centroid};
use crate::core::{Error, MetricSnapshot, ModelParameters, Result};
use crate::model::{TrainableModel, TrainingReport};

/// K-means model: one parameter block per centroid.
///
/// Local training re-clusters the node's records with a seeded k-means,
/// so training is deterministic per node. Predictions are the index of
/// the nearest centroid; evaluation reports mean nearest-centroid
/// distance as the loss and assignment agreement with the labels as
/// accuracy.
pub struct CentroidModel {
    centroids: Vec<Vec<f32>>,
    k: usize,
    iterations: usize,
    seed: u64,
}

impl CentroidModel {
    /// Create an untrained model with `k` target centroids and a seed.
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            centroids: Vec::new(),
            k,
            iterations: 20,
            seed,
        }
    }

    /// Set the number of Lloyd iterations per training call.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Current centroids.
    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }
}

#[async_trait]
impl TrainableModel for CentroidModel {
    async fn train(&mut self, records: &[Vec<f32>], _labels: &[f32]) -> Result<TrainingReport> {
        if records.len() < self.k {
            return Err(Error::Internal(format!(
                "{} records cannot form {} clusters",
                records.len(),
                self.k
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        self.centroids = kmeans(records, self.k, self.iterations, &mut rng);

        let loss = mean_distance(records, &self.centroids);
        Ok(TrainingReport {
            loss,
            samples_trained: records.len(),
            epochs: self.iterations,
        })
    }

    fn predict(&self, records: &[Vec<f32>]) -> Vec<f32> {
        records
            .iter()
            .map(|r| nearest_centroid(r, &self.centroids) as f32)
            .collect()
    }

    fn get_parameters(&self) -> ModelParameters {
        ModelParameters::new(self.centroids.clone())
    }

    fn set_parameters(&mut self, params: ModelParameters) -> Result<()> {
        if params.num_blocks() != self.k {
            return Err(Error::ShapeMismatch {
                expected: format!("{} centroids", self.k),
                found: format!("{} centroids", params.num_blocks()),
            });
        }
        self.centroids = params.blocks;
        Ok(())
    }

    fn evaluate(&self, records: &[Vec<f32>], labels: &[f32]) -> MetricSnapshot {
        if records.is_empty() || self.centroids.is_empty() {
            return MetricSnapshot::default();
        }

        let assignments = self.predict(records);
        let hits = assignments
            .iter()
            .zip(labels.iter())
            .filter(|(a, y)| a.round() == y.round())
            .count();

        MetricSnapshot {
            loss: mean_distance(records, &self.centroids),
            accuracy: hits as f32 / records.len() as f32,
        }
    }
}

fn mean_distance(records: &[Vec<f32>], centroids: &[Vec<f32>]) -> f32 {
    if records.is_empty() || centroids.is_empty() {
        return 0.0;
    }
    let total: f32 = records
        .iter()
        .map(|r| {
            let c = &centroids[nearest_centroid(r, centroids)];
            r.iter()
                .zip(c.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        })
        .sum();
    total / records.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_records() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.1],
            vec![0.2, 0.0],
            vec![-0.1, 0.1],
            vec![10.0, 9.9],
            vec![10.1, 10.0],
            vec![9.9, 10.2],
        ]
    }

    #[tokio::test]
    async fn test_training_finds_clusters() {
        let mut model = CentroidModel::new(2, 7);
        let records = clustered_records();
        let report = model.train(&records, &[]).await.unwrap();

        assert_eq!(report.samples_trained, 6);
        assert!(report.loss < 0.5);
        assert_eq!(model.centroids().len(), 2);
    }

    #[tokio::test]
    async fn test_training_deterministic_per_seed() {
        let records = clustered_records();
        let mut a = CentroidModel::new(2, 11);
        let mut b = CentroidModel::new(2, 11);

        a.train(&records, &[]).await.unwrap();
        b.train(&records, &[]).await.unwrap();
        assert_eq!(a.get_parameters(), b.get_parameters());
    }

    #[tokio::test]
    async fn test_too_few_records() {
        let mut model = CentroidModel::new(5, 0);
        assert!(model.train(&[vec![1.0]], &[]).await.is_err());
    }

    #[test]
    fn test_set_parameters_checks_count() {
        let mut model = CentroidModel::new(2, 0);
        let err = model
            .set_parameters(ModelParameters::new(vec![vec![1.0]]))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        model
            .set_parameters(ModelParameters::new(vec![vec![0.0], vec![10.0]]))
            .unwrap();
        assert_eq!(model.predict(&[vec![9.0]]), vec![1.0]);
    }
}

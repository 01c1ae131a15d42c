//! Reference linear regression model trained by gradient descent.

use async_trait::async_trait;
use rand::Rng;

use crate::core::{MetricSnapshot, ModelParameters, Result};
use crate::model::{TrainableModel, TrainingReport};

/// Linear model: feature weights plus a trailing bias, one parameter block.
///
/// Trained with full-batch MSE gradient descent. Accuracy is the fraction
/// of predictions that round to the true label, so integer-labeled data
/// behaves like classification.
pub struct LinearModel {
    weights: Vec<f32>,
    learning_rate: f32,
    epochs: usize,
}

impl LinearModel {
    /// Create with random initialization for `feature_dim` features.
    pub fn new(feature_dim: usize) -> Self {
        let mut rng = rand::thread_rng();
        let scale = (2.0 / (feature_dim + 1) as f32).sqrt();
        let weights = (0..feature_dim + 1)
            .map(|_| rng.gen::<f32>() * scale - scale / 2.0)
            .collect();
        Self {
            weights,
            learning_rate: 0.01,
            epochs: 10,
        }
    }

    /// Create with zeroed weights; deterministic, useful in tests.
    pub fn zeroed(feature_dim: usize) -> Self {
        Self {
            weights: vec![0.0; feature_dim + 1],
            learning_rate: 0.01,
            epochs: 10,
        }
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set epochs per training call.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    fn forward(&self, record: &[f32]) -> f32 {
        let bias = *self.weights.last().unwrap_or(&0.0);
        self.weights
            .iter()
            .zip(record.iter())
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + bias
    }
}

#[async_trait]
impl TrainableModel for LinearModel {
    async fn train(&mut self, records: &[Vec<f32>], labels: &[f32]) -> Result<TrainingReport> {
        if records.is_empty() {
            return Ok(TrainingReport::default());
        }

        let n = records.len() as f32;
        let mut last_loss = 0.0;

        for _ in 0..self.epochs {
            let mut gradients = vec![0.0; self.weights.len()];
            let mut epoch_loss = 0.0;

            for (record, &label) in records.iter().zip(labels.iter()) {
                let error = self.forward(record) - label;
                epoch_loss += error * error;
                for (i, g) in gradients.iter_mut().enumerate() {
                    if i < record.len() {
                        *g += 2.0 * error * record[i];
                    } else {
                        *g += 2.0 * error; // bias gradient
                    }
                }
            }

            for (w, g) in self.weights.iter_mut().zip(gradients.iter()) {
                *w -= self.learning_rate * g / n;
            }
            last_loss = epoch_loss / n;
        }

        Ok(TrainingReport {
            loss: last_loss,
            samples_trained: records.len(),
            epochs: self.epochs,
        })
    }

    fn predict(&self, records: &[Vec<f32>]) -> Vec<f32> {
        records.iter().map(|r| self.forward(r)).collect()
    }

    fn get_parameters(&self) -> ModelParameters {
        ModelParameters::single(self.weights.clone())
    }

    fn set_parameters(&mut self, params: ModelParameters) -> Result<()> {
        params.check_shape(&[self.weights.len()])?;
        self.weights = params.blocks.into_iter().next().unwrap_or_default();
        Ok(())
    }

    fn evaluate(&self, records: &[Vec<f32>], labels: &[f32]) -> MetricSnapshot {
        if records.is_empty() {
            return MetricSnapshot::default();
        }

        let predictions = self.predict(records);
        let n = records.len() as f32;
        let loss = predictions
            .iter()
            .zip(labels.iter())
            .map(|(p, y)| (p - y) * (p - y))
            .sum::<f32>()
            / n;
        let hits = predictions
            .iter()
            .zip(labels.iter())
            .filter(|(p, y)| p.round() == y.round())
            .count();

        MetricSnapshot {
            loss,
            accuracy: hits as f32 / n,
        }
    }
}

//! Model contracts consumed by the coordination core.
//!
//! The core never inspects parameter contents beyond shape; anything
//! implementing [`TrainableModel`] can participate in a federation. Two
//! reference implementations are provided for tests and demos: a linear
//! regression model and a centroid (k-means) model.

pub mod centroid;
pub mod linear;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{MetricSnapshot, ModelParameters, Result};

pub use centroid::CentroidModel;
pub use linear::LinearModel;

/// Result of one local training call.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Final average loss
    pub loss: f32,
    /// Number of samples trained on
    pub samples_trained: usize,
    /// Epochs completed
    pub epochs: usize,
}

/// A model that can be trained locally and exchanged by parameters.
#[async_trait]
pub trait TrainableModel: Send + Sync {
    /// Train on labeled data, mutating the model in place.
    async fn train(&mut self, records: &[Vec<f32>], labels: &[f32]) -> Result<TrainingReport>;

    /// Predict labels for records.
    fn predict(&self, records: &[Vec<f32>]) -> Vec<f32>;

    /// Current parameters defining the model.
    fn get_parameters(&self) -> ModelParameters;

    /// Replace the parameters defining the model. Shape-checked.
    fn set_parameters(&mut self, params: ModelParameters) -> Result<()>;

    /// Evaluate against labeled data.
    fn evaluate(&self, records: &[Vec<f32>], labels: &[f32]) -> MetricSnapshot;
}

/// Builds fresh model instances for nodes that have none yet.
pub trait ModelFactory: Send + Sync {
    /// Construct a new untrained model.
    fn build(&self) -> Box<dyn TrainableModel>;
}

impl<F> ModelFactory for F
where
    F: Fn() -> Box<dyn TrainableModel> + Send + Sync,
{
    fn build(&self) -> Box<dyn TrainableModel> {
        self()
    }
}

//! Private data containers and the values that may leave a node.

use serde::{Deserialize, Serialize};

use crate::core::ModelParameters;

/// Labeled data held by exactly one node.
///
/// Mutable in place by federated transformations; never shared across nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledData {
    /// Feature rows
    pub records: Vec<Vec<f32>>,
    /// One label per record
    pub labels: Vec<f32>,
}

impl LabeledData {
    /// Create from records and labels.
    pub fn new(records: Vec<Vec<f32>>, labels: Vec<f32>) -> Self {
        Self { records, labels }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of features per record (0 for an empty dataset).
    pub fn feature_dim(&self) -> usize {
        self.records.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Compute summary statistics over the records.
    pub fn summary(&self) -> DataSummary {
        if self.is_empty() {
            return DataSummary::default();
        }

        let n = self.len() as f32;
        let dim = self.feature_dim();

        let mut feature_means = vec![0.0; dim];
        for r in &self.records {
            for (i, &x) in r.iter().enumerate() {
                feature_means[i] += x;
            }
        }
        for mean in &mut feature_means {
            *mean /= n;
        }

        let mut feature_variances = vec![0.0; dim];
        for r in &self.records {
            for (i, &x) in r.iter().enumerate() {
                feature_variances[i] += (x - feature_means[i]).powi(2);
            }
        }
        for var in &mut feature_variances {
            *var /= n;
        }

        let label_mean = self.labels.iter().sum::<f32>() / n;

        DataSummary {
            sample_count: self.len(),
            feature_means,
            feature_variances,
            label_mean,
        }
    }
}

/// Summary statistics over one node's private records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Number of records summarized
    pub sample_count: usize,
    /// Per-feature means
    pub feature_means: Vec<f32>,
    /// Per-feature variances
    pub feature_variances: Vec<f32>,
    /// Mean of labels
    pub label_mean: f32,
}

/// A value released from behind a node's access gate.
///
/// Always a by-value copy; a node never hands out references to its
/// private state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PrivateValue {
    /// A copy of the node's labeled records
    Records(LabeledData),
    /// Summary statistics only
    Statistics(DataSummary),
    /// The local model's parameters
    Parameters(ModelParameters),
}

impl PrivateValue {
    /// Expect model parameters, failing otherwise.
    pub fn into_parameters(self) -> Option<ModelParameters> {
        match self {
            PrivateValue::Parameters(p) => Some(p),
            _ => None,
        }
    }

    /// Expect labeled records, failing otherwise.
    pub fn into_records(self) -> Option<LabeledData> {
        match self {
            PrivateValue::Records(d) => Some(d),
            _ => None,
        }
    }

    /// Expect summary statistics, failing otherwise.
    pub fn into_statistics(self) -> Option<DataSummary> {
        match self {
            PrivateValue::Statistics(s) => Some(s),
            _ => None,
        }
    }
}

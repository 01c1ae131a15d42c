//! A data node: one participant's private data, gate and local model.

use tracing::debug;

use crate::core::{Error, MetricSnapshot, NodeId, ModelParameters, Result};
use crate::federated::transformation::FederatedTransformation;
use crate::model::{ModelFactory, TrainableModel, TrainingReport};
use crate::private::data::{LabeledData, PrivateValue};
use crate::private::filter::PrivacyFilter;
use crate::private::gate::{DataAccessGate, QueryOutcome};
use crate::private::query::Query;

/// Autonomous holder of private data participating in federated training.
///
/// Owns exactly one [`LabeledData`] instance, one [`DataAccessGate`], and
/// a lazily created local model. Private data is never returned by
/// reference; reads happen only through [`DataNode::query`], by value,
/// and only if the gate's filter permits.
pub struct DataNode {
    id: NodeId,
    data: LabeledData,
    gate: DataAccessGate,
    model: Option<Box<dyn TrainableModel>>,
}

impl DataNode {
    /// Create a node owning `data`, with an unprotected gate.
    pub fn new(data: LabeledData) -> Self {
        Self {
            id: NodeId::new(),
            data,
            gate: DataAccessGate::new(),
            model: None,
        }
    }

    /// This node's identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Number of private records.
    pub fn sample_count(&self) -> usize {
        self.data.len()
    }

    /// The node's access gate (read-only view).
    pub fn gate(&self) -> &DataAccessGate {
        &self.gate
    }

    /// Whether a local model has been created.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Replace the gate's active filter. Returns the new generation.
    pub fn configure_access(&mut self, filter: Box<dyn PrivacyFilter>) -> u64 {
        self.gate.configure(filter)
    }

    /// Apply a transformation to the private data in place.
    ///
    /// On failure the data's state is not guaranteed; the error is
    /// reported as [`Error::Transformation`] tagged with this node.
    pub fn apply_transformation(&mut self, t: &dyn FederatedTransformation) -> Result<()> {
        t.apply(&mut self.data).map_err(|e| Error::Transformation {
            node: self.id.to_string(),
            detail: e.to_string(),
        })
    }

    /// Execute a declared query under the access gate.
    ///
    /// The candidate value is built by kind (a copy of the records, a
    /// computed summary, or the model's current parameters) and then
    /// passed through the filter. Denial is an explicit
    /// [`Error::AccessDenied`], distinguishable from success with an
    /// empty value.
    pub fn query(&self, query: &Query) -> Result<QueryOutcome> {
        let candidate = match query {
            Query::FullRecord => PrivateValue::Records(self.data.clone()),
            Query::SummaryStatistics => PrivateValue::Statistics(self.data.summary()),
            Query::ModelParams => {
                let model = self.model.as_ref().ok_or_else(|| {
                    Error::Internal(format!("node {} has no local model", self.id))
                })?;
                PrivateValue::Parameters(model.get_parameters())
            }
        };
        self.gate.execute(query, candidate)
    }

    /// Make sure a local model exists, building one via `factory` if not.
    pub fn ensure_model(&mut self, factory: &dyn ModelFactory) {
        if self.model.is_none() {
            debug!(node = %self.id, "building local model");
            self.model = Some(factory.build());
        }
    }

    /// Train the local model on the node's current private data.
    ///
    /// Builds the model via `factory` first if none exists. Raw data never
    /// leaves the node; only the training report does.
    pub async fn train_model(&mut self, factory: &dyn ModelFactory) -> Result<TrainingReport> {
        self.ensure_model(factory);
        match self.model.as_mut() {
            Some(model) => model.train(&self.data.records, &self.data.labels).await,
            None => Err(Error::Internal(format!(
                "node {} factory produced no model",
                self.id
            ))),
        }
    }

    /// Push global parameters into the local model.
    pub fn set_model_params(&mut self, params: ModelParameters) -> Result<()> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| Error::Internal(format!("node {} has no local model", self.id)))?;
        model.set_parameters(params)
    }

    /// Predict with the local model.
    pub fn predict(&self, records: &[Vec<f32>]) -> Result<Vec<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::Internal(format!("node {} has no local model", self.id)))?;
        Ok(model.predict(records))
    }

    /// Evaluate the local model against external labeled data.
    pub fn evaluate_local(&self, records: &[Vec<f32>], labels: &[f32]) -> Result<MetricSnapshot> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::Internal(format!("node {} has no local model", self.id)))?;
        Ok(model.evaluate(records, labels))
    }
}

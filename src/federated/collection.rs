//! Federated collection: an arena of data nodes plus a shared test split.

use futures::future::join_all;
use tracing::{info, warn};

use crate::core::{Error, NodeId, Result};
use crate::federated::transformation::FederatedTransformation;
use crate::model::{ModelFactory, TrainingReport};
use crate::private::filter::PrivacyFilter;
use crate::private::gate::QueryOutcome;
use crate::private::node::DataNode;
use crate::private::query::Query;
use crate::private::LabeledData;

/// Held-out evaluation data shared by the federation, owned by no node.
#[derive(Clone, Debug, Default)]
pub struct EvaluationSplit {
    /// Feature rows
    pub records: Vec<Vec<f32>>,
    /// One label per record
    pub labels: Vec<f32>,
}

impl EvaluationSplit {
    /// Create from records and labels.
    pub fn new(records: Vec<Vec<f32>>, labels: Vec<f32>) -> Self {
        Self { records, labels }
    }
}

/// A failure on one node during a best-effort fan-out.
#[derive(Debug)]
pub struct NodeFailure {
    /// Failing node
    pub node: NodeId,
    /// Position of the node in the collection
    pub index: usize,
    /// What went wrong
    pub error: Error,
}

/// Ordered collection of data nodes.
///
/// Owns its nodes exclusively; the node count is fixed after
/// construction. Nodes may be reconfigured but never added or removed
/// mid-run. All bulk operations go through each node's own access gate.
pub struct FederatedCollection {
    nodes: Vec<DataNode>,
    evaluation: EvaluationSplit,
}

impl FederatedCollection {
    /// Create from pre-built nodes and a shared evaluation split.
    pub fn new(nodes: Vec<DataNode>, evaluation: EvaluationSplit) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::Configuration(
                "a federation needs at least one node".to_string(),
            ));
        }
        Ok(Self { nodes, evaluation })
    }

    /// Split one dataset near-evenly across `num_nodes` fresh nodes.
    pub fn federate_evenly(
        records: Vec<Vec<f32>>,
        labels: Vec<f32>,
        num_nodes: usize,
        evaluation: EvaluationSplit,
    ) -> Result<Self> {
        if num_nodes == 0 {
            return Err(Error::Configuration(
                "cannot federate across zero nodes".to_string(),
            ));
        }
        if records.len() != labels.len() {
            return Err(Error::Configuration(format!(
                "records/labels length mismatch: {} vs {}",
                records.len(),
                labels.len()
            )));
        }

        let total = records.len();
        let split = total as f32 / num_nodes as f32;
        let mut nodes = Vec::with_capacity(num_nodes);
        let mut records = records.into_iter();
        let mut labels = labels.into_iter();

        for i in 0..num_nodes {
            let end = ((i + 1) as f32 * split).round() as usize;
            let start = (i as f32 * split).round() as usize;
            let take = end.min(total) - start;
            let node_records: Vec<_> = records.by_ref().take(take).collect();
            let node_labels: Vec<_> = labels.by_ref().take(take).collect();
            nodes.push(DataNode::new(LabeledData::new(node_records, node_labels)));
        }

        Self::new(nodes, evaluation)
    }

    /// Number of nodes (fixed for the collection's lifetime).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> Option<&DataNode> {
        self.nodes.get(index)
    }

    /// Mutable node at `index`.
    pub fn node_mut(&mut self, index: usize) -> Option<&mut DataNode> {
        self.nodes.get_mut(index)
    }

    /// All nodes, in collection order.
    pub fn nodes(&self) -> &[DataNode] {
        &self.nodes
    }

    /// Mutable view of all nodes.
    pub fn nodes_mut(&mut self) -> &mut [DataNode] {
        &mut self.nodes
    }

    /// Node identifiers, in collection order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    /// The shared held-out evaluation split.
    pub fn evaluation(&self) -> &EvaluationSplit {
        &self.evaluation
    }

    /// Apply a transformation to every node's private data, best effort.
    ///
    /// A failure on one node does not stop the fan-out; all failures are
    /// collected and returned together. An empty result means every node
    /// succeeded.
    pub fn apply_transformation_to_all(
        &mut self,
        t: &dyn FederatedTransformation,
    ) -> Vec<NodeFailure> {
        let mut failures = Vec::new();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let Err(error) = node.apply_transformation(t) {
                warn!(node = %node.id(), %error, "transformation failed");
                failures.push(NodeFailure {
                    node: node.id(),
                    index,
                    error,
                });
            }
        }
        failures
    }

    /// Query every node, preserving collection order.
    ///
    /// Denials appear as `Err(AccessDenied)` entries so callers can
    /// correlate results back to node identity and weight.
    pub fn query_all(&self, query: &Query) -> Vec<(NodeId, Result<QueryOutcome>)> {
        self.nodes
            .iter()
            .map(|n| (n.id(), n.query(query)))
            .collect()
    }

    /// Reconfigure every node's access gate.
    ///
    /// `make` builds one filter instance per node, keeping gate ownership
    /// exclusive. Explicit and reversible: callers wanting the previous
    /// behavior back reconfigure again. Returns the new gate generations
    /// in collection order.
    pub fn configure_access_for_all<F>(&mut self, mut make: F) -> Vec<u64>
    where
        F: FnMut() -> Box<dyn PrivacyFilter>,
    {
        let generations: Vec<u64> = self
            .nodes
            .iter_mut()
            .map(|n| n.configure_access(make()))
            .collect();
        info!(nodes = self.nodes.len(), "access reconfigured for all nodes");
        generations
    }

    /// Train every node's local model on its own private data.
    ///
    /// Per-node tasks run concurrently (each node owns disjoint state)
    /// and the call returns only once every task has completed or
    /// failed; this is the barrier before aggregation. Results preserve
    /// collection order.
    pub async fn train_all(
        &mut self,
        factory: &dyn ModelFactory,
    ) -> Vec<(NodeId, Result<TrainingReport>)> {
        let tasks = self.nodes.iter_mut().map(|node| async move {
            let id = node.id();
            (id, node.train_model(factory).await)
        });
        join_all(tasks).await
    }

    /// Aggregation weights proportional to node sample counts.
    ///
    /// Computed from the current datasets; the orchestrator captures them
    /// once at setup and treats them as immutable thereafter.
    pub fn proportional_weights(&self) -> Vec<f32> {
        let total: usize = self.nodes.iter().map(|n| n.sample_count()).sum();
        if total == 0 {
            return vec![0.0; self.nodes.len()];
        }
        self.nodes
            .iter()
            .map(|n| n.sample_count() as f32 / total as f32)
            .collect()
    }
}

//! The federated government: round-based orchestration to convergence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregator::AggregationProtocol;
use crate::core::{now, Error, MetricSnapshot, ModelParameters, NodeId, Result, Timestamp};
use crate::federated::FederatedCollection;
use crate::government::sink::MetricsSink;
use crate::model::{ModelFactory, TrainableModel};
use crate::private::Query;

/// Phase of the round state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// Between rounds
    Idle,
    /// Pushing global parameters to every node
    Distributing,
    /// Nodes training on their own private data
    LocalTraining,
    /// Retrieving node parameters through each access gate
    Collecting,
    /// Combining surviving nodes' parameters
    Aggregating,
    /// Scoring the aggregate on the held-out split
    Evaluating,
    /// Stopped on an unrecoverable error
    Failed,
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundPhase::Idle => write!(f, "idle"),
            RoundPhase::Distributing => write!(f, "distributing"),
            RoundPhase::LocalTraining => write!(f, "local_training"),
            RoundPhase::Collecting => write!(f, "collecting"),
            RoundPhase::Aggregating => write!(f, "aggregating"),
            RoundPhase::Evaluating => write!(f, "evaluating"),
            RoundPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Metrics emitted after one completed round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundMetrics {
    /// Round number, starting at 1
    pub round: u32,
    /// Nodes whose parameters entered the aggregate
    pub participants: usize,
    /// Nodes excluded because their gate denied the parameters query
    pub excluded: Vec<NodeId>,
    /// Nodes whose local training failed this round
    pub training_failures: Vec<NodeId>,
    /// Global model metrics on the held-out split
    pub global: MetricSnapshot,
    /// Per-client metrics on the same split
    pub clients: Vec<(NodeId, MetricSnapshot)>,
    /// When the round's Evaluating phase finished
    pub completed_at: Timestamp,
}

impl RoundMetrics {
    /// Serialize for export to external reporting sinks.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// All requested rounds ran
    Completed,
    /// Cancelled between phases
    Cancelled,
    /// Stopped by a round-fatal error
    Aborted(Error),
}

/// Result of `run_rounds`: per-round metrics plus the ending condition.
///
/// Metrics for rounds completed before an abort are always preserved.
#[derive(Debug)]
pub struct RunReport {
    /// Metrics of every completed round, in order
    pub rounds: Vec<RoundMetrics>,
    /// How the run ended
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Whether every requested round completed.
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed)
    }

    /// Number of completed rounds.
    pub fn completed_rounds(&self) -> usize {
        self.rounds.len()
    }
}

/// Handle for cancelling a running government between phases.
///
/// A cancellation applies to one run: once the government returns a
/// `Cancelled` report the request is consumed, and a later run starts
/// uncancelled.
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation. In-flight per-node work finishes; the next
    /// phase is refused.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives distribute, train, collect, aggregate and evaluate cycles.
///
/// Rounds are strictly sequenced: round r+1's Distributing never starts
/// before round r's Evaluating has completed. Aggregation weights are
/// captured from node sample counts at construction and re-normalized
/// per round over the surviving subset only.
pub struct FederatedGovernment {
    collection: FederatedCollection,
    aggregator: Box<dyn AggregationProtocol>,
    factory: Box<dyn ModelFactory>,
    global_model: Box<dyn TrainableModel>,
    global_params: Option<ModelParameters>,
    weights: Vec<f32>,
    phase: RoundPhase,
    sink: Option<Arc<dyn MetricsSink>>,
    cancel: Arc<AtomicBool>,
}

impl FederatedGovernment {
    /// Create a government over `collection`.
    ///
    /// Fails with a configuration error if the setup-time aggregation
    /// weights are unusable (all node datasets empty); weight problems
    /// never surface mid-run.
    pub fn new(
        collection: FederatedCollection,
        aggregator: Box<dyn AggregationProtocol>,
        factory: Box<dyn ModelFactory>,
    ) -> Result<Self> {
        let weights = collection.proportional_weights();
        if weights.iter().sum::<f32>() <= 0.0 {
            return Err(Error::Configuration(
                "every node dataset is empty, aggregation weights are all zero".to_string(),
            ));
        }

        let global_model = factory.build();
        info!(
            nodes = collection.num_nodes(),
            aggregator = aggregator.name(),
            "federated government created"
        );

        Ok(Self {
            collection,
            aggregator,
            factory,
            global_model,
            global_params: None,
            weights,
            phase: RoundPhase::Idle,
            sink: None,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attach a reporting sink.
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Handle for cancelling the run between phases.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Current global parameters, if any round has aggregated yet.
    pub fn global_parameters(&self) -> Option<&ModelParameters> {
        self.global_params.as_ref()
    }

    /// The node collection.
    pub fn collection(&self) -> &FederatedCollection {
        &self.collection
    }

    /// Mutable access to the collection, for reconfiguring nodes between
    /// runs. The node count stays fixed.
    pub fn collection_mut(&mut self) -> &mut FederatedCollection {
        &mut self.collection
    }

    /// Setup-time aggregation weights, in collection order.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Evaluate the current global model against labeled data.
    pub fn evaluate_global_model(
        &self,
        records: &[Vec<f32>],
        labels: &[f32],
    ) -> MetricSnapshot {
        self.global_model.evaluate(records, labels)
    }

    /// Run `rounds` using the collection's shared evaluation split.
    pub async fn run(&mut self, rounds: u32) -> RunReport {
        let eval = self.collection.evaluation().clone();
        self.run_rounds(rounds, &eval.records, &eval.labels).await
    }

    /// Execute `rounds` successive federated rounds.
    ///
    /// Synchronous round loop: each round runs to completion before the
    /// next begins. Returns metrics for every completed round; a fatal
    /// error aborts the loop and is reported alongside the rounds that
    /// did complete. `run_rounds(0, ..)` returns an empty report and
    /// leaves the global parameters untouched.
    pub async fn run_rounds(
        &mut self,
        rounds: u32,
        test_records: &[Vec<f32>],
        test_labels: &[f32],
    ) -> RunReport {
        let mut completed = Vec::new();

        for round in 1..=rounds {
            match self.run_round(round, test_records, test_labels).await {
                Ok(Some(metrics)) => {
                    if let Some(sink) = &self.sink {
                        sink.on_round(&metrics);
                    }
                    completed.push(metrics);
                }
                Ok(None) => {
                    info!(round, "run cancelled");
                    // Acknowledged; a later run starts uncancelled.
                    self.cancel.store(false, Ordering::SeqCst);
                    self.phase = RoundPhase::Idle;
                    return RunReport {
                        rounds: completed,
                        outcome: RunOutcome::Cancelled,
                    };
                }
                Err(err) => {
                    warn!(round, error = %err, "run aborted");
                    self.phase = RoundPhase::Failed;
                    return RunReport {
                        rounds: completed,
                        outcome: RunOutcome::Aborted(err),
                    };
                }
            }
        }

        self.phase = RoundPhase::Idle;
        RunReport {
            rounds: completed,
            outcome: RunOutcome::Completed,
        }
    }

    /// One full round. `Ok(None)` means cancellation refused a phase.
    async fn run_round(
        &mut self,
        round: u32,
        test_records: &[Vec<f32>],
        test_labels: &[f32],
    ) -> Result<Option<RoundMetrics>> {
        if !self.enter(round, RoundPhase::Distributing) {
            return Ok(None);
        }
        self.distribute()?;

        if !self.enter(round, RoundPhase::LocalTraining) {
            return Ok(None);
        }
        let training_failures = self.train_locally().await?;

        if !self.enter(round, RoundPhase::Collecting) {
            return Ok(None);
        }
        let (params, survivor_weights, excluded) = self.collect(&training_failures)?;

        if !self.enter(round, RoundPhase::Aggregating) {
            return Ok(None);
        }
        let participants = params.len();
        self.aggregate(&params, &survivor_weights)?;

        if !self.enter(round, RoundPhase::Evaluating) {
            return Ok(None);
        }
        let (global, clients) = self.evaluate(test_records, test_labels);

        Ok(Some(RoundMetrics {
            round,
            participants,
            excluded,
            training_failures,
            global,
            clients,
            completed_at: now(),
        }))
    }

    /// Enter `phase` unless cancellation refuses it.
    fn enter(&mut self, round: u32, phase: RoundPhase) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            info!(round, refused = %phase, "cancellation requested between phases");
            return false;
        }
        debug!(round, %phase, "entering phase");
        self.phase = phase;
        true
    }

    /// Distributing: push global parameters, or let nodes self-initialize
    /// on the first round when none exist yet.
    fn distribute(&mut self) -> Result<()> {
        let factory = &*self.factory;
        match &self.global_params {
            Some(params) => {
                for node in self.collection.nodes_mut() {
                    node.ensure_model(factory);
                    node.set_model_params(params.clone())?;
                }
            }
            None => {
                for node in self.collection.nodes_mut() {
                    node.ensure_model(factory);
                }
            }
        }
        Ok(())
    }

    /// LocalTraining: fan out, collect per-node failures; every node
    /// failing is fatal.
    async fn train_locally(&mut self) -> Result<Vec<NodeId>> {
        let factory = &*self.factory;
        let results = self.collection.train_all(factory).await;

        let mut failures = Vec::new();
        for (id, result) in &results {
            if let Err(err) = result {
                warn!(node = %id, error = %err, "local training failed");
                failures.push(*id);
            }
        }

        if failures.len() == results.len() {
            return Err(Error::NoViableParticipants);
        }
        Ok(failures)
    }

    /// Collecting: parameters through each gate; a denial excludes the
    /// node from this round, it is not an error.
    #[allow(clippy::type_complexity)]
    fn collect(
        &self,
        training_failures: &[NodeId],
    ) -> Result<(Vec<ModelParameters>, Vec<f32>, Vec<NodeId>)> {
        let mut params = Vec::new();
        let mut survivor_weights = Vec::new();
        let mut excluded = Vec::new();

        for (index, node) in self.collection.nodes().iter().enumerate() {
            if training_failures.contains(&node.id()) {
                continue;
            }
            match node.query(&Query::ModelParams) {
                Ok(outcome) => {
                    let p = outcome.value.into_parameters().ok_or_else(|| {
                        Error::Internal("parameters query released a non-parameter value".to_string())
                    })?;
                    params.push(p);
                    survivor_weights.push(self.weights[index]);
                }
                Err(err) if err.is_exclusion() => {
                    info!(node = %node.id(), reason = %err, "node excluded from round");
                    excluded.push(node.id());
                }
                Err(err) => return Err(err),
            }
        }

        Ok((params, survivor_weights, excluded))
    }

    /// Aggregating: combine survivors; zero survivors is fatal.
    fn aggregate(&mut self, params: &[ModelParameters], weights: &[f32]) -> Result<()> {
        if params.is_empty() {
            return Err(Error::NoViableParticipants);
        }

        let aggregated = self.aggregator.aggregate(params, Some(weights))?;
        self.global_model.set_parameters(aggregated.clone())?;
        self.global_params = Some(aggregated);
        Ok(())
    }

    /// Evaluating: observational snapshots, never rolls back the round.
    fn evaluate(
        &self,
        test_records: &[Vec<f32>],
        test_labels: &[f32],
    ) -> (MetricSnapshot, Vec<(NodeId, MetricSnapshot)>) {
        let global = self.global_model.evaluate(test_records, test_labels);
        let clients = self
            .collection
            .nodes()
            .iter()
            .filter(|n| n.has_model())
            .filter_map(|n| {
                n.evaluate_local(test_records, test_labels)
                    .ok()
                    .map(|m| (n.id(), m))
            })
            .collect();
        (global, clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::aggregator::{Mean, WeightedMean};
    use crate::federated::transformation::FederatedTransformation;
    use crate::federated::EvaluationSplit;
    use crate::government::sink::BufferSink;
    use crate::model::{LinearModel, ModelFactory, TrainableModel};
    use crate::privacy::RevokeAll;
    use crate::private::{LabeledData, Unprotected};

    struct ZeroEverything;

    impl FederatedTransformation for ZeroEverything {
        fn apply(&self, data: &mut LabeledData) -> Result<()> {
            for record in &mut data.records {
                for x in record.iter_mut() {
                    *x = 0.0;
                }
            }
            for label in &mut data.labels {
                *label = 0.0;
            }
            Ok(())
        }
    }

    /// Model that trains once and fails on every later call.
    #[derive(Default)]
    struct SingleShotModel {
        trained: bool,
    }

    #[async_trait::async_trait]
    impl TrainableModel for SingleShotModel {
        async fn train(
            &mut self,
            records: &[Vec<f32>],
            _labels: &[f32],
        ) -> Result<crate::model::TrainingReport> {
            if self.trained {
                return Err(Error::Internal("training budget exhausted".to_string()));
            }
            self.trained = true;
            Ok(crate::model::TrainingReport {
                loss: 0.0,
                samples_trained: records.len(),
                epochs: 1,
            })
        }

        fn predict(&self, records: &[Vec<f32>]) -> Vec<f32> {
            vec![0.0; records.len()]
        }

        fn get_parameters(&self) -> ModelParameters {
            ModelParameters::single(vec![0.0, 0.0])
        }

        fn set_parameters(&mut self, _params: ModelParameters) -> Result<()> {
            Ok(())
        }

        fn evaluate(&self, _records: &[Vec<f32>], _labels: &[f32]) -> MetricSnapshot {
            MetricSnapshot::default()
        }
    }

    /// Factory handing out models of a different shape on every call.
    struct MismatchedFactory {
        calls: AtomicUsize,
    }

    impl ModelFactory for MismatchedFactory {
        fn build(&self) -> Box<dyn TrainableModel> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::new(LinearModel::zeroed(1 + n))
        }
    }

    fn linear_factory() -> Box<dyn ModelFactory> {
        Box::new(|| Box::new(LinearModel::zeroed(1)) as Box<dyn TrainableModel>)
    }

    fn collection(num_nodes: usize) -> FederatedCollection {
        let records: Vec<Vec<f32>> = (0..num_nodes * 5).map(|i| vec![i as f32 / 10.0]).collect();
        let labels: Vec<f32> = records.iter().map(|r| 2.0 * r[0] + 1.0).collect();
        let eval = EvaluationSplit::new(records.clone(), labels.clone());
        FederatedCollection::federate_evenly(records, labels, num_nodes, eval).unwrap()
    }

    fn government(num_nodes: usize) -> FederatedGovernment {
        FederatedGovernment::new(collection(num_nodes), Box::new(Mean), linear_factory()).unwrap()
    }

    #[tokio::test]
    async fn test_zero_rounds_is_empty_and_unset() {
        let mut gov = government(3);
        let report = gov.run(0).await;

        assert!(report.is_complete());
        assert_eq!(report.completed_rounds(), 0);
        assert!(gov.global_parameters().is_none());
        assert_eq!(gov.phase(), RoundPhase::Idle);
    }

    #[tokio::test]
    async fn test_single_round_completes() {
        let mut gov = government(3);
        let report = gov.run(1).await;

        assert!(report.is_complete());
        assert_eq!(report.completed_rounds(), 1);
        assert_eq!(report.rounds[0].participants, 3);
        assert!(report.rounds[0].excluded.is_empty());
        assert!(gov.global_parameters().is_some());
    }

    #[tokio::test]
    async fn test_zeroed_nodes_converge_identically() {
        // Three equal nodes, a transformation zeroing all features and
        // labels: after one round every node's parameters are identical.
        let mut c = collection(3);
        let failures = c.apply_transformation_to_all(&ZeroEverything);
        assert!(failures.is_empty());

        let mut gov = FederatedGovernment::new(c, Box::new(Mean), linear_factory()).unwrap();
        let report = gov.run(1).await;
        assert!(report.is_complete());

        let mut released = Vec::new();
        for (_, result) in gov.collection().query_all(&Query::ModelParams) {
            released.push(result.unwrap().value.into_parameters().unwrap());
        }
        assert_eq!(released.len(), 3);
        assert_eq!(released[0], released[1]);
        assert_eq!(released[1], released[2]);
    }

    #[tokio::test]
    async fn test_denying_node_is_excluded_not_error() {
        let mut c = collection(3);
        let denier = c.node(1).unwrap().id();
        c.node_mut(1)
            .unwrap()
            .configure_access(Box::new(RevokeAll::new("opted out")));

        let mut gov = FederatedGovernment::new(c, Box::new(Mean), linear_factory()).unwrap();
        let report = gov.run(1).await;

        assert!(report.is_complete());
        let round = &report.rounds[0];
        assert_eq!(round.participants, 2);
        assert_eq!(round.excluded, vec![denier]);
        assert!(round.training_failures.is_empty());
    }

    #[tokio::test]
    async fn test_all_nodes_denying_aborts() {
        let mut c = collection(3);
        c.configure_access_for_all(|| Box::new(RevokeAll::default()));

        let mut gov = FederatedGovernment::new(c, Box::new(Mean), linear_factory()).unwrap();
        let report = gov.run(1).await;

        assert_eq!(report.completed_rounds(), 0);
        assert!(matches!(
            report.outcome,
            RunOutcome::Aborted(Error::NoViableParticipants)
        ));
        assert_eq!(gov.phase(), RoundPhase::Failed);
    }

    #[tokio::test]
    async fn test_abort_preserves_round_history() {
        // Models whose second training call fails: round 1 completes,
        // round 2 loses every node and aborts, round 1 metrics survive.
        let factory = Box::new(|| Box::new(SingleShotModel::default()) as Box<dyn TrainableModel>);
        let mut gov =
            FederatedGovernment::new(collection(3), Box::new(Mean), factory).unwrap();

        let report = gov.run(3).await;

        assert_eq!(report.completed_rounds(), 1);
        assert_eq!(report.rounds[0].round, 1);
        assert!(matches!(
            report.outcome,
            RunOutcome::Aborted(Error::NoViableParticipants)
        ));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_fatal() {
        let factory = Box::new(MismatchedFactory {
            calls: AtomicUsize::new(0),
        });
        let mut gov = FederatedGovernment::new(collection(3), Box::new(Mean), factory).unwrap();

        let report = gov.run(1).await;
        assert_eq!(report.completed_rounds(), 0);
        assert!(matches!(
            report.outcome,
            RunOutcome::Aborted(Error::ShapeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_weighted_mean_government() {
        let c = collection(3);
        let weights = c.proportional_weights();
        let aggregator = WeightedMean::new(weights).unwrap();

        let mut gov =
            FederatedGovernment::new(c, Box::new(aggregator), linear_factory()).unwrap();
        let report = gov.run(2).await;

        assert!(report.is_complete());
        assert_eq!(report.completed_rounds(), 2);
    }

    #[tokio::test]
    async fn test_training_improves_global_model() {
        let mut gov = government(3);
        gov.run(1).await;
        let early = gov.evaluate_global_model(
            &gov.collection().evaluation().records.clone(),
            &gov.collection().evaluation().labels.clone(),
        );

        gov.run(20).await;
        let late = gov.evaluate_global_model(
            &gov.collection().evaluation().records.clone(),
            &gov.collection().evaluation().labels.clone(),
        );

        assert!(late.loss <= early.loss);
    }

    #[tokio::test]
    async fn test_cancellation_refuses_next_phase() {
        let mut gov = government(3);
        gov.cancel_handle().cancel();

        let report = gov.run(5).await;
        assert_eq!(report.completed_rounds(), 0);
        assert!(matches!(report.outcome, RunOutcome::Cancelled));
        assert_eq!(gov.phase(), RoundPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_government_runs_again() {
        let mut gov = government(2);
        gov.cancel_handle().cancel();

        let first = gov.run(2).await;
        assert!(matches!(first.outcome, RunOutcome::Cancelled));
        assert_eq!(first.completed_rounds(), 0);

        // The cancellation was consumed with the first report.
        let second = gov.run(2).await;
        assert!(second.is_complete());
        assert_eq!(second.completed_rounds(), 2);
    }

    #[tokio::test]
    async fn test_sink_receives_every_round() {
        let sink = Arc::new(BufferSink::new());
        let mut gov = government(2).with_sink(sink.clone());

        let report = gov.run(3).await;
        assert!(report.is_complete());
        assert_eq!(sink.len(), 3);

        let rounds: Vec<u32> = sink.snapshots().iter().map(|m| m.round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_per_client_metrics_reported() {
        let mut gov = government(3);
        let report = gov.run(1).await;
        assert_eq!(report.rounds[0].clients.len(), 3);
    }

    #[test]
    fn test_all_empty_datasets_rejected_at_setup() {
        let nodes = vec![
            crate::private::DataNode::new(LabeledData::default()),
            crate::private::DataNode::new(LabeledData::default()),
        ];
        let c = FederatedCollection::new(nodes, EvaluationSplit::default()).unwrap();
        let result = FederatedGovernment::new(c, Box::new(Mean), linear_factory());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_restored_filter_rejoins_next_round() {
        let mut c = collection(2);
        c.node_mut(0)
            .unwrap()
            .configure_access(Box::new(RevokeAll::default()));

        let mut gov = FederatedGovernment::new(c, Box::new(Mean), linear_factory()).unwrap();
        let first = gov.run(1).await;
        assert_eq!(first.rounds[0].participants, 1);

        gov.collection_mut()
            .node_mut(0)
            .unwrap()
            .configure_access(Box::new(Unprotected));
        let second = gov.run(1).await;
        assert_eq!(second.rounds[0].participants, 2);
        assert!(second.rounds[0].excluded.is_empty());
    }
}

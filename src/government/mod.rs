//! Round-based orchestration of a federation.
//!
//! The government drives distribute, local-train, collect, aggregate and
//! evaluate cycles over a node collection, excluding nodes whose gates
//! deny the parameters query and reporting metrics per round.

pub mod orchestrator;
pub mod sink;

pub use orchestrator::{
    CancelHandle, FederatedGovernment, RoundMetrics, RoundPhase, RunOutcome, RunReport,
};
pub use sink::{BufferSink, MetricsSink, TracingSink};

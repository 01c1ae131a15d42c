//! # fedgate - Federated Coordination with Gated Private Data
//!
//! A coordination engine for many data holders that must never expose
//! their raw records to a central party:
//! - **private**: per-node data containers behind mediated, revocable
//!   access gates
//! - **federated**: collection-level transformations and queries that
//!   never bypass a node's gate
//! - **aggregator**: pluggable protocols combining per-node model
//!   parameters (mean, weighted mean, cluster consensus)
//! - **government**: the round loop driving train, collect, aggregate
//!   and evaluate cycles
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fedgate::aggregator::Mean;
//! use fedgate::federated::{EvaluationSplit, FederatedCollection};
//! use fedgate::government::FederatedGovernment;
//! use fedgate::model::{LinearModel, TrainableModel};
//!
//! #[tokio::main]
//! async fn main() {
//!     let records: Vec<Vec<f32>> = (0..30).map(|i| vec![i as f32]).collect();
//!     let labels: Vec<f32> = records.iter().map(|r| 2.0 * r[0]).collect();
//!     let eval = EvaluationSplit::new(records.clone(), labels.clone());
//!
//!     let collection =
//!         FederatedCollection::federate_evenly(records, labels, 3, eval).unwrap();
//!     let factory = || Box::new(LinearModel::new(1)) as Box<dyn TrainableModel>;
//!
//!     let mut government =
//!         FederatedGovernment::new(collection, Box::new(Mean), Box::new(factory)).unwrap();
//!     let report = government.run(5).await;
//!     println!("completed {} rounds", report.completed_rounds());
//! }
//! ```

pub mod aggregator;
pub mod core;
pub mod federated;
pub mod government;
pub mod model;
pub mod monitoring;
pub mod privacy;
pub mod private;

pub use crate::core::error::{Error, Result};

//! Private data, access control and the data node.
//!
//! Everything a node releases passes through its [`DataAccessGate`] and
//! the gate's currently configured [`PrivacyFilter`]. Unknown or
//! unconfigured query kinds fail closed.

pub mod data;
pub mod filter;
pub mod gate;
pub mod node;
pub mod query;

pub use data::{DataSummary, LabeledData, PrivateValue};
pub use filter::{Decision, PrivacyFilter, Unprotected};
pub use gate::{DataAccessGate, QueryOutcome};
pub use node::DataNode;
pub use query::Query;

//! Data access gate mediating every read of a node's private state.

use tracing::debug;

use crate::core::{now, Error, Result, Timestamp};
use crate::private::data::PrivateValue;
use crate::private::filter::{Decision, PrivacyFilter, Unprotected};
use crate::private::query::Query;

/// A value released by the gate, annotated with its provenance.
#[derive(Clone, Debug)]
pub struct QueryOutcome {
    /// The released value
    pub value: PrivateValue,
    /// Name of the filter variant that produced it
    pub filter: &'static str,
    /// Gate configuration generation in effect at release time
    pub gate_generation: u64,
    /// When the value was released
    pub at: Timestamp,
}

/// Access gate holding the node's currently configured privacy filter.
///
/// The gate owns exactly one filter at a time. Reconfiguration is an
/// explicit, ordered event: each call bumps the generation counter so
/// released values can be traced back to the configuration that produced
/// them. Already-returned results are unaffected by later reconfiguration.
pub struct DataAccessGate {
    filter: Box<dyn PrivacyFilter>,
    generation: u64,
    configured_at: Timestamp,
}

impl DataAccessGate {
    /// Create a gate with the explicit pass-through default.
    pub fn new() -> Self {
        Self {
            filter: Box::new(Unprotected),
            generation: 0,
            configured_at: now(),
        }
    }

    /// Replace the active filter. Returns the new configuration generation.
    pub fn configure(&mut self, filter: Box<dyn PrivacyFilter>) -> u64 {
        self.generation += 1;
        self.configured_at = now();
        debug!(
            filter = filter.name(),
            generation = self.generation,
            "access gate reconfigured"
        );
        self.filter = filter;
        self.generation
    }

    /// Current configuration generation (0 = untouched default).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Name of the active filter variant.
    pub fn filter_name(&self) -> &'static str {
        self.filter.name()
    }

    /// When the gate was last reconfigured.
    pub fn configured_at(&self) -> Timestamp {
        self.configured_at
    }

    /// Run `candidate` through the active filter for `query`.
    ///
    /// A denial maps to [`Error::AccessDenied`] carrying the reason only;
    /// the candidate value is dropped here and never logged.
    pub fn execute(&self, query: &Query, candidate: PrivateValue) -> Result<QueryOutcome> {
        match self.filter.decide(query, candidate) {
            Decision::Allow(value) => Ok(QueryOutcome {
                value,
                filter: self.filter.name(),
                gate_generation: self.generation,
                at: now(),
            }),
            Decision::Deny(reason) => {
                debug!(query = %query, filter = self.filter.name(), "query denied");
                Err(Error::AccessDenied { reason })
            }
        }
    }
}

impl Default for DataAccessGate {
    fn default() -> Self {
        Self::new()
    }
}

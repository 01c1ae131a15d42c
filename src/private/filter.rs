//! Privacy filter capability.
//!
//! A filter sees a declared query and the candidate value for it, and
//! decides whether to release the value unchanged, release a transformed
//! version, or refuse. Concrete mechanisms beyond the pass-through default
//! live in the `privacy` module.

use crate::private::data::PrivateValue;
use crate::private::query::Query;

/// Outcome of a filter decision.
#[derive(Clone, Debug)]
pub enum Decision {
    /// Release this (possibly transformed) value
    Allow(PrivateValue),
    /// Refuse, with a reason and no data payload
    Deny(String),
}

/// Capability deciding what leaves a node for a given query.
///
/// Implementations must be deterministic per query kind about *whether*
/// they allow, and must fail closed: a query kind the filter does not
/// recognize is denied, never passed through.
pub trait PrivacyFilter: Send + Sync {
    /// Stable name of the filter variant, recorded on query outcomes.
    fn name(&self) -> &'static str;

    /// Decide whether `value` may be released for `query`.
    fn decide(&self, query: &Query, value: PrivateValue) -> Decision;
}

/// Pass-through filter that releases every value unchanged.
///
/// The explicit default of a fresh gate, so unrestricted access is a
/// visible choice rather than an accident.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unprotected;

impl PrivacyFilter for Unprotected {
    fn name(&self) -> &'static str {
        "unprotected"
    }

    fn decide(&self, _query: &Query, value: PrivateValue) -> Decision {
        Decision::Allow(value)
    }
}

//! Declared read intents against a node's private data.
//!
//! A query is side-effect-free; the node's current privacy filter decides
//! per query kind whether to allow, transform, or deny it.

use serde::{Deserialize, Serialize};

/// Kinds of declared read intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Query {
    /// The full private record set
    FullRecord,
    /// Only summary statistics over the private records
    SummaryStatistics,
    /// The locally trained model's parameters
    ModelParams,
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::FullRecord => write!(f, "full_record"),
            Query::SummaryStatistics => write!(f, "summary_statistics"),
            Query::ModelParams => write!(f, "model_params"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Query::FullRecord.to_string(), "full_record");
        assert_eq!(Query::ModelParams.to_string(), "model_params");
    }
}

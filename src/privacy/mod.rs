//! Privacy filter variants.
//!
//! Concrete mechanisms plugged into a node's access gate: additive
//! Laplace noise, statistic-only release, and full revocation. Each is
//! a [`PrivacyFilter`] and can be swapped in and out at runtime through
//! [`DataNode::configure_access`](crate::private::DataNode::configure_access).

use rand::Rng;

use crate::core::{Error, Result};
use crate::private::data::PrivateValue;
use crate::private::filter::{Decision, PrivacyFilter};
use crate::private::query::Query;

/// Additive Laplace noise on every numeric entry of a released value.
///
/// Noise scale is `sensitivity / epsilon`. The filter allows every query
/// kind but never releases the raw value.
#[derive(Clone, Debug)]
pub struct LaplaceNoise {
    sensitivity: f32,
    epsilon: f32,
}

impl LaplaceNoise {
    /// Create with query sensitivity and privacy budget `epsilon`.
    pub fn new(sensitivity: f32, epsilon: f32) -> Result<Self> {
        if epsilon <= 0.0 {
            return Err(Error::Configuration(
                "epsilon must be positive".to_string(),
            ));
        }
        if sensitivity < 0.0 {
            return Err(Error::Configuration(
                "sensitivity must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            sensitivity,
            epsilon,
        })
    }

    fn sample_noise(&self) -> f32 {
        let scale = self.sensitivity / self.epsilon;
        let u: f32 = rand::thread_rng().gen::<f32>() - 0.5;
        laplace_from_uniform(u, scale)
    }

    fn perturb(&self, value: &mut PrivateValue) {
        match value {
            PrivateValue::Records(data) => {
                for record in &mut data.records {
                    for x in record.iter_mut() {
                        *x += self.sample_noise();
                    }
                }
            }
            PrivateValue::Statistics(summary) => {
                for x in summary
                    .feature_means
                    .iter_mut()
                    .chain(summary.feature_variances.iter_mut())
                {
                    *x += self.sample_noise();
                }
                summary.label_mean += self.sample_noise();
            }
            PrivateValue::Parameters(params) => {
                for block in &mut params.blocks {
                    for x in block.iter_mut() {
                        *x += self.sample_noise();
                    }
                }
            }
        }
    }
}

/// Laplace(0, scale) via inverse transform sampling, `u` in [-0.5, 0.5).
///
/// The log argument is clamped away from zero: `u` hitting an exact
/// endpoint must yield a large finite sample, never an infinity.
fn laplace_from_uniform(u: f32, scale: f32) -> f32 {
    let magnitude = (1.0 - 2.0 * u.abs()).max(f32::MIN_POSITIVE);
    -scale * u.signum() * magnitude.ln()
}

impl PrivacyFilter for LaplaceNoise {
    fn name(&self) -> &'static str {
        "laplace_noise"
    }

    fn decide(&self, _query: &Query, mut value: PrivateValue) -> Decision {
        self.perturb(&mut value);
        Decision::Allow(value)
    }
}

/// Releases summary statistics only; every other query kind is denied.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatisticOnly;

impl PrivacyFilter for StatisticOnly {
    fn name(&self) -> &'static str {
        "statistic_only"
    }

    fn decide(&self, query: &Query, value: PrivateValue) -> Decision {
        match query {
            Query::SummaryStatistics => Decision::Allow(value),
            other => Decision::Deny(format!(
                "filter releases summary statistics only, refused {}",
                other
            )),
        }
    }
}

/// Denies every query: access revocation.
#[derive(Clone, Debug)]
pub struct RevokeAll {
    reason: String,
}

impl RevokeAll {
    /// Revoke all access with a stated reason.
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Default for RevokeAll {
    fn default() -> Self {
        Self::new("access revoked")
    }
}

impl PrivacyFilter for RevokeAll {
    fn name(&self) -> &'static str {
        "revoke_all"
    }

    fn decide(&self, _query: &Query, _value: PrivateValue) -> Decision {
        Decision::Deny(self.reason.clone())
    }
}

//! Distributed search fan-out policy.
//!
//! Pure decision object: whether a search should be forwarded to remote
//! catalogues, to which ones, and with what remaining hop budget. No network
//! I/O happens here.

use serde::{Deserialize, Serialize};
use url::Url;

/// Fan-out configuration of one catalogue service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributedSearchPolicy {
    /// Whether distributed search is switched on.
    pub enabled: bool,
    /// Remote catalogues to forward searches to, in priority order.
    pub remote_catalogues: Vec<Url>,
    /// Remaining number of hops a forwarded search may travel.
    pub hop_count: u32,
}

impl Default for DistributedSearchPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_catalogues: Vec::new(),
            hop_count: 1,
        }
    }
}

/// A concrete fan-out decision: where to forward and with what budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanOutPlan {
    pub targets: Vec<Url>,
    /// Hop budget to attach to each forwarded request.
    pub hop_budget: u32,
}

impl DistributedSearchPolicy {
    /// Whether a search should fan out. A zero hop count disables fan-out
    /// even when the policy is enabled.
    #[must_use]
    pub fn should_fan_out(&self) -> bool {
        self.enabled && self.hop_count > 0
    }

    /// Hop budget for forwarded requests.
    #[must_use]
    pub fn next_hop_budget(&self) -> u32 {
        self.hop_count.saturating_sub(1)
    }

    /// Remote catalogues, unchanged.
    #[must_use]
    pub fn targets(&self) -> &[Url] {
        &self.remote_catalogues
    }

    /// Combined decision, or `None` when the search stays local.
    #[must_use]
    pub fn plan(&self) -> Option<FanOutPlan> {
        self.should_fan_out().then(|| FanOutPlan {
            targets: self.remote_catalogues.clone(),
            hop_budget: self.next_hop_budget(),
        })
    }
}

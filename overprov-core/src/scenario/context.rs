//! Per-run state
//!
//! Every resource the run creates is recorded here the moment its create
//! call returns, so teardown sees exactly what exists.

use overprov_common::ScenarioState;

use crate::ceph::CapacityReport;
use crate::kubernetes::types::ResourceHandle;

#[derive(Debug, Default)]
pub struct ScenarioContext {
    state: ScenarioState,
    pub capacity: Option<CapacityReport>,
    /// Requested claim size in GB, as sent to the API
    pub pvc_size: Option<String>,
    pub observed_gb: Option<f64>,
    pub secret: Option<ResourceHandle>,
    pub storage_class: Option<ResourceHandle>,
    pub pvc: Option<ResourceHandle>,
    /// Volume left behind by a Retain policy, found during teardown
    pub retained_pv: Option<ResourceHandle>,
    pub pod: Option<ResourceHandle>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Move to `next`; backward moves are ignored
    pub fn advance(&mut self, next: ScenarioState) -> bool {
        if next <= self.state {
            tracing::warn!(from = %self.state, to = %next, "Ignoring backward state transition");
            return false;
        }
        tracing::debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        true
    }

    /// Whether any resource is still recorded
    pub fn has_resources(&self) -> bool {
        self.secret.is_some()
            || self.storage_class.is_some()
            || self.pvc.is_some()
            || self.retained_pv.is_some()
            || self.pod.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overprov_common::ResourceKind;

    #[test]
    fn test_forward_only() {
        let mut ctx = ScenarioContext::new();
        assert_eq!(ctx.state(), ScenarioState::Uninitialized);
        assert!(ctx.advance(ScenarioState::ResourcesCreated));
        assert!(ctx.advance(ScenarioState::TearingDown));
        assert!(!ctx.advance(ScenarioState::PvcCreated));
        assert_eq!(ctx.state(), ScenarioState::TearingDown);
    }

    #[test]
    fn test_has_resources() {
        let mut ctx = ScenarioContext::new();
        assert!(!ctx.has_resources());
        ctx.pod = Some(ResourceHandle::namespaced(ResourceKind::Pod, "pod-1", "ns"));
        assert!(ctx.has_resources());
    }
}

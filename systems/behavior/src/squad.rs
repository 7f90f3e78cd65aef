//! Shared coordination state between cooperating agents.

use std::collections::{BTreeMap, VecDeque};

use harbor_patrol_core::{AgentId, AgentState, TargetId};

/// Target the squad is currently converging on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooperativeTarget {
    /// Target being pursued.
    pub target: TargetId,
    /// Agent that designated the target.
    pub initiator: AgentId,
}

/// Last state an agent published to the squad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberStatus {
    /// Behavior state at the end of the agent's last logic tick.
    pub state: AgentState,
    /// Target the agent was pursuing, if any.
    pub target: Option<TargetId>,
}

/// Request from one agent asking another to pursue a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alert {
    /// Agent raising the alert.
    pub from: AgentId,
    /// Agent asked to pursue.
    pub to: AgentId,
    /// Target to pursue.
    pub target: TargetId,
}

/// Coordination object owned by the simulation and lent to each agent.
///
/// Agents never hold references to each other; partners read one another's
/// published [`MemberStatus`] and exchange [`Alert`]s through here.
#[derive(Clone, Debug, Default)]
pub struct Squad {
    cooperative: Option<CooperativeTarget>,
    roster: BTreeMap<AgentId, MemberStatus>,
    alerts: VecDeque<Alert>,
}

impl Squad {
    /// Creates an empty squad.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Target the squad is converging on.
    #[must_use]
    pub const fn current_target(&self) -> Option<CooperativeTarget> {
        self.cooperative
    }

    /// Designates a target, replacing any existing designation.
    pub fn claim_target(&mut self, initiator: AgentId, target: TargetId) {
        self.cooperative = Some(CooperativeTarget { target, initiator });
    }

    /// Designates a target when none is set or the caller already owns it.
    pub fn propose_target(&mut self, initiator: AgentId, target: TargetId) -> bool {
        match self.cooperative {
            Some(current) if current.initiator != initiator => false,
            _ => {
                self.claim_target(initiator, target);
                true
            }
        }
    }

    /// Clears the designation when `agent` made it.
    pub fn clear_if_initiator(&mut self, agent: AgentId) -> bool {
        if self
            .cooperative
            .is_some_and(|current| current.initiator == agent)
        {
            self.cooperative = None;
            return true;
        }
        false
    }

    /// Drops the designation of a target that no longer exists.
    pub fn forget_target(&mut self, target: TargetId) {
        if self
            .cooperative
            .is_some_and(|current| current.target == target)
        {
            self.cooperative = None;
        }
    }

    /// Records the status an agent ended its tick with.
    pub fn publish(&mut self, agent: AgentId, status: MemberStatus) {
        let _ = self.roster.insert(agent, status);
    }

    /// Last status published by an agent.
    #[must_use]
    pub fn member(&self, agent: AgentId) -> Option<MemberStatus> {
        self.roster.get(&agent).copied()
    }

    /// Queues an alert for delivery on the recipient's next logic tick.
    pub fn alert(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
    }

    /// Removes and returns every alert addressed to `agent`, oldest first.
    pub fn take_alerts_for(&mut self, agent: AgentId) -> Vec<Alert> {
        let mut taken = Vec::new();
        self.alerts.retain(|alert| {
            if alert.to == agent {
                taken.push(*alert);
                false
            } else {
                true
            }
        });
        taken
    }

    /// Number of alerts not yet delivered.
    #[must_use]
    pub fn pending_alerts(&self) -> usize {
        self.alerts.len()
    }
}

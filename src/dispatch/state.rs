//! Campaign state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CampaignError;

/// State of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    /// Created, preconditions not yet checked.
    Idle,
    /// Sending.
    Running,
    /// Every recipient was processed.
    Completed,
    /// Stopped before or during sending.
    Aborted,
}

impl CampaignState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: CampaignState) -> bool {
        use CampaignState::*;

        matches!(
            (self, target),
            (Idle, Running) | (Idle, Aborted) |
            (Running, Completed) | (Running, Aborted)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl std::fmt::Display for CampaignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// A state transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CampaignState,
    pub to: CampaignState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Current state plus its transition history.
#[derive(Debug, Clone, Serialize)]
pub struct StateTracker {
    state: CampaignState,
    transitions: Vec<StateTransition>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            state: CampaignState::Idle,
            transitions: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn state(&self) -> CampaignState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Transition to a new state.
    pub fn transition_to(
        &mut self,
        new_state: CampaignState,
        reason: Option<String>,
    ) -> Result<(), CampaignError> {
        if !self.state.can_transition_to(new_state) {
            return Err(CampaignError::InvalidTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        let now = Utc::now();
        self.transitions.push(StateTransition {
            from: self.state,
            to: new_state,
            timestamp: now,
            reason,
        });
        self.state = new_state;

        match new_state {
            CampaignState::Running => self.started_at = Some(now),
            CampaignState::Completed | CampaignState::Aborted => self.finished_at = Some(now),
            CampaignState::Idle => {}
        }

        Ok(())
    }
}

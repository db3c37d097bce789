//! Lifecycle events and the agent state machine.
//!
//! The host platform dispatches three event kinds at the agent; each maps
//! to one handler, and the future the handler returns is the completion
//! token the host extends event lifetime with. The state machine enforces
//! the one ordering guarantee the platform gives: install completes before
//! activate is dispatched for the same agent version.

use thiserror::Error;

use crate::net::{Request, Response};

/// An event dispatched by the host platform.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Install,
    Activate,
    Fetch(Request),
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Fetch(_) => "fetch",
        }
    }
}

/// What a dispatched event resolved to.
#[derive(Debug)]
pub enum EventOutcome {
    /// Install or activate finished.
    Completed,
    /// Fetch interception produced a response.
    Response(Response),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Registered, nothing run yet.
    New,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl AgentState {
    /// Valid transitions. `Installing -> New` is the failed-install path:
    /// the host discards this version and may retry a fresh install later.
    pub fn can_transition_to(self, next: AgentState) -> bool {
        matches!(
            (self, next),
            (AgentState::New, AgentState::Installing)
                | (AgentState::Installing, AgentState::Installed)
                | (AgentState::Installing, AgentState::New)
                | (AgentState::Installed, AgentState::Activating)
                | (AgentState::Activating, AgentState::Activated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
        }
    }
}

#[derive(Error, Debug)]
#[error("invalid agent state transition: {from} -> {to}")]
pub struct StateTransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(AgentState::New.can_transition_to(AgentState::Installing));
        assert!(AgentState::Installing.can_transition_to(AgentState::Installed));
        assert!(AgentState::Installed.can_transition_to(AgentState::Activating));
        assert!(AgentState::Activating.can_transition_to(AgentState::Activated));
    }

    #[test]
    fn test_failed_install_returns_to_new() {
        assert!(AgentState::Installing.can_transition_to(AgentState::New));
    }

    #[test]
    fn test_activate_cannot_precede_install() {
        assert!(!AgentState::New.can_transition_to(AgentState::Activating));
        assert!(!AgentState::Installing.can_transition_to(AgentState::Activating));
        assert!(!AgentState::Activated.can_transition_to(AgentState::Installing));
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(LifecycleEvent::Install.kind(), "install");
        assert_eq!(LifecycleEvent::Activate.kind(), "activate");
    }
}

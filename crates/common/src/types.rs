// Common types for SSH Tunnel Launcher

use std::fmt;

/// Runtime state of a tunnel, recomputed on every invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// No tunnel process found for the bind address
    Stopped,
    /// At least one tunnel process found for the bind address
    Running,
}

impl TunnelState {
    pub fn is_running(&self) -> bool {
        matches!(self, TunnelState::Running)
    }

    /// Verb offered to the user for this state
    pub fn action_label(&self) -> &'static str {
        match self {
            TunnelState::Stopped => "Start",
            TunnelState::Running => "Stop",
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::Stopped => write!(f, "stopped"),
            TunnelState::Running => write!(f, "running"),
        }
    }
}

/// Output branch chosen once per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Reconcile every tunnel definition and list its actions
    List,
    /// Prompt for a new tunnel definition with the given candidate name
    Create { name: String },
}

/// Everything the action list builder needs to know about how it was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: Mode,
}

impl Invocation {
    pub fn list() -> Self {
        Self { mode: Mode::List }
    }

    pub fn create(name: impl Into<String>) -> Self {
        Self {
            mode: Mode::Create { name: name.into() },
        }
    }

    /// Build the invocation from the host's query words.
    ///
    /// The host may pass the query as one argument or already split, so the
    /// words are re-split on whitespace. A leading `create` selects create
    /// mode with the following word as the candidate name; anything else lists.
    pub fn from_query<S: AsRef<str>>(words: &[S]) -> Self {
        let joined = words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        let mut tokens = joined.split_whitespace();

        match tokens.next() {
            Some("create") => Self::create(tokens.next().unwrap_or_default()),
            _ => Self::list(),
        }
    }
}

impl Default for Invocation {
    fn default() -> Self {
        Self::list()
    }
}

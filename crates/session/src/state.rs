//! Session lifecycle states

use serde::Serialize;

/// Generation number handed out by an accepted file selection
///
/// Only the newest ticket may complete a load; completions carrying an
/// older ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LoadTicket(pub(crate) u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Where the session is in the load -> edit -> export lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No file selected yet
    Empty,
    /// A file was accepted and its load has not completed
    Loading { ticket: LoadTicket },
    /// Page count and fields are known; navigation and editing are enabled
    Ready,
    /// The newest load failed
    Failed { error: String },
}

impl SessionState {
    /// Short lowercase name, used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::Loading { .. } => "loading",
            SessionState::Ready => "ready",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// Result of offering a file to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The file passed the media-type gate; complete the load with this ticket
    Accepted(LoadTicket),
    /// The declared media type is not accepted; nothing changed
    Rejected { media_type: String },
}

/// Result of completing (or attempting) a load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoadOutcome {
    /// The document loaded and the session is ready
    #[serde(rename_all = "camelCase")]
    Ready { page_count: usize, field_count: usize },
    /// The file was rejected by the media-type gate
    #[serde(rename_all = "camelCase")]
    Rejected { media_type: String },
    /// A newer selection superseded this load
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::Empty.name(), "empty");
        assert_eq!(
            SessionState::Loading {
                ticket: LoadTicket(1)
            }
            .name(),
            "loading"
        );
        assert_eq!(SessionState::Ready.name(), "ready");
        assert_eq!(
            SessionState::Failed {
                error: "x".to_string()
            }
            .name(),
            "failed"
        );
    }

    #[test]
    fn test_outcome_json() {
        let ready = LoadOutcome::Ready {
            page_count: 2,
            field_count: 5,
        };
        assert_eq!(
            serde_json::to_string(&ready).unwrap(),
            r#"{"status":"ready","pageCount":2,"fieldCount":5}"#
        );
        assert_eq!(
            serde_json::to_string(&LoadOutcome::Stale).unwrap(),
            r#"{"status":"stale"}"#
        );
    }
}

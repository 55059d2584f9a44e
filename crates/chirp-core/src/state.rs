//! Submission lifecycle state.

/// Status of the classification round-trip for the current selection.
///
/// Every initiated submission terminates in exactly one of the two
/// terminal variants; `Pending` never outlives its request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    /// No request in flight and no result to show
    #[default]
    Idle,
    /// Exactly one request is in flight
    Pending,
    /// The service answered with a label
    Succeeded(String),
    /// The request failed; carries the fixed user-facing message
    Failed(String),
}

impl SubmissionState {
    /// Check if a request is currently in flight
    pub fn is_pending(&self) -> bool {
        matches!(self, SubmissionState::Pending)
    }

    /// Check if no request has been made for the current selection
    pub fn is_idle(&self) -> bool {
        matches!(self, SubmissionState::Idle)
    }

    /// The displayable outcome, if the submission has terminated
    pub fn label(&self) -> Option<&str> {
        match self {
            SubmissionState::Succeeded(label) | SubmissionState::Failed(label) => Some(label),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "Idle"),
            SubmissionState::Pending => write!(f, "Pending"),
            SubmissionState::Succeeded(label) => write!(f, "Succeeded({label})"),
            SubmissionState::Failed(message) => write!(f, "Failed({message})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert!(SubmissionState::default().is_idle());
        assert!(!SubmissionState::default().is_pending());
    }

    #[test]
    fn test_label_only_on_terminal_states() {
        assert_eq!(SubmissionState::Idle.label(), None);
        assert_eq!(SubmissionState::Pending.label(), None);
        assert_eq!(
            SubmissionState::Succeeded("dog_bark".to_string()).label(),
            Some("dog_bark")
        );
        assert_eq!(
            SubmissionState::Failed("Error: could not classify".to_string()).label(),
            Some("Error: could not classify")
        );
    }
}

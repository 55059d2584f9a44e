//! Application events for the tao event loop.

/// Events posted back into the tao event loop by the submission pipeline.
///
/// Each dispatched submission produces exactly one of these, tagged with
/// the sequence number of the submission it resolves.
#[derive(Debug, Clone)]
pub enum ChirpEvent {
    /// A submission resolved with a label to display
    PredictionReady { seq: u64, label: String },
    /// A submission failed; the cause has already been logged
    PredictionFailed { seq: u64 },
}

//! The acquisition panel: owns the selected clip, its preview, the
//! recording session, and the submission lifecycle.
//!
//! All methods run on the event loop thread. Transitions happen in
//! reaction to discrete events (file drop, menu click, hotkey, deadline
//! fire, completion event), so check-then-act is atomic per invocation.
//! The panel itself performs no I/O beyond the preview file; starting the
//! capture and driving the network belong to its callers.

use std::path::Path;
use std::time::{Duration, Instant};

use chirp_audio::CaptureHandle;
use chirp_core::{AudioClip, SubmissionState};
use tracing::{debug, error, info, warn};

use crate::icon::IndicatorState;
use crate::preview::PreviewHandle;

/// Fixed user-facing message for any failed submission. The cause is
/// logged, never shown.
pub const CLASSIFY_FAILED: &str = "Error: could not classify";

/// How a clip arrived. Recordings are submitted without further user
/// action; files wait for an explicit classify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSource {
    File,
    Microphone,
}

/// An in-progress microphone capture: the device-backed handle and the
/// deadline that force-terminates it. Both live and die together; dropping
/// the session releases the stream and discards the buffered audio.
pub struct RecordingSession {
    capture: Box<dyn CaptureHandle>,
    deadline: Instant,
}

/// A submission ticket: the payload plus the sequence number that ties the
/// eventual completion back to the state that spawned it.
#[derive(Debug, Clone)]
pub struct Submission {
    pub seq: u64,
    pub clip: AudioClip,
}

pub struct AcquisitionPanel {
    selection: Option<AudioClip>,
    preview: Option<PreviewHandle>,
    recording: Option<RecordingSession>,
    submission: SubmissionState,
    // Bumped on every submission, clear, and acquisition; completions
    // carrying an older value are stale and get discarded.
    seq: u64,
}

impl AcquisitionPanel {
    pub fn new() -> Self {
        Self {
            selection: None,
            preview: None,
            recording: None,
            submission: SubmissionState::Idle,
            seq: 0,
        }
    }

    /// Accept a dropped or picked file. Files that are not audio by
    /// extension cause no state change. Returns whether the selection
    /// changed.
    pub fn select_file(&mut self, path: &Path) -> bool {
        match AudioClip::from_path(path) {
            Ok(Some(clip)) => {
                self.acquire(clip, ClipSource::File);
                true
            }
            Ok(None) => {
                debug!(path = %path.display(), "Ignoring non-audio drop");
                false
            }
            Err(e) => {
                warn!("Failed to read dropped file: {e:#}");
                false
            }
        }
    }

    /// Install a new selection, revoking the previous preview and
    /// discarding any stale result.
    pub fn acquire(&mut self, clip: AudioClip, source: ClipSource) {
        info!(
            name = clip.name(),
            mime = clip.mime(),
            bytes = clip.len(),
            ?source,
            "Clip acquired"
        );
        // Revoke before replacing so at most one preview handle is live.
        self.preview.take();
        self.preview = match PreviewHandle::new(&clip) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Preview unavailable: {e:#}");
                None
            }
        };
        self.selection = Some(clip);
        // A new acquisition supersedes whatever was in flight.
        self.seq += 1;
        self.submission = SubmissionState::Idle;
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Adopt a started capture, arming its deadline. Rejected while a
    /// session is already active.
    pub fn begin_recording(&mut self, capture: Box<dyn CaptureHandle>, limit: Duration) -> bool {
        if self.recording.is_some() {
            warn!("Recording already in progress; start rejected");
            return false;
        }
        info!(limit_secs = limit.as_secs_f32(), "Recording started");
        self.recording = Some(RecordingSession {
            capture,
            deadline: Instant::now() + limit,
        });
        true
    }

    /// Deadline of the active session, if any. Drives the loop's timer.
    pub fn deadline(&self) -> Option<Instant> {
        self.recording.as_ref().map(|session| session.deadline)
    }

    /// Terminate the active session and install the capture as the current
    /// selection. The user toggle and the deadline expiry both land here,
    /// so every termination path releases the stream and the deadline
    /// together and produces the same shape. Without an active session
    /// this is a no-op, which also covers a stop arriving after the
    /// deadline already fired.
    ///
    /// Returns whether a clip was acquired; the caller submits it right
    /// away, which is what distinguishes the recording path from the file
    /// path.
    pub fn stop_recording(&mut self) -> bool {
        let Some(mut session) = self.recording.take() else {
            debug!("Stop requested with no active recording");
            return false;
        };
        match session.capture.finish() {
            Ok(Some(recording)) => {
                info!(
                    samples = recording.samples(),
                    duration_secs = recording.duration().as_secs_f64(),
                    "Recording finished"
                );
                self.acquire(AudioClip::from_wav(recording.into_data()), ClipSource::Microphone);
                true
            }
            Ok(None) => {
                debug!("Recording was already finalized");
                false
            }
            Err(e) => {
                error!("Failed to finish recording: {e}");
                false
            }
        }
    }

    /// Ask to submit the current selection. Returns the ticket to hand to
    /// the pipeline, or `None` when there is nothing selected or a
    /// submission is already in flight (both silent refusals).
    pub fn submit(&mut self) -> Option<Submission> {
        if self.submission.is_pending() {
            debug!("Submission already pending; ignoring");
            return None;
        }
        let Some(clip) = self.selection.as_ref() else {
            debug!("Nothing selected; ignoring submit");
            return None;
        };
        self.seq += 1;
        self.submission = SubmissionState::Pending;
        info!(seq = self.seq, name = clip.name(), bytes = clip.len(), "Submitting clip");
        Some(Submission {
            seq: self.seq,
            clip: clip.clone(),
        })
    }

    /// Apply a successful completion. Returns whether it was accepted;
    /// completions for superseded submissions are discarded so a late
    /// response never overwrites newer state.
    pub fn resolve_success(&mut self, seq: u64, label: String) -> bool {
        if !self.accepts(seq) {
            return false;
        }
        info!(seq, label = %label, "Submission succeeded");
        self.submission = SubmissionState::Succeeded(label);
        true
    }

    /// Apply a failed completion; same staleness rules as success.
    pub fn resolve_failure(&mut self, seq: u64) -> bool {
        if !self.accepts(seq) {
            return false;
        }
        self.submission = SubmissionState::Failed(CLASSIFY_FAILED.to_string());
        true
    }

    fn accepts(&self, seq: u64) -> bool {
        if seq == self.seq && self.submission.is_pending() {
            true
        } else {
            debug!(seq, current = self.seq, "Discarding stale completion");
            false
        }
    }

    /// Reset selection, preview, and submission state together, never
    /// partially. Also cancels an active recording session: the dropped
    /// session releases its stream and deadline as one and nothing is
    /// submitted.
    pub fn clear(&mut self) {
        if self.recording.take().is_some() {
            info!("Recording cancelled");
        }
        self.preview.take();
        self.selection = None;
        self.seq += 1;
        self.submission = SubmissionState::Idle;
        info!("Selection cleared");
    }

    pub fn selection(&self) -> Option<&AudioClip> {
        self.selection.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// The displayable outcome of the last submission, if it terminated.
    pub fn last_label(&self) -> Option<&str> {
        self.submission.label()
    }

    /// One-line status for the window title.
    pub fn status_line(&self) -> String {
        if self.recording.is_some() {
            return "recording...".to_string();
        }
        match (&self.submission, &self.selection) {
            (SubmissionState::Pending, _) => "classifying...".to_string(),
            (SubmissionState::Succeeded(label), _) => label.clone(),
            (SubmissionState::Failed(message), _) => message.clone(),
            (SubmissionState::Idle, Some(clip)) => clip.name().to_string(),
            (SubmissionState::Idle, None) => "drop an audio file".to_string(),
        }
    }

    pub fn indicator(&self) -> IndicatorState {
        if self.recording.is_some() {
            IndicatorState::Recording
        } else if self.submission.is_pending() {
            IndicatorState::Classifying
        } else {
            IndicatorState::Idle
        }
    }
}

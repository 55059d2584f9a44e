use std::sync::Arc;
use std::time::Instant;

use chirp_classify::Classifier;
use tao::event_loop::EventLoopProxy;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::event::ChirpEvent;
use crate::panel::Submission;

/// Label used when the service answers 2xx without a prediction field.
pub const NO_PREDICTION: &str = "No prediction returned";

/// Submission pipeline. Accepts a ticket from the panel, performs the
/// network round-trip off the loop thread, and posts exactly one terminal
/// event back per ticket, tagged with the ticket's sequence number.
pub struct ClassifyPipeline {
    runtime: Runtime,
    classifier: Arc<dyn Classifier>,
    completions: mpsc::UnboundedSender<ClassifyTask>,
}

type ClassifyTask = (u64, tokio::task::JoinHandle<ClassifyOutcome>);

enum ClassifyOutcome {
    Labeled { seq: u64, label: String },
    Failed { seq: u64 },
}

impl ClassifyPipeline {
    /// Create a new pipeline instance.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        event_sender: EventLoopProxy<ChirpEvent>,
    ) -> anyhow::Result<Self> {
        // Set up tokio runtime
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        // Start the completion collector.
        let completions = start_completion_collector(&runtime, event_sender);

        Ok(Self {
            runtime,
            classifier,
            completions,
        })
    }

    /// Dispatch a submission. This is non-blocking; the completion arrives
    /// later as a loop event.
    pub fn submit(&self, submission: Submission) -> anyhow::Result<()> {
        let seq = submission.seq;
        let handle = self.runtime.spawn(classify(self.classifier.clone(), submission));
        self.completions.send((seq, handle))?;
        Ok(())
    }
}

/// Helper to call the classifier and collect some basic stats.
async fn classify(classifier: Arc<dyn Classifier>, submission: Submission) -> ClassifyOutcome {
    let Submission { seq, clip } = submission;
    let bytes = clip.len();
    let before = Instant::now();

    match classifier.classify(&clip).await {
        Ok(label) => {
            info!(
                seq,
                bytes,
                duration = ?before.elapsed(),
                backend = classifier.name(),
                "classification completed"
            );
            ClassifyOutcome::Labeled {
                seq,
                label: label_or_sentinel(label),
            }
        }
        Err(e) => {
            // The user gets the fixed failure message; the cause stays here.
            warn!(seq, duration = ?before.elapsed(), "classification failed: {e}");
            ClassifyOutcome::Failed { seq }
        }
    }
}

fn label_or_sentinel(label: Option<String>) -> String {
    label.unwrap_or_else(|| NO_PREDICTION.to_string())
}

fn start_completion_collector(
    runtime: &Runtime,
    event_sender: EventLoopProxy<ChirpEvent>,
) -> mpsc::UnboundedSender<ClassifyTask> {
    let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ClassifyTask>();

    runtime.spawn(async move {
        while let Some((seq, task)) = task_receiver.recv().await {
            let event = match task.await {
                Ok(ClassifyOutcome::Labeled { seq, label }) => {
                    ChirpEvent::PredictionReady { seq, label }
                }
                Ok(ClassifyOutcome::Failed { seq }) => ChirpEvent::PredictionFailed { seq },
                Err(e) => {
                    // Even a crashed task must resolve its submission.
                    error!(seq, "Error joining classification task: {e:?}");
                    ChirpEvent::PredictionFailed { seq }
                }
            };
            event_sender.send_event(event).ok();
        }

        error!("Completion collector task ended unexpectedly");
    });

    task_sender
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_prediction_maps_to_sentinel() {
        assert_eq!(label_or_sentinel(None), NO_PREDICTION);
        assert_eq!(
            label_or_sentinel(Some("dog_bark".to_string())),
            "dog_bark"
        );
    }
}

//! Progress Reporting
//!
//! Structured progress events delivered over a channel to a single
//! observer, so long-running work reports without threading callbacks
//! through every call. Reporters are cheap clones of the sending half.

use serde::Serialize;
use tokio::sync::mpsc;

/// Phases of background removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPhase {
    /// Fetching the model or uploading to the remote service
    DownloadModel,
    /// Running segmentation
    ComputeMask,
}

impl RemovalPhase {
    /// Classify a backend phase key (`fetch:model`, `compute:inference`, ...)
    pub fn from_key(key: &str) -> Self {
        if key.starts_with("fetch") || key.starts_with("download") {
            Self::DownloadModel
        } else {
            Self::ComputeMask
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::DownloadModel => "Downloading model",
            Self::ComputeMask => "Removing background",
        }
    }

    /// Map `current / total` of this phase onto the overall 0-99 range
    pub fn percent(&self, current: u64, total: u64) -> u8 {
        let fraction = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64).clamp(0.0, 1.0)
        };

        let (base, span) = match self {
            Self::DownloadModel => (0.0, 49.0),
            Self::ComputeMask => (50.0, 49.0),
        };
        (base + fraction * span).floor() as u8
    }
}

/// Progress update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Stage 1 background removal
    Preprocess {
        phase: RemovalPhase,
        message: String,
        percent: u8,
    },
    /// One batch entry finished
    Batch { current: usize, total: usize },
}

pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Cheap cloneable sending half; a reporter without a channel is a no-op
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, ProgressReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn report(&self, event: ProgressEvent) {
        if let Some(tx) = &self.sender {
            // Receiver gone means nobody is watching any more
            let _ = tx.send(event);
        }
    }

    /// Translate a backend `(key, current, total)` callback into an event
    pub fn removal(&self, key: &str, current: u64, total: u64) {
        let phase = RemovalPhase::from_key(key);
        self.report(ProgressEvent::Preprocess {
            phase,
            message: phase.description().to_string(),
            percent: phase.percent(current, total),
        });
    }

    pub fn batch(&self, current: usize, total: usize) {
        self.report(ProgressEvent::Batch { current, total });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_percentages() {
        assert_eq!(RemovalPhase::from_key("fetch:model.onnx"), RemovalPhase::DownloadModel);
        assert_eq!(RemovalPhase::from_key("compute:inference"), RemovalPhase::ComputeMask);
        assert_eq!(RemovalPhase::DownloadModel.percent(0, 100), 0);
        assert_eq!(RemovalPhase::DownloadModel.percent(100, 100), 49);
        assert_eq!(RemovalPhase::ComputeMask.percent(0, 10), 50);
        assert_eq!(RemovalPhase::ComputeMask.percent(10, 10), 99);
        assert_eq!(RemovalPhase::ComputeMask.percent(20, 10), 99);
        assert_eq!(RemovalPhase::ComputeMask.percent(5, 0), 50);
    }

    #[tokio::test]
    async fn test_reporter_delivers_events() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.removal("fetch:model", 1, 2);
        reporter.batch(1, 3);

        match rx.recv().await.unwrap() {
            ProgressEvent::Preprocess { phase, percent, .. } => {
                assert_eq!(phase, RemovalPhase::DownloadModel);
                assert_eq!(percent, 24);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(rx.recv().await.unwrap(), ProgressEvent::Batch { current: 1, total: 3 });
    }

    #[test]
    fn test_silent_reporter() {
        ProgressReporter::silent().batch(1, 1);
    }
}

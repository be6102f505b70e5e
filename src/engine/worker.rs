//! Background execution of a detection run.

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::config::DetectorConfig;
use crate::types::{DetectError, DetectResult, Layer};

use super::detect::{DetectionEngine, DetectionResult, Stage};

/// Handle to a detection running on a worker thread.
pub struct DetectionHandle {
    /// Stages reported as the pipeline advances.
    pub progress: Receiver<Stage>,
    handle: JoinHandle<DetectResult<DetectionResult>>,
}

impl DetectionHandle {
    /// Block until the run finishes.
    pub fn join(self) -> DetectResult<DetectionResult> {
        self.handle.join().unwrap_or_else(|_| {
            Err(DetectError::Io(std::io::Error::other(
                "detection worker panicked",
            )))
        })
    }
}

/// Run a detection on a new thread, streaming stages over a channel.
pub fn spawn_detection(old: Layer, new: Layer, config: DetectorConfig) -> DetectionHandle {
    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let engine = DetectionEngine::new(config);
        let result = engine.run_with_progress(&old, &new, |stage| {
            // The receiver may have been dropped; progress is best-effort.
            let _ = sender.send(stage);
        });
        if result.is_ok() {
            let _ = sender.send(Stage::Render);
        }
        result
    });
    DetectionHandle {
        progress: receiver,
        handle,
    }
}

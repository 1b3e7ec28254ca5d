//! Test Doubles
//!
//! Recording implementations of the surface seams, for asserting on exactly
//! what an engine rendered and when it blinked. Used by this crate's own
//! tests and available to hosts writing theirs.
//!
//! # Usage
//!
//! ```ignore
//! use typewriter::testing::RecordingSink;
//!
//! let sink = RecordingSink::new();
//! let config = TypewriterConfig::builder(sink.clone(), 0.01)
//!     .with_message("Hi")
//!     .with_scheduler(TokioScheduler::new())
//!     .build()?;
//!
//! // ...after playback:
//! assert_eq!(sink.frames(), vec!["", "H", "Hi"]);
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::surface::{BlinkEffect, RenderSink};

/// A render sink that records every text it is given, in order.
///
/// Clones share the same recording, so a test can hand one clone to the
/// builder and keep another for assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text rendered so far, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    /// The most recently rendered text, if any.
    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.frames.lock().last().cloned()
    }

    /// Number of renders recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// Whether nothing has been rendered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

impl RenderSink for RecordingSink {
    fn set_text(&self, text: &str) {
        self.frames.lock().push(text.to_owned());
    }
}

/// One recorded opacity transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    /// Requested transition duration.
    pub duration: Duration,
    /// Requested target opacity.
    pub opacity: f64,
}

/// A blink effect that records every requested transition.
#[derive(Clone, Debug, Default)]
pub struct RecordingBlink {
    transitions: Arc<Mutex<Vec<Transition>>>,
}

impl RecordingBlink {
    /// Create an empty recording blink effect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transition requested so far, oldest first.
    #[must_use]
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().clone()
    }

    /// Just the target opacities, oldest first.
    #[must_use]
    pub fn opacities(&self) -> Vec<f64> {
        self.transitions.lock().iter().map(|t| t.opacity).collect()
    }
}

impl BlinkEffect for RecordingBlink {
    fn transition(&self, _surface: &Arc<dyn RenderSink>, duration: Duration, opacity: f64) {
        self.transitions.lock().push(Transition { duration, opacity });
    }
}

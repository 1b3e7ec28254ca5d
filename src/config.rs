//! Typewriter Configuration
//!
//! A [`TypewriterBuilder`] accumulates settings and bindings; [`build`]
//! validates them and produces an immutable [`TypewriterConfig`] snapshot.
//! Speeds and delays enter the builder in seconds and are stored internally
//! in milliseconds.
//!
//! # Snapshot Semantics
//!
//! `build` copies every primitive field and takes its own references to the
//! bound surfaces, so mutating or rebinding the builder afterwards never
//! affects a config that was already built. One builder can safely feed
//! several independent engines.
//!
//! [`build`]: TypewriterBuilder::build

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::scheduler::Scheduler;
use crate::surface::{BlinkEffect, RenderSink};

/// Default blink period for cursor and mark glyphs, in milliseconds.
pub const DEFAULT_BLINK_MS: u64 = 800;

/// Default pause before auto-erase begins, in milliseconds.
pub const DEFAULT_REWIND_DELAY_MS: u64 = 3_000;

/// Default pause before the message is typed again, in milliseconds.
pub const DEFAULT_REDO_DELAY_MS: u64 = 3_000;

/// Default cursor glyph.
pub const DEFAULT_CURSOR_GLYPH: &str = "_";

/// Default mark glyph.
pub const DEFAULT_MARK_GLYPH: &str = ">";

/// A configuration mistake caught at build time.
///
/// Misconfiguration is rejected here, never discovered mid-animation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A speed was negative (or not a finite number).
    #[error("{field} speed must be a non-negative number of seconds (got {seconds})")]
    NegativeSpeed {
        /// Which speed setting was invalid.
        field: &'static str,
        /// The offending value, in seconds.
        seconds: f64,
    },

    /// A delay was negative (or not a finite number).
    #[error("{field} delay must be a non-negative number of seconds (got {seconds})")]
    NegativeDelay {
        /// Which delay setting was invalid.
        field: &'static str,
        /// The offending value, in seconds.
        seconds: f64,
    },

    /// A rewind delay was configured while rewind is disabled.
    #[error("rewind delay configured but rewind is disabled")]
    RewindDelayWithoutRewind,

    /// A redo delay was configured while redo is disabled.
    #[error("redo delay configured but redo is disabled")]
    RedoDelayWithoutRedo,
}

/// Builder for [`TypewriterConfig`].
///
/// Created via [`TypewriterConfig::builder`] with the two settings every
/// engine needs: the target surface and the typing speed. Everything else
/// has a default. Setters follow the consuming `with_*` convention; call
/// [`build`](Self::build) as often as you like; each call snapshots the
/// builder's current state.
pub struct TypewriterBuilder {
    target: Arc<dyn RenderSink>,
    cursor_surface: Option<Arc<dyn RenderSink>>,
    mark_surface: Option<Arc<dyn RenderSink>>,
    blink_effect: Option<Arc<dyn BlinkEffect>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    message: String,
    type_speed_ms: f64,
    cursor_glyph: String,
    cursor_enabled: bool,
    cursor_blink_ms: f64,
    mark_glyph: String,
    mark_enabled: bool,
    mark_blink_ms: f64,
    rewind: bool,
    rewind_delay_ms: Option<f64>,
    redo: bool,
    redo_delay_ms: Option<f64>,
}

impl TypewriterBuilder {
    /// Create a builder targeting `target`, typing at `speed_secs` seconds
    /// per character.
    #[must_use]
    pub fn new(target: impl RenderSink + 'static, speed_secs: f64) -> Self {
        Self {
            target: Arc::new(target),
            cursor_surface: None,
            mark_surface: None,
            blink_effect: None,
            scheduler: None,
            message: String::new(),
            type_speed_ms: speed_secs * 1000.0,
            cursor_glyph: DEFAULT_CURSOR_GLYPH.to_owned(),
            cursor_enabled: false,
            cursor_blink_ms: DEFAULT_BLINK_MS as f64,
            mark_glyph: DEFAULT_MARK_GLYPH.to_owned(),
            mark_enabled: false,
            mark_blink_ms: DEFAULT_BLINK_MS as f64,
            rewind: false,
            rewind_delay_ms: None,
            redo: false,
            redo_delay_ms: None,
        }
    }

    /// Replace the target surface the message is rendered to.
    #[must_use]
    pub fn with_target(mut self, target: impl RenderSink + 'static) -> Self {
        self.target = Arc::new(target);
        self
    }

    /// Set the message to type.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the per-character typing speed, in seconds.
    #[must_use]
    pub fn with_type_speed(mut self, speed_secs: f64) -> Self {
        self.type_speed_ms = speed_secs * 1000.0;
        self
    }

    /// Reinterpret the stored typing speed as a whole-message duration.
    ///
    /// Divides the current speed by the message length, so a 1 s speed over
    /// a 4-character message types at 250 ms per character. One-shot
    /// operation: it divides whatever is currently stored, so applying it
    /// twice compounds. An empty message divides by 1.
    #[must_use]
    pub fn spread_speed_over_message(mut self) -> Self {
        let units = self.message.chars().count().max(1);
        self.type_speed_ms /= units as f64;
        self
    }

    /// Set the cursor glyph.
    #[must_use]
    pub fn with_cursor(mut self, glyph: impl Into<String>) -> Self {
        self.cursor_glyph = glyph.into();
        self
    }

    /// Enable or disable the cursor blink loop.
    #[must_use]
    pub fn with_cursor_blink(mut self, enabled: bool) -> Self {
        self.cursor_enabled = enabled;
        self
    }

    /// Set the cursor blink period, in seconds.
    #[must_use]
    pub fn with_cursor_speed(mut self, speed_secs: f64) -> Self {
        self.cursor_blink_ms = speed_secs * 1000.0;
        self
    }

    /// Set the mark glyph.
    #[must_use]
    pub fn with_mark(mut self, glyph: impl Into<String>) -> Self {
        self.mark_glyph = glyph.into();
        self
    }

    /// Enable or disable the mark blink loop.
    #[must_use]
    pub fn with_mark_blink(mut self, enabled: bool) -> Self {
        self.mark_enabled = enabled;
        self
    }

    /// Set the mark blink period, in seconds.
    #[must_use]
    pub fn with_mark_speed(mut self, speed_secs: f64) -> Self {
        self.mark_blink_ms = speed_secs * 1000.0;
        self
    }

    /// Enable or disable auto-erase after the message is fully typed.
    #[must_use]
    pub fn with_rewind(mut self, enabled: bool) -> Self {
        self.rewind = enabled;
        self
    }

    /// Set the pause before auto-erase begins, in seconds.
    ///
    /// Requires rewind to be enabled; [`build`](Self::build) rejects the
    /// combination otherwise.
    #[must_use]
    pub fn with_rewind_delay(mut self, delay_secs: f64) -> Self {
        self.rewind_delay_ms = Some(delay_secs * 1000.0);
        self
    }

    /// Enable or disable retyping the message after it is fully erased
    /// (or fully typed, when rewind is off).
    #[must_use]
    pub fn with_redo(mut self, enabled: bool) -> Self {
        self.redo = enabled;
        self
    }

    /// Set the pause before the message is typed again, in seconds.
    ///
    /// Requires redo to be enabled; [`build`](Self::build) rejects the
    /// combination otherwise.
    #[must_use]
    pub fn with_redo_delay(mut self, delay_secs: f64) -> Self {
        self.redo_delay_ms = Some(delay_secs * 1000.0);
        self
    }

    /// Bind the surface the cursor glyph is rendered on.
    #[must_use]
    pub fn bind_cursor(mut self, surface: impl RenderSink + 'static) -> Self {
        self.cursor_surface = Some(Arc::new(surface));
        self
    }

    /// Bind the surface the mark glyph is rendered on.
    #[must_use]
    pub fn bind_mark(mut self, surface: impl RenderSink + 'static) -> Self {
        self.mark_surface = Some(Arc::new(surface));
        self
    }

    /// Bind the blink-effect provider used by both blink loops.
    #[must_use]
    pub fn with_blink_effect(mut self, effect: impl BlinkEffect + 'static) -> Self {
        self.blink_effect = Some(Arc::new(effect));
        self
    }

    /// Bind the scheduler playback runs on.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// The current message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The current typing speed, in seconds.
    #[must_use]
    pub fn type_speed(&self) -> f64 {
        self.type_speed_ms / 1000.0
    }

    /// The current cursor glyph.
    #[must_use]
    pub fn cursor_glyph(&self) -> &str {
        &self.cursor_glyph
    }

    /// The current cursor blink period, in seconds.
    #[must_use]
    pub fn cursor_speed(&self) -> f64 {
        self.cursor_blink_ms / 1000.0
    }

    /// The current mark glyph.
    #[must_use]
    pub fn mark_glyph(&self) -> &str {
        &self.mark_glyph
    }

    /// The current mark blink period, in seconds.
    #[must_use]
    pub fn mark_speed(&self) -> f64 {
        self.mark_blink_ms / 1000.0
    }

    /// The effective rewind delay, in seconds.
    #[must_use]
    pub fn rewind_delay(&self) -> f64 {
        self.rewind_delay_ms
            .unwrap_or(DEFAULT_REWIND_DELAY_MS as f64)
            / 1000.0
    }

    /// The effective redo delay, in seconds.
    #[must_use]
    pub fn redo_delay(&self) -> f64 {
        self.redo_delay_ms.unwrap_or(DEFAULT_REDO_DELAY_MS as f64) / 1000.0
    }

    /// Validate the builder and snapshot it into a [`TypewriterConfig`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a negative (or non-finite) speed or
    /// delay, or for a rewind/redo delay configured without its flag.
    pub fn build(&self) -> Result<TypewriterConfig, ConfigError> {
        check_speed("type", self.type_speed_ms)?;
        check_speed("cursor blink", self.cursor_blink_ms)?;
        check_speed("mark blink", self.mark_blink_ms)?;

        if let Some(ms) = self.rewind_delay_ms {
            if !self.rewind {
                return Err(ConfigError::RewindDelayWithoutRewind);
            }
            check_delay("rewind", ms)?;
        }
        if let Some(ms) = self.redo_delay_ms {
            if !self.redo {
                return Err(ConfigError::RedoDelayWithoutRedo);
            }
            check_delay("redo", ms)?;
        }

        Ok(TypewriterConfig {
            message: self.message.chars().collect(),
            type_speed: duration_from_ms(self.type_speed_ms),
            cursor_glyph: self.cursor_glyph.clone(),
            cursor_enabled: self.cursor_enabled,
            cursor_blink: duration_from_ms(self.cursor_blink_ms),
            mark_glyph: self.mark_glyph.clone(),
            mark_enabled: self.mark_enabled,
            mark_blink: duration_from_ms(self.mark_blink_ms),
            rewind: self.rewind,
            rewind_delay: duration_from_ms(
                self.rewind_delay_ms.unwrap_or(DEFAULT_REWIND_DELAY_MS as f64),
            ),
            redo: self.redo,
            redo_delay: duration_from_ms(
                self.redo_delay_ms.unwrap_or(DEFAULT_REDO_DELAY_MS as f64),
            ),
            target: Arc::clone(&self.target),
            cursor_surface: self.cursor_surface.clone(),
            mark_surface: self.mark_surface.clone(),
            blink_effect: self.blink_effect.clone(),
            scheduler: self.scheduler.clone(),
        })
    }
}

impl fmt::Debug for TypewriterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypewriterBuilder")
            .field("message", &self.message)
            .field("type_speed_ms", &self.type_speed_ms)
            .field("cursor_enabled", &self.cursor_enabled)
            .field("mark_enabled", &self.mark_enabled)
            .field("rewind", &self.rewind)
            .field("redo", &self.redo)
            .field("scheduler_bound", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

fn check_speed(field: &'static str, ms: f64) -> Result<(), ConfigError> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeSpeed {
            field,
            seconds: ms / 1000.0,
        })
    }
}

fn check_delay(field: &'static str, ms: f64) -> Result<(), ConfigError> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeDelay {
            field,
            seconds: ms / 1000.0,
        })
    }
}

fn duration_from_ms(ms: f64) -> Duration {
    Duration::from_secs_f64(ms / 1000.0)
}

/// An immutable, validated configuration snapshot.
///
/// Holds the message (as a sequence of atomic text units), all timing
/// settings, and the engine's own references to the bound collaborators.
/// Built by [`TypewriterBuilder::build`]; consumed by
/// [`Typewriter::new`](crate::controller::Typewriter::new).
pub struct TypewriterConfig {
    message: Vec<char>,
    type_speed: Duration,
    cursor_glyph: String,
    cursor_enabled: bool,
    cursor_blink: Duration,
    mark_glyph: String,
    mark_enabled: bool,
    mark_blink: Duration,
    rewind: bool,
    rewind_delay: Duration,
    redo: bool,
    redo_delay: Duration,
    target: Arc<dyn RenderSink>,
    cursor_surface: Option<Arc<dyn RenderSink>>,
    mark_surface: Option<Arc<dyn RenderSink>>,
    blink_effect: Option<Arc<dyn BlinkEffect>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl TypewriterConfig {
    /// Start building a configuration for `target`, typing at `speed_secs`
    /// seconds per character.
    #[must_use]
    pub fn builder(target: impl RenderSink + 'static, speed_secs: f64) -> TypewriterBuilder {
        TypewriterBuilder::new(target, speed_secs)
    }

    /// The message, reassembled into a `String`.
    #[must_use]
    pub fn message(&self) -> String {
        self.message.iter().collect()
    }

    /// The message length, in atomic text units.
    #[must_use]
    pub fn message_len(&self) -> usize {
        self.message.len()
    }

    /// The prefix of the message with `len` units. `len` beyond the message
    /// is clamped.
    #[must_use]
    pub fn prefix(&self, len: usize) -> String {
        let len = len.min(self.message.len());
        self.message[..len].iter().collect()
    }

    /// Per-character typing delay.
    #[must_use]
    pub fn type_speed(&self) -> Duration {
        self.type_speed
    }

    /// The cursor glyph.
    #[must_use]
    pub fn cursor_glyph(&self) -> &str {
        &self.cursor_glyph
    }

    /// Whether the cursor blink loop is enabled.
    #[must_use]
    pub fn cursor_enabled(&self) -> bool {
        self.cursor_enabled
    }

    /// Cursor blink period.
    #[must_use]
    pub fn cursor_blink(&self) -> Duration {
        self.cursor_blink
    }

    /// The mark glyph.
    #[must_use]
    pub fn mark_glyph(&self) -> &str {
        &self.mark_glyph
    }

    /// Whether the mark blink loop is enabled.
    #[must_use]
    pub fn mark_enabled(&self) -> bool {
        self.mark_enabled
    }

    /// Mark blink period.
    #[must_use]
    pub fn mark_blink(&self) -> Duration {
        self.mark_blink
    }

    /// Whether the message is auto-erased after typing completes.
    #[must_use]
    pub fn rewind_enabled(&self) -> bool {
        self.rewind
    }

    /// Pause before auto-erase begins.
    #[must_use]
    pub fn rewind_delay(&self) -> Duration {
        self.rewind_delay
    }

    /// Whether the message is typed again after the walk completes.
    #[must_use]
    pub fn redo_enabled(&self) -> bool {
        self.redo
    }

    /// Pause before the message is typed again.
    #[must_use]
    pub fn redo_delay(&self) -> Duration {
        self.redo_delay
    }

    pub(crate) fn target(&self) -> &Arc<dyn RenderSink> {
        &self.target
    }

    pub(crate) fn cursor_surface(&self) -> Option<Arc<dyn RenderSink>> {
        self.cursor_surface.clone()
    }

    pub(crate) fn mark_surface(&self) -> Option<Arc<dyn RenderSink>> {
        self.mark_surface.clone()
    }

    pub(crate) fn blink_effect(&self) -> Option<Arc<dyn BlinkEffect>> {
        self.blink_effect.clone()
    }

    pub(crate) fn scheduler(&self) -> Option<Arc<dyn Scheduler>> {
        self.scheduler.clone()
    }
}

impl fmt::Debug for TypewriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypewriterConfig")
            .field("message_len", &self.message.len())
            .field("type_speed", &self.type_speed)
            .field("cursor_enabled", &self.cursor_enabled)
            .field("mark_enabled", &self.mark_enabled)
            .field("rewind", &self.rewind)
            .field("redo", &self.redo)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    fn builder() -> TypewriterBuilder {
        TypewriterConfig::builder(RecordingSink::new(), 0.4).with_message("Hi")
    }

    #[test]
    fn speeds_are_stored_in_milliseconds() {
        let config = builder().with_type_speed(0.25).build().unwrap();
        assert_eq!(config.type_speed(), Duration::from_millis(250));
    }

    #[test]
    fn builder_defaults() {
        let b = builder();
        assert!((b.type_speed() - 0.4).abs() < f64::EPSILON);
        assert!((b.cursor_speed() - 0.8).abs() < f64::EPSILON);
        assert!((b.mark_speed() - 0.8).abs() < f64::EPSILON);
        assert!((b.rewind_delay() - 3.0).abs() < f64::EPSILON);
        assert!((b.redo_delay() - 3.0).abs() < f64::EPSILON);

        let config = b.build().unwrap();
        assert_eq!(config.cursor_glyph(), "_");
        assert_eq!(config.mark_glyph(), ">");
        assert!(!config.cursor_enabled());
        assert!(!config.mark_enabled());
        assert!(!config.rewind_enabled());
        assert!(!config.redo_enabled());
        assert_eq!(config.cursor_blink(), Duration::from_millis(800));
    }

    #[test]
    fn negative_type_speed_rejected() {
        let err = builder().with_type_speed(-1.0).build().unwrap_err();
        assert_eq!(
            err,
            ConfigError::NegativeSpeed {
                field: "type",
                seconds: -1.0
            }
        );
    }

    #[test]
    fn non_finite_speed_rejected() {
        assert!(builder().with_type_speed(f64::NAN).build().is_err());
        assert!(builder().with_cursor_speed(f64::INFINITY).build().is_err());
    }

    #[test]
    fn rewind_delay_requires_rewind() {
        let err = builder().with_rewind_delay(2.0).build().unwrap_err();
        assert_eq!(err, ConfigError::RewindDelayWithoutRewind);

        let config = builder()
            .with_rewind(true)
            .with_rewind_delay(2.0)
            .build()
            .unwrap();
        assert_eq!(config.rewind_delay(), Duration::from_secs(2));
    }

    #[test]
    fn redo_delay_requires_redo() {
        let err = builder().with_redo_delay(1.5).build().unwrap_err();
        assert_eq!(err, ConfigError::RedoDelayWithoutRedo);

        let config = builder()
            .with_redo(true)
            .with_redo_delay(1.5)
            .build()
            .unwrap();
        assert_eq!(config.redo_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn negative_delay_rejected() {
        let err = builder()
            .with_rewind(true)
            .with_rewind_delay(-0.5)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NegativeDelay {
                field: "rewind",
                seconds: -0.5
            }
        );
    }

    #[test]
    fn spread_speed_over_message_divides_by_length() {
        let config = builder()
            .with_message("type")
            .with_type_speed(1.0)
            .spread_speed_over_message()
            .build()
            .unwrap();
        assert_eq!(config.type_speed(), Duration::from_millis(250));
    }

    #[test]
    fn spread_speed_compounds_when_applied_twice() {
        // Not idempotent: each application divides again.
        let config = builder()
            .with_message("type")
            .with_type_speed(1.0)
            .spread_speed_over_message()
            .spread_speed_over_message()
            .build()
            .unwrap();
        assert_eq!(config.type_speed(), Duration::from_micros(62_500));
    }

    #[test]
    fn spread_speed_on_empty_message_is_unchanged() {
        let config = builder()
            .with_message("")
            .with_type_speed(1.0)
            .spread_speed_over_message()
            .build()
            .unwrap();
        assert_eq!(config.type_speed(), Duration::from_secs(1));
    }

    #[test]
    fn build_snapshots_builder_state() {
        let b = builder();
        let before = b.build().unwrap();

        let b = b.with_message("changed").with_type_speed(9.0);
        let after = b.build().unwrap();

        assert_eq!(before.message(), "Hi");
        assert_eq!(before.type_speed(), Duration::from_millis(400));
        assert_eq!(after.message(), "changed");
        assert_eq!(after.type_speed(), Duration::from_secs(9));
    }

    #[test]
    fn rebinding_target_does_not_touch_built_config() {
        let first = RecordingSink::new();
        let b = TypewriterConfig::builder(first.clone(), 0.1).with_message("Hi");
        let config = b.build().unwrap();

        let second = RecordingSink::new();
        let b = b.with_target(second.clone());
        let _rebuilt = b.build().unwrap();

        config.target().set_text("probe");
        assert_eq!(first.frames(), vec!["probe"]);
        assert!(second.frames().is_empty());
    }

    #[test]
    fn message_operates_on_atomic_units() {
        let config = builder().with_message("héllo").build().unwrap();
        assert_eq!(config.message_len(), 5);
        assert_eq!(config.prefix(2), "hé");
        assert_eq!(config.prefix(99), "héllo");
    }
}

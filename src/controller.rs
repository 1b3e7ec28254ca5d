//! Typewriter Playback Controller
//!
//! [`Typewriter`] owns the playback state machine and the write/erase
//! scheduling loop. Each step renders one prefix of the message to the
//! target, commits it, and schedules the next step; when the walk reaches an
//! end, the rewind/redo policy decides whether the chain turns around,
//! restarts, or goes terminal.
//!
//! # Scheduling Model
//!
//! All stepping happens through deferred callbacks on the bound scheduler.
//! At most one write/erase step is pending per controller; the handle is an
//! owned field, so `pause` (and a fresh external `write`/`erase`) can always
//! find and cancel it. The two blink loops are independent repeating timers
//! with their own handles and never interfere with the chain.
//!
//! Scheduled callbacks capture only a weak reference to the controller
//! internals: dropping the last `Typewriter` handle tears the whole schedule
//! down. A callback whose timer already fired cannot be interrupted, so every
//! step also carries the epoch it was scheduled under; a step that finds the
//! epoch moved on (pause, or a restart) is stale and drops itself.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TypewriterConfig;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::surface::{BlinkEffect, RenderSink};

/// Which way the playback chain is walking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Revealing the message one unit at a time.
    Writing,
    /// Erasing the message one unit at a time.
    Erasing,
}

/// Diagnostics snapshot of a controller. Taking one has no side effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    /// Whether the cursor blink loop is configured on.
    pub cursor_animated: bool,
    /// Whether the mark blink loop is configured on.
    pub mark_animated: bool,
    /// Whether redo is configured on.
    pub redo: bool,
    /// Whether rewind is configured on.
    pub rewind: bool,
    /// Whether playback is currently paused.
    pub paused: bool,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CursorAnim: {}\nMarkAnim: {}\nRedo: {}\nRewind: {}\nPaused: {}",
            self.cursor_animated, self.mark_animated, self.redo, self.rewind, self.paused
        )
    }
}

/// A collaborator required by the configuration was not bound.
///
/// Raised by [`Typewriter::new`] so a missing binding surfaces at
/// construction, not mid-animation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    /// No scheduler was bound.
    #[error("no scheduler bound; playback has nothing to run on")]
    MissingScheduler,

    /// Cursor blink is enabled but no cursor surface was bound.
    #[error("cursor blink enabled but no cursor surface bound")]
    MissingCursorSurface,

    /// Mark blink is enabled but no mark surface was bound.
    #[error("mark blink enabled but no mark surface bound")]
    MissingMarkSurface,

    /// A blink loop is enabled but no blink effect was bound.
    #[error("blink enabled but no blink effect bound")]
    MissingBlinkEffect,
}

/// The two blinking glyphs a controller drives.
#[derive(Clone, Copy)]
enum Glyph {
    Cursor,
    Mark,
}

impl Glyph {
    fn name(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Mark => "mark",
        }
    }
}

/// Mutable playback state, guarded by the controller mutex.
struct Playback {
    /// Length of the last committed visible prefix.
    committed: usize,
    /// Direction of the last step, remembered across pause.
    direction: Direction,
    paused: bool,
    /// Bumped on pause and on external restarts; steps scheduled under an
    /// older epoch are stale.
    epoch: u64,
    /// The single outstanding write/erase step, if any.
    pending: Option<ScheduledTask>,
    cursor_blink: Option<ScheduledTask>,
    cursor_visible: bool,
    mark_blink: Option<ScheduledTask>,
    mark_visible: bool,
}

impl Playback {
    fn new() -> Self {
        Self {
            committed: 0,
            direction: Direction::Writing,
            paused: false,
            epoch: 0,
            pending: None,
            cursor_blink: None,
            cursor_visible: true,
            mark_blink: None,
            mark_visible: true,
        }
    }

    fn blink_task_mut(&mut self, glyph: Glyph) -> &mut Option<ScheduledTask> {
        match glyph {
            Glyph::Cursor => &mut self.cursor_blink,
            Glyph::Mark => &mut self.mark_blink,
        }
    }

    fn toggle_visible(&mut self, glyph: Glyph) -> bool {
        let visible = match glyph {
            Glyph::Cursor => &mut self.cursor_visible,
            Glyph::Mark => &mut self.mark_visible,
        };
        *visible = !*visible;
        *visible
    }

    fn set_visible(&mut self, glyph: Glyph, value: bool) {
        match glyph {
            Glyph::Cursor => self.cursor_visible = value,
            Glyph::Mark => self.mark_visible = value,
        }
    }
}

struct Shared {
    config: TypewriterConfig,
    scheduler: Arc<dyn Scheduler>,
    blink: Option<Arc<dyn BlinkEffect>>,
    state: Mutex<Playback>,
}

impl Shared {
    fn step_write(self: &Arc<Self>, st: &mut Playback, index: usize) {
        let len = self.config.message_len();
        let index = index.min(len);
        st.direction = Direction::Writing;
        st.committed = index;
        self.config.target().set_text(&self.config.prefix(index));
        tracing::trace!(index, len, "typed prefix");

        if index < len {
            self.schedule_step(st, self.config.type_speed(), move |shared, st| {
                Shared::step_write(shared, st, index + 1);
            });
        } else if self.config.rewind_enabled() {
            self.schedule_step(st, self.config.rewind_delay(), |shared, st| {
                let len = shared.config.message_len();
                Shared::step_erase(shared, st, len);
            });
        } else if self.config.redo_enabled() {
            self.schedule_step(st, self.config.redo_delay(), |shared, st| {
                Shared::step_write(shared, st, 0);
            });
        } else {
            st.pending = None;
            tracing::debug!("write chain complete");
        }
    }

    fn step_erase(self: &Arc<Self>, st: &mut Playback, index: usize) {
        let index = index.min(self.config.message_len());
        st.direction = Direction::Erasing;
        st.committed = index;
        self.config.target().set_text(&self.config.prefix(index));
        tracing::trace!(index, "erased to prefix");

        if index > 0 {
            self.schedule_step(st, self.config.type_speed(), move |shared, st| {
                Shared::step_erase(shared, st, index - 1);
            });
        } else if self.config.redo_enabled() {
            self.schedule_step(st, self.config.redo_delay(), |shared, st| {
                Shared::step_write(shared, st, 0);
            });
        } else {
            st.pending = None;
            tracing::debug!("erase chain complete");
        }
    }

    /// Schedule the next step of the chain, replacing any pending one.
    fn schedule_step<F>(self: &Arc<Self>, st: &mut Playback, delay: Duration, step: F)
    where
        F: FnOnce(&Arc<Shared>, &mut Playback) + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        let scheduled_under = st.epoch;
        let task = self.scheduler.once(
            delay,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else { return };
                let mut st = shared.state.lock();
                // A step cancelled after its timer fired is stale.
                if st.epoch != scheduled_under || st.paused {
                    return;
                }
                step(&shared, &mut st);
            }),
        );
        st.pending = Some(task);
    }

    fn glyph_enabled(&self, glyph: Glyph) -> bool {
        match glyph {
            Glyph::Cursor => self.config.cursor_enabled(),
            Glyph::Mark => self.config.mark_enabled(),
        }
    }

    fn glyph_surface(&self, glyph: Glyph) -> Option<Arc<dyn RenderSink>> {
        match glyph {
            Glyph::Cursor => self.config.cursor_surface(),
            Glyph::Mark => self.config.mark_surface(),
        }
    }

    fn glyph_period(&self, glyph: Glyph) -> Duration {
        match glyph {
            Glyph::Cursor => self.config.cursor_blink(),
            Glyph::Mark => self.config.mark_blink(),
        }
    }
}

/// The typewriter playback controller.
///
/// Construct one from a built [`TypewriterConfig`], then start playback
/// explicitly with [`write(0)`](Self::write) (or [`erase`](Self::erase) from
/// the far end). The controller self-schedules every subsequent step until
/// the rewind/redo policy runs out, and can be paused and resumed at any
/// point without losing its position.
///
/// Dropping the controller cancels every outstanding timer.
///
/// # Example
///
/// ```ignore
/// let config = TypewriterConfig::builder(target, 0.1)
///     .with_message("Hello World")
///     .with_cursor("_")
///     .with_rewind(true)
///     .with_scheduler(TokioScheduler::new())
///     .build()?;
///
/// let writer = Typewriter::new(config)?;
/// writer.write(0);
/// ```
pub struct Typewriter {
    shared: Arc<Shared>,
}

impl Typewriter {
    /// Build a controller from a configuration, validating its bindings.
    ///
    /// The configured cursor and mark glyphs are pushed to their surfaces
    /// once, here.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] if no scheduler is bound, or if a blink
    /// loop is enabled without its surface or without a blink effect.
    pub fn new(config: TypewriterConfig) -> Result<Self, BindingError> {
        let scheduler = config.scheduler().ok_or(BindingError::MissingScheduler)?;
        if config.cursor_enabled() && config.cursor_surface().is_none() {
            return Err(BindingError::MissingCursorSurface);
        }
        if config.mark_enabled() && config.mark_surface().is_none() {
            return Err(BindingError::MissingMarkSurface);
        }
        let blink = config.blink_effect();
        if (config.cursor_enabled() || config.mark_enabled()) && blink.is_none() {
            return Err(BindingError::MissingBlinkEffect);
        }

        if let Some(cursor) = config.cursor_surface() {
            cursor.set_text(config.cursor_glyph());
        }
        if let Some(mark) = config.mark_surface() {
            mark.set_text(config.mark_glyph());
        }

        Ok(Self {
            shared: Arc::new(Shared {
                scheduler,
                blink,
                state: Mutex::new(Playback::new()),
                config,
            }),
        })
    }

    /// Start (or restart) writing from `index`, clamped to the message.
    ///
    /// Renders the prefix of length `index` immediately, then self-schedules
    /// the rest of the walk. Any previously pending step is cancelled first,
    /// so there is never more than one chain running.
    pub fn write(&self, index: usize) {
        let mut st = self.shared.state.lock();
        st.epoch += 1;
        st.pending = None;
        st.paused = false;
        self.shared.step_write(&mut st, index);
    }

    /// Start (or restart) erasing from `index`, clamped to the message.
    ///
    /// Renders the prefix of length `index` immediately, then walks down to
    /// the empty string. Any previously pending step is cancelled first.
    pub fn erase(&self, index: usize) {
        let mut st = self.shared.state.lock();
        st.epoch += 1;
        st.pending = None;
        st.paused = false;
        self.shared.step_erase(&mut st, index);
    }

    /// Pause playback, cancelling the outstanding step. Idempotent.
    ///
    /// The committed index is kept, so [`resume`](Self::resume) picks up
    /// exactly where the chain stopped. Blink loops keep running; stop them
    /// with [`stop_cursor`](Self::stop_cursor) / [`stop_mark`](Self::stop_mark).
    pub fn pause(&self) {
        let mut st = self.shared.state.lock();
        if st.paused {
            return;
        }
        st.paused = true;
        st.epoch += 1;
        if let Some(mut task) = st.pending.take() {
            task.cancel();
        }
        tracing::debug!(committed = st.committed, "playback paused");
    }

    /// Resume playback at the committed index, in the remembered direction.
    ///
    /// The first render repeats the text that was visible at pause time,
    /// then the chain continues. A no-op unless paused: resuming a running
    /// controller must not double-schedule.
    pub fn resume(&self) {
        let mut st = self.shared.state.lock();
        if !st.paused {
            return;
        }
        st.paused = false;
        let index = st.committed;
        tracing::debug!(index, direction = ?st.direction, "playback resumed");
        match st.direction {
            Direction::Writing => self.shared.step_write(&mut st, index),
            Direction::Erasing => self.shared.step_erase(&mut st, index),
        }
    }

    /// Start the cursor blink loop, if cursor blink is enabled.
    ///
    /// A no-op when the loop is already running.
    pub fn animate_cursor(&self) {
        self.animate_glyph(Glyph::Cursor);
    }

    /// Stop the cursor blink loop and force the cursor fully visible.
    pub fn stop_cursor(&self) {
        self.stop_glyph(Glyph::Cursor);
    }

    /// Start the mark blink loop, if mark blink is enabled.
    ///
    /// A no-op when the loop is already running.
    pub fn animate_mark(&self) {
        self.animate_glyph(Glyph::Mark);
    }

    /// Stop the mark blink loop and force the mark fully visible.
    pub fn stop_mark(&self) {
        self.stop_glyph(Glyph::Mark);
    }

    /// Snapshot the controller for diagnostics.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        let st = self.shared.state.lock();
        PlaybackStatus {
            cursor_animated: self.shared.config.cursor_enabled(),
            mark_animated: self.shared.config.mark_enabled(),
            redo: self.shared.config.redo_enabled(),
            rewind: self.shared.config.rewind_enabled(),
            paused: st.paused,
        }
    }

    /// Length of the message, in atomic text units.
    #[must_use]
    pub fn message_len(&self) -> usize {
        self.shared.config.message_len()
    }

    /// Length of the last committed visible prefix.
    #[must_use]
    pub fn committed(&self) -> usize {
        self.shared.state.lock().committed
    }

    /// Direction of the most recent step.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.shared.state.lock().direction
    }

    fn animate_glyph(&self, glyph: Glyph) {
        let shared = &self.shared;
        if !shared.glyph_enabled(glyph) {
            return;
        }
        // Both are guaranteed by construction when the glyph is enabled.
        let Some(surface) = shared.glyph_surface(glyph) else {
            return;
        };
        let Some(effect) = shared.blink.clone() else {
            return;
        };
        let period = shared.glyph_period(glyph);

        let mut st = shared.state.lock();
        if st.blink_task_mut(glyph).is_some() {
            return;
        }

        let weak = Arc::downgrade(shared);
        let task = shared.scheduler.repeating(
            period,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else { return };
                let mut st = shared.state.lock();
                let visible = st.toggle_visible(glyph);
                let opacity = if visible { 1.0 } else { 0.0 };
                effect.transition(&surface, period, opacity);
            }),
        );
        *st.blink_task_mut(glyph) = Some(task);
        tracing::debug!(glyph = glyph.name(), period_ms = period.as_millis() as u64, "blink started");
    }

    fn stop_glyph(&self, glyph: Glyph) {
        let shared = &self.shared;
        if !shared.glyph_enabled(glyph) {
            return;
        }
        let mut st = shared.state.lock();
        if let Some(mut task) = st.blink_task_mut(glyph).take() {
            task.cancel();
        }
        st.set_visible(glyph, true);
        if let (Some(surface), Some(effect)) = (shared.glyph_surface(glyph), shared.blink.as_ref())
        {
            effect.transition(&surface, shared.glyph_period(glyph), 1.0);
        }
        tracing::debug!(glyph = glyph.name(), "blink stopped");
    }
}

impl fmt::Debug for Typewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("Typewriter")
            .field("committed", &st.committed)
            .field("direction", &st.direction)
            .field("paused", &st.paused)
            .field("pending", &st.pending.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypewriterConfig;
    use crate::scheduler::TokioScheduler;
    use crate::testing::{RecordingBlink, RecordingSink};
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    fn base_builder(message: &str) -> (crate::config::TypewriterBuilder, RecordingSink) {
        let sink = RecordingSink::new();
        let builder = TypewriterConfig::builder(sink.clone(), 0.01)
            .with_message(message)
            .with_scheduler(TokioScheduler::new());
        (builder, sink)
    }

    #[test]
    fn missing_scheduler_is_rejected() {
        let sink = RecordingSink::new();
        let config = TypewriterConfig::builder(sink, 0.01)
            .with_message("Hi")
            .build()
            .unwrap();
        assert_eq!(
            Typewriter::new(config).unwrap_err(),
            BindingError::MissingScheduler
        );
    }

    #[test]
    fn cursor_blink_requires_cursor_surface() {
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_cursor_blink(true)
            .with_blink_effect(RecordingBlink::new())
            .build()
            .unwrap();
        assert_eq!(
            Typewriter::new(config).unwrap_err(),
            BindingError::MissingCursorSurface
        );
    }

    #[test]
    fn mark_blink_requires_mark_surface() {
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_mark_blink(true)
            .with_blink_effect(RecordingBlink::new())
            .build()
            .unwrap();
        assert_eq!(
            Typewriter::new(config).unwrap_err(),
            BindingError::MissingMarkSurface
        );
    }

    #[test]
    fn blink_requires_effect() {
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_cursor_blink(true)
            .bind_cursor(RecordingSink::new())
            .build()
            .unwrap();
        assert_eq!(
            Typewriter::new(config).unwrap_err(),
            BindingError::MissingBlinkEffect
        );
    }

    #[test]
    fn glyphs_are_pushed_to_surfaces_at_construction() {
        let cursor = RecordingSink::new();
        let mark = RecordingSink::new();
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_cursor("|")
            .with_mark("$")
            .bind_cursor(cursor.clone())
            .bind_mark(mark.clone())
            .build()
            .unwrap();
        let _writer = Typewriter::new(config).unwrap();

        assert_eq!(cursor.frames(), vec!["|"]);
        assert_eq!(mark.frames(), vec!["$"]);
    }

    #[test]
    fn status_reflects_configuration_and_pause() {
        let (builder, _sink) = base_builder("Hi");
        let config = builder.with_redo(true).build().unwrap();
        let writer = Typewriter::new(config).unwrap();

        let status = writer.status();
        assert!(status.redo);
        assert!(!status.rewind);
        assert!(!status.cursor_animated);
        assert!(!status.paused);

        writer.pause();
        writer.pause(); // idempotent
        assert!(writer.status().paused);
    }

    #[test]
    fn status_display_is_human_readable() {
        let status = PlaybackStatus {
            cursor_animated: true,
            mark_animated: false,
            redo: false,
            rewind: true,
            paused: false,
        };
        assert_eq!(
            status.to_string(),
            "CursorAnim: true\nMarkAnim: false\nRedo: false\nRewind: true\nPaused: false"
        );
    }

    #[test]
    fn resume_without_pause_is_a_no_op() {
        let (builder, sink) = base_builder("Hi");
        let writer = Typewriter::new(builder.build().unwrap()).unwrap();
        writer.resume();
        assert!(sink.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn write_index_is_clamped_to_message_length() {
        let (builder, sink) = base_builder("Hi");
        let writer = Typewriter::new(builder.build().unwrap()).unwrap();

        writer.write(10);
        sleep(Duration::from_millis(200)).await;

        // Clamped to the full message; no flags, so the walk is terminal.
        assert_eq!(sink.frames(), vec!["Hi"]);
        assert_eq!(writer.committed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_blink_toggles_opacity_each_period() {
        let blink = RecordingBlink::new();
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_cursor_blink(true)
            .with_cursor_speed(0.1)
            .bind_cursor(RecordingSink::new())
            .with_blink_effect(blink.clone())
            .build()
            .unwrap();
        let writer = Typewriter::new(config).unwrap();

        writer.animate_cursor();
        writer.animate_cursor(); // second call must not stack a loop
        sleep(Duration::from_millis(350)).await;

        assert_eq!(blink.opacities(), vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cursor_cancels_loop_and_restores_opacity() {
        let blink = RecordingBlink::new();
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_cursor_blink(true)
            .with_cursor_speed(0.1)
            .bind_cursor(RecordingSink::new())
            .with_blink_effect(blink.clone())
            .build()
            .unwrap();
        let writer = Typewriter::new(config).unwrap();

        writer.animate_cursor();
        sleep(Duration::from_millis(150)).await;
        writer.stop_cursor();

        sleep(Duration::from_millis(500)).await;
        // One toggle to hidden, then the forced restore to full opacity.
        assert_eq!(blink.opacities(), vec![0.0, 1.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn blink_loops_are_independent() {
        let blink = RecordingBlink::new();
        let (builder, _sink) = base_builder("Hi");
        let config = builder
            .with_cursor_blink(true)
            .with_cursor_speed(0.1)
            .with_mark_blink(true)
            .with_mark_speed(0.3)
            .bind_cursor(RecordingSink::new())
            .bind_mark(RecordingSink::new())
            .with_blink_effect(blink.clone())
            .build()
            .unwrap();
        let writer = Typewriter::new(config).unwrap();

        writer.animate_cursor();
        writer.animate_mark();
        sleep(Duration::from_millis(150)).await;
        writer.stop_cursor();

        // The mark loop keeps going after the cursor loop is cancelled.
        sleep(Duration::from_millis(200)).await;
        let transitions = blink.transitions();
        assert!(transitions
            .iter()
            .any(|t| t.duration == Duration::from_millis(300)));
    }
}

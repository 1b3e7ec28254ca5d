//! Typewriter - Headless Typed-Text Animation Engine
//!
//! This crate animates a message so it looks typed and erased one character
//! at a time, with optional blinking cursor and mark glyphs, auto-erase, and
//! infinite write/erase looping. It is completely independent of any UI
//! framework: presentation, opacity tweening, and timers are all injected,
//! so the same engine can drive a terminal cell, a GUI label, a web element,
//! or a test recorder.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         Host                                │
//! │   ┌────────────┐   ┌─────────────┐   ┌─────────────────┐   │
//! │   │ RenderSink │   │ BlinkEffect │   │    Scheduler    │   │
//! │   │ (set_text) │   │ (opacity)   │   │ (once/repeating)│   │
//! │   └─────▲──────┘   └──────▲──────┘   └────────▲────────┘   │
//! └─────────┼─────────────────┼───────────────────┼────────────┘
//!           │                 │                   │
//! ┌─────────┴─────────────────┴───────────────────┴────────────┐
//! │                       Typewriter                            │
//! │   write/erase chain · pause/resume · rewind/redo policy     │
//! │   cursor blink loop · mark blink loop                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use typewriter::{TokioScheduler, Typewriter, TypewriterConfig};
//!
//! let config = TypewriterConfig::builder(target, 0.1)
//!     .with_message("Hello World")
//!     .with_cursor("_")
//!     .with_cursor_blink(true)
//!     .bind_cursor(cursor_surface)
//!     .with_blink_effect(fade)
//!     .with_rewind(true)
//!     .with_rewind_delay(3.0)
//!     .with_scheduler(TokioScheduler::new())
//!     .build()?;
//!
//! let writer = Typewriter::new(config)?;
//! writer.animate_cursor();
//! writer.write(0);
//! // ...
//! writer.pause();
//! writer.resume();
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: builder, validation, and the immutable config snapshot
//! - [`controller`]: the playback state machine and blink loops
//! - [`scheduler`]: the deferred-callback seam and the Tokio implementation
//! - [`surface`]: the render-sink and blink-effect seams
//! - [`testing`]: recording test doubles
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any UI framework. Everything
//! visible happens behind the [`RenderSink`] and [`BlinkEffect`] traits.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod scheduler;
pub mod surface;
pub mod testing;

pub use config::{ConfigError, TypewriterBuilder, TypewriterConfig};
pub use controller::{BindingError, Direction, PlaybackStatus, Typewriter};
pub use scheduler::{ScheduledTask, Scheduler, TokioScheduler};
pub use surface::{BlinkEffect, RenderSink};

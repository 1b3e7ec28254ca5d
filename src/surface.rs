//! Surface Abstractions
//!
//! The engine never touches presentation directly. Everything visible goes
//! through two narrow seams the host implements: a [`RenderSink`] that
//! accepts the text to display, and a [`BlinkEffect`] that performs timed
//! opacity transitions on glyph surfaces.
//!
//! # Design Philosophy
//!
//! The engine describes WHAT should be visible, the host decides HOW to show
//! it. A terminal host might redraw a cell region, a GUI host might set a
//! label and drive a fade, a test host records calls. The engine only ever
//! calls `set_text` with a full prefix and `transition` with a target
//! opacity; it implements no tweening of its own.

use std::sync::Arc;
use std::time::Duration;

/// A surface whose visible text the engine controls.
///
/// The message target, the cursor surface, and the mark surface are all
/// render sinks. Each call replaces the surface's entire text content.
///
/// Implementations must be cheap and non-blocking: `set_text` is invoked
/// from inside a playback step and a slow sink stalls the whole chain.
pub trait RenderSink: Send + Sync {
    /// Replace the visible text content of this surface.
    fn set_text(&self, text: &str);
}

/// A provider of timed opacity transitions for glyph surfaces.
///
/// The engine starts and stops blink loops; the visual transition itself
/// (fading, stepping, or an instant toggle) is entirely the provider's
/// business.
pub trait BlinkEffect: Send + Sync {
    /// Transition `surface` to the given opacity over `duration`.
    ///
    /// `opacity` is `1.0` for fully visible and `0.0` for invisible. The
    /// engine alternates between the two at the configured blink period and
    /// forces `1.0` when a blink loop is stopped.
    fn transition(&self, surface: &Arc<dyn RenderSink>, duration: Duration, opacity: f64);
}

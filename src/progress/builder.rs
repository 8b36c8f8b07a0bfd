//! Builder pattern implementation for creating [`Progress`] instances.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use multibar::Progress;
//!
//! let progress = Progress::builder()
//!     .width(64)
//!     .refresh_rate(Duration::from_millis(80))
//!     .build();
//! progress.stop();
//! ```
//!
//! Waiting on external producers before shutdown:
//!
//! ```no_run
//! use multibar::{Progress, WaitGroup};
//!
//! let wg = WaitGroup::new();
//! let progress = Progress::builder().wait_group(wg.clone()).build();
//! // ... hand clones of `wg` to producer threads ...
//! drop(wg);
//! progress.stop(); // returns once every producer dropped its clone
//! ```

use std::env;
use std::time::Duration;

use crossbeam_utils::sync::WaitGroup;

use super::{default_sort, BeforeRender, Conf, Interceptor, Progress};
use crate::bar::Bar;
use crate::signal::{Trigger, Watch};
use crate::writer::{CursorWriter, TermWriter};

/// Default refresh period, also the per-frame width-sync deadline.
pub(crate) const DEFAULT_REFRESH: Duration = Duration::from_millis(100);
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_FORMAT: &str = "[=> ]";

const FILL_ASCII: [char; 2] = ['-', '='];
// Block elements U+258F (one eighth) up to U+2588 (full block).
const FILL_UTF8: [char; 8] = ['▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// A builder used to create a [`Progress`] orchestrator.
pub struct ProgressBuilder {
    width: usize,
    format: String,
    fill_levels: Option<Vec<char>>,
    refresh: Duration,
    writer: Option<Box<dyn TermWriter + Send>>,
    before_render: Option<BeforeRender>,
    interceptors: Vec<Interceptor>,
    wait_group: Option<WaitGroup>,
    cancel: Option<Watch>,
    shutdown_notifier: Option<Trigger>,
}

impl Default for ProgressBuilder {
    fn default() -> Self {
        ProgressBuilder {
            width: DEFAULT_WIDTH,
            format: DEFAULT_FORMAT.to_string(),
            fill_levels: None,
            refresh: DEFAULT_REFRESH,
            writer: None,
            before_render: None,
            interceptors: Vec::new(),
            wait_group: None,
            cancel: None,
            shutdown_notifier: None,
        }
    }
}

impl ProgressBuilder {
    pub fn new() -> Self {
        ProgressBuilder::default()
    }

    /// Sets the default bar width in character cells.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the default five-glyph bar format, e.g. `"[=> ]"`.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the partial-cell fill glyphs, least to most filled. Overrides
    /// the locale-based default.
    pub fn fill_levels(mut self, levels: impl Into<Vec<char>>) -> Self {
        self.fill_levels = Some(levels.into());
        self
    }

    /// Sets the tick period. Doubles as the width-sync deadline per frame.
    pub fn refresh_rate(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Replaces the terminal writer. Defaults to an ANSI cursor writer on
    /// standard error.
    pub fn writer(mut self, writer: impl TermWriter + Send + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Replaces the pre-render sort. The default orders ascending by id,
    /// with finished bars drifting above unfinished ones of the same id.
    pub fn before_render(mut self, f: impl FnMut(&mut [Bar]) + Send + 'static) -> Self {
        self.before_render = Some(Box::new(f));
        self
    }

    /// Registers a callback that may write extra lines after the bar block
    /// in every frame.
    pub fn interceptor(mut self, f: impl FnMut(&mut dyn TermWriter) + Send + 'static) -> Self {
        self.interceptors.push(Box::new(f));
        self
    }

    /// Makes [`Progress::stop`] wait for every clone of `wait_group` to be
    /// dropped before shutting down rendering.
    pub fn wait_group(mut self, wait_group: WaitGroup) -> Self {
        self.wait_group = Some(wait_group);
        self
    }

    /// Attaches a cancel signal: when fired, every bar aborts and the
    /// ticker stops. Not a substitute for [`Progress::stop`].
    pub fn cancel(mut self, cancel: Watch) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Attaches a gate fired when the orchestrator thread exits.
    pub fn shutdown_notifier(mut self, notifier: Trigger) -> Self {
        self.shutdown_notifier = Some(notifier);
        self
    }

    /// Builds the orchestrator and spawns its server thread.
    pub fn build(self) -> Progress {
        let fill_levels = self.fill_levels.unwrap_or_else(default_fill_levels);
        let writer = self
            .writer
            .unwrap_or_else(|| Box::new(CursorWriter::stderr()));
        let before_render = self
            .before_render
            .unwrap_or_else(|| Box::new(default_sort));
        let conf = Conf {
            bars: Vec::new(),
            width: self.width,
            format: self.format,
            fill_levels,
            refresh: self.refresh,
            writer,
            before_render,
            interceptors: self.interceptors,
            cancel: self.cancel,
            shutdown_notifier: self.shutdown_notifier,
        };
        Progress::start(conf, self.wait_group)
    }
}

/// The UTF-8/ASCII glyph choice is snapshotted at construction; later
/// environment changes are ignored.
fn default_fill_levels() -> Vec<char> {
    if utf8_locale() {
        FILL_UTF8.to_vec()
    } else {
        FILL_ASCII.to_vec()
    }
}

fn utf8_locale() -> bool {
    env::var("LANG")
        .map(|lang| lang.to_lowercase().ends_with(".utf-8"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_tables_match_locale_shape() {
        assert_eq!(FILL_ASCII.len(), 2);
        assert_eq!(FILL_UTF8.len(), 8);
        assert_eq!(FILL_UTF8[0], '\u{258F}');
        assert_eq!(FILL_UTF8[7], '\u{2588}');
        // Ascending fill: each glyph covers more of the cell than the last.
        assert_eq!(FILL_ASCII[1], '=');
    }

    #[test]
    fn builder_defaults() {
        let builder = ProgressBuilder::new();
        assert_eq!(builder.width, 80);
        assert_eq!(builder.format, "[=> ]");
        assert_eq!(builder.refresh, Duration::from_millis(100));
        assert!(builder.writer.is_none());
    }
}

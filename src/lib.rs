//! Multibar composes many independently advancing progress bars into a
//! single animated block on a character terminal.
//!
//! Every bar is an actor owning its own state, so any number of producer
//! threads can report progress without locks; a single orchestrator thread
//! snapshots the bars on a tick, lines decorator columns up across bars
//! through a bounded per-frame rendezvous, and repaints the block in place.
//! Throughput and ETA come from a rolling window, so a stalled transfer is
//! reported as stalled instead of being averaged away.
//!
//! # Quick Start
//!
//! ```rust
//! use multibar::{BarOpts, Progress};
//! use multibar::decor::Units;
//!
//! let progress = Progress::builder().build();
//! let bar = progress.add_bar_def(100, "fetch: ", Units::KiB, BarOpts::new());
//! for _ in 0..100 {
//!     bar.increment();
//! }
//! progress.stop();
//! ```
//!
//! # Module Organization
//!
//! - [`bar`] - Progress bars, their state actors and per-bar options
//! - [`decor`] - Decorators: name, counters, throughput, ETA, percentage
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`progress`] - The orchestrator that renders and coordinates bars
//! - [`signal`] - Broadcast close gates used for cancellation and shutdown
//! - [`writer`] - The terminal writer collaborator and its ANSI implementation

pub mod bar;
pub mod decor;
pub mod error;
pub mod progress;
pub mod signal;
pub mod writer;

pub use bar::{Bar, BarOpts, ProxyReader};
pub use error::{Error, Result};
pub use progress::{Progress, ProgressBuilder};
pub use writer::{CursorWriter, TermWriter};

// Producers signal completion to `Progress::stop` by dropping clones of a
// crossbeam wait group; re-exported so callers need no direct dependency.
pub use crossbeam_utils::sync::WaitGroup;
